#![allow(dead_code)]

use assert_cmd::Command;
use std::io::Write;
use std::time::Duration;

/// The `bf` binary, isolated from the user's config file and `BF_*` environment.
pub fn cargo_bin() -> Command {
    let mut cmd = Command::cargo_bin("bf").expect("failed to locate bf binary");
    cmd.timeout(Duration::from_secs(5)).env("BF_NO_CONFIG", "1");
    for var in ["BF_LOOP_MODE", "BF_LEFT_EDGE", "BF_EOF", "BF_MAX_CELLS", "BF_MAX_STEPS", "BF_CONFIG", "BF_LOG"] {
        cmd.env_remove(var);
    }
    cmd
}

pub fn source_file(content: &str) -> tempfile::NamedTempFile {
    let mut tf = tempfile::NamedTempFile::new().expect("tempfile");
    write!(tf, "{}", content).unwrap();
    tf
}

pub const HELLO_WORLD: &str = "++++++++++[>+++++++>++++++++++>+++>+<<<<-]>++.>+.+++++++..+++.>++.<<+++++++++++++++.>.+++.------.--------.>+.>.";
