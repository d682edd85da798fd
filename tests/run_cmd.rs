mod common;

use common::{cargo_bin, source_file, HELLO_WORLD};
use predicates::prelude::*;

#[test]
fn runs_program_from_file() {
    let tf = source_file(HELLO_WORLD);
    cargo_bin()
        .arg("run").arg(tf.path())
        .assert()
        .success()
        .stdout("Hello World!\n")
        .stderr(predicate::str::is_empty());
}

#[test]
fn runs_program_from_eval() {
    cargo_bin()
        .args(["run", "--eval", "+++++++++[>++++++++<-]>."])
        .assert()
        .success()
        .stdout("H");
}

#[test]
fn output_is_raw_bytes_without_trailing_newline() {
    cargo_bin()
        .args(["run", "-e", "-."])
        .assert()
        .success()
        .stdout(predicate::eq(&[255u8][..]));
}

#[test]
fn comments_are_ignored() {
    let with_comments = cargo_bin().args(["run", "-e", "hi+++.bye"]).assert().success();
    let bare = cargo_bin().args(["run", "-e", "+++."]).assert().success();
    assert_eq!(with_comments.get_output().stdout, bare.get_output().stdout);
    assert_eq!(with_comments.get_output().stdout, vec![3u8]);
}

#[test]
fn multi_line_source_with_prose() {
    let tf = source_file("This program prints A\n\n8 times 8 is 64 ++++++++[>++++++++<-]\n>+. done\n");
    cargo_bin()
        .arg("run").arg(tf.path())
        .assert()
        .success()
        .stdout("A");
}

#[test]
fn left_of_first_cell_is_not_an_error() {
    cargo_bin()
        .args(["run", "-e", "<+."])
        .assert()
        .success()
        .stdout(predicate::eq(&[1u8][..]));
}

#[test]
fn missing_file_name_has_its_own_status() {
    cargo_bin()
        .arg("run")
        .assert()
        .code(1)
        .stderr(predicate::str::contains("no file name"));
}

#[test]
fn no_subcommand_is_missing_file_name() {
    cargo_bin()
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Usage"));
}

#[test]
fn unreadable_file_has_its_own_status() {
    let dir = tempfile::tempdir().unwrap();
    cargo_bin()
        .arg("run").arg(dir.path().join("absent.bf"))
        .assert()
        .code(6)
        .stdout(predicate::str::is_empty())
        .stderr(predicate::str::contains("absent.bf"));
}

#[test]
fn same_program_same_input_same_output() {
    let tf = source_file(",[.,]++++++[>++++++++<-]>.");
    let first = cargo_bin().arg("run").arg(tf.path()).write_stdin("repeat me").assert().success();
    let second = cargo_bin().arg("run").arg(tf.path()).write_stdin("repeat me").assert().success();
    assert_eq!(first.get_output().stdout, second.get_output().stdout);
    assert_eq!(first.get_output().stdout, b"repeat me0".to_vec());
}

#[test]
fn help_exits_zero() {
    cargo_bin()
        .args(["run", "--help"])
        .assert()
        .success()
        .stderr(predicate::str::contains("--loop-mode"));
}
