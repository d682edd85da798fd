use std::io::{self, IsTerminal, Write};
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use clap::Args;

use crate::commands::DialectArgs;
use crate::engine::StepControl;
use crate::error::{status, CliError};
use crate::repl::{execute_bare_once, repl_loop, select_mode, ModeFlagOverride, ReplMode};

#[derive(Args, Debug)]
#[command(disable_help_flag = true)]
pub struct ReplArgs {
    /// Force non-interactive bare mode
    #[arg(long = "bare", conflicts_with = "editor")]
    pub bare: bool,

    /// Force interactive mode (errors if stdin is not a TTY)
    #[arg(long = "editor", conflicts_with = "bare")]
    pub editor: bool,

    #[command(flatten)]
    pub dialect: DialectArgs,

    /// Show this help
    #[arg(short = 'h', long = "help", action = clap::ArgAction::SetTrue)]
    pub help: bool,
}

// Public entry point for the REPL from main.rs
pub fn run(program: &str, args: ReplArgs, cancel: Arc<AtomicBool>) -> i32 {
    if args.help {
        usage_and_exit(program, status::SUCCESS);
    }

    let mode_flag = match (args.bare, args.editor) {
        (true, _) => ModeFlagOverride::Bare,
        (_, true) => ModeFlagOverride::Editor,
        _ => ModeFlagOverride::None,
    };

    // Determine mode: flags -> env -> auto-detect via is_terminal()
    let mode = match select_mode(mode_flag) {
        Ok(m) => m,
        Err(msg) => return fail(program, &msg, status::USAGE),
    };

    let settings = match args.dialect.settings() {
        Ok(s) => s,
        Err(e) => {
            let err = CliError::from(e);
            return fail(program, &err.to_string(), err.exit_code());
        }
    };
    let control = StepControl::new(settings.max_steps, cancel);

    let outcome = match mode {
        ReplMode::Editor => {
            // Print banners only if stderr is a TTY
            if io::stderr().is_terminal() {
                eprintln!("Brainfuck REPL (interactive editor mode)");
                eprintln!("Ctrl+d/Ctrl+z Enter (Windows) executes the current buffer. Press ctrl+c to exit");
                let _ = io::stderr().flush();
            }
            repl_loop(&settings, &control).map(|()| None)
        }
        // Bare mode: read stdin until EOF, execute once; a fault sets the exit status
        ReplMode::Bare => execute_bare_once(&settings, &control),
    };

    match outcome {
        Ok(None) => status::SUCCESS,
        Ok(Some(err)) => err.exit_code(),
        Err(e) => fail(program, &format!("REPL error: {e}"), status::IO_FAILURE),
    }
}

fn fail(program: &str, msg: &str, code: i32) -> i32 {
    eprintln!("{program}: {msg}");
    let _ = io::stderr().flush();
    code
}

fn usage_and_exit(program: &str, code: i32) -> ! {
    eprintln!(
        r#"Usage:
  {0} repl [--bare|--editor] [DIALECT OPTIONS]

Options:
  --help,   -h        Show this help
  --bare              Force non-interactive bare mode
  --editor            Force interactive editor mode (errors if stdin is not a TTY)
  --loop-mode, --left-edge, --eof, --max-cells, --max-steps
                      Same as for `{0} run`

Description:
  Starts a REPL where you can enter code and execute it live.

Notes:
    - Comment characters are ignored; only ><+-.,[] are executed.
    - Ctrl+D executes the current buffer on *nix/macOS.
    - Ctrl+Z and Enter will execute the current buffer on Windows.
    - Ctrl+C while a program runs aborts that program; at the prompt it exits.
    - Each execution starts with a fresh tape and pointers.
    - The REPL will exit after a single execution if `BF_REPL_ONCE` is set to `1`.
    - Mode selection:
        * Flags: --bare|--editor override environment and auto-detection.
        * Env: BF_REPL_MODE=bare|editor overrides auto-detection.
        * Auto-detect: if stdin is a TTY, starts in interactive editor mode; otherwise, bare mode.
"#,
        program
    );
    let _ = io::stderr().flush();
    std::process::exit(code);
}
