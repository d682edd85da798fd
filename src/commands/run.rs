use std::fs;
use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use clap::Args;
use tracing::debug;

use crate::cli_util::print_interpreter_error;
use crate::commands::DialectArgs;
use crate::engine::{Interpreter, StepControl};
use crate::error::{status, CliError};
use crate::program::Program;

#[derive(Args, Debug)]
#[command(disable_help_flag = true)]
pub struct RunArgs {
    /// Program file to execute
    #[arg(value_name = "PATH")]
    pub path: Option<PathBuf>,

    /// Run CODE given on the command line instead of a file
    #[arg(short = 'e', long = "eval", value_name = "CODE", conflicts_with = "path")]
    pub eval: Option<String>,

    /// Print a step-by-step table of operations instead of executing
    #[arg(short = 'd', long = "debug")]
    pub debug: bool,

    /// Treat every non-whitespace character outside ><+-.,[] as an invalid command
    #[arg(long = "strict")]
    pub strict: bool,

    #[command(flatten)]
    pub dialect: DialectArgs,

    /// Show this help
    #[arg(short = 'h', long = "help", action = clap::ArgAction::SetTrue)]
    pub help: bool,
}

pub fn run(program_name: &str, args: RunArgs, cancel: Arc<AtomicBool>) -> i32 {
    if args.help {
        usage_and_exit(program_name, status::SUCCESS);
    }

    let settings = match args.dialect.settings() {
        Ok(s) => s,
        Err(e) => return report(program_name, &CliError::from(e)),
    };

    let source = match load_source(args.path, args.eval) {
        Ok(s) => s,
        Err(e) => return report(program_name, &e),
    };

    let built = if args.strict { Program::verbatim(&source) } else { Program::build(&source) };
    let program = match built {
        Ok(p) => p,
        Err(e) => {
            eprintln!("{program_name}: {e}");
            let _ = io::stderr().flush();
            return e.exit_code();
        }
    };
    debug!(instructions = program.len(), ?settings, "program loaded");

    let control = StepControl::new(settings.max_steps, cancel);
    let mut bf = Interpreter::new(&program, settings.options());
    let stdout = io::stdout();
    let result = if args.debug {
        bf.run_debug(stdout.lock(), Some(&control))
    } else {
        let stdin = io::stdin();
        bf.run_with_control(stdin.lock(), stdout.lock(), &control)
    };

    match result {
        Ok(()) => status::SUCCESS,
        Err(err) => {
            print_interpreter_error(Some(program_name), &source, &program, &err);
            err.exit_code()
        }
    }
}

/// Read the program text once, in full, before anything executes.
fn load_source(path: Option<PathBuf>, eval: Option<String>) -> Result<String, CliError> {
    if let Some(code) = eval {
        return Ok(code);
    }
    let path = path.ok_or(CliError::MissingFileName)?;
    // Comments may be any bytes; only the instruction characters matter.
    match fs::read(&path) {
        Ok(bytes) => Ok(String::from_utf8_lossy(&bytes).into_owned()),
        Err(source) => Err(CliError::NoSuchFile { path, source }),
    }
}

fn report(program_name: &str, err: &CliError) -> i32 {
    eprintln!("{program_name}: Error: {err}");
    let _ = io::stderr().flush();
    err.exit_code()
}

fn usage_and_exit(program: &str, code: i32) -> ! {
    eprintln!(
        r#"Usage:
  {0} run [OPTIONS] <PATH>
  {0} run [OPTIONS] --eval "<code>"

Options:
  --eval,  -e <CODE>    Run CODE instead of a file
  --debug, -d           Print a step-by-step table of operations instead of executing
  --strict              Reject characters outside ><+-.,[] (whitespace excepted)
  --loop-mode <MODE>    bookmark (default) | stack
  --left-edge <EDGE>    clamp (default) | grow
  --eof <POLICY>        zero (default) | unchanged | max
  --max-cells <N>       Abort when the tape would grow past N cells
  --max-steps <N>       Abort after N instructions
  --help,  -h           Show this help

Notes:
- Every option also reads BF_LOOP_MODE, BF_LEFT_EDGE, BF_EOF, BF_MAX_CELLS, BF_MAX_STEPS,
  then the [interpreter] section of bf.toml in the XDG config home (or BF_CONFIG).
- Input (`,`) reads a single byte from stdin.
- In the default bookmark mode only the most recently entered '[' is remembered.

Exit status:
  0 success, 1 no file name, 2 usage, 4/5 out of memory (instructions/cells),
  6 unreadable file, 7 invalid command, 8 invalid loop control, 9 I/O error,
  10 step limit exceeded, 130 interrupted

Examples:
    {0} run ./program.bf
    {0} run --eval ",[.,]" < input.txt
"#,
        program
    );
    let _ = io::stderr().flush();
    std::process::exit(code);
}
