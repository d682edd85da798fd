use std::env;
use std::io::{self, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use bf::commands::{repl, run};
use bf::error::{status, CliError};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

fn print_top_usage_and_exit(program: &str, code: i32) -> ! {
    eprintln!(
        r#"Usage:
  {0} run  [OPTIONS] <PATH>          # Run a program file
  {0} run  [OPTIONS] --eval "<code>" # Run code given on the command line
  {0} repl [--bare|--editor]         # Start a REPL (read-eval-print loop)

Run "{0} <subcommand> --help" for more info.
Set BF_LOG (e.g. BF_LOG=debug) to see interpreter logs on stderr.
"#,
        program
    );
    let _ = io::stderr().flush();
    std::process::exit(code);
}

#[derive(Parser, Debug)]
#[command(name = "bf", disable_help_flag = true, disable_help_subcommand = true)]
struct Cli {
    /// Show this help
    #[arg(short = 'h', long = "help", action = clap::ArgAction::SetTrue)]
    help: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    Run(run::RunArgs),
    Repl(repl::ReplArgs),
}

fn init_logging() {
    // stdout belongs to the program being interpreted.
    let filter = EnvFilter::try_from_env("BF_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .init();
}

/// First Ctrl+C asks the running program to stop; a second one exits at once.
fn install_interrupt_handler(program: &str) -> Arc<AtomicBool> {
    let cancel = Arc::new(AtomicBool::new(false));
    let flag = cancel.clone();
    if let Err(e) = ctrlc::set_handler(move || {
        if flag.swap(true, Ordering::Relaxed) {
            // Never touch stdout here: the main thread may hold its lock while blocked in `,`.
            std::process::exit(status::INTERRUPTED);
        }
    }) {
        tracing::warn!("{program}: failed to set ctrl+c handler: {e}");
    }
    cancel
}

fn main() {
    // We still pull the program name for help rendering consistency
    let program = env::args().next().unwrap_or_else(|| String::from("bf"));

    init_logging();
    let cli = Cli::parse();

    if cli.help {
        print_top_usage_and_exit(&program, status::SUCCESS);
    }
    let Some(command) = cli.command else {
        eprintln!("{program}: Error: {}", CliError::MissingFileName);
        print_top_usage_and_exit(&program, status::MISSING_FILE_NAME);
    };

    let cancel = install_interrupt_handler(&program);
    let code = match command {
        Command::Run(args) => run::run(&program, args, cancel),
        Command::Repl(args) => repl::run(&program, args, cancel),
    };

    let _ = io::stdout().flush();
    std::process::exit(code);
}
