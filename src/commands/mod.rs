pub mod repl;
pub mod run;

use clap::Args;

use crate::config::{ConfigError, Settings};
use crate::engine::{EofPolicy, LoopMode};
use crate::tape::LeftEdge;

/// Dialect and limit flags shared by `run` and `repl`. Unset flags fall through to the
/// environment, then the config file.
#[derive(Args, Debug, Default)]
pub struct DialectArgs {
    /// Loop resolution: a single remembered '[' or a stack of them
    #[arg(long = "loop-mode", value_name = "MODE", value_enum)]
    pub loop_mode: Option<LoopMode>,

    /// Behavior of '<' on the first cell
    #[arg(long = "left-edge", value_name = "EDGE", value_enum)]
    pub left_edge: Option<LeftEdge>,

    /// What ',' stores at end of input
    #[arg(long = "eof", value_name = "POLICY", value_enum)]
    pub eof: Option<EofPolicy>,

    /// Maximum number of tape cells before aborting
    #[arg(long = "max-cells", value_name = "N")]
    pub max_cells: Option<usize>,

    /// Maximum interpreter steps before aborting (default unlimited)
    #[arg(long = "max-steps", value_name = "N")]
    pub max_steps: Option<usize>,
}

impl DialectArgs {
    /// Resolve flags -> env -> config file.
    pub fn settings(&self) -> Result<Settings, ConfigError> {
        let flags = Settings {
            loop_mode: self.loop_mode,
            left_edge: self.left_edge,
            eof: self.eof,
            max_cells: self.max_cells,
            max_steps: self.max_steps,
        };
        flags.layered()
    }
}
