pub mod chapters;
pub mod doctor;
pub mod split;

use crate::cli::Commands;
use crate::tools::{ALL_TOOLS, PROBE_TOOLS, ToolRequirement};

pub fn required_tools(command: &Commands) -> &'static [ToolRequirement] {
    match command {
        Commands::Split(_) => ALL_TOOLS,
        Commands::Chapters(_) => PROBE_TOOLS,
        Commands::Doctor => &[],
    }
}
