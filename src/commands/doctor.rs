use anyhow::{Result, bail};
use tracing::{info, warn};

use crate::tools::{self, ALL_TOOLS};

pub fn run() -> Result<()> {
    let missing = tools::missing_tools(ALL_TOOLS);

    for requirement in ALL_TOOLS {
        if missing
            .groups()
            .any(|(_, programs)| programs.contains(&requirement.program))
        {
            continue;
        }

        match tools::command_version_optional(requirement) {
            Some(version) => info!(tool = requirement.program, version = %version, "found"),
            None => info!(tool = requirement.program, "found (version unknown)"),
        }
    }

    if !missing.is_empty() {
        for (package, programs) in missing.groups() {
            warn!(package, tools = %programs.join(", "), "missing tools");
        }
        bail!("missing required tools: {missing}");
    }

    info!(tools = ALL_TOOLS.len(), "all external tools are available");
    Ok(())
}
