use std::fs;
use std::path::Path;

use anyhow::{Context, Result, anyhow};

use crate::cli::commands::open_session;
use scenario::{SessionConfig, run_command};

pub(crate) fn cmd_run(config: &SessionConfig, script: &Path) -> Result<()> {
    let text = fs::read_to_string(script)
        .with_context(|| format!("failed to read script {}", script.display()))?;
    let mut world = open_session(config)?;
    let macros = world.macros().clone();
    for (index, line) in text.lines().enumerate() {
        world = run_command(&world, line, &macros)
            .map_err(|err| anyhow!("{}:{}: {err}", script.display(), index + 1))?;
    }
    println!("ran {} action(s) from {}", world.actions().len(), script.display());
    Ok(())
}
