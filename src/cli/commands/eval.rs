use anyhow::Result;

use crate::cli::commands::open_session;
use scenario::{SessionConfig, run_command};

pub(crate) fn cmd_eval(config: &SessionConfig, line: &str) -> Result<()> {
    let world = open_session(config)?;
    let macros = world.macros().clone();
    run_command(&world, line, &macros)?;
    Ok(())
}
