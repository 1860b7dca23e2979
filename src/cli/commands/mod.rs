use std::rc::Rc;

use anyhow::Result;

mod eval;
mod registry;
mod repl;
mod run;

pub(crate) use eval::cmd_eval;
pub(crate) use registry::cmd_registry_show;
pub(crate) use repl::cmd_repl;
pub(crate) use run::cmd_run;

use scenario::{ConsolePrinter, MemoryChain, SessionConfig, World, init_world};

/// Starts a session on the in-memory development chain.
pub(crate) fn open_session(config: &SessionConfig) -> Result<World> {
    let chain = Rc::new(MemoryChain::new(config.accounts));
    let printer = Rc::new(ConsolePrinter::new(config.verbose));
    Ok(init_world(config, chain, printer)?)
}
