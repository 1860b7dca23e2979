//! Scenario language and evaluation engine for contract test scenarios.

pub mod abi;
pub mod accounts;
pub mod artifacts;
pub mod catalog;
pub mod chain;
pub mod command;
pub mod config;
pub mod core_event;
pub mod core_value;
pub mod error;
pub mod event;
pub mod generation;
pub mod hash;
pub mod invoke;
pub mod lookup;
pub mod macros;
pub mod networks;
pub mod number;
pub mod parser;
pub mod printer;
pub mod runner;
pub mod session;
pub mod settings;
pub mod tree;
pub mod value;
pub mod world;

pub use chain::{Chain, ChainError, Contract, MemoryChain};
pub use config::SessionConfig;
pub use error::{Result, ScenarioError};
pub use event::Event;
pub use macros::Macros;
pub use printer::{BufferPrinter, ConsolePrinter, Printer};
pub use runner::{execute, run_command};
pub use session::init_world;
pub use value::{Address, Value};
pub use world::World;

#[cfg(test)]
pub(crate) mod test_support {
    use std::rc::Rc;

    use crate::chain::{Chain, MemoryChain};
    use crate::printer::BufferPrinter;
    use crate::world::World;

    /// A development world on a fresh in-memory chain with ten accounts,
    /// writing its registry under a temporary directory.
    pub(crate) fn dev_world() -> anyhow::Result<(World, tempfile::TempDir)> {
        let dir = tempfile::tempdir()?;
        let chain = Rc::new(MemoryChain::new(10));
        let accounts = chain.accounts()?;
        let world = World::new("development", dir.path(), chain, Rc::new(BufferPrinter::new()))
            .with_accounts(accounts);
        Ok((world, dir))
    }
}
