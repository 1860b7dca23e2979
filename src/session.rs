//! Builds the starting [`World`] for a session.

use std::fs;
use std::rc::Rc;

use tracing::info;

use crate::chain::Chain;
use crate::config::SessionConfig;
use crate::error::{Result, ScenarioError};
use crate::networks::load_contracts;
use crate::parser::parse_macros;
use crate::printer::Printer;
use crate::settings::Settings;
use crate::world::World;

/// Loads accounts, aliases, the contract registry and macros, then prints a
/// short banner through `printer`.
pub fn init_world(config: &SessionConfig, chain: Rc<dyn Chain>, printer: Rc<dyn Printer>) -> Result<World> {
    let mut world = World::new(&config.network, &config.base_path, chain, printer)
        .with_dry_run(config.dry_run)
        .with_verbose(config.verbose);
    if let Some(dir) = &config.networks_dir {
        world = world.with_networks_dir(dir);
    }
    let accounts = world.chain().accounts()?;
    let settings = Settings::load(&world.networks_dir(), world.network())?;
    let world = world.with_accounts(accounts).with_settings(settings);
    let (mut world, contracts) = load_contracts(&world)?;
    if let Some(path) = &config.macros {
        let text = fs::read_to_string(path).map_err(|err| ScenarioError::persistence(path, err))?;
        world = world.with_macros(parse_macros(&text)?);
    }
    info!(
        network = world.network(),
        accounts = world.accounts().len(),
        contracts = contracts.len(),
        macros = world.macros().len(),
        "session ready"
    );

    let printer = world.printer();
    printer.print_line(&format!("Network: {}", world.network()));
    if let Some(first) = world.accounts().first() {
        printer.print_line(&format!("Accounts: {} (from {first})", world.accounts().len()));
    }
    if !contracts.is_empty() {
        printer.print_line(&format!("Contracts:\n  {}", contracts.join("\n  ")));
    }
    if !world.macros().is_empty() {
        printer.print_line(&format!("Available macros: {}", world.macros().names().join(", ")));
    }
    if world.dry_run() {
        printer.print_line("Dry run: chain sends and registry writes are skipped");
    }
    Ok(world)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::MemoryChain;
    use crate::macros::Macros;
    use crate::printer::BufferPrinter;
    use crate::runner::run_command;

    fn config(dir: &tempfile::TempDir) -> SessionConfig {
        SessionConfig {
            base_path: dir.path().to_path_buf(),
            ..SessionConfig::default()
        }
    }

    #[test]
    fn fresh_session_prints_network_and_accounts() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let printer = Rc::new(BufferPrinter::new());
        let world = init_world(&config(&dir), Rc::new(MemoryChain::new(10)), printer.clone())?;
        assert_eq!(world.accounts().len(), 10);
        assert_eq!(world.network(), "development");
        assert!(printer.contains("Network: development"));
        assert!(printer.contains("Accounts: 10"));
        Ok(())
    }

    #[test]
    fn registry_survives_a_restart() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let chain = Rc::new(MemoryChain::new(10));
        let world = init_world(&config(&dir), chain.clone(), Rc::new(BufferPrinter::new()))?;
        let world = run_command(&world, "Erc20 Deploy Standard ZRX \"0x Protocol Token\" 18", &Macros::default())?;
        let zrx = world.contract_address("ZRX");

        let printer = Rc::new(BufferPrinter::new());
        let restarted = init_world(&config(&dir), chain, printer.clone())?;
        assert_eq!(restarted.contract_address("ZRX"), zrx);
        assert!(restarted.contract_at(&zrx.expect("zrx")).is_some_and(|c| c.has_method("transfer")));
        assert!(printer.contains("ZRX: "));
        Ok(())
    }

    #[test]
    fn macros_are_loaded_from_the_configured_file() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("macros.txt");
        fs::write(&path, "Macro Hello\n    Print \"hello\"\n")?;
        let printer = Rc::new(BufferPrinter::new());
        let config = SessionConfig {
            macros: Some(path),
            ..config(&dir)
        };
        let world = init_world(&config, Rc::new(MemoryChain::new(3)), printer.clone())?;
        assert_eq!(world.macros().names(), vec!["Hello"]);
        assert!(printer.contains("Available macros: Hello"));
        let macros = world.macros().clone();
        run_command(&world, "Hello", &macros)?;
        assert!(printer.contains("hello"));
        Ok(())
    }
}
