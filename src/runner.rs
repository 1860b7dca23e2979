//! Per-line evaluation.

use tracing::{debug, warn};

use crate::core_event::process_core_event;
use crate::error::Result;
use crate::macros::{Macros, expand_event};
use crate::parser::{is_comment_or_blank, parse_event};
use crate::world::World;

/// Evaluates one scenario line against `world`.
///
/// Comments and blank lines return the world unchanged. Otherwise the line is
/// parsed, macro-expanded, and every resulting event is dispatched in order
/// as the default sender. On error the caller keeps its own `world`; nothing
/// built while running the line escapes.
pub fn run_command(world: &World, line: &str, macros: &Macros) -> Result<World> {
    if is_comment_or_blank(line) {
        return Ok(world.clone());
    }
    let event = parse_event(line)?;
    let events = expand_event(macros, &event)?;
    debug!(%event, expanded = events.len(), "running line");
    events.iter().try_fold(world.clone(), |world, event| {
        let from = world.default_from();
        process_core_event(&world, event, from)
    })
}

/// Like [`run_command`], but prints the error and hands back the previous world.
pub fn execute(world: &World, line: &str, macros: &Macros) -> World {
    match run_command(world, line, macros) {
        Ok(next) => next,
        Err(err) => {
            warn!(%line, %err, "line failed");
            world.printer().print_error(&err);
            world.clone()
        }
    }
}

#[cfg(test)]
mod tests {
    use std::rc::Rc;

    use super::*;
    use crate::chain::{Chain, MemoryChain};
    use crate::error::ScenarioError;
    use crate::networks::network_file;
    use crate::parser::parse_macros;
    use crate::printer::BufferPrinter;
    use crate::test_support::dev_world;

    #[test]
    fn comments_leave_the_world_alone() -> anyhow::Result<()> {
        let (world, _dir) = dev_world()?;
        let after = run_command(&world, "# deploy nothing", world.macros())?;
        assert!(after == world);
        Ok(())
    }

    #[test]
    fn failed_resolution_leaves_the_world_unchanged() -> anyhow::Result<()> {
        let (world, _dir) = dev_world()?;
        let macros = Macros::default();
        let world = run_command(&world, "Erc20 Deploy Standard ZRX \"0x Protocol Token\" 18", &macros)?;
        let before = world.clone();
        let err = match run_command(&world, "Comptroller SetCollateralFactor cZRX 0.1", &macros) {
            Err(err) => err,
            Ok(_) => panic!("cZRX is not registered"),
        };
        assert!(err.is_resolution());
        assert!(world == before);
        let kept = execute(&world, "Comptroller SetCollateralFactor cZRX 0.1", &macros);
        assert!(kept == before);
        Ok(())
    }

    #[test]
    fn unbound_value_fetchers_fail_the_line() -> anyhow::Result<()> {
        let (world, _dir) = dev_world()?;
        let macros = Macros::default();
        for line in [
            "Print (Exp Geoff)",
            "Print (Exp NotANumber)",
            "Assert Equal (User Nobody) (List User Nobody)",
        ] {
            match run_command(&world, line, &macros) {
                Err(err) => assert!(err.is_resolution(), "{line}: {err}"),
                Ok(_) => panic!("{line} succeeded"),
            }
        }
        Ok(())
    }

    #[test]
    fn deploy_writes_tree_and_registry() -> anyhow::Result<()> {
        let (world, _dir) = dev_world()?;
        let world = run_command(&world, "Erc20 Deploy Standard ZRX \"0x Protocol Token\" 18", &Macros::default())?;
        assert_eq!(world.get_in(&["Tokens", "ZRX", "symbol"]), Some(&serde_json::json!("ZRX")));
        assert_eq!(world.get_in(&["Tokens", "ZRX", "decimals"]), Some(&serde_json::json!(18)));
        let text = std::fs::read_to_string(network_file(&world.networks_dir(), world.network()))?;
        let registry: serde_json::Value = serde_json::from_str(&text)?;
        let address = world.contract_address("ZRX").map(|address| address.to_string());
        assert_eq!(registry["Contracts"]["ZRX"].as_str(), address.as_deref());
        Ok(())
    }

    #[test]
    fn unreadable_registry_keeps_the_deploy_in_memory() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let chain = Rc::new(MemoryChain::new(3));
        let printer = Rc::new(BufferPrinter::new());
        let world = World::new("development", dir.path(), chain.clone(), printer.clone())
            .with_accounts(chain.accounts()?);
        let path = network_file(&world.networks_dir(), world.network());
        std::fs::create_dir_all(world.networks_dir())?;
        std::fs::write(&path, "{not json")?;

        let world = run_command(&world, "Erc20 Deploy Standard ZRX \"0x Protocol Token\" 18", &Macros::default())?;
        assert!(world.contract_address("ZRX").is_some());
        assert!(world.get_in(&["Contracts", "ZRX"]).is_some());
        assert!(printer.contains("error: registry"));
        assert_eq!(std::fs::read_to_string(&path)?, "{not json");
        Ok(())
    }

    #[test]
    fn dry_run_leaves_the_registry_byte_identical() -> anyhow::Result<()> {
        let (world, _dir) = dev_world()?;
        let macros = Macros::default();
        let world = run_command(&world, "Erc20 Deploy Standard ZRX \"0x Protocol Token\" 18", &macros)?;
        let path = network_file(&world.networks_dir(), world.network());
        let before = std::fs::read(&path)?;
        let world = run_command(&world, "DryRun (Erc20 Deploy Standard BAT \"Basic Attention Token\" 18)", &macros)?;
        let world = run_command(&world.with_dry_run(true), "Erc20 ZRX Faucet Geoff 100", &macros)?;
        assert_eq!(std::fs::read(&path)?, before);
        assert!(world.get_in(&["Tokens", "BAT"]).is_some());
        Ok(())
    }

    #[test]
    fn macros_expand_before_dispatch() -> anyhow::Result<()> {
        let (world, _dir) = dev_world()?;
        let macros = parse_macros("Macro NewZRX decimals=18\n  Erc20 Deploy Standard ZRX \"0x Protocol Token\" decimals")?;
        let world = run_command(&world, "NewZRX 6", &macros)?;
        assert_eq!(world.get_in(&["Tokens", "ZRX", "decimals"]), Some(&serde_json::json!(6)));
        Ok(())
    }

    #[test]
    fn syntax_errors_surface_verbatim() -> anyhow::Result<()> {
        let (world, _dir) = dev_world()?;
        let err = match run_command(&world, "Erc20 Deploy (Standard", &Macros::default()) {
            Err(err) => err,
            Ok(_) => panic!("unbalanced parenthesis"),
        };
        assert!(matches!(err, ScenarioError::Syntax { .. }));
        Ok(())
    }
}
