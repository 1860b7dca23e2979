//! Contract lookups by name against the world's metadata tree.

use crate::chain::Contract;
use crate::error::{Result, ScenarioError};
use crate::event::Event;
use crate::generation::Generation;
use crate::value::Address;
use crate::world::World;

fn lookup_indexed(world: &World, index: &str, what: &str, event: &Event) -> Result<Contract> {
    let name = event
        .as_atom()
        .ok_or_else(|| ScenarioError::mismatch(what, "list", event))?;
    let address = match name.parse::<Address>() {
        Ok(address) => address,
        Err(_) => world
            .get_in(&[index, name, "address"])
            .and_then(|json| json.as_str())
            .and_then(|text| text.parse().ok())
            .ok_or_else(|| ScenarioError::mismatch(what, format!("unknown {what} `{name}`"), event))?,
    };
    world.require_contract_at(&address, what)
}

fn lookup_named(world: &World, name: &str) -> Result<Contract> {
    let address = world
        .contract_address(name)
        .ok_or_else(|| ScenarioError::mismatch(name, "nothing registered", format!("Contracts.{name}")))?;
    world.require_contract_at(&address, name)
}

/// `Tokens.<symbol>.address`, or a literal address.
pub fn get_erc20(world: &World, event: &Event) -> Result<Contract> {
    lookup_indexed(world, "Tokens", "Erc20", event)
}

/// `CTokens.<symbol>.address`, or a literal address.
pub fn get_ctoken(world: &World, event: &Event) -> Result<Contract> {
    lookup_indexed(world, "CTokens", "CToken", event)
}

/// `Comptroller.<name>.address`, or a literal address.
pub fn get_comptroller_impl(world: &World, event: &Event) -> Result<Contract> {
    lookup_indexed(world, "Comptroller", "ComptrollerImpl", event)
}

pub fn get_unitroller(world: &World) -> Result<Contract> {
    lookup_named(world, "Unitroller")
}

/// The comptroller reached through the unitroller once an implementation has been adopted.
pub fn get_comptroller(world: &World) -> Result<Contract> {
    lookup_named(world, "Comptroller")
}

/// Generation recorded for a deployed implementation.
pub fn impl_generation(world: &World, implementation: &Contract) -> Generation {
    world
        .get_in(&["Comptroller", implementation.name.as_str(), "generation"])
        .and_then(|json| json.as_str())
        .and_then(Generation::parse)
        .unwrap_or(Generation::Standard)
}

/// Generation of the implementation the unitroller currently delegates to.
pub fn comptroller_generation(world: &World) -> Generation {
    world
        .get_in(&["Unitroller", "implementation"])
        .and_then(|json| json.as_str())
        .and_then(|name| world.get_in(&["Comptroller", name, "generation"]))
        .and_then(|json| json.as_str())
        .and_then(Generation::parse)
        .unwrap_or(Generation::Standard)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::abi::Abi;
    use crate::test_support::dev_world;
    use serde_json::json;

    #[test]
    fn tokens_resolve_by_symbol_or_address() -> anyhow::Result<()> {
        let (world, _dir) = dev_world()?;
        let address = Address([5; 20]);
        let world = world
            .with_contract(Contract::new("ZRX", address, Abi::default()))
            .set_in(&["Tokens", "ZRX", "address"], json!(address.to_string()));
        assert_eq!(get_erc20(&world, &Event::atom("ZRX"))?.address, address);
        assert_eq!(get_erc20(&world, &Event::atom(address.to_string()))?.name, "ZRX");
        assert!(get_erc20(&world, &Event::atom("BAT")).is_err());
        assert!(get_ctoken(&world, &Event::atom("ZRX")).is_err());
        Ok(())
    }

    #[test]
    fn generations_default_to_standard() -> anyhow::Result<()> {
        let (world, _dir) = dev_world()?;
        assert_eq!(comptroller_generation(&world), Generation::Standard);
        let world = world
            .set_in(&["Comptroller", "ComptrollerG1", "generation"], json!("G1"))
            .set_in(&["Unitroller", "implementation"], json!("ComptrollerG1"));
        assert_eq!(comptroller_generation(&world), Generation::G1);
        Ok(())
    }
}
