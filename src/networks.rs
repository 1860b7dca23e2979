//! The on-disk contract registry.
//!
//! Two JSON files per network live under `<base>/networks/`:
//!
//! * `<network>.json` holds the metadata tree (`Contracts`, `Tokens`,
//!   `Constructors`, `Blocks`, ...).
//! * `<network>-abi.json` maps contract names to ABIs.
//!
//! Both are written with four-space indentation. Nothing is written in dry-run
//! mode. Registry failures after a successful chain action are printed and
//! logged; the world keeps the update.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use serde::Serialize;
use serde_json::{Map, Value as Json};
use tracing::{debug, warn};

use crate::abi::Abi;
use crate::chain::Contract;
use crate::error::{Result, ScenarioError};
use crate::invoke::Invokation;
use crate::tree;
use crate::value::Address;
use crate::world::World;

pub fn network_file(dir: &Path, network: &str) -> PathBuf {
    dir.join(format!("{network}.json"))
}

pub fn abi_file(dir: &Path, network: &str) -> PathBuf {
    dir.join(format!("{network}-abi.json"))
}

/// Reads a JSON file; a missing file reads as an empty object.
pub fn read_json_file(path: &Path) -> Result<Json> {
    match fs::read_to_string(path) {
        Ok(text) if text.trim().is_empty() => Ok(Json::Object(Map::new())),
        Ok(text) => serde_json::from_str(&text).map_err(|err| ScenarioError::persistence(path, err)),
        Err(err) if err.kind() == ErrorKind::NotFound => Ok(Json::Object(Map::new())),
        Err(err) => Err(ScenarioError::persistence(path, err)),
    }
}

pub fn write_json_file(path: &Path, json: &Json) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|err| ScenarioError::persistence(parent, err))?;
    }
    let mut bytes = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
    let mut serializer = serde_json::Serializer::with_formatter(&mut bytes, formatter);
    json.serialize(&mut serializer)
        .map_err(|err| ScenarioError::persistence(path, err))?;
    bytes.push(b'\n');
    fs::write(path, bytes).map_err(|err| ScenarioError::persistence(path, err))?;
    debug!(path = %path.display(), "wrote registry file");
    Ok(())
}

/// A value to store at `path` in the metadata tree.
#[derive(Clone, Debug, PartialEq)]
pub struct IndexedData {
    pub path: Vec<String>,
    pub data: Json,
}

impl IndexedData {
    pub fn new<S: AsRef<str>>(path: &[S], data: Json) -> Self {
        IndexedData {
            path: path.iter().map(|s| s.as_ref().to_string()).collect(),
            data,
        }
    }
}

/// Registers `contract` in memory under `name` and applies `extra` to the metadata tree.
pub fn store_contract(world: &World, contract: &Contract, name: &str, extra: &[IndexedData]) -> World {
    let named = Contract {
        name: name.to_string(),
        ..contract.clone()
    };
    let mut next = world
        .with_contract(named.clone())
        .with_last_contract(named)
        .set_in(&["Contracts", name], Json::String(contract.address.to_string()));
    for item in extra {
        next = next.set_in(&item.path, item.data.clone());
    }
    next
}

/// Writes the registry entries for `contract` to disk. No-op under dry run.
pub fn save_contract(world: &World, contract: &Contract, name: &str, extra: &[IndexedData]) -> Result<()> {
    if world.dry_run() {
        debug!(name, "dry run, registry untouched");
        return Ok(());
    }
    let dir = world.networks_dir();
    let data_path = network_file(&dir, world.network());
    let abi_path = abi_file(&dir, world.network());
    let mut data = read_json_file(&data_path)?;
    let mut abis = read_json_file(&abi_path)?;
    tree::set_in_place(&mut data, &["Contracts", name], Json::String(contract.address.to_string()));
    for item in extra {
        tree::set_in_place(&mut data, &item.path, item.data.clone());
    }
    let abi = serde_json::to_value(contract.abi.as_ref())
        .map_err(|err| ScenarioError::persistence(&abi_path, err))?;
    tree::set_in_place(&mut abis, &[name], abi);
    write_json_file(&data_path, &data)?;
    write_json_file(&abi_path, &abis)
}

/// Stores and saves a freshly deployed contract along with its constructor
/// arguments and deployment block.
pub fn store_and_save_contract(
    world: &World,
    contract: &Contract,
    name: &str,
    invokation: Option<&Invokation>,
    mut extra: Vec<IndexedData>,
) -> World {
    if let Some(invokation) = invokation {
        let args = invokation.args.iter().map(|arg| arg.to_json()).collect();
        extra.push(IndexedData::new(&["Constructors", name], Json::Array(args)));
        if let Some(block) = invokation.block_number() {
            extra.push(IndexedData::new(&["Blocks", name], Json::from(block)));
        }
    }
    let next = store_contract(world, contract, name, &extra);
    if let Err(err) = save_contract(&next, contract, name, &extra) {
        warn!(name, error = %err, "failed to save contract");
        next.printer().print_error(&err);
    }
    next
}

/// Loads the registry for the world's network, attaching every `Contracts`
/// entry. Returns the world and a `name: address` line per contract.
pub fn load_contracts(world: &World) -> Result<(World, Vec<String>)> {
    let dir = world.networks_dir();
    let data = read_json_file(&network_file(&dir, world.network()))?;
    let abis = read_json_file(&abi_file(&dir, world.network()))?;
    let mut next = world.merge_contract_data(data.clone());
    let mut lines = Vec::new();
    let Some(entries) = tree::get_in(&data, &["Contracts"]).and_then(Json::as_object) else {
        return Ok((next, lines));
    };
    for (name, address) in entries {
        let Some(address) = address.as_str().and_then(|text| text.parse::<Address>().ok()) else {
            warn!(name = %name, "skipping registry entry without an address");
            continue;
        };
        let abi = match abis.get(name) {
            Some(json) => serde_json::from_value::<Abi>(json.clone())
                .map_err(|err| ScenarioError::persistence(abi_file(&dir, world.network()), err))?,
            None => Abi::default(),
        };
        let contract = next.chain().attach(name, address, abi)?;
        lines.push(format!("{name}: {address}"));
        next = next.with_contract(contract);
    }
    debug!(count = lines.len(), network = world.network(), "loaded contracts");
    Ok((next, lines))
}

/// Records `proxy` under `target` with the union of the ABIs registered as
/// `proxy_name` and `implementation`, so calls through the proxy see both
/// surfaces. Each ABI comes from the ABI registry when present, falling back
/// to the compiled artifact or the live handle.
pub fn merge_contract_abi(
    world: &World,
    target: &str,
    proxy: &Contract,
    proxy_name: &str,
    implementation: &Contract,
    extra: Vec<IndexedData>,
) -> Result<World> {
    let proxy_abi = registry_abi(world, proxy_name)
        .or_else(|| world.chain().artifact(proxy_name).ok())
        .unwrap_or_else(|| proxy.abi.as_ref().clone());
    let implementation_abi =
        registry_abi(world, &implementation.name).unwrap_or_else(|| implementation.abi.as_ref().clone());
    let merged = proxy_abi.merge(&implementation_abi);
    let contract = world.chain().attach(target, proxy.address, merged)?;
    let next = world.with_contract(contract.clone()).set_in(
        &["Contracts", target],
        Json::String(proxy.address.to_string()),
    );
    let next = extra
        .iter()
        .fold(next, |acc, item| acc.set_in(&item.path, item.data.clone()));
    if let Err(err) = save_contract(&next, &contract, target, &extra) {
        warn!(target, error = %err, "failed to save merged abi");
        next.printer().print_error(&err);
    }
    Ok(next)
}

fn registry_abi(world: &World, name: &str) -> Option<Abi> {
    let abis = read_json_file(&abi_file(&world.networks_dir(), world.network())).ok()?;
    serde_json::from_value(abis.get(name)?.clone()).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::abi::Fragment;
    use crate::chain::{Chain, MemoryChain};
    use crate::printer::BufferPrinter;
    use serde_json::json;
    use std::rc::Rc;
    use tempfile::tempdir;

    fn world(base: &Path) -> World {
        let chain = Rc::new(MemoryChain::new(2));
        let accounts = chain.accounts().unwrap_or_default();
        World::new("development", base, chain, Rc::new(BufferPrinter::new())).with_accounts(accounts)
    }

    fn token(address: u8) -> Contract {
        Contract::new(
            "StandardToken",
            Address([address; 20]),
            Abi::new(vec![Fragment::function("symbol", &[], &["string"], "view")]),
        )
    }

    #[test]
    fn missing_files_read_as_empty_objects() -> anyhow::Result<()> {
        let dir = tempdir()?;
        assert_eq!(read_json_file(&dir.path().join("nope.json"))?, json!({}));
        Ok(())
    }

    #[test]
    fn corrupt_files_are_persistence_errors() -> anyhow::Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("bad.json");
        fs::write(&path, "{not json")?;
        assert!(matches!(read_json_file(&path), Err(ScenarioError::Persistence { .. })));
        Ok(())
    }

    #[test]
    fn saved_contracts_reload() -> anyhow::Result<()> {
        let dir = tempdir()?;
        let world = world(dir.path());
        let contract = token(1);
        let extra = vec![IndexedData::new(&["Tokens", "ZRX", "symbol"], json!("ZRX"))];
        let stored = store_and_save_contract(&world, &contract, "ZRX", None, extra);
        assert_eq!(stored.contract_address("ZRX"), Some(contract.address));
        assert_eq!(stored.last_contract().map(|c| c.name.as_str()), Some("ZRX"));

        let text = fs::read_to_string(network_file(&world.networks_dir(), "development"))?;
        assert!(text.contains("\n    \"Contracts\": {\n        \"ZRX\""));

        let (loaded, lines) = load_contracts(&world)?;
        assert_eq!(lines, vec![format!("ZRX: {}", contract.address)]);
        let attached = loaded.contract_at(&contract.address).expect("attached");
        assert!(attached.has_method("symbol"));
        assert_eq!(loaded.get_in(&["Tokens", "ZRX", "symbol"]), Some(&json!("ZRX")));
        Ok(())
    }

    #[test]
    fn dry_run_leaves_registry_bytes_identical() -> anyhow::Result<()> {
        let dir = tempdir()?;
        let world = world(dir.path());
        store_and_save_contract(&world, &token(1), "ZRX", None, Vec::new());
        let path = network_file(&world.networks_dir(), "development");
        let before = fs::read(&path)?;

        let dry = world.with_dry_run(true);
        let stored = store_and_save_contract(&dry, &token(2), "BAT", None, Vec::new());
        assert!(stored.contract_address("BAT").is_some());
        assert_eq!(fs::read(&path)?, before);
        let abis = read_json_file(&abi_file(&world.networks_dir(), "development"))?;
        assert!(abis.get("BAT").is_none());
        Ok(())
    }

    #[test]
    fn merged_abi_is_idempotent_on_disk() -> anyhow::Result<()> {
        let dir = tempdir()?;
        let world = world(dir.path());
        let proxy = Contract::new(
            "Unitroller",
            Address([3; 20]),
            Abi::new(vec![Fragment::function("admin", &[], &["address"], "view")]),
        );
        let implementation = Contract::new(
            "ComptrollerG1",
            Address([4; 20]),
            Abi::new(vec![Fragment::function("oracle", &[], &["address"], "view")]),
        );
        let once = merge_contract_abi(&world, "Comptroller", &proxy, "Unitroller", &implementation, Vec::new())?;
        let path = abi_file(&world.networks_dir(), "development");
        let first = fs::read(&path)?;
        let twice = merge_contract_abi(&once, "Comptroller", &proxy, "Unitroller", &implementation, Vec::new())?;
        assert_eq!(fs::read(&path)?, first);

        let merged = twice.contract_at(&proxy.address).expect("merged");
        assert!(merged.has_method("admin") && merged.has_method("oracle"));
        assert_eq!(twice.contract_address("Comptroller"), Some(proxy.address));
        Ok(())
    }
}
