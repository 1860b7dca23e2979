//! The immutable evaluation context threaded through every operation.
//!
//! Every update returns a new [`World`]; the receiver is never modified.
//! Handlers that fail simply drop the worlds they built.

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use serde_json::Value as Json;

use crate::accounts::{account_aliases, resolve_account};
use crate::chain::{Chain, Contract};
use crate::error::{Result, ScenarioError};
use crate::invoke::Invokation;
use crate::macros::Macros;
use crate::printer::Printer;
use crate::settings::Settings;
use crate::tree;
use crate::value::Address;

const LOCAL_NETWORKS: &[&str] = &["development", "test", "hardhat", "localhost", "coverage"];

/// One committed step in the action log.
#[derive(Clone, Debug, PartialEq)]
pub struct Action {
    pub message: String,
    pub invokation: Option<Invokation>,
}

#[derive(Clone)]
pub struct World {
    network: String,
    base_path: PathBuf,
    networks_dir: Option<PathBuf>,
    dry_run: bool,
    verbose: bool,
    accounts: Vec<Address>,
    settings: Settings,
    contract_index: BTreeMap<String, Contract>,
    contract_data: Json,
    actions: Vec<Action>,
    last_contract: Option<Contract>,
    printer: Rc<dyn Printer>,
    chain: Rc<dyn Chain>,
    macros: Rc<Macros>,
}

impl World {
    pub fn new(
        network: impl Into<String>,
        base_path: impl Into<PathBuf>,
        chain: Rc<dyn Chain>,
        printer: Rc<dyn Printer>,
    ) -> Self {
        World {
            network: network.into(),
            base_path: base_path.into(),
            networks_dir: None,
            dry_run: false,
            verbose: false,
            accounts: Vec::new(),
            settings: Settings::default(),
            contract_index: BTreeMap::new(),
            contract_data: Json::Object(serde_json::Map::new()),
            actions: Vec::new(),
            last_contract: None,
            printer,
            chain,
            macros: Rc::new(Macros::default()),
        }
    }

    pub fn network(&self) -> &str {
        &self.network
    }

    pub fn is_local_network(&self) -> bool {
        LOCAL_NETWORKS.contains(&self.network.as_str())
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    /// Directory holding the registry files, `<base_path>/networks` unless overridden.
    pub fn networks_dir(&self) -> PathBuf {
        self.networks_dir
            .clone()
            .unwrap_or_else(|| self.base_path.join("networks"))
    }

    pub fn dry_run(&self) -> bool {
        self.dry_run
    }

    pub fn verbose(&self) -> bool {
        self.verbose
    }

    pub fn accounts(&self) -> &[Address] {
        &self.accounts
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn contract_data(&self) -> &Json {
        &self.contract_data
    }

    pub fn actions(&self) -> &[Action] {
        &self.actions
    }

    pub fn last_contract(&self) -> Option<&Contract> {
        self.last_contract.as_ref()
    }

    pub fn printer(&self) -> &dyn Printer {
        self.printer.as_ref()
    }

    pub fn chain(&self) -> &dyn Chain {
        self.chain.as_ref()
    }

    pub fn macros(&self) -> &Macros {
        &self.macros
    }

    pub fn contracts(&self) -> impl Iterator<Item = &Contract> {
        self.contract_index.values()
    }

    pub fn contract_at(&self, address: &Address) -> Option<&Contract> {
        self.contract_index.get(&address.key())
    }

    pub fn get_in<S: AsRef<str>>(&self, path: &[S]) -> Option<&Json> {
        tree::get_in(&self.contract_data, path)
    }

    /// Address stored under `Contracts.<name>`.
    pub fn contract_address(&self, name: &str) -> Option<Address> {
        self.get_in(&["Contracts", name])?.as_str()?.parse().ok()
    }

    /// Sender used when a line does not say `From <user>`.
    pub fn default_from(&self) -> Address {
        self.settings
            .from
            .or_else(|| self.accounts.first().copied())
            .unwrap_or(Address::ZERO)
    }

    /// Resolves a user alias: settings aliases first, then positional account aliases.
    pub fn lookup_user(&self, alias: &str) -> Option<Address> {
        self.settings
            .lookup_alias(alias)
            .or_else(|| resolve_account(&self.accounts, alias))
    }

    /// `Geoff (0x…)`, or the bare address when it has no alias.
    pub fn describe_user(&self, address: &Address) -> String {
        let alias = self
            .settings
            .lookup_aliases(address)
            .into_iter()
            .next()
            .or_else(|| {
                let index = self.accounts.iter().position(|a| a == address)?;
                account_aliases(index).first().map(|s| s.to_string())
            });
        match alias {
            Some(alias) => format!("{alias} ({address})"),
            None => address.to_string(),
        }
    }

    pub fn set_in<S: AsRef<str>>(&self, path: &[S], value: Json) -> World {
        let mut next = self.clone();
        tree::set_in_place(&mut next.contract_data, path, value);
        next
    }

    /// Replaces the value at `path` with `f(current)`.
    pub fn update_in<S, F>(&self, path: &[S], f: F) -> World
    where
        S: AsRef<str>,
        F: FnOnce(Option<&Json>) -> Json,
    {
        let value = f(self.get_in(path));
        self.set_in(path, value)
    }

    pub fn merge_contract_data(&self, other: Json) -> World {
        let mut next = self.clone();
        tree::merge_deep(&mut next.contract_data, other);
        next
    }

    pub fn with_contract(&self, contract: Contract) -> World {
        let mut next = self.clone();
        next.contract_index.insert(contract.address.key(), contract);
        next
    }

    pub fn with_last_contract(&self, contract: Contract) -> World {
        let mut next = self.clone();
        next.last_contract = Some(contract);
        next
    }

    pub fn with_accounts(&self, accounts: Vec<Address>) -> World {
        World {
            accounts,
            ..self.clone()
        }
    }

    pub fn with_settings(&self, settings: Settings) -> World {
        World {
            settings,
            ..self.clone()
        }
    }

    pub fn with_networks_dir(&self, dir: impl Into<PathBuf>) -> World {
        World {
            networks_dir: Some(dir.into()),
            ..self.clone()
        }
    }

    pub fn with_dry_run(&self, dry_run: bool) -> World {
        World {
            dry_run,
            ..self.clone()
        }
    }

    pub fn with_verbose(&self, verbose: bool) -> World {
        World {
            verbose,
            ..self.clone()
        }
    }

    pub fn with_macros(&self, macros: Macros) -> World {
        World {
            macros: Rc::new(macros),
            ..self.clone()
        }
    }

    pub fn with_printer(&self, printer: Rc<dyn Printer>) -> World {
        World {
            printer,
            ..self.clone()
        }
    }

    /// Appends to the action log and prints the message.
    pub fn add_action(&self, message: impl Into<String>, invokation: Option<Invokation>) -> World {
        let message = message.into();
        self.printer.print_action(&message);
        let mut next = self.clone();
        next.actions.push(Action {
            message,
            invokation,
        });
        next
    }

    pub fn require_contract_at(&self, address: &Address, what: &str) -> Result<Contract> {
        self.contract_at(address)
            .cloned()
            .ok_or_else(|| ScenarioError::mismatch(what, "unknown address", address))
    }
}

impl PartialEq for World {
    fn eq(&self, other: &Self) -> bool {
        self.network == other.network
            && self.base_path == other.base_path
            && self.networks_dir == other.networks_dir
            && self.dry_run == other.dry_run
            && self.verbose == other.verbose
            && self.accounts == other.accounts
            && self.settings == other.settings
            && self.contract_index == other.contract_index
            && self.contract_data == other.contract_data
            && self.actions == other.actions
            && self.last_contract == other.last_contract
            && self.macros == other.macros
    }
}

impl fmt::Debug for World {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("World")
            .field("network", &self.network)
            .field("dry_run", &self.dry_run)
            .field("accounts", &self.accounts.len())
            .field("contracts", &self.contract_index.len())
            .field("actions", &self.actions.len())
            .field("last_contract", &self.last_contract.as_ref().map(|c| &c.name))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::abi::Abi;
    use crate::chain::MemoryChain;
    use crate::printer::BufferPrinter;
    use serde_json::json;

    fn world() -> World {
        let chain = Rc::new(MemoryChain::new(3));
        let accounts = chain.accounts().unwrap_or_default();
        World::new("development", "/tmp/scenario", chain, Rc::new(BufferPrinter::new()))
            .with_accounts(accounts)
    }

    #[test]
    fn updates_return_new_worlds() {
        let before = world();
        let after = before.set_in(&["Tokens", "ZRX", "decimals"], json!(18));
        assert_eq!(before.get_in(&["Tokens", "ZRX"]), None);
        assert_eq!(after.get_in(&["Tokens", "ZRX", "decimals"]), Some(&json!(18)));
        assert_ne!(before, after);
    }

    #[test]
    fn update_in_sees_current_value() {
        let world = world().set_in(&["Blocks", "ZRX"], json!(1));
        let bumped = world.update_in(&["Blocks", "ZRX"], |old| {
            json!(old.and_then(Json::as_u64).unwrap_or(0) + 1)
        });
        assert_eq!(bumped.get_in(&["Blocks", "ZRX"]), Some(&json!(2)));
    }

    #[test]
    fn contract_index_is_keyed_by_lowercase_address() -> Result<()> {
        let address: Address = "0xE41D2489571D322189246DAFA5EBDE1F4699F498".parse()?;
        let world = world().with_contract(Contract::new("ZRX", address, Abi::default()));
        assert_eq!(world.contract_at(&address).map(|c| c.name.as_str()), Some("ZRX"));
        Ok(())
    }

    #[test]
    fn users_resolve_through_settings_then_accounts() {
        let world = world();
        let geoff = world.accounts()[2];
        assert_eq!(world.lookup_user("geoff"), Some(geoff));
        assert_eq!(world.describe_user(&geoff), format!("Geoff ({geoff})"));
        let oracle = Address([9; 20]);
        let world = world.with_settings(world.settings().with_alias("Oracle", oracle));
        assert_eq!(world.lookup_user("Oracle"), Some(oracle));
        assert_eq!(world.describe_user(&oracle), format!("Oracle ({oracle})"));
        assert_eq!(world.default_from(), world.accounts()[0]);
    }

    #[test]
    fn actions_are_logged_and_printed() {
        let printer = Rc::new(BufferPrinter::new());
        let world = world().with_printer(printer.clone());
        let world = world.add_action("Added thing", None);
        assert_eq!(world.actions().len(), 1);
        assert!(printer.contains("Action: Added thing"));
    }

    #[test]
    fn local_networks() {
        assert!(world().is_local_network());
        let chain = Rc::new(MemoryChain::new(0));
        let mainnet = World::new("mainnet", ".", chain, Rc::new(BufferPrinter::new()));
        assert!(!mainnet.is_local_network());
    }
}
