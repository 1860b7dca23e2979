//! The chain collaborator: account listing, contract attachment, transaction
//! population and sending, read-only calls and receipts.
//!
//! [`MemoryChain`] is a deterministic in-process implementation used by the CLI's
//! development mode and by tests. Contract state is a table of view results;
//! sends update that table with a handful of conventions (`_setFoo(x)` stores the
//! `foo`/`fooMantissa` getter, ERC-20 balance bookkeeping, unitroller upgrades).

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;

use num_bigint::BigInt;
use num_traits::Zero;
use thiserror::Error;
use tracing::{debug, trace};

use crate::abi::Abi;
use crate::artifacts;
use crate::error::ScenarioError;
use crate::hash;
use crate::value::{Address, Token};

#[derive(Debug, Error)]
pub enum ChainError {
    #[error("unknown artifact `{0}`")]
    UnknownArtifact(String),
    #[error("contract `{contract}` has no method `{method}`")]
    UnknownMethod { contract: String, method: String },
    #[error("`{method}` expects {expected} argument(s), got {found}")]
    ArgumentCount {
        method: String,
        expected: usize,
        found: usize,
    },
    #[error("unknown transaction {0}")]
    UnknownTransaction(TxHash),
    #[error("no contract at {0}")]
    NoContract(Address),
    #[error("{0}")]
    Provider(String),
}

impl From<ChainError> for ScenarioError {
    fn from(err: ChainError) -> Self {
        ScenarioError::handler("chain", err.to_string())
    }
}

/// A live handle: an address with the ABI used to talk to it.
#[derive(Clone, Debug, PartialEq)]
pub struct Contract {
    pub name: String,
    pub address: Address,
    pub abi: Rc<Abi>,
}

impl Contract {
    pub fn new(name: impl Into<String>, address: Address, abi: Abi) -> Self {
        Contract {
            name: name.into(),
            address,
            abi: Rc::new(abi),
        }
    }

    pub fn has_method(&self, method: &str) -> bool {
        self.abi.has_function(method)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TxHash(pub [u8; 32]);

impl fmt::Display for TxHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

/// A populated, unsigned transaction. `to == None` deploys `artifact`.
#[derive(Clone, Debug, PartialEq)]
pub struct Transaction {
    pub to: Option<Address>,
    pub artifact: Option<String>,
    pub method: String,
    pub args: Vec<Token>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Receipt {
    pub tx_hash: TxHash,
    pub block_number: u64,
    pub status: bool,
    pub contract_address: Option<Address>,
    pub revert_reason: Option<String>,
}

pub trait Chain {
    fn accounts(&self) -> Result<Vec<Address>, ChainError>;
    fn artifact(&self, name: &str) -> Result<Abi, ChainError>;
    fn attach(&self, name: &str, address: Address, abi: Abi) -> Result<Contract, ChainError>;
    fn populate(
        &self,
        contract: &Contract,
        method: &str,
        args: &[Token],
    ) -> Result<Transaction, ChainError>;
    fn populate_deploy(&self, artifact: &str, args: &[Token]) -> Result<Transaction, ChainError>;
    fn send(&self, from: Address, tx: Transaction) -> Result<TxHash, ChainError>;
    fn receipt(&self, hash: &TxHash) -> Result<Receipt, ChainError>;
    fn call(&self, contract: &Contract, method: &str, args: &[Token]) -> Result<Token, ChainError>;
}

#[derive(Clone, Debug, PartialEq)]
pub struct SentTransaction {
    pub from: Address,
    pub tx: Transaction,
    pub hash: TxHash,
}

#[derive(Debug, Default)]
struct Deployed {
    views: BTreeMap<String, Token>,
}

#[derive(Debug, Default)]
struct ChainState {
    accounts: Vec<Address>,
    block_number: u64,
    nonce: u64,
    contracts: BTreeMap<Address, Deployed>,
    receipts: BTreeMap<TxHash, Receipt>,
    reverts: BTreeMap<(Address, String), String>,
    journal: Vec<SentTransaction>,
}

#[derive(Debug, Default)]
pub struct MemoryChain {
    state: RefCell<ChainState>,
}

impl MemoryChain {
    pub fn new(account_count: usize) -> Self {
        let accounts = (0..account_count as u64)
            .map(|index| hash::derive_address(&[b"account".as_slice(), &index.to_be_bytes()]))
            .collect();
        MemoryChain {
            state: RefCell::new(ChainState {
                accounts,
                ..ChainState::default()
            }),
        }
    }

    /// Fixes the result of `method(args)` on `address`.
    pub fn set_view(&self, address: Address, method: &str, args: &[Token], value: Token) {
        let mut state = self.state.borrow_mut();
        state
            .contracts
            .entry(address)
            .or_default()
            .views
            .insert(view_key(method, args), value);
    }

    /// Makes every later send of `method` to `address` revert with `reason`.
    pub fn revert_on(&self, address: Address, method: &str, reason: &str) {
        self.state
            .borrow_mut()
            .reverts
            .insert((address, method.to_string()), reason.to_string());
    }

    pub fn sent(&self) -> Vec<SentTransaction> {
        self.state.borrow().journal.clone()
    }

    pub fn block_number(&self) -> u64 {
        self.state.borrow().block_number
    }
}

impl Chain for MemoryChain {
    fn accounts(&self) -> Result<Vec<Address>, ChainError> {
        Ok(self.state.borrow().accounts.clone())
    }

    fn artifact(&self, name: &str) -> Result<Abi, ChainError> {
        artifacts::artifact(name)
            .cloned()
            .ok_or_else(|| ChainError::UnknownArtifact(name.to_string()))
    }

    fn attach(&self, name: &str, address: Address, abi: Abi) -> Result<Contract, ChainError> {
        self.state.borrow_mut().contracts.entry(address).or_default();
        Ok(Contract::new(name, address, abi))
    }

    fn populate(
        &self,
        contract: &Contract,
        method: &str,
        args: &[Token],
    ) -> Result<Transaction, ChainError> {
        let fragment = contract
            .abi
            .function(method)
            .ok_or_else(|| ChainError::UnknownMethod {
                contract: contract.name.clone(),
                method: method.to_string(),
            })?;
        check_arity(method, fragment.inputs.len(), args.len())?;
        Ok(Transaction {
            to: Some(contract.address),
            artifact: None,
            method: method.to_string(),
            args: args.to_vec(),
        })
    }

    fn populate_deploy(&self, artifact: &str, args: &[Token]) -> Result<Transaction, ChainError> {
        let abi = self.artifact(artifact)?;
        let expected = abi.constructor().map_or(0, |c| c.inputs.len());
        check_arity("constructor", expected, args.len())?;
        Ok(Transaction {
            to: None,
            artifact: Some(artifact.to_string()),
            method: "constructor".to_string(),
            args: args.to_vec(),
        })
    }

    fn send(&self, from: Address, tx: Transaction) -> Result<TxHash, ChainError> {
        let mut state = self.state.borrow_mut();
        state.nonce += 1;
        state.block_number += 1;
        let nonce = state.nonce;
        let hash = TxHash(hash::compute(&[b"tx".as_slice(), &nonce.to_be_bytes(), tx.method.as_bytes()]));
        let outcome = match (&tx.to, &tx.artifact) {
            (None, Some(artifact)) => state.deploy(from, nonce, artifact, &tx.args).map(Some),
            (Some(to), _) => state.execute(from, *to, &tx.method, &tx.args).map(|_| None),
            (None, None) => Err("transaction has neither target nor artifact".to_string()),
        };
        debug!(%hash, method = %tx.method, ok = outcome.is_ok(), "memory chain send");
        let receipt = Receipt {
            tx_hash: hash,
            block_number: state.block_number,
            status: outcome.is_ok(),
            contract_address: outcome.as_ref().ok().copied().flatten(),
            revert_reason: outcome.err(),
        };
        state.receipts.insert(hash, receipt);
        state.journal.push(SentTransaction { from, tx, hash });
        Ok(hash)
    }

    fn receipt(&self, hash: &TxHash) -> Result<Receipt, ChainError> {
        self.state
            .borrow()
            .receipts
            .get(hash)
            .cloned()
            .ok_or(ChainError::UnknownTransaction(*hash))
    }

    fn call(&self, contract: &Contract, method: &str, args: &[Token]) -> Result<Token, ChainError> {
        let fragment = contract
            .abi
            .function(method)
            .ok_or_else(|| ChainError::UnknownMethod {
                contract: contract.name.clone(),
                method: method.to_string(),
            })?;
        check_arity(method, fragment.inputs.len(), args.len())?;
        let state = self.state.borrow();
        let deployed = state
            .contracts
            .get(&contract.address)
            .ok_or(ChainError::NoContract(contract.address))?;
        let key = view_key(method, args);
        trace!(address = %contract.address, %key, "memory chain call");
        Ok(deployed.views.get(&key).cloned().unwrap_or_else(|| {
            fragment
                .outputs
                .first()
                .map_or(Token::Bool(false), |out| zero_token(&out.ty))
        }))
    }
}

impl ChainState {
    fn deploy(
        &mut self,
        from: Address,
        nonce: u64,
        artifact: &str,
        args: &[Token],
    ) -> Result<Address, String> {
        let abi = artifacts::artifact(artifact).ok_or_else(|| format!("unknown artifact `{artifact}`"))?;
        let address = hash::derive_address(&[b"contract".as_slice(), &from.0, &nonce.to_be_bytes()]);
        let mut deployed = Deployed::default();
        deployed.views.insert("admin".to_string(), Token::Address(from));
        if let Some(constructor) = abi.constructor() {
            for (param, value) in constructor.inputs.iter().zip(args) {
                if abi.has_function(&param.name) {
                    deployed.views.insert(param.name.clone(), value.clone());
                }
            }
        }
        self.contracts.insert(address, deployed);
        Ok(address)
    }

    fn execute(
        &mut self,
        from: Address,
        to: Address,
        method: &str,
        args: &[Token],
    ) -> Result<(), String> {
        if let Some(reason) = self.reverts.get(&(to, method.to_string())) {
            return Err(reason.clone());
        }
        if !self.contracts.contains_key(&to) {
            return Err(format!("no contract at {to}"));
        }
        match (method, args) {
            ("allocateTo", [Token::Address(owner), Token::Uint(amount)]) => {
                self.credit(to, *owner, amount);
                let supply = self.uint(to, "totalSupply", &[]) + amount;
                self.set(to, "totalSupply", &[], Token::Uint(supply));
            }
            ("transfer", [Token::Address(dst), Token::Uint(amount)]) => {
                self.move_balance(to, from, *dst, amount)?;
            }
            ("transferFrom", [Token::Address(src), Token::Address(dst), Token::Uint(amount)]) => {
                self.move_balance(to, *src, *dst, amount)?;
            }
            ("approve", [Token::Address(spender), amount]) => {
                let key = [Token::Address(from), Token::Address(*spender)];
                self.set(to, "allowance", &key, amount.clone());
            }
            ("setFail", [flag]) => self.set(to, "failing", &[], flag.clone()),
            ("pause", []) => self.set(to, "paused", &[], Token::Bool(true)),
            ("unpause", []) => self.set(to, "paused", &[], Token::Bool(false)),
            ("_supportMarket", [market]) => {
                self.set(to, "isListed", std::slice::from_ref(market), Token::Bool(true));
            }
            ("_setPriceOracle", [oracle]) => self.set(to, "oracle", &[], oracle.clone()),
            ("_acceptAdmin", []) => {
                let pending = self.view(to, "pendingAdmin", &[]).unwrap_or(Token::Address(Address::ZERO));
                self.set(to, "admin", &[], pending);
                self.set(to, "pendingAdmin", &[], Token::Address(Address::ZERO));
            }
            ("_acceptImplementation", []) => self.accept_implementation(to, from)?,
            ("_become", [Token::Address(unitroller), rest @ ..]) => {
                self.accept_implementation(*unitroller, to)?;
                let fields = ["oracle", "closeFactorMantissa", "maxAssets"];
                if rest.len() == 4 {
                    for (field, value) in fields.iter().zip(rest) {
                        self.set(*unitroller, field, &[], value.clone());
                    }
                }
            }
            (setter, [keys @ .., value]) if setter.starts_with("_set") => {
                let field = lower_first(&setter["_set".len()..]);
                let keys = keys.to_vec();
                let mantissa = format!("{field}Mantissa");
                let target = if self.has_view(to, &mantissa) { mantissa } else { field };
                self.set(to, &target, &keys, value.clone());
            }
            _ => {}
        }
        Ok(())
    }

    fn accept_implementation(&mut self, unitroller: Address, candidate: Address) -> Result<(), String> {
        let pending = self.view(unitroller, "pendingImplementation", &[]);
        if pending != Some(Token::Address(candidate)) {
            return Err(format!("{candidate} is not the pending implementation"));
        }
        self.set(unitroller, "implementation", &[], Token::Address(candidate));
        self.set(
            unitroller,
            "pendingImplementation",
            &[],
            Token::Address(Address::ZERO),
        );
        Ok(())
    }

    fn move_balance(
        &mut self,
        token: Address,
        src: Address,
        dst: Address,
        amount: &BigInt,
    ) -> Result<(), String> {
        if self.view(token, "failing", &[]) == Some(Token::Bool(true)) {
            return Err("token transfer failure".to_string());
        }
        let balance = self.uint(token, "balanceOf", &[Token::Address(src)]);
        if &balance < amount {
            return Err("insufficient balance".to_string());
        }
        self.set(token, "balanceOf", &[Token::Address(src)], Token::Uint(balance - amount));
        self.credit(token, dst, amount);
        Ok(())
    }

    fn credit(&mut self, token: Address, owner: Address, amount: &BigInt) {
        let key = [Token::Address(owner)];
        let balance = self.uint(token, "balanceOf", &key) + amount;
        self.set(token, "balanceOf", &key, Token::Uint(balance));
    }

    fn uint(&self, address: Address, method: &str, args: &[Token]) -> BigInt {
        match self.view(address, method, args) {
            Some(Token::Uint(value)) => value,
            _ => BigInt::zero(),
        }
    }

    fn view(&self, address: Address, method: &str, args: &[Token]) -> Option<Token> {
        self.contracts
            .get(&address)?
            .views
            .get(&view_key(method, args))
            .cloned()
    }

    fn has_view(&self, address: Address, method: &str) -> bool {
        self.contracts
            .get(&address)
            .is_some_and(|deployed| deployed.views.contains_key(method))
            || artifacts::artifact_names()
                .filter_map(artifacts::artifact)
                .any(|abi| abi.function(method).is_some_and(|f| f.is_view()))
    }

    fn set(&mut self, address: Address, method: &str, args: &[Token], value: Token) {
        self.contracts
            .entry(address)
            .or_default()
            .views
            .insert(view_key(method, args), value);
    }
}

fn view_key(method: &str, args: &[Token]) -> String {
    if args.is_empty() {
        return method.to_string();
    }
    let parts: Vec<String> = args.iter().map(Token::to_string).collect();
    format!("{method}({})", parts.join(","))
}

fn check_arity(method: &str, expected: usize, found: usize) -> Result<(), ChainError> {
    if expected != found {
        return Err(ChainError::ArgumentCount {
            method: method.to_string(),
            expected,
            found,
        });
    }
    Ok(())
}

fn zero_token(ty: &str) -> Token {
    match ty {
        "address" => Token::Address(Address::ZERO),
        "bool" => Token::Bool(false),
        "string" => Token::String(String::new()),
        t if t.ends_with("[]") => Token::Array(Vec::new()),
        t if t.starts_with("int") => Token::Int(BigInt::zero()),
        _ => Token::Uint(BigInt::zero()),
    }
}

fn lower_first(text: &str) -> String {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) => first.to_lowercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn deploy(chain: &MemoryChain, from: Address, artifact: &str, args: &[Token]) -> anyhow::Result<Contract> {
        let tx = chain.populate_deploy(artifact, args)?;
        let hash = chain.send(from, tx)?;
        let receipt = chain.receipt(&hash)?;
        let address = receipt
            .contract_address
            .ok_or_else(|| anyhow::anyhow!("no contract address"))?;
        Ok(chain.attach(artifact, address, chain.artifact(artifact)?)?)
    }

    fn token_args() -> Vec<Token> {
        vec![
            Token::uint(0),
            Token::String("0x Protocol Token".into()),
            Token::uint(18),
            Token::String("ZRX".into()),
        ]
    }

    #[test]
    fn accounts_and_deploys_are_deterministic() -> anyhow::Result<()> {
        let a = MemoryChain::new(3);
        let b = MemoryChain::new(3);
        assert_eq!(a.accounts()?, b.accounts()?);
        let from = a.accounts()?[0];
        let first = deploy(&a, from, "StandardToken", &token_args())?;
        let second = deploy(&b, from, "StandardToken", &token_args())?;
        assert_eq!(first.address, second.address);
        Ok(())
    }

    #[test]
    fn constructor_args_become_views() -> anyhow::Result<()> {
        let chain = MemoryChain::new(1);
        let from = chain.accounts()?[0];
        let token = deploy(&chain, from, "StandardToken", &token_args())?;
        assert_eq!(chain.call(&token, "symbol", &[])?, Token::String("ZRX".into()));
        assert_eq!(chain.call(&token, "admin", &[])?, Token::Address(from));
        assert_eq!(chain.call(&token, "totalSupply", &[])?, Token::uint(0));
        Ok(())
    }

    #[test]
    fn balances_move_and_overdrafts_revert() -> anyhow::Result<()> {
        let chain = MemoryChain::new(2);
        let accounts = chain.accounts()?;
        let token = deploy(&chain, accounts[0], "StandardToken", &token_args())?;
        let faucet = chain.populate(&token, "allocateTo", &[Token::Address(accounts[0]), Token::uint(100)])?;
        chain.send(accounts[0], faucet)?;
        let transfer = chain.populate(&token, "transfer", &[Token::Address(accounts[1]), Token::uint(40)])?;
        let hash = chain.send(accounts[0], transfer)?;
        assert!(chain.receipt(&hash)?.status);
        assert_eq!(
            chain.call(&token, "balanceOf", &[Token::Address(accounts[1])])?,
            Token::uint(40)
        );
        let too_much = chain.populate(&token, "transfer", &[Token::Address(accounts[1]), Token::uint(61)])?;
        let hash = chain.send(accounts[0], too_much)?;
        let receipt = chain.receipt(&hash)?;
        assert!(!receipt.status);
        assert_eq!(receipt.revert_reason.as_deref(), Some("insufficient balance"));
        Ok(())
    }

    #[test]
    fn setters_update_matching_getters() -> anyhow::Result<()> {
        let chain = MemoryChain::new(1);
        let from = chain.accounts()?[0];
        let comptroller = deploy(&chain, from, "ComptrollerG1", &[])?;
        let tx = chain.populate(&comptroller, "_setCloseFactor", &[Token::uint(5)])?;
        chain.send(from, tx)?;
        assert_eq!(chain.call(&comptroller, "closeFactorMantissa", &[])?, Token::uint(5));
        let tx = chain.populate(&comptroller, "_setMaxAssets", &[Token::uint(20)])?;
        chain.send(from, tx)?;
        assert_eq!(chain.call(&comptroller, "maxAssets", &[])?, Token::uint(20));
        Ok(())
    }

    #[test]
    fn scripted_reverts_fail_the_receipt() -> anyhow::Result<()> {
        let chain = MemoryChain::new(1);
        let from = chain.accounts()?[0];
        let token = deploy(&chain, from, "StandardToken", &token_args())?;
        chain.revert_on(token.address, "approve", "paused");
        let tx = chain.populate(&token, "approve", &[Token::Address(from), Token::uint(1)])?;
        let hash = chain.send(from, tx)?;
        assert_eq!(chain.receipt(&hash)?.revert_reason.as_deref(), Some("paused"));
        assert_eq!(chain.sent().len(), 2);
        Ok(())
    }

    #[test]
    fn populate_checks_method_and_arity() -> anyhow::Result<()> {
        let chain = MemoryChain::new(1);
        let from = chain.accounts()?[0];
        let token = deploy(&chain, from, "StandardToken", &token_args())?;
        assert!(matches!(
            chain.populate(&token, "mint", &[]),
            Err(ChainError::UnknownMethod { .. })
        ));
        assert!(matches!(
            chain.populate(&token, "approve", &[]),
            Err(ChainError::ArgumentCount { expected: 2, found: 0, .. })
        ));
        Ok(())
    }
}
