//! Chain interactions recorded as [`Invokation`]s.

use tracing::{debug, info};

use crate::chain::{Contract, Receipt, TxHash};
use crate::error::{Result, ScenarioError};
use crate::hash;
use crate::value::{Address, Token};
use crate::world::World;

/// Record of one transaction: what was sent and what came back.
#[derive(Clone, Debug, PartialEq)]
pub struct Invokation {
    pub method: String,
    pub args: Vec<Token>,
    pub tx_hash: Option<TxHash>,
    pub receipt: Option<Receipt>,
    pub contract: Option<Contract>,
}

impl Invokation {
    fn placeholder(method: &str, args: Vec<Token>, contract: Option<Contract>) -> Self {
        Invokation {
            method: method.to_string(),
            args,
            tx_hash: None,
            receipt: None,
            contract,
        }
    }

    pub fn block_number(&self) -> Option<u64> {
        self.receipt.as_ref().map(|r| r.block_number)
    }
}

/// Sends `method(args)` to `contract` from `from` and waits for the receipt.
///
/// Under dry run nothing is sent; a placeholder is printed and returned.
/// A reverted receipt is a handler failure.
pub fn invoke(
    world: &World,
    from: Address,
    contract: &Contract,
    method: &str,
    args: Vec<Token>,
) -> Result<Invokation> {
    if !contract.has_method(method) {
        return Err(ScenarioError::handler(
            method,
            format!("contract `{}` has no method `{method}`", contract.name),
        ));
    }
    if world.dry_run() {
        world
            .printer()
            .print_line(&format!("Dry run: invoking `{}.{method}`", contract.name));
        info!(contract = %contract.name, method, "dry run, skipping send");
        return Ok(Invokation::placeholder(method, args, None));
    }
    let chain = world.chain();
    let tx = chain.populate(contract, method, &args)?;
    let receipt = send_and_wait(world, from, tx)?;
    if !receipt.status {
        return Err(ScenarioError::handler(
            method,
            format!(
                "{}.{method} reverted: {}",
                contract.name,
                receipt.revert_reason.as_deref().unwrap_or("no reason")
            ),
        ));
    }
    debug!(contract = %contract.name, method, block = receipt.block_number, "invoked");
    Ok(Invokation {
        method: method.to_string(),
        args,
        tx_hash: Some(receipt.tx_hash),
        receipt: Some(receipt),
        contract: None,
    })
}

/// Deploys `artifact` and attaches it under `name`.
///
/// Under dry run the artifact is attached at a placeholder address derived
/// from the artifact and name, and nothing is sent.
pub fn deploy(
    world: &World,
    from: Address,
    artifact: &str,
    name: &str,
    args: Vec<Token>,
) -> Result<(Contract, Invokation)> {
    let chain = world.chain();
    let abi = chain.artifact(artifact)?;
    if world.dry_run() {
        let address = hash::derive_address(&[b"dry-run".as_slice(), artifact.as_bytes(), name.as_bytes()]);
        world
            .printer()
            .print_line(&format!("Dry run: deploying {artifact} as {name}"));
        info!(artifact, name, %address, "dry run, placeholder deploy");
        let contract = chain.attach(name, address, abi)?;
        let invokation = Invokation::placeholder("constructor", args, Some(contract.clone()));
        return Ok((contract, invokation));
    }
    let tx = chain.populate_deploy(artifact, &args)?;
    let receipt = send_and_wait(world, from, tx)?;
    let address = match (receipt.status, receipt.contract_address) {
        (true, Some(address)) => address,
        _ => {
            return Err(ScenarioError::handler(
                "deploy",
                format!(
                    "{artifact} deployment failed: {}",
                    receipt.revert_reason.as_deref().unwrap_or("no contract address")
                ),
            ));
        }
    };
    let contract = chain.attach(name, address, abi)?;
    info!(artifact, name, %address, "deployed");
    Ok((
        contract.clone(),
        Invokation {
            method: "constructor".to_string(),
            args,
            tx_hash: Some(receipt.tx_hash),
            receipt: Some(receipt),
            contract: Some(contract),
        },
    ))
}

/// Read-only call returning the decoded token.
pub fn call(world: &World, contract: &Contract, method: &str, args: &[Token]) -> Result<Token> {
    Ok(world.chain().call(contract, method, args)?)
}

fn send_and_wait(world: &World, from: Address, tx: crate::chain::Transaction) -> Result<Receipt> {
    let chain = world.chain();
    let hash = chain.send(from, tx)?;
    Ok(chain.receipt(&hash)?)
}
