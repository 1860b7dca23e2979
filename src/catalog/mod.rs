//! Declarative candidate tables for each contract noun, plus the helpers they share.

pub mod comptroller;
pub mod comptroller_impl;
pub mod ctoken;
pub mod erc20;
pub mod unitroller;

use crate::chain::Contract;
use crate::command::Arg;
use crate::core_value::get_event_v;
use crate::error::{Result, ScenarioError};
use crate::event::Event;
use crate::invoke::{call, invoke};
use crate::number::{EXP_SCALE, Number};
use crate::value::{Address, Token, Value};
use crate::world::World;

/// The rest of the line as one event; empty when nothing follows.
pub(crate) fn params_arg() -> Arg {
    Arg::new("params", get_event_v)
        .variadic()
        .default(Event::List(Vec::new()))
}

/// Sends `method` and records `message` in the action log.
pub(crate) fn invoke_action(
    world: &World,
    from: Address,
    contract: &Contract,
    method: &str,
    args: Vec<Token>,
    message: String,
) -> Result<World> {
    let invokation = invoke(world, from, contract, method, args)?;
    Ok(world.add_action(message, Some(invokation)))
}

pub(crate) fn read_view(world: &World, contract: &Contract, method: &str, args: &[Token]) -> Result<Value> {
    Ok(call(world, contract, method, args)?.into_value())
}

/// Reads a 1e18-scaled mantissa back as a decimal.
pub(crate) fn read_exp(world: &World, contract: &Contract, method: &str, args: &[Token]) -> Result<Value> {
    match call(world, contract, method, args)? {
        Token::Uint(mantissa) | Token::Int(mantissa) => {
            Ok(Value::Number(Number::from_encoded(mantissa, EXP_SCALE)))
        }
        other => Err(ScenarioError::mismatch("Number", other.to_string(), method)),
    }
}

pub(crate) fn uint(number: &Number) -> Token {
    Token::Uint(number.encode())
}

pub(crate) fn small_uint(number: &Number, what: &str) -> Result<u64> {
    number
        .to_u64()
        .ok_or_else(|| ScenarioError::mismatch(format!("whole number for {what}"), number.show(), number))
}

pub(crate) fn addresses(contracts: &[Contract]) -> Token {
    Token::Array(contracts.iter().map(|c| Token::Address(c.address)).collect())
}
