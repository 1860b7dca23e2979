//! Event to [`Value`] resolution and the typed accessors built on it.
//!
//! A bare atom resolves as a number, then a `0x` address, then a user alias,
//! then a registered contract name, and otherwise stays a string. A list whose
//! head names a value fetcher (`Exp`, `Erc20`, `LastContract`, ...) runs that
//! fetcher; any other list resolves its children.

use crate::catalog::{comptroller, comptroller_impl, ctoken, erc20, unitroller};
use crate::command::{Arg, Fetcher, get_fetcher_value};
use crate::error::{Result, ScenarioError};
use crate::event::Event;
use crate::number::{EXP_SCALE, Number};
use crate::value::{Address, Value};
use crate::world::World;

pub fn get_core_value(world: &World, event: &Event) -> Result<Value> {
    get_fetcher_value("CoreValue", &core_fetchers(), world, event)
}

fn core_fetchers() -> Vec<Fetcher<Value>> {
    vec![
        Fetcher::new(
            "Exp",
            "Number scaled by 1e18: Exp 0.5",
            vec![Arg::new("value", get_number_v)],
            |_, args| Ok(Value::Number(args.get::<Number>("value")?.with_scale(EXP_SCALE))),
        ),
        Fetcher::new(
            "Exactly",
            "Number passed through unscaled: Exactly 1e18",
            vec![Arg::new("value", get_number_v)],
            |_, args| Ok(Value::Number(args.get::<Number>("value")?.with_scale(0))),
        ),
        Fetcher::new(
            "Percent",
            "Percentage scaled by 1e18: Percent 5",
            vec![Arg::new("value", get_number_v)],
            |_, args| {
                let number = args.get::<Number>("value")?;
                Ok(Value::Number(number.percent().with_scale(EXP_SCALE)))
            },
        ),
        Fetcher::new(
            "List",
            "List of values: List a b c",
            vec![Arg::new("items", get_core_value).mapped()],
            |_, args| Ok(Value::List(args.get("items")?)),
        ),
        Fetcher::new(
            "Array",
            "Array of values: Array a b c",
            vec![Arg::new("items", get_core_value).mapped()],
            |_, args| Ok(Value::Array(args.get("items")?)),
        ),
        Fetcher::new(
            "Address",
            "Address of a user, contract or literal",
            vec![Arg::new("address", get_address_v)],
            |_, args| Ok(Value::Address(args.get("address")?)),
        ),
        Fetcher::new("LastContract", "Most recently stored contract", vec![], |world, _| {
            world
                .last_contract()
                .map(|contract| Value::Address(contract.address))
                .ok_or_else(|| ScenarioError::handler("LastContract", "no contract has been stored"))
        }),
        Fetcher::new(
            "User",
            "Address of a user alias: User Geoff",
            vec![Arg::new("user", get_user_v)],
            |_, args| Ok(Value::Address(args.get("user")?)),
        ),
        Fetcher::new("True", "Boolean true", vec![], |_, _| Ok(Value::Bool(true))),
        Fetcher::new("False", "Boolean false", vec![], |_, _| Ok(Value::Bool(false))),
        Fetcher::new(
            "Erc20",
            "ERC-20 token value: Erc20 ZRX TotalSupply",
            vec![Arg::new("params", get_event_v).variadic()],
            |world, args| erc20::get_erc20_value(world, &args.get("params")?),
        ),
        Fetcher::new(
            "CToken",
            "cToken value: CToken cZRX Underlying",
            vec![Arg::new("params", get_event_v).variadic()],
            |world, args| ctoken::get_ctoken_value(world, &args.get("params")?),
        ),
        Fetcher::new(
            "Unitroller",
            "Unitroller value: Unitroller Implementation",
            vec![Arg::new("params", get_event_v).variadic()],
            |world, args| unitroller::get_unitroller_value(world, &args.get("params")?),
        ),
        Fetcher::new(
            "ComptrollerImpl",
            "Comptroller implementation value: ComptrollerImpl ScenComptroller Address",
            vec![Arg::new("params", get_event_v).variadic()],
            |world, args| comptroller_impl::get_comptroller_impl_value(world, &args.get("params")?),
        ),
        Fetcher::new(
            "Comptroller",
            "Comptroller value: Comptroller CloseFactor",
            vec![Arg::new("params", get_event_v).variadic()],
            |world, args| comptroller::get_comptroller_value(world, &args.get("params")?),
        ),
        Fetcher::new(
            "Default",
            "Literal, alias or nested value",
            vec![Arg::new("value", resolve_default).variadic()],
            |_, args| args.get("value"),
        )
        .catchall(),
    ]
}

fn resolve_default(world: &World, event: &Event) -> Result<Value> {
    match event {
        Event::Atom(text) => Ok(resolve_atom(world, text)),
        Event::List(items) if items.len() == 1 => get_core_value(world, &items[0]),
        Event::List(items) => {
            if let Some(head) = items.first().and_then(Event::as_atom).filter(|head| is_fetcher_name(head)) {
                return Err(ScenarioError::mismatch(format!("arguments for `{head}`"), "unbound list", event));
            }
            items
                .iter()
                .map(|item| get_core_value(world, item))
                .collect::<Result<Vec<_>>>()
                .map(Value::List)
        }
    }
}

/// A list led by a fetcher name whose fetcher did not bind is an error, not a plain list.
fn is_fetcher_name(head: &str) -> bool {
    core_fetchers()
        .iter()
        .any(|fetcher| fetcher.name() != "Default" && fetcher.name().eq_ignore_ascii_case(head))
}

fn resolve_atom(world: &World, text: &str) -> Value {
    if let Some(number) = Number::parse(text) {
        return Value::Number(number);
    }
    if let Ok(address) = text.parse::<Address>() {
        return Value::Address(address);
    }
    if let Some(address) = world.lookup_user(text).or_else(|| world.contract_address(text)) {
        return Value::Address(address);
    }
    Value::String(text.to_string())
}

pub fn get_event_v(_: &World, event: &Event) -> Result<Event> {
    Ok(event.clone())
}

pub fn get_address_v(world: &World, event: &Event) -> Result<Address> {
    match get_core_value(world, event)? {
        Value::Address(address) => Ok(address),
        other => Err(ScenarioError::mismatch("Address", other.kind(), event)),
    }
}

/// A user alias or literal address; contract names are not accepted.
pub fn get_user_v(world: &World, event: &Event) -> Result<Address> {
    let text = event
        .as_atom()
        .ok_or_else(|| ScenarioError::mismatch("user", "list", event))?;
    world
        .lookup_user(text)
        .or_else(|| text.parse().ok())
        .ok_or_else(|| ScenarioError::mismatch("user", "unknown alias", event))
}

pub fn get_number_v(world: &World, event: &Event) -> Result<Number> {
    match get_core_value(world, event)? {
        Value::Number(number) => Ok(number),
        other => Err(ScenarioError::mismatch("Number", other.kind(), event)),
    }
}

/// A number at 1e18 scale unless it already carries a scale.
pub fn get_exp_number_v(world: &World, event: &Event) -> Result<Number> {
    let number = get_number_v(world, event)?;
    Ok(match number.scale() {
        Some(_) => number,
        None => number.with_scale(EXP_SCALE),
    })
}

/// `5` and `5%` both read as five percent at 1e18 scale.
pub fn get_percent_v(world: &World, event: &Event) -> Result<Number> {
    if event.as_atom().is_some_and(|text| text.ends_with('%')) {
        return Ok(get_number_v(world, event)?.with_scale(EXP_SCALE));
    }
    let number = get_number_v(world, event)?;
    Ok(match number.scale() {
        Some(_) => number,
        None => number.percent().with_scale(EXP_SCALE),
    })
}

/// A bare atom is taken verbatim; anything else must resolve to a string.
pub fn get_string_v(world: &World, event: &Event) -> Result<String> {
    if let Some(text) = event.as_atom() {
        return Ok(text.to_string());
    }
    match get_core_value(world, event)? {
        Value::String(text) => Ok(text),
        other => Err(ScenarioError::mismatch("String", other.kind(), event)),
    }
}

pub fn get_bool_v(world: &World, event: &Event) -> Result<bool> {
    if let Some(text) = event.as_atom() {
        if text.eq_ignore_ascii_case("true") {
            return Ok(true);
        }
        if text.eq_ignore_ascii_case("false") {
            return Ok(false);
        }
    }
    match get_core_value(world, event)? {
        Value::Bool(flag) => Ok(flag),
        other => Err(ScenarioError::mismatch("Bool", other.kind(), event)),
    }
}

/// Resolves each element with `inner`. Accepts `[a, b]`, `(Array a b)`, a
/// plain list, or a single item.
pub fn get_array_v<T, F>(world: &World, event: &Event, inner: F) -> Result<Vec<T>>
where
    F: Fn(&World, &Event) -> Result<T>,
{
    let items = match event {
        Event::List(items)
            if items
                .first()
                .and_then(Event::as_atom)
                .is_some_and(|head| head == "List" || head == "Array") =>
        {
            &items[1..]
        }
        Event::List(items) => items.as_slice(),
        Event::Atom(_) => std::slice::from_ref(event),
    };
    items.iter().map(|item| inner(world, item)).collect()
}
