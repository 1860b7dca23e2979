//! `Unitroller` noun: the comptroller proxy.

use serde_json::json;

use crate::catalog::{invoke_action, params_arg, read_view};
use crate::chain::Contract;
use crate::command::{Arg, Command, Fetcher, get_fetcher_value, process_command_event};
use crate::core_value::get_address_v;
use crate::error::Result;
use crate::event::Event;
use crate::invoke::{Invokation, deploy};
use crate::lookup::{get_comptroller_impl, get_unitroller};
use crate::networks::{IndexedData, store_and_save_contract};
use crate::value::{Address, Token, Value};
use crate::world::World;

fn deploy_unitroller(world: &World, from: Address, params: &Event) -> Result<World> {
    let deployers = [Fetcher::new(
        "Unitroller",
        "Deploys the proxy: Unitroller Deploy",
        vec![],
        move |world: &World, _| deploy(world, from, "Unitroller", "Unitroller", Vec::new()),
    )
    .catchall()];
    let (contract, invokation): (Contract, Invokation) =
        get_fetcher_value("DeployUnitroller", &deployers, world, params)?;
    let address = contract.address;
    let index = IndexedData::new(
        &["Unitroller"],
        json!({
            "address": address.to_string(),
            "contract": "Unitroller",
            "description": "Unitroller",
        }),
    );
    let world = store_and_save_contract(world, &contract, "Unitroller", Some(&invokation), vec![index]);
    Ok(world.add_action(format!("Added Unitroller at address {address}"), Some(invokation)))
}

fn commands() -> Vec<Command> {
    let unitroller = || Arg::implicit("unitroller", get_unitroller);
    vec![
        Command::new(
            "Deploy",
            "Deploys the unitroller: Unitroller Deploy",
            vec![params_arg()],
            |world, from, args| deploy_unitroller(world, from, &args.get("params")?),
        ),
        Command::new(
            "SetPendingImpl",
            "Proposes an implementation: Unitroller SetPendingImpl ScenComptroller",
            vec![unitroller(), Arg::new("comptrollerImpl", get_comptroller_impl)],
            |world, from, args| {
                let unitroller: Contract = args.get("unitroller")?;
                let implementation: Contract = args.get("comptrollerImpl")?;
                let message = format!("Set pending comptroller impl to {}", implementation.name);
                let call_args = vec![Token::Address(implementation.address)];
                invoke_action(world, from, &unitroller, "_setPendingImplementation", call_args, message)
            },
        ),
        Command::new(
            "SetPendingAdmin",
            "Proposes a new admin: Unitroller SetPendingAdmin Geoff",
            vec![unitroller(), Arg::new("newPendingAdmin", get_address_v)],
            |world, from, args| {
                let unitroller: Contract = args.get("unitroller")?;
                let admin: Address = args.get("newPendingAdmin")?;
                let message = format!("Set Unitroller pending admin to {}", world.describe_user(&admin));
                invoke_action(world, from, &unitroller, "_setPendingAdmin", vec![Token::Address(admin)], message)
            },
        ),
        Command::new(
            "AcceptAdmin",
            "Accepts admin as the pending admin: From Geoff (Unitroller AcceptAdmin)",
            vec![unitroller()],
            |world, from, args| {
                let unitroller: Contract = args.get("unitroller")?;
                let message = format!("Accepted Unitroller admin as {}", world.describe_user(&from));
                invoke_action(world, from, &unitroller, "_acceptAdmin", Vec::new(), message)
            },
        ),
    ]
}

pub fn process_unitroller_event(world: &World, event: &Event, from: Address) -> Result<World> {
    process_command_event("Unitroller", &commands(), world, event, from)
}

fn view(name: &str, method: &'static str) -> Fetcher<Value> {
    Fetcher::new(
        name,
        &format!("Unitroller {name}"),
        vec![Arg::implicit("unitroller", get_unitroller)],
        move |world, args| read_view(world, &args.get("unitroller")?, method, &[]),
    )
}

pub fn get_unitroller_value(world: &World, event: &Event) -> Result<Value> {
    let fetchers = [
        Fetcher::new(
            "Address",
            "Unitroller Address",
            vec![Arg::implicit("unitroller", get_unitroller)],
            |_, args| Ok(Value::Address(args.get::<Contract>("unitroller")?.address)),
        ),
        view("Admin", "admin"),
        view("PendingAdmin", "pendingAdmin"),
        view("Implementation", "implementation"),
        view("PendingImplementation", "pendingImplementation"),
    ];
    get_fetcher_value("Unitroller", &fetchers, world, event)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_event;
    use crate::runner::run_command;
    use crate::test_support::dev_world;

    #[test]
    fn deploy_and_hand_over_admin() -> anyhow::Result<()> {
        let (world, _dir) = dev_world()?;
        let macros = world.macros().clone();
        let mut world = world;
        for line in [
            "Unitroller Deploy",
            "Unitroller SetPendingAdmin Geoff",
            "From Geoff (Unitroller AcceptAdmin)",
        ] {
            world = run_command(&world, line, &macros)?;
        }
        let geoff = world.accounts()[2];
        let admin = get_unitroller_value(&world, &parse_event("Admin")?)?;
        assert_eq!(admin, Value::Address(geoff));
        assert_eq!(
            world.get_in(&["Unitroller", "address"]),
            world.get_in(&["Contracts", "Unitroller"])
        );
        Ok(())
    }

    #[test]
    fn views_need_a_deployed_unitroller() -> anyhow::Result<()> {
        let (world, _dir) = dev_world()?;
        let err = match get_unitroller_value(&world, &parse_event("Admin")?) {
            Err(err) => err,
            Ok(value) => panic!("resolved {value:?}"),
        };
        assert!(err.is_resolution());
        Ok(())
    }
}
