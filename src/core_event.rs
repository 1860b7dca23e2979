//! Top-level command table: session commands plus routing to each noun.

use tracing::debug;

use crate::catalog::{comptroller, comptroller_impl, ctoken, erc20, params_arg, unitroller};
use crate::command::{Arg, Command, process_command_event};
use crate::core_value::{get_address_v, get_bool_v, get_core_value, get_event_v, get_number_v, get_string_v, get_user_v};
use crate::error::{Result, ScenarioError};
use crate::event::Event;
use crate::number::Number;
use crate::value::{Address, Value};
use crate::world::World;

fn assertions() -> Vec<Command> {
    vec![
        Command::new(
            "Equal",
            "Fails unless both values denote the same thing: Assert Equal (Erc20 ZRX Decimals) 18",
            vec![Arg::new("given", get_core_value), Arg::new("expected", get_core_value)],
            |world, _, args| {
                let given: Value = args.get("given")?;
                let expected: Value = args.get("expected")?;
                if given.loosely_equals(&expected) {
                    return Ok(world.clone());
                }
                Err(ScenarioError::handler(
                    "Assert",
                    format!("expected {} to equal {}", given.show(), expected.show()),
                ))
            },
        ),
        Command::new(
            "True",
            "Fails unless the value is true: Assert True (Comptroller IsListed cZRX)",
            vec![Arg::new("given", get_bool_v)],
            |world, _, args| {
                if args.get::<bool>("given")? {
                    return Ok(world.clone());
                }
                Err(ScenarioError::handler("Assert", "expected true, got false"))
            },
        ),
        Command::new(
            "False",
            "Fails unless the value is false: Assert False (Comptroller IsListed cZRX)",
            vec![Arg::new("given", get_bool_v)],
            |world, _, args| {
                if args.get::<bool>("given")? {
                    return Err(ScenarioError::handler("Assert", "expected false, got true"));
                }
                Ok(world.clone())
            },
        ),
    ]
}

fn noun(name: &'static str, process: fn(&World, &Event, Address) -> Result<World>) -> Command {
    Command::new(
        name,
        &format!("{name} commands: {name} <subcommand> ..."),
        vec![params_arg()],
        move |world, from, args| process(world, &args.get("params")?, from),
    )
}

fn commands() -> Vec<Command> {
    vec![
        Command::new(
            "Print",
            "Prints a value: Print \"Hello\"",
            vec![Arg::new("value", get_core_value).variadic()],
            |world, _, args| {
                world.printer().print_line(&args.get::<Value>("value")?.show());
                Ok(world.clone())
            },
        ),
        Command::new(
            "Read",
            "Fetches and prints a value: Read Erc20 ZRX TotalSupply",
            vec![Arg::new("value", get_core_value).variadic()],
            |world, _, args| {
                world.printer().print_value(&args.get("value")?);
                Ok(world.clone())
            },
        ),
        Command::new(
            "Assert",
            "Checks a condition: Assert Equal a b",
            vec![params_arg()],
            |world, from, args| process_command_event("Assert", &assertions(), world, &args.get("params")?, from),
        ),
        Command::new(
            "Alias",
            "Names an address for later lines: Alias Oracle 0x…",
            vec![Arg::new("name", get_string_v), Arg::new("address", get_address_v)],
            |world, _, args| {
                let name: String = args.get("name")?;
                let address: Address = args.get("address")?;
                let settings = world.settings().with_alias(&name, address);
                if !world.dry_run() {
                    settings.save(&world.networks_dir(), world.network())?;
                }
                Ok(world
                    .with_settings(settings)
                    .add_action(format!("Aliased {name} to {address}"), None))
            },
        ),
        Command::new("Aliases", "Prints every named alias", vec![], |world, _, _| {
            for (name, address) in &world.settings().aliases {
                world.printer().print_line(&format!("{name}: {address}"));
            }
            Ok(world.clone())
        }),
        Command::new(
            "From",
            "Runs a command as another sender: From Geoff (Erc20 ZRX Transfer Torrey 10)",
            vec![Arg::new("user", get_user_v), Arg::new("event", get_event_v).variadic()],
            |world, _, args| {
                let user: Address = args.get("user")?;
                let event: Event = args.get("event")?;
                debug!(from = %user, %event, "sender override");
                process_core_event(world, &event, user)
            },
        ),
        Command::new(
            "DryRun",
            "Runs a command without touching the chain or registry: DryRun (Erc20 Deploy Standard ZRX \"0x\")",
            vec![Arg::new("event", get_event_v).variadic()],
            |world, from, args| {
                let event: Event = args.get("event")?;
                let after = process_core_event(&world.with_dry_run(true), &event, from)?;
                Ok(after.with_dry_run(world.dry_run()))
            },
        ),
        Command::new("Inspect", "Prints the session state", vec![], |world, _, _| {
            inspect(world);
            Ok(world.clone())
        }),
        Command::new(
            "History",
            "Prints the most recent actions: History 5",
            vec![Arg::new("count", get_number_v).default(Number::from_integer(10))],
            |world, _, args| {
                let count: Number = args.get("count")?;
                let count = count.to_u64().unwrap_or(10) as usize;
                let actions = world.actions();
                for action in &actions[actions.len().saturating_sub(count)..] {
                    world.printer().print_line(&action.message);
                }
                Ok(world.clone())
            },
        ),
        Command::new("Macros", "Prints the available macros", vec![], |world, _, _| {
            world.printer().print_line(&world.macros().names().join(", "));
            Ok(world.clone())
        }),
        noun("Erc20", erc20::process_erc20_event),
        noun("CToken", ctoken::process_ctoken_event),
        noun("Unitroller", unitroller::process_unitroller_event),
        noun("ComptrollerImpl", comptroller_impl::process_comptroller_impl_event),
        noun("Comptroller", comptroller::process_comptroller_event),
    ]
}

fn inspect(world: &World) {
    let printer = world.printer();
    printer.print_line(&format!("Network: {}", world.network()));
    printer.print_line(&format!("Dry run: {}", world.dry_run()));
    printer.print_line(&format!("From: {}", world.describe_user(&world.default_from())));
    for contract in world.contracts() {
        printer.print_line(&format!("Contract {} at {}", contract.name, contract.address));
    }
    let data = world.contract_data();
    if data.as_object().is_some_and(|tree| !tree.is_empty()) {
        if let Ok(text) = serde_json::to_string_pretty(data) {
            printer.print_line(&text);
        }
    }
}

/// Dispatches one fully expanded event as `from`.
pub fn process_core_event(world: &World, event: &Event, from: Address) -> Result<World> {
    process_command_event("Core", &commands(), world, event, from)
}
