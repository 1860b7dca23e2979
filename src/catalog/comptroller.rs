//! `Comptroller` noun: risk parameters and market membership, sent to the
//! unitroller once an implementation has been adopted.
//!
//! Generation-specific commands (`SetMaxAssets`, `SetPaused`, `UnList`) are
//! guarded by the capabilities of the implementation the unitroller currently
//! delegates to.

use crate::catalog::{addresses, invoke_action, read_exp, read_view, uint};
use crate::chain::Contract;
use crate::command::{Arg, Args, Command, Fetcher, get_fetcher_value, process_command_event};
use crate::core_value::{get_address_v, get_bool_v, get_exp_number_v, get_number_v, get_string_v};
use crate::error::Result;
use crate::event::Event;
use crate::generation::Capabilities;
use crate::lookup::{comptroller_generation, get_comptroller, get_ctoken};
use crate::number::Number;
use crate::value::{Address, Token, Value};
use crate::world::World;

fn capabilities(world: &World) -> Capabilities {
    comptroller_generation(world).capabilities()
}

fn comptroller_arg() -> Arg {
    Arg::implicit("comptroller", get_comptroller)
}

fn ctoken_arg() -> Arg {
    Arg::new("cToken", get_ctoken)
}

fn send(world: &World, from: Address, args: &Args, method: &str, call_args: Vec<Token>, message: String) -> Result<World> {
    let comptroller: Contract = args.get("comptroller")?;
    invoke_action(world, from, &comptroller, method, call_args, message)
}

fn market_action(args: &Args) -> Result<String> {
    args.get::<String>("action")
}

fn commands() -> Vec<Command> {
    vec![
        Command::new(
            "SetCollateralFactor",
            "Sets a market's collateral factor: Comptroller SetCollateralFactor cZRX 0.1",
            vec![comptroller_arg(), ctoken_arg(), Arg::new("collateralFactor", get_exp_number_v)],
            |world, from, args| {
                let ctoken: Contract = args.get("cToken")?;
                let factor: Number = args.get("collateralFactor")?;
                let message = format!("Set collateral factor for {} to {}", ctoken.name, factor.show());
                let call_args = vec![Token::Address(ctoken.address), uint(&factor)];
                send(world, from, &args, "_setCollateralFactor", call_args, message)
            },
        ),
        Command::new(
            "SupportMarket",
            "Lists a market: Comptroller SupportMarket cZRX",
            vec![comptroller_arg(), ctoken_arg()],
            |world, from, args| {
                let ctoken: Contract = args.get("cToken")?;
                let message = format!("Supported market {}", ctoken.name);
                send(world, from, &args, "_supportMarket", vec![Token::Address(ctoken.address)], message)
            },
        ),
        Command::new(
            "UnList",
            "Removes a market listing (scenario implementations only): Comptroller UnList cZRX",
            vec![comptroller_arg(), ctoken_arg()],
            |world, from, args| {
                let ctoken: Contract = args.get("cToken")?;
                let message = format!("Unlisted market {}", ctoken.name);
                send(world, from, &args, "unlist", vec![Token::Address(ctoken.address)], message)
            },
        )
        .when("a scenario implementation", |world, _| Ok(capabilities(world).unlist)),
        Command::new(
            "SetCloseFactor",
            "Sets the close factor: Comptroller SetCloseFactor 0.5",
            vec![comptroller_arg(), Arg::new("closeFactor", get_exp_number_v)],
            |world, from, args| {
                let factor: Number = args.get("closeFactor")?;
                let message = format!("Set close factor to {}", factor.show());
                send(world, from, &args, "_setCloseFactor", vec![uint(&factor)], message)
            },
        ),
        Command::new(
            "SetMaxAssets",
            "Sets the per-account market limit: Comptroller SetMaxAssets 20",
            vec![comptroller_arg(), Arg::new("maxAssets", get_number_v)],
            |world, from, args| {
                let max: Number = args.get("maxAssets")?;
                let message = format!("Set max assets to {}", max.show());
                send(world, from, &args, "_setMaxAssets", vec![uint(&max)], message)
            },
        )
        .when("an implementation with a market limit", |world, _| {
            Ok(capabilities(world).set_max_assets)
        }),
        Command::new(
            "SetPaused",
            "Pauses an action on one market: Comptroller SetPaused cZRX Mint True",
            vec![
                comptroller_arg(),
                ctoken_arg(),
                Arg::new("action", get_string_v),
                Arg::new("isPaused", get_bool_v),
            ],
            |world, from, args| {
                let ctoken: Contract = args.get("cToken")?;
                let action = market_action(&args)?;
                let paused: bool = args.get("isPaused")?;
                let method = format!("_set{action}Paused");
                let message = format!("Comptroller: set {action} paused for {} to {paused}", ctoken.name);
                let call_args = vec![Token::Address(ctoken.address), Token::Bool(paused)];
                send(world, from, &args, &method, call_args, message)
            },
        )
        .when("a pausable implementation and a Mint or Borrow action", |world, args| {
            let action = market_action(args)?;
            Ok(capabilities(world).set_paused && matches!(action.as_str(), "Mint" | "Borrow"))
        }),
        Command::new(
            "SetPaused",
            "Pauses an action everywhere: Comptroller SetPaused Transfer True",
            vec![
                comptroller_arg(),
                Arg::new("action", get_string_v),
                Arg::new("isPaused", get_bool_v),
            ],
            |world, from, args| {
                let action = market_action(&args)?;
                let paused: bool = args.get("isPaused")?;
                let method = format!("_set{action}Paused");
                let message = format!("Comptroller: set {action} paused to {paused}");
                send(world, from, &args, &method, vec![Token::Bool(paused)], message)
            },
        )
        .when("a pausable implementation and a Transfer or Seize action", |world, args| {
            let action = market_action(args)?;
            Ok(capabilities(world).set_paused && matches!(action.as_str(), "Transfer" | "Seize"))
        }),
        Command::new(
            "SetPriceOracle",
            "Sets the price oracle: Comptroller SetPriceOracle (PriceOracle Address)",
            vec![comptroller_arg(), Arg::new("oracle", get_address_v)],
            |world, from, args| {
                let oracle: Address = args.get("oracle")?;
                let message = format!("Set price oracle to {}", world.describe_user(&oracle));
                send(world, from, &args, "_setPriceOracle", vec![Token::Address(oracle)], message)
            },
        ),
        Command::new(
            "LiquidationIncentive",
            "Sets the liquidation incentive: Comptroller LiquidationIncentive 1.1",
            vec![comptroller_arg(), Arg::new("incentive", get_exp_number_v)],
            |world, from, args| {
                let incentive: Number = args.get("incentive")?;
                let message = format!("Set liquidation incentive to {}", incentive.show());
                send(world, from, &args, "_setLiquidationIncentive", vec![uint(&incentive)], message)
            },
        ),
        Command::new(
            "SetPendingAdmin",
            "Proposes a new admin: Comptroller SetPendingAdmin Geoff",
            vec![comptroller_arg(), Arg::new("newPendingAdmin", get_address_v)],
            |world, from, args| {
                let admin: Address = args.get("newPendingAdmin")?;
                let message = format!("Set Comptroller pending admin to {}", world.describe_user(&admin));
                send(world, from, &args, "_setPendingAdmin", vec![Token::Address(admin)], message)
            },
        ),
        Command::new(
            "AcceptAdmin",
            "Accepts admin as the pending admin: From Geoff (Comptroller AcceptAdmin)",
            vec![comptroller_arg()],
            |world, from, args| {
                let message = format!("Accepted Comptroller admin as {}", world.describe_user(&from));
                send(world, from, &args, "_acceptAdmin", Vec::new(), message)
            },
        ),
        Command::new(
            "EnterMarkets",
            "Enters markets as the sender: From Geoff (Comptroller EnterMarkets cZRX cBAT)",
            vec![comptroller_arg(), Arg::new("cTokens", get_ctoken).mapped()],
            |world, from, args| {
                let markets: Vec<Contract> = args.get("cTokens")?;
                let names: Vec<&str> = markets.iter().map(|market| market.name.as_str()).collect();
                let message = format!("{} entered markets {}", world.describe_user(&from), names.join(", "));
                send(world, from, &args, "enterMarkets", vec![addresses(&markets)], message)
            },
        ),
        Command::new(
            "ExitMarket",
            "Exits a market as the sender: From Geoff (Comptroller ExitMarket cZRX)",
            vec![comptroller_arg(), ctoken_arg()],
            |world, from, args| {
                let ctoken: Contract = args.get("cToken")?;
                let message = format!("{} exited market {}", world.describe_user(&from), ctoken.name);
                send(world, from, &args, "exitMarket", vec![Token::Address(ctoken.address)], message)
            },
        ),
    ]
}

pub fn process_comptroller_event(world: &World, event: &Event, from: Address) -> Result<World> {
    process_command_event("Comptroller", &commands(), world, event, from)
}

pub fn get_comptroller_value(world: &World, event: &Event) -> Result<Value> {
    let fetchers = [
        Fetcher::new("Address", "Comptroller Address", vec![comptroller_arg()], |_, args| {
            Ok(Value::Address(args.get::<Contract>("comptroller")?.address))
        }),
        Fetcher::new("Admin", "Comptroller Admin", vec![comptroller_arg()], |world, args| {
            read_view(world, &args.get("comptroller")?, "admin", &[])
        }),
        Fetcher::new("PriceOracle", "Comptroller PriceOracle", vec![comptroller_arg()], |world, args| {
            read_view(world, &args.get("comptroller")?, "oracle", &[])
        }),
        Fetcher::new("CloseFactor", "Comptroller CloseFactor", vec![comptroller_arg()], |world, args| {
            read_exp(world, &args.get("comptroller")?, "closeFactorMantissa", &[])
        }),
        Fetcher::new(
            "LiquidationIncentive",
            "Comptroller LiquidationIncentive",
            vec![comptroller_arg()],
            |world, args| read_exp(world, &args.get("comptroller")?, "liquidationIncentiveMantissa", &[]),
        ),
        Fetcher::new("MaxAssets", "Comptroller MaxAssets", vec![comptroller_arg()], |world, args| {
            read_view(world, &args.get("comptroller")?, "maxAssets", &[])
        }),
        Fetcher::new(
            "CollateralFactor",
            "Comptroller CollateralFactor cZRX",
            vec![comptroller_arg(), ctoken_arg()],
            |world, args| {
                let ctoken: Contract = args.get("cToken")?;
                let key = [Token::Address(ctoken.address)];
                read_exp(world, &args.get("comptroller")?, "collateralFactorMantissa", &key)
            },
        ),
        Fetcher::new("IsListed", "Comptroller IsListed cZRX", vec![comptroller_arg(), ctoken_arg()], |world, args| {
            let ctoken: Contract = args.get("cToken")?;
            read_view(world, &args.get("comptroller")?, "isListed", &[Token::Address(ctoken.address)])
        }),
    ];
    get_fetcher_value("Comptroller", &fetchers, world, event)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ScenarioError;
    use crate::macros::Macros;
    use crate::parser::parse_event;
    use crate::runner::run_command;
    use crate::test_support::dev_world;

    const SETUP: &[&str] = &[
        "Erc20 Deploy Standard ZRX \"0x Protocol Token\" 18",
        "Unitroller Deploy",
        "ComptrollerImpl Deploy ScenarioG1 ScenComptrollerG1",
        "Unitroller SetPendingImpl ScenComptrollerG1",
        "ComptrollerImpl ScenComptrollerG1 BecomeG1 Bank 0.5 20",
        "CToken Deploy Scenario cZRX \"Compound ZRX\" (Erc20 ZRX Address) (Comptroller Address) (Exp 0.2) 8 Admin",
    ];

    fn comptroller_world(lines: &[&str]) -> anyhow::Result<(World, Macros, tempfile::TempDir)> {
        let (world, dir) = dev_world()?;
        let macros = world.macros().clone();
        let mut world = world;
        for line in lines {
            world = run_command(&world, line, &macros)?;
        }
        Ok((world, macros, dir))
    }

    fn value(world: &World, text: &str) -> Result<Value> {
        get_comptroller_value(world, &parse_event(text)?)
    }

    #[test]
    fn collateral_factor_is_stored_as_a_mantissa() -> anyhow::Result<()> {
        let (world, macros, _dir) = comptroller_world(SETUP)?;
        let world = run_command(&world, "Comptroller SupportMarket cZRX", &macros)?;
        let world = run_command(&world, "Comptroller SetCollateralFactor cZRX 0.1", &macros)?;
        let factor = value(&world, "CollateralFactor cZRX")?;
        assert!(factor.loosely_equals(&Value::Number(Number::parse("0.1").expect("number"))));
        assert_eq!(value(&world, "IsListed cZRX")?, Value::Bool(true));
        assert_eq!(
            world.actions().last().map(|action| action.message.as_str()),
            Some("Set collateral factor for cZRX to 0.1")
        );
        Ok(())
    }

    #[test]
    fn become_parameters_are_visible_through_the_proxy() -> anyhow::Result<()> {
        let (world, _macros, _dir) = comptroller_world(SETUP)?;
        let close = value(&world, "CloseFactor")?;
        assert!(close.loosely_equals(&Value::Number(Number::parse("0.5").expect("number"))));
        assert_eq!(value(&world, "MaxAssets")?, Value::Number(Number::from_integer(20)));
        Ok(())
    }

    #[test]
    fn unknown_market_leaves_the_world_alone() -> anyhow::Result<()> {
        let (world, macros, _dir) = comptroller_world(&SETUP[..5])?;
        let err = match run_command(&world, "Comptroller SetCollateralFactor cZRX 0.1", &macros) {
            Err(err) => err,
            Ok(_) => panic!("cZRX was never deployed"),
        };
        assert!(err.is_resolution());
        assert!(matches!(err, ScenarioError::NoMatchingCandidate { ref attempts, .. } if attempts.len() == 1));
        Ok(())
    }

    #[test]
    fn pausing_follows_generation() -> anyhow::Result<()> {
        let (world, macros, _dir) = comptroller_world(SETUP)?;
        let err = match run_command(&world, "Comptroller SetPaused Transfer True", &macros) {
            Err(err) => err,
            Ok(_) => panic!("G1 cannot pause"),
        };
        assert!(err.is_resolution());
        let world = run_command(&world, "Comptroller SetMaxAssets 10", &macros)?;
        assert_eq!(value(&world, "MaxAssets")?, Value::Number(Number::from_integer(10)));
        let world = run_command(&world, "Comptroller UnList cZRX", &macros)?;
        assert!(world.actions().last().is_some_and(|a| a.message == "Unlisted market cZRX"));
        Ok(())
    }

    #[test]
    fn enter_markets_as_another_user() -> anyhow::Result<()> {
        let (world, macros, _dir) = comptroller_world(SETUP)?;
        let world = run_command(&world, "From Geoff (Comptroller EnterMarkets cZRX)", &macros)?;
        assert!(
            world
                .actions()
                .last()
                .is_some_and(|a| a.message.ends_with("entered markets cZRX"))
        );
        Ok(())
    }
}
