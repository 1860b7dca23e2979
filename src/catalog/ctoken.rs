//! `CToken` noun: market token deployment and views.

use serde_json::json;

use crate::catalog::{params_arg, read_view, small_uint, uint};
use crate::chain::Contract;
use crate::command::{Arg, Command, Fetcher, get_fetcher_value, process_command_event};
use crate::core_value::{get_address_v, get_exp_number_v, get_number_v, get_string_v};
use crate::error::Result;
use crate::event::Event;
use crate::invoke::{Invokation, deploy};
use crate::lookup::get_ctoken;
use crate::networks::{IndexedData, store_and_save_contract};
use crate::value::{Address, Token, Value};
use crate::world::World;

struct CTokenData {
    contract: Contract,
    invokation: Invokation,
    description: &'static str,
    artifact: &'static str,
    symbol: String,
    name: String,
    underlying: Address,
    decimals: u64,
}

fn deployer(from: Address, variant: &str, artifact: &'static str, description: &'static str) -> Fetcher<CTokenData> {
    Fetcher::new(
        variant,
        &format!(
            "Deploys a {description} cToken: CToken Deploy {variant} cZRX \"Compound ZRX\" (Erc20 ZRX Address) (Comptroller Address) (Exp 0.2) 8 Admin"
        ),
        vec![
            Arg::new("symbol", get_string_v),
            Arg::new("name", get_string_v),
            Arg::new("underlying", get_address_v),
            Arg::new("comptroller", get_address_v),
            Arg::new("initialExchangeRate", get_exp_number_v),
            Arg::new("decimals", get_number_v),
            Arg::new("admin", get_address_v),
        ],
        move |world, args| {
            let symbol: String = args.get("symbol")?;
            let name: String = args.get("name")?;
            let underlying: Address = args.get("underlying")?;
            let decimals = small_uint(&args.get("decimals")?, "decimals")?;
            let constructor = vec![
                Token::Address(underlying),
                Token::Address(args.get("comptroller")?),
                uint(&args.get("initialExchangeRate")?),
                Token::String(name.clone()),
                Token::String(symbol.clone()),
                Token::uint(decimals),
                Token::Address(args.get("admin")?),
            ];
            let (contract, invokation) = deploy(world, from, artifact, &symbol, constructor)?;
            Ok(CTokenData {
                contract,
                invokation,
                description,
                artifact,
                symbol,
                name,
                underlying,
                decimals,
            })
        },
    )
}

fn deploy_ctoken(world: &World, from: Address, params: &Event) -> Result<World> {
    let deployers = [
        deployer(from, "Standard", "CErc20Immutable", "Standard"),
        deployer(from, "Scenario", "CErc20Scenario", "Scenario"),
    ];
    let ctoken = get_fetcher_value("DeployCToken", &deployers, world, params)?;
    let address = ctoken.contract.address;
    let index = IndexedData::new(
        &["CTokens", ctoken.symbol.as_str()],
        json!({
            "description": ctoken.description,
            "name": ctoken.name,
            "symbol": ctoken.symbol,
            "decimals": ctoken.decimals,
            "underlying": ctoken.underlying.to_string(),
            "address": address.to_string(),
            "contract": ctoken.artifact,
        }),
    );
    let world = store_and_save_contract(
        world,
        &ctoken.contract,
        &ctoken.symbol,
        Some(&ctoken.invokation),
        vec![index],
    );
    Ok(world.add_action(
        format!(
            "Added cToken {} ({}) at address {address}",
            ctoken.symbol, ctoken.description
        ),
        Some(ctoken.invokation),
    ))
}

pub fn process_ctoken_event(world: &World, event: &Event, from: Address) -> Result<World> {
    let commands = [Command::new(
        "Deploy",
        "Deploys a cToken: CToken Deploy Scenario cZRX ...",
        vec![params_arg()],
        |world, from, args| deploy_ctoken(world, from, &args.get("params")?),
    )];
    process_command_event("CToken", &commands, world, event, from)
}

pub fn get_ctoken_value(world: &World, event: &Event) -> Result<Value> {
    let ctoken = || Arg::new("cToken", get_ctoken);
    let fetchers = [
        Fetcher::new("Address", "CToken <cToken> Address", vec![ctoken()], |_, args| {
            Ok(Value::Address(args.get::<Contract>("cToken")?.address))
        })
        .name_pos(1),
        Fetcher::new("Underlying", "CToken <cToken> Underlying", vec![ctoken()], |world, args| {
            read_view(world, &args.get("cToken")?, "underlying", &[])
        })
        .name_pos(1),
        Fetcher::new("Comptroller", "CToken <cToken> Comptroller", vec![ctoken()], |world, args| {
            read_view(world, &args.get("cToken")?, "comptroller", &[])
        })
        .name_pos(1),
    ];
    get_fetcher_value("CToken", &fetchers, world, event)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_event;
    use crate::runner::run_command;
    use crate::test_support::dev_world;

    #[test]
    fn deploys_against_the_underlying() -> anyhow::Result<()> {
        let (world, _dir) = dev_world()?;
        let macros = world.macros().clone();
        let mut world = world;
        for line in [
            "Erc20 Deploy Standard ZRX \"0x Protocol Token\" 18",
            "Unitroller Deploy",
            "CToken Deploy Scenario cZRX \"Compound ZRX\" (Erc20 ZRX Address) (Unitroller Address) (Exp 0.2) 8 Admin",
        ] {
            world = run_command(&world, line, &macros)?;
        }
        let zrx = world.contract_address("ZRX").expect("zrx");
        assert_eq!(world.get_in(&["CTokens", "cZRX", "underlying"]), Some(&json!(zrx.to_string())));
        assert_eq!(world.get_in(&["CTokens", "cZRX", "contract"]), Some(&json!("CErc20Scenario")));
        let underlying = get_ctoken_value(&world, &parse_event("cZRX Underlying")?)?;
        assert_eq!(underlying, Value::Address(zrx));
        let constructor = world.get_in(&["Constructors", "cZRX"]).and_then(|json| json.as_array());
        assert_eq!(constructor.map(Vec::len), Some(7));
        Ok(())
    }
}
