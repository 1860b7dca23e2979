//! `Erc20` noun: token deployment, transfers and views.

use serde_json::json;
use tracing::info;

use crate::catalog::{invoke_action, params_arg, read_view, small_uint, uint};
use crate::chain::Contract;
use crate::command::{Arg, Command, Fetcher, get_fetcher_value, process_command_event};
use crate::core_value::{get_address_v, get_bool_v, get_number_v, get_string_v};
use crate::error::Result;
use crate::event::Event;
use crate::invoke::{Invokation, call, deploy};
use crate::lookup::get_erc20;
use crate::networks::{IndexedData, store_and_save_contract};
use crate::number::Number;
use crate::value::{Address, Token, Value};
use crate::world::World;

struct TokenData {
    contract: Contract,
    invokation: Option<Invokation>,
    description: &'static str,
    artifact: String,
    symbol: String,
    name: String,
    decimals: u64,
}

struct TokenSpec {
    artifact: &'static str,
    description: &'static str,
    symbol: String,
    name: String,
    decimals: u64,
    extra: Vec<Token>,
}

fn deploy_token(world: &World, from: Address, spec: TokenSpec) -> Result<TokenData> {
    let mut args = vec![
        Token::uint(0),
        Token::String(spec.name.clone()),
        Token::uint(spec.decimals),
        Token::String(spec.symbol.clone()),
    ];
    args.extend(spec.extra);
    let (contract, invokation) = deploy(world, from, spec.artifact, &spec.symbol, args)?;
    Ok(TokenData {
        contract,
        invokation: Some(invokation),
        description: spec.description,
        artifact: spec.artifact.to_string(),
        symbol: spec.symbol,
        name: spec.name,
        decimals: spec.decimals,
    })
}

fn standard_args() -> Vec<Arg> {
    vec![
        Arg::new("symbol", get_string_v),
        Arg::new("name", get_string_v),
        Arg::new("decimals", get_number_v).default(Number::from_integer(18)),
    ]
}

fn simple_deployer(
    from: Address,
    variant: &str,
    artifact: &'static str,
    description: &'static str,
) -> Fetcher<TokenData> {
    Fetcher::new(
        variant,
        &format!("Deploys a {description} ERC-20: Erc20 Deploy {variant} ZRX \"0x Protocol Token\" 18"),
        standard_args(),
        move |world, args| {
            let spec = TokenSpec {
                artifact,
                description,
                symbol: args.get("symbol")?,
                name: args.get("name")?,
                decimals: small_uint(&args.get("decimals")?, "decimals")?,
                extra: Vec::new(),
            };
            deploy_token(world, from, spec)
        },
    )
}

fn deployers(from: Address) -> Vec<Fetcher<TokenData>> {
    vec![
        Fetcher::new(
            "Existing",
            "Attaches a token already on chain: Erc20 Deploy Existing DAI 0x123...",
            vec![
                Arg::new("symbol", get_string_v),
                Arg::new("address", get_address_v),
                Arg::new("contractName", get_string_v).default("StandardToken"),
            ],
            |world, args| {
                let symbol: String = args.get("symbol")?;
                let artifact: String = args.get("contractName")?;
                let address: Address = args.get("address")?;
                let abi = world.chain().artifact(&artifact)?;
                let contract = world.chain().attach(&symbol, address, abi)?;
                let decimals = match call(world, &contract, "decimals", &[]) {
                    Ok(Token::Uint(n)) => Number::from_integer(n).to_u64().filter(|d| *d > 0),
                    _ => None,
                };
                Ok(TokenData {
                    contract,
                    invokation: None,
                    description: "Existing",
                    artifact,
                    name: symbol.clone(),
                    symbol,
                    decimals: decimals.unwrap_or(18),
                })
            },
        ),
        simple_deployer(from, "Standard", "StandardToken", "Standard"),
        simple_deployer(from, "NonStandard", "FaucetNonStandardToken", "NonStandard"),
        simple_deployer(from, "Evil", "EvilToken", "Evil"),
        Fetcher::new(
            "WBTC",
            "Deploys a pausable 8-decimal token: Erc20 Deploy WBTC WBTC \"Wrapped BTC\"",
            vec![Arg::new("symbol", get_string_v), Arg::new("name", get_string_v)],
            move |world, args| {
                let spec = TokenSpec {
                    artifact: "WBTCToken",
                    description: "WBTC",
                    symbol: args.get("symbol")?,
                    name: args.get("name")?,
                    decimals: 8,
                    extra: Vec::new(),
                };
                deploy_token(world, from, spec)
            },
        ),
        Fetcher::new(
            "Fee",
            "Deploys a fee-on-transfer token: Erc20 Deploy Fee USDT \"Tether\" 6 100 Admin",
            vec![
                Arg::new("symbol", get_string_v),
                Arg::new("name", get_string_v),
                Arg::new("decimals", get_number_v),
                Arg::new("basisPointFee", get_number_v),
                Arg::new("owner", get_address_v),
            ],
            move |world, args| {
                let spec = TokenSpec {
                    artifact: "FeeToken",
                    description: "Fee",
                    symbol: args.get("symbol")?,
                    name: args.get("name")?,
                    decimals: small_uint(&args.get("decimals")?, "decimals")?,
                    extra: vec![uint(&args.get("basisPointFee")?), Token::Address(args.get("owner")?)],
                };
                deploy_token(world, from, spec)
            },
        ),
        simple_deployer(from, "Default", "StandardToken", "Standard").catchall(),
    ]
}

fn deploy_erc20(world: &World, from: Address, params: &Event) -> Result<World> {
    let token = get_fetcher_value("DeployErc20", &deployers(from), world, params)?;
    let address = token.contract.address;
    info!(symbol = %token.symbol, %address, "erc20 deployed");
    let index = IndexedData::new(
        &["Tokens", token.symbol.as_str()],
        json!({
            "description": token.description,
            "name": token.name,
            "symbol": token.symbol,
            "decimals": token.decimals,
            "address": address.to_string(),
            "contract": token.artifact,
        }),
    );
    let world = store_and_save_contract(
        world,
        &token.contract,
        &token.symbol,
        token.invokation.as_ref(),
        vec![index],
    );
    Ok(world.add_action(
        format!(
            "Added ERC-20 token {} ({}) at address {address}",
            token.symbol, token.description
        ),
        token.invokation,
    ))
}

fn token_arg() -> Arg {
    Arg::new("erc20", get_erc20)
}

fn commands() -> Vec<Command> {
    vec![
        Command::new(
            "Deploy",
            "Deploys or attaches an ERC-20: Erc20 Deploy Standard ZRX \"0x Protocol Token\" 18",
            vec![params_arg()],
            |world, from, args| deploy_erc20(world, from, &args.get("params")?),
        ),
        Command::new(
            "Approve",
            "Approves a spender: Erc20 ZRX Approve cZRX 1.0e18",
            vec![
                token_arg(),
                Arg::new("spender", get_address_v),
                Arg::new("amount", get_number_v),
            ],
            |world, from, args| {
                let token: Contract = args.get("erc20")?;
                let spender: Address = args.get("spender")?;
                let amount: Number = args.get("amount")?;
                let message = format!(
                    "Approved {} ERC-20 token for {} of {amount}",
                    token.name,
                    world.describe_user(&spender)
                );
                invoke_action(world, from, &token, "approve", vec![Token::Address(spender), uint(&amount)], message)
            },
        )
        .name_pos(1),
        Command::new(
            "Faucet",
            "Mints test tokens to an address: Erc20 ZRX Faucet Geoff 100",
            vec![token_arg(), Arg::new("address", get_address_v), Arg::new("amount", get_number_v)],
            |world, from, args| {
                let token: Contract = args.get("erc20")?;
                let owner: Address = args.get("address")?;
                let amount: Number = args.get("amount")?;
                let message = format!(
                    "Fauceted {amount} {} tokens to {}",
                    token.name,
                    world.describe_user(&owner)
                );
                invoke_action(world, from, &token, "allocateTo", vec![Token::Address(owner), uint(&amount)], message)
            },
        )
        .name_pos(1),
        Command::new(
            "Transfer",
            "Transfers from the sender: Erc20 ZRX Transfer Torrey 10",
            vec![token_arg(), Arg::new("recipient", get_address_v), Arg::new("amount", get_number_v)],
            |world, from, args| {
                let token: Contract = args.get("erc20")?;
                let recipient: Address = args.get("recipient")?;
                let amount: Number = args.get("amount")?;
                let message = format!(
                    "Transferred {amount} {} tokens from {} to {}",
                    token.name,
                    world.describe_user(&from),
                    world.describe_user(&recipient)
                );
                invoke_action(world, from, &token, "transfer", vec![Token::Address(recipient), uint(&amount)], message)
            },
        )
        .name_pos(1),
        Command::new(
            "TransferFrom",
            "Transfers on behalf of an owner: Erc20 ZRX TransferFrom Geoff Torrey 10",
            vec![
                token_arg(),
                Arg::new("owner", get_address_v),
                Arg::new("recipient", get_address_v),
                Arg::new("amount", get_number_v),
            ],
            |world, from, args| {
                let token: Contract = args.get("erc20")?;
                let owner: Address = args.get("owner")?;
                let recipient: Address = args.get("recipient")?;
                let amount: Number = args.get("amount")?;
                let message = format!(
                    "Transferred {amount} {} tokens from {} to {}",
                    token.name,
                    world.describe_user(&owner),
                    world.describe_user(&recipient)
                );
                let call_args = vec![Token::Address(owner), Token::Address(recipient), uint(&amount)];
                invoke_action(world, from, &token, "transferFrom", call_args, message)
            },
        )
        .name_pos(1),
        Command::new(
            "SetFail",
            "Makes an evil token fail transfers: Erc20 EVL SetFail True",
            vec![token_arg(), Arg::new("fail", get_bool_v)],
            |world, from, args| {
                let token: Contract = args.get("erc20")?;
                let fail: bool = args.get("fail")?;
                let message = format!("Set {} to fail={fail}", token.name);
                invoke_action(world, from, &token, "setFail", vec![Token::Bool(fail)], message)
            },
        )
        .name_pos(1)
        .when("a token with setFail", |_, args| {
            Ok(args.get::<Contract>("erc20")?.has_method("setFail"))
        }),
        Command::new(
            "Pause",
            "Pauses a pausable token: Erc20 WBTC Pause",
            vec![token_arg()],
            |world, from, args| {
                let token: Contract = args.get("erc20")?;
                let message = format!("Paused {}", token.name);
                invoke_action(world, from, &token, "pause", Vec::new(), message)
            },
        )
        .name_pos(1)
        .when("a pausable token", |_, args| {
            Ok(args.get::<Contract>("erc20")?.has_method("pause"))
        }),
        Command::new(
            "Unpause",
            "Unpauses a pausable token: Erc20 WBTC Unpause",
            vec![token_arg()],
            |world, from, args| {
                let token: Contract = args.get("erc20")?;
                let message = format!("Unpaused {}", token.name);
                invoke_action(world, from, &token, "unpause", Vec::new(), message)
            },
        )
        .name_pos(1)
        .when("a pausable token", |_, args| {
            Ok(args.get::<Contract>("erc20")?.has_method("unpause"))
        }),
    ]
}

pub fn process_erc20_event(world: &World, event: &Event, from: Address) -> Result<World> {
    process_command_event("Erc20", &commands(), world, event, from)
}

fn view(name: &str, method: &'static str) -> Fetcher<Value> {
    Fetcher::new(name, &format!("Erc20 <token> {name}"), vec![token_arg()], move |world, args| {
        read_view(world, &args.get("erc20")?, method, &[])
    })
    .name_pos(1)
}

fn fetchers() -> Vec<Fetcher<Value>> {
    vec![
        Fetcher::new("Address", "Erc20 <token> Address", vec![token_arg()], |_, args| {
            Ok(Value::Address(args.get::<Contract>("erc20")?.address))
        })
        .name_pos(1),
        view("Name", "name"),
        view("Symbol", "symbol"),
        view("Decimals", "decimals"),
        view("TotalSupply", "totalSupply"),
        Fetcher::new(
            "BalanceOf",
            "Erc20 <token> BalanceOf <user>",
            vec![token_arg(), Arg::new("owner", get_address_v)],
            |world, args| {
                let owner: Address = args.get("owner")?;
                read_view(world, &args.get("erc20")?, "balanceOf", &[Token::Address(owner)])
            },
        )
        .name_pos(1),
        Fetcher::new(
            "Allowance",
            "Erc20 <token> Allowance <owner> <spender>",
            vec![
                token_arg(),
                Arg::new("owner", get_address_v),
                Arg::new("spender", get_address_v),
            ],
            |world, args| {
                let owner: Address = args.get("owner")?;
                let spender: Address = args.get("spender")?;
                let call_args = [Token::Address(owner), Token::Address(spender)];
                read_view(world, &args.get("erc20")?, "allowance", &call_args)
            },
        )
        .name_pos(1),
    ]
}

pub fn get_erc20_value(world: &World, event: &Event) -> Result<Value> {
    get_fetcher_value("Erc20", &fetchers(), world, event)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::networks::{network_file, read_json_file};
    use crate::runner::run_command;
    use crate::test_support::dev_world;

    #[test]
    fn deploy_standard_records_token_and_registry() -> anyhow::Result<()> {
        let (world, _dir) = dev_world()?;
        let macros = world.macros().clone();
        let world = run_command(&world, "Erc20 Deploy Standard ZRX \"0x Protocol Token\" 18", &macros)?;
        let address = world.contract_address("ZRX").expect("registered");
        assert_eq!(world.get_in(&["Tokens", "ZRX", "symbol"]), Some(&json!("ZRX")));
        assert_eq!(world.get_in(&["Tokens", "ZRX", "decimals"]), Some(&json!(18)));
        assert_eq!(world.get_in(&["Tokens", "ZRX", "name"]), Some(&json!("0x Protocol Token")));
        let registry = read_json_file(&network_file(&world.networks_dir(), world.network()))?;
        assert_eq!(registry["Contracts"]["ZRX"], json!(address.to_string()));
        assert_eq!(registry["Blocks"]["ZRX"], json!(1));
        let last = world.actions().last().expect("action");
        assert_eq!(
            last.message,
            format!("Added ERC-20 token ZRX (Standard) at address {address}")
        );
        Ok(())
    }

    #[test]
    fn catchall_deploys_a_standard_token() -> anyhow::Result<()> {
        let (world, _dir) = dev_world()?;
        let macros = world.macros().clone();
        let world = run_command(&world, "Erc20 Deploy BAT \"Basic Attention Token\"", &macros)?;
        assert_eq!(world.get_in(&["Tokens", "BAT", "contract"]), Some(&json!("StandardToken")));
        assert_eq!(world.get_in(&["Tokens", "BAT", "decimals"]), Some(&json!(18)));
        Ok(())
    }

    #[test]
    fn transfers_move_balances() -> anyhow::Result<()> {
        let (world, _dir) = dev_world()?;
        let macros = world.macros().clone();
        let mut world = world;
        for line in [
            "Erc20 Deploy Standard ZRX \"0x Protocol Token\" 18",
            "Erc20 ZRX Faucet Root 100",
            "Erc20 ZRX Transfer Geoff 40",
        ] {
            world = run_command(&world, line, &macros)?;
        }
        let balance = get_erc20_value(&world, &crate::parser::parse_event("ZRX BalanceOf Geoff")?)?;
        assert_eq!(balance, Value::Number(Number::from_integer(40)));
        let supply = get_erc20_value(&world, &crate::parser::parse_event("ZRX TotalSupply")?)?;
        assert_eq!(supply, Value::Number(Number::from_integer(100)));
        Ok(())
    }

    #[test]
    fn set_fail_needs_an_evil_token() -> anyhow::Result<()> {
        let (world, _dir) = dev_world()?;
        let macros = world.macros().clone();
        let world = run_command(&world, "Erc20 Deploy Standard ZRX \"0x Protocol Token\" 18", &macros)?;
        let err = match run_command(&world, "Erc20 ZRX SetFail True", &macros) {
            Err(err) => err,
            Ok(_) => panic!("standard tokens cannot fail"),
        };
        assert!(err.to_string().contains("setFail"));
        let world = run_command(&world, "Erc20 Deploy Evil EVL \"Evil Token\"", &macros)?;
        let world = run_command(&world, "Erc20 EVL SetFail True", &macros)?;
        assert!(world.actions().last().is_some_and(|a| a.message == "Set EVL to fail=true"));
        Ok(())
    }
}
