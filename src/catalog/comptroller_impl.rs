//! `ComptrollerImpl` noun: implementation deployment and the `_become` upgrade path.
//!
//! Which `Become*` command applies is decided by the generation recorded when
//! the implementation was deployed, never by probing the contract.

use serde_json::json;
use tracing::info;

use crate::catalog::{addresses, invoke_action, params_arg, uint};
use crate::chain::Contract;
use crate::command::{Arg, Args, Command, Fetcher, get_fetcher_value, process_command_event};
use crate::core_value::{get_address_v, get_array_v, get_exp_number_v, get_number_v, get_string_v};
use crate::error::Result;
use crate::event::Event;
use crate::generation::{BecomeKind, Generation};
use crate::invoke::{Invokation, deploy};
use crate::lookup::{get_comptroller_impl, get_ctoken, get_unitroller, impl_generation};
use crate::networks::{IndexedData, merge_contract_abi, store_and_save_contract};
use crate::value::{Address, Token, Value};
use crate::world::World;

struct ImplData {
    contract: Contract,
    invokation: Invokation,
    generation: Generation,
}

fn deployer(from: Address, generation: Generation) -> Fetcher<ImplData> {
    let label = generation.label();
    Fetcher::new(
        label,
        &format!("Deploys a {label} implementation: ComptrollerImpl Deploy {label} MyImpl"),
        vec![Arg::new("name", get_string_v)],
        move |world, args| {
            let name: String = args.get("name")?;
            let (contract, invokation) = deploy(world, from, generation.artifact(), &name, Vec::new())?;
            Ok(ImplData {
                contract,
                invokation,
                generation,
            })
        },
    )
}

fn deploy_comptroller_impl(world: &World, from: Address, params: &Event) -> Result<World> {
    let mut deployers: Vec<Fetcher<ImplData>> = Generation::ALL
        .into_iter()
        .map(|generation| deployer(from, generation))
        .collect();
    deployers.push(
        Fetcher::new(
            "Default",
            "Deploys the current implementation: ComptrollerImpl Deploy MyImpl",
            vec![Arg::new("name", get_string_v)],
            move |world, args| {
                let name: String = args.get("name")?;
                let generation = Generation::Standard;
                let (contract, invokation) = deploy(world, from, generation.artifact(), &name, Vec::new())?;
                Ok(ImplData {
                    contract,
                    invokation,
                    generation,
                })
            },
        )
        .catchall(),
    );
    let data = get_fetcher_value("DeployComptrollerImpl", &deployers, world, params)?;
    let name = data.contract.name.clone();
    let address = data.contract.address;
    info!(%name, generation = %data.generation, %address, "comptroller implementation deployed");
    let index = IndexedData::new(
        &["Comptroller", name.as_str()],
        json!({
            "address": address.to_string(),
            "contract": data.generation.artifact(),
            "description": data.generation.label(),
            "generation": data.generation.label(),
        }),
    );
    let world = store_and_save_contract(world, &data.contract, &name, Some(&data.invokation), vec![index]);
    Ok(world.add_action(
        format!(
            "Added Comptroller Implementation ({}) at address {address}",
            data.generation
        ),
        Some(data.invokation),
    ))
}

/// Sends `_become` and re-registers the unitroller as `Comptroller` with the merged ABI.
fn become_impl(world: &World, from: Address, args: &Args, rest: Vec<Token>) -> Result<World> {
    let unitroller: Contract = args.get("unitroller")?;
    let implementation: Contract = args.get("comptrollerImpl")?;
    let mut call_args = vec![Token::Address(unitroller.address)];
    call_args.extend(rest);
    let message = format!("Become {}'s Comptroller Impl", unitroller.name);
    let world = invoke_action(world, from, &implementation, "_become", call_args, message)?;
    let recorded = IndexedData::new(&["Unitroller", "implementation"], json!(implementation.name));
    merge_contract_abi(&world, "Comptroller", &unitroller, "Unitroller", &implementation, vec![recorded])
}

fn become_kind(world: &World, args: &Args) -> Result<BecomeKind> {
    let implementation: Contract = args.get("comptrollerImpl")?;
    Ok(impl_generation(world, &implementation).capabilities().become_kind)
}

fn commands() -> Vec<Command> {
    let implementation = || Arg::new("comptrollerImpl", get_comptroller_impl);
    let unitroller = || Arg::implicit("unitroller", get_unitroller);
    vec![
        Command::new(
            "Deploy",
            "Deploys an implementation: ComptrollerImpl Deploy Scenario ScenComptroller",
            vec![params_arg()],
            |world, from, args| deploy_comptroller_impl(world, from, &args.get("params")?),
        ),
        Command::new(
            "BecomeG1",
            "Adopts a G1 implementation: ComptrollerImpl ScenComptrollerG1 BecomeG1 (PriceOracle Address) 0.5 20",
            vec![
                implementation(),
                unitroller(),
                Arg::new("priceOracle", get_address_v),
                Arg::new("closeFactor", get_exp_number_v),
                Arg::new("maxAssets", get_number_v),
            ],
            |world, from, args| {
                let rest = vec![
                    Token::Address(args.get("priceOracle")?),
                    uint(&args.get("closeFactor")?),
                    uint(&args.get("maxAssets")?),
                    Token::Bool(false),
                ];
                become_impl(world, from, &args, rest)
            },
        )
        .name_pos(1)
        .when("an implementation taking an oracle", |world, args| {
            Ok(become_kind(world, args)? == BecomeKind::WithOracle)
        }),
        Command::new(
            "Recome",
            "Re-initializes a G1 implementation: ComptrollerImpl ScenComptrollerG1 Recome",
            vec![implementation(), unitroller()],
            |world, from, args| {
                let rest = vec![
                    Token::Address(Address::ZERO),
                    Token::uint(0),
                    Token::uint(0),
                    Token::Bool(true),
                ];
                become_impl(world, from, &args, rest)
            },
        )
        .name_pos(1)
        .when("an implementation taking an oracle", |world, args| {
            Ok(become_kind(world, args)? == BecomeKind::WithOracle)
        }),
        Command::new(
            "BecomeG2",
            "Adopts a G2 implementation: ComptrollerImpl ScenComptrollerG2 BecomeG2",
            vec![implementation(), unitroller()],
            |world, from, args| become_impl(world, from, &args, Vec::new()),
        )
        .name_pos(1)
        .when("a G2 implementation", |world, args| {
            let implementation: Contract = args.get("comptrollerImpl")?;
            Ok(matches!(
                impl_generation(world, &implementation),
                Generation::G2 | Generation::ScenarioG2
            ))
        }),
        Command::new(
            "BecomeG3",
            "Adopts a G3 implementation: ComptrollerImpl ScenComptrollerG3 BecomeG3 1e18 [cZRX] [cBAT]",
            vec![
                implementation(),
                unitroller(),
                Arg::new("compRate", get_number_v),
                Arg::new("compMarkets", |world: &World, event: &Event| get_array_v(world, event, get_ctoken))
                    .default(Vec::<Contract>::new()),
                Arg::new("otherMarkets", |world: &World, event: &Event| get_array_v(world, event, get_ctoken))
                    .default(Vec::<Contract>::new()),
            ],
            |world, from, args| {
                let comp_markets: Vec<Contract> = args.get("compMarkets")?;
                let other_markets: Vec<Contract> = args.get("otherMarkets")?;
                let rest = vec![
                    uint(&args.get("compRate")?),
                    addresses(&comp_markets),
                    addresses(&other_markets),
                ];
                become_impl(world, from, &args, rest)
            },
        )
        .name_pos(1)
        .when("an implementation taking a comp rate", |world, args| {
            Ok(become_kind(world, args)? == BecomeKind::WithCompRate)
        }),
        Command::new(
            "Become",
            "Adopts an implementation: ComptrollerImpl ScenComptroller Become",
            vec![implementation(), unitroller()],
            |world, from, args| become_impl(world, from, &args, Vec::new()),
        )
        .name_pos(1)
        .when("an implementation with a plain _become", |world, args| {
            Ok(become_kind(world, args)? == BecomeKind::Plain)
        }),
    ]
}

pub fn process_comptroller_impl_event(world: &World, event: &Event, from: Address) -> Result<World> {
    process_command_event("ComptrollerImpl", &commands(), world, event, from)
}

pub fn get_comptroller_impl_value(world: &World, event: &Event) -> Result<Value> {
    let implementation = || Arg::new("comptrollerImpl", get_comptroller_impl);
    let fetchers = [
        Fetcher::new("Address", "ComptrollerImpl <impl> Address", vec![implementation()], |_, args| {
            Ok(Value::Address(args.get::<Contract>("comptrollerImpl")?.address))
        })
        .name_pos(1),
        Fetcher::new("Generation", "ComptrollerImpl <impl> Generation", vec![implementation()], |world, args| {
            let contract: Contract = args.get("comptrollerImpl")?;
            Ok(Value::String(impl_generation(world, &contract).label().to_string()))
        })
        .name_pos(1),
    ];
    get_fetcher_value("ComptrollerImpl", &fetchers, world, event)
}
