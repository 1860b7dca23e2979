//! Compiled-contract ABIs known to the in-memory chain.

use std::collections::BTreeMap;

use once_cell::sync::Lazy;

use crate::abi::{Abi, Fragment};
use crate::generation::{BecomeKind, Generation};

static ARTIFACTS: Lazy<BTreeMap<String, Abi>> = Lazy::new(|| {
    let mut out = BTreeMap::new();
    out.insert("StandardToken".to_string(), erc20(&[]));
    out.insert("FaucetNonStandardToken".to_string(), erc20(&[]));
    out.insert(
        "EvilToken".to_string(),
        erc20(&[Fragment::function("setFail", &[("fail", "bool")], &[], "nonpayable")]),
    );
    out.insert(
        "WBTCToken".to_string(),
        erc20(&[
            Fragment::function("pause", &[], &[], "nonpayable"),
            Fragment::function("unpause", &[], &[], "nonpayable"),
            Fragment::function("paused", &[], &["bool"], "view"),
        ]),
    );
    out.insert(
        "FeeToken".to_string(),
        erc20_with_constructor(
            Fragment::constructor(&[
                ("totalSupply", "uint256"),
                ("name", "string"),
                ("decimals", "uint8"),
                ("symbol", "string"),
                ("basisPointFee", "uint256"),
                ("owner", "address"),
            ]),
            &[
                Fragment::function("basisPointFee", &[], &["uint256"], "view"),
                Fragment::function("owner", &[], &["address"], "view"),
            ],
        ),
    );
    out.insert("Unitroller".to_string(), unitroller());
    out.insert("CErc20Immutable".to_string(), ctoken());
    out.insert("CErc20Scenario".to_string(), ctoken());
    for generation in Generation::ALL {
        out.insert(generation.artifact().to_string(), comptroller(generation));
    }
    out
});

pub fn artifact(name: &str) -> Option<&'static Abi> {
    ARTIFACTS.get(name)
}

pub fn artifact_names() -> impl Iterator<Item = &'static str> {
    ARTIFACTS.keys().map(String::as_str)
}

fn erc20(extra: &[Fragment]) -> Abi {
    erc20_with_constructor(
        Fragment::constructor(&[
            ("totalSupply", "uint256"),
            ("name", "string"),
            ("decimals", "uint8"),
            ("symbol", "string"),
        ]),
        extra,
    )
}

fn erc20_with_constructor(constructor: Fragment, extra: &[Fragment]) -> Abi {
    let mut fragments = vec![
        constructor,
        Fragment::function("name", &[], &["string"], "view"),
        Fragment::function("symbol", &[], &["string"], "view"),
        Fragment::function("decimals", &[], &["uint8"], "view"),
        Fragment::function("totalSupply", &[], &["uint256"], "view"),
        Fragment::function("balanceOf", &[("owner", "address")], &["uint256"], "view"),
        Fragment::function(
            "allowance",
            &[("owner", "address"), ("spender", "address")],
            &["uint256"],
            "view",
        ),
        Fragment::function(
            "approve",
            &[("spender", "address"), ("amount", "uint256")],
            &["bool"],
            "nonpayable",
        ),
        Fragment::function(
            "transfer",
            &[("dst", "address"), ("amount", "uint256")],
            &["bool"],
            "nonpayable",
        ),
        Fragment::function(
            "transferFrom",
            &[("src", "address"), ("dst", "address"), ("amount", "uint256")],
            &["bool"],
            "nonpayable",
        ),
        Fragment::function(
            "allocateTo",
            &[("owner", "address"), ("value", "uint256")],
            &[],
            "nonpayable",
        ),
    ];
    fragments.extend_from_slice(extra);
    Abi::new(fragments)
}

fn unitroller() -> Abi {
    Abi::new(vec![
        Fragment::constructor(&[]),
        Fragment::function("admin", &[], &["address"], "view"),
        Fragment::function("pendingAdmin", &[], &["address"], "view"),
        Fragment::function("implementation", &[], &["address"], "view"),
        Fragment::function("pendingImplementation", &[], &["address"], "view"),
        Fragment::function(
            "_setPendingImplementation",
            &[("newPendingImplementation", "address")],
            &["uint256"],
            "nonpayable",
        ),
        Fragment::function("_acceptImplementation", &[], &["uint256"], "nonpayable"),
        Fragment::function(
            "_setPendingAdmin",
            &[("newPendingAdmin", "address")],
            &["uint256"],
            "nonpayable",
        ),
        Fragment::function("_acceptAdmin", &[], &["uint256"], "nonpayable"),
    ])
}

fn ctoken() -> Abi {
    Abi::new(vec![
        Fragment::constructor(&[
            ("underlying", "address"),
            ("comptroller", "address"),
            ("exchangeRateStored", "uint256"),
            ("name", "string"),
            ("symbol", "string"),
            ("decimals", "uint8"),
            ("admin", "address"),
        ]),
        Fragment::function("underlying", &[], &["address"], "view"),
        Fragment::function("comptroller", &[], &["address"], "view"),
        Fragment::function("exchangeRateStored", &[], &["uint256"], "view"),
        Fragment::function("name", &[], &["string"], "view"),
        Fragment::function("symbol", &[], &["string"], "view"),
        Fragment::function("decimals", &[], &["uint8"], "view"),
        Fragment::function("admin", &[], &["address"], "view"),
        Fragment::function("balanceOf", &[("owner", "address")], &["uint256"], "view"),
        Fragment::function("mint", &[("mintAmount", "uint256")], &["uint256"], "nonpayable"),
        Fragment::function("redeem", &[("redeemTokens", "uint256")], &["uint256"], "nonpayable"),
    ])
}

fn comptroller(generation: Generation) -> Abi {
    let caps = generation.capabilities();
    let mut fragments = vec![
        Fragment::constructor(&[]),
        Fragment::function("admin", &[], &["address"], "view"),
        Fragment::function("pendingAdmin", &[], &["address"], "view"),
        Fragment::function("oracle", &[], &["address"], "view"),
        Fragment::function("closeFactorMantissa", &[], &["uint256"], "view"),
        Fragment::function("liquidationIncentiveMantissa", &[], &["uint256"], "view"),
        Fragment::function(
            "collateralFactorMantissa",
            &[("cToken", "address")],
            &["uint256"],
            "view",
        ),
        Fragment::function("isListed", &[("cToken", "address")], &["bool"], "view"),
        Fragment::function("_supportMarket", &[("cToken", "address")], &["uint256"], "nonpayable"),
        Fragment::function(
            "_setCollateralFactor",
            &[("cToken", "address"), ("newCollateralFactorMantissa", "uint256")],
            &["uint256"],
            "nonpayable",
        ),
        Fragment::function(
            "_setCloseFactor",
            &[("newCloseFactorMantissa", "uint256")],
            &["uint256"],
            "nonpayable",
        ),
        Fragment::function(
            "_setPriceOracle",
            &[("newOracle", "address")],
            &["uint256"],
            "nonpayable",
        ),
        Fragment::function(
            "_setLiquidationIncentive",
            &[("newLiquidationIncentiveMantissa", "uint256")],
            &["uint256"],
            "nonpayable",
        ),
        Fragment::function(
            "_setPendingAdmin",
            &[("newPendingAdmin", "address")],
            &["uint256"],
            "nonpayable",
        ),
        Fragment::function("_acceptAdmin", &[], &["uint256"], "nonpayable"),
        Fragment::function(
            "enterMarkets",
            &[("cTokens", "address[]")],
            &["uint256[]"],
            "nonpayable",
        ),
        Fragment::function("exitMarket", &[("cToken", "address")], &["uint256"], "nonpayable"),
    ];
    if caps.set_max_assets {
        fragments.push(Fragment::function("maxAssets", &[], &["uint256"], "view"));
        fragments.push(Fragment::function(
            "_setMaxAssets",
            &[("newMaxAssets", "uint256")],
            &["uint256"],
            "nonpayable",
        ));
    }
    if caps.set_paused {
        fragments.push(Fragment::function(
            "_setMintPaused",
            &[("cToken", "address"), ("state", "bool")],
            &["bool"],
            "nonpayable",
        ));
        fragments.push(Fragment::function(
            "_setBorrowPaused",
            &[("cToken", "address"), ("state", "bool")],
            &["bool"],
            "nonpayable",
        ));
        fragments.push(Fragment::function(
            "_setTransferPaused",
            &[("state", "bool")],
            &["bool"],
            "nonpayable",
        ));
        fragments.push(Fragment::function(
            "_setSeizePaused",
            &[("state", "bool")],
            &["bool"],
            "nonpayable",
        ));
    }
    if caps.unlist {
        fragments.push(Fragment::function("unlist", &[("cToken", "address")], &[], "nonpayable"));
    }
    fragments.push(match caps.become_kind {
        BecomeKind::WithOracle => Fragment::function(
            "_become",
            &[
                ("unitroller", "address"),
                ("oracle", "address"),
                ("closeFactorMantissa", "uint256"),
                ("maxAssets", "uint256"),
                ("reinitializing", "bool"),
            ],
            &[],
            "nonpayable",
        ),
        BecomeKind::WithCompRate => Fragment::function(
            "_become",
            &[
                ("unitroller", "address"),
                ("compRate", "uint256"),
                ("compMarketsToAdd", "address[]"),
                ("otherMarketsToAdd", "address[]"),
            ],
            &[],
            "nonpayable",
        ),
        BecomeKind::Plain => {
            Fragment::function("_become", &[("unitroller", "address")], &[], "nonpayable")
        }
    });
    Abi::new(fragments)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn comptroller_abi_tracks_capabilities() {
        let g1 = artifact("ComptrollerG1").expect("g1");
        assert!(g1.has_function("_setMaxAssets"));
        assert!(!g1.has_function("_setMintPaused"));
        assert_eq!(g1.function("_become").map(|f| f.inputs.len()), Some(5));

        let latest = artifact("Comptroller").expect("standard");
        assert!(!latest.has_function("_setMaxAssets"));
        assert!(latest.has_function("_setMintPaused"));
        assert_eq!(latest.function("_become").map(|f| f.inputs.len()), Some(1));
    }

    #[test]
    fn every_generation_has_an_artifact() {
        for generation in Generation::ALL {
            assert!(artifact(generation.artifact()).is_some(), "{generation}");
        }
        assert!(artifact_names().any(|name| name == "StandardToken"));
    }
}
