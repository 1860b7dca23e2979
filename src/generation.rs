//! Comptroller implementation generations and the optional capabilities each one carries.

use std::fmt;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Generation {
    G1,
    G2,
    G3,
    G4,
    G5,
    G6,
    G7,
    ScenarioG1,
    ScenarioG2,
    ScenarioG3,
    ScenarioG4,
    ScenarioG5,
    ScenarioG6,
    Scenario,
    Borked,
    Standard,
}

/// Shape of the `_become` entry point an implementation exposes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BecomeKind {
    /// `_become(unitroller, oracle, closeFactor, maxAssets, reinitializing)`
    WithOracle,
    /// `_become(unitroller, compRate, compMarkets, otherMarkets)`
    WithCompRate,
    /// `_become(unitroller)`
    Plain,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Capabilities {
    pub set_max_assets: bool,
    pub set_paused: bool,
    pub unlist: bool,
    pub become_kind: BecomeKind,
}

impl Generation {
    pub const ALL: [Generation; 16] = [
        Generation::G1,
        Generation::G2,
        Generation::G3,
        Generation::G4,
        Generation::G5,
        Generation::G6,
        Generation::G7,
        Generation::ScenarioG1,
        Generation::ScenarioG2,
        Generation::ScenarioG3,
        Generation::ScenarioG4,
        Generation::ScenarioG5,
        Generation::ScenarioG6,
        Generation::Scenario,
        Generation::Borked,
        Generation::Standard,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Generation::G1 => "G1",
            Generation::G2 => "G2",
            Generation::G3 => "G3",
            Generation::G4 => "G4",
            Generation::G5 => "G5",
            Generation::G6 => "G6",
            Generation::G7 => "G7",
            Generation::ScenarioG1 => "ScenarioG1",
            Generation::ScenarioG2 => "ScenarioG2",
            Generation::ScenarioG3 => "ScenarioG3",
            Generation::ScenarioG4 => "ScenarioG4",
            Generation::ScenarioG5 => "ScenarioG5",
            Generation::ScenarioG6 => "ScenarioG6",
            Generation::Scenario => "Scenario",
            Generation::Borked => "Borked",
            Generation::Standard => "Standard",
        }
    }

    pub fn parse(label: &str) -> Option<Generation> {
        Generation::ALL
            .into_iter()
            .find(|generation| generation.label().eq_ignore_ascii_case(label))
    }

    /// Artifact deployed for this generation.
    pub fn artifact(self) -> &'static str {
        match self {
            Generation::G1 => "ComptrollerG1",
            Generation::G2 => "ComptrollerG2",
            Generation::G3 => "ComptrollerG3",
            Generation::G4 => "ComptrollerG4",
            Generation::G5 => "ComptrollerG5",
            Generation::G6 => "ComptrollerG6",
            Generation::G7 => "ComptrollerG7",
            Generation::ScenarioG1 => "ComptrollerScenarioG1",
            Generation::ScenarioG2 => "ComptrollerScenarioG2",
            Generation::ScenarioG3 => "ComptrollerScenarioG3",
            Generation::ScenarioG4 => "ComptrollerScenarioG4",
            Generation::ScenarioG5 => "ComptrollerScenarioG5",
            Generation::ScenarioG6 => "ComptrollerScenarioG6",
            Generation::Scenario => "ComptrollerScenario",
            Generation::Borked => "ComptrollerBorked",
            Generation::Standard => "Comptroller",
        }
    }

    pub fn from_artifact(artifact: &str) -> Option<Generation> {
        Generation::ALL
            .into_iter()
            .find(|generation| generation.artifact() == artifact)
    }

    pub fn capabilities(self) -> Capabilities {
        let release = |set_max_assets, set_paused, become_kind| Capabilities {
            set_max_assets,
            set_paused,
            unlist: false,
            become_kind,
        };
        let scenario = |caps: Capabilities| Capabilities {
            unlist: true,
            ..caps
        };
        match self {
            Generation::G1 => release(true, false, BecomeKind::WithOracle),
            Generation::G2 => release(true, true, BecomeKind::Plain),
            Generation::G3 => release(true, true, BecomeKind::WithCompRate),
            Generation::G4 | Generation::G5 => release(true, true, BecomeKind::Plain),
            Generation::G6 | Generation::G7 | Generation::Standard => {
                release(false, true, BecomeKind::Plain)
            }
            Generation::ScenarioG1 => scenario(Generation::G1.capabilities()),
            Generation::ScenarioG2 => scenario(Generation::G2.capabilities()),
            Generation::ScenarioG3 => scenario(Generation::G3.capabilities()),
            Generation::ScenarioG4 => scenario(Generation::G4.capabilities()),
            Generation::ScenarioG5 => scenario(Generation::G5.capabilities()),
            Generation::ScenarioG6 => scenario(Generation::G6.capabilities()),
            Generation::Scenario => scenario(Generation::G7.capabilities()),
            Generation::Borked => release(false, false, BecomeKind::Plain),
        }
    }
}

impl fmt::Display for Generation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn labels_and_artifacts_round_trip() {
        for generation in Generation::ALL {
            assert_eq!(Generation::parse(generation.label()), Some(generation));
            assert_eq!(Generation::from_artifact(generation.artifact()), Some(generation));
        }
        assert_eq!(Generation::parse("scenariog3"), Some(Generation::ScenarioG3));
        assert_eq!(Generation::parse("G9"), None);
    }

    #[test]
    fn capabilities_follow_generation() {
        assert!(Generation::G1.capabilities().set_max_assets);
        assert!(!Generation::G1.capabilities().set_paused);
        assert!(!Generation::G7.capabilities().set_max_assets);
        assert!(Generation::ScenarioG3.capabilities().unlist);
        assert_eq!(
            Generation::ScenarioG3.capabilities().become_kind,
            BecomeKind::WithCompRate
        );
        assert!(!Generation::Standard.capabilities().unlist);
    }
}
