//! Contract ABI fragments as stored in `<network>-abi.json`.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

/// A fragment parameter. Keys other than `name` and `type` are carried through untouched.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Param {
    #[serde(default)]
    pub name: String,
    #[serde(rename = "type")]
    pub ty: String,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl Param {
    pub fn new(name: &str, ty: &str) -> Self {
        Param {
            name: name.to_string(),
            ty: ty.to_string(),
            extra: serde_json::Map::new(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Fragment {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub name: String,
    #[serde(default)]
    pub inputs: Vec<Param>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub outputs: Vec<Param>,
    #[serde(
        default,
        rename = "stateMutability",
        skip_serializing_if = "Option::is_none"
    )]
    pub state_mutability: Option<String>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl Fragment {
    pub fn function(name: &str, inputs: &[(&str, &str)], outputs: &[&str], mutability: &str) -> Self {
        Fragment {
            kind: "function".to_string(),
            name: name.to_string(),
            inputs: inputs.iter().map(|(n, t)| Param::new(n, t)).collect(),
            outputs: outputs.iter().map(|t| Param::new("", t)).collect(),
            state_mutability: Some(mutability.to_string()),
            extra: serde_json::Map::new(),
        }
    }

    pub fn constructor(inputs: &[(&str, &str)]) -> Self {
        Fragment {
            kind: "constructor".to_string(),
            name: String::new(),
            inputs: inputs.iter().map(|(n, t)| Param::new(n, t)).collect(),
            outputs: Vec::new(),
            state_mutability: Some("nonpayable".to_string()),
            extra: serde_json::Map::new(),
        }
    }

    /// `kind name(type,...)`; identical signatures denote the same callable entry.
    pub fn signature(&self) -> String {
        let types: Vec<&str> = self.inputs.iter().map(|p| p.ty.as_str()).collect();
        format!("{} {}({})", self.kind, self.name, types.join(","))
    }

    pub fn is_view(&self) -> bool {
        matches!(self.state_mutability.as_deref(), Some("view" | "pure"))
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Abi {
    pub fragments: Vec<Fragment>,
}

impl Abi {
    pub fn new(fragments: Vec<Fragment>) -> Self {
        Abi { fragments }
    }

    pub fn function(&self, name: &str) -> Option<&Fragment> {
        self.fragments
            .iter()
            .find(|f| f.kind == "function" && f.name == name)
    }

    pub fn has_function(&self, name: &str) -> bool {
        self.function(name).is_some()
    }

    pub fn constructor(&self) -> Option<&Fragment> {
        self.fragments.iter().find(|f| f.kind == "constructor")
    }

    /// Union of both ABIs, keeping the first fragment seen for each signature.
    pub fn merge(&self, other: &Abi) -> Abi {
        let mut seen = BTreeSet::new();
        let fragments = self
            .fragments
            .iter()
            .chain(&other.fragments)
            .filter(|f| seen.insert(f.signature()))
            .cloned()
            .collect();
        Abi { fragments }
    }

    /// Sorted signatures of every fragment.
    pub fn surface(&self) -> BTreeSet<String> {
        self.fragments.iter().map(Fragment::signature).collect()
    }
}
