//! Runtime values produced by resolving events.

use std::fmt;
use std::str::FromStr;

use num_bigint::BigInt;
use num_traits::Signed;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::{Result, ScenarioError};
use crate::event::Event;
use crate::number::Number;

/// A 20-byte account or contract address.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Address(pub [u8; 20]);

impl Address {
    pub const ZERO: Address = Address([0u8; 20]);

    pub fn from_slice(bytes: &[u8]) -> Option<Address> {
        let array: [u8; 20] = bytes.get(..20)?.try_into().ok()?;
        Some(Address(array))
    }

    /// Lowercase `0x` form used as the contract index key.
    pub fn key(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl FromStr for Address {
    type Err = ScenarioError;

    fn from_str(text: &str) -> Result<Self> {
        let digits = text
            .strip_prefix("0x")
            .or_else(|| text.strip_prefix("0X"))
            .ok_or_else(|| ScenarioError::mismatch("Address", "text without 0x prefix", text))?;
        if digits.len() != 40 {
            return Err(ScenarioError::mismatch(
                "Address",
                format!("{} hex digits", digits.len()),
                text,
            ));
        }
        let bytes = hex::decode(digits)
            .map_err(|err| ScenarioError::mismatch("Address", err.to_string(), text))?;
        Address::from_slice(&bytes)
            .ok_or_else(|| ScenarioError::mismatch("Address", "short address", text))
    }
}

impl Serialize for Address {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Address {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        text.parse().map_err(serde::de::Error::custom)
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    Address(Address),
    Number(Number),
    String(String),
    Bool(bool),
    List(Vec<Value>),
    Array(Vec<Value>),
    Event(Event),
}

impl Value {
    pub fn kind(&self) -> &'static str {
        match self {
            Value::Address(_) => "Address",
            Value::Number(_) => "Number",
            Value::String(_) => "String",
            Value::Bool(_) => "Bool",
            Value::List(_) => "List",
            Value::Array(_) => "Array",
            Value::Event(_) => "Event",
        }
    }

    pub fn show(&self) -> String {
        match self {
            Value::Address(address) => address.to_string(),
            Value::Number(number) => number.show(),
            Value::String(text) => text.clone(),
            Value::Bool(flag) => flag.to_string(),
            Value::List(items) | Value::Array(items) => {
                let shown: Vec<String> = items.iter().map(Value::show).collect();
                format!("[{}]", shown.join(", "))
            }
            Value::Event(event) => event.to_string(),
        }
    }

    /// Exact representation passed to the chain.
    pub fn encode(&self) -> Result<Token> {
        Ok(match self {
            Value::Address(address) => Token::Address(*address),
            Value::Number(number) => {
                let encoded = number.encode();
                if encoded.is_negative() {
                    Token::Int(encoded)
                } else {
                    Token::Uint(encoded)
                }
            }
            Value::String(text) => Token::String(text.clone()),
            Value::Bool(flag) => Token::Bool(*flag),
            Value::List(items) | Value::Array(items) => {
                Token::Array(items.iter().map(Value::encode).collect::<Result<_>>()?)
            }
            Value::Event(event) => {
                return Err(ScenarioError::mismatch("encodable value", "Event", event));
            }
        })
    }

    /// Compares denoted values; numbers compare by quantity, lists and arrays by elements.
    pub fn loosely_equals(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Number(a), Value::Number(b)) => a.same_value(b),
            (Value::List(a) | Value::Array(a), Value::List(b) | Value::Array(b)) => {
                a.len() == b.len() && a.iter().zip(b).all(|(x, y)| x.loosely_equals(y))
            }
            (Value::String(a), Value::String(b)) => a == b,
            (a, b) => a == b,
        }
    }
}

impl From<Address> for Value {
    fn from(address: Address) -> Self {
        Value::Address(address)
    }
}

impl From<Number> for Value {
    fn from(number: Number) -> Self {
        Value::Number(number)
    }
}

impl From<bool> for Value {
    fn from(flag: bool) -> Self {
        Value::Bool(flag)
    }
}

impl From<String> for Value {
    fn from(text: String) -> Self {
        Value::String(text)
    }
}

/// An encoded call argument or return value.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Token {
    Address(Address),
    Uint(BigInt),
    Int(BigInt),
    String(String),
    Bool(bool),
    Array(Vec<Token>),
}

impl Token {
    pub fn uint(value: impl Into<BigInt>) -> Self {
        Token::Uint(value.into())
    }

    /// Reads a returned token back as an unscaled value.
    pub fn into_value(self) -> Value {
        match self {
            Token::Address(address) => Value::Address(address),
            Token::Uint(n) | Token::Int(n) => Value::Number(Number::from_integer(n)),
            Token::String(text) => Value::String(text),
            Token::Bool(flag) => Value::Bool(flag),
            Token::Array(items) => Value::Array(items.into_iter().map(Token::into_value).collect()),
        }
    }

    /// JSON form stored in the registry; integers are decimal strings.
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Token::Address(address) => serde_json::Value::String(address.to_string()),
            Token::Uint(n) | Token::Int(n) => serde_json::Value::String(n.to_string()),
            Token::String(text) => serde_json::Value::String(text.clone()),
            Token::Bool(flag) => serde_json::Value::Bool(*flag),
            Token::Array(items) => serde_json::Value::Array(items.iter().map(Token::to_json).collect()),
        }
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Address(address) => write!(f, "{address}"),
            Token::Uint(n) | Token::Int(n) => write!(f, "{n}"),
            Token::String(text) => write!(f, "{text:?}"),
            Token::Bool(flag) => write!(f, "{flag}"),
            Token::Array(items) => {
                let parts: Vec<String> = items.iter().map(Token::to_string).collect();
                write!(f, "[{}]", parts.join(","))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::number::EXP_SCALE;

    const ZRX: &str = "0xe41d2489571d322189246dafa5ebde1f4699f498";

    #[test]
    fn address_parses_and_displays_lowercase() -> Result<()> {
        let address: Address = "0xE41D2489571D322189246DAFA5EBDE1F4699F498".parse()?;
        assert_eq!(address.to_string(), ZRX);
        assert!("0x1234".parse::<Address>().is_err());
        assert!("e41d2489571d322189246dafa5ebde1f4699f498".parse::<Address>().is_err());
        Ok(())
    }

    #[test]
    fn address_serde_uses_hex_string() -> anyhow::Result<()> {
        let address: Address = ZRX.parse()?;
        let json = serde_json::to_string(&address)?;
        assert_eq!(json, format!("\"{ZRX}\""));
        let back: Address = serde_json::from_str(&json)?;
        assert_eq!(back, address);
        Ok(())
    }

    #[test]
    fn show_and_encode_lists() -> Result<()> {
        let half = Number::parse("0.5").map(|n| n.with_scale(EXP_SCALE));
        let value = Value::Array(vec![
            Value::Number(half.ok_or_else(|| ScenarioError::handler("test", "literal"))?),
            Value::Bool(true),
            Value::String("ZRX".into()),
        ]);
        assert_eq!(value.show(), "[0.5, true, ZRX]");
        assert_eq!(
            value.encode()?,
            Token::Array(vec![
                Token::uint(500_000_000_000_000_000u64),
                Token::Bool(true),
                Token::String("ZRX".into()),
            ])
        );
        Ok(())
    }

    #[test]
    fn events_do_not_encode() {
        let value = Value::Event(Event::atom("Print"));
        assert!(matches!(value.encode(), Err(ScenarioError::TypeMismatch { .. })));
    }
}
