//! Lenient string fields.
//!
//! YAML and `--set` turn `8080`, `true` or `1.5` into numbers and booleans.
//! Fields that the server reads as text accept any scalar and keep its text.

use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer};

/// A scalar read back as text.
#[derive(Deserialize)]
#[serde(untagged)]
enum ScalarText {
    Text(String),
    Bool(bool),
    Signed(i64),
    Unsigned(u64),
    Float(f64),
}

impl From<ScalarText> for String {
    fn from(value: ScalarText) -> Self {
        match value {
            ScalarText::Text(s) => s,
            ScalarText::Bool(b) => b.to_string(),
            ScalarText::Signed(n) => n.to_string(),
            ScalarText::Unsigned(n) => n.to_string(),
            ScalarText::Float(n) => n.to_string(),
        }
    }
}

/// A required string field.
pub fn string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    ScalarText::deserialize(deserializer).map(String::from)
}

/// An optional string field; null reads as unset.
pub fn option_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<ScalarText>::deserialize(deserializer).map(|value| value.map(String::from))
}

/// A string-to-string map; entries set to null are dropped.
pub fn string_map<'de, D>(deserializer: D) -> Result<BTreeMap<String, String>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = BTreeMap::<String, Option<ScalarText>>::deserialize(deserializer)?;
    Ok(raw
        .into_iter()
        .filter_map(|(key, value)| value.map(|v| (key, String::from(v))))
        .collect())
}
