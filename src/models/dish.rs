use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Upper bound on dishes per batch, applied by both the analyzer and the generator.
pub const MAX_DISHES: usize = 5;

/// A dish picked out of a menu. Fields missing from the model reply stay empty
/// and are rejected only when the dish is used.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Dish {
    #[serde(default, deserialize_with = "lenient_string")]
    pub name: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub description: String,
}

impl Dish {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
        }
    }
}

pub type DishBatch = Vec<Dish>;

/// Null and nested values read as empty; numbers and booleans keep their text.
fn lenient_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::String(text)) => text,
        Some(Value::Number(number)) => number.to_string(),
        Some(Value::Bool(flag)) => flag.to_string(),
        _ => String::new(),
    })
}
