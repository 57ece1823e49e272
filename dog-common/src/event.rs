use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Number;

/// Placeholder for descriptive fields a producer left out.
pub const UNKNOWN: &str = "Unknown";

/// One dog observation, as it travels on the topic.
///
/// The producer always fills every field. On the way back in, `name` and
/// `breed` fall back to [`UNKNOWN`], `age` to `None`, and a missing, null or
/// blank `favorite_toy` decodes to `None` so the consumer can tell an
/// anomalous write apart from a real toy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "RawDogEvent")]
pub struct DogEvent {
    pub name: String,
    pub breed: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub age: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub favorite_toy: Option<String>,
}

/// Every spelling of a field other producers have written. When a body
/// carries more than one, the first non-null spelling listed here wins.
#[derive(Deserialize)]
struct RawDogEvent {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    subject_name: Option<String>,
    #[serde(default)]
    dog_name: Option<String>,
    #[serde(default)]
    breed: Option<String>,
    #[serde(default)]
    category_a: Option<String>,
    #[serde(default)]
    age: Option<Number>,
    #[serde(default)]
    numeric_attribute: Option<Number>,
    #[serde(default)]
    favorite_toy: Option<String>,
    #[serde(default)]
    tagged_value: Option<String>,
    #[serde(default)]
    toy: Option<String>,
}

impl From<RawDogEvent> for DogEvent {
    fn from(raw: RawDogEvent) -> Self {
        let toy = [raw.favorite_toy, raw.tagged_value, raw.toy]
            .into_iter()
            .flatten()
            .find(|v| !v.trim().is_empty());

        Self {
            name: raw
                .name
                .or(raw.subject_name)
                .or(raw.dog_name)
                .unwrap_or_else(unknown),
            breed: raw.breed.or(raw.category_a).unwrap_or_else(unknown),
            // Integers that do not fit an i64 are kept as an unknown age
            age: raw.age.or(raw.numeric_attribute).and_then(|n| n.as_i64()),
            favorite_toy: toy,
        }
    }
}

impl DogEvent {
    pub fn new(name: &str, breed: &str, age: i64, favorite_toy: &str) -> Self {
        Self {
            name: name.to_owned(),
            breed: breed.to_owned(),
            age: Some(age),
            favorite_toy: Some(favorite_toy.to_owned()),
        }
    }
}

impl fmt::Display for DogEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let toy = self.favorite_toy.as_deref().unwrap_or(UNKNOWN);
        match self.age {
            Some(age) => write!(
                f,
                "Dog '{}' is a {}-year-old {} who loves '{}'.",
                self.name, age, self.breed, toy
            ),
            None => write!(
                f,
                "Dog '{}' is a {} of unknown age who loves '{}'.",
                self.name, self.breed, toy
            ),
        }
    }
}

fn unknown() -> String {
    UNKNOWN.to_owned()
}
