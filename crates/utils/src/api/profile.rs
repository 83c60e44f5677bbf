//! Profile documents returned by the remote profile service.
//!
//! The service is loose about shapes: `UserId` and `AvatarVersion` show up as
//! strings or numbers, and `Affiliations` is either a single string or a list.
//! Every field is therefore decoded into a [`Field`] so callers can tell a
//! missing value apart from one that arrived in a shape we do not understand.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};

pub const USER_ID: &str = "UserId";
pub const DISPLAY_NAME: &str = "DisplayName";
pub const AVATAR_VERSION: &str = "AvatarVersion";
pub const AFFILIATIONS: &str = "Affiliations";

#[derive(Debug, Clone, PartialEq)]
pub enum Field<T> {
    Present(T),
    Absent,
    WrongShape(Value),
}

impl<T> Field<T> {
    pub fn present(&self) -> Option<&T> {
        match self {
            Self::Present(value) => Some(value),
            Self::Absent | Self::WrongShape(_) => None,
        }
    }
}

/// Organizational memberships attached to a profile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Affiliation {
    Single(String),
    Many(Vec<String>),
}

impl Affiliation {
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Single(value) => value.is_empty(),
            Self::Many(values) => values.is_empty(),
        }
    }

    /// A single string matches on substring, a list only on an exact element.
    pub fn includes(&self, affiliation: &str) -> bool {
        if affiliation.is_empty() || self.is_empty() {
            return false;
        }

        match self {
            Self::Single(value) => value.contains(affiliation),
            Self::Many(values) => values.iter().any(|value| value == affiliation),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ProfileDocument {
    pub user_id: Field<String>,
    pub display_name: Field<String>,
    pub avatar_version: Field<String>,
    pub affiliations: Field<Affiliation>,
    raw: Value,
}

impl ProfileDocument {
    pub fn from_value(raw: Value) -> Self {
        let empty = Map::new();
        let object = raw.as_object().unwrap_or(&empty);

        Self {
            user_id: scalar_field(object, USER_ID),
            display_name: text_field(object, DISPLAY_NAME),
            avatar_version: scalar_field(object, AVATAR_VERSION),
            affiliations: affiliation_field(object),
            raw,
        }
    }

    pub fn parse(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str::<Value>(json).map(Self::from_value)
    }

    /// The document exactly as the service sent it.
    pub fn raw(&self) -> &Value {
        &self.raw
    }
}

impl Serialize for ProfileDocument {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.raw.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for ProfileDocument {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Value::deserialize(deserializer).map(Self::from_value)
    }
}

fn text_field(object: &Map<String, Value>, key: &str) -> Field<String> {
    match object.get(key) {
        None | Some(Value::Null) => Field::Absent,
        Some(Value::String(value)) => Field::Present(value.clone()),
        Some(other) => Field::WrongShape(other.clone()),
    }
}

fn scalar_field(object: &Map<String, Value>, key: &str) -> Field<String> {
    match object.get(key) {
        Some(Value::Number(number)) => Field::Present(number.to_string()),
        _ => text_field(object, key),
    }
}

fn affiliation_field(object: &Map<String, Value>) -> Field<Affiliation> {
    match object.get(AFFILIATIONS) {
        None | Some(Value::Null) => Field::Absent,
        Some(value @ (Value::String(_) | Value::Array(_))) => {
            serde_json::from_value::<Affiliation>(value.clone())
                .map(Field::Present)
                .unwrap_or_else(|_| Field::WrongShape(value.clone()))
        }
        Some(other) => Field::WrongShape(other.clone()),
    }
}
