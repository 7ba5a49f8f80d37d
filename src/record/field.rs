use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// Text written to artifacts for a field that holds no value
pub const UNSET_SENTINEL: &str = "N/A";

/// A text value that is either known or explicitly unset
///
/// `Unset` is the only representation of absence. It serializes as
/// [`UNSET_SENTINEL`], and blank text parses back to `Unset`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub enum Field {
    #[default]
    Unset,
    Set(String),
}

impl Field {
    /// Builds a field from scraped text, trimming it; blank text is `Unset`
    pub fn from_text(text: impl AsRef<str>) -> Self {
        let text = text.as_ref().trim();
        if text.is_empty() || text == UNSET_SENTINEL {
            Self::Unset
        } else {
            Self::Set(text.to_string())
        }
    }

    pub fn is_set(&self) -> bool {
        matches!(self, Self::Set(_))
    }

    pub fn as_deref(&self) -> Option<&str> {
        match self {
            Self::Set(value) => Some(value.as_str()),
            Self::Unset => None,
        }
    }

    /// Takes `incoming` only if this field is unset and `incoming` is set
    ///
    /// Returns true if the field changed.
    pub fn fill_from(&mut self, incoming: Field) -> bool {
        if self.is_set() || !incoming.is_set() {
            return false;
        }
        *self = incoming;
        true
    }
}

impl From<Option<String>> for Field {
    fn from(value: Option<String>) -> Self {
        value.map(Field::from_text).unwrap_or_default()
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_deref().unwrap_or(UNSET_SENTINEL))
    }
}

impl Serialize for Field {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_deref().unwrap_or(UNSET_SENTINEL))
    }
}

impl<'de> Deserialize<'de> for Field {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = Option::<String>::deserialize(deserializer)?;
        Ok(Field::from(text))
    }
}
