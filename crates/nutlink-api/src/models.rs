use std::fmt;
use std::num::ParseIntError;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Connected client hosts, grouped per device in server order.
pub type ClientList = IndexMap<String, Vec<String>>;

/// Ordered `name -> value` listing as returned by `LIST UPS`, `LIST VAR`
/// and `LIST RW`.
pub type Listing = IndexMap<String, String>;

/// Parsed `GET TYPE` reply.
///
/// upsd answers with a set of flags, e.g. `RW STRING:64`, `RW ENUM`,
/// `NUMBER`. Unknown flags are ignored so newer servers keep working.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VarType {
    pub writable: bool,
    pub enumerated: bool,
    pub ranged: bool,
    pub number: bool,
    /// Maximum length for `STRING:<n>` variables.
    pub string_max: Option<usize>,
}

impl VarType {
    pub fn from_words<'a>(words: impl IntoIterator<Item = &'a str>) -> Result<Self, ParseIntError> {
        let mut ty = Self::default();
        for word in words {
            match word {
                "RW" => ty.writable = true,
                "ENUM" => ty.enumerated = true,
                "RANGE" => ty.ranged = true,
                "NUMBER" => ty.number = true,
                other => {
                    if let Some(len) = other.strip_prefix("STRING:") {
                        ty.string_max = Some(len.parse()?);
                    }
                }
            }
        }
        Ok(ty)
    }

    pub fn is_string(&self) -> bool {
        self.string_max.is_some()
    }
}

impl fmt::Display for VarType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut words = Vec::new();
        if self.writable {
            words.push("RW".to_owned());
        }
        if self.enumerated {
            words.push("ENUM".to_owned());
        }
        if self.ranged {
            words.push("RANGE".to_owned());
        }
        if let Some(max) = self.string_max {
            words.push(format!("STRING:{max}"));
        }
        if self.number {
            words.push("NUMBER".to_owned());
        }
        f.write_str(&words.join(" "))
    }
}
