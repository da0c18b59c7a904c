use serde::{Deserialize, Serialize};
use std::fmt;

/// Every legend identifier a live assignment may name.
pub const LEGENDS: &[&str] = &[
    "BODVAR", "GNASH", "SCARLET", "LUCIEN", "BARRAZA", "ULGRIM", "WUSHANG", "MIRAGE", "ARTEMIS",
    "KAYA", "ZARIEL", "THOR", "CASSIDY", "QUEENNAI", "THATCH", "TEROS", "EMBER", "DIANA", "VAL",
    "NIX", "CASPIAN", "ISAIAH", "RAYMAN", "PETRA", "ORION", "HATTORI", "ADA", "BRYNN", "AZOTH",
    "JHALA", "RAGNIR", "MORDEX", "SIDRA", "JIRO", "DUSK", "VECTOR", "LORDVRAXX", "SIRROLAND",
    "SENTINEL", "ASURI", "KOJI", "KOR", "CROSS", "YUMIKO", "XULL", "LINFEI", "FAIT",
];

/// In-round character identifier, normalized to upper case.
///
/// Observed legends come straight from the capture boundary and are not
/// checked against [`LEGENDS`]; only live assignments are.
#[derive(Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct Legend(String);

impl Legend {
    pub fn new(name: &str) -> Self {
        Self(name.trim().to_uppercase())
    }

    /// The empty legend clears a live assignment.
    pub fn none() -> Self {
        Self(String::new())
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn is_known(&self) -> bool {
        LEGENDS.contains(&self.0.as_str())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for Legend {
    fn from(name: &str) -> Self {
        Legend::new(name)
    }
}

impl From<String> for Legend {
    fn from(name: String) -> Self {
        Legend::new(&name)
    }
}

impl From<Legend> for String {
    fn from(legend: Legend) -> Self {
        legend.0
    }
}

impl fmt::Display for Legend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
