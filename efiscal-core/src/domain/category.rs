//! Note category

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::result::Error;

/// Business category assigned to a note
///
/// Serialized with the codes the notes store uses (`padrao`, `qualidade`,
/// `devolucao`, `nao-identificado`).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Category {
    /// Regular shipment, nothing to act on
    #[default]
    #[serde(rename = "padrao")]
    Standard,
    /// Quality claim referencing one or more 5-digit ids
    #[serde(rename = "qualidade")]
    Quality,
    /// Return, the message carries non-boilerplate text
    #[serde(rename = "devolucao")]
    Return,
    /// Message is exactly the boilerplate for its supply reference
    #[serde(rename = "nao-identificado")]
    Unidentified,
}

impl Category {
    pub const ALL: [Category; 4] = [
        Category::Standard,
        Category::Quality,
        Category::Return,
        Category::Unidentified,
    ];

    /// Storage code
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Standard => "padrao",
            Category::Quality => "qualidade",
            Category::Return => "devolucao",
            Category::Unidentified => "nao-identificado",
        }
    }

    /// Human-readable label
    pub fn label(&self) -> &'static str {
        match self {
            Category::Standard => "standard",
            Category::Quality => "quality",
            Category::Return => "return",
            Category::Unidentified => "unidentified",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = Error;

    /// Accepts both the storage codes and the English labels
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "padrao" | "standard" => Ok(Category::Standard),
            "qualidade" | "quality" => Ok(Category::Quality),
            "devolucao" | "return" => Ok(Category::Return),
            "nao-identificado" | "unidentified" => Ok(Category::Unidentified),
            other => Err(Error::validation(format!("Unknown category: {}", other))),
        }
    }
}
