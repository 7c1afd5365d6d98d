//! Marketing fiche generation.
//!
//! A product document is chunked, each chunk is analysed by the chat model,
//! and the consolidated analysis is rewritten as sales copy in French and
//! English. Each text is then written to its own PDF.

mod chunk;
mod generator;
pub mod pdf;
pub mod prompts;

pub use chunk::{estimate_tokens, TextChunker};
pub use generator::{Fiche, FicheGenerator, FichePaths};
pub use pdf::{render_text_pdf, save_text_pdf};

use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::error::Error;

/// Which kind of sheet to write.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FicheKind {
    Commercial,
    Shopify,
}

impl FicheKind {
    /// Parse the form action sent by clients.
    pub fn from_action(action: &str) -> Result<Self, Error> {
        match action.trim() {
            "generate_commercial" => Ok(Self::Commercial),
            "generate_shopify" => Ok(Self::Shopify),
            other => Err(Error::UnknownAction(other.to_string())),
        }
    }

    pub const fn title(self) -> &'static str {
        match self {
            Self::Commercial => "Fiche commerciale",
            Self::Shopify => "Fiche Shopify",
        }
    }
}

impl FromStr for FicheKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Error> {
        match s.trim().to_lowercase().as_str() {
            "commercial" | "generate_commercial" => Ok(Self::Commercial),
            "shopify" | "generate_shopify" => Ok(Self::Shopify),
            _ => Err(Error::UnknownAction(s.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_actions() {
        assert_eq!(FicheKind::from_action("generate_commercial").ok(), Some(FicheKind::Commercial));
        assert_eq!(FicheKind::from_action("generate_shopify").ok(), Some(FicheKind::Shopify));
        assert!(matches!(FicheKind::from_action("commercial"), Err(Error::UnknownAction(_))));
        assert_eq!("Shopify".parse::<FicheKind>().ok(), Some(FicheKind::Shopify));
    }
}
