//! Merchant and language context threaded through tool execution.
//!
//! The merchant selection is the only cross-request state in the system. It
//! is passed explicitly into every executor call rather than read from any
//! global, so a tool's scope is always visible at its call site.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::errors::AssistantError;

/// Identifies which merchant's rows a tool execution may touch.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MerchantContext {
    pub merchant_id: String,
    pub merchant_name: String,
}

impl MerchantContext {
    pub fn new(merchant_id: impl Into<String>, merchant_name: impl Into<String>) -> Self {
        Self {
            merchant_id: merchant_id.into(),
            merchant_name: merchant_name.into(),
        }
    }
}

/// Display languages the assistant can switch the UI to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    En,
    Ms,
    Zh,
    Ta,
}

impl Language {
    pub const ALL: [Language; 4] = [Language::En, Language::Ms, Language::Zh, Language::Ta];

    pub fn code(&self) -> &'static str {
        match self {
            Language::En => "en",
            Language::Ms => "ms",
            Language::Zh => "zh",
            Language::Ta => "ta",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Language::En => "English",
            Language::Ms => "Bahasa Melayu",
            Language::Zh => "Chinese",
            Language::Ta => "Tamil",
        }
    }

    /// Parses a language code, rejecting anything outside the supported set.
    pub fn from_code(code: &str) -> Result<Self, AssistantError> {
        match code {
            "en" => Ok(Language::En),
            "ms" => Ok(Language::Ms),
            "zh" => Ok(Language::Zh),
            "ta" => Ok(Language::Ta),
            other => Err(AssistantError::ParsingError(format!(
                "Unsupported language code '{}'. Supported codes: en, ms, zh, ta",
                other
            ))),
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}
