//! # Settings
//!
//! Business defaults that would otherwise be ambient: the tax rate a new
//! estimate starts with, the prefix used for auto-assigned estimate numbers,
//! the letterhead printed on documents.
//!
//! Settings are plain data with a `Default` impl and load from TOML. Every
//! key is optional; missing keys keep their default.
//!
//! ```toml
//! default_tax_rate = 18.0
//! number_prefix = "HCE"
//! currency_symbol = "₹"
//! validity_days = 30
//!
//! [company]
//! name = "HAVN CUBE"
//! tagline = "Interior Design & Execution"
//! contact = "Contact: +91-XXXXXXXXXX | Email: info@havncube.com"
//! ```

use std::fs;
use std::path::Path;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::errors::{EstimateError, EstimateResult};

/// GST rate applied to new estimates unless configured otherwise
pub const DEFAULT_TAX_RATE_PERCENT: i64 = 18;

/// Application-wide estimate settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EstimateSettings {
    /// Tax rate (percent) for newly opened drafts
    pub default_tax_rate: Decimal,

    /// Prefix for auto-assigned estimate numbers (`HCE-0001`)
    pub number_prefix: String,

    /// Symbol printed in front of money values
    pub currency_symbol: String,

    /// How long a printed estimate stays valid
    pub validity_days: u32,

    /// Letterhead for rendered documents
    pub company: CompanyProfile,
}

impl Default for EstimateSettings {
    fn default() -> Self {
        EstimateSettings {
            default_tax_rate: Decimal::from(DEFAULT_TAX_RATE_PERCENT),
            number_prefix: "HCE".to_string(),
            currency_symbol: "₹".to_string(),
            validity_days: 30,
            company: CompanyProfile::default(),
        }
    }
}

impl EstimateSettings {
    /// Parse settings from TOML text.
    pub fn from_toml_str(text: &str) -> EstimateResult<Self> {
        toml::from_str(text).map_err(|e| EstimateError::SerializationError {
            reason: format!("Invalid settings: {}", e),
        })
    }

    /// Load settings from a TOML file.
    pub fn load(path: &Path) -> EstimateResult<Self> {
        let text = fs::read_to_string(path).map_err(|e| {
            EstimateError::file_error("read settings", path.display().to_string(), e.to_string())
        })?;
        Self::from_toml_str(&text)
    }
}

/// Company letterhead.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompanyProfile {
    pub name: String,
    pub tagline: String,
    pub contact: String,
}

impl Default for CompanyProfile {
    fn default() -> Self {
        CompanyProfile {
            name: "HAVN CUBE".to_string(),
            tagline: "Interior Design & Execution".to_string(),
            contact: "Contact: +91-XXXXXXXXXX | Email: info@havncube.com".to_string(),
        }
    }
}
