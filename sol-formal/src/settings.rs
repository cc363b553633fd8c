#![forbid(unsafe_code)]

use serde::{Deserialize, Serialize};

use crate::error::SettingsError;
use crate::solver::SmtProfile;

/// Knobs of the encoder.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncodingSettings {
    /// Assert the type's value range whenever a variable gets an unknown value.
    #[serde(default = "default_range_constraints")]
    pub range_constraints: bool,

    #[serde(default)]
    pub profile: SmtProfile,
}

fn default_range_constraints() -> bool {
    true
}

impl Default for EncodingSettings {
    fn default() -> Self {
        Self {
            range_constraints: true,
            profile: SmtProfile::default(),
        }
    }
}

impl EncodingSettings {
    /// Parses either a manifest with a `[formal]` table or the bare table.
    pub fn from_toml_str(raw: &str) -> Result<Self, SettingsError> {
        let mut table = raw.parse::<toml::Table>().map_err(|e| SettingsError {
            message: e.to_string(),
        })?;
        let doc = match table.remove("formal") {
            Some(formal @ toml::Value::Table(_)) => formal,
            Some(other) => {
                return Err(SettingsError {
                    message: format!("`formal` must be a table, found {}", other.type_str()),
                });
            }
            None if table.contains_key("package") => return Ok(Self::default()),
            None => toml::Value::Table(table),
        };
        doc.try_into().map_err(|e: toml::de::Error| SettingsError {
            message: e.to_string(),
        })
    }

    /// Applies `SOL_FORMAL_RANGE_CONSTRAINTS` and `SOL_FORMAL_PROFILE`.
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(v) = std::env::var("SOL_FORMAL_RANGE_CONSTRAINTS") {
            self.range_constraints = truthy(&v);
        }
        if let Ok(v) = std::env::var("SOL_FORMAL_PROFILE") {
            match parse_profile(&v) {
                Some(p) => self.profile = p,
                None => tracing::warn!(value = %v, "ignoring unknown SOL_FORMAL_PROFILE"),
            }
        }
        self
    }
}

fn truthy(v: &str) -> bool {
    let t = v.trim().to_ascii_lowercase();
    matches!(t.as_str(), "1" | "true" | "yes" | "on")
}

fn parse_profile(v: &str) -> Option<SmtProfile> {
    match v.trim().to_ascii_lowercase().as_str() {
        "fast" => Some(SmtProfile::Fast),
        "ci" => Some(SmtProfile::Ci),
        "thorough" => Some(SmtProfile::Thorough),
        _ => None,
    }
}
