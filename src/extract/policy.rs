// src/extract/policy.rs
//! Field defaulting policy: field name -> default value + recognized labels.
//!
//! The built-in policy can be overridden per field from TOML:
//!
//! ```toml
//! [fields.region]
//! default = "Global"
//!
//! [fields.severity]
//! default = "MEDIUM"
//! labels = ["HIGH", "MEDIUM", "LOW"]
//! ```

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::ConfigError;
use crate::model::{ImpactType, Severity};

pub const ENV_DEFAULTS_PATH: &str = "PIPELINE_DEFAULTS_PATH";
pub const DEFAULT_DEFAULTS_PATH: &str = "config/defaults.toml";

pub const FIELD_TITLE: &str = "title";
pub const FIELD_SUMMARY: &str = "summary";
pub const FIELD_REGION: &str = "region";
pub const FIELD_SEVERITY: &str = "severity";
pub const FIELD_SYMBOL: &str = "symbol";
pub const FIELD_NAME: &str = "name";
pub const FIELD_IMPACT: &str = "impact";
pub const FIELD_REASONING: &str = "reasoning";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldDefault {
    pub default: String,
    /// Recognized labels. Empty means free text.
    #[serde(default)]
    pub labels: Vec<String>,
}

impl FieldDefault {
    pub fn text(default: &str) -> Self {
        Self {
            default: default.to_string(),
            labels: Vec::new(),
        }
    }

    pub fn labelled(default: &str, labels: &[&str]) -> Self {
        Self {
            default: default.to_string(),
            labels: labels.iter().map(|s| s.to_string()).collect(),
        }
    }

    fn recognize(&self, s: &str) -> Option<&str> {
        let s = s.trim();
        self.labels
            .iter()
            .find(|l| l.eq_ignore_ascii_case(s))
            .map(String::as_str)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DefaultPolicy {
    #[serde(default)]
    pub fields: BTreeMap<String, FieldDefault>,
}

impl Default for DefaultPolicy {
    fn default() -> Self {
        let severity: Vec<&str> = Severity::ALL.iter().map(|s| s.label()).collect();
        let impact: Vec<&str> = ImpactType::ALL.iter().map(|s| s.label()).collect();

        let mut fields = BTreeMap::new();
        for f in [FIELD_TITLE, FIELD_SUMMARY, FIELD_SYMBOL, FIELD_NAME, FIELD_REASONING] {
            fields.insert(f.to_string(), FieldDefault::text(""));
        }
        fields.insert(FIELD_REGION.to_string(), FieldDefault::text("Global"));
        fields.insert(
            FIELD_SEVERITY.to_string(),
            FieldDefault::labelled(Severity::Medium.label(), &severity),
        );
        fields.insert(
            FIELD_IMPACT.to_string(),
            FieldDefault::labelled(ImpactType::Neutral.label(), &impact),
        );
        Self { fields }
    }
}

impl DefaultPolicy {
    /// Load a TOML policy and layer it over the built-in one.
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("reading default policy from {}", path.display()))?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(s: &str) -> Result<Self> {
        let overrides: DefaultPolicy = toml::from_str(s).context("parsing default policy")?;
        let mut policy = Self::default();
        policy.fields.extend(overrides.fields);
        policy.validate()?;
        Ok(policy)
    }

    /// Resolve the policy file:
    /// 1) $PIPELINE_DEFAULTS_PATH
    /// 2) config/defaults.toml
    /// 3) built-in policy
    pub fn load_default() -> Result<Self> {
        if let Ok(p) = std::env::var(ENV_DEFAULTS_PATH) {
            let pb = PathBuf::from(p);
            if !pb.exists() {
                return Err(anyhow!("{ENV_DEFAULTS_PATH} points to non-existent path"));
            }
            return Self::load_from(&pb);
        }
        let p = PathBuf::from(DEFAULT_DEFAULTS_PATH);
        if p.exists() {
            return Self::load_from(&p);
        }
        Ok(Self::default())
    }

    /// Every labelled field's default must be one of its labels, and the enum-backed
    /// fields may only list labels their enum knows.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for required in [FIELD_SEVERITY, FIELD_IMPACT] {
            if !self.fields.contains_key(required) {
                return Err(ConfigError::MissingField(required.to_string()));
            }
        }
        for (field, fd) in &self.fields {
            if !fd.labels.is_empty() && fd.recognize(&fd.default).is_none() {
                return Err(ConfigError::DefaultNotRecognized {
                    field: field.clone(),
                    default: fd.default.clone(),
                });
            }
            let parses: fn(&str) -> bool = match field.as_str() {
                FIELD_SEVERITY => |l| Severity::from_label(l).is_some(),
                FIELD_IMPACT => |l| ImpactType::from_label(l).is_some(),
                _ => continue,
            };
            if fd.labels.is_empty() {
                return Err(ConfigError::MissingField(format!("{field}.labels")));
            }
            if let Some(bad) = fd
                .labels
                .iter()
                .chain(std::iter::once(&fd.default))
                .find(|l| !parses(l.as_str()))
            {
                return Err(ConfigError::UnknownLabel {
                    field: field.clone(),
                    label: bad.clone(),
                });
            }
        }
        Ok(())
    }

    pub fn default_for(&self, field: &str) -> &str {
        self.fields
            .get(field)
            .map(|f| f.default.as_str())
            .unwrap_or("")
    }

    /// Free-text field: a non-empty string is copied verbatim; anything else
    /// (absent, null, non-string, empty) yields the field default.
    pub fn text(&self, obj: &Map<String, Value>, field: &str) -> String {
        match obj.get(field).and_then(Value::as_str) {
            Some(s) if !s.is_empty() => s.to_string(),
            _ => self.default_for(field).to_string(),
        }
    }

    /// Labelled field: the canonical label when recognized, else the field default.
    pub fn label(&self, obj: &Map<String, Value>, field: &str) -> String {
        let Some(fd) = self.fields.get(field) else {
            return String::new();
        };
        obj.get(field)
            .and_then(Value::as_str)
            .and_then(|s| fd.recognize(s))
            .unwrap_or(fd.default.as_str())
            .to_string()
    }

    pub fn severity(&self, obj: &Map<String, Value>) -> Severity {
        Severity::from_label(&self.label(obj, FIELD_SEVERITY)).unwrap_or_default()
    }

    pub fn impact(&self, obj: &Map<String, Value>) -> ImpactType {
        ImpactType::from_label(&self.label(obj, FIELD_IMPACT)).unwrap_or_default()
    }
}
