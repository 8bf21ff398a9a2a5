// src/model.rs
//! Domain records produced by the extraction pipeline.
//!
//! Field names serialize in the upstream camelCase shape (`affectedStocks`) and enum
//! labels in upper case, so records round-trip through the HTTP API unchanged.

use serde::{Deserialize, Serialize};

/// Maximum number of citations attached to a record.
pub const MAX_SOURCES: usize = 3;

/// A grounding source returned alongside generated text.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Citation {
    pub title: String,
    pub uri: String,
}

impl Citation {
    pub fn new(title: impl Into<String>, uri: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            uri: uri.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "UPPERCASE")]
pub enum Severity {
    High,
    #[default]
    Medium,
    Low,
}

impl Severity {
    pub const ALL: [Severity; 3] = [Severity::High, Severity::Medium, Severity::Low];

    pub fn label(self) -> &'static str {
        match self {
            Severity::High => "HIGH",
            Severity::Medium => "MEDIUM",
            Severity::Low => "LOW",
        }
    }

    /// Parse an upstream label. Whitespace is trimmed and ASCII case ignored.
    pub fn from_label(s: &str) -> Option<Self> {
        let s = s.trim();
        Self::ALL
            .into_iter()
            .find(|v| v.label().eq_ignore_ascii_case(s))
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "UPPERCASE")]
pub enum ImpactType {
    Bullish,
    Bearish,
    #[default]
    Neutral,
    Volatile,
}

impl ImpactType {
    pub const ALL: [ImpactType; 4] = [
        ImpactType::Bullish,
        ImpactType::Bearish,
        ImpactType::Neutral,
        ImpactType::Volatile,
    ];

    pub fn label(self) -> &'static str {
        match self {
            ImpactType::Bullish => "BULLISH",
            ImpactType::Bearish => "BEARISH",
            ImpactType::Neutral => "NEUTRAL",
            ImpactType::Volatile => "VOLATILE",
        }
    }

    pub fn from_label(s: &str) -> Option<Self> {
        let s = s.trim();
        Self::ALL
            .into_iter()
            .find(|v| v.label().eq_ignore_ascii_case(s))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StockImpact {
    pub symbol: String,
    pub name: String,
    pub impact: ImpactType,
    pub reasoning: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct MarketEvent {
    pub id: String,
    pub title: String,
    pub summary: String,
    pub region: String,
    /// RFC 3339 / ISO-8601, assigned at extraction time.
    pub timestamp: String,
    pub severity: Severity,
    pub affected_stocks: Vec<StockImpact>,
    pub sources: Vec<Citation>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn labels_parse_case_insensitively() {
        assert_eq!(Severity::from_label(" high "), Some(Severity::High));
        assert_eq!(Severity::from_label("CRITICAL"), None);
        assert_eq!(ImpactType::from_label("Volatile"), Some(ImpactType::Volatile));
        assert_eq!(ImpactType::from_label(""), None);
    }

    #[test]
    fn event_serializes_in_upstream_shape() {
        let ev = MarketEvent {
            id: "evt-1-0".into(),
            title: "t".into(),
            summary: "s".into(),
            region: "Global".into(),
            timestamp: "2026-01-01T00:00:00.000Z".into(),
            severity: Severity::High,
            affected_stocks: vec![StockImpact {
                symbol: "AAPL".into(),
                name: "Apple".into(),
                impact: ImpactType::Bearish,
                reasoning: "r".into(),
            }],
            sources: vec![],
        };
        let v = serde_json::to_value(&ev).unwrap();
        assert_eq!(v["severity"], "HIGH");
        assert_eq!(v["affectedStocks"][0]["impact"], "BEARISH");
    }
}
