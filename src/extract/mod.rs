// src/extract/mod.rs
//! Turns raw model output into validated `MarketEvent` records.
//!
//! Only payload-level defects (nothing decodable, invalid JSON, not an array) are errors.
//! Field-level defects resolve to `DefaultPolicy` defaults and never abort the batch.

pub mod locate;
pub mod policy;

use std::time::Instant;

use chrono::{DateTime, SecondsFormat, Utc};
use metrics::{counter, histogram};
use once_cell::sync::OnceCell;
use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::error::ExtractionError;
use crate::metrics::ensure_metrics_described;
use crate::model::{Citation, MarketEvent, StockImpact, MAX_SOURCES};
use policy::{
    DefaultPolicy, FIELD_NAME, FIELD_REASONING, FIELD_REGION, FIELD_SUMMARY, FIELD_SYMBOL,
    FIELD_TITLE,
};

pub use locate::{locate, Candidate, PayloadSource};

#[derive(Debug, Clone, Default)]
pub struct Extractor {
    policy: DefaultPolicy,
}

/// Values shared by every record of one extraction call.
struct Batch {
    millis: i64,
    timestamp: String,
    sources: Vec<Citation>,
}

impl Extractor {
    pub fn new(policy: DefaultPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> &DefaultPolicy {
        &self.policy
    }

    pub fn extract(
        &self,
        raw: &str,
        citations: &[Citation],
    ) -> Result<Vec<MarketEvent>, ExtractionError> {
        self.extract_at(raw, citations, Utc::now())
    }

    /// Same as `extract`, with the batch clock supplied by the caller.
    pub fn extract_at(
        &self,
        raw: &str,
        citations: &[Citation],
        now: DateTime<Utc>,
    ) -> Result<Vec<MarketEvent>, ExtractionError> {
        ensure_metrics_described();
        let t0 = Instant::now();

        let out = self.decode(raw).map(|items| {
            let batch = Batch {
                millis: now.timestamp_millis(),
                timestamp: now.to_rfc3339_opts(SecondsFormat::Millis, true),
                sources: citations.iter().take(MAX_SOURCES).cloned().collect(),
            };
            items
                .iter()
                .enumerate()
                .map(|(index, item)| {
                    if !item.is_object() {
                        debug!(index, "non-object array element, every field defaulted");
                    }
                    self.map_event(index, object_or_empty(item), &batch)
                })
                .collect::<Vec<_>>()
        });

        histogram!("extract_parse_ms").record(t0.elapsed().as_secs_f64() * 1000.0);
        match &out {
            Ok(events) => {
                counter!("extract_records_total").increment(events.len() as u64);
            }
            Err(e) => {
                counter!("extract_errors_total", "kind" => e.kind()).increment(1);
                warn!(
                    kind = e.kind(),
                    raw_len = raw.len(),
                    raw_digest = %short_digest(raw),
                    candidate_len = ?e.candidate().map(str::len),
                    "extraction failed"
                );
            }
        }
        out
    }

    fn decode(&self, raw: &str) -> Result<Vec<Value>, ExtractionError> {
        let candidate = locate(raw);
        debug!(source = candidate.source.as_str(), len = candidate.text.len(), "payload located");

        if candidate.text.trim().is_empty() {
            return Err(ExtractionError::EmptyPayload {
                raw: raw.to_string(),
            });
        }

        let value: Value = serde_json::from_str(candidate.text).map_err(|source| {
            ExtractionError::MalformedJson {
                raw: raw.to_string(),
                candidate: candidate.text.to_string(),
                source,
            }
        })?;

        match value {
            Value::Array(items) => Ok(items),
            _ => Err(ExtractionError::NotAnArray {
                raw: raw.to_string(),
                candidate: candidate.text.to_string(),
            }),
        }
    }

    fn map_event(&self, index: usize, obj: &Map<String, Value>, batch: &Batch) -> MarketEvent {
        let p = &self.policy;
        let affected_stocks = obj
            .get("affectedStocks")
            .and_then(Value::as_array)
            .map(|stocks| {
                stocks
                    .iter()
                    .map(|s| self.map_stock(object_or_empty(s)))
                    .collect()
            })
            .unwrap_or_default();

        MarketEvent {
            id: format!("evt-{}-{}", batch.millis, index),
            title: p.text(obj, FIELD_TITLE),
            summary: p.text(obj, FIELD_SUMMARY),
            region: p.text(obj, FIELD_REGION),
            timestamp: batch.timestamp.clone(),
            severity: p.severity(obj),
            affected_stocks,
            sources: batch.sources.clone(),
        }
    }

    fn map_stock(&self, obj: &Map<String, Value>) -> StockImpact {
        let p = &self.policy;
        StockImpact {
            symbol: p.text(obj, FIELD_SYMBOL),
            name: p.text(obj, FIELD_NAME),
            impact: p.impact(obj),
            reasoning: p.text(obj, FIELD_REASONING),
        }
    }
}

/// Non-object elements map like an object with no fields.
fn object_or_empty(value: &Value) -> &Map<String, Value> {
    static EMPTY: OnceCell<Map<String, Value>> = OnceCell::new();
    value
        .as_object()
        .unwrap_or_else(|| EMPTY.get_or_init(Map::new))
}

/// First 6 bytes of SHA-256, hex. Lets logs correlate failures without leaking model output.
fn short_digest(text: &str) -> String {
    use sha2::{Digest, Sha256};
    let digest = Sha256::digest(text.as_bytes());
    let mut out = String::with_capacity(12);
    for b in digest.iter().take(6) {
        use std::fmt::Write as _;
        let _ = write!(&mut out, "{:02x}", b);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ImpactType, Severity};
    use chrono::TimeZone;

    fn fixed_now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 1, 12, 30, 0).unwrap()
    }

    fn citations(n: usize) -> Vec<Citation> {
        (0..n)
            .map(|i| Citation::new(format!("src{i}"), format!("http://s/{i}")))
            .collect()
    }

    #[test]
    fn ids_and_timestamp_come_from_the_batch_clock() {
        let raw = r#"[{"title":"a"},{"title":"a"},{"title":"b"}]"#;
        let out = Extractor::default().extract_at(raw, &[], fixed_now()).unwrap();
        let ms = fixed_now().timestamp_millis();
        let ids: Vec<_> = out.iter().map(|e| e.id.clone()).collect();
        assert_eq!(
            ids,
            vec![format!("evt-{ms}-0"), format!("evt-{ms}-1"), format!("evt-{ms}-2")]
        );
        assert!(out.iter().all(|e| e.timestamp == "2026-03-01T12:30:00.000Z"));
    }

    #[test]
    fn sources_capped_and_shared() {
        let raw = r#"[{"title":"a"},{"title":"b"}]"#;
        let out = Extractor::default()
            .extract_at(raw, &citations(5), fixed_now())
            .unwrap();
        for ev in &out {
            assert_eq!(ev.sources, citations(3));
        }
    }

    #[test]
    fn missing_fields_degrade_to_defaults() {
        let raw = r#"[{"severity":"CRITICAL","affectedStocks":"n/a"},
                      {"affectedStocks":[{"symbol":"XOM"}, 5]}]"#;
        let out = Extractor::default().extract_at(raw, &[], fixed_now()).unwrap();
        assert_eq!(out.len(), 2);
        assert_eq!(out[0].title, "");
        assert_eq!(out[0].summary, "");
        assert_eq!(out[0].region, "Global");
        assert_eq!(out[0].severity, Severity::Medium);
        assert!(out[0].affected_stocks.is_empty());

        assert_eq!(out[1].affected_stocks.len(), 2);
        let s = &out[1].affected_stocks[0];
        assert_eq!(s.symbol, "XOM");
        assert_eq!(s.name, "");
        assert_eq!(s.impact, ImpactType::Neutral);
        assert_eq!(s.reasoning, "");
        let blank = &out[1].affected_stocks[1];
        assert_eq!(blank.symbol, "");
        assert_eq!(blank.impact, ImpactType::Neutral);
    }

    #[test]
    fn non_object_elements_become_defaulted_records() {
        let raw = r#"[{"title":"keep"}, 42, "x", null]"#;
        let out = Extractor::default().extract_at(raw, &[], fixed_now()).unwrap();
        let ms = fixed_now().timestamp_millis();
        assert_eq!(out.len(), 4);
        assert_eq!(out[0].title, "keep");
        for (i, ev) in out.iter().enumerate().skip(1) {
            assert_eq!(ev.id, format!("evt-{ms}-{i}"));
            assert_eq!(ev.title, "");
            assert_eq!(ev.region, "Global");
            assert_eq!(ev.severity, Severity::Medium);
            assert!(ev.affected_stocks.is_empty());
        }
    }

    #[test]
    fn payload_level_errors() {
        let ex = Extractor::default();
        assert!(matches!(
            ex.extract("   ", &[]),
            Err(ExtractionError::EmptyPayload { .. })
        ));
        assert!(matches!(
            ex.extract("```json\n```", &[]),
            Err(ExtractionError::EmptyPayload { .. })
        ));
        match ex.extract("intro [{\"title\": } outro]", &[]) {
            Err(ExtractionError::MalformedJson { raw, candidate, .. }) => {
                assert_eq!(raw, "intro [{\"title\": } outro]");
                assert_eq!(candidate, "[{\"title\": } outro]");
            }
            other => panic!("unexpected: {other:?}"),
        }
        assert!(matches!(
            ex.extract("```json\n{\"title\":\"x\"}\n```", &[]),
            Err(ExtractionError::NotAnArray { .. })
        ));
    }

    #[test]
    fn digest_is_short_hex() {
        let d = short_digest("hello");
        assert_eq!(d.len(), 12);
        assert!(d.chars().all(|c| c.is_ascii_hexdigit()));
    }
}
