// In-memory reading/treatment store, optionally seeded from a JSON snapshot
use crate::application::repositories::{ReadingSource, TreatmentSource};
use crate::domain::glucose::GlucoseSample;
use crate::domain::treatment::TreatmentRecord;
use anyhow::Context;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::path::Path;

/// On-disk shape of a snapshot file.
#[derive(Debug, Default, Deserialize)]
struct Snapshot {
    #[serde(default)]
    readings: Vec<GlucoseSample>,
    #[serde(default)]
    treatments: Vec<TreatmentRecord>,
}

#[derive(Debug, Clone, Default)]
pub struct InMemoryStore {
    readings: Vec<GlucoseSample>,
    treatments: Vec<TreatmentRecord>,
}

impl InMemoryStore {
    pub fn new(readings: Vec<GlucoseSample>, treatments: Vec<TreatmentRecord>) -> Self {
        Self {
            readings,
            treatments,
        }
    }

    /// Parse a snapshot of the form `{"readings": [...], "treatments": [...]}`.
    pub fn from_json(json: &str) -> anyhow::Result<Self> {
        let snapshot: Snapshot = serde_json::from_str(json).context("Failed to parse snapshot JSON")?;
        Ok(Self::new(snapshot.readings, snapshot.treatments))
    }

    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read snapshot {}", path.display()))?;
        Self::from_json(&json)
    }

    pub fn readings(&self) -> &[GlucoseSample] {
        &self.readings
    }

    /// Timestamp of the newest reading, if any.
    pub fn latest_reading_time(&self) -> Option<DateTime<Utc>> {
        self.readings.iter().map(|r| r.timestamp).max()
    }
}

impl ReadingSource for InMemoryStore {
    fn readings_between(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> anyhow::Result<Vec<GlucoseSample>> {
        Ok(self
            .readings
            .iter()
            .filter(|r| r.timestamp >= from && r.timestamp <= to)
            .copied()
            .collect())
    }
}

impl TreatmentSource for InMemoryStore {
    fn treatments_between(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> anyhow::Result<Vec<TreatmentRecord>> {
        Ok(self
            .treatments
            .iter()
            .filter(|t| t.timestamp >= from && t.timestamp <= to)
            .copied()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::treatment::TreatmentKind;
    use chrono::TimeZone;

    const SNAPSHOT: &str = r#"{
        "readings": [
            {"timestamp": "2024-05-10T12:00:00Z", "value": 140.0},
            {"timestamp": "2024-05-10T12:05:00Z", "value": 135.0},
            {"timestamp": "2024-05-10T12:10:00Z", "value": 131.0}
        ],
        "treatments": [
            {"timestamp": "2024-05-10T11:30:00Z", "amount": 4.0, "kind": "insulin"},
            {"timestamp": "2024-05-10T11:45:00Z", "amount": 45.0, "kind": "carbs"}
        ]
    }"#;

    #[test]
    fn test_from_json_and_window_queries() {
        let store = InMemoryStore::from_json(SNAPSHOT).unwrap();
        assert_eq!(store.readings().len(), 3);
        assert_eq!(
            store.latest_reading_time(),
            Some(Utc.with_ymd_and_hms(2024, 5, 10, 12, 10, 0).unwrap())
        );

        let from = Utc.with_ymd_and_hms(2024, 5, 10, 12, 5, 0).unwrap();
        let to = Utc.with_ymd_and_hms(2024, 5, 10, 12, 10, 0).unwrap();
        assert_eq!(store.readings_between(from, to).unwrap().len(), 2);

        let from = Utc.with_ymd_and_hms(2024, 5, 10, 11, 40, 0).unwrap();
        let treatments = store.treatments_between(from, to).unwrap();
        assert_eq!(treatments.len(), 1);
        assert_eq!(treatments[0].kind, TreatmentKind::Carbs);
    }

    #[test]
    fn test_missing_sections_default_to_empty() {
        let store = InMemoryStore::from_json("{}").unwrap();
        assert!(store.readings().is_empty());
        assert!(store.latest_reading_time().is_none());
    }

    #[test]
    fn test_invalid_json_is_an_error() {
        assert!(InMemoryStore::from_json("{\"readings\": 3}").is_err());
    }
}
