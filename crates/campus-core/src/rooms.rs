//! Room metadata shown in pin popups
//!
//! The room database is a JSON document `{ "rooms": [ ... ] }` keyed by the
//! same ids as the pins. Field names follow the source spreadsheet export.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use tracing::debug;

const UNKNOWN: &str = "--";
const NOT_AVAILABLE: &str = "Não disponível";
const DEFAULT_LIGHTING: &str = "Natural + Led";
const NO_FURNITURE: &str = "Sem itens registrados";

/// One room entry from the metadata export
#[derive(Debug, Clone, PartialEq)]
pub struct RoomRecord {
    pub id: String,
    pub display_name: Option<String>,
    /// Seat count as written in the export
    pub capacidade: Option<String>,
    /// Number of air conditioning units
    pub ar_condicionado: Option<f64>,
    pub iluminacao: Option<String>,
    /// Comma separated furniture list
    pub mobiliario: Option<String>,
    pub projetor: Option<f64>,
}

impl RoomRecord {
    /// Convert a raw JSON record, returning `None` when it has no usable id.
    ///
    /// Fields of the wrong type are treated as absent; counts must be finite
    /// numbers.
    pub fn from_value(value: &Value) -> Option<Self> {
        let obj = value.as_object()?;
        let id = match obj.get("id")? {
            Value::String(s) if !s.trim().is_empty() => s.trim().to_string(),
            Value::Number(n) => n.to_string(),
            _ => return None,
        };

        let text = |key: &str| obj.get(key).and_then(Value::as_str).map(str::to_string);
        let count = |key: &str| {
            obj.get(key)
                .and_then(Value::as_f64)
                .filter(|n| n.is_finite())
        };
        let capacidade = match obj.get("capacidade") {
            Some(Value::String(s)) => Some(s.clone()),
            Some(Value::Number(n)) => Some(n.to_string()),
            Some(Value::Bool(b)) => Some(b.to_string()),
            _ => None,
        };

        Some(Self {
            display_name: text("displayName"),
            capacidade,
            ar_condicionado: count("ar_condicionado"),
            iluminacao: text("iluminacao"),
            mobiliario: text("mobiliario"),
            projetor: count("projetor"),
            id,
        })
    }
}

#[derive(Deserialize)]
struct RawDatabase {
    #[serde(default)]
    rooms: Vec<Value>,
}

/// The room document as served
#[derive(Debug, Clone, Default)]
pub struct RoomDatabase {
    pub rooms: Vec<RoomRecord>,
}

impl RoomDatabase {
    /// Parse `{ "rooms": [...] }`, dropping records without an id
    pub fn from_slice(bytes: &[u8]) -> Result<Self, serde_json::Error> {
        let raw: RawDatabase = serde_json::from_slice(bytes)?;
        let total = raw.rooms.len();
        let rooms: Vec<RoomRecord> = raw.rooms.iter().filter_map(RoomRecord::from_value).collect();
        if rooms.len() < total {
            debug!(dropped = total - rooms.len(), "Dropped malformed room records");
        }
        Ok(Self { rooms })
    }

    /// Index the rooms by id; a later duplicate replaces an earlier one
    pub fn into_index(self) -> HashMap<String, RoomRecord> {
        self.rooms.into_iter().map(|r| (r.id.clone(), r)).collect()
    }
}

/// Display strings for a room popup
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RoomSummary {
    pub pin_id: String,
    pub header: String,
    pub capacity: String,
    pub air_conditioning: String,
    pub lighting: String,
    pub furniture: String,
    pub projector: String,
}

fn count_display(value: Option<f64>) -> String {
    match value {
        None => UNKNOWN.to_string(),
        Some(n) if n == 0.0 => NOT_AVAILABLE.to_string(),
        Some(n) => n.to_string(),
    }
}

impl RoomSummary {
    /// Build popup content for a pin; `label` is used when the room has no record
    pub fn new(pin_id: &str, label: &str, record: Option<&RoomRecord>) -> Self {
        let header = record
            .and_then(|r| r.display_name.clone())
            .unwrap_or_else(|| label.to_string());
        let capacity = record
            .and_then(|r| r.capacidade.clone())
            .unwrap_or_else(|| UNKNOWN.to_string());
        let lighting = record
            .and_then(|r| r.iluminacao.clone())
            .unwrap_or_else(|| DEFAULT_LIGHTING.to_string());
        let furniture = record
            .and_then(|r| r.mobiliario.clone())
            .filter(|m| !m.is_empty())
            .unwrap_or_else(|| NO_FURNITURE.to_string());

        Self {
            pin_id: pin_id.to_string(),
            header,
            capacity,
            air_conditioning: count_display(record.and_then(|r| r.ar_condicionado)),
            lighting,
            furniture,
            projector: count_display(record.and_then(|r| r.projetor)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_and_index() {
        let json = br#"{"rooms": [
            {"id": "A101", "displayName": "Sala 101", "capacidade": 40,
             "ar_condicionado": 2, "iluminacao": "Led", "mobiliario": "Cadeira (40)", "projetor": 0},
            {"id": "A102"}
        ]}"#;
        let index = RoomDatabase::from_slice(json).unwrap().into_index();
        assert_eq!(index.len(), 2);
        assert_eq!(index["A101"].capacidade.as_deref(), Some("40"));
        assert_eq!(index["A101"].projetor, Some(0.0));
        assert_eq!(index["A102"].display_name, None);
    }

    #[test]
    fn test_summary_formatting() {
        let record = RoomRecord {
            id: "A101".to_string(),
            display_name: Some("Sala 101".to_string()),
            capacidade: Some("40".to_string()),
            ar_condicionado: Some(0.0),
            iluminacao: None,
            mobiliario: Some(String::new()),
            projetor: Some(1.0),
        };
        let summary = RoomSummary::new("A101", "A101", Some(&record));
        assert_eq!(summary.header, "Sala 101");
        assert_eq!(summary.capacity, "40");
        assert_eq!(summary.air_conditioning, "Não disponível");
        assert_eq!(summary.lighting, "Natural + Led");
        assert_eq!(summary.furniture, "Sem itens registrados");
        assert_eq!(summary.projector, "1");
    }

    #[test]
    fn test_summary_without_record() {
        let summary = RoomSummary::new("B2", "Sala B2", None);
        assert_eq!(summary.header, "Sala B2");
        assert_eq!(summary.capacity, "--");
        assert_eq!(summary.air_conditioning, "--");
        assert_eq!(summary.projector, "--");
    }

    #[test]
    fn test_bad_fields_stay_local_to_their_record() {
        let json = br#"{"rooms": [
            {"id": "A001", "displayName": "Sala", "capacidade": 12, "ar_condicionado": 2},
            {"id": "A002", "capacidade": "20", "ar_condicionado": "dois", "projetor": 2.5},
            {"displayName": "Sem id"},
            "A003"
        ]}"#;
        let index = RoomDatabase::from_slice(json).unwrap().into_index();
        assert_eq!(index.len(), 2);

        let good = RoomSummary::new("A001", "A001", index.get("A001"));
        assert_eq!(good.header, "Sala");
        assert_eq!(good.capacity, "12");
        assert_eq!(good.air_conditioning, "2");

        let odd = RoomSummary::new("A002", "A002", index.get("A002"));
        assert_eq!(odd.capacity, "20");
        assert_eq!(odd.air_conditioning, "--");
        assert_eq!(odd.projector, "2.5");
    }

    #[test]
    fn test_rejects_non_object_document() {
        assert!(RoomDatabase::from_slice(b"[1, 2]").is_err());
        assert!(RoomDatabase::from_slice(b"{}").unwrap().rooms.is_empty());
    }
}
