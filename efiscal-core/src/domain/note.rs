//! Note domain model

use chrono::{NaiveDate, NaiveDateTime};
use once_cell::sync::Lazy;
use regex::Regex;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::Category;

/// Format of the upload timestamp (second precision)
pub const UPLOAD_TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

static WHITESPACE_RUN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("static regex"));

/// One invoice/shipment line, normalized from a spreadsheet row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Note {
    pub id: Uuid,
    /// Receiving center ("Destino")
    pub destination: String,
    pub supply_date: NaiveDate,
    pub invoice_number: String,
    /// Sending store ("Origem")
    pub origin: String,
    pub origin_description: String,
    pub material_code: String,
    pub material_description: String,
    pub order_number: String,
    pub quantity: Decimal,
    pub unit: String,
    pub value: Decimal,
    /// Supply/remittance number ("Fornecimento")
    pub supply_reference: String,
    /// Free text printed on the invoice ("Mensagem NF")
    pub message: String,
    #[serde(with = "upload_timestamp")]
    pub uploaded_at: NaiveDateTime,
    /// Business identity used to detect re-uploads
    pub dedup_key: String,
    pub treated: bool,
    pub category: Category,
}

impl Note {
    /// Create a new, untreated note from its identifying fields
    ///
    /// The dedup key is derived here; everything else starts empty.
    pub fn new(
        id: Uuid,
        supply_date: NaiveDate,
        invoice_number: impl Into<String>,
        origin: impl Into<String>,
        material_code: impl Into<String>,
        uploaded_at: NaiveDateTime,
    ) -> Self {
        let invoice_number = invoice_number.into();
        let origin = origin.into();
        let material_code = material_code.into();
        let dedup_key = dedup_key(&supply_date, &invoice_number, &origin, &material_code);

        Self {
            id,
            destination: String::new(),
            supply_date,
            invoice_number,
            origin,
            origin_description: String::new(),
            material_code,
            material_description: String::new(),
            order_number: String::new(),
            quantity: Decimal::ZERO,
            unit: String::new(),
            value: Decimal::ZERO,
            supply_reference: String::new(),
            message: String::new(),
            uploaded_at,
            dedup_key,
            treated: false,
            category: Category::Standard,
        }
    }

    /// Upload timestamp as stored (`YYYY-MM-DD HH:MM:SS`)
    pub fn uploaded_at_string(&self) -> String {
        self.uploaded_at.format(UPLOAD_TIMESTAMP_FORMAT).to_string()
    }
}

/// Deterministic business key: date, invoice, origin and material joined by
/// `_`, with every whitespace run collapsed to a single `_`
pub fn dedup_key(
    supply_date: &NaiveDate,
    invoice_number: &str,
    origin: &str,
    material_code: &str,
) -> String {
    let joined = format!(
        "{}_{}_{}_{}",
        supply_date.format("%Y-%m-%d"),
        invoice_number,
        origin,
        material_code
    );
    WHITESPACE_RUN.replace_all(&joined, "_").into_owned()
}

mod upload_timestamp {
    use chrono::NaiveDateTime;
    use serde::{Deserialize, Deserializer, Serializer};

    use super::UPLOAD_TIMESTAMP_FORMAT;

    pub fn serialize<S: Serializer>(value: &NaiveDateTime, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&value.format(UPLOAD_TIMESTAMP_FORMAT).to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<NaiveDateTime, D::Error> {
        let s = String::deserialize(deserializer)?;
        NaiveDateTime::parse_from_str(&s, UPLOAD_TIMESTAMP_FORMAT).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn uploaded() -> NaiveDateTime {
        date(2024, 3, 6).and_hms_opt(8, 30, 0).unwrap()
    }

    #[test]
    fn test_dedup_key_joins_fields() {
        let key = dedup_key(&date(2024, 3, 5), "123456", "L042", "MAT-9");
        assert_eq!(key, "2024-03-05_123456_L042_MAT-9");
    }

    #[test]
    fn test_dedup_key_collapses_whitespace_runs() {
        let key = dedup_key(&date(2024, 3, 5), "12 34", "Loja  Centro", "A\tB");
        assert_eq!(key, "2024-03-05_12_34_Loja_Centro_A_B");
    }

    #[test]
    fn test_dedup_key_is_deterministic() {
        let a = dedup_key(&date(2023, 1, 2), "9", "O", "M");
        let b = dedup_key(&date(2023, 1, 2), "9", "O", "M");
        let c = dedup_key(&date(2023, 1, 2), "9", "O", "N");
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_new_note_defaults() {
        let note = Note::new(Uuid::new_v4(), date(2024, 3, 5), "1", "2", "3", uploaded());
        assert!(!note.treated);
        assert_eq!(note.category, Category::Standard);
        assert_eq!(note.dedup_key, "2024-03-05_1_2_3");
        assert_eq!(note.uploaded_at_string(), "2024-03-06 08:30:00");
    }

    #[test]
    fn test_serialized_shape() {
        let mut note = Note::new(Uuid::nil(), date(2024, 3, 5), "1", "2", "3", uploaded());
        note.value = Decimal::new(123450, 2);

        let json = serde_json::to_value(&note).unwrap();
        assert_eq!(json["supply_date"], "2024-03-05");
        assert_eq!(json["uploaded_at"], "2024-03-06 08:30:00");
        assert_eq!(json["category"], "padrao");

        let back: Note = serde_json::from_value(json).unwrap();
        assert_eq!(back, note);
    }
}
