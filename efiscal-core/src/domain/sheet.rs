//! Spreadsheet row model
//!
//! A workbook line is read into typed cells before any business rule runs,
//! so that validation works on named fields instead of header lookups.

use serde::Serialize;

use super::Note;

/// Header names the first sheet must carry (exact, case-sensitive)
pub mod columns {
    pub const DESTINATION: &str = "Destino";
    pub const SUPPLY_DATE: &str = "Data Fornecimento";
    pub const INVOICE_NUMBER: &str = "Nota Fiscal";
    pub const ORIGIN: &str = "Origem";
    pub const ORIGIN_DESCRIPTION: &str = "Descrição Origem";
    pub const MATERIAL_CODE: &str = "Material";
    pub const MATERIAL_DESCRIPTION: &str = "Descrição";
    pub const ORDER_NUMBER: &str = "Pedido";
    pub const QUANTITY: &str = "Qtd.";
    pub const UNIT: &str = "Un.";
    pub const VALUE: &str = "Valor";
    pub const SUPPLY_REFERENCE: &str = "Fornecimento";
    pub const MESSAGE: &str = "Mensagem NF";
}

/// All required headers, in the order missing ones are reported
pub const REQUIRED_HEADERS: [&str; 13] = [
    columns::DESTINATION,
    columns::SUPPLY_DATE,
    columns::INVOICE_NUMBER,
    columns::ORIGIN,
    columns::ORIGIN_DESCRIPTION,
    columns::MATERIAL_CODE,
    columns::MATERIAL_DESCRIPTION,
    columns::ORDER_NUMBER,
    columns::QUANTITY,
    columns::UNIT,
    columns::VALUE,
    columns::SUPPLY_REFERENCE,
    columns::MESSAGE,
];

/// A single spreadsheet cell
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    Empty,
    Text(String),
    Number(f64),
}

impl CellValue {
    /// Zero counts as present; blank text does not
    pub fn is_present(&self) -> bool {
        match self {
            CellValue::Empty => false,
            CellValue::Text(s) => !s.trim().is_empty(),
            CellValue::Number(n) => !n.is_nan(),
        }
    }

    /// Trimmed text rendering; whole numbers print without a fraction
    pub fn to_text(&self) -> String {
        match self {
            CellValue::Empty => String::new(),
            CellValue::Text(s) => s.trim().to_string(),
            CellValue::Number(n) => n.to_string(),
        }
    }
}

impl From<&str> for CellValue {
    fn from(s: &str) -> Self {
        CellValue::Text(s.to_string())
    }
}

impl From<f64> for CellValue {
    fn from(n: f64) -> Self {
        CellValue::Number(n)
    }
}

/// First sheet of a workbook: trimmed header names plus data lines
#[derive(Debug, Clone, Default)]
pub struct SheetTable {
    pub headers: Vec<String>,
    pub rows: Vec<RawLine>,
}

/// One data line as read, before column mapping
#[derive(Debug, Clone, PartialEq)]
pub struct RawLine {
    /// 1-based line number in the sheet (the header is line 1)
    pub line: usize,
    pub cells: Vec<CellValue>,
}

impl RawLine {
    pub fn is_blank(&self) -> bool {
        self.cells.iter().all(|c| !c.is_present())
    }
}

/// One data line with a typed cell per required column
#[derive(Debug, Clone, PartialEq)]
pub struct SheetRow {
    pub line: usize,
    pub destination: CellValue,
    pub supply_date: CellValue,
    pub invoice_number: CellValue,
    pub origin: CellValue,
    pub origin_description: CellValue,
    pub material_code: CellValue,
    pub material_description: CellValue,
    pub order_number: CellValue,
    pub quantity: CellValue,
    pub unit: CellValue,
    pub value: CellValue,
    pub supply_reference: CellValue,
    pub message: CellValue,
}

impl SheetRow {
    /// The mandatory fields with their header names, in check order
    pub fn mandatory_fields(&self) -> [(&'static str, &CellValue); 5] {
        [
            (columns::DESTINATION, &self.destination),
            (columns::SUPPLY_DATE, &self.supply_date),
            (columns::INVOICE_NUMBER, &self.invoice_number),
            (columns::ORIGIN, &self.origin),
            (columns::MATERIAL_CODE, &self.material_code),
        ]
    }
}

/// Why a row was left out of an ingestion
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "column", rename_all = "snake_case")]
pub enum DropReason {
    MissingField(&'static str),
    InvalidDate,
}

impl std::fmt::Display for DropReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DropReason::MissingField(column) => write!(f, "missing {}", column),
            DropReason::InvalidDate => f.write_str("unresolvable supply date"),
        }
    }
}

/// A dropped row and its line number
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RowDrop {
    pub line: usize,
    pub reason: DropReason,
}

/// Result of validating one row
#[derive(Debug, Clone, PartialEq)]
pub enum RowOutcome {
    Valid(Box<Note>),
    Dropped(RowDrop),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_is_present_blank_is_not() {
        assert!(CellValue::Number(0.0).is_present());
        assert!(CellValue::from("0").is_present());
        assert!(!CellValue::from("   ").is_present());
        assert!(!CellValue::Empty.is_present());
    }

    #[test]
    fn test_to_text() {
        assert_eq!(CellValue::Number(12345.0).to_text(), "12345");
        assert_eq!(CellValue::Number(12.5).to_text(), "12.5");
        assert_eq!(CellValue::from("  L042 ").to_text(), "L042");
        assert_eq!(CellValue::Empty.to_text(), "");
    }

    #[test]
    fn test_blank_line() {
        let line = RawLine {
            line: 3,
            cells: vec![CellValue::Empty, CellValue::from(" ")],
        };
        assert!(line.is_blank());
    }

    #[test]
    fn test_required_headers_are_unique() {
        let mut headers = REQUIRED_HEADERS.to_vec();
        headers.sort();
        headers.dedup();
        assert_eq!(headers.len(), 13);
    }
}
