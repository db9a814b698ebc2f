//! Result and error types for the core library

use thiserror::Error;

/// Fatal problems with the layout of an uploaded workbook
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StructureError {
    #[error("workbook contains no sheets")]
    MissingSheet,

    #[error("first sheet is empty")]
    EmptySheet,

    #[error("required columns not found: {}", .0.join(", "))]
    MissingHeaders(Vec<String>),
}

/// Core library error type
#[derive(Error, Debug)]
pub enum Error {
    #[error("Structure error: {0}")]
    Structure(#[from] StructureError),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl Error {
    /// Create a parse error
    pub fn parse(msg: impl Into<String>) -> Self {
        Self::Parse(msg.into())
    }

    /// Create a validation error
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Create a database error
    pub fn database(msg: impl Into<String>) -> Self {
        Self::Database(msg.into())
    }

    /// Missing headers, if this is a structure error about them
    pub fn missing_headers(&self) -> Option<&[String]> {
        match self {
            Self::Structure(StructureError::MissingHeaders(headers)) => Some(headers),
            _ => None,
        }
    }
}

impl From<duckdb::Error> for Error {
    fn from(err: duckdb::Error) -> Self {
        Self::Database(err.to_string())
    }
}

/// Core library result type
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_headers_message_lists_every_column() {
        let err: Error = StructureError::MissingHeaders(vec![
            "Valor".to_string(),
            "Mensagem NF".to_string(),
        ])
        .into();

        let msg = err.to_string();
        assert!(msg.contains("Structure error"));
        assert!(msg.contains("Valor, Mensagem NF"));
        assert_eq!(
            err.missing_headers(),
            Some(&["Valor".to_string(), "Mensagem NF".to_string()][..])
        );
    }

    #[test]
    fn test_constructors() {
        assert!(Error::parse("bad zip").to_string().starts_with("Parse error"));
        assert!(Error::validation("too big").to_string().starts_with("Validation error"));
        assert!(Error::database("locked").to_string().starts_with("Database error"));
        assert!(Error::parse("x").missing_headers().is_none());
    }
}
