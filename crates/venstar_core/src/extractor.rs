//! Extração do valor numérico de um documento JSON via JSONPath.
//!
//! O primeiro resultado do path é a leitura. Números JSON são usados como
//! estão; em strings vale o primeiro número decimal (`[-+]?\d+(\.\d+)?`)
//! encontrado. Assim tanto `72.5` quanto `"72.5°F"` funcionam.

use regex::Regex;
use serde_json::Value;
use serde_json_path::JsonPath;
use std::sync::LazyLock;

static NUMBER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[-+]?\d+(?:\.\d+)?").expect("regex de número é válida")
});

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ExtractionError {
    #[error("The specified JSON Path failed to find anything.")]
    NothingFound,

    #[error("The specified JSON Path found a non-numeric value.")]
    NonNumeric,

    #[error("Invalid JSON document: {0}")]
    InvalidDocument(String),

    #[error("JSON Path error: {0}")]
    InvalidPath(String),
}

/// Valida a sintaxe de um JSONPath sem executá-lo.
pub fn parse_path(path: &str) -> Result<JsonPath, ExtractionError> {
    JsonPath::parse(path).map_err(|e| ExtractionError::InvalidPath(e.to_string()))
}

/// Aplica `path` ao documento e devolve o primeiro número encontrado.
pub fn extract_value(document: &str, path: &str) -> Result<f64, ExtractionError> {
    let path = parse_path(path)?;
    let value: Value = serde_json::from_str(document)
        .map_err(|e| ExtractionError::InvalidDocument(e.to_string()))?;

    let node = path
        .query(&value)
        .first()
        .ok_or(ExtractionError::NothingFound)?;

    let text = match node {
        Value::String(s) => s.clone(),
        // Direto como f64: `to_string` pode sair em notação exponencial
        Value::Number(n) => return n.as_f64().ok_or(ExtractionError::NonNumeric),
        Value::Null => return Err(ExtractionError::NothingFound),
        Value::Bool(_) | Value::Array(_) | Value::Object(_) => {
            return Err(ExtractionError::NonNumeric);
        }
    };
    if text.trim().is_empty() {
        return Err(ExtractionError::NothingFound);
    }

    let number = NUMBER
        .find(&text)
        .ok_or(ExtractionError::NonNumeric)?;
    number
        .as_str()
        .parse()
        .map_err(|_| ExtractionError::NonNumeric)
}
