//! Validação explícita das definições de sensor.
//!
//! Funções puras que devolvem a lista de violações por campo; chamadas na
//! carga do `config.toml` e antes de comandos avulsos.

use crate::extractor::parse_path;
use crate::types::{MAX_NAME_LENGTH, MAX_SENSOR_ID, MAX_SENSORS, SensorConfig};
use std::collections::HashSet;
use std::fmt;

/// Uma violação de um campo.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Violation {
    pub field: String,
    pub message: String,
}

impl Violation {
    fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

pub fn validate_sensor(sensor: &SensorConfig) -> Vec<Violation> {
    let mut violations = Vec::new();

    if sensor.id > MAX_SENSOR_ID {
        violations.push(Violation::new(
            "id",
            format!("The sensor ID must be between 0 and {MAX_SENSOR_ID}."),
        ));
    }

    if sensor.name.trim().is_empty() {
        violations.push(Violation::new("name", "The sensor name is required."));
    } else if sensor.name.chars().count() > MAX_NAME_LENGTH {
        violations.push(Violation::new(
            "name",
            format!("The sensor name can be at most {MAX_NAME_LENGTH} characters long."),
        ));
    }

    if sensor.url.trim().is_empty() {
        violations.push(Violation::new("url", "The URL is required."));
    } else {
        match reqwest::Url::parse(&sensor.url) {
            Ok(url) if matches!(url.scheme(), "http" | "https") => {}
            Ok(_) => violations.push(Violation::new("url", "The URL must use http or https.")),
            Err(_) => violations.push(Violation::new(
                "url",
                "The URL must be a properly formed absolute URL.",
            )),
        }
    }

    if sensor.json_path.trim().is_empty() {
        violations.push(Violation::new("json_path", "The JSON Path is required."));
    } else if let Err(err) = parse_path(&sensor.json_path) {
        violations.push(Violation::new("json_path", err.to_string()));
    }

    let mut seen = HashSet::new();
    for (i, header) in sensor.headers.iter().enumerate() {
        let field = format!("headers[{i}]");
        if header.name.trim().is_empty() {
            violations.push(Violation::new(&field, "Header names cannot be blank."));
        } else if !seen.insert(header.name.trim().to_ascii_lowercase()) {
            violations.push(Violation::new(
                &field,
                format!("Duplicate header name '{}'.", header.name.trim()),
            ));
        }
        if header.value.trim().is_empty() {
            violations.push(Violation::new(&field, "Header values cannot be blank."));
        }
    }

    violations
}

/// Valida cada sensor e as regras da coleção (limite, IDs e nomes únicos).
/// Campos de sensores individuais vêm prefixados por `sensors[i].`.
pub fn validate_sensors(sensors: &[SensorConfig]) -> Vec<Violation> {
    let mut violations = Vec::new();

    if sensors.len() > MAX_SENSORS {
        violations.push(Violation::new(
            "sensors",
            format!("At most {MAX_SENSORS} sensors can be configured."),
        ));
    }

    let mut ids = HashSet::new();
    let mut names = HashSet::new();
    for (i, sensor) in sensors.iter().enumerate() {
        for v in validate_sensor(sensor) {
            violations.push(Violation::new(format!("sensors[{i}].{}", v.field), v.message));
        }
        if !ids.insert(sensor.id) {
            violations.push(Violation::new(
                format!("sensors[{i}].id"),
                format!("Sensor ID {} is already in use.", sensor.id),
            ));
        }
        if !names.insert(sensor.name.trim()) {
            violations.push(Violation::new(
                format!("sensors[{i}].name"),
                format!("Sensor name '{}' is already in use.", sensor.name.trim()),
            ));
        }
    }

    violations
}
