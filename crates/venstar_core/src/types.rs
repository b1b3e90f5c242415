//! Modelo de dados dos sensores lógicos.
//!
//! Um [`Sensor`] junta a parte configurada pelo usuário ([`SensorConfig`],
//! vinda do `config.toml`) com o estado mutado pelo pipeline
//! ([`SensorState`], persistido em binário entre execuções).

use crate::message::SensorType;
use crate::reliability::ReliabilityState;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Maior ID de sensor aceito pelo termostato.
pub const MAX_SENSOR_ID: u8 = 19;

/// Limite de sensores simultâneos.
pub const MAX_SENSORS: usize = 20;

/// Tamanho máximo do nome exibido no termostato.
pub const MAX_NAME_LENGTH: usize = 14;

// ──────────────────────────────────────────────
// Enums de configuração
// ──────────────────────────────────────────────

/// Papel do sensor no sistema HVAC. Define a cadência de envio e o campo
/// `type` do protocolo.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SensorPurpose {
    Outdoor,
    Return,
    Remote,
    Supply,
}

impl SensorPurpose {
    pub fn protocol_type(self) -> SensorType {
        match self {
            SensorPurpose::Outdoor => SensorType::Outdoor,
            SensorPurpose::Return => SensorType::Return,
            SensorPurpose::Remote => SensorType::Remote,
            SensorPurpose::Supply => SensorType::Supply,
        }
    }

    /// Intervalo entre broadcasts agendados.
    pub fn cadence(self) -> Duration {
        match self {
            SensorPurpose::Outdoor => Duration::from_secs(5 * 60),
            _ => Duration::from_secs(60),
        }
    }
}

impl fmt::Display for SensorPurpose {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            SensorPurpose::Outdoor => "Outdoor",
            SensorPurpose::Return => "Return",
            SensorPurpose::Remote => "Remote",
            SensorPurpose::Supply => "Supply",
        };
        f.pad(label)
    }
}

/// Escala em que a fonte HTTP reporta a temperatura.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TemperatureScale {
    F,
    C,
}

impl fmt::Display for TemperatureScale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TemperatureScale::F => f.write_str("F"),
            TemperatureScale::C => f.write_str("C"),
        }
    }
}

// ──────────────────────────────────────────────
// Configuração do sensor
// ──────────────────────────────────────────────

/// Header HTTP extra enviado à fonte (ex: `Authorization`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HttpHeader {
    pub name: String,
    pub value: String,
}

impl HttpHeader {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// Definição de um sensor lógico, como aparece em `[[sensors]]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensorConfig {
    /// ID (0–19), também embutido no MAC sintetizado
    pub id: u8,
    /// Nome exibido no termostato (até 14 caracteres)
    pub name: String,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    pub purpose: SensorPurpose,
    pub scale: TemperatureScale,
    /// URL do documento JSON com a leitura
    pub url: String,
    /// Consulta JSONPath que localiza a leitura no documento
    pub json_path: String,
    #[serde(default)]
    pub ignore_ssl_errors: bool,
    #[serde(default)]
    pub headers: Vec<HttpHeader>,
}

fn default_enabled() -> bool {
    true
}

// ──────────────────────────────────────────────
// Estado mutado pelo pipeline
// ──────────────────────────────────────────────

/// Campos que só o pipeline altera. Persistidos pelo chamador após cada
/// invocação.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SensorState {
    /// Próximo número de sequência (1–64999 após o primeiro envio)
    pub sequence: u16,
    /// Bytes do último pacote de dados montado, para reenvio
    pub last_packet: Option<Vec<u8>>,
    pub reliability: ReliabilityState,
}

/// Sensor completo: configuração + estado.
#[derive(Debug, Clone, PartialEq)]
pub struct Sensor {
    pub config: SensorConfig,
    pub state: SensorState,
}

impl Sensor {
    pub fn new(config: SensorConfig, state: SensorState) -> Self {
        Self { config, state }
    }

    pub fn id(&self) -> u8 {
        self.config.id
    }

    pub fn name(&self) -> &str {
        &self.config.name
    }

    /// Falha sustentada de um sensor habilitado.
    pub fn has_problem(&self) -> bool {
        self.state.reliability.has_problem(self.config.enabled)
    }
}

// ──────────────────────────────────────────────
// Testes
// ──────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn purpose_maps_to_protocol_type() {
        assert_eq!(SensorPurpose::Outdoor.protocol_type() as i32, 1);
        assert_eq!(SensorPurpose::Return.protocol_type() as i32, 2);
        assert_eq!(SensorPurpose::Remote.protocol_type() as i32, 3);
        assert_eq!(SensorPurpose::Supply.protocol_type() as i32, 4);
    }

    #[test]
    fn outdoor_sensors_broadcast_less_often() {
        assert_eq!(SensorPurpose::Outdoor.cadence(), Duration::from_secs(300));
        assert_eq!(SensorPurpose::Remote.cadence(), Duration::from_secs(60));
        assert_eq!(SensorPurpose::Supply.cadence(), Duration::from_secs(60));
    }

    #[test]
    fn sensor_config_defaults_from_toml() {
        let config: SensorConfig = toml::from_str(
            r#"
id = 3
name = "Garage"
purpose = "Remote"
scale = "C"
url = "http://10.0.0.2/data"
json_path = "$.temp"
"#,
        )
        .unwrap();
        assert!(config.enabled);
        assert!(!config.ignore_ssl_errors);
        assert!(config.headers.is_empty());
        assert_eq!(config.scale, TemperatureScale::C);
    }

    #[test]
    fn fresh_state_is_zeroed() {
        let state = SensorState::default();
        assert_eq!(state.sequence, 0);
        assert!(state.last_packet.is_none());
        assert_eq!(state.reliability.consecutive_failures, 0);
    }
}
