//! Estado persistido dos sensores (sequência, último pacote, confiabilidade).
//!
//! Formato do arquivo:
//!
//! ```text
//! ┌──────────┬─────────┬──────────────────────────┐
//! │ Magic(1) │ Ver.(1) │ bincode(StateSnapshot)   │
//! └──────────┴─────────┴──────────────────────────┘
//! ```
//!
//! A gravação passa por um arquivo temporário + rename, então um processo
//! interrompido nunca deixa o snapshot pela metade.

use crate::types::{Sensor, SensorConfig, SensorState};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::{debug, warn};

/// Magic byte do arquivo de estado.
pub const MAGIC_BYTE: u8 = 0x56; // 'V'

/// Versão atual do formato.
pub const STATE_VERSION: u8 = 1;

/// Tamanho do header (magic + version).
const HEADER_SIZE: usize = 2;

#[derive(Debug, thiserror::Error)]
pub enum StateError {
    #[error("Arquivo de estado muito curto ({0} bytes, mínimo {HEADER_SIZE})")]
    TooShort(usize),

    #[error("Magic byte inválido: 0x{0:02X} (esperado 0x{MAGIC_BYTE:02X})")]
    InvalidMagic(u8),

    #[error("Versão incompatível: {0} (suportada: {STATE_VERSION})")]
    VersionMismatch(u8),

    #[error("Erro de serialização: {0}")]
    Serialize(String),

    #[error("Erro de deserialização: {0}")]
    Deserialize(String),

    #[error("Erro de E/S: {0}")]
    Io(#[from] std::io::Error),
}

/// Estado de todos os sensores, indexado pelo ID.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StateSnapshot {
    pub sensors: BTreeMap<u8, SensorState>,
}

impl StateSnapshot {
    /// Monta o [`Sensor`] com o estado guardado (ou zerado).
    pub fn sensor(&self, config: &SensorConfig) -> Sensor {
        let state = self.sensors.get(&config.id).cloned().unwrap_or_default();
        Sensor::new(config.clone(), state)
    }

    /// Guarda o estado mutado pelo pipeline.
    pub fn store(&mut self, sensor: &Sensor) {
        self.sensors.insert(sensor.id(), sensor.state.clone());
    }

    /// Descarta estado de sensores que saíram da configuração.
    pub fn retain_configured(&mut self, configs: &[SensorConfig]) {
        self.sensors
            .retain(|id, _| configs.iter().any(|c| c.id == *id));
    }

    /// Carrega o snapshot. Arquivo ausente ou inválido = snapshot vazio.
    pub fn load(path: &Path) -> Self {
        if !path.exists() {
            debug!("Sem estado em {}, começando do zero", path.display());
            return Self::default();
        }
        match Self::read(path) {
            Ok(snapshot) => snapshot,
            Err(e) => {
                warn!("Estado em {} ignorado: {}", path.display(), e);
                Self::default()
            }
        }
    }

    /// Lê e decodifica o snapshot, sem recorrer ao padrão.
    pub fn read(path: &Path) -> Result<Self, StateError> {
        decode_state(&std::fs::read(path)?)
    }

    pub fn save(&self, path: &Path) -> Result<(), StateError> {
        let frame = encode_state(self)?;
        let mut tmp = path.as_os_str().to_owned();
        tmp.push(".tmp");
        std::fs::write(&tmp, frame)?;
        std::fs::rename(&tmp, path)?;
        debug!("Estado salvo em {}", path.display());
        Ok(())
    }
}

/// Codifica o snapshot: `[MAGIC][VERSION][bincode...]`.
pub fn encode_state(snapshot: &StateSnapshot) -> Result<Vec<u8>, StateError> {
    let body = bincode::serialize(snapshot).map_err(|e| StateError::Serialize(e.to_string()))?;

    let mut frame = Vec::with_capacity(HEADER_SIZE + body.len());
    frame.push(MAGIC_BYTE);
    frame.push(STATE_VERSION);
    frame.extend_from_slice(&body);

    Ok(frame)
}

/// Decodifica um snapshot, validando magic byte e versão.
pub fn decode_state(data: &[u8]) -> Result<StateSnapshot, StateError> {
    if data.len() < HEADER_SIZE {
        return Err(StateError::TooShort(data.len()));
    }

    let magic = data[0];
    if magic != MAGIC_BYTE {
        return Err(StateError::InvalidMagic(magic));
    }

    let version = data[1];
    if version != STATE_VERSION {
        return Err(StateError::VersionMismatch(version));
    }

    bincode::deserialize(&data[HEADER_SIZE..]).map_err(|e| StateError::Deserialize(e.to_string()))
}

// ──────────────────────────────────────────────
// Testes
// ──────────────────────────────────────────────
