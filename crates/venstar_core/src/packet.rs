//! Montagem dos pacotes de pareamento e de dados.
//!
//! O MAC de cada sensor é `prefixo (10 hex) + id (2 hex)`, em minúsculas.
//! O prefixo é configuração do processo inteiro e entra aqui uma única vez,
//! na construção do [`PacketBuilder`].

use crate::error::TranslatorError;
use crate::message::{
    BATTERY_LEVEL, Command, FW_MAJOR, FW_MINOR, Info, PowerSource, SensorData, SensorMessage,
    SensorModel,
};
use crate::signature::SignatureKey;
use crate::types::Sensor;
use prost::Message;
use std::fmt;
use tracing::debug;

/// Prefixo usado quando a configuração não define um.
pub const DEFAULT_MAC_PREFIX: &str = "428e0486d8";

/// Tamanho exato do prefixo em caracteres hex.
pub const MAC_PREFIX_LEN: usize = 10;

/// A sequência volta para 1 ao atingir este valor.
pub const SEQUENCE_WRAP: u16 = 65000;

/// Prefixo de MAC validado (10 dígitos hex minúsculos).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MacPrefix(String);

impl MacPrefix {
    /// Valida o prefixo. Em branco usa [`DEFAULT_MAC_PREFIX`].
    pub fn parse(raw: &str) -> Result<Self, TranslatorError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Ok(Self::default());
        }
        if trimmed.len() != MAC_PREFIX_LEN {
            return Err(TranslatorError::Configuration(format!(
                "The prefix to use in the fake MAC addresses has to be exactly {MAC_PREFIX_LEN} characters long."
            )));
        }
        if !trimmed.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(TranslatorError::Configuration(
                "The prefix to use in the fake MAC addresses can only contain hexadecimal characters (0-9, a-f)."
                    .into(),
            ));
        }
        Ok(Self(trimmed.to_ascii_lowercase()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// MAC completo do sensor.
    pub fn mac_for(&self, sensor_id: u8) -> String {
        format!("{}{:02x}", self.0, sensor_id)
    }
}

impl Default for MacPrefix {
    fn default() -> Self {
        Self(DEFAULT_MAC_PREFIX.into())
    }
}

impl fmt::Display for MacPrefix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Próximo número de sequência após um pacote de dados.
pub fn next_sequence(current: u16) -> u16 {
    let next = current.saturating_add(1);
    if next >= SEQUENCE_WRAP { 1 } else { next }
}

/// Monta os pacotes binários de um sensor.
#[derive(Debug, Clone, Default)]
pub struct PacketBuilder {
    mac_prefix: MacPrefix,
}

impl PacketBuilder {
    pub fn new(mac_prefix: MacPrefix) -> Self {
        Self { mac_prefix }
    }

    pub fn mac_prefix(&self) -> &MacPrefix {
        &self.mac_prefix
    }

    pub fn mac_address(&self, sensor_id: u8) -> String {
        self.mac_prefix.mac_for(sensor_id)
    }

    pub fn signature_key(&self, sensor_id: u8) -> SignatureKey {
        SignatureKey::from_mac(&self.mac_address(sensor_id))
    }

    fn info(&self, sensor: &Sensor, sequence: u16, temperature_index: u8) -> Info {
        Info {
            sequence: u32::from(sequence),
            sensor_id: u32::from(sensor.id()),
            mac: self.mac_address(sensor.id()),
            fw_major: FW_MAJOR,
            fw_minor: FW_MINOR,
            model: SensorModel::TempSensor as i32,
            power: PowerSource::Battery as i32,
            name: sensor.config.name.clone(),
            sensor_type: sensor.config.purpose.protocol_type() as i32,
            temperature: u32::from(temperature_index),
            battery: BATTERY_LEVEL,
            humidity: 0,
        }
    }

    /// Pacote de pareamento: sequência 1, assinatura = chave em claro.
    /// Também reinicia a sequência persistida do sensor em 1.
    pub fn build_pairing_packet(&self, sensor: &mut Sensor, temperature_index: u8) -> Vec<u8> {
        let info = self.info(sensor, 1, temperature_index);
        let message = SensorMessage {
            command: Command::SensorPair as i32,
            sensor_data: Some(SensorData {
                info: Some(info),
                signature: self.signature_key(sensor.id()).encoded(),
            }),
        };
        sensor.state.sequence = 1;

        let bytes = message.encode_to_vec();
        debug!(
            "Sensor #{} ({}): pacote de pareamento montado, índice {}, {} bytes",
            sensor.id(),
            sensor.name(),
            temperature_index,
            bytes.len()
        );
        bytes
    }

    /// Pacote de dados assinado com HMAC do bloco INFO. Avança a sequência
    /// do sensor (com volta para 1 em [`SEQUENCE_WRAP`]).
    pub fn build_data_packet(&self, sensor: &mut Sensor, temperature_index: u8) -> Vec<u8> {
        let sequence = sensor.state.sequence;
        let info = self.info(sensor, sequence, temperature_index);
        let signature = self.signature_key(sensor.id()).sign(&info.encode_to_vec());
        let message = SensorMessage {
            command: Command::SensorData as i32,
            sensor_data: Some(SensorData {
                info: Some(info),
                signature,
            }),
        };
        sensor.state.sequence = next_sequence(sequence);

        let bytes = message.encode_to_vec();
        debug!(
            "Sensor #{} ({}): pacote de dados seq={} índice {}, {} bytes, hex={}…",
            sensor.id(),
            sensor.name(),
            sequence,
            temperature_index,
            bytes.len(),
            hex::encode(&bytes[..bytes.len().min(16)])
        );
        bytes
    }
}

// ──────────────────────────────────────────────
// Testes
// ──────────────────────────────────────────────
