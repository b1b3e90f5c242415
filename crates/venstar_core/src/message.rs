//! Mensagens do protocolo dos sensores sem fio (protobuf, numeração fixa).
//!
//! ```text
//! SensorMessage
//! ├── 1  command        (41 SETSENSORNAME, 42 SENSORDATA, 43 SENSORPAIR…)
//! └── 42 sensor_data    SensorData
//!        ├── 1 info      Info
//!        └── 2 signature base64
//! ```
//!
//! Os campos 1–7 de [`Info`] são obrigatórios e sempre serializados; os
//! demais são omitidos quando zero. A ordem e os tipos precisam bater
//! byte a byte com o que o termostato decodifica.
//!
//! Campos enumerados ficam como `int32` crus: o `default` de um campo
//! `enumeration` do prost seria a primeira variante (ex: `OUTDOOR = 1`),
//! que então deixaria de ser serializada.

/// Discriminante do envelope.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, prost::Enumeration)]
#[repr(i32)]
pub enum Command {
    SetSensorName = 41,
    SensorData = 42,
    SensorPair = 43,
    WifiConfig = 44,
    WifiScanResults = 45,
    FirmwareChunk = 46,
    FirmwareComplete = 47,
    Success = 126,
    Failure = 127,
}

/// Campo `type` do bloco INFO.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, prost::Enumeration)]
#[repr(i32)]
pub enum SensorType {
    Outdoor = 1,
    Return = 2,
    Remote = 3,
    Supply = 4,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, prost::Enumeration)]
#[repr(i32)]
pub enum PowerSource {
    Battery = 1,
    Wired = 2,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, prost::Enumeration)]
#[repr(i32)]
pub enum SensorModel {
    TempSensor = 1,
}

/// Versão de firmware anunciada.
pub const FW_MAJOR: u32 = 4;
pub const FW_MINOR: u32 = 2;

/// Bateria sempre cheia.
pub const BATTERY_LEVEL: u32 = 100;

/// Bloco INFO: identidade do sensor + leitura. É sobre a serialização
/// isolada deste bloco que o HMAC dos pacotes de dados é calculado.
#[derive(Clone, PartialEq, prost::Message)]
pub struct Info {
    #[prost(uint32, required, tag = "1")]
    pub sequence: u32,
    #[prost(uint32, required, tag = "2")]
    pub sensor_id: u32,
    #[prost(string, required, tag = "3")]
    pub mac: String,
    #[prost(uint32, required, tag = "4")]
    pub fw_major: u32,
    #[prost(uint32, required, tag = "5")]
    pub fw_minor: u32,
    #[prost(int32, required, tag = "6")]
    pub model: i32,
    #[prost(int32, required, tag = "7")]
    pub power: i32,
    #[prost(string, tag = "8")]
    pub name: String,
    #[prost(int32, tag = "9")]
    pub sensor_type: i32,
    #[prost(uint32, tag = "10")]
    pub temperature: u32,
    #[prost(uint32, tag = "11")]
    pub battery: u32,
    #[prost(uint32, tag = "12")]
    pub humidity: u32,
}

impl Info {
    pub fn sensor_type(&self) -> Option<SensorType> {
        SensorType::try_from(self.sensor_type).ok()
    }
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct SensorData {
    #[prost(message, optional, tag = "1")]
    pub info: Option<Info>,
    #[prost(string, tag = "2")]
    pub signature: String,
}

/// Envelope enviado no broadcast.
#[derive(Clone, PartialEq, prost::Message)]
pub struct SensorMessage {
    #[prost(int32, tag = "1")]
    pub command: i32,
    #[prost(message, optional, tag = "42")]
    pub sensor_data: Option<SensorData>,
}

impl SensorMessage {
    pub fn command(&self) -> Option<Command> {
        Command::try_from(self.command).ok()
    }
}
