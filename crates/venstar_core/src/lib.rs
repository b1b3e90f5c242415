//! # Venstar Core
//!
//! Tradução de leituras de temperatura servidas por HTTP/JSON em pacotes
//! de sensor sem fio da Venstar, enviados por broadcast UDP.
//!
//! ## Módulos
//! - [`types`] – Modelo dos sensores (configuração + estado)
//! - [`temperature`] – Leitura → índice de temperatura (0–253)
//! - [`message`] – Mensagens protobuf do protocolo
//! - [`signature`] / [`packet`] – Assinatura e montagem dos pacotes
//! - [`fetcher`] – Busca HTTP com taxonomia de falhas
//! - [`extractor`] – Extração do valor via JSONPath
//! - [`broadcast`] – Envio UDP (5x)
//! - [`operations`] – Orquestração do pipeline
//! - [`reliability`] – Contadores de falha e `has_problem`
//! - [`validation`] / [`config`] – Configuração TOML validada
//! - [`state`] – Estado persistido em binário (bincode)
//! - [`schedule`] – Contrato com o agendador

pub mod types;
pub mod temperature;
pub mod message;
pub mod signature;
pub mod packet;
pub mod error;
pub mod fetcher;
pub mod extractor;
pub mod broadcast;
pub mod operations;
pub mod reliability;
pub mod validation;
pub mod config;
pub mod state;
pub mod schedule;

// Re-exports convenientes
pub use types::{Sensor, SensorConfig, SensorPurpose, SensorState, TemperatureScale};
pub use error::{ErrorKind, TranslatorError};
pub use packet::{MacPrefix, PacketBuilder};
pub use fetcher::{DocumentFetcher, HttpDocumentFetcher};
pub use broadcast::{Broadcaster, UdpBroadcaster};
pub use operations::{Reading, SensorOperations};
pub use reliability::{BroadcastObserver, ReliabilityTracker};
pub use config::{AppConfig, ConfigError};
pub use state::StateSnapshot;
