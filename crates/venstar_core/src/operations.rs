//! Orquestração: busca → extração → índice → pacote → broadcast.
//!
//! Nenhuma etapa é repetida internamente; qualquer falha aborta a invocação
//! e volta intacta para o chamador. Mutações em `sensor.state` precisam ser
//! persistidas pelo chamador depois de cada chamada.

use crate::broadcast::Broadcaster;
use crate::error::TranslatorError;
use crate::extractor::extract_value;
use crate::fetcher::DocumentFetcher;
use crate::packet::PacketBuilder;
use crate::reliability::BroadcastObserver;
use crate::temperature::temperature_index;
use crate::types::{Sensor, TemperatureScale};
use std::fmt;
use tracing::{debug, info};

/// Leitura bruta de um sensor.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Reading {
    pub value: f64,
    pub scale: TemperatureScale,
}

impl fmt::Display for Reading {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}°{}", self.value, self.scale)
    }
}

pub struct SensorOperations<F, B> {
    fetcher: F,
    broadcaster: B,
    builder: PacketBuilder,
}

impl<F: DocumentFetcher, B: Broadcaster> SensorOperations<F, B> {
    pub fn new(fetcher: F, broadcaster: B, builder: PacketBuilder) -> Self {
        Self {
            fetcher,
            broadcaster,
            builder,
        }
    }

    pub fn builder(&self) -> &PacketBuilder {
        &self.builder
    }

    pub fn get_document(&self, sensor: &Sensor) -> Result<String, TranslatorError> {
        let config = &sensor.config;
        self.fetcher
            .fetch_document(&config.url, config.ignore_ssl_errors, &config.headers)
    }

    /// Busca e extrai a leitura sem montar nem enviar nada.
    pub fn latest_reading(&self, sensor: &Sensor) -> Result<Reading, TranslatorError> {
        let document = self.get_document(sensor)?;
        let value = extract_value(&document, &sensor.config.json_path)?;
        Ok(Reading {
            value,
            scale: sensor.config.scale,
        })
    }

    fn current_index(&self, sensor: &Sensor) -> Result<u8, TranslatorError> {
        let reading = self.latest_reading(sensor)?;
        let index = temperature_index(reading.value, reading.scale)?;
        debug!(
            "Sensor #{} ({}): leitura {reading} → índice {index}",
            sensor.id(),
            sensor.name()
        );
        Ok(index)
    }

    /// Envio de rotina. O pacote fica em cache no sensor antes do broadcast.
    pub fn send_data_packet(&self, sensor: &mut Sensor) -> Result<(), TranslatorError> {
        let index = self.current_index(sensor)?;
        let packet = self.builder.build_data_packet(sensor, index);
        sensor.state.last_packet = Some(packet.clone());
        self.broadcaster.broadcast(&packet)?;
        Ok(())
    }

    /// Pareamento. Não atualiza o cache de reenvio.
    pub fn send_pairing_packet(&self, sensor: &mut Sensor) -> Result<(), TranslatorError> {
        let index = self.current_index(sensor)?;
        let packet = self.builder.build_pairing_packet(sensor, index);
        self.broadcaster.broadcast(&packet)?;
        info!("Sensor #{} ({}): pacote de pareamento enviado", sensor.id(), sensor.name());
        Ok(())
    }

    /// Reenvia os bytes em cache, sem buscar nada na rede.
    pub fn resend_last_packet(&self, sensor: &Sensor) -> Result<(), TranslatorError> {
        let packet = sensor
            .state
            .last_packet
            .as_deref()
            .ok_or(TranslatorError::NothingToResend)?;
        self.broadcaster.broadcast(packet)?;
        info!("Sensor #{} ({}): último pacote reenviado", sensor.id(), sensor.name());
        Ok(())
    }

    /// Uma invocação agendada: envia dados e reporta o resultado.
    pub fn run_scheduled(
        &self,
        sensor: &mut Sensor,
        observer: &mut dyn BroadcastObserver,
    ) -> Result<(), TranslatorError> {
        match self.send_data_packet(sensor) {
            Ok(()) => {
                observer.broadcast_succeeded(sensor);
                Ok(())
            }
            Err(err) => {
                observer.broadcast_failed(sensor, &err);
                Err(err)
            }
        }
    }
}

// ──────────────────────────────────────────────
// Testes
// ──────────────────────────────────────────────
