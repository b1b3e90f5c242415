//! Confiabilidade dos broadcasts agendados.
//!
//! Cada invocação agendada termina em sucesso ou falha, e o resultado é
//! repassado a um [`BroadcastObserver`]. O [`ReliabilityTracker`] mantém o
//! [`ReliabilityState`] de cada sensor e deriva `has_problem`: sensor
//! habilitado com [`FAILURE_THRESHOLD`] falhas seguidas ou mais.

use crate::error::TranslatorError;
use crate::types::Sensor;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, warn};

/// Falhas consecutivas a partir das quais o sensor "tem problema".
pub const FAILURE_THRESHOLD: u32 = 5;

/// Contadores persistidos por sensor.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReliabilityState {
    pub last_successful_broadcast: Option<DateTime<Utc>>,
    /// Só mensagens categorizadas chegam aqui
    pub last_error_message: Option<String>,
    pub consecutive_failures: u32,
}

impl ReliabilityState {
    pub fn record_success(&mut self, now: DateTime<Utc>) {
        self.last_successful_broadcast = Some(now);
        self.last_error_message = None;
        self.consecutive_failures = 0;
    }

    /// Conta a falha. Erros não categorizados preservam a mensagem anterior.
    pub fn record_failure(&mut self, err: &TranslatorError) {
        if let Some(message) = err.user_message() {
            self.last_error_message = Some(message);
        }
        self.consecutive_failures = self.consecutive_failures.saturating_add(1);
    }

    pub fn has_problem(&self, enabled: bool) -> bool {
        enabled && self.consecutive_failures >= FAILURE_THRESHOLD
    }

    /// Horário do último sucesso para logs (`Never` se nunca houve).
    pub fn last_success_label(&self) -> String {
        self.last_successful_broadcast
            .map(|t| t.format("%Y-%m-%d %H:%M:%S UTC").to_string())
            .unwrap_or_else(|| "Never".into())
    }
}

/// Recebe o resultado de cada invocação agendada.
pub trait BroadcastObserver {
    fn broadcast_succeeded(&mut self, sensor: &mut Sensor);
    fn broadcast_failed(&mut self, sensor: &mut Sensor, err: &TranslatorError);
}

/// Observer padrão: atualiza o estado do sensor e loga.
pub struct ReliabilityTracker {
    clock: fn() -> DateTime<Utc>,
}

impl ReliabilityTracker {
    pub fn new() -> Self {
        Self { clock: Utc::now }
    }

    /// Relógio fixo, para testes.
    pub fn with_clock(clock: fn() -> DateTime<Utc>) -> Self {
        Self { clock }
    }
}

impl Default for ReliabilityTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl BroadcastObserver for ReliabilityTracker {
    fn broadcast_succeeded(&mut self, sensor: &mut Sensor) {
        sensor.state.reliability.record_success((self.clock)());
        debug!("Sensor #{} ({}): broadcast OK", sensor.id(), sensor.name());
    }

    fn broadcast_failed(&mut self, sensor: &mut Sensor, err: &TranslatorError) {
        let was_problem = sensor.has_problem();
        sensor.state.reliability.record_failure(err);
        let reliability = &sensor.state.reliability;

        if err.is_categorized() {
            error!(
                "Sensor #{} ({}): falha no broadcast ({} seguidas): {}",
                sensor.id(),
                sensor.name(),
                reliability.consecutive_failures,
                err
            );
        } else {
            error!(
                "Sensor #{} ({}): falha inesperada no broadcast ({} seguidas): {:?}",
                sensor.id(),
                sensor.name(),
                reliability.consecutive_failures,
                err
            );
        }

        if sensor.has_problem() && !was_problem {
            warn!(
                "Sensor #{} ({}) atingiu {} falhas consecutivas. Último sucesso: {}",
                sensor.id(),
                sensor.name(),
                reliability.consecutive_failures,
                reliability.last_success_label()
            );
        }
    }
}

// ──────────────────────────────────────────────
// Testes
// ──────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extractor::ExtractionError;
    use crate::fetcher::FetchError;
    use crate::types::{SensorConfig, SensorPurpose, SensorState, TemperatureScale};
    use chrono::TimeZone;

    fn fixed_now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 15, 12, 30, 0).unwrap()
    }

    fn sensor(enabled: bool) -> Sensor {
        Sensor::new(
            SensorConfig {
                id: 2,
                name: "Bedroom".into(),
                enabled,
                purpose: SensorPurpose::Remote,
                scale: TemperatureScale::C,
                url: "http://127.0.0.1/".into(),
                json_path: "$.t".into(),
                ignore_ssl_errors: false,
                headers: Vec::new(),
            },
            SensorState::default(),
        )
    }

    #[test]
    fn five_failures_raise_problem_and_one_success_clears_it() {
        let mut tracker = ReliabilityTracker::with_clock(fixed_now);
        let mut sensor = sensor(true);
        let err = TranslatorError::from(FetchError::ConnectionRefused);

        for n in 1..FAILURE_THRESHOLD {
            tracker.broadcast_failed(&mut sensor, &err);
            assert_eq!(sensor.state.reliability.consecutive_failures, n);
            assert!(!sensor.has_problem());
        }
        tracker.broadcast_failed(&mut sensor, &err);
        assert!(sensor.has_problem());

        tracker.broadcast_succeeded(&mut sensor);
        assert!(!sensor.has_problem());
        assert_eq!(sensor.state.reliability.consecutive_failures, 0);
        assert_eq!(sensor.state.reliability.last_error_message, None);
        assert_eq!(
            sensor.state.reliability.last_successful_broadcast,
            Some(fixed_now())
        );
    }

    #[test]
    fn disabled_sensor_never_has_problem() {
        let mut tracker = ReliabilityTracker::with_clock(fixed_now);
        let mut sensor = sensor(false);
        let err = TranslatorError::from(FetchError::Timeout);
        for _ in 0..10 {
            tracker.broadcast_failed(&mut sensor, &err);
        }
        assert_eq!(sensor.state.reliability.consecutive_failures, 10);
        assert!(!sensor.has_problem());
    }

    #[test]
    fn categorized_failure_stores_message() {
        let mut state = ReliabilityState::default();
        state.record_failure(&ExtractionError::NonNumeric.into());
        assert_eq!(
            state.last_error_message.as_deref(),
            Some("The specified JSON Path found a non-numeric value.")
        );
    }

    #[test]
    fn uncategorized_failure_keeps_previous_message() {
        let mut state = ReliabilityState::default();
        state.record_failure(&FetchError::NotFound.into());
        let before = state.last_error_message.clone();

        state.record_failure(&std::io::Error::other("sendto: internal detail").into());
        assert_eq!(state.last_error_message, before);
        assert_eq!(state.consecutive_failures, 2);
    }

    #[test]
    fn success_label() {
        let mut state = ReliabilityState::default();
        assert_eq!(state.last_success_label(), "Never");
        state.record_success(fixed_now());
        assert_eq!(state.last_success_label(), "2024-01-15 12:30:00 UTC");
    }
}
