//! Contrato com o agendador externo.
//!
//! Cada sensor habilitado vira um job recorrente com ID estável; sensores
//! desabilitados são removidos. O agendador garante no máximo uma
//! invocação em andamento por sensor.

use crate::types::{SensorConfig, SensorPurpose};
use std::time::Duration;
use tracing::debug;

/// ID estável do job de um sensor.
pub fn job_id(sensor: &SensorConfig) -> String {
    format!("Sensor #{}: {}", sensor.id, sensor.name)
}

pub fn cadence(purpose: SensorPurpose) -> Duration {
    purpose.cadence()
}

/// Equivalente cron da cadência, para agendadores baseados em cron.
pub fn cron_expression(purpose: SensorPurpose) -> &'static str {
    match purpose {
        SensorPurpose::Outdoor => "*/5 * * * *",
        _ => "* * * * *",
    }
}

pub trait JobScheduler {
    /// Registra o job ou atualiza sua cadência.
    fn add_or_update(&mut self, job_id: &str, sensor_id: u8, cadence: Duration);
    fn remove(&mut self, job_id: &str);
}

/// Registra os sensores habilitados e remove os demais.
pub fn sync_jobs(scheduler: &mut dyn JobScheduler, sensors: &[SensorConfig]) {
    for sensor in sensors {
        let id = job_id(sensor);
        if sensor.enabled {
            let cadence = cadence(sensor.purpose);
            debug!("Job '{id}' a cada {}s", cadence.as_secs());
            scheduler.add_or_update(&id, sensor.id, cadence);
        } else {
            debug!("Job '{id}' removido (sensor desabilitado)");
            scheduler.remove(&id);
        }
    }
}
