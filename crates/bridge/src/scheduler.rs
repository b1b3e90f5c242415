//! Agendador em threads: um job recorrente por sensor habilitado.
//!
//! Cada job roda numa thread própria, então nunca há duas invocações do
//! mesmo sensor ao mesmo tempo. O estado é persistido após cada execução,
//! sempre relido do arquivo antes, para não apagar o que um comando avulso
//! gravou enquanto o daemon rodava.

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender, bounded};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};
use venstar_core::reliability::BroadcastObserver;
use venstar_core::schedule::JobScheduler;
use venstar_core::{
    HttpDocumentFetcher, ReliabilityTracker, Sensor, SensorConfig, SensorOperations,
    StateSnapshot, UdpBroadcaster,
};

pub type Operations = SensorOperations<HttpDocumentFetcher, UdpBroadcaster>;

/// O que os jobs compartilham.
pub struct Shared {
    pub ops: Operations,
    pub sensors: Vec<SensorConfig>,
    pub snapshot: Mutex<StateSnapshot>,
    pub state_path: PathBuf,
}

impl Shared {
    pub fn sensor_config(&self, id: u8) -> Option<&SensorConfig> {
        self.sensors.iter().find(|s| s.id == id)
    }

    /// Trava o snapshot já sincronizado com o arquivo de estado.
    ///
    /// Outro processo (`--pair` com o daemon rodando) pode ter gravado no
    /// arquivo. Se ele não puder ser lido, vale o que está em memória.
    fn lock(&self) -> MutexGuard<'_, StateSnapshot> {
        let mut snapshot = self.snapshot.lock().unwrap_or_else(PoisonError::into_inner);
        match StateSnapshot::read(&self.state_path) {
            Ok(mut on_disk) => {
                on_disk.retain_configured(&self.sensors);
                *snapshot = on_disk;
            }
            Err(e) => debug!("Estado em memória mantido ({}): {e}", self.state_path.display()),
        }
        snapshot
    }

    /// Sensor com o estado persistido mais recente.
    pub fn load_sensor(&self, config: &SensorConfig) -> Sensor {
        self.lock().sensor(config)
    }

    /// Grava o estado mutado pelo pipeline.
    ///
    /// Só o sensor informado é substituído; o resto vem do arquivo.
    pub fn persist(&self, sensor: &Sensor) {
        let mut snapshot = self.lock();
        snapshot.store(sensor);
        if let Err(e) = snapshot.save(&self.state_path) {
            warn!("Não foi possível salvar o estado em {}: {e}", self.state_path.display());
        }
    }

    /// Uma invocação agendada. Falhas já são logadas pelo observer.
    fn run_scheduled(&self, config: &SensorConfig, observer: &mut dyn BroadcastObserver) {
        let mut sensor = self.load_sensor(config);
        let sequence = sensor.state.sequence;
        if self.ops.run_scheduled(&mut sensor, observer).is_ok() {
            info!(
                "→ Sensor #{} ({}) seq {} enviado",
                sensor.id(),
                sensor.name(),
                sequence
            );
        }
        self.persist(&sensor);
    }
}

struct Job {
    cadence: Duration,
    stop: Sender<()>,
    handle: JoinHandle<()>,
}

pub struct ThreadScheduler {
    shared: Arc<Shared>,
    jobs: HashMap<String, Job>,
}

impl ThreadScheduler {
    pub fn new(shared: Arc<Shared>) -> Self {
        Self {
            shared,
            jobs: HashMap::new(),
        }
    }

    pub fn job_count(&self) -> usize {
        self.jobs.len()
    }

    /// Bloqueia até todos os jobs terminarem.
    pub fn wait(self) {
        for (_, job) in self.jobs {
            let _ = job.handle.join();
        }
    }
}

impl JobScheduler for ThreadScheduler {
    fn add_or_update(&mut self, job_id: &str, sensor_id: u8, cadence: Duration) {
        if self.jobs.get(job_id).is_some_and(|job| job.cadence == cadence) {
            return;
        }
        self.remove(job_id);

        let Some(config) = self.shared.sensor_config(sensor_id).cloned() else {
            warn!("Job '{job_id}' ignorado: sensor #{sensor_id} não configurado");
            return;
        };
        let (stop, stopped) = bounded(1);
        let shared = Arc::clone(&self.shared);
        let spawned = std::thread::Builder::new()
            .name(format!("sensor-{sensor_id}"))
            .spawn(move || job_loop(&shared, &config, cadence, &stopped));

        match spawned {
            Ok(handle) => {
                info!("Job '{job_id}' agendado a cada {}s", cadence.as_secs());
                self.jobs.insert(
                    job_id.to_string(),
                    Job {
                        cadence,
                        stop,
                        handle,
                    },
                );
            }
            Err(e) => error!("Falha ao criar thread do job '{job_id}': {e}"),
        }
    }

    fn remove(&mut self, job_id: &str) {
        if let Some(job) = self.jobs.remove(job_id) {
            let _ = job.stop.send(());
            let _ = job.handle.join();
            info!("Job '{job_id}' removido");
        }
    }
}

fn job_loop(shared: &Shared, config: &SensorConfig, cadence: Duration, stopped: &Receiver<()>) {
    let mut tracker = ReliabilityTracker::new();
    loop {
        let started = Instant::now();
        shared.run_scheduled(config, &mut tracker);

        // Dormir pelo tempo restante do intervalo (ou até ser removido)
        match stopped.recv_timeout(cadence.saturating_sub(started.elapsed())) {
            Err(RecvTimeoutError::Timeout) => continue,
            _ => break,
        }
    }
}
