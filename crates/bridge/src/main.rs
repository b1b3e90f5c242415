//! # Venstar Bridge
//!
//! Lê temperaturas de fontes HTTP/JSON e as envia por broadcast UDP como
//! sensores sem fio da Venstar.
//!
//! ## Uso
//! ```bash
//! venstar_bridge                      # Agenda todos os sensores habilitados
//! venstar_bridge --config outro.toml  # Config alternativo
//! venstar_bridge --pair 3             # Envia pacote de pareamento do sensor #3
//! venstar_bridge --resend 3           # Reenvia o último pacote do sensor #3
//! venstar_bridge --latest 3           # Mostra a leitura atual do sensor #3
//! ```
//!
//! Comandos avulsos podem rodar com o daemon no ar: o arquivo de estado é
//! relido antes de cada leitura e gravação, nos dois processos.

mod scheduler;

use scheduler::{Shared, ThreadScheduler};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::{Arc, Mutex};
use tracing::{error, info, warn};
use venstar_core::broadcast::{BROADCAST_PORT, REPEAT_COUNT};
use venstar_core::schedule::{cadence, sync_jobs};
use venstar_core::{
    AppConfig, HttpDocumentFetcher, PacketBuilder, SensorOperations, StateSnapshot,
    TranslatorError, UdpBroadcaster,
};

const USAGE: &str =
    "Uso: venstar_bridge [--config <arquivo>] [--pair <id> | --resend <id> | --latest <id>]";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    Run,
    Pair(u8),
    Resend(u8),
    Latest(u8),
}

#[derive(Debug, PartialEq)]
struct Args {
    config_path: Option<PathBuf>,
    command: Command,
}

fn parse_args(args: &[String]) -> Result<Args, String> {
    let mut parsed = Args {
        config_path: None,
        command: Command::Run,
    };
    let mut iter = args.iter();
    while let Some(flag) = iter.next() {
        let mut value = || {
            iter.next()
                .ok_or_else(|| format!("{flag} precisa de um valor"))
        };
        let sensor_id = |raw: &String| {
            raw.parse::<u8>()
                .map_err(|_| format!("ID de sensor inválido: {raw}"))
        };
        let command = match flag.as_str() {
            "--config" => {
                parsed.config_path = Some(PathBuf::from(value()?));
                continue;
            }
            "--pair" => Command::Pair(sensor_id(value()?)?),
            "--resend" => Command::Resend(sensor_id(value()?)?),
            "--latest" => Command::Latest(sensor_id(value()?)?),
            other => return Err(format!("Argumento desconhecido: {other}")),
        };
        if parsed.command != Command::Run {
            return Err("Apenas um comando por execução".into());
        }
        parsed.command = command;
    }
    Ok(parsed)
}

fn main() -> ExitCode {
    // ── Logging ──
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let raw_args: Vec<String> = std::env::args().skip(1).collect();
    let args = match parse_args(&raw_args) {
        Ok(args) => args,
        Err(e) => {
            eprintln!("{e}\n{USAGE}");
            return ExitCode::FAILURE;
        }
    };

    // ── Carregar config ──
    let config_path = args.config_path.unwrap_or_else(AppConfig::default_path);
    let config = match AppConfig::load(&config_path) {
        Ok(config) => config,
        Err(e) => {
            error!("{e}");
            return ExitCode::FAILURE;
        }
    };

    // Salva config padrão se não existir
    if !config_path.exists() {
        if let Err(e) = config.save(&config_path) {
            warn!("Não foi possível salvar config padrão: {e}");
        }
    }

    let errors = config.validate();
    if !errors.is_empty() {
        for e in &errors {
            error!("Configuração inválida – {e}");
        }
        return ExitCode::FAILURE;
    }

    let shared = match build_shared(&config, &config_path) {
        Ok(shared) => Arc::new(shared),
        Err(e) => {
            error!("Falha ao inicializar: {e}");
            return ExitCode::FAILURE;
        }
    };

    match args.command {
        Command::Run => run(shared),
        command => run_command(&shared, command),
    }
}

fn build_shared(config: &AppConfig, config_path: &Path) -> Result<Shared, TranslatorError> {
    let builder = PacketBuilder::new(config.mac_prefix()?);
    let broadcaster = UdpBroadcaster::new(config.bind_ip()?);
    let ops = SensorOperations::new(HttpDocumentFetcher::new()?, broadcaster, builder);

    let state_path = config.state_path(config_path);
    let mut snapshot = StateSnapshot::load(&state_path);
    snapshot.retain_configured(&config.sensors);

    Ok(Shared {
        ops,
        sensors: config.sensors.clone(),
        snapshot: Mutex::new(snapshot),
        state_path,
    })
}

// ──────────────────────────────────────────────
// Modo agendado
// ──────────────────────────────────────────────

fn run(shared: Arc<Shared>) -> ExitCode {
    // ── Banner ──
    println!();
    println!("══════════════════════════════════════════════");
    println!("   🌡 VENSTAR BRIDGE – ATIVO");
    println!("══════════════════════════════════════════════");
    println!("  Destino:   255.255.255.255:{BROADCAST_PORT} ({REPEAT_COUNT}x)");
    println!("  MAC:       {}xx", shared.ops.builder().mac_prefix());
    println!("  Estado:    {}", shared.state_path.display());
    for sensor in &shared.sensors {
        let status = if sensor.enabled {
            format!("a cada {}s", cadence(sensor.purpose).as_secs())
        } else {
            "desabilitado".into()
        };
        println!(
            "  #{:<2} {:<14} {:<7} °{}  {status}",
            sensor.id, sensor.name, sensor.purpose, sensor.scale
        );
    }
    println!("══════════════════════════════════════════════");
    println!();

    let mut scheduler = ThreadScheduler::new(Arc::clone(&shared));
    sync_jobs(&mut scheduler, &shared.sensors);

    if scheduler.job_count() == 0 {
        warn!("Nenhum sensor habilitado em config.toml; nada a fazer");
        return ExitCode::SUCCESS;
    }
    info!("{} jobs ativos", scheduler.job_count());
    scheduler.wait();
    ExitCode::SUCCESS
}

// ──────────────────────────────────────────────
// Comandos avulsos
// ──────────────────────────────────────────────

fn run_command(shared: &Shared, command: Command) -> ExitCode {
    let id = match command {
        Command::Pair(id) | Command::Resend(id) | Command::Latest(id) => id,
        Command::Run => return ExitCode::SUCCESS,
    };
    let Some(config) = shared.sensor_config(id) else {
        error!("Sensor #{id} não está configurado");
        return ExitCode::FAILURE;
    };
    let mut sensor = shared.load_sensor(config);

    let result = match command {
        Command::Pair(_) if !sensor.config.enabled => Err(TranslatorError::Configuration(
            "Cannot send a pairing packet for a disabled sensor. Enable it first.".into(),
        )),
        Command::Pair(_) => shared.ops.send_pairing_packet(&mut sensor).map(|()| {
            shared.persist(&sensor);
            format!("Pacote de pareamento do sensor #{id} enviado")
        }),
        Command::Resend(_) => shared
            .ops
            .resend_last_packet(&sensor)
            .map(|()| format!("Último pacote do sensor #{id} reenviado")),
        Command::Latest(_) => shared
            .ops
            .latest_reading(&sensor)
            .map(|reading| format!("Sensor #{id} ({}): {reading}", sensor.name())),
        Command::Run => return ExitCode::SUCCESS,
    };

    match result {
        Ok(message) => {
            println!("{message}");
            ExitCode::SUCCESS
        }
        Err(e) => {
            if e.is_categorized() {
                error!("Sensor #{id}: {e}");
            } else {
                error!("Sensor #{id}: {e:?}");
            }
            eprintln!("{}", e.display_message());
            ExitCode::FAILURE
        }
    }
}
