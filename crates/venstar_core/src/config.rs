//! Configuração unificada via TOML.
//!
//! Um único `config.toml` com a seção `[translator]` (opções do processo)
//! e uma entrada `[[sensors]]` por sensor lógico.

use crate::error::TranslatorError;
use crate::packet::MacPrefix;
use crate::types::SensorConfig;
use crate::validation::validate_sensors;
use serde::{Deserialize, Serialize};
use std::net::Ipv4Addr;
use std::path::{Path, PathBuf};
use tracing::info;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Erro ao ler {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Erro ao parsear {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
}

/// Opções do processo tradutor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TranslatorConfig {
    /// Prefixo (10 hex) dos MACs sintetizados; vazio = padrão
    pub mac_prefix: String,
    /// IP local para bind do broadcast (vazio = qualquer interface)
    pub bind_ip: String,
    /// Arquivo do estado persistido, relativo ao config.toml
    pub state_file: String,
}

impl Default for TranslatorConfig {
    fn default() -> Self {
        Self {
            mac_prefix: crate::packet::DEFAULT_MAC_PREFIX.into(),
            bind_ip: String::new(),
            state_file: "venstar_state.bin".into(),
        }
    }
}

/// Configuração raiz do aplicativo.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub translator: TranslatorConfig,
    pub sensors: Vec<SensorConfig>,
}

impl AppConfig {
    /// Carrega configuração de um arquivo TOML.
    ///
    /// Arquivo ausente dá a configuração padrão. Arquivo ilegível ou com
    /// TOML inválido é erro: rodar com zero sensores esconderia o problema.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                info!("{} não existe, usando configuração padrão", path.display());
                return Ok(AppConfig::default());
            }
            Err(source) => {
                return Err(ConfigError::Read {
                    path: path.to_path_buf(),
                    source,
                });
            }
        };

        let config: AppConfig = toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        info!(
            "Configuração carregada de {} ({} sensores)",
            path.display(),
            config.sensors.len()
        );
        Ok(config)
    }

    /// Salva configuração em arquivo TOML.
    pub fn save(&self, path: &Path) -> Result<(), String> {
        let content = toml::to_string_pretty(self).map_err(|e| e.to_string())?;
        std::fs::write(path, content).map_err(|e| e.to_string())?;
        info!("Configuração salva em {}", path.display());
        Ok(())
    }

    /// Retorna o caminho padrão do config.toml.
    pub fn default_path() -> PathBuf {
        let exe_dir = std::env::current_exe()
            .map(|p| p.parent().unwrap_or(Path::new(".")).to_path_buf())
            .unwrap_or_else(|_| PathBuf::from("."));
        exe_dir.join("config.toml")
    }

    pub fn mac_prefix(&self) -> Result<MacPrefix, TranslatorError> {
        MacPrefix::parse(&self.translator.mac_prefix)
    }

    pub fn bind_ip(&self) -> Result<Ipv4Addr, TranslatorError> {
        let raw = self.translator.bind_ip.trim();
        if raw.is_empty() {
            return Ok(Ipv4Addr::UNSPECIFIED);
        }
        raw.parse().map_err(|_| {
            TranslatorError::Configuration(format!("Invalid bind IP address '{raw}'."))
        })
    }

    /// Caminho do estado persistido. Relativo ao diretório do config.toml.
    pub fn state_path(&self, config_path: &Path) -> PathBuf {
        let file = Path::new(&self.translator.state_file);
        if file.is_absolute() {
            return file.to_path_buf();
        }
        config_path
            .parent()
            .unwrap_or(Path::new("."))
            .join(file)
    }

    pub fn sensor(&self, id: u8) -> Option<&SensorConfig> {
        self.sensors.iter().find(|s| s.id == id)
    }

    /// Valida a configuração e retorna lista de erros.
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        if let Err(e) = self.mac_prefix() {
            errors.push(format!("translator.mac_prefix: {e}"));
        }
        if let Err(e) = self.bind_ip() {
            errors.push(format!("translator.bind_ip: {e}"));
        }
        if self.translator.state_file.trim().is_empty() {
            errors.push("translator.state_file: O arquivo de estado não pode ser vazio".into());
        }
        errors.extend(validate_sensors(&self.sensors).iter().map(|v| v.to_string()));

        errors
    }
}
