//! Erro agregado do pipeline.
//!
//! Cada etapa tem seu próprio enum; [`TranslatorError`] junta todos e
//! expõe um [`ErrorKind`] para o chamador decidir sem comparar strings.
//! Erros categorizados carregam uma mensagem estável para o usuário;
//! falhas de transporte não reconhecidas passam adiante sem embrulho.

use crate::extractor::ExtractionError;
use crate::fetcher::FetchError;
use crate::temperature::RangeError;

/// Mensagem genérica para erros que não devem vazar detalhes internos.
pub const GENERIC_FAILURE_MESSAGE: &str =
    "An unexpected error occurred while broadcasting. Check the logs for details.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Configuration,
    Fetch,
    Extraction,
    Range,
    Resend,
    Transport,
}

#[derive(Debug, thiserror::Error)]
pub enum TranslatorError {
    /// Definição de sensor malformada
    #[error("{0}")]
    Configuration(String),

    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Extraction(#[from] ExtractionError),

    #[error(transparent)]
    Range(#[from] RangeError),

    #[error("No packet available to resend. The sensor has not broadcast any data packets yet.")]
    NothingToResend,

    /// Falha HTTP sem categoria conhecida
    #[error(transparent)]
    Http(#[from] reqwest::Error),

    /// Falha no socket UDP
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl TranslatorError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            TranslatorError::Configuration(_) => ErrorKind::Configuration,
            TranslatorError::Fetch(_) => ErrorKind::Fetch,
            TranslatorError::Extraction(_) => ErrorKind::Extraction,
            TranslatorError::Range(_) => ErrorKind::Range,
            TranslatorError::NothingToResend => ErrorKind::Resend,
            TranslatorError::Http(_) | TranslatorError::Io(_) => ErrorKind::Transport,
        }
    }

    pub fn is_categorized(&self) -> bool {
        self.kind() != ErrorKind::Transport
    }

    /// Mensagem para exibir ao usuário; `None` para falhas não categorizadas.
    pub fn user_message(&self) -> Option<String> {
        self.is_categorized().then(|| self.to_string())
    }

    /// Mensagem segura para qualquer erro.
    pub fn display_message(&self) -> String {
        self.user_message()
            .unwrap_or_else(|| GENERIC_FAILURE_MESSAGE.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::TemperatureScale;

    #[test]
    fn categorized_errors_expose_their_message() {
        let err = TranslatorError::from(FetchError::NotFound);
        assert_eq!(err.kind(), ErrorKind::Fetch);
        assert!(err.user_message().unwrap().contains("Not Found (HTTP 404)"));

        let err = TranslatorError::from(ExtractionError::NothingFound);
        assert_eq!(err.kind(), ErrorKind::Extraction);
        assert!(err.is_categorized());

        let err = TranslatorError::from(RangeError {
            reading: 200.0,
            scale: TemperatureScale::F,
            celsius: 93.5,
        });
        assert_eq!(err.kind(), ErrorKind::Range);
        assert!(err.user_message().is_some());
    }

    #[test]
    fn transport_errors_stay_generic_for_users() {
        let err = TranslatorError::from(std::io::Error::other("raw socket detail"));
        assert_eq!(err.kind(), ErrorKind::Transport);
        assert!(err.user_message().is_none());
        assert_eq!(err.display_message(), GENERIC_FAILURE_MESSAGE);
        assert!(err.to_string().contains("raw socket detail"));
    }

    #[test]
    fn nothing_to_resend_is_categorized() {
        let err = TranslatorError::NothingToResend;
        assert_eq!(err.kind(), ErrorKind::Resend);
        assert!(err.display_message().contains("No packet available to resend"));
    }
}
