//! Busca do documento HTTP com a leitura.
//!
//! GET com timeout de 10 s. Falhas conhecidas viram um [`FetchError`] com
//! mensagem pronta para o usuário:
//!
//! | Origem                                   | Categoria                 |
//! |------------------------------------------|---------------------------|
//! | timeout do cliente                       | `Timeout`                 |
//! | recusada / reset / abortada / timeout TCP| uma variante por condição |
//! | rede ou host inalcançável, DNS           | uma variante por condição |
//! | certificado TLS                          | `Certificate`             |
//! | HTTP 400/401/403/404/405/500/502/503     | uma variante por código   |
//! | resposta que não é HTTP                  | `InvalidResponse`         |
//!
//! Qualquer outra falha do transporte segue intacta como
//! [`TranslatorError::Http`] para não perder o diagnóstico.

use crate::error::TranslatorError;
use crate::types::HttpHeader;
use reqwest::blocking::Client;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use std::error::Error as StdError;
use std::io;
use std::time::Duration;
use tracing::debug;

/// Timeout total de cada busca.
pub const FETCH_TIMEOUT: Duration = Duration::from_secs(10);

/// Falhas de busca com mensagem estável para o usuário.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum FetchError {
    #[error("Request timed out after 10 seconds. The server took too long to respond.")]
    Timeout,

    #[error(
        "Connection refused. The server is not accepting connections. Check that the URL is correct and the server is running."
    )]
    ConnectionRefused,

    #[error(
        "Connection reset by peer. The server closed the connection unexpectedly. It may have crashed or restarted."
    )]
    ConnectionReset,

    #[error(
        "Connection aborted. The connection was terminated locally. Check for firewalls or security software interfering with the request."
    )]
    ConnectionAborted,

    #[error(
        "Connection timed out. The server did not respond within the expected time. Check that the host is online."
    )]
    ConnectionTimedOut,

    #[error(
        "Network unreachable. The network is down or unavailable. Check this machine's network connection."
    )]
    NetworkUnreachable,

    #[error(
        "Host unreachable. There is no network route to the specified host. Check the IP address or hostname."
    )]
    HostUnreachable,

    #[error("Host not found. The hostname could not be resolved. Check the URL for typos.")]
    HostNotFound,

    #[error(
        "SSL certificate validation failed. The server may be using a self-signed certificate. Enable 'Ignore SSL Errors' for this sensor if you trust the server."
    )]
    Certificate,

    #[error("Bad Request (HTTP 400). The server rejected the request. Check the URL and headers.")]
    BadRequest,

    #[error(
        "Unauthorized (HTTP 401). Authentication failed. Check the credentials in the custom headers."
    )]
    Unauthorized,

    #[error(
        "Forbidden (HTTP 403). Access denied. The credentials do not grant access to this resource."
    )]
    Forbidden,

    #[error("Not Found (HTTP 404). The URL does not exist on the server. Check the path.")]
    NotFound,

    #[error("Method Not Allowed (HTTP 405). The endpoint does not accept GET requests.")]
    MethodNotAllowed,

    #[error(
        "Internal Server Error (HTTP 500). The server encountered an error while handling the request."
    )]
    InternalServerError,

    #[error(
        "Bad Gateway (HTTP 502). The server received an invalid response from an upstream server."
    )]
    BadGateway,

    #[error(
        "Service Unavailable (HTTP 503). The server is temporarily unavailable. Try again later."
    )]
    ServiceUnavailable,

    #[error(
        "The server returned an invalid HTTP response. The URL might not be an HTTP/HTTPS endpoint."
    )]
    InvalidResponse,
}

impl FetchError {
    /// Categoria para um status HTTP, se houver mensagem própria.
    pub fn from_status(code: u16) -> Option<Self> {
        let err = match code {
            400 => FetchError::BadRequest,
            401 => FetchError::Unauthorized,
            403 => FetchError::Forbidden,
            404 => FetchError::NotFound,
            405 => FetchError::MethodNotAllowed,
            500 => FetchError::InternalServerError,
            502 => FetchError::BadGateway,
            503 => FetchError::ServiceUnavailable,
            _ => return None,
        };
        Some(err)
    }

    fn from_io_kind(kind: io::ErrorKind) -> Option<Self> {
        let err = match kind {
            io::ErrorKind::ConnectionRefused => FetchError::ConnectionRefused,
            io::ErrorKind::ConnectionReset => FetchError::ConnectionReset,
            io::ErrorKind::ConnectionAborted => FetchError::ConnectionAborted,
            io::ErrorKind::TimedOut => FetchError::ConnectionTimedOut,
            io::ErrorKind::NetworkUnreachable => FetchError::NetworkUnreachable,
            io::ErrorKind::HostUnreachable => FetchError::HostUnreachable,
            // Corpo cortado antes do Content-Length
            io::ErrorKind::UnexpectedEof => FetchError::InvalidResponse,
            _ => return None,
        };
        Some(err)
    }
}

// ──────────────────────────────────────────────
// Classificação
// ──────────────────────────────────────────────

/// Trechos de mensagem (minúsculos) que identificam cada categoria quando
/// a cadeia de erros não traz um `io::Error` com `kind` útil.
const MESSAGE_PATTERNS: &[(&str, FetchError)] = &[
    // rustls recebendo HTTP puro numa URL https
    ("corrupt message", FetchError::InvalidResponse),
    ("invalidcontenttype", FetchError::InvalidResponse),
    ("invalidmessage", FetchError::InvalidResponse),
    ("certificate", FetchError::Certificate),
    ("ssl", FetchError::Certificate),
    ("tls", FetchError::Certificate),
    ("dns error", FetchError::HostNotFound),
    ("failed to lookup address", FetchError::HostNotFound),
    ("name or service not known", FetchError::HostNotFound),
    ("no such host", FetchError::HostNotFound),
    ("invalid http", FetchError::InvalidResponse),
    ("ended prematurely", FetchError::InvalidResponse),
    ("unexpected end", FetchError::InvalidResponse),
    ("incomplete message", FetchError::InvalidResponse),
    ("end of file before message length reached", FetchError::InvalidResponse),
    ("connection closed before message completed", FetchError::InvalidResponse),
    ("connection refused", FetchError::ConnectionRefused),
    ("connection reset", FetchError::ConnectionReset),
];

/// Categoriza uma falha do `reqwest`. `None` = falha desconhecida.
pub fn categorize(err: &reqwest::Error) -> Option<FetchError> {
    if err.is_timeout() {
        return Some(FetchError::Timeout);
    }
    if let Some(err) = err.status().and_then(|s| FetchError::from_status(s.as_u16())) {
        return Some(err);
    }
    // A mensagem do próprio reqwest inclui a URL; só as causas são inspecionadas.
    err.source().and_then(categorize_source)
}

/// Percorre a cadeia de causas procurando uma condição conhecida.
pub fn categorize_source(err: &(dyn StdError + 'static)) -> Option<FetchError> {
    let mut messages = Vec::new();
    let mut current = Some(err);
    while let Some(e) = current {
        if let Some(io_err) = e.downcast_ref::<io::Error>() {
            if let Some(found) = categorize_io(io_err) {
                return Some(found);
            }
        }
        messages.push(e.to_string().to_lowercase());
        current = e.source();
    }

    MESSAGE_PATTERNS
        .iter()
        .find(|(pattern, _)| messages.iter().any(|m| m.contains(pattern)))
        .map(|(_, err)| *err)
}

fn categorize_io(err: &io::Error) -> Option<FetchError> {
    FetchError::from_io_kind(err.kind()).or_else(|| {
        // `io::Error::source` pula o erro embrulhado; desce por `get_ref`.
        err.get_ref()
            .and_then(|inner| categorize_source(inner as &(dyn StdError + 'static)))
    })
}

fn classify(err: reqwest::Error) -> TranslatorError {
    match categorize(&err) {
        Some(known) => known.into(),
        None => TranslatorError::Http(err),
    }
}

// ──────────────────────────────────────────────
// Fetcher
// ──────────────────────────────────────────────

/// Fonte de documentos. Separada em trait para os testes do orquestrador.
pub trait DocumentFetcher {
    fn fetch_document(
        &self,
        url: &str,
        ignore_ssl_errors: bool,
        headers: &[HttpHeader],
    ) -> Result<String, TranslatorError>;
}

/// Fetcher HTTP bloqueante.
pub struct HttpDocumentFetcher {
    strict: Client,
    /// Aceita qualquer certificado
    lenient: Client,
}

impl HttpDocumentFetcher {
    pub fn new() -> Result<Self, TranslatorError> {
        Self::build(FETCH_TIMEOUT, true)
    }

    fn build(timeout: Duration, system_proxy: bool) -> Result<Self, TranslatorError> {
        let builder = || {
            let builder = Client::builder().timeout(timeout);
            if system_proxy { builder } else { builder.no_proxy() }
        };
        Ok(Self {
            strict: builder().build()?,
            lenient: builder().danger_accept_invalid_certs(true).build()?,
        })
    }
}

impl DocumentFetcher for HttpDocumentFetcher {
    fn fetch_document(
        &self,
        url: &str,
        ignore_ssl_errors: bool,
        headers: &[HttpHeader],
    ) -> Result<String, TranslatorError> {
        let url = reqwest::Url::parse(url).map_err(|_| {
            TranslatorError::Configuration("The URL must be a properly formed absolute URL.".into())
        })?;
        let client = if ignore_ssl_errors {
            &self.lenient
        } else {
            &self.strict
        };

        debug!("GET {url} (ignorar TLS: {ignore_ssl_errors}, {} headers)", headers.len());
        let response = client
            .get(url)
            .headers(header_map(headers)?)
            .send()
            .map_err(classify)?;

        if let Some(err) = FetchError::from_status(response.status().as_u16()) {
            return Err(err.into());
        }
        let response = response.error_for_status()?;
        response.text().map_err(classify)
    }
}

fn header_map(headers: &[HttpHeader]) -> Result<HeaderMap, TranslatorError> {
    let mut map = HeaderMap::with_capacity(headers.len());
    for header in headers {
        let name = HeaderName::from_bytes(header.name.trim().as_bytes()).map_err(|_| {
            TranslatorError::Configuration(format!("Invalid HTTP header name '{}'.", header.name))
        })?;
        let value = HeaderValue::from_str(&header.value).map_err(|_| {
            TranslatorError::Configuration(format!(
                "Invalid value for HTTP header '{}'.",
                header.name
            ))
        })?;
        map.append(name, value);
    }
    Ok(map)
}

// ──────────────────────────────────────────────
// Testes
// ──────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use std::fmt;
    use std::io::{Read, Write};
    use std::net::{TcpListener, TcpStream};
    use std::sync::mpsc;
    use std::thread;

    #[derive(Debug)]
    struct Layer {
        message: &'static str,
        source: Option<Box<dyn StdError + Send + Sync>>,
    }

    impl Layer {
        fn new(message: &'static str, source: impl StdError + Send + Sync + 'static) -> Self {
            Self {
                message,
                source: Some(Box::new(source)),
            }
        }

        fn leaf(message: &'static str) -> Self {
            Self {
                message,
                source: None,
            }
        }
    }

    impl fmt::Display for Layer {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str(self.message)
        }
    }

    impl StdError for Layer {
        fn source(&self) -> Option<&(dyn StdError + 'static)> {
            self.source
                .as_deref()
                .map(|e| e as &(dyn StdError + 'static))
        }
    }

    fn fetcher(timeout: Duration) -> HttpDocumentFetcher {
        HttpDocumentFetcher::build(timeout, false).unwrap()
    }

    fn read_request(stream: &mut TcpStream) -> String {
        let mut request = Vec::new();
        let mut buf = [0u8; 1024];
        while !request.windows(4).any(|w| w == b"\r\n\r\n") {
            match stream.read(&mut buf) {
                Ok(0) | Err(_) => break,
                Ok(n) => request.extend_from_slice(&buf[..n]),
            }
        }
        String::from_utf8_lossy(&request).into_owned()
    }

    fn http_response(status: &str, body: &str) -> String {
        format!(
            "HTTP/1.1 {status}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
            body.len()
        )
    }

    /// Servidor de uma única resposta. Devolve a URL e o pedido recebido.
    fn serve_once(response: String) -> (String, mpsc::Receiver<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let url = format!("http://{}/data", listener.local_addr().unwrap());
        let (tx, rx) = mpsc::channel();
        thread::spawn(move || {
            if let Ok((mut stream, _)) = listener.accept() {
                let request = read_request(&mut stream);
                let _ = tx.send(request);
                let _ = stream.write_all(response.as_bytes());
            }
        });
        (url, rx)
    }

    #[test]
    fn successful_request_returns_body() {
        let (url, _) = serve_once(http_response("200 OK", r#"{"temperature": 72.5}"#));
        let body = fetcher(FETCH_TIMEOUT).fetch_document(&url, false, &[]).unwrap();
        assert_eq!(body, r#"{"temperature": 72.5}"#);
    }

    #[test]
    fn custom_headers_are_sent() {
        let (url, request) = serve_once(http_response("200 OK", "{}"));
        let headers = [
            HttpHeader::new("Authorization", "Bearer token123"),
            HttpHeader::new("X-Custom", "custom-value"),
        ];
        fetcher(FETCH_TIMEOUT)
            .fetch_document(&url, false, &headers)
            .unwrap();

        let request = request.recv().unwrap().to_lowercase();
        assert!(request.starts_with("get /data"));
        assert!(request.contains("authorization: bearer token123"));
        assert!(request.contains("x-custom: custom-value"));
    }

    #[test]
    fn known_status_codes_get_their_own_message() {
        let cases = [
            (400, "400 Bad Request", "Bad Request (HTTP 400)", "server rejected the request"),
            (401, "401 Unauthorized", "Unauthorized (HTTP 401)", "Authentication failed"),
            (403, "403 Forbidden", "Forbidden (HTTP 403)", "Access denied"),
            (404, "404 Not Found", "Not Found (HTTP 404)", "URL does not exist"),
            (405, "405 Method Not Allowed", "Method Not Allowed (HTTP 405)", "does not accept GET requests"),
            (500, "500 Internal Server Error", "Internal Server Error (HTTP 500)", "server encountered an error"),
            (502, "502 Bad Gateway", "Bad Gateway (HTTP 502)", "invalid response from an upstream server"),
            (503, "503 Service Unavailable", "Service Unavailable (HTTP 503)", "temporarily unavailable"),
        ];
        for (code, status, phrase, guidance) in cases {
            let (url, _) = serve_once(http_response(status, "Error"));
            let err = fetcher(FETCH_TIMEOUT)
                .fetch_document(&url, false, &[])
                .unwrap_err();
            assert!(
                matches!(err, TranslatorError::Fetch(e) if FetchError::from_status(code) == Some(e)),
                "HTTP {code}: {err:?}"
            );
            let message = err.to_string();
            assert!(message.contains(phrase), "{message}");
            assert!(message.contains(guidance), "{message}");
        }
    }

    #[test]
    fn unlisted_status_is_passed_through() {
        let (url, _) = serve_once(http_response("418 I'm a teapot", "short and stout"));
        let err = fetcher(FETCH_TIMEOUT)
            .fetch_document(&url, false, &[])
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Transport);
        assert!(matches!(err, TranslatorError::Http(ref e) if e.status().map(|s| s.as_u16()) == Some(418)));
    }

    #[test]
    fn refused_connection_is_categorized() {
        let port = {
            let listener = TcpListener::bind("127.0.0.1:0").unwrap();
            listener.local_addr().unwrap().port()
        };
        let err = fetcher(FETCH_TIMEOUT)
            .fetch_document(&format!("http://127.0.0.1:{port}/"), false, &[])
            .unwrap_err();
        assert!(matches!(err, TranslatorError::Fetch(FetchError::ConnectionRefused)), "{err:?}");
        assert!(err.to_string().contains("Connection refused"));
    }

    #[test]
    fn stalled_server_times_out() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let url = format!("http://{}/slow", listener.local_addr().unwrap());
        thread::spawn(move || {
            if let Ok((stream, _)) = listener.accept() {
                thread::sleep(Duration::from_secs(3));
                drop(stream);
            }
        });

        let err = fetcher(Duration::from_millis(300))
            .fetch_document(&url, false, &[])
            .unwrap_err();
        assert!(matches!(err, TranslatorError::Fetch(FetchError::Timeout)), "{err:?}");
        let message = err.to_string();
        assert!(message.contains("timed out after 10 seconds"));
        assert!(message.contains("took too long to respond"));
    }

    #[test]
    fn malformed_url_is_a_configuration_error() {
        let err = fetcher(FETCH_TIMEOUT)
            .fetch_document("not a valid url", false, &[])
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Configuration);
    }

    #[test]
    fn invalid_header_name_is_a_configuration_error() {
        let err = header_map(&[HttpHeader::new("Bad Header", "x")]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Configuration);
    }

    #[test]
    fn socket_conditions_map_one_to_one() {
        let cases = [
            (io::ErrorKind::ConnectionRefused, FetchError::ConnectionRefused),
            (io::ErrorKind::ConnectionReset, FetchError::ConnectionReset),
            (io::ErrorKind::ConnectionAborted, FetchError::ConnectionAborted),
            (io::ErrorKind::TimedOut, FetchError::ConnectionTimedOut),
            (io::ErrorKind::NetworkUnreachable, FetchError::NetworkUnreachable),
            (io::ErrorKind::HostUnreachable, FetchError::HostUnreachable),
        ];
        for (kind, expected) in cases {
            let err = Layer::new("error sending request", io::Error::from(kind));
            assert_eq!(categorize_source(&err), Some(expected), "{kind:?}");
        }
    }

    #[test]
    fn reset_wrapped_in_another_io_error_is_found() {
        let inner = io::Error::from(io::ErrorKind::ConnectionReset);
        let err = Layer::new(
            "An error occurred while sending the request",
            io::Error::other(inner),
        );
        let found = categorize_source(&err).unwrap();
        assert_eq!(found, FetchError::ConnectionReset);
        assert!(found.to_string().contains("Connection reset by peer"));
        assert!(found.to_string().contains("server closed the connection unexpectedly"));
    }

    #[test]
    fn dns_failure_is_host_not_found() {
        let err = Layer::new(
            "dns error",
            io::Error::other("failed to lookup address information: Name or service not known"),
        );
        let found = categorize_source(&err).unwrap();
        assert_eq!(found, FetchError::HostNotFound);
        assert!(found.to_string().contains("hostname could not be resolved"));
    }

    #[test]
    fn certificate_failure_suggests_ignoring_ssl() {
        let err = Layer::new(
            "client error (Connect)",
            Layer::leaf("invalid peer certificate: UnknownIssuer"),
        );
        let found = categorize_source(&err).unwrap();
        assert_eq!(found, FetchError::Certificate);
        assert!(found.to_string().contains("Ignore SSL Errors"));
        assert!(found.to_string().contains("self-signed certificate"));
    }

    /// Servidor que responde sem esperar o fim do pedido (ex: a um ClientHello).
    fn serve_raw(response: &'static [u8]) -> u16 {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        thread::spawn(move || {
            if let Ok((mut stream, _)) = listener.accept() {
                let mut buf = [0u8; 4096];
                let _ = stream.read(&mut buf);
                let _ = stream.write_all(response);
                thread::sleep(Duration::from_millis(200));
            }
        });
        port
    }

    fn assert_invalid_response(err: TranslatorError) {
        assert!(
            matches!(err, TranslatorError::Fetch(FetchError::InvalidResponse)),
            "{err:?}"
        );
        assert!(err.to_string().contains("might not be an HTTP/HTTPS endpoint"));
    }

    #[test]
    fn truncated_body_is_invalid_response() {
        let (url, _) = serve_once(
            "HTTP/1.1 200 OK\r\nContent-Length: 100\r\nConnection: close\r\n\r\n{\"t\":".into(),
        );
        let err = fetcher(FETCH_TIMEOUT)
            .fetch_document(&url, false, &[])
            .unwrap_err();
        assert_invalid_response(err);
    }

    #[test]
    fn garbage_reply_is_invalid_response() {
        let (url, _) = serve_once("SSH-2.0-OpenSSH_9.6\r\n\r\n".into());
        let err = fetcher(FETCH_TIMEOUT)
            .fetch_document(&url, false, &[])
            .unwrap_err();
        assert_invalid_response(err);
    }

    #[test]
    fn https_against_plain_http_port_is_invalid_response() {
        let port = serve_raw(b"HTTP/1.1 400 Bad Request\r\nContent-Length: 0\r\nConnection: close\r\n\r\n");
        let err = fetcher(FETCH_TIMEOUT)
            .fetch_document(&format!("https://127.0.0.1:{port}/"), false, &[])
            .unwrap_err();
        assert_invalid_response(err);
    }

    #[test]
    fn early_eof_in_chain_is_invalid_response() {
        let err = Layer::new(
            "error reading a body from connection",
            io::Error::new(io::ErrorKind::UnexpectedEof, "end of file before message length reached"),
        );
        assert_eq!(categorize_source(&err), Some(FetchError::InvalidResponse));
    }

    #[test]
    fn unknown_socket_errors_are_not_categorized() {
        let err = Layer::new(
            "Unknown socket error",
            io::Error::other("No buffer space available"),
        );
        assert_eq!(categorize_source(&err), None);
    }

    #[test]
    fn every_category_has_a_distinct_message() {
        let all = [
            FetchError::Timeout,
            FetchError::ConnectionRefused,
            FetchError::ConnectionReset,
            FetchError::ConnectionAborted,
            FetchError::ConnectionTimedOut,
            FetchError::NetworkUnreachable,
            FetchError::HostUnreachable,
            FetchError::HostNotFound,
            FetchError::Certificate,
            FetchError::BadRequest,
            FetchError::Unauthorized,
            FetchError::Forbidden,
            FetchError::NotFound,
            FetchError::MethodNotAllowed,
            FetchError::InternalServerError,
            FetchError::BadGateway,
            FetchError::ServiceUnavailable,
            FetchError::InvalidResponse,
        ];
        let messages: std::collections::HashSet<String> =
            all.iter().map(|e| e.to_string()).collect();
        assert_eq!(messages.len(), all.len());
    }
}
