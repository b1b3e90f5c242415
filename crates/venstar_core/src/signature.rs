//! Chave de assinatura por sensor.
//!
//! `chave = base64(SHA-256(mac))`. Pacotes de pareamento levam a chave em
//! claro; pacotes de dados levam `base64(HMAC-SHA256(chave_bruta, INFO))`.

use base64::{Engine, engine::general_purpose::STANDARD};
use hmac::{Hmac, Mac};
use sha2::{Digest, Sha256};

type HmacSha256 = Hmac<Sha256>;

/// Chave derivada do MAC sintetizado de um sensor.
#[derive(Clone, PartialEq, Eq)]
pub struct SignatureKey {
    digest: [u8; 32],
}

impl SignatureKey {
    pub fn from_mac(mac: &str) -> Self {
        Self {
            digest: Sha256::digest(mac.as_bytes()).into(),
        }
    }

    /// Forma base64, usada como assinatura do pacote de pareamento.
    pub fn encoded(&self) -> String {
        STANDARD.encode(self.digest)
    }

    /// Assina o bloco INFO serializado.
    pub fn sign(&self, data: &[u8]) -> String {
        let mut mac = <HmacSha256 as Mac>::new_from_slice(&self.digest)
            .expect("HMAC aceita chaves de qualquer tamanho");
        mac.update(data);
        STANDARD.encode(mac.finalize().into_bytes())
    }
}

impl std::fmt::Debug for SignatureKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("SignatureKey(..)")
    }
}
