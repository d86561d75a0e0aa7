use anyhow::ensure;

use hmac::{Hmac, Mac};

use sha2::Sha256;

use secrecy::{ExposeSecret, Secret};

type HmacSha256 = Hmac<Sha256>;

/// HMAC key for subscription tokens.
///
/// The key never shows up in `Debug` output, so settings and services holding
/// it can be logged freely.
#[derive(Clone)]
pub struct SigningKey(HmacSha256);

impl SigningKey {
    pub fn new(secret: &Secret<String>) -> anyhow::Result<Self> {
        let secret = secret.expose_secret();
        ensure!(!secret.trim().is_empty(), "Signing secret cannot be blank");

        Ok(Self(HmacSha256::new_from_slice(secret.as_bytes())?))
    }
}

impl AsRef<HmacSha256> for SigningKey {
    fn as_ref(&self) -> &HmacSha256 {
        &self.0
    }
}

impl std::fmt::Debug for SigningKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("SigningKey([REDACTED])")
    }
}
