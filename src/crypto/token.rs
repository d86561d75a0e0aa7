use std::fmt;
use std::str::FromStr;

use hmac::Mac;

use serde::{de::DeserializeOwned, Serialize};

use base64::{
    alphabet,
    engine::{self, general_purpose},
    Engine as _,
};
use regex::Regex;

lazy_static::lazy_static! {
    // Base64 deserialization engine
    static ref BASE64_ENGINE: engine::GeneralPurpose =
        engine::GeneralPurpose::new(&alphabet::URL_SAFE, general_purpose::NO_PAD);
    // Regex for checking token strings
    static ref TOKEN_REGEX: Regex = Regex::new(r"^([\w-]+)\.([\w-]+)$").unwrap();
}

/// Various errors that can occur when handling tokens
#[derive(Debug, thiserror::Error)]
pub enum TokenError {
    #[error("Token signature does not match")]
    SignatureMismatch,
    #[error("Token is of invalid format")]
    InvalidFormat,
    #[error("Serialization error")]
    Serde(#[from] serde_json::Error),
    #[error("Decode error")]
    DecodeError(#[from] base64::DecodeError),
}

/// Wrapper for token results
pub type TokenResult<T> = Result<T, TokenError>;

/// A serialized, cryptographically-signed token.
///
/// Format: `base64(json payload).base64(hmac signature)`, both URL-safe so the
/// token can be used as a path segment.
#[derive(Debug, Clone, PartialEq)]
pub struct Token(String);

impl Token {
    /// Sign a serializable payload with the specified key
    pub fn sign<T, K>(payload: &T, key: &K) -> TokenResult<Self>
    where
        T: Serialize,
        K: Mac + Clone,
    {
        let msg = serde_json::to_vec(payload)?;
        let sig = key.clone().chain_update(&msg).finalize().into_bytes();

        let token = format!("{}.{}", BASE64_ENGINE.encode(msg), BASE64_ENGINE.encode(sig));
        Ok(Self(token))
    }

    /// Verify the token and deconstruct into the encoded payload value
    pub fn verify<T, K>(&self, key: &K) -> TokenResult<T>
    where
        T: DeserializeOwned,
        K: Mac + Clone,
    {
        let (msg, sig) = self.split().ok_or(TokenError::InvalidFormat)?;
        let msg = BASE64_ENGINE.decode(msg)?;
        let sig = BASE64_ENGINE.decode(sig)?;
        // Constant-time comparison of the signature
        key.clone()
            .chain_update(&msg)
            .verify_slice(&sig)
            .map_err(|_| TokenError::SignatureMismatch)?;

        Ok(serde_json::from_slice(&msg)?)
    }

    fn split(&self) -> Option<(&str, &str)> {
        let captures = TOKEN_REGEX.captures(&self.0)?;

        let msg = captures.get(1)?.as_str();
        let sig = captures.get(2)?.as_str();
        Some((msg, sig))
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for Token {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl From<Token> for String {
    fn from(value: Token) -> String {
        value.0
    }
}

impl FromStr for Token {
    type Err = TokenError;

    fn from_str(token: &str) -> TokenResult<Self> {
        if !TOKEN_REGEX.is_match(token) {
            Err(TokenError::InvalidFormat)
        } else {
            Ok(Self(token.to_string()))
        }
    }
}
