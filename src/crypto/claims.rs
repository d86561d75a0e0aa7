use serde::{Deserialize, Serialize};

use uuid::Uuid;

use super::{SigningKey, Token, TokenResult};

/// Payload of a subscription token: the id of the subscription it was issued for
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SubscriptionClaims {
    sub: Uuid,
}

impl From<Uuid> for SubscriptionClaims {
    fn from(sub: Uuid) -> Self {
        Self { sub }
    }
}

impl From<SubscriptionClaims> for Uuid {
    fn from(value: SubscriptionClaims) -> Uuid {
        value.sub
    }
}

impl SubscriptionClaims {
    pub fn sign(&self, key: &SigningKey) -> TokenResult<Token> {
        Token::sign(self, key.as_ref())
    }

    pub fn verify(key: &SigningKey, token: &str) -> TokenResult<Self> {
        token.parse::<Token>()?.verify(key.as_ref())
    }
}
