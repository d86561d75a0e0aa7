mod claims;
mod signing_key;
mod token;

pub use claims::SubscriptionClaims;
pub use signing_key::SigningKey;
pub use token::{Token, TokenError, TokenResult};
