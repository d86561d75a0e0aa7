mod memory;
mod subscriptions;

pub use memory::InMemorySubscriptionRepo;
pub use subscriptions::{is_unique_violation, PgSubscriptionRepo, SubscriptionRepo};
