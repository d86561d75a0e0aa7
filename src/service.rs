mod subscriptions;

pub use subscriptions::{BroadcastSummary, SubscriptionError, SubscriptionService};
