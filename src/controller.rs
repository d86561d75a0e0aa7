pub mod subscriptions;
pub mod weather;
