mod health_check;
mod helpers;
mod subscriptions;
mod weather;
