/// Basic application code
pub mod app;
/// Cache storage backends
pub mod cache;
/// REST clients for outside services
pub mod client;
/// Controllers for REST endpoints
pub mod controller;
/// Cryptography-related objects
pub mod crypto;
/// Domain objects
pub mod domain;
/// REST error mapping
pub mod error;
/// Mail worker
pub mod mailer;
/// Notification job queues
pub mod queue;
/// Repositories
pub mod repo;
/// Periodic weather broadcasts
pub mod scheduler;
/// Business logic
pub mod service;
/// Application settings
pub mod settings;
/// Application telemetry for tracing and logging
pub mod telemetry;
/// Weather resolution
pub mod weather;
