// Infrastructure layer - External dependencies and adapters
pub mod config;
pub mod credentials;
pub mod firestore_repository;
pub mod firestore_value;
pub mod realtime_repository;
pub mod tracing_init;
