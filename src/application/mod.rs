// Application layer - Use cases over the store traits
pub mod clock;
pub mod device_store;
pub mod device_sync_service;
pub mod discovery_service;
pub mod scheduler;
pub mod sync_error;
pub mod sync_orchestrator;

#[cfg(test)]
pub mod testing;
