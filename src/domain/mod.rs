// Domain layer - Pure data types, no I/O
pub mod device;
pub mod timestamp;
