// Process-level I/O: single-instance locking and Unix signal handling
pub mod lock; // Lock file in the data directory
pub mod signals; // Unix signal handling
