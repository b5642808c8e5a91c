//! Shared infrastructure utilities for Kjeller.
//!
//! - **`atomic_write`**: Crash-safe file export (temp + rename)

mod atomic_write;

pub use atomic_write::atomic_write;
