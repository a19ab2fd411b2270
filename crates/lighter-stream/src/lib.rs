/*
[INPUT]:  Public API exports for lighter-stream crate
[OUTPUT]: Module declarations and public re-exports
[POS]:    Crate root - library entry point
[UPDATE]: When adding new modules or public exports
*/

pub mod book;
pub mod config;
pub mod runner;

// Re-export main types for convenience
pub use book::{LocalBook, Quote};
pub use config::{AccountStreamConfig, ReconnectConfig, StreamConfig};
pub use runner::{Books, FeedRunner};
