//! # Observability
//!
//! Process-wide logging setup. Request and response logging is done by the
//! `TraceLayer` in the HTTP stack; everything else uses `tracing` macros
//! with structured fields.

pub mod logging;

pub use logging::init_logging;
