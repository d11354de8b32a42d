//! Building blocks shared by every resource kind: errors, configuration,
//! quantity parsing, name validation, reference resolution and response
//! projection.

pub mod attachment;
pub mod config;
pub mod error;
pub mod projection;
pub mod quantity;
pub mod validation;
