//! Metadata sanitizer and leak detector.
//!
//! Classifies each field of caller-supplied metadata by sensitivity,
//! removes/obfuscates/quantizes accordingly, and separately flags
//! leak-prone patterns across identity, location, device, network,
//! behavioral, and temporal dimensions. Both halves feed their reports
//! back into the pipeline's risk adjustment step.

mod config;
mod error;
mod field_class;
mod leak;
mod sanitize;
mod value;

pub use config::SanitizerConfig;
pub use error::SanitizeError;
pub use field_class::FieldClass;
pub use leak::{LeakDetector, LeakReport, LeakType};
pub use sanitize::{sanitize, SanitizeReport};
pub use value::{Metadata, MetadataValue};
