//! Shared primitives used across the relay workspace: epoch time helpers,
//! opaque hashing, and environment-driven configuration parsing.

pub mod env;
pub mod hash;
pub mod time;

pub use env::{env_bool, env_f64, env_string_set, env_u64};
pub use hash::opaque_hash;
pub use time::now_epoch_secs;
