//! # Configuration Module
//!
//! Centralizes the queue's configuration constants. Values that constrain
//! each other live side by side so a change to one is visible next to the
//! others it affects.
//!
//! - [`constants`]: numeric limits, defaults, and on-disk layout sizes

pub mod constants;
pub use constants::*;
