//! # scripto-core
//!
//! Core types, traits, and abstractions for the ScriptO AI pipeline.
//!
//! Every other scripto crate depends on the data model, error type and
//! trait seams defined here.

pub mod defaults;
pub mod error;
pub mod models;
pub mod traits;
pub mod uuid_utils;

pub use error::{Error, Result};
pub use models::*;
pub use traits::*;
pub use uuid_utils::{extract_timestamp, new_v7};
