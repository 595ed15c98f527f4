//! HTTP handlers for scripto-api.

pub mod ai;
pub mod health;
