//! Anthropic Messages API provider.
//!
//! # Example
//!
//! ```rust,no_run
//! use scripto_core::AiProvider;
//! use scripto_inference::anthropic::AnthropicBackend;
//!
//! #[tokio::main]
//! async fn main() {
//!     let backend = AnthropicBackend::from_env().unwrap();
//!     let solution = backend
//!         .solve_stem_problem("Solve 2x + 3 = 7", "algebra")
//!         .await
//!         .unwrap();
//!     println!("{}", solution.solution);
//! }
//! ```

mod backend;
mod error;
mod types;

pub use backend::AnthropicBackend;
pub use error::{to_scripto_error, AnthropicErrorCode};
pub use types::*;
