//! Shared test utilities for trackd.
//!
//! - [`mod@must`]: unwrap helpers with `#[track_caller]`
//! - [`assertions`]: float and pose assertions
//! - [`fixtures`]: wire encoders for the supported protocols, written
//!   independently of the decoders they exercise
//! - [`prelude`]: convenience re-exports
//!
//! ```rust,ignore
//! use trackd_test_helpers::prelude::*;
//! ```

#![deny(unsafe_op_in_unsafe_fn)]
#![allow(clippy::unwrap_used, clippy::panic)]

pub mod assertions;
pub mod fixtures;
pub mod must;
pub mod prelude;

pub use must::*;
