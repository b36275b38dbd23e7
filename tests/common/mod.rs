//! Common test infrastructure
//!
//! This module provides all the infrastructure needed for end-to-end tests.
//! Tests should only import from this module, not from internal submodules.
//!
//! # Example
//!
//! ```no_run
//! mod common;
//! use common::{movie, TestMirror, MOVIE_1_ID};
//!
//! #[test]
//! fn test_movie_is_mirrored() {
//!     let mirror = TestMirror::new();
//!     mirror.upsert(&movie(MOVIE_1_ID, "Heat", "1", &["Drama"]));
//!     assert_eq!(mirror.count("movie"), 1);
//! }
//! ```

mod constants;
mod fixtures;
mod mirror;

// Public API - this is what tests import
#[allow(unused_imports)]
pub use constants::*;
#[allow(unused_imports)]
pub use fixtures::*;
pub use mirror::TestMirror;
