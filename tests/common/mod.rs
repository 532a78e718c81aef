//! Common test infrastructure
//!
//! Builds throwaway encrypted libraries and music folders for the
//! end-to-end tests. Tests should only import from this module.
//!
//! # Example
//!
//! ```no_run
//! mod common;
//! use common::{TestLibrary, TRACK_1_ID};
//!
//! #[test]
//! fn test_something() {
//!     let library = TestLibrary::with_tracks();
//!     let db = library.manager();
//!     db.connect().unwrap();
//! }
//! ```

mod constants;
mod fixtures;
mod tags;

pub use constants::*;
pub use fixtures::TestLibrary;
pub use tags::{tag_map, FakeTagReader};
