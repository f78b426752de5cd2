//! # SegLog Testkit
//!
//! Test utilities for SegLog.
//!
//! This crate provides:
//! - Temporary segment fixtures and a test tracing subscriber
//! - Property-based test generators using proptest
//! - On-disk format vectors
//! - Stress testing utilities
//!
//! ## Usage
//!
//! ```rust
//! use seglog_testkit::prelude::*;
//! use seglog_core::Record;
//!
//! let mut segment = TestSegment::with_base_offset(16);
//! assert_eq!(segment.append(Record::new(HELLO_WORLD.to_vec())).unwrap(), 16);
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod fixtures;
pub mod generators;
pub mod stress;
pub mod vectors;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::fixtures::*;
    pub use crate::generators::*;
    pub use crate::stress::*;
    pub use crate::vectors::*;
}

pub use fixtures::*;
pub use generators::*;
pub use stress::*;
pub use vectors::*;
