//! # SegLog Core
//!
//! Segments of the SegLog commit log.
//!
//! This crate provides:
//! - [`Record`] - the protobuf-encoded unit of the log
//! - [`Segment`] - offset assignment, lookup, recovery and capacity signals
//!   over one store and one index
//! - [`SharedSegment`] - a segment behind an explicit lock for multiple
//!   writers
//! - [`Config`] - the limits a segment is opened with
//!
//! Choosing which segment serves an offset, rolling over and deleting old
//! segments is left to the log manager built on top.

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod config;
mod error;
mod offset;
mod record;
mod segment;
mod shared;

pub use config::{Config, SegmentConfig};
pub use error::{CoreError, CoreResult};
pub use offset::{
    index_file_name, nearest_multiple, parse_base_offset, relative_offset, store_file_name,
    INDEX_EXTENSION, STORE_EXTENSION,
};
pub use record::Record;
pub use segment::Segment;
pub use shared::SharedSegment;
