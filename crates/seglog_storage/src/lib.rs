//! # SegLog Storage
//!
//! The two files behind every SegLog segment.
//!
//! This crate knows byte layouts and nothing else: it does not assign
//! offsets, decode records or decide when a segment is full.
//!
//! ## Files
//!
//! - [`Store`] - append-only `[8-byte BE length][payload]` entries,
//!   addressed by byte position
//! - [`Index`] - fixed 12-byte `[relative offset][position]` entries in a
//!   pre-sized memory mapping, addressed by entry number
//!
//! ## Example
//!
//! ```no_run
//! use seglog_storage::{Index, Store};
//! use std::path::Path;
//!
//! let store = Store::open(Path::new("0.store")).unwrap();
//! let index = Index::open(Path::new("0.index"), 1024).unwrap();
//!
//! let (_, pos) = store.append(b"hello world").unwrap();
//! index.write(0, pos).unwrap();
//!
//! let entry = index.read(-1).unwrap();
//! assert_eq!(store.read(entry.position).unwrap(), b"hello world");
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod error;
mod index;
mod region;
mod store;

pub use error::{StorageError, StorageResult};
pub use index::{Index, IndexEntry, ENTRY_WIDTH, OFFSET_WIDTH, POSITION_WIDTH};
pub use region::MappedRegion;
pub use store::{Store, LEN_WIDTH};
