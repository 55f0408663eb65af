//! # usnjrnl-rs
//!
//! A Rust library for decoding raw NTFS USN change journal streams (`$UsnJrnl:$J`)
//! that have already been extracted from a volume image by a forensic tool.
//!
//! The stream is walked once, forward only. Zero-filled gaps between records are
//! skipped, every record is decoded into display-ready fields and malformed
//! records are reported without stopping the pass.
//!
//! ## Features
//! - Scan a journal stream as a Rust iterator of raw or decoded records
//! - Resolve reason, source info and file attribute masks to text
//! - Convert record timestamps to calendar dates
//! - Write records as CSV, TSV or console rows
//!
//! ## Example: Decode a journal stream
//! ```no_run
//! use std::fs::File;
//! use usnjrnl_rs::scanner::JournalScanner;
//!
//! let file = File::open("UsnJrnl_J.bin").unwrap();
//! for result in JournalScanner::new(file).decoded().take(10) {
//!     match result {
//!         Ok(record) => println!("{} {} {}", record.timestamp, record.filename, record.reason),
//!         Err(e) => eprintln!("Error decoding record: {}", e),
//!     }
//! }
//! ```
//!
//! ## License
//! MIT License.

pub mod errors;
pub mod flags;
pub mod output;
pub mod preprocess;
pub mod record;
pub mod scanner;
pub mod time;

// Re-export commonly used types
pub use errors::UsnJrnlError;
pub use record::{DecodedRecord, RawRecord, RecordHeader};
pub use scanner::{JournalScanner, ScanOptions};

/// A convenient type alias for Results with UsnJrnlError.
pub type UsnJrnlResult<T> = std::result::Result<T, UsnJrnlError>;


pub(crate) const DEFAULT_BUFFER_SIZE: usize = 64 * 1024; // 64KB

/// Bytes examined at the scan cursor. Zero gaps wider than this end the pass.
pub const DEFAULT_LOOKAHEAD: usize = 800;
