//! Decoding of a single USN_RECORD_V2 style record.
//!
//! A record is a fixed 60-byte little-endian header followed by the file name,
//! stored as UTF-16LE at `filename_offset` for `filename_length` bytes.

use byteorder::{LittleEndian, ReadBytesExt};
use encoding_rs::UTF_16LE;
use log::warn;
use std::io::Cursor;

use crate::flags::{
    FILE_ATTRIBUTE_DIRECTORY, FILE_ATTRIBUTE_FLAGS, FILE_ATTRIBUTE_HIDDEN, REASON_FLAGS,
};
use crate::time::Timestamp;
use crate::{UsnJrnlResult, errors::UsnJrnlError};

/// Size of the fixed part of a record, up to and including `filename_offset`.
pub const FIXED_HEADER_LEN: usize = 60;

/// Column names, in the order [`DecodedRecord::fields`] renders them.
pub const RECORD_COLUMNS: [&str; 13] = [
    "RecordSize",
    "Version",
    "FileReference",
    "ParentFileReference",
    "JournalOffset",
    "Timestamp",
    "Reason",
    "SourceInfo",
    "SecurityId",
    "FileAttributes",
    "FilenameLength",
    "FilenameOffset",
    "Filename",
];

/// Bytes of one candidate record and where the scanner found them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawRecord {
    pub offset: u64,
    pub bytes: Vec<u8>,
}

impl RawRecord {
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// Fixed-layout fields of a record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordHeader {
    pub record_length: u32,
    pub major_version: u16,
    pub minor_version: u16,
    pub file_reference_number: i64,
    pub parent_file_reference_number: i64,
    pub journal_offset: i64,
    pub timestamp_low: u32,
    pub timestamp_high: u32,
    pub reason: u32,
    pub source_info: u32,
    pub security_id: u32,
    pub file_attributes: u32,
    pub filename_length: u16,
    pub filename_offset: u16,
}

impl RecordHeader {
    /// Reads the fixed header from the start of `buf`.
    pub fn parse(buf: &[u8]) -> std::io::Result<Self> {
        let mut c = Cursor::new(buf);
        Ok(RecordHeader {
            record_length: c.read_u32::<LittleEndian>()?,
            major_version: c.read_u16::<LittleEndian>()?,
            minor_version: c.read_u16::<LittleEndian>()?,
            file_reference_number: c.read_i64::<LittleEndian>()?,
            parent_file_reference_number: c.read_i64::<LittleEndian>()?,
            journal_offset: c.read_i64::<LittleEndian>()?,
            timestamp_low: c.read_u32::<LittleEndian>()?,
            timestamp_high: c.read_u32::<LittleEndian>()?,
            reason: c.read_u32::<LittleEndian>()?,
            source_info: c.read_u32::<LittleEndian>()?,
            security_id: c.read_u32::<LittleEndian>()?,
            file_attributes: c.read_u32::<LittleEndian>()?,
            filename_length: c.read_u16::<LittleEndian>()?,
            filename_offset: c.read_u16::<LittleEndian>()?,
        })
    }
}

/// A record with every field converted to its display form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedRecord {
    /// Offset in the scanned stream, not the journal USN.
    pub offset: u64,
    pub header: RecordHeader,
    pub version: String,
    pub timestamp: Timestamp,
    pub reason: String,
    pub source_info: String,
    pub file_attributes: String,
    pub filename: String,
}

impl DecodedRecord {
    /// Returns true if this entry represents a directory.
    pub fn is_dir(&self) -> bool {
        self.header.file_attributes & FILE_ATTRIBUTE_DIRECTORY != 0
    }

    /// Returns true if this entry represents a hidden file or directory.
    pub fn is_hidden(&self) -> bool {
        self.header.file_attributes & FILE_ATTRIBUTE_HIDDEN != 0
    }

    /// Renders the record as the 13 columns named by [`RECORD_COLUMNS`].
    pub fn fields(&self) -> [String; 13] {
        let h = &self.header;
        [
            h.record_length.to_string(),
            self.version.clone(),
            h.file_reference_number.to_string(),
            h.parent_file_reference_number.to_string(),
            h.journal_offset.to_string(),
            self.timestamp.to_string(),
            self.reason.clone(),
            self.source_info.clone(),
            h.security_id.to_string(),
            self.file_attributes.clone(),
            h.filename_length.to_string(),
            h.filename_offset.to_string(),
            self.filename.clone(),
        ]
    }
}

/// Decodes one raw record.
///
/// Fails with [`UsnJrnlError::StructuralParseError`] when the bytes are too
/// short for the fixed header, disagree with the declared record length, or
/// place the file name outside the record.
pub fn decode(raw: &RawRecord) -> UsnJrnlResult<DecodedRecord> {
    let header = RecordHeader::parse(&raw.bytes).map_err(|_| {
        structural_error(
            raw,
            format!(
                "{} bytes is shorter than the {}-byte record header",
                raw.len(),
                FIXED_HEADER_LEN
            ),
        )
    })?;

    if header.record_length as usize != raw.len() {
        return Err(structural_error(
            raw,
            format!(
                "declared record length {} does not match {} bytes read",
                header.record_length,
                raw.len()
            ),
        ));
    }

    let name_start = header.filename_offset as usize;
    let name_end = name_start + header.filename_length as usize;
    if name_start < FIXED_HEADER_LEN || name_end > raw.len() {
        return Err(structural_error(
            raw,
            format!(
                "file name range {}..{} lies outside the {}..{} name area",
                name_start,
                name_end,
                FIXED_HEADER_LEN,
                raw.len()
            ),
        ));
    }

    let filename = decode_filename(&raw.bytes[name_start..name_end]);

    Ok(DecodedRecord {
        offset: raw.offset,
        version: format!("{}.{}", header.major_version, header.minor_version),
        timestamp: Timestamp::from_parts(header.timestamp_low, header.timestamp_high),
        reason: REASON_FLAGS.resolve(header.reason).into_owned(),
        source_info: REASON_FLAGS.resolve(header.source_info).into_owned(),
        file_attributes: FILE_ATTRIBUTE_FLAGS.resolve(header.file_attributes).into_owned(),
        filename,
        header,
    })
}

/// Decodes a UTF-16LE file name, then strips NUL padding.
///
/// Unpaired surrogates are replaced rather than rejected; an odd trailing
/// byte is likewise rendered as U+FFFD.
pub fn decode_filename(bytes: &[u8]) -> String {
    let (text, had_errors) = UTF_16LE.decode_without_bom_handling(bytes);
    if had_errors {
        warn!("File name contains invalid UTF-16: {:02x?}", bytes);
    }
    strip_nul_padding(&text)
}

fn strip_nul_padding(text: &str) -> String {
    text.chars().filter(|c| *c != '\0').collect()
}

fn structural_error(raw: &RawRecord, reason: String) -> UsnJrnlError {
    UsnJrnlError::StructuralParseError {
        offset: raw.offset,
        reason,
        raw: raw.bytes.clone(),
    }
}
