//! Walks a raw `$UsnJrnl:$J` stream and yields candidate records.
//!
//! The stream is a run of variable-length records separated by zero-filled
//! gaps. [`JournalScanner`] keeps a single offset cursor and classifies the
//! bytes under it on every step: a record start, a gap to skip, or the end of
//! the stream. It owns the reader for the whole pass and only moves forward.

use byteorder::{ByteOrder, LittleEndian};
use log::{debug, trace, warn};
use std::io::{Read, Seek, SeekFrom};

use crate::record::{self, DecodedRecord, FIXED_HEADER_LEN, RawRecord};
use crate::{DEFAULT_BUFFER_SIZE, DEFAULT_LOOKAHEAD, UsnJrnlResult, errors::UsnJrnlError};

/// Bytes of a failed record included in a log line.
const RAW_PREVIEW_LEN: usize = 64;

#[derive(Debug, Clone)]
/// Options for scanning a journal stream.
pub struct ScanOptions {
    /// Stream offset the first record is expected at.
    pub start_offset: u64,
    /// Bytes examined at the cursor to classify it and to look across gaps.
    pub lookahead: usize,
}

impl Default for ScanOptions {
    fn default() -> Self {
        ScanOptions {
            start_offset: 0,
            lookahead: DEFAULT_LOOKAHEAD,
        }
    }
}

/// Counters accumulated over one pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScanSummary {
    /// Records decoded (or emitted, for the raw scanner).
    pub records: u64,
    /// Padding runs stepped over.
    pub gaps_skipped: u64,
    /// Total bytes stepped over in padding runs.
    pub bytes_skipped: u64,
    /// Records that failed to read or decode.
    pub structural_errors: u64,
}

/// Where the scanner is in its pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanState {
    /// Classify the bytes at the cursor.
    Scanning,
    /// Zero padding (or an unusable length) at the cursor; skip `len` bytes.
    GapSkip { len: u64 },
    /// A record of `length` bytes starts at the cursor.
    Emit { length: u32 },
    /// End of stream reached.
    Done,
    /// A read failed; no further records.
    Fatal,
}

/// Iterator over the candidate records of a journal stream.
pub struct JournalScanner<R> {
    reader: R,
    offset: u64,
    lookahead: usize,
    state: ScanState,
    summary: ScanSummary,
}

impl<R: Read + Seek> JournalScanner<R> {
    /// Create a scanner starting at offset 0.
    pub fn new(reader: R) -> Self {
        Self::with_options(reader, ScanOptions::default())
    }

    pub fn with_options(reader: R, options: ScanOptions) -> Self {
        JournalScanner {
            reader,
            offset: options.start_offset,
            // Always enough to read a length field.
            lookahead: options.lookahead.max(4),
            state: ScanState::Scanning,
            summary: ScanSummary::default(),
        }
    }

    /// Current cursor position in the stream.
    pub fn offset(&self) -> u64 {
        self.offset
    }

    pub fn state(&self) -> ScanState {
        self.state
    }

    pub fn summary(&self) -> ScanSummary {
        self.summary
    }

    /// Returns an iterator that decodes each record as it is found.
    pub fn decoded(self) -> DecodedRecords<R> {
        DecodedRecords { scanner: self }
    }

    /// Reads up to `len` bytes at `offset` without moving the cursor.
    fn read_at(&mut self, offset: u64, len: usize) -> std::io::Result<Vec<u8>> {
        self.reader.seek(SeekFrom::Start(offset))?;
        // The length may come from a corrupt field; only grow with what is read.
        let mut buf = Vec::with_capacity(len.min(DEFAULT_BUFFER_SIZE));
        self.reader.by_ref().take(len as u64).read_to_end(&mut buf)?;
        Ok(buf)
    }

    /// Decide what the bytes under the cursor are.
    fn classify(&mut self) -> std::io::Result<ScanState> {
        let window = self.read_at(self.offset, self.lookahead)?;
        if window.len() < 4 {
            debug!(
                "{} trailing bytes at offset {}, end of stream",
                window.len(),
                self.offset
            );
            return Ok(ScanState::Done);
        }

        let record_length = LittleEndian::read_i32(&window[..4]);
        if record_length < 0 {
            debug!(
                "Negative record length {} at offset {}, end of stream",
                record_length, self.offset
            );
            return Ok(ScanState::Done);
        }

        // Gaps end at the first non-zero byte. A record whose length has a zero
        // low byte (256, 512, ...) is entered one byte late after a gap and
        // its misread length ends the pass.
        if (record_length as usize) < FIXED_HEADER_LEN {
            return Ok(match window.iter().position(|b| *b != 0) {
                None => ScanState::Done,
                // A small non-zero length; step one byte to resynchronise.
                Some(0) => ScanState::GapSkip { len: 1 },
                Some(pos) => ScanState::GapSkip { len: pos as u64 },
            });
        }

        Ok(ScanState::Emit {
            length: record_length as u32,
        })
    }

    fn emit(&mut self, length: u32) -> Option<UsnJrnlResult<RawRecord>> {
        let offset = self.offset;
        let bytes = match self.read_at(offset, length as usize) {
            Ok(bytes) => bytes,
            Err(err) => return self.fail(err),
        };

        if bytes.len() < length as usize {
            // Nothing can follow a record that runs off the end of the stream.
            self.state = ScanState::Done;
            self.summary.structural_errors += 1;
            let reason = format!(
                "record claims {} bytes but only {} remain",
                length,
                bytes.len()
            );
            log_structural(offset, &reason, &bytes);
            return Some(Err(UsnJrnlError::StructuralParseError {
                offset,
                reason,
                raw: bytes,
            }));
        }

        self.offset = offset + length as u64;
        self.state = ScanState::Scanning;
        self.summary.records += 1;
        trace!("Record of {} bytes at offset {}", length, offset);
        Some(Ok(RawRecord { offset, bytes }))
    }

    fn fail(&mut self, err: std::io::Error) -> Option<UsnJrnlResult<RawRecord>> {
        warn!("Error reading journal at offset {}: {}", self.offset, err);
        self.state = ScanState::Fatal;
        Some(Err(err.into()))
    }
}

impl<R: Read + Seek> Iterator for JournalScanner<R> {
    type Item = UsnJrnlResult<RawRecord>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            match self.state {
                ScanState::Scanning => match self.classify() {
                    Ok(state) => self.state = state,
                    Err(err) => return self.fail(err),
                },
                ScanState::GapSkip { len } => {
                    debug!("Skipped {} padding bytes at offset {}", len, self.offset);
                    self.offset += len;
                    self.summary.gaps_skipped += 1;
                    self.summary.bytes_skipped += len;
                    self.state = ScanState::Scanning;
                }
                ScanState::Emit { length } => return self.emit(length),
                ScanState::Done | ScanState::Fatal => return None,
            }
        }
    }
}

/// Scans and decodes in one pass.
///
/// Records that fail to decode are reported as errors; the scanner has
/// already moved past them, so iteration can continue.
pub struct DecodedRecords<R> {
    scanner: JournalScanner<R>,
}

impl<R: Read + Seek> DecodedRecords<R> {
    pub fn offset(&self) -> u64 {
        self.scanner.offset()
    }

    pub fn summary(&self) -> ScanSummary {
        self.scanner.summary()
    }
}

impl<R: Read + Seek> Iterator for DecodedRecords<R> {
    type Item = UsnJrnlResult<DecodedRecord>;

    fn next(&mut self) -> Option<Self::Item> {
        let raw = match self.scanner.next()? {
            Ok(raw) => raw,
            Err(err) => return Some(Err(err)),
        };

        match record::decode(&raw) {
            Ok(decoded) => Some(Ok(decoded)),
            Err(err) => {
                self.scanner.summary.records -= 1;
                self.scanner.summary.structural_errors += 1;
                if let UsnJrnlError::StructuralParseError {
                    offset,
                    reason,
                    raw,
                } = &err
                {
                    log_structural(*offset, reason, raw);
                }
                Some(Err(err))
            }
        }
    }
}

fn log_structural(offset: u64, reason: &str, raw: &[u8]) {
    let preview = &raw[..raw.len().min(RAW_PREVIEW_LEN)];
    warn!(
        "Cannot parse record at offset {}: {} (raw {} bytes: {:02x?})",
        offset,
        reason,
        raw.len(),
        preview
    );
}
