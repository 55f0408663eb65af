//! Handling of the zero-filled region that precedes the live part of an
//! extracted `$UsnJrnl:$J` stream.
//!
//! The journal is a sparse stream; extraction tools usually materialise the
//! deallocated head as zeros, often gigabytes of them.

use log::{debug, info};
use std::fs::File;
use std::io::{self, BufReader, BufWriter, Read, Seek, SeekFrom, Write};
use std::path::Path;

use crate::{DEFAULT_BUFFER_SIZE, UsnJrnlResult, errors::UsnJrnlError};

/// Finds the offset of the first non-zero byte at or after the reader's
/// start, or `None` if the rest of the source is all zeros.
pub fn find_data_start<R: Read + Seek>(reader: &mut R) -> io::Result<Option<u64>> {
    reader.seek(SeekFrom::Start(0))?;
    let mut buffer = vec![0u8; DEFAULT_BUFFER_SIZE];
    let mut consumed: u64 = 0;

    loop {
        let read = match reader.read(&mut buffer) {
            Ok(0) => return Ok(None),
            Ok(n) => n,
            Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
            Err(err) => return Err(err),
        };

        if let Some(pos) = buffer[..read].iter().position(|b| *b != 0) {
            let start = consumed + pos as u64;
            debug!("Journal data starts at offset {}", start);
            return Ok(Some(start));
        }
        consumed += read as u64;
    }
}

/// Copies `src` from its first non-zero byte into `dst` and returns the
/// number of bytes written. The source is not modified.
pub fn write_working_copy(src: &Path, dst: &Path) -> UsnJrnlResult<u64> {
    let mut input = BufReader::with_capacity(DEFAULT_BUFFER_SIZE, File::open(src)?);
    let start = find_data_start(&mut input)?.ok_or_else(|| {
        UsnJrnlError::OtherError(format!("{} contains no journal data", src.display()))
    })?;
    input.seek(SeekFrom::Start(start))?;

    let mut output = BufWriter::with_capacity(DEFAULT_BUFFER_SIZE, File::create(dst)?);
    let written = io::copy(&mut input, &mut output)?;
    output.flush()?;

    info!(
        "Wrote working copy {} ({} bytes, {} leading zero bytes dropped)",
        dst.display(),
        written,
        start
    );
    Ok(written)
}
