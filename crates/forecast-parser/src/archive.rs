//! KMZ archive access.

use std::fs::File;
use std::io::{BufReader, Cursor, Read, Seek};
use std::path::Path;

use tracing::debug;
use zip::read::ZipFile;
use zip::ZipArchive;

use crate::cursor::DocumentCursor;
use crate::error::{ParseError, Result};

/// Read buffer for the decompressed document stream.
const ENTRY_BUFFER_SIZE: usize = 64 * 1024;

/// A KMZ bundle: a zip archive whose first entry is the KML document.
pub struct KmzArchive<R: Read + Seek> {
    archive: ZipArchive<R>,
}

impl KmzArchive<BufReader<File>> {
    /// Open a KMZ file from disk.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        debug!(path = %path.display(), "Opening KMZ archive");
        let file = File::open(path)?;
        Self::new(BufReader::new(file))
    }
}

impl KmzArchive<Cursor<Vec<u8>>> {
    /// Wrap an in-memory KMZ payload.
    pub fn from_bytes(bytes: impl Into<Vec<u8>>) -> Result<Self> {
        Self::new(Cursor::new(bytes.into()))
    }
}

impl<R: Read + Seek> KmzArchive<R> {
    pub fn new(reader: R) -> Result<Self> {
        Ok(Self {
            archive: ZipArchive::new(reader)?,
        })
    }

    /// Number of entries in the archive.
    pub fn len(&self) -> usize {
        self.archive.len()
    }

    pub fn is_empty(&self) -> bool {
        self.archive.is_empty()
    }

    /// Start streaming the first entry of the archive.
    ///
    /// Additional entries are ignored. The entry is decompressed on the fly
    /// while the returned cursor advances.
    pub fn cursor(&mut self) -> Result<DocumentCursor<BufReader<ZipFile<'_>>>> {
        if self.archive.is_empty() {
            return Err(ParseError::EmptyArchive);
        }
        if self.archive.len() > 1 {
            debug!(entries = self.archive.len(), "Archive has extra entries, using the first one");
        }

        let entry = self.archive.by_index(0)?;
        debug!(
            name = entry.name(),
            compressed = entry.compressed_size(),
            size = entry.size(),
            "Streaming archive entry"
        );

        Ok(DocumentCursor::from_reader(BufReader::with_capacity(
            ENTRY_BUFFER_SIZE,
            entry,
        )))
    }
}
