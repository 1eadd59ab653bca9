//! Memory-Mapped Buffer Files untuk Zero-Copy Reads
//!
//! Finished buffer disimpan ke disk dengan header kecil, lalu di-mmap kembali
//! read-only. Reader meminjam langsung dari page cache, tanpa copy ke heap.
//!
//! Layout file:
//! ┌─────────────────────────────────────────────────────┐
//! │ FileHeader (20 bytes, fixed, little-endian)         │
//! ├─────────────────────────────────────────────────────┤
//! │ Payload = finished buffer bytes                     │
//! └─────────────────────────────────────────────────────┘

use memmap2::{Mmap, MmapOptions};
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::core::buffer::{root_of, FinishedBuffer, RootOffset};
use crate::core::reader::RecordReader;
use crate::error::{Error, Result};
use crate::schema::Schema;

pub const MAGIC: u32 = 0x454D_4F54; // "TOME" little-endian
pub const VERSION: u16 = 1;
pub const FILE_HEADER_SIZE: usize = 20;

/// Header file buffer
///
/// ```text
/// magic: u32 | version: u16 | flags: u16 | payload_len: u32 | root: u32 | checksum: u32
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct FileHeader {
    magic: u32,
    version: u16,
    flags: u16,
    payload_len: u32,
    root: u32,
    checksum: u32,
}

impl FileHeader {
    fn for_buffer(buffer: &FinishedBuffer) -> Self {
        Self {
            magic: MAGIC,
            version: VERSION,
            flags: 0,
            payload_len: buffer.len() as u32,
            root: buffer.root().get() as u32,
            checksum: checksum(buffer.as_bytes()),
        }
    }

    fn to_bytes(self) -> [u8; FILE_HEADER_SIZE] {
        let mut out = [0u8; FILE_HEADER_SIZE];
        out[0..4].copy_from_slice(&self.magic.to_le_bytes());
        out[4..6].copy_from_slice(&self.version.to_le_bytes());
        out[6..8].copy_from_slice(&self.flags.to_le_bytes());
        out[8..12].copy_from_slice(&self.payload_len.to_le_bytes());
        out[12..16].copy_from_slice(&self.root.to_le_bytes());
        out[16..20].copy_from_slice(&self.checksum.to_le_bytes());
        out
    }

    fn from_bytes(buf: &[u8; FILE_HEADER_SIZE]) -> Self {
        let u32_at = |at: usize| u32::from_le_bytes([buf[at], buf[at + 1], buf[at + 2], buf[at + 3]]);
        let u16_at = |at: usize| u16::from_le_bytes([buf[at], buf[at + 1]]);
        Self {
            magic: u32_at(0),
            version: u16_at(4),
            flags: u16_at(6),
            payload_len: u32_at(8),
            root: u32_at(12),
            checksum: u32_at(16),
        }
    }
}

/// Tulis finished buffer ke file (create / truncate)
pub fn write_buffer_file<P: AsRef<Path>>(path: P, buffer: &FinishedBuffer) -> Result<()> {
    let path = path.as_ref();
    let header = FileHeader::for_buffer(buffer);

    let mut file = OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .open(path)?;
    file.write_all(&header.to_bytes())?;
    file.write_all(buffer.as_bytes())?;
    file.sync_all()?;

    debug!(path = %path.display(), len = buffer.len(), "buffer file written");
    Ok(())
}

/// Finished buffer yang di-mmap read-only dari disk
pub struct MappedBuffer {
    mmap: Mmap,
    root: RootOffset,
    path: PathBuf,
}

impl MappedBuffer {
    /// Map file dan validasi header + checksum
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let corrupt = |reason| Error::CorruptFile {
            path: path.clone(),
            reason,
        };

        let file = File::open(&path)?;
        let file_len = file.metadata()?.len() as usize;
        if file_len < FILE_HEADER_SIZE {
            return Err(corrupt("file shorter than header"));
        }

        // SAFETY: File dibuka read-only; isi file tidak boleh diubah proses lain
        // selama mapping hidup
        let mmap = unsafe { MmapOptions::new().len(file_len).map(&file)? };

        let mut raw = [0u8; FILE_HEADER_SIZE];
        raw.copy_from_slice(&mmap[..FILE_HEADER_SIZE]);
        let header = FileHeader::from_bytes(&raw);

        if header.magic != MAGIC {
            return Err(corrupt("bad magic"));
        }
        if header.version != VERSION {
            return Err(corrupt("unsupported version"));
        }
        if header.payload_len as usize != file_len - FILE_HEADER_SIZE {
            return Err(corrupt("payload length does not match file size"));
        }

        let payload = &mmap[FILE_HEADER_SIZE..];
        if checksum(payload) != header.checksum {
            return Err(corrupt("checksum mismatch"));
        }

        let root = root_of(payload)?;
        if root.get() != header.root as usize {
            return Err(corrupt("root in header disagrees with payload"));
        }

        debug!(path = %path.display(), len = payload.len(), root = root.get(), "buffer file mapped");

        Ok(Self { mmap, root, path })
    }

    /// Payload (zero-copy slice ke mmap region)
    #[inline(always)]
    pub fn bytes(&self) -> &[u8] {
        &self.mmap[FILE_HEADER_SIZE..]
    }

    #[inline(always)]
    pub fn root(&self) -> RootOffset {
        self.root
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn reader<'a>(&'a self, schema: &'a Schema, kind: &str) -> Result<RecordReader<'a>> {
        RecordReader::open(self.bytes(), schema, kind, self.root)
    }

    /// Copy ke heap sebagai `FinishedBuffer`
    pub fn to_buffer(&self) -> Result<FinishedBuffer> {
        FinishedBuffer::from_bytes(self.bytes().to_vec())
    }
}

/// Checksum payload (Adler-32 variant, simple dan cepat)
#[inline(always)]
pub fn checksum(data: &[u8]) -> u32 {
    let mut a: u32 = 1;
    let mut b: u32 = 0;

    for &byte in data {
        a = a.wrapping_add(byte as u32);
        b = b.wrapping_add(a);
    }

    (b << 16) | (a & 0xffff)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::RecordBuilder;
    use crate::schema::{FieldType, RecordDef};

    fn schema() -> Schema {
        Schema::new().with_record(
            RecordDef::new("Entry")
                .field("key", FieldType::String)
                .field("value", FieldType::Int),
        )
    }

    fn entry(schema: &Schema) -> FinishedBuffer {
        let mut builder = RecordBuilder::new(schema);
        let key = builder.add_string("answer").unwrap();
        builder.start_record("Entry").unwrap();
        builder.add_field("key", key).unwrap();
        builder.add_field("value", 42).unwrap();
        let root = builder.end_record().unwrap();
        builder.finish(root).unwrap()
    }

    #[test]
    fn test_header_roundtrip() {
        let header = FileHeader {
            magic: MAGIC,
            version: VERSION,
            flags: 3,
            payload_len: 100,
            root: 12,
            checksum: 0xdead_beef,
        };
        assert_eq!(FileHeader::from_bytes(&header.to_bytes()), header);
        assert_eq!(&header.to_bytes()[..4], b"TOME");
    }

    #[test]
    fn test_mapped_buffer_persistence() {
        let schema = schema();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("entry.tome");

        let buffer = entry(&schema);
        write_buffer_file(&path, &buffer).unwrap();

        let mapped = MappedBuffer::open(&path).unwrap();
        assert_eq!(mapped.bytes(), buffer.as_bytes());
        assert_eq!(mapped.root(), buffer.root());
        assert_eq!(mapped.to_buffer().unwrap(), buffer);

        let reader = mapped.reader(&schema, "Entry").unwrap();
        assert_eq!(reader.get_string("key").unwrap(), "answer");
        assert_eq!(reader.get_int("value").unwrap(), 42);
    }

    #[test]
    fn test_corrupted_payload_detected() {
        let schema = schema();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("entry.tome");

        write_buffer_file(&path, &entry(&schema)).unwrap();
        let mut raw = std::fs::read(&path).unwrap();
        let last = raw.len() - 2;
        raw[last] ^= 0xff;
        std::fs::write(&path, &raw).unwrap();

        assert!(matches!(
            MappedBuffer::open(&path),
            Err(Error::CorruptFile {
                reason: "checksum mismatch",
                ..
            })
        ));
    }

    #[test]
    fn test_short_and_foreign_files_rejected() {
        let dir = tempfile::tempdir().unwrap();

        let short = dir.path().join("short.tome");
        std::fs::write(&short, b"TOME").unwrap();
        assert!(matches!(
            MappedBuffer::open(&short),
            Err(Error::CorruptFile { .. })
        ));

        let foreign = dir.path().join("foreign.tome");
        std::fs::write(&foreign, [0u8; 32]).unwrap();
        assert!(matches!(
            MappedBuffer::open(&foreign),
            Err(Error::CorruptFile {
                reason: "bad magic",
                ..
            })
        ));

        assert!(matches!(
            MappedBuffer::open(dir.path().join("missing.tome")),
            Err(Error::Io(_))
        ));
    }

    #[test]
    fn test_checksum_changes_with_content() {
        assert_ne!(checksum(b"abc"), checksum(b"abd"));
        assert_eq!(checksum(b""), 1);
    }
}
