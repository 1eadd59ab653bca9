//! Error taxonomy untuk builder, reader dan storage.
//!
//! Semua error adalah kesalahan pemakaian yang terdeteksi secara sinkron:
//! tidak ada yang retryable, operasi yang gagal langsung dibatalkan.

use std::{io, path::PathBuf};
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    /// Start/end pairs tidak bersarang dengan benar, atau data anak ditulis
    /// saat record parent sedang dibangun.
    #[error("sequencing error: {0}")]
    Sequencing(&'static str),

    #[error("unknown field `{field}` in record `{kind}`")]
    UnknownField { kind: String, field: String },

    /// `add_field` / `end_record` dipanggil tanpa record yang terbuka.
    #[error("out of order: {0} called with no record in progress")]
    OutOfOrder(&'static str),

    #[error("vector length mismatch: declared {declared}, appended {appended}")]
    VectorLengthMismatch { declared: usize, appended: usize },

    #[error("invalid root offset {root} for buffer of {len} bytes")]
    InvalidRoot { root: usize, len: usize },

    #[error("index {index} out of range for vector of length {len}")]
    IndexOutOfRange { index: usize, len: usize },

    #[error("unknown record kind `{0}`")]
    UnknownKind(String),

    #[error("type mismatch for `{field}`: expected {expected}, got {found}")]
    TypeMismatch {
        field: String,
        expected: String,
        found: String,
    },

    #[error("value {value} is not a variant of enum `{name}`")]
    InvalidEnumValue { name: String, value: i32 },

    #[error("record kind mismatch: expected `{expected}`, buffer holds kind id {found}")]
    KindMismatch { expected: String, found: u16 },

    /// Offset di dalam buffer menunjuk ke luar batas.
    #[error("malformed buffer at offset {offset}: {reason}")]
    Malformed { offset: usize, reason: &'static str },

    /// Handle dibuat oleh builder lain, atau sebelum `reset()` terakhir.
    #[error("stale handle: {0} was not built since the last reset of this builder")]
    StaleHandle(&'static str),

    #[error("invalid UTF-8 at offset {0}")]
    InvalidUtf8(usize),

    #[error("string contains an interior NUL byte at position {0}")]
    InteriorNul(usize),

    /// Offset u32 tidak cukup untuk buffer sebesar ini.
    #[error("buffer would grow to {0} bytes, beyond the u32 offset range")]
    CapacityExceeded(usize),

    #[error("invalid schema: {0}")]
    InvalidSchema(String),

    #[error("corrupt buffer file {path}: {reason}")]
    CorruptFile { path: PathBuf, reason: &'static str },

    #[error(transparent)]
    Io(#[from] io::Error),
}
