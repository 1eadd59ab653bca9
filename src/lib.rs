//! Tome - Schema-Driven Record Buffers
//!
//! Arsitektur:
//! - Builder: Back-to-front bump writer, child sebelum parent
//! - Reader: Zero-copy, bounds-checked, default untuk field kosong
//! - Storage: Finished buffer di-mmap kembali dari disk
//! - FFI: Greeting helper lintas C ABI dengan release berpasangan

pub mod core;
pub mod error;
pub mod ffi;
pub mod greet;
pub mod library;
pub mod schema;

pub use crate::core::{
    FieldValue, FinishedBuffer, MappedBuffer, RecordBuilder, RecordReader, RecordRef, RootOffset,
    StringRef, VectorRef,
};
pub use crate::error::{Error, Result};
pub use crate::schema::{EnumDef, FieldType, RecordDef, Schema};
