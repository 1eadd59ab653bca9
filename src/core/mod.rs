//! Core module: Record buffer builder, reader dan mmap storage
//!
//! Prinsip desain:
//! - Back-to-front writes: Child selalu selesai sebelum parent dimulai
//! - Arena + offset: Semua "pointer" adalah u32 offset yang divalidasi saat dibaca
//! - Zero-Copy reads: Reader meminjam buffer (heap atau mmap) tanpa copy

mod buffer;
mod builder;
mod reader;
mod storage;

pub use buffer::{
    root_of, FieldValue, FinishedBuffer, RecordRef, RootOffset, StringRef, VectorRef,
};
pub use builder::RecordBuilder;
pub use reader::{RecordReader, VectorIter, VectorReader};
pub use storage::{checksum, write_buffer_file, MappedBuffer, FILE_HEADER_SIZE};
