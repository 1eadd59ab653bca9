//! Schema Layer: Definisi record kind, field dan enum
//!
//! Prinsip desain:
//! - Schema-dependent: Tipe field berasal dari schema, tidak disimpan per-record
//! - Kind ID = index record di schema (u16), disimpan di header record
//! - Field index = slot index di record, lookup by name

mod enums;
mod record;
mod registry;

pub use enums::EnumDef;
pub use record::{FieldDef, FieldType, RecordDef};
pub use registry::{KindId, Schema};
