use std::fmt;

/// Tipe field dalam record
///
/// `Enum`, `Record` dan `Vector` mereferensikan definisi lain di schema by name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldType {
    /// UTF-8 string, length-prefixed
    String,
    /// 32-bit signed integer
    Int,
    /// Enum yang di-backing i32
    Enum(String),
    /// Nested record dengan kind tertentu
    Record(String),
    /// Vector of records dengan kind tertentu
    Vector(String),
}

impl FieldType {
    /// Apakah slot menyimpan relative reference (bukan nilai langsung)
    #[inline]
    pub fn is_reference(&self) -> bool {
        matches!(self, Self::String | Self::Record(_) | Self::Vector(_))
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::String => write!(f, "string"),
            Self::Int => write!(f, "int"),
            Self::Enum(name) => write!(f, "enum {name}"),
            Self::Record(kind) => write!(f, "record {kind}"),
            Self::Vector(kind) => write!(f, "[{kind}]"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldDef {
    pub name: String,
    pub field_type: FieldType,
}

/// Definisi satu record kind: nama + field berurutan
///
/// Urutan field menentukan slot index di buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordDef {
    name: String,
    fields: Vec<FieldDef>,
}

impl RecordDef {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            fields: Vec::new(),
        }
    }

    /// Tambah field (builder style)
    pub fn field(mut self, name: impl Into<String>, field_type: FieldType) -> Self {
        self.fields.push(FieldDef {
            name: name.into(),
            field_type,
        });
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn fields(&self) -> &[FieldDef] {
        &self.fields
    }

    pub fn field_count(&self) -> usize {
        self.fields.len()
    }

    /// Lookup field by name, returns (slot index, definisi)
    pub fn lookup(&self, name: &str) -> Option<(usize, &FieldDef)> {
        self.fields
            .iter()
            .enumerate()
            .find(|(_, field)| field.name == name)
    }

    /// Ukuran presence bitmap dalam bytes
    #[inline]
    pub fn bitmap_size(slot_count: usize) -> usize {
        slot_count.div_ceil(8)
    }
}
