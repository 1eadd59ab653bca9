//! Finished Buffer Format
//!
//! Layout (little-endian, tanpa padding):
//! ┌─────────────────────────────────────────────────────┐
//! │ Root reference (u32, relative ke posisi 0)          │
//! ├─────────────────────────────────────────────────────┤
//! │ Records / vectors / strings (parent sebelum child)  │
//! └─────────────────────────────────────────────────────┘
//!
//! ```text
//! string : [u32 byte_len][bytes][0u8]
//! vector : [u32 count][u32 ref; count]
//! record : [u16 kind_id][u16 slot_count][bitmap; ceil(n/8)][u32 slot; n]
//! ```
//!
//! Setiap reference adalah u32 relative terhadap posisi reference itu sendiri,
//! selalu menunjuk ke depan (child ditulis lebih dulu, berada di alamat lebih tinggi).

use crate::core::reader::RecordReader;
use crate::error::{Error, Result};
use crate::schema::{KindId, Schema};

pub const UOFFSET_SIZE: usize = 4;
pub const ROOT_PREFIX_SIZE: usize = UOFFSET_SIZE;
pub const RECORD_HEADER_SIZE: usize = 4;
pub const SLOT_SIZE: usize = 4;

/// Posisi absolut record top-level di dalam satu finished buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RootOffset(pub(crate) u32);

impl RootOffset {
    pub const fn new(position: u32) -> Self {
        Self(position)
    }

    #[inline(always)]
    pub const fn get(self) -> usize {
        self.0 as usize
    }
}

// Semua handle membawa `generation` builder yang membuatnya. Builder baru dan
// setiap `reset()` mengambil generation baru, jadi handle lama ditolak.

/// Handle ke string yang sudah ditulis (diukur dari akhir buffer)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StringRef {
    pub(crate) offset: u32,
    pub(crate) generation: u32,
}

/// Handle ke record yang sudah selesai, membawa kind-nya untuk type check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecordRef {
    pub(crate) offset: u32,
    pub(crate) kind: KindId,
    pub(crate) generation: u32,
}

impl RecordRef {
    pub fn kind(&self) -> KindId {
        self.kind
    }
}

/// Handle ke vector yang sudah selesai
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VectorRef {
    pub(crate) offset: u32,
    pub(crate) kind: KindId,
    pub(crate) len: u32,
    pub(crate) generation: u32,
}

impl VectorRef {
    pub fn kind(&self) -> KindId {
        self.kind
    }

    pub fn len(&self) -> usize {
        self.len as usize
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

/// Nilai yang bisa di-attach ke record via `add_field`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldValue {
    Int(i32),
    Enum(i32),
    String(StringRef),
    Record(RecordRef),
    Vector(VectorRef),
}

impl FieldValue {
    /// Generation builder untuk nilai yang berupa reference
    pub(crate) fn generation(&self) -> Option<u32> {
        match self {
            Self::Int(_) | Self::Enum(_) => None,
            Self::String(s) => Some(s.generation),
            Self::Record(r) => Some(r.generation),
            Self::Vector(v) => Some(v.generation),
        }
    }

    /// Deskripsi tipe untuk pesan error
    pub(crate) fn type_name(&self, schema: &Schema) -> String {
        let kind_name = |kind: KindId| {
            schema
                .record_by_id(kind)
                .map(|def| def.name().to_string())
                .unwrap_or_else(|| format!("#{kind}"))
        };
        match self {
            Self::Int(_) => "int".to_string(),
            Self::Enum(_) => "enum".to_string(),
            Self::String(_) => "string".to_string(),
            Self::Record(r) => format!("record {}", kind_name(r.kind)),
            Self::Vector(v) => format!("[{}]", kind_name(v.kind)),
        }
    }
}

impl From<i32> for FieldValue {
    fn from(value: i32) -> Self {
        Self::Int(value)
    }
}

impl From<StringRef> for FieldValue {
    fn from(value: StringRef) -> Self {
        Self::String(value)
    }
}

impl From<RecordRef> for FieldValue {
    fn from(value: RecordRef) -> Self {
        Self::Record(value)
    }
}

impl From<VectorRef> for FieldValue {
    fn from(value: VectorRef) -> Self {
        Self::Vector(value)
    }
}

/// Buffer yang sudah di-seal: immutable, aman di-share antar reader
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FinishedBuffer {
    bytes: Box<[u8]>,
    root: RootOffset,
}

impl FinishedBuffer {
    pub(crate) fn new(bytes: Box<[u8]>, root: RootOffset) -> Self {
        Self { bytes, root }
    }

    /// Adopsi bytes yang diterima dari luar (mis. dibaca dari disk)
    ///
    /// Root dibaca dari prefix dan divalidasi terhadap panjang buffer.
    pub fn from_bytes(bytes: Vec<u8>) -> Result<Self> {
        let root = root_of(&bytes)?;
        Ok(Self {
            bytes: bytes.into_boxed_slice(),
            root,
        })
    }

    #[inline(always)]
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    #[inline(always)]
    pub fn root(&self) -> RootOffset {
        self.root
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Zero-copy reader untuk root record
    pub fn reader<'a>(&'a self, schema: &'a Schema, kind: &str) -> Result<RecordReader<'a>> {
        RecordReader::open(&self.bytes, schema, kind, self.root)
    }
}

impl AsRef<[u8]> for FinishedBuffer {
    fn as_ref(&self) -> &[u8] {
        &self.bytes
    }
}

/// Resolve root dari prefix buffer
pub fn root_of(bytes: &[u8]) -> Result<RootOffset> {
    let rel = read_u32(bytes, 0).map_err(|_| Error::InvalidRoot {
        root: 0,
        len: bytes.len(),
    })? as usize;
    if rel < ROOT_PREFIX_SIZE || rel + RECORD_HEADER_SIZE > bytes.len() {
        return Err(Error::InvalidRoot {
            root: rel,
            len: bytes.len(),
        });
    }
    Ok(RootOffset(rel as u32))
}

#[inline]
fn slice_at(buf: &[u8], pos: usize, len: usize) -> Result<&[u8]> {
    pos.checked_add(len)
        .and_then(|end| buf.get(pos..end))
        .ok_or(Error::Malformed {
            offset: pos,
            reason: "read past end of buffer",
        })
}

#[inline]
pub(crate) fn read_u16(buf: &[u8], pos: usize) -> Result<u16> {
    let bytes = slice_at(buf, pos, 2)?;
    Ok(u16::from_le_bytes([bytes[0], bytes[1]]))
}

#[inline]
pub(crate) fn read_u32(buf: &[u8], pos: usize) -> Result<u32> {
    let bytes = slice_at(buf, pos, 4)?;
    Ok(u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
}

#[inline]
pub(crate) fn read_i32(buf: &[u8], pos: usize) -> Result<i32> {
    read_u32(buf, pos).map(|v| v as i32)
}

pub(crate) fn read_bytes(buf: &[u8], pos: usize, len: usize) -> Result<&[u8]> {
    slice_at(buf, pos, len)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_root_of_rejects_short_buffers() {
        assert!(matches!(root_of(&[]), Err(Error::InvalidRoot { .. })));
        assert!(matches!(root_of(&[4, 0]), Err(Error::InvalidRoot { .. })));
    }

    #[test]
    fn test_root_of_bounds() {
        // root 4 + record header 4 = 8 bytes dibutuhkan
        let ok = [4, 0, 0, 0, 0, 0, 0, 0];
        assert_eq!(root_of(&ok).unwrap().get(), 4);

        let past_end = [8, 0, 0, 0, 0, 0, 0, 0];
        assert!(matches!(root_of(&past_end), Err(Error::InvalidRoot { .. })));

        let self_pointing = [0, 0, 0, 0, 0, 0, 0, 0];
        assert!(matches!(root_of(&self_pointing), Err(Error::InvalidRoot { .. })));
    }

    #[test]
    fn test_read_helpers() {
        let buf = [0x34, 0x12, 0xff, 0xff, 0xff, 0xff];
        assert_eq!(read_u16(&buf, 0).unwrap(), 0x1234);
        assert_eq!(read_i32(&buf, 2).unwrap(), -1);
        assert!(matches!(
            read_u32(&buf, 4),
            Err(Error::Malformed { offset: 4, .. })
        ));
        assert!(read_bytes(&buf, usize::MAX, 2).is_err());
    }
}
