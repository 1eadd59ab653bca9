//! RecordReader - Zero-Copy Field Access
//!
//! Reader hanya meminjam buffer: tidak ada copy, tidak ada alokasi, tidak ada
//! mutasi. Setiap reference divalidasi terhadap batas buffer sebelum diikuti.
//! Field yang tidak pernah ditulis mengembalikan default schema.

use crate::core::buffer::{
    read_bytes, read_i32, read_u16, read_u32, RootOffset, RECORD_HEADER_SIZE, ROOT_PREFIX_SIZE,
    SLOT_SIZE, UOFFSET_SIZE,
};
use crate::error::{Error, Result};
use crate::schema::{FieldDef, FieldType, KindId, RecordDef, Schema};

/// View read-only ke satu record di dalam buffer
#[derive(Debug, Clone, Copy)]
pub struct RecordReader<'a> {
    buf: &'a [u8],
    schema: &'a Schema,
    def: &'a RecordDef,
    kind: KindId,
    pos: usize,
    slot_count: usize,
}

impl<'a> RecordReader<'a> {
    /// Buka root record dengan kind tertentu
    pub fn open(buf: &'a [u8], schema: &'a Schema, kind: &str, root: RootOffset) -> Result<Self> {
        let (kind, _) = schema.record(kind)?;
        let root = root.get();
        if root < ROOT_PREFIX_SIZE || root.saturating_add(RECORD_HEADER_SIZE) > buf.len() {
            return Err(Error::InvalidRoot {
                root,
                len: buf.len(),
            });
        }
        Self::at(buf, schema, kind, root)
    }

    fn at(buf: &'a [u8], schema: &'a Schema, kind: KindId, pos: usize) -> Result<Self> {
        let def = schema
            .record_by_id(kind)
            .ok_or_else(|| Error::UnknownKind(format!("#{kind}")))?;

        let stored = read_u16(buf, pos)?;
        if stored != kind {
            return Err(Error::KindMismatch {
                expected: def.name().to_string(),
                found: stored,
            });
        }

        let slot_count = read_u16(buf, pos + 2)? as usize;
        let body = RecordDef::bitmap_size(slot_count) + slot_count * SLOT_SIZE;
        read_bytes(buf, pos + RECORD_HEADER_SIZE, body)?;

        Ok(Self {
            buf,
            schema,
            def,
            kind,
            pos,
            slot_count,
        })
    }

    pub fn kind(&self) -> KindId {
        self.kind
    }

    pub fn kind_name(&self) -> &'a str {
        self.def.name()
    }

    pub fn has_field(&self, field: &str) -> Result<bool> {
        let (slot, _) = self.slot(field)?;
        Ok(slot.is_some())
    }

    pub fn get_int(&self, field: &str) -> Result<i32> {
        let (slot, def) = self.slot(field)?;
        self.check_type(def, matches!(def.field_type, FieldType::Int), "int")?;
        match slot {
            Some(pos) => read_i32(self.buf, pos),
            None => Ok(0),
        }
    }

    pub fn get_enum(&self, field: &str) -> Result<i32> {
        let (slot, def) = self.slot(field)?;
        self.check_type(def, matches!(def.field_type, FieldType::Enum(_)), "enum")?;
        match slot {
            Some(pos) => read_i32(self.buf, pos),
            None => Ok(0),
        }
    }

    /// String field, borrowed dari buffer
    pub fn get_string(&self, field: &str) -> Result<&'a str> {
        let (slot, def) = self.slot(field)?;
        self.check_type(def, def.field_type == FieldType::String, "string")?;
        let Some(pos) = slot else {
            return Ok("");
        };

        let target = self.deref(pos)?;
        let len = read_u32(self.buf, target)? as usize;
        // Termasuk NUL terminator
        let bytes = read_bytes(self.buf, target + UOFFSET_SIZE, len + 1)?;
        std::str::from_utf8(&bytes[..len]).map_err(|_| Error::InvalidUtf8(target))
    }

    /// Nested record; `None` jika field tidak ditulis
    pub fn get_record(&self, field: &str) -> Result<Option<RecordReader<'a>>> {
        let (slot, def) = self.slot(field)?;
        let FieldType::Record(kind) = &def.field_type else {
            return Err(self.mismatch(def, "record"));
        };
        let Some(pos) = slot else {
            return Ok(None);
        };

        let (kind, _) = self.schema.record(kind)?;
        let target = self.deref(pos)?;
        Self::at(self.buf, self.schema, kind, target).map(Some)
    }

    pub fn get_vector_length(&self, field: &str) -> Result<usize> {
        Ok(self.vector(field)?.len())
    }

    /// Element ke-`index` dalam urutan logis
    pub fn get_vector_element(&self, field: &str, index: usize) -> Result<RecordReader<'a>> {
        self.vector(field)?.get(index)
    }

    /// View ke vector field; vector kosong jika field tidak ditulis
    pub fn vector(&self, field: &str) -> Result<VectorReader<'a>> {
        let (slot, def) = self.slot(field)?;
        let FieldType::Vector(kind) = &def.field_type else {
            return Err(self.mismatch(def, "vector"));
        };
        let (kind, _) = self.schema.record(kind)?;

        let Some(pos) = slot else {
            return Ok(VectorReader {
                buf: self.buf,
                schema: self.schema,
                kind,
                start: 0,
                len: 0,
            });
        };

        let target = self.deref(pos)?;
        let len = read_u32(self.buf, target)? as usize;
        let elements = len.checked_mul(UOFFSET_SIZE).ok_or(Error::Malformed {
            offset: target,
            reason: "vector length overflows",
        })?;
        read_bytes(self.buf, target + UOFFSET_SIZE, elements)?;

        Ok(VectorReader {
            buf: self.buf,
            schema: self.schema,
            kind,
            start: target + UOFFSET_SIZE,
            len,
        })
    }

    /// Resolve field -> (posisi slot jika ditulis, definisi field)
    fn slot(&self, field: &str) -> Result<(Option<usize>, &'a FieldDef)> {
        let def: &'a RecordDef = self.def;
        let (idx, field_def) = def.lookup(field).ok_or_else(|| Error::UnknownField {
            kind: def.name().to_string(),
            field: field.to_string(),
        })?;

        // Record yang ditulis dengan slot lebih sedikit: field dianggap kosong
        if idx >= self.slot_count {
            return Ok((None, field_def));
        }

        let bitmap_pos = self.pos + RECORD_HEADER_SIZE;
        let present = self.buf[bitmap_pos + idx / 8] & (1 << (idx % 8)) != 0;
        if !present {
            return Ok((None, field_def));
        }

        let slots_pos = bitmap_pos + RecordDef::bitmap_size(self.slot_count);
        Ok((Some(slots_pos + idx * SLOT_SIZE), field_def))
    }

    fn deref(&self, pos: usize) -> Result<usize> {
        follow(self.buf, pos)
    }

    fn check_type(&self, def: &FieldDef, ok: bool, requested: &str) -> Result<()> {
        if ok {
            Ok(())
        } else {
            Err(self.mismatch(def, requested))
        }
    }

    fn mismatch(&self, def: &FieldDef, requested: &str) -> Error {
        Error::TypeMismatch {
            field: format!("{}.{}", self.def.name(), def.name),
            expected: def.field_type.to_string(),
            found: requested.to_string(),
        }
    }
}

/// View ke vector of records, bounds-checked
#[derive(Debug, Clone, Copy)]
pub struct VectorReader<'a> {
    buf: &'a [u8],
    schema: &'a Schema,
    kind: KindId,
    start: usize,
    len: usize,
}

impl<'a> VectorReader<'a> {
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn get(&self, index: usize) -> Result<RecordReader<'a>> {
        if index >= self.len {
            return Err(Error::IndexOutOfRange {
                index,
                len: self.len,
            });
        }
        let target = follow(self.buf, self.start + index * UOFFSET_SIZE)?;
        RecordReader::at(self.buf, self.schema, self.kind, target)
    }

    pub fn iter(&self) -> VectorIter<'a> {
        VectorIter {
            vector: *self,
            next: 0,
        }
    }
}

impl<'a> IntoIterator for VectorReader<'a> {
    type Item = Result<RecordReader<'a>>;
    type IntoIter = VectorIter<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Iterator element vector dalam urutan logis
pub struct VectorIter<'a> {
    vector: VectorReader<'a>,
    next: usize,
}

impl<'a> Iterator for VectorIter<'a> {
    type Item = Result<RecordReader<'a>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.next >= self.vector.len {
            return None;
        }
        let item = self.vector.get(self.next);
        self.next += 1;
        Some(item)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.vector.len - self.next;
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for VectorIter<'_> {}

/// Ikuti relative reference di `pos`, target harus di dalam buffer
fn follow(buf: &[u8], pos: usize) -> Result<usize> {
    let rel = read_u32(buf, pos)? as usize;
    if rel == 0 {
        return Err(Error::Malformed {
            offset: pos,
            reason: "null reference in a present slot",
        });
    }
    match pos.checked_add(rel) {
        Some(target) if target < buf.len() => Ok(target),
        _ => Err(Error::Malformed {
            offset: pos,
            reason: "reference points past end of buffer",
        }),
    }
}
