//! RecordBuilder - Back-to-Front Bump Writer
//!
//! Buffer ditulis dari belakang ke depan: child (string, vector, record)
//! selalu selesai dan offset-nya diketahui sebelum parent yang mereferensikannya
//! dimulai. Hasilnya DAG of forward references, tanpa patching.
//!
//! ## Usage
//!
//! ```ignore
//! let mut builder = RecordBuilder::new(&schema);
//! let content = builder.add_string("Content of page 1")?;
//! builder.start_record("Page")?;
//! builder.add_field("content", FieldValue::String(content))?;
//! builder.add_field("number", FieldValue::Int(1))?;
//! let page = builder.end_record()?;
//! let buffer = builder.finish(page)?;
//! ```

use std::sync::atomic::{AtomicU32, Ordering};

use tracing::{debug, trace};

use crate::core::buffer::{
    FieldValue, FinishedBuffer, RecordRef, RootOffset, StringRef, VectorRef, RECORD_HEADER_SIZE,
    SLOT_SIZE, UOFFSET_SIZE,
};
use crate::error::{Error, Result};
use crate::schema::{FieldType, KindId, RecordDef, Schema};

const DEFAULT_CAPACITY: usize = 1024;

// Generation unik per builder / per reset, supaya handle lintas build tertolak
static NEXT_GENERATION: AtomicU32 = AtomicU32::new(1);

#[inline(always)]
fn next_generation() -> u32 {
    NEXT_GENERATION.fetch_add(1, Ordering::Relaxed)
}

/// Isi slot sebelum record ditulis
#[derive(Debug, Clone, Copy)]
enum Slot {
    /// Nilai langsung (int / enum)
    Value(i32),
    /// Target reference, diukur dari akhir buffer
    Ref(u32),
}

#[derive(Debug)]
struct OpenRecord {
    kind: KindId,
    slots: Vec<Option<Slot>>,
}

#[derive(Debug)]
struct OpenVector {
    kind: KindId,
    declared: usize,
    appended: usize,
}

/// Stack discipline builder: paling banyak satu record atau satu vector terbuka
#[derive(Debug)]
enum State {
    Idle,
    Record(OpenRecord),
    Vector(OpenVector),
}

pub struct RecordBuilder<'s> {
    schema: &'s Schema,
    buf: Vec<u8>,
    // Byte pertama yang terpakai; region terpakai = buf[head..]
    head: usize,
    state: State,
    generation: u32,
}

impl<'s> RecordBuilder<'s> {
    pub fn new(schema: &'s Schema) -> Self {
        Self::with_capacity(schema, DEFAULT_CAPACITY)
    }

    /// Pre-allocate buffer; tumbuh 2x saat penuh
    pub fn with_capacity(schema: &'s Schema, capacity: usize) -> Self {
        let capacity = capacity.max(16);
        Self {
            schema,
            buf: vec![0u8; capacity],
            head: capacity,
            state: State::Idle,
            generation: next_generation(),
        }
    }

    /// Reset untuk reuse, alokasi dipertahankan
    ///
    /// Semua handle (`StringRef`, `RecordRef`, `VectorRef`) dari sebelum reset
    /// menjadi invalid; memakainya lagi menghasilkan `Error::StaleHandle`.
    pub fn reset(&mut self) {
        self.head = self.buf.len();
        self.state = State::Idle;
        self.generation = next_generation();
    }

    /// Bytes yang sudah ditulis
    #[inline(always)]
    pub fn len(&self) -> usize {
        self.buf.len() - self.head
    }

    #[inline(always)]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn start_record(&mut self, kind: &str) -> Result<()> {
        match self.state {
            State::Idle => {}
            State::Record(_) => {
                return Err(Error::Sequencing(
                    "start_record called while another record is in progress",
                ))
            }
            State::Vector(_) => {
                return Err(Error::Sequencing(
                    "start_record called while a vector is in progress",
                ))
            }
        }

        let (kind, def) = self.schema.record(kind)?;
        // slot_count disimpan sebagai u16 di header record
        if u16::try_from(def.field_count()).is_err() {
            return Err(Error::InvalidSchema(format!(
                "record `{}` has {} fields, more than {}",
                def.name(),
                def.field_count(),
                u16::MAX
            )));
        }
        self.state = State::Record(OpenRecord {
            kind,
            slots: vec![None; def.field_count()],
        });
        Ok(())
    }

    /// Attach scalar, enum atau offset child ke record yang sedang dibangun
    ///
    /// Menulis field yang sama dua kali menimpa nilai sebelumnya.
    pub fn add_field(&mut self, name: &str, value: impl Into<FieldValue>) -> Result<()> {
        let value = value.into();
        let schema = self.schema;
        let generation = self.generation;
        let State::Record(open) = &mut self.state else {
            return Err(Error::OutOfOrder("add_field"));
        };

        let def = record_def(schema, open.kind)?;
        let (idx, field) = def.lookup(name).ok_or_else(|| Error::UnknownField {
            kind: def.name().to_string(),
            field: name.to_string(),
        })?;

        let mismatch = || Error::TypeMismatch {
            field: format!("{}.{}", def.name(), name),
            expected: field.field_type.to_string(),
            found: value.type_name(schema),
        };

        if value.generation().is_some_and(|g| g != generation) {
            return Err(Error::StaleHandle("add_field value"));
        }

        let slot = match (&field.field_type, value) {
            (FieldType::Int, FieldValue::Int(v)) => Slot::Value(v),
            (FieldType::Enum(enum_name), FieldValue::Enum(v)) => {
                let known = schema
                    .enum_def(enum_name)
                    .map(|def| def.contains(v))
                    .unwrap_or(false);
                if !known {
                    return Err(Error::InvalidEnumValue {
                        name: enum_name.clone(),
                        value: v,
                    });
                }
                Slot::Value(v)
            }
            (FieldType::String, FieldValue::String(s)) => Slot::Ref(s.offset),
            (FieldType::Record(kind), FieldValue::Record(r)) => {
                if schema.record(kind)?.0 != r.kind {
                    return Err(mismatch());
                }
                Slot::Ref(r.offset)
            }
            (FieldType::Vector(kind), FieldValue::Vector(v)) => {
                if schema.record(kind)?.0 != v.kind {
                    return Err(mismatch());
                }
                Slot::Ref(v.offset)
            }
            _ => return Err(mismatch()),
        };

        debug_assert_eq!(
            matches!(slot, Slot::Ref(_)),
            field.field_type.is_reference()
        );
        open.slots[idx] = Some(slot);
        Ok(())
    }

    /// Tulis length-prefixed, NUL-terminated UTF-8 string
    pub fn add_string(&mut self, text: &str) -> Result<StringRef> {
        if !matches!(self.state, State::Idle) {
            return Err(Error::Sequencing(
                "add_string must be called before the record that references it is started",
            ));
        }

        self.reserve(UOFFSET_SIZE + text.len() + 1)?;
        self.push(&[0])?;
        self.push(text.as_bytes())?;
        self.push(&(text.len() as u32).to_le_bytes())?;

        Ok(StringRef {
            offset: self.len() as u32,
            generation: self.generation,
        })
    }

    /// Mulai vector dengan panjang tetap
    ///
    /// Element harus di-append dalam urutan logis terbalik (element terakhir
    /// lebih dulu); reader melihatnya dalam urutan logis maju.
    pub fn start_vector(&mut self, kind: &str, element_count: usize) -> Result<()> {
        if !matches!(self.state, State::Idle) {
            return Err(Error::Sequencing(
                "start_vector called while a record or vector is in progress",
            ));
        }

        let (kind, _) = self.schema.record(kind)?;
        let total = element_count
            .checked_add(1)
            .and_then(|n| n.checked_mul(UOFFSET_SIZE))
            .ok_or(Error::CapacityExceeded(usize::MAX))?;
        self.reserve(total)?;

        self.state = State::Vector(OpenVector {
            kind,
            declared: element_count,
            appended: 0,
        });
        Ok(())
    }

    pub fn append_vector_element(&mut self, element: RecordRef) -> Result<()> {
        let schema = self.schema;
        let State::Vector(open) = &self.state else {
            return Err(Error::Sequencing(
                "append_vector_element called with no vector in progress",
            ));
        };

        if open.appended == open.declared {
            return Err(Error::VectorLengthMismatch {
                declared: open.declared,
                appended: open.appended + 1,
            });
        }
        if element.generation != self.generation {
            return Err(Error::StaleHandle("vector element"));
        }
        if element.kind != open.kind {
            return Err(Error::TypeMismatch {
                field: "vector element".to_string(),
                expected: record_def(schema, open.kind)?.name().to_string(),
                found: FieldValue::Record(element).type_name(schema),
            });
        }

        self.push_ref(element.offset)?;
        if let State::Vector(open) = &mut self.state {
            open.appended += 1;
        }
        Ok(())
    }

    pub fn end_vector(&mut self) -> Result<VectorRef> {
        let State::Vector(open) = &self.state else {
            return Err(Error::Sequencing("end_vector called with no vector in progress"));
        };
        if open.appended != open.declared {
            return Err(Error::VectorLengthMismatch {
                declared: open.declared,
                appended: open.appended,
            });
        }

        let kind = open.kind;
        let len = open.declared as u32;
        self.push(&len.to_le_bytes())?;
        self.state = State::Idle;

        Ok(VectorRef {
            offset: self.len() as u32,
            kind,
            len,
            generation: self.generation,
        })
    }

    /// Vector dari elements dalam urutan logis
    pub fn create_vector(&mut self, kind: &str, elements: &[RecordRef]) -> Result<VectorRef> {
        self.start_vector(kind, elements.len())?;
        for element in elements.iter().rev() {
            self.append_vector_element(*element)?;
        }
        self.end_vector()
    }

    /// Finalisasi layout record yang sedang dibangun
    pub fn end_record(&mut self) -> Result<RecordRef> {
        let open = match std::mem::replace(&mut self.state, State::Idle) {
            State::Record(open) => open,
            other => {
                self.state = other;
                return Err(Error::OutOfOrder("end_record"));
            }
        };

        let slot_count = open.slots.len();
        // start_record sudah menolak record dengan > u16::MAX field
        let header_count = u16::try_from(slot_count).map_err(|_| {
            Error::InvalidSchema(format!("{slot_count} slots do not fit a record header"))
        })?;
        let bitmap_size = RecordDef::bitmap_size(slot_count);
        self.reserve(RECORD_HEADER_SIZE + bitmap_size + slot_count * SLOT_SIZE)?;

        // Slot ditulis dari belakang agar slot 0 berada tepat setelah bitmap
        for slot in open.slots.iter().rev() {
            match slot {
                None => self.push(&0u32.to_le_bytes())?,
                Some(Slot::Value(v)) => self.push(&v.to_le_bytes())?,
                Some(Slot::Ref(target)) => self.push_ref(*target)?,
            }
        }

        let mut bitmap = vec![0u8; bitmap_size];
        for (idx, slot) in open.slots.iter().enumerate() {
            if slot.is_some() {
                bitmap[idx / 8] |= 1 << (idx % 8);
            }
        }
        self.push(&bitmap)?;
        self.push(&header_count.to_le_bytes())?;
        self.push(&open.kind.to_le_bytes())?;

        trace!(kind = open.kind, slots = slot_count, at = self.len(), "record written");

        Ok(RecordRef {
            offset: self.len() as u32,
            kind: open.kind,
            generation: self.generation,
        })
    }

    /// Seal buffer dengan root record; builder dikonsumsi
    pub fn finish(mut self, root: RecordRef) -> Result<FinishedBuffer> {
        if !matches!(self.state, State::Idle) {
            return Err(Error::Sequencing(
                "finish called while a record or vector is in progress",
            ));
        }
        if root.generation != self.generation {
            return Err(Error::StaleHandle("finish root"));
        }
        if root.offset == 0 || root.offset as usize > self.len() {
            return Err(Error::InvalidRoot {
                root: root.offset as usize,
                len: self.len(),
            });
        }

        self.push_ref(root.offset)?;

        let len = self.len();
        let root = RootOffset(len as u32 - root.offset);
        let mut bytes = std::mem::take(&mut self.buf);
        bytes.drain(..self.head);

        debug!(len, root = root.get(), "buffer finished");

        Ok(FinishedBuffer::new(bytes.into_boxed_slice(), root))
    }

    /// Pastikan ada ruang `additional` bytes di depan head
    fn reserve(&mut self, additional: usize) -> Result<()> {
        if additional <= self.head {
            return Ok(());
        }

        let used = self.len();
        let needed = used
            .checked_add(additional)
            .ok_or(Error::CapacityExceeded(usize::MAX))?;
        if needed > u32::MAX as usize {
            return Err(Error::CapacityExceeded(needed));
        }

        let mut new_len = self.buf.len().max(16);
        while new_len < needed {
            new_len *= 2;
        }
        let new_len = new_len.min(u32::MAX as usize);

        let mut grown = vec![0u8; new_len];
        grown[new_len - used..].copy_from_slice(&self.buf[self.head..]);
        self.buf = grown;
        self.head = new_len - used;
        Ok(())
    }

    #[inline(always)]
    fn push(&mut self, bytes: &[u8]) -> Result<()> {
        self.reserve(bytes.len())?;
        self.head -= bytes.len();
        self.buf[self.head..self.head + bytes.len()].copy_from_slice(bytes);
        Ok(())
    }

    /// Tulis reference relative ke target yang sudah ada di buffer
    fn push_ref(&mut self, target: u32) -> Result<()> {
        if target == 0 || target as usize > self.len() {
            return Err(Error::Malformed {
                offset: target as usize,
                reason: "reference to data not written by this builder",
            });
        }
        let at = self.len() + UOFFSET_SIZE;
        let rel = (at - target as usize) as u32;
        self.push(&rel.to_le_bytes())
    }
}

fn record_def(schema: &Schema, kind: KindId) -> Result<&RecordDef> {
    schema
        .record_by_id(kind)
        .ok_or_else(|| Error::UnknownKind(format!("#{kind}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{EnumDef, FieldType, RecordDef};

    fn schema() -> Schema {
        Schema::new()
            .with_enum(EnumDef::new("Shade", [("none", 0), ("dark", 1)]))
            .with_record(
                RecordDef::new("Item")
                    .field("label", FieldType::String)
                    .field("weight", FieldType::Int),
            )
            .with_record(
                RecordDef::new("Box")
                    .field("shade", FieldType::Enum("Shade".into()))
                    .field("items", FieldType::Vector("Item".into()))
                    .field("best", FieldType::Record("Item".into())),
            )
    }

    #[test]
    fn test_string_layout() {
        let schema = schema();
        let mut builder = RecordBuilder::new(&schema);

        let s = builder.add_string("abc").unwrap();
        assert_eq!(s.offset, 8); // 4 len + 3 bytes + NUL
        assert_eq!(builder.len(), 8);
        assert_eq!(&builder.buf[builder.head..], &[3, 0, 0, 0, b'a', b'b', b'c', 0]);
    }

    #[test]
    fn test_record_layout() {
        let schema = schema();
        let mut builder = RecordBuilder::new(&schema);

        builder.start_record("Item").unwrap();
        builder.add_field("weight", 7).unwrap();
        let item = builder.end_record().unwrap();

        // kind 0, 2 slots, bitmap 0b10, slot0 kosong, slot1 = 7
        assert_eq!(item.offset, 4 + 1 + 8);
        assert_eq!(
            &builder.buf[builder.head..],
            &[0, 0, 2, 0, 0b10, 0, 0, 0, 0, 7, 0, 0, 0]
        );
    }

    #[test]
    fn test_growth_preserves_content() {
        let schema = schema();
        let mut builder = RecordBuilder::with_capacity(&schema, 16);

        let long = "x".repeat(100);
        let first = builder.add_string("first").unwrap();
        builder.add_string(&long).unwrap();
        assert!(builder.buf.len() >= builder.len());

        // String pertama masih ada di akhir buffer
        let tail = &builder.buf[builder.buf.len() - first.offset as usize..];
        assert_eq!(&tail[4..9], b"first");
    }

    #[test]
    fn test_nested_start_is_sequencing_error() {
        let schema = schema();
        let mut builder = RecordBuilder::new(&schema);

        builder.start_record("Box").unwrap();
        assert!(matches!(
            builder.start_record("Item"),
            Err(Error::Sequencing(_))
        ));
        assert!(matches!(builder.add_string("late"), Err(Error::Sequencing(_))));
        assert!(matches!(
            builder.start_vector("Item", 0),
            Err(Error::Sequencing(_))
        ));
    }

    #[test]
    fn test_add_field_after_end_is_out_of_order() {
        let schema = schema();
        let mut builder = RecordBuilder::new(&schema);

        builder.start_record("Item").unwrap();
        builder.end_record().unwrap();
        assert!(matches!(
            builder.add_field("weight", 1),
            Err(Error::OutOfOrder(_))
        ));
        assert!(matches!(builder.end_record(), Err(Error::OutOfOrder(_))));
    }

    #[test]
    fn test_unknown_field_and_kind() {
        let schema = schema();
        let mut builder = RecordBuilder::new(&schema);

        assert!(matches!(
            builder.start_record("Crate"),
            Err(Error::UnknownKind(_))
        ));
        builder.start_record("Item").unwrap();
        assert!(matches!(
            builder.add_field("colour", 1),
            Err(Error::UnknownField { .. })
        ));
    }

    #[test]
    fn test_type_checks() {
        let schema = schema();
        let mut builder = RecordBuilder::new(&schema);

        builder.start_record("Item").unwrap();
        let item = builder.end_record().unwrap();

        builder.start_record("Box").unwrap();
        assert!(matches!(
            builder.add_field("shade", FieldValue::Int(1)),
            Err(Error::TypeMismatch { .. })
        ));
        assert!(matches!(
            builder.add_field("shade", FieldValue::Enum(9)),
            Err(Error::InvalidEnumValue { value: 9, .. })
        ));
        builder.add_field("shade", FieldValue::Enum(1)).unwrap();
        builder.add_field("best", item).unwrap();
        let boxed = builder.end_record().unwrap();

        // Record kind Box tidak boleh masuk slot kind Item
        builder.start_record("Box").unwrap();
        assert!(matches!(
            builder.add_field("best", boxed),
            Err(Error::TypeMismatch { .. })
        ));
    }

    #[test]
    fn test_vector_count_enforced() {
        let schema = schema();
        let mut builder = RecordBuilder::new(&schema);

        builder.start_record("Item").unwrap();
        let item = builder.end_record().unwrap();

        builder.start_vector("Item", 2).unwrap();
        builder.append_vector_element(item).unwrap();
        assert!(matches!(
            builder.end_vector(),
            Err(Error::VectorLengthMismatch {
                declared: 2,
                appended: 1
            })
        ));
        builder.append_vector_element(item).unwrap();
        assert!(matches!(
            builder.append_vector_element(item),
            Err(Error::VectorLengthMismatch {
                declared: 2,
                appended: 3
            })
        ));
        let vector = builder.end_vector().unwrap();
        assert_eq!(vector.len(), 2);
    }

    #[test]
    fn test_vector_element_kind_checked() {
        let schema = schema();
        let mut builder = RecordBuilder::new(&schema);

        builder.start_record("Box").unwrap();
        let boxed = builder.end_record().unwrap();

        builder.start_vector("Item", 1).unwrap();
        assert!(matches!(
            builder.append_vector_element(boxed),
            Err(Error::TypeMismatch { .. })
        ));
    }

    #[test]
    fn test_vector_ops_without_open_vector() {
        let schema = schema();
        let mut builder = RecordBuilder::new(&schema);

        builder.start_record("Item").unwrap();
        let item = builder.end_record().unwrap();
        assert!(matches!(
            builder.append_vector_element(item),
            Err(Error::Sequencing(_))
        ));
        assert!(matches!(builder.end_vector(), Err(Error::Sequencing(_))));
    }

    #[test]
    fn test_finish_requires_idle() {
        let schema = schema();
        let mut builder = RecordBuilder::new(&schema);

        builder.start_record("Item").unwrap();
        let item = builder.end_record().unwrap();
        builder.start_record("Item").unwrap();
        assert!(matches!(builder.finish(item), Err(Error::Sequencing(_))));
    }

    #[test]
    fn test_finish_rejects_foreign_root() {
        let schema = schema();
        let builder = RecordBuilder::new(&schema);
        let bogus = RecordRef {
            offset: 64,
            kind: 0,
            generation: builder.generation,
        };
        assert!(matches!(builder.finish(bogus), Err(Error::InvalidRoot { .. })));
    }

    #[test]
    fn test_reset_reuses_builder() {
        let schema = schema();
        let mut builder = RecordBuilder::new(&schema);

        builder.add_string("scratch").unwrap();
        builder.start_record("Item").unwrap();
        builder.reset();
        assert!(builder.is_empty());

        builder.start_record("Item").unwrap();
        let item = builder.end_record().unwrap();
        let finished = builder.finish(item).unwrap();
        assert_eq!(finished.root().get(), 4);
    }

    #[test]
    fn test_oversized_record_rejected() {
        let wide = (0..=u16::MAX as usize).fold(RecordDef::new("Wide"), |def, n| {
            def.field(format!("f{n}"), FieldType::Int)
        });
        let schema = Schema::new().with_record(wide);
        let mut builder = RecordBuilder::new(&schema);

        // 65536 slot tidak muat di header u16, jadi tidak boleh terpotong diam-diam
        assert!(matches!(
            builder.start_record("Wide"),
            Err(Error::InvalidSchema(_))
        ));
        assert!(matches!(
            builder.add_field("f0", 42),
            Err(Error::OutOfOrder(_))
        ));
        assert!(builder.is_empty());
    }

    #[test]
    fn test_reset_invalidates_handles() {
        let schema = schema();
        let mut builder = RecordBuilder::new(&schema);

        let label = builder.add_string("old label").unwrap();
        builder.start_record("Item").unwrap();
        builder.add_field("label", label).unwrap();
        let stale = builder.end_record().unwrap();

        builder.reset();
        // Offset lama masih di dalam batas buffer baru
        builder.add_string(&"x".repeat(64)).unwrap();

        builder.start_record("Item").unwrap();
        assert!(matches!(
            builder.add_field("label", label),
            Err(Error::StaleHandle(_))
        ));
        builder.end_record().unwrap();

        builder.start_vector("Item", 1).unwrap();
        assert!(matches!(
            builder.append_vector_element(stale),
            Err(Error::StaleHandle(_))
        ));
        builder.reset();

        builder.start_record("Item").unwrap();
        builder.end_record().unwrap();
        assert!(matches!(builder.finish(stale), Err(Error::StaleHandle(_))));
    }

    #[test]
    fn test_handle_from_other_builder_rejected() {
        let schema = schema();
        let mut first = RecordBuilder::new(&schema);
        let mut second = RecordBuilder::new(&schema);

        first.start_record("Item").unwrap();
        let foreign = first.end_record().unwrap();

        second.start_record("Item").unwrap();
        second.end_record().unwrap();
        second.start_record("Box").unwrap();
        assert!(matches!(
            second.add_field("best", foreign),
            Err(Error::StaleHandle(_))
        ));
    }
}
