use std::collections::HashSet;

use super::{EnumDef, FieldType, RecordDef};
use crate::error::{Error, Result};

/// Kind ID = index record di schema, disimpan sebagai u16 di header record
pub type KindId = u16;

/// Kumpulan record kind dan enum
///
/// Schema immutable setelah dibangun; builder dan reader hanya meminjamnya.
#[derive(Debug, Clone, Default)]
pub struct Schema {
    records: Vec<RecordDef>,
    enums: Vec<EnumDef>,
}

impl Schema {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_enum(mut self, def: EnumDef) -> Self {
        self.enums.push(def);
        self
    }

    pub fn with_record(mut self, def: RecordDef) -> Self {
        self.records.push(def);
        self
    }

    /// Lookup record kind by name
    pub fn record(&self, kind: &str) -> Result<(KindId, &RecordDef)> {
        let idx = self
            .records
            .iter()
            .position(|def| def.name() == kind)
            .ok_or_else(|| Error::UnknownKind(kind.to_string()))?;
        let id = KindId::try_from(idx).map_err(|_| {
            Error::InvalidSchema(format!("record kind `{kind}` is beyond kind id {}", KindId::MAX))
        })?;
        Ok((id, &self.records[idx]))
    }

    pub fn record_by_id(&self, id: KindId) -> Option<&RecordDef> {
        self.records.get(id as usize)
    }

    pub fn enum_def(&self, name: &str) -> Option<&EnumDef> {
        self.enums.iter().find(|def| def.name() == name)
    }

    /// Validasi referensi antar definisi
    ///
    /// Setiap `Record`/`Vector` harus menunjuk kind yang ada, setiap `Enum`
    /// harus menunjuk enum yang ada, nama field unik, dan jumlah kind/field muat u16.
    pub fn validate(&self) -> Result<()> {
        if self.records.len() > KindId::MAX as usize {
            return Err(Error::InvalidSchema(format!(
                "{} record kinds exceed the u16 kind id range",
                self.records.len()
            )));
        }

        let mut kinds = HashSet::new();
        for record in &self.records {
            if !kinds.insert(record.name()) {
                return Err(Error::InvalidSchema(format!(
                    "duplicate record kind `{}`",
                    record.name()
                )));
            }
        }

        for record in &self.records {
            if record.field_count() > u16::MAX as usize {
                return Err(Error::InvalidSchema(format!(
                    "record `{}` has too many fields",
                    record.name()
                )));
            }

            let mut names = HashSet::new();
            for field in record.fields() {
                if !names.insert(field.name.as_str()) {
                    return Err(Error::InvalidSchema(format!(
                        "duplicate field `{}` in record `{}`",
                        field.name,
                        record.name()
                    )));
                }

                match &field.field_type {
                    FieldType::Record(kind) | FieldType::Vector(kind) => {
                        if !kinds.contains(kind.as_str()) {
                            return Err(Error::InvalidSchema(format!(
                                "field `{}.{}` references unknown kind `{kind}`",
                                record.name(),
                                field.name
                            )));
                        }
                    }
                    FieldType::Enum(name) => {
                        if self.enum_def(name).is_none() {
                            return Err(Error::InvalidSchema(format!(
                                "field `{}.{}` references unknown enum `{name}`",
                                record.name(),
                                field.name
                            )));
                        }
                    }
                    FieldType::String | FieldType::Int => {}
                }
            }
        }

        Ok(())
    }
}
