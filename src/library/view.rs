use std::fmt::Write as _;

use super::Genre;
use crate::core::{FieldValue, FinishedBuffer, RecordBuilder, RecordReader, RecordRef};
use crate::error::{Error, Result};
use crate::schema::{FieldType, RecordDef, Schema};

pub const LIBRARY: &str = "Library";
pub const PAGE: &str = "Page";

pub fn library_schema() -> Schema {
    Schema::new()
        .with_enum(Genre::enum_def())
        .with_record(
            RecordDef::new(PAGE)
                .field("content", FieldType::String)
                .field("number", FieldType::Int),
        )
        .with_record(
            RecordDef::new(LIBRARY)
                .field("title", FieldType::String)
                .field("genre", FieldType::Enum("Genre".into()))
                .field("pages", FieldType::Vector(PAGE.into())),
        )
}

/// Owned page, sisi tulis
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PageData {
    pub number: i32,
    pub content: String,
}

impl PageData {
    pub fn new(number: i32, content: impl Into<String>) -> Self {
        Self {
            number,
            content: content.into(),
        }
    }
}

/// Owned library, sisi tulis
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct LibraryData {
    pub title: String,
    pub genre: Genre,
    pub pages: Vec<PageData>,
}

/// Tulis library lengkap ke builder, child lebih dulu
pub fn write_library(builder: &mut RecordBuilder<'_>, data: &LibraryData) -> Result<RecordRef> {
    let mut pages = Vec::with_capacity(data.pages.len());
    for page in &data.pages {
        let content = builder.add_string(&page.content)?;
        builder.start_record(PAGE)?;
        builder.add_field("content", content)?;
        builder.add_field("number", page.number)?;
        pages.push(builder.end_record()?);
    }
    let pages = builder.create_vector(PAGE, &pages)?;
    let title = builder.add_string(&data.title)?;

    builder.start_record(LIBRARY)?;
    builder.add_field("title", title)?;
    builder.add_field("genre", FieldValue::Enum(data.genre as i32))?;
    builder.add_field("pages", pages)?;
    builder.end_record()
}

pub fn encode_library(schema: &Schema, data: &LibraryData) -> Result<FinishedBuffer> {
    let mut builder = RecordBuilder::new(schema);
    let root = write_library(&mut builder, data)?;
    builder.finish(root)
}

/// Typed view ke record `Library`
#[derive(Debug, Clone, Copy)]
pub struct LibraryView<'a> {
    record: RecordReader<'a>,
}

impl<'a> LibraryView<'a> {
    pub fn new(record: RecordReader<'a>) -> Result<Self> {
        if record.kind_name() != LIBRARY {
            return Err(Error::KindMismatch {
                expected: LIBRARY.to_string(),
                found: record.kind(),
            });
        }
        Ok(Self { record })
    }

    pub fn open(buffer: &'a FinishedBuffer, schema: &'a Schema) -> Result<Self> {
        Self::new(buffer.reader(schema, LIBRARY)?)
    }

    pub fn title(&self) -> Result<&'a str> {
        self.record.get_string("title")
    }

    pub fn genre(&self) -> Result<Genre> {
        let value = self.record.get_enum("genre")?;
        Genre::from_i32(value).ok_or(Error::InvalidEnumValue {
            name: "Genre".to_string(),
            value,
        })
    }

    pub fn page_count(&self) -> Result<usize> {
        self.record.get_vector_length("pages")
    }

    pub fn page(&self, index: usize) -> Result<PageView<'a>> {
        self.record
            .get_vector_element("pages", index)
            .map(|record| PageView { record })
    }

    pub fn pages(&self) -> Result<impl Iterator<Item = Result<PageView<'a>>>> {
        let pages = self.record.vector("pages")?;
        Ok(pages.into_iter().map(|page| page.map(|record| PageView { record })))
    }

    /// Copy semua field ke struct owned
    pub fn to_data(&self) -> Result<LibraryData> {
        let pages = self
            .pages()?
            .map(|page| page.and_then(|page| page.to_data()))
            .collect::<Result<Vec<_>>>()?;
        Ok(LibraryData {
            title: self.title()?.to_string(),
            genre: self.genre()?,
            pages,
        })
    }
}

/// Typed view ke record `Page`
#[derive(Debug, Clone, Copy)]
pub struct PageView<'a> {
    record: RecordReader<'a>,
}

impl<'a> PageView<'a> {
    pub fn number(&self) -> Result<i32> {
        self.record.get_int("number")
    }

    pub fn content(&self) -> Result<&'a str> {
        self.record.get_string("content")
    }

    pub fn to_data(&self) -> Result<PageData> {
        Ok(PageData {
            number: self.number()?,
            content: self.content()?.to_string(),
        })
    }
}

/// Format tekstual tetap: title, genre, lalu satu baris per page
///
/// ```text
/// Title: <title>
/// Genre: <genre>
/// - [<number>] <content>
/// ```
pub fn render(library: &LibraryView<'_>) -> Result<String> {
    let mut out = String::new();
    // write! ke String tidak pernah gagal
    let _ = writeln!(out, "Title: {}", library.title()?);
    let _ = writeln!(out, "Genre: {}", library.genre()?);
    for page in library.pages()? {
        let page = page?;
        let _ = writeln!(out, "- [{}] {}", page.number()?, page.content()?);
    }
    Ok(out)
}
