//! Library Layer: Typed accessors untuk schema `Library` / `Page`
//!
//! Schema:
//! ```text
//! enum Genre { unknown = 0, adventure = 1, fantasy = 2, mystery = 3, science = 4 }
//! record Page    { content: string, number: int }
//! record Library { title: string, genre: Genre, pages: [Page] }
//! ```
//!
//! Layer ini adalah wrapper tipis di atas `RecordBuilder` / `RecordReader`,
//! ditulis tangan sebagai pengganti kode hasil schema compiler.

mod genre;
mod view;

pub use genre::Genre;
pub use view::{
    encode_library, library_schema, render, write_library, LibraryData, LibraryView, PageData,
    PageView, LIBRARY, PAGE,
};
