//! Tome Demo - Library Round Trip
//!
//! Build record `Library` dengan page-page nya, serialize ke satu flat buffer,
//! baca kembali tanpa copy, lalu print.
//!
//! Usage:
//!   cargo run --release -- [OPTIONS]

use std::path::PathBuf;
use std::time::Instant;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use tome::core::{write_buffer_file, MappedBuffer};
use tome::library::{encode_library, library_schema, render, Genre, LibraryData, LibraryView, PageData};

/// Demo configuration
#[derive(Debug, Parser)]
#[command(author, version, about = "Build, serialize and read back a library record")]
struct DemoConfig {
    /// Library title
    #[arg(short, long, default_value = "Title")]
    title: String,

    /// Library genre (unknown, adventure, fantasy, mystery, science)
    #[arg(short, long, default_value = "adventure")]
    genre: Genre,

    /// Page contents, numbered from 1 in the given order
    #[arg(short, long = "page", value_name = "CONTENT")]
    pages: Vec<String>,

    /// Persist the buffer to this file and read it back through mmap
    #[arg(short, long)]
    output: Option<PathBuf>,
}

impl DemoConfig {
    fn library(&self) -> LibraryData {
        let pages = if self.pages.is_empty() {
            vec![
                PageData::new(1, "Content of page 1"),
                PageData::new(2, "Content of page 2"),
            ]
        } else {
            self.pages
                .iter()
                .enumerate()
                .map(|(idx, content)| PageData::new(idx as i32 + 1, content.as_str()))
                .collect()
        };

        LibraryData {
            title: self.title.clone(),
            genre: self.genre,
            pages,
        }
    }
}

fn run(config: DemoConfig) -> tome::Result<()> {
    let schema = library_schema();
    schema.validate()?;

    let data = config.library();
    let start = Instant::now();
    let buffer = encode_library(&schema, &data)?;
    tracing::info!(
        bytes = buffer.len(),
        pages = data.pages.len(),
        elapsed_ns = start.elapsed().as_nanos() as u64,
        "library encoded"
    );

    let text = match &config.output {
        Some(path) => {
            write_buffer_file(path, &buffer)?;
            let mapped = MappedBuffer::open(path)?;
            let view = LibraryView::new(mapped.reader(&schema, tome::library::LIBRARY)?)?;
            tracing::info!(path = %mapped.path().display(), "read back through mmap");
            render(&view)?
        }
        None => render(&LibraryView::open(&buffer, &schema)?)?,
    };

    print!("{text}");
    Ok(())
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let config = DemoConfig::parse();

    if let Err(e) = run(config) {
        eprintln!("❌ Error: {}", e);
        std::process::exit(1);
    }
}
