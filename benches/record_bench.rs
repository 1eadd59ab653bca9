//! Criterion benchmark untuk RecordBuilder / RecordReader
//!
//! Run dengan: cargo bench

use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};
use tome::library::{
    encode_library, library_schema, write_library, Genre, LibraryData, LibraryView, PageData,
};
use tome::RecordBuilder;

fn library(pages: i32) -> LibraryData {
    LibraryData {
        title: "Benchmark".to_string(),
        genre: Genre::Fantasy,
        pages: (1..=pages)
            .map(|n| PageData::new(n, format!("Content of page {n}")))
            .collect(),
    }
}

fn bench_build(c: &mut Criterion) {
    let mut group = c.benchmark_group("build");
    let schema = library_schema();

    for pages in [2, 64, 1024].iter() {
        let data = library(*pages);
        group.throughput(Throughput::Elements(*pages as u64));

        // Builder baru per iterasi
        group.bench_function(format!("encode_{}", pages), |b| {
            b.iter(|| encode_library(black_box(&schema), black_box(&data)).unwrap());
        });

        // Builder di-reset, alokasi dipakai ulang
        group.bench_function(format!("reuse_{}", pages), |b| {
            let mut builder = RecordBuilder::with_capacity(&schema, 64 * 1024);
            b.iter(|| {
                builder.reset();
                black_box(write_library(&mut builder, black_box(&data)).unwrap());
            });
        });
    }

    group.finish();
}

fn bench_read(c: &mut Criterion) {
    let mut group = c.benchmark_group("read");
    let schema = library_schema();
    let buffer = encode_library(&schema, &library(1024)).unwrap();

    group.throughput(Throughput::Elements(1));
    group.bench_function("open_and_title", |b| {
        b.iter(|| {
            let view = LibraryView::open(black_box(&buffer), &schema).unwrap();
            black_box(view.title().unwrap());
        });
    });

    group.throughput(Throughput::Elements(1024));
    group.bench_function("scan_pages", |b| {
        let view = LibraryView::open(&buffer, &schema).unwrap();
        b.iter(|| {
            let mut sum = 0i64;
            for page in view.pages().unwrap() {
                sum += page.unwrap().number().unwrap() as i64;
            }
            black_box(sum)
        });
    });

    group.finish();
}

criterion_group!(benches, bench_build, bench_read);
criterion_main!(benches);
