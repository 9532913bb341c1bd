//! Decode and shape throughput benchmarks.
//!
//! Measures the single-core data path for one dump file:
//! gzip chunks -> lines -> pageview rows -> batches.

use std::io::Write;

use chrono::Utc;
use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use flate2::Compression;
use flate2::write::GzEncoder;

use flurry::partition::Partition;
use flurry::pipeline::Batcher;
use flurry::record::{RowContext, RowShaper};
use flurry::source::LineDecoder;

const PROJECTS: &[&str] = &["en.wikipedia", "fr.wikipedia", "de.wikipedia", "ja.wikipedia", "commons.m"];

/// Deterministic dump contents resembling an hourly pageviews file.
fn generate_dump(lines: usize) -> Vec<u8> {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    for i in 0..lines {
        let project = PROJECTS[i % PROJECTS.len()];
        writeln!(encoder, "{project} Article_{i} {} 0", i % 977 + 1).unwrap();
    }
    encoder.finish().unwrap()
}

fn decode_and_shape(c: &mut Criterion) {
    let mut group = c.benchmark_group("decode_shape");
    let shaper = RowShaper::new(vec!["en".to_string()]);
    let ctx = RowContext {
        partition: Partition::from_filename("pageviews-20240115-070000.gz").unwrap(),
        ingested_at: Utc::now(),
    };

    for line_count in [10_000, 100_000, 500_000] {
        let compressed = generate_dump(line_count);

        group.throughput(Throughput::Elements(line_count as u64));
        group.sample_size(10);

        group.bench_with_input(
            BenchmarkId::new("gzip_lines_to_batches", line_count),
            &compressed,
            |b, data| {
                b.iter(|| {
                    let mut decoder = LineDecoder::new();
                    let mut batcher = Batcher::new(10_000);
                    let mut rows = 0usize;

                    let mut drain = |decoder: &mut LineDecoder, rows: &mut usize| {
                        while let Some(line) = decoder.next_line() {
                            if let Ok(row) = shaper.shape(&line, &ctx)
                                && let Some(batch) = batcher.push(row)
                            {
                                *rows += batch.len();
                            }
                        }
                    };

                    for chunk in data.chunks(64 * 1024) {
                        decoder.feed(chunk).unwrap();
                        drain(&mut decoder, &mut rows);
                    }
                    decoder.finish().unwrap();
                    drain(&mut decoder, &mut rows);
                    rows += batcher.finish().map_or(0, |batch| batch.len());

                    rows
                });
            },
        );
    }

    group.finish();
}

criterion_group!(benches, decode_and_shape);
criterion_main!(benches);
