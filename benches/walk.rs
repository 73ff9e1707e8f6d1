//! Benchmarks for container walking and metadata decoding.
//!
//! Run with: cargo bench

use std::hint::black_box;
use std::io;

use criterion::{Criterion, criterion_group, criterion_main};

use hdcont::{Codec, Container, ExthEntries, WalkOptions, detect_image_format, walk};

/// Metadata block with `n` string entries.
fn build_exth(n: usize) -> Vec<u8> {
    let payload = b"Some Author Name";
    let mut data = Vec::new();
    data.extend_from_slice(&((8 + n * (8 + payload.len())) as u32).to_be_bytes());
    data.extend_from_slice(&(n as u32).to_be_bytes());
    for _ in 0..n {
        data.extend_from_slice(&100u32.to_be_bytes());
        data.extend_from_slice(&((8 + payload.len()) as u32).to_be_bytes());
        data.extend_from_slice(payload);
    }
    data
}

/// Container with a CONT header and `n` RESC records.
fn build_container(n: usize) -> Vec<u8> {
    let mut cont = vec![0u8; 48];
    cont[0..4].copy_from_slice(b"CONT");
    cont[0x0C..0x10].copy_from_slice(&65001u32.to_be_bytes());
    cont[0x28..0x2C].copy_from_slice(&48u32.to_be_bytes());
    cont.extend(build_exth(32));

    let resc = b"RESC\0\0\0\x01<resource/>";
    let count = n + 1;
    let mut data = vec![0u8; 78];
    data[0x3C..0x44].copy_from_slice(b"RBINCONT");
    data[76..78].copy_from_slice(&(count as u16).to_be_bytes());
    let mut offset = 78 + count * 8;
    for i in 0..count {
        data.extend_from_slice(&(offset as u32).to_be_bytes());
        data.extend_from_slice(&(i as u32).to_be_bytes());
        offset += if i == 0 { cont.len() } else { resc.len() };
    }
    data.extend(&cont);
    for _ in 0..n {
        data.extend_from_slice(resc);
    }
    data
}

fn bench_exth(c: &mut Criterion) {
    let block = build_exth(256);
    c.bench_function("exth_decode_256", |b| {
        b.iter(|| ExthEntries::new(Codec::Utf8, black_box(&block)).count())
    });
}

fn bench_walk(c: &mut Criterion) {
    let data = build_container(2000);
    let options = WalkOptions {
        extract: false,
        ..Default::default()
    };
    c.bench_function("walk_2000_records", |b| {
        b.iter(|| {
            let container = Container::open(black_box(&data)).unwrap();
            walk(&container, &options, &mut io::sink()).unwrap()
        })
    });
}

fn bench_sniff(c: &mut Criterion) {
    let mut bare_jpeg = vec![0xFF, 0xD8];
    bare_jpeg.extend(std::iter::repeat_n(0x42u8, 64 * 1024));
    bare_jpeg.extend([0xFF, 0xD9]);
    bare_jpeg.extend([0u8; 4096]);
    c.bench_function("sniff_bare_jpeg", |b| {
        b.iter(|| detect_image_format(black_box(&bare_jpeg)))
    });
}

criterion_group!(benches, bench_exth, bench_walk, bench_sniff);
criterion_main!(benches);
