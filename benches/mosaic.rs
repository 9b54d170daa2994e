//! Criterion benchmarks for the mosaic conversion hot paths.
//!
//! Run with: cargo bench --bench mosaic
//!
//! These benchmarks track regression in:
//! - detile() and tile() on typical EPI canvases
//! - CSA header decode/encode
//! - frames_to_volume() serial vs rayon

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use medconv::convert::{frames_to_volume, ConvertConfig};
use medconv::csa::{self, Element, HeaderBlock, ItemLengthMode};
use medconv::dicom::{tags, InMemoryDataset};
use medconv::geometry::{detile, tile, MosaicLayout};
use ndarray::Array2;

/// Canvas with a ramp so tiles differ
fn create_canvas(size: usize) -> Array2<i16> {
    Array2::from_shape_fn((size, size), |(r, c)| ((r * size + c) % 4096) as i16)
}

fn create_csa(slices: usize) -> HeaderBlock {
    let mut block = HeaderBlock::new();
    block.insert(
        csa::NUMBER_OF_IMAGES_IN_MOSAIC,
        Element::new(1, "US", 6).with_items([slices.to_string()]),
    );
    block.insert(
        csa::SLICE_NORMAL_VECTOR,
        Element::new(3, "FD", 4).with_items(["0.0", "0.0", "1.0"]),
    );
    // pad with the kind of bulk a scanner writes
    for i in 0..100 {
        block.insert(
            format!("Element{i}"),
            Element::new(1, "DS", 3).with_items([format!("{}.{}", i, i * 7)]),
        );
    }
    block
}

fn create_frame(instance: i32, size: usize, csa_bytes: &[u8]) -> InMemoryDataset {
    InMemoryDataset::new()
        .with(tags::INSTANCE_NUMBER, instance)
        .with(tags::IMAGE_ORIENTATION_PATIENT, vec![1.0, 0.0, 0.0, 0.0, 1.0, 0.0])
        .with(tags::IMAGE_POSITION_PATIENT, vec![-960.0, -960.0, -50.0])
        .with(tags::PIXEL_SPACING, vec![3.0, 3.0])
        .with(tags::ROWS, size as i64)
        .with(tags::COLUMNS, size as i64)
        .with(tags::SPACING_BETWEEN_SLICES, 3.3)
        .with(tags::REPETITION_TIME, 2000.0)
        .with(tags::CSA_PRIVATE_CREATOR, tags::CSA_CREATOR_ID)
        .with(tags::CSA_IMAGE_HEADER_INFO, csa_bytes.to_vec())
        .with_pixels(create_canvas(size))
}

/// Benchmark detile() and tile() for common mosaic sizes
fn bench_tiling(c: &mut Criterion) {
    let mut group = c.benchmark_group("tiling");

    // (slices, canvas size)
    for &(slices, size) in &[(36, 384), (64, 512), (72, 864)] {
        let layout = MosaicLayout::new(slices, size, size).unwrap();
        let canvas = create_canvas(size);
        let volume = detile(canvas.view(), &layout).unwrap();
        let label = format!("{slices} slices on {size}x{size}");

        group.throughput(Throughput::Bytes((size * size * 2) as u64));
        group.bench_with_input(BenchmarkId::new("detile", &label), &canvas, |b, canvas| {
            b.iter(|| black_box(detile(black_box(canvas.view()), &layout).unwrap()))
        });
        group.bench_with_input(BenchmarkId::new("tile", &label), &volume, |b, volume| {
            b.iter(|| black_box(tile(black_box(volume.view()), &layout).unwrap()))
        });
    }

    group.finish();
}

/// Benchmark CSA decode and encode
fn bench_csa(c: &mut Criterion) {
    let mut group = c.benchmark_group("csa");
    let block = create_csa(36);
    let bytes = block.to_bytes(ItemLengthMode::NulTerminated).unwrap();

    group.throughput(Throughput::Bytes(bytes.len() as u64));
    group.bench_function("decode", |b| {
        b.iter(|| black_box(csa::decode(black_box(&bytes)).unwrap()))
    });
    group.bench_function("encode", |b| {
        b.iter(|| black_box(csa::encode(black_box(&block), ItemLengthMode::NulTerminated).unwrap()))
    });

    group.finish();
}

/// Benchmark frames_to_volume() on a short BOLD run
fn bench_frames_to_volume(c: &mut Criterion) {
    let mut group = c.benchmark_group("frames_to_volume");
    group.sample_size(20);

    let csa_bytes = create_csa(36)
        .to_bytes(ItemLengthMode::NulTerminated)
        .unwrap();
    let frames: Vec<_> = (1..=40).map(|i| create_frame(i, 384, &csa_bytes)).collect();

    for parallel in [false, true] {
        let config = ConvertConfig::default().parallel(parallel);
        let label = if parallel { "rayon" } else { "serial" };
        group.bench_with_input(BenchmarkId::new(label, "40x384x384"), &config, |b, config| {
            b.iter(|| black_box(frames_to_volume(black_box(&frames), config).unwrap()))
        });
    }

    group.finish();
}

criterion_group!(benches, bench_tiling, bench_csa, bench_frames_to_volume);
criterion_main!(benches);
