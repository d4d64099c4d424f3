//! Benchmarks for the alignment stages
//!
//! Feature extraction, descriptor matching, frame warping and the full
//! pipeline on synthetic panned sequences.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use focus_align::prelude::*;
use image::{GrayImage, Luma};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::time::Duration;

/// Random squares on a dark background, panned right by `shift` pixels.
fn create_panned_pair(size: u32, shift: u32) -> (GrayImage, GrayImage) {
    let mut rng = StdRng::seed_from_u64(3);
    let mut base = GrayImage::from_pixel(size + shift, size, Luma([20]));
    for _ in 0..(size * size / 240) {
        let s = rng.gen_range(4..13);
        let x0 = rng.gen_range(0..size + shift - s);
        let y0 = rng.gen_range(0..size - s);
        let v = rng.gen_range(80..=245u8);
        for y in y0..y0 + s {
            for x in x0..x0 + s {
                base.put_pixel(x, y, Luma([v]));
            }
        }
    }
    let first = GrayImage::from_fn(size, size, |x, y| *base.get_pixel(x, y));
    let second = GrayImage::from_fn(size, size, |x, y| *base.get_pixel(x + shift, y));
    (first, second)
}

fn benchmark_sift_extract(c: &mut Criterion) {
    let mut group = c.benchmark_group("sift_extract");
    group.measurement_time(Duration::from_secs(5));
    group.sample_size(20);

    for size in [128u32, 256, 512] {
        let (img, _) = create_panned_pair(size, 0);
        let sift = Sift::new();
        group.bench_with_input(
            BenchmarkId::new("cpu", format!("{}x{}", size, size)),
            &img,
            |b, img| b.iter(|| sift.extract(black_box(img))),
        );
    }

    group.finish();
}

fn benchmark_matching(c: &mut Criterion) {
    let mut group = c.benchmark_group("brute_force_match");
    group.sample_size(20);

    for size in [128u32, 256] {
        let (a, b) = create_panned_pair(size, 10);
        let sift = Sift::new();
        let (fa, fb) = (sift.extract(&a), sift.extract(&b));
        let matcher = Matcher::new();
        group.bench_with_input(
            BenchmarkId::new("top10", format!("{}x{}", size, size)),
            &(fa, fb),
            |bench, (fa, fb)| bench.iter(|| matcher.match_features(black_box(fb), black_box(fa))),
        );
    }

    group.finish();
}

fn benchmark_warp(c: &mut Criterion) {
    let mut group = c.benchmark_group("frame_warp");
    group.sample_size(20);

    for size in [256u32, 1024] {
        let (_, img) = create_panned_pair(size, 10);
        let warper = FrameWarper::new(Canvas::of(&img));
        let transform = AbsoluteTransform {
            frame: 1,
            homography: Homography::translation(10.25, -3.5),
        };
        group.bench_with_input(
            BenchmarkId::new("bilinear", format!("{}x{}", size, size)),
            &img,
            |b, img| b.iter(|| warper.warp(black_box(img), &transform)),
        );
    }

    group.finish();
}

fn benchmark_pipeline(c: &mut Criterion) {
    let mut group = c.benchmark_group("align_pipeline");
    group.measurement_time(Duration::from_secs(10));
    group.sample_size(10);

    let (a, b) = create_panned_pair(256, 12);
    let frames = vec![a, b];
    let pipeline = AlignmentPipeline::new();
    group.bench_function("two_frames_256", |bench| {
        bench.iter(|| pipeline.align(black_box(&frames)))
    });

    group.finish();
}

criterion_group!(
    benches,
    benchmark_sift_extract,
    benchmark_matching,
    benchmark_warp,
    benchmark_pipeline
);
criterion_main!(benches);
