//! Performance benchmarks for ride-track-lib
//!
//! Run with: cargo bench --package ride-track-lib

use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use geo::Point;
use gpx::{Gpx, GpxVersion, Track, TrackSegment, Waypoint};
use ride_track_lib::parser::parse_gpx;
use ride_track_lib::simplify::simplify;
use ride_track_lib::stats::compute_statistics;
use ride_track_lib::{IngestConfig, StatsConfig, pipeline};
use std::hint::black_box;

const POINTS: usize = 50_000;

/// Generate a realistic ride: wandering path, rolling terrain, one fix per second
fn generate_ride(num_points: usize, base_lat: f64, base_lon: f64) -> Gpx {
    let mut gpx = Gpx {
        version: GpxVersion::Gpx11,
        creator: Some("ride-track-bench".to_string()),
        ..Default::default()
    };
    let mut track = Track::default();
    let mut segment = TrackSegment::default();
    let start = time::OffsetDateTime::UNIX_EPOCH + time::Duration::days(19_000);

    for i in 0..num_points {
        let t = i as f64 / num_points as f64;
        let lat = base_lat + t * 0.3 + (t * 50.0).sin() * 0.002;
        let lon = base_lon + t * 0.3 + (t * 30.0).cos() * 0.002;
        let mut waypoint = Waypoint::new(Point::new(lon, lat));
        waypoint.elevation = Some(400.0 + (t * 40.0).sin() * 120.0 + (t * 400.0).sin() * 4.0);
        waypoint.time = Some((start + time::Duration::seconds(i as i64)).into());
        segment.points.push(waypoint);
    }

    track.segments.push(segment);
    gpx.tracks.push(track);
    gpx
}

fn ride_bytes(num_points: usize) -> Vec<u8> {
    let mut bytes = Vec::new();
    if let Err(e) = gpx::write(&generate_ride(num_points, 46.5, 11.3), &mut bytes) {
        panic!("failed to serialize benchmark ride: {e}");
    }
    bytes
}

// ============================================================================
// Core Benchmarks - Key performance indicators
// ============================================================================

fn bench_parse(c: &mut Criterion) {
    let mut group = c.benchmark_group("parse");
    let bytes = ride_bytes(POINTS);
    group.throughput(Throughput::Bytes(bytes.len() as u64));
    group.bench_function("50k_points", |b| b.iter(|| parse_gpx(black_box(&bytes))));
    group.finish();
}

fn bench_simplify(c: &mut Criterion) {
    let mut group = c.benchmark_group("simplify");
    let points = parse_gpx(&ride_bytes(POINTS))
        .map(|parsed| parsed.points)
        .unwrap_or_default();
    group.throughput(Throughput::Elements(points.len() as u64));

    for tolerance in [1.0, 5.0, 20.0] {
        group.bench_with_input(
            BenchmarkId::new("tolerance_m", tolerance),
            &tolerance,
            |b, &tolerance| b.iter(|| simplify(black_box(&points), tolerance)),
        );
    }
    group.finish();
}

fn bench_statistics(c: &mut Criterion) {
    let mut group = c.benchmark_group("statistics");
    let points = parse_gpx(&ride_bytes(POINTS))
        .map(|parsed| parsed.points)
        .unwrap_or_default();
    let config = StatsConfig::default();
    group.throughput(Throughput::Elements(points.len() as u64));
    group.bench_function("50k_points", |b| {
        b.iter(|| compute_statistics(black_box(&points), &config))
    });
    group.finish();
}

fn bench_pipeline(c: &mut Criterion) {
    let mut group = c.benchmark_group("pipeline");
    group.sample_size(20);
    let config = IngestConfig::default();

    for num_points in [5_000, POINTS] {
        let bytes = ride_bytes(num_points);
        group.throughput(Throughput::Elements(num_points as u64));
        group.bench_with_input(BenchmarkId::new("points", num_points), &bytes, |b, bytes| {
            b.iter(|| pipeline::run(black_box(bytes), &config))
        });
    }
    group.finish();
}

criterion_group!(
    benches,
    bench_parse,
    bench_simplify,
    bench_statistics,
    bench_pipeline
);
criterion_main!(benches);
