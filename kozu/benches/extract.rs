//! Benchmarks pour l'extraction

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use geo::polygon;
use kozu::{extract, ColumnMapping, Crs, LocationKey, ParcelDataset, ParcelRecord, Schema};

/// Grille carrée de `side`² parcelles de 20 m
fn grid(side: usize) -> ParcelDataset {
    let mut records = Vec::with_capacity(side * side);
    for row in 0..side {
        for col in 0..side {
            let (x, y) = (col as f64 * 20.0, row as f64 * 20.0);
            let parcel = polygon![
                (x: x, y: y),
                (x: x + 20.0, y: y),
                (x: x + 20.0, y: y + 20.0),
                (x: x, y: y + 20.0),
                (x: x, y: y),
            ];
            records.push(ParcelRecord::new("旭", &(row * side + col).to_string(), parcel));
        }
    }

    ParcelDataset::new(
        Crs::new(6677),
        Schema::minimal(&ColumnMapping::default()),
        records,
    )
}

fn bench_extract(c: &mut Criterion) {
    let mut group = c.benchmark_group("extract");

    for side in [50usize, 200] {
        let dataset = grid(side);
        let lot = (side * side / 2 + side / 2).to_string();
        let key = LocationKey::new("旭");

        group.throughput(Throughput::Elements((side * side) as u64));
        group.bench_with_input(BenchmarkId::from_parameter(side * side), &dataset, |b, ds| {
            b.iter(|| {
                let result = extract(black_box(ds), &key, &lot, 61.0);
                black_box(result)
            })
        });
    }

    group.finish();
}

criterion_group!(benches, bench_extract);
criterion_main!(benches);
