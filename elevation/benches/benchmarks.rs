use criterion::{criterion_group, criterion_main, Criterion};
use elevation::{ElevationGrids, Grid, SparseMatrix, Triplet};
use geometa::Config;

#[allow(clippy::cast_precision_loss)]
fn sparse_terrain(height: usize, width: usize) -> SparseMatrix {
    let entries = (0..height)
        .step_by(3)
        .flat_map(|row| {
            (0..width).step_by(5).map(move |col| Triplet {
                row,
                col,
                value: ((row * 31 + col * 17) % 2500) as f32,
            })
        })
        .collect();
    SparseMatrix::new((height, width), entries).unwrap()
}

fn elevation_grids(c: &mut Criterion) {
    let mut group = c.benchmark_group("Elevation Grids");
    group.sample_size(10);

    let matrix = sparse_terrain(2000, 3000);
    let dense: Grid = matrix.densify();
    let config = Config::default();

    group.bench_function("densify", |b| b.iter(|| matrix.densify()));

    group.bench_with_input("resample", &(dense, config), |b, (dense, config)| {
        b.iter(|| ElevationGrids::build(dense, config).unwrap())
    });
}

criterion_group!(benches, elevation_grids);
criterion_main!(benches);
