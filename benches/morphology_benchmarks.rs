use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use segment_edit::{
    AreaResampler, BoolMask, MaskCatalog, Morphology, Point, RawMask, RawMaskPostprocessor,
    SelectionCompositor, SelectionOptions,
};

/// Concentric rectangles plus a few stripes, like a segmenter over a busy scene
fn synthetic_masks(width: u32, height: u32, count: u32) -> Vec<RawMask> {
    (0..count)
        .map(|i| {
            let inset_x = width * i / (count * 2 + 1);
            let inset_y = height * i / (count * 2 + 1);
            let mask = if i % 3 == 2 {
                BoolMask::from_fn(width, height, |x, _| (x / 16) % count == i % count)
            } else {
                BoolMask::from_fn(width, height, |x, y| {
                    x >= inset_x && x < width - inset_x && y >= inset_y && y < height - inset_y
                })
            };
            RawMask::with_confidence(mask, 0.9)
        })
        .collect()
}

fn bench_morphology(c: &mut Criterion) {
    let mut group = c.benchmark_group("morphology");
    for size in [256_u32, 512, 1024] {
        let mask = BoolMask::from_fn(size, size, |x, y| (x * 7 + y * 3) % 11 < 5);
        group.bench_with_input(BenchmarkId::new("dilate_3x3_x8", size), &mask, |b, mask| {
            b.iter(|| Morphology::dilate(black_box(mask), 3, 8));
        });
        group.bench_with_input(BenchmarkId::new("close_open", size), &mask, |b, mask| {
            b.iter(|| Morphology::open(&Morphology::close(black_box(mask), 3), 7));
        });
    }
    group.finish();
}

fn bench_resample(c: &mut Criterion) {
    let mask = BoolMask::from_fn(1024, 1024, |x, y| (x / 32 + y / 32) % 2 == 0);
    c.bench_function("area_resize_1024_to_640x480", |b| {
        b.iter(|| AreaResampler::resize(black_box(&mask), 640, 480));
    });
}

fn bench_catalog(c: &mut Criterion) {
    let postprocessor = RawMaskPostprocessor::default();
    let masks = synthetic_masks(512, 512, 24);

    c.bench_function("catalog_build_24_regions_512", |b| {
        b.iter(|| MaskCatalog::build(black_box(&masks), (512, 512), &postprocessor));
    });

    let catalog = MaskCatalog::build(&masks, (512, 512), &postprocessor);
    let points: Vec<Point> = (0..16).map(|i| Point::new(i * 31, i * 29)).collect();
    c.bench_function("select_16_points_512", |b| {
        b.iter(|| SelectionCompositor::select(black_box(&points), SelectionOptions::default(), &catalog));
    });
}

criterion_group!(benches, bench_morphology, bench_resample, bench_catalog);
criterion_main!(benches);
