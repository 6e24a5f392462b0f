use criterion::{black_box, criterion_group, criterion_main, BatchSize, Criterion};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use dragons_breath::{
    config::MatchPolicy,
    constants::{CandidateSet, Candidates, ClickSet, MetadataSet},
    coordinates::{physical_to_image, ImagePoint},
    matcher::CandidateMatcher,
    records::{CandidateStar, ClickRecord, ObjectMetadata},
    table::table_builder::TableBuilder,
};

/// Random candidate list spread over the UVIS detector (physical pixels).
fn make_candidates(rng: &mut StdRng, rootname: &str, n: usize) -> Candidates {
    (0..n)
        .map(|_| {
            let x = rng.random_range(1.0..4100.0);
            let y = rng.random_range(1.0..4100.0);
            let mag = format!("{:.2}", rng.random_range(8.0..20.0));
            CandidateStar::new(rootname, x, y, mag)
        })
        .collect()
}

/// Single exposure, typical photometry output size.
fn bench_nearest(c: &mut Criterion) {
    let mut rng = StdRng::seed_from_u64(0xDEADBEEF);
    let candidates = make_candidates(&mut rng, "ibcz01abq", 2_000);
    let matcher = CandidateMatcher::default();

    c.bench_function("matcher/nearest_2000", |b| {
        b.iter_batched(
            || {
                // Click close to a random star, so the radius test is exercised
                let star = &candidates[rng.random_range(0..candidates.len())];
                let (ix, iy) = physical_to_image(star.catalog_x + 20.0, star.catalog_y - 20.0);
                ImagePoint::new(ix, iy)
            },
            |click| black_box(matcher.nearest(black_box(&candidates), click)),
            BatchSize::SmallInput,
        )
    });
}

/// Whole table for a batch of exposures, no disk access.
fn bench_table_build(c: &mut Criterion) {
    let mut rng = StdRng::seed_from_u64(42);
    let mut candidates = CandidateSet::new();
    let mut clicks = ClickSet::new();
    let mut metadata = MetadataSet::new();

    for i in 0..200 {
        let rootname = format!("ibcz{i:03}q");
        let stars = make_candidates(&mut rng, &rootname, 300);
        let object_clicks = stars
            .iter()
            .take(5)
            .map(|s| {
                let (ix, iy) = physical_to_image(s.catalog_x, s.catalog_y);
                ClickRecord::new(rootname.clone(), ix, iy)
            })
            .collect();

        clicks.insert(rootname.clone(), object_clicks);
        metadata.insert(
            rootname.clone(),
            ObjectMetadata::new(rootname.clone(), "F606W", 350.0),
        );
        candidates.insert(rootname, stars);
    }

    let builder = TableBuilder::new(
        CandidateMatcher::default(),
        MatchPolicy::FirstWins,
        &metadata,
    );

    c.bench_function("table_builder/200x300", |b| {
        b.iter(|| {
            let mut misses: Vec<String> = Vec::new();
            black_box(builder.build(&candidates, &clicks, &mut misses))
        })
    });
}

criterion_group!(benches, bench_nearest, bench_table_build);
criterion_main!(benches);
