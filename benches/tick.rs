//! Shape switch and per-frame tick benchmarks.
//! Run: cargo bench

use criterion::{black_box, criterion_group, criterion_main, Criterion};

use dotswarm::engine::Engine;
use dotswarm::rng::SeededRng;
use dotswarm::schema::Scene;
use dotswarm::shapes::ShapeRasterizer;
use dotswarm::text::TextPainter;
use dotswarm::transition::Transitioner;

fn bench_switch_shape(c: &mut Criterion) {
    let mut rasterizer =
        ShapeRasterizer::new(1280, 720, TextPainter::embedded()).expect("rasterizer");
    let cloud = rasterizer.render_text("Birthday");

    let mut group = c.benchmark_group("switch_shape");
    group.sample_size(50);

    group.bench_function("text_720p", |b| {
        b.iter(|| {
            let mut rng = SeededRng::new(7);
            let mut transitioner = Transitioner::new();
            transitioner.switch_shape(black_box(cloud.clone()), false, 1280.0, 720.0, &mut rng);
            black_box(transitioner.pool().len())
        });
    });

    group.finish();
}

fn bench_tick_frame(c: &mut Criterion) {
    let scene = Scene {
        sequence: "Birthday".to_owned(),
        ..Scene::default()
    };
    let mut engine = Engine::new(&scene, TextPainter::embedded()).expect("engine");
    engine.start();
    engine.advance(0).expect("advance");

    let mut group = c.benchmark_group("tick_frame");
    group.sample_size(50);

    group.bench_function("settled_text_720p", |b| {
        b.iter(|| {
            engine.tick_frame();
            black_box(engine.dot_count())
        });
    });

    group.finish();
}

criterion_group!(benches, bench_switch_shape, bench_tick_frame);
criterion_main!(benches);
