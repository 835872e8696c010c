use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use respira_engine::{Engine, MixerBackend, MixerHandle, SignalGenerator, ThemeKind};

const SR: f32 = 48_000.0;
const BLOCK: usize = 512;

fn render_one_second(c: &mut Criterion) {
    let mut group = c.benchmark_group("render_1s");
    for theme in ThemeKind::ALL {
        let handle = MixerHandle::new(SR);
        let mut gen = SignalGenerator::with_seed(MixerBackend::new(handle.clone()), 1);
        gen.start(theme).expect("mixer backend is always available");
        let mut engine = Engine::new(handle, SR);
        let mut block = vec![0.0f32; BLOCK];

        group.bench_with_input(BenchmarkId::from_parameter(theme), &theme, |b, _| {
            b.iter(|| {
                for _ in 0..(SR as usize / BLOCK) {
                    gen.advance(BLOCK as f64 / f64::from(SR));
                    engine.fill(SR, &mut block);
                }
                black_box(block[BLOCK - 1])
            });
        });
    }
    group.finish();
}

criterion_group!(benches, render_one_second);
criterion_main!(benches);
