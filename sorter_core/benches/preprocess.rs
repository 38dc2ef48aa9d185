use criterion::{BatchSize, Criterion, black_box, criterion_group, criterion_main};
use sorter_core::classifier::{argmax, preprocess};
use sorter_core::config::ModelInput;
use sorter_traits::Frame;

// Synthetic 640x480 BGR frame with a cheap xorshift texture
fn synth_frame(seed: u32) -> Frame {
    let (w, h) = (640u32, 480u32);
    let mut state = seed.max(1);
    let mut next = || {
        let mut x = state;
        x ^= x << 13;
        x ^= x >> 17;
        x ^= x << 5;
        state = x;
        (x & 0xff) as u8
    };
    let bgr: Vec<u8> = (0..w * h * 3).map(|_| next()).collect();
    Frame::from_bgr(w, h, bgr).expect("valid frame")
}

fn bench_preprocess(c: &mut Criterion) {
    let input = ModelInput::default();
    c.bench_function("preprocess_640x480_to_224", |b| {
        b.iter_batched(
            || synth_frame(7),
            |frame| black_box(preprocess(&frame, &input)),
            BatchSize::LargeInput,
        )
    });

    let scores: Vec<f32> = (0..1000).map(|i| ((i * 37) % 101) as f32).collect();
    c.bench_function("argmax_1000", |b| b.iter(|| black_box(argmax(black_box(&scores)))));
}

criterion_group!(benches, bench_preprocess);
criterion_main!(benches);
