use criterion::{Criterion, black_box, criterion_group, criterion_main};
use md_audio::aggregate::FeatureAggregator;
use md_audio::analyzer::FrameAnalyzer;
use md_audio::rhythm::RhythmExtractor;
use md_core::config::AnalysisConfig;
use md_core::features::FeatureVector;

fn noise_block(frames: usize, seed: u32) -> Vec<f32> {
    let mut state = seed.wrapping_mul(747_796_405).wrapping_add(1);
    (0..2 * frames)
        .map(|_| {
            state = state.wrapping_mul(1_664_525).wrapping_add(1_013_904_223);
            (state >> 8) as f32 / (1u32 << 24) as f32 - 0.5
        })
        .collect()
}

fn bench_frame_analyzer(c: &mut Criterion) {
    let config = AnalysisConfig::default();
    let (mut analyzer, _windows) = FrameAnalyzer::new(&config);
    let block = noise_block(config.frame_length(), 7);

    c.bench_function("frame_analyzer_2048_stereo", |b| {
        b.iter(|| analyzer.analyze(black_box(&block), 2));
    });
}

fn bench_aggregate(c: &mut Criterion) {
    let config = AnalysisConfig::default();
    let (mut analyzer, windows) = FrameAnalyzer::new(&config);
    for k in 0..config.frames_per_window() {
        analyzer.analyze(&noise_block(config.frame_length(), k as u32), 2);
    }
    let mut aggregator = FeatureAggregator::new(&config);
    let mut features = FeatureVector::new(&config);

    c.bench_function("aggregate_window_64", |b| {
        b.iter(|| aggregator.collect(black_box(&windows), &mut features));
    });
}

fn bench_rhythm(c: &mut Criterion) {
    let config = AnalysisConfig::default();
    let mut extractor = RhythmExtractor::new(&config);
    let flux: Vec<f32> = (0..config.frames_per_window())
        .map(|i| if i % 6 == 0 { 5.0 } else { (i % 5) as f32 * 0.1 })
        .collect();

    c.bench_function("rhythm_extract_64", |b| {
        b.iter(|| extractor.extract(black_box(&flux)));
    });
}

criterion_group!(benches, bench_frame_analyzer, bench_aggregate, bench_rhythm);
criterion_main!(benches);
