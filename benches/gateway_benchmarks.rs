//! Performance benchmarks for the hot request-path helpers
//!
//! Run with: cargo bench
//! Or for specific benchmarks: cargo bench -- <filter>

use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};
use std::time::Duration;
use voxmeter_gateway::core::provider::detect_audio_format;
use voxmeter_gateway::core::{
    AudioInput, BillableRequest, ConversionTarget, CostPolicy, ScriptFilter, SynthesisMode,
};
use voxmeter_gateway::handlers::tts::decode_text;
use voxmeter_gateway::store::is_valid_artifact_id;

const URDU_SENTENCE: &str = "آج کا دن بہت خوبصورت ہے اور موسم بھی اچھا ہے۔ ";
const ENGLISH_SENTENCE: &str = "The weather is lovely today and the park is full. ";

/// Script ratio over pure, mixed and foreign text of growing size
fn bench_script_filter(c: &mut Criterion) {
    let mut group = c.benchmark_group("script_filter");
    group.measurement_time(Duration::from_secs(5));
    let filter = ScriptFilter::default();

    for repeats in [1usize, 20, 200] {
        let urdu = URDU_SENTENCE.repeat(repeats);
        let mixed = format!(
            "{}{}",
            URDU_SENTENCE.repeat(repeats),
            ENGLISH_SENTENCE.repeat(repeats / 4 + 1)
        );
        let english = ENGLISH_SENTENCE.repeat(repeats);

        for (label, text) in [("urdu", &urdu), ("mixed", &mixed), ("english", &english)] {
            group.throughput(Throughput::Bytes(text.len() as u64));
            group.bench_with_input(BenchmarkId::new(label, text.len()), text, |b, text| {
                b.iter(|| filter.report(black_box(text)));
            });
        }
    }

    group.finish();
}

/// Pricing a request before admission
fn bench_cost_policy(c: &mut Criterion) {
    let mut group = c.benchmark_group("cost_policy");
    let policy = CostPolicy::default();

    let short = BillableRequest::TextSynthesis {
        text: URDU_SENTENCE.to_string(),
        voice: None,
        mode: SynthesisMode::Manual,
    };
    let long = BillableRequest::VoiceCloning {
        text: URDU_SENTENCE.repeat(100),
        voice: "mareeb".to_string(),
    };
    let conversion = BillableRequest::VoiceConversion {
        audio: AudioInput::new(vec![0xFF, 0xFB, 0x90, 0x64], "in.mp3", "audio/mpeg"),
        target: ConversionTarget::Female,
    };

    group.bench_function("text_short", |b| b.iter(|| policy.cost_of(black_box(&short))));
    group.bench_function("text_long", |b| b.iter(|| policy.cost_of(black_box(&long))));
    group.bench_function("conversion", |b| {
        b.iter(|| policy.cost_of(black_box(&conversion)))
    });

    group.finish();
}

/// Decoding uploaded text files
fn bench_text_upload_decoding(c: &mut Criterion) {
    let mut group = c.benchmark_group("text_upload_decoding");
    let text = URDU_SENTENCE.repeat(100);

    let utf8 = text.as_bytes().to_vec();
    let mut utf16 = vec![0xFF, 0xFE];
    for unit in text.encode_utf16() {
        utf16.extend_from_slice(&unit.to_le_bytes());
    }

    group.throughput(Throughput::Bytes(utf8.len() as u64));
    group.bench_function("utf8", |b| b.iter(|| decode_text(black_box(&utf8))));
    group.throughput(Throughput::Bytes(utf16.len() as u64));
    group.bench_function("utf16le", |b| b.iter(|| decode_text(black_box(&utf16))));

    group.finish();
}

/// Checks done on every audio request
fn bench_audio_checks(c: &mut Criterion) {
    let mut group = c.benchmark_group("audio_checks");

    let mp3 = [0xFF, 0xFB, 0x90, 0x64, 0x00, 0x00];
    let wav = *b"RIFF\x24\x00\x00\x00WAVEfmt ";
    let unknown = [0u8; 16];

    group.bench_function("detect_mp3", |b| b.iter(|| detect_audio_format(black_box(&mp3))));
    group.bench_function("detect_wav", |b| b.iter(|| detect_audio_format(black_box(&wav))));
    group.bench_function("detect_unknown", |b| {
        b.iter(|| detect_audio_format(black_box(&unknown)))
    });

    group.bench_function("artifact_id_valid", |b| {
        b.iter(|| is_valid_artifact_id(black_box("tts_3f2a9c0e7b6d4e1f.mp3")))
    });
    group.bench_function("artifact_id_traversal", |b| {
        b.iter(|| is_valid_artifact_id(black_box("../../etc/passwd")))
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_script_filter,
    bench_cost_policy,
    bench_text_upload_decoding,
    bench_audio_checks,
);

criterion_main!(benches);
