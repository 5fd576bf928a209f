//! Benchmarks for parse and render throughput.

#![allow(clippy::format_push_string)] // Benchmark setup code, performance not critical

use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use markspan::{Pipeline, RenderTarget, RichTextLayout};

/// Generate markdown mixing base syntax with custom extensions.
fn generate_markdown(sections: usize, paragraphs_per_section: usize) -> String {
    let mut md = String::with_capacity(sections * paragraphs_per_section * 200);
    md.push_str("# Document Title\n\n");

    for i in 0..sections {
        md.push_str(&format!("## Section {i}\n\n~~~Centered caption {i}~~~\n\n"));
        for j in 0..paragraphs_per_section {
            md.push_str(&format!(
                "Paragraph {j} has **bold**, *italic* text and a clip webm(clip_{i}_{j}.webm).\n\n"
            ));
        }
        md.push_str("1. first\n2. second\n3. third\n\n");
    }
    md
}

fn bench_parse(c: &mut Criterion) {
    let pipeline = Pipeline::default();
    let mut group = c.benchmark_group("parse_by_size");

    for (sections, paragraphs) in [(5, 2), (20, 3), (50, 5)] {
        let markdown = generate_markdown(sections, paragraphs);
        group.throughput(Throughput::Bytes(markdown.len() as u64));
        group.bench_with_input(
            BenchmarkId::new("markdown", format!("{sections}s_{paragraphs}p")),
            &markdown,
            |b, markdown| b.iter(|| pipeline.parse(markdown)),
        );
    }

    group.finish();
}

fn bench_render_targets(c: &mut Criterion) {
    let pipeline = Pipeline::default();
    let document = pipeline.parse(&generate_markdown(20, 3));
    let mut group = c.benchmark_group("render_by_target");

    for target in RenderTarget::ALL {
        group.bench_with_input(BenchmarkId::new("target", target), &target, |b, &target| {
            b.iter(|| pipeline.render(&document, target));
        });
    }

    group.finish();
}

fn bench_rich_text_layout(c: &mut Criterion) {
    let pipeline = Pipeline::default();
    let document = pipeline.parse(&generate_markdown(50, 5));
    let narrow = RichTextLayout {
        display_width: 120,
        ..RichTextLayout::default()
    };

    c.bench_function("render_rich_text_narrow", |b| {
        b.iter(|| pipeline.render_rich_text(&document, &narrow));
    });
}

fn bench_preprocess_without_markers(c: &mut Criterion) {
    let pipeline = Pipeline::default();
    let markdown = "Plain paragraph without any custom syntax.\n\n".repeat(500);

    c.bench_function("preprocess_plain", |b| {
        b.iter(|| pipeline.preprocess(&markdown));
    });
}

criterion_group!(
    benches,
    bench_parse,
    bench_render_targets,
    bench_rich_text_layout,
    bench_preprocess_without_markers,
);
criterion_main!(benches);
