use criterion::{Criterion, criterion_group, criterion_main};
use wenshi_engine::editing::{Annotator, Cmd, Document, OffsetMap, StructuredPosition};
mod common;

fn bench_rebuild(c: &mut Criterion) {
    let mut group = c.benchmark_group("annotator");
    group.sample_size(10);

    let raw = common::generate_annotated_text(200);
    group.bench_function("set_content", |b| {
        b.iter(|| std::hint::black_box(Annotator::with_content(std::hint::black_box(&raw))));
    });

    let plain = Document::from_text(&common::generate_plain_text(200));
    group.bench_function("offset_map_build", |b| {
        b.iter(|| std::hint::black_box(OffsetMap::build(std::hint::black_box(&plain))));
    });

    group.bench_function("split_and_rebuild", |b| {
        b.iter_batched(
            || Annotator::with_content(&raw),
            |mut annotator| {
                annotator.apply_edit(Cmd::SplitParagraph {
                    at: StructuredPosition(3),
                });
                annotator.run_pending();
                annotator
            },
            criterion::BatchSize::SmallInput,
        );
    });

    group.bench_function("toggle_tag", |b| {
        b.iter_batched(
            || {
                let mut annotator = Annotator::with_content(&common::generate_plain_text(200));
                annotator.set_selection(StructuredPosition(1)..StructuredPosition(3));
                annotator
            },
            |mut annotator| {
                let _ = annotator.toggle_tag("n");
                annotator.run_pending();
                annotator
            },
            criterion::BatchSize::SmallInput,
        );
    });

    group.finish();
}

criterion_group!(benches, bench_rebuild);
criterion_main!(benches);
