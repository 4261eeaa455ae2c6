use criterion::{black_box, criterion_group, criterion_main, Criterion};
use matome_core::summarize::ExtractiveSummarizer;

fn bench_extractive_summarize(c: &mut Criterion) {
    let summarizer = ExtractiveSummarizer::new().unwrap();

    let paragraph = "Rust is a systems programming language. It guarantees memory safety \
        without garbage collection. The borrow checker enforces ownership at compile time. \
        Concurrency bugs like data races are caught before the program runs. The ecosystem \
        ships a build tool, a formatter, and a package registry. Adoption has grown in \
        operating systems, browsers, and network services.";

    let long_document = paragraph.repeat(20);

    c.bench_function("extractive_short", |b| {
        b.iter(|| summarizer.summarize(black_box(paragraph), 2).unwrap());
    });

    c.bench_function("extractive_long", |b| {
        b.iter(|| summarizer.summarize(black_box(&long_document), 5).unwrap());
    });
}

criterion_group!(benches, bench_extractive_summarize);
criterion_main!(benches);
