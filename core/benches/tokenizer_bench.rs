use criterion::{criterion_group, criterion_main, Criterion};
use wordhunt_core::tokenizer::tokenize;
use wordhunt_core::InvertedIndex;

fn sample_text() -> String {
    let words = ["alpha", "Beta,", "gamma_delta", "epsilon!", "zeta", "eta\n", "theta", "iota"];
    (0..5_000).map(|i| words[i % words.len()]).collect::<Vec<_>>().join(" ")
}

fn bench_tokenize(c: &mut Criterion) {
    let text = sample_text();
    c.bench_function("tokenize_sample", |b| b.iter(|| tokenize(&text)));
}

fn bench_partial_search(c: &mut Criterion) {
    let index = InvertedIndex::new();
    let words = tokenize(&sample_text());
    for doc in 0..50 {
        index.add_words(&words, &format!("/doc/{doc}.txt"));
    }
    c.bench_function("partial_search_prefix", |b| {
        b.iter(|| index.partial_search(&["e", "the"]))
    });
}

criterion_group!(benches, bench_tokenize, bench_partial_search);
criterion_main!(benches);
