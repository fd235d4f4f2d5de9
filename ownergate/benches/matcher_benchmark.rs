use criterion::{criterion_group, criterion_main, Criterion};
use ownergate::pattern::{translate, PathMatcher};

const TEST_PATHS: &[&str] = &[
    "file-a",
    "dir-a/file-a",
    "dir-a/dir-c/file-a",
    "dir-a/dir-c/file-b",
    "dir-b/file-a",
    "dir-b/dir-d/dir-e/dir-f/dir-g/file-a",
];

const TEST_TOKENS: &[&str] = &[
    "*",
    "*.js",
    "/dir-b/",
    "dir-a/dir-b",
    "dir-a/*",
    "apps/",
    "/dir-b/dir-d/dir-e/dir-f/dir-g/file-a",
];

fn build_matchers(tokens: &[&str]) -> Vec<PathMatcher> {
    tokens
        .iter()
        .map(|&token| PathMatcher::new(&[translate(token)]).expect("valid pattern"))
        .collect()
}

fn matcher_benchmark(c: &mut Criterion) {
    c.bench_function("building", |b| b.iter(|| build_matchers(TEST_TOKENS)));

    let matchers = build_matchers(TEST_TOKENS);
    c.bench_function("matching", |b| {
        b.iter(|| {
            for path in TEST_PATHS {
                for matcher in &matchers {
                    matcher.is_match(path);
                }
            }
        })
    });
}

criterion_group!(benches, matcher_benchmark);
criterion_main!(benches);
