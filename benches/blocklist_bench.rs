//! Benchmarks for blocklist domain lookup.
//!
//! Measures the suffix walk against a realistically sized rule set.

use criterion::{BenchmarkId, Criterion, Throughput, black_box};

use sinkhole::filter::Blocklist;

fn synthetic_list(entries: usize) -> Blocklist {
    let mut text = String::new();
    for i in 0..entries {
        text.push_str(&format!("ads{i}.tracker{}.example\n", i % 97));
    }
    text.push_str("doubleclick.net\n");
    Blocklist::parse(&text)
}

fn bench_matches(c: &mut Criterion) {
    let blocklist = synthetic_list(50_000);

    let mut group = c.benchmark_group("blocklist");
    group.throughput(Throughput::Elements(1));

    group.bench_function(BenchmarkId::new("matches", "exact_hit"), |b| {
        b.iter(|| blocklist.matches(black_box("doubleclick.net.")))
    });

    group.bench_function(BenchmarkId::new("matches", "subdomain_hit"), |b| {
        b.iter(|| blocklist.matches(black_box("static.ads.doubleclick.net.")))
    });

    group.bench_function(BenchmarkId::new("matches", "miss"), |b| {
        b.iter(|| blocklist.matches(black_box("www.google.com.")))
    });

    group.bench_function(BenchmarkId::new("matches", "deep_miss"), |b| {
        b.iter(|| blocklist.matches(black_box("a.b.c.d.e.f.example.org.")))
    });

    group.finish();
}

fn main() {
    let mut criterion = Criterion::default().configure_from_args();
    bench_matches(&mut criterion);
    criterion.final_summary();
}
