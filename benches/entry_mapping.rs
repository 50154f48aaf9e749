//! Entry Mapping Benchmarks
//!
//! Measures the cost of turning domain records into directory entries and
//! back, and of the DN escaping and parsing underneath.

use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};
use embedded_directory::dn::{Dn, escape_value, user_dn};
use embedded_directory::entry::{DomainRecord, decode, encode};

fn usernames() -> Vec<(&'static str, String)> {
    vec![
        ("plain", "alice".to_string()),
        ("escaped", "  o'hara, jr + \"sons\" #1 ".to_string()),
        ("unicode", "zoë-ünïcode-ユーザー".to_string()),
        ("long", "x".repeat(256)),
    ]
}

fn bench_encode(c: &mut Criterion) {
    let mut group = c.benchmark_group("encode");

    for (label, username) in usernames() {
        let record = DomainRecord::new(username, "likes tea");
        group.bench_with_input(BenchmarkId::from_parameter(label), &record, |b, record| {
            b.iter(|| black_box(encode(black_box(record)).unwrap()));
        });
    }

    group.finish();
}

fn bench_decode(c: &mut Criterion) {
    let mut group = c.benchmark_group("decode");

    for (label, username) in usernames() {
        let entry = encode(&DomainRecord::new(username, "likes tea")).unwrap();
        group.bench_with_input(BenchmarkId::from_parameter(label), &entry, |b, entry| {
            b.iter(|| black_box(decode(black_box(entry)).unwrap()));
        });
    }

    group.finish();
}

fn bench_dn_handling(c: &mut Criterion) {
    let mut group = c.benchmark_group("dn");

    for (label, username) in usernames() {
        group.bench_with_input(BenchmarkId::new("escape_value", label), &username, |b, name| {
            b.iter(|| black_box(escape_value(black_box(name))));
        });

        let text = user_dn(&username).unwrap().to_string();
        group.bench_with_input(BenchmarkId::new("parse", label), &text, |b, text| {
            b.iter(|| black_box(Dn::parse(black_box(text)).unwrap()));
        });
    }

    group.finish();
}

fn bench_bulk_round_trip(c: &mut Criterion) {
    let mut group = c.benchmark_group("bulk_round_trip");

    for count in [10, 100, 1000] {
        let records: Vec<DomainRecord> = (0..count)
            .map(|i| DomainRecord::new(format!("user{i}"), format!("payload {i}")))
            .collect();

        group.throughput(Throughput::Elements(count as u64));
        group.bench_with_input(BenchmarkId::from_parameter(count), &records, |b, records| {
            b.iter(|| {
                for record in records {
                    let entry = encode(record).unwrap();
                    black_box(decode(&entry).unwrap());
                }
            });
        });
    }

    group.finish();
}

criterion_group!(
    entry_mapping_benches,
    bench_encode,
    bench_decode,
    bench_dn_handling,
    bench_bulk_round_trip
);

criterion_main!(entry_mapping_benches);
