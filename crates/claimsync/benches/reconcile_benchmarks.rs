//! Reconciliation performance benchmarks.
//!
//! Measures date parsing, normalization and the reconcile path against the
//! in-memory store.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use claimsync::{
    CatalogNormalizer, ContentIdentity, DuplicateLedger, FactSet, MemoryStore, Normalize,
    RawObservation, ReconciliationEngine, Statement, Subject, TemporalParser, TemporalValue, Value,
};

/// Date expressions in the shapes museum sites publish.
const DATE_SAMPLES: &[&str] = &[
    "1642",
    "circa 1780",
    "c. 1780-1790",
    "ca. 1650",
    "1923-34",
    "about 1700",
    "1780 – 1790",
    "dated 1665",
    "not a date",
    "",
];

/// Generate a subject with `properties` single-valued statements.
fn generate_subject(properties: usize) -> Subject {
    let mut subject = Subject::empty("SK-A-1").with_id("Q100");
    for i in 0..properties {
        subject.push(
            Statement::new(format!("P{}", i + 1), Value::item(format!("Q{}", i + 1000)))
                .with_id(format!("Q100${}", i + 1)),
        );
    }
    subject
}

/// Generate desired facts: half already present, half new.
fn generate_facts(properties: usize) -> FactSet {
    let mut facts = FactSet::new("SK-A-1");
    for i in 0..properties {
        let value = if i % 2 == 0 {
            Value::item(format!("Q{}", i + 1000))
        } else {
            Value::Time(TemporalValue::year(1600 + i as i32))
        };
        facts
            .insert(Statement::new(format!("P{}", i + properties / 2 + 1), value))
            .unwrap();
    }
    facts
}

fn bench_parse_dates(c: &mut Criterion) {
    let parser = TemporalParser::new().with_century(1900);

    c.bench_function("parse_date_samples", |b| {
        b.iter(|| {
            for text in DATE_SAMPLES {
                let _ = black_box(parser.parse(black_box(text)));
            }
        })
    });
}

fn bench_normalize(c: &mut Criterion) {
    let normalizer = CatalogNormalizer::default();
    let raw = RawObservation::new("SK-C-5")
        .with_source("https://museum.example/objects/SK-C-5", None)
        .with_field("instance_of", "Q3305213")
        .with_field("collection", "Q190804")
        .with_field("inventory_number", "SK-C-5")
        .with_field("title", "The Night Watch")
        .with_field("inception", "c. 1640-1642")
        .with_field("height_cm", "379.5")
        .with_field("width_cm", "453.5");

    c.bench_function("normalize_observation", |b| {
        b.iter(|| normalizer.normalize(black_box(&raw)).unwrap())
    });
}

fn bench_reconcile(c: &mut Criterion) {
    let mut group = c.benchmark_group("reconcile");
    let store = MemoryStore::new();
    let engine = ReconciliationEngine::new(ContentIdentity::new(&store));

    for properties in [10, 50, 200] {
        let subject = generate_subject(properties);
        let facts = generate_facts(properties);

        group.throughput(Throughput::Elements(properties as u64));
        group.bench_with_input(BenchmarkId::from_parameter(properties), &properties, |b, _| {
            b.iter(|| {
                let mut ledger = DuplicateLedger::new();
                engine.reconcile(black_box(&subject), black_box(&facts), &mut ledger)
            })
        });
    }

    group.finish();
}

criterion_group!(benches, bench_parse_dates, bench_normalize, bench_reconcile);
criterion_main!(benches);
