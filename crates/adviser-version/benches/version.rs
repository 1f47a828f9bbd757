use criterion::{black_box, criterion_group, criterion_main, Criterion};
use adviser_version::{SpecifierSet, Version};

fn bench_parse_versions(c: &mut Criterion) {
    let versions = [
        "1.2.3",
        "2.4.0a1",
        "2.1.0.dev3",
        "1.2.3+cpu",
        "1!2.0",
        "1.2.3rc1",
        "1.2.3.post1",
        "0.19.2",
    ];

    c.bench_function("parse_versions", |b| {
        b.iter(|| {
            for version in versions {
                black_box(Version::parse(black_box(version)).ok());
            }
        })
    });
}

fn bench_compare(c: &mut Criterion) {
    let pairs: Vec<(Version, Version)> = [
        ("1.2.3", "1.2.4"),
        ("2.4.0a1", "2.4.0"),
        ("2.1.0.dev3", "2.1.0"),
        ("1.0", "1.0.0"),
        ("1.2.3.post1", "1.2.3"),
    ]
    .iter()
    .map(|(a, b)| (Version::parse(a).unwrap(), Version::parse(b).unwrap()))
    .collect();

    c.bench_function("compare_versions", |b| {
        b.iter(|| {
            for (left, right) in &pairs {
                black_box(left.cmp(right));
            }
        })
    });
}

fn bench_specifier_contains(c: &mut Criterion) {
    let specifiers = [
        SpecifierSet::parse(">=1.2,<2.0").unwrap(),
        SpecifierSet::parse("~=1.4.2").unwrap(),
        SpecifierSet::parse("==1.2.*").unwrap(),
        SpecifierSet::parse("!=1.5,>1.0").unwrap(),
    ];
    let candidates: Vec<Version> = ["1.0", "1.2.7", "1.4.5", "1.5", "2.0"]
        .iter()
        .map(|v| Version::parse(v).unwrap())
        .collect();

    c.bench_function("specifier_contains", |b| {
        b.iter(|| {
            for specifier in &specifiers {
                for candidate in &candidates {
                    black_box(specifier.contains(black_box(candidate)));
                }
            }
        })
    });
}

criterion_group!(benches, bench_parse_versions, bench_compare, bench_specifier_contains);
criterion_main!(benches);
