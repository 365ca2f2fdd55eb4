//! Benchmarks for fuzzkit inference operations

use std::collections::HashMap;

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

use fuzzkit::{FisType, ModelBuilder, Shape};

fn fan_model(resolution: usize) -> fuzzkit::FisModel {
    let mut b = ModelBuilder::new(FisType::Mamdani);
    b.add_input("temperature", 0.0, 40.0).unwrap();
    b.add_input("humidity", 0.0, 100.0).unwrap();
    b.add_output("fan", 0.0, 100.0).unwrap();
    b.add_set("temperature", "Cold", Shape::Trapezoidal, &[0.0, 0.0, 10.0, 20.0])
        .unwrap();
    b.add_set("temperature", "Mild", Shape::Triangular, &[10.0, 20.0, 30.0])
        .unwrap();
    b.add_set("temperature", "Hot", Shape::Trapezoidal, &[20.0, 30.0, 40.0, 40.0])
        .unwrap();
    b.add_set("humidity", "Dry", Shape::ZShape, &[0.0, 60.0]).unwrap();
    b.add_set("humidity", "Humid", Shape::SShape, &[40.0, 100.0]).unwrap();
    b.add_set("fan", "Low", Shape::Triangular, &[0.0, 0.0, 50.0]).unwrap();
    b.add_set("fan", "Medium", Shape::Triangular, &[25.0, 50.0, 75.0]).unwrap();
    b.add_set("fan", "High", Shape::Triangular, &[50.0, 100.0, 100.0]).unwrap();
    b.add_rule_text("IF temperature IS Cold THEN fan IS Low").unwrap();
    b.add_rule_text("IF temperature IS Mild AND humidity IS Dry THEN fan IS Medium")
        .unwrap();
    b.add_rule_text("IF temperature IS Hot OR humidity IS Humid THEN fan IS High")
        .unwrap();
    b.resolution(resolution).unwrap();
    b.build().unwrap()
}

fn parse_rule_benchmark(c: &mut Criterion) {
    let simple = "IF temperature IS Cold THEN fan IS Low";
    let compound =
        "IF (temperature IS Hot OR humidity IS Humid) AND pressure IS NOT Low \
         THEN fan IS High AND vent IS Open WITH 0.85";

    let mut group = c.benchmark_group("parse_rule");
    group.bench_with_input(BenchmarkId::new("simple", "1 prop"), &simple, |b, input| {
        b.iter(|| fuzzkit::parse_rule(black_box(input)).unwrap());
    });
    group.bench_with_input(
        BenchmarkId::new("compound", "3 props"),
        &compound,
        |b, input| {
            b.iter(|| fuzzkit::parse_rule(black_box(input)).unwrap());
        },
    );
    group.finish();
}

fn membership_benchmark(c: &mut Criterion) {
    use fuzzkit::MembershipFunction;

    let shapes = [
        ("triangular", MembershipFunction::new(Shape::Triangular, &[0.0, 5.0, 10.0]).unwrap()),
        ("gaussian", MembershipFunction::new(Shape::Gaussian, &[1.5, 5.0]).unwrap()),
        ("gbell", MembershipFunction::new(Shape::GBell, &[2.0, 4.0, 5.0]).unwrap()),
    ];

    let mut group = c.benchmark_group("membership");
    for (name, mf) in &shapes {
        group.bench_function(*name, |b| {
            b.iter(|| {
                let mut acc = 0.0;
                for i in 0..100 {
                    acc += mf.evaluate(black_box(i as f64 * 0.1));
                }
                acc
            });
        });
    }
    group.finish();
}

fn evaluate_benchmark(c: &mut Criterion) {
    let inputs = HashMap::from([
        ("temperature".to_string(), 23.0),
        ("humidity".to_string(), 55.0),
    ]);

    let mut group = c.benchmark_group("evaluate");
    for resolution in [100usize, 500] {
        let model = fan_model(resolution);
        group.bench_with_input(
            BenchmarkId::new("mamdani", resolution),
            &model,
            |b, model| {
                b.iter(|| model.evaluate(black_box(&inputs)).unwrap());
            },
        );
    }
    group.finish();
}

criterion_group!(
    benches,
    parse_rule_benchmark,
    membership_benchmark,
    evaluate_benchmark,
);

criterion_main!(benches);
