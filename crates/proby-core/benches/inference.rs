//! Benchmarks for enumeration, Gibbs sweeps and learning on the bag model,
//! and for sampling a Dirichlet-process mixture.
//!
//! Run with `cargo bench --bench inference`.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use proby_core::scenarios;
use proby_core::{
    BayesNetwork, ConditionalProbabilityTable, DirichletProcessNode, NodeId, ProbabilityTable,
    Record,
};

/// Bag prior plus `rows` observed (Bag, Wrapper) pairs and one hidden query.
fn bag_model(rows: usize) -> (BayesNetwork, NodeId) {
    let mut net = BayesNetwork::with_seed(17);
    let bag = net.boolean("Bag", true).expect("domain");
    let wrapper = net.boolean("Wrapper", true).expect("domain");
    let bag_table = ProbabilityTable::for_value(net.domains(), bag).expect("table");
    let bag_params = net.add_dirichlet(bag_table, 5.0).expect("dirichlet");
    let cpt = ConditionalProbabilityTable::for_values(net.domains_mut(), wrapper, &[bag])
        .expect("table");
    let wrapper_params = net.add_conditional_dirichlet(cpt, 5.0).expect("dirichlet");

    for i in 0..rows {
        let flag = i % 5 < 3;
        let b = net.boolean("Bag", flag).expect("value");
        let w = net.boolean("Wrapper", flag).expect("value");
        let bag_node = net.add_categorical(b, Some(bag_params)).expect("node");
        let wrapper_node = net
            .add_conditional_categorical(w, &[bag_node], Some(wrapper_params))
            .expect("node");
        net.set_evidence(bag_node, true).expect("evidence");
        net.set_evidence(wrapper_node, true).expect("evidence");
    }
    let query = net.add_categorical(bag, Some(bag_params)).expect("query");
    (net, query)
}

fn bench_learn(c: &mut Criterion) {
    let mut group = c.benchmark_group("learn");
    for rows in [10_usize, 100, 1000] {
        let (net, _) = bag_model(rows);
        group.bench_with_input(BenchmarkId::from_parameter(rows), &net, |b, net| {
            b.iter_batched(
                || net.deep_copy().expect("copy"),
                |mut copy| black_box(copy.learn().expect("learn")),
                criterion::BatchSize::SmallInput,
            );
        });
    }
    group.finish();
}

fn bench_enumerate(c: &mut Criterion) {
    let mut group = c.benchmark_group("enumerate");
    for rows in [10_usize, 100, 1000] {
        let (mut net, query) = bag_model(rows);
        net.learn().expect("learn");
        group.bench_function(BenchmarkId::from_parameter(rows), |b| {
            b.iter(|| black_box(net.enumerate(black_box(query)).expect("enumerate")));
        });
    }
    group.finish();
}

fn bench_gibbs(c: &mut Criterion) {
    let mut group = c.benchmark_group("gibbs_sample");
    for rows in [10_usize, 100] {
        let (mut net, query) = bag_model(rows);
        group.bench_function(BenchmarkId::from_parameter(rows), |b| {
            b.iter(|| black_box(net.sample(query, 10, 100).expect("sample")));
        });
    }
    group.finish();
}

fn bench_mixture(c: &mut Criterion) {
    let mut group = c.benchmark_group("dirichlet_process");
    for rows in [10_usize, 50] {
        let records: Vec<Record> = (0..rows)
            .map(|i| {
                let flag = if i % 3 == 0 { "true" } else { "false" };
                [("Flavor", flag), ("Hole", flag)]
                    .iter()
                    .map(|(k, v)| (k.to_string(), v.to_string()))
                    .collect()
            })
            .collect();
        let mut net = scenarios::infinite_bag_network(&records, 1.0, 1.0).expect("network");
        let first = net
            .node_ids()
            .into_iter()
            .find(|&id| net.get::<DirichletProcessNode>(id).is_ok())
            .expect("indicator");
        group.bench_function(BenchmarkId::from_parameter(rows), |b| {
            b.iter(|| black_box(net.sample(first, 5, 20).expect("sample")));
        });
    }
    group.finish();
}

criterion_group!(
    benches,
    bench_learn,
    bench_enumerate,
    bench_gibbs,
    bench_mixture
);
criterion_main!(benches);
