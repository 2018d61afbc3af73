//! Analytical tests for conjugate parameter learning.
//!
//! Learned tables are checked against the closed-form posterior mean
//! (alpha + count) / (k * alpha + total) of a symmetric Dirichlet prior.

use proby_core::scenarios::{self, BagOptions};
use proby_core::{
    BayesNetwork, ConditionalDirichletNode, ConditionalProbabilityTable, DirichletNode, NodeId,
    ProbabilityTable,
};
use proby_tests::{assert_close, repeated};

/// Bag (observed true) with three observed children sharing one
/// conditional Dirichlet prior.
fn chain(alpha: f64) -> (BayesNetwork, NodeId, NodeId) {
    let mut net = BayesNetwork::new();
    let bag = net.boolean("Bag", true).unwrap();
    let sweet = net.boolean("Sweet", true).unwrap();

    let bag_table = ProbabilityTable::for_value(net.domains(), bag).unwrap();
    let bag_prior = net.add_dirichlet(bag_table, alpha).unwrap();
    let cpt = ConditionalProbabilityTable::for_values(net.domains_mut(), sweet, &[bag]).unwrap();
    let sweet_prior = net.add_conditional_dirichlet(cpt, alpha).unwrap();

    let bag_node = net.add_categorical(bag, Some(bag_prior)).unwrap();
    net.set_evidence(bag_node, true).unwrap();
    for flag in [true, true, false] {
        let value = net.boolean("Sweet", flag).unwrap();
        let child = net
            .add_conditional_categorical(value, &[bag_node], Some(sweet_prior))
            .unwrap();
        net.set_evidence(child, true).unwrap();
    }
    (net, bag_prior, sweet_prior)
}

#[test]
fn chain_with_alpha_five_matches_closed_form() {
    let (mut net, bag_prior, sweet_prior) = chain(5.0);
    net.learn().unwrap();

    let bag = net.boolean("Bag", true).unwrap();
    let sweet = net.boolean("Sweet", true).unwrap();
    let bag_table = &net.get::<DirichletNode>(bag_prior).unwrap().value;
    assert_close(bag_table.at(bag).unwrap(), 6.0 / 11.0, 0.01, "P(Bag)");

    let cpt = &net.get::<ConditionalDirichletNode>(sweet_prior).unwrap().value;
    assert_close(cpt.at(sweet, bag).unwrap(), 7.0 / 13.0, 0.01, "P(Sweet | Bag)");
    assert_close(
        cpt.at(sweet, bag.with_index(0)).unwrap(),
        0.5,
        0.01,
        "P(Sweet | not Bag)",
    );
}

#[test]
fn learned_chain_answers_a_new_query() {
    let (mut net, bag_prior, sweet_prior) = chain(5.0);
    net.learn().unwrap();

    let bag = net.boolean("Bag", true).unwrap();
    let sweet = net.boolean("Sweet", true).unwrap();
    let query = net.add_categorical(bag, Some(bag_prior)).unwrap();
    let seen = net
        .add_conditional_categorical(sweet, &[query], Some(sweet_prior))
        .unwrap();
    net.set_evidence(seen, true).unwrap();

    let posterior = net.enumerate(query).unwrap();
    let yes = 6.0 / 11.0 * 7.0 / 13.0;
    let no = 5.0 / 11.0 * 0.5;
    assert_close(posterior.get(bag), yes / (yes + no), 1e-9, "P(Bag | Sweet)");
}

#[test]
fn alpha_zero_reproduces_relative_frequencies() {
    let (mut net, _, sweet_prior) = chain(0.0);
    net.learn().unwrap();
    let bag = net.boolean("Bag", true).unwrap();
    let sweet = net.boolean("Sweet", true).unwrap();
    let cpt = &net.get::<ConditionalDirichletNode>(sweet_prior).unwrap().value;
    assert_close(cpt.at(sweet, bag).unwrap(), 2.0 / 3.0, 1e-12, "ML P(Sweet | Bag)");
}

fn labelled_bags() -> Vec<proby_core::Record> {
    let mut records = repeated(6, &[("Bag", "true"), ("Wrapper", "true")]);
    records.extend(repeated(4, &[("Bag", "false"), ("Wrapper", "false")]));
    records
}

#[test]
fn labelled_bags_shift_towards_the_prior() {
    let mut net = scenarios::bag_network(&labelled_bags(), &BagOptions::default()).unwrap();
    net.learn().unwrap();

    let prior = net.find_by_name::<DirichletNode>("ProbabilitiesBag").unwrap();
    let bag = net.boolean("Bag", true).unwrap();
    let query = net.add_categorical(bag, Some(prior)).unwrap();
    let posterior = net.enumerate(query).unwrap();

    assert_eq!(posterior.len(), 2);
    assert_close(posterior.total(), 1.0, 1e-12, "total");
    assert_close(posterior.get(bag), 11.0 / 20.0, 1e-12, "P(Bag)");
    assert!((posterior.get(bag) - 0.6).abs() > 1e-3);

    let wrapper = net.boolean("Wrapper", true).unwrap();
    let cpt = net
        .find_by_name::<ConditionalDirichletNode>("ProbabilitiesWrapperBag")
        .unwrap();
    let cpt = &net.get::<ConditionalDirichletNode>(cpt).unwrap().value;
    assert_close(cpt.at(wrapper, bag).unwrap(), 11.0 / 16.0, 1e-12, "P(Wrapper | Bag)");
    assert_close(
        cpt.at(wrapper, bag.with_index(0)).unwrap(),
        5.0 / 14.0,
        1e-12,
        "P(Wrapper | not Bag)",
    );
}

#[test]
fn maximum_likelihood_bags_match_the_data() {
    let options = BagOptions {
        alpha: 0.0,
        ..BagOptions::default()
    };
    let mut net = scenarios::bag_network(&labelled_bags(), &options).unwrap();
    net.learn().unwrap();
    let prior = net.find_by_name::<DirichletNode>("ProbabilitiesBag").unwrap();
    let bag = net.boolean("Bag", true).unwrap();
    let table = &net.get::<DirichletNode>(prior).unwrap().value;
    assert_close(table.at(bag).unwrap(), 0.6, 1e-12, "ML P(Bag)");
}

#[test]
fn learning_with_a_partial_load_uses_only_loaded_rows() {
    let options = BagOptions {
        alpha: 0.0,
        lines_of_evidence: Some(8),
        ..BagOptions::default()
    };
    let mut net = scenarios::bag_network(&labelled_bags(), &options).unwrap();
    net.learn().unwrap();
    let prior = net.find_by_name::<DirichletNode>("ProbabilitiesBag").unwrap();
    let bag = net.boolean("Bag", true).unwrap();
    let table = &net.get::<DirichletNode>(prior).unwrap().value;
    assert_close(table.at(bag).unwrap(), 6.0 / 8.0, 1e-12, "ML P(Bag), 8 rows");
}

#[test]
fn hidden_bags_teach_the_prior_nothing() {
    let options = BagOptions {
        alpha: 0.0,
        fully_observed: false,
        lines_of_evidence: None,
    };
    let mut net = scenarios::bag_network(&labelled_bags(), &options).unwrap();
    net.learn().unwrap();
    let prior = net.find_by_name::<DirichletNode>("ProbabilitiesBag").unwrap();
    let bag = net.boolean("Bag", true).unwrap();
    let table = &net.get::<DirichletNode>(prior).unwrap().value;
    assert_close(table.at(bag).unwrap(), 0.5, 1e-12, "uniform P(Bag)");
}
