//! Invariants of the Dirichlet-process component manager under sampling.

use proby_core::scenarios;
use proby_core::{
    BayesNetwork, ConditionalDirichletNode, ConditionalProbabilityTable, DirichletProcessNode,
    DirichletProcessParametersNode, NodeId, ProbabilityTable,
};
use proby_tests::{record, repeated};

fn seated_indicators(net: &BayesNetwork, params: NodeId) -> usize {
    let p = net.get::<DirichletProcessParametersNode>(params).unwrap();
    p.children
        .iter()
        .filter(|&&c| net.get::<DirichletProcessNode>(c).unwrap().seated)
        .count()
}

fn assert_tables_match_domain(net: &BayesNetwork, params: NodeId) {
    let p = net.get::<DirichletProcessParametersNode>(params).unwrap();
    let components = net.domains().cardinality(p.component_domain).max(1);
    for &m in &p.managed {
        let table = &net.get::<ConditionalDirichletNode>(m).unwrap().value;
        let rows = net.domains().cardinality(table.condition()).max(1);
        assert_eq!(table.len(), rows, "rows of {}", table.name());
        assert_eq!(rows % components, 0);
    }
}

/// Integer observations drawn from a mixture with an unbounded number of
/// components.
fn mixture(observations: &[usize], concentration: f64) -> (BayesNetwork, NodeId) {
    let mut net = BayesNetwork::with_seed(11);
    let cardinality = observations.iter().max().map_or(1, |m| m + 1);
    let domain = net
        .integer("Reading", cardinality, 0)
        .unwrap()
        .require_domain()
        .unwrap();
    let component = net.domains_mut().register("Source", 0).unwrap();
    let cpt = ConditionalProbabilityTable::new(net.domains(), domain, component);
    let table = net.add_conditional_dirichlet(cpt, 0.5).unwrap();
    let params = net
        .add_dirichlet_process_parameters("Source", concentration, &[table])
        .unwrap();
    for &x in observations {
        let indicator = net.add_dirichlet_process(params).unwrap();
        let value = net.integer("Reading", cardinality, x).unwrap();
        let child = net
            .add_conditional_categorical(value, &[indicator], Some(table))
            .unwrap();
        net.set_evidence(child, true).unwrap();
    }
    (net, params)
}

#[test]
fn occupancy_equals_seated_indicators_after_sampling() {
    let (mut net, params) = mixture(&[0, 0, 0, 3, 3, 3, 1, 2], 1.0);
    let first = net.get::<DirichletProcessParametersNode>(params).unwrap().children[0];
    for round in 0..5 {
        net.sample(first, 5, 10).unwrap();
        let p = net.get::<DirichletProcessParametersNode>(params).unwrap();
        assert_eq!(
            p.occupancy(),
            seated_indicators(&net, params),
            "round {round}"
        );
        assert_eq!(p.occupancy(), 8);
        assert_tables_match_domain(&net, params);
    }
}

#[test]
fn a_lone_indicator_never_opens_a_second_component() {
    let (mut net, params) = mixture(&[2], 5.0);
    let indicator = net.get::<DirichletProcessParametersNode>(params).unwrap().children[0];
    net.sample(indicator, 10, 50).unwrap();
    let p = net.get::<DirichletProcessParametersNode>(params).unwrap();
    assert_eq!(net.domains().cardinality(p.component_domain), 1);
    assert_eq!(p.occupancy(), 1);
    assert_tables_match_domain(&net, params);
}

#[test]
fn components_grow_one_at_a_time() {
    let (mut net, params) = mixture(&[0, 1, 2, 3, 4, 5], 50.0);
    let first = net.get::<DirichletProcessParametersNode>(params).unwrap().children[0];
    let mut previous = 0;
    for _ in 0..10 {
        net.sample(first, 0, 1).unwrap();
        let p = net.get::<DirichletProcessParametersNode>(params).unwrap();
        let components = net.domains().cardinality(p.component_domain);
        assert!(components >= previous);
        assert!(components <= 6, "more components than indicators");
        assert_eq!(p.counters.len(), components);
        previous = components;
    }
    assert!(previous > 1, "a large concentration should open several components");
}

#[test]
fn sampling_an_indicator_returns_a_distribution_over_components() {
    let (mut net, params) = mixture(&[0, 0, 4, 4], 1.0);
    let first = net.get::<DirichletProcessParametersNode>(params).unwrap().children[0];
    let estimate = net.sample(first, 20, 200).unwrap();
    assert!((estimate.total() - 1.0).abs() < 1e-9);
    let p = net.get::<DirichletProcessParametersNode>(params).unwrap();
    for (component, _) in estimate.iter() {
        assert_eq!(component.domain(), Some(p.component_domain));
    }
}

#[test]
fn infinite_bag_keeps_every_managed_table_in_step() {
    let mut records = repeated(4, &[("Flavor", "true"), ("Wrapper", "true"), ("Hole", "false")]);
    records.extend(repeated(4, &[("Flavor", "false"), ("Wrapper", "false"), ("Hole", "true")]));
    records.push(record(&[("Flavor", "true"), ("Wrapper", "false"), ("Hole", "true")]));

    let mut net = scenarios::infinite_bag_network(&records, 1.0, 2.0).unwrap();
    net.reseed(3);
    let params = net
        .find_by_name::<DirichletProcessParametersNode>("BagParameters")
        .unwrap();
    let first = net.get::<DirichletProcessParametersNode>(params).unwrap().children[0];
    net.sample(first, 20, 100).unwrap();

    let p = net.get::<DirichletProcessParametersNode>(params).unwrap();
    assert_eq!(p.managed.len(), 3);
    assert_eq!(p.occupancy(), records.len());
    assert_eq!(seated_indicators(&net, params), records.len());
    assert_tables_match_domain(&net, params);
}

#[test]
fn new_component_weight_grows_with_concentration() {
    let (low, low_params) = mixture(&[1, 1], 1.0);
    let (high, high_params) = mixture(&[1, 1], 4.0);
    let low_indicator = low.get::<DirichletProcessParametersNode>(low_params).unwrap().children[0];
    let high_indicator = high
        .get::<DirichletProcessParametersNode>(high_params)
        .unwrap()
        .children[0];
    let a = low.new_component_weight(low_indicator).unwrap();
    let b = high.new_component_weight(high_indicator).unwrap();
    assert!((b - 4.0 * a).abs() < 1e-12);
}

/// Readings keyed by the joint of the mixture component and a three-valued
/// observed `shelf`. An unrelated constant table is added first and erased,
/// so a deep copy has to renumber every handle.
fn shelved_mixture(shelf: &str) -> (BayesNetwork, NodeId, NodeId) {
    let mut net = BayesNetwork::with_seed(23);
    let spare = net.boolean("Spare", true).unwrap();
    let spare_table = ProbabilityTable::for_value(net.domains(), spare).unwrap();
    let spare = net.add_constant(spare_table);

    let reading = net.integer("Reading", 4, 0).unwrap().require_domain().unwrap();
    let component = net.domains_mut().register("Source", 0).unwrap();
    let place = net.integer(shelf, 3, 0).unwrap().require_domain().unwrap();
    let condition = net.domains_mut().register_joint(&[component, place]).unwrap();
    let cpt = ConditionalProbabilityTable::new(net.domains(), reading, condition);
    let table = net.add_conditional_dirichlet(cpt, 0.5).unwrap();
    let params = net
        .add_dirichlet_process_parameters("Source", 3.0, &[table])
        .unwrap();

    for i in 0..12 {
        let indicator = net.add_dirichlet_process(params).unwrap();
        let on = net.integer(shelf, 3, i % 3).unwrap();
        let on = net.add_categorical(on, None).unwrap();
        net.set_evidence(on, true).unwrap();
        let value = net.integer("Reading", 4, (i / 3) % 4).unwrap();
        let child = net
            .add_conditional_categorical(value, &[indicator, on], Some(table))
            .unwrap();
        net.set_evidence(child, true).unwrap();
    }
    assert_eq!(net.erase(spare).unwrap(), 1);
    (net, params, table)
}

fn assert_joint_rows(net: &BayesNetwork, params: NodeId, table: NodeId, label: &str) {
    let p = net.get::<DirichletProcessParametersNode>(params).unwrap();
    assert_eq!(p.occupancy(), seated_indicators(net, params), "{label}: occupancy");
    let components = net.domains().cardinality(p.component_domain);
    assert_eq!(p.counters.len(), components, "{label}: counters");

    let cpt = &net.get::<ConditionalDirichletNode>(table).unwrap().value;
    assert_eq!(cpt.len(), components * 3, "{label}: rows");
    for (condition, row) in cpt.rows() {
        let total: f64 = row.iter().map(|(_, p)| p).sum();
        assert!(
            (total - 1.0).abs() < 1e-9,
            "{label}: row {} sums to {total}",
            condition.index()
        );
    }
}

#[test]
fn joint_condition_with_the_component_listed_last() {
    // "Aisle" sorts before "Source".
    let (mut net, params, table) = shelved_mixture("Aisle");
    let first = net.get::<DirichletProcessParametersNode>(params).unwrap().children[0];
    for round in 0..6 {
        net.sample(first, 2, 5).unwrap();
        assert_joint_rows(&net, params, table, &format!("round {round}"));
    }
}

#[test]
fn joint_condition_with_the_component_listed_first() {
    // "Zone" sorts after "Source".
    let (mut net, params, table) = shelved_mixture("Zone");
    let first = net.get::<DirichletProcessParametersNode>(params).unwrap().children[0];
    for round in 0..6 {
        net.sample(first, 2, 5).unwrap();
        assert_joint_rows(&net, params, table, &format!("round {round}"));
    }
}

#[test]
fn deep_copy_of_a_sampled_mixture_is_remapped_and_independent() {
    let (mut net, params, table) = shelved_mixture("Aisle");
    let first = net.get::<DirichletProcessParametersNode>(params).unwrap().children[0];
    net.sample(first, 5, 10).unwrap();

    let counters = net.get::<DirichletProcessParametersNode>(params).unwrap().counters.clone();
    let rows = net.get::<ConditionalDirichletNode>(table).unwrap().value.clone();
    let seats: Vec<_> = net
        .get::<DirichletProcessParametersNode>(params)
        .unwrap()
        .children
        .iter()
        .map(|&c| net.get::<DirichletProcessNode>(c).unwrap().value)
        .collect();

    let mut copy = net.deep_copy().unwrap();
    assert_eq!(copy.size(), net.size());
    let copy_params = copy
        .find_by_name::<DirichletProcessParametersNode>("SourceParameters")
        .unwrap();
    assert_ne!(copy_params, params, "handles are compacted after the erase");
    let p = copy.get::<DirichletProcessParametersNode>(copy_params).unwrap();
    assert_eq!(p.counters, counters);
    assert_eq!(p.managed.len(), 1);
    let copy_table = p.managed[0];
    assert_eq!(copy.get::<ConditionalDirichletNode>(copy_table).unwrap().value, rows);
    let copy_seats: Vec<_> = p
        .children
        .iter()
        .map(|&c| copy.get::<DirichletProcessNode>(c).unwrap().value)
        .collect();
    assert_eq!(copy_seats, seats);
    assert_joint_rows(&copy, copy_params, copy_table, "copy");

    let copy_first = p.children[0];
    copy.reseed(99);
    for _ in 0..3 {
        copy.sample(copy_first, 2, 5).unwrap();
        assert_joint_rows(&copy, copy_params, copy_table, "sampled copy");
    }
    let original = net.get::<DirichletProcessParametersNode>(params).unwrap();
    assert_eq!(original.counters, counters);
    assert_eq!(net.get::<ConditionalDirichletNode>(table).unwrap().value, rows);
    assert_joint_rows(&net, params, table, "original");
}
