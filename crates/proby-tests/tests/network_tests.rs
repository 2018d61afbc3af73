//! Structural tests: erase, deep copy and cross-reference bookkeeping.

use proby_core::scenarios::{self, BagOptions};
use proby_core::{
    BayesNetwork, CategoricalNode, ConditionalCategoricalNode, ConditionalProbabilityTable,
    NetError, ProbabilityTable,
};
use proby_tests::{assert_close, record};

fn two_row_bags() -> BayesNetwork {
    let records = vec![
        record(&[("Bag", "true"), ("Flavor", "true"), ("Wrapper", "false")]),
        record(&[("Bag", "false"), ("Flavor", "false"), ("Wrapper", "true")]),
    ];
    scenarios::bag_network(&records, &BagOptions::default()).unwrap()
}

#[test]
fn erasing_a_leaf_scrubs_every_children_list() {
    let mut net = two_row_bags();
    assert_eq!(net.size(), 9);
    let flavor = net.find_by_name::<ConditionalCategoricalNode>("Flavor").unwrap();
    let parents = net.node(flavor).unwrap().parents().to_vec();

    assert_eq!(net.erase(flavor).unwrap(), 1);
    assert_eq!(net.size(), 8);
    assert!(!net.contains(flavor));
    for id in net.node_ids() {
        assert!(
            !net.node(id).unwrap().children().contains(&flavor),
            "node {:?} still lists the erased node",
            id
        );
    }
    for parent in parents {
        assert!(net.contains(parent));
    }
}

#[test]
fn erasing_a_parent_fails_without_mutation() {
    let mut net = two_row_bags();
    let bag = net.find_by_name::<CategoricalNode>("Bag").unwrap();
    let children_before: Vec<_> = net
        .node_ids()
        .into_iter()
        .map(|id| net.node(id).unwrap().children().to_vec())
        .collect();

    let err = net.erase(bag).unwrap_err();
    assert!(matches!(err, NetError::InvalidArgument(_)));
    assert_eq!(net.size(), 9);
    let children_after: Vec<_> = net
        .node_ids()
        .into_iter()
        .map(|id| net.node(id).unwrap().children().to_vec())
        .collect();
    assert_eq!(children_before, children_after);
}

#[test]
fn erasing_an_already_erased_node_removes_nothing() {
    let mut net = two_row_bags();
    let wrapper = net.find_by_name::<ConditionalCategoricalNode>("Wrapper").unwrap();
    assert_eq!(net.erase(wrapper).unwrap(), 1);
    assert_eq!(net.erase(wrapper).unwrap(), 0);
    assert_eq!(net.size(), 8);
}

#[test]
fn handles_stay_valid_after_erase() {
    let mut net = two_row_bags();
    let ids = net.node_ids();
    let last = *ids.last().unwrap();
    let last_name = net.name(last).unwrap();
    net.erase(last).unwrap();
    let flavor = net.find_by_name::<ConditionalCategoricalNode>("Flavor").unwrap();
    assert_eq!(net.name(flavor).unwrap(), "Flavor");
    assert!(!net.contains(last));
    assert!(!last_name.is_empty());
}

#[test]
fn sampling_after_erasing_contradicting_evidence_follows_the_prior() {
    let mut net = BayesNetwork::with_seed(7);
    let coin = net.boolean("Coin", true).unwrap();
    let signal = net.boolean("Signal", true).unwrap();

    let mut prior = ProbabilityTable::for_value(net.domains(), coin).unwrap();
    prior.assign(&[0.9, 0.1]);
    let prior = net.add_constant(prior);
    let mut cpt = ConditionalProbabilityTable::for_values(net.domains_mut(), signal, &[coin]).unwrap();
    cpt.row_mut(coin.with_index(0)).unwrap().assign(&[0.99, 0.01]);
    cpt.row_mut(coin.with_index(1)).unwrap().assign(&[0.01, 0.99]);
    let cpt = net.add_constant(cpt);

    let coin_node = net.add_categorical(coin, Some(prior)).unwrap();
    let signal_node = net
        .add_conditional_categorical(signal, &[coin_node], Some(cpt))
        .unwrap();
    net.set_evidence(signal_node, true).unwrap();

    let with_signal = net.enumerate(coin_node).unwrap();
    assert!(with_signal.get(coin) > with_signal.get(coin.with_index(0)));

    net.erase(signal_node).unwrap();
    let estimate = net.sample(coin_node, 50, 1000).unwrap();
    assert!(estimate.get(coin.with_index(0)) > estimate.get(coin));
    assert_close(estimate.total(), 1.0, 1e-9, "sampled total");
}

#[test]
fn deep_copy_answers_queries_identically() {
    let (net, nodes) = scenarios::alarm_network().unwrap();
    let mut original = net;
    let mut copy = original.deep_copy().unwrap();
    assert_eq!(copy.size(), original.size());

    let a = original.enumerate(nodes.burglary).unwrap();
    let b = copy.enumerate(nodes.burglary).unwrap();
    assert_eq!(a, b);
}

#[test]
fn deep_copy_is_independent_of_the_original() {
    let (mut original, nodes) = scenarios::alarm_network().unwrap();
    let mut copy = original.deep_copy().unwrap();

    copy.set_evidence(nodes.mary_calls, false).unwrap();
    copy.erase(nodes.mary_calls).unwrap();
    assert_eq!(copy.size() + 1, original.size());
    assert!(original.is_evidence(nodes.mary_calls).unwrap());

    let posterior = original.enumerate(nodes.burglary).unwrap();
    let burglary = original.value(nodes.burglary).unwrap().with_index(1);
    assert_close(posterior.get(burglary), 0.284, 1e-3, "original posterior");
}

#[test]
fn find_by_name_reports_missing_nodes() {
    let net = two_row_bags();
    assert!(matches!(
        net.find_by_name::<CategoricalNode>("Hole"),
        Err(NetError::OutOfRange(_))
    ));
    // Kind filtering: "Flavor" exists, but only as a conditional categorical.
    assert!(net.find_by_name::<CategoricalNode>("Flavor").is_err());
}

#[test]
fn dump_lists_every_live_node() {
    let mut net = two_row_bags();
    let flavor = net.find_by_name::<ConditionalCategoricalNode>("Flavor").unwrap();
    net.erase(flavor).unwrap();
    let text = net.dump().to_string();
    assert!(text.starts_with("Vertices of the Bayesian network:"));
    assert_eq!(text.lines().count(), 1 + net.size());
    assert_eq!(text.matches("'Flavor'").count(), 1);
}
