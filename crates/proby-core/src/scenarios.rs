//! Ready-made networks: the burglary alarm, the candy bag and its
//! infinite-mixture variant.
//!
//! The bag networks are built from tabular records (column name → text). Every
//! column other than `Bag` becomes a boolean or integer attribute drawn from a
//! conditional Dirichlet table given the bag.

use std::collections::BTreeMap;

use crate::engine::domain::DomainId;
use crate::engine::errors::NetError;
use crate::engine::network::BayesNetwork;
use crate::engine::node::NodeId;
use crate::engine::tables::{ConditionalProbabilityTable, ProbabilityTable};
use crate::engine::value::{DiscreteValue, JointValue};

/// One data row: column name → textual value.
pub type Record = BTreeMap<String, String>;

/// Column holding the bag in bag data.
pub const BAG_COLUMN: &str = "Bag";

/// Handles of the alarm network's variables.
#[derive(Debug, Clone, Copy)]
pub struct AlarmNodes {
    pub burglary: NodeId,
    pub earthquake: NodeId,
    pub alarm: NodeId,
    pub john_calls: NodeId,
    pub mary_calls: NodeId,
}

/// The burglary / earthquake / alarm network with both calls observed true.
pub fn alarm_network() -> Result<(BayesNetwork, AlarmNodes), NetError> {
    let mut net = BayesNetwork::new();
    let burglary = net.boolean("Burglary", true)?;
    let earthquake = net.boolean("Earthquake", true)?;
    let alarm = net.boolean("Alarm", true)?;
    let john = net.boolean("JohnCalls", true)?;
    let mary = net.boolean("MaryCalls", true)?;

    let mut table = ProbabilityTable::for_value(net.domains(), burglary)?;
    table.assign(&[0.999, 0.001]);
    let burglary_table = net.add_constant(table);
    let mut table = ProbabilityTable::for_value(net.domains(), earthquake)?;
    table.assign(&[0.998, 0.002]);
    let earthquake_table = net.add_constant(table);

    let mut alarm_cpt =
        ConditionalProbabilityTable::for_values(net.domains_mut(), alarm, &[burglary, earthquake])?;
    for (b, e, p) in [
        (true, true, 0.95),
        (true, false, 0.94),
        (false, true, 0.29),
        (false, false, 0.001),
    ] {
        let mut joint = JointValue::new();
        joint.insert(net.domains(), burglary.with_index(usize::from(b)))?;
        joint.insert(net.domains(), earthquake.with_index(usize::from(e)))?;
        let key = joint.compose(net.domains_mut())?;
        alarm_cpt.row_mut(key)?.assign(&[1.0 - p, p]);
    }
    let alarm_table = net.add_constant(alarm_cpt);

    let calls = |net: &mut BayesNetwork, var: DiscreteValue, given_alarm: f64, given_quiet: f64| {
        let mut cpt = ConditionalProbabilityTable::for_values(net.domains_mut(), var, &[alarm])?;
        cpt.row_mut(alarm.with_index(1))?
            .assign(&[1.0 - given_alarm, given_alarm]);
        cpt.row_mut(alarm.with_index(0))?
            .assign(&[1.0 - given_quiet, given_quiet]);
        Ok::<_, NetError>(net.add_constant(cpt))
    };
    let john_table = calls(&mut net, john, 0.9, 0.05)?;
    let mary_table = calls(&mut net, mary, 0.7, 0.01)?;

    let burglary_node = net.add_categorical(burglary, Some(burglary_table))?;
    let earthquake_node = net.add_categorical(earthquake, Some(earthquake_table))?;
    let alarm_node =
        net.add_conditional_categorical(alarm, &[burglary_node, earthquake_node], Some(alarm_table))?;
    let john_node = net.add_conditional_categorical(john, &[alarm_node], Some(john_table))?;
    let mary_node = net.add_conditional_categorical(mary, &[alarm_node], Some(mary_table))?;
    net.set_evidence(john_node, true)?;
    net.set_evidence(mary_node, true)?;

    Ok((
        net,
        AlarmNodes {
            burglary: burglary_node,
            earthquake: earthquake_node,
            alarm: alarm_node,
            john_calls: john_node,
            mary_calls: mary_node,
        },
    ))
}

/// Options for [`bag_network`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BagOptions {
    /// Symmetric Dirichlet parameter of every table; 0 learns ML estimates.
    pub alpha: f64,
    /// Whether the bag of each record is evidence or hidden.
    pub fully_observed: bool,
    /// Number of leading records to load; `None` loads all.
    pub lines_of_evidence: Option<usize>,
}

impl Default for BagOptions {
    fn default() -> Self {
        Self {
            alpha: 5.0,
            fully_observed: true,
            lines_of_evidence: None,
        }
    }
}

/// The candy-bag network: a Dirichlet prior over `Bag`, one conditional
/// Dirichlet table per attribute given `Bag`, and one bag node with its
/// observed attributes per record.
pub fn bag_network(records: &[Record], options: &BagOptions) -> Result<BayesNetwork, NetError> {
    let mut net = BayesNetwork::new();
    let records = match options.lines_of_evidence {
        Some(n) => &records[..n.min(records.len())],
        None => records,
    };
    let attributes = register_attributes(&mut net, records)?;
    let bag = net.boolean(BAG_COLUMN, true)?;
    for text in records.iter().filter_map(|r| r.get(BAG_COLUMN)) {
        net.observe(BAG_COLUMN, text)?;
    }
    let bag_domain = bag.require_domain()?;

    let bag_table = ProbabilityTable::for_value(net.domains(), bag)?;
    let bag_params = net.add_dirichlet(bag_table, options.alpha)?;
    let mut tables = BTreeMap::new();
    for (name, &domain) in &attributes {
        let cpt = ConditionalProbabilityTable::new(net.domains(), domain, bag_domain);
        tables.insert(name.clone(), net.add_conditional_dirichlet(cpt, options.alpha)?);
    }

    for record in records {
        let bag_value = match record.get(BAG_COLUMN) {
            Some(text) => net.observe(BAG_COLUMN, text)?,
            None => bag,
        };
        let bag_node = net.add_categorical(bag_value, Some(bag_params))?;
        let observed = options.fully_observed && record.contains_key(BAG_COLUMN);
        net.set_evidence(bag_node, observed)?;
        add_attribute_nodes(&mut net, record, &tables, bag_node)?;
    }
    Ok(net)
}

/// Dirichlet-process variant of [`bag_network`]: the bag of each record is a
/// latent component indicator and the number of bags is unbounded. A `Bag`
/// column in the data is ignored.
pub fn infinite_bag_network(
    records: &[Record],
    alpha: f64,
    concentration: f64,
) -> Result<BayesNetwork, NetError> {
    let mut net = BayesNetwork::new();
    let attributes = register_attributes(&mut net, records)?;
    let component_domain = net.domains_mut().register(BAG_COLUMN, 0)?;

    let mut tables = BTreeMap::new();
    for (name, &domain) in &attributes {
        let cpt = ConditionalProbabilityTable::new(net.domains(), domain, component_domain);
        tables.insert(name.clone(), net.add_conditional_dirichlet(cpt, alpha)?);
    }
    let managed: Vec<NodeId> = tables.values().copied().collect();
    let params = net.add_dirichlet_process_parameters(BAG_COLUMN, concentration, &managed)?;

    for record in records {
        let indicator = net.add_dirichlet_process(params)?;
        add_attribute_nodes(&mut net, record, &tables, indicator)?;
    }
    Ok(net)
}

/// Observes every attribute value once so each domain reaches its final
/// cardinality before any table is built.
fn register_attributes(
    net: &mut BayesNetwork,
    records: &[Record],
) -> Result<BTreeMap<String, DomainId>, NetError> {
    let mut attributes = BTreeMap::new();
    for record in records {
        for (name, text) in record {
            if name == BAG_COLUMN {
                continue;
            }
            let value = net.observe(name, text)?;
            attributes.insert(name.clone(), value.require_domain()?);
        }
    }
    Ok(attributes)
}

fn add_attribute_nodes(
    net: &mut BayesNetwork,
    record: &Record,
    tables: &BTreeMap<String, NodeId>,
    parent: NodeId,
) -> Result<(), NetError> {
    for (name, text) in record {
        let Some(&table) = tables.get(name) else {
            continue;
        };
        let value = net.observe(name, text)?;
        let node = net.add_conditional_categorical(value, &[parent], Some(table))?;
        net.set_evidence(node, true)?;
    }
    Ok(())
}
