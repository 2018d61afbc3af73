//! Conjugate parameter learning.
//!
//! Every non-evidence Dirichlet and conditional Dirichlet node is replaced by
//! its point estimate given the evidence children: prior parameters plus one
//! count per observed child value, normalised. With positive parameters this
//! is the posterior mean (a smoothed MAP estimate); with all-zero parameters
//! it is the maximum-likelihood relative frequency.

use tracing::{debug, info};

use super::errors::NetError;
use super::network::BayesNetwork;
use super::node::{Node, NodeId};
use super::process::posterior_weights;
use super::tables::ProbabilityTable;
use super::value::DiscreteValue;

impl BayesNetwork {
    /// Learns every non-evidence table from the evidence children.
    ///
    /// A row without prior mass or observations becomes uniform. Failures are
    /// reported as network errors.
    pub fn learn(&mut self) -> Result<(), NetError> {
        let mut learned = 0usize;
        for id in self.node_ids() {
            let conditional = match self.node(id)? {
                Node::Dirichlet(n) if !n.evidence => false,
                Node::ConditionalDirichlet(n) if !n.evidence => true,
                _ => continue,
            };
            let result = if conditional {
                self.learn_rows(id)
            } else {
                self.learn_table(id)
            };
            result.map_err(|e| NetError::wrap_network("learning failed", e))?;
            learned += 1;
        }
        info!(tables = learned, "learned parameters");
        Ok(())
    }

    fn learn_table(&mut self, id: NodeId) -> Result<(), NetError> {
        let counts = self.table_child_counts(id, true)?;
        let Node::Dirichlet(n) = self.node(id)? else {
            return Err(NetError::network("expected a Dirichlet node"));
        };
        let variable = n.value.variable();
        let weights = posterior_weights(&self.prior_weights(&n.parameters, variable), Some(&counts));

        let mut table = ProbabilityTable::new(&self.domains, variable);
        table.assign(&weights);
        table.normalize();
        debug!(table = table.name(), "learned table");
        if let Node::Dirichlet(n) = self.node_mut(id)? {
            n.value = table;
        }
        Ok(())
    }

    fn learn_rows(&mut self, id: NodeId) -> Result<(), NetError> {
        let counts = self.row_child_counts(id, true)?;
        let Node::ConditionalDirichlet(n) = self.node(id)? else {
            return Err(NetError::network("expected a conditional Dirichlet node"));
        };
        let variable = n.value.variable();
        let condition = n.value.condition();
        let prior = self.prior_weights(&n.parameters, variable);

        let range = self.domains.range(condition);
        let keys: Vec<DiscreteValue> = if range.is_empty() {
            vec![DiscreteValue::new(condition, 0)]
        } else {
            range.iter().collect()
        };
        let mut rows = Vec::with_capacity(keys.len());
        for key in keys {
            let mut row = ProbabilityTable::new(&self.domains, variable);
            row.assign(&posterior_weights(&prior, counts.get(&key)));
            row.normalize();
            rows.push((key, row));
        }
        if let Node::ConditionalDirichlet(n) = self.node_mut(id)? {
            n.value.replace_rows(rows.into_iter().collect());
            debug!(table = n.value.name(), "learned conditional table");
        }
        Ok(())
    }
}
