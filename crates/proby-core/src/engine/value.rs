//! Discrete values, domain ranges and joint (mixed-radix) values.

use std::fmt;

use smallvec::SmallVec;

use super::domain::{radix_compose, DomainId, DomainRegistry};
use super::errors::NetError;

/// A (domain, index) pair.
///
/// `index == cardinality` is the end sentinel; a value without a domain is
/// the empty value. Values order by domain identity, then index.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DiscreteValue {
    domain: Option<DomainId>,
    index: usize,
}

impl DiscreteValue {
    pub const EMPTY: DiscreteValue = DiscreteValue {
        domain: None,
        index: 0,
    };

    pub fn new(domain: DomainId, index: usize) -> Self {
        Self {
            domain: Some(domain),
            index,
        }
    }

    pub fn domain(&self) -> Option<DomainId> {
        self.domain
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn is_empty(&self) -> bool {
        self.domain.is_none()
    }

    pub fn require_domain(&self) -> Result<DomainId, NetError> {
        self.domain
            .ok_or_else(|| NetError::EmptyValue("value has no domain".into()))
    }

    /// Same domain, different index.
    pub fn with_index(self, index: usize) -> Self {
        Self { index, ..self }
    }

    pub fn is_end(&self, registry: &DomainRegistry) -> bool {
        match self.domain {
            Some(id) => self.index >= registry.cardinality(id),
            None => true,
        }
    }

    /// Steps to the next index; stepping past the end sentinel fails.
    pub fn increment(&mut self, registry: &DomainRegistry) -> Result<(), NetError> {
        let id = self.require_domain()?;
        if self.index >= registry.cardinality(id) {
            return Err(NetError::OutOfRange(format!(
                "cannot increment '{}' past its end",
                registry.name(id)
            )));
        }
        self.index += 1;
        Ok(())
    }

    pub fn decrement(&mut self, registry: &DomainRegistry) -> Result<(), NetError> {
        let id = self.require_domain()?;
        if self.index == 0 {
            return Err(NetError::OutOfRange(format!(
                "cannot decrement '{}' below zero",
                registry.name(id)
            )));
        }
        self.index -= 1;
        Ok(())
    }

    /// Renders as `name:index`.
    pub fn display<'a>(&self, registry: &'a DomainRegistry) -> ValueDisplay<'a> {
        ValueDisplay {
            value: *self,
            registry,
        }
    }
}

pub struct ValueDisplay<'a> {
    value: DiscreteValue,
    registry: &'a DomainRegistry,
}

impl fmt::Display for ValueDisplay<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.value.domain {
            Some(id) => write!(f, "{}:{}", self.registry.name(id), self.value.index),
            None => write!(f, "<empty>"),
        }
    }
}

/// The values `[0, size)` of one domain, captured at construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Range {
    domain: DomainId,
    size: usize,
}

impl Range {
    pub fn new(domain: DomainId, size: usize) -> Self {
        Self { domain, size }
    }

    pub fn begin(&self) -> DiscreteValue {
        DiscreteValue::new(self.domain, 0)
    }

    /// The end sentinel (`index == size`).
    pub fn end(&self) -> DiscreteValue {
        DiscreteValue::new(self.domain, self.size)
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn is_empty(&self) -> bool {
        self.size == 0
    }

    pub fn contains(&self, value: DiscreteValue) -> bool {
        value.domain() == Some(self.domain) && value.index() < self.size
    }

    pub fn iter(&self) -> RangeIter {
        RangeIter {
            domain: self.domain,
            next: 0,
            size: self.size,
        }
    }
}

impl IntoIterator for Range {
    type Item = DiscreteValue;
    type IntoIter = RangeIter;

    fn into_iter(self) -> RangeIter {
        self.iter()
    }
}

#[derive(Debug, Clone)]
pub struct RangeIter {
    domain: DomainId,
    next: usize,
    size: usize,
}

impl Iterator for RangeIter {
    type Item = DiscreteValue;

    fn next(&mut self) -> Option<DiscreteValue> {
        if self.next >= self.size {
            return None;
        }
        let value = DiscreteValue::new(self.domain, self.next);
        self.next += 1;
        Some(value)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let left = self.size.saturating_sub(self.next);
        (left, Some(left))
    }
}

impl ExactSizeIterator for RangeIter {}

/// Builder for a composite value over several domains.
///
/// Members are kept sorted by domain name; composing registers the joint
/// domain and packs the member indices by mixed-radix encoding.
#[derive(Debug, Clone, Default)]
pub struct JointValue {
    members: SmallVec<[DiscreteValue; 4]>,
}

impl JointValue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, registry: &DomainRegistry, value: DiscreteValue) -> Result<(), NetError> {
        let id = value.require_domain()?;
        if self.members.iter().any(|m| m.domain() == Some(id)) {
            return Err(NetError::AlreadyPresent(format!(
                "domain '{}' is already part of the joint value",
                registry.name(id)
            )));
        }
        let name = registry.name(id);
        let at = self
            .members
            .iter()
            .position(|m| m.domain().map(|d| registry.name(d)) > Some(name))
            .unwrap_or(self.members.len());
        self.members.insert(at, value);
        Ok(())
    }

    pub fn members(&self) -> &[DiscreteValue] {
        &self.members
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn compose(&self, registry: &mut DomainRegistry) -> Result<DiscreteValue, NetError> {
        let domains: SmallVec<[DomainId; 4]> =
            self.members.iter().filter_map(|m| m.domain()).collect();
        let joint = registry.register_joint(&domains)?;
        let digits: SmallVec<[usize; 4]> = self.members.iter().map(|m| m.index()).collect();
        let radices: SmallVec<[usize; 4]> =
            domains.iter().map(|&d| registry.cardinality(d)).collect();
        Ok(DiscreteValue::new(joint, radix_compose(&digits, &radices)))
    }
}
