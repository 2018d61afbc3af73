//! Domain registry: named discrete domains and their cardinalities.
//!
//! A domain is identified by name and owns a cardinality that may grow after
//! creation but never shrinks. Joint domains are registered with their ordered
//! member list; their cardinality is always the product of the members'
//! current cardinalities, so growing a member grows every joint built on it.
//!
//! The registry is owned by a [`crate::BayesNetwork`]; independent networks do
//! not share domains.

use rustc_hash::FxHashMap;
use smallvec::SmallVec;

use super::errors::NetError;
use super::value::{DiscreteValue, Range};

/// Handle of a registered domain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(transparent)]
pub struct DomainId(pub u32);

/// Member list of a joint domain. Most conditions have one to three parents.
pub type DomainMembers = SmallVec<[DomainId; 4]>;

#[derive(Debug, Clone)]
struct Domain {
    id: DomainId,
    name: String,
    cardinality: usize,
    /// Empty for plain domains; sorted by member name for joint domains.
    members: DomainMembers,
}

/// Append-only table of domains keyed by name.
#[derive(Debug, Clone, Default)]
pub struct DomainRegistry {
    domains: Vec<Domain>,
    by_name: FxHashMap<String, DomainId>,
}

impl DomainRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of registered domains, joints included.
    pub fn len(&self) -> usize {
        self.domains.len()
    }

    pub fn is_empty(&self) -> bool {
        self.domains.is_empty()
    }

    /// Registers `name` with `cardinality`, or grows the existing domain.
    ///
    /// Requests for a smaller cardinality keep the current one.
    pub fn register(&mut self, name: &str, cardinality: usize) -> Result<DomainId, NetError> {
        if let Some(&id) = self.by_name.get(name) {
            self.grow(id, cardinality)?;
            return Ok(id);
        }
        Ok(self.push(name.to_string(), cardinality, DomainMembers::new()))
    }

    /// Raises the cardinality of a plain domain to at least `cardinality`.
    pub fn grow(&mut self, id: DomainId, cardinality: usize) -> Result<(), NetError> {
        let domain = self.entry_mut(id)?;
        if !domain.members.is_empty() {
            return Err(NetError::Logic(format!(
                "joint domain '{}' cannot be resized directly",
                domain.name
            )));
        }
        domain.cardinality = domain.cardinality.max(cardinality);
        Ok(())
    }

    /// Registers the joint domain of `members`.
    ///
    /// Members are ordered by name; the joint name is the concatenation of the
    /// member names. A single member is its own joint domain.
    pub fn register_joint(&mut self, members: &[DomainId]) -> Result<DomainId, NetError> {
        let mut sorted: DomainMembers = members.iter().copied().collect();
        for &id in &sorted {
            self.entry(id)?;
        }
        sorted.sort_by(|a, b| self.name(*a).cmp(self.name(*b)));
        for pair in sorted.windows(2) {
            if pair[0] == pair[1] {
                return Err(NetError::AlreadyPresent(format!(
                    "domain '{}' appears twice in a joint value",
                    self.name(pair[0])
                )));
            }
        }
        match sorted.len() {
            0 => Err(NetError::InvalidArgument(
                "a joint domain needs at least one member".into(),
            )),
            1 => Ok(sorted[0]),
            _ => {
                let name: String = sorted.iter().map(|&id| self.name(id)).collect();
                if let Some(&existing) = self.by_name.get(&name) {
                    if self.domains[existing.0 as usize].members == sorted {
                        return Ok(existing);
                    }
                    return Err(NetError::Logic(format!(
                        "domain name '{name}' is already used by a different domain"
                    )));
                }
                Ok(self.push(name, 0, sorted))
            }
        }
    }

    pub fn lookup(&self, name: &str) -> Option<DomainId> {
        self.by_name.get(name).copied()
    }

    /// Name of a domain; unknown handles render as `"?"`.
    pub fn name(&self, id: DomainId) -> &str {
        self.domains
            .get(id.0 as usize)
            .map(|d| d.name.as_str())
            .unwrap_or("?")
    }

    /// Current cardinality; joint domains multiply their members.
    pub fn cardinality(&self, id: DomainId) -> usize {
        match self.domains.get(id.0 as usize) {
            Some(domain) if domain.members.is_empty() => domain.cardinality,
            Some(domain) => domain
                .members
                .iter()
                .map(|&m| self.cardinality(m))
                .product(),
            None => 0,
        }
    }

    /// Member domains of `id`; a plain domain is its own single member.
    pub fn members(&self, id: DomainId) -> &[DomainId] {
        match self.domains.get(id.0 as usize) {
            Some(domain) if domain.members.is_empty() => std::slice::from_ref(&domain.id),
            Some(domain) => &domain.members,
            None => &[],
        }
    }

    pub fn is_joint(&self, id: DomainId) -> bool {
        self.domains
            .get(id.0 as usize)
            .is_some_and(|d| !d.members.is_empty())
    }

    pub fn range(&self, id: DomainId) -> Range {
        Range::new(id, self.cardinality(id))
    }

    /// Value `index` of domain `id`; `index == cardinality` yields the end
    /// sentinel.
    pub fn value(&self, id: DomainId, index: usize) -> Result<DiscreteValue, NetError> {
        let cardinality = self.entry(id).map(|_| self.cardinality(id))?;
        if index > cardinality {
            return Err(NetError::OutOfRange(format!(
                "index {index} exceeds cardinality {cardinality} of '{}'",
                self.name(id)
            )));
        }
        Ok(DiscreteValue::new(id, index))
    }

    /// A boolean value: `false` is index 0, `true` is index 1.
    pub fn boolean(&mut self, name: &str, flag: bool) -> Result<DiscreteValue, NetError> {
        let id = self.register(name, 2)?;
        Ok(DiscreteValue::new(id, usize::from(flag)))
    }

    /// An integer value in a domain of (at least) `cardinality` values.
    pub fn integer(
        &mut self,
        name: &str,
        cardinality: usize,
        index: usize,
    ) -> Result<DiscreteValue, NetError> {
        let id = self.register(name, cardinality)?;
        self.value(id, index)
    }

    /// Parses one textual observation.
    ///
    /// `true`/`false` become boolean values; a non-negative integer `k`
    /// becomes value `k` of an integer domain grown to at least `k + 1`.
    pub fn observe(&mut self, name: &str, text: &str) -> Result<DiscreteValue, NetError> {
        let text = text.trim();
        match text {
            "true" => self.boolean(name, true),
            "false" => self.boolean(name, false),
            _ => {
                let index: usize = text.parse().map_err(|_| {
                    NetError::InvalidArgument(format!(
                        "cannot interpret '{text}' as an observation of '{name}'"
                    ))
                })?;
                self.integer(name, index + 1, index)
            }
        }
    }

    /// Textual form of a value: `"true"`/`"false"` for boolean domains, the
    /// index otherwise.
    pub fn text(&self, value: DiscreteValue) -> String {
        match value.domain() {
            Some(id) if self.cardinality(id) == 2 && !self.is_joint(id) => {
                if value.index() == 1 { "true" } else { "false" }.to_string()
            }
            _ => value.index().to_string(),
        }
    }

    /// Splits a joint value into one value per member domain.
    pub fn decompose(&self, value: DiscreteValue) -> Result<SmallVec<[DiscreteValue; 4]>, NetError> {
        let id = value.require_domain()?;
        let members = self.members(id);
        let cardinalities: SmallVec<[usize; 4]> =
            members.iter().map(|&m| self.cardinality(m)).collect();
        let digits = radix_decompose(value.index(), &cardinalities);
        Ok(members
            .iter()
            .zip(digits)
            .map(|(&m, digit)| DiscreteValue::new(m, digit))
            .collect())
    }

    fn push(&mut self, name: String, cardinality: usize, members: DomainMembers) -> DomainId {
        let id = DomainId(self.domains.len() as u32);
        self.by_name.insert(name.clone(), id);
        self.domains.push(Domain {
            id,
            name,
            cardinality,
            members,
        });
        id
    }

    fn entry(&self, id: DomainId) -> Result<&Domain, NetError> {
        self.domains
            .get(id.0 as usize)
            .ok_or_else(|| NetError::OutOfRange(format!("unknown domain #{}", id.0)))
    }

    fn entry_mut(&mut self, id: DomainId) -> Result<&mut Domain, NetError> {
        self.domains
            .get_mut(id.0 as usize)
            .ok_or_else(|| NetError::OutOfRange(format!("unknown domain #{}", id.0)))
    }
}

/// Mixed-radix composition: `Σ digit_i * Π_{j<i} radix_j`.
pub fn radix_compose(digits: &[usize], radices: &[usize]) -> usize {
    let mut index = 0;
    let mut stride = 1;
    for (&digit, &radix) in digits.iter().zip(radices) {
        index += digit * stride;
        stride *= radix;
    }
    index
}

/// Inverse of [`radix_compose`]. Zero radices yield zero digits.
pub fn radix_decompose(mut index: usize, radices: &[usize]) -> SmallVec<[usize; 4]> {
    radices
        .iter()
        .map(|&radix| {
            if radix == 0 {
                return 0;
            }
            let digit = index % radix;
            index /= radix;
            digit
        })
        .collect()
}
