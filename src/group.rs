// SPDX-License-Identifier: MIT OR Apache-2.0

use std::fmt::{self, Debug, Display};

use crate::error::PolicyError;
use crate::peer::{Peer, PeerLookup};

/// A satisfaction tree over peers and organizations.
///
/// Endorsement policies compile into trees of this type and are normalized
/// into an OR-of-ANDs form by [`Group::reduce`] before concrete peers are
/// picked. The four variants form a closed algebra:
///
/// - `All`: every child must be satisfied together (conjunction).
/// - `Any`: satisfying one child satisfies the whole (disjunction).
/// - `Peers`: terminal group of concrete, already-known peers.
/// - `Msp`: terminal group bound to an organization, resolved to concrete
///   peers only when queried.
///
/// Policies legitimately contain peers at the leaves only; `All` and `Any`
/// children are always groups. A bare peer item is expressed as a singleton
/// `Peers` terminal.
#[derive(Clone, Debug)]
pub enum Group<P> {
    All(Vec<Group<P>>),
    Any(Vec<Group<P>>),
    Peers(Vec<P>),
    Msp(MspGroup<P>),
}

/// A terminal group bound to an organization rather than to concrete peers.
///
/// The member peers are looked up lazily on every query, so a single compiled
/// policy can be resolved repeatedly while the live peer population changes
/// underneath it. An empty organization identifier is the wildcard and
/// matches every peer.
#[derive(Clone)]
pub struct MspGroup<P> {
    msp_id: String,
    lookup: PeerLookup<P>,
}

impl<P: Peer> MspGroup<P> {
    pub fn new(msp_id: impl Into<String>, lookup: PeerLookup<P>) -> Self {
        Self {
            msp_id: msp_id.into(),
            lookup,
        }
    }

    pub fn msp_id(&self) -> &str {
        &self.msp_id
    }

    /// Resolve the organization to its currently known peers.
    pub fn peers(&self) -> Vec<P> {
        (self.lookup)(&self.msp_id)
    }
}

impl<P> Debug for MspGroup<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MspGroup")
            .field("msp_id", &self.msp_id)
            .finish_non_exhaustive()
    }
}

impl<P> Display for MspGroup<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.msp_id.is_empty() {
            write!(f, "*")
        } else {
            write!(f, "{}", self.msp_id)
        }
    }
}

impl<P: Peer> Group<P> {
    /// Structural equality treating children as an unordered set.
    ///
    /// Two groups are equal when they have the same variant and every child
    /// of one is found in the other (mutual containment). Duplicate children
    /// are not distinguished, matching the reference behavior for policies
    /// which name the same organization at several tree positions. Two `Msp`
    /// terminals compare by organization identifier.
    pub fn equals(&self, other: &Group<P>) -> bool {
        match (self, other) {
            (Group::Peers(left), Group::Peers(right)) => {
                left.iter().all(|peer| right.contains(peer))
                    && right.iter().all(|peer| left.contains(peer))
            }
            (Group::Msp(left), Group::Msp(right)) => left.msp_id == right.msp_id,
            (Group::All(left), Group::All(right)) | (Group::Any(left), Group::Any(right)) => {
                left.iter().all(|item| right.iter().any(|o| item.equals(o)))
                    && right.iter().all(|item| left.iter().any(|o| item.equals(o)))
            }
            _ => false,
        }
    }

    /// Flatten nested conjunctions.
    ///
    /// Nested `All` children are spliced into the parent item list
    /// (associativity of conjunction), adjacent `Peers` terminals are merged
    /// into one, and duplicate items are dropped. Disjunctions and terminals
    /// pass through unchanged. The set of leaves reachable from the result is
    /// always the same as before, only nesting depth changes.
    pub fn collapse(&self) -> Group<P> {
        let Group::All(children) = self else {
            return self.clone();
        };

        let mut items: Vec<Group<P>> = Vec::new();
        let mut peers: Vec<P> = Vec::new();
        for child in children {
            match child.collapse() {
                Group::All(nested) => {
                    for item in nested {
                        match item {
                            Group::Peers(more) => merge_peers(&mut peers, more),
                            other => push_unique(&mut items, other),
                        }
                    }
                }
                Group::Peers(more) => merge_peers(&mut peers, more),
                other => push_unique(&mut items, other),
            }
        }

        if items.is_empty() {
            return Group::Peers(peers);
        }
        if !peers.is_empty() {
            items.push(Group::Peers(peers));
        }
        if items.len() == 1 {
            items.remove(0)
        } else {
            Group::All(items)
        }
    }

    /// Normalize into a flat list of OR-terms.
    ///
    /// Every returned term is a fully collapsed conjunction whose items are
    /// terminal `Peers`/`Msp` groups only; no two terms are
    /// [`equals`](Group::equals)-duplicates. This computes a disjunctive
    /// normal form over the group algebra:
    ///
    /// - terminals reduce to themselves;
    /// - a disjunction reduces to the union of its children's terms;
    /// - a conjunction with a single child passes through to that child, and
    ///   otherwise distributes over its children's alternatives (the cross
    ///   product of picking one term per child).
    pub fn reduce(&self) -> Vec<Group<P>> {
        match self {
            Group::Peers(_) | Group::Msp(_) => vec![self.clone()],
            Group::Any(children) => {
                let mut terms = Vec::new();
                for child in children {
                    for term in child.reduce() {
                        push_unique(&mut terms, term);
                    }
                }
                terms
            }
            Group::All(children) => {
                if children.len() == 1 {
                    return children[0].reduce();
                }
                let alternatives: Vec<Vec<Group<P>>> =
                    children.iter().map(|child| child.reduce()).collect();
                and(&alternatives)
            }
        }
    }
}

impl<P: Peer + Display> Display for Group<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Group::All(children) => write_joined(f, children, " AND "),
            Group::Any(children) => write_joined(f, children, " OR "),
            Group::Peers(peers) => {
                write!(f, "[")?;
                for (i, peer) in peers.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{peer}")?;
                }
                write!(f, "]")
            }
            Group::Msp(msp) => write!(f, "{msp}"),
        }
    }
}

fn write_joined<P: Peer + Display>(
    f: &mut fmt::Formatter<'_>,
    children: &[Group<P>],
    separator: &str,
) -> fmt::Result {
    write!(f, "(")?;
    for (i, child) in children.iter().enumerate() {
        if i > 0 {
            write!(f, "{separator}")?;
        }
        write!(f, "{child}")?;
    }
    write!(f, ")")
}

/// Expand a threshold over alternatives into enumerated choices.
///
/// Returns a disjunction whose children are all C(N, K) combinations of
/// `threshold` of the given `choices`, each combination a conjunction of the
/// chosen children (a single-child combination stays unwrapped). The full
/// combination set materializes eagerly. A threshold of zero or one exceeding
/// the number of choices is a construction-time error, never a silent
/// truncation.
pub fn n_of<P: Peer>(threshold: usize, choices: &[Group<P>]) -> Result<Group<P>, PolicyError> {
    if threshold == 0 || threshold > choices.len() {
        return Err(PolicyError::ThresholdOutOfRange {
            threshold,
            size: choices.len(),
        });
    }

    let combinations = combinations(threshold, choices)
        .into_iter()
        .map(|mut combination| {
            if combination.len() == 1 {
                combination.remove(0)
            } else {
                Group::All(combination)
            }
        })
        .collect();
    Ok(Group::Any(combinations))
}

/// Conjunction distributed over alternatives.
///
/// Takes one list of alternatives per conjunction slot and produces one
/// collapsed, deduplicated AND-term per element of the cross product — the
/// distributive law of the algebra. [`Group::reduce`] uses it to combine the
/// reduced children of a conjunction, and resolution uses it again to expand
/// lazy organization slots into concrete peer choices. A slot with no
/// alternatives makes the whole product empty.
pub(crate) fn and<P: Peer>(alternatives: &[Vec<Group<P>>]) -> Vec<Group<P>> {
    let mut terms = Vec::new();
    for combination in cross_product(alternatives) {
        push_unique(&mut terms, Group::All(combination).collapse());
    }
    terms
}

/// All ways of picking one element from each set, left to right.
///
/// Yields at most `s1 * s2 * ... * sn` combinations; an empty input set makes
/// the whole product empty.
fn cross_product<T: Clone>(sets: &[Vec<T>]) -> Vec<Vec<T>> {
    if sets.iter().any(Vec::is_empty) {
        return Vec::new();
    }
    let mut product: Vec<Vec<T>> = vec![Vec::new()];
    for set in sets {
        let mut next = Vec::with_capacity(product.len() * set.len());
        for prefix in &product {
            for choice in set {
                let mut combination = prefix.clone();
                combination.push(choice.clone());
                next.push(combination);
            }
        }
        product = next;
    }
    product
}

/// Every K-element combination of `items`, preserving left-to-right order.
fn combinations<T: Clone>(k: usize, items: &[T]) -> Vec<Vec<T>> {
    if k == 1 {
        return items.iter().map(|item| vec![item.clone()]).collect();
    }
    let mut result = Vec::new();
    for first in 0..=(items.len() - k) {
        for mut rest in combinations(k - 1, &items[first + 1..]) {
            rest.insert(0, items[first].clone());
            result.push(rest);
        }
    }
    result
}

fn push_unique<P: Peer>(groups: &mut Vec<Group<P>>, group: Group<P>) {
    if !groups.iter().any(|existing| existing.equals(&group)) {
        groups.push(group);
    }
}

fn merge_peers<P: Peer>(peers: &mut Vec<P>, more: Vec<P>) {
    for peer in more {
        if !peers.contains(&peer) {
            peers.push(peer);
        }
    }
}
