// SPDX-License-Identifier: MIT OR Apache-2.0

use std::marker::PhantomData;
use std::sync::{Arc, Mutex, PoisonError};

use tracing::debug;

use crate::balance::{LoadBalancePolicy, RandomBalancer, RoundRobinBalancer};
use crate::compile::{CompiledPolicy, compile_signature_policy};
use crate::error::PolicyError;
use crate::group::{Group, and};
use crate::peer::{Peer, PeerGroup, PeerLookup};
use crate::policy::SignaturePolicy;

/// Resolves an endorsement policy against the currently available peers.
///
/// One resolver is created per chaincode and cached across transactions; the
/// compiled policy inside it is immutable, and the load-balance strategy is
/// guarded by a mutex, so a single resolver is safe to share across
/// concurrently submitting callers. Each [`resolve`](Self::resolve) call
/// consumes a fresh peer list supplied by the discovery layer and returns
/// one concrete peer group satisfying the policy.
#[derive(Debug)]
pub struct PeerGroupResolver<P, L> {
    policy: CompiledPolicy,
    balancer: Mutex<L>,
    _marker: PhantomData<P>,
}

impl<P: Peer> PeerGroupResolver<P, RandomBalancer> {
    /// Compile `policy` and resolve with random selection.
    pub fn random(policy: &SignaturePolicy) -> Result<Self, PolicyError> {
        Ok(Self::new(compile_signature_policy(policy)?, RandomBalancer::new()))
    }
}

impl<P: Peer> PeerGroupResolver<P, RoundRobinBalancer> {
    /// Compile `policy` and resolve with round-robin selection.
    pub fn round_robin(policy: &SignaturePolicy) -> Result<Self, PolicyError> {
        Ok(Self::new(
            compile_signature_policy(policy)?,
            RoundRobinBalancer::new(),
        ))
    }
}

impl<P, L> PeerGroupResolver<P, L>
where
    P: Peer,
    L: LoadBalancePolicy<P>,
{
    pub fn new(policy: CompiledPolicy, balancer: L) -> Self {
        Self {
            policy,
            balancer: Mutex::new(balancer),
            _marker: PhantomData,
        }
    }

    /// The compiled policy this resolver is bound to.
    pub fn policy(&self) -> &CompiledPolicy {
        &self.policy
    }

    /// Pick one group of peers which jointly satisfy the policy.
    ///
    /// `peers` is the live population supplied by the discovery layer; it is
    /// read-only input and peers are only copied into the result. When no
    /// combination of the given peers satisfies the policy the returned
    /// group is empty — never an error. The caller decides whether an empty
    /// result means retry, wait or abort.
    pub fn resolve(&self, peers: &[P]) -> Result<PeerGroup<P>, PolicyError> {
        let population: Vec<P> = peers.to_vec();
        let lookup: PeerLookup<P> = Arc::new(move |msp_id: &str| {
            population
                .iter()
                .filter(|peer| msp_id.is_empty() || peer.msp_id() == msp_id)
                .cloned()
                .collect()
        });

        let tree = self.policy.retrieve(&lookup)?;
        let terms = tree.reduce();
        let mut candidates: Vec<PeerGroup<P>> = Vec::new();
        for term in &terms {
            expand_term(term, &mut candidates);
        }
        debug!(
            peers = peers.len(),
            terms = terms.len(),
            candidates = candidates.len(),
            "resolved candidate peer groups"
        );

        let mut balancer = self
            .balancer
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        Ok(balancer.choose(&candidates))
    }
}

/// Expand one reduced OR-term into concrete candidate groups.
///
/// Each lazy organization slot of the term contributes one peer per
/// combination; a concrete peer slot is atomic and contributes all of its
/// peers. An organization with no peers currently online makes the whole
/// term contribute nothing.
fn expand_term<P: Peer>(term: &Group<P>, candidates: &mut Vec<PeerGroup<P>>) {
    let slots: &[Group<P>] = match term {
        Group::All(items) => items.as_slice(),
        single => std::slice::from_ref(single),
    };

    let alternatives: Vec<Vec<Group<P>>> = slots
        .iter()
        .map(|slot| match slot {
            Group::Msp(msp) => msp
                .peers()
                .into_iter()
                .map(|peer| Group::Peers(vec![peer]))
                .collect(),
            Group::Peers(peers) => vec![Group::Peers(peers.clone())],
            // Reduction leaves only terminal items inside a term; anything
            // else means the compiler and the algebra disagree.
            Group::All(_) | Group::Any(_) => {
                unreachable!("reduced terms contain only terminal items")
            }
        })
        .collect();

    for term in and(&alternatives) {
        // Conjunctions of peer terminals always collapse into one terminal.
        let Group::Peers(peers) = term else {
            unreachable!("peer-only conjunctions collapse to a peer terminal")
        };
        candidates.push(PeerGroup::new(peers));
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use crate::policy::{Principal, Rule};
    use crate::test_utils::TestPeer;

    use super::*;

    fn org_peers(entries: &[(&str, &str)]) -> Vec<TestPeer> {
        entries
            .iter()
            .map(|(name, msp_id)| TestPeer::new(*name, *msp_id))
            .collect()
    }

    fn candidate_names(group: &PeerGroup<TestPeer>) -> BTreeSet<String> {
        group.peers().iter().map(|peer| peer.name().to_owned()).collect()
    }

    /// All candidates a resolver can produce, gathered by cycling a
    /// round-robin balancer from offset zero through one full revolution.
    fn all_candidates(
        policy: &SignaturePolicy,
        peers: &[TestPeer],
    ) -> Vec<PeerGroup<TestPeer>> {
        let resolver = PeerGroupResolver::new(
            compile_signature_policy(policy).unwrap(),
            RoundRobinBalancer::with_offset(0),
        );
        let first = resolver.resolve(peers).unwrap();
        let mut results = vec![first.clone()];
        loop {
            let next = resolver.resolve(peers).unwrap();
            if next == first {
                break;
            }
            results.push(next);
            if results.len() > 10_000 {
                panic!("candidate cycle did not close");
            }
        }
        results
    }

    #[test]
    fn single_org_policy_selects_only_that_org() {
        let policy = SignaturePolicy::any_member_of(["Org1"]);
        let peers = org_peers(&[("p1", "Org1"), ("p2", "Org2")]);
        let resolver: PeerGroupResolver<TestPeer, _> =
            PeerGroupResolver::random(&policy).unwrap();

        for _ in 0..10 {
            let group = resolver.resolve(&peers).unwrap();
            assert_eq!(candidate_names(&group), BTreeSet::from(["p1".to_owned()]));
        }
    }

    #[test]
    fn nested_thresholds_cross_multiply_organizations() {
        // 1 of [(2 of [Org1, Org2]), (2 of [Org1, Org3, Org4])]
        let policy = SignaturePolicy::new(
            Rule::n_out_of(
                1,
                vec![
                    Rule::n_out_of(2, vec![Rule::signed_by(0), Rule::signed_by(1)]),
                    Rule::n_out_of(
                        2,
                        vec![Rule::signed_by(0), Rule::signed_by(2), Rule::signed_by(3)],
                    ),
                ],
            ),
            vec![
                Principal::member("Org1"),
                Principal::member("Org2"),
                Principal::member("Org3"),
                Principal::member("Org4"),
            ],
        );
        let peers = org_peers(&[
            ("p1", "Org1"),
            ("p2", "Org1"),
            ("p3", "Org2"),
            ("p4", "Org2"),
            ("p5", "Org3"),
            ("p6", "Org3"),
            ("p7", "Org3"),
            ("p8", "Org4"),
            ("p9", "Org4"),
            ("p10", "Org4"),
        ]);

        let candidates = all_candidates(&policy, &peers);

        // Valid org pairings are Org1+Org2, Org1+Org3, Org1+Org4 and
        // Org3+Org4; with populations (2, 2, 3, 3) the cross products give
        // 2*2 + 2*3 + 2*3 + 3*3 concrete peer pairs.
        assert_eq!(candidates.len(), 25);
        let allowed: [BTreeSet<&str>; 4] = [
            BTreeSet::from(["Org1", "Org2"]),
            BTreeSet::from(["Org1", "Org3"]),
            BTreeSet::from(["Org1", "Org4"]),
            BTreeSet::from(["Org3", "Org4"]),
        ];
        for candidate in &candidates {
            assert_eq!(candidate.len(), 2);
            let orgs: BTreeSet<&str> =
                candidate.peers().iter().map(|peer| peer.msp_id()).collect();
            assert!(allowed.contains(&orgs), "unexpected pairing {orgs:?}");
        }

        // All 25 pairs are distinct.
        let distinct: BTreeSet<BTreeSet<String>> =
            candidates.iter().map(candidate_names).collect();
        assert_eq!(distinct.len(), 25);
    }

    #[test]
    fn wildcard_policy_yields_one_singleton_per_peer() {
        let policy = SignaturePolicy::any_signer();
        let mut peers = Vec::new();
        for (msp_id, prefix, count) in [
            ("Org1", "a", 2),
            ("Org2", "b", 3),
            ("Org3", "c", 2),
            ("Org4", "d", 2),
            ("Org5", "e", 3),
        ] {
            peers.extend(crate::test_utils::peers_for_org(msp_id, prefix, count));
        }

        let candidates = all_candidates(&policy, &peers);
        assert_eq!(candidates.len(), 12);
        for candidate in &candidates {
            assert_eq!(candidate.len(), 1);
        }
    }

    #[test]
    fn unavailable_organization_yields_empty_group() {
        let policy = SignaturePolicy::any_member_of(["Org5"]);
        let peers = org_peers(&[("p1", "Org1"), ("p2", "Org2")]);
        let resolver: PeerGroupResolver<TestPeer, _> =
            PeerGroupResolver::random(&policy).unwrap();

        let group = resolver.resolve(&peers).unwrap();
        assert!(group.is_empty());
    }

    #[test]
    fn round_robin_resolver_alternates_between_candidates() {
        let policy = SignaturePolicy::any_member_of(["Org1"]);
        let peers = org_peers(&[("p1", "Org1"), ("p2", "Org1"), ("p3", "Org2")]);
        let resolver = PeerGroupResolver::new(
            compile_signature_policy(&policy).unwrap(),
            RoundRobinBalancer::with_offset(0),
        );

        let first = resolver.resolve(&peers).unwrap();
        let second = resolver.resolve(&peers).unwrap();
        let third = resolver.resolve(&peers).unwrap();
        assert_eq!(candidate_names(&first), BTreeSet::from(["p1".to_owned()]));
        assert_eq!(candidate_names(&second), BTreeSet::from(["p2".to_owned()]));
        assert_eq!(third, first);
    }

    #[test]
    fn resolved_groups_satisfy_every_policy_level() {
        // 2 of [Org1, (1 of [Org2, Org3])]: every result must contain an
        // Org1 peer plus a peer from Org2 or Org3.
        let policy = SignaturePolicy::new(
            Rule::n_out_of(
                2,
                vec![
                    Rule::signed_by(0),
                    Rule::n_out_of(1, vec![Rule::signed_by(1), Rule::signed_by(2)]),
                ],
            ),
            vec![
                Principal::member("Org1"),
                Principal::member("Org2"),
                Principal::member("Org3"),
            ],
        );
        let peers = org_peers(&[
            ("p1", "Org1"),
            ("p2", "Org2"),
            ("p3", "Org3"),
            ("p4", "Org3"),
        ]);

        for candidate in all_candidates(&policy, &peers) {
            let orgs: BTreeSet<&str> =
                candidate.peers().iter().map(|peer| peer.msp_id()).collect();
            assert!(orgs.contains("Org1"));
            assert!(orgs.contains("Org2") || orgs.contains("Org3"));
        }
    }
}
