// SPDX-License-Identifier: MIT OR Apache-2.0

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::peer::{Peer, PeerGroup};

/// Strategy for picking one peer group out of several equally valid
/// candidates.
///
/// `choose` takes `&mut self` because strategies may carry selection state
/// (the round-robin cursor): one instance belongs to one logical caller, and
/// sharing an instance across threads requires an external lock.
/// [`PeerGroupResolver`](crate::PeerGroupResolver) guards its strategy with a
/// mutex for exactly this reason. Given an empty candidate list, `choose`
/// returns a valid zero-peer group, never an error.
pub trait LoadBalancePolicy<P: Peer> {
    fn choose(&mut self, candidates: &[PeerGroup<P>]) -> PeerGroup<P>;
}

/// Picks a uniformly random candidate on every call.
///
/// Carries its own rng so selections stay independent of other randomness in
/// the process and tests can seed it deterministically.
#[derive(Clone, Debug)]
pub struct RandomBalancer {
    rng: StdRng,
}

impl RandomBalancer {
    pub fn new() -> Self {
        Self {
            rng: StdRng::from_os_rng(),
        }
    }

    /// Use a caller-provided rng, for deterministic selection in tests.
    pub fn with_rng(rng: StdRng) -> Self {
        Self { rng }
    }
}

impl Default for RandomBalancer {
    fn default() -> Self {
        Self::new()
    }
}

impl<P: Peer> LoadBalancePolicy<P> for RandomBalancer {
    fn choose(&mut self, candidates: &[PeerGroup<P>]) -> PeerGroup<P> {
        if candidates.is_empty() {
            return PeerGroup::empty();
        }
        let index = self.rng.random_range(0..candidates.len());
        candidates[index].clone()
    }
}

/// Visits candidates in cyclic order, one step per call.
///
/// The cursor starts at a random offset on first use (or at a fixed offset
/// via [`with_offset`](Self::with_offset)) and advances by one, wrapping
/// modulo the candidate count. The candidate list may change size between
/// calls; the cursor wraps against the current length.
#[derive(Clone, Debug, Default)]
pub struct RoundRobinBalancer {
    cursor: Option<usize>,
}

impl RoundRobinBalancer {
    pub fn new() -> Self {
        Self { cursor: None }
    }

    /// Start from a fixed offset instead of a random one.
    pub fn with_offset(offset: usize) -> Self {
        Self {
            cursor: Some(offset),
        }
    }
}

impl<P: Peer> LoadBalancePolicy<P> for RoundRobinBalancer {
    fn choose(&mut self, candidates: &[PeerGroup<P>]) -> PeerGroup<P> {
        if candidates.is_empty() {
            return PeerGroup::empty();
        }
        let index = match self.cursor {
            Some(cursor) => cursor % candidates.len(),
            None => rand::rng().random_range(0..candidates.len()),
        };
        self.cursor = Some((index + 1) % candidates.len());
        candidates[index].clone()
    }
}

#[cfg(test)]
mod tests {
    use crate::test_utils::TestPeer;

    use super::*;

    fn candidates(count: usize) -> Vec<PeerGroup<TestPeer>> {
        (0..count)
            .map(|i| PeerGroup::new(vec![TestPeer::new(format!("p{i}"), "Org1")]))
            .collect()
    }

    #[test]
    fn random_on_empty_candidates_is_a_valid_empty_group() {
        let mut balancer = RandomBalancer::new();
        let chosen: PeerGroup<TestPeer> = balancer.choose(&[]);
        assert!(chosen.is_empty());
    }

    #[test]
    fn random_always_picks_an_existing_candidate() {
        let candidates = candidates(5);
        let mut balancer = RandomBalancer::new();
        for _ in 0..100 {
            let chosen = balancer.choose(&candidates);
            assert!(candidates.contains(&chosen));
        }
    }

    #[test]
    fn seeded_random_selection_is_reproducible() {
        let candidates = candidates(5);
        let mut left = RandomBalancer::with_rng(StdRng::seed_from_u64(7));
        let mut right = RandomBalancer::with_rng(StdRng::seed_from_u64(7));
        for _ in 0..20 {
            assert_eq!(left.choose(&candidates), right.choose(&candidates));
        }
    }

    #[test]
    fn round_robin_visits_candidates_cyclically() {
        let candidates = candidates(3);
        let mut balancer = RoundRobinBalancer::with_offset(1);

        // 7 calls over 3 candidates: each candidate seen 2 or 3 times, in
        // cyclic order from the initial offset.
        let mut visits = [0usize; 3];
        for call in 0..7 {
            let chosen = balancer.choose(&candidates);
            let expected = (1 + call) % 3;
            assert_eq!(chosen, candidates[expected]);
            visits[expected] += 1;
        }
        assert_eq!(visits, [2, 3, 2]);
    }

    #[test]
    fn round_robin_wraps_against_current_length() {
        let mut balancer = RoundRobinBalancer::with_offset(5);
        let two = candidates(2);
        assert_eq!(balancer.choose(&two), two[1]);
        assert_eq!(balancer.choose(&two), two[0]);
    }

    #[test]
    fn round_robin_on_empty_candidates_is_a_valid_empty_group() {
        let mut balancer = RoundRobinBalancer::new();
        let chosen: PeerGroup<TestPeer> = balancer.choose(&[]);
        assert!(chosen.is_empty());
    }
}
