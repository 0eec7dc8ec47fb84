// SPDX-License-Identifier: MIT OR Apache-2.0

use std::fmt::{Debug, Display};
use std::sync::Arc;

/// An endorsing network peer, as seen by the resolution engine.
///
/// The engine only ever reads the organization (MSP) identifier of a peer and
/// copies peer handles into candidate groups; it never mutates a peer or
/// talks to the network. Handles are expected to be cheap to clone and to
/// cross thread boundaries, since one cached resolver serves concurrent
/// transaction submissions.
pub trait Peer: Clone + Debug + PartialEq + Send + Sync + 'static {
    /// Identifier of the organization (MSP) this peer belongs to.
    fn msp_id(&self) -> &str;
}

/// Returns all currently known peers of the given organization.
///
/// An empty organization identifier is the wildcard and matches every peer.
/// The lookup is built fresh per resolution from the live peer list, so a
/// compiled policy can be resolved repeatedly against a changing population.
pub type PeerLookup<P> = Arc<dyn Fn(&str) -> Vec<P> + Send + Sync>;

/// A concrete set of peers which jointly satisfy an endorsement policy.
///
/// This is the final output of resolution: the caller sends its transaction
/// proposal to every peer in the group. An empty group is valid and means no
/// peers currently satisfy the policy.
#[derive(Clone, Debug, PartialEq)]
pub struct PeerGroup<P> {
    peers: Vec<P>,
}

impl<P> Default for PeerGroup<P> {
    fn default() -> Self {
        Self { peers: Vec::new() }
    }
}

impl<P: Peer> PeerGroup<P> {
    pub fn new(peers: Vec<P>) -> Self {
        Self { peers }
    }

    /// A valid group containing no peers.
    pub fn empty() -> Self {
        Self::default()
    }

    /// The peers making up this group.
    pub fn peers(&self) -> &[P] {
        &self.peers
    }

    pub fn into_peers(self) -> Vec<P> {
        self.peers
    }

    pub fn len(&self) -> usize {
        self.peers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.peers.is_empty()
    }

    pub fn contains(&self, peer: &P) -> bool {
        self.peers.contains(peer)
    }
}

impl<P: Peer + Display> Display for PeerGroup<P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[")?;
        for (i, peer) in self.peers.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{peer}")?;
        }
        write!(f, "]")
    }
}
