// SPDX-License-Identifier: MIT OR Apache-2.0

#![cfg_attr(doctest, doc = include_str!("../README.md"))]

//! Endorsement-policy peer group resolution for permissioned blockchain
//! clients.
//!
//! A chaincode's endorsement policy is a boolean threshold expression over
//! organizations ("N of these M sub-rules must sign"). Given such a policy
//! and the peers currently believed to be online per organization, this crate
//! computes the concrete sets of peers which jointly satisfy the policy and
//! picks one of them using a load-balance strategy.
//!
//! The pipeline has two phases with different lifetimes:
//!
//! 1. [`compile_signature_policy`] runs once per chaincode. It validates the
//!    policy description and produces an immutable [`CompiledPolicy`] which
//!    callers cache across transactions.
//! 2. [`PeerGroupResolver::resolve`] runs once per transaction submission.
//!    It binds the compiled policy to the live peer list, normalizes the
//!    satisfaction tree into an OR-of-ANDs form, expands organizations into
//!    concrete peer combinations and delegates the final pick to a
//!    [`LoadBalancePolicy`].
//!
//! The engine never talks to the network, verifies no signatures and judges
//! no endorsement responses: it only decides *which* peers to ask. Peer
//! discovery, proposal transport and response validation are the caller's
//! collaborators.
//!
//! ## Example
//!
//! ```rust
//! use pgresolver::{Peer, PeerGroupResolver, SignaturePolicy};
//!
//! #[derive(Clone, Debug, PartialEq)]
//! struct Endorser {
//!     url: String,
//!     msp_id: String,
//! }
//!
//! impl Peer for Endorser {
//!     fn msp_id(&self) -> &str {
//!         &self.msp_id
//!     }
//! }
//!
//! // Any single member of Org1 or Org2 may endorse.
//! let policy = SignaturePolicy::any_member_of(["Org1", "Org2"]);
//! let resolver = PeerGroupResolver::random(&policy)?;
//!
//! let peers = vec![
//!     Endorser {
//!         url: "peer0.org1.example.com:7051".into(),
//!         msp_id: "Org1".into(),
//!     },
//!     Endorser {
//!         url: "peer0.org2.example.com:7051".into(),
//!         msp_id: "Org2".into(),
//!     },
//! ];
//! let group = resolver.resolve(&peers)?;
//! assert_eq!(group.len(), 1);
//! # Ok::<(), pgresolver::PolicyError>(())
//! ```

mod balance;
mod compile;
mod error;
mod group;
mod peer;
mod policy;
mod resolve;
#[cfg(any(test, feature = "test_utils"))]
pub mod test_utils;

pub use balance::{LoadBalancePolicy, RandomBalancer, RoundRobinBalancer};
pub use compile::{CompiledPolicy, compile_signature_policy};
pub use error::PolicyError;
pub use group::{Group, MspGroup, n_of};
pub use peer::{Peer, PeerGroup, PeerLookup};
pub use policy::{MspRole, Principal, Rule, SignaturePolicy};
pub use resolve::PeerGroupResolver;
