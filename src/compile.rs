// SPDX-License-Identifier: MIT OR Apache-2.0

use std::collections::BTreeSet;

use tracing::debug;

use crate::error::PolicyError;
use crate::group::{Group, MspGroup, n_of};
use crate::peer::{Peer, PeerLookup};
use crate::policy::{Rule, SignaturePolicy};

/// A validated, reusable form of an endorsement policy.
///
/// Compilation happens once per chaincode and performs all structural
/// validation up front (threshold ranges, principal indices, principal
/// decodability), so retrieval can assume a well-formed tree. The compiled
/// policy holds no peers and no mutable state: [`retrieve`](Self::retrieve)
/// is pure and may be invoked concurrently with a different peer lookup per
/// call. Compiling the same policy twice yields equal trees.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CompiledPolicy {
    /// One signer from this organization; the empty identifier is the
    /// wildcard matching every organization.
    Org(String),

    /// At least `threshold` of the sub-policies satisfied together.
    Threshold {
        threshold: usize,
        policies: Vec<CompiledPolicy>,
    },
}

impl CompiledPolicy {
    /// Bind the policy to a live peer lookup, producing the satisfaction
    /// tree for the current peer population.
    ///
    /// This is the group retriever of the engine: organizations stay lazy
    /// inside the returned tree and resolve to concrete peers only when the
    /// tree is queried, so the lookup decides "who is online" at the moment
    /// of use.
    pub fn retrieve<P: Peer>(&self, lookup: &PeerLookup<P>) -> Result<Group<P>, PolicyError> {
        match self {
            CompiledPolicy::Org(msp_id) => Ok(Group::Any(vec![Group::Msp(MspGroup::new(
                msp_id.clone(),
                lookup.clone(),
            ))])),
            CompiledPolicy::Threshold {
                threshold,
                policies,
            } => {
                let children = policies
                    .iter()
                    .map(|policy| policy.retrieve(lookup))
                    .collect::<Result<Vec<_>, _>>()?;
                n_of(*threshold, &children)
            }
        }
    }

    /// Every organization identifier this policy can reference.
    ///
    /// Useful to the discovery layer for scoping its peer queries. The
    /// wildcard organization appears as the empty string.
    pub fn organizations(&self) -> BTreeSet<String> {
        let mut msp_ids = BTreeSet::new();
        self.collect_organizations(&mut msp_ids);
        msp_ids
    }

    fn collect_organizations(&self, msp_ids: &mut BTreeSet<String>) {
        match self {
            CompiledPolicy::Org(msp_id) => {
                msp_ids.insert(msp_id.clone());
            }
            CompiledPolicy::Threshold { policies, .. } => {
                for policy in policies {
                    policy.collect_organizations(msp_ids);
                }
            }
        }
    }
}

/// Compile a signature policy into its reusable, validated form.
///
/// Fails fast on structural errors: a threshold outside `1..=len` (except the
/// documented zero wildcard), a `SignedBy` index outside the identities
/// table, or a principal carrying no organization identifier. A malformed
/// policy never reaches resolution time.
pub fn compile_signature_policy(policy: &SignaturePolicy) -> Result<CompiledPolicy, PolicyError> {
    let compiled = compile_rule(&policy.rule, policy)?;
    debug!(
        organizations = compiled.organizations().len(),
        "compiled endorsement policy"
    );
    Ok(compiled)
}

fn compile_rule(rule: &Rule, policy: &SignaturePolicy) -> Result<CompiledPolicy, PolicyError> {
    match rule {
        Rule::SignedBy(index) => {
            let principal = policy
                .identities
                .get(*index)
                .ok_or(PolicyError::PrincipalOutOfRange(*index))?;
            let msp_id = principal
                .msp_id()
                .ok_or(PolicyError::UndecodablePrincipal { index: *index })?;
            Ok(CompiledPolicy::Org(msp_id.to_owned()))
        }
        Rule::NOutOf { threshold, rules } => {
            // Threshold zero is the wildcard: any single signer from any
            // organization, sub-rules ignored.
            if *threshold == 0 {
                return Ok(CompiledPolicy::Org(String::new()));
            }
            if *threshold > rules.len() {
                return Err(PolicyError::ThresholdOutOfRange {
                    threshold: *threshold,
                    size: rules.len(),
                });
            }
            let policies = rules
                .iter()
                .map(|rule| compile_rule(rule, policy))
                .collect::<Result<Vec<_>, _>>()?;
            Ok(CompiledPolicy::Threshold {
                threshold: *threshold,
                policies,
            })
        }
    }
}
