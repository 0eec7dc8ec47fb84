// SPDX-License-Identifier: MIT OR Apache-2.0

/// A chaincode endorsement policy: a threshold rule over a table of signing
/// principals.
///
/// This is the boundary input to the engine, equivalent to a signature-policy
/// envelope as loaded by the (external) policy retrieval layer. `SignedBy`
/// leaves reference entries of the `identities` table by index.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SignaturePolicy {
    pub rule: Rule,
    pub identities: Vec<Principal>,
}

impl SignaturePolicy {
    pub fn new(rule: Rule, identities: Vec<Principal>) -> Self {
        Self { rule, identities }
    }

    /// The policy satisfied by a signature from any single member of any
    /// organization.
    pub fn any_signer() -> Self {
        Self {
            rule: Rule::NOutOf {
                threshold: 0,
                rules: Vec::new(),
            },
            identities: Vec::new(),
        }
    }

    /// The policy satisfied by any single member of one of the given
    /// organizations.
    pub fn any_member_of<S: Into<String>>(msp_ids: impl IntoIterator<Item = S>) -> Self {
        let identities: Vec<Principal> = msp_ids
            .into_iter()
            .map(|msp_id| Principal::member(msp_id))
            .collect();
        let rules = (0..identities.len()).map(Rule::SignedBy).collect();
        Self {
            rule: Rule::NOutOf { threshold: 1, rules },
            identities,
        }
    }
}

/// A node of the endorsement rule tree.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Rule {
    /// Satisfied by a signature from the i-th principal of the identities
    /// table.
    SignedBy(usize),

    /// Satisfied when at least `threshold` of the sub-rules are satisfied.
    ///
    /// A threshold of zero is the documented wildcard: the rule is satisfied
    /// by any single signer from any organization and its sub-rules are
    /// ignored.
    NOutOf { threshold: usize, rules: Vec<Rule> },
}

impl Rule {
    pub fn signed_by(index: usize) -> Self {
        Rule::SignedBy(index)
    }

    pub fn n_out_of(threshold: usize, rules: Vec<Rule>) -> Self {
        Rule::NOutOf { threshold, rules }
    }
}

/// A signing principal: the "who must sign" half of a policy leaf.
///
/// Role and organizational-unit principals both name an organization and
/// decode to its MSP identifier. Identity principals pin a specific serialized
/// certificate and carry no organization, so they cannot participate in peer
/// group resolution.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Principal {
    Role { msp_id: String, role: MspRole },
    OrganizationUnit { msp_id: String, unit: String },
    Identity(Vec<u8>),
}

impl Principal {
    /// A member-role principal for the given organization.
    pub fn member(msp_id: impl Into<String>) -> Self {
        Principal::Role {
            msp_id: msp_id.into(),
            role: MspRole::Member,
        }
    }

    /// The organization identifier this principal decodes to, if any.
    pub fn msp_id(&self) -> Option<&str> {
        match self {
            Principal::Role { msp_id, .. } => Some(msp_id),
            Principal::OrganizationUnit { msp_id, .. } => Some(msp_id),
            Principal::Identity(_) => None,
        }
    }
}

/// Roles a principal can require within its organization.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum MspRole {
    Member,
    Admin,
    Client,
    Peer,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn any_member_of_builds_one_of_n() {
        let policy = SignaturePolicy::any_member_of(["Org1", "Org2"]);
        assert_eq!(
            policy.rule,
            Rule::NOutOf {
                threshold: 1,
                rules: vec![Rule::SignedBy(0), Rule::SignedBy(1)],
            }
        );
        assert_eq!(policy.identities.len(), 2);
        assert_eq!(policy.identities[0].msp_id(), Some("Org1"));
    }

    #[test]
    fn identity_principals_carry_no_organization() {
        assert_eq!(Principal::Identity(vec![1, 2, 3]).msp_id(), None);
        assert_eq!(
            Principal::OrganizationUnit {
                msp_id: "Org1".into(),
                unit: "ou1".into(),
            }
            .msp_id(),
            Some("Org1")
        );
    }

    #[cfg(feature = "serde")]
    #[test]
    fn policy_serde_round_trip() {
        let policy = SignaturePolicy::new(
            Rule::n_out_of(2, vec![Rule::signed_by(0), Rule::signed_by(1)]),
            vec![Principal::member("Org1"), Principal::member("Org2")],
        );
        let encoded = serde_json::to_string(&policy).unwrap();
        let decoded: SignaturePolicy = serde_json::from_str(&encoded).unwrap();
        assert_eq!(policy, decoded);
    }
}
