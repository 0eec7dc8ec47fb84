// SPDX-License-Identifier: MIT OR Apache-2.0

use thiserror::Error;

/// Errors raised while compiling an endorsement policy or retrieving peer
/// groups from a compiled one.
///
/// All variants are structural: they indicate a malformed policy description
/// and surface at compile time, before any transaction is attempted. A policy
/// which no peer currently satisfies is not an error (resolution yields an
/// empty peer group instead).
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PolicyError {
    /// A threshold rule requires more sub-rules than it lists, or zero where
    /// the wildcard form does not apply.
    #[error("threshold {threshold} out of range for {size} sub-rules")]
    ThresholdOutOfRange { threshold: usize, size: usize },

    /// A `SignedBy` leaf references a principal index outside the identities
    /// table.
    #[error("principal index {0} out of range")]
    PrincipalOutOfRange(usize),

    /// The referenced principal carries no organization identifier, so it
    /// cannot participate in peer group resolution.
    #[error("principal {index} cannot be decoded to an organization identifier")]
    UndecodablePrincipal { index: usize },
}
