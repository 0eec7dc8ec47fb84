// SPDX-License-Identifier: MIT OR Apache-2.0

//! Fixtures for exercising policy resolution without a network.

use std::fmt::Display;

use crate::peer::Peer;

/// An in-memory peer carrying just a name and an organization identifier.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TestPeer {
    name: String,
    msp_id: String,
}

impl TestPeer {
    pub fn new(name: impl Into<String>, msp_id: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            msp_id: msp_id.into(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl Peer for TestPeer {
    fn msp_id(&self) -> &str {
        &self.msp_id
    }
}

impl Display for TestPeer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name)
    }
}

/// `count` peers named `{prefix}1..{prefix}{count}`, all in one organization.
pub fn peers_for_org(msp_id: &str, prefix: &str, count: usize) -> Vec<TestPeer> {
    (1..=count)
        .map(|i| TestPeer::new(format!("{prefix}{i}"), msp_id))
        .collect()
}
