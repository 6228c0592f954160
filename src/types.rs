use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use uuid::Uuid;

/// unique identifier for a pending payment
pub type PaymentId = Uuid;

/// identity of a chat participant (requester, approver, recipient)
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Identity(String);

impl Identity {
    pub fn new(id: impl Into<String>) -> Self {
        Identity(id.into().trim().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Identity {
    fn from(s: &str) -> Self {
        Identity::new(s)
    }
}

impl From<String> for Identity {
    fn from(s: String) -> Self {
        Identity::new(s)
    }
}

impl From<i64> for Identity {
    fn from(id: i64) -> Self {
        Identity(id.to_string())
    }
}

/// set of identities (approvers, notify recipients)
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IdentitySet(BTreeSet<Identity>);

impl IdentitySet {
    pub fn new() -> Self {
        Self::default()
    }

    /// returns false if already present
    pub fn insert(&mut self, identity: Identity) -> bool {
        self.0.insert(identity)
    }

    /// returns false if not present
    pub fn remove(&mut self, identity: &Identity) -> bool {
        self.0.remove(identity)
    }

    pub fn contains(&self, identity: &Identity) -> bool {
        self.0.contains(identity)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Identity> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<Identity> for IdentitySet {
    fn from_iter<T: IntoIterator<Item = Identity>>(iter: T) -> Self {
        IdentitySet(iter.into_iter().collect())
    }
}

/// pending payment status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PaymentStatus {
    /// awaiting an approver decision
    Pending,
    /// approved and written to the ledger
    Approved,
    /// rejected, ledger untouched
    Rejected,
}

/// approver decision
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Decision {
    Approve,
    Reject,
}

impl Decision {
    pub fn resulting_status(&self) -> PaymentStatus {
        match self {
            Decision::Approve => PaymentStatus::Approved,
            Decision::Reject => PaymentStatus::Rejected,
        }
    }
}

/// what to do when a request arrives for a (requester, month) key that is already pending
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum DuplicatePolicy {
    /// replace the old request and tell approvers it was superseded
    #[default]
    Replace,
    /// refuse the new request
    Reject,
}

/// what to do when the work queue is at capacity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum OverflowPolicy {
    /// fail the submission with QueueFull
    #[default]
    Reject,
    /// wait until the worker frees a slot
    Block,
}
