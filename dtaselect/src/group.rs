use serde::{Deserialize, Serialize};

/// The index of a protein in a [`crate::DtaSelectReport`]
#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
pub struct ProteinIndex(pub(crate) usize);

/// The index of a PSM in a [`crate::DtaSelectReport`]
#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
pub struct PsmIndex(pub(crate) usize);

/// The index of a protein group in a [`crate::DtaSelectReport`]
#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
pub struct GroupIndex(pub(crate) usize);

/// A set of proteins that are identified by the same PSMs, in the order they were listed
#[derive(Clone, Debug, Default, Deserialize, Eq, Hash, PartialEq, Serialize)]
pub struct ProteinGroup {
    members: Vec<ProteinIndex>,
}

impl ProteinGroup {
    /// Add a protein, returns false if the protein was already a member
    pub(crate) fn insert(&mut self, protein: ProteinIndex) -> bool {
        if self.members.contains(&protein) {
            false
        } else {
            self.members.push(protein);
            true
        }
    }

    /// Remove a member, returns false if the protein was not a member
    pub(crate) fn remove(&mut self, protein: ProteinIndex) -> bool {
        let before = self.members.len();
        self.members.retain(|member| *member != protein);
        before != self.members.len()
    }

    /// Replace a member, if the replacement was already a member the old entry is removed
    pub(crate) fn replace(&mut self, from: ProteinIndex, to: ProteinIndex) {
        if self.members.contains(&to) {
            self.members.retain(|member| *member != from);
        } else {
            for member in &mut self.members {
                if *member == from {
                    *member = to;
                }
            }
        }
    }

    /// All members in order
    pub fn members(&self) -> &[ProteinIndex] {
        &self.members
    }

    /// Check if the protein is a member
    pub fn contains(&self, protein: ProteinIndex) -> bool {
        self.members.contains(&protein)
    }

    /// The number of members
    pub fn len(&self) -> usize {
        self.members.len()
    }

    /// Check if this group has no members
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub(crate) fn take(&mut self) -> Self {
        std::mem::take(self)
    }
}
