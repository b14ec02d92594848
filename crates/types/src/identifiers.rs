//! Process-group identifier types.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Position of a process within its distributed group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Rank(pub u32);

impl Rank {
    /// The first rank of every group.
    pub const ROOT: Self = Rank(0);

    /// Get the raw value.
    pub fn get(self) -> u32 {
        self.0
    }

    /// Whether this is the root rank.
    pub fn is_root(self) -> bool {
        self == Self::ROOT
    }
}

impl fmt::Display for Rank {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Rank({})", self.0)
    }
}

/// Number of processes in a distributed group. Always at least 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub struct GroupSize(u32);

impl GroupSize {
    /// A group containing only this process.
    pub const SINGLE: Self = GroupSize(1);

    /// Create a group size, returning None for zero.
    pub fn new(size: u32) -> Option<Self> {
        (size > 0).then_some(GroupSize(size))
    }

    /// Get the raw value.
    pub fn get(self) -> u32 {
        self.0
    }

    /// Check whether a rank falls inside this group.
    pub fn contains(self, rank: Rank) -> bool {
        rank.0 < self.0
    }

    /// Iterate every rank of the group in ascending order.
    pub fn ranks(self) -> impl Iterator<Item = Rank> {
        (0..self.0).map(Rank)
    }
}

impl TryFrom<u32> for GroupSize {
    type Error = ZeroGroupSize;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        GroupSize::new(value).ok_or(ZeroGroupSize)
    }
}

impl From<GroupSize> for u32 {
    fn from(size: GroupSize) -> Self {
        size.0
    }
}

impl fmt::Display for GroupSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A group size of zero was supplied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("group size must be at least 1")]
pub struct ZeroGroupSize;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_group_size_rejects_zero() {
        assert_eq!(GroupSize::new(0), None);
        assert_eq!(GroupSize::new(4).map(GroupSize::get), Some(4));
        assert!(GroupSize::try_from(0).is_err());
    }

    #[test]
    fn test_group_size_contains() {
        let size = GroupSize::new(4).unwrap();

        assert!(size.contains(Rank(0)));
        assert!(size.contains(Rank(3)));
        assert!(!size.contains(Rank(4)));
        assert_eq!(
            size.ranks().collect::<Vec<_>>(),
            vec![Rank(0), Rank(1), Rank(2), Rank(3)]
        );
    }

    #[test]
    fn test_group_size_deserialize_validates() {
        let size: GroupSize = serde_json::from_str("3").unwrap();
        assert_eq!(size.get(), 3);
        assert!(serde_json::from_str::<GroupSize>("0").is_err());
    }

    #[test]
    fn test_rank_display() {
        assert_eq!(Rank(2).to_string(), "Rank(2)");
        assert!(Rank::ROOT.is_root());
        assert!(!Rank(1).is_root());
    }
}
