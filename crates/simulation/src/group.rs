//! In-process process groups.
//!
//! [`LocalGroup`] lets several ranks live in one OS process, each on its own
//! thread, so that multi-rank bootstrap can be exercised without a real
//! transport. [`SoloGroup`] is the degenerate group of one.

use simx_core::{GroupError, ProcessGroup};
use simx_types::{GroupSize, ProcessIdentity, Rank};
use std::collections::BTreeSet;
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tracing::{debug, warn};

/// Default time a member waits for its peers.
pub const DEFAULT_JOIN_TIMEOUT: Duration = Duration::from_secs(30);

/// A group whose members are threads of this process.
///
/// Cloning yields another handle to the same group.
#[derive(Debug, Clone)]
pub struct LocalGroup {
    shared: Arc<Shared>,
}

#[derive(Debug)]
struct Shared {
    size: GroupSize,
    join_timeout: Duration,
    taken: Mutex<BTreeSet<Rank>>,
    changed: Condvar,
}

impl LocalGroup {
    /// Create a group expecting `size` members.
    pub fn new(size: GroupSize, join_timeout: Duration) -> Self {
        Self {
            shared: Arc::new(Shared {
                size,
                join_timeout,
                taken: Mutex::new(BTreeSet::new()),
                changed: Condvar::new(),
            }),
        }
    }

    /// Expected number of members.
    pub fn size(&self) -> GroupSize {
        self.shared.size
    }

    /// A member that takes the lowest free rank when it joins.
    pub fn member(&self) -> LocalMember {
        LocalMember {
            group: self.clone(),
            requested: None,
            identity: None,
        }
    }

    /// A member that asks for a specific rank.
    pub fn member_with_rank(&self, rank: Rank) -> LocalMember {
        LocalMember {
            group: self.clone(),
            requested: Some(rank),
            identity: None,
        }
    }

    /// Number of members currently joined.
    pub fn joined(&self) -> Result<u32, GroupError> {
        Ok(self.lock()?.len() as u32)
    }

    fn lock(&self) -> Result<MutexGuard<'_, BTreeSet<Rank>>, GroupError> {
        self.shared
            .taken
            .lock()
            .map_err(|_| GroupError::Unavailable("local group state poisoned".into()))
    }

    fn claim(&self, requested: Option<Rank>) -> Result<Rank, GroupError> {
        let size = self.shared.size;
        let mut taken = self.lock()?;

        let rank = match requested {
            Some(rank) if !size.contains(rank) => {
                return Err(GroupError::RankOutOfRange {
                    rank,
                    group_size: size,
                })
            }
            Some(rank) if taken.contains(&rank) => return Err(GroupError::DuplicateRank(rank)),
            Some(rank) => rank,
            None => size
                .ranks()
                .find(|rank| !taken.contains(rank))
                .ok_or_else(|| GroupError::Unavailable(format!("all {size} ranks are taken")))?,
        };

        taken.insert(rank);
        debug!(rank = rank.get(), joined = taken.len(), size = size.get(), "Rank claimed");
        self.shared.changed.notify_all();
        Ok(rank)
    }

    /// Block until every rank is claimed or the join timeout elapses.
    fn wait_for_peers(&self, rank: Rank) -> Result<(), GroupError> {
        let size = self.shared.size;
        let taken = self.lock()?;
        let (taken, _) = self
            .shared
            .changed
            .wait_timeout_while(taken, self.shared.join_timeout, |taken| {
                taken.len() < size.get() as usize
            })
            .map_err(|_| GroupError::Unavailable("local group state poisoned".into()))?;

        if taken.len() < size.get() as usize {
            let joined = taken.len() as u32;
            warn!(rank = rank.get(), joined, size = size.get(), "Timed out waiting for peers");
            return Err(GroupError::JoinTimeout {
                joined,
                group_size: size,
            });
        }
        Ok(())
    }

    /// Give a claimed rank back, even if another member poisoned the state.
    fn release(&self, rank: Rank) {
        let mut taken = self
            .shared
            .taken
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        taken.remove(&rank);
        self.shared.changed.notify_all();
    }
}

/// One member's handle on a [`LocalGroup`].
#[derive(Debug)]
pub struct LocalMember {
    group: LocalGroup,
    requested: Option<Rank>,
    identity: Option<ProcessIdentity>,
}

impl LocalMember {
    /// The identity assigned when this member joined.
    pub fn identity(&self) -> Option<&ProcessIdentity> {
        self.identity.as_ref()
    }
}

impl ProcessGroup for LocalMember {
    fn join_group(&mut self, program_name: &str) -> Result<ProcessIdentity, GroupError> {
        if let Some(identity) = &self.identity {
            return Err(GroupError::DuplicateRank(identity.rank()));
        }

        let size = self.group.size();
        let rank = self.group.claim(self.requested)?;
        if let Err(err) = self.group.wait_for_peers(rank) {
            self.group.release(rank);
            return Err(err);
        }

        let identity = ProcessIdentity::new(rank, size, program_name).ok_or(
            GroupError::RankOutOfRange {
                rank,
                group_size: size,
            },
        )?;
        self.identity = Some(identity.clone());
        Ok(identity)
    }

    fn query_environment(&mut self, identity: &ProcessIdentity) -> Result<(), GroupError> {
        let own = self.identity.as_ref().ok_or(GroupError::NotJoined)?;
        if own != identity {
            return Err(GroupError::InvalidEnvironment(format!(
                "identity {identity} does not match joined identity {own}"
            )));
        }

        let joined = self.group.joined()?;
        if joined < self.group.size().get() {
            return Err(GroupError::Unavailable(format!(
                "group lost members: {joined} of {} remain",
                self.group.size()
            )));
        }
        Ok(())
    }
}

/// A group containing only this process.
#[derive(Debug, Default)]
pub struct SoloGroup {
    identity: Option<ProcessIdentity>,
}

impl SoloGroup {
    /// Create a new solo group.
    pub fn new() -> Self {
        Self::default()
    }
}

impl ProcessGroup for SoloGroup {
    fn join_group(&mut self, program_name: &str) -> Result<ProcessIdentity, GroupError> {
        if self.identity.is_some() {
            return Err(GroupError::DuplicateRank(Rank::ROOT));
        }
        let identity = ProcessIdentity::single(program_name);
        self.identity = Some(identity.clone());
        Ok(identity)
    }

    fn query_environment(&mut self, identity: &ProcessIdentity) -> Result<(), GroupError> {
        match &self.identity {
            Some(own) if own == identity => Ok(()),
            Some(own) => Err(GroupError::InvalidEnvironment(format!(
                "identity {identity} does not match joined identity {own}"
            ))),
            None => Err(GroupError::NotJoined),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    fn group(size: u32, timeout: Duration) -> LocalGroup {
        LocalGroup::new(GroupSize::new(size).unwrap(), timeout)
    }

    #[test]
    fn test_single_member_group_joins_immediately() {
        let group = group(1, Duration::from_millis(10));
        let mut member = group.member();

        let identity = member.join_group("sim_app").unwrap();

        assert_eq!(identity.rank(), Rank(0));
        assert_eq!(identity.program_name(), "sim_app");
        member.query_environment(&identity).unwrap();
    }

    #[test]
    fn test_members_get_unique_ranks() {
        let group = group(4, DEFAULT_JOIN_TIMEOUT);

        let ranks: BTreeSet<Rank> = thread::scope(|scope| {
            let handles: Vec<_> = (0..4)
                .map(|_| {
                    let mut member = group.member();
                    scope.spawn(move || member.join_group("sim_app").map(|id| id.rank()))
                })
                .collect();
            handles
                .into_iter()
                .map(|h| h.join().unwrap().unwrap())
                .collect()
        });

        assert_eq!(ranks, (0..4).map(Rank).collect());
    }

    #[test]
    fn test_duplicate_requested_rank_rejected() {
        let group = group(2, Duration::from_millis(500));

        thread::scope(|scope| {
            let mut first = group.member_with_rank(Rank(1));
            let waiter = scope.spawn(move || first.join_group("sim_app"));

            // Wait until the first member holds rank 1.
            while group.joined().unwrap() == 0 {
                thread::yield_now();
            }
            let mut second = group.member_with_rank(Rank(1));
            assert_eq!(
                second.join_group("sim_app"),
                Err(GroupError::DuplicateRank(Rank(1)))
            );

            // Nobody else arrives, so the first member times out.
            assert!(matches!(
                waiter.join().unwrap(),
                Err(GroupError::JoinTimeout { joined: 1, .. })
            ));
        });
    }

    #[test]
    fn test_rank_out_of_range() {
        let group = group(2, Duration::from_millis(10));
        let mut member = group.member_with_rank(Rank(5));

        assert!(matches!(
            member.join_group("sim_app"),
            Err(GroupError::RankOutOfRange { rank: Rank(5), .. })
        ));
    }

    #[test]
    fn test_timeout_releases_rank() {
        let group = group(3, Duration::from_millis(20));
        let mut member = group.member();

        assert_eq!(
            member.join_group("sim_app"),
            Err(GroupError::JoinTimeout {
                joined: 1,
                group_size: GroupSize::new(3).unwrap(),
            })
        );
        assert_eq!(group.joined().unwrap(), 0);
        assert!(member.identity().is_none());
    }

    #[test]
    fn test_release_recovers_poisoned_state() {
        let group = group(2, Duration::from_millis(10));
        let rank = group.claim(None).unwrap();

        let poisoner = thread::scope(|scope| {
            scope
                .spawn(|| {
                    let _taken = group.shared.taken.lock().unwrap();
                    panic!("member crashed while holding the group state");
                })
                .join()
        });
        assert!(poisoner.is_err());
        assert!(group.joined().is_err());

        group.release(rank);

        let taken = group.shared.taken.lock().unwrap_or_else(PoisonError::into_inner);
        assert!(taken.is_empty());
    }

    #[test]
    fn test_query_environment_requires_join() {
        let group = group(1, Duration::from_millis(10));
        let mut member = group.member();
        let stranger = ProcessIdentity::single("sim_app");

        assert_eq!(member.query_environment(&stranger), Err(GroupError::NotJoined));
    }

    #[test]
    fn test_solo_group() {
        let mut solo = SoloGroup::new();
        let identity = solo.join_group("sim_app").unwrap();

        assert_eq!(identity, ProcessIdentity::single("sim_app"));
        solo.query_environment(&identity).unwrap();
        assert_eq!(
            solo.join_group("sim_app"),
            Err(GroupError::DuplicateRank(Rank::ROOT))
        );
    }
}
