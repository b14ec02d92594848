//! The per-rank simulation controller and its factory.

use crate::event_queue::{EventKey, EventQueue};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use simx_core::{ControllerError, ControllerFactory};
use simx_types::options::{RNG_SEED, SCHED_ALGORITHM, SCHED_END_TIME, SCHED_LOOKAHEAD};
use simx_types::{ConfigurationSet, ProcessIdentity, Rank};
use std::collections::{BTreeMap, BinaryHeap};
use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;
use tracing::info;

/// Queue structure the controller schedules events with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SchedulingAlgorithm {
    /// Ordered map keyed by event time.
    Calendar,
    /// Binary min-heap.
    Heap,
}

/// The named scheduling algorithm is not known.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown scheduling algorithm '{0}', expected calendar or heap")]
pub struct UnknownAlgorithm(pub String);

impl FromStr for SchedulingAlgorithm {
    type Err = UnknownAlgorithm;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "calendar" => Ok(SchedulingAlgorithm::Calendar),
            "heap" => Ok(SchedulingAlgorithm::Heap),
            other => Err(UnknownAlgorithm(other.to_string())),
        }
    }
}

impl fmt::Display for SchedulingAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SchedulingAlgorithm::Calendar => write!(f, "calendar"),
            SchedulingAlgorithm::Heap => write!(f, "heap"),
        }
    }
}

/// Owns event scheduling for one rank.
///
/// Events fire in time order; events at the same time fire in the order they
/// were scheduled. Scheduling past the end time is refused.
#[derive(Debug)]
pub struct SimController<E> {
    rank: Rank,
    algorithm: SchedulingAlgorithm,
    end_time: Duration,
    lookahead: Duration,
    now: Duration,
    next_sequence: u64,
    queue: EventQueue<E>,
    rng: ChaCha8Rng,
}

impl<E> SimController<E> {
    fn new(
        rank: Rank,
        algorithm: SchedulingAlgorithm,
        end_time: Duration,
        lookahead: Duration,
        seed: u64,
    ) -> Self {
        let queue = match algorithm {
            SchedulingAlgorithm::Calendar => EventQueue::Calendar(BTreeMap::new()),
            SchedulingAlgorithm::Heap => EventQueue::Heap(BinaryHeap::new()),
        };
        Self {
            rank,
            algorithm,
            end_time,
            lookahead,
            now: Duration::ZERO,
            next_sequence: 0,
            queue,
            rng: ChaCha8Rng::seed_from_u64(rank_seed(seed, rank)),
        }
    }

    /// The rank this controller serves.
    pub fn rank(&self) -> Rank {
        self.rank
    }

    /// The scheduling algorithm in use.
    pub fn algorithm(&self) -> SchedulingAlgorithm {
        self.algorithm
    }

    /// Time after which no event fires.
    pub fn end_time(&self) -> Duration {
        self.end_time
    }

    /// Minimum delay for events sent to other ranks.
    pub fn lookahead(&self) -> Duration {
        self.lookahead
    }

    /// Current simulation time.
    pub fn now(&self) -> Duration {
        self.now
    }

    /// Number of events waiting to fire.
    pub fn pending(&self) -> usize {
        self.queue.len()
    }

    /// Time of the next event, if any.
    pub fn next_event_time(&self) -> Option<Duration> {
        self.queue.peek_key().map(|key| key.time)
    }

    /// Schedule an event `delay` after the current time.
    ///
    /// Returns None if it would fire after the end time.
    pub fn schedule(&mut self, delay: Duration, event: E) -> Option<EventKey> {
        let time = self.now.checked_add(delay)?;
        if time > self.end_time {
            return None;
        }
        let key = EventKey {
            time,
            sequence: self.next_sequence,
        };
        self.next_sequence += 1;
        self.queue.push(key, event);
        Some(key)
    }

    /// Remove the next event and advance the clock to it.
    pub fn pop_next(&mut self) -> Option<(EventKey, E)> {
        let (key, event) = self.queue.pop()?;
        self.now = key.time;
        Some((key, event))
    }

    /// This rank's deterministic random number generator.
    pub fn rng(&mut self) -> &mut ChaCha8Rng {
        &mut self.rng
    }
}

/// Mix the base seed with the rank so every rank draws a distinct stream.
fn rank_seed(seed: u64, rank: Rank) -> u64 {
    seed ^ (u64::from(rank.get()) + 1).wrapping_mul(0x9E37_79B9_7F4A_7C15)
}

/// Builds [`SimController`]s from the merged configuration.
#[derive(Debug, Default)]
pub struct SimControllerFactory {
    capacity: Option<u32>,
    created: AtomicU32,
}

impl SimControllerFactory {
    /// Create a factory with no limit.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a factory that can build at most `capacity` controllers.
    pub fn with_capacity(capacity: u32) -> Self {
        Self {
            capacity: Some(capacity),
            created: AtomicU32::new(0),
        }
    }

    /// Number of controllers built so far.
    pub fn created(&self) -> u32 {
        self.created.load(Ordering::Acquire)
    }

    fn reserve(&self) -> Result<(), ControllerError> {
        let capacity = self.capacity;
        self.created
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |created| match capacity {
                Some(limit) if created >= limit => None,
                _ => Some(created + 1),
            })
            .map(|_| ())
            .map_err(|created| {
                ControllerError::ResourceExhausted(format!(
                    "controller capacity of {created} reached"
                ))
            })
    }
}

impl ControllerFactory for SimControllerFactory {
    type Controller = SimController<SimEvent>;

    fn create_controller(
        &self,
        identity: &ProcessIdentity,
        config: &ConfigurationSet,
    ) -> Result<Self::Controller, ControllerError> {
        let algorithm: SchedulingAlgorithm = config
            .get_text(SCHED_ALGORITHM)
            .map_err(invalid)?
            .parse()
            .map_err(invalid)?;
        let end_time = seconds(config, SCHED_END_TIME)?;
        let lookahead = seconds(config, SCHED_LOOKAHEAD)?;
        let seed = config.get_int(RNG_SEED).map_err(invalid)?;

        self.reserve()?;

        info!(
            rank = identity.rank().get(),
            %algorithm,
            end_time = ?end_time,
            lookahead = ?lookahead,
            "Controller created"
        );
        Ok(SimController::new(
            identity.rank(),
            algorithm,
            end_time,
            lookahead,
            seed as u64,
        ))
    }
}

fn invalid(err: impl fmt::Display) -> ControllerError {
    ControllerError::InvalidConfiguration(err.to_string())
}

fn seconds(config: &ConfigurationSet, key: &str) -> Result<Duration, ControllerError> {
    let value = config.get_float(key).map_err(invalid)?;
    Duration::try_from_secs_f64(value).map_err(|_| {
        ControllerError::InvalidConfiguration(format!(
            "option '{key}' must be a non-negative number of seconds, got {value}"
        ))
    })
}

/// Event type scheduled by controllers built from [`SimControllerFactory`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SimEvent {
    /// Entity the event is delivered to.
    pub entity: u64,
    /// Free-form event label.
    pub label: String,
}

impl SimEvent {
    /// Create a new event.
    pub fn new(entity: u64, label: impl Into<String>) -> Self {
        Self {
            entity,
            label: label.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::Rng;
    use simx_types::{ConfigValue, GroupSize};
    use tracing_test::traced_test;

    fn identity(rank: u32) -> ProcessIdentity {
        ProcessIdentity::new(Rank(rank), GroupSize::new(4).unwrap(), "sim_app").unwrap()
    }

    fn config(algorithm: &str) -> ConfigurationSet {
        [
            (SCHED_ALGORITHM, ConfigValue::from(algorithm)),
            (SCHED_END_TIME, ConfigValue::from(10.0)),
            (SCHED_LOOKAHEAD, ConfigValue::from(0.5)),
            (RNG_SEED, ConfigValue::from(42i64)),
        ]
        .into_iter()
        .collect()
    }

    #[test]
    fn test_controller_from_config() {
        let factory = SimControllerFactory::new();

        let controller = factory.create_controller(&identity(1), &config("heap")).unwrap();

        assert_eq!(controller.rank(), Rank(1));
        assert_eq!(controller.algorithm(), SchedulingAlgorithm::Heap);
        assert_eq!(controller.end_time(), Duration::from_secs(10));
        assert_eq!(controller.lookahead(), Duration::from_millis(500));
        assert_eq!(factory.created(), 1);
    }

    #[test]
    fn test_events_fire_in_order() {
        let factory = SimControllerFactory::new();
        let mut controller = factory.create_controller(&identity(0), &config("calendar")).unwrap();

        controller.schedule(Duration::from_secs(2), SimEvent::new(1, "b"));
        controller.schedule(Duration::from_secs(1), SimEvent::new(1, "a"));
        controller.schedule(Duration::from_secs(2), SimEvent::new(2, "c"));
        assert!(controller.schedule(Duration::from_secs(11), SimEvent::new(3, "late")).is_none());

        let labels: Vec<_> = std::iter::from_fn(|| controller.pop_next())
            .map(|(_, event)| event.label)
            .collect();
        assert_eq!(labels, vec!["a", "b", "c"]);
        assert_eq!(controller.now(), Duration::from_secs(2));
        assert_eq!(controller.pending(), 0);
    }

    #[test]
    #[traced_test]
    fn test_creation_is_logged() {
        SimControllerFactory::new()
            .create_controller(&identity(2), &config("calendar"))
            .unwrap();

        assert!(logs_contain("Controller created"));
        assert!(logs_contain("rank=2"));
    }

    #[test]
    fn test_unknown_algorithm_rejected() {
        let factory = SimControllerFactory::new();

        let err = factory.create_controller(&identity(0), &config("fifo")).unwrap_err();

        assert!(matches!(err, ControllerError::InvalidConfiguration(_)));
        assert_eq!(factory.created(), 0);
    }

    #[test]
    fn test_negative_end_time_rejected() {
        let mut config = config("calendar");
        config.set(SCHED_END_TIME, -1.0);

        let err = SimControllerFactory::new()
            .create_controller(&identity(0), &config)
            .unwrap_err();

        assert!(matches!(err, ControllerError::InvalidConfiguration(_)));
    }

    #[test]
    fn test_capacity_exhaustion() {
        let factory = SimControllerFactory::with_capacity(1);

        factory.create_controller(&identity(0), &config("calendar")).unwrap();
        let err = factory.create_controller(&identity(1), &config("calendar")).unwrap_err();

        assert!(matches!(err, ControllerError::ResourceExhausted(_)));
        assert_eq!(factory.created(), 1);
    }

    #[test]
    fn test_ranks_draw_distinct_streams() {
        let factory = SimControllerFactory::new();
        let mut a = factory.create_controller(&identity(0), &config("calendar")).unwrap();
        let mut b = factory.create_controller(&identity(1), &config("calendar")).unwrap();
        let mut a_again = factory.create_controller(&identity(0), &config("calendar")).unwrap();

        let first: u64 = a.rng().gen();
        assert_ne!(first, b.rng().gen::<u64>());
        assert_eq!(first, a_again.rng().gen::<u64>());
    }
}
