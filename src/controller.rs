use std::thread;

use crate::{
    config::Config,
    error::{ConfigError, Fault, RunError},
    semaphore::Interrupted,
    state::CoordinationState,
    trace::{error, info},
    worker::{Worker, WorkerId, WorkerStats},
};

/// Counts gathered from a completed run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunReport {
    pub produced: usize,
    pub consumed: usize,
    /// Items created on the quota boundary and dropped without being queued.
    pub discarded: usize,
    /// Largest queue length seen during the run. Never above the capacity.
    pub peak_queue_len: usize,
    pub workers: Vec<WorkerReport>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorkerReport {
    pub id: WorkerId,
    pub stats: WorkerStats,
}

/// Runs producer and consumer threads over one bounded buffer until
/// `max_items` items have passed through it.
pub struct Controller<P, C> {
    produce: P,
    consume: C,
    config: Config,
}

impl<P, C> Controller<P, C> {
    pub fn new(produce: P, consume: C, config: Config) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            produce,
            consume,
            config,
        })
    }

    pub fn builder() -> ControllerBuilder<P, C> {
        ControllerBuilder::new()
    }

    pub fn config(&self) -> &Config {
        &self.config
    }
}

impl<T, P, C> Controller<P, C>
where
    T: Send,
    P: Fn() -> T + Sync,
    C: Fn(T) + Sync,
{
    /// Starts every worker, waits for all of them to exit and reports the
    /// totals.
    ///
    /// Workers are always joined, even when one of them faults. The error
    /// names the worker that failed first; peers that were only interrupted
    /// as a consequence are not reported.
    pub fn exec(&self) -> Result<RunReport, RunError> {
        let config = self.config;
        info!(
            producers = config.producers,
            consumers = config.consumers,
            max_items = config.max_items,
            capacity = config.capacity,
            "starting run"
        );

        let state = CoordinationState::new(config.capacity, config.max_items);
        let producers =
            (1..=config.producers).map(|index| Worker::producer(index, &state, &self.produce));
        let consumers =
            (1..=config.consumers).map(|index| Worker::consumer(index, &state, &self.consume));

        let (outcomes, spawn_error) = thread::scope(|s| {
            let mut handles = Vec::with_capacity(config.producers + config.consumers);
            let mut spawn_error = None;
            for worker in producers.chain(consumers) {
                let id = worker.id();
                match thread::Builder::new()
                    .name(id.to_string())
                    .spawn_scoped(s, move || worker.run())
                {
                    Ok(handle) => handles.push((id, handle)),
                    Err(source) => {
                        error!(worker = %id, %source, "failed to spawn worker");
                        state.interrupt();
                        spawn_error = Some(RunError::Spawn { worker: id, source });
                        break;
                    }
                }
            }

            let outcomes: Vec<_> = handles
                .into_iter()
                .map(|(id, handle)| {
                    let result = handle
                        .join()
                        .unwrap_or_else(|payload| Err(Fault::panicked(payload)));
                    (id, result)
                })
                .collect();
            (outcomes, spawn_error)
        });

        if let Some(err) = spawn_error {
            return Err(err);
        }
        let workers = collect_reports(outcomes)?;

        let ledger = state.into_ledger();
        debug_assert_eq!(ledger.produced, config.max_items);
        debug_assert_eq!(ledger.consumed, config.max_items);
        debug_assert!(ledger.queue.is_empty());

        let report = RunReport {
            produced: ledger.produced,
            consumed: ledger.consumed,
            discarded: workers.iter().map(|w| w.stats.discarded).sum(),
            peak_queue_len: ledger.peak_len,
            workers,
        };
        info!(
            produced = report.produced,
            consumed = report.consumed,
            discarded = report.discarded,
            peak_queue_len = report.peak_queue_len,
            "run finished"
        );
        Ok(report)
    }
}

fn collect_reports(
    outcomes: Vec<(WorkerId, Result<WorkerStats, Fault>)>,
) -> Result<Vec<WorkerReport>, RunError> {
    let mut reports = Vec::with_capacity(outcomes.len());
    let mut interrupted = None;
    for (id, result) in outcomes {
        match result {
            Ok(stats) => reports.push(WorkerReport { id, stats }),
            Err(fault) if fault.is_interrupted() => {
                interrupted.get_or_insert(id);
            }
            Err(fault) => return Err(RunError::Worker { worker: id, fault }),
        }
    }
    match interrupted {
        Some(worker) => Err(RunError::Worker {
            worker,
            fault: Fault::Interrupted(Interrupted),
        }),
        None => Ok(reports),
    }
}

/// Builder for [`Controller`]. Both functions must be supplied before
/// [`build`](Self::build) succeeds.
pub struct ControllerBuilder<P, C> {
    produce: Option<P>,
    consume: Option<C>,
    config: Config,
}

impl<P, C> ControllerBuilder<P, C> {
    pub fn new() -> Self {
        Self {
            produce: None,
            consume: None,
            config: Config::default(),
        }
    }

    pub fn produce(mut self, produce: P) -> Self {
        self.produce = Some(produce);
        self
    }

    pub fn consume(mut self, consume: C) -> Self {
        self.consume = Some(consume);
        self
    }

    pub fn config(mut self, config: Config) -> Self {
        self.config = config;
        self
    }

    pub fn producers(mut self, producers: usize) -> Self {
        self.config.producers = producers;
        self
    }

    pub fn consumers(mut self, consumers: usize) -> Self {
        self.config.consumers = consumers;
        self
    }

    pub fn max_items(mut self, max_items: usize) -> Self {
        self.config.max_items = max_items;
        self
    }

    pub fn capacity(mut self, capacity: usize) -> Self {
        self.config.capacity = capacity;
        self
    }

    pub fn build(self) -> Result<Controller<P, C>, ConfigError> {
        let produce = self.produce.ok_or(ConfigError::MissingProducer)?;
        let consume = self.consume.ok_or(ConfigError::MissingConsumer)?;
        Controller::new(produce, consume, self.config)
    }
}

impl<P, C> Default for ControllerBuilder<P, C> {
    fn default() -> Self {
        Self::new()
    }
}

/// Validates the arguments, then runs `producers` producer threads and
/// `consumers` consumer threads until `max_items` items have been delivered
/// through a buffer holding at most `capacity` items.
pub fn run<T, P, C>(
    produce: P,
    consume: C,
    producers: usize,
    consumers: usize,
    max_items: usize,
    capacity: usize,
) -> Result<RunReport, RunError>
where
    T: Send,
    P: Fn() -> T + Sync,
    C: Fn(T) + Sync,
{
    let config = Config::new(producers, consumers, max_items, capacity);
    Controller::new(produce, consume, config)?.exec()
}

#[cfg(test)]
mod tests {
    use std::sync::{
        atomic::{AtomicUsize, Ordering},
        Mutex,
    };

    use super::*;
    use crate::worker::Role;

    #[test]
    fn test_builder_requires_functions() {
        let missing_producer = ControllerBuilder::<fn() -> u8, fn(u8)>::new()
            .consume(|_| {})
            .build();
        assert!(matches!(missing_producer, Err(ConfigError::MissingProducer)));

        let missing_consumer = ControllerBuilder::<fn() -> u8, fn(u8)>::new()
            .produce(|| 0)
            .build();
        assert!(matches!(missing_consumer, Err(ConfigError::MissingConsumer)));
    }

    #[test]
    fn test_builder_validates_config() {
        let result = Controller::builder()
            .produce(|| 1u8)
            .consume(|_: u8| {})
            .capacity(0)
            .build();
        assert!(matches!(
            result,
            Err(ConfigError::NotPositive { field: "capacity" })
        ));
    }

    #[test]
    fn test_exec_reports_per_worker() {
        let next = AtomicUsize::new(0);
        let delivered = Mutex::new(Vec::new());
        let controller = Controller::builder()
            .produce(|| next.fetch_add(1, Ordering::SeqCst))
            .consume(|item: usize| delivered.lock().unwrap().push(item))
            .producers(2)
            .consumers(3)
            .max_items(50)
            .capacity(4)
            .build()
            .unwrap();

        let report = controller.exec().unwrap();
        assert_eq!(report.produced, 50);
        assert_eq!(report.consumed, 50);
        assert!(report.peak_queue_len <= 4);
        assert_eq!(report.workers.len(), 5);

        let queued: usize = report
            .workers
            .iter()
            .filter(|w| w.id.role == Role::Producer)
            .map(|w| w.stats.handled)
            .sum();
        let delivered_count: usize = report
            .workers
            .iter()
            .filter(|w| w.id.role == Role::Consumer)
            .map(|w| w.stats.handled)
            .sum();
        assert_eq!(queued, 50);
        assert_eq!(delivered_count, 50);
        assert_eq!(delivered.lock().unwrap().len(), 50);
        assert_eq!(next.load(Ordering::SeqCst), 50 + report.discarded);
    }

    #[test]
    fn test_exec_can_repeat() {
        let total = AtomicUsize::new(0);
        let controller = Controller::new(
            || 1usize,
            |n: usize| {
                total.fetch_add(n, Ordering::SeqCst);
            },
            Config::new(2, 2, 10, 3),
        )
        .unwrap();

        controller.exec().unwrap();
        controller.exec().unwrap();
        assert_eq!(total.load(Ordering::SeqCst), 20);
    }

    #[test]
    fn test_collect_reports_prefers_root_cause() {
        let outcomes = vec![
            (
                WorkerId::new(Role::Producer, 1),
                Err(Fault::Interrupted(Interrupted)),
            ),
            (
                WorkerId::new(Role::Consumer, 1),
                Err(Fault::Panicked {
                    message: "bad item".into(),
                }),
            ),
            (WorkerId::new(Role::Consumer, 2), Ok(WorkerStats::default())),
        ];
        match collect_reports(outcomes) {
            Err(RunError::Worker { worker, fault }) => {
                assert_eq!(worker, WorkerId::new(Role::Consumer, 1));
                assert!(matches!(fault, Fault::Panicked { .. }));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_collect_reports_only_interrupted() {
        let outcomes = vec![
            (WorkerId::new(Role::Producer, 1), Ok(WorkerStats::default())),
            (
                WorkerId::new(Role::Producer, 2),
                Err(Fault::Interrupted(Interrupted)),
            ),
        ];
        let err = collect_reports(outcomes).unwrap_err();
        assert!(matches!(
            err,
            RunError::Worker {
                fault: Fault::Interrupted(_),
                ..
            }
        ));
    }
}
