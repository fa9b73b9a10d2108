/*!
One-shot or perpetual execution of a job, exposed as a stream of run events
*/

use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::watch;
use tokio_stream::Stream;
use tracing::{debug, error, info};

use super::BoxError;

/// Chosen once at startup
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunMode {
    /// Run once and stop
    OneShot,
    /// Run, sleep `interval`, run again, until shutdown
    Perpetual { interval: Duration },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    Idle,
    Running,
    Sleeping,
}

/// Events emitted by the scheduler
#[derive(Debug)]
pub enum ScheduleEvent<T> {
    /// A run finished
    RunCompleted { iteration: u64, output: T },
    /// A run returned an error. In perpetual mode the next run is still scheduled.
    RunFailed { iteration: u64, error: String },
}

/// A unit of work the scheduler repeats
#[async_trait]
pub trait ScheduledJob: Send {
    type Output: Send;

    async fn run_once(&mut self) -> Result<Self::Output, BoxError>;
}

pub struct Scheduler<J> {
    job: J,
    mode: RunMode,
    shutdown: watch::Receiver<bool>,
    state: watch::Sender<SchedulerState>,
}

impl<J: ScheduledJob> Scheduler<J> {
    /// `shutdown` flips to `true` to stop. Dropping its sender means "never stop".
    pub fn new(job: J, mode: RunMode, shutdown: watch::Receiver<bool>) -> Self {
        let (state, _) = watch::channel(SchedulerState::Idle);
        Self {
            job,
            mode,
            shutdown,
            state,
        }
    }

    /// Follow state transitions
    pub fn state(&self) -> watch::Receiver<SchedulerState> {
        self.state.subscribe()
    }

    fn set_state(&self, state: SchedulerState) {
        debug!("Scheduler state -> {:?}", state);
        self.state.send_replace(state);
    }

    /// Consume the scheduler. The stream ends after the single run in one-shot mode, or when
    /// shutdown is requested in perpetual mode.
    pub fn into_events(mut self) -> impl Stream<Item = ScheduleEvent<J::Output>> {
        async_stream::stream! {
            let mut iteration = 0u64;

            loop {
                if *self.shutdown.borrow() {
                    break;
                }

                iteration += 1;
                self.set_state(SchedulerState::Running);
                match self.job.run_once().await {
                    Ok(output) => {
                        yield ScheduleEvent::RunCompleted { iteration, output };
                    }
                    Err(e) => {
                        error!("Run {} failed: {}", iteration, e);
                        yield ScheduleEvent::RunFailed { iteration, error: e.to_string() };
                    }
                }

                let interval = match self.mode {
                    RunMode::OneShot => break,
                    RunMode::Perpetual { interval } => interval,
                };

                self.set_state(SchedulerState::Sleeping);
                info!("💤 Next run in {:?}", interval);
                tokio::select! {
                    _ = tokio::time::sleep(interval) => {}
                    _ = wait_for_shutdown(&mut self.shutdown) => {
                        info!("🛑 Shutdown requested, stopping scheduler");
                        break;
                    }
                }
            }

            self.set_state(SchedulerState::Idle);
        }
    }
}

async fn wait_for_shutdown(shutdown: &mut watch::Receiver<bool>) {
    loop {
        if *shutdown.borrow_and_update() {
            return;
        }
        if shutdown.changed().await.is_err() {
            // Sender gone: nobody can ask us to stop any more
            std::future::pending::<()>().await;
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU64, Ordering};

    use tokio_stream::StreamExt;

    use super::*;

    struct Counter {
        runs: Arc<AtomicU64>,
        fail_on: Option<u64>,
    }

    #[async_trait]
    impl ScheduledJob for Counter {
        type Output = u64;

        async fn run_once(&mut self) -> Result<u64, BoxError> {
            let run = self.runs.fetch_add(1, Ordering::SeqCst) + 1;
            if Some(run) == self.fail_on {
                return Err(format!("run {run} exploded").into());
            }
            Ok(run)
        }
    }

    fn counter(fail_on: Option<u64>) -> (Counter, Arc<AtomicU64>) {
        let runs = Arc::new(AtomicU64::new(0));
        (
            Counter {
                runs: runs.clone(),
                fail_on,
            },
            runs,
        )
    }

    #[tokio::test]
    async fn one_shot_runs_exactly_once() {
        let (job, runs) = counter(None);
        let (_tx, rx) = watch::channel(false);
        let events: Vec<_> = Scheduler::new(job, RunMode::OneShot, rx)
            .into_events()
            .collect()
            .await;

        assert_eq!(events.len(), 1);
        assert!(matches!(events[0], ScheduleEvent::RunCompleted { iteration: 1, output: 1 }));
        assert_eq!(runs.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn perpetual_survives_failures() {
        let (job, _) = counter(Some(2));
        let (_tx, rx) = watch::channel(false);
        let mode = RunMode::Perpetual {
            interval: Duration::from_secs(5 * 60 * 60),
        };

        let events: Vec<_> = Scheduler::new(job, mode, rx)
            .into_events()
            .take(4)
            .collect()
            .await;

        assert!(matches!(events[0], ScheduleEvent::RunCompleted { iteration: 1, .. }));
        assert!(matches!(events[1], ScheduleEvent::RunFailed { iteration: 2, .. }));
        assert!(matches!(events[2], ScheduleEvent::RunCompleted { iteration: 3, .. }));
        assert!(matches!(events[3], ScheduleEvent::RunCompleted { iteration: 4, .. }));
    }

    #[tokio::test(start_paused = true)]
    async fn waits_the_interval_between_runs() {
        let (job, runs) = counter(None);
        let (_tx, rx) = watch::channel(false);
        let interval = Duration::from_secs(3600);
        let mut events = Box::pin(
            Scheduler::new(job, RunMode::Perpetual { interval }, rx).into_events(),
        );

        let start = tokio::time::Instant::now();
        events.next().await;
        events.next().await;
        assert_eq!(runs.load(Ordering::SeqCst), 2);
        assert!(start.elapsed() >= interval);
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_interrupts_the_sleep() {
        let (job, runs) = counter(None);
        let (tx, rx) = watch::channel(false);
        let scheduler = Scheduler::new(
            job,
            RunMode::Perpetual {
                interval: Duration::from_secs(10 * 60 * 60),
            },
            rx,
        );
        let mut state = scheduler.state();
        let mut events = Box::pin(scheduler.into_events());

        assert!(events.next().await.is_some());
        let stopper = tokio::spawn(async move {
            state
                .wait_for(|s| *s == SchedulerState::Sleeping)
                .await
                .unwrap();
            tx.send(true).unwrap();
        });

        assert!(events.next().await.is_none());
        stopper.await.unwrap();
        assert_eq!(runs.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn dropped_shutdown_sender_never_stops() {
        let (job, _) = counter(None);
        let (tx, rx) = watch::channel(false);
        drop(tx);
        let mode = RunMode::Perpetual {
            interval: Duration::from_secs(60),
        };

        let events: Vec<_> = Scheduler::new(job, mode, rx)
            .into_events()
            .take(3)
            .collect()
            .await;
        assert_eq!(events.len(), 3);
    }
}
