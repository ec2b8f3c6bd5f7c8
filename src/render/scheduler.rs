//! Browser session scheduler.
//!
//! # States
//! - NoSession: no browser process is running
//! - SessionActive: one session is live and shared by in-flight fetches
//! - ShuttingDown: terminal; submissions are refused
//!
//! # State Transitions
//! ```text
//! NoSession     → SessionActive: request arrives, launch succeeds
//! NoSession     → NoSession:     launch fails (error goes to that caller only)
//! SessionActive → SessionActive: request arrives or a fetch completes (idle deadline reset)
//! SessionActive → NoSession:     idle deadline elapses with no fetch in flight
//! any           → ShuttingDown:  shutdown signal (in-flight fetches aborted, session closed)
//! ```
//!
//! # Design Decisions
//! - One loop makes every lifecycle decision; at most one session exists
//! - Fetches run as independent tasks holding an `Arc` to the session
//! - The idle timer is disarmed while fetches are in flight, so a session is
//!   never recycled under a running render
//! - A caller that stops waiting aborts its own fetch task

use std::ops::ControlFlow;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{broadcast, mpsc, oneshot, watch};
use tokio::task::{JoinHandle, JoinSet};
use tokio::time::{sleep_until, Instant};

use crate::browser::{BrowserLauncher, BrowserSession};
use crate::config::SchedulerConfig;
use crate::observability::metrics;
use crate::render::fetcher::RetryingFetcher;
use crate::render::{RenderError, RenderRequest, RenderResult};

/// A request paired with the channel its result goes back on.
struct Job {
    request: RenderRequest,
    reply: oneshot::Sender<RenderResult>,
}

/// Externally visible scheduler state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerStatus {
    NoSession,
    SessionActive,
    ShuttingDown,
}

enum State {
    NoSession,
    SessionActive {
        session: Arc<dyn BrowserSession>,
        last_activity: Instant,
    },
}

/// Cloneable submission side of the scheduler.
#[derive(Clone)]
pub struct SchedulerHandle {
    jobs: mpsc::Sender<Job>,
    status: watch::Receiver<SchedulerStatus>,
}

impl SchedulerHandle {
    /// Submit a request and wait for its result.
    ///
    /// Dropping the returned future cancels the in-flight fetch.
    pub async fn submit(&self, request: RenderRequest) -> RenderResult {
        let (reply, result) = oneshot::channel();
        self.jobs
            .send(Job { request, reply })
            .await
            .map_err(|_| RenderError::ShuttingDown)?;

        match result.await {
            Ok(result) => result,
            Err(_) if self.jobs.is_closed() => Err(RenderError::ShuttingDown),
            Err(_) => Err(RenderError::Internal(
                "render task ended without a result".into(),
            )),
        }
    }

    pub fn status(&self) -> SchedulerStatus {
        *self.status.borrow()
    }
}

/// Single logical worker owning the browser session lifecycle.
pub struct RenderScheduler {
    launcher: Arc<dyn BrowserLauncher>,
    fetcher: RetryingFetcher,
    idle_timeout: Duration,
    jobs: mpsc::Receiver<Job>,
    status: watch::Sender<SchedulerStatus>,
    shutdown: broadcast::Receiver<()>,
}

impl RenderScheduler {
    /// Spawn the scheduling loop on the current runtime.
    pub fn spawn(
        launcher: Arc<dyn BrowserLauncher>,
        fetcher: RetryingFetcher,
        config: &SchedulerConfig,
        shutdown: broadcast::Receiver<()>,
    ) -> (SchedulerHandle, JoinHandle<()>) {
        let (jobs_tx, jobs_rx) = mpsc::channel(config.queue_depth.max(1));
        let (status_tx, status_rx) = watch::channel(SchedulerStatus::NoSession);

        let scheduler = Self {
            launcher,
            fetcher,
            idle_timeout: config.idle_timeout(),
            jobs: jobs_rx,
            status: status_tx,
            shutdown,
        };
        let task = tokio::spawn(scheduler.run());

        (
            SchedulerHandle {
                jobs: jobs_tx,
                status: status_rx,
            },
            task,
        )
    }

    async fn run(mut self) {
        tracing::info!(idle_timeout = ?self.idle_timeout, "Render scheduler starting");

        let mut state = State::NoSession;
        let mut in_flight: JoinSet<()> = JoinSet::new();

        loop {
            let idle_deadline = match &state {
                State::SessionActive { last_activity, .. } if in_flight.is_empty() => {
                    last_activity.checked_add(self.idle_timeout)
                }
                _ => None,
            };

            tokio::select! {
                biased;

                _ = self.shutdown.recv() => {
                    tracing::info!("Render scheduler received shutdown signal, exiting loop");
                    break;
                }
                job = self.jobs.recv() => match job {
                    Some(job) => {
                        if self.dispatch(&mut state, &mut in_flight, job).await.is_break() {
                            tracing::info!("Render scheduler received shutdown signal during launch, exiting loop");
                            break;
                        }
                    }
                    None => break,
                },
                Some(joined) = in_flight.join_next(), if !in_flight.is_empty() => {
                    if let Err(e) = joined {
                        if e.is_panic() {
                            tracing::error!(error = %e, "Render task panicked");
                        }
                    }
                    if let State::SessionActive { last_activity, .. } = &mut state {
                        *last_activity = Instant::now();
                    }
                }
                _ = wait_until(idle_deadline) => {
                    if let State::SessionActive { session, .. } = std::mem::replace(&mut state, State::NoSession) {
                        tracing::info!(idle_timeout = ?self.idle_timeout, "Browser session idle, recycling");
                        destroy(session).await;
                        self.status.send_replace(SchedulerStatus::NoSession);
                    }
                }
            }
        }

        self.shut_down(state, in_flight).await;
    }

    /// Breaks when shutdown arrives while a session is being launched.
    async fn dispatch(
        &mut self,
        state: &mut State,
        in_flight: &mut JoinSet<()>,
        job: Job,
    ) -> ControlFlow<()> {
        let session = match state {
            State::SessionActive {
                session,
                last_activity,
            } => {
                *last_activity = Instant::now();
                Arc::clone(session)
            }
            State::NoSession => {
                let launched = tokio::select! {
                    biased;

                    _ = self.shutdown.recv() => {
                        let _ = job.reply.send(Err(RenderError::ShuttingDown));
                        return ControlFlow::Break(());
                    }
                    launched = self.launcher.launch() => launched,
                };
                match launched {
                    Ok(session) => {
                        metrics::record_session_allocated();
                        tracing::info!("Browser session allocated");
                        *state = State::SessionActive {
                            session: Arc::clone(&session),
                            last_activity: Instant::now(),
                        };
                        self.status.send_replace(SchedulerStatus::SessionActive);
                        session
                    }
                    Err(e) => {
                        tracing::error!(error = %e, source = %job.request.source, "Browser session allocation failed");
                        let _ = job.reply.send(Err(RenderError::SessionAllocationFailed(e)));
                        return ControlFlow::Continue(());
                    }
                }
            }
        };

        let fetcher = self.fetcher.clone();
        in_flight.spawn(async move {
            let Job { request, mut reply } = job;
            let outcome = tokio::select! {
                result = fetcher.fetch(session.as_ref(), &request) => Some(result),
                _ = reply.closed() => None,
            };
            match outcome {
                Some(result) => {
                    let _ = reply.send(result);
                }
                None => tracing::debug!(source = %request.source, "Caller gone, render abandoned"),
            }
        });
        ControlFlow::Continue(())
    }

    async fn shut_down(mut self, state: State, mut in_flight: JoinSet<()>) {
        self.jobs.close();
        self.status.send_replace(SchedulerStatus::ShuttingDown);

        in_flight.abort_all();
        while in_flight.join_next().await.is_some() {}

        if let State::SessionActive { session, .. } = state {
            destroy(session).await;
        }

        // Anything queued before the close is refused explicitly.
        while let Ok(job) = self.jobs.try_recv() {
            let _ = job.reply.send(Err(RenderError::ShuttingDown));
        }

        tracing::info!("Render scheduler stopped");
    }
}

async fn wait_until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}

async fn destroy(session: Arc<dyn BrowserSession>) {
    if let Err(e) = session.close().await {
        tracing::warn!(error = %e, "Failed to close browser session");
    }
    metrics::record_session_destroyed();
}
