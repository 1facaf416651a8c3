// Replay session - drives a ReplayMachine from a single interval timer
use crate::application::replay_machine::{ReplayMachine, ReplaySnapshot, TickOutcome};
use crate::domain::alert::AlertEvent;
use crate::domain::chart::WindowView;
use crate::domain::sample::{BacktestBatch, Sample};
use crate::domain::scoring::{AngleAssessment, PHASE_ANGLES, assess};
use serde::Serialize;
use std::ops::ControlFlow;
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::sync::{Mutex, broadcast};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};

/// Current reading and verdict for one phase angle
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AngleReading {
    pub name: &'static str,
    pub column: &'static str,
    pub value: Option<f64>,
    pub assessment: AngleAssessment,
}

/// Owns the running interval task. Dropping it cancels the task, so every
/// path that clears the handle also stops the ticking.
struct Ticker {
    handle: JoinHandle<()>,
}

impl Drop for Ticker {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

struct SessionState {
    machine: ReplayMachine,
    ticker: Option<Ticker>,
    // bumped on every arm; a tick from an older task is discarded
    generation: u64,
    alerts: broadcast::Sender<AlertEvent>,
}

impl SessionState {
    fn on_tick(&mut self) -> ControlFlow<()> {
        match self.machine.tick() {
            TickOutcome::Advanced { cursor, alerts } => {
                for alert in alerts {
                    tracing::warn!(
                        alert_id = alert.id,
                        model = %alert.model_name,
                        column = alert.column,
                        severity = alert.severity.label(),
                        defect_rate = alert.defect_rate,
                        cursor,
                        "defect predicted"
                    );
                    // no subscribers is fine
                    let _ = self.alerts.send(alert);
                }
                ControlFlow::Continue(())
            }
            TickOutcome::Completed => {
                tracing::info!(
                    model = %self.machine.model_name(),
                    samples = self.machine.len(),
                    "replay completed"
                );
                self.ticker = None;
                ControlFlow::Break(())
            }
            TickOutcome::Ignored => {
                self.ticker = None;
                ControlFlow::Break(())
            }
        }
    }
}

/// One loaded batch and its replay. At most one ticker is alive per session.
pub struct ReplaySession {
    shared: Arc<Mutex<SessionState>>,
    tick_interval: Duration,
}

impl ReplaySession {
    pub fn new(
        batch: Arc<BacktestBatch>,
        window_cap: usize,
        tick_interval: Duration,
        alerts: broadcast::Sender<AlertEvent>,
    ) -> Self {
        let state = SessionState {
            machine: ReplayMachine::new(batch, window_cap),
            ticker: None,
            generation: 0,
            alerts,
        };
        Self {
            shared: Arc::new(Mutex::new(state)),
            tick_interval,
        }
    }

    pub async fn start(&self) -> ReplaySnapshot {
        let mut state = self.shared.lock().await;
        if state.machine.start() {
            self.arm(&mut state);
            tracing::debug!(model = %state.machine.model_name(), "replay started");
        } else {
            tracing::debug!(phase = ?state.machine.phase(), "start ignored");
        }
        state.machine.snapshot()
    }

    pub async fn pause(&self) -> ReplaySnapshot {
        let mut state = self.shared.lock().await;
        if state.machine.pause() {
            state.ticker = None;
            tracing::debug!(cursor = state.machine.cursor(), "replay paused");
        } else {
            tracing::debug!(phase = ?state.machine.phase(), "pause ignored");
        }
        state.machine.snapshot()
    }

    pub async fn resume(&self) -> ReplaySnapshot {
        let mut state = self.shared.lock().await;
        if state.machine.resume() {
            self.arm(&mut state);
            tracing::debug!(cursor = state.machine.cursor(), "replay resumed");
        } else {
            tracing::debug!(phase = ?state.machine.phase(), "resume ignored");
        }
        state.machine.snapshot()
    }

    pub async fn stop(&self) -> ReplaySnapshot {
        let mut state = self.shared.lock().await;
        if state.machine.stop() {
            state.ticker = None;
            tracing::debug!(cursor = state.machine.cursor(), "replay stopped");
        } else {
            tracing::debug!(phase = ?state.machine.phase(), "stop ignored");
        }
        state.machine.snapshot()
    }

    pub async fn reset(&self) -> ReplaySnapshot {
        let mut state = self.shared.lock().await;
        state.ticker = None;
        state.machine.reset();
        tracing::debug!("replay reset");
        state.machine.snapshot()
    }

    pub async fn snapshot(&self) -> ReplaySnapshot {
        self.shared.lock().await.machine.snapshot()
    }

    pub async fn visible_window(&self) -> Vec<Sample> {
        self.shared.lock().await.machine.visible_window().to_vec()
    }

    pub async fn current_sample(&self) -> Option<Sample> {
        self.shared.lock().await.machine.current_sample().cloned()
    }

    pub async fn window_view(&self) -> WindowView {
        let state = self.shared.lock().await;
        WindowView::build(state.machine.cursor(), state.machine.visible_window())
    }

    pub async fn current_angle_statuses(&self) -> Vec<AngleReading> {
        let state = self.shared.lock().await;
        let Some(sample) = state.machine.current_sample() else {
            return Vec::new();
        };

        PHASE_ANGLES
            .iter()
            .map(|reference| {
                let value = sample.angle(reference.angle_index);
                AngleReading {
                    name: reference.name,
                    column: reference.column,
                    value,
                    assessment: assess(value, reference),
                }
            })
            .collect()
    }

    /// Replacing the handle drops, and so cancels, any previous ticker.
    fn arm(&self, state: &mut SessionState) {
        state.generation += 1;
        state.ticker = Some(spawn_ticker(
            Arc::downgrade(&self.shared),
            state.generation,
            self.tick_interval,
        ));
    }
}

fn spawn_ticker(shared: Weak<Mutex<SessionState>>, generation: u64, period: Duration) -> Ticker {
    let handle = tokio::spawn(async move {
        let mut interval = tokio::time::interval_at(Instant::now() + period, period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            interval.tick().await;

            // the session is gone
            let Some(session) = shared.upgrade() else {
                break;
            };
            let mut state = session.lock().await;
            if state.generation != generation {
                break;
            }
            if state.on_tick().is_break() {
                break;
            }
        }
    });

    Ticker { handle }
}
