// Frame-loop demo: units poll a single-flight gate for their paths
//
// Every unit polls on every frame. The first poll per unit triggers one
// slow path computation; later polls see nothing until it lands, then walk
// the path one waypoint per frame.

use anyhow::{bail, Context, Result};
use serde::Serialize;
use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{interval, Instant, MissedTickBehavior};
use tracing::{info, warn};

use crate::cancellation::CancelToken;
use crate::config::{FlightConfig, SimulationConfig};
use crate::observability::FlightStats;
use crate::shutdown::ShutdownCoordinator;
use crate::single_flight::{ComputationProvider, SingleFlight};

/// A computed path that a unit walks one frame at a time
#[derive(Debug)]
pub struct PathPlan {
    pub owner: usize,
    pub waypoints: Vec<(i32, i32)>,
    frames_required: u32,
    frames_run: AtomicU32,
    finished: Arc<AtomicUsize>,
}

impl PathPlan {
    /// Advance one frame. Returns true on the frame the path is finished.
    pub fn run(&self) -> bool {
        let frames = self.frames_run.fetch_add(1, Ordering::AcqRel) + 1;
        if frames == self.frames_required {
            self.finished.fetch_add(1, Ordering::AcqRel);
            info!(owner = self.owner, "Path finished");
            return true;
        }
        false
    }

    pub fn frames_run(&self) -> u32 {
        self.frames_run.load(Ordering::Acquire)
    }
}

/// Path finder that blocks for a fixed time per request
pub struct PathPlanner {
    latency: Duration,
    frames_required: u32,
    requested: Arc<AtomicUsize>,
    finished: Arc<AtomicUsize>,
}

impl PathPlanner {
    pub fn new(latency: Duration, frames_required: u32) -> Self {
        Self {
            latency,
            frames_required: frames_required.max(1),
            requested: Arc::new(AtomicUsize::new(0)),
            finished: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Counter of computations started so far
    pub fn requested(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.requested)
    }

    /// Counter of paths walked to the end
    pub fn finished(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.finished)
    }
}

impl ComputationProvider<usize, Arc<PathPlan>> for PathPlanner {
    fn compute(&self, owner: &usize) -> Arc<PathPlan> {
        let request = self.requested.fetch_add(1, Ordering::AcqRel) + 1;
        info!(owner = *owner, request, "Computing path");
        std::thread::sleep(self.latency);

        let origin = *owner as i32;
        let waypoints = (0..self.frames_required as i32)
            .map(|step| (origin + step, origin - step))
            .collect();

        Arc::new(PathPlan {
            owner: *owner,
            waypoints,
            frames_required: self.frames_required,
            frames_run: AtomicU32::new(0),
            finished: Arc::clone(&self.finished),
        })
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct PathDemoReport {
    pub units: usize,
    pub paths_requested: usize,
    pub paths_finished: usize,
    pub frames: u64,
    pub elapsed_ms: u64,
    pub fps: f64,
    pub cancelled: bool,
    pub gate: FlightStats,
}

/// Run the frame loop until every unit has walked its path or `cancel` fires.
pub async fn run_path_demo(
    simulation: &SimulationConfig,
    flight: &FlightConfig,
    cancel: &CancelToken,
) -> Result<PathDemoReport> {
    let planner = PathPlanner::new(
        Duration::from_millis(simulation.path_compute_ms),
        simulation.frames_per_path,
    );
    let requested = planner.requested();
    let finished = planner.finished();
    let gate: SingleFlight<usize, Arc<PathPlan>> =
        SingleFlight::new("paths", planner).context("Path gate needs a tokio runtime")?;
    let units: Vec<usize> = (0..simulation.unit_count).collect();

    info!(
        units = units.len(),
        frame_rate = simulation.frame_rate,
        "Starting path simulation"
    );

    let mut ticker = interval(simulation.frame_interval());
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let started = Instant::now();
    let mut frames = 0u64;
    let mut cancelled = false;

    while finished.load(Ordering::Acquire) < units.len() {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                warn!(frames, "Path simulation cancelled");
                cancelled = true;
                break;
            }
            _ = ticker.tick() => {}
        }

        for unit in &units {
            if let Some(path) = gate.poll(unit) {
                path.run();
            }
        }
        frames += 1;

        if gate.stats().completed == 0 && started.elapsed() > flight.completion_timeout() {
            bail!(
                "No path arrived within {}ms; is the path finder stuck?",
                flight.completion_timeout_ms
            );
        }
    }

    let elapsed = started.elapsed();
    ShutdownCoordinator::drain(&gate, flight.drain_timeout()).await?;

    let stats = gate.stats();
    stats.log(gate.name());
    let seconds = elapsed.as_secs_f64();

    Ok(PathDemoReport {
        units: units.len(),
        paths_requested: requested.load(Ordering::Acquire),
        paths_finished: finished.load(Ordering::Acquire),
        frames,
        elapsed_ms: elapsed.as_millis() as u64,
        fps: if seconds > 0.0 { frames as f64 / seconds } else { 0.0 },
        cancelled,
        gate: stats,
    })
}
