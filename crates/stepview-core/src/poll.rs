//! Fixed-interval poll schedule
//!
//! The schedule is driven by the caller's clock: `tick` is fed elapsed time
//! and hands out at most one request at a time. The next request becomes due
//! a full interval after the previous one completed, whether it succeeded or
//! failed.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::error::{Result, ViewerError};
use crate::reconcile::{ReconcileReport, SceneState};
use crate::snapshot::SceneSnapshot;
use crate::surface::RenderSurface;

/// Default delay between the end of one poll and the start of the next
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(1000);

/// Build the scene URL for a backend base URL and optional step
pub fn scene_url(base: &str, step: Option<u32>) -> String {
    let base = base.trim_end_matches('/');
    match step {
        Some(step) => format!("{}/scene?step={}", base, step),
        None => format!("{}/scene", base),
    }
}

/// Cancellation handle shared between a schedule and its owner
#[derive(Debug, Clone, Default)]
pub struct PollHandle(Arc<AtomicBool>);

impl PollHandle {
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// A poll the caller should issue now
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollRequest {
    pub step: Option<u32>,
    /// Monotonic request number, starting at 1
    pub sequence: u64,
}

impl PollRequest {
    pub fn url(&self, base: &str) -> String {
        scene_url(base, self.step)
    }
}

#[derive(Debug)]
pub struct PollSchedule {
    interval: Duration,
    since_last: Duration,
    in_flight: bool,
    sequence: u64,
    successes: u64,
    failures: u64,
    last_ok: Option<bool>,
    handle: PollHandle,
}

impl Default for PollSchedule {
    fn default() -> Self {
        Self::new(DEFAULT_POLL_INTERVAL)
    }
}

impl PollSchedule {
    /// New schedule whose first tick polls immediately
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            since_last: interval,
            in_flight: false,
            sequence: 0,
            successes: 0,
            failures: 0,
            last_ok: None,
            handle: PollHandle::default(),
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn handle(&self) -> PollHandle {
        self.handle.clone()
    }

    pub fn is_in_flight(&self) -> bool {
        self.in_flight
    }

    /// Outcome of the most recent completed poll
    pub fn last_ok(&self) -> Option<bool> {
        self.last_ok
    }

    pub fn successes(&self) -> u64 {
        self.successes
    }

    pub fn failures(&self) -> u64 {
        self.failures
    }

    /// Advance the clock. Returns a request when one is due.
    pub fn tick(&mut self, delta: Duration, step: Option<u32>) -> Option<PollRequest> {
        if self.handle.is_cancelled() || self.in_flight {
            return None;
        }
        self.since_last = self.since_last.saturating_add(delta);
        if self.since_last < self.interval {
            return None;
        }

        self.in_flight = true;
        self.sequence += 1;
        debug!(sequence = self.sequence, step = ?step, "Poll due");
        Some(PollRequest {
            step,
            sequence: self.sequence,
        })
    }

    /// Mark the in-flight request done and restart the delay
    pub fn complete(&mut self, ok: bool) {
        if !self.in_flight {
            warn!("Poll completion without a request in flight");
        }
        self.in_flight = false;
        self.since_last = Duration::ZERO;
        self.last_ok = Some(ok);
        if ok {
            self.successes += 1;
        } else {
            self.failures += 1;
        }
    }

    /// Complete the in-flight request with its fetch result.
    ///
    /// A successful fetch is reconciled into `state`; a failed one is logged
    /// and leaves the scene untouched. A 404 for a pinned step means the step
    /// no longer exists on the server, so the cursor goes back to following
    /// the latest step.
    pub fn finish<S>(
        &mut self,
        state: &mut SceneState<S::Handle>,
        surface: &mut S,
        result: Result<SceneSnapshot>,
    ) -> Option<ReconcileReport>
    where
        S: RenderSurface,
    {
        match result {
            Ok(snapshot) => {
                self.complete(true);
                Some(state.reconcile(surface, &snapshot))
            }
            Err(e) => {
                self.complete(false);
                warn!(error = %e, failures = self.failures, "Scene poll failed");
                if let (ViewerError::Status { status: 404, .. }, Some(step)) =
                    (&e, state.steps.selected())
                {
                    info!(step, "Selected step is gone, following latest");
                    state.steps.follow_latest();
                }
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::category::Category;
    use crate::snapshot::{MeshData, MeshEntry};
    use crate::surface::HeadlessSurface;

    const SECOND: Duration = Duration::from_secs(1);

    #[test]
    fn test_scene_url() {
        assert_eq!(scene_url("http://host:5006", None), "http://host:5006/scene");
        assert_eq!(scene_url("http://host:5006/", Some(3)), "http://host:5006/scene?step=3");
        assert_eq!(scene_url("", Some(0)), "/scene?step=0");
    }

    #[test]
    fn test_first_tick_polls_immediately() {
        let mut schedule = PollSchedule::new(SECOND);
        let request = schedule.tick(Duration::ZERO, Some(2)).unwrap();
        assert_eq!(request.sequence, 1);
        assert_eq!(request.step, Some(2));
        assert_eq!(request.url("http://h"), "http://h/scene?step=2");
    }

    #[test]
    fn test_no_overlap_and_delay_after_completion() {
        let mut schedule = PollSchedule::new(SECOND);
        assert!(schedule.tick(Duration::ZERO, None).is_some());

        // Slow response: nothing new while in flight
        for _ in 0..5 {
            assert!(schedule.tick(SECOND, None).is_none());
        }
        assert!(schedule.is_in_flight());

        schedule.complete(true);
        assert!(schedule.tick(Duration::from_millis(600), None).is_none());
        assert!(schedule.tick(Duration::from_millis(300), None).is_none());
        let request = schedule.tick(Duration::from_millis(100), None).unwrap();
        assert_eq!(request.sequence, 2);
    }

    #[test]
    fn test_failed_poll_reschedules_and_keeps_scene() {
        let mut surface = HeadlessSurface::new();
        let mut state = SceneState::new();
        let mut schedule = PollSchedule::new(SECOND);

        schedule.tick(Duration::ZERO, None).unwrap();
        let snapshot = SceneSnapshot {
            add_global_axes: true,
            ..Default::default()
        };
        let report = schedule.finish(&mut state, &mut surface, Ok(snapshot)).unwrap();
        assert!(report.built() > 0);
        let live = surface.live_count();

        schedule.tick(SECOND, None).unwrap();
        let failed = schedule.finish(
            &mut state,
            &mut surface,
            Err(ViewerError::Http("connection refused".into())),
        );
        assert!(failed.is_none());
        assert_eq!(schedule.last_ok(), Some(false));
        assert_eq!(surface.live_count(), live);
        assert!(!state.groups.is_empty(Category::GlobalAxes));

        assert!(schedule.tick(SECOND, None).is_some());
        assert_eq!((schedule.successes(), schedule.failures()), (1, 1));
    }

    #[test]
    fn test_cancel_stops_polling() {
        let mut schedule = PollSchedule::new(SECOND);
        let handle = schedule.handle();
        schedule.tick(Duration::ZERO, None).unwrap();
        schedule.complete(true);

        handle.cancel();
        assert!(schedule.handle().is_cancelled());
        for _ in 0..10 {
            assert!(schedule.tick(SECOND * 10, None).is_none());
        }
    }

    fn mesh_snapshot(total: u32) -> SceneSnapshot {
        SceneSnapshot {
            updated_mesh: Some(MeshEntry {
                mesh: MeshData {
                    vertices: vec![[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]],
                    faces: vec![[0, 1, 2]],
                },
                color: None,
                label: Some("update_6".into()),
            }),
            total_steps: Some(total),
            ..Default::default()
        }
    }

    #[test]
    fn test_missing_pinned_step_falls_back_to_latest() {
        let mut surface = HeadlessSurface::new();
        let mut state = SceneState::new();
        let mut schedule = PollSchedule::new(SECOND);

        schedule.tick(Duration::ZERO, None).unwrap();
        schedule.finish(&mut state, &mut surface, Ok(mesh_snapshot(6)));
        state.steps.select(5).unwrap();

        // Server cleared: the pinned step now 404s
        let request = schedule.tick(SECOND, state.steps.selected()).unwrap();
        assert_eq!(request.step, Some(5));
        schedule.finish(
            &mut state,
            &mut surface,
            Err(ViewerError::Status {
                status: 404,
                url: request.url("http://h"),
            }),
        );
        assert!(state.steps.is_following_latest());

        let request = schedule.tick(SECOND, state.steps.selected()).unwrap();
        assert_eq!(request.step, None);
        let cleared = SceneSnapshot {
            total_steps: Some(0),
            ..Default::default()
        };
        schedule.finish(&mut state, &mut surface, Ok(cleared));
        assert!(state.groups.is_empty(Category::UpdatedMesh));
        assert_eq!(state.steps.total(), Some(0));
    }

    #[test]
    fn test_other_failures_keep_pinned_step() {
        let mut surface = HeadlessSurface::new();
        let mut state = SceneState::new();
        let mut schedule = PollSchedule::new(SECOND);

        schedule.tick(Duration::ZERO, None).unwrap();
        schedule.finish(&mut state, &mut surface, Ok(mesh_snapshot(6)));
        state.steps.select(2).unwrap();

        schedule.tick(SECOND, state.steps.selected()).unwrap();
        schedule.finish(
            &mut state,
            &mut surface,
            Err(ViewerError::Status {
                status: 500,
                url: "http://h/scene?step=2".into(),
            }),
        );
        schedule.tick(SECOND, state.steps.selected()).unwrap();
        schedule.finish(
            &mut state,
            &mut surface,
            Err(ViewerError::Http("connection refused".into())),
        );
        assert_eq!(state.steps.selected(), Some(2));
    }
}
