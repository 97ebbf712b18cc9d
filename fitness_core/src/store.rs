//! The workout store: client-side state shared by every screen.
//!
//! The store owns the last fetched workouts list, the draft workout being
//! assembled, the stats snapshot, today's step count and the request status
//! flags. All remote calls go through it.
//!
//! State lives in a [`tokio::sync::watch`] channel. Every mutation goes
//! through `send_modify`, so subscribers see each change and no lock is ever
//! held across an `.await`.
//!
//! `fetch_workouts` and `fetch_stats` stamp each request with a generation
//! number. A response is applied only if no newer request of the same kind
//! started while it was in flight. Only the newest request decides the
//! outcome: when it fails, an older success that finished meanwhile has
//! already been dropped, so `workouts` keeps its earlier value and `stats`
//! may stay `None`.

use std::sync::atomic::{AtomicU64, Ordering};

use tokio::sync::watch;

use crate::api::{ApiError, DateRange, WorkoutApi};
use crate::types::{Exercise, NewWorkout, Stats, StepLog, Workout};

/// Snapshot of everything the screens render
#[derive(Clone, Debug, Default, PartialEq)]
pub struct StoreState {
    /// Persisted workouts, in server order
    pub workouts: Vec<Workout>,
    /// Draft workout being assembled
    pub current_workout: Vec<Exercise>,
    pub loading: bool,
    pub error: Option<String>,
    /// Last stats snapshot, `None` until the first successful fetch
    pub stats: Option<Stats>,
    pub steps: u64,
}

/// Client state container mediating between the screens and the backend.
pub struct WorkoutStore<A> {
    api: A,
    state: watch::Sender<StoreState>,
    workouts_generation: AtomicU64,
    stats_generation: AtomicU64,
}

impl<A: WorkoutApi> WorkoutStore<A> {
    /// Create a store with an empty draft
    pub fn new(api: A) -> Self {
        Self::with_draft(api, Vec::new())
    }

    /// Create a store whose draft starts with `exercises`
    pub fn with_draft(api: A, exercises: Vec<Exercise>) -> Self {
        let (state, _) = watch::channel(StoreState {
            current_workout: exercises,
            ..StoreState::default()
        });
        Self {
            api,
            state,
            workouts_generation: AtomicU64::new(0),
            stats_generation: AtomicU64::new(0),
        }
    }

    pub fn api(&self) -> &A {
        &self.api
    }

    // ------------------------------------------------------------------
    // Reading
    // ------------------------------------------------------------------

    /// Clone of the full state
    pub fn snapshot(&self) -> StoreState {
        self.state.borrow().clone()
    }

    /// Receiver notified on every state change
    pub fn subscribe(&self) -> watch::Receiver<StoreState> {
        self.state.subscribe()
    }

    pub fn workouts(&self) -> Vec<Workout> {
        self.state.borrow().workouts.clone()
    }

    pub fn current_workout(&self) -> Vec<Exercise> {
        self.state.borrow().current_workout.clone()
    }

    pub fn stats(&self) -> Option<Stats> {
        self.state.borrow().stats.clone()
    }

    pub fn steps(&self) -> u64 {
        self.state.borrow().steps
    }

    pub fn error(&self) -> Option<String> {
        self.state.borrow().error.clone()
    }

    pub fn is_loading(&self) -> bool {
        self.state.borrow().loading
    }

    // ------------------------------------------------------------------
    // Draft workout
    // ------------------------------------------------------------------

    /// Append an exercise to the draft
    pub fn add_exercise(&self, exercise: Exercise) {
        tracing::debug!("Adding {} to draft", exercise.name);
        self.state.send_modify(|s| s.current_workout.push(exercise));
    }

    /// Remove the draft exercise at `index`.
    ///
    /// Out-of-range indices leave the draft unchanged and return `false`.
    pub fn remove_exercise(&self, index: usize) -> bool {
        self.state.send_if_modified(|s| {
            if index < s.current_workout.len() {
                s.current_workout.remove(index);
                true
            } else {
                tracing::debug!(
                    "Ignoring removal of draft exercise {} (draft has {})",
                    index,
                    s.current_workout.len()
                );
                false
            }
        })
    }

    /// Replace the draft exercise at `index`; out-of-range is ignored.
    pub fn update_exercise(&self, index: usize, exercise: Exercise) -> bool {
        self.state.send_if_modified(|s| match s.current_workout.get_mut(index) {
            Some(slot) => {
                *slot = exercise;
                true
            }
            None => false,
        })
    }

    pub fn clear_current_workout(&self) {
        self.state.send_modify(|s| s.current_workout.clear());
    }

    // ------------------------------------------------------------------
    // Remote operations
    // ------------------------------------------------------------------

    /// Replace the workouts list with the server's.
    ///
    /// Failures land in the `error` field; the previous list is kept.
    pub async fn fetch_workouts(&self) {
        self.fetch_workouts_in(None).await
    }

    /// Like [`fetch_workouts`](Self::fetch_workouts), limited to `range` when given
    pub async fn fetch_workouts_in(&self, range: Option<&DateRange>) {
        let generation = self.workouts_generation.fetch_add(1, Ordering::SeqCst) + 1;
        self.begin_request();

        let result = match range {
            Some(range) => self.api.list_workouts_between(range).await,
            None => self.api.list_workouts().await,
        };

        if self.workouts_generation.load(Ordering::SeqCst) != generation {
            tracing::debug!("Discarding stale workouts response (generation {})", generation);
            return;
        }

        match result {
            Ok(workouts) => {
                tracing::debug!("Fetched {} workouts", workouts.len());
                self.state.send_modify(|s| {
                    s.workouts = workouts;
                    s.loading = false;
                });
            }
            Err(e) => {
                tracing::warn!("Failed to fetch workouts: {}", e);
                self.record_failure(&e);
            }
        }
    }

    /// Save the draft as a workout dated `date`.
    ///
    /// The caller is responsible for refusing an empty draft. On success the
    /// draft is cleared and workouts then stats are re-fetched. On failure the
    /// draft is kept, the error is recorded and also returned.
    pub async fn save_workout(
        &self,
        date: &str,
        duration: Option<u32>,
        notes: Option<String>,
    ) -> Result<Workout, ApiError> {
        self.begin_request();

        let body = NewWorkout {
            date: date.to_string(),
            exercises: self.current_workout(),
            duration,
            notes,
        };

        match self.api.create_workout(&body).await {
            Ok(created) => {
                tracing::info!(
                    "Saved workout {} with {} exercises",
                    created.id.as_deref().unwrap_or("<unassigned>"),
                    body.exercises.len()
                );
                self.state.send_modify(|s| {
                    s.current_workout.clear();
                    s.loading = false;
                });
                self.fetch_workouts().await;
                self.fetch_stats().await;
                Ok(created)
            }
            Err(e) => {
                tracing::error!("Failed to save workout: {}", e);
                self.record_failure(&e);
                Err(e)
            }
        }
    }

    /// Delete a persisted workout.
    ///
    /// Failures are recorded in the `error` field and logged, never returned.
    pub async fn delete_workout(&self, id: &str) {
        self.begin_request();

        match self.api.delete_workout(id).await {
            Ok(()) => {
                tracing::info!("Deleted workout {}", id);
                self.state.send_modify(|s| s.loading = false);
                self.fetch_workouts().await;
                self.fetch_stats().await;
            }
            Err(e) => {
                tracing::warn!("Failed to delete workout {}: {}", id, e);
                self.record_failure(&e);
            }
        }
    }

    /// Refresh the stats snapshot. Failures are logged only.
    pub async fn fetch_stats(&self) {
        let generation = self.stats_generation.fetch_add(1, Ordering::SeqCst) + 1;

        let result = self.api.stats_summary().await;

        if self.stats_generation.load(Ordering::SeqCst) != generation {
            tracing::debug!("Discarding stale stats response (generation {})", generation);
            return;
        }

        match result {
            Ok(stats) => self.state.send_modify(|s| s.stats = Some(stats)),
            Err(e) => tracing::error!("Error fetching stats: {}", e),
        }
    }

    /// Set today's step count. Last write wins.
    pub fn update_steps(&self, steps: u64) {
        self.state.send_modify(|s| s.steps = steps);
    }

    /// Submit a day's step count, then refresh stats. Failures are logged only.
    pub async fn save_steps(&self, date: &str, steps: u64) {
        let log = StepLog {
            date: date.to_string(),
            steps,
        };

        match self.api.log_steps(&log).await {
            Ok(()) => {
                tracing::debug!("Submitted {} steps for {}", steps, date);
                self.fetch_stats().await;
            }
            Err(e) => tracing::error!("Error saving steps: {}", e),
        }
    }

    fn begin_request(&self) {
        self.state.send_modify(|s| {
            s.loading = true;
            s.error = None;
        });
    }

    fn record_failure(&self, err: &ApiError) {
        let message = err.to_string();
        self.state.send_modify(|s| {
            s.error = Some(message);
            s.loading = false;
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::MockApi;
    use crate::types::ExerciseSet;
    use tokio::sync::oneshot;

    fn squats() -> Exercise {
        Exercise::new("Squats", "Legs", vec![ExerciseSet::new(10, 50.0)])
    }

    fn bench() -> Exercise {
        Exercise::new(
            "Bench Press",
            "Chest",
            vec![ExerciseSet::new(8, 60.0), ExerciseSet::new(6, 65.0)],
        )
    }

    fn workout(id: &str, date: &str) -> Workout {
        Workout {
            id: Some(id.into()),
            date: date.into(),
            exercises: vec![squats()],
            duration: None,
            notes: None,
            created_at: None,
        }
    }

    #[test]
    fn test_add_exercise_appends_to_draft() {
        let store = WorkoutStore::new(MockApi::default());
        store.add_exercise(squats());
        store.add_exercise(bench());

        let draft = store.current_workout();
        assert_eq!(draft.len(), 2);
        assert_eq!(draft.last(), Some(&bench()));
    }

    #[test]
    fn test_remove_exercise_preserves_order() {
        let deadlift = Exercise::new("Deadlifts", "Back", vec![]);
        let store =
            WorkoutStore::with_draft(MockApi::default(), vec![squats(), bench(), deadlift.clone()]);

        assert!(store.remove_exercise(1));
        assert_eq!(store.current_workout(), vec![squats(), deadlift]);
    }

    #[test]
    fn test_remove_out_of_range_is_ignored() {
        let store = WorkoutStore::with_draft(MockApi::default(), vec![squats(), bench()]);

        assert!(!store.remove_exercise(2));
        assert!(!store.remove_exercise(usize::MAX));
        assert_eq!(store.current_workout(), vec![squats(), bench()]);
    }

    #[test]
    fn test_update_exercise() {
        let store = WorkoutStore::with_draft(MockApi::default(), vec![squats()]);

        assert!(store.update_exercise(0, bench()));
        assert!(!store.update_exercise(5, squats()));
        assert_eq!(store.current_workout(), vec![bench()]);
    }

    #[test]
    fn test_clear_current_workout() {
        let store = WorkoutStore::with_draft(MockApi::default(), vec![squats(), bench()]);
        store.clear_current_workout();
        assert!(store.current_workout().is_empty());

        // Clearing an empty draft is fine too
        store.clear_current_workout();
        assert!(store.current_workout().is_empty());
    }

    #[test]
    fn test_update_steps_last_write_wins() {
        let store = WorkoutStore::new(MockApi::default());
        store.update_steps(1500);
        store.update_steps(1200);
        assert_eq!(store.steps(), 1200);
    }

    #[tokio::test]
    async fn test_fetch_workouts_replaces_list() {
        let api = MockApi::default();
        *api.workouts.lock().unwrap() = vec![workout("b", "2024-01-02"), workout("a", "2024-01-01")];
        let store = WorkoutStore::new(api);

        store.fetch_workouts().await;

        let state = store.snapshot();
        assert_eq!(state.workouts.len(), 2);
        assert_eq!(state.workouts[0].id.as_deref(), Some("b"));
        assert!(!state.loading);
        assert!(state.error.is_none());
    }

    #[tokio::test]
    async fn test_fetch_workouts_failure_keeps_previous_list() {
        let api = MockApi::default();
        *api.workouts.lock().unwrap() = vec![workout("a", "2024-01-01")];
        let store = WorkoutStore::new(api);
        store.fetch_workouts().await;

        store.api().fail("list_workouts");
        store.fetch_workouts().await;

        let state = store.snapshot();
        assert_eq!(state.workouts.len(), 1);
        assert!(!state.loading);
        assert!(state.error.unwrap().contains("connection refused"));
    }

    #[tokio::test]
    async fn test_fetch_workouts_in_range() {
        let api = MockApi::default();
        *api.workouts.lock().unwrap() = vec![
            workout("c", "2024-02-01"),
            workout("b", "2024-01-05"),
            workout("a", "2023-12-31"),
        ];
        let store = WorkoutStore::new(api);

        store
            .fetch_workouts_in(Some(&DateRange::new("2024-01-01", "2024-01-31")))
            .await;

        let state = store.snapshot();
        assert_eq!(state.workouts.len(), 1);
        assert_eq!(state.workouts[0].id.as_deref(), Some("b"));
        assert!(!state.loading);
        assert_eq!(store.api().calls(), vec!["list_workouts_between"]);
    }

    #[tokio::test]
    async fn test_loading_is_set_while_requests_are_in_flight() {
        let api = MockApi::default();
        let (list_tx, list_rx) = oneshot::channel();
        api.list_gates
            .lock()
            .unwrap()
            .push_back((list_rx, vec![workout("a", "2024-01-01")]));
        let (save_tx, save_rx) = oneshot::channel();
        api.gate("create_workout", save_rx);
        let (delete_tx, delete_rx) = oneshot::channel();
        api.gate("delete_workout", delete_rx);

        let store = WorkoutStore::with_draft(api, vec![squats()]);
        let mut rx = store.subscribe();

        tokio::join!(store.fetch_workouts(), async {
            rx.wait_for(|s| s.loading).await.unwrap();
            assert!(store.is_loading());
            let _ = list_tx.send(());
        });
        assert!(!store.is_loading());

        let (saved, ()) = tokio::join!(store.save_workout("2024-01-02", None, None), async {
            rx.wait_for(|s| s.loading).await.unwrap();
            assert_eq!(store.current_workout(), vec![squats()]);
            let _ = save_tx.send(());
        });
        assert!(saved.is_ok());
        assert!(!store.is_loading());

        tokio::join!(store.delete_workout("w1"), async {
            rx.wait_for(|s| s.loading).await.unwrap();
            let _ = delete_tx.send(());
        });
        assert!(!store.is_loading());
        assert!(store.error().is_none());
    }

    #[tokio::test]
    async fn test_save_workout_success() {
        crate::logging::init_test();
        let store = WorkoutStore::with_draft(MockApi::default(), vec![squats()]);

        let created = store
            .save_workout("2024-01-01", Some(30), Some("leg day".into()))
            .await
            .unwrap();
        assert_eq!(created.id.as_deref(), Some("w1"));

        let sent = store.api().created.lock().unwrap()[0].clone();
        assert_eq!(sent.date, "2024-01-01");
        assert_eq!(sent.exercises, vec![squats()]);
        assert_eq!(sent.duration, Some(30));
        assert_eq!(sent.notes.as_deref(), Some("leg day"));

        let state = store.snapshot();
        assert!(state.current_workout.is_empty());
        assert_eq!(state.workouts.len(), 1);
        assert_eq!(state.stats.unwrap().total_workouts, 1);
        assert!(!state.loading);

        assert_eq!(
            store.api().calls(),
            vec!["create_workout", "list_workouts", "stats_summary"]
        );
    }

    #[tokio::test]
    async fn test_save_workout_failure_keeps_draft() {
        let api = MockApi::default();
        api.fail("create_workout");
        let store = WorkoutStore::with_draft(api, vec![squats()]);

        let result = store.save_workout("2024-01-01", None, None).await;
        assert!(result.is_err());

        let state = store.snapshot();
        assert_eq!(state.current_workout, vec![squats()]);
        assert!(state.error.is_some());
        assert!(!state.loading);
        assert_eq!(store.api().calls(), vec!["create_workout"]);
    }

    #[tokio::test]
    async fn test_delete_workout_refetches() {
        let api = MockApi::default();
        *api.workouts.lock().unwrap() = vec![workout("abc123", "2024-01-01")];
        let store = WorkoutStore::new(api);
        store.fetch_workouts().await;

        store.delete_workout("abc123").await;

        let state = store.snapshot();
        assert!(state.workouts.is_empty());
        assert!(state.stats.is_some());
        assert!(store
            .api()
            .calls()
            .contains(&"delete_workout:abc123".to_string()));
    }

    #[tokio::test]
    async fn test_delete_workout_failure_is_swallowed() {
        let api = MockApi::default();
        api.fail("delete_workout");
        let store = WorkoutStore::new(api);

        // Returns normally; the failure only shows up in state
        store.delete_workout("abc123").await;

        let state = store.snapshot();
        assert!(state.error.is_some());
        assert!(!state.loading);
        assert!(!store.api().calls().contains(&"list_workouts".to_string()));
    }

    #[tokio::test]
    async fn test_fetch_stats_failure_is_not_an_error() {
        let api = MockApi::default();
        api.fail("stats_summary");
        let store = WorkoutStore::new(api);

        store.fetch_stats().await;

        let state = store.snapshot();
        assert!(state.stats.is_none());
        assert!(state.error.is_none());
    }

    #[tokio::test]
    async fn test_save_steps_refreshes_stats() {
        let store = WorkoutStore::new(MockApi::default());

        store.save_steps("2024-01-01", 4200).await;

        assert_eq!(store.stats().unwrap().total_steps_today, 4200);
        assert_eq!(store.api().calls(), vec!["log_steps", "stats_summary"]);
    }

    #[tokio::test]
    async fn test_save_steps_failure_is_logged_only() {
        let api = MockApi::default();
        api.fail("log_steps");
        let store = WorkoutStore::new(api);

        store.save_steps("2024-01-01", 4200).await;

        assert!(store.error().is_none());
        assert_eq!(store.api().calls(), vec!["log_steps"]);
    }

    #[tokio::test]
    async fn test_stale_workouts_response_is_discarded() {
        let api = MockApi::default();
        let (old_tx, old_rx) = oneshot::channel();
        let (new_tx, new_rx) = oneshot::channel();
        {
            let mut gates = api.list_gates.lock().unwrap();
            gates.push_back((old_rx, vec![workout("old", "2024-01-01")]));
            gates.push_back((new_rx, vec![workout("new", "2024-01-02")]));
        }
        let store = WorkoutStore::new(api);

        // The newer request resolves first, the older one afterwards
        tokio::join!(store.fetch_workouts(), store.fetch_workouts(), async {
            let _ = new_tx.send(());
            tokio::task::yield_now().await;
            let _ = old_tx.send(());
        });

        let state = store.snapshot();
        assert_eq!(state.workouts.len(), 1);
        assert_eq!(state.workouts[0].id.as_deref(), Some("new"));
        assert!(!state.loading);
    }

    #[tokio::test]
    async fn test_stale_stats_response_is_discarded() {
        let api = MockApi::default();
        let (old_tx, old_rx) = oneshot::channel();
        let (new_tx, new_rx) = oneshot::channel();
        {
            let mut gates = api.stats_gates.lock().unwrap();
            gates.push_back((
                old_rx,
                Stats {
                    total_workouts: 1,
                    ..Stats::default()
                },
            ));
            gates.push_back((
                new_rx,
                Stats {
                    total_workouts: 2,
                    ..Stats::default()
                },
            ));
        }
        let store = WorkoutStore::new(api);

        tokio::join!(store.fetch_stats(), store.fetch_stats(), async {
            let _ = new_tx.send(());
            tokio::task::yield_now().await;
            let _ = old_tx.send(());
        });

        assert_eq!(store.stats().unwrap().total_workouts, 2);
    }

    #[tokio::test]
    async fn test_subscribers_see_changes() {
        let store = WorkoutStore::new(MockApi::default());
        let mut rx = store.subscribe();

        store.add_exercise(squats());
        assert!(rx.has_changed().unwrap());
        assert_eq!(rx.borrow_and_update().current_workout.len(), 1);

        // Ignored removal does not notify
        store.remove_exercise(9);
        assert!(!rx.has_changed().unwrap());
    }
}
