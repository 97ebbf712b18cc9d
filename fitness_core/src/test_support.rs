//! In-memory [`WorkoutApi`] used by unit tests.

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;
use tokio::sync::oneshot;

use crate::api::{ApiError, DateRange, WorkoutApi};
use crate::types::{ExerciseTemplate, NewWorkout, Stats, StepLog, Workout};

/// In-memory backend recording every call
#[derive(Default)]
pub(crate) struct MockApi {
    pub(crate) workouts: Mutex<Vec<Workout>>,
    pub(crate) stats: Mutex<Stats>,
    pub(crate) calls: Mutex<Vec<String>>,
    pub(crate) created: Mutex<Vec<NewWorkout>>,
    pub(crate) steps: Mutex<Vec<StepLog>>,
    pub(crate) failing: Mutex<Vec<&'static str>>,
    /// Pending gates for `list_workouts`; each call takes the next one
    pub(crate) list_gates: Mutex<VecDeque<(oneshot::Receiver<()>, Vec<Workout>)>>,
    pub(crate) stats_gates: Mutex<VecDeque<(oneshot::Receiver<()>, Stats)>>,
    /// Gates for `create_workout` and `delete_workout`, keyed by call name
    pub(crate) call_gates: Mutex<Vec<(&'static str, oneshot::Receiver<()>)>>,
}

impl MockApi {
    pub(crate) fn fail(&self, op: &'static str) {
        self.failing.lock().unwrap().push(op);
    }

    fn check(&self, op: &'static str) -> Result<(), ApiError> {
        self.calls.lock().unwrap().push(op.to_string());
        if self.failing.lock().unwrap().contains(&op) {
            Err(ApiError::Transport("connection refused".into()))
        } else {
            Ok(())
        }
    }

    pub(crate) fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    /// Hold the next `op` call until `gate` fires
    pub(crate) fn gate(&self, op: &'static str, gate: oneshot::Receiver<()>) {
        self.call_gates.lock().unwrap().push((op, gate));
    }

    async fn pass_gate(&self, op: &'static str) {
        let gate = {
            let mut gates = self.call_gates.lock().unwrap();
            gates
                .iter()
                .position(|(name, _)| *name == op)
                .map(|i| gates.remove(i).1)
        };
        if let Some(rx) = gate {
            let _ = rx.await;
        }
    }
}

#[async_trait]
impl WorkoutApi for MockApi {
    async fn list_workouts(&self) -> Result<Vec<Workout>, ApiError> {
        self.check("list_workouts")?;
        let gate = self.list_gates.lock().unwrap().pop_front();
        if let Some((rx, workouts)) = gate {
            let _ = rx.await;
            return Ok(workouts);
        }
        Ok(self.workouts.lock().unwrap().clone())
    }

    async fn list_workouts_between(&self, range: &DateRange) -> Result<Vec<Workout>, ApiError> {
        self.check("list_workouts_between")?;
        Ok(self
            .workouts
            .lock()
            .unwrap()
            .iter()
            .filter(|w| w.date >= range.start && w.date <= range.end)
            .cloned()
            .collect())
    }

    async fn get_workout(&self, id: &str) -> Result<Workout, ApiError> {
        self.check("get_workout")?;
        self.workouts
            .lock()
            .unwrap()
            .iter()
            .find(|w| w.id.as_deref() == Some(id))
            .cloned()
            .ok_or(ApiError::Status {
                status: 404,
                message: "Workout not found".into(),
            })
    }

    async fn create_workout(&self, workout: &NewWorkout) -> Result<Workout, ApiError> {
        self.check("create_workout")?;
        self.pass_gate("create_workout").await;
        self.created.lock().unwrap().push(workout.clone());
        let mut workouts = self.workouts.lock().unwrap();
        let created = Workout {
            id: Some(format!("w{}", workouts.len() + 1)),
            date: workout.date.clone(),
            exercises: workout.exercises.clone(),
            duration: workout.duration,
            notes: workout.notes.clone(),
            created_at: Some("2024-01-01T12:00:00".into()),
        };
        workouts.insert(0, created.clone());
        self.stats.lock().unwrap().total_workouts += 1;
        Ok(created)
    }

    async fn delete_workout(&self, id: &str) -> Result<(), ApiError> {
        self.calls.lock().unwrap().push(format!("delete_workout:{}", id));
        self.check("delete_workout")?;
        self.pass_gate("delete_workout").await;
        self.workouts
            .lock()
            .unwrap()
            .retain(|w| w.id.as_deref() != Some(id));
        Ok(())
    }

    async fn stats_summary(&self) -> Result<Stats, ApiError> {
        self.check("stats_summary")?;
        let gate = self.stats_gates.lock().unwrap().pop_front();
        if let Some((rx, stats)) = gate {
            let _ = rx.await;
            return Ok(stats);
        }
        Ok(self.stats.lock().unwrap().clone())
    }

    async fn log_steps(&self, log: &StepLog) -> Result<(), ApiError> {
        self.check("log_steps")?;
        self.steps.lock().unwrap().push(log.clone());
        self.stats.lock().unwrap().total_steps_today = log.steps;
        Ok(())
    }

    async fn list_steps(&self, _range: Option<&DateRange>) -> Result<Vec<StepLog>, ApiError> {
        self.check("list_steps")?;
        Ok(self.steps.lock().unwrap().clone())
    }

    async fn list_exercises(&self) -> Result<Vec<ExerciseTemplate>, ApiError> {
        self.check("list_exercises")?;
        Ok(Vec::new())
    }
}

