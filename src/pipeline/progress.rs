//! Step-by-step progress of a batch run

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::constants::PROGRESS_STEPS;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StepStatus {
    Pending,
    Processing,
    Completed,
}

/// One step as reported to clients
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressStep {
    /// 1-based position in the run
    pub step: usize,
    pub label: String,
    pub status: StepStatus,
}

/// Pipeline stages in execution order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Upload,
    Classification,
    ComponentSegmentation,
    RegionSegmentation,
    TextExtraction,
    ColorMapping,
}

impl Stage {
    pub const ALL: [Stage; 6] = [
        Stage::Upload,
        Stage::Classification,
        Stage::ComponentSegmentation,
        Stage::RegionSegmentation,
        Stage::TextExtraction,
        Stage::ColorMapping,
    ];

    fn index(self) -> usize {
        self as usize
    }

    pub fn label(self) -> &'static str {
        PROGRESS_STEPS[self.index()]
    }
}

type Observer = Box<dyn FnMut(&[ProgressStep]) + Send>;

/// Append-only record of progress snapshots.
///
/// Every status change pushes a full snapshot of all steps and hands it to
/// the observer, if one is attached.
pub struct ProgressLog {
    steps: Vec<ProgressStep>,
    history: Vec<Vec<ProgressStep>>,
    observer: Option<Observer>,
}

impl std::fmt::Debug for ProgressLog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProgressLog")
            .field("steps", &self.steps)
            .field("snapshots", &self.history.len())
            .field("observer", &self.observer.is_some())
            .finish()
    }
}

impl Default for ProgressLog {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgressLog {
    pub fn new() -> Self {
        let steps = Stage::ALL
            .iter()
            .map(|stage| ProgressStep {
                step: stage.index() + 1,
                label: stage.label().to_string(),
                status: StepStatus::Pending,
            })
            .collect();

        Self {
            steps,
            history: Vec::new(),
            observer: None,
        }
    }

    /// Call `observer` with every new snapshot
    pub fn with_observer<F>(mut self, observer: F) -> Self
    where
        F: FnMut(&[ProgressStep]) + Send + 'static,
    {
        self.observer = Some(Box::new(observer));
        self
    }

    pub fn start(&mut self, stage: Stage) {
        self.set(stage, StepStatus::Processing);
    }

    pub fn complete(&mut self, stage: Stage) {
        self.set(stage, StepStatus::Completed);
    }

    fn set(&mut self, stage: Stage, status: StepStatus) {
        self.steps[stage.index()].status = status;
        self.history.push(self.steps.clone());
        if let Some(observer) = self.observer.as_mut() {
            observer(&self.steps);
        }
    }

    pub fn status(&self, stage: Stage) -> StepStatus {
        self.steps[stage.index()].status
    }

    pub fn steps(&self) -> &[ProgressStep] {
        &self.steps
    }

    pub fn snapshots(&self) -> &[Vec<ProgressStep>] {
        &self.history
    }

    pub fn is_finished(&self) -> bool {
        self.steps.iter().all(|s| s.status == StepStatus::Completed)
    }

    /// `{"progress": [...]}` event body for streaming clients
    pub fn to_json(&self) -> Value {
        json!({ "progress": self.steps })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    #[test]
    fn test_initial_steps() {
        let log = ProgressLog::new();
        assert_eq!(log.steps().len(), 6);
        assert_eq!(log.steps()[0].label, "Uploading Images to Server");
        assert_eq!(log.steps()[5].step, 6);
        assert!(log.snapshots().is_empty());
        assert!(!log.is_finished());
    }

    #[test]
    fn test_snapshots_are_append_only() {
        let mut log = ProgressLog::new();
        log.start(Stage::Upload);
        log.complete(Stage::Upload);
        log.start(Stage::Classification);

        let snapshots = log.snapshots();
        assert_eq!(snapshots.len(), 3);
        assert_eq!(snapshots[0][0].status, StepStatus::Processing);
        assert_eq!(snapshots[1][0].status, StepStatus::Completed);
        assert_eq!(snapshots[2][1].status, StepStatus::Processing);
        assert_eq!(log.status(Stage::TextExtraction), StepStatus::Pending);
    }

    #[test]
    fn test_observer_sees_each_snapshot() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let mut log = ProgressLog::new().with_observer(move |steps| {
            sink.lock().unwrap().push(steps[1].status);
        });

        log.start(Stage::Classification);
        log.complete(Stage::Classification);

        assert_eq!(
            *seen.lock().unwrap(),
            vec![StepStatus::Processing, StepStatus::Completed]
        );
    }

    #[test]
    fn test_json_event_shape() {
        let mut log = ProgressLog::new();
        log.complete(Stage::Upload);
        let event = log.to_json();
        assert_eq!(event["progress"][0]["status"], "completed");
        assert_eq!(event["progress"][1]["label"], "Classification of Map Legend Type");
        assert_eq!(event["progress"][1]["status"], "pending");
    }
}
