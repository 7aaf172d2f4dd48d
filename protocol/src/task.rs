use serde::{Deserialize, Serialize};

use crate::{
    error::TaskErr,
    parameters::ComputationParameters,
    report::{GlobalModel, RegressionReport, ValidationReport},
};

/// The closed task vocabulary.
///
/// Wire names are carried in the `task` tag and match the fixed protocol
/// names (`perform_regression`, `train_local_model`, ...). Dispatch is an
/// exhaustive match, so adding a task is a compile-time visible change.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "task", content = "data", rename_all = "snake_case")]
pub enum TaskPayload {
    PerformRunInputValidation,
    PerformRegression,
    SaveGlobalValidationReport(ValidationReport),
    SaveGlobalRegressionResults(RegressionReport),
    TrainLocalModel,
    SetGlobalModel(GlobalModel),
}

impl TaskPayload {
    /// The task's wire name.
    pub fn name(&self) -> &'static str {
        match self {
            TaskPayload::PerformRunInputValidation => "perform_run_input_validation",
            TaskPayload::PerformRegression => "perform_regression",
            TaskPayload::SaveGlobalValidationReport(_) => "save_global_validation_report",
            TaskPayload::SaveGlobalRegressionResults(_) => "save_global_regression_results",
            TaskPayload::TrainLocalModel => "train_local_model",
            TaskPayload::SetGlobalModel(_) => "set_global_model",
        }
    }

    /// Reconstructs a payload from a raw wire name and JSON data.
    ///
    /// This is the entry point for messaging layers that deliver tasks as
    /// name/payload pairs rather than typed values.
    ///
    /// # Errors
    /// `TaskErr::UnknownTask` for a name outside the vocabulary — fatal to
    /// this task at the receiving participant, and nothing else.
    pub fn from_wire(name: &str, data: serde_json::Value) -> Result<Self, TaskErr> {
        let tagged = serde_json::json!({ "task": name, "data": data });
        serde_json::from_value(tagged).map_err(|_| TaskErr::UnknownTask {
            name: name.to_owned(),
        })
    }
}

/// One unit of work broadcast to all participants.
///
/// The round is present only in the iterative variant; participants receive
/// it as context and never mutate it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskRequest {
    pub round: Option<usize>,
    pub parameters: ComputationParameters,
    pub payload: TaskPayload,
}

impl TaskRequest {
    /// A single-round (one-shot) task.
    pub fn one_shot(parameters: ComputationParameters, payload: TaskPayload) -> Self {
        Self {
            round: None,
            parameters,
            payload,
        }
    }

    /// A task scoped to one iteration of the iterative variant.
    pub fn for_round(round: usize, parameters: ComputationParameters, payload: TaskPayload) -> Self {
        Self {
            round: Some(round),
            parameters,
            payload,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wire_names_are_stable() {
        assert_eq!(
            TaskPayload::PerformRunInputValidation.name(),
            "perform_run_input_validation"
        );
        assert_eq!(TaskPayload::PerformRegression.name(), "perform_regression");
        assert_eq!(TaskPayload::TrainLocalModel.name(), "train_local_model");
    }

    #[test]
    fn serialized_tag_matches_wire_name() {
        let payload = TaskPayload::TrainLocalModel;
        let value = serde_json::to_value(&payload).unwrap();
        assert_eq!(value["task"], payload.name());
    }

    #[test]
    fn unknown_wire_name_is_rejected() {
        let err = TaskPayload::from_wire("perform_clustering", serde_json::Value::Null);
        assert!(matches!(err, Err(TaskErr::UnknownTask { name }) if name == "perform_clustering"));
    }

    #[test]
    fn known_wire_name_round_trips() {
        let payload = TaskPayload::from_wire("perform_regression", serde_json::Value::Null).unwrap();
        assert_eq!(payload, TaskPayload::PerformRegression);
    }
}
