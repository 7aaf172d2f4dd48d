use std::{error::Error, fmt, io};

/// Failures loading or validating the shared computation parameters.
///
/// All of these are fatal at load time: a run never starts with malformed
/// parameters.
#[derive(Debug)]
pub enum ParametersErr {
    Io(io::Error),
    Malformed(serde_json::Error),
    EmptyDependents,
    EmptyCovariates,
    /// The ridge variant requires a `Lambda` key.
    MissingLambda,
    /// The regularization strength must be a positive number.
    NonPositiveLambda(f64),
}

impl fmt::Display for ParametersErr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParametersErr::Io(e) => write!(f, "failed to read parameters file: {e}"),
            ParametersErr::Malformed(e) => write!(f, "malformed parameters file: {e}"),
            ParametersErr::EmptyDependents => write!(f, "parameters declare no dependent variables"),
            ParametersErr::EmptyCovariates => write!(f, "parameters declare no covariates"),
            ParametersErr::MissingLambda => write!(f, "ridge variant requires a Lambda parameter"),
            ParametersErr::NonPositiveLambda(l) => {
                write!(f, "Lambda must be positive, got {l}")
            }
        }
    }
}

impl Error for ParametersErr {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            ParametersErr::Io(e) => Some(e),
            ParametersErr::Malformed(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for ParametersErr {
    fn from(e: io::Error) -> Self {
        ParametersErr::Io(e)
    }
}

impl From<serde_json::Error> for ParametersErr {
    fn from(e: serde_json::Error) -> Self {
        ParametersErr::Malformed(e)
    }
}

/// A participant-local task failure.
///
/// None of these cross the coordinator boundary as run failures: the
/// coordinator logs them and treats the participant as "did not contribute"
/// for the current round, leaving the quorum mechanism to decide whether the
/// round can still complete.
#[derive(Debug)]
pub enum TaskErr {
    /// A task name outside the known vocabulary. Fatal to this task only.
    UnknownTask { name: String },
    /// A declared column is absent from the joined local table.
    MissingColumn { column: String },
    /// The local fit (or its input preparation) cannot be solved.
    Computation { detail: String },
    /// Local data could not be loaded or is structurally unusable.
    Data { detail: String },
    /// A report the task is required to persist could not be written.
    Report(io::Error),
}

impl fmt::Display for TaskErr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TaskErr::UnknownTask { name } => write!(f, "unknown task name: {name}"),
            TaskErr::MissingColumn { column } => {
                write!(f, "column {column} is absent from the joined local table")
            }
            TaskErr::Computation { detail } => write!(f, "local computation failed: {detail}"),
            TaskErr::Data { detail } => write!(f, "local data unusable: {detail}"),
            TaskErr::Report(e) => write!(f, "failed to persist report: {e}"),
        }
    }
}

impl Error for TaskErr {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            TaskErr::Report(e) => Some(e),
            _ => None,
        }
    }
}
