use std::{error::Error, fmt, io};

use protocol::TaskErr;

/// Failures manipulating local tabular data.
#[derive(Debug)]
pub enum FrameErr {
    /// A referenced column does not exist in the frame.
    MissingColumn(String),
    /// Two joined frames share a non-key column name.
    DuplicateColumn(String),
    /// Column lengths within one frame disagree.
    RaggedColumn { column: String, got: usize, expected: usize },
    /// Positional alignment requires equal row counts.
    RowCountMismatch { left: usize, right: usize },
    /// No rows survive complete-case filtering.
    NoCompleteRows,
}

impl fmt::Display for FrameErr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FrameErr::MissingColumn(name) => write!(f, "no column named {name}"),
            FrameErr::DuplicateColumn(name) => {
                write!(f, "column {name} exists in both joined frames")
            }
            FrameErr::RaggedColumn { column, got, expected } => {
                write!(f, "column {column} has {got} rows, frame has {expected}")
            }
            FrameErr::RowCountMismatch { left, right } => {
                write!(f, "cannot align frames positionally: {left} rows vs {right} rows")
            }
            FrameErr::NoCompleteRows => {
                write!(f, "no rows remain after dropping incomplete cases")
            }
        }
    }
}

impl Error for FrameErr {}

impl From<FrameErr> for TaskErr {
    fn from(e: FrameErr) -> Self {
        match e {
            FrameErr::MissingColumn(column) => TaskErr::MissingColumn { column },
            other => TaskErr::Computation {
                detail: other.to_string(),
            },
        }
    }
}

/// Failures loading local data through a `LocalData` collaborator.
#[derive(Debug)]
pub enum DataErr {
    Io(io::Error),
    Malformed(String),
}

impl fmt::Display for DataErr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataErr::Io(e) => write!(f, "failed to load local data: {e}"),
            DataErr::Malformed(detail) => write!(f, "local data malformed: {detail}"),
        }
    }
}

impl Error for DataErr {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            DataErr::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for DataErr {
    fn from(e: io::Error) -> Self {
        DataErr::Io(e)
    }
}

impl From<DataErr> for TaskErr {
    fn from(e: DataErr) -> Self {
        TaskErr::Data {
            detail: e.to_string(),
        }
    }
}

/// Failures inside the black-box numeric solver.
#[derive(Debug)]
pub enum SolverErr {
    /// The design matrix is singular (or otherwise rank deficient).
    Singular,
    ShapeMismatch {
        what: &'static str,
        got: usize,
        expected: usize,
    },
    Numeric(String),
}

impl fmt::Display for SolverErr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SolverErr::Singular => write!(f, "design matrix is singular"),
            SolverErr::ShapeMismatch { what, got, expected } => {
                write!(f, "shape mismatch for {what}: got {got}, expected {expected}")
            }
            SolverErr::Numeric(detail) => write!(f, "numeric failure: {detail}"),
        }
    }
}

impl Error for SolverErr {}

impl From<SolverErr> for TaskErr {
    fn from(e: SolverErr) -> Self {
        TaskErr::Computation {
            detail: e.to_string(),
        }
    }
}
