pub mod data;
pub mod design;
pub mod error;
pub mod frame;
pub mod report;
pub mod site;
pub mod solver;

pub use data::{InMemoryData, LocalData};
pub use error::{DataErr, FrameErr, SolverErr};
pub use frame::{Cell, Frame};
pub use report::{DirectorySink, NullSink, ReportSink};
pub use site::Participant;
pub use solver::ModelSolver;
