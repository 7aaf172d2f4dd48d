use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

/// External abort signal, shared between a run and whoever may cancel it.
///
/// Checked between phases and between round iterations: triggering stops
/// further broadcasts and terminates the run without persisting incomplete
/// aggregates. In-flight participant tasks are not forcibly killed; their
/// results are simply ignored.
#[derive(Debug, Clone, Default)]
pub struct AbortSignal {
    triggered: Arc<AtomicBool>,
}

impl AbortSignal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn trigger(&self) {
        self.triggered.store(true, Ordering::Release);
    }

    pub fn is_triggered(&self) -> bool {
        self.triggered.load(Ordering::Acquire)
    }
}
