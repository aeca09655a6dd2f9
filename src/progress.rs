use std::fmt;

/// Two-level progress report passed to the caller's progress callback.
///
/// The outer report names the current phase; `inner` optionally describes
/// the step inside that phase (current collector, current entry, ...).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListProgress {
    pub current: usize,
    /// `None` when the number of steps is not known in advance
    pub total: Option<usize>,
    pub message: String,
    pub inner: Option<Box<ListProgress>>,
}

impl ListProgress {
    pub fn new(current: usize, total: Option<usize>, message: impl Into<String>) -> Self {
        Self {
            current,
            total,
            message: message.into(),
            inner: None,
        }
    }

    pub fn with_inner(mut self, inner: ListProgress) -> Self {
        self.inner = Some(Box::new(inner));
        self
    }
}

impl fmt::Display for ListProgress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.total {
            Some(total) => write!(f, "[{}/{}] {}", self.current, total, self.message)?,
            None => write!(f, "[{}] {}", self.current, self.message)?,
        }
        if let Some(inner) = &self.inner {
            write!(f, " > {}", inner)?;
        }
        Ok(())
    }
}

pub type ProgressCallback<'a> = dyn FnMut(&ListProgress) + 'a;

/// Outer phase report that re-emits itself whenever its inner step changes.
pub(crate) struct PhaseReporter<'p, 'a> {
    phase: ListProgress,
    sink: &'p mut ProgressCallback<'a>,
}

impl<'p, 'a> PhaseReporter<'p, 'a> {
    pub(crate) fn start(
        sink: &'p mut ProgressCallback<'a>,
        step: usize,
        total: usize,
        message: &str,
    ) -> Self {
        let phase = ListProgress::new(step, Some(total), message);
        sink(&phase);
        Self { phase, sink }
    }

    pub(crate) fn inner(&mut self, inner: ListProgress) {
        self.phase.inner = Some(Box::new(inner));
        (self.sink)(&self.phase);
    }
}
