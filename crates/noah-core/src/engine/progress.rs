/// Events emitted while training or predicting. Phases nest tasks; a task announces its
/// number of work items and then one increment per finished item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Progress {
    PhaseStart { name: &'static str },
    PhaseFinish,

    TaskStart { total: u64 },
    TaskIncrement,
    TaskFinish,

    Message(String),
}

pub type ProgressCallback<'a> = Box<dyn Fn(Progress) + Send + Sync + 'a>;

/// Forwards progress events to an optional callback. Without one, every event is dropped.
#[derive(Default)]
pub struct ProgressReporter<'a> {
    callback: Option<ProgressCallback<'a>>,
}

impl<'a> ProgressReporter<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_callback(callback: ProgressCallback<'a>) -> Self {
        Self {
            callback: Some(callback),
        }
    }

    #[inline]
    pub fn report(&self, event: Progress) {
        if let Some(cb) = &self.callback {
            cb(event);
        }
    }

    pub fn message(&self, text: impl Into<String>) {
        if self.callback.is_some() {
            self.report(Progress::Message(text.into()));
        }
    }

    /// Runs `op` between `PhaseStart` and `PhaseFinish`. The finish event is reported
    /// even when `op` returns an error.
    pub fn phase<T>(&self, name: &'static str, op: impl FnOnce() -> T) -> T {
        self.report(Progress::PhaseStart { name });
        let result = op();
        self.report(Progress::PhaseFinish);
        result
    }

    /// Runs `op` between `TaskStart { total }` and `TaskFinish`. `op` reports one
    /// `TaskIncrement` per finished item.
    pub fn task<T>(&self, total: usize, op: impl FnOnce() -> T) -> T {
        self.report(Progress::TaskStart {
            total: total as u64,
        });
        let result = op();
        self.report(Progress::TaskFinish);
        result
    }
}
