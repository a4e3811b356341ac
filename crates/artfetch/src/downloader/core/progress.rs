//! Progress tracking and reporting for download runs

use std::sync::Arc;

use super::summary::RunSummary;

/// Progress callback for download runs
pub type ProgressCallback = Arc<dyn Fn(ProgressEvent) + Send + Sync>;

/// Events emitted during a run, in order
#[derive(Debug, Clone)]
pub enum ProgressEvent {
    RunStarted {
        total: usize,
    },
    /// Exactly one per attempted item
    Log {
        line: String,
    },
    /// Emitted after every item except the one that hit the rate limit
    Progress {
        completed: usize,
        total: usize,
    },
    /// Run halted; no further items will be attempted
    RateLimited {
        url: String,
    },
    RunFinished {
        summary: RunSummary,
    },
}

/// Trait for progress reporting with more granular control
pub trait ProgressReporter: Send + Sync {
    fn on_run_started(&self, _total: usize) {}
    fn on_log(&self, _line: &str) {}
    fn on_progress(&self, _completed: usize, _total: usize) {}
    fn on_rate_limited(&self, _url: &str) {}
    fn on_run_finished(&self, _summary: &RunSummary) {}
}

/// Extension trait to convert ProgressReporter to ProgressCallback
pub trait IntoProgressCallback {
    fn into_callback(self) -> ProgressCallback;
}

impl<T: ProgressReporter + 'static> IntoProgressCallback for T {
    fn into_callback(self) -> ProgressCallback {
        Arc::new(move |event| match event {
            ProgressEvent::RunStarted { total } => self.on_run_started(total),
            ProgressEvent::Log { line } => self.on_log(&line),
            ProgressEvent::Progress { completed, total } => self.on_progress(completed, total),
            ProgressEvent::RateLimited { url } => self.on_rate_limited(&url),
            ProgressEvent::RunFinished { summary } => self.on_run_finished(&summary),
        })
    }
}

/// Plain console reporter: log lines on stdout, summary at the end
#[derive(Debug, Default)]
pub struct ConsoleProgressReporter {
    pub verbose: bool,
}

impl ConsoleProgressReporter {
    pub fn new(verbose: bool) -> Self {
        Self { verbose }
    }
}

impl ProgressReporter for ConsoleProgressReporter {
    fn on_run_started(&self, total: usize) {
        if self.verbose {
            println!("0/{}", total);
        }
    }

    fn on_log(&self, line: &str) {
        println!("{}", line);
    }

    fn on_progress(&self, completed: usize, total: usize) {
        if self.verbose {
            println!("{}/{}", completed, total);
        }
    }

    fn on_rate_limited(&self, _url: &str) {
        eprintln!("Rate limit exceeded. Best take a break and try again later.");
    }

    fn on_run_finished(&self, summary: &RunSummary) {
        println!("{}", summary.summary_line());
    }
}

/// Null progress reporter that does nothing
#[derive(Debug, Default)]
pub struct NullProgressReporter;

impl ProgressReporter for NullProgressReporter {}
