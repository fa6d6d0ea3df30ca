// LogSlicer - app/job.rs
//
// Run lifecycle management. Executes the pipeline on a background thread,
// sending progress messages to the caller via an mpsc channel.
//
// Architecture:
//   - `JobManager` lives on the caller's thread; `run_job` runs on a worker.
//   - An `Arc<AtomicBool>` cancel flag lets the caller stop the run
//     cooperatively; the engines check it every progress interval.
//   - All cross-thread communication is via `JobProgress` channel messages.

use crate::app::pipeline::{self, Phase, PipelineObserver, RunOptions, RunReport, RunRequest};
use crate::core::model::ScanObserver;
use crate::util::error::LogSlicerError;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{mpsc, Arc};
use std::time::Duration;

/// Messages sent from the worker thread.
#[derive(Debug)]
pub enum JobProgress {
    Started { input: PathBuf },
    Phase(Phase),
    Lines { lines_read: u64 },
    Finished(Box<RunReport>),
    /// Stopped on request; files written before the stop are listed.
    Cancelled { produced: Vec<PathBuf> },
    Failed { error: String },
}

// =============================================================================
// JobManager
// =============================================================================

/// Manages one pipeline run on a background thread.
pub struct JobManager {
    /// Channel receiver for polling progress messages.
    pub progress_rx: Option<mpsc::Receiver<JobProgress>>,

    /// Cancel flag shared with the background thread.
    cancel_flag: Option<Arc<AtomicBool>>,
}

impl JobManager {
    pub fn new() -> Self {
        Self {
            progress_rx: None,
            cancel_flag: None,
        }
    }

    /// Start a run. If one is already running it is cancelled first.
    pub fn start(&mut self, request: RunRequest, options: RunOptions) {
        self.cancel();

        let (tx, rx) = mpsc::channel();
        let cancel = Arc::new(AtomicBool::new(false));

        self.progress_rx = Some(rx);
        self.cancel_flag = Some(Arc::clone(&cancel));

        std::thread::spawn(move || {
            run_job(request, options, tx, cancel);
        });

        tracing::info!("Job started");
    }

    /// Request cancellation of the running job.
    /// The worker sends `JobProgress::Cancelled` once outputs are closed.
    pub fn cancel(&mut self) {
        if let Some(flag) = &self.cancel_flag {
            flag.store(true, Ordering::SeqCst);
        }
        self.cancel_flag = None;
    }

    /// Shared cancel flag of the running job, for callers outside the
    /// manager's thread such as a signal handler.
    pub fn cancel_handle(&self) -> Option<Arc<AtomicBool>> {
        self.cancel_flag.as_ref().map(Arc::clone)
    }

    /// Wait up to `timeout` for the next message.
    pub fn wait_progress(&self, timeout: Duration) -> Result<JobProgress, mpsc::RecvTimeoutError> {
        match self.progress_rx {
            Some(ref rx) => rx.recv_timeout(timeout),
            None => Err(mpsc::RecvTimeoutError::Disconnected),
        }
    }
}

impl Default for JobManager {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// Background run
// =============================================================================

/// Bridges engine callbacks onto the progress channel.
struct ChannelObserver {
    tx: mpsc::Sender<JobProgress>,
    cancel: Arc<AtomicBool>,
}

impl ScanObserver for ChannelObserver {
    fn on_progress(&mut self, lines_read: u64) {
        // Non-fatal: the receiver may already be gone.
        let _ = self.tx.send(JobProgress::Lines { lines_read });
    }

    fn is_cancelled(&self) -> bool {
        self.cancel.load(Ordering::SeqCst)
    }
}

impl PipelineObserver for ChannelObserver {
    fn on_phase(&mut self, phase: Phase) {
        tracing::debug!(%phase, "Phase started");
        let _ = self.tx.send(JobProgress::Phase(phase));
    }
}

fn run_job(
    request: RunRequest,
    options: RunOptions,
    tx: mpsc::Sender<JobProgress>,
    cancel: Arc<AtomicBool>,
) {
    macro_rules! send {
        ($msg:expr) => {
            if tx.send($msg).is_err() {
                return; // Receiver dropped; exit quietly.
            }
        };
    }

    send!(JobProgress::Started {
        input: request.input.clone(),
    });

    let mut observer = ChannelObserver {
        tx: tx.clone(),
        cancel,
    };

    match pipeline::run(&request, &options, &mut observer) {
        Ok(report) => send!(JobProgress::Finished(Box::new(report))),
        Err(LogSlicerError::Cancelled { produced }) => {
            tracing::info!(produced = produced.len(), "Job cancelled");
            send!(JobProgress::Cancelled { produced });
        }
        Err(e) => {
            tracing::error!(error = %e, "Job failed");
            send!(JobProgress::Failed {
                error: e.to_string(),
            });
        }
    }
}
