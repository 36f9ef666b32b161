//! Bounded-concurrency batch execution.
//!
//! Every job runs the full pipeline on a blocking worker thread. A
//! semaphore caps how many run at once. Whatever happens inside one job
//! (an error, a panic) becomes that job's `Failure` result and nothing
//! else: the batch always yields exactly one result per submitted job, in
//! submission order.

pub mod upload;

pub use upload::validate_upload_constraints;

use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::Serialize;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

use crate::config::{Config, ProcessingConfig};
use crate::error::{PipelineError, UploadError};
use crate::pipeline::PipelineRunner;
use crate::types::ProcessingResult;

/// One submitted unit of work.
#[derive(Debug, Clone)]
pub struct BatchJob {
    /// Name the file arrived under; only used for reporting
    pub file_name: String,
    pub bytes: Vec<u8>,
}

impl BatchJob {
    pub fn new(file_name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            file_name: file_name.into(),
            bytes,
        }
    }
}

/// Hard ceiling on concurrent jobs. Each in-flight job holds full decoded
/// rasters, so this bounds peak memory whatever the config asks for.
pub const MAX_WORKERS: usize = 8;

/// Lifecycle of a job: `Queued`, then `Running` once a worker slot frees
/// up, then `Succeeded` or `Failed`. The last two are final.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
#[repr(u8)]
pub enum JobState {
    Queued = 0,
    Running = 1,
    Succeeded = 2,
    Failed = 3,
}

impl JobState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobState::Succeeded | JobState::Failed)
    }

    /// Whether `self -> next` is an edge of the lifecycle. A job that never
    /// got a worker may fail straight from `Queued`.
    pub fn can_advance_to(&self, next: JobState) -> bool {
        matches!(
            (self, next),
            (JobState::Queued, JobState::Running)
                | (JobState::Queued, JobState::Failed)
                | (JobState::Running, JobState::Succeeded)
                | (JobState::Running, JobState::Failed)
        )
    }

    fn from_u8(value: u8) -> Self {
        match value {
            0 => JobState::Queued,
            1 => JobState::Running,
            2 => JobState::Succeeded,
            _ => JobState::Failed,
        }
    }
}

/// Current state of every job in one run, shared with the worker tasks.
#[derive(Debug)]
pub struct JobBoard {
    states: Vec<AtomicU8>,
}

impl JobBoard {
    /// A board with `len` jobs, all `Queued`.
    pub fn new(len: usize) -> Self {
        Self {
            states: (0..len).map(|_| AtomicU8::new(JobState::Queued as u8)).collect(),
        }
    }

    pub fn state(&self, index: usize) -> Option<JobState> {
        self.states
            .get(index)
            .map(|s| JobState::from_u8(s.load(Ordering::Acquire)))
    }

    /// Move job `index` to `next`. Returns the state the job ends up in:
    /// `next` on a legal transition, otherwise the unchanged current state.
    pub fn advance(&self, index: usize, next: JobState) -> Option<JobState> {
        let slot = self.states.get(index)?;
        let mut current = slot.load(Ordering::Acquire);
        loop {
            if !JobState::from_u8(current).can_advance_to(next) {
                return Some(JobState::from_u8(current));
            }
            match slot.compare_exchange(current, next as u8, Ordering::AcqRel, Ordering::Acquire) {
                Ok(_) => return Some(next),
                Err(actual) => current = actual,
            }
        }
    }

    /// Number of jobs currently in `state`.
    pub fn count(&self, state: JobState) -> usize {
        self.states
            .iter()
            .filter(|s| JobState::from_u8(s.load(Ordering::Acquire)) == state)
            .count()
    }
}

/// The terminal record for one job.
#[derive(Debug, Clone, Serialize)]
pub struct JobOutcome {
    /// Position of the job in the submitted list
    pub index: usize,
    pub file_name: String,
    /// Size of the submitted bytes
    pub original_size: u64,
    pub state: JobState,
    #[serde(flatten)]
    pub result: ProcessingResult,
}

impl JobOutcome {
    fn new(index: usize, file_name: String, original_size: u64, result: ProcessingResult) -> Self {
        let state = if result.is_success() {
            JobState::Succeeded
        } else {
            JobState::Failed
        };
        Self {
            index,
            file_name,
            original_size,
            state,
            result,
        }
    }

    /// Encoded size for a success, 0 for a failure.
    pub fn processed_size(&self) -> u64 {
        match &self.result {
            ProcessingResult::Success(processed) => processed.byte_size,
            ProcessingResult::Failure(_) => 0,
        }
    }
}

/// Results of a whole batch, in submission order.
#[derive(Debug, Clone, Serialize)]
pub struct BatchReport {
    pub outcomes: Vec<JobOutcome>,
    /// Bytes submitted across all jobs
    pub total_original_bytes: u64,
    /// Bytes produced by successful jobs
    pub total_processed_bytes: u64,
    pub workers: usize,
    #[serde(with = "duration_ms")]
    pub elapsed: Duration,
}

impl BatchReport {
    pub fn succeeded(&self) -> usize {
        self.outcomes.iter().filter(|o| o.result.is_success()).count()
    }

    pub fn failed(&self) -> usize {
        self.outcomes.len() - self.succeeded()
    }

    /// Percentage of bytes saved, `(1 - processed / original) * 100`. Zero
    /// when nothing was submitted. Negative when the output grew.
    pub fn savings_percent(&self) -> f64 {
        if self.total_original_bytes == 0 {
            return 0.0;
        }
        (1.0 - self.total_processed_bytes as f64 / self.total_original_bytes as f64) * 100.0
    }
}

mod duration_ms {
    use serde::Serializer;
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_millis() as u64)
    }
}

/// Runs a [`PipelineRunner`] over many jobs with a bounded pool.
#[derive(Clone)]
pub struct BatchExecutor {
    runner: Arc<PipelineRunner>,
    max_workers: usize,
}

impl BatchExecutor {
    pub fn new(config: &Config) -> Self {
        Self::with_runner(PipelineRunner::new(config), config.batch.max_workers)
    }

    pub fn with_runner(runner: PipelineRunner, max_workers: usize) -> Self {
        Self {
            runner: Arc::new(runner),
            max_workers,
        }
    }

    pub fn runner(&self) -> &PipelineRunner {
        &self.runner
    }

    /// Pool size for `job_count` jobs: the smallest of [`MAX_WORKERS`], the
    /// configured cap, the hardware parallelism and the job count, and at
    /// least 1.
    pub fn pool_size(&self, job_count: usize) -> usize {
        let hardware = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1);
        Self::bounded_pool_size(self.max_workers, hardware, job_count)
    }

    fn bounded_pool_size(max_workers: usize, hardware: usize, job_count: usize) -> usize {
        MAX_WORKERS
            .min(max_workers)
            .min(hardware)
            .min(job_count)
            .max(1)
    }

    /// Run every job and collect one result per job.
    pub async fn run(
        &self,
        jobs: Vec<BatchJob>,
        config: Arc<ProcessingConfig>,
    ) -> Result<BatchReport, UploadError> {
        self.run_with_progress(jobs, config, |_| {}).await
    }

    /// Like [`run`](Self::run), calling `on_complete` once per job as it
    /// reaches a terminal state, in completion order.
    ///
    /// Upload limits are checked first; a violation rejects the whole batch
    /// before any job starts.
    pub async fn run_with_progress<F>(
        &self,
        jobs: Vec<BatchJob>,
        config: Arc<ProcessingConfig>,
        on_complete: F,
    ) -> Result<BatchReport, UploadError>
    where
        F: Fn(&JobOutcome) + Send + Sync,
    {
        let sizes: Vec<u64> = jobs.iter().map(|j| j.bytes.len() as u64).collect();
        validate_upload_constraints(&sizes, self.runner.gate().limits())?;

        let start = Instant::now();
        let workers = self.pool_size(jobs.len());
        let semaphore = Arc::new(Semaphore::new(workers));
        let names: Vec<String> = jobs.iter().map(|j| j.file_name.clone()).collect();
        let mut slots: Vec<Option<JobOutcome>> = vec![None; jobs.len()];
        let board = Arc::new(JobBoard::new(jobs.len()));

        tracing::debug!("Running {} jobs on {} workers", jobs.len(), workers);

        let mut set = JoinSet::new();
        for (index, job) in jobs.into_iter().enumerate() {
            let semaphore = semaphore.clone();
            let runner = self.runner.clone();
            let config = config.clone();
            let board = board.clone();

            set.spawn(async move {
                let BatchJob { file_name, bytes } = job;
                let original_size = bytes.len() as u64;

                let Ok(_permit) = semaphore.acquire_owned().await else {
                    let err = PipelineError::Unknown("worker pool closed".to_string());
                    let outcome =
                        JobOutcome::new(index, file_name, original_size, ProcessingResult::failure(err));
                    board.advance(index, outcome.state);
                    return outcome;
                };

                let job_start = Instant::now();
                board.advance(index, JobState::Running);
                tracing::debug!("Job {index} ({file_name}) running");
                let joined =
                    tokio::task::spawn_blocking(move || runner.process(&bytes, &config)).await;
                let result = match joined {
                    Ok(result) => ProcessingResult::from(result),
                    Err(e) => ProcessingResult::failure(PipelineError::Unknown(format!(
                        "worker panicked: {e}"
                    ))),
                };
                tracing::debug!("Job {index} ({file_name}) finished in {:?}", job_start.elapsed());

                let outcome = JobOutcome::new(index, file_name, original_size, result);
                board.advance(index, outcome.state);
                outcome
            });
        }

        while let Some(joined) = set.join_next().await {
            match joined {
                Ok(outcome) => {
                    let index = outcome.index;
                    if let ProcessingResult::Failure(failure) = &outcome.result {
                        tracing::error!(
                            "Failed to process {} ({} bytes, target {}): {}",
                            outcome.file_name,
                            outcome.original_size,
                            config.output_format,
                            failure.message
                        );
                    }
                    on_complete(&outcome);
                    slots[index] = Some(outcome);
                }
                Err(e) => tracing::error!("Batch task failed: {e}"),
            }
        }

        // A slot is only empty if its task died outside the job boundary
        let outcomes: Vec<JobOutcome> = slots
            .into_iter()
            .zip(names)
            .zip(sizes.iter().copied())
            .enumerate()
            .map(|(index, ((slot, name), size))| {
                slot.unwrap_or_else(|| {
                    let err = PipelineError::Unknown("job did not report a result".to_string());
                    board.advance(index, JobState::Failed);
                    JobOutcome::new(index, name, size, ProcessingResult::failure(err))
                })
            })
            .collect();

        debug_assert_eq!(
            board.count(JobState::Succeeded) + board.count(JobState::Failed),
            outcomes.len()
        );

        let total_original_bytes = sizes.iter().sum();
        let total_processed_bytes = outcomes.iter().map(JobOutcome::processed_size).sum();

        Ok(BatchReport {
            outcomes,
            total_original_bytes,
            total_processed_bytes,
            workers,
            elapsed: start.elapsed(),
        })
    }
}
