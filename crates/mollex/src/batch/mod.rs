//! Fans the pipeline out over a job list.
//!
//! Jobs run on tokio's blocking pool, at most `workers` at a time. Each job
//! writes its own segment images and hands its catalog rows to a single
//! writer task, so rows of one job always land together. A reporter task
//! polls the completed-job counter and logs `<done>/<total>` until the batch
//! is finished; it is awaited before the catalog is flushed.

pub mod progress;

use std::{
    io::Write,
    path::{Path, PathBuf},
    sync::Arc,
    time::Duration,
};

use tokio::{
    sync::{mpsc, Semaphore},
    task::JoinSet,
};
use tracing::{debug, info, warn};

use crate::{
    error::{MollexError, Result},
    io::catalog::{CatalogRow, CatalogWriter, Job},
    pipeline::Pipeline,
};
pub use progress::{report_progress, ProgressCounter};

/// Counts gathered while a batch runs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchSummary {
    pub jobs: usize,
    /// Photographs that could not be opened or decoded.
    pub unreadable: usize,
    /// Jobs that produced no segment.
    pub empty: usize,
    pub segments: usize,
    /// Segments dropped because their image could not be written.
    pub skipped_segments: usize,
    /// Segment images that replaced an existing file of the same name.
    pub overwritten: usize,
}

impl BatchSummary {
    fn record(&mut self, output: &JobOutput) {
        self.jobs += 1;
        if output.unreadable {
            self.unreadable += 1;
        }
        if output.rows.is_empty() {
            self.empty += 1;
        }
        self.segments += output.rows.len();
        self.skipped_segments += output.skipped_segments;
        self.overwritten += output.overwritten;
    }
}

/// Everything one job hands to the catalog writer.
#[derive(Debug, Clone, Default)]
pub struct JobOutput {
    pub rows: Vec<CatalogRow>,
    pub unreadable: bool,
    pub skipped_segments: usize,
    pub overwritten: usize,
}

/// Per-job work: load, run the pipeline, write segment images.
#[derive(Debug)]
pub struct JobRunner {
    pipeline: Arc<Pipeline>,
    input_dir: PathBuf,
    output_dir: PathBuf,
}

impl JobRunner {
    pub fn new(pipeline: Arc<Pipeline>, input_dir: PathBuf, output_dir: PathBuf) -> Self {
        Self {
            pipeline,
            input_dir,
            output_dir,
        }
    }

    pub fn run(&self, job: &Job) -> JobOutput {
        let path = job.photo_path(&self.input_dir);
        let photo = match image::open(&path) {
            Ok(image) => image.to_rgb8(),
            Err(err) => {
                warn!(path = %path.display(), %err, "skipping unreadable photograph");
                return JobOutput {
                    unreadable: true,
                    ..JobOutput::default()
                };
            }
        };

        let segments = self.pipeline.process(&photo, job.stem());
        let mut output = JobOutput::default();
        for segment in &segments {
            let target = self.output_dir.join(segment.file_name());
            if target.exists() {
                warn!(path = %target.display(), image = %job.image, "overwriting existing segment");
                output.overwritten += 1;
            }
            match segment.image.save(&target) {
                Ok(()) => output.rows.push(CatalogRow::new(segment, job)),
                Err(err) => {
                    warn!(path = %target.display(), %err, "failed to write segment");
                    output.skipped_segments += 1;
                }
            }
        }
        debug!(image = %job.image, segments = output.rows.len(), "job finished");
        output
    }
}

/// Runs jobs across a fixed-size worker pool.
#[derive(Debug)]
pub struct BatchDriver {
    runner: Arc<JobRunner>,
    workers: usize,
    progress_interval: Duration,
}

impl BatchDriver {
    pub fn new(pipeline: Pipeline, input_dir: impl AsRef<Path>, output_dir: impl AsRef<Path>) -> Self {
        let runner = JobRunner::new(
            Arc::new(pipeline),
            input_dir.as_ref().to_path_buf(),
            output_dir.as_ref().to_path_buf(),
        );
        Self {
            runner: Arc::new(runner),
            workers: 1,
            progress_interval: Duration::from_millis(500),
        }
    }

    /// Number of jobs processed concurrently (at least one).
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers.max(1);
        self
    }

    pub fn with_progress_interval(mut self, interval: Duration) -> Self {
        self.progress_interval = interval;
        self
    }

    /// Process every job, appending rows to `catalog`.
    ///
    /// Returns the summary and the flushed catalog writer's inner sink.
    pub async fn run<W>(&self, jobs: Vec<Job>, catalog: CatalogWriter<W>) -> Result<(BatchSummary, W)>
    where
        W: Write + Send + 'static,
    {
        let total = jobs.len();
        info!(total, workers = self.workers, "starting batch");

        let counter = ProgressCounter::new();
        let reporter = tokio::spawn(report_progress(counter.clone(), total, self.progress_interval));

        let (tx, rx) = mpsc::channel::<JobOutput>(self.workers * 2);
        let writer = tokio::task::spawn_blocking(move || write_catalog(catalog, rx));

        let permits = Arc::new(Semaphore::new(self.workers));
        let mut tasks = JoinSet::new();
        for job in jobs {
            let permit = Arc::clone(&permits)
                .acquire_owned()
                .await
                .map_err(|_| MollexError::PoolClosed)?;
            let runner = Arc::clone(&self.runner);
            let tx = tx.clone();
            let counter = counter.clone();
            tasks.spawn_blocking(move || {
                let _permit = permit;
                let output = runner.run(&job);
                // A closed channel means the writer failed; its error surfaces when it is joined.
                let _ = tx.blocking_send(output);
                counter.complete_one();
            });
        }
        drop(tx);

        while let Some(joined) = tasks.join_next().await {
            if let Err(err) = joined {
                // A panicked job never completes, so the reporter would wait forever.
                reporter.abort();
                return Err(err.into());
            }
        }
        reporter.await?;

        let (catalog, summary) = writer.await??;
        let sink = catalog.finish()?;
        info!(
            jobs = summary.jobs,
            segments = summary.segments,
            unreadable = summary.unreadable,
            "batch finished"
        );
        Ok((summary, sink))
    }
}

fn write_catalog<W: Write>(
    mut catalog: CatalogWriter<W>,
    mut rx: mpsc::Receiver<JobOutput>,
) -> Result<(CatalogWriter<W>, BatchSummary)> {
    let mut summary = BatchSummary::default();
    while let Some(output) = rx.blocking_recv() {
        catalog.append(&output.rows)?;
        summary.record(&output);
    }
    Ok((catalog, summary))
}
