//! Worker pool running one scan job per task
//!
//! Jobs are queued on a crossbeam channel and picked up by scoped worker
//! threads. Each worker runs `scan -> tag_tracks -> update_data` for the jobs
//! it receives. The only shared state is the decode lock (held around
//! decoder setup) and the statistics lock (held while folding a job).

use crate::data::ScanData;
use crate::decode::{DecodeBackend, DecodeLock, SymphoniaBackend};
use crate::job::ScanJob;
use crate::tags::TagWriter;
use crossbeam_channel::{unbounded, Receiver, Sender};
use std::sync::Mutex;
use std::thread;
use tracing::{debug, info, warn};

/// Runs scan jobs on a fixed number of threads
pub struct JobRunner {
    threads: usize,
    backend: Box<dyn DecodeBackend>,
}

impl Default for JobRunner {
    fn default() -> Self {
        Self::new(num_cpus::get())
    }
}

impl JobRunner {
    /// Create a runner decoding through symphonia
    ///
    /// A thread count of zero is treated as one.
    pub fn new(threads: usize) -> Self {
        Self {
            threads: threads.max(1),
            backend: Box::new(SymphoniaBackend::new()),
        }
    }

    /// Replace the decoding backend
    pub fn with_backend(mut self, backend: impl DecodeBackend + 'static) -> Self {
        self.backend = Box::new(backend);
        self
    }

    pub fn threads(&self) -> usize {
        self.threads
    }

    /// Scan, tag and fold every job; returns the jobs in input order
    pub fn run(
        &self,
        jobs: Vec<ScanJob>,
        writer: &dyn TagWriter,
        data: &Mutex<ScanData>,
    ) -> Vec<ScanJob> {
        let total = jobs.len();
        let workers = self.threads.min(total);

        let undecodable = undecodable_tracks(self.backend.as_ref(), &jobs);
        if undecodable > 0 {
            warn!(
                "{} files have a format the decoder cannot read and will be skipped",
                undecodable
            );
        }

        if workers <= 1 {
            debug!("Running {} jobs inline", total);
            return jobs
                .into_iter()
                .map(|mut job| {
                    // A single thread never contends for the decoder
                    process(&mut job, self.backend.as_ref(), writer, None, data);
                    job
                })
                .collect();
        }

        info!("Running {} jobs on {} threads", total, workers);

        let (job_tx, job_rx) = unbounded::<(usize, ScanJob)>();
        let (done_tx, done_rx) = unbounded::<(usize, ScanJob)>();
        for (index, job) in jobs.into_iter().enumerate() {
            // Receiver is alive until the scope below ends
            let _ = job_tx.send((index, job));
        }
        drop(job_tx);

        let decode_lock = DecodeLock::default();
        let backend = self.backend.as_ref();

        thread::scope(|scope| {
            for id in 0..workers {
                let job_rx = job_rx.clone();
                let done_tx = done_tx.clone();
                let decode_lock = &decode_lock;
                scope.spawn(move || {
                    worker(id, &job_rx, &done_tx, backend, writer, decode_lock, data);
                });
            }
        });
        drop(done_tx);

        let mut finished: Vec<(usize, ScanJob)> = done_rx.try_iter().collect();
        finished.sort_by_key(|(index, _)| *index);
        finished.into_iter().map(|(_, job)| job).collect()
    }
}

fn worker(
    id: usize,
    jobs: &Receiver<(usize, ScanJob)>,
    done: &Sender<(usize, ScanJob)>,
    backend: &dyn DecodeBackend,
    writer: &dyn TagWriter,
    decode_lock: &DecodeLock,
    data: &Mutex<ScanData>,
) {
    debug!("Worker {} started", id);

    for (index, mut job) in jobs.iter() {
        process(&mut job, backend, writer, Some(decode_lock), data);
        if done.send((index, job)).is_err() {
            break;
        }
    }

    debug!("Worker {} finished", id);
}

fn undecodable_tracks(backend: &dyn DecodeBackend, jobs: &[ScanJob]) -> usize {
    jobs.iter()
        .flat_map(ScanJob::tracks)
        .filter(|track| !backend.can_decode(track.file_type()))
        .count()
}

fn process(
    job: &mut ScanJob,
    backend: &dyn DecodeBackend,
    writer: &dyn TagWriter,
    decode_lock: Option<&DecodeLock>,
    data: &Mutex<ScanData>,
) {
    if job.scan(backend, decode_lock) {
        job.tag_tracks(writer);
    }
    job.update_data(data);
}
