//! Background code generation.
//!
//! The worker thread never sees the live document. Each job carries a
//! serialized [`DocumentSnapshot`] which the thread decodes, verifies and
//! projects to source text. Results come back through a per-job
//! [`GenerationTicket`].

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{mpsc, Arc};
use std::thread::{self, JoinHandle};

use tracing::{debug, warn};

use tessel_codegen::Generator;
use tessel_model::document::Document;
use tessel_model::snapshot::DocumentSnapshot;

use crate::SessionError;

type JobResult = Result<String, SessionError>;

struct Job {
    snapshot: String,
    previous: Option<String>,
    cancelled: Arc<AtomicBool>,
    reply: mpsc::Sender<JobResult>,
}

// ---------------------------------------------------------------------------
// GenerationTicket
// ---------------------------------------------------------------------------

/// Handle to one queued generation.
#[derive(Debug)]
pub struct GenerationTicket {
    rx: mpsc::Receiver<JobResult>,
    cancelled: Arc<AtomicBool>,
    snapshot_hash: String,
}

impl GenerationTicket {
    /// Hash of the state being generated, for matching results to edits.
    pub fn snapshot_hash(&self) -> &str {
        &self.snapshot_hash
    }

    /// Block until the worker answers.
    pub fn wait(self) -> Result<String, SessionError> {
        self.rx.recv().unwrap_or_else(|_| Err(worker_gone()))
    }

    /// Non-blocking poll. `None` while the job is still pending.
    pub fn try_wait(&self) -> Option<Result<String, SessionError>> {
        match self.rx.try_recv() {
            Ok(result) => Some(result),
            Err(mpsc::TryRecvError::Empty) => None,
            Err(mpsc::TryRecvError::Disconnected) => Some(Err(worker_gone())),
        }
    }

    /// Give up on the result. The worker skips the job if it has not
    /// started and drops the output if it has.
    pub fn abandon(self) {
        self.cancelled.store(true, Ordering::Release);
        debug!(snapshot = %self.snapshot_hash, "generation abandoned");
    }
}

fn worker_gone() -> SessionError {
    SessionError::Worker {
        details: "worker stopped before answering".to_owned(),
    }
}

// ---------------------------------------------------------------------------
// GenerationWorker
// ---------------------------------------------------------------------------

/// A single background thread running code generation jobs in order.
pub struct GenerationWorker {
    tx: Option<mpsc::Sender<Job>>,
    handle: Option<JoinHandle<()>>,
}

impl GenerationWorker {
    pub fn spawn(generator: Generator) -> Result<Self, SessionError> {
        let (tx, rx) = mpsc::channel::<Job>();
        let handle = thread::Builder::new()
            .name("tessel-codegen".to_owned())
            .spawn(move || {
                while let Ok(job) = rx.recv() {
                    if job.cancelled.load(Ordering::Acquire) {
                        continue;
                    }
                    let result = run_job(&generator, &job);
                    if job.cancelled.load(Ordering::Acquire) {
                        continue;
                    }
                    // The ticket may have been dropped without abandoning.
                    let _ = job.reply.send(result);
                }
            })
            .map_err(|e| SessionError::Worker {
                details: format!("failed to spawn worker thread: {e}"),
            })?;

        Ok(Self {
            tx: Some(tx),
            handle: Some(handle),
        })
    }

    /// Queue generation of `snapshot`, merging into `previous` text.
    pub fn submit(
        &self,
        snapshot: &DocumentSnapshot,
        previous: Option<String>,
    ) -> Result<GenerationTicket, SessionError> {
        let tx = self.tx.as_ref().ok_or_else(worker_gone)?;
        let encoded = serde_json::to_string(snapshot).map_err(|e| SessionError::Worker {
            details: format!("cannot serialize snapshot: {e}"),
        })?;

        let cancelled = Arc::new(AtomicBool::new(false));
        let (reply, rx) = mpsc::channel();
        tx.send(Job {
            snapshot: encoded,
            previous,
            cancelled: Arc::clone(&cancelled),
            reply,
        })
        .map_err(|_| worker_gone())?;

        debug!(snapshot = %snapshot.hash, "generation queued");
        Ok(GenerationTicket {
            rx,
            cancelled,
            snapshot_hash: snapshot.hash.clone(),
        })
    }
}

impl Drop for GenerationWorker {
    fn drop(&mut self) {
        // Closing the channel ends the thread's loop.
        self.tx.take();
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                warn!("generation worker panicked");
            }
        }
    }
}

fn run_job(generator: &Generator, job: &Job) -> JobResult {
    let snapshot: DocumentSnapshot = serde_json::from_str(&job.snapshot).map_err(|e| SessionError::Worker {
        details: format!("bad snapshot: {e}"),
    })?;
    if !snapshot.verify() {
        return Err(SessionError::Worker {
            details: format!("snapshot {} failed its hash check", snapshot.hash),
        });
    }
    let doc = Document::from_snapshot(&snapshot).map_err(|e| SessionError::Worker {
        details: format!("cannot rebuild snapshot: {e}"),
    })?;
    Ok(generator.generate(&doc, job.previous.as_deref())?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn worker_generates_the_same_text_as_the_caller() {
        let doc = Document::new();
        let worker = GenerationWorker::spawn(Generator::default()).unwrap();
        let ticket = worker.submit(&doc.capture_snapshot(), None).unwrap();
        assert_eq!(ticket.snapshot_hash(), doc.state_hash());
        let text = ticket.wait().unwrap();
        assert_eq!(text, Generator::default().generate(&doc, None).unwrap());
    }

    #[test]
    fn tampered_snapshot_is_rejected() {
        let mut snapshot = Document::new().capture_snapshot();
        snapshot.settings.background_color = "#000000".to_owned();
        let worker = GenerationWorker::spawn(Generator::default()).unwrap();
        let err = worker.submit(&snapshot, None).unwrap().wait().unwrap_err();
        assert!(matches!(err, SessionError::Worker { .. }));
    }

    #[test]
    fn marker_errors_come_back_as_generation_errors() {
        let worker = GenerationWorker::spawn(Generator::default()).unwrap();
        let ticket = worker
            .submit(&Document::new().capture_snapshot(), Some("/*GEN-END*/".to_owned()))
            .unwrap();
        assert!(matches!(ticket.wait(), Err(SessionError::Generation(_))));
    }
}
