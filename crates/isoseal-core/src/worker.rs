//! Run jobs on a dedicated thread and observe them through one ordered
//! event stream.

use std::path::PathBuf;
use std::sync::Arc;
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread::{self, JoinHandle};

use isoseal_digest::CancellationToken;

use crate::{Engine, EngineError, Result, SigningOutcome, SigningRequest};

/// One notification from a running job, in emission order.
#[derive(Debug)]
pub enum JobEvent<T> {
    Log(String),
    Progress(u8),
    /// Always the last event.
    Finished(Result<T>),
}

pub struct JobHandle<T> {
    events: Receiver<JobEvent<T>>,
    cancel: CancellationToken,
    thread: Option<JoinHandle<()>>,
}

impl<T> JobHandle<T> {
    /// Ends after `Finished` has been delivered.
    pub fn events(&self) -> &Receiver<JobEvent<T>> { &self.events }

    /// Ask the job to stop at its next checkpoint.
    pub fn cancel(&self) { self.cancel.cancel(); }

    pub fn cancellation_token(&self) -> &CancellationToken { &self.cancel }

    /// Block until the job finishes, discarding log and progress events.
    pub fn wait(mut self) -> Result<T> {
        let mut finished = None;
        for event in self.events.iter() {
            if let JobEvent::Finished(result) = event {
                finished = Some(result);
            }
        }
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
        finished.unwrap_or_else(|| Err(EngineError::Worker(std::io::Error::other("job ended without a result"))))
    }
}

impl<T> Drop for JobHandle<T> {
    fn drop(&mut self) {
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
    }
}

/// Start `request` on a new thread.
pub fn spawn_signing(engine: Arc<Engine>, request: SigningRequest) -> Result<JobHandle<SigningOutcome>> {
    spawn("isoseal-sign", move |tx, cancel| {
        let log = log_sink(tx.clone());
        let progress_tx = tx.clone();
        let progress = move |percent: u8| {
            let _ = progress_tx.send(JobEvent::Progress(percent));
        };
        engine.execute_signing_process(&request, &log, &progress, cancel)
    })
}

/// Verify `signature` against `image` on a new thread.
pub fn spawn_verification(engine: Arc<Engine>, image: PathBuf, signature: PathBuf) -> Result<JobHandle<bool>> {
    spawn("isoseal-verify", move |tx, _cancel| {
        let log = log_sink(tx.clone());
        engine.verify_iso_signature(&image, &signature, &log)
    })
}

fn log_sink<T: Send>(tx: Sender<JobEvent<T>>) -> impl Fn(&str) + Send + Sync {
    move |line: &str| {
        let _ = tx.send(JobEvent::Log(line.to_string()));
    }
}

fn spawn<T, F>(name: &str, job: F) -> Result<JobHandle<T>>
where
    T: Send + 'static,
    F: FnOnce(&Sender<JobEvent<T>>, &CancellationToken) -> Result<T> + Send + 'static,
{
    let (tx, rx) = mpsc::channel();
    let cancel = CancellationToken::new();
    let token = cancel.clone();

    let thread = thread::Builder::new()
        .name(name.to_string())
        .spawn(move || {
            let result = job(&tx, &token);
            let _ = tx.send(JobEvent::Finished(result));
        })
        .map_err(EngineError::Worker)?;

    Ok(JobHandle {
        events: rx,
        cancel,
        thread: Some(thread),
    })
}
