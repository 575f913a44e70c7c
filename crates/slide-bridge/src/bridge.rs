//! Persistence bridge: the save queue between the control panel and a writer.
//!
//! A single worker task owns the writer and commits requests one at a time,
//! so two saves never race on the same file. While a write is in flight new
//! requests queue up; a queued request for a target that is already waiting
//! replaces it in place (latest wins), and only the replacement is written.
//!
//! Every committed or failed write produces exactly one [`SaveOutcome`] on
//! the outcome channel.

use crate::error::BridgeError;
use crate::writer::SlideWriter;
use slide_core::{SaveOutcome, SaveRequest};
use slide_editor::SaveSink;
use std::collections::VecDeque;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::task::JoinHandle;

/// Cloneable submit side of a running bridge.
#[derive(Debug, Clone)]
pub struct BridgeHandle {
    tx: UnboundedSender<SaveRequest>,
}

impl BridgeHandle {
    /// Queue a save.
    ///
    /// # Errors
    /// [`BridgeError::Closed`] if the worker has stopped.
    pub fn enqueue(&self, request: SaveRequest) -> Result<(), BridgeError> {
        self.tx.send(request).map_err(|_| BridgeError::Closed)
    }
}

impl SaveSink for BridgeHandle {
    fn submit(&self, request: SaveRequest) {
        let target = request.target.clone();
        if let Err(e) = self.enqueue(request) {
            log::error!("save of {target} dropped: {e}");
        }
    }
}

/// A running bridge worker.
pub struct PersistenceBridge {
    pub handle: BridgeHandle,
    pub outcomes: UnboundedReceiver<SaveOutcome>,
    pub task: JoinHandle<()>,
}

impl PersistenceBridge {
    /// Start the worker on the current tokio runtime. It runs until every
    /// [`BridgeHandle`] is dropped and the queue is empty.
    pub fn spawn<W: SlideWriter>(writer: W) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let (outcome_tx, outcomes) = mpsc::unbounded_channel();
        let task = tokio::spawn(run(writer, rx, outcome_tx));
        Self {
            handle: BridgeHandle { tx },
            outcomes,
            task,
        }
    }
}

async fn run<W: SlideWriter>(
    writer: W,
    mut requests: UnboundedReceiver<SaveRequest>,
    outcomes: UnboundedSender<SaveOutcome>,
) {
    let mut pending: VecDeque<SaveRequest> = VecDeque::new();
    loop {
        if pending.is_empty() {
            match requests.recv().await {
                Some(request) => pending.push_back(request),
                None => break,
            }
        }
        while let Ok(request) = requests.try_recv() {
            coalesce(&mut pending, request);
        }
        let Some(request) = pending.pop_front() else {
            continue;
        };

        let outcome = match writer.write(&request).await {
            Ok(bytes) => {
                log::info!("saved {} ({bytes} bytes)", request.target);
                SaveOutcome::Saved {
                    target: request.target,
                    bytes,
                }
            }
            Err(e) => {
                log::error!("save of {} failed: {e}", request.target);
                SaveOutcome::Failed {
                    target: request.target,
                    reason: e.to_string(),
                }
            }
        };
        if outcomes.send(outcome).is_err() {
            log::debug!("bridge: outcome receiver dropped");
        }
    }
    log::debug!("bridge: worker stopped");
}

/// Queue `request`, replacing a waiting request for the same target.
fn coalesce(pending: &mut VecDeque<SaveRequest>, request: SaveRequest) {
    match pending.iter_mut().find(|p| p.target == request.target) {
        Some(waiting) => {
            log::debug!("bridge: coalesced save of {}", request.target);
            *waiting = request;
        }
        None => pending.push_back(request),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::writer::FsWriter;
    use pretty_assertions::assert_eq;
    use slide_core::Slide;
    use std::sync::{Arc, Mutex};

    /// Records `(target, slide id)` for every write.
    #[derive(Clone, Default)]
    struct Recorder {
        writes: Arc<Mutex<Vec<(String, Option<String>)>>>,
    }

    impl SlideWriter for Recorder {
        async fn write(&self, request: &SaveRequest) -> Result<usize, BridgeError> {
            self.writes
                .lock()
                .unwrap()
                .push((request.target.clone(), request.slide.id.clone()));
            Ok(1)
        }
    }

    fn request(target: &str, version: &str) -> SaveRequest {
        let mut slide = Slide::new();
        slide.id = Some(version.to_string());
        SaveRequest {
            target: target.to_string(),
            slide,
        }
    }

    #[test]
    fn coalesce_keeps_position_and_takes_latest() {
        let mut pending = VecDeque::new();
        coalesce(&mut pending, request("a", "1"));
        coalesce(&mut pending, request("b", "1"));
        coalesce(&mut pending, request("a", "2"));
        let order: Vec<_> = pending
            .iter()
            .map(|r| (r.target.as_str(), r.slide.id.as_deref()))
            .collect();
        assert_eq!(order, vec![("a", Some("2")), ("b", Some("1"))]);
    }

    #[tokio::test]
    async fn queued_saves_are_serialized_and_coalesced() {
        let recorder = Recorder::default();
        let mut bridge = PersistenceBridge::spawn(recorder.clone());

        // Nothing runs until we await, so all four are queued together.
        for (target, version) in [("a", "1"), ("b", "1"), ("a", "2"), ("a", "3")] {
            bridge.handle.enqueue(request(target, version)).unwrap();
        }
        drop(bridge.handle);

        let mut outcomes = Vec::new();
        while let Some(outcome) = bridge.outcomes.recv().await {
            outcomes.push(outcome);
        }
        bridge.task.await.unwrap();

        assert_eq!(
            *recorder.writes.lock().unwrap(),
            vec![("a".to_string(), Some("3".to_string())), ("b".to_string(), Some("1".to_string()))]
        );
        assert_eq!(
            outcomes,
            vec![
                SaveOutcome::Saved { target: "a".into(), bytes: 1 },
                SaveOutcome::Saved { target: "b".into(), bytes: 1 },
            ]
        );
    }

    #[tokio::test]
    async fn failed_write_reports_reason() {
        let dir = tempfile::tempdir().unwrap();
        let mut bridge = PersistenceBridge::spawn(FsWriter::new(dir.path()));
        bridge.handle.submit(request("../outside.json", "1"));

        let outcome = bridge.outcomes.recv().await.unwrap();
        assert!(!outcome.is_saved());
        assert_eq!(outcome.target(), "../outside.json");
    }

    #[tokio::test]
    async fn successful_write_reports_bytes() {
        let dir = tempfile::tempdir().unwrap();
        let mut bridge = PersistenceBridge::spawn(FsWriter::new(dir.path()));
        bridge.handle.submit(request("slides/a.json", "1"));

        match bridge.outcomes.recv().await.unwrap() {
            SaveOutcome::Saved { target, bytes } => {
                assert_eq!(target, "slides/a.json");
                let len = std::fs::metadata(dir.path().join("slides/a.json")).unwrap().len();
                assert_eq!(bytes as u64, len);
            }
            other => panic!("unexpected outcome {other:?}"),
        }
    }

    #[tokio::test]
    async fn enqueue_after_shutdown_fails() {
        let bridge = PersistenceBridge::spawn(Recorder::default());
        bridge.task.abort();
        let _ = bridge.task.await;
        assert!(matches!(
            bridge.handle.enqueue(request("a", "1")),
            Err(BridgeError::Closed)
        ));
    }
}
