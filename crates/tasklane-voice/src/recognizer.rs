//! Speech recognizer capability.
//!
//! A recognizer runs continuously once started and pushes events into the
//! sink it was given, until its handle is stopped.

use std::io::BufRead;
use std::sync::Mutex;

use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use tasklane_core::error::{Result, TasklaneError};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecognitionEvent {
    /// A recognized phrase. Interim results are revised later; only final
    /// ones are acted on.
    Result { transcript: String, is_final: bool },
    /// Recognizer-level failure. Listening continues.
    Error(String),
}

impl RecognitionEvent {
    pub fn final_result(transcript: impl Into<String>) -> Self {
        Self::Result {
            transcript: transcript.into(),
            is_final: true,
        }
    }
}

pub type EventSink = mpsc::UnboundedSender<RecognitionEvent>;

/// Handle for one running recognition session.
pub struct ListenHandle {
    cancel: CancellationToken,
    task: Option<JoinHandle<()>>,
}

impl ListenHandle {
    pub fn new(cancel: CancellationToken, task: Option<JoinHandle<()>>) -> Self {
        Self { cancel, task }
    }

    pub fn is_stopped(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Signal the session to stop. Idempotent.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Cancel and wait for the background task to finish.
    pub async fn join(mut self) {
        self.cancel.cancel();
        if let Some(task) = self.task.take() {
            let _ = task.await;
        }
    }
}

pub trait SpeechRecognizer: Send + Sync {
    /// Begin continuous recognition, delivering events to `sink`.
    fn start_listening(&self, sink: EventSink) -> Result<ListenHandle>;

    fn stop(&self, handle: &ListenHandle) {
        handle.cancel();
    }
}

type LineSource = Box<dyn AsyncBufRead + Send + Unpin>;

/// Treats each non-empty line of a text source as one final result.
///
/// The source is consumed by the first `start_listening` call.
pub struct LineRecognizer {
    source: Mutex<Option<LineSource>>,
}

impl LineRecognizer {
    pub fn new(source: impl AsyncBufRead + Send + Unpin + 'static) -> Self {
        Self {
            source: Mutex::new(Some(Box::new(source))),
        }
    }

}

impl SpeechRecognizer for LineRecognizer {
    fn start_listening(&self, sink: EventSink) -> Result<ListenHandle> {
        let source = self
            .source
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .take()
            .ok_or_else(|| TasklaneError::Voice("line source already consumed".into()))?;

        let cancel = CancellationToken::new();
        let token = cancel.clone();
        let task = tokio::spawn(async move {
            let mut lines = source.lines();
            loop {
                tokio::select! {
                    biased;
                    _ = token.cancelled() => break,
                    line = lines.next_line() => match line {
                        Ok(Some(line)) => {
                            let line = line.trim();
                            if line.is_empty() {
                                continue;
                            }
                            if sink.send(RecognitionEvent::final_result(line)).is_err() {
                                break;
                            }
                        }
                        Ok(None) => {
                            debug!("Line source closed");
                            break;
                        }
                        Err(e) => {
                            // A broken source will not recover
                            let _ = sink.send(RecognitionEvent::Error(e.to_string()));
                            break;
                        }
                    },
                }
            }
            info!("Line recognizer stopped");
        });

        Ok(ListenHandle::new(cancel, Some(task)))
    }
}

/// Recognizer fed by an external event source, e.g. a platform binding.
///
/// Events sent before `start_listening` are buffered.
pub struct ChannelRecognizer {
    events: Mutex<Option<mpsc::UnboundedReceiver<RecognitionEvent>>>,
}

impl ChannelRecognizer {
    pub fn new() -> (Self, EventSink) {
        let (tx, rx) = mpsc::unbounded_channel();
        (
            Self {
                events: Mutex::new(Some(rx)),
            },
            tx,
        )
    }

    /// Feed non-empty lines of a blocking reader as final results.
    ///
    /// The reader runs on its own OS thread, so a read that never returns
    /// cannot hold up runtime shutdown.
    pub fn from_blocking_lines(reader: impl BufRead + Send + 'static) -> Result<Self> {
        let (recognizer, sink) = Self::new();
        std::thread::Builder::new()
            .name("voice-lines".into())
            .spawn(move || {
                for line in reader.lines() {
                    let event = match line {
                        Ok(line) if line.trim().is_empty() => continue,
                        Ok(line) => RecognitionEvent::final_result(line.trim()),
                        Err(e) => {
                            let _ = sink.send(RecognitionEvent::Error(e.to_string()));
                            break;
                        }
                    };
                    if sink.send(event).is_err() {
                        break;
                    }
                }
                debug!("Blocking line source closed");
            })?;
        Ok(recognizer)
    }

    /// Recognizer over the process's standard input.
    pub fn stdin() -> Result<Self> {
        Self::from_blocking_lines(std::io::BufReader::new(std::io::stdin()))
    }
}

impl SpeechRecognizer for ChannelRecognizer {
    fn start_listening(&self, sink: EventSink) -> Result<ListenHandle> {
        let mut events = self
            .events
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .take()
            .ok_or_else(|| TasklaneError::Voice("event source already consumed".into()))?;

        let cancel = CancellationToken::new();
        let token = cancel.clone();
        let task = tokio::spawn(async move {
            loop {
                tokio::select! {
                    biased;
                    _ = token.cancelled() => break,
                    event = events.recv() => {
                        let Some(event) = event else { break };
                        if sink.send(event).is_err() {
                            break;
                        }
                    }
                }
            }
        });

        Ok(ListenHandle::new(cancel, Some(task)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_line_recognizer_emits_final_results() {
        let recognizer = LineRecognizer::new(&b"go to kanban\n\n  manual please  \n"[..]);
        let (tx, mut rx) = mpsc::unbounded_channel();

        let handle = recognizer.start_listening(tx).unwrap();

        assert_eq!(
            rx.recv().await,
            Some(RecognitionEvent::final_result("go to kanban"))
        );
        assert_eq!(
            rx.recv().await,
            Some(RecognitionEvent::final_result("manual please"))
        );
        // Source exhausted; the task drops the sink
        assert_eq!(rx.recv().await, None);
        handle.join().await;
    }

    #[tokio::test]
    async fn test_line_recognizer_single_use() {
        let recognizer = LineRecognizer::new(&b""[..]);
        let (tx, _rx) = mpsc::unbounded_channel();
        let handle = recognizer.start_listening(tx.clone()).unwrap();
        assert!(recognizer.start_listening(tx).is_err());
        handle.join().await;
    }

    #[tokio::test]
    async fn test_stop_cancels_pending_source() {
        let (reader, _writer) = tokio::io::duplex(64);
        let recognizer = LineRecognizer::new(tokio::io::BufReader::new(reader));
        let (tx, mut rx) = mpsc::unbounded_channel();

        let handle = recognizer.start_listening(tx).unwrap();
        recognizer.stop(&handle);
        assert!(handle.is_stopped());

        handle.join().await;
        assert_eq!(rx.recv().await, None);
    }

    #[tokio::test]
    async fn test_blocking_lines_feed_final_results() {
        let source = std::io::Cursor::new("dashboard\n \nAutomatic\n");
        let recognizer = ChannelRecognizer::from_blocking_lines(source).unwrap();
        let (tx, mut rx) = mpsc::unbounded_channel();
        let handle = recognizer.start_listening(tx).unwrap();

        assert_eq!(
            rx.recv().await,
            Some(RecognitionEvent::final_result("dashboard"))
        );
        assert_eq!(
            rx.recv().await,
            Some(RecognitionEvent::final_result("Automatic"))
        );
        // Reader thread finished; the stream closes
        assert_eq!(rx.recv().await, None);
        handle.join().await;
    }

    #[tokio::test]
    async fn test_channel_recognizer_forwards() {
        let (recognizer, source) = ChannelRecognizer::new();
        source
            .send(RecognitionEvent::Error("no-speech".into()))
            .unwrap();

        let (tx, mut rx) = mpsc::unbounded_channel();
        let handle = recognizer.start_listening(tx).unwrap();

        assert_eq!(
            rx.recv().await,
            Some(RecognitionEvent::Error("no-speech".into()))
        );
        drop(source);
        assert_eq!(rx.recv().await, None);
        handle.join().await;
    }
}
