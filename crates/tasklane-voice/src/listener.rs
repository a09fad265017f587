//! Voice listener: drives the command router from a running recognizer.

use std::sync::Arc;

use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use tasklane_core::error::Result;
use tasklane_core::navigation::Navigator;

use crate::recognizer::{ListenHandle, RecognitionEvent, SpeechRecognizer};
use crate::router::{VoiceCommandRouter, VoiceOutcome, VoiceState};

struct Active {
    recognition: ListenHandle,
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

/// Owns the optional recognizer and the routing task.
///
/// Without a recognizer the feature stays off: activation is logged and
/// nothing else happens.
pub struct VoiceListener {
    recognizer: Option<Arc<dyn SpeechRecognizer>>,
    navigator: Arc<dyn Navigator>,
    state: Arc<watch::Sender<VoiceState>>,
    active: Option<Active>,
}

impl VoiceListener {
    pub fn new(
        recognizer: Option<Arc<dyn SpeechRecognizer>>,
        navigator: Arc<dyn Navigator>,
    ) -> Self {
        let (state, _rx) = watch::channel(VoiceState::Idle);
        Self {
            recognizer,
            navigator,
            state: Arc::new(state),
            active: None,
        }
    }

    pub fn is_supported(&self) -> bool {
        self.recognizer.is_some()
    }

    pub fn state(&self) -> VoiceState {
        *self.state.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<VoiceState> {
        self.state.subscribe()
    }

    /// Start listening in manual mode. Returns whether listening is active.
    pub fn activate(&mut self) -> Result<bool> {
        if self.active.is_some() {
            if self.state().is_listening() {
                return Ok(true);
            }
            // The recognizer ended on its own; discard the finished session
            self.release();
        }
        let Some(recognizer) = &self.recognizer else {
            info!("Speech recognition not supported, voice navigation disabled");
            return Ok(false);
        };

        let (sink, events) = mpsc::unbounded_channel();
        let recognition = recognizer.start_listening(sink)?;

        let mut router = VoiceCommandRouter::new();
        router.activate();
        self.state.send_replace(router.state());

        let cancel = CancellationToken::new();
        let task = tokio::spawn(route_events(
            events,
            router,
            self.navigator.clone(),
            self.state.clone(),
            cancel.clone(),
        ));

        info!("Voice listening started");
        self.active = Some(Active {
            recognition,
            cancel,
            task,
        });
        Ok(true)
    }

    /// Stop listening. The recognizer and routing task are both cancelled.
    pub fn stop(&mut self) {
        if self.release() {
            self.state.send_replace(VoiceState::Idle);
            info!("Voice listening stopped");
        }
    }

    /// Cancel the current session, if any. Returns whether there was one.
    fn release(&mut self) -> bool {
        let Some(active) = self.active.take() else {
            return false;
        };
        active.cancel.cancel();
        if let Some(recognizer) = &self.recognizer {
            recognizer.stop(&active.recognition);
        }
        true
    }

    /// Stop and wait for the background tasks to exit.
    pub async fn shutdown(mut self) {
        let Some(active) = self.active.take() else {
            return;
        };
        active.cancel.cancel();
        active.recognition.join().await;
        let _ = active.task.await;
        self.state.send_replace(VoiceState::Idle);
    }
}

impl Drop for VoiceListener {
    fn drop(&mut self) {
        if let Some(active) = &self.active {
            active.cancel.cancel();
            active.recognition.cancel();
        }
    }
}

async fn route_events(
    mut events: mpsc::UnboundedReceiver<RecognitionEvent>,
    mut router: VoiceCommandRouter,
    navigator: Arc<dyn Navigator>,
    state: Arc<watch::Sender<VoiceState>>,
    cancel: CancellationToken,
) {
    loop {
        let event = tokio::select! {
            biased;
            _ = cancel.cancelled() => return,
            event = events.recv() => event,
        };

        match event {
            Some(RecognitionEvent::Result {
                transcript,
                is_final: true,
            }) => {
                let utterance = transcript.trim().to_lowercase();
                debug!(%utterance, "Heard");
                match router.handle_utterance(&utterance) {
                    VoiceOutcome::ModeChanged(mode) => {
                        info!(?mode, "Voice mode changed");
                        state.send_replace(router.state());
                    }
                    VoiceOutcome::Navigate(route) => {
                        info!(%route, "Voice navigation");
                        navigator.navigate(route);
                    }
                    VoiceOutcome::Ignored => {}
                }
            }
            Some(RecognitionEvent::Result { .. }) => {}
            Some(RecognitionEvent::Error(e)) => {
                warn!(error = %e, "Speech recognition error");
            }
            None => {
                info!("Recognizer ended");
                state.send_replace(VoiceState::Idle);
                return;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use tasklane_core::routes::Route;

    use super::*;
    use crate::recognizer::{ChannelRecognizer, EventSink};
    use crate::router::VoiceMode;

    /// Navigator that reports every call on a channel.
    struct Recorder {
        tx: mpsc::UnboundedSender<Route>,
        current: Mutex<Route>,
    }

    impl Navigator for Recorder {
        fn navigate(&self, route: Route) {
            *self.current.lock().unwrap() = route.clone();
            let _ = self.tx.send(route);
        }

        fn redirect(&self, route: Route) {
            self.navigate(route);
        }

        fn current(&self) -> Route {
            self.current.lock().unwrap().clone()
        }
    }

    fn setup() -> (VoiceListener, EventSink, mpsc::UnboundedReceiver<Route>) {
        let (recognizer, source) = ChannelRecognizer::new();
        let (tx, rx) = mpsc::unbounded_channel();
        let navigator = Arc::new(Recorder {
            tx,
            current: Mutex::new(Route::Dashboard),
        });
        let listener = VoiceListener::new(Some(Arc::new(recognizer)), navigator);
        (listener, source, rx)
    }

    async fn wait_for_mode(rx: &mut watch::Receiver<VoiceState>, mode: VoiceMode) {
        rx.wait_for(|s| *s == VoiceState::Listening(mode))
            .await
            .unwrap();
    }

    fn say(source: &EventSink, text: &str) {
        source.send(RecognitionEvent::final_result(text)).unwrap();
    }

    #[tokio::test]
    async fn test_activation_starts_manual() {
        let (mut listener, _source, _nav) = setup();
        assert_eq!(listener.state().mode_label(), "Voice OFF");

        assert!(listener.activate().unwrap());
        assert_eq!(listener.state(), VoiceState::Listening(VoiceMode::Manual));
        assert_eq!(listener.state().mode_label(), "Manual Mode");
        // Second activation is a no-op
        assert!(listener.activate().unwrap());
    }

    #[tokio::test]
    async fn test_missing_capability_disables_feature() {
        let (tx, _rx) = mpsc::unbounded_channel();
        let navigator = Arc::new(Recorder {
            tx,
            current: Mutex::new(Route::Dashboard),
        });
        let mut listener = VoiceListener::new(None, navigator);

        assert!(!listener.is_supported());
        assert!(!listener.activate().unwrap());
        assert_eq!(listener.state(), VoiceState::Idle);
    }

    #[tokio::test]
    async fn test_automatic_mode_navigates() {
        let (mut listener, source, mut nav) = setup();
        let mut state = listener.subscribe();
        listener.activate().unwrap();

        say(&source, "Switch to AUTOMATIC mode");
        wait_for_mode(&mut state, VoiceMode::Automatic).await;
        assert_eq!(listener.state().mode_label(), "Automatic Mode");

        say(&source, "go to kanban");
        assert_eq!(nav.recv().await, Some(Route::Kanban));
    }

    #[tokio::test]
    async fn test_manual_mode_and_noise_do_not_navigate() {
        let (mut listener, source, mut nav) = setup();
        let mut state = listener.subscribe();
        listener.activate().unwrap();

        say(&source, "go to kanban");
        source
            .send(RecognitionEvent::Result {
                transcript: "automatic".into(),
                is_final: false,
            })
            .unwrap();
        source
            .send(RecognitionEvent::Error("network".into()))
            .unwrap();
        say(&source, "automatic");
        wait_for_mode(&mut state, VoiceMode::Automatic).await;

        // Only the utterance after the switch navigates
        say(&source, "what a nice day");
        say(&source, "open settings");
        assert_eq!(nav.recv().await, Some(Route::Settings));

        say(&source, "manual please");
        wait_for_mode(&mut state, VoiceMode::Manual).await;
        say(&source, "profile");
        say(&source, "automatic");
        wait_for_mode(&mut state, VoiceMode::Automatic).await;
        assert!(nav.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_stop_returns_to_idle() {
        let (mut listener, source, mut nav) = setup();
        listener.activate().unwrap();

        listener.stop();
        assert_eq!(listener.state(), VoiceState::Idle);

        // Events after stop are never routed
        let _ = source.send(RecognitionEvent::final_result("automatic"));
        let _ = source.send(RecognitionEvent::final_result("dashboard"));
        listener.shutdown().await;
        assert!(nav.try_recv().is_err());
    }

    /// Recognizer that can be started repeatedly, handing each session's
    /// sink to the test.
    #[derive(Default)]
    struct Restartable {
        sinks: Mutex<Vec<EventSink>>,
    }

    impl SpeechRecognizer for Restartable {
        fn start_listening(&self, sink: EventSink) -> Result<ListenHandle> {
            self.sinks.lock().unwrap().push(sink);
            Ok(ListenHandle::new(CancellationToken::new(), None))
        }
    }

    #[tokio::test]
    async fn test_reactivate_after_recognizer_end() {
        let recognizer = Arc::new(Restartable::default());
        let (tx, mut nav) = mpsc::unbounded_channel();
        let navigator = Arc::new(Recorder {
            tx,
            current: Mutex::new(Route::Dashboard),
        });
        let mut listener = VoiceListener::new(Some(recognizer.clone()), navigator);
        let mut state = listener.subscribe();

        assert!(listener.activate().unwrap());
        let first = recognizer.sinks.lock().unwrap().pop().unwrap();
        drop(first);
        state.wait_for(|s| *s == VoiceState::Idle).await.unwrap();

        assert!(listener.activate().unwrap());
        assert_eq!(listener.state(), VoiceState::Listening(VoiceMode::Manual));

        let second = recognizer.sinks.lock().unwrap().pop().unwrap();
        say(&second, "automatic");
        wait_for_mode(&mut state, VoiceMode::Automatic).await;
        say(&second, "show analytics");
        assert_eq!(nav.recv().await, Some(Route::Analytics));
    }

    #[tokio::test]
    async fn test_recognizer_end_goes_idle() {
        let (mut listener, source, _nav) = setup();
        let mut state = listener.subscribe();
        listener.activate().unwrap();

        drop(source);
        state.wait_for(|s| *s == VoiceState::Idle).await.unwrap();
    }
}
