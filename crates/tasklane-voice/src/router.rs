//! Voice command router: the manual/automatic state machine.
//!
//! Pure and synchronous: utterances in, outcomes out. The listener owns the
//! recognizer and performs the navigation this router asks for.

use tasklane_core::routes::Route;
use tracing::debug;

/// Destination keywords in priority order.
const DESTINATIONS: [(&str, Route); 7] = [
    ("dashboard", Route::Dashboard),
    ("list", Route::Tasks),
    ("kanban", Route::Kanban),
    ("analytics", Route::Analytics),
    ("settings", Route::Settings),
    ("profile", Route::Profile),
    ("activity", Route::Activity),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoiceMode {
    /// Utterances only switch modes.
    Manual,
    /// Destination keywords navigate.
    Automatic,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum VoiceState {
    #[default]
    Idle,
    Listening(VoiceMode),
}

impl VoiceState {
    pub fn mode_label(&self) -> &'static str {
        match self {
            Self::Idle => "Voice OFF",
            Self::Listening(VoiceMode::Manual) => "Manual Mode",
            Self::Listening(VoiceMode::Automatic) => "Automatic Mode",
        }
    }

    pub fn is_listening(&self) -> bool {
        matches!(self, Self::Listening(_))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VoiceOutcome {
    ModeChanged(VoiceMode),
    Navigate(Route),
    Ignored,
}

#[derive(Debug, Default)]
pub struct VoiceCommandRouter {
    state: VoiceState,
}

impl VoiceCommandRouter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> VoiceState {
        self.state
    }

    /// Explicit user activation. Listening always starts in manual mode.
    pub fn activate(&mut self) {
        self.state = VoiceState::Listening(VoiceMode::Manual);
    }

    pub fn deactivate(&mut self) {
        self.state = VoiceState::Idle;
    }

    /// Route one finalized utterance.
    ///
    /// Mode keywords win over destinations, and "manual" wins over
    /// "automatic". At most one navigation is produced per utterance: the
    /// first destination keyword in priority order.
    pub fn handle_utterance(&mut self, utterance: &str) -> VoiceOutcome {
        let VoiceState::Listening(mode) = self.state else {
            return VoiceOutcome::Ignored;
        };
        let text = utterance.to_lowercase();

        if text.contains("manual") {
            return self.switch(VoiceMode::Manual);
        }
        if text.contains("automatic") {
            return self.switch(VoiceMode::Automatic);
        }

        if mode != VoiceMode::Automatic {
            return VoiceOutcome::Ignored;
        }

        DESTINATIONS
            .iter()
            .find(|(keyword, _)| text.contains(keyword))
            .map(|(_, route)| VoiceOutcome::Navigate(route.clone()))
            .unwrap_or(VoiceOutcome::Ignored)
    }

    fn switch(&mut self, mode: VoiceMode) -> VoiceOutcome {
        debug!(?mode, "Voice mode switch");
        self.state = VoiceState::Listening(mode);
        VoiceOutcome::ModeChanged(mode)
    }
}
