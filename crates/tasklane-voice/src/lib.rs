//! Voice navigation and voice-assistant clips.
//!
//! A [`SpeechRecognizer`] produces phrases, the [`VoiceCommandRouter`] turns
//! them into mode switches or navigation, and the [`VoiceListener`] wires
//! the two to a [`Navigator`](tasklane_core::navigation::Navigator).

pub mod clip;
pub mod listener;
pub mod recognizer;
pub mod router;

pub use clip::Clip;
pub use listener::VoiceListener;
pub use recognizer::{
    ChannelRecognizer, EventSink, LineRecognizer, ListenHandle, RecognitionEvent,
    SpeechRecognizer,
};
pub use router::{VoiceCommandRouter, VoiceMode, VoiceOutcome, VoiceState};
