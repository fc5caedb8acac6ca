//! Scribe STT: speech-to-text provider client.
//!
//! The gateway constructs one `SttBackend` at startup and injects it into the
//! request handlers. `create_best_stt` picks the OpenAI-compatible client when
//! `STT_API_KEY` is set and falls back to the placeholder otherwise, so the
//! server always starts.

pub mod error;
pub mod stt;

pub use error::{SttError, SttResult};
pub use stt::{create_best_stt, OpenAiStt, PlaceholderStt, SttBackend, NO_SPEECH_PLACEHOLDER};
