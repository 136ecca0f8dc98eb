//! Multi-pass transcription pipeline. Each pass reads and extends the
//! shared [`TranscriptionState`](crate::audio::TranscriptionState).

pub mod pass_0;
pub mod pass_1;
pub mod pass_2;
pub mod pass_3;
pub mod pass_4;
pub mod pass_5;
pub mod pass_6;
pub mod pass_7;
