pub mod base;
pub mod volcengine;

pub use base::{Synthesizer, TTSError, TTSResult};
pub use volcengine::{
    AudioEncoding, SessionError, SessionObserver, SessionState, VOLCENGINE_TTS_URL, VoiceParams,
    VolcengineTts, VolcengineTtsConfig,
};

