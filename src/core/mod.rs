pub mod dialogue;
pub mod tts;

// Re-export commonly used types for convenience
pub use dialogue::{
    DialogueStitcher, HOST_A, HOST_B, ScriptParser, ScriptSegment, SpeakerMarker, StitchError,
    parse_dialogue_script,
};

pub use tts::{
    AudioEncoding, SessionError, SessionObserver, SessionState, Synthesizer, TTSError, TTSResult,
    VoiceParams, VolcengineTts, VolcengineTtsConfig,
};
