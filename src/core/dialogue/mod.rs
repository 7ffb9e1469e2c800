//! Multi-speaker dialogue synthesis.
//!
//! A dialogue script is a list of lines prefixed with a speaker marker
//! (`主持人A: ...`). [`ScriptParser`] turns the script into ordered
//! [`ScriptSegment`]s and [`DialogueStitcher`] synthesizes them one after the
//! other, concatenating the audio in script order.

pub mod script;
pub mod stitcher;

pub use script::{HOST_A, HOST_B, ScriptParser, ScriptSegment, SpeakerMarker, parse_dialogue_script};
pub use stitcher::{DialogueStitcher, StitchError};
