pub mod commands;
pub mod discord;
pub mod handler;
pub mod identity;
pub mod locator;
pub mod messages;
pub mod recognition;
pub mod render;
pub mod transport;
pub mod waiting;

pub use handler::{Dispatch, ShituHandler};
pub use locator::{ImageOrigin, ImageReference, locate};
pub use recognition::{
    CharacterMatch, ErrorKind, PipelineOutcome, RecognitionResult, Recognizer,
};
pub use render::render;
pub use transport::{ReplyChannel, SendError};
pub use waiting::{WaitingRegistry, WaitingSession};
