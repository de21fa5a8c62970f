pub mod decode;
pub mod envelope;
pub mod error;
pub mod event;
pub mod key;

pub use decode::decode_image;
pub use envelope::{NO_PROMPT_MESSAGE, PromptError, Response, extract_prompt};
pub use error::DecodeError;
pub use event::{LifecycleCommand, LifecycleEvent, LifecycleOutcome};
pub use key::object_key;
