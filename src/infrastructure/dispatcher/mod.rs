mod command;
mod engine;
mod handle;

pub use command::{DispatcherCommand, RegisterRequest};
pub use engine::{DispatcherConfig, StreamDispatcher};
pub use handle::{DispatcherHandle, TopicActivations};
