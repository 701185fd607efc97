pub mod action;
pub mod config;
pub mod domain;
pub mod executor;
pub mod store;
pub mod transcript;

pub use action::{Action, ActionDecodeError};
pub use domain::container::{Container, ContainerId, PendingScan};
pub use executor::ActionExecutor;
pub use store::ContainerStore;
pub use transcript::{Message, Sender, Transcript};
