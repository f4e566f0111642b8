pub mod registry;

pub use registry::{MoveConsumer, SessionError, SessionRegistry};
