pub mod engine;
pub mod post;
pub mod session;

pub use engine::{Broker, SharedBroker, lock_broker};
