pub mod engine;
pub mod message;
pub mod queue;
pub mod registry;
pub mod topic;

pub use engine::{Broker, BrokerStatus, EntryStatus};
pub use message::{Message, Mode};
