pub mod client;
pub mod messages;

pub use client::{parse_link_event, NatsLink, NatsNotifier, Subjects};
pub use messages::Advertisement;
