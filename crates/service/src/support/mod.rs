pub mod chat;
pub mod relay;

pub use relay::{ChatEvent, ChatRelay};
