pub mod channel_store;
pub mod presence;

pub use channel_store::ChannelStateStore;
pub use presence::PresenceTracker;
