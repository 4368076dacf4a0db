pub mod channel;
pub mod id;
pub mod snapshot;

pub use channel::{Channel, ChannelSettings, ChannelStateView, SyncReceipt};
pub use id::{BroadcastCode, ChannelId, OwnerId, ViewerId};
pub use snapshot::{FadeTrigger, Slot, Snapshot, VideoRef, CROSSFADE_MAX, SNAPSHOT_SCHEMA_VERSION};
