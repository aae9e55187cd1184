//! Live sync channel.
//!
//! One persistent push connection per topic that reconnects after a fixed
//! delay until it is torn down.

mod connector;
mod state;
mod subscription;

pub use connector::{Connector, Frame, PushSocket, WsConnector};
pub use state::{ChannelEvent, ChannelMachine, ConnectionState, Effect, InvalidTransition};
pub use subscription::{ChannelUpdate, LiveChannel};
