//! Progress channel: a reconnecting stream of progress frames scoped to
//! one execution id.

pub mod channel;
pub mod mock;
pub mod transport;
pub mod websocket;

pub use channel::{ChannelEvent, ChannelSettings, ProgressChannel};
pub use mock::{ScriptedTransport, Session};
pub use transport::{ChannelError, FrameStream, ProgressTransport};
pub use websocket::WebSocketTransport;
