/*
[INPUT]:  WebSocket configuration, subscription intents, bearer tokens
[OUTPUT]: Typed order book and account streams over one managed connection
[POS]:    WebSocket layer - real-time data streams
[UPDATE]: When adding new channels or changing connection logic
*/

pub mod client;
pub mod config;
pub mod connection;
pub mod message;
pub mod private;
pub mod public;
pub mod registry;
pub mod router;
pub mod service;
mod transport;

pub use client::LighterStream;
pub use config::{WsConfig, DEFAULT_WS_URL};
pub use connection::{ChannelSubscription, ConnectionManager, DisconnectCallback};
pub use message::{kinds, AccountEvent, ChannelKey, ChannelKind, ControlFrame, OrderBookEvent};
pub use private::{AccountParams, PrivateStreamService};
pub use public::{OrderBookParams, PublicStreamService};
pub use registry::SubscriptionRegistry;
pub use router::{FrameHandler, HandlerId, MessageRouter, RouteOutcome};
pub use service::{ErrorHandler, SubscriptionHandle};
