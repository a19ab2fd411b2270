/*
[INPUT]:  Crate modules and public type definitions
[OUTPUT]: Public Lighter adapter crate surface
[POS]:    Crate root - module wiring
[UPDATE]: When public modules or exports change
*/

pub mod auth;
pub mod http;
pub mod types;
pub mod ws;

// Re-export commonly used types from auth
pub use auth::{RawTx, SignedTx, StaticToken, TokenData, TokenGenerator, TokenStore};

// Re-export commonly used types from http
pub use http::{ClientConfig, ErrorKind, LighterClient, LighterError, Result};

// Re-export all types
pub use types::*;

// Re-export commonly used types from ws
pub use ws::{
    AccountEvent,
    AccountParams,
    ChannelKey,
    ChannelKind,
    ConnectionManager,
    LighterStream,
    OrderBookEvent,
    OrderBookParams,
    PrivateStreamService,
    PublicStreamService,
    SubscriptionHandle,
    WsConfig,
};
