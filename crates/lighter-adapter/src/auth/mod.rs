/*
[INPUT]:  Externally issued bearer tokens and externally signed transactions
[OUTPUT]: Credentials attached to WebSocket connects and REST submissions
[POS]:    Auth layer - boundary to token generator and transaction signer collaborators
[UPDATE]: When credential sources or signer contracts change
*/

pub mod signer;
pub mod token;

pub use signer::{RawTx, SignedTx};
pub use token::{StaticToken, TokenData, TokenGenerator, TokenStore};
