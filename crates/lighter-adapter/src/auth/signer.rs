/*
[INPUT]:  Transactions signed by an external signer
[OUTPUT]: Transaction type and serialized payload for sendTx forms
[POS]:    Auth layer - boundary to the transaction signer (signing itself is external)
[UPDATE]: When sendTx payload format changes
*/

use crate::http::Result;
use crate::types::TxType;

/// A transaction already signed by the caller's signer
pub trait SignedTx: Send + Sync {
    fn tx_type(&self) -> TxType;

    /// Serialized `tx_info` form value
    fn tx_info(&self) -> Result<String>;
}

/// Pre-serialized signed transaction
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawTx {
    pub tx_type: TxType,
    pub tx_info: String,
}

impl RawTx {
    pub fn new(tx_type: TxType, tx_info: impl Into<String>) -> Self {
        Self {
            tx_type,
            tx_info: tx_info.into(),
        }
    }
}

impl SignedTx for RawTx {
    fn tx_type(&self) -> TxType {
        self.tx_type
    }

    fn tx_info(&self) -> Result<String> {
        Ok(self.tx_info.clone())
    }
}
