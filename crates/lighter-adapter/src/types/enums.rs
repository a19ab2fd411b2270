/*
[INPUT]:  API schema definitions and serde requirements
[OUTPUT]: Typed Rust enums with serialization support
[POS]:    Data layer - type definitions for API communication
[UPDATE]: When API schema changes or new types added
*/

use serde::{Deserialize, Serialize};

/// Transaction kinds accepted by `sendTx`, as numbered by the exchange
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "u8", try_from = "u8")]
pub enum TxType {
    ChangePubKey,
    CreateSubAccount,
    CreatePublicPool,
    UpdatePublicPool,
    Transfer,
    Withdraw,
    CreateOrder,
    CancelOrder,
    CancelAllOrders,
    ModifyOrder,
    MintShares,
    BurnShares,
    UpdateLeverage,
}

impl TxType {
    pub fn code(self) -> u8 {
        match self {
            TxType::ChangePubKey => 8,
            TxType::CreateSubAccount => 9,
            TxType::CreatePublicPool => 10,
            TxType::UpdatePublicPool => 11,
            TxType::Transfer => 12,
            TxType::Withdraw => 13,
            TxType::CreateOrder => 14,
            TxType::CancelOrder => 15,
            TxType::CancelAllOrders => 16,
            TxType::ModifyOrder => 17,
            TxType::MintShares => 18,
            TxType::BurnShares => 19,
            TxType::UpdateLeverage => 20,
        }
    }
}

impl From<TxType> for u8 {
    fn from(value: TxType) -> Self {
        value.code()
    }
}

impl TryFrom<u8> for TxType {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        let tx_type = match value {
            8 => TxType::ChangePubKey,
            9 => TxType::CreateSubAccount,
            10 => TxType::CreatePublicPool,
            11 => TxType::UpdatePublicPool,
            12 => TxType::Transfer,
            13 => TxType::Withdraw,
            14 => TxType::CreateOrder,
            15 => TxType::CancelOrder,
            16 => TxType::CancelAllOrders,
            17 => TxType::ModifyOrder,
            18 => TxType::MintShares,
            19 => TxType::BurnShares,
            20 => TxType::UpdateLeverage,
            other => return Err(format!("unknown tx type {other}")),
        };
        Ok(tx_type)
    }
}

/// How `api/v1/account` looks an account up
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccountLookup {
    Index(i64),
    L1Address(String),
}

impl AccountLookup {
    /// Query pair `(by, value)` for the lookup
    pub fn query(&self) -> (&'static str, String) {
        match self {
            AccountLookup::Index(index) => ("index", index.to_string()),
            AccountLookup::L1Address(address) => ("l1_address", address.clone()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Bid,
    Ask,
}

impl Side {
    /// Exchange encodes the side as an `is_ask` flag
    pub fn from_is_ask(is_ask: u8) -> Self {
        if is_ask == 0 { Side::Bid } else { Side::Ask }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tx_type_serializes_as_number() {
        let encoded = serde_json::to_string(&TxType::CreateOrder).expect("encode");
        assert_eq!(encoded, "14");
        let decoded: TxType = serde_json::from_str("15").expect("decode");
        assert_eq!(decoded, TxType::CancelOrder);
        assert!(serde_json::from_str::<TxType>("99").is_err());
    }

    #[test]
    fn account_lookup_query_pairs() {
        assert_eq!(AccountLookup::Index(3).query(), ("index", "3".to_string()));
        assert_eq!(
            AccountLookup::L1Address("0xabc".into()).query(),
            ("l1_address", "0xabc".to_string())
        );
    }
}
