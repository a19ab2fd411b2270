/*
[INPUT]:  Transactions signed by the caller's external signer
[OUTPUT]: Transaction hashes
[POS]:    HTTP layer - transaction submission (form-encoded POST)
[UPDATE]: When adding new submission endpoints or changing form fields
*/

use crate::auth::SignedTx;
use crate::http::{LighterClient, Result};
use crate::types::{TxHash, TxHashBatch};

impl LighterClient {
    /// Submit one signed transaction
    ///
    /// POST /api/v1/sendTx (tx_type, tx_info[, price_protection])
    pub async fn send_tx(&self, tx: &dyn SignedTx) -> Result<String> {
        let mut form = vec![
            ("tx_type", tx.tx_type().code().to_string()),
            ("tx_info", tx.tx_info()?),
        ];
        if !self.price_protection() {
            form.push(("price_protection", "false".to_string()));
        }

        let result: TxHash = self.post_form("/api/v1/sendTx", &form).await?;
        Ok(result.tx_hash)
    }

    /// Submit several signed transactions in one request
    ///
    /// POST /api/v1/sendTxBatch (tx_types, tx_infos as JSON arrays)
    pub async fn send_tx_batch(&self, txs: &[&dyn SignedTx]) -> Result<Vec<String>> {
        let tx_types: Vec<u8> = txs.iter().map(|tx| tx.tx_type().code()).collect();
        let tx_infos = txs
            .iter()
            .map(|tx| tx.tx_info())
            .collect::<Result<Vec<String>>>()?;

        let form = [
            ("tx_types", serde_json::to_string(&tx_types)?),
            ("tx_infos", serde_json::to_string(&tx_infos)?),
        ];

        let result: TxHashBatch = self.post_form("/api/v1/sendTxBatch", &form).await?;
        Ok(result.tx_hash)
    }
}
