//! Off-chain transaction records.
//!
//! Only the fields the stealth payment flow writes and reads are modelled.

use serde::{Deserialize, Serialize};

use super::units::wei_string;
use super::{EthAddress, TxHash};

/// Confirmation status of a recorded transaction.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TxStatus {
    /// Submitted, not yet confirmed
    Pending,
    /// Included with the required confirmations
    Confirmed,
}

/// Direction of a recorded transaction.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TxType {
    /// Sender paid a stealth address
    Payment,
    /// Recipient swept a stealth address
    Withdrawal,
}

/// A transaction mirrored into the off-chain store.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionRecord {
    /// Store-assigned id
    #[serde(default)]
    pub id: u64,
    /// Paying wallet (or stealth address for withdrawals)
    pub sender: EthAddress,
    /// Recipient wallet (or withdrawal destination)
    pub recipient: EthAddress,
    /// Stealth address involved
    pub stealth_address: EthAddress,
    /// Amount in wei
    #[serde(with = "wei_string")]
    pub amount: u128,
    /// Transaction hash
    pub tx_hash: TxHash,
    /// Block number once known
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub block_number: Option<u64>,
    /// Confirmation status
    pub status: TxStatus,
    /// Payment or withdrawal
    pub tx_type: TxType,
    /// Unix timestamp of insertion
    #[serde(default)]
    pub created_at: u64,
}

impl TransactionRecord {
    /// Creates a pending record.
    pub fn pending(
        tx_type: TxType,
        sender: EthAddress,
        recipient: EthAddress,
        stealth_address: EthAddress,
        amount: u128,
        tx_hash: TxHash,
    ) -> Self {
        Self {
            id: 0,
            sender,
            recipient,
            stealth_address,
            amount,
            tx_hash,
            block_number: None,
            status: TxStatus::Pending,
            tx_type,
            created_at: super::current_timestamp(),
        }
    }

    /// Returns true if `address` is the sender, recipient, or stealth address.
    pub fn involves(&self, address: &EthAddress) -> bool {
        self.sender == *address || self.recipient == *address || self.stealth_address == *address
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_and_type_serialize_lowercase() {
        assert_eq!(serde_json::to_string(&TxStatus::Pending).unwrap(), "\"pending\"");
        assert_eq!(serde_json::to_string(&TxStatus::Confirmed).unwrap(), "\"confirmed\"");
        assert_eq!(serde_json::to_string(&TxType::Withdrawal).unwrap(), "\"withdrawal\"");
    }

    #[test]
    fn test_pending_record() {
        let record = TransactionRecord::pending(
            TxType::Payment,
            EthAddress::from_array([1; 20]),
            EthAddress::from_array([2; 20]),
            EthAddress::from_array([3; 20]),
            5,
            TxHash::from_array([4; 32]),
        );
        assert_eq!(record.status, TxStatus::Pending);
        assert!(record.involves(&EthAddress::from_array([3; 20])));
        assert!(!record.involves(&EthAddress::from_array([9; 20])));
    }
}
