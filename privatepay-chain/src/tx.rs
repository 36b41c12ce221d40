//! Legacy (type 0) transactions with EIP-155 replay protection.
//!
//! Mantle accepts legacy transactions, which keeps withdrawals from stealth
//! addresses down to a single RLP list and one signature.

use serde::{Deserialize, Serialize};

use privatepay_core::error::{PrivatePayError, Result};
use privatepay_core::types::{EthAddress, SecpSecretKey, TxHash};
use privatepay_crypto::{address_from_secret_key, keccak256, sign_prehash, RecoverableSignature};

// ═══════════════════════════════════════════════════════════════════════════════
// RLP
// ═══════════════════════════════════════════════════════════════════════════════

/// RLP encoders for the handful of item kinds a transaction needs.
pub mod rlp {
    /// Encodes a byte string.
    pub fn encode_bytes(bytes: &[u8]) -> Vec<u8> {
        if bytes.len() == 1 && bytes[0] < 0x80 {
            return bytes.to_vec();
        }
        let mut out = length_prefix(0x80, bytes.len());
        out.extend_from_slice(bytes);
        out
    }

    /// Encodes an unsigned integer as its minimal big-endian byte string.
    pub fn encode_uint(value: u128) -> Vec<u8> {
        encode_bytes(trim_leading_zeros(&value.to_be_bytes()))
    }

    /// Encodes a 256-bit big-endian integer (signature scalars).
    pub fn encode_word(word: &[u8; 32]) -> Vec<u8> {
        encode_bytes(trim_leading_zeros(word))
    }

    /// Wraps already-encoded items into a list.
    pub fn encode_list(items: &[Vec<u8>]) -> Vec<u8> {
        let payload_len = items.iter().map(Vec::len).sum();
        let mut out = length_prefix(0xc0, payload_len);
        for item in items {
            out.extend_from_slice(item);
        }
        out
    }

    fn length_prefix(offset: u8, len: usize) -> Vec<u8> {
        if len <= 55 {
            return vec![offset + len as u8];
        }
        let len_bytes = trim_leading_zeros(&len.to_be_bytes()).to_vec();
        let mut out = Vec::with_capacity(1 + len_bytes.len() + len);
        out.push(offset + 55 + len_bytes.len() as u8);
        out.extend_from_slice(&len_bytes);
        out
    }

    fn trim_leading_zeros(bytes: &[u8]) -> &[u8] {
        let first = bytes.iter().position(|b| *b != 0).unwrap_or(bytes.len());
        &bytes[first..]
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// TRANSACTIONS
// ═══════════════════════════════════════════════════════════════════════════════

/// An unsigned legacy transaction.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LegacyTransaction {
    /// Sender nonce
    pub nonce: u64,
    /// Gas price in wei
    pub gas_price: u128,
    /// Gas limit
    pub gas_limit: u64,
    /// Recipient; `None` deploys a contract
    pub to: Option<EthAddress>,
    /// Value in wei
    pub value: u128,
    /// Calldata
    #[serde(with = "hex::serde")]
    pub data: Vec<u8>,
    /// Chain id for EIP-155
    pub chain_id: u64,
}

impl LegacyTransaction {
    fn base_fields(&self) -> Vec<Vec<u8>> {
        let to = self
            .to
            .map(|address| rlp::encode_bytes(address.as_bytes()))
            .unwrap_or_else(|| rlp::encode_bytes(&[]));
        vec![
            rlp::encode_uint(u128::from(self.nonce)),
            rlp::encode_uint(self.gas_price),
            rlp::encode_uint(u128::from(self.gas_limit)),
            to,
            rlp::encode_uint(self.value),
            rlp::encode_bytes(&self.data),
        ]
    }

    /// EIP-155 signing payload `rlp([nonce, gasPrice, gas, to, value, data, chainId, 0, 0])`.
    pub fn signing_payload(&self) -> Vec<u8> {
        let mut fields = self.base_fields();
        fields.push(rlp::encode_uint(u128::from(self.chain_id)));
        fields.push(rlp::encode_uint(0));
        fields.push(rlp::encode_uint(0));
        rlp::encode_list(&fields)
    }

    /// Digest the sender signs.
    pub fn signing_hash(&self) -> [u8; 32] {
        keccak256(&self.signing_payload())
    }

    /// Maximum fee this transaction can burn.
    pub fn max_fee(&self) -> Result<u128> {
        self.gas_price
            .checked_mul(u128::from(self.gas_limit))
            .ok_or_else(|| PrivatePayError::InvalidAmount("gas fee overflows".into()))
    }

    /// Signs with `secret` and encodes the raw transaction.
    pub fn sign(&self, secret: &SecpSecretKey) -> Result<SignedTransaction> {
        if self.chain_id == 0 {
            return Err(PrivatePayError::SigningError(
                "EIP-155 requires a non-zero chain id".into(),
            ));
        }

        let signature = sign_prehash(secret, &self.signing_hash())?;
        let mut fields = self.base_fields();
        fields.push(rlp::encode_uint(u128::from(signature.eip155_v(self.chain_id))));
        fields.push(rlp::encode_word(&signature.r));
        fields.push(rlp::encode_word(&signature.s));
        let raw = rlp::encode_list(&fields);

        Ok(SignedTransaction {
            hash: TxHash::from_array(keccak256(&raw)),
            from: address_from_secret_key(secret)?,
            signature,
            raw,
        })
    }
}

/// A signed, broadcastable transaction.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SignedTransaction {
    /// RLP-encoded transaction for `eth_sendRawTransaction`
    pub raw: Vec<u8>,
    /// Transaction hash
    pub hash: TxHash,
    /// Signer address
    pub from: EthAddress,
    /// Signature over the EIP-155 payload
    pub signature: RecoverableSignature,
}

impl SignedTransaction {
    /// Raw transaction as `0x`-prefixed hex.
    pub fn raw_hex(&self) -> String {
        format!("0x{}", hex::encode(&self.raw))
    }
}
