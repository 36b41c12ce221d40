//! Minimal Solidity ABI codec for the registry and payment manager contracts.
//!
//! Only the types the two contracts use are supported: `address`, unsigned
//! integers that fit in `u128`, and dynamic `bytes`. Encoding follows the
//! standard head/tail layout; decoding bounds-checks every offset.

use serde::Deserialize;

use privatepay_core::error::{PrivatePayError, Result};
use privatepay_core::types::{
    EthAddress, MetaAddress, PaymentAnnouncement, RegisteredMetaAddress, SecpPublicKey, TxHash,
};
use privatepay_crypto::keccak256;
use privatepay_crypto::keys::{parse_public_key, to_compressed};

/// ABI word size.
pub const WORD: usize = 32;

/// Contract function and event signatures.
pub mod signatures {
    /// `StealthAddressRegistry.registerMetaAddress`
    pub const REGISTER_META_ADDRESS: &str = "registerMetaAddress(bytes,bytes)";
    /// `StealthAddressRegistry.getMetaAddress`
    pub const GET_META_ADDRESS: &str = "getMetaAddress(address,uint256)";
    /// `StealthAddressRegistry.getMetaAddressCount`
    pub const GET_META_ADDRESS_COUNT: &str = "getMetaAddressCount(address)";
    /// `StealthAddressRegistry.announcePayment`
    pub const ANNOUNCE_PAYMENT: &str =
        "announcePayment(address,uint256,bytes,address,uint32,uint32,uint256)";
    /// `PaymentManager.sendPrivatePayment`
    pub const SEND_PRIVATE_PAYMENT: &str =
        "sendPrivatePayment(address,uint256,uint32,bytes,address,uint32)";
    /// `PaymentManager.withdrawFromStealth`
    pub const WITHDRAW_FROM_STEALTH: &str = "withdrawFromStealth(address)";
    /// `PaymentManager.getStealthBalance`
    pub const GET_STEALTH_BALANCE: &str = "getStealthBalance(address)";

    /// Registry event for new meta-addresses.
    pub const META_ADDRESS_REGISTERED_EVENT: &str =
        "MetaAddressRegistered(address,uint256,bytes,bytes,uint256)";
    /// Registry event for payments.
    pub const PAYMENT_ANNOUNCEMENT_EVENT: &str =
        "PaymentAnnouncement(address,uint256,bytes,address,uint32,uint32,uint256,uint256)";
}

/// 4-byte function selector.
pub fn selector(signature: &str) -> [u8; 4] {
    let hash = keccak256(signature.as_bytes());
    [hash[0], hash[1], hash[2], hash[3]]
}

/// Event topic 0.
pub fn event_topic(signature: &str) -> [u8; 32] {
    keccak256(signature.as_bytes())
}

// ═══════════════════════════════════════════════════════════════════════════════
// ENCODING
// ═══════════════════════════════════════════════════════════════════════════════

/// A value to encode.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Token {
    /// `address`
    Address(EthAddress),
    /// Any `uintN` that fits in 128 bits
    Uint(u128),
    /// Dynamic `bytes`
    Bytes(Vec<u8>),
}

impl Token {
    fn head_word(&self) -> [u8; WORD] {
        match self {
            Token::Address(address) => address_word(address),
            Token::Uint(value) => uint_word(*value),
            Token::Bytes(_) => [0u8; WORD],
        }
    }
}

/// Left-pads a value into a word.
pub fn uint_word(value: u128) -> [u8; WORD] {
    let mut word = [0u8; WORD];
    word[16..].copy_from_slice(&value.to_be_bytes());
    word
}

/// Left-pads an address into a word (also the layout of indexed topics).
pub fn address_word(address: &EthAddress) -> [u8; WORD] {
    let mut word = [0u8; WORD];
    word[12..].copy_from_slice(address.as_bytes());
    word
}

/// Encodes `tokens` as a tuple.
pub fn encode(tokens: &[Token]) -> Vec<u8> {
    let head_len = tokens.len() * WORD;
    let mut head = Vec::with_capacity(head_len);
    let mut tail = Vec::new();

    for token in tokens {
        match token {
            Token::Bytes(bytes) => {
                head.extend_from_slice(&uint_word((head_len + tail.len()) as u128));
                tail.extend_from_slice(&uint_word(bytes.len() as u128));
                tail.extend_from_slice(bytes);
                let padding = (WORD - bytes.len() % WORD) % WORD;
                tail.extend(std::iter::repeat(0u8).take(padding));
            }
            static_token => head.extend_from_slice(&static_token.head_word()),
        }
    }

    head.extend_from_slice(&tail);
    head
}

/// Selector followed by the encoded arguments.
pub fn encode_call(signature: &str, tokens: &[Token]) -> Vec<u8> {
    let mut data = selector(signature).to_vec();
    data.extend_from_slice(&encode(tokens));
    data
}

// ═══════════════════════════════════════════════════════════════════════════════
// DECODING
// ═══════════════════════════════════════════════════════════════════════════════

/// Reads head slots of an encoded tuple.
#[derive(Clone, Copy, Debug)]
pub struct AbiReader<'a> {
    data: &'a [u8],
}

impl<'a> AbiReader<'a> {
    /// Wraps encoded data.
    pub fn new(data: &'a [u8]) -> Self {
        Self { data }
    }

    /// Raw word at head slot `index`.
    pub fn word(&self, index: usize) -> Result<&'a [u8]> {
        self.word_at(index * WORD)
    }

    fn word_at(&self, offset: usize) -> Result<&'a [u8]> {
        offset
            .checked_add(WORD)
            .and_then(|end| self.data.get(offset..end))
            .ok_or_else(|| {
                PrivatePayError::AbiDecodeError(format!(
                    "word at byte {} is out of bounds ({} bytes)",
                    offset,
                    self.data.len()
                ))
            })
    }

    /// Unsigned integer at slot `index`; values above `u128::MAX` are rejected.
    pub fn uint(&self, index: usize) -> Result<u128> {
        word_to_uint(self.word(index)?)
    }

    /// Unsigned integer at slot `index` that must fit in a `u64`.
    pub fn u64(&self, index: usize) -> Result<u64> {
        let value = self.uint(index)?;
        u64::try_from(value)
            .map_err(|_| PrivatePayError::AbiDecodeError(format!("{} overflows u64", value)))
    }

    /// Address at slot `index`.
    pub fn address(&self, index: usize) -> Result<EthAddress> {
        word_to_address(self.word(index)?)
    }

    /// Dynamic `bytes` referenced by the offset at slot `index`.
    pub fn bytes(&self, index: usize) -> Result<Vec<u8>> {
        let offset = self.offset(index)?;
        let len = word_to_uint(self.word_at(offset)?)?;
        let start = offset + WORD;
        usize::try_from(len)
            .ok()
            .and_then(|len| start.checked_add(len))
            .and_then(|end| self.data.get(start..end))
            .map(<[u8]>::to_vec)
            .ok_or_else(|| {
                PrivatePayError::AbiDecodeError(format!(
                    "bytes of length {} at {} exceed the data",
                    len, offset
                ))
            })
    }

    /// Dynamic tuple referenced by the offset at slot `index`.
    pub fn tuple(&self, index: usize) -> Result<AbiReader<'a>> {
        let offset = self.offset(index)?;
        let data = self.data.get(offset..).ok_or_else(|| {
            PrivatePayError::AbiDecodeError(format!("tuple offset {} is out of bounds", offset))
        })?;
        Ok(AbiReader::new(data))
    }

    fn offset(&self, index: usize) -> Result<usize> {
        let offset = self.uint(index)?;
        usize::try_from(offset)
            .map_err(|_| PrivatePayError::AbiDecodeError(format!("offset {} too large", offset)))
    }
}

fn word_to_uint(word: &[u8]) -> Result<u128> {
    if word[..16].iter().any(|b| *b != 0) {
        return Err(PrivatePayError::AbiDecodeError(
            "integer does not fit in 128 bits".into(),
        ));
    }
    let mut bytes = [0u8; 16];
    bytes.copy_from_slice(&word[16..WORD]);
    Ok(u128::from_be_bytes(bytes))
}

fn word_to_address(word: &[u8]) -> Result<EthAddress> {
    if word[..12].iter().any(|b| *b != 0) {
        return Err(PrivatePayError::AbiDecodeError(
            "address word has dirty high bytes".into(),
        ));
    }
    EthAddress::from_bytes(&word[12..WORD])
}

fn public_key_from_chain(bytes: &[u8], what: &str) -> Result<SecpPublicKey> {
    let point = parse_public_key(bytes).map_err(|e| {
        PrivatePayError::AbiDecodeError(format!("{} is not a valid public key: {}", what, e))
    })?;
    to_compressed(&point)
}

/// Decodes the `getMetaAddress` return value `((bytes,bytes,uint256))`.
///
/// Uncompressed keys published on-chain are compressed on the way in.
pub fn decode_meta_address(
    data: &[u8],
    owner: EthAddress,
    index: u64,
) -> Result<RegisteredMetaAddress> {
    let tuple = AbiReader::new(data).tuple(0)?;
    let spend = tuple.bytes(0)?;
    let viewing = tuple.bytes(1)?;
    let created_at = tuple.u64(2)?;

    if spend.is_empty() && viewing.is_empty() {
        return Err(PrivatePayError::MetaAddressNotFound {
            owner: owner.to_string(),
            index,
        });
    }

    let meta_address = MetaAddress::new(
        public_key_from_chain(&spend, "spend key")?,
        public_key_from_chain(&viewing, "viewing key")?,
    );
    meta_address.validate()?;

    Ok(RegisteredMetaAddress {
        owner,
        index,
        meta_address,
        created_at,
    })
}

/// Decodes a single `uint256` return value.
pub fn decode_uint(data: &[u8]) -> Result<u128> {
    AbiReader::new(data).uint(0)
}

// ═══════════════════════════════════════════════════════════════════════════════
// LOGS
// ═══════════════════════════════════════════════════════════════════════════════

/// An `eth_getLogs` entry as returned by the node.
#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Log {
    /// Emitting contract
    pub address: String,
    /// Topics, topic 0 is the event signature
    pub topics: Vec<String>,
    /// Non-indexed data
    pub data: String,
    /// Block number (hex quantity), absent for pending logs
    #[serde(default)]
    pub block_number: Option<String>,
    /// Transaction hash, absent for pending logs
    #[serde(default)]
    pub transaction_hash: Option<String>,
    /// Position in the block (hex quantity)
    #[serde(default)]
    pub log_index: Option<String>,
}

impl Log {
    /// Decoded topic `index`.
    pub fn topic(&self, index: usize) -> Result<[u8; WORD]> {
        let raw = self.topics.get(index).ok_or_else(|| {
            PrivatePayError::AbiDecodeError(format!("log has no topic {}", index))
        })?;
        let bytes = decode_hex_data(raw)?;
        bytes.try_into().map_err(|_| {
            PrivatePayError::AbiDecodeError(format!("topic {} is not 32 bytes", index))
        })
    }

    /// Decoded data field.
    pub fn data_bytes(&self) -> Result<Vec<u8>> {
        decode_hex_data(&self.data)
    }

    /// Block number, if mined.
    pub fn block(&self) -> Result<Option<u64>> {
        self.block_number
            .as_deref()
            .map(crate::rpc::parse_quantity_u64)
            .transpose()
    }

    /// Transaction hash, if mined.
    pub fn tx_hash(&self) -> Result<Option<TxHash>> {
        self.transaction_hash
            .as_deref()
            .map(TxHash::from_hex)
            .transpose()
    }

    fn expect_event(&self, signature: &str) -> Result<()> {
        if self.topic(0)? != event_topic(signature) {
            return Err(PrivatePayError::AbiDecodeError(format!(
                "log is not a {} event",
                signature
            )));
        }
        Ok(())
    }
}

/// Decodes `0x`-prefixed hex; `0x` alone is empty.
pub fn decode_hex_data(raw: &str) -> Result<Vec<u8>> {
    let stripped = raw.strip_prefix("0x").unwrap_or(raw);
    hex::decode(stripped)
        .map_err(|e| PrivatePayError::AbiDecodeError(format!("invalid hex data: {}", e)))
}

/// Decodes a `PaymentAnnouncement` log.
///
/// The event carries `viewHint` as `uint32`; values above 255 cannot come from
/// a one-byte hint and are rejected.
pub fn decode_payment_announcement(log: &Log) -> Result<PaymentAnnouncement> {
    log.expect_event(signatures::PAYMENT_ANNOUNCEMENT_EVENT)?;

    let recipient = word_to_address(&log.topic(1)?)?;
    let meta_address_index = word_to_u64(&log.topic(2)?)?;

    let data = log.data_bytes()?;
    let reader = AbiReader::new(&data);
    let ephemeral_pub_key = reader.bytes(0)?;
    let stealth_address = reader.address(1)?;
    let view_hint = reader.uint(2)?;
    let view_hint = u8::try_from(view_hint).map_err(|_| {
        PrivatePayError::AbiDecodeError(format!("view hint {} does not fit in one byte", view_hint))
    })?;
    let k = reader.uint(3)?;
    let k = u32::try_from(k)
        .map_err(|_| PrivatePayError::AbiDecodeError(format!("k {} overflows u32", k)))?;
    let amount = reader.uint(4)?;
    let timestamp = reader.u64(5)?;

    Ok(PaymentAnnouncement {
        id: 0,
        recipient,
        meta_address_index,
        ephemeral_pub_key,
        stealth_address,
        view_hint,
        k,
        amount,
        timestamp,
        block_number: log.block()?,
        tx_hash: log.tx_hash()?,
    })
}

/// Decodes a `MetaAddressRegistered` log.
pub fn decode_meta_address_registered(log: &Log) -> Result<RegisteredMetaAddress> {
    log.expect_event(signatures::META_ADDRESS_REGISTERED_EVENT)?;

    let owner = word_to_address(&log.topic(1)?)?;
    let index = word_to_u64(&log.topic(2)?)?;

    let data = log.data_bytes()?;
    let reader = AbiReader::new(&data);
    let meta_address = MetaAddress::new(
        public_key_from_chain(&reader.bytes(0)?, "spend key")?,
        public_key_from_chain(&reader.bytes(1)?, "viewing key")?,
    );

    Ok(RegisteredMetaAddress {
        owner,
        index,
        meta_address,
        created_at: reader.u64(2)?,
    })
}

fn word_to_u64(word: &[u8]) -> Result<u64> {
    let value = word_to_uint(word)?;
    u64::try_from(value)
        .map_err(|_| PrivatePayError::AbiDecodeError(format!("{} overflows u64", value)))
}
