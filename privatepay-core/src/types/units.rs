//! Native currency amounts.
//!
//! Amounts are carried as `u128` wei. JSON renders them as decimal strings so
//! values above 2^53 survive JavaScript clients.

use crate::constants::NATIVE_DECIMALS;
use crate::error::{PrivatePayError, Result};

const WEI_PER_UNIT: u128 = 10u128.pow(NATIVE_DECIMALS);

/// Parses a decimal MNT amount (e.g. `"1.25"`) into wei.
pub fn parse_ether(amount: &str) -> Result<u128> {
    let amount = amount.trim();
    if amount.is_empty() {
        return Err(PrivatePayError::InvalidAmount("amount is empty".into()));
    }

    let (whole, frac) = match amount.split_once('.') {
        Some((w, f)) => (w, f),
        None => (amount, ""),
    };
    if whole.is_empty() && frac.is_empty() {
        return Err(PrivatePayError::InvalidAmount(format!("'{}' is not a number", amount)));
    }
    if !whole.chars().all(|c| c.is_ascii_digit()) || !frac.chars().all(|c| c.is_ascii_digit()) {
        return Err(PrivatePayError::InvalidAmount(format!("'{}' is not a number", amount)));
    }
    if frac.len() > NATIVE_DECIMALS as usize {
        return Err(PrivatePayError::InvalidAmount(format!(
            "'{}' has more than {} decimals",
            amount, NATIVE_DECIMALS
        )));
    }

    let overflow = || PrivatePayError::InvalidAmount(format!("'{}' is too large", amount));

    let whole_wei = if whole.is_empty() {
        0
    } else {
        whole
            .parse::<u128>()
            .map_err(|_| overflow())?
            .checked_mul(WEI_PER_UNIT)
            .ok_or_else(overflow)?
    };

    let frac_wei = if frac.is_empty() {
        0
    } else {
        let padded = format!("{:0<width$}", frac, width = NATIVE_DECIMALS as usize);
        padded.parse::<u128>().map_err(|_| overflow())?
    };

    whole_wei.checked_add(frac_wei).ok_or_else(overflow)
}

/// Formats wei as a decimal MNT amount without trailing zeros.
pub fn format_ether(wei: u128) -> String {
    let whole = wei / WEI_PER_UNIT;
    let frac = wei % WEI_PER_UNIT;
    if frac == 0 {
        return whole.to_string();
    }
    let frac = format!("{:0>width$}", frac, width = NATIVE_DECIMALS as usize);
    format!("{}.{}", whole, frac.trim_end_matches('0'))
}

/// Serde adapter rendering `u128` wei as a decimal string.
///
/// Deserialization also accepts plain JSON numbers.
pub mod wei_string {
    use serde::de::{self, Visitor};
    use serde::{Deserializer, Serializer};

    /// Serializes wei as a decimal string.
    pub fn serialize<S>(value: &u128, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&value.to_string())
    }

    /// Deserializes wei from a decimal string or a number.
    pub fn deserialize<'de, D>(deserializer: D) -> Result<u128, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct WeiVisitor;

        impl<'de> Visitor<'de> for WeiVisitor {
            type Value = u128;

            fn expecting(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str("a wei amount as decimal string or integer")
            }

            fn visit_u64<E: de::Error>(self, v: u64) -> Result<u128, E> {
                Ok(v as u128)
            }

            fn visit_u128<E: de::Error>(self, v: u128) -> Result<u128, E> {
                Ok(v)
            }

            fn visit_i64<E: de::Error>(self, v: i64) -> Result<u128, E> {
                u128::try_from(v).map_err(|_| E::custom("amount cannot be negative"))
            }

            fn visit_str<E: de::Error>(self, v: &str) -> Result<u128, E> {
                v.trim().parse::<u128>().map_err(E::custom)
            }
        }

        deserializer.deserialize_any(WeiVisitor)
    }
}

/// [`wei_string`] for optional amounts; `None` is `null`.
pub mod wei_string_opt {
    use serde::{Deserialize, Deserializer, Serializer};

    /// Serializes `Some(wei)` as a decimal string.
    pub fn serialize<S>(value: &Option<u128>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match value {
            Some(v) => super::wei_string::serialize(v, serializer),
            None => serializer.serialize_none(),
        }
    }

    /// Deserializes an optional wei amount.
    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<u128>, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        struct Wei(#[serde(with = "super::wei_string")] u128);

        Ok(Option::<Wei>::deserialize(deserializer)?.map(|w| w.0))
    }
}
