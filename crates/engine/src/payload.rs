// EDB - Ethereum Debugger
// Copyright (C) 2024 Zhuo Zhang and Wuqi Zhang
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program. If not, see <https://www.gnu.org/licenses/>.

//! Signing payload extraction.
//!
//! Task scripts print the EIP-712 data a signer is about to approve between two marker
//! lines, and a link to a hosted simulation of the call somewhere in their output:
//!
//! ```text
//! vvvvvvvv
//! 0x1901<domain hash><message hash>
//! ^^^^^^^^
//! Simulation link: https://dashboard.tenderly.co/...?network=1&contractAddress=...
//! ```

use crate::PayloadError;
use alloy_primitives::B256;
use std::str::FromStr;
use tracing::warn;

/// Default start marker of the signing data
pub const DEFAULT_PREFIX: &str = "vvvvvvvv";
/// Default end marker of the signing data
pub const DEFAULT_SUFFIX: &str = "^^^^^^^^";
/// Default host prefix of the simulation link
pub const DEFAULT_LINK_HOST: &str = "https://dashboard.tenderly.co";
/// Size of `0x1901 ‖ domainSeparator ‖ structHash`
pub const SIGNING_DATA_LEN: usize = 66;

const EIP712_VERSION: [u8; 2] = [0x19, 0x01];

/// The two hashes a hardware wallet shows when signing a Safe transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SigningPayload {
    /// EIP-712 domain separator
    pub domain_hash: B256,
    /// EIP-712 struct hash of the Safe transaction
    pub message_hash: B256,
}

impl SigningPayload {
    /// Decode `0x1901 ‖ domain ‖ message` from hex, with or without `0x`.
    pub fn from_hex(data: &str) -> Result<Self, PayloadError> {
        let data = data.trim();
        let bytes = hex::decode(data.strip_prefix("0x").unwrap_or(data))
            .map_err(|e| PayloadError::InvalidHex(e.to_string()))?;
        Self::from_bytes(&bytes)
    }

    /// Split the raw signing data into its two hashes.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, PayloadError> {
        if bytes.len() != SIGNING_DATA_LEN {
            return Err(PayloadError::InvalidLength(bytes.len()));
        }
        if bytes[..2] != EIP712_VERSION {
            warn!("Signing data starts with 0x{}, not 0x1901", hex::encode(&bytes[..2]));
        }
        Ok(Self {
            domain_hash: B256::from_slice(&bytes[2..34]),
            message_hash: B256::from_slice(&bytes[34..66]),
        })
    }
}

impl FromStr for SigningPayload {
    type Err = PayloadError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_hex(s)
    }
}

/// Text between the first `prefix` and the next `suffix`, trimmed.
pub fn extract_between<'a>(
    input: &'a str,
    prefix: &str,
    suffix: &str,
) -> Result<&'a str, PayloadError> {
    let start = input
        .find(prefix)
        .map(|index| index + prefix.len())
        .ok_or_else(|| PayloadError::MissingPrefix(prefix.to_string()))?;
    let rest = &input[start..];
    let end = rest.find(suffix).ok_or_else(|| PayloadError::MissingSuffix(suffix.to_string()))?;
    Ok(rest[..end].trim())
}

/// Extract the signing payload printed between the markers.
pub fn extract_signing_payload(
    output: &str,
    prefix: &str,
    suffix: &str,
) -> Result<SigningPayload, PayloadError> {
    SigningPayload::from_hex(extract_between(output, prefix, suffix)?)
}

/// First link starting with `host`, up to the next whitespace.
pub fn find_simulation_link<'a>(output: &'a str, host: &str) -> Option<&'a str> {
    let start = output.find(host)?;
    let rest = &output[start..];
    let end = rest.find(char::is_whitespace).unwrap_or(rest.len());
    Some(&rest[..end])
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::b256;

    const DOMAIN: B256 = b256!("1111111111111111111111111111111111111111111111111111111111111111");
    const MESSAGE: B256 = b256!("2222222222222222222222222222222222222222222222222222222222222222");

    fn signing_hex() -> String {
        format!("0x1901{}{}", hex::encode(DOMAIN), hex::encode(MESSAGE))
    }

    #[test]
    fn test_extracts_hashes_between_markers() {
        let output = format!(
            "Running script...\n{DEFAULT_PREFIX}\n{}\n{DEFAULT_SUFFIX}\nDone\n",
            signing_hex()
        );

        let payload = extract_signing_payload(&output, DEFAULT_PREFIX, DEFAULT_SUFFIX).unwrap();
        assert_eq!(payload.domain_hash, DOMAIN);
        assert_eq!(payload.message_hash, MESSAGE);
    }

    #[test]
    fn test_custom_markers() {
        let output = format!("<<START>>{}<<END>>", signing_hex().trim_start_matches("0x"));
        let payload = extract_signing_payload(&output, "<<START>>", "<<END>>").unwrap();
        assert_eq!(payload.message_hash, MESSAGE);
    }

    #[test]
    fn test_missing_markers() {
        assert_eq!(
            extract_signing_payload("nothing here", DEFAULT_PREFIX, DEFAULT_SUFFIX),
            Err(PayloadError::MissingPrefix(DEFAULT_PREFIX.to_string()))
        );
        assert_eq!(
            extract_signing_payload("vvvvvvvv 0x1901", DEFAULT_PREFIX, DEFAULT_SUFFIX),
            Err(PayloadError::MissingSuffix(DEFAULT_SUFFIX.to_string()))
        );
    }

    #[test]
    fn test_wrong_length_is_rejected() {
        let short = format!("0x1901{}", hex::encode(DOMAIN));
        assert_eq!(SigningPayload::from_hex(&short), Err(PayloadError::InvalidLength(34)));
        assert!(matches!(SigningPayload::from_hex("0xnothex"), Err(PayloadError::InvalidHex(_))));

        let doubled = format!("0x{}", signing_hex());
        assert!(matches!(SigningPayload::from_hex(&doubled), Err(PayloadError::InvalidHex(_))));
    }

    #[test]
    fn test_from_str() {
        let payload: SigningPayload = signing_hex().parse().unwrap();
        assert_eq!(payload.domain_hash, DOMAIN);
    }

    #[test]
    fn test_find_simulation_link() {
        let output = "Simulation link:\n\
            https://dashboard.tenderly.co/o/p/simulator/new?network=1&from=0x1 trailing\nnext";
        assert_eq!(
            find_simulation_link(output, DEFAULT_LINK_HOST),
            Some("https://dashboard.tenderly.co/o/p/simulator/new?network=1&from=0x1")
        );
        assert_eq!(find_simulation_link("no link", DEFAULT_LINK_HOST), None);
    }

    #[test]
    fn test_link_at_end_of_output() {
        let output = "see https://dashboard.tenderly.co/x?network=11155111";
        assert_eq!(
            find_simulation_link(output, DEFAULT_LINK_HOST),
            Some("https://dashboard.tenderly.co/x?network=11155111")
        );
    }
}
