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

//! Tests for loading and querying the contract/slot configuration

use alloy_primitives::{address, keccak256, Address, Bytes, B256};
use statediff_report::{
    ConfigError, SlotKind, SlotResolution, ValidationConfig, MAX_PREIMAGE_DEPTH,
    PLACEHOLDER_CONTRACT_NAME, PLACEHOLDER_KIND,
};
use statediff_state::PreimageRegistry;
use std::io::Write;
use tracing::info;

const SAFE: Address = address!("9855054731540a48b28990b63dcf4f33d8ae46a1");
const OTHER_SAFE: Address = address!("1804c8ab1f12e6bbf3894d4083f33e07309d1f38");

const CONFIG: &str = r#"
storage-layouts:
  gnosis-safe:
    "0x04":
      type: uint256
      summary: Threshold
      override-meaning: Override the threshold to 1 so the transaction simulation can occur.
    "0x05":
      type: uint256
      summary: Nonce
    "0x08":
      type: uint256
      summary: Approved hashes mapping
contracts:
  1:
    "0x9855054731540A48b28990B63DcF4f33d8AE46A1":
      name: Incident Multisig
      general-name: Safe
      slots: ${{storage-layouts.gnosis-safe}}
    "0x1804c8ab1f12e6bbf3894d4083f33e07309d1f38":
      name: Signer Safe
      slots:
        "0x0000000000000000000000000000000000000000000000000000000000000004":
          type: address
          summary: Owner
  11155111:
    "0x9855054731540a48b28990b63dcf4f33d8ae46a1":
      name: Testnet Multisig
"#;

fn word(byte: u8) -> B256 {
    B256::with_last_byte(byte)
}

fn mapping_preimage(key: B256, base: B256) -> Bytes {
    [key.as_slice(), base.as_slice()].concat().into()
}

#[test]
fn test_layout_reference_is_substituted() {
    statediff_common::logging::ensure_test_logging(None);
    info!("Testing storage layout substitution");

    let config = ValidationConfig::from_yaml_str(CONFIG).unwrap();
    assert_eq!(config.len(), 3);

    let safe = config.contract(1, SAFE);
    assert_eq!(safe.name, "Incident Multisig");
    assert_eq!(safe.display_name(), "Safe");
    assert_eq!(safe.slots.len(), 3);

    let threshold = &safe.slots[&word(4)];
    assert_eq!(threshold.kind, SlotKind::Uint256);
    assert_eq!(threshold.summary, "Threshold");
    assert_eq!(
        threshold.override_meaning,
        "Override the threshold to 1 so the transaction simulation can occur."
    );
    assert_eq!(safe.slots[&word(5)].override_meaning, "<<OverrideMeaning>>");
}

#[test]
fn test_inline_and_missing_slots() {
    statediff_common::logging::ensure_test_logging(None);

    let config = ValidationConfig::from_yaml_str(CONFIG).unwrap();

    let signer = config.contract(1, OTHER_SAFE);
    assert_eq!(signer.display_name(), "Signer Safe");
    assert_eq!(signer.slots[&word(4)].kind, SlotKind::Address);

    let testnet = config.contract(11_155_111, SAFE);
    assert_eq!(testnet.name, "Testnet Multisig");
    assert!(testnet.slots.is_empty());
}

#[test]
fn test_unconfigured_contract_is_placeholder() {
    statediff_common::logging::ensure_test_logging(None);

    let config = ValidationConfig::from_yaml_str(CONFIG).unwrap();

    for (chain_id, address) in [(10, SAFE), (1, Address::repeat_byte(0x42))] {
        let contract = config.contract(chain_id, address);
        assert_eq!(contract.name, PLACEHOLDER_CONTRACT_NAME);
        assert!(config.get(chain_id, address).is_none());

        let resolution = contract.resolve_slot(word(4), None, &PreimageRegistry::new());
        assert_eq!(resolution, SlotResolution::Unresolved);
        assert_eq!(resolution.slot().kind.to_string(), PLACEHOLDER_KIND);
    }
}

#[test]
fn test_unknown_layout_is_fatal() {
    statediff_common::logging::ensure_test_logging(None);
    info!("Testing unresolved storage layout references");

    let yaml = r#"
contracts:
  1:
    "0x9855054731540a48b28990b63dcf4f33d8ae46a1":
      name: Incident Multisig
      slots: ${{storage-layouts.missing}}
"#;
    let err = ValidationConfig::from_yaml_str(yaml).unwrap_err();
    assert!(matches!(err, ConfigError::UnknownLayout { ref name, .. } if name == "missing"));

    let yaml = r#"
contracts:
  1:
    "0x9855054731540a48b28990b63dcf4f33d8ae46a1":
      slots: gnosis-safe
"#;
    let err = ValidationConfig::from_yaml_str(yaml).unwrap_err();
    assert!(matches!(err, ConfigError::InvalidSlots { .. }));
}

#[test]
fn test_invalid_keys_are_fatal() {
    statediff_common::logging::ensure_test_logging(None);

    let bad_address = "contracts:\n  1:\n    \"0x1234\":\n      name: Short\n";
    assert!(matches!(
        ValidationConfig::from_yaml_str(bad_address),
        Err(ConfigError::InvalidAddress { chain_id: 1, .. })
    ));

    let bad_slot = format!(
        "storage-layouts:\n  wide:\n    \"0x{}\":\n      type: uint256\n",
        "ab".repeat(33)
    );
    assert!(matches!(
        ValidationConfig::from_yaml_str(&bad_slot),
        Err(ConfigError::InvalidSlotKey { .. })
    ));

    assert!(matches!(
        ValidationConfig::from_yaml_str("contracts: [1, 2"),
        Err(ConfigError::Parse(_))
    ));
}

#[test]
fn test_load_from_file() {
    statediff_common::logging::ensure_test_logging(None);

    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(CONFIG.as_bytes()).unwrap();

    let config = ValidationConfig::load(file.path()).unwrap();
    assert_eq!(config.chains().collect::<Vec<_>>(), vec![1, 11_155_111]);

    let missing = file.path().with_extension("missing.yaml");
    assert!(matches!(ValidationConfig::load(&missing), Err(ConfigError::Io { .. })));
}

#[test]
fn test_empty_document_is_empty_config() {
    statediff_common::logging::ensure_test_logging(None);

    let config = ValidationConfig::from_yaml_str("{}").unwrap();
    assert!(config.is_empty());
}

#[test]
fn test_exact_match_beats_preimage() {
    statediff_common::logging::ensure_test_logging(None);
    info!("Testing slot resolution precedence");

    let config = ValidationConfig::from_yaml_str(CONFIG).unwrap();
    let safe = config.contract(1, SAFE);
    let registry = PreimageRegistry::new();

    // A preimage pointing at slot 8 does not matter when slot 4 is configured itself.
    let preimage = mapping_preimage(word(0xaa), word(8));
    let resolution = safe.resolve_slot(word(4), Some(&preimage), &registry);
    assert_eq!(resolution.slot().summary, "Threshold");
    assert!(matches!(resolution, SlotResolution::Exact(_)));
}

#[test]
fn test_mapping_entry_resolves_through_preimage() {
    statediff_common::logging::ensure_test_logging(None);

    let config = ValidationConfig::from_yaml_str(CONFIG).unwrap();
    let safe = config.contract(1, SAFE);

    let preimage = mapping_preimage(word(0xaa), word(8));
    let slot = keccak256(&preimage);

    let resolution = safe.resolve_slot(slot, Some(&preimage), &PreimageRegistry::new());
    assert_eq!(resolution.slot().summary, "Approved hashes mapping");
    assert!(matches!(
        resolution,
        SlotResolution::ViaPreimage { base, depth: 1, .. } if base == word(8)
    ));

    // Same lookup with the preimage only known to the registry
    let mut registry = PreimageRegistry::new();
    registry.record(slot, preimage.clone());
    let resolution = safe.resolve_slot(slot, None, &registry);
    assert!(matches!(resolution, SlotResolution::ViaPreimage { depth: 1, .. }));

    // A preimage of the wrong shape is not a mapping entry
    let odd = Bytes::from(vec![0u8; 63]);
    let resolution = safe.resolve_slot(keccak256(&odd), Some(&odd), &PreimageRegistry::new());
    assert_eq!(resolution, SlotResolution::Unresolved);
}

#[test]
fn test_nested_mapping_resolves_through_registry() {
    statediff_common::logging::ensure_test_logging(None);

    let config = ValidationConfig::from_yaml_str(CONFIG).unwrap();
    let safe = config.contract(1, SAFE);

    // approvedHashes[owner][hash]
    let outer = mapping_preimage(word(0x01), word(8));
    let outer_slot = keccak256(&outer);
    let inner = mapping_preimage(word(0x02), outer_slot);
    let inner_slot = keccak256(&inner);

    let mut registry = PreimageRegistry::new();
    registry.record(outer_slot, outer);
    registry.record(inner_slot, inner.clone());

    let resolution = safe.resolve_slot(inner_slot, Some(&inner), &registry);
    assert!(matches!(
        resolution,
        SlotResolution::ViaPreimage { base, depth: 2, .. } if base == word(8)
    ));
}

#[test]
fn test_preimage_cycle_terminates() {
    statediff_common::logging::ensure_test_logging(None);
    info!("Testing the preimage depth bound");

    let config = ValidationConfig::from_yaml_str(CONFIG).unwrap();
    let safe = config.contract(1, SAFE);

    // Two slots claiming to be each other's mapping base
    let a = B256::repeat_byte(0xa1);
    let b = B256::repeat_byte(0xb2);
    let mut registry = PreimageRegistry::new();
    registry.record(a, mapping_preimage(word(1), b));
    registry.record(b, mapping_preimage(word(1), a));

    assert_eq!(safe.resolve_slot(a, None, &registry), SlotResolution::Unresolved);

    // A chain longer than the bound is not followed to its end
    let mut registry = PreimageRegistry::new();
    let mut base = word(8);
    for _ in 0..=MAX_PREIMAGE_DEPTH {
        let preimage = mapping_preimage(word(1), base);
        base = keccak256(&preimage);
        registry.record(base, preimage);
    }
    assert_eq!(safe.resolve_slot(base, None, &registry), SlotResolution::Unresolved);
}

#[test]
fn test_bundled_config_loads() {
    statediff_common::logging::ensure_test_logging(None);

    let path =
        std::path::Path::new(env!("CARGO_MANIFEST_DIR")).join("../../config/contracts.yaml");
    let config = ValidationConfig::load(path).unwrap();

    let safe = config.contract(1, SAFE);
    assert_eq!(safe.general_name.as_deref(), Some("Safe"));
    let threshold = safe.resolve_slot(word(4), None, &PreimageRegistry::new());
    assert_eq!(threshold.slot().summary, "Threshold");

    let owners = safe.resolve_slot(word(2), None, &PreimageRegistry::new()).slot();
    assert_eq!(owners.kind, SlotKind::Unknown("bytes32".into()));
    assert!(config.get(11_155_111, OTHER_SAFE).is_some());
}
