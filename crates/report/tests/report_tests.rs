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

//! Tests for the report model and its renderers

use alloy_primitives::{address, b256, keccak256, Address, Bytes, B256};
use statediff_report::{
    render_markdown, to_pretty_json, FormattedReport, ReportInputs, SlotKind, TaskMetadata,
    ToolReport, ValidationConfig, ValidationReport, PLACEHOLDER_DETAIL,
};
use statediff_state::{
    CachingStateStore, InMemoryFetcher, Override, PreimageRegistry, StateDiff, StorageDiff,
    StorageOverride,
};
use tracing::info;

const SAFE: Address = address!("9855054731540a48b28990b63dcf4f33d8ae46a1");
const PROXY: Address = address!("1804c8ab1f12e6bbf3894d4083f33e07309d1f38");
const UNKNOWN: Address = address!("00000000000000000000000000000000000000aa");

const DOMAIN: B256 = b256!("1111111111111111111111111111111111111111111111111111111111111111");
const MESSAGE: B256 = b256!("2222222222222222222222222222222222222222222222222222222222222222");

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
      type: bool
      summary: Approved hashes
contracts:
  1:
    "0x9855054731540a48b28990b63dcf4f33d8ae46a1":
      name: Incident Multisig
      general-name: Safe
      slots: ${{storage-layouts.gnosis-safe}}
    "0x1804c8ab1f12e6bbf3894d4083f33e07309d1f38":
      name: System Config Proxy
      general-name: Proxy
      slots:
        "0x360894a13ba1a3210667c828492db98dca3e2076cc3735a920a3ca505d382bbc":
          type: address
          summary: Implementation
"#;

fn word(byte: u8) -> B256 {
    B256::with_last_byte(byte)
}

fn storage(key: B256, before: B256, after: B256) -> StorageDiff {
    StorageDiff { key, value_before: before, value_after: after, preimage: None }
}

fn state_diff(address: Address, entries: Vec<StorageDiff>) -> StateDiff {
    let mut diff = StateDiff::new(address);
    diff.storage = entries.into_iter().map(|entry| (entry.key, entry)).collect();
    diff
}

fn build(
    config: &ValidationConfig,
    overrides: &[Override],
    diffs: &[StateDiff],
    preimages: &PreimageRegistry,
) -> ValidationReport {
    ValidationReport::build(
        config,
        ReportInputs {
            chain_id: 1,
            target_safe: SAFE,
            domain_hash: DOMAIN,
            message_hash: MESSAGE,
            overrides,
            diffs,
            preimages,
        },
    )
}

fn sample_diffs() -> Vec<StateDiff> {
    vec![
        state_diff(
            SAFE,
            vec![
                storage(word(5), word(7), word(8)),
                storage(word(4), word(2), word(2)),
            ],
        ),
        state_diff(UNKNOWN, vec![storage(word(1), word(0), word(0x2a))]),
        state_diff(
            PROXY,
            vec![storage(
                b256!("360894a13ba1a3210667c828492db98dca3e2076cc3735a920a3ca505d382bbc"),
                b256!("000000000000000000000000340f923e5c7cbb2171146f64169ec9d5a9ffe647"),
                b256!("00000000000000000000000078ffe9209dff6fe1c9b6f3efdf996bee60346d0e"),
            )],
        ),
        state_diff(address!("00000000000000000000000000000000000000bb"), vec![storage(
            word(1),
            word(3),
            word(3),
        )]),
    ]
}

fn threshold_override() -> Vec<Override> {
    vec![Override {
        contract_address: SAFE,
        storage: vec![StorageOverride { key: word(4), value: word(1) }],
    }]
}

#[test]
fn test_model_is_sorted_and_denoised() {
    statediff_common::logging::ensure_test_logging(None);
    info!("Testing report normalization");

    let config = ValidationConfig::from_yaml_str(CONFIG).unwrap();
    let report = build(&config, &[], &sample_diffs(), &PreimageRegistry::new());

    let addresses: Vec<_> = report.changes.iter().map(|s| s.contract.address).collect();
    assert_eq!(addresses, vec![UNKNOWN, PROXY, SAFE]);
    assert_eq!(report.change_count(), 3);

    // Only the nonce changed on the Safe; the threshold write was a no-op
    let safe = &report.changes[2];
    assert_eq!(safe.entries.len(), 1);
    assert_eq!(safe.entries[0].key, word(5));
    assert_eq!(safe.entries[0].decoded_before, "7");
    assert_eq!(safe.entries[0].decoded_after, "8");
    assert_eq!(safe.contract.general_name, "Safe");

    let proxy = &report.changes[1];
    assert_eq!(proxy.entries[0].kind, SlotKind::Address);
    assert_eq!(
        proxy.entries[0].decoded_after.to_lowercase(),
        "0x78ffe9209dff6fe1c9b6f3efdf996bee60346d0e"
    );

    let unknown = &report.changes[0];
    assert_eq!(unknown.contract.name, "<<ContractName>>");
    assert_eq!(unknown.entries[0].kind.to_string(), "<<DecodedKind>>");
    assert_eq!(unknown.entries[0].decoded_after, "<<DecodedValue>>");
    assert_eq!(unknown.entries[0].summary, "<<Summary>>");
    assert_eq!(unknown.entries[0].detail, PLACEHOLDER_DETAIL);

    assert_eq!(report.target.name, "Incident Multisig");
}

#[test]
fn test_override_then_identical_write_is_not_a_change() {
    statediff_common::logging::ensure_test_logging(None);
    info!("Testing that an override rewritten with the same value disappears");

    let contract = Address::repeat_byte(0xaa);
    let mut store = CachingStateStore::new(
        InMemoryFetcher::new().with_storage(contract, word(3), word(9)),
    );
    store.apply_overrides(vec![Override {
        contract_address: contract,
        storage: vec![StorageOverride { key: word(3), value: word(1) }],
    }]);
    store.set_storage(contract, word(3), word(1)).unwrap();

    let (diffs, overrides, preimages) = store.into_parts();
    let config = ValidationConfig::default();
    let report = build(&config, &overrides, &diffs, &preimages);

    assert!(report.changes.is_empty());
    assert_eq!(report.overrides.len(), 1);
    assert_eq!(report.overrides[0].entries[0].value, word(1));
}

#[test]
fn test_overrides_are_merged_and_sorted() {
    statediff_common::logging::ensure_test_logging(None);

    let config = ValidationConfig::from_yaml_str(CONFIG).unwrap();
    let overrides = vec![
        Override {
            contract_address: SAFE,
            storage: vec![
                StorageOverride { key: word(5), value: word(3) },
                StorageOverride { key: word(4), value: word(1) },
            ],
        },
        Override { contract_address: UNKNOWN, storage: vec![] },
        Override {
            contract_address: PROXY,
            storage: vec![StorageOverride { key: word(1), value: word(1) }],
        },
        Override {
            contract_address: SAFE,
            storage: vec![StorageOverride { key: word(5), value: word(4) }],
        },
    ];
    let report = build(&config, &overrides, &[], &PreimageRegistry::new());

    let addresses: Vec<_> = report.overrides.iter().map(|s| s.contract.address).collect();
    assert_eq!(addresses, vec![PROXY, SAFE]);

    let safe = &report.overrides[1];
    assert_eq!(safe.entries.iter().map(|e| e.key).collect::<Vec<_>>(), vec![word(4), word(5)]);
    assert_eq!(safe.entries[1].value, word(4));
    assert_eq!(
        safe.entries[0].meaning,
        "Override the threshold to 1 so the transaction simulation can occur."
    );
    assert_eq!(report.overrides[0].entries[0].meaning, "<<OverrideMeaning>>");
}

#[test]
fn test_sections_follow_checksummed_address_order() {
    statediff_common::logging::ensure_test_logging(None);
    info!("Testing that sections sort by the address string they print");

    // Byte order puts 0x0a.. first, the checksummed strings put 0x0B.. first
    let lower = address!("0a00000000000000000000000000000000000000");
    let upper = address!("0b00000000000000000000000000000000000000");
    let printed = |address: Address| address.to_checksum(None);
    assert!(printed(upper) < printed(lower));

    let diffs = vec![
        state_diff(lower, vec![storage(word(1), word(0), word(1))]),
        state_diff(upper, vec![storage(word(1), word(0), word(2))]),
    ];
    let overrides = vec![
        Override {
            contract_address: lower,
            storage: vec![StorageOverride { key: word(1), value: word(0) }],
        },
        Override {
            contract_address: upper,
            storage: vec![StorageOverride { key: word(1), value: word(0) }],
        },
    ];
    let report = build(&ValidationConfig::default(), &overrides, &diffs, &PreimageRegistry::new());

    let changes: Vec<_> = report.changes.iter().map(|s| s.contract.address).collect();
    assert_eq!(changes, vec![upper, lower]);
    let forced: Vec<_> = report.overrides.iter().map(|s| s.contract.address).collect();
    assert_eq!(forced, vec![upper, lower]);

    let markdown = render_markdown(&report);
    let first = markdown.find(&printed(upper)).unwrap();
    let second = markdown.find(&printed(lower)).unwrap();
    assert!(first < second);
}

#[test]
fn test_mapping_entry_is_labelled_from_base_slot() {
    statediff_common::logging::ensure_test_logging(None);

    let config = ValidationConfig::from_yaml_str(CONFIG).unwrap();
    let preimage: Bytes = [word(0x77).as_slice(), word(8).as_slice()].concat().into();
    let slot = keccak256(&preimage);

    let mut entry = storage(slot, word(0), word(1));
    entry.preimage = Some(preimage);
    let report = build(&config, &[], &[state_diff(SAFE, vec![entry])], &PreimageRegistry::new());

    let change = &report.changes[0].entries[0];
    assert_eq!(change.summary, "Approved hashes");
    assert_eq!(change.kind, SlotKind::Unknown("bool".to_string()));
    assert_eq!(change.detail, format!("Mapping entry under base slot {}", word(8)));
}

#[test]
fn test_markdown_layout() {
    statediff_common::logging::ensure_test_logging(None);
    info!("Testing Markdown rendering");

    let config = ValidationConfig::from_yaml_str(CONFIG).unwrap();
    let report =
        build(&config, &threshold_override(), &sample_diffs(), &PreimageRegistry::new());
    let markdown = render_markdown(&report);

    assert!(markdown.starts_with("# Validation\n"));
    assert!(markdown.contains(&format!(
        "> ### Incident Multisig: `{SAFE}`\n>\n> - Domain Hash: `{DOMAIN}`\n> - Message Hash: `{MESSAGE}`\n"
    )));
    assert!(markdown.contains("## State Overrides"));
    assert!(markdown.contains(&format!("### Incident Multisig (`{SAFE}`)")));
    assert!(markdown.contains(&format!("- **Key**: `{}` <br/>", word(4))));

    assert!(markdown.contains("----- DecodedStateDiff[0] -----"));
    assert!(markdown.contains("----- DecodedStateDiff[2] -----"));
    assert!(!markdown.contains("----- DecodedStateDiff[3] -----"));
    assert!(markdown.contains("  Contract:          Safe\n"));
    assert!(markdown.contains("  Chain ID:          1\n"));
    assert!(markdown.contains("  Decoded New Value: 8\n"));
    assert!(markdown.contains("  Summary:           Nonce\n"));

    // Sections appear by address
    let unknown = markdown.find(&format!("Who:               {UNKNOWN}")).unwrap();
    let safe = markdown.find(&format!("Who:               {SAFE}")).unwrap();
    assert!(unknown < safe);

    assert!(markdown.ends_with(
        "You should see a nonce increment for the account you're signing with.\n</code>\n</pre>\n"
    ));
}

#[test]
fn test_markdown_without_overrides_has_no_override_section() {
    statediff_common::logging::ensure_test_logging(None);

    let config = ValidationConfig::from_yaml_str(CONFIG).unwrap();
    let report = build(&config, &[], &sample_diffs(), &PreimageRegistry::new());
    let markdown = render_markdown(&report);

    assert!(!markdown.contains("State Overrides"));
    assert!(markdown.contains("## Task State Changes"));
}

#[test]
fn test_rendering_is_deterministic() {
    statediff_common::logging::ensure_test_logging(None);
    info!("Testing byte-identical re-rendering");

    let config = ValidationConfig::from_yaml_str(CONFIG).unwrap();
    let mut diffs = sample_diffs();
    let first = build(&config, &threshold_override(), &diffs, &PreimageRegistry::new());

    diffs.reverse();
    let second = build(&config, &threshold_override(), &diffs, &PreimageRegistry::new());

    assert_eq!(first, second);
    assert_eq!(render_markdown(&first), render_markdown(&second));
    assert_eq!(
        to_pretty_json(&ToolReport::from(&first)).unwrap(),
        to_pretty_json(&ToolReport::from(&second)).unwrap()
    );
}

#[test]
fn test_tool_json_shape() {
    statediff_common::logging::ensure_test_logging(None);

    let config = ValidationConfig::from_yaml_str(CONFIG).unwrap();
    let report =
        build(&config, &threshold_override(), &sample_diffs(), &PreimageRegistry::new());
    let json = serde_json::to_value(ToolReport::from(&report)).unwrap();

    assert_eq!(json["domain_hash"], DOMAIN.to_string());
    assert_eq!(json["message_hash"], MESSAGE.to_string());
    assert_eq!(json["target_safe"], SAFE.to_string());

    let overrides = json["state_overrides"].as_array().unwrap();
    assert_eq!(overrides.len(), 1);
    assert_eq!(overrides[0]["name"], "Incident Multisig");
    assert_eq!(overrides[0]["overrides"][0]["key"], word(4).to_string());
    assert_eq!(overrides[0]["overrides"][0]["value"], word(1).to_string());

    let changes = json["state_changes"].as_array().unwrap();
    assert_eq!(changes.len(), 3);
    assert_eq!(changes[2]["address"], SAFE.to_string());
    assert_eq!(changes[2]["changes"][0]["before"], word(7).to_string());
    assert_eq!(changes[2]["changes"][0]["after"], word(8).to_string());
    assert_eq!(changes[2]["changes"][0]["description"], "Nonce");
}

#[test]
fn test_formatted_json_carries_metadata() {
    statediff_common::logging::ensure_test_logging(None);

    let config = ValidationConfig::from_yaml_str(CONFIG).unwrap();
    let report = build(&config, &[], &sample_diffs(), &PreimageRegistry::new());

    let empty =
        serde_json::to_value(FormattedReport::new(&report, TaskMetadata::default())).unwrap();
    assert_eq!(empty["task_name"], "");
    assert_eq!(empty["expected_nested_hash"], "");
    assert_eq!(empty["expected_domain_and_message_hashes"]["address"], SAFE.to_string());
    assert_eq!(empty["expected_domain_and_message_hashes"]["domain_hash"], DOMAIN.to_string());
    assert_eq!(empty["state_overrides"], serde_json::json!([]));

    let metadata = TaskMetadata {
        task_name: "upgrade-system-config".into(),
        script_name: "UpgradeSystemConfig".into(),
        signature: "sign(address[])".into(),
        args: "[]".into(),
        expected_nested_hash: String::new(),
    };
    let formatted = FormattedReport::new(&report, metadata);
    assert_eq!(formatted.task_name, "upgrade-system-config");
    assert_eq!(formatted.state_changes.len(), 3);

    let json = to_pretty_json(&formatted).unwrap();
    assert!(json.ends_with("}\n"));
    let parsed: FormattedReport = serde_json::from_str(&json).unwrap();
    assert_eq!(parsed, formatted);
}
