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

//! Markdown rendering of a [`ValidationReport`].

use crate::{ChangeEntry, ChangeSection, OverrideSection, ValidationReport};

const INTRODUCTION: &str = "# Validation

This document can be used to validate the inputs and result of the execution of the upgrade transaction which you are signing.

The steps are:

1. [Validate the Domain and Message Hashes](#expected-domain-and-message-hashes)
2. [Verifying the state changes](#state-changes)

## Expected Domain and Message Hashes

First, we need to validate the domain and message hashes. These values should match both the values on your ledger and the values printed to the terminal when you run the task.

> [!CAUTION]
>
> Before signing, ensure the below hashes match what is on your ledger.
>
";

const STATE_VALIDATIONS: &str = "# State Validations

For each contract listed in the state diff, please verify that no contracts or state changes shown in the Tenderly diff are missing from this document. Additionally, please verify that for each contract:

- The following state changes (and none others) are made to that contract. This validates that no unexpected state changes occur.
- All addresses (in section headers and storage values) match the provided name, using the Etherscan and Superchain Registry links provided. This validates the bytecode deployed at the addresses contains the correct logic.
- All key values match the semantic meaning provided, which can be validated using the storage layout links provided.
";

const NONCE_NOTE: &str = "----- Additional Nonce Changes -----
  Details:           You should see a nonce increment for the account you're signing with.";

/// Render the report as Markdown.
///
/// The output only depends on the report, so rendering the same report twice gives the
/// same bytes.
pub fn render_markdown(report: &ValidationReport) -> String {
    let mut out = String::from(INTRODUCTION);

    out.push_str(&format!("> ### {}: `{}`\n", report.target.name, report.target.address));
    out.push_str(">\n");
    out.push_str(&format!("> - Domain Hash: `{}`\n", report.domain_hash));
    out.push_str(&format!("> - Message Hash: `{}`\n", report.message_hash));
    out.push('\n');
    out.push_str(STATE_VALIDATIONS);

    if !report.overrides.is_empty() {
        out.push_str("\n## State Overrides\n");
        for section in &report.overrides {
            write_override_section(&mut out, section);
        }
    }

    out.push_str("\n## Task State Changes\n\n<pre>\n<code>\n");
    let mut index = 0;
    for section in &report.changes {
        for entry in &section.entries {
            write_change(&mut out, report.chain_id, section, entry, index);
            index += 1;
        }
    }
    out.push_str(NONCE_NOTE);
    out.push_str("\n</code>\n</pre>\n");

    out
}

fn write_override_section(out: &mut String, section: &OverrideSection) {
    out.push_str(&format!("\n### {} (`{}`)\n\n", section.contract.name, section.contract.address));
    for entry in &section.entries {
        out.push_str(&format!("- **Key**: `{}` <br/>\n", entry.key));
        out.push_str(&format!("  **Override**: `{}` <br/>\n", entry.value));
        out.push_str(&format!("  **Meaning**: {}\n", entry.meaning));
    }
}

fn write_change(
    out: &mut String,
    chain_id: u64,
    section: &ChangeSection,
    entry: &ChangeEntry,
    index: usize,
) {
    out.push_str(&format!("----- DecodedStateDiff[{index}] -----\n"));
    out.push_str(&format!("  Who:               {}\n", section.contract.address));
    out.push_str(&format!("  Contract:          {}\n", section.contract.general_name));
    out.push_str(&format!("  Chain ID:          {chain_id}\n"));
    out.push_str(&format!("  Raw Slot:          {}\n", entry.key));
    out.push_str(&format!("  Raw Old Value:     {}\n", entry.before));
    out.push_str(&format!("  Raw New Value:     {}\n", entry.after));
    out.push_str(&format!("  Decoded Kind:      {}\n", entry.kind));
    out.push_str(&format!("  Decoded Old Value: {}\n", entry.decoded_before));
    out.push_str(&format!("  Decoded New Value: {}\n", entry.decoded_after));
    out.push('\n');
    out.push_str(&format!("  Summary:           {}\n", entry.summary));
    out.push_str(&format!("  Detail:            {}\n", entry.detail));
    out.push('\n');
}
