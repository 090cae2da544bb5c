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

//! statediff - state diff validation generator
//!
//! Runs a task script (or reads its output), simulates the Safe transaction it prepares
//! on top of the latest block, and writes a report of every storage slot the
//! transaction changes, for signers to check before approving.

use clap::Parser;
use eyre::{eyre, Result, WrapErr};
use statediff_common::env::{ETH_RPC_URL, STATEDIFF_CONFIG, STATEDIFF_LINK_HOST};
use statediff_engine::{
    Engine, EngineConfig, DEFAULT_GAS_LIMIT, DEFAULT_LINK_HOST, DEFAULT_PREFIX, DEFAULT_SUFFIX,
};
use statediff_report::{ReportInputs, TaskMetadata, ValidationConfig, ValidationReport};
use statediff_state::FetchPolicy;
use std::path::PathBuf;

mod input;
mod output;

use output::OutputFormat;

/// Command-line interface for statediff
#[derive(Debug, Parser)]
#[command(name = "statediff")]
#[command(about = "State diff validation generator - simulates a Safe transaction and documents its state changes")]
#[command(version)]
pub struct Cli {
    /// Ethereum RPC endpoint
    #[arg(long = "rpc", env = ETH_RPC_URL)]
    pub rpc_url: Option<String>,

    /// Marker printed by the script before the signing data
    #[arg(long, default_value = DEFAULT_PREFIX)]
    pub prefix: String,

    /// Marker printed by the script after the signing data
    #[arg(long, default_value = DEFAULT_SUFFIX)]
    pub suffix: String,

    /// Directory in which to run the script
    #[arg(long, default_value = ".")]
    pub workdir: PathBuf,

    /// Output file path (default: stdout)
    #[arg(short = 'o', long)]
    pub output: Option<PathBuf>,

    /// Output format
    #[arg(long, value_enum, default_value = "tool")]
    pub format: OutputFormat,

    /// Contracts and storage layouts configuration
    #[arg(long, env = STATEDIFF_CONFIG, default_value = "config/contracts.yaml")]
    pub config: PathBuf,

    /// Use pre-extracted data instead of running a script
    #[arg(long)]
    pub use_extracted: bool,

    /// EIP-712 signing data (hex string, 66 bytes)
    #[arg(long)]
    pub signing_data: Option<String>,

    /// Simulation link to take the call from
    #[arg(long, visible_alias = "tenderly-link")]
    pub simulation_link: Option<String>,

    /// State overrides JSON, used when the simulation link carries none
    #[arg(long)]
    pub state_overrides: Option<String>,

    /// Raw function input
    #[arg(long)]
    pub raw_input: Option<String>,

    /// Sender address for the simulation
    #[arg(long)]
    pub sender: Option<String>,

    /// Network ID
    #[arg(long)]
    pub network: Option<String>,

    /// Contract address
    #[arg(long)]
    pub contract: Option<String>,

    /// Host prefix identifying the simulation link in the script output
    #[arg(long, env = STATEDIFF_LINK_HOST, default_value = DEFAULT_LINK_HOST)]
    pub link_host: String,

    /// Abort instead of using zero values when a state fetch fails
    #[arg(long)]
    pub strict_fetch: bool,

    /// Gas limit of the simulated call
    #[arg(long, default_value_t = DEFAULT_GAS_LIMIT)]
    pub gas_limit: u64,

    /// Task name recorded in the json format
    #[arg(long, default_value = "")]
    pub task_name: String,

    /// Script name recorded in the json format
    #[arg(long, default_value = "")]
    pub script_name: String,

    /// Script signature recorded in the json format
    #[arg(long, default_value = "")]
    pub signature: String,

    /// Script arguments recorded in the json format
    #[arg(long = "args", default_value = "")]
    pub script_args: String,

    /// Expected nested hash recorded in the json format
    #[arg(long, default_value = "")]
    pub expected_nested_hash: String,

    /// Also write logs to a daily rotated file
    #[arg(long)]
    pub log_file: bool,

    /// Task script to run, with its arguments (default: read its output from stdin)
    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    pub command: Vec<String>,
}

impl Cli {
    fn engine_config(&self) -> EngineConfig {
        let policy = if self.strict_fetch { FetchPolicy::Strict } else { FetchPolicy::Degrade };
        EngineConfig::default()
            .with_gas_limit(self.gas_limit)
            .with_fetch_policy(policy)
            .with_markers(self.prefix.clone(), self.suffix.clone())
            .with_link_host(self.link_host.clone())
    }

    fn task_metadata(&self) -> TaskMetadata {
        TaskMetadata {
            task_name: self.task_name.clone(),
            script_name: self.script_name.clone(),
            signature: self.signature.clone(),
            args: self.script_args.clone(),
            expected_nested_hash: self.expected_nested_hash.clone(),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables
    dotenv::dotenv().ok();

    // Parse CLI arguments
    let cli = Cli::parse();

    statediff_common::logging::init_logging("statediff", cli.log_file)?;

    let rpc_url = cli
        .rpc_url
        .clone()
        .filter(|url| !url.trim().is_empty())
        .ok_or_else(|| eyre!("RPC URL is required: pass --rpc or set {ETH_RPC_URL}"))?;

    // Configuration problems surface before any simulation work
    let config = ValidationConfig::load(&cli.config)
        .wrap_err_with(|| format!("Failed to load configuration from {}", cli.config.display()))?;

    let engine = Engine::new(cli.engine_config());
    let task = input::acquire_task(&cli, &engine)?;

    tracing::info!(
        "Domain hash {}, message hash {}",
        task.payload.domain_hash,
        task.payload.message_hash
    );

    let run = engine.run(&rpc_url, &task.params).await?;
    tracing::info!(
        "Transaction simulated successfully on chain {} at block {}",
        run.fork_info.chain_id,
        run.fork_info.block_number
    );

    let report = ValidationReport::build(
        &config,
        ReportInputs {
            chain_id: run.fork_info.chain_id,
            target_safe: run.target_safe,
            domain_hash: task.payload.domain_hash,
            message_hash: task.payload.message_hash,
            overrides: &run.outcome.overrides,
            diffs: &run.outcome.diffs,
            preimages: &run.outcome.preimages,
        },
    );

    let rendered = output::render(&report, cli.format, cli.task_metadata())?;
    output::write_report(&rendered, cli.output.as_deref())?;

    if run.outcome.fetch_failures > 0 {
        tracing::warn!(
            "{} state fetch(es) failed and were read as zero; review the report with care",
            run.outcome.fetch_failures
        );
    }

    Ok(())
}
