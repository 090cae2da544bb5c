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

//! Acquisition of the task to validate.
//!
//! By default the task script is run and its output searched for the signing data and
//! the simulation link. With `--use-extracted` both come from flags instead.

use crate::Cli;
use eyre::{bail, eyre, Result, WrapErr};
use statediff_engine::{
    parse_address, parse_bytes, Engine, ExtractedTask, SigningPayload, SimulationParams,
};
use std::{
    io::{self, BufRead, BufReader, Read, Write},
    path::Path,
    process::{Command, Stdio},
};
use tracing::{debug, info};

/// Find the signing payload and the call to simulate.
pub fn acquire_task(cli: &Cli, engine: &Engine) -> Result<ExtractedTask> {
    let mut task = if cli.use_extracted {
        extracted_task(cli)?
    } else {
        let output = if cli.command.is_empty() {
            info!("No script given, reading its output from stdin");
            read_stdin()?
        } else {
            run_script(&cli.command, &cli.workdir)?
        };
        engine.extract(&output).wrap_err("Failed to extract the task from the script output")?
    };

    if task.params.state_overrides.is_none() {
        if let Some(overrides) = &cli.state_overrides {
            task.params.state_overrides = Some(overrides.clone());
        }
    }

    debug!(?task, "Acquired task");
    Ok(task)
}

/// Build the task from `--signing-data`, `--sender` and the call flags.
///
/// A simulation link, when given, supplies whatever the call flags leave out.
pub fn extracted_task(cli: &Cli) -> Result<ExtractedTask> {
    let (Some(signing_data), Some(sender)) = (&cli.signing_data, &cli.sender) else {
        bail!("When using extracted data, --signing-data and --sender are required");
    };

    let payload: SigningPayload =
        signing_data.parse().wrap_err("Failed to parse the signing data")?;

    let mut params = match &cli.simulation_link {
        Some(link) => {
            info!("Simulation link: {link}");
            SimulationParams::from_link(link)?
        }
        None => {
            let contract = cli
                .contract
                .as_deref()
                .ok_or_else(|| eyre!("--contract is required without a simulation link"))?;
            let input = cli
                .raw_input
                .as_deref()
                .ok_or_else(|| eyre!("--raw-input is required without a simulation link"))?;
            SimulationParams::new(
                parse_address("from", sender)?,
                parse_address("contractAddress", contract)?,
                parse_bytes("rawFunctionInput", input)?,
            )
        }
    };

    params.from = parse_address("from", sender)?;
    if let Some(contract) = &cli.contract {
        params.contract = parse_address("contractAddress", contract)?;
    }
    if let Some(input) = &cli.raw_input {
        params.input = parse_bytes("rawFunctionInput", input)?;
    }
    if let Some(network) = &cli.network {
        params.network = Some(network.clone());
    }

    Ok(ExtractedTask { payload, params })
}

/// Run the task script in `workdir`, echoing its output to stderr and returning it.
///
/// Stdout is reserved for the report, so the script's output is not passed through there.
pub fn run_script(command: &[String], workdir: &Path) -> Result<String> {
    let (program, args) = command.split_first().ok_or_else(|| eyre!("No script to run"))?;
    info!("Running {} in {}", command.join(" "), workdir.display());

    let mut child = Command::new(program)
        .args(args)
        .current_dir(workdir)
        .stdin(Stdio::inherit())
        .stdout(Stdio::piped())
        .stderr(Stdio::inherit())
        .spawn()
        .wrap_err_with(|| format!("Failed to start {program}"))?;

    let stdout = child.stdout.take().ok_or_else(|| eyre!("Script stdout was not captured"))?;
    let mut captured = String::new();
    let mut echo = io::stderr().lock();
    for line in BufReader::new(stdout).lines() {
        let line = line.wrap_err("Failed to read script output")?;
        writeln!(echo, "{line}")?;
        captured.push_str(&line);
        captured.push('\n');
    }

    let status = child.wait().wrap_err("Failed to wait for the script")?;
    if !status.success() {
        bail!("{program} exited with {status}");
    }

    Ok(captured)
}

/// Read the task script's output from stdin.
pub fn read_stdin() -> Result<String> {
    let mut output = String::new();
    io::stdin().lock().read_to_string(&mut output).wrap_err("Failed to read stdin")?;
    Ok(output)
}
