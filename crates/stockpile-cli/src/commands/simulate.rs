//! Simulate command - Run scripted operations against a group in one cycle.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use clap::Args;
use serde::{Deserialize, Serialize};

use stockpile::prelude::*;
use stockpile::stockpile_observe::LoggingSubscriber;

use crate::OutputFormat;
use crate::config::CliConfig;
use crate::group_file::{GroupFile, ResourceNames};

/// Arguments for the simulate command.
#[derive(Args)]
pub struct SimulateArgs {
    /// Path to the group file
    #[arg(required = true)]
    pub group: PathBuf,

    /// Path to the operation script
    #[arg(short, long)]
    pub script: PathBuf,

    /// Write the updated group to this file
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

/// An operation script.
#[derive(Debug, Deserialize)]
pub struct Script {
    /// Operations in execution order.
    #[serde(default)]
    pub ops: Vec<ScriptOp>,
}

impl Script {
    /// Read and parse a script file.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read script {}", path.display()))?;
        Self::parse(&text).with_context(|| format!("Failed to parse script {}", path.display()))
    }

    /// Parse a script, rejecting non-finite amounts.
    pub fn parse(text: &str) -> Result<Self> {
        let script: Self = toml::from_str(text)?;
        for (index, op) in script.ops.iter().enumerate() {
            if let Some(amount) = op.requested().filter(|amount| !amount.is_finite()) {
                bail!("Operation {} ({}) has non-finite amount {}", index, op.name(), amount);
            }
        }
        Ok(script)
    }
}

/// One group-level operation.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum ScriptOp {
    /// Store up to `amount`.
    Add { resource: String, amount: f64 },
    /// Withdraw up to `amount`.
    Remove { resource: String, amount: f64 },
    /// Fill every slot.
    FillToCapacity { resource: String },
    /// Empty every slot.
    RemoveAll { resource: String },
    /// Reserve room for up to `amount`.
    StoreReserved { resource: String, amount: f64 },
    /// Book consumption of up to `amount`.
    ConsumeReserved { resource: String, amount: f64 },
    /// Reconcile the ledger.
    DumpReserved { resource: String },
    /// Zero every ledger.
    Reset,
}

impl ScriptOp {
    fn name(&self) -> &'static str {
        match self {
            ScriptOp::Add { .. } => "add",
            ScriptOp::Remove { .. } => "remove",
            ScriptOp::FillToCapacity { .. } => "fill_to_capacity",
            ScriptOp::RemoveAll { .. } => "remove_all",
            ScriptOp::StoreReserved { .. } => "store_reserved",
            ScriptOp::ConsumeReserved { .. } => "consume_reserved",
            ScriptOp::DumpReserved { .. } => "dump_reserved",
            ScriptOp::Reset => "reset",
        }
    }

    fn resource(&self) -> Option<&str> {
        match self {
            ScriptOp::Add { resource, .. }
            | ScriptOp::Remove { resource, .. }
            | ScriptOp::FillToCapacity { resource }
            | ScriptOp::RemoveAll { resource }
            | ScriptOp::StoreReserved { resource, .. }
            | ScriptOp::ConsumeReserved { resource, .. }
            | ScriptOp::DumpReserved { resource } => Some(resource),
            ScriptOp::Reset => None,
        }
    }

    fn requested(&self) -> Option<f64> {
        match self {
            ScriptOp::Add { amount, .. }
            | ScriptOp::Remove { amount, .. }
            | ScriptOp::StoreReserved { amount, .. }
            | ScriptOp::ConsumeReserved { amount, .. } => Some(*amount),
            _ => None,
        }
    }

    /// Apply the operation and return what the cache reports.
    fn apply(&self, cache: &mut AggregationCache, names: &ResourceNames) -> Result<f64> {
        let ty = match self.resource() {
            Some(name) => names.require(name)?,
            None => {
                cache.reset();
                return Ok(0.0);
            }
        };

        let applied = match self {
            ScriptOp::Add { amount, .. } => cache.add(ty, *amount),
            ScriptOp::Remove { amount, .. } => cache.remove(ty, *amount),
            ScriptOp::FillToCapacity { .. } => cache.fill_to_capacity(ty),
            ScriptOp::RemoveAll { .. } => cache.remove_all(ty),
            ScriptOp::StoreReserved { amount, .. } => cache.store_reserved(ty, *amount),
            ScriptOp::ConsumeReserved { amount, .. } => cache.consume_reserved(ty, *amount),
            ScriptOp::DumpReserved { .. } => cache.dump_reserved(ty),
            ScriptOp::Reset => 0.0,
        };
        Ok(applied)
    }
}

/// Outcome of one scripted operation.
#[derive(Debug, Serialize)]
struct OpResult {
    op: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    resource: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    requested: Option<f64>,
    result: f64,
}

/// Changed pair with a readable resource name.
#[derive(Debug, Serialize)]
struct ChangedDisplay {
    container: u64,
    resource: String,
}

/// Simulation result.
#[derive(Debug, Serialize)]
struct SimulationResult {
    group: String,
    script: String,
    operations: Vec<OpResult>,
    changed: Vec<ChangedDisplay>,
    report: SyncReport,
}

/// Execute the simulate command.
pub fn execute(
    args: SimulateArgs,
    config: &CliConfig,
    format: OutputFormat,
    quiet: bool,
) -> Result<()> {
    let mut file = GroupFile::load(&args.group)?;
    let (mut group, names) = file.to_group().context("Invalid group file")?;
    let script = Script::load(&args.script)?;

    let mut runtime = config.runtime()?;
    runtime
        .event_dispatcher()
        .subscribe(Arc::new(LoggingSubscriber::new()));

    if !quiet {
        tracing::info!(
            group = %args.group.display(),
            operations = script.ops.len(),
            "Running simulation"
        );
    }

    let outcome = runtime.try_run_cycle(&mut group, |cache| {
        script
            .ops
            .iter()
            .map(|op| {
                let result = op.apply(cache, &names)?;
                Ok(OpResult {
                    op: op.name(),
                    resource: op.resource().map(String::from),
                    requested: op.requested(),
                    result,
                })
            })
            .collect::<Result<Vec<_>>>()
    })?;

    let result = SimulationResult {
        group: args.group.display().to_string(),
        script: args.script.display().to_string(),
        changed: outcome
            .report
            .changed
            .iter()
            .map(|&(container, resource_type)| ChangedDisplay {
                container: container.raw(),
                resource: names.name(resource_type),
            })
            .collect(),
        operations: outcome.value,
        report: runtime.sync_report(),
    };

    if let Some(output) = &args.output {
        file.update_from(&group, &names);
        file.save(output)?;
    }
    runtime.dispose();

    // Output results
    match format {
        OutputFormat::Human => {
            println!("Operations ({}):", result.operations.len());
            for op in &result.operations {
                let target = op.resource.as_deref().unwrap_or("*");
                match op.requested {
                    Some(requested) => {
                        println!("  {} {} {} -> {}", op.op, target, requested, op.result)
                    }
                    None => println!("  {} {} -> {}", op.op, target, op.result),
                }
            }

            println!();
            println!("Changed ({}):", result.changed.len());
            for pair in &result.changed {
                println!("  [{}] {}", pair.container, pair.resource);
            }

            if !quiet {
                println!();
                print!("{}", result.report.to_text());
            }
            if let Some(output) = &args.output {
                println!("\nWrote updated group to {}", output.display());
            }
        }
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&result)?);
        }
        OutputFormat::JsonCompact => {
            println!("{}", serde_json::to_string(&result)?);
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_script() {
        let script = Script::parse(
            r#"
            [[ops]]
            op = "add"
            resource = "LiquidFuel"
            amount = 9001.0

            [[ops]]
            op = "fill_to_capacity"
            resource = "Oxidizer"

            [[ops]]
            op = "reset"
            "#,
        )
        .unwrap();

        assert_eq!(script.ops.len(), 3);
        assert_eq!(script.ops[0].name(), "add");
        assert_eq!(script.ops[0].requested(), Some(9001.0));
        assert_eq!(script.ops[1].resource(), Some("Oxidizer"));
        assert_eq!(script.ops[2].resource(), None);
    }

    #[test]
    fn test_non_finite_amount_rejected() {
        for amount in ["nan", "inf", "-inf"] {
            let text = format!(
                r#"
                [[ops]]
                op = "add"
                resource = "LiquidFuel"
                amount = {amount}
                "#
            );
            let err = Script::parse(&text).unwrap_err();
            assert!(err.to_string().contains("non-finite"));
        }
    }

    #[test]
    fn test_apply_script_to_group() {
        let file: GroupFile = toml::from_str(
            r#"
            [[resources]]
            name = "LiquidFuel"
            id = 1

            [[containers]]
            id = 100
            slots = [{ resource = "LiquidFuel", capacity = 800.0, stored = 700.0 }]

            [[containers]]
            id = 101
            slots = [{ resource = "LiquidFuel", capacity = 5120.0, stored = 4000.0 }]
            "#,
        )
        .unwrap();
        let (mut group, names) = file.to_group().unwrap();
        let op = ScriptOp::Add {
            resource: "LiquidFuel".to_string(),
            amount: 9001.0,
        };

        let mut runtime = Stockpile::with_defaults().unwrap();
        let outcome = runtime
            .try_run_cycle(&mut group, |cache| op.apply(cache, &names))
            .unwrap();

        assert_eq!(outcome.value, 1220.0);
        assert_eq!(outcome.report.changed.len(), 2);
    }

    #[test]
    fn test_unknown_resource_leaves_group_untouched() {
        let file: GroupFile = toml::from_str(
            r#"
            [[resources]]
            name = "LiquidFuel"
            id = 1

            [[containers]]
            id = 100
            slots = [{ resource = "LiquidFuel", capacity = 10.0, stored = 7.0 }]
            "#,
        )
        .unwrap();
        let (mut group, names) = file.to_group().unwrap();
        let before = group.clone();
        let ops = vec![
            ScriptOp::RemoveAll {
                resource: "LiquidFuel".to_string(),
            },
            ScriptOp::Add {
                resource: "Ore".to_string(),
                amount: 1.0,
            },
        ];

        let mut runtime = Stockpile::with_defaults().unwrap();
        let result = runtime.try_run_cycle(&mut group, |cache| {
            ops.iter()
                .map(|op| op.apply(cache, &names))
                .collect::<Result<Vec<_>>>()
        });

        assert!(result.is_err());
        assert_eq!(group, before);
    }
}
