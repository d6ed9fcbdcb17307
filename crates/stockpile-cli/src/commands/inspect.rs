//! Inspect command - Show per-resource totals of a container group.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use serde::Serialize;

use stockpile::prelude::*;

use crate::OutputFormat;
use crate::config::CliConfig;
use crate::group_file::{GroupFile, ResourceNames};

/// Arguments for the inspect command.
#[derive(Args)]
pub struct InspectArgs {
    /// Path to the group file
    #[arg(required = true)]
    pub group: PathBuf,

    /// Show every container's slots
    #[arg(long)]
    pub containers: bool,

    /// Count reservations when reporting empty room
    #[arg(long)]
    pub include_reserved: bool,
}

/// Inspection result.
#[derive(Debug, Serialize)]
struct InspectionResult {
    path: String,
    container_count: usize,
    slot_count: usize,
    resources: Vec<AggregateDisplay>,
    #[serde(skip_serializing_if = "Option::is_none")]
    containers: Option<Vec<ContainerDisplay>>,
}

#[derive(Debug, Serialize)]
struct AggregateDisplay {
    resource: String,
    capacity: f64,
    stored: f64,
    reserved: f64,
    empty: f64,
}

#[derive(Debug, Serialize)]
struct ContainerDisplay {
    id: u64,
    slots: Vec<SlotDisplay>,
}

#[derive(Debug, Serialize)]
struct SlotDisplay {
    resource: String,
    capacity: f64,
    stored: f64,
    reserved: f64,
}

impl SlotDisplay {
    fn new(slot: &ResourceSlot, names: &ResourceNames) -> Self {
        Self {
            resource: names.name(slot.resource_type),
            capacity: slot.capacity,
            stored: slot.stored,
            reserved: slot.reserved,
        }
    }
}

/// Execute the inspect command.
pub fn execute(args: InspectArgs, config: &CliConfig, format: OutputFormat) -> Result<()> {
    let file = GroupFile::load(&args.group)?;
    let (group, names) = file.to_group().context("Invalid group file")?;

    let bridge = SyncBridge::new(config.bridge.clone().with_cache_config(config.cache.clone()));
    let cache = bridge.pull(&group);

    let mut resources = Vec::new();
    for aggregate in cache.aggregates() {
        let empty = cache.empty_units(aggregate.resource_type, args.include_reserved)?;
        resources.push(AggregateDisplay {
            resource: names.name(aggregate.resource_type),
            capacity: aggregate.capacity,
            stored: aggregate.stored,
            reserved: aggregate.reserved,
            empty,
        });
    }

    let containers = args.containers.then(|| {
        cache
            .spans()
            .iter()
            .map(|span| ContainerDisplay {
                id: span.id.raw(),
                slots: cache.slots()[span.range()]
                    .iter()
                    .map(|slot| SlotDisplay::new(slot, &names))
                    .collect(),
            })
            .collect()
    });

    let result = InspectionResult {
        path: args.group.display().to_string(),
        container_count: cache.container_count(),
        slot_count: cache.slot_count(),
        resources,
        containers,
    };
    cache.dispose();

    // Output results
    match format {
        OutputFormat::Human => {
            println!("Group: {}", result.path);
            println!(
                "Containers: {}  Slots: {}",
                result.container_count, result.slot_count
            );
            println!();

            println!("Resources ({}):", result.resources.len());
            for row in &result.resources {
                println!(
                    "  {}: {} / {} stored, {} reserved, {} empty",
                    row.resource, row.stored, row.capacity, row.reserved, row.empty
                );
            }

            if let Some(containers) = &result.containers {
                println!();
                println!("Containers:");
                for container in containers {
                    println!("  [{}]", container.id);
                    for slot in &container.slots {
                        println!(
                            "    {}: {} / {} (reserved {})",
                            slot.resource, slot.stored, slot.capacity, slot.reserved
                        );
                    }
                }
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
