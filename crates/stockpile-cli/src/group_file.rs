//! TOML description of a container group.

use std::collections::{BTreeMap, HashSet};
use std::path::Path;

use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};

use stockpile::prelude::*;
use stockpile::stockpile_core::SlotError;

/// A group file as read from disk.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GroupFile {
    /// Declared resource types.
    #[serde(default)]
    pub resources: Vec<ResourceDef>,
    /// Containers in group order.
    #[serde(default)]
    pub containers: Vec<ContainerDef>,
}

/// A named resource type.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResourceDef {
    /// Display name used by slots and scripts.
    pub name: String,
    /// Numeric resource type id.
    pub id: u32,
}

/// One container and its slots.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContainerDef {
    /// Container id.
    pub id: u64,
    /// Slots in native order.
    #[serde(default)]
    pub slots: Vec<SlotDef>,
}

/// One slot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SlotDef {
    /// Resource name.
    pub resource: String,
    /// Capacity.
    pub capacity: f64,
    /// Stored amount.
    #[serde(default)]
    pub stored: f64,
    /// Reservation ledger.
    #[serde(default, skip_serializing_if = "is_zero")]
    pub reserved: f64,
}

fn is_zero(value: &f64) -> bool {
    *value == 0.0
}

/// Bidirectional resource name lookup.
#[derive(Debug, Clone, Default)]
pub struct ResourceNames {
    by_name: BTreeMap<String, ResourceTypeId>,
    by_id: BTreeMap<ResourceTypeId, String>,
}

impl ResourceNames {
    /// Resolve a name to its id.
    pub fn id(&self, name: &str) -> Option<ResourceTypeId> {
        self.by_name.get(name).copied()
    }

    /// Resolve a name, failing with a readable error.
    pub fn require(&self, name: &str) -> Result<ResourceTypeId> {
        match self.id(name) {
            Some(id) => Ok(id),
            None => bail!("Unknown resource '{}'", name),
        }
    }

    /// Display name of an id, falling back to its numeric form.
    pub fn name(&self, id: ResourceTypeId) -> String {
        self.by_id
            .get(&id)
            .cloned()
            .unwrap_or_else(|| id.to_string())
    }
}

/// Problems found while checking a group file.
#[derive(Debug, Default)]
pub struct Findings {
    /// Problems that make the file unusable.
    pub errors: Vec<String>,
    /// Suspicious but usable content.
    pub warnings: Vec<String>,
}

impl GroupFile {
    /// Read and parse a group file.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read group file {}", path.display()))?;
        toml::from_str(&text)
            .with_context(|| format!("Failed to parse group file {}", path.display()))
    }

    /// Write the file back to disk.
    pub fn save(&self, path: &Path) -> Result<()> {
        let text = toml::to_string_pretty(self).context("Failed to serialize group file")?;
        std::fs::write(path, text)
            .with_context(|| format!("Failed to write group file {}", path.display()))
    }

    /// Build the name lookup, rejecting duplicate names or ids.
    pub fn names(&self) -> Result<ResourceNames> {
        let mut names = ResourceNames::default();
        for resource in &self.resources {
            let id = ResourceTypeId::new(resource.id);
            if names.by_name.insert(resource.name.clone(), id).is_some() {
                bail!("Duplicate resource name '{}'", resource.name);
            }
            if names.by_id.insert(id, resource.name.clone()).is_some() {
                bail!("Duplicate resource id {}", resource.id);
            }
        }
        Ok(names)
    }

    /// Convert into a validated in-memory group.
    pub fn to_group(&self) -> Result<(InMemoryGroup, ResourceNames)> {
        let names = self.names()?;

        let mut containers = Vec::with_capacity(self.containers.len());
        for container in &self.containers {
            let mut slots = Vec::with_capacity(container.slots.len());
            for slot in &container.slots {
                let resource_type = names
                    .require(&slot.resource)
                    .with_context(|| format!("In container {}", container.id))?;
                slots.push(
                    ResourceSlot::new(resource_type, slot.capacity)
                        .with_stored(slot.stored)
                        .with_reserved(slot.reserved),
                );
            }
            containers.push(InMemoryContainer {
                id: ContainerId::new(container.id),
                slots,
            });
        }

        let group = InMemoryGroup::try_from_containers(containers)?;
        Ok((group, names))
    }

    /// Replace slot amounts with those of a group of the same shape.
    pub fn update_from(&mut self, group: &InMemoryGroup, names: &ResourceNames) {
        for (def, container) in self.containers.iter_mut().zip(group.containers()) {
            for (slot_def, slot) in def.slots.iter_mut().zip(&container.slots) {
                slot_def.resource = names.name(slot.resource_type);
                slot_def.stored = slot.stored;
                slot_def.reserved = slot.reserved;
            }
        }
    }

    /// Check the whole file and collect every problem instead of stopping at
    /// the first.
    pub fn check(&self) -> Findings {
        let mut findings = Findings::default();

        let names = match self.names() {
            Ok(names) => names,
            Err(e) => {
                findings.errors.push(e.to_string());
                ResourceNames::default()
            }
        };

        if self.containers.is_empty() {
            findings.warnings.push("Group has no containers".to_string());
        }

        let mut seen = HashSet::new();
        let mut used = HashSet::new();
        for container in &self.containers {
            if !seen.insert(container.id) {
                findings
                    .errors
                    .push(format!("Duplicate container id {}", container.id));
            }
            if container.slots.is_empty() {
                findings
                    .warnings
                    .push(format!("Container {} has no slots", container.id));
            }

            for (index, slot) in container.slots.iter().enumerate() {
                let Some(resource_type) = names.id(&slot.resource) else {
                    findings.errors.push(format!(
                        "Container {} slot {}: unknown resource '{}'",
                        container.id, index, slot.resource
                    ));
                    continue;
                };
                used.insert(resource_type);

                if let Err(e) = ResourceSlot::try_new(
                    resource_type,
                    slot.capacity,
                    slot.stored,
                    slot.reserved,
                ) {
                    findings.errors.push(describe(container.id, index, &e));
                }
                if slot.reserved != 0.0 {
                    findings.warnings.push(format!(
                        "Container {} slot {}: reservation ledger is not settled ({})",
                        container.id, index, slot.reserved
                    ));
                }
            }
        }

        for resource in &self.resources {
            if !used.contains(&ResourceTypeId::new(resource.id)) {
                findings
                    .warnings
                    .push(format!("Resource '{}' is declared but unused", resource.name));
            }
        }

        findings
    }
}

fn describe(container: u64, index: usize, error: &SlotError) -> String {
    format!("Container {} slot {}: {}", container, index, error)
}
