//! Validate command - Check a group file.

use std::path::PathBuf;

use anyhow::Result;
use clap::Args;
use serde::Serialize;

use crate::OutputFormat;
use crate::group_file::GroupFile;

/// Arguments for the validate command.
#[derive(Args)]
pub struct ValidateArgs {
    /// Path to the group file
    #[arg(required = true)]
    pub group: PathBuf,

    /// Treat warnings as errors
    #[arg(long)]
    pub strict: bool,
}

/// Validation result.
#[derive(Debug, Serialize)]
struct ValidationResult {
    valid: bool,
    path: String,
    resources: usize,
    containers: usize,
    slots: usize,
    warnings: Vec<String>,
    errors: Vec<String>,
}

/// Execute the validate command.
pub fn execute(args: ValidateArgs, format: OutputFormat) -> Result<()> {
    let mut result = ValidationResult {
        valid: true,
        path: args.group.display().to_string(),
        resources: 0,
        containers: 0,
        slots: 0,
        warnings: Vec::new(),
        errors: Vec::new(),
    };

    match GroupFile::load(&args.group) {
        Ok(file) => {
            result.resources = file.resources.len();
            result.containers = file.containers.len();
            result.slots = file.containers.iter().map(|c| c.slots.len()).sum();

            let findings = file.check();
            result.errors = findings.errors;
            result.warnings = findings.warnings;
        }
        Err(e) => {
            result.errors.push(format!("{:#}", e));
        }
    }

    result.valid = result.errors.is_empty() && !(args.strict && !result.warnings.is_empty());

    // Output results
    match format {
        OutputFormat::Human => {
            if result.valid {
                println!("Group is valid: {}", args.group.display());
            } else {
                println!("Group is INVALID: {}", args.group.display());
            }
            println!("  Resources: {}", result.resources);
            println!("  Containers: {}", result.containers);
            println!("  Slots: {}", result.slots);

            if !result.warnings.is_empty() {
                println!("\nWarnings:");
                for warning in &result.warnings {
                    println!("  - {}", warning);
                }
            }
            for error in &result.errors {
                println!("  Error: {}", error);
            }
        }
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&result)?);
        }
        OutputFormat::JsonCompact => {
            println!("{}", serde_json::to_string(&result)?);
        }
    }

    if result.valid {
        Ok(())
    } else {
        Err(anyhow::anyhow!("Validation failed"))
    }
}
