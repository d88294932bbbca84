//! Batch File Loading
//!
//! YAML batch definitions for the CLI: a list of commands plus optional
//! run parameters.
//!
//! # Example YAML Format
//!
//! ```yaml
//! concurrency: 4
//! retries: 2
//!
//! commands:
//!   - [fastqc, sample1.fastq]
//!   - [fastqc, sample2.fastq]
//!   - [samtools, index, sample1.bam]
//! ```

use std::error::Error;
use std::fs;

use log::info;
use serde::Deserialize;

use crate::queue::RunOptions;

/// Default concurrency cap when the batch file does not set one.
fn default_concurrency() -> usize {
    4
}

fn default_capture() -> bool {
    true
}

/// A parsed batch file.
#[derive(Debug, Clone, Deserialize)]
pub struct BatchFile {
    /// Commands to run, each as an argv list.
    pub commands: Vec<Vec<String>>,

    /// Concurrency cap (default: 4).
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,

    /// Retry budget per command (default: 0).
    #[serde(default)]
    pub retries: u32,

    /// Run commands through the platform shell (default: false).
    #[serde(default)]
    pub shell: bool,

    /// Capture merged output (default: true).
    #[serde(default = "default_capture")]
    pub capture_output: bool,
}

impl BatchFile {
    /// Builds run options from the file's parameters.
    pub fn run_options(&self) -> RunOptions {
        RunOptions::new(self.concurrency)
            .with_shell(self.shell)
            .with_capture_output(self.capture_output)
            .with_retries(self.retries)
    }
}

/// Loads and parses a batch file.
///
/// # Arguments
///
/// * `path` - Path to the batch YAML file
///
/// # Returns
///
/// * `Ok(BatchFile)` - Successfully loaded batch
/// * `Err` - Read or parse error, or a batch with no commands
pub fn load_batch(path: &str) -> Result<BatchFile, Box<dyn Error>> {
    info!("Loading batch from: {}", path);

    let yaml_content = fs::read_to_string(path).map_err(|e| {
        format!(
            "Failed to read batch file '{}': {}. Check that the file exists and is readable.",
            path, e
        )
    })?;

    let batch: BatchFile = serde_yaml::from_str(&yaml_content)
        .map_err(|e| format!("Failed to parse batch file '{}': {}", path, e))?;

    if batch.commands.is_empty() {
        return Err(format!("Batch file '{}' contains no commands", path).into());
    }

    for (index, argv) in batch.commands.iter().enumerate() {
        if argv.is_empty() {
            return Err(format!(
                "Batch file '{}': command #{} is empty",
                path,
                index + 1
            )
            .into());
        }
    }

    info!("Loaded {} command(s)", batch.commands.len());

    Ok(batch)
}
