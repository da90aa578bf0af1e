//! Catchment identifier list
//!
//! Loads the HUC12 codes the probe samples from, one per line of a text
//! file read once at startup. Entries are kept verbatim; the list never
//! changes after load.

use rand::Rng;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use thiserror::Error;

/// Relative path of the identifier file
pub const HUCS_FILE: &str = "hucs.txt";

/// Identifier file errors
#[derive(Debug, Error)]
pub enum HucError {
    #[error("failed to open {path}: {source}")]
    Open {
        path: String,
        source: std::io::Error,
    },

    #[error("failed to read {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },
}

/// Immutable list of catchment identifiers
#[derive(Debug)]
pub struct HucList {
    entries: Vec<String>,
}

impl HucList {
    pub fn new(entries: Vec<String>) -> Self {
        Self { entries }
    }

    /// Load identifiers from a line-delimited file
    ///
    /// One entry per non-empty line, line terminator stripped, no other
    /// trimming and no deduplication.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, HucError> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|source| HucError::Open {
            path: path.display().to_string(),
            source,
        })?;

        let mut entries = Vec::new();
        for line in BufReader::new(file).lines() {
            let line = line.map_err(|source| HucError::Read {
                path: path.display().to_string(),
                source,
            })?;
            if !line.is_empty() {
                entries.push(line);
            }
        }
        Ok(Self::new(entries))
    }

    /// Pick one identifier uniformly at random
    ///
    /// # Panics
    /// Panics if the list is empty. Startup refuses to serve with an empty
    /// list, so handlers never observe one.
    pub fn pick(&self) -> &str {
        let index = rand::thread_rng().gen_range(0..self.entries.len());
        &self.entries[index]
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn as_slice(&self) -> &[String] {
        &self.entries
    }
}
