//! Runtime settings for the hierarchy engine.

use crate::error::{HierarchyError, Result};
use crate::tree::OrphanPolicy;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

const DEFAULT_MAX_DEPTH: u32 = 64;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct HierarchyConfig {
    /// Upper bound on parent-chain walks and on nesting of new folders.
    /// Lowering it below the level of folders already on disk leaves those
    /// folders in place, but their depth reads as -1 and their breadcrumbs
    /// and descendancy checks come back empty; `verify_integrity` lists them
    /// under `too_deep`.
    pub max_depth: u32,
    /// What the tree builder does with folders whose parent is out of scope
    pub orphan_policy: OrphanPolicy,
    /// Whether name search also matches descriptions
    pub search_descriptions: bool,
    /// Where `folders.json` lives; `None` keeps the store in memory
    pub data_dir: Option<PathBuf>,
}

impl Default for HierarchyConfig {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
            orphan_policy: OrphanPolicy::Exclude,
            search_descriptions: true,
            data_dir: None,
        }
    }
}

impl HierarchyConfig {
    /// Read `FOLDER_HUB_*` environment variables, falling back to defaults.
    pub fn from_env() -> Result<Self> {
        let defaults = Self::default();
        let max_depth = match std::env::var("FOLDER_HUB_MAX_DEPTH") {
            Ok(v) => v
                .parse()
                .map_err(|_| HierarchyError::Config(format!("invalid FOLDER_HUB_MAX_DEPTH: {}", v)))?,
            Err(_) => defaults.max_depth,
        };
        let orphan_policy = match std::env::var("FOLDER_HUB_ORPHAN_POLICY") {
            Ok(v) => OrphanPolicy::parse(&v).ok_or_else(|| {
                HierarchyError::Config(format!("invalid FOLDER_HUB_ORPHAN_POLICY: {}", v))
            })?,
            Err(_) => defaults.orphan_policy,
        };
        let search_descriptions = match std::env::var("FOLDER_HUB_SEARCH_DESCRIPTIONS") {
            Ok(v) => parse_flag(&v).ok_or_else(|| {
                HierarchyError::Config(format!("invalid FOLDER_HUB_SEARCH_DESCRIPTIONS: {}", v))
            })?,
            Err(_) => defaults.search_descriptions,
        };
        let data_dir = std::env::var("FOLDER_HUB_DATA_DIR").ok().map(PathBuf::from);
        let config = Self {
            max_depth,
            orphan_policy,
            search_descriptions,
            data_dir,
        };
        config.validate()?;
        Ok(config)
    }

    /// Load settings from a JSON file; missing keys take their defaults.
    pub fn from_file(path: &Path) -> Result<Self> {
        let data = std::fs::read_to_string(path)
            .map_err(|e| HierarchyError::Config(format!("{}: {}", path.display(), e)))?;
        let config: Self = serde_json::from_str(&data)
            .map_err(|e| HierarchyError::Config(format!("{}: {}", path.display(), e)))?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.max_depth == 0 {
            return Err(HierarchyError::Config("max_depth must be positive".to_string()));
        }
        Ok(())
    }
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
