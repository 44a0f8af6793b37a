//! Runtime configuration.
//!
//! ```toml
//! [shared]
//! service_name = "boardobj-rt"
//! log_level = "info"
//!
//! [runtime]
//! scratch_size = 4096
//! dmem_budget = 65536
//! overwrite_policy = "reject"
//! bulk_transfer = false
//!
//! [surface]
//! path = "/dev/shm/boardobj_surface"
//! size = 8192
//!
//! [[resident]]
//! class_id = 0x0b
//! path = "/etc/boardobj/therm_channel.bobj"
//! ```

use std::collections::HashSet;
use std::path::PathBuf;

use boardobj::config::{ConfigError, OverwritePolicy, SharedConfig};
use boardobj::consts::{DEFAULT_DMEM_BUDGET, DEFAULT_SCRATCH_SIZE};
use boardobj::tier::GroupTier;
use boardobj::wire::BoardObjGrpHeader;
use serde::{Deserialize, Serialize};

/// Default shared surface size in bytes.
pub const DEFAULT_SURFACE_SIZE: usize = 8192;

/// Top-level configuration of the `boardobj_rt` binary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuntimeConfig {
    pub shared: SharedConfig,

    #[serde(default)]
    pub runtime: RuntimeSettings,

    /// File-backed shared surface.
    #[serde(default)]
    pub surface: Option<SurfaceSettings>,

    /// Resident configuration tables, self-initialized at startup.
    #[serde(default)]
    pub resident: Vec<ResidentSettings>,
}

/// `[runtime]` section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeSettings {
    /// Local staging buffer for headers, entries and bulk regions.
    pub scratch_size: usize,
    /// Bytes available to the object allocator.
    pub dmem_budget: usize,
    /// UPDATE behaviour on live objects.
    pub overwrite_policy: OverwritePolicy,
    /// Register bulk instead of per-entry transfers.
    pub bulk_transfer: bool,
}

impl Default for RuntimeSettings {
    fn default() -> Self {
        Self {
            scratch_size: DEFAULT_SCRATCH_SIZE,
            dmem_budget: DEFAULT_DMEM_BUDGET,
            overwrite_policy: OverwritePolicy::default(),
            bulk_transfer: false,
        }
    }
}

/// `[surface]` section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SurfaceSettings {
    pub path: PathBuf,
    #[serde(default = "default_surface_size")]
    pub size: usize,
}

fn default_surface_size() -> usize {
    DEFAULT_SURFACE_SIZE
}

/// `[[resident]]` entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResidentSettings {
    pub class_id: u8,
    pub path: PathBuf,
}

impl RuntimeConfig {
    /// Configuration with defaults everywhere and no surface or tables.
    pub fn with_service_name(service_name: &str) -> Self {
        Self {
            shared: SharedConfig {
                log_level: Default::default(),
                service_name: service_name.to_string(),
            },
            runtime: RuntimeSettings::default(),
            surface: None,
            resident: Vec::new(),
        }
    }

    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::ValidationError` if:
    /// - `service_name` is empty
    /// - `scratch_size` is zero or cannot hold the largest enabled group header
    /// - the surface size is zero
    /// - two resident tables name the same class
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.shared.validate()?;

        let min_scratch = BoardObjGrpHeader::encoded_len(GroupTier::largest_enabled());
        if self.runtime.scratch_size == 0 {
            return Err(ConfigError::ValidationError(
                "scratch_size cannot be zero".to_string(),
            ));
        }
        if self.runtime.scratch_size < min_scratch {
            return Err(ConfigError::ValidationError(format!(
                "scratch_size {} is smaller than the largest group header ({min_scratch} bytes)",
                self.runtime.scratch_size
            )));
        }
        if let Some(surface) = &self.surface {
            if surface.size == 0 {
                return Err(ConfigError::ValidationError(
                    "surface size cannot be zero".to_string(),
                ));
            }
        }

        let mut seen = HashSet::new();
        for r in &self.resident {
            if !seen.insert(r.class_id) {
                return Err(ConfigError::ValidationError(format!(
                    "duplicate resident table for class {:#04x}",
                    r.class_id
                )));
            }
        }
        Ok(())
    }
}
