//! Configuration management for wayfront
//!
//! This module handles loading, parsing, and validating configuration
//! from TOML files. Every section has defaults, so an empty file (or no
//! file at all) yields a working server.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Extension globals the server knows how to advertise
pub const KNOWN_EXTENSIONS: &[&str] = &["xdg_wm_base", "zwlr_layer_shell_v1"];

/// Main configuration struct containing all wayfront settings
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct WayfrontConfig {
    /// Wire protocol settings
    #[serde(default)]
    pub protocol: ProtocolConfig,

    /// Which extension globals get advertised
    #[serde(default)]
    pub extensions: ExtensionsConfig,

    /// Resource ceilings
    #[serde(default)]
    pub limits: LimitsConfig,

    /// Pointer event shaping
    #[serde(default)]
    pub pointer: PointerConfig,

    /// Window role policy and the output used for placement
    #[serde(default)]
    pub shell: ShellConfig,

    #[serde(default)]
    pub seat: SeatConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ProtocolConfig {
    /// `wl_display` version offered to clients; implementation errors are
    /// only non-fatal from version 2
    pub display_version: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ExtensionsConfig {
    pub enabled: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LimitsConfig {
    /// Live objects one connection may hold, `wl_display` included
    pub max_objects_per_client: usize,

    pub max_globals: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PointerConfig {
    /// Multiplier applied to platform scroll deltas
    pub axis_scale: f64,

    /// Send `frame` after batches that only changed focus
    pub always_frame_on_enter_leave: bool,
}

/// What happens when a toplevel's min and max sizes cross
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum SizeConstraintPolicy {
    /// The latest request wins and the opposite bound follows it
    #[default]
    Clamp,
    /// Crossed bounds are `xdg_toplevel.invalid_size`
    Reject,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ShellConfig {
    pub size_constraint_policy: SizeConstraintPolicy,

    /// Output width (pixels) used as the placement bounds
    pub output_width: u32,

    /// Output height (pixels)
    pub output_height: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SeatConfig {
    /// Name sent with `wl_seat.name`
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default log filter when `RUST_LOG` is unset
    pub level: String,
}

impl Default for ProtocolConfig {
    fn default() -> Self {
        Self { display_version: 2 }
    }
}

impl Default for ExtensionsConfig {
    fn default() -> Self {
        Self {
            enabled: KNOWN_EXTENSIONS.iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_objects_per_client: 4096,
            max_globals: 64,
        }
    }
}

impl Default for PointerConfig {
    fn default() -> Self {
        Self {
            axis_scale: 10.0,
            always_frame_on_enter_leave: true,
        }
    }
}

impl Default for ShellConfig {
    fn default() -> Self {
        Self {
            size_constraint_policy: SizeConstraintPolicy::Clamp,
            output_width: 1920,
            output_height: 1080,
        }
    }
}

impl Default for SeatConfig {
    fn default() -> Self {
        Self {
            name: "seat0".to_string(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl WayfrontConfig {
    /// Load configuration from a TOML file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        // Expand ~ to home directory
        let expanded_path = if path.to_string_lossy().starts_with('~') {
            let home = std::env::var("HOME").context("Failed to get HOME environment variable")?;
            Path::new(&home).join(path.strip_prefix("~").unwrap_or(path))
        } else {
            path.to_path_buf()
        };

        let contents = fs::read_to_string(&expanded_path)
            .with_context(|| format!("Failed to read config file: {}", expanded_path.display()))?;

        let config: WayfrontConfig = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", expanded_path.display()))?;

        config.validate()?;

        Ok(config)
    }

    /// Loads `path` if it exists, otherwise returns the defaults
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if path.exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.protocol.display_version == 0 {
            anyhow::bail!("Invalid display_version: must be at least 1");
        }

        for name in &self.extensions.enabled {
            if !KNOWN_EXTENSIONS.contains(&name.as_str()) {
                anyhow::bail!("Unknown extension: {}", name);
            }
        }

        // wl_display alone takes one slot
        if self.limits.max_objects_per_client < 2 {
            anyhow::bail!("Invalid max_objects_per_client: must be at least 2");
        }

        // core globals plus every known extension
        let needed = 3 + self.extensions.enabled.len();
        if self.limits.max_globals < needed {
            anyhow::bail!(
                "Invalid max_globals: {} cannot hold the {} globals advertised at startup",
                self.limits.max_globals,
                needed
            );
        }

        if !self.pointer.axis_scale.is_finite() || self.pointer.axis_scale <= 0.0 {
            anyhow::bail!("Invalid axis_scale: must be a positive number");
        }

        if self.shell.output_width == 0 || self.shell.output_height == 0 {
            anyhow::bail!("Invalid output size: width and height must be non-zero");
        }
        if self.shell.output_width > i32::MAX as u32 || self.shell.output_height > i32::MAX as u32 {
            anyhow::bail!("Invalid output size: too large");
        }

        if self.seat.name.is_empty() {
            anyhow::bail!("Invalid seat name: must not be empty");
        }

        Ok(())
    }

    /// Save configuration to a TOML file
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let contents = toml::to_string_pretty(self).context("Failed to serialize configuration")?;

        fs::write(path, contents).context("Failed to write configuration file")?;

        Ok(())
    }
}

#[cfg(test)]
mod tests;
