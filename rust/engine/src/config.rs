// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Synchronization settings.

use std::str::FromStr;

/// How received objects that already exist in the host are treated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReceiveMode {
    /// Update the existing element in place
    #[default]
    Update,
    /// Always create a new element
    Create,
    /// Leave the existing element untouched
    Ignore,
}

impl FromStr for ReceiveMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "update" => Ok(ReceiveMode::Update),
            "create" => Ok(ReceiveMode::Create),
            "ignore" => Ok(ReceiveMode::Ignore),
            other => Err(format!("unknown receive mode '{other}'")),
        }
    }
}

/// Settings for a synchronization session.
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// Treatment of objects that already exist in the host
    pub receive_mode: ReceiveMode,
    /// Attach extruded display meshes to sent elements
    pub send_extruded_geometry: bool,
    /// Member names probed, in order, for display fallback content
    pub display_aliases: Vec<String>,
    /// Member names a convertible object may carry child elements under
    pub element_aliases: Vec<String>,
    /// Thickness used for display meshes of areas with no thickness
    pub default_surface_thickness: f64,
    /// Faces whose normal has a smaller Z component are treated as vertical
    pub vertical_normal_threshold: f64,
    /// Distance under which two points are the same point
    pub point_tolerance: f64,
    /// Distance under which a ring's last point closes onto its first
    pub ring_closure_tolerance: f64,
    /// Length units of incoming coordinates
    pub units: String,
}

impl SyncConfig {
    /// Load configuration from environment variables, falling back to the
    /// defaults for anything unset or unparsable.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            receive_mode: std::env::var("STRUCTSYNC_RECEIVE_MODE")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.receive_mode),
            send_extruded_geometry: std::env::var("STRUCTSYNC_SEND_EXTRUDED")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.send_extruded_geometry),
            display_aliases: std::env::var("STRUCTSYNC_DISPLAY_ALIASES")
                .map(|v| split_list(&v))
                .unwrap_or(defaults.display_aliases),
            element_aliases: std::env::var("STRUCTSYNC_ELEMENT_ALIASES")
                .map(|v| split_list(&v))
                .unwrap_or(defaults.element_aliases),
            default_surface_thickness: std::env::var("STRUCTSYNC_DEFAULT_THICKNESS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.default_surface_thickness),
            vertical_normal_threshold: defaults.vertical_normal_threshold,
            point_tolerance: std::env::var("STRUCTSYNC_POINT_TOLERANCE")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.point_tolerance),
            ring_closure_tolerance: defaults.ring_closure_tolerance,
            units: std::env::var("STRUCTSYNC_UNITS").unwrap_or(defaults.units),
        }
    }

    pub fn with_receive_mode(mut self, mode: ReceiveMode) -> Self {
        self.receive_mode = mode;
        self
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            receive_mode: ReceiveMode::Update,
            send_extruded_geometry: true,
            display_aliases: vec![
                "displayValue".into(),
                "@displayValue".into(),
                "displayMesh".into(),
                "@displayMesh".into(),
            ],
            element_aliases: vec!["elements".into(), "@elements".into()],
            default_surface_thickness: 0.1,
            vertical_normal_threshold: 0.3,
            point_tolerance: 1e-3,
            ring_closure_tolerance: 0.01,
            units: "m".into(),
        }
    }
}

fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_receive_mode_parse() {
        assert_eq!("Update".parse::<ReceiveMode>(), Ok(ReceiveMode::Update));
        assert_eq!(" ignore ".parse::<ReceiveMode>(), Ok(ReceiveMode::Ignore));
        assert!("merge".parse::<ReceiveMode>().is_err());
    }

    #[test]
    fn test_default_aliases() {
        let config = SyncConfig::default();
        assert_eq!(config.display_aliases[0], "displayValue");
        assert_eq!(config.element_aliases, vec!["elements", "@elements"]);
    }

    #[test]
    fn test_split_list() {
        assert_eq!(split_list("a, b,,c "), vec!["a", "b", "c"]);
    }
}
