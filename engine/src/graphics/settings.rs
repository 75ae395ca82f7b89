use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Tunables of a [`super::Device`]. Missing fields fall back to their defaults when deserialized.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeviceSettings {
    /// Granularity ad-hoc constant data is padded to.
    pub constant_buffer_alignment: u64,
    /// Submit and wait after every draw or dispatch instead of once per encoder.
    pub submit_each_draw: bool,
    /// Forward resource names to the native objects.
    pub debug_names: bool,
    /// Binding name to shader slot. Only consulted when reflection has no match, every hit is logged.
    pub binding_fallbacks: HashMap<String, u32>,
}

impl Default for DeviceSettings {
    fn default() -> Self {
        Self {
            constant_buffer_alignment: 16,
            submit_each_draw: true,
            debug_names: true,
            binding_fallbacks: HashMap::new(),
        }
    }
}

impl DeviceSettings {
    pub fn align_constant_size(&self, size: u64) -> u64 {
        let alignment = self.constant_buffer_alignment.max(1);
        size.div_ceil(alignment) * alignment
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn partial_settings_use_defaults() {
        let settings: DeviceSettings = serde_json::from_str(r#"{ "submit_each_draw": false }"#).unwrap();
        assert!(!settings.submit_each_draw);
        assert_eq!(settings.constant_buffer_alignment, 16);
        assert!(settings.binding_fallbacks.is_empty());
    }

    #[test]
    fn constant_sizes_round_up() {
        let settings = DeviceSettings::default();
        assert_eq!(settings.align_constant_size(0), 0);
        assert_eq!(settings.align_constant_size(1), 16);
        assert_eq!(settings.align_constant_size(16), 16);
        assert_eq!(settings.align_constant_size(17), 32);
    }
}
