//! Host description reported once per installation.

use crate::types::{CustomVariable, VariableScope};

/// Slot and name of the platform version variable
pub const PLATFORM_VARIABLE: (u8, &str) = (1, "apiLevel");

/// Slot and name of the device model variable
pub const MODEL_VARIABLE: (u8, &str) = (2, "model");

/// Platform version and device model of the reporting host
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceInfo {
    pub platform_version: String,
    pub model: String,
}

impl DeviceInfo {
    pub fn new(platform_version: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            platform_version: platform_version.into(),
            model: model.into(),
        }
    }

    /// Describe the current host from compile-time target information
    pub fn detect() -> Self {
        Self {
            platform_version: format!("{}-{}", std::env::consts::OS, std::env::consts::FAMILY),
            model: std::env::consts::ARCH.to_string(),
        }
    }

    /// The two visitor-scoped variables reported on first run
    pub fn custom_variables(&self) -> [CustomVariable; 2] {
        [
            CustomVariable::new(
                PLATFORM_VARIABLE.0,
                PLATFORM_VARIABLE.1,
                &self.platform_version,
                VariableScope::Visitor,
            ),
            CustomVariable::new(
                MODEL_VARIABLE.0,
                MODEL_VARIABLE.1,
                &self.model,
                VariableScope::Visitor,
            ),
        ]
    }
}
