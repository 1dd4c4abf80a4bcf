//! Platform definitions for multi-vendor support.
//!
//! Each supported vendor has one static [`PlatformDefinition`] holding its
//! prompt patterns and the command strings the engine sends: paging control,
//! configuration mode entry/exit, the persist command, and the inspection
//! commands with their output markers.

mod definition;
pub mod registry;
pub mod vendors;

use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use serde::{Deserialize, Serialize};

pub use definition::{Column, InterfaceLayout, PlatformDefinition, PromptPatterns};

use crate::error::ConfigError;

/// Supported device vendors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Vendor {
    /// Huawei VRP switches and routers.
    #[default]
    Huawei,
    /// H3C / HPE Comware.
    H3c,
    /// Cisco IOS and IOS-XE.
    Cisco,
}

/// Compiled patterns per vendor, indexed like [`Vendor::ALL`].
static PATTERNS: LazyLock<[Result<PromptPatterns, String>; 3]> = LazyLock::new(|| {
    Vendor::ALL.map(|vendor| {
        let platform = vendor.platform();
        platform
            .compile_patterns()
            .map_err(|e| format!("invalid pattern for {}: {e}", platform.name))
    })
});

impl Vendor {
    /// Every supported vendor.
    pub const ALL: [Vendor; 3] = [Vendor::Huawei, Vendor::H3c, Vendor::Cisco];

    /// This vendor's prompt patterns, compiled once per process.
    pub fn patterns(&self) -> Result<&'static PromptPatterns, String> {
        PATTERNS[*self as usize].as_ref().map_err(Clone::clone)
    }

    /// The command table for this vendor.
    pub fn platform(&self) -> &'static PlatformDefinition {
        match self {
            Vendor::Huawei => &vendors::huawei::PLATFORM,
            Vendor::H3c => &vendors::h3c::PLATFORM,
            Vendor::Cisco => &vendors::cisco::PLATFORM,
        }
    }
}

impl FromStr for Vendor {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        registry::lookup(s)
    }
}

impl TryFrom<String> for Vendor {
    type Error = ConfigError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Vendor> for String {
    fn from(vendor: Vendor) -> Self {
        vendor.platform().name.to_string()
    }
}

impl fmt::Display for Vendor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.platform().name)
    }
}
