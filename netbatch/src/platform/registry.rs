//! Device-type name table.
//!
//! Device descriptors name their platform with a netmiko-style
//! `device_type` string. Lookup is an exact match against this table.

use super::Vendor;
use crate::error::ConfigError;

/// Accepted `device_type` strings and the vendor each one selects.
const DEVICE_TYPES: &[(&str, Vendor)] = &[
    ("huawei", Vendor::Huawei),
    ("huawei_vrp", Vendor::Huawei),
    ("huawei_vrpv8", Vendor::Huawei),
    ("h3c", Vendor::H3c),
    ("h3c_comware", Vendor::H3c),
    ("hp_comware", Vendor::H3c),
    ("cisco", Vendor::Cisco),
    ("cisco_ios", Vendor::Cisco),
    ("cisco_xe", Vendor::Cisco),
    ("cisco_ios_xe", Vendor::Cisco),
];

/// Resolve a `device_type` string to a vendor.
pub fn lookup(device_type: &str) -> Result<Vendor, ConfigError> {
    let key = device_type.trim().to_ascii_lowercase();
    DEVICE_TYPES
        .iter()
        .find(|(name, _)| *name == key)
        .map(|(_, vendor)| *vendor)
        .ok_or_else(|| ConfigError::UnknownVendor {
            name: device_type.to_string(),
        })
}

/// List all accepted `device_type` names.
pub fn names() -> impl Iterator<Item = &'static str> {
    DEVICE_TYPES.iter().map(|(name, _)| *name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exact_lookup() {
        assert_eq!(lookup("huawei_vrpv8").unwrap(), Vendor::Huawei);
        assert_eq!(lookup("Cisco_IOS").unwrap(), Vendor::Cisco);
        assert_eq!(lookup("hp_comware").unwrap(), Vendor::H3c);
    }

    #[test]
    fn test_no_substring_matching() {
        // "cisco" appears inside the name but the name is not in the table
        assert!(matches!(
            lookup("cisco_nxos_ssh"),
            Err(ConfigError::UnknownVendor { .. })
        ));
        assert!(lookup("juniper_junos").is_err());
    }

    #[test]
    fn test_names_are_unique() {
        let mut all: Vec<_> = names().collect();
        let len = all.len();
        all.sort_unstable();
        all.dedup();
        assert_eq!(all.len(), len);
    }
}
