// src/storage_class.rs
//
// Storage tiers recognized by the service. Bulk operations validate the
// requested class before touching the network.

use std::fmt;
use std::str::FromStr;

use crate::error::BulkError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StorageClass {
    Standard,
    ColdInstant,
}

impl StorageClass {
    /// Value sent on the wire.
    pub fn as_str(&self) -> &'static str {
        match self {
            StorageClass::Standard => "standard",
            StorageClass::ColdInstant => "cold_instant",
        }
    }
}

impl fmt::Display for StorageClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StorageClass {
    type Err = BulkError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "standard" => Ok(StorageClass::Standard),
            "cold_instant" | "cold" => Ok(StorageClass::ColdInstant),
            _ => Err(BulkError::InvalidStorageClass(s.to_string())),
        }
    }
}

/// Parse an optional storage-class option. Empty means "service default".
pub fn validate_storage_class(class: Option<&str>) -> Result<Option<StorageClass>, BulkError> {
    match class {
        None => Ok(None),
        Some(s) if s.is_empty() => Ok(None),
        Some(s) => s.parse().map(Some),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recognized_classes() {
        for (input, want) in [
            ("standard", StorageClass::Standard),
            ("STANDARD", StorageClass::Standard),
            ("cold_instant", StorageClass::ColdInstant),
            ("cold", StorageClass::ColdInstant),
        ] {
            assert_eq!(input.parse::<StorageClass>().unwrap(), want, "{input}");
        }
    }

    #[test]
    fn unknown_class_is_rejected() {
        let err = "invalid".parse::<StorageClass>().unwrap_err();
        assert!(matches!(err, BulkError::InvalidStorageClass(ref s) if s == "invalid"));
        assert!("".parse::<StorageClass>().is_err());
    }

    #[test]
    fn empty_option_means_default() {
        assert_eq!(validate_storage_class(None).unwrap(), None);
        assert_eq!(validate_storage_class(Some("")).unwrap(), None);
        assert_eq!(
            validate_storage_class(Some("cold_instant")).unwrap(),
            Some(StorageClass::ColdInstant)
        );
        assert!(validate_storage_class(Some("test")).is_err());
    }

    #[test]
    fn wire_names_round_trip() {
        for class in [StorageClass::Standard, StorageClass::ColdInstant] {
            assert_eq!(class.to_string().parse::<StorageClass>().unwrap(), class);
        }
    }
}
