use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ObdError;

pub const UMBRELLA_STATUS: &str = "NULL/UMBRELLA";
pub const PDO_LIST_ENDPOINT: &str = "builderPDOs";
pub const PDO_ENDPOINT: &str = "pdoConvictions";
pub const PDO_ID_FIELD: &str = "TOUNIQUENUMBER";

const BUILDER_ENDPOINTS: &[&str] = &[
    "builderSummary",
    "builderPDOs",
    "builderConvictions",
    "builderMembers",
    "builderCondoProjects",
    "builderConditions",
];

const UMBRELLA_ENDPOINTS: &[&str] = &[
    "umbrellaSummary",
    "umbrellaMembers",
    "umbrellaProperties",
    "umbrellaCondoProjects",
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountRecord {
    #[serde(rename = "ACCOUNTNUMBER")]
    pub account_number: String,
    #[serde(rename = "LICENSESTATUS")]
    pub license_status: String,
}

impl AccountRecord {
    pub fn category(&self) -> LicenseCategory {
        LicenseCategory::from_status(&self.license_status)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LicenseCategory {
    Builder,
    Umbrella,
}

impl LicenseCategory {
    pub fn from_status(status: &str) -> Self {
        if status == UMBRELLA_STATUS {
            LicenseCategory::Umbrella
        } else {
            LicenseCategory::Builder
        }
    }

    pub fn endpoints(self) -> &'static [&'static str] {
        match self {
            LicenseCategory::Builder => BUILDER_ENDPOINTS,
            LicenseCategory::Umbrella => UMBRELLA_ENDPOINTS,
        }
    }

    pub fn cache_category(self) -> CacheCategory {
        match self {
            LicenseCategory::Builder => CacheCategory::Builder,
            LicenseCategory::Umbrella => CacheCategory::Umbrella,
        }
    }
}

impl fmt::Display for LicenseCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.cache_category())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CacheCategory {
    Builder,
    Umbrella,
    Pdo,
}

impl CacheCategory {
    pub fn folder(self) -> &'static str {
        match self {
            CacheCategory::Builder => "Builder",
            CacheCategory::Umbrella => "Umbrella",
            CacheCategory::Pdo => "PDO",
        }
    }
}

impl fmt::Display for CacheCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.folder())
    }
}

/// Account or PDO number, used verbatim as the request id and the cache file stem.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Identifier(String);

impl Identifier {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for Identifier {
    type Err = ObdError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let is_valid = !value.trim().is_empty()
            && value != "."
            && value != ".."
            && !value
                .chars()
                .any(|ch| ch == '/' || ch == '\\' || ch.is_control());
        if !is_valid {
            return Err(ObdError::InvalidIdentifier(value.to_string()));
        }
        Ok(Self(value.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    #[test]
    fn umbrella_status_routes_to_umbrella() {
        let category = LicenseCategory::from_status("NULL/UMBRELLA");
        assert_eq!(category, LicenseCategory::Umbrella);
        assert_eq!(category.endpoints().len(), 4);
        assert_eq!(category.cache_category().folder(), "Umbrella");
    }

    #[test]
    fn other_statuses_route_to_builder() {
        for status in ["Licensed", "", "null/umbrella", "NULL/UMBRELLA "] {
            let category = LicenseCategory::from_status(status);
            assert_eq!(category, LicenseCategory::Builder, "status {status:?}");
        }
        assert_eq!(LicenseCategory::Builder.endpoints().len(), 6);
        assert!(
            LicenseCategory::Builder
                .endpoints()
                .contains(&PDO_LIST_ENDPOINT)
        );
    }

    #[test]
    fn identifier_is_kept_verbatim() {
        let id: Identifier = " B12345 ".parse().unwrap();
        assert_eq!(id.as_str(), " B12345 ");
    }

    #[test]
    fn reject_path_like_identifier() {
        for value in ["", "  ", "..", "a/b", "a\\b", "x\ny"] {
            let err = value.parse::<Identifier>().unwrap_err();
            assert_matches!(err, ObdError::InvalidIdentifier(_));
        }
    }

    #[test]
    fn account_record_field_names() {
        let record: AccountRecord = serde_json::from_str(
            r#"{"ACCOUNTNUMBER": "B1", "LICENSESTATUS": "NULL/UMBRELLA", "NAME": "x"}"#,
        )
        .unwrap();
        assert_eq!(record.account_number, "B1");
        assert_eq!(record.category(), LicenseCategory::Umbrella);
    }
}
