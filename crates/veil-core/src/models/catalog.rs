//! Well-known info types grouped into broader categories.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::Category;

/// Broad grouping of info types, used for reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InfoTypeCategory {
    Personal,
    Contact,
    Financial,
    GovernmentId,
    Location,
    Credentials,
    Other,
}

impl fmt::Display for InfoTypeCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Personal => "personal",
            Self::Contact => "contact",
            Self::Financial => "financial",
            Self::GovernmentId => "government_id",
            Self::Location => "location",
            Self::Credentials => "credentials",
            Self::Other => "other",
        };
        f.write_str(s)
    }
}

const CATALOG: &[(&str, InfoTypeCategory)] = &[
    ("PERSON_NAME", InfoTypeCategory::Personal),
    ("FIRST_NAME", InfoTypeCategory::Personal),
    ("LAST_NAME", InfoTypeCategory::Personal),
    ("DATE_OF_BIRTH", InfoTypeCategory::Personal),
    ("AGE", InfoTypeCategory::Personal),
    ("GENDER", InfoTypeCategory::Personal),
    ("EMAIL_ADDRESS", InfoTypeCategory::Contact),
    ("PHONE_NUMBER", InfoTypeCategory::Contact),
    ("URL", InfoTypeCategory::Contact),
    ("CREDIT_CARD_NUMBER", InfoTypeCategory::Financial),
    ("IBAN_CODE", InfoTypeCategory::Financial),
    ("SWIFT_CODE", InfoTypeCategory::Financial),
    ("US_BANK_ROUTING_MICR", InfoTypeCategory::Financial),
    ("US_SOCIAL_SECURITY_NUMBER", InfoTypeCategory::GovernmentId),
    ("US_DRIVERS_LICENSE_NUMBER", InfoTypeCategory::GovernmentId),
    ("US_PASSPORT", InfoTypeCategory::GovernmentId),
    ("PASSPORT", InfoTypeCategory::GovernmentId),
    ("STREET_ADDRESS", InfoTypeCategory::Location),
    ("LOCATION", InfoTypeCategory::Location),
    ("IP_ADDRESS", InfoTypeCategory::Location),
    ("MAC_ADDRESS", InfoTypeCategory::Location),
    ("PASSWORD", InfoTypeCategory::Credentials),
    ("AUTH_TOKEN", InfoTypeCategory::Credentials),
    ("GCP_API_KEY", InfoTypeCategory::Credentials),
    ("AWS_CREDENTIALS", InfoTypeCategory::Credentials),
];

/// Static lookup over the known info types.
pub struct InfoTypeCatalog;

impl InfoTypeCatalog {
    /// Group for an info type. Unknown info types fall into `Other`.
    pub fn category_of(info_type: &Category) -> InfoTypeCategory {
        CATALOG
            .iter()
            .find(|(name, _)| *name == info_type.as_str())
            .map(|(_, group)| *group)
            .unwrap_or(InfoTypeCategory::Other)
    }

    pub fn is_known(info_type: &Category) -> bool {
        CATALOG.iter().any(|(name, _)| *name == info_type.as_str())
    }

    /// Every known info type belonging to `group`.
    pub fn info_types_in(group: InfoTypeCategory) -> Vec<Category> {
        CATALOG
            .iter()
            .filter(|(_, g)| *g == group)
            .map(|(name, _)| Category::new(name))
            .collect()
    }

    /// Distinct groups covered by `info_types`, in first-seen order.
    pub fn groups_for(info_types: &[Category]) -> Vec<InfoTypeCategory> {
        let mut groups = Vec::new();
        for info_type in info_types {
            let group = Self::category_of(info_type);
            if !groups.contains(&group) {
                groups.push(group);
            }
        }
        groups
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_types_map_to_their_group() {
        assert_eq!(
            InfoTypeCatalog::category_of(&Category::new("EMAIL_ADDRESS")),
            InfoTypeCategory::Contact
        );
        assert_eq!(
            InfoTypeCatalog::category_of(&Category::new("us_social_security_number")),
            InfoTypeCategory::GovernmentId
        );
    }

    #[test]
    fn unknown_type_is_other() {
        let custom = Category::new("EMPLOYEE_BADGE");
        assert!(!InfoTypeCatalog::is_known(&custom));
        assert_eq!(InfoTypeCatalog::category_of(&custom), InfoTypeCategory::Other);
    }

    #[test]
    fn groups_are_deduplicated_in_order() {
        let types = vec![
            Category::new("PHONE_NUMBER"),
            Category::new("PERSON_NAME"),
            Category::new("EMAIL_ADDRESS"),
        ];
        assert_eq!(
            InfoTypeCatalog::groups_for(&types),
            vec![InfoTypeCategory::Contact, InfoTypeCategory::Personal]
        );
    }
}
