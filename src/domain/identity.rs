//! Identity attributes extracted from a submitted document.
//!
//! The upstream extractor is best-effort: only the full name and date of
//! birth are guaranteed, everything else may be absent.

use serde::{Deserialize, Serialize};

/// Structured identity information extracted from a document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IdentityInfo {
    pub full_name: String,
    pub date_of_birth: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sex: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alt_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub given_names: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub surname: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub place_of_birth: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub places_of_residence: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fathers_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mothers_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nationality: Option<String>,
    /// ISO country code for the nationality (used by the sanctions query)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nationality_code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub document_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub document_number: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_of_expiry: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub issuing_country: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub issuing_country_code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub personal_number: Option<String>,
}

impl IdentityInfo {
    /// Create an identity with only the required attributes set
    pub fn new(full_name: impl Into<String>, date_of_birth: impl Into<String>) -> Self {
        Self {
            full_name: full_name.into(),
            date_of_birth: date_of_birth.into(),
            sex: None,
            alt_name: None,
            given_names: None,
            surname: None,
            place_of_birth: None,
            places_of_residence: None,
            fathers_name: None,
            mothers_name: None,
            nationality: None,
            nationality_code: None,
            document_type: None,
            document_number: None,
            date_of_expiry: None,
            issuing_country: None,
            issuing_country_code: None,
            personal_number: None,
        }
    }

    /// Set the nationality and its country code
    pub fn with_nationality(
        mut self,
        nationality: impl Into<String>,
        code: impl Into<String>,
    ) -> Self {
        self.nationality = Some(nationality.into());
        self.nationality_code = Some(code.into());
        self
    }

    /// Document type as a known variant, if the extractor reported one we recognize
    pub fn known_document_type(&self) -> Option<DocumentType> {
        self.document_type.as_deref().and_then(DocumentType::parse)
    }
}

/// Type of identity document being processed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentType {
    Passport,
    NationalId,
    Visa,
    DriversLicense,
}

impl DocumentType {
    /// Parse the extractor's free-form label ("Passport", "national id", "P", ...)
    pub fn parse(raw: &str) -> Option<Self> {
        let normalized: String = raw
            .trim()
            .to_lowercase()
            .chars()
            .map(|c| if c.is_alphanumeric() { c } else { '_' })
            .collect();

        match normalized.as_str() {
            "passport" | "p" => Some(Self::Passport),
            "national_id" | "id_card" | "identity_card" | "id" => Some(Self::NationalId),
            "visa" | "v" => Some(Self::Visa),
            "drivers_license" | "driver_s_license" | "driving_licence" | "driver_license" => {
                Some(Self::DriversLicense)
            }
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_optional_fields_default_to_none() {
        let json = r#"{"full_name": "Jane Doe", "date_of_birth": "1980-01-01"}"#;
        let identity: IdentityInfo = serde_json::from_str(json).unwrap();

        assert_eq!(identity, IdentityInfo::new("Jane Doe", "1980-01-01"));
        assert!(identity.nationality.is_none());
    }

    #[test]
    fn test_missing_required_field_is_rejected() {
        let json = r#"{"full_name": "Jane Doe"}"#;
        assert!(serde_json::from_str::<IdentityInfo>(json).is_err());
    }

    #[test]
    fn test_document_type_parsing() {
        assert_eq!(DocumentType::parse("Passport"), Some(DocumentType::Passport));
        assert_eq!(DocumentType::parse("National ID"), Some(DocumentType::NationalId));
        assert_eq!(
            DocumentType::parse("drivers-license"),
            Some(DocumentType::DriversLicense)
        );
        assert_eq!(DocumentType::parse("library card"), None);
    }
}
