use recaudo_core::RecaudoError;
use serde::Serialize;

/// How a citizen-supplied identifier is looked up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchKey {
    Document(String),
    ClientCode(String),
    Plate(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchKind {
    Document,
    ClientCode,
    Plate,
}

impl SearchKey {
    pub fn kind(&self) -> SearchKind {
        match self {
            Self::Document(_) => SearchKind::Document,
            Self::ClientCode(_) => SearchKind::ClientCode,
            Self::Plate(_) => SearchKind::Plate,
        }
    }
}

/// 8 digits is a DNI, 7 characters starting with `00` a client code, any
/// other 7 or 6 characters a vehicle plate.
pub fn classify_identifier(raw: &str) -> Result<SearchKey, RecaudoError> {
    let identifier = raw.trim();
    let length = identifier.chars().count();

    match length {
        8 if identifier.chars().all(|c| c.is_ascii_digit()) => {
            Ok(SearchKey::Document(identifier.to_string()))
        }
        7 if identifier.starts_with("00") => Ok(SearchKey::ClientCode(identifier.to_string())),
        7 | 6 => Ok(SearchKey::Plate(identifier.to_string())),
        _ => Err(RecaudoError::validation(
            "identifier",
            format!("invalid identifier format '{identifier}'"),
        )),
    }
}

pub fn is_valid_dni(dni: &str) -> bool {
    let dni = dni.trim();
    (7..=10).contains(&dni.len()) && dni.chars().all(|c| c.is_ascii_digit())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn eight_digits_is_a_document() {
        assert_eq!(
            classify_identifier("12345678").unwrap(),
            SearchKey::Document("12345678".to_string())
        );
        assert_eq!(
            classify_identifier("  12345678 ").unwrap(),
            SearchKey::Document("12345678".to_string())
        );
    }

    #[test]
    fn zero_zero_prefix_is_a_client_code() {
        assert_eq!(
            classify_identifier("0012345").unwrap(),
            SearchKey::ClientCode("0012345".to_string())
        );
    }

    #[test]
    fn six_or_seven_characters_are_plates() {
        assert_eq!(
            classify_identifier("ABC123").unwrap(),
            SearchKey::Plate("ABC123".to_string())
        );
        assert_eq!(
            classify_identifier("1234567").unwrap(),
            SearchKey::Plate("1234567".to_string())
        );
        assert_eq!(classify_identifier("AB123CD").unwrap().kind(), SearchKind::Plate);
    }

    #[test]
    fn other_lengths_are_rejected() {
        for raw in ["123", "", "ABCD1234", "123456789"] {
            assert!(matches!(
                classify_identifier(raw),
                Err(RecaudoError::Validation { field: "identifier", .. })
            ));
        }
    }

    #[test]
    fn dni_validation_accepts_seven_to_ten_digits() {
        assert!(is_valid_dni("1234567"));
        assert!(is_valid_dni("1234567890"));
        assert!(!is_valid_dni("123456"));
        assert!(!is_valid_dni("12345678901"));
        assert!(!is_valid_dni("12A45678"));
    }
}
