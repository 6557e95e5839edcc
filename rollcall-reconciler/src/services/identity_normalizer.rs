//! Identifier canonicalization
//!
//! Roster cells and participation records spell registration numbers with
//! inconsistent case, spacing and punctuation ("231 FA-04c33", "231fa04c33").
//! Both sides are reduced to lowercase ASCII alphanumerics before matching.

/// Canonical form of a free-text identifier
///
/// Trims, lowercases and drops every character outside `[a-z0-9]`. An empty
/// result means "no identity".
pub fn normalize(raw: &str) -> String {
    raw.trim()
        .chars()
        .flat_map(char::to_lowercase)
        .filter(|c| c.is_ascii_lowercase() || c.is_ascii_digit())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_strips_case_and_punctuation() {
        assert_eq!(normalize("  231FA04C33 "), "231fa04c33");
        assert_eq!(normalize("231-fa 04/c33"), "231fa04c33");
        assert_eq!(normalize("Regd.No#17"), "regdno17");
    }

    #[test]
    fn test_normalize_empty_and_symbol_only() {
        assert_eq!(normalize(""), "");
        assert_eq!(normalize("   "), "");
        assert_eq!(normalize("--//**"), "");
    }

    #[test]
    fn test_normalize_drops_non_ascii_letters() {
        assert_eq!(normalize("Ünï-42"), "n42");
    }

    #[test]
    fn test_normalize_is_idempotent() {
        let once = normalize("  AbC-123 ");
        assert_eq!(normalize(&once), once);
    }
}
