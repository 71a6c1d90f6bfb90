//! Phone number canonicalization for the driver directory.
//!
//! Kazakh mobile numbers circulate with both `870…` and `770…` prefixes and
//! with a trunk `8` in place of the country code `7`. All of them collapse to
//! one `+7…` form.

pub fn digits_only(raw: &str) -> String {
    raw.chars().filter(char::is_ascii_digit).collect()
}

pub fn normalize(raw: &str) -> String {
    let digits = digits_only(raw);

    let swapped = if let Some(rest) = digits.strip_prefix("870") {
        format!("770{rest}")
    } else if let Some(rest) = digits.strip_prefix("770") {
        format!("870{rest}")
    } else {
        digits
    };

    let national = match swapped.strip_prefix('8') {
        Some(rest) => format!("7{rest}"),
        None => swapped,
    };

    format!("+{national}")
}

/// The forms a freshly registered phone is remembered under.
pub fn variants(raw: &str) -> Vec<String> {
    let mut forms = vec![normalize(raw), raw.trim().to_string(), digits_only(raw)];
    forms.retain(|form| !form.is_empty());
    forms.dedup();
    forms
}

#[cfg(test)]
mod tests {
    use super::{digits_only, normalize, variants};

    #[test]
    fn strips_formatting() {
        assert_eq!(digits_only("+7 (701) 234-56-78"), "77012345678");
        assert_eq!(normalize("+7 (701) 234-56-78"), "+77012345678");
    }

    #[test]
    fn dual_prefixes_collapse_to_the_same_number() {
        assert_eq!(normalize("87001234567"), "+77001234567");
        assert_eq!(normalize("77001234567"), "+77001234567");
        assert_eq!(normalize("87001234567"), normalize("77001234567"));
    }

    #[test]
    fn leading_trunk_eight_becomes_seven() {
        assert_eq!(normalize("8 701 234 56 78"), "+77012345678");
    }

    #[test]
    fn normalization_is_idempotent() {
        for raw in ["+77012345678", "7 701 555 00 11", "+86 138 0013 8000", "996555123456"] {
            let once = normalize(raw);
            assert_eq!(normalize(&once), once, "input {raw}");
        }
    }

    #[test]
    fn variants_include_canonical_and_digit_forms() {
        let forms = variants("8 (700) 123-45-67");
        assert_eq!(forms[0], "+77001234567");
        assert!(forms.contains(&"87001234567".to_string()));
        assert!(forms.contains(&"8 (700) 123-45-67".to_string()));
    }
}
