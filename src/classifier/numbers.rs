//! Numeric field normalization.

/// A parsed amount: normalized digits plus any non-magnitude unit token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Amount {
    pub value: String,
    pub unit: Option<String>,
}

/// Decimal exponent implied by a magnitude suffix.
fn magnitude(unit: &str) -> Option<usize> {
    match unit {
        "k" | "K" => Some(3),
        "w" | "W" | "万" => Some(4),
        "m" | "M" => Some(6),
        _ => None,
    }
}

/// Parse a captured number with an optional unit token.
///
/// Thousands separators and a leading `+` are dropped. Magnitude suffixes
/// are expanded by shifting the decimal point, so `1.5k` becomes `1500`
/// without float rounding. Anything that is not a plain decimal after
/// cleanup yields `None`.
pub fn parse_amount(raw: &str, unit: Option<&str>) -> Option<Amount> {
    let cleaned: String = raw
        .trim()
        .trim_start_matches('+')
        .chars()
        .filter(|c| *c != ',' && *c != '，')
        .collect();

    let (int, frac) = match cleaned.split_once('.') {
        Some((i, f)) => (i, f),
        None => (cleaned.as_str(), ""),
    };
    let digits_only = |s: &str| s.chars().all(|c| c.is_ascii_digit());
    if int.is_empty() || !digits_only(int) || !digits_only(frac) || cleaned.ends_with('.') {
        return None;
    }

    let unit = unit.map(str::trim).filter(|u| !u.is_empty());
    match unit.and_then(magnitude) {
        Some(exp) => Some(Amount {
            value: shift_decimal(int, frac, exp),
            unit: None,
        }),
        None => Some(Amount {
            value: cleaned.clone(),
            unit: unit.map(str::to_string),
        }),
    }
}

fn shift_decimal(int: &str, frac: &str, exp: usize) -> String {
    let mut frac_digits: String = frac.to_string();
    while frac_digits.len() < exp {
        frac_digits.push('0');
    }
    let (moved, rest) = frac_digits.split_at(exp);
    let whole = format!("{int}{moved}");
    let whole = whole.trim_start_matches('0');
    let whole = if whole.is_empty() { "0" } else { whole };
    let rest = rest.trim_end_matches('0');
    if rest.is_empty() {
        whole.to_string()
    } else {
        format!("{whole}.{rest}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn value(raw: &str, unit: Option<&str>) -> Option<String> {
        parse_amount(raw, unit).map(|a| a.value)
    }

    #[test]
    fn test_plain_integers_and_fractions() {
        assert_eq!(value("120", None).as_deref(), Some("120"));
        assert_eq!(value("1.25", None).as_deref(), Some("1.25"));
        assert_eq!(value("+5", None).as_deref(), Some("5"));
        assert_eq!(value("1,024", None).as_deref(), Some("1024"));
    }

    #[test]
    fn test_magnitude_suffixes_expand_exactly() {
        assert_eq!(value("1.5", Some("k")).as_deref(), Some("1500"));
        assert_eq!(value("2", Some("W")).as_deref(), Some("20000"));
        assert_eq!(value("3.5", Some("万")).as_deref(), Some("35000"));
        assert_eq!(value("0.25", Some("M")).as_deref(), Some("250000"));
        assert_eq!(value("1.23456", Some("k")).as_deref(), Some("1234.56"));
    }

    #[test]
    fn test_other_units_are_kept_separately() {
        let amount = parse_amount("5", Some("GB")).unwrap();
        assert_eq!(amount.value, "5");
        assert_eq!(amount.unit.as_deref(), Some("GB"));
        assert_eq!(parse_amount("3", Some("天")).unwrap().unit.as_deref(), Some("天"));
    }

    #[test]
    fn test_unparseable_is_none() {
        assert_eq!(parse_amount("", None), None);
        assert_eq!(parse_amount("1.2.3", None), None);
        assert_eq!(parse_amount("abc", None), None);
        assert_eq!(parse_amount("5.", None), None);
    }
}
