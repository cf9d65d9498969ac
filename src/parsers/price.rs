use once_cell::sync::Lazy;
use regex::Regex;

// Grouped thousands first, then a plain number. A regular space is not a
// group separator, so "150 120" (old and sale price) stays two numbers.
static PRICE_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\d{1,3}(?:[.,'\u{a0}\u{202f}]\d{3})+(?:[.,]\d+)?|\d+(?:[.,]\d+)?")
        .expect("Invalid price regex")
});

/// Extract the first numeric price from a price label ("1,299.00 ₾" -> "1299.00").
///
/// Thousands separators are dropped. When both `.` and `,` appear the last
/// one is the decimal mark; a lone `,` followed by exactly three digits is
/// a thousands separator, otherwise a decimal comma.
pub fn extract_price(text: &str) -> Option<String> {
    let raw = PRICE_REGEX.find(text)?.as_str();

    let compact: String = raw
        .chars()
        .filter(|c| !c.is_whitespace() && *c != '\u{a0}' && *c != '\'')
        .collect();
    let compact = compact.trim_end_matches(&['.', ','][..]);

    if compact.is_empty() {
        return None;
    }

    let last_dot = compact.rfind('.');
    let last_comma = compact.rfind(',');

    let normalized = match (last_dot, last_comma) {
        (Some(dot), Some(comma)) if dot > comma => compact.replace(',', ""),
        (Some(_), Some(_)) => compact.replace('.', "").replace(',', "."),
        (None, Some(comma)) => {
            let decimals = &compact[comma + 1..];
            if compact.matches(',').count() > 1 || decimals.len() == 3 {
                compact.replace(',', "")
            } else {
                compact.replace(',', ".")
            }
        }
        (Some(_), None) if compact.matches('.').count() > 1 => compact.replace('.', ""),
        _ => compact.to_string(),
    };

    Some(normalized)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_and_grouped_prices() {
        assert_eq!(extract_price("49 ₾").as_deref(), Some("49"));
        assert_eq!(extract_price("Price: 1,299.00 GEL").as_deref(), Some("1299.00"));
        assert_eq!(extract_price("1\u{a0}299,50 €").as_deref(), Some("1299.50"));
        assert_eq!(extract_price("CHF 1'299.-").as_deref(), Some("1299"));
        assert_eq!(extract_price("€1.299,00").as_deref(), Some("1299.00"));
        assert_eq!(extract_price("$12,500").as_deref(), Some("12500"));
        assert_eq!(extract_price("1.000.000 ₽").as_deref(), Some("1000000"));
    }

    #[test]
    fn decimal_comma_and_trailing_punctuation() {
        assert_eq!(extract_price("12,5").as_deref(), Some("12.5"));
        assert_eq!(extract_price("Only 99.").as_deref(), Some("99"));
        assert_eq!(extract_price("19.99$").as_deref(), Some("19.99"));
    }

    #[test]
    fn takes_the_first_of_several_numbers() {
        assert_eq!(extract_price("150 120").as_deref(), Some("150"));
        assert_eq!(extract_price("Was 1,500 ₾ now 1,200 ₾").as_deref(), Some("1500"));
        assert_eq!(extract_price("2 x 49.90").as_deref(), Some("2"));
    }

    #[test]
    fn no_digits_means_no_price() {
        assert_eq!(extract_price("Call for price"), None);
        assert_eq!(extract_price(""), None);
    }
}
