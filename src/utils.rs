use chrono::NaiveDate;
use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

/// Case- and diacritic-insensitive canonical form of a free-text field.
/// NFKD-decomposes, drops combining marks, lowercases, and collapses
/// whitespace runs, so "ACME  Ltda." and "Acme Ltda." fold identically.
pub fn fold_text(input: &str) -> String {
    let stripped: String = input
        .nfkd()
        .filter(|c| !is_combining_mark(*c))
        .flat_map(char::to_lowercase)
        .collect();

    stripped.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Jaro-Winkler similarity between two vendor names after folding.
pub fn vendor_similarity(a: &str, b: &str) -> f64 {
    strsim::jaro_winkler(&fold_text(a), &fold_text(b))
}

/// Parses a monetary value into integer minor units (centavos).
///
/// Handles both decimal-separator conventions seen in the exports:
/// "1.234,56" (pt-BR) and "1,234.56", plus bare "1234.56" / "1234,56" /
/// "1234". A single separator followed by exactly three digits is read as
/// a thousands separator ("1.234" -> 123400 minor units). An optional
/// leading "R$" is accepted. Returns `None` for anything else.
pub fn parse_amount_minor(raw: &str) -> Option<i64> {
    let mut value = raw.trim();
    let negative = value.starts_with('-');
    value = value.trim_start_matches('-').trim_start();
    value = value.strip_prefix("R$").unwrap_or(value).trim_start();

    if value.is_empty() {
        return None;
    }

    let dot = value.rfind('.');
    let comma = value.rfind(',');

    let (integer_part, fraction_part) = match (dot, comma) {
        (Some(d), Some(c)) => {
            // Both present: the later one is the decimal separator.
            let sep = d.max(c);
            (&value[..sep], &value[sep + 1..])
        }
        (Some(sep), None) | (None, Some(sep)) => {
            let sep_char = value.as_bytes()[sep] as char;
            let tail = &value[sep + 1..];
            if value[..sep].contains(sep_char) || tail.len() == 3 {
                // Repeated, or exactly three trailing digits: thousands.
                // Every group after the first must be three digits wide.
                let mut groups = value.split(sep_char);
                let first = groups.next().unwrap_or("");
                if first.is_empty() || first.len() > 3 || !groups.all(|g| g.len() == 3) {
                    return None;
                }
                (value, "")
            } else {
                (&value[..sep], tail)
            }
        }
        (None, None) => (value, ""),
    };

    let digits: String = integer_part
        .chars()
        .filter(|c| !matches!(c, '.' | ','))
        .collect();
    if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }

    if fraction_part.len() > 2 || !fraction_part.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }

    let major: i64 = digits.parse().ok()?;
    let cents: i64 = match fraction_part.len() {
        0 => 0,
        1 => fraction_part.parse::<i64>().ok()? * 10,
        _ => fraction_part.parse().ok()?,
    };

    let minor = major.checked_mul(100)?.checked_add(cents)?;
    Some(if negative { -minor } else { minor })
}

/// Renders minor units back into a two-decimal major-unit string ("1234.56").
pub fn format_amount_major(minor: i64) -> String {
    let sign = if minor < 0 { "-" } else { "" };
    let abs = minor.unsigned_abs();
    format!("{}{}.{:02}", sign, abs / 100, abs % 100)
}

/// Tries each accepted format in order; first successful parse wins.
pub fn parse_date_any(raw: &str, formats: &[String]) -> Option<NaiveDate> {
    let trimmed = raw.trim();
    formats
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(trimmed, fmt).ok())
}

/// Whole days from `from` to `to`; negative when `to` is earlier.
pub fn days_between(from: NaiveDate, to: NaiveDate) -> i64 {
    (to - from).num_days()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fold_text() {
        assert_eq!(fold_text("ACME LTDA"), "acme ltda");
        assert_eq!(fold_text("Açúcar  União"), "acucar uniao");
        assert_eq!(fold_text("  Fábrica São João "), "fabrica sao joao");
    }

    #[test]
    fn test_vendor_similarity_insensitive() {
        assert_eq!(vendor_similarity("Acme Ltda", "ACME LTDA"), 1.0);
        assert!(vendor_similarity("Construções Alfa", "Construcoes Alfa") > 0.99);
        assert!(vendor_similarity("Acme Ltda", "Zebra SA") < 0.8);
    }

    #[test]
    fn test_parse_amount_ptbr() {
        assert_eq!(parse_amount_minor("1.234,56"), Some(123456));
        assert_eq!(parse_amount_minor("R$ 1.234,56"), Some(123456));
        assert_eq!(parse_amount_minor("0,99"), Some(99));
        assert_eq!(parse_amount_minor("12,5"), Some(1250));
    }

    #[test]
    fn test_parse_amount_en() {
        assert_eq!(parse_amount_minor("1,234.56"), Some(123456));
        assert_eq!(parse_amount_minor("1234.56"), Some(123456));
        assert_eq!(parse_amount_minor("1500"), Some(150000));
    }

    #[test]
    fn test_parse_amount_thousands_only() {
        assert_eq!(parse_amount_minor("1.234"), Some(123400));
        assert_eq!(parse_amount_minor("1,234"), Some(123400));
        assert_eq!(parse_amount_minor("1.234.567"), Some(123456700));
    }

    #[test]
    fn test_parse_amount_rejects_garbage() {
        assert_eq!(parse_amount_minor(""), None);
        assert_eq!(parse_amount_minor("abc"), None);
        assert_eq!(parse_amount_minor("12.3456"), None);
        assert_eq!(parse_amount_minor("1,23,4"), None);
    }

    #[test]
    fn test_parse_amount_negative() {
        assert_eq!(parse_amount_minor("-10,00"), Some(-1000));
    }

    #[test]
    fn test_format_amount_major() {
        assert_eq!(format_amount_major(123456), "1234.56");
        assert_eq!(format_amount_major(99), "0.99");
        assert_eq!(format_amount_major(-1000), "-10.00");
    }

    #[test]
    fn test_parse_date_any() {
        let formats = vec![
            "%d/%m/%Y".to_string(),
            "%Y-%m-%d".to_string(),
            "%d.%m.%Y".to_string(),
        ];
        assert_eq!(
            parse_date_any("10/01/2024", &formats),
            NaiveDate::from_ymd_opt(2024, 1, 10)
        );
        assert_eq!(
            parse_date_any("2024-01-10", &formats),
            NaiveDate::from_ymd_opt(2024, 1, 10)
        );
        assert_eq!(parse_date_any("not a date", &formats), None);
    }

    #[test]
    fn test_days_between() {
        let a = NaiveDate::from_ymd_opt(2024, 1, 10).unwrap();
        let b = NaiveDate::from_ymd_opt(2024, 1, 15).unwrap();
        assert_eq!(days_between(a, b), 5);
        assert_eq!(days_between(b, a), -5);
    }
}
