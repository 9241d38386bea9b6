use chrono::{DateTime, NaiveDate, NaiveDateTime};

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d", "%Y.%m.%d"];
const DATETIME_FORMATS: &[&str] = &["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M"];

pub(crate) fn non_blank(value: &str) -> Option<&str> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then_some(trimmed)
}

/// Lenient numeric coercion: thousands separators and a trailing `원` are
/// accepted, anything else unparseable (or non-finite) is missing.
pub(crate) fn parse_number(value: &str) -> Option<f64> {
    let trimmed = non_blank(value)?;
    let trimmed = trimmed.strip_suffix('원').unwrap_or(trimmed).trim_end();
    let cleaned = trimmed.replace(',', "");
    cleaned.parse::<f64>().ok().filter(|number| number.is_finite())
}

pub(crate) fn parse_date(value: &str) -> Option<NaiveDate> {
    let trimmed = non_blank(value)?;

    for format in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(trimmed, format) {
            return Some(date);
        }
    }

    if trimmed.len() == 8 && trimmed.bytes().all(|byte| byte.is_ascii_digit()) {
        let year = trimmed[..4].parse().ok()?;
        let month = trimmed[4..6].parse().ok()?;
        let day = trimmed[6..].parse().ok()?;
        return NaiveDate::from_ymd_opt(year, month, day);
    }

    if let Ok(datetime) = DateTime::parse_from_rfc3339(trimmed) {
        return Some(datetime.date_naive());
    }

    DATETIME_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(trimmed, format).ok())
        .map(|datetime| datetime.date())
}

pub(crate) fn round_to(value: f64, places: i32) -> f64 {
    let factor = 10f64.powi(places);
    (value * factor).round() / factor
}

/// Renders whole numbers without a fractional part so synthesized and
/// exported cells read like the source data.
pub(crate) fn format_number(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{value:.0}")
    } else {
        value.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numbers_tolerate_separators_and_reject_text() {
        assert_eq!(parse_number(" 1,250,000 "), Some(1_250_000.0));
        assert_eq!(parse_number("3000원"), Some(3000.0));
        assert_eq!(parse_number("0.25"), Some(0.25));
        assert_eq!(parse_number("N/A"), None);
        assert_eq!(parse_number("NaN"), None);
        assert_eq!(parse_number("   "), None);
    }

    #[test]
    fn dates_accept_common_layouts() {
        let expected = NaiveDate::from_ymd_opt(2025, 3, 7).unwrap();
        for raw in [
            "2025-03-07",
            "2025/03/07",
            "2025.03.07",
            "20250307",
            "2025-03-07 13:45:00",
            "2025-03-07T09:00:00+09:00",
        ] {
            assert_eq!(parse_date(raw), Some(expected), "failed on {raw}");
        }
        assert_eq!(parse_date("2025-13-40"), None);
        assert_eq!(parse_date("soon"), None);
        assert_eq!(parse_date(""), None);
    }

    #[test]
    fn number_formatting_drops_trailing_zero_fraction() {
        assert_eq!(format_number(1500.0), "1500");
        assert_eq!(format_number(0.6667), "0.6667");
        assert_eq!(format_number(-2.0), "-2");
    }
}
