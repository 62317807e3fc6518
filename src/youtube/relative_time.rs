use chrono::{DateTime, Utc};

/// Portuguese "how long ago" label for a publication date.
pub fn format_relative(published: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let days = (now - published).num_days();
    match days {
        ..=0 => "Hoje".to_string(),
        1 => "Há 1 dia".to_string(),
        2..=29 => format!("Há {days} dias"),
        30..=364 => plural(days / 30, "mês", "meses"),
        _ => plural(days / 365, "ano", "anos"),
    }
}

/// Same as [`format_relative`] for an RFC 3339 timestamp; unparseable input is returned as is.
pub fn format_relative_str(published: &str, now: DateTime<Utc>) -> String {
    match DateTime::parse_from_rfc3339(published) {
        Ok(dt) => format_relative(dt.with_timezone(&Utc), now),
        Err(e) => {
            tracing::debug!(published, error = %e, "unparseable publish date");
            published.to_string()
        }
    }
}

fn plural(n: i64, one: &str, many: &str) -> String {
    if n == 1 {
        format!("Há 1 {one}")
    } else {
        format!("Há {n} {many}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 15, 12, 0, 0).unwrap()
    }

    fn ago(days: i64) -> String {
        format_relative(now() - Duration::days(days), now())
    }

    #[test]
    fn today_and_days() {
        assert_eq!(ago(0), "Hoje");
        assert_eq!(ago(1), "Há 1 dia");
        assert_eq!(ago(10), "Há 10 dias");
        assert_eq!(ago(29), "Há 29 dias");
    }

    #[test]
    fn months_and_years() {
        assert_eq!(ago(30), "Há 1 mês");
        assert_eq!(ago(95), "Há 3 meses");
        assert_eq!(ago(364), "Há 12 meses");
        assert_eq!(ago(400), "Há 1 ano");
        assert_eq!(ago(800), "Há 2 anos");
    }

    #[test]
    fn future_and_partial_days_are_today() {
        assert_eq!(format_relative(now() + Duration::hours(5), now()), "Hoje");
        assert_eq!(format_relative(now() - Duration::hours(23), now()), "Hoje");
    }

    #[test]
    fn parses_rfc3339() {
        assert_eq!(format_relative_str("2024-06-05T12:00:00Z", now()), "Há 10 dias");
        assert_eq!(format_relative_str("ontem", now()), "ontem");
    }
}
