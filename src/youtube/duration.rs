use regex::Regex;

lazy_static::lazy_static! {
    static ref ISO_DURATION: Regex =
        Regex::new(r"^PT(?:(\d+)H)?(?:(\d+)M)?(?:(\d+)S)?$").expect("valid duration regex");
}

/// Format an ISO-8601 video duration (`PT1H2M3S`) as a clock string.
///
/// `H:MM:SS` when the duration has an hour component, `M:SS` otherwise.
/// Anything unparseable becomes `0:00`.
pub fn format_duration(iso: &str) -> String {
    let Some(caps) = ISO_DURATION.captures(iso.trim()) else {
        return "0:00".to_string();
    };
    // A component that matched but does not fit a u64 makes the whole value malformed
    let part = |i: usize| -> Result<Option<u64>, std::num::ParseIntError> {
        caps.get(i).map(|m| m.as_str().parse()).transpose()
    };
    let (Ok(hours), Ok(minutes), Ok(seconds)) = (part(1), part(2), part(3)) else {
        return "0:00".to_string();
    };

    let minutes = minutes.unwrap_or(0);
    let seconds = seconds.unwrap_or(0);
    match hours {
        Some(hours) => format!("{hours}:{minutes:02}:{seconds:02}"),
        None => format!("{minutes}:{seconds:02}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hours_minutes_seconds() {
        assert_eq!(format_duration("PT1H2M3S"), "1:02:03");
        assert_eq!(format_duration("PT2H"), "2:00:00");
    }

    #[test]
    fn minutes_and_seconds() {
        assert_eq!(format_duration("PT5M9S"), "5:09");
        assert_eq!(format_duration("PT12M"), "12:00");
        assert_eq!(format_duration("PT45S"), "0:45");
    }

    #[test]
    fn malformed_is_zero() {
        assert_eq!(format_duration(""), "0:00");
        assert_eq!(format_duration("1:02:03"), "0:00");
        assert_eq!(format_duration("P1DT2H"), "0:00");
        assert_eq!(format_duration("PTXS"), "0:00");
    }

    #[test]
    fn overflowing_component_is_malformed() {
        assert_eq!(format_duration("PT99999999999999999999H5M"), "0:00");
        assert_eq!(format_duration("PT1M99999999999999999999S"), "0:00");
    }
}
