/// Text processing utilities
pub mod text {
    /// First `max_chars` characters of `text`, never splitting a code point.
    pub fn truncate_chars(text: &str, max_chars: usize) -> String {
        match text.char_indices().nth(max_chars) {
            Some((end, _)) => text[..end].to_string(),
            None => text.to_string(),
        }
    }

    /// The first candidate that is present and not empty.
    pub fn first_non_empty<'a>(candidates: impl IntoIterator<Item = Option<&'a str>>) -> Option<&'a str> {
        candidates.into_iter().flatten().find(|s| !s.is_empty())
    }
}

/// URL utilities
pub mod url {
    use url::Url;

    /// Join a base URL and a path without doubling or dropping the slash.
    pub fn endpoint_url(base_url: &str, path: &str) -> Result<Url, url::ParseError> {
        let base = base_url.trim_end_matches('/');
        if path.is_empty() {
            return Url::parse(base);
        }
        let path = path.trim_start_matches('/');
        Url::parse(&format!("{}/{}", base, path))
    }
}

/// Time utilities
pub mod time {
    use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc};

    const RANGE_SEPARATOR: &str = " - ";
    const RANGE_DAY_FORMAT: &str = "%d %b, %Y";

    /// Best-effort parse of an upstream publication timestamp.
    ///
    /// Accepts RFC 3339 (`2024-01-01T10:00:00Z`), offsets without a colon
    /// (`2024-01-01T10:00:00+0000`), naive timestamps (read as UTC) and bare dates.
    pub fn parse_published_at(value: &str) -> Option<DateTime<Utc>> {
        let value = value.trim();
        if value.is_empty() {
            return None;
        }
        if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
            return Some(dt.with_timezone(&Utc));
        }
        if let Ok(dt) = DateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%.f%z") {
            return Some(dt.with_timezone(&Utc));
        }
        if let Ok(naive) = NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%.f") {
            return Some(Utc.from_utc_datetime(&naive));
        }
        parse_calendar_date(value).map(start_of_day)
    }

    /// `YYYY-MM-DD`
    pub fn parse_calendar_date(value: &str) -> Option<NaiveDate> {
        NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d").ok()
    }

    pub fn start_of_day(date: NaiveDate) -> DateTime<Utc> {
        Utc.from_utc_datetime(&date.and_time(NaiveTime::MIN))
    }

    /// 23:59:59.999 UTC on `date`.
    pub fn end_of_day(date: NaiveDate) -> DateTime<Utc> {
        let last_milli = NaiveTime::from_hms_milli_opt(23, 59, 59, 999).unwrap_or(NaiveTime::MIN);
        Utc.from_utc_datetime(&date.and_time(last_milli))
    }

    /// `YYYY-MM-DD` -> `YYYYMMDD`
    pub fn compact_date(value: &str) -> String {
        value.trim().replace('-', "")
    }

    /// Parse a picker range such as `1 Jan, 2024 - 31 Dec, 2024` into ISO days.
    pub fn parse_date_range(range: &str) -> Option<(String, String)> {
        let (start, end) = range.split_once(RANGE_SEPARATOR)?;
        let start = NaiveDate::parse_from_str(start.trim(), RANGE_DAY_FORMAT).ok()?;
        let end = NaiveDate::parse_from_str(end.trim(), RANGE_DAY_FORMAT).ok()?;
        Some((start.format("%Y-%m-%d").to_string(), end.format("%Y-%m-%d").to_string()))
    }

    /// Inverse of [`parse_date_range`]. A lone start date renders by itself.
    pub fn format_date_range(start_date: Option<&str>, end_date: Option<&str>) -> String {
        let day = |value: &str| parse_calendar_date(value).map(|d| d.format("%-d %b, %Y").to_string());
        match (start_date.and_then(day), end_date.and_then(day)) {
            (Some(start), Some(end)) => format!("{}{}{}", start, RANGE_SEPARATOR, end),
            (Some(start), None) => start,
            _ => String::new(),
        }
    }
}
