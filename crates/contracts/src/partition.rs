//! Hourly time partitions (`YYYY/MM/DD/HH`, UTC)

use chrono::{DateTime, Duration, NaiveDate, Timelike, Utc};

/// Partition prefix for an instant
pub fn hour_prefix(at: DateTime<Utc>) -> String {
    at.format("%Y/%m/%d/%H").to_string()
}

/// Prefixes for the partition containing `now` and the `lookback` previous hours,
/// newest first
pub fn recent_hour_prefixes(now: DateTime<Utc>, lookback: u32) -> Vec<String> {
    (0..=i64::from(lookback))
        .map(|h| hour_prefix(now - Duration::hours(h)))
        .collect()
}

/// Partition encoded at the start of an object key, if any
///
/// `2025/01/02/03/obs.csv` yields `2025/01/02/03`; keys whose first four
/// segments are not a valid date and hour yield `None`.
pub fn partition_of_key(key: &str) -> Option<String> {
    let mut parts = key.splitn(5, '/');
    let (year, month, day, hour) = (parts.next()?, parts.next()?, parts.next()?, parts.next()?);
    // a bare `YYYY/MM/DD/HH` with no file name is not a partitioned key
    parts.next().filter(|rest| !rest.is_empty())?;

    let fixed_width = year.len() == 4 && month.len() == 2 && day.len() == 2 && hour.len() == 2;
    if !fixed_width {
        return None;
    }

    let date = NaiveDate::from_ymd_opt(year.parse().ok()?, month.parse().ok()?, day.parse().ok()?)?;
    let time = date.and_hms_opt(hour.parse().ok()?, 0, 0)?;
    Some(format!("{year}/{month}/{day}/{:02}", time.hour()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_hour_prefix() {
        let at = Utc.with_ymd_and_hms(2025, 1, 2, 3, 59, 59).unwrap();
        assert_eq!(hour_prefix(at), "2025/01/02/03");
    }

    #[test]
    fn test_recent_prefixes_cross_midnight() {
        let at = Utc.with_ymd_and_hms(2025, 1, 2, 0, 10, 0).unwrap();
        assert_eq!(
            recent_hour_prefixes(at, 1),
            vec!["2025/01/02/00".to_string(), "2025/01/01/23".to_string()]
        );
        assert_eq!(recent_hour_prefixes(at, 0).len(), 1);
    }

    #[test]
    fn test_partition_of_key() {
        assert_eq!(
            partition_of_key("2025/01/02/03/obs.csv").as_deref(),
            Some("2025/01/02/03")
        );
        assert_eq!(
            partition_of_key("2025/01/02/03/sub/obs.csv").as_deref(),
            Some("2025/01/02/03")
        );
        assert_eq!(partition_of_key("obs.csv"), None);
        assert_eq!(partition_of_key("2025/13/02/03/obs.csv"), None);
        assert_eq!(partition_of_key("2025/01/02/24/obs.csv"), None);
        assert_eq!(partition_of_key("2025/1/2/3/obs.csv"), None);
        assert_eq!(partition_of_key("2025/01/02/03"), None);
    }
}
