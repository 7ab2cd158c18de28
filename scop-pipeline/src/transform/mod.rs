use chrono::{DateTime, Offset, TimeZone};
use chrono_tz::Tz;
use heatpump_client::domain::daily::HOUR_FORMAT;
use time::{OffsetDateTime, PrimitiveDateTime, Time};

use crate::pipeline::{Envelope, PipelineError, Transform};
use crate::sources::DailyRow;

/// Convert a raw epoch-seconds cell to a local calendar hour in `tz`,
/// following its daylight-saving rules.
///
/// Fractional seconds are dropped and minutes/seconds truncated, so
/// `1701390599` in London becomes `2023-12-01 00:00:00`. `None` for anything
/// that is not a finite number or whose local time is out of range.
pub fn normalize_epoch(raw: &str, tz: Tz) -> Option<PrimitiveDateTime> {
    let secs = raw.trim().parse::<f64>().ok().filter(|v| v.is_finite())?.floor();
    if secs < i64::MIN as f64 || secs > i64::MAX as f64 {
        return None;
    }
    let secs = secs as i64;
    let utc = DateTime::from_timestamp(secs, 0)?;
    let offset = tz.offset_from_utc_datetime(&utc.naive_utc()).fix().local_minus_utc();

    // Local wall-clock time expressed as if it were UTC.
    let local = OffsetDateTime::from_unix_timestamp(secs.checked_add(i64::from(offset))?).ok()?;
    let hour = Time::from_hms(local.hour(), 0, 0).ok()?;
    Some(PrimitiveDateTime::new(local.date(), hour))
}

/// `YYYY-MM-DD HH:00:00`.
pub fn format_hour(hour: PrimitiveDateTime) -> String {
    hour.format(HOUR_FORMAT).unwrap_or_else(|_| hour.to_string())
}

/// Fills [`DailyRow::hour`] from the timestamp column.
///
/// Never rejects a row: an unparseable timestamp leaves `hour` empty so the
/// sink can still write the row verbatim to the converted file.
#[derive(Debug, Clone)]
pub struct TimestampNormalization {
    pub timestamp_index: usize,
    pub timezone: Tz,
}

impl TimestampNormalization {
    pub fn new(timestamp_index: usize, timezone: Tz) -> Self {
        Self {
            timestamp_index,
            timezone,
        }
    }

    pub fn normalize(&self, mut row: DailyRow) -> DailyRow {
        if row.fields.len() <= 1 {
            return row;
        }
        let raw = row.fields.get(self.timestamp_index).unwrap_or_default();
        row.hour = normalize_epoch(raw, self.timezone);
        if row.hour.is_none() {
            metrics::counter!("daily_timestamp_parse_errors_total").increment(1);
            tracing::debug!(value = raw, "unparseable daily timestamp kept verbatim");
        }
        row
    }
}

#[async_trait::async_trait]
impl Transform<DailyRow, DailyRow> for TimestampNormalization {
    async fn apply(&self, input: Envelope<DailyRow>) -> Result<Envelope<DailyRow>, PipelineError> {
        Ok(input.map(|row| self.normalize(row)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::season::fixtures::season_table;
    use chrono_tz::Europe::{London, Paris};
    use csv::StringRecord;
    use time::macros::datetime;

    #[test]
    fn truncates_to_hour() {
        assert_eq!(normalize_epoch("1701390599", London), Some(datetime!(2023-12-01 00:00:00)));
        assert_eq!(normalize_epoch(" 1701388800.9 ", Tz::UTC), Some(datetime!(2023-12-01 00:00:00)));
        assert_eq!(format_hour(datetime!(2023-12-01 07:00:00)), "2023-12-01 07:00:00");
    }

    #[test]
    fn summer_time_midnight_stays_on_its_day() {
        let seasons = season_table();

        // 2023-09-01 00:00 BST.
        let autumn_start = normalize_epoch("1693522800", London).unwrap();
        assert_eq!(autumn_start, datetime!(2023-09-01 00:00:00));
        assert_eq!(seasons.season_of(autumn_start).unwrap().label, "Autumn");

        // 2023-06-01 00:00 BST opens the full year.
        let first_day = normalize_epoch("1685574000", London).unwrap();
        assert_eq!(first_day, datetime!(2023-06-01 00:00:00));
        assert!(seasons.full_year().contains(first_day));
        assert_eq!(seasons.season_of(first_day).unwrap().label, "Summer");

        // The same instant read as UTC falls into the previous day.
        assert_eq!(normalize_epoch("1685574000", Tz::UTC), Some(datetime!(2023-05-31 23:00:00)));
    }

    #[test]
    fn follows_clock_changes() {
        // Spring forward on 2024-03-31.
        assert_eq!(normalize_epoch("1711843200", London), Some(datetime!(2024-03-31 00:00:00)));
        assert_eq!(normalize_epoch("1711846800", London), Some(datetime!(2024-03-31 02:00:00)));
        // Fall back on 2023-10-29: both 01:00 hours map to the same label.
        assert_eq!(normalize_epoch("1698537600", London), Some(datetime!(2023-10-29 01:00:00)));
        assert_eq!(normalize_epoch("1698541200", London), Some(datetime!(2023-10-29 01:00:00)));
        assert_eq!(normalize_epoch("1698544800", London), Some(datetime!(2023-10-29 02:00:00)));
        assert_eq!(normalize_epoch("1701388800", Paris), Some(datetime!(2023-12-01 01:00:00)));
    }

    #[test]
    fn rejects_non_numeric_and_out_of_range() {
        for raw in ["", "abc", "NaN", "inf", "1e300"] {
            assert_eq!(normalize_epoch(raw, London), None, "{raw}");
        }
        // 9999-12-31 23:59:59 UTC is already year 10000 in Paris.
        assert_eq!(normalize_epoch("253402300799", Paris), None);
        assert_eq!(normalize_epoch("253402300799", Tz::UTC), Some(datetime!(9999-12-31 23:00:00)));
        assert_eq!(normalize_epoch("-99999999999999", London), None);
    }

    #[test]
    fn short_rows_are_left_alone() {
        let t = TimestampNormalization::new(1, London);
        let row = t.normalize(DailyRow::new(StringRecord::from(vec!["1701388800"])));
        assert_eq!(row.hour, None);

        let row = t.normalize(DailyRow::new(StringRecord::from(vec!["5", "1701388800"])));
        assert_eq!(row.hour, Some(datetime!(2023-12-01 00:00:00)));
    }
}
