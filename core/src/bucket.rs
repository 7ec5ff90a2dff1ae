use crate::error::QueryError;
use crate::telemetry::{Bucket, TimeSeriesRow};
use chrono::{DateTime, Datelike, Duration, NaiveDate, Utc};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

const MAX_COUNT: u32 = 10_000;

// 2000-01-03T00:00:00Z, a monday, the default bucket origin of timescale
const FIXED_ORIGIN_SECS: i64 = 946_857_600;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BucketUnit {
    Second,
    Minute,
    Hour,
    Day,
    Week,
    Month,
    Year,
}

impl BucketUnit {
    pub fn as_str(&self) -> &'static str {
        match self {
            BucketUnit::Second => "second",
            BucketUnit::Minute => "minute",
            BucketUnit::Hour => "hour",
            BucketUnit::Day => "day",
            BucketUnit::Week => "week",
            BucketUnit::Month => "month",
            BucketUnit::Year => "year",
        }
    }

    fn seconds(&self) -> Option<i64> {
        match self {
            BucketUnit::Second => Some(1),
            BucketUnit::Minute => Some(60),
            BucketUnit::Hour => Some(3_600),
            BucketUnit::Day => Some(86_400),
            BucketUnit::Week => Some(604_800),
            BucketUnit::Month | BucketUnit::Year => None,
        }
    }
}

impl FromStr for BucketUnit {
    type Err = QueryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lowered = s.to_ascii_lowercase();
        let singular = lowered.strip_suffix('s').unwrap_or(&lowered);
        match singular {
            "second" => Ok(BucketUnit::Second),
            "minute" => Ok(BucketUnit::Minute),
            "hour" => Ok(BucketUnit::Hour),
            "day" => Ok(BucketUnit::Day),
            "week" => Ok(BucketUnit::Week),
            "month" => Ok(BucketUnit::Month),
            "year" => Ok(BucketUnit::Year),
            _ => Err(QueryError::InvalidBucketWidth(s.to_owned())),
        }
    }
}

/// Width of a time bucket, `[count][whitespace]unit`, e.g. `hour`, `1day`, `15 minutes`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BucketWidth {
    count: u32,
    unit: BucketUnit,
}

impl Default for BucketWidth {
    fn default() -> Self {
        BucketWidth {
            count: 1,
            unit: BucketUnit::Hour,
        }
    }
}

impl BucketWidth {
    pub fn new(count: u32, unit: BucketUnit) -> Result<Self, QueryError> {
        if count == 0 || count > MAX_COUNT {
            return Err(QueryError::InvalidBucketWidth(format!(
                "{} {}",
                count,
                unit.as_str()
            )));
        }
        Ok(BucketWidth { count, unit })
    }

    pub fn count(&self) -> u32 {
        self.count
    }

    pub fn unit(&self) -> BucketUnit {
        self.unit
    }

    /// Postgres interval literal, bound as a statement parameter
    pub fn interval(&self) -> String {
        if self.count == 1 {
            format!("1 {}", self.unit.as_str())
        } else {
            format!("{} {}s", self.count, self.unit.as_str())
        }
    }

    /// Start of the bucket `ts` falls into
    pub fn floor(&self, ts: DateTime<Utc>) -> DateTime<Utc> {
        match self.unit.seconds() {
            Some(unit_secs) => {
                let width = unit_secs * self.count as i64;
                let rem = (ts.timestamp() - FIXED_ORIGIN_SECS).rem_euclid(width);
                ts - Duration::seconds(rem)
                    - Duration::nanoseconds(ts.timestamp_subsec_nanos() as i64)
            }
            None => {
                let width = match self.unit {
                    BucketUnit::Year => self.count as i32 * 12,
                    _ => self.count as i32,
                };
                let months = (ts.year() - 2000) * 12 + ts.month0() as i32;
                let floored = months.div_euclid(width) * width;
                NaiveDate::from_ymd_opt(
                    2000 + floored.div_euclid(12),
                    floored.rem_euclid(12) as u32 + 1,
                    1,
                )
                .and_then(|date| date.and_hms_opt(0, 0, 0))
                .map(|naive| DateTime::<Utc>::from_naive_utc_and_offset(naive, Utc))
                .unwrap_or(ts)
            }
        }
    }

    /// Groups rows into ascending buckets, mirrors the time-series aggregation
    pub fn aggregate<'a, I>(&self, rows: I) -> Vec<Bucket>
    where
        I: IntoIterator<Item = &'a TimeSeriesRow>,
    {
        let mut buckets: BTreeMap<DateTime<Utc>, Accumulator> = BTreeMap::new();
        for row in rows {
            buckets
                .entry(self.floor(row.last_seen))
                .or_default()
                .push(row);
        }
        buckets
            .into_iter()
            .map(|(start, acc)| acc.finish(start))
            .collect()
    }
}

impl FromStr for BucketWidth {
    type Err = QueryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let split = trimmed
            .find(|c: char| !c.is_ascii_digit())
            .ok_or_else(|| QueryError::InvalidBucketWidth(s.to_owned()))?;
        let (digits, unit) = trimmed.split_at(split);

        let count = if digits.is_empty() {
            1
        } else {
            digits
                .parse::<u32>()
                .map_err(|_| QueryError::InvalidBucketWidth(s.to_owned()))?
        };
        let unit = unit.trim_start().parse::<BucketUnit>()?;
        BucketWidth::new(count, unit)
    }
}

impl fmt::Display for BucketWidth {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.interval())
    }
}

#[derive(Default)]
struct Accumulator {
    samples: i64,
    temperature: Mean,
    humidity: Mean,
    velocity: Mean,
    battery_level: Mean,
    min_temperature: Option<f64>,
    max_temperature: Option<f64>,
}

#[derive(Default)]
struct Mean {
    sum: f64,
    count: u32,
}

impl Mean {
    fn push(&mut self, value: Option<f64>) {
        if let Some(v) = value {
            self.sum += v;
            self.count += 1;
        }
    }

    fn value(&self) -> Option<f64> {
        if self.count == 0 {
            None
        } else {
            Some(self.sum / self.count as f64)
        }
    }
}

impl Accumulator {
    fn push(&mut self, row: &TimeSeriesRow) {
        self.samples += 1;
        self.temperature.push(row.temperature);
        self.humidity.push(row.humidity);
        self.velocity.push(row.velocity);
        self.battery_level.push(Some(row.battery_level));
        if let Some(t) = row.temperature {
            self.min_temperature = Some(self.min_temperature.map_or(t, |m| m.min(t)));
            self.max_temperature = Some(self.max_temperature.map_or(t, |m| m.max(t)));
        }
    }

    fn finish(self, bucket: DateTime<Utc>) -> Bucket {
        Bucket {
            bucket,
            samples: self.samples,
            avg_temperature: self.temperature.value(),
            min_temperature: self.min_temperature,
            max_temperature: self.max_temperature,
            avg_humidity: self.humidity.value(),
            avg_velocity: self.velocity.value(),
            avg_battery_level: self.battery_level.value(),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_parse_bucket_widths() {
        assert_eq!(
            BucketWidth::new(1, BucketUnit::Hour).unwrap(),
            "hour".parse().unwrap()
        );
        assert_eq!(
            BucketWidth::new(1, BucketUnit::Day).unwrap(),
            "1day".parse().unwrap()
        );
        assert_eq!(
            BucketWidth::new(15, BucketUnit::Minute).unwrap(),
            " 15 Minutes ".parse().unwrap()
        );
        assert_eq!("2 weeks", "2week".parse::<BucketWidth>().unwrap().interval());
    }

    #[test]
    fn test_reject_injected_bucket_widths() {
        for raw in [
            "",
            "1",
            "0 hours",
            "1 fortnight",
            "1 hour'); DROP TABLE sensor_data; --",
            "-1 hour",
            "99999 days",
        ] {
            assert!(raw.parse::<BucketWidth>().is_err(), "accepted {:?}", raw);
        }
    }

    #[test]
    fn test_floor_fixed_width() {
        let width: BucketWidth = "15 minutes".parse().unwrap();
        let ts = Utc.with_ymd_and_hms(2024, 5, 1, 10, 44, 59).unwrap();

        assert_eq!(
            Utc.with_ymd_and_hms(2024, 5, 1, 10, 30, 0).unwrap(),
            width.floor(ts)
        );
    }

    #[test]
    fn test_floor_calendar_width() {
        let month: BucketWidth = "month".parse().unwrap();
        let year: BucketWidth = "1 year".parse().unwrap();
        let ts = Utc.with_ymd_and_hms(2024, 5, 17, 10, 44, 59).unwrap();

        assert_eq!(
            Utc.with_ymd_and_hms(2024, 5, 1, 0, 0, 0).unwrap(),
            month.floor(ts)
        );
        assert_eq!(
            Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
            year.floor(ts)
        );
    }

    #[test]
    fn test_aggregate_orders_and_averages() {
        let width = BucketWidth::default();
        let base = Utc.with_ymd_and_hms(2024, 5, 1, 10, 0, 0).unwrap();
        let rows = vec![
            TimeSeriesRow {
                temperature: Some(20.0),
                humidity: Some(40.0),
                velocity: None,
                battery_level: 0.9,
                last_seen: base + Duration::minutes(70),
            },
            TimeSeriesRow {
                temperature: Some(21.0),
                humidity: Some(50.0),
                velocity: None,
                battery_level: 0.8,
                last_seen: base + Duration::minutes(5),
            },
            TimeSeriesRow {
                temperature: Some(23.0),
                humidity: Some(60.0),
                velocity: Some(1.5),
                battery_level: 0.6,
                last_seen: base + Duration::minutes(10),
            },
        ];

        let buckets = width.aggregate(&rows);

        assert_eq!(2, buckets.len());
        assert_eq!(base, buckets[0].bucket);
        assert_eq!(2, buckets[0].samples);
        assert_eq!(Some(22.0), buckets[0].avg_temperature);
        assert_eq!(Some(21.0), buckets[0].min_temperature);
        assert_eq!(Some(23.0), buckets[0].max_temperature);
        assert_eq!(Some(1.5), buckets[0].avg_velocity);
        assert_eq!(base + Duration::hours(1), buckets[1].bucket);
        assert_eq!(None, buckets[1].avg_velocity);
    }
}
