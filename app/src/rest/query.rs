use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// `?skip=&limit=` of the sensor listing
#[derive(Debug, Serialize, Deserialize)]
pub struct ListQuery {
    #[serde(default)]
    pub skip: i64,
    #[serde(default = "ListQuery::default_limit")]
    pub limit: i64,
}

impl ListQuery {
    fn default_limit() -> i64 {
        100
    }
}

/// `?from=&to=&bucket=`, every bound is optional
#[derive(Debug, Serialize, Deserialize)]
pub struct RangeQuery {
    #[serde(default, alias = "from_date")]
    pub from: Option<DateTime<Utc>>,
    #[serde(default)]
    pub to: Option<DateTime<Utc>>,
    #[serde(default)]
    pub bucket: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct NearQuery {
    pub latitude: f64,
    pub longitude: f64,
    /// Meters
    pub radius: f64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SearchQuery {
    pub query: String,
    #[serde(default = "SearchQuery::default_size")]
    pub size: usize,
    #[serde(default = "SearchQuery::default_search_type")]
    pub search_type: String,
}

impl SearchQuery {
    fn default_size() -> usize {
        10
    }

    fn default_search_type() -> String {
        "match".to_owned()
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct BatteryQuery {
    #[serde(default)]
    pub threshold: Option<f64>,
}
