//! In-process implementation of every store, used by the test-suite and for
//! running the gateway without any backend.

use super::{
    DocumentStore, IdentityStore, RollupStore, SearchIndex, Stores, TelemetryCache,
    TimeSeriesStore, CACHE, DOCUMENTS, IDENTITY, ROLLUPS, SEARCH, TIMESERIES,
};
use crate::error::StoreError;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::{Mutex, RwLock};
use senser_core::search::{SearchDocument, SearchField, SearchMode, SearchRequest};
use senser_core::{
    BatteryReading, Bucket, BucketWidth, GeoPoint, SensorIdentity, SensorMetadata,
    TemperatureAggregate, TimeSeriesRow, TypeCount,
};
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::sync::Arc;

/// Mean earth radius used for spherical distances, in meters
const EARTH_RADIUS_M: f64 = 6_378_100.0;

#[derive(Default)]
struct State {
    next_id: i32,
    identities: BTreeMap<i32, SensorIdentity>,
    documents: HashMap<i32, SensorMetadata>,
    cache: HashMap<i32, String>,
    samples: HashMap<i32, Vec<TimeSeriesRow>>,
    rollup_schema: bool,
    temperatures: BTreeMap<(i32, DateTime<Utc>), f64>,
    types: BTreeSet<(String, i32)>,
    batteries: BTreeMap<i32, f64>,
    search_index: bool,
    search_documents: BTreeMap<i32, SearchDocument>,
}

#[derive(Default)]
pub struct MemoryStores {
    state: Mutex<State>,
    unreachable: RwLock<HashSet<&'static str>>,
    ddl_calls: Mutex<usize>,
    stale_names: Mutex<HashSet<String>>,
}

impl MemoryStores {
    pub fn new() -> Arc<Self> {
        Arc::new(MemoryStores::default())
    }

    /// Hands out every store, all backed by this instance
    pub fn stores(self: &Arc<Self>) -> Stores {
        Stores {
            identity: self.clone(),
            documents: self.clone(),
            cache: self.clone(),
            timeseries: self.clone(),
            rollups: self.clone(),
            search: self.clone(),
        }
    }

    /// Every call to `store` fails until reset
    pub fn set_unreachable(&self, store: &'static str, unreachable: bool) {
        let mut stores = self.unreachable.write();
        if unreachable {
            stores.insert(store);
        } else {
            stores.remove(store);
        }
    }

    /// Drops a metadata document, leaving its identity behind
    pub fn remove_metadata(&self, id: i32) -> Option<SensorMetadata> {
        self.state.lock().documents.remove(&id)
    }

    /// Next lookup of `name` misses, as if another writer inserted it right after
    pub fn miss_name_lookup_once(&self, name: &str) {
        self.stale_names.lock().insert(name.to_owned());
    }

    /// Overwrites a cache entry with an arbitrary payload
    pub fn put_raw_cache(&self, id: i32, payload: &str) {
        self.state.lock().cache.insert(id, payload.to_owned());
    }

    /// Times schema or index creation actually ran
    pub fn ddl_calls(&self) -> usize {
        *self.ddl_calls.lock()
    }

    fn reach(&self, store: &'static str) -> Result<(), StoreError> {
        if self.unreachable.read().contains(store) {
            return Err(StoreError::Unreachable(store));
        }
        Ok(())
    }
}

#[async_trait]
impl IdentityStore for MemoryStores {
    async fn create(&self, name: &str) -> Result<SensorIdentity, StoreError> {
        self.reach(IDENTITY)?;
        let mut state = self.state.lock();
        if state.identities.values().any(|i| i.name == name) {
            return Err(StoreError::Duplicate(name.to_owned()));
        }
        state.next_id += 1;
        let identity = SensorIdentity {
            id: state.next_id,
            name: name.to_owned(),
            joined_at: Utc::now().naive_utc(),
        };
        state.identities.insert(identity.id, identity.clone());
        Ok(identity)
    }

    async fn get_by_id(&self, id: i32) -> Result<Option<SensorIdentity>, StoreError> {
        self.reach(IDENTITY)?;
        Ok(self.state.lock().identities.get(&id).cloned())
    }

    async fn get_by_name(&self, name: &str) -> Result<Option<SensorIdentity>, StoreError> {
        self.reach(IDENTITY)?;
        if self.stale_names.lock().remove(name) {
            return Ok(None);
        }
        let state = self.state.lock();
        Ok(state.identities.values().find(|i| i.name == name).cloned())
    }

    async fn list(&self, skip: i64, limit: i64) -> Result<Vec<SensorIdentity>, StoreError> {
        self.reach(IDENTITY)?;
        let state = self.state.lock();
        Ok(state
            .identities
            .values()
            .skip(skip.max(0) as usize)
            .take(limit.max(0) as usize)
            .cloned()
            .collect())
    }

    async fn delete(&self, id: i32) -> Result<bool, StoreError> {
        self.reach(IDENTITY)?;
        Ok(self.state.lock().identities.remove(&id).is_some())
    }
}

#[async_trait]
impl DocumentStore for MemoryStores {
    async fn upsert(&self, metadata: &SensorMetadata) -> Result<(), StoreError> {
        self.reach(DOCUMENTS)?;
        self.state
            .lock()
            .documents
            .insert(metadata.id, metadata.clone());
        Ok(())
    }

    async fn get(&self, id: i32) -> Result<Option<SensorMetadata>, StoreError> {
        self.reach(DOCUMENTS)?;
        Ok(self.state.lock().documents.get(&id).cloned())
    }

    async fn geo_near(
        &self,
        point: GeoPoint,
        radius_m: f64,
    ) -> Result<Vec<SensorMetadata>, StoreError> {
        self.reach(DOCUMENTS)?;
        let state = self.state.lock();
        let mut hits: Vec<(f64, &SensorMetadata)> = state
            .documents
            .values()
            .map(|doc| (distance_m(point, doc.location), doc))
            .filter(|(distance, _)| *distance <= radius_m)
            .collect();
        hits.sort_by(|a, b| a.0.total_cmp(&b.0).then(a.1.id.cmp(&b.1.id)));
        Ok(hits.into_iter().map(|(_, doc)| doc.clone()).collect())
    }
}

#[async_trait]
impl TelemetryCache for MemoryStores {
    async fn put(&self, id: i32, payload: String) -> Result<(), StoreError> {
        self.reach(CACHE)?;
        self.state.lock().cache.insert(id, payload);
        Ok(())
    }

    async fn get(&self, id: i32) -> Result<Option<String>, StoreError> {
        self.reach(CACHE)?;
        Ok(self.state.lock().cache.get(&id).cloned())
    }
}

#[async_trait]
impl TimeSeriesStore for MemoryStores {
    async fn insert_sample(&self, id: i32, row: &TimeSeriesRow) -> Result<(), StoreError> {
        self.reach(TIMESERIES)?;
        self.state.lock().samples.entry(id).or_default().push(*row);
        Ok(())
    }

    async fn bucketed_query(
        &self,
        id: i32,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
        width: BucketWidth,
    ) -> Result<Vec<Bucket>, StoreError> {
        self.reach(TIMESERIES)?;
        let state = self.state.lock();
        let rows = state.samples.get(&id).map(Vec::as_slice).unwrap_or_default();
        Ok(width.aggregate(
            rows.iter()
                .filter(|row| row.last_seen >= from && row.last_seen <= to),
        ))
    }
}

#[async_trait]
impl RollupStore for MemoryStores {
    async fn ensure_schema(&self) -> Result<(), StoreError> {
        self.reach(ROLLUPS)?;
        let mut state = self.state.lock();
        if !state.rollup_schema {
            state.rollup_schema = true;
            *self.ddl_calls.lock() += 1;
        }
        Ok(())
    }

    async fn insert_temperature(
        &self,
        id: i32,
        last_seen: DateTime<Utc>,
        temperature: f64,
    ) -> Result<(), StoreError> {
        self.reach(ROLLUPS)?;
        let mut state = self.state.lock();
        require_schema(&state)?;
        state.temperatures.insert((id, last_seen), temperature);
        Ok(())
    }

    async fn insert_type(&self, id: i32, sensor_type: &str) -> Result<(), StoreError> {
        self.reach(ROLLUPS)?;
        let mut state = self.state.lock();
        require_schema(&state)?;
        state.types.insert((sensor_type.to_owned(), id));
        Ok(())
    }

    async fn insert_battery(&self, id: i32, battery_level: f64) -> Result<(), StoreError> {
        self.reach(ROLLUPS)?;
        let mut state = self.state.lock();
        require_schema(&state)?;
        state.batteries.insert(id, battery_level);
        Ok(())
    }

    async fn aggregate_temperature(&self) -> Result<Vec<TemperatureAggregate>, StoreError> {
        self.reach(ROLLUPS)?;
        let state = self.state.lock();
        let mut grouped: BTreeMap<i32, Vec<f64>> = BTreeMap::new();
        for ((id, _), temperature) in state.temperatures.iter() {
            grouped.entry(*id).or_default().push(*temperature);
        }
        Ok(grouped
            .into_iter()
            .map(|(id, values)| TemperatureAggregate {
                id,
                min: values.iter().copied().fold(f64::INFINITY, f64::min),
                max: values.iter().copied().fold(f64::NEG_INFINITY, f64::max),
                avg: values.iter().sum::<f64>() / values.len() as f64,
            })
            .collect())
    }

    async fn count_by_type(&self) -> Result<Vec<TypeCount>, StoreError> {
        self.reach(ROLLUPS)?;
        let state = self.state.lock();
        let mut grouped: BTreeMap<&str, i64> = BTreeMap::new();
        for (sensor_type, _) in state.types.iter() {
            *grouped.entry(sensor_type.as_str()).or_default() += 1;
        }
        Ok(grouped
            .into_iter()
            .map(|(sensor_type, quantity)| TypeCount {
                sensor_type: sensor_type.to_owned(),
                quantity,
            })
            .collect())
    }

    async fn low_battery(&self, threshold: f64) -> Result<Vec<BatteryReading>, StoreError> {
        self.reach(ROLLUPS)?;
        let state = self.state.lock();
        Ok(state
            .batteries
            .iter()
            .filter(|(_, level)| **level < threshold)
            .map(|(id, level)| BatteryReading {
                id: *id,
                battery_level: *level,
            })
            .collect())
    }
}

#[async_trait]
impl SearchIndex for MemoryStores {
    async fn ensure_index(&self) -> Result<(), StoreError> {
        self.reach(SEARCH)?;
        let mut state = self.state.lock();
        if !state.search_index {
            state.search_index = true;
            *self.ddl_calls.lock() += 1;
        }
        Ok(())
    }

    async fn index_document(&self, doc: &SearchDocument) -> Result<(), StoreError> {
        self.reach(SEARCH)?;
        self.state
            .lock()
            .search_documents
            .insert(doc.id, doc.clone());
        Ok(())
    }

    async fn search(&self, request: &SearchRequest) -> Result<Vec<i32>, StoreError> {
        self.reach(SEARCH)?;
        let state = self.state.lock();
        Ok(state
            .search_documents
            .values()
            .filter(|doc| matches_request(doc, request))
            .take(request.size)
            .map(|doc| doc.id)
            .collect())
    }
}

fn require_schema(state: &State) -> Result<(), StoreError> {
    if !state.rollup_schema {
        return Err(StoreError::wide_column("keyspace sensor does not exist"));
    }
    Ok(())
}

/// Great-circle distance on a sphere
fn distance_m(a: GeoPoint, b: GeoPoint) -> f64 {
    let (lat_a, lat_b) = (a.latitude.to_radians(), b.latitude.to_radians());
    let d_lat = lat_b - lat_a;
    let d_lon = (b.longitude - a.longitude).to_radians();
    let h = (d_lat / 2.0).sin().powi(2) + lat_a.cos() * lat_b.cos() * (d_lon / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_M * h.sqrt().min(1.0).asin()
}

fn tokens(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(str::to_lowercase)
        .collect()
}

/// Edit distance allowed by `fuzziness: AUTO`
fn auto_fuzziness(term: &str) -> usize {
    match term.chars().count() {
        0..=2 => 0,
        3..=5 => 1,
        _ => 2,
    }
}

fn levenshtein(a: &str, b: &str) -> usize {
    let b: Vec<char> = b.chars().collect();
    let mut prev: Vec<usize> = (0..=b.len()).collect();
    for (i, ca) in a.chars().enumerate() {
        let mut curr = vec![i + 1; b.len() + 1];
        for (j, cb) in b.iter().enumerate() {
            let cost = usize::from(ca != *cb);
            curr[j + 1] = (prev[j] + cost).min(prev[j + 1] + 1).min(curr[j] + 1);
        }
        prev = curr;
    }
    prev[b.len()]
}

fn contains_sequence(haystack: &[String], needle: &[String], prefix_last: bool) -> bool {
    if needle.is_empty() {
        return false;
    }
    haystack.windows(needle.len()).any(|window| {
        window.iter().zip(needle).enumerate().all(|(i, (h, n))| {
            if prefix_last && i == needle.len() - 1 {
                h.starts_with(n.as_str())
            } else {
                h == n
            }
        })
    })
}

/// Approximates the index semantics: keyword fields compare whole values,
/// the description is a tokenized text field
fn matches_request(doc: &SearchDocument, request: &SearchRequest) -> bool {
    let value = doc.field(request.query.field);
    let query = request.query.value.as_text();

    if request.query.field != SearchField::Description {
        return match request.mode {
            SearchMode::Match | SearchMode::MatchPhrase | SearchMode::Term => value == query,
            SearchMode::MatchPhrasePrefix | SearchMode::Prefix => value.starts_with(&query),
            SearchMode::Similar => levenshtein(&value, &query) <= auto_fuzziness(&query),
        };
    }

    let doc_tokens = tokens(&value);
    let query_tokens = tokens(&query);
    match request.mode {
        SearchMode::Match => query_tokens.iter().any(|q| doc_tokens.contains(q)),
        SearchMode::MatchPhrase => contains_sequence(&doc_tokens, &query_tokens, false),
        SearchMode::MatchPhrasePrefix => contains_sequence(&doc_tokens, &query_tokens, true),
        SearchMode::Term => doc_tokens.contains(&query),
        SearchMode::Prefix => doc_tokens.iter().any(|t| t.starts_with(&query)),
        SearchMode::Similar => doc_tokens
            .iter()
            .any(|t| levenshtein(t, &query.to_lowercase()) <= auto_fuzziness(&query)),
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use senser_core::search::StructuredQuery;

    fn request(expression: &str, mode: SearchMode) -> SearchRequest {
        let query: StructuredQuery = expression.parse().unwrap();
        SearchRequest::new(query, mode, 10).unwrap()
    }

    fn doc(id: i32, name: &str, description: &str) -> SearchDocument {
        SearchDocument {
            id,
            name: name.to_owned(),
            sensor_type: "temp_sensor".to_owned(),
            description: description.to_owned(),
        }
    }

    #[test]
    fn test_distance() {
        let barcelona = GeoPoint::new(41.3874, 2.1686);
        let girona = GeoPoint::new(41.9794, 2.8214);
        let km = distance_m(barcelona, girona) / 1000.0;
        assert!((84.0..88.0).contains(&km), "{}", km);
        assert_eq!(0.0, distance_m(barcelona, barcelona));
    }

    #[test]
    fn test_levenshtein() {
        assert_eq!(0, levenshtein("sensor", "sensor"));
        assert_eq!(1, levenshtein("sensor", "senzor"));
        assert_eq!(3, levenshtein("", "abc"));
    }

    #[test]
    fn test_keyword_matching() {
        let d = doc(1, "sn-1", "rooftop temperature gauge");
        assert!(matches_request(&d, &request(r#"{"name": "sn-1"}"#, SearchMode::Match)));
        assert!(!matches_request(&d, &request(r#"{"name": "sn"}"#, SearchMode::Term)));
        assert!(matches_request(&d, &request(r#"{"name": "sn"}"#, SearchMode::Prefix)));
        assert!(matches_request(&d, &request(r#"{"name": "sn-2"}"#, SearchMode::Similar)));
        assert!(matches_request(&d, &request(r#"{"id": 1}"#, SearchMode::Term)));
    }

    #[test]
    fn test_text_matching() {
        let d = doc(1, "sn-1", "Rooftop temperature gauge");
        assert!(matches_request(&d, &request(r#"{"description": "cellar gauge"}"#, SearchMode::Match)));
        assert!(matches_request(
            &d,
            &request(r#"{"description": "temperature gauge"}"#, SearchMode::MatchPhrase)
        ));
        assert!(!matches_request(
            &d,
            &request(r#"{"description": "gauge temperature"}"#, SearchMode::MatchPhrase)
        ));
        assert!(matches_request(
            &d,
            &request(r#"{"description": "temperature gau"}"#, SearchMode::MatchPhrasePrefix)
        ));
        assert!(matches_request(&d, &request(r#"{"description": "rooftp"}"#, SearchMode::Similar)));
    }
}
