use crate::error::QueryError;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::str::FromStr;

pub const SEARCH_INDEX: &str = "sensors";

/// Document stored in the search index for each registered sensor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchDocument {
    pub id: i32,
    pub name: String,
    #[serde(rename = "type")]
    pub sensor_type: String,
    pub description: String,
}

impl SearchDocument {
    /// Field mapping of the search index
    pub fn mapping() -> Value {
        json!({
            "properties": {
                "id": {"type": "keyword"},
                "name": {"type": "keyword"},
                "type": {"type": "keyword"},
                "description": {"type": "text"}
            }
        })
    }

    pub fn field(&self, field: SearchField) -> String {
        match field {
            SearchField::Id => self.id.to_string(),
            SearchField::Name => self.name.clone(),
            SearchField::Type => self.sensor_type.clone(),
            SearchField::Description => self.description.clone(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchField {
    Id,
    Name,
    Type,
    Description,
}

impl SearchField {
    pub fn as_str(&self) -> &'static str {
        match self {
            SearchField::Id => "id",
            SearchField::Name => "name",
            SearchField::Type => "type",
            SearchField::Description => "description",
        }
    }
}

impl FromStr for SearchField {
    type Err = QueryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "id" => Ok(SearchField::Id),
            "name" => Ok(SearchField::Name),
            "type" => Ok(SearchField::Type),
            "description" => Ok(SearchField::Description),
            _ => Err(QueryError::InvalidField(s.to_owned())),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SearchValue {
    Text(String),
    Number(serde_json::Number),
    Bool(bool),
}

impl SearchValue {
    pub fn to_json(&self) -> Value {
        match self {
            SearchValue::Text(s) => Value::String(s.clone()),
            SearchValue::Number(n) => Value::Number(n.clone()),
            SearchValue::Bool(b) => Value::Bool(*b),
        }
    }

    pub fn as_text(&self) -> String {
        match self {
            SearchValue::Text(s) => s.clone(),
            SearchValue::Number(n) => n.to_string(),
            SearchValue::Bool(b) => b.to_string(),
        }
    }
}

/// A caller supplied `{field: value}` expression, parsed as data and never evaluated
#[derive(Debug, Clone, PartialEq)]
pub struct StructuredQuery {
    pub field: SearchField,
    pub value: SearchValue,
}

impl FromStr for StructuredQuery {
    type Err = QueryError;

    fn from_str(expression: &str) -> Result<Self, Self::Err> {
        let parsed: Value = serde_json::from_str(expression)
            .map_err(|e| QueryError::InvalidExpression(e.to_string()))?;
        let object = match parsed {
            Value::Object(object) => object,
            _ => {
                return Err(QueryError::InvalidExpression(
                    "expected a single-field object".to_owned(),
                ))
            }
        };
        if object.len() != 1 {
            return Err(QueryError::InvalidExpression(format!(
                "expected exactly one field, got {}",
                object.len()
            )));
        }

        let (key, raw) = object
            .into_iter()
            .next()
            .ok_or_else(|| QueryError::InvalidExpression("empty object".to_owned()))?;
        let field = key.parse::<SearchField>()?;
        let value = match raw {
            Value::String(s) => SearchValue::Text(s),
            Value::Number(n) => SearchValue::Number(n),
            Value::Bool(b) => SearchValue::Bool(b),
            other => {
                return Err(QueryError::InvalidExpression(format!(
                    "value of {} must be a scalar, got {}",
                    field.as_str(),
                    other
                )))
            }
        };
        Ok(StructuredQuery { field, value })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SearchMode {
    #[default]
    Match,
    MatchPhrase,
    MatchPhrasePrefix,
    Term,
    Prefix,
    /// Fuzzy match with automatic edit distance
    Similar,
}

impl SearchMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            SearchMode::Match => "match",
            SearchMode::MatchPhrase => "match_phrase",
            SearchMode::MatchPhrasePrefix => "match_phrase_prefix",
            SearchMode::Term => "term",
            SearchMode::Prefix => "prefix",
            SearchMode::Similar => "similar",
        }
    }
}

impl FromStr for SearchMode {
    type Err = QueryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "match" => Ok(SearchMode::Match),
            "match_phrase" => Ok(SearchMode::MatchPhrase),
            "match_phrase_prefix" => Ok(SearchMode::MatchPhrasePrefix),
            "term" => Ok(SearchMode::Term),
            "prefix" => Ok(SearchMode::Prefix),
            "similar" => Ok(SearchMode::Similar),
            _ => Err(QueryError::InvalidSearchMode(s.to_owned())),
        }
    }
}

/// Result window the search index accepts in one request
pub const MAX_SEARCH_SIZE: usize = 10_000;

#[derive(Debug, Clone, PartialEq)]
pub struct SearchRequest {
    pub query: StructuredQuery,
    pub mode: SearchMode,
    pub size: usize,
}

impl SearchRequest {
    pub fn new(query: StructuredQuery, mode: SearchMode, size: usize) -> Result<Self, QueryError> {
        if size == 0 {
            return Err(QueryError::InvalidRange("size must be positive".to_owned()));
        }
        if size > MAX_SEARCH_SIZE {
            return Err(QueryError::InvalidRange(format!(
                "size must not exceed {}",
                MAX_SEARCH_SIZE
            )));
        }
        Ok(SearchRequest { query, mode, size })
    }

    /// Query DSL body sent to the search index
    pub fn to_dsl(&self) -> Value {
        let field = self.query.field.as_str();
        let value = self.query.value.to_json();
        let query = match self.mode {
            SearchMode::Similar => json!({
                "fuzzy": { field: { "value": value, "fuzziness": "AUTO" } }
            }),
            mode => json!({ mode.as_str(): { field: value } }),
        };
        json!({ "size": self.size, "query": query })
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_parse_single_field_expression() {
        let query: StructuredQuery = r#"{"name": "sn-1"}"#.parse().unwrap();
        assert_eq!(SearchField::Name, query.field);
        assert_eq!(SearchValue::Text("sn-1".to_owned()), query.value);

        let query: StructuredQuery = r#"{"id": 3}"#.parse().unwrap();
        assert_eq!(SearchField::Id, query.field);
        assert_eq!("3", query.value.as_text());
    }

    #[test]
    fn test_reject_malformed_expressions() {
        for raw in [
            "",
            "__import__('os').system('true')",
            "{'name': 'sn-1'}",
            r#"["name", "sn-1"]"#,
            r#"{}"#,
            r#"{"name": "a", "type": "b"}"#,
            r#"{"name": {"$gt": ""}}"#,
            r#"{"name": ["a"]}"#,
            r#"{"name": null}"#,
            r#"{"location": "x"}"#,
        ] {
            assert!(raw.parse::<StructuredQuery>().is_err(), "accepted {:?}", raw);
        }
    }

    #[test]
    fn test_parse_search_modes() {
        assert_eq!(SearchMode::Match, "match".parse().unwrap());
        assert_eq!(SearchMode::Similar, "similar".parse().unwrap());
        assert!("script".parse::<SearchMode>().is_err());
    }

    #[test]
    fn test_dsl_for_direct_query() {
        let query: StructuredQuery = r#"{"type": "temp_sensor"}"#.parse().unwrap();
        let request = SearchRequest::new(query, SearchMode::Term, 5).unwrap();

        assert_eq!(
            json!({"size": 5, "query": {"term": {"type": "temp_sensor"}}}),
            request.to_dsl()
        );
    }

    #[test]
    fn test_dsl_for_similar_query() {
        let query: StructuredQuery = r#"{"name": "sn-l"}"#.parse().unwrap();
        let request = SearchRequest::new(query, SearchMode::Similar, 10).unwrap();

        assert_eq!(
            json!({
                "size": 10,
                "query": {"fuzzy": {"name": {"value": "sn-l", "fuzziness": "AUTO"}}}
            }),
            request.to_dsl()
        );
    }

    #[test]
    fn test_reject_empty_size() {
        let query: StructuredQuery = r#"{"name": "sn-1"}"#.parse().unwrap();
        assert!(SearchRequest::new(query, SearchMode::Match, 0).is_err());
    }

    #[test]
    fn test_reject_oversized_window() {
        let query: StructuredQuery = r#"{"name": "sn-1"}"#.parse().unwrap();
        assert!(SearchRequest::new(query.clone(), SearchMode::Match, MAX_SEARCH_SIZE).is_ok());
        assert!(matches!(
            SearchRequest::new(query, SearchMode::Match, MAX_SEARCH_SIZE + 1),
            Err(QueryError::InvalidRange(_))
        ));
    }
}
