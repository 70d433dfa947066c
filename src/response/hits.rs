//! Hit unpacking
//!
//! Each hit's stored fields merge into one flat map; identity and index
//! name are injected, and highlight/inner-hit payloads land under reserved
//! keys instead of mixing into user fields.

use super::{HIGHLIGHT_KEY, ID_KEY, INDEX_KEY, INNER_HITS_KEY, SCORE_KEY};
use crate::error::{CuttleError, Result};
use serde_json::{Map, Value};

/// One flattened hit
#[derive(Clone, Debug, Default, PartialEq, serde::Serialize)]
pub struct FlatDocument {
    pub fields: Map<String, Value>,
}

impl FlatDocument {
    /// The document identity
    pub fn id(&self) -> Option<&str> {
        self.fields.get(ID_KEY).and_then(|v| v.as_str())
    }

    /// The index the document came from
    pub fn index(&self) -> Option<&str> {
        self.fields.get(INDEX_KEY).and_then(|v| v.as_str())
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields.get(field)
    }

    /// Matched inner documents for a nested path, when requested
    pub fn inner_hits(&self, path: &str) -> Option<&Value> {
        self.fields.get(INNER_HITS_KEY).and_then(|v| v.get(path))
    }
}

/// Result of unpacking the `hits` section
#[derive(Debug, Default)]
pub struct UnpackedHits {
    pub docs: Vec<FlatDocument>,
    pub total: Option<u64>,
    /// Sort values of the last hit, for `search_after` continuation
    pub last_sort: Option<Vec<Value>>,
}

/// Unpack the `hits` section; absent section means no documents
pub fn unpack_hits(raw: &Value) -> Result<UnpackedHits> {
    let Some(hits_section) = raw.get("hits") else {
        return Ok(UnpackedHits::default());
    };

    let total = match hits_section.get("total") {
        // Newer engines: { "value": n, "relation": "eq" }; older: a bare number
        Some(total) => total.get("value").or(Some(total)).and_then(|v| v.as_u64()),
        None => None,
    };

    let hit_array = match hits_section.get("hits") {
        Some(Value::Array(hits)) => hits,
        Some(_) => {
            return Err(CuttleError::Query {
                reason: "response 'hits.hits' is not an array".to_string(),
                details: Value::Null,
            })
        }
        None => return Ok(UnpackedHits { total, ..Default::default() }),
    };

    let docs = hit_array
        .iter()
        .map(flatten_hit)
        .collect::<Result<Vec<_>>>()?;

    let last_sort = hit_array
        .last()
        .and_then(|hit| hit.get("sort"))
        .and_then(|sort| sort.as_array())
        .cloned();

    Ok(UnpackedHits {
        docs,
        total,
        last_sort,
    })
}

/// Flatten one hit into a document
pub fn flatten_hit(hit: &Value) -> Result<FlatDocument> {
    let mut fields = match hit.get("_source") {
        Some(Value::Object(source)) => source.clone(),
        Some(Value::Null) | None => Map::new(),
        Some(_) => {
            return Err(CuttleError::Query {
                reason: "hit '_source' is not an object".to_string(),
                details: hit.clone(),
            })
        }
    };

    let id = hit.get("_id").cloned().ok_or_else(|| CuttleError::Query {
        reason: "hit is missing '_id'".to_string(),
        details: hit.clone(),
    })?;
    fields.insert(ID_KEY.to_string(), id);
    if let Some(index) = hit.get("_index") {
        fields.insert(INDEX_KEY.to_string(), index.clone());
    }
    if let Some(score) = hit.get("_score") {
        if !score.is_null() {
            fields.insert(SCORE_KEY.to_string(), score.clone());
        }
    }

    if let Some(highlight) = hit.get("highlight") {
        fields.insert(HIGHLIGHT_KEY.to_string(), highlight.clone());
    }

    if let Some(Value::Object(inner_sections)) = hit.get("inner_hits") {
        let mut by_path = Map::new();
        for (path, section) in inner_sections {
            let inner_docs = unpack_hits(section)?.docs;
            let serialized = inner_docs
                .into_iter()
                .map(|doc| Value::Object(doc.fields))
                .collect();
            by_path.insert(path.clone(), Value::Array(serialized));
        }
        fields.insert(INNER_HITS_KEY.to_string(), Value::Object(by_path));
    }

    Ok(FlatDocument { fields })
}
