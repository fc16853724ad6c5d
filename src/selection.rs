use std::fmt;

use serde_json::{Map, Value};

/// Upstream track identifier. Catalogs disagree on whether this is a number or a string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CandidateId {
    Text(String),
    Number(i64),
}

impl CandidateId {
    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::String(s) if !s.trim().is_empty() => Some(Self::Text(s.trim().to_string())),
            Value::Number(n) => n
                .as_i64()
                .map(Self::Number)
                .or_else(|| n.as_u64().map(|u| Self::Text(u.to_string()))),
            _ => None,
        }
    }
}

impl fmt::Display for CandidateId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CandidateId::Text(s) => f.write_str(s),
            CandidateId::Number(n) => write!(f, "{n}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    pub id: CandidateId,
    /// The validity marker (e.g. ISRC) that made this candidate eligible, if the policy checks one
    pub marker: Option<String>,
}

/// How a single track is picked out of a catalog search response.
///
/// Both policies are first-match-wins: there is no relevance ranking.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SelectionPolicy {
    /// Depth-first walk of the whole response; the first object carrying both a usable
    /// `id_field` and a non-blank `marker_field` wins.
    DeepSearch {
        id_field: String,
        marker_field: String,
    },
    /// First element of the array at `list_field` (dotted path), unchecked.
    FlatList { list_field: String, id_field: String },
}

impl Default for SelectionPolicy {
    fn default() -> Self {
        SelectionPolicy::DeepSearch {
            id_field: "id".to_string(),
            marker_field: "isrc".to_string(),
        }
    }
}

impl SelectionPolicy {
    pub fn select(&self, response: &Value) -> Option<Candidate> {
        match self {
            SelectionPolicy::DeepSearch {
                id_field,
                marker_field,
            } => deep_search(response, id_field, marker_field),
            SelectionPolicy::FlatList {
                list_field,
                id_field,
            } => first_of_list(response, list_field, id_field),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            SelectionPolicy::DeepSearch { .. } => "deep_search",
            SelectionPolicy::FlatList { .. } => "flat_list",
        }
    }
}

fn deep_search(response: &Value, id_field: &str, marker_field: &str) -> Option<Candidate> {
    // Explicit stack: upstream payloads are untrusted and can nest arbitrarily deep
    let mut stack = vec![response];

    while let Some(node) = stack.pop() {
        match node {
            Value::Object(map) => {
                if let Some(candidate) = eligible(map, id_field, marker_field) {
                    return Some(candidate);
                }
                // Reversed so the first child is popped first
                stack.extend(map.values().rev());
            }
            Value::Array(items) => stack.extend(items.iter().rev()),
            _ => {}
        }
    }

    None
}

fn eligible(map: &Map<String, Value>, id_field: &str, marker_field: &str) -> Option<Candidate> {
    let marker = map.get(marker_field)?.as_str()?.trim();
    if marker.is_empty() {
        return None;
    }
    let id = CandidateId::from_value(map.get(id_field)?)?;
    Some(Candidate {
        id,
        marker: Some(marker.to_string()),
    })
}

fn first_of_list(response: &Value, list_field: &str, id_field: &str) -> Option<Candidate> {
    let list = list_field
        .split('.')
        .filter(|segment| !segment.is_empty())
        .try_fold(response, |node, segment| node.get(segment))?;

    let first = list.as_array()?.first()?;
    let id = CandidateId::from_value(first.get(id_field)?)?;
    Some(Candidate { id, marker: None })
}
