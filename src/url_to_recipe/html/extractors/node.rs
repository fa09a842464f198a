use serde_json::{Map, Value};

pub const GRAPH_KEY: &str = "@graph";
pub const TYPE_KEY: &str = "@type";

/// One structured-data value viewed by shape.
///
/// Blocks arrive as a single object, a list of objects, or an object wrapping
/// its entities under `@graph`. Every extraction walks them through this view.
#[derive(Debug, Clone, Copy)]
pub enum CandidateNode<'a> {
    Object(&'a Map<String, Value>),
    List(&'a [Value]),
    Scalar(&'a Value),
}

/// A single search step: inspect a node, maybe produce a result.
pub type Strategy<T> = for<'a> fn(CandidateNode<'a>) -> Option<T>;

impl<'a> CandidateNode<'a> {
    pub fn classify(value: &'a Value) -> Self {
        match value {
            Value::Object(map) => CandidateNode::Object(map),
            Value::Array(items) => CandidateNode::List(items),
            other => CandidateNode::Scalar(other),
        }
    }

    /// Field lookup; only objects have fields.
    pub fn get(self, key: &str) -> Option<&'a Value> {
        match self {
            CandidateNode::Object(map) => map.get(key),
            _ => None,
        }
    }

    /// Elements of a list node.
    pub fn list_members(self) -> impl Iterator<Item = CandidateNode<'a>> {
        let members: &'a [Value] = match self {
            CandidateNode::List(items) => items,
            _ => &[],
        };
        members.iter().map(CandidateNode::classify)
    }

    /// Entities under `@graph`. A lone object there counts as one member.
    pub fn graph_members(self) -> impl Iterator<Item = CandidateNode<'a>> {
        let members: &'a [Value] = match self.get(GRAPH_KEY) {
            Some(Value::Array(items)) => items,
            Some(single) if single.is_object() => std::slice::from_ref(single),
            _ => &[],
        };
        members.iter().map(CandidateNode::classify)
    }

    /// A list reduced to its first element; other shapes unchanged.
    pub fn first_of_list(self) -> Option<Self> {
        match self {
            CandidateNode::List(items) => items.first().map(CandidateNode::classify),
            other => Some(other),
        }
    }

    /// Every element of a list, or the node itself.
    pub fn items(self) -> Vec<Self> {
        match self {
            CandidateNode::List(_) => self.list_members().collect(),
            other => vec![other],
        }
    }

    /// True when `@type` equals `wanted` or, for a set of types, contains it.
    pub fn has_type(self, wanted: &str) -> bool {
        match self.get(TYPE_KEY) {
            Some(Value::String(tag)) => tag.eq_ignore_ascii_case(wanted),
            Some(Value::Array(tags)) => tags
                .iter()
                .filter_map(Value::as_str)
                .any(|tag| tag.eq_ignore_ascii_case(wanted)),
            _ => false,
        }
    }
}

/// Run `strategies` left to right; the first hit wins.
pub fn first_match<T>(node: CandidateNode<'_>, strategies: &[Strategy<T>]) -> Option<T> {
    strategies.iter().find_map(|strategy| strategy(node))
}

/// Whether a field counts as present: not null, false, zero, or empty.
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(items) => !items.is_empty(),
        Value::Object(map) => !map.is_empty(),
    }
}
