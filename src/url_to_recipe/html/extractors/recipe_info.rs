use super::node::{CandidateNode, TYPE_KEY};
use super::Extractor;
use crate::error::NotFoundError;
use crate::model::RecipeInfo;
use serde_json::{Map, Value};

const VIDEO_TYPE: &str = "VideoObject";

/// Recipe name, image and optional video URL.
///
/// Each element of a list block is tried on its own. Name and image come from
/// the element, overridden by any `@graph` member typed `Recipe`; both must
/// resolve for a match.
pub struct RecipeInfoExtractor;

/// Reduce an image field to a single value.
///
/// A list yields its last element, then an object carrying `url` yields that
/// URL. Applying it twice gives the same result as applying it once for
/// strings, objects and flat lists.
pub fn normalize_image(image: &Value) -> &Value {
    // TODO: the last element is assumed to be the largest rendition; check sites
    // that list images largest-first.
    let reduced = match image {
        Value::Array(items) => items.last().unwrap_or(image),
        other => other,
    };
    match reduced {
        Value::Object(map) => map.get("url").unwrap_or(reduced),
        other => other,
    }
}

/// Depth-first, pre-order search for a `VideoObject`'s `contentUrl`.
///
/// A `VideoObject` without `contentUrl` ends that branch; siblings are still
/// searched.
pub fn find_video_content_url(value: &Value) -> Option<&str> {
    match value {
        Value::Object(map) => find_in_object(map),
        Value::Array(items) => items.iter().find_map(find_video_content_url),
        _ => None,
    }
}

fn find_in_object(map: &Map<String, Value>) -> Option<&str> {
    if map.get(TYPE_KEY).and_then(Value::as_str) == Some(VIDEO_TYPE) {
        return map
            .get("contentUrl")
            .and_then(Value::as_str)
            .filter(|url| !url.is_empty());
    }
    map.values()
        .filter(|v| v.is_object() || v.is_array())
        .find_map(find_video_content_url)
}

fn non_empty_str(value: Option<&Value>) -> Option<&str> {
    value.and_then(Value::as_str).filter(|s| !s.is_empty())
}

fn resolve(node: CandidateNode<'_>) -> Option<RecipeInfo> {
    let CandidateNode::Object(map) = node else {
        return None;
    };

    let mut name = node.get("name");
    let mut image = node.get("image");
    for member in node.graph_members().filter(|m| m.has_type("Recipe")) {
        if let Some(member_name) = member.get("name") {
            name = Some(member_name);
        }
        if let Some(member_image) = member.get("image") {
            image = Some(member_image);
        }
    }

    let name = non_empty_str(name)?;
    let image = non_empty_str(image.map(normalize_image))?;
    let video_url = find_in_object(map);

    Some(RecipeInfo {
        name: name.to_string(),
        image: image.to_string(),
        video_url: video_url.map(str::to_string),
    })
}

impl Extractor for RecipeInfoExtractor {
    type Output = RecipeInfo;

    fn name(&self) -> &'static str {
        "recipe info"
    }

    fn extract_block(&self, block: &Value) -> Option<RecipeInfo> {
        CandidateNode::classify(block)
            .items()
            .into_iter()
            .find_map(resolve)
    }

    fn not_found(&self) -> NotFoundError {
        NotFoundError::RecipeInfo
    }
}
