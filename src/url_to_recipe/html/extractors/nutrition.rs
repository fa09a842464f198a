use super::node::{is_truthy, CandidateNode, TYPE_KEY};
use super::Extractor;
use crate::error::NotFoundError;
use html_escape::decode_html_entities;
use serde_json::{Map, Value};

const NUTRITION_KEY: &str = "nutrition";

/// Nutrition facts merged with category, yield, name and author.
///
/// A list block is reduced to its first element. Nutrition is read from the
/// block itself, falling back to the first `@graph` member carrying it; the
/// surrounding metadata always comes from the block.
pub struct NutritionExtractor;

fn nutrition_object(value: &Value) -> Option<&Map<String, Value>> {
    value.as_object().filter(|map| !map.is_empty())
}

fn first_author_name(author: &Value) -> Option<&str> {
    let first = match author {
        Value::Array(authors) => authors.first()?,
        other => other,
    };
    let name = match first {
        Value::Object(map) => map.get("name").and_then(Value::as_str),
        Value::String(name) => Some(name.as_str()),
        _ => None,
    };
    name.filter(|name| !name.is_empty())
}

fn merge_nutrition(node: CandidateNode<'_>) -> Option<Map<String, Value>> {
    let nutrition = node
        .get(NUTRITION_KEY)
        .and_then(nutrition_object)
        .or_else(|| {
            node.graph_members()
                .find_map(|member| member.get(NUTRITION_KEY))
                .and_then(nutrition_object)
        })?;

    let mut merged = nutrition.clone();
    merged.retain(|key, _| key != TYPE_KEY);

    if let Some(category) = node.get("recipeCategory").filter(|v| is_truthy(v)) {
        merged.insert("recipeCategory".to_string(), category.clone());
    }
    if let Some(recipe_yield) = node.get("recipeYield").filter(|v| is_truthy(v)) {
        merged.insert("recipeYield".to_string(), recipe_yield.clone());
    }
    if let Some(name) = node
        .get("name")
        .and_then(Value::as_str)
        .filter(|n| !n.is_empty())
    {
        merged.insert(
            "recipeName".to_string(),
            Value::String(decode_html_entities(name).into_owned()),
        );
    }
    if let Some(author) = node.get("author").and_then(first_author_name) {
        merged.insert(
            "author".to_string(),
            Value::String(decode_html_entities(author).into_owned()),
        );
    }

    Some(merged)
}

impl Extractor for NutritionExtractor {
    type Output = Map<String, Value>;

    fn name(&self) -> &'static str {
        "nutrition"
    }

    fn extract_block(&self, block: &Value) -> Option<Map<String, Value>> {
        CandidateNode::classify(block)
            .first_of_list()
            .and_then(merge_nutrition)
    }

    fn not_found(&self) -> NotFoundError {
        NotFoundError::Nutrition
    }
}
