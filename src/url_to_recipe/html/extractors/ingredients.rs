use super::node::{first_match, CandidateNode, Strategy};
use super::Extractor;
use crate::error::NotFoundError;
use serde_json::Value;

const INGREDIENT_KEY: &str = "recipeIngredient";

/// Raw ingredient lines, searched top level, then list members, then `@graph`.
pub struct IngredientsExtractor;

const STRATEGIES: [Strategy<Vec<String>>; 3] = [top_level, list_member, graph_member];

fn top_level(node: CandidateNode<'_>) -> Option<Vec<String>> {
    node.get(INGREDIENT_KEY).and_then(ingredient_lines)
}

fn list_member(node: CandidateNode<'_>) -> Option<Vec<String>> {
    node.list_members().find_map(top_level)
}

fn graph_member(node: CandidateNode<'_>) -> Option<Vec<String>> {
    node.graph_members().find_map(top_level)
}

/// Lines exactly as published. A bare string is a one-line list.
fn ingredient_lines(value: &Value) -> Option<Vec<String>> {
    match value {
        Value::Array(items) => Some(
            items
                .iter()
                .map(|item| match item {
                    Value::String(line) => line.clone(),
                    other => other.to_string(),
                })
                .collect(),
        ),
        Value::String(line) => Some(vec![line.clone()]),
        _ => None,
    }
}

impl Extractor for IngredientsExtractor {
    type Output = Vec<String>;

    fn name(&self) -> &'static str {
        "ingredients"
    }

    fn extract_block(&self, block: &Value) -> Option<Vec<String>> {
        first_match(CandidateNode::classify(block), &STRATEGIES)
    }

    fn not_found(&self) -> NotFoundError {
        NotFoundError::Ingredients
    }
}
