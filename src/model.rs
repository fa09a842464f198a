use reqwest::Url;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

use crate::error::IngestError;

/// Unit used whenever no unit can be inferred for a quantity.
pub const DEFAULT_UNIT: &str = "user discretion";

/// Bucket name carried by the raw record handed to the normalize stage.
pub const RAW_BUCKET: &str = "raw_processed_data";

/// Bucket name carried by the final clean record.
pub const CLEAN_BUCKET: &str = "clean_processed_data";

/// A URL submitted for ingestion by a user within a session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Submission {
    pub user_id: String,
    pub session_id: String,
    pub url: String,
}

impl Submission {
    /// Validate and build a submission.
    ///
    /// Both ids must be non-blank and the URL must be an absolute http(s) URL.
    pub fn new(
        user_id: impl Into<String>,
        session_id: impl Into<String>,
        url: impl AsRef<str>,
    ) -> Result<Self, IngestError> {
        let user_id = user_id.into();
        let session_id = session_id.into();
        if user_id.trim().is_empty() {
            return Err(IngestError::InvalidSubmission("user_id is empty".to_string()));
        }
        if session_id.trim().is_empty() {
            return Err(IngestError::InvalidSubmission(
                "session_id is empty".to_string(),
            ));
        }

        let parsed = Url::parse(url.as_ref().trim())
            .map_err(|e| IngestError::InvalidSubmission(format!("invalid URL: {e}")))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(IngestError::InvalidSubmission(format!(
                "unsupported URL scheme: {}",
                parsed.scheme()
            )));
        }

        Ok(Submission {
            user_id,
            session_id,
            url: parsed.to_string(),
        })
    }
}

/// Name, image and optional video resolved from the page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecipeInfo {
    pub name: String,
    pub image: String,
    pub video_url: Option<String>,
}

/// Unnormalized values as they appear in the page's structured data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawExtraction {
    pub ingredients: Vec<String>,
    pub nutrition: Map<String, Value>,
    pub name: String,
    pub image: String,
    pub video_url: Option<String>,
}

/// Merged raw payload handed from the scrape stage to the normalize stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawRecord {
    pub user_id: String,
    pub session_id: String,
    pub recipe_url: String,
    pub recipe_name: String,
    pub recipe_image: String,
    pub recipe_video_url: Option<String>,
    pub recipe_ingredients_raw: Vec<String>,
    pub recipe_nutrition_raw: Map<String, Value>,
    pub bucket: String,
}

impl RawRecord {
    pub fn new(submission: &Submission, raw: RawExtraction) -> Self {
        RawRecord {
            user_id: submission.user_id.clone(),
            session_id: submission.session_id.clone(),
            recipe_url: submission.url.clone(),
            recipe_name: raw.name,
            recipe_image: raw.image,
            recipe_video_url: raw.video_url,
            recipe_ingredients_raw: raw.ingredients,
            recipe_nutrition_raw: raw.nutrition,
            bucket: RAW_BUCKET.to_string(),
        }
    }
}

/// Final record published for downstream grocery-list and nutrition services.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CleanRecord {
    pub user_id: String,
    pub session_id: String,
    pub recipe_url: String,
    pub recipe_name: String,
    pub recipe_image: String,
    pub recipe_video_url: Option<String>,
    pub recipe_ingredients_clean: Vec<NormalizedIngredient>,
    pub recipe_nutrition_clean: Vec<NormalizedNutrient>,
    pub bucket: String,
}

/// Workflow phase carried by relay events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Phase {
    #[serde(rename = "validation_complete")]
    ValidationComplete,
    /// The raw record is stored and waits for normalization.
    #[serde(rename = "chat_gpt_ingest")]
    NormalizeReady,
}

/// Event signalling pipeline progression for one session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhaseEvent {
    pub user_id: String,
    pub session_id: String,
    pub recipe_name: String,
    pub redis_key: String,
    pub phase: Phase,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizedIngredient {
    pub ingredient: String,
    #[serde(deserialize_with = "lenient_quantity")]
    pub quantity: f64,
    #[serde(default = "default_unit", deserialize_with = "unit_or_default")]
    pub unit: String,
    pub category: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizedNutrient {
    pub name: String,
    #[serde(default, deserialize_with = "lenient_quantity")]
    pub quantity: f64,
    #[serde(default = "default_unit", deserialize_with = "unit_or_default")]
    pub unit: String,
}

fn default_unit() -> String {
    DEFAULT_UNIT.to_string()
}

fn unit_or_default<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let unit = Option::<String>::deserialize(deserializer)?;
    Ok(match unit {
        Some(u) if !u.trim().is_empty() => u.trim().to_string(),
        _ => default_unit(),
    })
}

/// Accepts a number, a numeric string or null (0.0).
fn lenient_quantity<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::Null => Ok(0.0),
        Value::Number(n) => n
            .as_f64()
            .ok_or_else(|| serde::de::Error::custom("quantity out of range")),
        Value::String(s) => parse_quantity(&s)
            .ok_or_else(|| serde::de::Error::custom(format!("non-numeric quantity: {s:?}"))),
        other => Err(serde::de::Error::custom(format!(
            "unexpected quantity: {other}"
        ))),
    }
}

const QUALIFIERS: [&str; 5] = ["approximately", "approx.", "approx", "about", "~"];

/// Parse a human quantity such as `"1 1/2"`, `"0.75"` or `"about 315 kcal"`.
///
/// Only the leading numeric part is read; an empty string parses as 0.0.
pub fn parse_quantity(text: &str) -> Option<f64> {
    let mut rest = text.trim();
    for qualifier in QUALIFIERS {
        let matches = rest
            .get(..qualifier.len())
            .is_some_and(|head| head.eq_ignore_ascii_case(qualifier));
        if matches {
            rest = rest[qualifier.len()..].trim_start();
        }
    }
    if rest.is_empty() {
        return Some(0.0);
    }

    let mut tokens = rest.split_whitespace();
    let first = parse_number_token(tokens.next()?)?;
    match tokens.next().and_then(parse_fraction) {
        Some(fraction) if first.fract() == 0.0 => Some(first + fraction),
        _ => Some(first),
    }
}

fn parse_number_token(token: &str) -> Option<f64> {
    if token.contains('/') {
        return parse_fraction(token);
    }
    let numeric: String = token
        .chars()
        .take_while(|c| c.is_ascii_digit() || *c == '.' || *c == ',')
        .filter(|c| *c != ',')
        .collect();
    numeric.parse().ok()
}

fn parse_fraction(token: &str) -> Option<f64> {
    let (num, den) = token.split_once('/')?;
    let num: f64 = num.trim().parse().ok()?;
    let den: f64 = den.trim().parse().ok()?;
    if den == 0.0 {
        None
    } else {
        Some(num / den)
    }
}
