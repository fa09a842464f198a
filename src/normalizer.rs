use std::sync::Arc;

use log::{debug, error, info};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};

use crate::error::NormalizeError;
use crate::model::{NormalizedIngredient, NormalizedNutrient};
use crate::providers::{Completion, CompletionProvider, INGREDIENTS_PROMPT, NUTRITION_PROMPT};

/// Which prompt contract a normalization request runs under.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NormalizeKind {
    Ingredients,
    Nutrition,
}

impl NormalizeKind {
    pub fn system_prompt(self) -> &'static str {
        match self {
            NormalizeKind::Ingredients => INGREDIENTS_PROMPT,
            NormalizeKind::Nutrition => NUTRITION_PROMPT,
        }
    }

    fn user_turn(self, payload: &str) -> String {
        match self {
            NormalizeKind::Ingredients => format!("Here's the ingredients: {payload}"),
            NormalizeKind::Nutrition => format!("Here's the nutrition: {payload}"),
        }
    }
}

/// Turns raw ingredient and nutrition data into schema records via a
/// completion provider.
#[derive(Clone)]
pub struct Normalizer {
    provider: Arc<dyn CompletionProvider>,
}

impl Normalizer {
    pub fn new(provider: Arc<dyn CompletionProvider>) -> Self {
        Self { provider }
    }

    pub fn provider_name(&self) -> &str {
        self.provider.provider_name()
    }

    pub async fn normalize_ingredients(
        &self,
        ingredients: &[String],
    ) -> Result<Vec<NormalizedIngredient>, NormalizeError> {
        self.normalize(NormalizeKind::Ingredients, ingredients).await
    }

    pub async fn normalize_nutrition(
        &self,
        nutrition: &Map<String, Value>,
    ) -> Result<Vec<NormalizedNutrient>, NormalizeError> {
        self.normalize(NormalizeKind::Nutrition, nutrition).await
    }

    /// Send `payload` under the `kind` contract and decode the reply.
    pub async fn normalize<P, T>(
        &self,
        kind: NormalizeKind,
        payload: &P,
    ) -> Result<Vec<T>, NormalizeError>
    where
        P: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let serialized = serde_json::to_string(payload).map_err(|e| {
            NormalizeError::Provider(format!("failed to serialize {kind:?} payload: {e}"))
        })?;
        debug!(
            "Requesting {:?} normalization from {}",
            kind,
            self.provider.provider_name()
        );

        let completion = self
            .provider
            .complete(kind.system_prompt(), &kind.user_turn(&serialized))
            .await
            .map_err(|e| {
                error!("Completion provider failed: {}", e);
                NormalizeError::Provider(e.to_string())
            })?;

        let records = decode_completion(completion)?;
        info!("Normalized {} {:?} records", records.len(), kind);
        Ok(records)
    }
}

/// Decode a completion into records.
///
/// Structured content is used as is; text has surrounding code fences removed
/// before it is parsed.
pub fn decode_completion<T: DeserializeOwned>(
    completion: Option<Completion>,
) -> Result<Vec<T>, NormalizeError> {
    match completion {
        None => Err(NormalizeError::EmptyResponse),
        Some(Completion::Json(value)) => {
            let text = value.to_string();
            serde_json::from_value(value)
                .map_err(|source| NormalizeError::MalformedResponse { text, source })
        }
        Some(Completion::Text(text)) => {
            let body = strip_code_fences(&text);
            if body.is_empty() {
                return Err(NormalizeError::EmptyResponse);
            }
            serde_json::from_str(body).map_err(|source| {
                error!("Malformed completion response: {}", text);
                NormalizeError::MalformedResponse { text, source }
            })
        }
    }
}

/// Remove one surrounding markdown fence, with or without a language tag.
fn strip_code_fences(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(inner) = trimmed
        .strip_prefix("```")
        .and_then(|rest| rest.strip_suffix("```"))
    else {
        return trimmed;
    };
    // The fence line may carry a language tag such as `json`.
    match inner.split_once('\n') {
        Some((tag, body)) if !tag.trim().contains(['[', '{']) => body.trim(),
        _ => inner.trim(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::DEFAULT_UNIT;
    use async_trait::async_trait;
    use serde_json::json;
    use std::error::Error;
    use std::sync::Mutex;

    /// Replies with canned content and records every request.
    struct CannedProvider {
        reply: Option<Completion>,
        requests: Mutex<Vec<(String, String)>>,
    }

    impl CannedProvider {
        fn new(reply: Option<Completion>) -> Arc<Self> {
            Arc::new(Self {
                reply,
                requests: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl CompletionProvider for CannedProvider {
        fn provider_name(&self) -> &str {
            "canned"
        }

        async fn complete(
            &self,
            system: &str,
            user: &str,
        ) -> Result<Option<Completion>, Box<dyn Error + Send + Sync>> {
            self.requests
                .lock()
                .unwrap()
                .push((system.to_string(), user.to_string()));
            Ok(self.reply.clone())
        }
    }

    struct FailingProvider;

    #[async_trait]
    impl CompletionProvider for FailingProvider {
        fn provider_name(&self) -> &str {
            "failing"
        }

        async fn complete(
            &self,
            _system: &str,
            _user: &str,
        ) -> Result<Option<Completion>, Box<dyn Error + Send + Sync>> {
            Err("connection reset".into())
        }
    }

    /// The example array embedded in a prompt contract.
    fn prompt_example(prompt: &str) -> String {
        let start = prompt.find("Example:").unwrap() + "Example:".len();
        let end = prompt.find("Processing Rules").unwrap();
        prompt[start..end].trim().to_string()
    }

    #[tokio::test]
    async fn test_prompt_example_ingredients_decode() {
        let example = prompt_example(INGREDIENTS_PROMPT);
        let provider = CannedProvider::new(Some(Completion::Text(example)));
        let normalizer = Normalizer::new(provider.clone());

        let raw = vec!["1 pound sweet Italian sausage".to_string()];
        let records = normalizer.normalize_ingredients(&raw).await.unwrap();

        assert_eq!(records.len(), 3);
        for record in &records {
            assert!(record.quantity.is_finite());
            assert!(!record.unit.is_empty());
            assert!(!record.category.is_empty());
        }
        assert_eq!(records[1].quantity, 0.75);

        let requests = provider.requests.lock().unwrap();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].0, INGREDIENTS_PROMPT);
        assert_eq!(
            requests[0].1,
            r#"Here's the ingredients: ["1 pound sweet Italian sausage"]"#
        );
    }

    #[tokio::test]
    async fn test_prompt_example_nutrition_decode() {
        let example = prompt_example(NUTRITION_PROMPT);
        let provider = CannedProvider::new(Some(Completion::Text(example)));
        let normalizer = Normalizer::new(provider.clone());

        let mut raw = Map::new();
        raw.insert("calories".to_string(), json!("315 kcal"));
        let records = normalizer.normalize_nutrition(&raw).await.unwrap();

        assert_eq!(records[0].name, "calories");
        assert_eq!(records[0].quantity, 315.0);
        assert_eq!(records[0].unit, "kcal");
        let requests = provider.requests.lock().unwrap();
        assert_eq!(requests[0].0, NUTRITION_PROMPT);
        assert!(requests[0].1.starts_with("Here's the nutrition: {"));
    }

    #[tokio::test]
    async fn test_structured_completion_skips_text_decode() {
        let provider = CannedProvider::new(Some(Completion::Json(json!([
            {"name": "calories", "quantity": 200, "unit": "kcal"}
        ]))));
        let normalizer = Normalizer::new(provider);
        let records = normalizer.normalize_nutrition(&Map::new()).await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].quantity, 200.0);
    }

    #[tokio::test]
    async fn test_empty_completion() {
        let normalizer = Normalizer::new(CannedProvider::new(None));
        let result = normalizer.normalize_ingredients(&[]).await;
        assert!(matches!(result, Err(NormalizeError::EmptyResponse)));
    }

    #[tokio::test]
    async fn test_provider_failure() {
        let normalizer = Normalizer::new(Arc::new(FailingProvider));
        match normalizer.normalize_ingredients(&[]).await {
            Err(NormalizeError::Provider(message)) => assert!(message.contains("connection reset")),
            other => panic!("expected provider error, got {other:?}"),
        }
    }

    #[test]
    fn test_malformed_text_keeps_original() {
        let text = "Sure! Here are your ingredients: [".to_string();
        let result: Result<Vec<NormalizedIngredient>, _> =
            decode_completion(Some(Completion::Text(text.clone())));
        match result {
            Err(NormalizeError::MalformedResponse { text: reported, .. }) => {
                assert_eq!(reported, text)
            }
            other => panic!("expected malformed response, got {other:?}"),
        }
    }

    #[test]
    fn test_trailing_comma_is_malformed() {
        let text = r#"[{"name": "calories", "quantity": 1, "unit": "kcal"},]"#;
        let result: Result<Vec<NormalizedNutrient>, _> =
            decode_completion(Some(Completion::Text(text.to_string())));
        assert!(matches!(
            result,
            Err(NormalizeError::MalformedResponse { .. })
        ));
    }

    #[test]
    fn test_code_fences_stripped() {
        let fenced = "```json\n[{\"ingredient\": \"eggs\", \"quantity\": \"2\", \"unit\": null, \"category\": \"dairy\"}]\n```";
        let records: Vec<NormalizedIngredient> =
            decode_completion(Some(Completion::Text(fenced.to_string()))).unwrap();
        assert_eq!(records[0].quantity, 2.0);
        assert_eq!(records[0].unit, DEFAULT_UNIT);

        assert_eq!(strip_code_fences("```\n[]\n```"), "[]");
        assert_eq!(strip_code_fences("```[1]```"), "[1]");
        assert_eq!(strip_code_fences("  [] "), "[]");
    }

    #[test]
    fn test_fenced_blank_is_empty() {
        let result: Result<Vec<NormalizedNutrient>, _> =
            decode_completion(Some(Completion::Text("```json\n```".to_string())));
        assert!(matches!(result, Err(NormalizeError::EmptyResponse)));
    }

    #[test]
    fn test_wrong_shape_is_malformed() {
        let result: Result<Vec<NormalizedNutrient>, _> =
            decode_completion(Some(Completion::Json(json!({"name": "calories"}))));
        assert!(matches!(
            result,
            Err(NormalizeError::MalformedResponse { .. })
        ));
    }
}
