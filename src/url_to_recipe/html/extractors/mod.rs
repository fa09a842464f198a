use crate::error::NotFoundError;
use crate::model::{RawExtraction, RecipeInfo};
use crate::url_to_recipe::fetchers::RecipeDocument;
use crate::url_to_recipe::html::locate;
use log::{debug, info};
use serde_json::{Map, Value};

mod ingredients;
pub mod node;
mod nutrition;
mod recipe_info;

pub use ingredients::IngredientsExtractor;
pub use nutrition::NutritionExtractor;
pub use recipe_info::{find_video_content_url, normalize_image, RecipeInfoExtractor};

/// One field family pulled out of a page's structured-data blocks.
pub trait Extractor {
    type Output;

    fn name(&self) -> &'static str;

    /// Try a single block; `None` moves the scan on to the next one.
    fn extract_block(&self, block: &Value) -> Option<Self::Output>;

    fn not_found(&self) -> NotFoundError;

    /// Scan `blocks` in order and return the first match.
    fn extract<I>(&self, blocks: I) -> Result<Self::Output, NotFoundError>
    where
        I: IntoIterator<Item = Value>,
    {
        for (index, block) in blocks.into_iter().enumerate() {
            if let Some(found) = self.extract_block(&block) {
                info!("Extracted {} from JSON-LD block {}", self.name(), index);
                return Ok(found);
            }
            debug!("No {} in JSON-LD block {}", self.name(), index);
        }
        Err(self.not_found())
    }
}

pub fn extract_ingredients(document: &RecipeDocument) -> Result<Vec<String>, NotFoundError> {
    IngredientsExtractor.extract(locate(document))
}

pub fn extract_nutrition(document: &RecipeDocument) -> Result<Map<String, Value>, NotFoundError> {
    NutritionExtractor.extract(locate(document))
}

pub fn extract_recipe_info(document: &RecipeDocument) -> Result<RecipeInfo, NotFoundError> {
    RecipeInfoExtractor.extract(locate(document))
}

/// Run every extraction against `document`.
///
/// Each field family is resolved independently, so name, ingredients and
/// nutrition may come from different blocks.
pub fn extract_raw(document: &RecipeDocument) -> Result<RawExtraction, NotFoundError> {
    debug!("Extracting recipe data from URL: {}", document.url());
    let info = extract_recipe_info(document)?;
    let ingredients = extract_ingredients(document)?;
    let nutrition = extract_nutrition(document)?;

    Ok(RawExtraction {
        ingredients,
        nutrition,
        name: info.name,
        image: info.image,
        video_url: info.video_url,
    })
}
