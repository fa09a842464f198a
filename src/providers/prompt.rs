/// System instruction for ingredient normalization.
///
/// The prompts are loaded from text files at compile time using the
/// `include_str!` macro, making them easy to edit without dealing with
/// Rust string syntax.
pub const INGREDIENTS_PROMPT: &str = include_str!("ingredients_prompt.txt");

/// System instruction for nutrition normalization.
pub const NUTRITION_PROMPT: &str = include_str!("nutrition_prompt.txt");
