mod request;

pub use request::{RecipeDocument, RequestFetcher, BROWSER_USER_AGENT};
