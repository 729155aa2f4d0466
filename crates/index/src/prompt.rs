//! Handlebars rendering for the LLM-backed classifier and summarizer.

use handlebars::Handlebars;
use recall_core::{AppError, AppResult};
use serde::Serialize;

/// Render a Handlebars template with variables.
pub(crate) fn render_template<T: Serialize>(template: &str, variables: &T) -> AppResult<String> {
    let mut handlebars = Handlebars::new();

    // Plain text prompts, no HTML escaping
    handlebars.register_escape_fn(handlebars::no_escape);

    handlebars
        .register_template_string("prompt", template)
        .map_err(|e| AppError::Config(format!("Failed to register template: {}", e)))?;

    handlebars
        .render("prompt", variables)
        .map_err(|e| AppError::Config(format!("Failed to render template: {}", e)))
}
