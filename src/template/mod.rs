//! Prompt templating
//!
//! Jinja2-compatible prompts rendered with minijinja. The chat and image
//! prompts ship with the binary (`prompts/*.j2`) and are resolved through the
//! environment's loader.
//!
//! # Example
//!
//! ```ignore
//! let engine = TemplateEngine::new();
//! let ctx = PromptContext::new("punjab", "clay", "When should I sow rice?")
//!     .with_season(season_line);
//! let prompt = engine.render_named(prompts::CHAT, &ctx)?;
//! ```

mod context;
mod engine;
mod errors;
mod filters;
pub mod prompts;

pub use context::PromptContext;
pub use engine::TemplateEngine;
pub use errors::TemplateError;
pub use filters::title_case;
