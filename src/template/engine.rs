//! Template engine for rendering prompts

use super::context::PromptContext;
use super::errors::TemplateError;
use super::{filters, prompts};
use minijinja::{Environment, ErrorKind};

/// Template rendering engine
///
/// Wraps minijinja with custom filters, strict undefined handling and the
/// built-in prompt templates.
pub struct TemplateEngine {
    env: Environment<'static>,
}

impl Default for TemplateEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl TemplateEngine {
    pub fn new() -> Self {
        let mut env = Environment::new();

        env.set_undefined_behavior(minijinja::UndefinedBehavior::Strict);
        filters::register_filters(&mut env);
        env.set_loader(|name| Ok(prompts::builtin(name).map(str::to_string)));

        Self { env }
    }

    /// Render a built-in template by name
    pub fn render_named(&self, name: &str, ctx: &PromptContext) -> Result<String, TemplateError> {
        let tmpl = self.env.get_template(name).map_err(|e| {
            if e.kind() == ErrorKind::TemplateNotFound {
                TemplateError::Internal(e)
            } else {
                TemplateError::syntax(e.to_string(), name, e.line().unwrap_or(0))
            }
        })?;

        tmpl.render(ctx.to_value())
            .map_err(|e| convert_minijinja_error(e, name, ctx))
    }

    #[cfg(test)]
    /// Render an ad-hoc template string
    pub fn render(&self, template: &str, ctx: &PromptContext) -> Result<String, TemplateError> {
        self.env
            .render_str(template, ctx.to_value())
            .map_err(|e| convert_minijinja_error(e, "<string>", ctx))
    }

    /// Compile every built-in template, reporting the first syntax error
    pub fn validate_builtin(&self) -> Result<(), TemplateError> {
        for name in [prompts::CHAT, prompts::IMAGE] {
            self.env
                .get_template(name)
                .map_err(|e| TemplateError::syntax(e.to_string(), name, e.line().unwrap_or(0)))?;
        }
        Ok(())
    }
}

fn convert_minijinja_error(err: minijinja::Error, name: &str, ctx: &PromptContext) -> TemplateError {
    let line = err.line().unwrap_or(0);

    match err.kind() {
        ErrorKind::UndefinedError => {
            let var_name = extract_var_from_error(&err.to_string());
            TemplateError::undefined_variable_at(var_name, name, line, &ctx.known_variables())
        }
        ErrorKind::InvalidOperation => TemplateError::filter(err.to_string()),
        _ => TemplateError::syntax(err.to_string(), name, line),
    }
}

/// Extract the variable name from a minijinja error message
fn extract_var_from_error(msg: &str) -> String {
    // Messages look like: "undefined value (in chat:3): variable is `wether`"
    msg.split('`')
        .nth(1)
        .filter(|name| !name.is_empty())
        .unwrap_or("unknown")
        .to_string()
}
