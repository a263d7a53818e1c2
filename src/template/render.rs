use std::collections::HashMap;
use std::sync::LazyLock;

use minijinja::{Environment, UndefinedBehavior, Value};

use crate::config::types::ReviewPromptConfig;
use crate::error::MrAgentError;

/// Shared minijinja environment with strict undefined behavior.
static JINJA_ENV: LazyLock<Environment<'static>> = LazyLock::new(|| {
    let mut env = Environment::new();
    env.set_undefined_behavior(UndefinedBehavior::Strict);
    env
});

/// Rendered prompt pair ready for the AI model.
#[derive(Debug, Clone)]
pub struct RenderedPrompt {
    pub system: String,
    pub user: String,
}

/// Render the review prompt pair with the given variables.
///
/// Takes ownership of `vars` to avoid cloning large Values (the
/// annotated diff string can be 100 KB+). The context Value is built
/// once and shared across both renders via cheap Arc clone.
pub fn render_prompt(
    template: &ReviewPromptConfig,
    vars: HashMap<String, Value>,
) -> Result<RenderedPrompt, MrAgentError> {
    let env = &*JINJA_ENV;
    let ctx = Value::from_iter(vars);

    let system = render_template(env, "system", &template.system, &ctx)?;
    let user = render_template(env, "user", &template.user, &ctx)?;

    Ok(RenderedPrompt { system, user })
}

fn render_template(
    env: &Environment,
    name: &str,
    template_str: &str,
    ctx: &Value,
) -> Result<String, MrAgentError> {
    let tmpl = env.template_from_str(template_str).map_err(|e| {
        tracing::error!(template = name, error = %e, "template parse failed");
        MrAgentError::Template(e)
    })?;

    tmpl.render(ctx.clone()).map_err(|e| {
        tracing::error!(template = name, error = %e, "template render failed");
        MrAgentError::Template(e)
    })
}
