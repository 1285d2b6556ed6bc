//! Theme engine wrapping Tera.

use std::path::Path;

use anyhow::{Context, Result};
use tera::Tera;
use tracing::debug;

/// Theme engine for rendering templates.
pub struct ThemeEngine {
    /// Tera template engine instance.
    tera: Tera,
}

impl ThemeEngine {
    /// Create a new theme engine loading templates from the given directory.
    pub fn new(template_dir: &Path) -> Result<Self> {
        let pattern = template_dir.join("**/*.html");
        let pattern_str = pattern
            .to_str()
            .context("invalid template directory path")?;

        let mut tera = Tera::new(pattern_str).context("failed to initialize Tera templates")?;
        Self::register_filters(&mut tera);

        let count = tera.get_template_names().count();
        debug!(count, "loaded templates");

        Ok(Self { tera })
    }

    /// Create a theme engine with no templates (for testing).
    pub fn empty() -> Self {
        let mut tera = Tera::default();
        Self::register_filters(&mut tera);
        Self { tera }
    }

    /// Register custom Tera filters.
    fn register_filters(tera: &mut Tera) {
        // Format an RFC 3339 timestamp as a human-readable date
        tera.register_filter(
            "format_date",
            |value: &tera::Value, _args: &std::collections::HashMap<String, tera::Value>| {
                let Some(raw) = value.as_str() else {
                    return Ok(tera::Value::String(String::new()));
                };

                let formatted = chrono::DateTime::parse_from_rfc3339(raw)
                    .map(|dt| dt.format("%B %-d, %Y").to_string())
                    .unwrap_or_else(|_| raw.to_string());

                Ok(tera::Value::String(formatted))
            },
        );
    }

    /// Get the underlying Tera instance.
    pub fn tera(&self) -> &Tera {
        &self.tera
    }
}

impl std::fmt::Debug for ThemeEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ThemeEngine")
            .field("template_count", &self.tera.get_template_names().count())
            .finish()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn format_date_filter_formats_rfc3339() {
        let mut tera = Tera::default();
        ThemeEngine::register_filters(&mut tera);

        tera.add_raw_template("test", "{{ ts | format_date }}").unwrap();
        let mut ctx = tera::Context::new();
        ctx.insert("ts", "2025-02-15T00:00:00Z");
        let result = tera.render("test", &ctx).unwrap();
        assert_eq!(result, "February 15, 2025");
    }

    #[test]
    fn format_date_filter_passes_through_garbage() {
        let mut tera = Tera::default();
        ThemeEngine::register_filters(&mut tera);

        tera.add_raw_template("test", "{{ ts | format_date }}").unwrap();
        let mut ctx = tera::Context::new();
        ctx.insert("ts", "not a date");
        let result = tera.render("test", &ctx).unwrap();
        assert_eq!(result, "not a date");
    }
}
