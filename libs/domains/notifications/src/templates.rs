//! File-backed email template cache.
//!
//! Templates are Handlebars files in a fixed directory, compiled on first
//! use and kept for the life of the process. Every render gets a `timestamp`
//! key injected into its context, overwriting any caller-supplied value.

use crate::error::{NotificationError, NotificationResult};
use chrono::{SecondsFormat, Utc};
use handlebars::Handlebars;
use serde_json::Value;
use std::path::PathBuf;
use tokio::sync::RwLock;
use tracing::debug;

/// Compiled-template cache over a template directory.
pub struct TemplateCache {
    dir: PathBuf,
    registry: RwLock<Handlebars<'static>>,
}

impl TemplateCache {
    /// Create a cache over `dir`. Nothing is read until the first render.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            registry: RwLock::new(Handlebars::new()),
        }
    }

    /// Render the template `name` with `data`.
    ///
    /// `data` must be a JSON object (or null for an empty context). The
    /// generation timestamp is injected under `timestamp` in ISO-8601 form.
    pub async fn render(&self, name: &str, data: &Value) -> NotificationResult<String> {
        self.load(name).await?;

        let mut context = match data {
            Value::Object(map) => map.clone(),
            Value::Null => serde_json::Map::new(),
            other => {
                return Err(NotificationError::Internal(format!(
                    "template context must be a JSON object, got {other}"
                )));
            }
        };
        context.insert(
            "timestamp".to_string(),
            Value::String(Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)),
        );

        self.registry
            .read()
            .await
            .render(name, &context)
            .map_err(|e| NotificationError::Template {
                name: name.to_string(),
                reason: e.to_string(),
            })
    }

    /// Compile and cache `name` unless it is already registered.
    async fn load(&self, name: &str) -> NotificationResult<()> {
        if self.registry.read().await.has_template(name) {
            return Ok(());
        }

        let path = self.dir.join(format!("{name}.html"));
        let raw = tokio::fs::read_to_string(&path)
            .await
            .map_err(|e| NotificationError::Template {
                name: name.to_string(),
                reason: format!("failed to read {}: {e}", path.display()),
            })?;

        let mut registry = self.registry.write().await;
        // Another render may have won the race between our read and write
        // locks; registering twice would be harmless but noisy.
        if !registry.has_template(name) {
            registry
                .register_template_string(name, raw)
                .map_err(|e| NotificationError::Template {
                    name: name.to_string(),
                    reason: e.to_string(),
                })?;
            debug!(template = name, "Compiled and cached template");
        }

        Ok(())
    }

    /// Drop every cached template.
    ///
    /// Administrative/test use only. Renders in flight finish with the
    /// compiled artifact they already hold; the next render recompiles from
    /// disk.
    pub async fn clear(&self) {
        self.registry.write().await.clear_templates();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, Utc};
    use serde_json::json;
    use tempfile::TempDir;

    fn write_template(dir: &TempDir, name: &str, contents: &str) {
        std::fs::write(dir.path().join(format!("{name}.html")), contents).unwrap();
    }

    #[tokio::test]
    async fn test_render_with_context() {
        let dir = TempDir::new().unwrap();
        write_template(&dir, "greeting", "<p>Hello {{name}}</p>");

        let cache = TemplateCache::new(dir.path());
        let html = cache
            .render("greeting", &json!({ "name": "John" }))
            .await
            .unwrap();

        assert_eq!(html, "<p>Hello John</p>");
    }

    #[tokio::test]
    async fn test_cache_survives_file_deletion() {
        let dir = TempDir::new().unwrap();
        write_template(&dir, "cached", "<p>{{value}}</p>");

        let cache = TemplateCache::new(dir.path());
        let first = cache.render("cached", &json!({ "value": "a" })).await.unwrap();

        // The compiled template must be served from the cache, not the file
        std::fs::remove_file(dir.path().join("cached.html")).unwrap();

        let second = cache.render("cached", &json!({ "value": "a" })).await.unwrap();
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_timestamp_injection_overwrites_caller_value() {
        let dir = TempDir::new().unwrap();
        write_template(&dir, "stamped", "{{timestamp}}");

        let cache = TemplateCache::new(dir.path());

        let before = Utc::now();
        let html = cache
            .render("stamped", &json!({ "timestamp": "1999-01-01T00:00:00Z" }))
            .await
            .unwrap();
        let after = Utc::now();

        assert_ne!(html, "1999-01-01T00:00:00Z");
        let rendered: DateTime<Utc> = html.parse().unwrap();
        assert!(rendered >= before - chrono::Duration::milliseconds(1));
        assert!(rendered <= after + chrono::Duration::milliseconds(1));
    }

    #[tokio::test]
    async fn test_missing_template_error_names_template() {
        let dir = TempDir::new().unwrap();
        let cache = TemplateCache::new(dir.path());

        let err = cache.render("nonexistent", &json!({})).await.unwrap_err();
        assert!(matches!(err, NotificationError::Template { .. }));
        assert!(err.to_string().contains("nonexistent"));
    }

    #[tokio::test]
    async fn test_clear_forces_reload() {
        let dir = TempDir::new().unwrap();
        write_template(&dir, "volatile", "v1 {{value}}");

        let cache = TemplateCache::new(dir.path());
        let first = cache.render("volatile", &json!({ "value": "x" })).await.unwrap();
        assert_eq!(first, "v1 x");

        write_template(&dir, "volatile", "v2 {{value}}");
        cache.clear().await;

        let second = cache.render("volatile", &json!({ "value": "x" })).await.unwrap();
        assert_eq!(second, "v2 x");
    }

    #[tokio::test]
    async fn test_non_object_context_rejected() {
        let dir = TempDir::new().unwrap();
        write_template(&dir, "plain", "ok");

        let cache = TemplateCache::new(dir.path());
        let err = cache.render("plain", &json!([1, 2, 3])).await.unwrap_err();
        assert!(matches!(err, NotificationError::Internal(_)));
    }
}
