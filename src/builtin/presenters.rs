//! Presenters shipped with this crate.
//!
//! `TextPresenter` is the plain-text equivalent of `fern`'s default format
//! closure; `ColorPresenter` (behind the `color` feature) is grounded in
//! `colors.rs::ColoredLevelConfig`, generalized from coloring just the
//! level token to coloring the whole rendered line by level; `JsonPresenter`
//! (behind the `json` feature) renders a single-line structured object for
//! log aggregators that expect one.
use crate::pipeline::{ConfigMap, Presenter};
use crate::record::Event;

/// Renders `{timestamp} [{level}] {logger}: {message}`, no coloring.
pub struct TextPresenter;

impl Presenter for TextPresenter {
    fn call(&self, record: &Event, _config: &ConfigMap) -> Result<String, String> {
        Ok(render(record))
    }
}

fn render(record: &Event) -> String {
    format!(
        "{} [{}] {}: {}",
        record.timestamp.to_rfc3339(),
        record.level_name,
        record.owner_logger_name.as_deref().unwrap_or(&record.logger_name),
        record.message
    )
}

/// Renders the same layout as [`TextPresenter`], wrapping the level token
/// in an ANSI foreground color chosen by severity.
#[cfg(feature = "color")]
pub struct ColorPresenter;

#[cfg(feature = "color")]
impl Presenter for ColorPresenter {
    fn call(&self, record: &Event, _config: &ConfigMap) -> Result<String, String> {
        use colored::Colorize;
        let level = match record.level_no {
            l if l == crate::level::Level::CRITICAL => record.level_name.bright_red().bold().to_string(),
            l if l == crate::level::Level::ERROR => record.level_name.red().to_string(),
            l if l == crate::level::Level::WARNING => record.level_name.yellow().to_string(),
            l if l == crate::level::Level::INFO => record.level_name.green().to_string(),
            l if l == crate::level::Level::DEBUG => record.level_name.cyan().to_string(),
            _ => record.level_name.normal().to_string(),
        };
        Ok(format!(
            "{} [{}] {}: {}",
            record.timestamp.to_rfc3339(),
            level,
            record.owner_logger_name.as_deref().unwrap_or(&record.logger_name),
            record.message
        ))
    }
}

/// Renders a record as a single-line JSON object, grounded in
/// `QE-Lab-dqcsim`'s `serde`/`serde_json` dependency pair (the pack's only
/// example crate that ships structured serialization for log-shaped data).
#[cfg(feature = "json")]
pub struct JsonPresenter;

#[cfg(feature = "json")]
impl Presenter for JsonPresenter {
    fn call(&self, record: &Event, _config: &ConfigMap) -> Result<String, String> {
        let mut context = serde_json::Map::new();
        if let Some(ctx) = &record.context {
            for (k, v) in ctx {
                let value = match v {
                    crate::record::ContextValue::Str(s) => serde_json::Value::String(s.clone()),
                    crate::record::ContextValue::Int(i) => serde_json::Value::from(*i),
                    crate::record::ContextValue::Float(f) => serde_json::json!(f),
                    crate::record::ContextValue::Bool(b) => serde_json::Value::Bool(*b),
                };
                context.insert(k.clone(), value);
            }
        }

        let mut obj = serde_json::Map::new();
        obj.insert("timestamp".to_string(), serde_json::Value::String(record.timestamp.to_rfc3339()));
        obj.insert("level".to_string(), serde_json::Value::String(record.level_name.clone()));
        obj.insert(
            "logger".to_string(),
            serde_json::Value::String(record.owner_logger_name.as_deref().unwrap_or(&record.logger_name).to_string()),
        );
        obj.insert("message".to_string(), serde_json::Value::String(record.message.clone()));
        if !context.is_empty() {
            obj.insert("context".to_string(), serde_json::Value::Object(context));
        }

        serde_json::to_string(&serde_json::Value::Object(obj)).map_err(|e| e.to_string())
    }
}
