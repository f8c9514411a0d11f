//! Transformers shipped with this crate.
use crate::pipeline::{ConfigMap, ConfigValue, Transformer};
use crate::record::{ContextValue, Event};

/// Replaces the value of any context key named in the comma-separated
/// `keys` config string with the literal `"[REDACTED]"`. Has no effect on
/// an event with no context, or when none of its keys match.
pub struct RedactKeysTransformer;

impl Transformer for RedactKeysTransformer {
    fn call(&self, mut record: Event, config: &ConfigMap) -> Result<Event, String> {
        let keys: Vec<String> = match config.get("keys") {
            Some(ConfigValue::Str(s)) => s.split(',').map(|k| k.trim().to_string()).filter(|k| !k.is_empty()).collect(),
            None => Vec::new(),
            Some(_) => return Err("redact_keys expects `keys` to be a comma-separated string".to_string()),
        };

        if let Some(ctx) = record.context.as_mut() {
            for key in &keys {
                if let Some(v) = ctx.get_mut(key) {
                    *v = ContextValue::Str("[REDACTED]".to_string());
                }
            }
        }
        Ok(record)
    }
}
