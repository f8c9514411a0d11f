//! Pipelines and the step executor (spec.md §4.B).
//!
//! Every transformer, presenter, and output is a tagged `{kind, function,
//! config}` triple per spec.md §9; the step executor runs each through a
//! single guarded call and never lets a step's failure reach the caller or
//! stop the rest of the pipeline chain. Grounded in `log_impl.rs`'s
//! `fallback_on_error`/`backup_logging` pair, generalized from "one output
//! kind" to "three step kinds".
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use crate::diagnostic;
use crate::level::Level;
use crate::record::Event;

/// A configuration value accepted by a step's config map.
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigValue {
    /// A string value.
    Str(String),
    /// An integer value.
    Int(i64),
    /// A floating point value.
    Float(f64),
    /// A boolean value.
    Bool(bool),
    /// A level value.
    Level(Level),
}

impl fmt::Display for ConfigValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigValue::Str(s) => write!(f, "{}", s),
            ConfigValue::Int(i) => write!(f, "{}", i),
            ConfigValue::Float(v) => write!(f, "{}", v),
            ConfigValue::Bool(b) => write!(f, "{}", b),
            ConfigValue::Level(l) => write!(f, "{}", l),
        }
    }
}

/// A step's merged configuration: defaults overlaid by user-supplied
/// values, shallow-merged (spec.md §4.B).
pub type ConfigMap = BTreeMap<String, ConfigValue>;

/// Shallow-merges `user` over `defaults`: any key present in `user`
/// overrides the same key in `defaults`; all other default keys pass
/// through untouched.
pub fn merge_configs(defaults: &ConfigMap, user: &ConfigMap) -> ConfigMap {
    let mut merged = defaults.clone();
    for (k, v) in user {
        merged.insert(k.clone(), v.clone());
    }
    merged
}

/// An output endpoint: the terminal step of a pipeline.
///
/// Must not mutate the record (spec.md §6).
pub trait Output: Send + Sync {
    /// Writes the finalized record using the merged configuration.
    fn call(&self, record: &Event, config: &ConfigMap) -> Result<(), String>;
}

/// Renders a record (possibly transformed) into its final `message` text.
///
/// Must be pure (spec.md §6): it may read all fields but must not have
/// side effects.
pub trait Presenter: Send + Sync {
    /// Produces the text that will be stored into `record.message`.
    fn call(&self, record: &Event, config: &ConfigMap) -> Result<String, String>;
}

/// Transforms a record before presentation, returning a (possibly
/// modified) copy.
pub trait Transformer: Send + Sync {
    /// Applies this transformer, consuming and returning the record.
    fn call(&self, record: Event, config: &ConfigMap) -> Result<Event, String>;
}

/// An output function paired with its merged configuration.
#[derive(Clone)]
pub struct OutputSpec {
    pub(crate) func: Arc<dyn Output>,
    pub(crate) config: ConfigMap,
}

impl OutputSpec {
    /// Builds an output spec, merging `config` over the output's defaults.
    pub fn new(func: Arc<dyn Output>, defaults: ConfigMap, config: ConfigMap) -> Self {
        OutputSpec { func, config: merge_configs(&defaults, &config) }
    }
}

/// A presenter function paired with its merged configuration.
#[derive(Clone)]
pub struct PresenterSpec {
    pub(crate) func: Arc<dyn Presenter>,
    pub(crate) config: ConfigMap,
}

impl PresenterSpec {
    /// Builds a presenter spec, merging `config` over the presenter's
    /// defaults.
    pub fn new(func: Arc<dyn Presenter>, defaults: ConfigMap, config: ConfigMap) -> Self {
        PresenterSpec { func, config: merge_configs(&defaults, &config) }
    }
}

/// A transformer function paired with its merged configuration.
#[derive(Clone)]
pub struct TransformerSpec {
    pub(crate) func: Arc<dyn Transformer>,
    pub(crate) config: ConfigMap,
}

impl TransformerSpec {
    /// Builds a transformer spec, merging `config` over the transformer's
    /// defaults.
    pub fn new(func: Arc<dyn Transformer>, defaults: ConfigMap, config: ConfigMap) -> Self {
        TransformerSpec { func, config: merge_configs(&defaults, &config) }
    }
}

/// A configured `(transformers -> presenter -> outputs)` chain belonging to
/// a logger (spec.md §3).
#[derive(Clone)]
pub struct Pipeline {
    outputs: Vec<OutputSpec>,
    presenter: PresenterSpec,
    transformers: Vec<TransformerSpec>,
    level: Option<Level>,
}

impl Pipeline {
    /// Builds a pipeline. `outputs` must be non-empty; violating this is a
    /// programmer error caught here rather than deferred to dispatch time.
    pub fn new(
        outputs: Vec<OutputSpec>,
        presenter: PresenterSpec,
        transformers: Vec<TransformerSpec>,
        level: Option<Level>,
    ) -> Self {
        assert!(!outputs.is_empty(), "a pipeline must have at least one output");
        Pipeline { outputs, presenter, transformers, level: level.filter(|&l| l != Level::NOTSET) }
    }

    /// This pipeline's own level gate, if any.
    pub fn level(&self) -> Option<Level> {
        self.level
    }
}

/// Runs one pipeline for one emitting logger (spec.md §4.D `emit`).
///
/// Implements the per-pipeline gating, the shallow record copy, the
/// transformer chain with failure isolation, the presenter with fallback,
/// and the output loop with per-output failure isolation.
pub fn run_pipeline(pipeline: &Pipeline, event: &Event, owner_name: &str, owner_level: Level, owner_propagate: bool) {
    if let Some(gate) = pipeline.level {
        if event.level_no < gate {
            return;
        }
    }

    let mut record = event.clone();
    record.owner_logger_name = Some(owner_name.into());
    record.owner_logger_level = Some(owner_level);
    record.owner_logger_propagate = Some(owner_propagate);

    let mut transformer_failed = false;
    for spec in &pipeline.transformers {
        if transformer_failed {
            break;
        }
        match spec.func.call(record.clone(), &spec.config) {
            Ok(next) => record = next,
            Err(detail) => {
                diagnostic::report_error("transformer", &detail);
                record.transformer_error = Some(detail);
                transformer_failed = true;
            }
        }
    }

    if !transformer_failed {
        match pipeline.presenter.func.call(&record, &pipeline.presenter.config) {
            Ok(message) => record.message = message,
            Err(detail) => {
                diagnostic::report_error("presenter", &detail);
                record.presenter_error = Some(detail.clone());
                record.message = fallback_message(&record, &detail);
            }
        }
    } else {
        // transformer failure skips the presenter too, but the output
        // still needs *some* message body to show the operator what broke.
        record.message = fallback_message(&record, record.transformer_error.as_deref().unwrap_or(""));
    }

    for out in &pipeline.outputs {
        if let Err(detail) = out.func.call(&record, &out.config) {
            diagnostic::report_error("output", &detail);
        }
    }
}

fn fallback_message(record: &Event, detail: &str) -> String {
    format!(
        "[{}][{}][{}][{}:{}] {} [STEP ERROR: {}]",
        record.timestamp.to_rfc3339(),
        record.level_name,
        record.owner_logger_name.as_deref().unwrap_or(&record.logger_name),
        record.filename.unwrap_or("?"),
        record.lineno.unwrap_or(0),
        record.message_fmt,
        detail,
    )
}
