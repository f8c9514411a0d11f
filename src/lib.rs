#![deny(missing_docs)]
//! Grove is a hierarchical, pipeline-based logging library.
//!
//! Current features:
//!
//! - A dotted-name logger hierarchy (`"app.db.pool"` is a child of
//!   `"app.db"`, which is a child of `"app"`), with cached, identity-stable
//!   lookups and level inheritance through any ancestor left at `NOTSET`.
//! - Per-logger pipelines: each is a `transformers -> presenter -> outputs`
//!   chain, with its own optional level gate, and a failing step never
//!   takes down the rest of the chain or the caller.
//! - An optional async writer: a bounded queue and a background worker,
//!   with configurable overflow handling, batching, and automatic restart.
//! - A validated root configuration, a live environment-variable level
//!   poller, and a command-line verbosity auto-detector.
//!
//! This library can only be used while complying to the license terms in
//! the `LICENSE` file.
//!
//! Quick start
//! ===========
//!
//! ```
//! use grove::Level;
//!
//! let log = grove::logger("app.startup", None).unwrap();
//! log.set_level(Level::INFO);
//! log.info("listening");
//! ```
//!
//! Custom pipelines
//! ================
//!
//! ```
//! use std::sync::Arc;
//! use grove::builtin::outputs::NullOutput;
//! use grove::builtin::presenters::TextPresenter;
//! use grove::{ConfigMap, OutputSpec, Pipeline, PresenterSpec};
//!
//! let pipeline = Pipeline::new(
//!     vec![OutputSpec::new(Arc::new(NullOutput), ConfigMap::new(), ConfigMap::new())],
//!     PresenterSpec::new(Arc::new(TextPresenter), ConfigMap::new(), ConfigMap::new()),
//!     vec![],
//!     None,
//! );
//! let log = grove::logger("app.quiet", None).unwrap();
//! log.set_pipelines(vec![pipeline]);
//! ```
mod async_writer;
pub mod builtin;
mod callerinfo;
mod cli_verbosity;
mod config;
mod diagnostic;
mod dispatch;
mod error;
mod format;
mod level;
mod live_level;
mod pipeline;
mod record;
mod registry;
mod logger;

pub use async_writer::{flush, stats, FlushOutcome, OverflowStrategy, WriterStats};
pub use callerinfo::{derive_module_from_path, resolve as resolve_caller_info, Resolved as ResolvedCallerInfo};
pub use config::{
    config, config_raw, get_config, reset_config, validate_logger_config_keys, AsyncConfig, CliVerbosityConfig, ConfigUpdates,
    LiveLevelConfig, RawConfigValue, RootConfig, LOGGER_CONFIG_KEYS, ROOT_CONFIG_KEYS,
};
pub use diagnostic::{is_debug_enabled, DEBUG_ENV_VAR};
pub use error::GroveError;
pub use format::LogInput;
pub use level::{is_enabled, level_of, name_of, register as register_level, reset_registry as reset_level_registry, Level};
pub use logger::{logger, logger_for_module, Logger};
pub use pipeline::{merge_configs, ConfigMap, ConfigValue, Output, OutputSpec, Pipeline, Presenter, PresenterSpec, Transformer, TransformerSpec};
pub use record::{CallSite, Context, ContextValue, Event, FormatArg};
pub use registry::{cache_len, reset_cache, LoggerConfig, ROOT_NAME};

/// The automatic-name entry point: expands to a [`Logger`] named after the
/// calling module, equivalent to `grove::logger_for_module(module_path!())`.
///
/// ```
/// let log = grove::logger!();
/// log.info("hello from this module");
/// ```
#[macro_export]
macro_rules! logger {
    () => {
        $crate::logger_for_module(module_path!())
    };
}
