//! Ready-made outputs, presenters, and transformers.
//!
//! Shipped so the crate is usable (and testable, via [`default_pipeline`])
//! without an application supplying its own pipeline steps first. Grounded
//! in `log_impl.rs::Output`'s `Stdout`/`Stderr`/`File`/`Null` variants and
//! `colors.rs`'s `ColoredLevelConfig`.
pub mod outputs;
pub mod presenters;
pub mod transformers;

use std::sync::Arc;

use crate::pipeline::{ConfigMap, OutputSpec, Pipeline, PresenterSpec};

/// The pipeline [`crate::config::reset_config`] installs on the root
/// logger: a console output paired with the default presenter for the
/// `color` feature state.
pub fn default_pipeline() -> Pipeline {
    let console = outputs::ConsoleOutput::stdout();
    let defaults = console.default_config();
    Pipeline::new(
        vec![OutputSpec::new(Arc::new(console), defaults, ConfigMap::new())],
        default_presenter_spec(),
        vec![],
        None,
    )
}

#[cfg(feature = "color")]
fn default_presenter_spec() -> PresenterSpec {
    PresenterSpec::new(Arc::new(presenters::ColorPresenter), ConfigMap::new(), ConfigMap::new())
}

#[cfg(not(feature = "color"))]
fn default_presenter_spec() -> PresenterSpec {
    PresenterSpec::new(Arc::new(presenters::TextPresenter), ConfigMap::new(), ConfigMap::new())
}
