//! The dispatch engine (component D, spec.md §4.D).
//!
//! Effective-level resolution and the propagation walk — the heart of the
//! system. Grounded in `log_impl.rs::Dispatch::log_args`/`finish_logging`
//! (walk + per-output invocation) and `builders.rs::Dispatch`'s
//! `level`/`level_for` precedence, generalized from a static nested-dispatch
//! tree to a dynamic logger-parent-chain walk.
use std::sync::Arc;

use crate::level::Level;
use crate::pipeline;
use crate::record::Event;
use crate::registry::{self, LoggerState, ROOT_NAME};

/// The level actually in force for `state`: its own level if not `NOTSET`,
/// else the nearest ancestor's, terminating at `_root`'s current
/// configured level (spec.md §4.D, invariant 2).
///
/// `_root`'s level is re-read from the root configuration on every call —
/// this is what makes changing the root level at runtime immediately
/// observable by every descendant whose own level is `NOTSET`.
pub fn effective_level(state: &Arc<LoggerState>) -> Level {
    if &*state.name == ROOT_NAME {
        return crate::config::root_level();
    }
    let own = *state.level.read().unwrap();
    if own != Level::NOTSET {
        return own;
    }
    match &state.parent {
        Some(parent_name) => {
            let parent = registry::get_existing(parent_name)
                .expect("well-formed hierarchy: every non-root logger's parent is resolvable");
            effective_level(&parent)
        }
        None => unreachable!("only _root has no parent, and _root returns above"),
    }
}

/// Entry point called by [`crate::logger::Logger::log_at`]: either walks
/// the hierarchy synchronously or hands the event to the async writer,
/// per whether async dispatch is enabled in the root configuration.
pub fn dispatch(event: Event, source: Arc<LoggerState>) {
    if crate::config::async_enabled() {
        crate::async_writer::enqueue(event, source);
    } else {
        walk(event, source);
    }
}

/// The propagation walk (spec.md §4.D). Walks from `source` toward
/// `_root`, running each matching logger's pipelines in insertion order,
/// and stops after the first logger whose `propagate` is `false` (always
/// stopping at `_root`).
///
/// Per-logger state (level, propagate, pipelines) is read fresh at each
/// step — this is the "uses the logger's current state at dispatch time,
/// not at enqueue time" design decision spec.md §4.E documents for the
/// async path, and it applies equally to a purely synchronous call.
pub fn walk(event: Event, source: Arc<LoggerState>) {
    let mut current = Some(source);
    while let Some(state) = current {
        let eff = effective_level(&state);
        if crate::level::is_enabled(event.level_no, eff) {
            let pipelines = state.pipelines.read().unwrap().clone();
            let owner_level = *state.level.read().unwrap();
            let owner_propagate = *state.propagate.read().unwrap();
            for p in &pipelines {
                pipeline::run_pipeline(p, &event, &state.name, owner_level, owner_propagate);
            }
        }

        let should_stop = &*state.name == ROOT_NAME || !*state.propagate.read().unwrap();
        if should_stop {
            break;
        }
        current = state.parent.as_ref().and_then(|n| registry::get_existing(n));
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::logger::logger;
    use crate::pipeline::{ConfigMap, Output, OutputSpec, Pipeline, Presenter, PresenterSpec};
    use crate::registry::reset_cache;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    struct CountingOutput(Arc<AtomicUsize>, Arc<Mutex<Vec<String>>>);
    impl Output for CountingOutput {
        fn call(&self, record: &Event, _config: &ConfigMap) -> Result<(), String> {
            self.0.fetch_add(1, Ordering::SeqCst);
            self.1.lock().unwrap().push(record.owner_logger_name.as_deref().unwrap_or("?").to_string());
            Ok(())
        }
    }

    struct PlainPresenter;
    impl Presenter for PlainPresenter {
        fn call(&self, record: &Event, _config: &ConfigMap) -> Result<String, String> {
            Ok(record.message.clone())
        }
    }

    fn pipeline_with(counter: Arc<AtomicUsize>, owners: Arc<Mutex<Vec<String>>>, level: Option<Level>) -> Pipeline {
        Pipeline::new(
            vec![OutputSpec::new(Arc::new(CountingOutput(counter, owners)), ConfigMap::new(), ConfigMap::new())],
            PresenterSpec::new(Arc::new(PlainPresenter), ConfigMap::new(), ConfigMap::new()),
            vec![],
            level,
        )
    }

    #[test]
    fn effective_level_inherits_through_notset() {
        reset_cache();
        crate::config::reset_config();
        let l = logger("inherit.test", None).unwrap();
        assert_eq!(l.effective_level(), crate::config::root_level());
        l.set_level(Level::DEBUG);
        assert_eq!(l.effective_level(), Level::DEBUG);
    }

    #[test]
    fn walk_runs_own_pipelines_before_parent_and_stops_at_root() {
        reset_cache();
        crate::config::reset_config();
        let counter = Arc::new(AtomicUsize::new(0));
        let owners = Arc::new(Mutex::new(Vec::new()));

        let root = logger(crate::registry::ROOT_NAME, None).unwrap();
        root.set_level(Level::WARNING);
        root.set_pipelines(vec![pipeline_with(counter.clone(), owners.clone(), None)]);

        let child = logger("walk.test", None).unwrap();
        child.set_level(Level::DEBUG);
        child.add_pipeline(pipeline_with(counter.clone(), owners.clone(), None));

        child.warn("hi");

        assert_eq!(counter.load(Ordering::SeqCst), 2);
        assert_eq!(&*owners.lock().unwrap(), &["walk.test", "_root"]);
    }

    #[test]
    fn propagate_false_stops_walk_after_emitting() {
        reset_cache();
        crate::config::reset_config();
        let counter = Arc::new(AtomicUsize::new(0));
        let owners = Arc::new(Mutex::new(Vec::new()));

        let root = logger(crate::registry::ROOT_NAME, None).unwrap();
        root.set_pipelines(vec![pipeline_with(counter.clone(), owners.clone(), None)]);

        let svc = logger("svc.noprop", None).unwrap();
        svc.set_level(Level::DEBUG);
        svc.set_propagate(false);
        svc.add_pipeline(pipeline_with(counter.clone(), owners.clone(), None));

        svc.debug("hi");

        assert_eq!(counter.load(Ordering::SeqCst), 1);
        assert_eq!(&*owners.lock().unwrap(), &["svc.noprop"]);
    }

    #[test]
    fn below_threshold_never_reaches_pipelines() {
        reset_cache();
        crate::config::reset_config();
        let counter = Arc::new(AtomicUsize::new(0));
        let owners = Arc::new(Mutex::new(Vec::new()));
        let root = logger(crate::registry::ROOT_NAME, None).unwrap();
        root.set_level(Level::WARNING);
        root.set_pipelines(vec![pipeline_with(counter.clone(), owners.clone(), None)]);

        let l = logger("below.threshold", None).unwrap();
        l.info("quiet");

        assert_eq!(counter.load(Ordering::SeqCst), 0);
    }
}
