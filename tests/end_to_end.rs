//! End-to-end scenarios exercising the public API as an application would.
use std::sync::{Arc, Mutex};
use std::time::Duration;

use grove::{
    config, logger, reset_cache, reset_config, AsyncConfig, ConfigMap, ConfigUpdates, ConfigValue, Level, Output, OutputSpec, Pipeline,
    Presenter, PresenterSpec,
};

struct Capture(Arc<Mutex<Vec<String>>>);

impl Output for Capture {
    fn call(&self, record: &grove::Event, _config: &ConfigMap) -> Result<(), String> {
        self.0.lock().unwrap().push(record.message.clone());
        Ok(())
    }
}

struct Plain;

impl Presenter for Plain {
    fn call(&self, record: &grove::Event, _config: &ConfigMap) -> Result<String, String> {
        Ok(record.message.clone())
    }
}

fn capturing_pipeline(sink: Arc<Mutex<Vec<String>>>, level: Option<Level>) -> Pipeline {
    Pipeline::new(
        vec![OutputSpec::new(Arc::new(Capture(sink)), ConfigMap::new(), ConfigMap::new())],
        PresenterSpec::new(Arc::new(Plain), ConfigMap::new(), ConfigMap::new()),
        vec![],
        level,
    )
}

#[test]
fn basic_emit_reaches_the_configured_output() {
    reset_cache();
    reset_config();
    let sink = Arc::new(Mutex::new(Vec::new()));
    let log = logger("scenario.basic", None).unwrap();
    log.set_level(Level::INFO);
    log.set_propagate(false);
    log.set_pipelines(vec![capturing_pipeline(sink.clone(), None)]);

    log.info("service started");

    assert_eq!(&*sink.lock().unwrap(), &["service started".to_string()]);
}

#[test]
fn hierarchical_level_inheritance_through_notset() {
    reset_cache();
    reset_config();
    let root = logger(grove::ROOT_NAME, None).unwrap();
    root.set_level(Level::ERROR);

    let parent = logger("scenario.hierarchy", None).unwrap();
    parent.set_level(Level::DEBUG);

    let child = logger("scenario.hierarchy.child", None).unwrap();
    // child is left at NOTSET: it must inherit from its direct parent, not
    // jump straight to the root.
    assert_eq!(child.effective_level(), Level::DEBUG);
}

#[test]
fn propagate_false_stops_the_walk_at_the_declaring_logger() {
    reset_cache();
    reset_config();
    let root_sink = Arc::new(Mutex::new(Vec::new()));
    let root = logger(grove::ROOT_NAME, None).unwrap();
    root.set_pipelines(vec![capturing_pipeline(root_sink.clone(), None)]);

    let own_sink = Arc::new(Mutex::new(Vec::new()));
    let svc = logger("scenario.noprop", None).unwrap();
    svc.set_level(Level::DEBUG);
    svc.set_propagate(false);
    svc.set_pipelines(vec![capturing_pipeline(own_sink.clone(), None)]);

    svc.warn("isolated event");

    assert_eq!(own_sink.lock().unwrap().len(), 1);
    assert!(root_sink.lock().unwrap().is_empty());
}

#[test]
fn per_pipeline_level_gate_filters_independently_of_the_logger_level() {
    reset_cache();
    reset_config();
    let loud_sink = Arc::new(Mutex::new(Vec::new()));
    let quiet_sink = Arc::new(Mutex::new(Vec::new()));

    let log = logger("scenario.gate", None).unwrap();
    log.set_level(Level::DEBUG);
    log.set_propagate(false);
    log.set_pipelines(vec![
        capturing_pipeline(loud_sink.clone(), None),
        capturing_pipeline(quiet_sink.clone(), Some(Level::ERROR)),
    ]);

    log.info("routine");
    log.error("on fire");

    assert_eq!(&*loud_sink.lock().unwrap(), &["routine".to_string(), "on fire".to_string()]);
    assert_eq!(&*quiet_sink.lock().unwrap(), &["on fire".to_string()]);
}

#[test]
fn a_failing_presenter_does_not_suppress_the_output() {
    reset_cache();
    reset_config();

    struct AlwaysFails;
    impl Presenter for AlwaysFails {
        fn call(&self, _record: &grove::Event, _config: &ConfigMap) -> Result<String, String> {
            Err("presenter exploded".to_string())
        }
    }

    let sink = Arc::new(Mutex::new(Vec::new()));
    let pipeline = Pipeline::new(
        vec![OutputSpec::new(Arc::new(Capture(sink.clone())), ConfigMap::new(), ConfigMap::new())],
        PresenterSpec::new(Arc::new(AlwaysFails), ConfigMap::new(), ConfigMap::new()),
        vec![],
        None,
    );

    let log = logger("scenario.presenter_failure", None).unwrap();
    log.set_level(Level::INFO);
    log.set_propagate(false);
    log.set_pipelines(vec![pipeline]);

    log.info("still gets written somehow");

    let got = sink.lock().unwrap();
    assert_eq!(got.len(), 1);
    assert!(got[0].contains("STEP ERROR"));
}

#[test]
fn async_drop_oldest_keeps_the_newest_events_in_order() {
    reset_cache();
    reset_config();

    let sink = Arc::new(Mutex::new(Vec::new()));
    let root = logger(grove::ROOT_NAME, None).unwrap();
    root.set_pipelines(vec![capturing_pipeline(sink.clone(), None)]);

    config(ConfigUpdates {
        async_config: Some(AsyncConfig {
            enabled: true,
            batch_size: 10,
            flush_interval: Duration::from_secs(5),
            max_queue_size: 3,
            overflow_strategy: grove::OverflowStrategy::DropOldest,
            max_restarts: 5,
            restart_backoff: Duration::from_millis(10),
        }),
        ..Default::default()
    })
    .unwrap();

    let log = logger("scenario.async_overflow", None).unwrap();
    log.set_level(Level::INFO);
    log.set_propagate(true);

    for i in 1..=5 {
        log.info(format!("{}", i));
    }

    let outcome = grove::flush(Duration::from_secs(2));
    assert!(outcome.drained);
    assert_eq!(&*sink.lock().unwrap(), &["3".to_string(), "4".to_string(), "5".to_string()]);
    let stats = grove::stats();
    assert_eq!(stats.dropped_oldest, 2);

    reset_config();
}

#[test]
fn redact_keys_transformer_scrubs_configured_context_keys() {
    use grove::builtin::transformers::RedactKeysTransformer;
    use grove::{ContextValue, TransformerSpec};

    reset_cache();
    reset_config();

    let sink = Arc::new(Mutex::new(Vec::new()));
    let mut redact_config = ConfigMap::new();
    redact_config.insert("keys".to_string(), ConfigValue::Str("token".to_string()));

    let pipeline = Pipeline::new(
        vec![OutputSpec::new(Arc::new(Capture(sink.clone())), ConfigMap::new(), ConfigMap::new())],
        PresenterSpec::new(Arc::new(Plain), ConfigMap::new(), ConfigMap::new()),
        vec![TransformerSpec::new(Arc::new(RedactKeysTransformer), ConfigMap::new(), redact_config)],
        None,
    );

    let log = logger("scenario.redact", None).unwrap();
    log.set_level(Level::INFO);
    log.set_propagate(false);
    log.set_pipelines(vec![pipeline]);

    let mut ctx = grove::Context::new();
    ctx.insert("token".to_string(), ContextValue::Str("super-secret".to_string()));
    ctx.insert("msg".to_string(), ContextValue::Str("request handled".to_string()));
    log.info(ctx);

    // The presenter here just echoes `record.message`, which for a bare
    // context input is the `msg` key's value (grove::LogInput::Context) —
    // the redaction is on the *context*, observable through a presenter
    // that reads it; this smoke-tests that the pipeline still emits
    // exactly one line without the transformer's failure path engaging.
    assert_eq!(sink.lock().unwrap().len(), 1);
}
