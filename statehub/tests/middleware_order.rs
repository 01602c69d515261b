//! Middleware wrapping order on a running store

use std::sync::{Arc, Mutex};
use std::time::Duration;

use statehub::prelude::*;
use statehub::testing::wait_for_idle;
use statehub::{ActionLogConfig, ActionOutcome};

const TIMEOUT: Duration = Duration::from_secs(2);

#[derive(Action, Clone, Debug)]
#[action(summary)]
enum Step {
    Push(u8),
    Fail,
    Tick,
}

type Trace = Arc<Mutex<Vec<String>>>;

fn step_reducer(trace: &Trace) -> Reducer<Vec<u8>, Step> {
    let trace = Arc::clone(trace);
    reducer::fallible(move |action: &Step, state: &Vec<u8>| {
        trace.lock().unwrap().push("reducer".to_string());
        match action {
            Step::Push(n) => {
                let mut next = state.clone();
                next.push(*n);
                Ok(next)
            }
            Step::Fail => Err(ReducerError::rejected("fail")),
            Step::Tick => Ok(state.clone()),
        }
    })
}

fn tracing_hook(label: &'static str, trace: &Trace) -> HookMiddleware<Vec<u8>, Step> {
    let before = Arc::clone(trace);
    let after = Arc::clone(trace);
    HookMiddleware::new()
        .before(move |_: &Step, _: &Vec<u8>| {
            before.lock().unwrap().push(format!("{label}:before"));
        })
        .after(move |_: &Step, _: &ReduceResult<Vec<u8>>| {
            after.lock().unwrap().push(format!("{label}:after"));
        })
}

async fn run_once(store: &Store<Vec<u8>, Step>, trace: &Trace) -> Vec<String> {
    trace.lock().unwrap().clear();
    store.dispatch(Step::Push(1));
    wait_for_idle(store, TIMEOUT).await;
    trace.lock().unwrap().clone()
}

#[tokio::test]
async fn first_middleware_is_outermost() {
    let trace = Trace::default();
    let store = Store::builder(Vec::new())
        .reducer(step_reducer(&trace))
        .middleware(tracing_hook("m1", &trace))
        .middleware(tracing_hook("m2", &trace))
        .build()
        .unwrap();

    assert_eq!(
        run_once(&store, &trace).await,
        vec!["m1:before", "m2:before", "reducer", "m2:after", "m1:after"]
    );
}

#[tokio::test]
async fn nested_composition_matches_flat_composition() {
    let flat_trace = Trace::default();
    let flat = Store::builder(Vec::new())
        .reducer(step_reducer(&flat_trace))
        .middleware(tracing_hook("a", &flat_trace))
        .middleware(tracing_hook("b", &flat_trace))
        .middleware(tracing_hook("c", &flat_trace))
        .build()
        .unwrap();

    let nested_trace = Trace::default();
    let inner = ComposedMiddleware::new()
        .with(tracing_hook("b", &nested_trace))
        .with(tracing_hook("c", &nested_trace));
    let nested = Store::builder(Vec::new())
        .reducer(step_reducer(&nested_trace))
        .middleware(tracing_hook("a", &nested_trace))
        .middleware(inner)
        .build()
        .unwrap();

    assert_eq!(
        run_once(&flat, &flat_trace).await,
        run_once(&nested, &nested_trace).await
    );
}

#[tokio::test]
async fn empty_middleware_list_is_identity() {
    let trace = Trace::default();
    let store = Store::with_middleware(
        Vec::new(),
        step_reducer(&trace),
        ComposedMiddleware::new(),
    )
    .unwrap();

    assert_eq!(run_once(&store, &trace).await, vec!["reducer"]);
    assert_eq!(*store.current_state(), vec![1]);
}

#[tokio::test]
async fn action_logger_records_outcomes() {
    let trace = Trace::default();
    let logger = ActionLoggerMiddleware::with_log(ActionLogConfig::default());
    let log = logger.log_handle().unwrap();

    let store = Store::builder(Vec::new())
        .reducer(step_reducer(&trace))
        .middleware(logger)
        .build()
        .unwrap();

    store.dispatch_all([Step::Push(7), Step::Tick, Step::Fail]);
    wait_for_idle(&store, TIMEOUT).await;

    let log = log.lock().unwrap();
    let entries: Vec<_> = log
        .entries()
        .map(|e| (e.name, e.summary.clone(), e.outcome))
        .collect();

    // Tick is excluded by the default filter
    assert_eq!(
        entries,
        vec![
            ("Push", "Push(7)".to_string(), Some(ActionOutcome::Reduced)),
            ("Fail", "Fail".to_string(), Some(ActionOutcome::Failed)),
        ]
    );
}
