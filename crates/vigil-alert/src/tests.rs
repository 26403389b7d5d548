use crate::checker::{CheckerContext, TriggerChecker};
use crate::error::CheckError;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use vigil_common::types::{CheckData, MetricState, MetricValue, NotificationEvent, State, TimeSeries, Trigger};
use vigil_storage::error::{Result as StorageResult, StorageError};
use vigil_storage::memory::MemoryStore;
use vigil_storage::TriggerStore;
use vigil_target::{Result as TargetResultOf, TargetError, TargetResolver, TargetResult};

enum FakeTarget {
    Resolved(TargetResult),
    UnknownFunction(&'static str),
}

/// Resolver returning canned results per target and recording its calls.
#[derive(Default)]
struct FakeResolver {
    targets: HashMap<String, FakeTarget>,
    calls: Mutex<Vec<(String, i64, i64, bool)>>,
}

impl FakeResolver {
    fn with(mut self, target: &str, series: Vec<TimeSeries>, metrics: &[&str]) -> Self {
        self.targets.insert(
            target.to_string(),
            FakeTarget::Resolved(TargetResult {
                series,
                metrics: metrics.iter().map(|m| m.to_string()).collect(),
            }),
        );
        self
    }

    fn series(self, target: &str, series: TimeSeries) -> Self {
        let name = series.name.clone();
        self.with(target, vec![series], &[name.as_str()])
    }

    fn failing(mut self, target: &str, function: &'static str) -> Self {
        self.targets
            .insert(target.to_string(), FakeTarget::UnknownFunction(function));
        self
    }
}

impl TargetResolver for FakeResolver {
    fn evaluate_target(&self, target: &str, from: i64, until: i64, allow_realtime: bool) -> TargetResultOf<TargetResult> {
        self.calls
            .lock()
            .unwrap()
            .push((target.to_string(), from, until, allow_realtime));
        match self.targets.get(target) {
            Some(FakeTarget::Resolved(result)) => Ok(result.clone()),
            Some(FakeTarget::UnknownFunction(name)) => Err(TargetError::UnknownFunction(name.to_string())),
            None => Ok(TargetResult::default()),
        }
    }
}

/// Memory store whose writes can be switched to fail.
#[derive(Default)]
struct FlakyStore {
    inner: MemoryStore,
    fail_save_check: AtomicBool,
    fail_remove_patterns: AtomicBool,
    fail_remove_values: AtomicBool,
}

fn unavailable() -> StorageError {
    StorageError::Unavailable("store is down".to_string())
}

impl TriggerStore for FlakyStore {
    fn get_last_check(&self, trigger_id: &str) -> StorageResult<Option<CheckData>> {
        self.inner.get_last_check(trigger_id)
    }

    fn set_last_check(&self, trigger_id: &str, check: &CheckData) -> StorageResult<()> {
        self.inner.set_last_check(trigger_id, check)
    }

    fn save_check(&self, trigger_id: &str, check: &CheckData, events: &[NotificationEvent]) -> StorageResult<()> {
        if self.fail_save_check.load(Ordering::SeqCst) {
            return Err(unavailable());
        }
        self.inner.save_check(trigger_id, check, events)
    }

    fn save_metric_value(&self, metric: &str, value: MetricValue) -> StorageResult<()> {
        self.inner.save_metric_value(metric, value)
    }

    fn get_metric_values(&self, metric: &str, from: i64, until: i64) -> StorageResult<Vec<MetricValue>> {
        self.inner.get_metric_values(metric, from, until)
    }

    fn remove_metric_values(&self, metric: &str, older_than: i64) -> StorageResult<()> {
        if self.fail_remove_values.load(Ordering::SeqCst) {
            return Err(unavailable());
        }
        self.inner.remove_metric_values(metric, older_than)
    }

    fn add_pattern_metric(&self, pattern: &str, metric: &str) -> StorageResult<()> {
        self.inner.add_pattern_metric(pattern, metric)
    }

    fn get_pattern_metrics(&self, pattern: &str) -> StorageResult<Vec<String>> {
        self.inner.get_pattern_metrics(pattern)
    }

    fn remove_patterns_metrics(&self, patterns: &[String]) -> StorageResult<()> {
        if self.fail_remove_patterns.load(Ordering::SeqCst) {
            return Err(unavailable());
        }
        self.inner.remove_patterns_metrics(patterns)
    }

    fn push_notification_event(&self, event: &NotificationEvent) -> StorageResult<()> {
        self.inner.push_notification_event(event)
    }

    fn fetch_notification_events(&self) -> StorageResult<Vec<NotificationEvent>> {
        self.inner.fetch_notification_events()
    }
}

fn simple_trigger(target: &str, warn: f64, error: f64) -> Trigger {
    Trigger {
        id: "trigger-1".to_string(),
        name: "CPU load".to_string(),
        targets: vec![target.to_string()],
        warn_value: Some(warn),
        error_value: Some(error),
        expression: None,
        patterns: vec![target.to_string()],
        ttl: None,
        ttl_state: State::Nodata,
    }
}

fn expression_trigger(targets: &[&str], expression: &str) -> Trigger {
    Trigger {
        targets: targets.iter().map(|t| t.to_string()).collect(),
        warn_value: None,
        error_value: None,
        expression: Some(expression.to_string()),
        ..simple_trigger(targets[0], 0.0, 0.0)
    }
}

fn series(name: &str, start: i64, values: &[f64]) -> TimeSeries {
    TimeSeries::new(name, start, 60, values.iter().map(|v| Some(*v)).collect())
}

fn context(store: Arc<FlakyStore>, resolver: FakeResolver) -> CheckerContext {
    CheckerContext::new(store, Arc::new(resolver))
}

fn run(trigger: &Trigger, ctx: &CheckerContext, now: i64) -> Result<(), CheckError> {
    TriggerChecker::new(trigger.clone(), ctx.clone(), now)?.check()
}

fn last_check(store: &FlakyStore, trigger: &Trigger) -> CheckData {
    store
        .get_last_check(&trigger.id)
        .unwrap()
        .expect("check should be persisted")
}

fn metric_events(store: &FlakyStore) -> Vec<NotificationEvent> {
    store
        .fetch_notification_events()
        .unwrap()
        .into_iter()
        .filter(|e| !e.is_trigger_event)
        .collect()
}

#[test]
fn steps_simple_trigger_and_skips_gaps() {
    let store = Arc::new(FlakyStore::default());
    let resolver = FakeResolver::default().series("cpu", series("cpu", 0, &[1.0, 6.0, f64::NAN]));
    let ctx = context(store.clone(), resolver);
    let trigger = simple_trigger("cpu", 3.0, 5.0);

    run(&trigger, &ctx, 120).unwrap();

    let check = last_check(&store, &trigger);
    assert_eq!(check.state, State::Ok);
    assert_eq!(check.timestamp, 120);
    assert_eq!(check.metrics.len(), 1);
    let cpu = &check.metrics["cpu"];
    assert_eq!(cpu.state, State::Crit);
    assert_eq!(cpu.timestamp, 60);
    assert_eq!(cpu.value, Some(6.0));
    assert_eq!(cpu.event_timestamp, 60);
    assert_eq!(check.score, 100);

    let events = metric_events(&store);
    let transitions: Vec<_> = events
        .iter()
        .map(|e| (e.old_state, e.state, e.timestamp))
        .collect();
    assert_eq!(
        transitions,
        vec![(State::Nodata, State::Ok, 0), (State::Ok, State::Crit, 60)]
    );
    assert!(events.iter().all(|e| e.trigger_id == trigger.id && e.metric == "cpu"));
}

#[test]
fn new_trigger_window_and_realtime_flag() {
    let store = Arc::new(FlakyStore::default());
    let resolver = Arc::new(FakeResolver::default());
    let ctx = CheckerContext::new(store.clone(), resolver.clone());

    let checker = TriggerChecker::new(simple_trigger("cpu", 3.0, 5.0), ctx.clone(), 10_000).unwrap();
    assert_eq!(checker.window(), (10_000 - 3600 - 600, 10_000));
    checker.check().unwrap();

    let mut with_ttl = expression_trigger(&["cpu", "mem"], "t1 > t2 ? ERROR : OK");
    with_ttl.ttl = Some(300);
    store
        .set_last_check(&with_ttl.id, &CheckData::initial(9_000))
        .unwrap();
    let checker = TriggerChecker::new(with_ttl, ctx, 10_000).unwrap();
    assert_eq!(checker.window(), (8_700, 10_000));
    checker.check().unwrap();

    let calls = resolver.calls.lock().unwrap();
    assert_eq!(calls[0], ("cpu".to_string(), 5_800, 10_000, true));
    assert_eq!(calls[1], ("cpu".to_string(), 8_700, 10_000, false));
    assert_eq!(calls[2], ("mem".to_string(), 8_700, 10_000, false));
}

#[test]
fn rechecking_same_window_is_idempotent() {
    let store = Arc::new(FlakyStore::default());
    let resolver = FakeResolver::default().series("cpu", series("cpu", 0, &[1.0, 6.0, 7.0]));
    let ctx = context(store.clone(), resolver);
    let trigger = simple_trigger("cpu", 3.0, 5.0);

    run(&trigger, &ctx, 120).unwrap();
    let first = last_check(&store, &trigger);
    store.fetch_notification_events().unwrap();

    run(&trigger, &ctx, 120).unwrap();
    let second = last_check(&store, &trigger);

    assert_eq!(first, second);
    assert!(store.fetch_notification_events().unwrap().is_empty());
}

#[test]
fn events_only_on_state_change() {
    let store = Arc::new(FlakyStore::default());
    let resolver = FakeResolver::default().series("cpu", series("cpu", 0, &[1.0, 2.0, 6.0, 7.0]));
    let ctx = context(store.clone(), resolver);
    let trigger = simple_trigger("cpu", 3.0, 5.0);

    run(&trigger, &ctx, 180).unwrap();

    let events = store.fetch_notification_events().unwrap();
    let metric: Vec<_> = events.iter().filter(|e| !e.is_trigger_event).collect();
    assert_eq!(metric.len(), 2);
    assert_eq!(metric[1].state, State::Crit);
    assert_eq!(metric[1].timestamp, 120);

    let trigger_events: Vec<_> = events.iter().filter(|e| e.is_trigger_event).collect();
    assert_eq!(trigger_events.len(), 1);
    assert_eq!(trigger_events[0].old_state, State::Nodata);
    assert_eq!(trigger_events[0].state, State::Ok);
    assert_eq!(trigger_events[0].metric, trigger.name);
    assert_eq!(last_check(&store, &trigger).metrics["cpu"].event_timestamp, 120);
}

#[test]
fn previous_state_comes_from_last_emitted_state() {
    let store = Arc::new(FlakyStore::default());
    let resolver = FakeResolver::default().series(
        "cpu",
        TimeSeries::new("cpu", 0, 60, vec![Some(10.0), None, Some(1.0)]),
    );
    let ctx = context(store.clone(), resolver);
    let trigger = expression_trigger(&["cpu"], "t1 > 5 ? ERROR : (PREV_STATE == ERROR ? WARN : OK)");

    run(&trigger, &ctx, 120).unwrap();

    let cpu = &last_check(&store, &trigger).metrics["cpu"];
    assert_eq!(cpu.state, State::Warn);
    assert_eq!(cpu.timestamp, 120);
    let states: Vec<_> = metric_events(&store).iter().map(|e| e.state).collect();
    assert_eq!(states, vec![State::Crit, State::Warn]);
}

#[test]
fn ambiguous_additional_target_aborts_without_persisting() {
    let store = Arc::new(FlakyStore::default());
    let resolver = FakeResolver::default()
        .series("cpu", series("cpu", 0, &[1.0, 2.0]))
        .with("mem.*", vec![series("mem.a", 0, &[1.0]), series("mem.b", 0, &[1.0])], &["mem.a", "mem.b"]);
    let ctx = context(store.clone(), resolver);
    let trigger = expression_trigger(&["cpu", "mem.*"], "t1 > t2 ? ERROR : OK");

    let err = run(&trigger, &ctx, 120).unwrap_err();
    assert!(matches!(err, CheckError::InvalidTarget(_)));
    assert_eq!(err.to_string(), "Target #2 has more than one timeseries");
    assert!(store.get_last_check(&trigger.id).unwrap().is_none());
    assert!(store.fetch_notification_events().unwrap().is_empty());
}

#[test]
fn additional_target_with_metrics_but_no_series_aborts() {
    let store = Arc::new(FlakyStore::default());
    let resolver = FakeResolver::default()
        .series("cpu", series("cpu", 0, &[1.0]))
        .with("mem", Vec::new(), &["mem"]);
    let ctx = context(store.clone(), resolver);
    let trigger = expression_trigger(&["cpu", "mem"], "t1 > t2 ? ERROR : OK");

    let err = run(&trigger, &ctx, 60).unwrap_err();
    assert_eq!(err.to_string(), "Target #2 has no timeseries");
    assert!(store.get_last_check(&trigger.id).unwrap().is_none());
}

#[test]
fn unmatched_additional_target_skips_every_timestamp() {
    let store = Arc::new(FlakyStore::default());
    let resolver = FakeResolver::default().series("cpu", series("cpu", 0, &[1.0, 2.0, 3.0]));
    let ctx = context(store.clone(), resolver);
    let trigger = expression_trigger(&["cpu", "mem"], "t1 > t2 ? ERROR : OK");

    run(&trigger, &ctx, 120).unwrap();

    let check = last_check(&store, &trigger);
    assert_eq!(check.state, State::Ok);
    assert!(check.metrics.is_empty());
    assert!(metric_events(&store).is_empty());
}

#[test]
fn only_wildcards_become_nodata() {
    let store = Arc::new(FlakyStore::default());
    let wildcards = (0..3)
        .map(|i| TimeSeries::wildcard(format!("servers.{i}.*"), 0, 180, 60))
        .collect();
    let resolver = FakeResolver::default().with("servers.*", wildcards, &[]);
    let ctx = context(store.clone(), resolver);
    let trigger = simple_trigger("servers.*", 3.0, 5.0);

    run(&trigger, &ctx, 180).unwrap();

    let check = last_check(&store, &trigger);
    assert_eq!(check.state, State::Nodata);
    assert!(check.metrics.is_empty());
    assert_eq!(check.score, 1000);
}

#[test]
fn no_metrics_without_ttl_keeps_seeded_check() {
    let store = Arc::new(FlakyStore::default());
    let ctx = context(store.clone(), FakeResolver::default());
    let trigger = simple_trigger("cpu", 3.0, 5.0);

    run(&trigger, &ctx, 600).unwrap();

    let check = last_check(&store, &trigger);
    assert_eq!(check.state, State::Ok);
    assert_eq!(check.timestamp, 600);
    assert_eq!(check.message, None);
    assert!(store.fetch_notification_events().unwrap().is_empty());
}

#[test]
fn no_metrics_with_ttl_uses_ttl_state() {
    let store = Arc::new(FlakyStore::default());
    let ctx = context(store.clone(), FakeResolver::default());
    let mut trigger = simple_trigger("cpu", 3.0, 5.0);
    trigger.ttl = Some(600);
    trigger.ttl_state = State::Crit;

    run(&trigger, &ctx, 600).unwrap();

    let check = last_check(&store, &trigger);
    assert_eq!(check.state, State::Crit);
    assert_eq!(check.message.as_deref(), Some("Trigger has no metrics"));
}

fn stale_metric_setup(ttl_state: State, maintenance: i64) -> (Arc<FlakyStore>, CheckerContext, Trigger) {
    let store = Arc::new(FlakyStore::default());
    let mut trigger = simple_trigger("cpu.*", 3.0, 5.0);
    trigger.ttl = Some(600);
    trigger.ttl_state = ttl_state;

    let mut previous = CheckData::initial(1_000);
    previous.state = State::Ok;
    previous.metrics.insert(
        "cpu.a".to_string(),
        MetricState {
            value: Some(4.0),
            event_timestamp: 900,
            maintenance,
            ..MetricState::new(State::Warn, 1_000)
        },
    );
    store.set_last_check(&trigger.id, &previous).unwrap();
    store.add_pattern_metric("cpu.*", "cpu.a").unwrap();

    let empty = TimeSeries::new("cpu.a", 420, 60, vec![None; 22]);
    let resolver = FakeResolver::default().series("cpu.*", empty);
    (store.clone(), context(store, resolver), trigger)
}

#[test]
fn stale_metric_is_deleted_with_del_ttl_state() {
    let (store, ctx, trigger) = stale_metric_setup(State::Del, 0);

    run(&trigger, &ctx, 1_700).unwrap();

    let check = last_check(&store, &trigger);
    assert!(!check.metrics.contains_key("cpu.a"));
    assert!(store.get_pattern_metrics("cpu.*").unwrap().is_empty());
    assert!(metric_events(&store).is_empty());
}

#[test]
fn failed_pattern_cleanup_on_delete_aborts_check() {
    let (store, ctx, trigger) = stale_metric_setup(State::Del, 0);
    store.fail_remove_patterns.store(true, Ordering::SeqCst);

    let err = run(&trigger, &ctx, 1_700).unwrap_err();
    assert!(matches!(err, CheckError::Storage(_)));
    assert_eq!(last_check(&store, &trigger).timestamp, 1_000);
}

#[test]
fn stale_metric_is_substituted_with_ttl_state() {
    let (store, ctx, trigger) = stale_metric_setup(State::Nodata, 0);

    run(&trigger, &ctx, 1_700).unwrap();

    let stale = &last_check(&store, &trigger).metrics["cpu.a"];
    assert_eq!(stale.state, State::Nodata);
    assert_eq!(stale.timestamp, 1_100);
    assert_eq!(stale.value, None);
    assert_eq!(stale.event_timestamp, 1_100);

    let events = metric_events(&store);
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].old_state, State::Warn);
    assert_eq!(events[0].state, State::Nodata);
}

#[test]
fn substituted_change_in_maintenance_is_suppressed() {
    let (store, ctx, trigger) = stale_metric_setup(State::Nodata, 5_000);

    run(&trigger, &ctx, 1_700).unwrap();

    let stale = &last_check(&store, &trigger).metrics["cpu.a"];
    assert_eq!(stale.state, State::Nodata);
    assert_eq!(stale.maintenance, 5_000);
    assert!(stale.suppressed);
    assert!(metric_events(&store).is_empty());
}

#[test]
fn unknown_function_is_exception_with_error_text() {
    let store = Arc::new(FlakyStore::default());
    let resolver = FakeResolver::default().failing("sumSeries(cpu.*)", "sumSeries");
    let ctx = context(store.clone(), resolver);
    let trigger = simple_trigger("sumSeries(cpu.*)", 3.0, 5.0);

    run(&trigger, &ctx, 600).unwrap();

    let check = last_check(&store, &trigger);
    assert_eq!(check.state, State::Exception);
    assert_eq!(check.message.as_deref(), Some("Unknown graphite function: \"sumSeries\""));
    assert_eq!(ctx.metrics.check_errors(), 0);
    assert_eq!(ctx.metrics.checks(), 1);
}

#[test]
fn unknown_function_in_expression_is_exception() {
    let store = Arc::new(FlakyStore::default());
    let resolver = FakeResolver::default().series("cpu", series("cpu", 0, &[1.0]));
    let ctx = context(store.clone(), resolver);
    let trigger = expression_trigger(&["cpu"], "abs(t1) > 1 ? ERROR : OK");

    run(&trigger, &ctx, 60).unwrap();

    let check = last_check(&store, &trigger);
    assert_eq!(check.state, State::Exception);
    assert_eq!(check.message.as_deref(), Some("Unknown function: \"abs\""));
    assert_eq!(ctx.metrics.check_errors(), 0);
}

#[test]
fn evaluation_error_is_generic_exception_and_counted() {
    let store = Arc::new(FlakyStore::default());
    let resolver = FakeResolver::default().series("cpu", series("cpu", 0, &[1.0, 2.0]));
    let ctx = context(store.clone(), resolver);
    let trigger = expression_trigger(&["cpu"], "t3 > 1 ? ERROR : OK");

    run(&trigger, &ctx, 60).unwrap();

    let check = last_check(&store, &trigger);
    assert_eq!(check.state, State::Exception);
    assert_eq!(check.message.as_deref(), Some("Trigger evaluation exception"));
    assert_eq!(check.score, 100_000);
    assert_eq!(ctx.metrics.check_errors(), 1);
}

#[test]
fn persistence_failure_is_returned() {
    let store = Arc::new(FlakyStore::default());
    store.fail_save_check.store(true, Ordering::SeqCst);
    let resolver = FakeResolver::default().series("cpu", series("cpu", 0, &[1.0]));
    let ctx = context(store.clone(), resolver);
    let trigger = simple_trigger("cpu", 3.0, 5.0);

    let err = run(&trigger, &ctx, 60).unwrap_err();
    assert!(matches!(err, CheckError::Storage(_)));
    assert!(store.get_last_check(&trigger.id).unwrap().is_none());
    assert!(store.fetch_notification_events().unwrap().is_empty());
}

#[test]
fn retry_after_failed_persist_emits_each_event_once() {
    let store = Arc::new(FlakyStore::default());
    let resolver = FakeResolver::default().series("cpu", series("cpu", 0, &[1.0, 6.0]));
    let ctx = context(store.clone(), resolver);
    let trigger = simple_trigger("cpu", 3.0, 5.0);

    store.fail_save_check.store(true, Ordering::SeqCst);
    assert!(run(&trigger, &ctx, 60).is_err());
    store.fail_save_check.store(false, Ordering::SeqCst);
    run(&trigger, &ctx, 60).unwrap();

    let events: Vec<_> = store
        .fetch_notification_events()
        .unwrap()
        .iter()
        .map(|e| (e.is_trigger_event, e.old_state, e.state, e.timestamp))
        .collect();
    assert_eq!(
        events,
        vec![
            (false, State::Nodata, State::Ok, 0),
            (false, State::Ok, State::Crit, 60),
            (true, State::Nodata, State::Ok, 60),
        ]
    );
}

#[test]
fn hard_failure_on_later_metric_discards_earlier_events() {
    let (store, _, trigger) = stale_metric_setup(State::Del, 0);
    let resolver = FakeResolver::default().with(
        "cpu.*",
        vec![
            series("cpu.b", 1_500, &[6.0]),
            TimeSeries::new("cpu.a", 420, 60, vec![None; 22]),
        ],
        &["cpu.a", "cpu.b"],
    );
    let ctx = context(store.clone(), resolver);
    store.fail_remove_patterns.store(true, Ordering::SeqCst);

    let err = run(&trigger, &ctx, 1_700).unwrap_err();
    assert!(matches!(err, CheckError::Storage(_)));
    assert_eq!(last_check(&store, &trigger).timestamp, 1_000);
    assert!(store.fetch_notification_events().unwrap().is_empty());
}

#[test]
fn only_wildcards_keep_known_metrics_and_ok_state() {
    let store = Arc::new(FlakyStore::default());
    let trigger = simple_trigger("servers.*", 3.0, 5.0);
    let mut previous = CheckData::initial(600);
    previous.metrics.insert(
        "servers.web-01".to_string(),
        MetricState {
            value: Some(4.0),
            event_timestamp: 540,
            ..MetricState::new(State::Warn, 540)
        },
    );
    store.set_last_check(&trigger.id, &previous).unwrap();

    let wildcards = vec![TimeSeries::wildcard("servers.*", 0, 1_200, 60)];
    let resolver = FakeResolver::default().with("servers.*", wildcards, &[]);
    let ctx = context(store.clone(), resolver);

    run(&trigger, &ctx, 1_200).unwrap();

    let check = last_check(&store, &trigger);
    assert_eq!(check.state, State::Ok);
    assert_eq!(check.timestamp, 1_200);
    assert_eq!(check.metrics, previous.metrics);
    assert_eq!(check.event_timestamp, 1_200);
    assert_eq!(check.score, 1);

    let events = store.fetch_notification_events().unwrap();
    assert_eq!(events.len(), 1);
    assert!(events[0].is_trigger_event);
    assert_eq!((events[0].old_state, events[0].state), (State::Nodata, State::Ok));
}

#[test]
fn old_raw_values_are_pruned_and_failures_ignored() {
    let store = Arc::new(FlakyStore::default());
    let now = 100_000;
    for timestamp in [now - 20_000, now - 100] {
        store
            .save_metric_value("cpu", MetricValue { timestamp, value: 1.0 })
            .unwrap();
    }
    let resolver = FakeResolver::default().series("cpu", series("cpu", now - 60, &[1.0]));
    let ctx = context(store.clone(), resolver);
    let trigger = simple_trigger("cpu", 3.0, 5.0);

    run(&trigger, &ctx, now).unwrap();
    let kept = store.get_metric_values("cpu", 0, now).unwrap();
    assert_eq!(kept.len(), 1);
    assert_eq!(kept[0].timestamp, now - 100);

    store.fail_remove_values.store(true, Ordering::SeqCst);
    run(&trigger, &ctx, now + 60).unwrap();
    assert_eq!(last_check(&store, &trigger).timestamp, now + 60);
}
