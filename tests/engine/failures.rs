//! Rule-local failures, strict mode, and run-fatal errors

use std::time::{Duration, Instant};

use kindle_engine::{Engine, EngineConfig, FiringStatus, Rule};
use kindle_expr::FunctionRegistry;
use kindle_foundation::{ErrorKind, Result, Value};

use crate::support::{engine, rule};

#[test]
fn guard_error_is_isolated_to_its_rule() {
    let engine = engine(
        4,
        &[("a", Value::Int(1))],
        vec![
            rule("x", &["a"], "a > missing", "a"),
            rule("after_x", &["x"], "", "x + 1"),
            rule("y", &["a"], "", "a + 1"),
        ],
    );
    let outcome = engine.run_detailed().unwrap();
    assert_eq!(outcome.fact("x"), None);
    assert_eq!(outcome.fact("after_x"), None);
    assert_eq!(outcome.fact("y"), Some(&Value::Int(2)));
    assert_eq!(outcome.stats.failed, 1);

    let failure = outcome.failures().next().unwrap();
    assert_eq!(failure.output, "x");
    match &failure.status {
        FiringStatus::Failed(message) => assert!(message.contains("missing"), "{message}"),
        other => panic!("expected failure, got {other:?}"),
    }
}

#[test]
fn evaluation_error_is_isolated_to_its_rule() {
    let engine = engine(
        4,
        &[("a", Value::Int(1)), ("zero", Value::Int(0))],
        vec![
            rule("ratio", &["a", "zero"], "", "a / zero"),
            rule("scaled", &["ratio"], "", "ratio * 2"),
            rule("text", &["a"], "", "a + 'x'"),
            rule("ok", &["a"], "", "a * 10"),
        ],
    );
    let outcome = engine.run_detailed().unwrap();
    assert_eq!(outcome.fact("ratio"), None);
    assert_eq!(outcome.fact("scaled"), None);
    assert_eq!(outcome.fact("text"), None);
    assert_eq!(outcome.fact("ok"), Some(&Value::Int(10)));
    assert_eq!(outcome.stats.failed, 2);
    assert_eq!(outcome.stats.completed, 1);
    assert_eq!(outcome.stats.dispatched, 3);
}

#[test]
fn unknown_function_fails_only_that_rule() {
    let engine = engine(
        2,
        &[("a", Value::Int(4))],
        vec![
            Rule::builder("x")
                .with_inputs(["a"])
                .with_call("no_such_function", ["a"])
                .build()
                .unwrap(),
            rule("y", &["a"], "", "max(a, 9)"),
        ],
    );
    let outcome = engine.run_detailed().unwrap();
    assert_eq!(outcome.fact("x"), None);
    assert_eq!(outcome.fact("y"), Some(&Value::Int(9)));
    assert_eq!(outcome.failures().count(), 1);
}

#[test]
fn malformed_rule_is_rejected_and_others_run() {
    let engine = engine(
        4,
        &[("a", Value::Int(1))],
        vec![rule("bad", &["a"], "", "a +"), rule("good", &["a"], "", "a + 1")],
    );
    let outcome = engine.run_detailed().unwrap();
    assert_eq!(outcome.fact("bad"), None);
    assert_eq!(outcome.fact("good"), Some(&Value::Int(2)));
    assert_eq!(outcome.stats.rejected, 1);
    assert!(matches!(
        outcome.failures().next().map(|f| &f.status),
        Some(FiringStatus::Rejected(_))
    ));
}

#[test]
fn strict_mode_fails_the_whole_run() {
    let mut engine = Engine::new(EngineConfig::new().with_strict(true));
    engine.set_facts([("a", Value::Int(1))]);
    engine.set_rules([rule("bad", &["a"], "a >", "a"), rule("good", &["a"], "", "a")]);
    let err = engine.run().unwrap_err();
    assert!(err.is_parse_error());
    assert!(err.context.and_then(|c| c.rule).is_some());
}

#[test]
fn timeout_returns_promptly_as_fatal_error() {
    let mut functions = FunctionRegistry::with_builtins();
    functions.register("slow", |args: &[Value]| -> Result<Value> {
        std::thread::sleep(Duration::from_millis(150));
        Ok(args.first().cloned().unwrap_or(Value::Nil))
    });
    let rules: Vec<Rule> = (1..=20)
        .map(|i| {
            Rule::builder(format!("f{i}"))
                .with_inputs([format!("f{}", i - 1)])
                .with_call("slow", [format!("f{}", i - 1)])
                .build()
                .unwrap()
        })
        .collect();
    let mut engine = Engine::new(
        EngineConfig::new()
            .with_workers(2)
            .with_timeout(Duration::from_millis(100)),
    );
    engine.set_functions(functions);
    engine.set_facts([("f0", Value::Int(0))]);
    engine.set_rules(rules);

    let started = Instant::now();
    let err = engine.run_detailed().unwrap_err();
    assert!(matches!(err.kind, ErrorKind::Timeout(_)));
    assert!(err.is_fatal());
    assert!(started.elapsed() < Duration::from_secs(2));
}

#[test]
fn timeout_covers_seeding_into_a_full_queue() {
    let mut functions = FunctionRegistry::with_builtins();
    functions.register("slow", |args: &[Value]| -> Result<Value> {
        std::thread::sleep(Duration::from_millis(300));
        Ok(args.first().cloned().unwrap_or(Value::Nil))
    });
    let facts: Vec<(String, Value)> = (0..10).map(|i| (format!("in{i}"), Value::Int(i))).collect();
    let rules: Vec<Rule> = (0..10)
        .map(|i| {
            Rule::builder(format!("out{i}"))
                .with_inputs([format!("in{i}")])
                .with_call("slow", [format!("in{i}")])
                .build()
                .unwrap()
        })
        .collect();
    let mut engine = Engine::new(
        EngineConfig::new()
            .with_workers(1)
            .with_queue_multiplier(1)
            .with_timeout(Duration::from_millis(50)),
    );
    engine.set_functions(functions);
    engine.set_facts(facts);
    engine.set_rules(rules);

    let started = Instant::now();
    let err = engine.run_detailed().unwrap_err();
    assert!(matches!(err.kind, ErrorKind::Timeout(_)), "{err}");
    // One in-flight call may finish; queued work must not.
    assert!(started.elapsed() < Duration::from_millis(1500), "{:?}", started.elapsed());
}

#[test]
fn engine_is_reusable_after_failure() {
    let mut engine = Engine::new(EngineConfig::new().with_strict(true));
    engine.set_facts([("a", Value::Int(1))]);
    engine.set_rules([rule("bad", &["a"], "", "(a")]);
    assert!(engine.run().is_err());

    engine.set_rules([rule("result_end", &["a"], "", "a + 1")]);
    assert_eq!(engine.run().unwrap(), Some(Value::Int(2)));
}
