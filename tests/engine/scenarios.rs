//! The six reference scenarios

use kindle_engine::{Engine, EngineConfig};
use kindle_foundation::Value;

use crate::support::{CallCounter, engine, rule};

#[test]
fn scenario_sum_of_positive_inputs() {
    let engine = engine(
        4,
        &[("a", Value::Int(2)), ("b", Value::Int(3))],
        vec![rule("sum", &["a", "b"], "a > 0 && b > 0", "a + b")],
    );
    let outcome = engine.run_detailed().unwrap();
    assert_eq!(outcome.fact("sum"), Some(&Value::Int(5)));
}

#[test]
fn scenario_false_guard_never_sets_output() {
    let engine = engine(
        4,
        &[("a", Value::Int(-1))],
        vec![rule("pos", &["a"], "a > 0", "a")],
    );
    let outcome = engine.run_detailed().unwrap();
    assert_eq!(outcome.fact("pos"), None);
    assert_eq!(outcome.terminal, None);
    assert_eq!(outcome.stats.dispatched, 0);
    assert_eq!(engine.run().unwrap(), None);
}

#[test]
fn scenario_chain_cascades() {
    let engine = engine(
        4,
        &[("a", Value::Int(3))],
        vec![rule("b", &["a"], "", "a * 2"), rule("c", &["b"], "", "b + 1")],
    );
    let outcome = engine.run_detailed().unwrap();
    assert_eq!(outcome.fact("b"), Some(&Value::Int(6)));
    assert_eq!(outcome.fact("c"), Some(&Value::Int(7)));
}

#[test]
fn scenario_independent_rules_fire_once_each() {
    for workers in [1, 4, 16] {
        let counter = CallCounter::default();
        let mut engine = engine(
            workers,
            &[("a", Value::Int(1))],
            vec![
                rule("left", &["a"], "", "count('left')"),
                rule("right", &["a"], "", "count('right')"),
            ],
        );
        engine.set_functions(counter.registry());
        let outcome = engine.run_detailed().unwrap();
        assert_eq!(counter.calls("left"), 1, "workers = {workers}");
        assert_eq!(counter.calls("right"), 1, "workers = {workers}");
        assert_eq!(outcome.stats.completed, 2);
    }
}

#[test]
fn scenario_unsupplied_input_never_fires() {
    let engine = engine(
        4,
        &[("a", Value::Int(1))],
        vec![rule("x", &["a", "never"], "", "a"), rule("y", &["a"], "", "a")],
    );
    let outcome = engine.run_detailed().unwrap();
    assert_eq!(outcome.fact("x"), None);
    assert_eq!(outcome.fact("y"), Some(&Value::Int(1)));
}

#[test]
fn scenario_duplicate_definitions_fire_once() {
    let counter = CallCounter::default();
    let mut engine = engine(
        4,
        &[("a", Value::Int(1))],
        vec![
            rule("x", &["a"], "a > 0", "count('x')"),
            rule("x", &["a"], "a > 0", "count('x')"),
        ],
    );
    engine.set_functions(counter.registry());
    assert_eq!(engine.rules().len(), 1);
    let outcome = engine.run_detailed().unwrap();
    assert_eq!(counter.calls("x"), 1);
    assert_eq!(outcome.firings.len(), 1);
}

#[test]
fn terminal_fact_defaults_to_result_end() {
    let mut engine = Engine::new(EngineConfig::default());
    engine.set_facts([("a", Value::Int(2))]);
    engine.set_rules([rule("result_end", &["a"], "", "a * 21")]);
    assert_eq!(engine.run().unwrap(), Some(Value::Int(42)));
}

#[test]
fn supplied_terminal_fact_is_returned_without_rules() {
    let mut engine = Engine::default();
    engine.set_facts([("result_end", Value::from("given"))]);
    assert_eq!(engine.run().unwrap(), Some(Value::from("given")));
}

#[test]
fn reordered_inputs_are_the_same_rule() {
    let counter = CallCounter::default();
    let mut engine = engine(
        4,
        &[("a", Value::Int(1)), ("b", Value::Int(2))],
        vec![
            rule("x", &["a", "b"], "a > 0", "count('x')"),
            rule("x", &["b", "a"], "a > 0", "count('x')"),
        ],
    );
    engine.set_functions(counter.registry());
    assert_eq!(engine.rules().len(), 1);
    engine.run_detailed().unwrap();
    assert_eq!(counter.calls("x"), 1);
}
