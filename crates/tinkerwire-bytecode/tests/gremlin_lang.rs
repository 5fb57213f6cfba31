//! Integration tests for the bytecode model: structural equality, hashing,
//! cloning and binding collection across nested traversals.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use tinkerwire_bytecode::{
    Binding, BytecodeError, GremlinLang, NullArguments, Predicate, Token,
    TokenKind, TraversalStrategy, Value,
};

// =========================================================================
// Helpers
// =========================================================================

fn hash_of<T: Hash>(value: &T) -> u64 {
    let mut hasher = DefaultHasher::new();
    value.hash(&mut hasher);
    hasher.finish()
}

/// An anonymous traversal built from `(operator, arguments)` steps.
fn anon(steps: Vec<(&str, Vec<Value>)>) -> GremlinLang {
    let mut g = GremlinLang::new();
    for (operator, arguments) in steps {
        g.add_step(operator, arguments).expect("valid step");
    }
    g
}

/// `g.V().out().repeat(__.out().in()).times(2).groupCount()
///   .by(__.outE().count()).select(<column>).order().by(Order.desc)`
fn ranked_traversal(column: &str) -> GremlinLang {
    anon(vec![
        ("V", vec![]),
        ("out", vec![]),
        ("repeat", vec![anon(vec![("out", vec![]), ("in", vec![])]).into()]),
        ("times", vec![2.into()]),
        ("groupCount", vec![]),
        ("by", vec![anon(vec![("outE", vec![]), ("count", vec![])]).into()]),
        ("select", vec![Token::new(TokenKind::Column, column).into()]),
        ("order", vec![]),
        ("by", vec![Token::new(TokenKind::Order, "desc").into()]),
    ])
}

// =========================================================================
// Equality and hashing
// =========================================================================

#[test]
fn test_identical_construction_is_equal_with_equal_hash() {
    let first = ranked_traversal("keys");
    let second = ranked_traversal("keys");
    let third = ranked_traversal("values");

    assert_eq!(first, second);
    assert_ne!(first, third);
    assert_ne!(second, third);

    assert_eq!(hash_of(&first), hash_of(&second));
    assert_ne!(hash_of(&first), hash_of(&third));
    assert_ne!(hash_of(&second), hash_of(&third));
}

#[test]
fn test_operator_name_difference_breaks_equality() {
    let a = anon(vec![("V", vec![]), ("out", vec![])]);
    let b = anon(vec![("V", vec![]), ("in", vec![])]);
    assert_ne!(a, b);
}

#[test]
fn test_bindings_take_part_in_equality() {
    let out = |variable: &str, value: &str| {
        anon(vec![
            ("V", vec![]),
            ("out", vec![Binding::new(variable, value).into()]),
        ])
    };
    let bytecode1 = out("a", "created");
    let bytecode2 = out("a", "knows");
    let bytecode3 = out("b", "knows");
    let bytecode4 = out("b", "knows");

    assert_ne!(bytecode1, bytecode2);
    assert_ne!(bytecode1, bytecode3);
    assert_ne!(bytecode2, bytecode3);
    assert_ne!(bytecode2, bytecode4);
    assert_ne!(bytecode1, bytecode4);
    assert_eq!(bytecode3, bytecode4);
    assert_eq!(hash_of(&bytecode3), hash_of(&bytecode4));

    let bindings = bytecode1.collect_bindings();
    assert_eq!(bindings.len(), 1);
    assert_eq!(bindings.get("a"), Some(&Value::from("created")));
}

#[test]
fn test_no_hash_collision_for_swapped_binding_fields() {
    let first = Binding::new("3", "7");
    let second = Binding::new("7", "3");
    assert_ne!(first, second);
    assert_ne!(hash_of(&first), hash_of(&second));
}

#[test]
fn test_no_hash_collision_for_swapped_source_and_step() {
    let mut first = GremlinLang::new();
    first.add_source("3", vec!["7".into()]).unwrap();
    first.add_step("7", vec!["3".into()]).unwrap();

    let mut second = GremlinLang::new();
    second.add_source("7", vec!["3".into()]).unwrap();
    second.add_step("3", vec!["7".into()]).unwrap();

    assert_ne!(first, second);
    assert_ne!(hash_of(&first), hash_of(&second));
}

// =========================================================================
// Cloning
// =========================================================================

#[test]
fn test_clone_is_isolated_from_original() {
    let bytecode = anon(vec![("V", vec![]), ("out", vec![])]);
    let mut bytecode_clone = bytecode.clone();
    assert_eq!(bytecode, bytecode_clone);
    assert_eq!(hash_of(&bytecode), hash_of(&bytecode_clone));

    bytecode_clone.add_step("in", vec!["created".into()]).unwrap();

    assert_ne!(bytecode, bytecode_clone);
    assert_ne!(hash_of(&bytecode), hash_of(&bytecode_clone));
    assert_eq!(bytecode.instructions().count(), 2);
    assert_eq!(bytecode_clone.instructions().count(), 3);
}

#[test]
fn test_clone_copies_nested_traversals() {
    let original = anon(vec![(
        "where",
        vec![anon(vec![("out", vec![])]).into()],
    )]);
    let mut copy = original.clone();

    // Rebuild the nested argument in the copy; the original keeps its own.
    let mut nested = copy.step_instructions()[0].arguments()[0]
        .as_bytecode()
        .expect("nested bytecode")
        .clone();
    nested.add_step("count", vec![]).unwrap();
    copy.add_step("where", vec![nested.into()]).unwrap();

    let original_nested = original.step_instructions()[0].arguments()[0]
        .as_bytecode()
        .expect("nested bytecode");
    assert_eq!(original_nested.step_instructions().len(), 1);
    assert_eq!(original.step_instructions().len(), 1);
    assert_eq!(copy.step_instructions().len(), 2);
}

// =========================================================================
// Binding collection
// =========================================================================

#[test]
fn test_bindings_collected_from_nested_traversals() {
    let bytecode = anon(vec![
        ("V", vec![]),
        ("in", vec![Binding::new("a", "created").into()]),
        ("choose", vec![anon(vec![("out", vec![]), ("count", vec![])]).into()]),
        (
            "option",
            vec![
                Binding::new("two", 2).into(),
                anon(vec![("values", vec!["name".into()])]).into(),
            ],
        ),
        (
            "option",
            vec![
                Binding::new("three", 3).into(),
                anon(vec![("values", vec!["age".into()])]).into(),
            ],
        ),
        (
            "where",
            vec![anon(vec![
                ("out", vec![Binding::new("b", "knows").into()]),
                (
                    "has",
                    vec!["age".into(), Binding::new("c", Predicate::gt(32)).into()],
                ),
                (
                    "map",
                    vec![anon(vec![("values", vec![Binding::new("d", "name").into()])]).into()],
                ),
            ])
            .into()],
        ),
        ("in", vec![Binding::new("a", "created").into()]),
    ]);

    let bindings = bytecode.collect_bindings();
    assert_eq!(bindings.len(), 6);
    assert_eq!(bindings.get("a"), Some(&Value::from("created")));
    assert_eq!(bindings.get("b"), Some(&Value::from("knows")));
    assert_eq!(bindings.get("c"), Some(&Value::from(Predicate::gt(32))));
    assert_eq!(bindings.get("d"), Some(&Value::from("name")));
    assert_eq!(bindings.get("two"), Some(&Value::Int(2)));
    assert_eq!(bindings.get("three"), Some(&Value::Int(3)));

    let names: Vec<&str> = bindings.iter().map(|(name, _)| name).collect();
    assert_eq!(names, vec!["a", "two", "three", "b", "c", "d"]);

    // The bindings stay in place as arguments.
    let steps = bytecode.step_instructions();
    let binding = steps[1].arguments()[0].as_binding().unwrap();
    assert_eq!(binding.variable(), "a");
    assert_eq!(binding.value(), &Value::from("created"));

    let binding = steps[3].arguments()[0].as_binding().unwrap();
    assert_eq!(binding.variable(), "two");
    assert_eq!(binding.value(), &Value::Int(2));

    let where_arg = steps[5].arguments()[0].as_bytecode().unwrap();
    let binding = where_arg.step_instructions()[1].arguments()[1]
        .as_binding()
        .unwrap();
    assert_eq!(binding.variable(), "c");
    assert_eq!(binding.value(), &Value::from(Predicate::gt(32)));

    let map_arg = where_arg.step_instructions()[2].arguments()[0]
        .as_bytecode()
        .unwrap();
    let binding = map_arg.step_instructions()[0].arguments()[0]
        .as_binding()
        .unwrap();
    assert_eq!(binding.variable(), "d");
    assert_eq!(binding.value(), &Value::from("name"));

    let binding = steps[6].arguments()[0].as_binding().unwrap();
    assert_eq!(binding.variable(), "a");
}

#[test]
fn test_bindings_collected_at_arbitrary_depth() {
    let mut innermost = anon(vec![("has", vec![Binding::new("deep", 7).into()])]);
    for _ in 0..32 {
        innermost = anon(vec![("where", vec![innermost.into()])]);
    }
    let bindings = innermost.collect_bindings();
    assert_eq!(bindings.get("deep"), Some(&Value::Int(7)));
}

// =========================================================================
// Strategies, arrays, null arguments
// =========================================================================

#[test]
fn test_strategies_are_kept_as_source_arguments() {
    let mut g = GremlinLang::new();
    g.add_source(
        "withStrategies",
        vec![TraversalStrategy::new("ReadOnlyStrategy").into()],
    )
    .unwrap();
    assert_eq!(
        g.source_instructions()[0].arguments()[0],
        Value::from(TraversalStrategy::new("ReadOnlyStrategy"))
    );

    let edges = anon(vec![("hasLabel", vec!["knows".into()])]);
    let mut g = GremlinLang::new();
    g.add_source(
        "withStrategies",
        vec![TraversalStrategy::new("SubgraphStrategy")
            .with("edges", edges.clone())
            .into()],
    )
    .unwrap();
    let Value::Strategy(strategy) = &g.source_instructions()[0].arguments()[0] else {
        panic!("expected a strategy argument");
    };
    assert_eq!(strategy.get("edges"), Some(&Value::Bytecode(edges)));
}

#[test]
fn test_array_argument_counts_as_one() {
    let mut b = GremlinLang::new();
    b.add_step("property", vec!["k".into(), Value::list(["A", "B", "C"])])
        .unwrap();
    assert_eq!(b.step_instructions().len(), 1);
    assert_eq!(b.step_instructions()[0].arguments().len(), 2);
}

#[test]
fn test_null_arguments_do_not_fail_construction() {
    let mut first = GremlinLang::new();
    first.add_source("3", vec![Value::Null]).unwrap();
    first.try_add_source("withoutStrategies", None).unwrap();
    assert_eq!(first.source_instructions().len(), 2);
}

#[test]
fn test_null_argument_list_rejected_under_reject_policy() {
    let mut g = GremlinLang::with_null_arguments(NullArguments::Reject);
    let err = g.try_add_source("withoutStrategies", None).unwrap_err();
    assert_eq!(
        err,
        BytecodeError::MalformedArgument(
            "null argument list for 'withoutStrategies'".into()
        )
    );
}
