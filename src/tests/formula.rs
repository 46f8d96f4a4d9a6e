use std::sync::Arc;

use super::*;
use crate::test_utils::school_vocabulary;
use crate::universe::{InstanceUniverse, Literal};

fn school(budget: u32) -> (Arc<crate::vocabulary::Vocabulary>, Arc<InstanceUniverse>) {
    let vocab = Arc::new(school_vocabulary());
    let universe = Arc::new(InstanceUniverse::build(Arc::clone(&vocab), budget));
    (vocab, universe)
}

fn literal_for(
    vocab: &crate::vocabulary::Vocabulary,
    universe: &InstanceUniverse,
    predicate: &str,
    vars: &[u32],
) -> u32 {
    let id = vocab.predicate_id(predicate).unwrap();
    universe.position_of(&vocab.instance(id, vars)).unwrap()
}

#[test]
fn empty_clause_renders_as_contradiction() {
    let (_, universe) = school(2);
    let formula = StatusClause::empty(universe).formula();
    assert!(formula.is_empty());
    assert_eq!(formula.variable_count(), 0);
    assert_eq!(formula.to_string(), "true => false");
}

#[test]
fn variables_carry_their_narrowest_type() {
    let (vocab, universe) = school(2);
    let enrolled = literal_for(&vocab, &universe, "enrolled", &[0, 1]);
    let clause = StatusClause::empty(universe)
        .add_if_valid(Literal::body(enrolled))
        .unwrap();
    let formula = clause.formula();
    assert_eq!(formula.variables, vec!["student", "course"]);
    // student and course are unrelated, so no inequality is needed
    assert!(formula.inequalities.is_empty());
    assert_eq!(formula.to_string(), "enrolled(x0, x1) => false");
}

#[test]
fn related_variables_are_kept_distinct() {
    let (vocab, universe) = school(3);
    let knows = literal_for(&vocab, &universe, "knows", &[0, 1]);
    let teaches = literal_for(&vocab, &universe, "teaches", &[0, 2]);
    let clause = StatusClause::empty(universe)
        .add_if_valid(Literal::body(knows))
        .and_then(|c| c.add_if_valid(Literal::body(teaches)))
        .unwrap();
    let formula = clause.formula();
    assert_eq!(formula.variables, vec!["person", "person", "course"]);
    assert_eq!(formula.inequalities, vec![(0, 1)]);
    assert_eq!(formula.len(), 2);
}

#[test]
fn head_atoms_form_a_disjunction() {
    let formula = Formula {
        variables: vec!["o".into()],
        body: vec![FormulaAtom {
            predicate: "p".into(),
            args: vec![0],
        }],
        head: vec![
            FormulaAtom {
                predicate: "q".into(),
                args: vec![0],
            },
            FormulaAtom {
                predicate: "r".into(),
                args: vec![0],
            },
        ],
        inequalities: Vec::new(),
    };
    assert_eq!(formula.to_string(), "p(x0) => q(x0) | r(x0)");
}

#[test]
fn nullary_atoms_render_without_parentheses() {
    let atom = FormulaAtom {
        predicate: "alarm".into(),
        args: Vec::new(),
    };
    assert_eq!(atom.to_string(), "alarm");
}

#[test]
fn json_shape_is_stable() {
    let formula = Formula {
        variables: vec!["node".into(), "node".into()],
        body: vec![FormulaAtom {
            predicate: "edge".into(),
            args: vec![0, 1],
        }],
        head: Vec::new(),
        inequalities: vec![(0, 1)],
    };
    let value = serde_json::to_value(&formula).unwrap();
    assert_eq!(value["variables"][1], "node");
    assert_eq!(value["body"][0]["predicate"], "edge");
    assert_eq!(value["inequalities"][0][1], 1);

    let without_inequalities: Formula =
        serde_json::from_str(r#"{"variables":[],"body":[],"head":[]}"#).unwrap();
    assert!(without_inequalities.inequalities.is_empty());
}
