use super::*;
use crate::test_utils::{binary_universe, school_vocabulary, symmetric_universe};

fn rendered(universe: &InstanceUniverse) -> Vec<String> {
    universe
        .instances()
        .iter()
        .map(|i| i.display(universe.vocabulary()).to_string())
        .collect()
}

#[test]
fn binary_predicate_over_three_variables_has_nine_atoms() {
    let universe = binary_universe(3);
    assert_eq!(universe.size(), 9);
    assert_eq!(
        rendered(&universe),
        vec![
            "b(x0, x0)",
            "b(x0, x1)",
            "b(x1, x0)",
            "b(x1, x1)",
            "b(x0, x2)",
            "b(x1, x2)",
            "b(x2, x0)",
            "b(x2, x1)",
            "b(x2, x2)",
        ]
    );
}

#[test]
fn symmetric_predicate_keeps_one_atom_per_unordered_pair() {
    let universe = symmetric_universe(3);
    assert_eq!(
        rendered(&universe),
        vec![
            "n(x0, x0)",
            "n(x0, x1)",
            "n(x1, x1)",
            "n(x0, x2)",
            "n(x1, x2)",
            "n(x2, x2)",
        ]
    );
}

#[test]
fn typing_removes_self_loops_across_incomparable_types() {
    let vocab = Arc::new(school_vocabulary());
    let universe = InstanceUniverse::build(Arc::clone(&vocab), 2);
    let enrolled = vocab.predicate_id("enrolled").unwrap();
    let count = universe
        .instances()
        .iter()
        .filter(|i| i.predicate() == enrolled)
        .count();
    assert_eq!(count, 2);
    assert!(universe
        .position_of(&vocab.instance(enrolled, &[0, 0]))
        .is_none());
}

#[test]
fn building_twice_gives_the_same_positions() {
    let vocab = Arc::new(school_vocabulary());
    let a = InstanceUniverse::build(Arc::clone(&vocab), 3);
    let b = InstanceUniverse::build(Arc::clone(&vocab), 3);
    assert_eq!(a.instances(), b.instances());
}

#[test]
fn positions_round_trip() {
    let universe = binary_universe(3);
    for (i, inst) in universe.instances().iter().enumerate() {
        assert_eq!(universe.position_of(inst), Some(i as u32));
        assert_eq!(universe.get(i as u32), Some(inst));
    }
    assert!(universe.get(universe.size() as u32).is_none());
}

#[test]
fn positioned_instances_compare_by_literal() {
    let universe = binary_universe(2);
    let body = universe.get_instance(1, Role::Body).unwrap();
    let head = universe.get_instance(1, Role::Head).unwrap();
    assert_ne!(body, head);
    assert_eq!(body, universe.positioned(Literal::body(1)).unwrap());
    assert_eq!(body.instance(), head.instance());
    assert!(body.in_body());
    assert!(universe.get_instance(99, Role::Body).is_none());
}

#[test]
fn rank_masks_are_prefixes() {
    let universe = binary_universe(3);
    assert_eq!(universe.rank_mask(0).size(), 0);
    assert_eq!(universe.rank_mask(1).size(), 1);
    assert_eq!(universe.rank_mask(2).size(), 4);
    assert_eq!(universe.rank_mask(3).size(), 9);
    assert_eq!(universe.rank_mask(7).size(), 9);
}

#[test]
fn nullary_predicates_come_first() {
    let vocab = Arc::new(crate::test_utils::graph_vocabulary());
    let universe = InstanceUniverse::build(Arc::clone(&vocab), 2);
    let first = universe.get(0).unwrap();
    assert!(first.is_nullary());
    assert_eq!(universe.rank_mask(0).size(), 1);
}

#[test]
fn prototypes_use_every_variable() {
    assert_eq!(prototypes(2, 1).len(), 1);
    assert_eq!(prototypes(2, 2).len(), 1);
    // Stirling numbers of the second kind: S(3,2) = 3
    assert_eq!(prototypes(3, 2).len(), 3);
    assert_eq!(prototypes(0, 0).len(), 1);
}

#[test]
fn ordered_choices_are_lexicographic() {
    let choices = ordered_choices(3, 2);
    assert_eq!(choices.len(), 6);
    assert_eq!(choices[0].as_slice(), &[0, 1]);
    assert_eq!(choices[1].as_slice(), &[0, 2]);
    assert_eq!(choices[2].as_slice(), &[1, 0]);
}
