use super::*;
use crate::test_utils::{binary_universe, school_vocabulary};

// b(o, o) over three variables:
// 0 b(0,0)  1 b(0,1)  2 b(1,0)  3 b(1,1)  4 b(0,2)  5 b(1,2)  6 b(2,0)  7 b(2,1)  8 b(2,2)

fn empty(universe: &Arc<InstanceUniverse>) -> StatusClause {
    StatusClause::empty(Arc::clone(universe))
}

fn self_loop(universe: &Arc<InstanceUniverse>) -> StatusClause {
    empty(universe).add_if_valid(Literal::body(0)).unwrap()
}

struct VetoAll;

impl Bias for VetoAll {
    fn disables(&self, _current: &StatusClause, _test: Literal) -> bool {
        true
    }
}

struct AllowHeads;

impl Bias for AllowHeads {
    fn enables(&self, _current: &StatusClause, test: Literal) -> bool {
        test.role == Role::Head
    }
}

// ========== POLICY TESTS ==========

#[test]
fn connectivity_exempts_the_empty_clause() {
    let universe = binary_universe(3);
    let bias = ConnectivityBias;
    for p in 0..universe.size() as u32 {
        assert!(bias.admits(&empty(&universe), Literal::body(p)));
    }
}

#[test]
fn connectivity_requires_a_shared_variable() {
    let universe = binary_universe(3);
    let c = self_loop(&universe);
    let bias = ConnectivityBias;
    assert!(bias.admits(&c, Literal::body(2)));
    assert!(bias.admits(&c, Literal::body(4)));
    assert!(!bias.admits(&c, Literal::body(3)));
    assert!(!bias.admits(&c, Literal::body(8)));
}

#[test]
fn ordering_forbids_skipped_indices() {
    let universe = binary_universe(3);
    let bias = OrderingBias;
    let start = empty(&universe);
    assert!(bias.admits(&start, Literal::body(1)));
    assert!(!bias.admits(&start, Literal::body(3)));
    assert!(!bias.admits(&start, Literal::body(4)));

    let c = self_loop(&universe);
    assert!(bias.admits(&c, Literal::body(5)));
    assert!(!bias.admits(&c, Literal::body(4)));
    assert!(bias.admits(&c, Literal::head(0)));
}

#[test]
fn rank_mask_limits_growth_per_literal() {
    let universe = binary_universe(3);
    let bias = RankMaskBias::new(Arc::clone(&universe), None);
    let start = empty(&universe);
    assert!(bias.admits(&start, Literal::body(0)));
    assert!(!bias.admits(&start, Literal::body(1)));
    assert!(!bias.admits(&start, Literal::head(0)));

    let c = self_loop(&universe);
    assert!(bias.admits(&c, Literal::body(3)));
    assert!(!bias.admits(&c, Literal::body(4)));
    assert!(bias.admits(&c, Literal::head(0)));
    assert!(!bias.admits(&c, Literal::head(1)));
}

#[test]
fn rank_cap_lowers_the_ceiling() {
    let universe = binary_universe(3);
    let bias = RankMaskBias::new(Arc::clone(&universe), Some(1));
    let c = self_loop(&universe);
    assert!(!bias.admits(&c, Literal::body(1)));
    assert!(bias.admits(&c, Literal::head(0)));
}

#[test]
fn calculated_predicates_stay_in_the_body() {
    let vocab = Arc::new(school_vocabulary());
    let universe = Arc::new(InstanceUniverse::build(Arc::clone(&vocab), 2));
    let age = vocab.predicate_id("age").unwrap();
    let position = universe.position_of(&vocab.instance(age, &[0, 1])).unwrap();
    let knows = vocab.predicate_id("knows").unwrap();
    let knows_pos = universe.position_of(&vocab.instance(knows, &[0, 1])).unwrap();

    let bias = CalculatedHeadBias;
    let start = empty(&universe);
    assert!(bias.admits(&start, Literal::body(position)));
    assert!(!bias.admits(&start, Literal::head(position)));
    assert!(bias.admits(&start, Literal::head(knows_pos)));
}

// ========== COMPOSITION TESTS ==========

#[test]
fn combined_disables_if_any_part_does() {
    let universe = binary_universe(3);
    let bias = ConnectivityBias.combine_with(OrderingBias);
    let c = self_loop(&universe);
    // b(1,2) is ordered but disconnected, b(0,2) connected but skips x1
    assert!(!bias.admits(&c, Literal::body(5)));
    assert!(!bias.admits(&c, Literal::body(4)));
    assert!(bias.admits(&c, Literal::body(2)));
}

#[test]
fn enabling_overrides_vetoes() {
    let universe = binary_universe(3);
    let bias = VetoAll.combine_with(AllowHeads);
    let c = self_loop(&universe);
    assert!(!bias.admits(&c, Literal::body(2)));
    assert!(bias.admits(&c, Literal::head(0)));
}

#[test]
fn restricted_bias_ignores_other_roles() {
    let universe = binary_universe(3);
    let bias = VetoAll.restrict(Role::Head);
    let c = self_loop(&universe);
    assert!(bias.admits(&c, Literal::body(2)));
    assert!(!bias.admits(&c, Literal::head(0)));
}

#[test]
fn empty_stack_admits_everything() {
    let universe = binary_universe(2);
    let bias = CombinedBias::default();
    assert!(bias.is_empty());
    assert!(bias.admits(&empty(&universe), Literal::body(3)));
}

// ========== CONFIG TESTS ==========

#[test]
fn default_config_builds_three_policies() {
    let universe = binary_universe(3);
    assert_eq!(BiasConfig::default().build(&universe).len(), 3);
    let with_mask = BiasConfig {
        rank_mask: true,
        rank_cap: Some(2),
        ..Default::default()
    };
    assert!(with_mask.validate(3).is_ok());
    assert_eq!(with_mask.build(&universe).len(), 4);
}

#[test]
fn rank_cap_must_fit_the_budget() {
    let config = BiasConfig {
        rank_mask: true,
        rank_cap: Some(4),
        ..Default::default()
    };
    assert!(matches!(config.validate(3), Err(Error::Config(_))));
}
