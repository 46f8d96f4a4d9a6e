use std::collections::VecDeque;
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use crossbeam_channel::Receiver;
use rustc_hash::FxHasher;

use crate::error::{OracleError, Result};
use crate::formula::{Formula, FormulaAtom};
use crate::oracle::{Oracle, OracleClient, OracleContext};
use crate::search::{ExpansionOperator, ResultPolicy, SearchListener, SearchNode};
use crate::universe::InstanceUniverse;
use crate::vocabulary::{PredicateFlags, Vocabulary};

pub(crate) fn hashed<T: Hash>(value: &T) -> u64 {
    let mut hasher = FxHasher::default();
    value.hash(&mut hasher);
    hasher.finish()
}

fn symmetric() -> PredicateFlags {
    PredicateFlags {
        symmetric: true,
        ..Default::default()
    }
}

/// `alarm()`, `edge(node, node)`, symmetric `near(node, node)`, `red(node)`.
pub(crate) fn graph_vocabulary() -> Vocabulary {
    let mut vocab = Vocabulary::new();
    vocab.declare_type("node", None).unwrap();
    vocab
        .declare_predicate("alarm", &[], PredicateFlags::default())
        .unwrap();
    vocab
        .declare_predicate("edge", &["node", "node"], PredicateFlags::default())
        .unwrap();
    vocab
        .declare_predicate("near", &["node", "node"], symmetric())
        .unwrap();
    vocab
        .declare_predicate("red", &["node"], PredicateFlags::default())
        .unwrap();
    vocab
}

/// person > student, course, built-in int; `age` is calculated.
pub(crate) fn school_vocabulary() -> Vocabulary {
    let mut vocab = Vocabulary::new();
    vocab.declare_type("person", None).unwrap();
    vocab.declare_type("student", Some("person")).unwrap();
    vocab.declare_type("course", None).unwrap();
    vocab.declare_builtin_type("int").unwrap();
    vocab
        .declare_predicate("enrolled", &["student", "course"], PredicateFlags::default())
        .unwrap();
    vocab
        .declare_predicate("knows", &["person", "person"], PredicateFlags::default())
        .unwrap();
    vocab
        .declare_predicate("teaches", &["person", "course"], PredicateFlags::default())
        .unwrap();
    vocab
        .declare_predicate(
            "age",
            &["person", "int"],
            PredicateFlags {
                calculated: true,
                ..Default::default()
            },
        )
        .unwrap();
    vocab
}

fn single_predicate(name: &str, arity: usize, flags: PredicateFlags) -> Vocabulary {
    let mut vocab = Vocabulary::new();
    vocab.declare_type("o", None).unwrap();
    let args = vec!["o"; arity];
    vocab.declare_predicate(name, &args, flags).unwrap();
    vocab
}

/// Universe of the single ordered predicate `b(o, o)`.
pub(crate) fn binary_universe(budget: u32) -> Arc<InstanceUniverse> {
    let vocab = single_predicate("b", 2, PredicateFlags::default());
    Arc::new(InstanceUniverse::build(Arc::new(vocab), budget))
}

/// Universe of the single symmetric predicate `n(o, o)`.
pub(crate) fn symmetric_universe(budget: u32) -> Arc<InstanceUniverse> {
    let vocab = single_predicate("n", 2, symmetric());
    Arc::new(InstanceUniverse::build(Arc::new(vocab), budget))
}

/// Universe of the unary predicates `p(o)` and `q(o)`.
pub(crate) fn unary_universe(budget: u32) -> Arc<InstanceUniverse> {
    let mut vocab = Vocabulary::new();
    vocab.declare_type("o", None).unwrap();
    vocab
        .declare_predicate("p", &["o"], PredicateFlags::default())
        .unwrap();
    vocab
        .declare_predicate("q", &["o"], PredicateFlags::default())
        .unwrap();
    Arc::new(InstanceUniverse::build(Arc::new(vocab), budget))
}

/// `name(x0) => false` over one variable of type `o`.
pub(crate) fn sample_formula(name: &str) -> Formula {
    Formula {
        variables: vec!["o".to_string()],
        body: vec![FormulaAtom {
            predicate: name.to_string(),
            args: vec![0],
        }],
        head: Vec::new(),
        inequalities: Vec::new(),
    }
}

type ValidityFn = Box<dyn Fn(&Formula) -> bool + Send + Sync>;
type EntailmentFn = Box<dyn Fn(&[Formula], &Formula) -> bool + Send + Sync>;

/// Oracle answering from closures over rendered formulas, counting calls.
pub(crate) struct ScriptedOracle {
    validity: ValidityFn,
    entailment: EntailmentFn,
    validity_calls: AtomicUsize,
    formulas_checked: AtomicUsize,
    entailment_calls: AtomicUsize,
}

impl ScriptedOracle {
    pub(crate) fn new(
        validity: impl Fn(&Formula) -> bool + Send + Sync + 'static,
        entailment: impl Fn(&[Formula], &Formula) -> bool + Send + Sync + 'static,
    ) -> Arc<Self> {
        Arc::new(Self {
            validity: Box::new(validity),
            entailment: Box::new(entailment),
            validity_calls: AtomicUsize::new(0),
            formulas_checked: AtomicUsize::new(0),
            entailment_calls: AtomicUsize::new(0),
        })
    }

    /// Valid exactly for the listed renderings; nothing is entailed.
    pub(crate) fn valid_for(rendered: &[&str]) -> Arc<Self> {
        let valid: Vec<String> = rendered.iter().map(|s| s.to_string()).collect();
        Self::new(move |f| valid.contains(&f.to_string()), |_, _| false)
    }

    pub(crate) fn validity_calls(&self) -> usize {
        self.validity_calls.load(Ordering::SeqCst)
    }

    pub(crate) fn formulas_checked(&self) -> usize {
        self.formulas_checked.load(Ordering::SeqCst)
    }

    pub(crate) fn entailment_calls(&self) -> usize {
        self.entailment_calls.load(Ordering::SeqCst)
    }
}

impl Oracle for ScriptedOracle {
    fn validity(
        &self,
        _context: &OracleContext,
        formulas: &[Formula],
    ) -> std::result::Result<Vec<bool>, OracleError> {
        self.validity_calls.fetch_add(1, Ordering::SeqCst);
        self.formulas_checked
            .fetch_add(formulas.len(), Ordering::SeqCst);
        Ok(formulas.iter().map(|f| (self.validity)(f)).collect())
    }

    fn entails(
        &self,
        _context: &OracleContext,
        premises: &[Formula],
        conclusion: &Formula,
    ) -> std::result::Result<bool, OracleError> {
        self.entailment_calls.fetch_add(1, Ordering::SeqCst);
        Ok((self.entailment)(premises, conclusion))
    }
}

/// Oracle whose answers wait until `gate` yields or closes.
pub(crate) struct GatedOracle {
    pub(crate) gate: Receiver<()>,
}

impl Oracle for GatedOracle {
    fn validity(
        &self,
        _context: &OracleContext,
        formulas: &[Formula],
    ) -> std::result::Result<Vec<bool>, OracleError> {
        let _ = self.gate.recv();
        Ok(vec![true; formulas.len()])
    }

    fn entails(
        &self,
        _context: &OracleContext,
        _premises: &[Formula],
        _conclusion: &Formula,
    ) -> std::result::Result<bool, OracleError> {
        let _ = self.gate.recv();
        Ok(false)
    }
}

/// Oracle that always fails.
pub(crate) struct FailingOracle;

impl Oracle for FailingOracle {
    fn validity(
        &self,
        _context: &OracleContext,
        _formulas: &[Formula],
    ) -> std::result::Result<Vec<bool>, OracleError> {
        Err(OracleError::Solver("model checker crashed".into()))
    }

    fn entails(
        &self,
        _context: &OracleContext,
        _premises: &[Formula],
        _conclusion: &Formula,
    ) -> std::result::Result<bool, OracleError> {
        Err(OracleError::Solver("model checker crashed".into()))
    }
}

pub(crate) fn client(oracle: Arc<dyn Oracle>) -> OracleClient {
    OracleClient::new(oracle, OracleContext::default())
}

/// Breadth-first traversal to `max_depth`, playing the engine's side of the
/// search protocol.
pub(crate) fn run_search<S, P>(problem: &mut P, root: SearchNode<S>, max_depth: usize) -> Result<()>
where
    P: ExpansionOperator<S> + ResultPolicy<S> + SearchListener<S>,
{
    problem.initialise(std::slice::from_ref(&root))?;
    let mut frontier = VecDeque::from([root]);
    while let Some(mut node) = frontier.pop_front() {
        if !problem.node_selected(&node) {
            continue;
        }
        if !problem.process_solution(&node)? {
            node.prune();
        }
        problem.node_processed(&node);
        if node.depth >= max_depth {
            continue;
        }
        let children: Vec<SearchNode<S>> = problem
            .expand_node(&node)?
            .into_iter()
            .map(|state| node.child(state))
            .collect();
        problem.node_expanded(&node, &children);
        frontier.extend(children);
    }
    problem.search_complete()
}
