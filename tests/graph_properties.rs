//! Property tests over the fastener graph.

use std::cell::RefCell;
use std::rc::Rc;

use proptest::prelude::*;
use spark_fasteners::{
    Affinity, ConstraintAnimator, ConstraintScope, ConstraintVariable, CssHandle, CssHooks,
    CssMatch, CssScope, Fastener, FastenerConfig, FastenerFlags, FastenerId, MemoryStyleSheet,
    Property, UpdateQueue,
};

// =============================================================================
// Helpers
// =============================================================================

fn affinity() -> impl Strategy<Value = Affinity> {
    prop_oneof![
        Just(Affinity::Transient),
        Just(Affinity::Extrinsic),
        Just(Affinity::Intrinsic),
        Just(Affinity::Reflexive),
    ]
}

/// Build `root → cells[0] → cells[1] → ...`, each cell with its own affinity.
fn chain(affinities: &[Affinity]) -> (Rc<Property<i64>>, Vec<Rc<Property<i64>>>) {
    let root = Property::new("root", 0_i64);
    let mut cells: Vec<Rc<Property<i64>>> = Vec::new();
    for (i, affinity) in affinities.iter().enumerate() {
        let cell = Property::with_config(
            format!("cell{i}"),
            0_i64,
            FastenerConfig::default().with_affinity(*affinity),
        );
        match cells.last() {
            Some(prev) => cell.bind_inlet(prev),
            None => cell.bind_inlet(&root),
        }
        cells.push(cell);
    }
    (root, cells)
}

fn snapshot(cells: &[Rc<Property<i64>>]) -> Vec<FastenerFlags> {
    cells.iter().map(|cell| cell.core().flags()).collect()
}

#[derive(Default)]
struct Solver {
    variables: RefCell<Vec<FastenerId>>,
}

impl ConstraintScope for Solver {
    fn add_constraint_variable(&self, variable: Rc<dyn ConstraintVariable>) {
        let id = variable.variable_id();
        let mut variables = self.variables.borrow_mut();
        if !variables.contains(&id) {
            variables.push(id);
        }
    }

    fn remove_constraint_variable(&self, variable: &dyn ConstraintVariable) {
        let id = variable.variable_id();
        self.variables.borrow_mut().retain(|v| *v != id);
    }

    fn set_constraint_variable(&self, _variable: &dyn ConstraintVariable, _value: f64) {}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Event {
    Attach,
    Detach,
}

#[derive(Default)]
struct Lifecycle {
    events: RefCell<Vec<Event>>,
}

impl CssHooks for Lifecycle {
    fn did_attach_css(&self, _css: &CssHandle) {
        self.events.borrow_mut().push(Event::Attach);
    }

    fn did_detach_css(&self, _css: &CssHandle) {
        self.events.borrow_mut().push(Event::Detach);
    }
}

#[derive(Debug, Clone, Copy)]
enum ScopeOp {
    Attach(usize),
    Set(Option<usize>),
    Detach,
}

fn scope_op() -> impl Strategy<Value = ScopeOp> {
    prop_oneof![
        (0..3_usize).prop_map(ScopeOp::Attach),
        proptest::option::of(0..3_usize).prop_map(ScopeOp::Set),
        Just(ScopeOp::Detach),
    ]
}

// =============================================================================
// Properties
// =============================================================================

proptest! {
    #[test]
    fn test_decohere_is_idempotent(
        affinities in proptest::collection::vec(affinity(), 1..8),
        value in 1..1000_i64,
    ) {
        let (root, cells) = chain(&affinities);
        root.set_value(value, Affinity::Intrinsic);
        let once = snapshot(&cells);

        root.decohere();
        prop_assert_eq!(snapshot(&cells), once);
    }

    #[test]
    fn test_chain_converges_from_the_tail(
        offsets in proptest::collection::vec(-50..50_i64, 1..8),
        value in -1000..1000_i64,
    ) {
        let (root, cells) = chain(&vec![Affinity::Transient; offsets.len()]);
        for (cell, offset) in cells.iter().zip(offsets.iter().copied()) {
            cell.set_transform(move |x| Some(x + offset));
        }
        root.set_value(value, Affinity::Intrinsic);

        let tail = cells.last().unwrap();
        tail.recohere(1);

        let expected = value + offsets.iter().sum::<i64>();
        prop_assert_eq!(tail.value(), expected);
        for cell in &cells {
            prop_assert!(!cell.core().is_decoherent());
        }
    }

    #[test]
    fn test_condition_count_returns_to_zero(n in 1..20_u32) {
        let queue = UpdateQueue::new();
        let solver = Rc::new(Solver::default());
        let cell = ConstraintAnimator::new("x", 0.0_f64, &solver);
        cell.mount(queue.context());

        for _ in 0..n {
            cell.add_constraint_condition().unwrap();
        }
        prop_assert!(cell.constraining());
        prop_assert_eq!(solver.variables.borrow().len(), 1);

        for _ in 0..n {
            cell.remove_constraint_condition().unwrap();
        }
        prop_assert_eq!(cell.condition_count(), 0);
        prop_assert!(!cell.constraining());
        prop_assert!(solver.variables.borrow().is_empty());
    }

    #[test]
    fn test_attach_and_detach_alternate(ops in proptest::collection::vec(scope_op(), 0..24)) {
        let sheets: Vec<CssHandle> = (0..3).map(|_| -> CssHandle { MemoryStyleSheet::new() }).collect();
        let scope = CssScope::with_hooks("scope", CssMatch::Any, Lifecycle::default(), FastenerConfig::default());

        for op in ops {
            match op {
                ScopeOp::Attach(i) => scope.attach_css(sheets[i].clone()),
                ScopeOp::Set(i) => {
                    scope.set_css(i.map(|i| sheets[i].clone()));
                }
                ScopeOp::Detach => {
                    scope.detach_css();
                }
            }
        }

        let events = scope.hooks().events.borrow();
        let mut expected = Event::Attach;
        for event in events.iter() {
            prop_assert_eq!(*event, expected);
            expected = match expected {
                Event::Attach => Event::Detach,
                Event::Detach => Event::Attach,
            };
        }
        // Attached exactly when the last event was an attach
        prop_assert_eq!(scope.css().is_some(), events.last() == Some(&Event::Attach));
    }
}
