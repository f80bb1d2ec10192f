mod assignment;

use std::{
    collections::HashSet,
    mem,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    time::Instant,
};

use log::debug;

use crate::types::{Formula, Lit, Solution};

pub use self::assignment::Reason;
use self::assignment::Assignment;

/// Clauses are never modified in place, so unchanged ones are shared
/// between a clause set and its reductions.
pub(crate) type SharedClause = Arc<[Lit]>;

#[derive(Clone, Debug, Default)]
pub struct SolverOptions {
    /// Fix pure literals before branching.
    pub pure_literals: bool,
    /// Give up with [`Solution::Unknown`] once this instant has passed.
    pub deadline: Option<Instant>,
    /// Give up with [`Solution::Unknown`] once this flag is raised.
    pub interrupt: Option<Arc<AtomicBool>>,
}

impl SolverOptions {
    fn interrupted(&self) -> bool {
        self.deadline.is_some_and(|deadline| Instant::now() >= deadline)
            || self
                .interrupt
                .as_ref()
                .is_some_and(|flag| flag.load(Ordering::Relaxed))
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Stats {
    pub decisions: usize,
    pub propagations: usize,
    pub conflicts: usize,
}

pub(crate) enum Step {
    Sat,
    Conflict,
    Fix(Lit, Reason),
    Branch(Lit),
}

/// Decides what to do with the current clause set. Selection is positional:
/// the first unit clause, then (optionally) the first pure literal, then the
/// first literal of the first clause.
pub(crate) fn next_step(clauses: &[SharedClause], pure_literals: bool) -> Step {
    if clauses.is_empty() {
        return Step::Sat;
    }
    if clauses.iter().any(|clause| clause.is_empty()) {
        return Step::Conflict;
    }

    if let Some(clause) = clauses.iter().find(|clause| clause.len() == 1) {
        return Step::Fix(clause[0], Reason::Propagation);
    }

    if pure_literals {
        let occurring: HashSet<Lit> = clauses.iter().flat_map(|c| c.iter().copied()).collect();
        let pure = clauses
            .iter()
            .flat_map(|c| c.iter().copied())
            .find(|lit| !occurring.contains(&-lit));
        if let Some(lit) = pure {
            return Step::Fix(lit, Reason::Pure);
        }
    }

    Step::Branch(clauses[0][0])
}

/// Simplifies `clauses` under `lit`: clauses containing `lit` are dropped,
/// `-lit` is stripped from the others.
pub(crate) fn reduce(clauses: &[SharedClause], lit: Lit) -> Vec<SharedClause> {
    clauses
        .iter()
        .filter(|clause| !clause.contains(&lit))
        .map(|clause| {
            if clause.contains(&-lit) {
                clause.iter().copied().filter(|&l| l != -lit).collect()
            } else {
                Arc::clone(clause)
            }
        })
        .collect()
}

pub(crate) fn share(clauses: Vec<Vec<Lit>>) -> Vec<SharedClause> {
    clauses.into_iter().map(SharedClause::from).collect()
}

pub struct Solver {
    clauses: Vec<SharedClause>,
    assignment: Assignment,
    // clause set in force before each open decision
    saved: Vec<Vec<SharedClause>>,
    options: SolverOptions,
    stats: Stats,
}

impl Solver {
    pub fn new(formula: Formula) -> Self {
        Self::with_options(formula, SolverOptions::default())
    }

    pub fn with_options(formula: Formula, options: SolverOptions) -> Self {
        let var_count = formula.max_var();
        Self::create(share(formula.clauses), &[], var_count, options)
    }

    /// Continues from a clause set already reduced under `assumptions`.
    pub(crate) fn resume(
        clauses: Vec<SharedClause>,
        assumptions: &[Lit],
        var_count: usize,
        options: SolverOptions,
    ) -> Self {
        Self::create(clauses, assumptions, var_count, options)
    }

    fn create(
        clauses: Vec<SharedClause>,
        assumptions: &[Lit],
        var_count: usize,
        options: SolverOptions,
    ) -> Self {
        let mut assignment = Assignment::new(var_count);
        for &lit in assumptions {
            assignment.set(lit, Reason::Assumption);
        }

        Solver {
            clauses,
            assignment,
            saved: vec![],
            options,
            stats: Stats::default(),
        }
    }

    fn assign(&mut self, lit: Lit, reason: Reason, parent: &[SharedClause]) {
        self.clauses = reduce(parent, lit);
        self.assignment.set(lit, reason);
    }

    pub fn solve(&mut self) -> Solution {
        let solution = self.search();
        debug!(
            "search finished: {} decisions, {} propagations, {} conflicts",
            self.stats.decisions, self.stats.propagations, self.stats.conflicts
        );
        solution
    }

    fn search(&mut self) -> Solution {
        loop {
            if self.options.interrupted() {
                return Solution::Unknown;
            }

            match next_step(&self.clauses, self.options.pure_literals) {
                Step::Sat => {
                    let model = self.assignment.trail().to_vec();
                    return Solution::Sat { model };
                }
                Step::Conflict => {
                    self.stats.conflicts += 1;

                    let (Some(decision), Some(parent)) =
                        (self.assignment.backtrack(), self.saved.pop())
                    else {
                        return Solution::Unsat;
                    };
                    self.assign(-decision, Reason::Flip, &parent);
                }
                Step::Fix(lit, reason) => {
                    self.stats.propagations += 1;

                    let parent = mem::take(&mut self.clauses);
                    self.assign(lit, reason, &parent);
                }
                Step::Branch(lit) => {
                    self.stats.decisions += 1;

                    let parent = mem::take(&mut self.clauses);
                    self.assign(lit, Reason::Decision, &parent);
                    self.saved.push(parent);
                    debug_assert_eq!(self.saved.len(), self.assignment.last_level());
                }
            }
        }
    }

    pub fn stats(&self) -> Stats {
        self.stats
    }

    /// Why `lit`'s variable holds its current value, if assigned.
    pub fn reason(&self, lit: Lit) -> Option<Reason> {
        self.assignment.reason(lit)
    }
}

/// Checks `solution` against `formula`: a model must satisfy every clause
/// without fixing a variable both ways, `Unsat` must be expected.
pub fn verify(formula: &Formula, sat: bool, solution: &Solution) -> bool {
    match solution {
        Solution::Sat { model } => {
            if sat {
                let mut sorted = model.to_vec();
                sorted.sort();
                let consistent = sorted.iter().all(|lit| sorted.binary_search(&-lit).is_err());
                consistent
                    && formula
                        .clauses
                        .iter()
                        .all(|clause| clause.iter().any(|lit| sorted.binary_search(lit).is_ok()))
            } else {
                false
            }
        }
        Solution::Unsat => !sat,
        Solution::Unknown => false,
    }
}

#[cfg(test)]
mod tests {
    use std::{
        sync::{atomic::AtomicBool, Arc},
        time::{Duration, Instant},
    };

    use crate::types::{Clause, Formula, Solution};

    use super::{reduce, share, verify, Reason, Solver, SolverOptions};

    fn solve(clauses: Vec<Clause>) -> Solution {
        Solver::new(Formula::from_clauses(clauses).unwrap()).solve()
    }

    fn check(clauses: Vec<Clause>, sat: bool) {
        let formula = Formula::from_clauses(clauses).unwrap();

        let solution = Solver::new(formula.clone()).solve();
        assert!(verify(&formula, sat, &solution));

        let options = SolverOptions {
            pure_literals: true,
            ..Default::default()
        };
        let solution = Solver::with_options(formula.clone(), options).solve();
        assert!(verify(&formula, sat, &solution));
    }

    fn model(solution: Solution) -> Vec<i32> {
        match solution {
            Solution::Sat { model } => model,
            other => panic!("expected a model, got {other:?}"),
        }
    }

    #[test]
    fn single_unit() {
        assert_eq!(model(solve(vec![vec![1]])), vec![1]);
    }

    #[test]
    fn contradicting_units() {
        assert_eq!(solve(vec![vec![1], vec![-1]]), Solution::Unsat);
    }

    #[test]
    fn branch_then_propagate() {
        let clauses = vec![vec![1, 2], vec![-1, 2], vec![1, -2]];
        assert_eq!(model(solve(clauses)), vec![1, 2]);
    }

    #[test]
    fn no_clauses() {
        assert_eq!(model(solve(vec![])), Vec::<i32>::new());
    }

    #[test]
    fn tautology() {
        assert_eq!(model(solve(vec![vec![1, -1]])), vec![1]);
        check(vec![vec![1, -1], vec![-1, 2, -1], vec![-2, 2]], true);
    }

    #[test]
    fn both_branches_fail() {
        let clauses = vec![vec![1, 2], vec![1, -2], vec![-1, 2], vec![-1, -2]];
        assert_eq!(solve(clauses), Solution::Unsat);
    }

    #[test]
    fn empty_clause() {
        assert_eq!(solve(vec![vec![1, 2], vec![], vec![3]]), Solution::Unsat);
        assert_eq!(solve(vec![vec![]]), Solution::Unsat);
    }

    #[test]
    fn flipped_decision_in_model() {
        // 1 is refuted, so the model starts with the flipped literal
        let clauses = vec![vec![1, 2], vec![-1, 3], vec![-1, -3], vec![-2, 4]];
        assert_eq!(model(solve(clauses)), vec![-1, 2, 4]);
    }

    #[test]
    fn duplicate_literals() {
        check(vec![vec![1, 1], vec![-1, -1, 2], vec![-2, -2]], false);
        check(vec![vec![2, 2, -1], vec![-2, -2]], true);
    }

    #[test]
    /// Formulas from the lecture.
    fn basic_sat() {
        let clauses = vec![vec![1, 2], vec![-1, 2], vec![-1, -2, 3], vec![-1, -2, -3]];
        check(clauses, true);

        let clauses = vec![
            vec![-1, -2, 3],
            vec![2, -1, 3],
            vec![1, -2, 3],
            vec![-3, 4, 5],
            vec![-3, 4, -5],
            vec![-3, -4, 5],
            vec![-3, -4, -5],
        ];
        check(clauses, true);
    }

    #[test]
    fn basic_unsat() {
        let clauses = vec![
            vec![1, 2],
            vec![-2, 3],
            vec![-2, -3],
            vec![-1, -2, -4],
            vec![-1, 2, -4],
            vec![-1, 2, 4],
        ];

        check(clauses, false);
    }

    #[test]
    /// Formulas with non-trivial propagation before the first decision.
    fn kickstart() {
        let clauses = vec![vec![1], vec![-1, 2], vec![-1, -2]];
        check(clauses, false);
    }

    #[test]
    fn pure_literals() {
        let formula = Formula::from_clauses(vec![vec![1, 2], vec![-1, 3]]).unwrap();

        let plain = Solver::new(formula.clone()).solve();
        assert_eq!(model(plain), vec![1, 3]);

        let options = SolverOptions {
            pure_literals: true,
            ..Default::default()
        };
        let mut solver = Solver::with_options(formula, options);
        assert_eq!(model(solver.solve()), vec![2, -1]);
        assert_eq!(solver.stats().decisions, 0);
        assert_eq!(solver.stats().propagations, 2);
        assert_eq!(solver.reason(-1), Some(Reason::Pure));
        assert_eq!(solver.reason(3), None);
    }

    #[test]
    fn deterministic() {
        let clauses = vec![
            vec![1, -2, 3],
            vec![-1, 2],
            vec![2, 3, -4],
            vec![-3, 4],
            vec![-1, -4],
            vec![4, 5],
        ];
        let first = solve(clauses.clone());
        for _ in 0..5 {
            assert_eq!(solve(clauses.clone()), first);
        }
    }

    #[test]
    fn long_implication_chain() {
        const N: i32 = 2000;
        let mut clauses: Vec<Clause> = (1..N).map(|v| vec![-v, v + 1]).collect();
        clauses.push(vec![1, N]);
        clauses.push(vec![-N, 1]);

        let formula = Formula::from_clauses(clauses).unwrap();
        let solution = Solver::new(formula.clone()).solve();
        assert!(verify(&formula, true, &solution));
    }

    #[test]
    fn stats() {
        let clauses = vec![vec![1, 2], vec![1, -2], vec![-1, 2], vec![-1, -2]];
        let mut solver = Solver::new(Formula::from_clauses(clauses).unwrap());
        assert_eq!(solver.solve(), Solution::Unsat);

        let stats = solver.stats();
        assert_eq!(stats.decisions, 1);
        assert_eq!(stats.conflicts, 2);
        assert_eq!(stats.propagations, 2);
    }

    #[test]
    fn expired_deadline() {
        let options = SolverOptions {
            deadline: Some(Instant::now() - Duration::from_millis(1)),
            ..Default::default()
        };
        let formula = Formula::from_clauses(vec![vec![1, 2], vec![-1]]).unwrap();
        assert_eq!(Solver::with_options(formula, options).solve(), Solution::Unknown);
    }

    #[test]
    fn raised_interrupt() {
        let options = SolverOptions {
            interrupt: Some(Arc::new(AtomicBool::new(true))),
            ..Default::default()
        };
        let formula = Formula::from_clauses(vec![vec![1, 2]]).unwrap();
        assert_eq!(Solver::with_options(formula, options).solve(), Solution::Unknown);
    }

    #[test]
    fn reduction() {
        let clauses = share(vec![vec![1, 2], vec![-1, 3], vec![1, -1], vec![4], vec![-1]]);
        let reduced = reduce(&clauses, 1);
        assert_eq!(reduced.len(), 3);
        assert_eq!(&*reduced[0], &[3]);
        assert_eq!(&*reduced[1], &[4]);
        assert!(reduced[2].is_empty());
        // untouched clauses are shared
        assert!(std::sync::Arc::ptr_eq(&reduced[1], &clauses[3]));
    }

    #[test]
    fn verify_rejects_bad_models() {
        let formula = Formula::from_clauses(vec![vec![1, 2], vec![-1]]).unwrap();
        assert!(verify(&formula, true, &Solution::Sat { model: vec![-1, 2] }));
        assert!(!verify(&formula, true, &Solution::Sat { model: vec![1] }));
        assert!(!verify(&formula, true, &Solution::Sat { model: vec![1, -1, 2] }));
        assert!(!verify(&formula, false, &Solution::Sat { model: vec![-1, 2] }));
        assert!(!verify(&formula, true, &Solution::Unknown));
        assert!(verify(&formula, false, &Solution::Unsat));
    }
}
