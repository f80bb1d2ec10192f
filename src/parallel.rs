use std::{
    sync::{
        atomic::{AtomicBool, Ordering},
        mpsc::channel,
        Arc, Mutex,
    },
    thread,
};

use log::debug;

use crate::{
    solver::{next_step, reduce, share, SharedClause, Solver, SolverOptions, Step},
    types::{Formula, Lit, Solution},
};

/// A node of the search tree: the clause set left after fixing `prefix`.
struct Subproblem {
    prefix: Vec<Lit>,
    clauses: Vec<SharedClause>,
}

/// Expands the search tree below `clauses` down to `depth` case splits,
/// following the same steps as the sequential solver. Open nodes at the
/// cut-off are collected into `out`. Returns a model if one is found on the
/// way.
fn expand(
    mut prefix: Vec<Lit>,
    mut clauses: Vec<SharedClause>,
    depth: usize,
    pure_literals: bool,
    out: &mut Vec<Subproblem>,
) -> Option<Vec<Lit>> {
    loop {
        match next_step(&clauses, pure_literals) {
            Step::Sat => return Some(prefix),
            Step::Conflict => return None,
            Step::Fix(lit, _) => {
                clauses = reduce(&clauses, lit);
                prefix.push(lit);
            }
            Step::Branch(lit) => {
                if depth == 0 {
                    out.push(Subproblem { prefix, clauses });
                    return None;
                }

                for lit in [lit, -lit] {
                    let mut sub_prefix = prefix.clone();
                    sub_prefix.push(lit);
                    let model = expand(
                        sub_prefix,
                        reduce(&clauses, lit),
                        depth - 1,
                        pure_literals,
                        out,
                    );
                    if model.is_some() {
                        return model;
                    }
                }
                return None;
            }
        }
    }
}

const MAX_SPLIT_DEPTH: usize = 16;

/// Number of case splits to expand so that there are about twice as many
/// subproblems as threads, capped at [`MAX_SPLIT_DEPTH`].
fn split_depth(threads: usize) -> usize {
    let threads = threads.min(1 << (MAX_SPLIT_DEPTH - 1));
    threads.next_power_of_two().trailing_zeros() as usize + 1
}

pub fn solve(formula: Formula, n: Option<usize>) -> Solution {
    solve_with_options(formula, n, SolverOptions::default())
}

/// Solves `formula` on `n` worker threads (all available cores by default).
///
/// The verdict matches the sequential solver, the model may not. If
/// `options.interrupt` is set, it is also raised once a model is found.
pub fn solve_with_options(
    formula: Formula,
    n: Option<usize>,
    options: SolverOptions,
) -> Solution {
    let n = n.unwrap_or(
        thread::available_parallelism()
            .map(|val| val.get())
            .unwrap_or(2),
    );
    let n = n.max(1);

    let var_count = formula.max_var();
    let mut subproblems = vec![];
    let model = expand(
        vec![],
        share(formula.clauses),
        split_depth(n),
        options.pure_literals,
        &mut subproblems,
    );
    if let Some(model) = model {
        if let Some(interrupt) = &options.interrupt {
            interrupt.store(true, Ordering::Relaxed);
        }
        return Solution::Sat { model };
    }
    if subproblems.is_empty() {
        return Solution::Unsat;
    }

    let total = subproblems.len();
    debug!("split into {total} subproblems for {n} threads");

    let interrupt = options
        .interrupt
        .clone()
        .unwrap_or_else(|| Arc::new(AtomicBool::new(false)));
    let options = SolverOptions {
        interrupt: Some(Arc::clone(&interrupt)),
        ..options
    };
    let queue = Mutex::new(subproblems.into_iter());

    let (tx, rx) = channel::<Solution>();

    thread::scope(|scope| {
        for _ in 0..n.min(total) {
            let thread_tx = tx.clone();
            let (queue, interrupt, options) = (&queue, &interrupt, &options);
            scope.spawn(move || loop {
                if interrupt.load(Ordering::Relaxed) {
                    break;
                }
                // a poisoned queue only means another worker panicked
                let next = match queue.lock() {
                    Ok(mut queue) => queue.next(),
                    Err(_) => None,
                };
                let Some(Subproblem { prefix, clauses }) = next else {
                    break;
                };

                let mut solver = Solver::resume(clauses, &prefix, var_count, options.clone());
                let solution = solver.solve();
                if let Solution::Sat { .. } = solution {
                    interrupt.store(true, Ordering::Relaxed);
                }
                if thread_tx.send(solution).is_err() {
                    break;
                }
            });
        }

        // receiver blocks as long as some transmitter is alive
        drop(tx);

        let mut unsat = 0;
        let mut solution = None;
        for subsolution in rx {
            match subsolution {
                Solution::Sat { .. } => {
                    if solution.is_none() {
                        solution = Some(subsolution);
                    }
                }
                Solution::Unsat => unsat += 1,
                Solution::Unknown => (),
            }
        }

        match solution {
            Some(solution) => solution,
            None if unsat == total => Solution::Unsat,
            None => Solution::Unknown,
        }
    })
}
