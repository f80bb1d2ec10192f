use crate::types::{to_var, Lit};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Reason {
    Decision,
    Propagation,
    Pure,
    /// The opposite polarity of a refuted decision.
    Flip,
    /// Fixed before the search started (e.g. by a parallel split).
    Assumption,
}

#[derive(Clone)]
struct VarData {
    value: bool,
    reason: Reason,
}

pub struct Assignment {
    data: Vec<Option<VarData>>,
    trail: Vec<Lit>,
    levels: Vec<usize>,
}

impl Assignment {
    pub fn new(var_count: usize) -> Self {
        Self {
            data: vec![None; var_count + 1],
            trail: vec![],
            levels: vec![],
        }
    }

    pub fn eval(&self, lit: Lit) -> Option<bool> {
        self.data[to_var(lit)]
            .as_ref()
            .map(|data| data.value == lit.is_positive())
    }

    pub fn set(&mut self, lit: Lit, reason: Reason) {
        debug_assert_eq!(self.eval(lit), None, "variable of {lit} assigned twice");

        if let Reason::Decision = reason {
            self.levels.push(self.trail.len());
        }
        self.trail.push(lit);

        let data = VarData {
            value: lit.is_positive(),
            reason,
        };
        self.data[to_var(lit)] = Some(data);
    }

    pub fn trail(&self) -> &[Lit] {
        &self.trail
    }

    pub fn reason(&self, lit: Lit) -> Option<Reason> {
        self.data[to_var(lit)].as_ref().map(|data| data.reason)
    }

    pub fn last_level(&self) -> usize {
        self.levels.len()
    }

    /// Reverts the last decision and everything assigned after it.
    /// Returns the reverted decision, or `None` at level 0.
    pub fn backtrack(&mut self) -> Option<Lit> {
        let i = self.levels.pop()?;
        let decision = self.trail[i];
        for lit in self.trail.drain(i..) {
            self.data[to_var(lit)] = None;
        }
        Some(decision)
    }
}
