use crate::error::{Error, Result};

pub type Lit = i32;

pub type Var = usize;

pub type Clause = Vec<Lit>;

pub fn to_var(lit: Lit) -> Var {
    debug_assert_ne!(lit, 0);
    lit.unsigned_abs() as Var
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Formula {
    pub var_count: usize,
    pub clauses: Vec<Clause>,
}

impl Formula {
    pub fn new(var_count: usize, clauses: Vec<Clause>) -> Result<Self> {
        for (i, clause) in clauses.iter().enumerate() {
            // Lit::MIN has no negation
            if let Some(&lit) = clause.iter().find(|&&lit| lit == 0 || lit == Lit::MIN) {
                return Err(Error::InvalidLiteral { clause: i, lit });
            }
        }
        Ok(Self { var_count, clauses })
    }

    /// Like [`Formula::new`], with the variable count taken from the largest variable.
    pub fn from_clauses(clauses: Vec<Clause>) -> Result<Self> {
        let var_count = clauses.iter().flatten().map(|lit| lit.unsigned_abs()).max();
        Self::new(var_count.unwrap_or(0) as usize, clauses)
    }

    /// Largest variable mentioned in a clause. The declared `var_count` is
    /// not consulted.
    pub fn max_var(&self) -> Var {
        self.clauses
            .iter()
            .flatten()
            .map(|&lit| to_var(lit))
            .max()
            .unwrap_or(0)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Solution {
    Sat { model: Vec<Lit> },
    Unsat,
    Unknown,
}
