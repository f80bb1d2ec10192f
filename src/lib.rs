pub mod error;
pub mod io;
pub mod parallel;
pub mod solver;
pub mod types;

pub use error::{Error, Result};
pub use solver::{verify, Solver, SolverOptions};
pub use types::{Formula, Lit, Solution};
