use std::{
    fs::File,
    path::PathBuf,
    process::ExitCode,
    time::{Duration, Instant},
};

use clap::Parser;
use log::info;

use dpll_sat::{io, parallel, Solver, SolverOptions};

/// A DPLL SAT solver for DIMACS CNF files.
#[derive(Parser)]
#[command(version, about)]
struct Args {
    /// DIMACS CNF input file
    input: PathBuf,

    /// Give up and report UNKNOWN after this many seconds
    #[arg(short, long)]
    timeout: Option<u64>,

    /// Split the search over this many worker threads
    #[arg(short = 'j', long)]
    threads: Option<usize>,

    /// Fix pure literals before branching
    #[arg(long)]
    pure_literals: bool,

    /// Verbosity level (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn main() -> ExitCode {
    let args = Args::parse();

    let filter = match args.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(filter)).init();

    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("{}: {err}", args.input.display());
            ExitCode::FAILURE
        }
    }
}

fn run(args: &Args) -> dpll_sat::Result<()> {
    let mut input = File::open(&args.input)?;
    let problem = io::read_problem(&mut input)?;
    info!(
        "loaded {}: {} variables, {} clauses",
        args.input.display(),
        problem.var_count,
        problem.clauses.len()
    );

    let options = SolverOptions {
        pure_literals: args.pure_literals,
        deadline: args
            .timeout
            .map(|secs| Instant::now() + Duration::from_secs(secs)),
        interrupt: None,
    };

    let start = Instant::now();
    let solution = match args.threads {
        Some(n) => parallel::solve_with_options(problem, Some(n), options),
        None => Solver::with_options(problem, options).solve(),
    };
    info!("solved in {:.3}s", start.elapsed().as_secs_f64());

    io::write_solution(&mut std::io::stdout(), &solution)?;
    Ok(())
}
