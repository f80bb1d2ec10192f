use std::io::{BufRead, BufReader, BufWriter, Read, Write};

use log::warn;

use crate::{
    error::{Error, Result},
    types::{Formula, Lit, Solution},
};

fn parse_header(line: &str) -> Result<(usize, usize)> {
    let malformed = || Error::MalformedHeader(line.to_string());

    let parts: Vec<&str> = line.split_whitespace().collect();
    match parts[..] {
        ["p", "cnf", vars, clauses] => Ok((
            vars.parse().map_err(|_| malformed())?,
            clauses.parse().map_err(|_| malformed())?,
        )),
        _ => Err(malformed()),
    }
}

/// Reads a DIMACS CNF problem, one clause per line.
pub fn read_problem(reader: &mut impl Read) -> Result<Formula> {
    let mut header = None;
    let mut clauses = vec![];

    for (i, line) in BufReader::new(reader).lines().enumerate() {
        let line = line?;
        let line = line.trim();

        if line.is_empty() || line.starts_with('c') || line.starts_with('%') {
            // comment line
            continue;
        }

        if line.starts_with('p') {
            header = Some(parse_header(line)?);
            continue;
        }

        if header.is_none() {
            return Err(Error::MissingHeader);
        }

        let mut clause = line
            .split_whitespace()
            .map(|word| {
                word.parse::<Lit>().map_err(|_| Error::InvalidToken {
                    line: i + 1,
                    token: word.to_string(),
                })
            })
            .collect::<Result<Vec<Lit>>>()?;

        if clause == [0] {
            continue;
        }
        if clause.last() == Some(&0) {
            clause.pop();
        }
        if clause.contains(&0) {
            return Err(Error::InvalidLiteral {
                clause: clauses.len(),
                lit: 0,
            });
        }
        clauses.push(clause);
    }

    let (var_count, clause_count) = header.ok_or(Error::MissingHeader)?;
    if clause_count != clauses.len() {
        warn!(
            "header announces {clause_count} clauses, found {}",
            clauses.len()
        );
    }

    Formula::new(var_count, clauses)
}

pub fn write_solution(writer: &mut impl Write, solution: &Solution) -> std::io::Result<()> {
    let mut writer = BufWriter::new(writer);
    writeln!(writer, "c Solved by dpll-sat.")?;

    let solution_str = match solution {
        Solution::Sat { .. } => "SATISFIABLE",
        Solution::Unsat => "UNSATISFIABLE",
        Solution::Unknown => "UNKNOWN",
    };
    writeln!(writer, "s {solution_str}")?;

    if let Solution::Sat { model } = solution {
        const PER_LINE: usize = 10;
        for chunk in model.chunks(PER_LINE) {
            let chunk_str = chunk
                .iter()
                .fold(String::new(), |str, lit| str + &lit.to_string() + " ");
            writeln!(writer, "v {chunk_str}")?;
        }
        writeln!(writer, "v 0")?;
    }

    writer.flush()
}
