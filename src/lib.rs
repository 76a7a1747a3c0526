//! Compiles nested field-selection queries into rule programs, optionally
//! applying a demand (magic-sets) rewrite that keeps bottom-up evaluation to
//! the facts reachable from the query's literal arguments.

use std::path::Path;

use tracing::debug;

pub mod adornment;
pub mod answer;
pub mod ast;
pub mod demand;
pub mod error;
pub mod eval;
pub mod generator;
pub mod options;
pub mod parser;
pub mod printer;
pub mod program;
pub mod schema;


pub use ast::{Literal, QueryField};
pub use error::{Error, Result};
pub use options::CompileOptions;
pub use parser::{parse_facts, parse_query, parse_schema};
pub use program::Program;
pub use schema::Schema;

/// Lowers `fields` against `schema`, applies the demand rewrite if asked
/// to, and closes the program with its `ans` rule. Every piece of state
/// lives in this call.
pub fn compile(schema: &Schema, fields: &[QueryField], options: &CompileOptions) -> Result<Program> {
    let lowered = generator::generate(schema, fields, options)?;

    let mut program = if options.apply_demand {
        demand::transform(&lowered.program, &lowered.fields)
    } else {
        lowered.program
    };

    let ans = answer::assemble(&program, &lowered.fields)?;
    program.rules.push(ans);

    debug!(
        demand = options.apply_demand,
        facts = program.facts.len(),
        rules = program.rules.len(),
        "compiled query"
    );
    Ok(program)
}

pub fn translate(schema: &Schema, fields: &[QueryField], options: &CompileOptions) -> Result<String> {
    Ok(printer::print(&compile(schema, fields, options)?))
}

/// Reads and parses a schema file and a query file, then translates.
pub fn translate_files(
    schema_path: impl AsRef<Path>,
    query_path: impl AsRef<Path>,
    options: &CompileOptions,
) -> Result<String> {
    let schema = read_source(schema_path.as_ref(), parse_schema)?;
    let query = read_source(query_path.as_ref(), parse_query)?;
    translate(&schema, &query, options)
}

/// Reads `path` and parses it with `parse`, naming the file in any error.
pub fn read_source<T>(path: &Path, parse: impl FnOnce(&str) -> Result<T>) -> Result<T> {
    let code = std::fs::read_to_string(path).map_err(|source| Error::Io {
        path: path.to_owned(),
        source,
    })?;

    parse(&code).map_err(|e| match e {
        Error::Parse { message, .. } => Error::Parse {
            source_name: path.display().to_string(),
            message,
        },
        e => e,
    })
}
