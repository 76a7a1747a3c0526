use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use itertools::Itertools;
use rustyline::{error::ReadlineError, Editor};
use structopt::StructOpt;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use querybridge::{
    compile,
    eval::{self, FactBase},
    parse_facts, parse_query, parse_schema, read_source, CompileOptions, Program, Schema,
};

/// Translate GraphQL queries into Datalog rule programs.
#[derive(Debug, StructOpt)]
#[structopt(name = "querybridge")]
struct Opt {
    /// GraphQL schema file
    #[structopt(parse(from_os_str))]
    schema: PathBuf,

    /// GraphQL query file (not needed with --interactive)
    #[structopt(parse(from_os_str), required_unless = "interactive")]
    query: Option<PathBuf>,

    /// Also write the generated program to this file
    #[structopt(parse(from_os_str))]
    output: Option<PathBuf>,

    /// Apply the demand transformation
    #[structopt(short, long)]
    demand: bool,

    /// Argument that names an object outright (repeatable, replaces the
    /// default id/name/key/slug/code)
    #[structopt(long = "identity-arg", number_of_values = 1)]
    identity_args: Vec<String>,

    /// Evaluate the program over this fact file and print the answers as
    /// comments after it
    #[structopt(long, parse(from_os_str))]
    facts: Option<PathBuf>,

    /// Read one query per line from a prompt
    #[structopt(short, long)]
    interactive: bool,

    /// Log more on stderr (-v, -vv, -vvv); RUST_LOG takes precedence
    #[structopt(short, long, parse(from_occurrences))]
    verbose: u8,
}

impl Opt {
    fn compile_options(&self) -> CompileOptions {
        let mut options = CompileOptions::with_demand(self.demand);
        if !self.identity_args.is_empty() {
            options.identity_arguments = self.identity_args.clone();
        }
        options
    }
}

fn init_tracing(verbose: u8) {
    let fallback = match verbose {
        0 => "querybridge=warn",
        1 => "querybridge=info",
        2 => "querybridge=debug",
        _ => "querybridge=trace",
    };

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| fallback.into()))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn load_facts(path: &Path) -> Result<FactBase> {
    let atoms = read_source(path, parse_facts)?;
    let facts = FactBase::from_atoms(&atoms)?;
    info!(path = %path.display(), facts = facts.len(), "loaded facts");
    Ok(facts)
}

/// The `ans` tuples as `%` comment lines, so the output stays a valid
/// program.
fn answer_comments(program: &Program, facts: &FactBase) -> Result<String> {
    let answers = eval::answers(program, facts)?;

    let mut s = format!("% {} answer(s)\n", answers.len());
    for tuple in answers {
        s.push_str(&format!(
            "% ans({})\n",
            tuple.iter().map(|literal| literal.to_datalog()).join(", ")
        ));
    }
    Ok(s)
}

fn handle_input(
    schema: &Schema,
    options: &CompileOptions,
    facts: Option<&FactBase>,
    code: &str,
) -> Result<String> {
    let query = parse_query(code)?;
    let program = compile(schema, &query, options)?;

    let mut text = program.to_datalog();
    if let Some(facts) = facts {
        text.push_str(&answer_comments(&program, facts)?);
    }
    Ok(text)
}

fn repl(schema: &Schema, mut options: CompileOptions, facts: Option<&FactBase>) -> Result<()> {
    // TODO: save/restore readline history
    let mut editor = Editor::<()>::new();

    loop {
        let readline = editor.readline("> ");
        match readline {
            Ok(line) => {
                editor.add_history_entry(line.as_str());

                let line = line.trim();
                if line.is_empty() {
                    continue;
                }
                if line == ":demand" {
                    options.apply_demand = !options.apply_demand;
                    println!(
                        "demand transformation {}",
                        if options.apply_demand { "on" } else { "off" }
                    );
                    continue;
                }

                match handle_input(schema, &options, facts, line) {
                    Ok(text) => print!("{}", text),
                    Err(e) => println!("Error: {}", e),
                }
            }
            Err(ReadlineError::Interrupted) => break,
            Err(ReadlineError::Eof) => break,
            Err(err) => {
                println!("Error: {}", err);
                break;
            }
        }
    }

    Ok(())
}

fn main() -> Result<()> {
    let opt = Opt::from_args();
    init_tracing(opt.verbose);

    let options = opt.compile_options();
    let schema = read_source(&opt.schema, parse_schema)?;
    let facts = opt.facts.as_deref().map(load_facts).transpose()?;

    if opt.interactive {
        return repl(&schema, options, facts.as_ref());
    }

    let query_path = opt.query.as_deref().context("no query file given")?;
    let query = read_source(query_path, parse_query)?;
    let program = compile(&schema, &query, &options)?;
    let text = program.to_datalog();

    print!("{}", text);
    if let Some(output) = &opt.output {
        std::fs::write(output, &text)
            .with_context(|| format!("failed to write {}", output.display()))?;
        info!(path = %output.display(), "wrote program");
    }
    if let Some(facts) = &facts {
        print!("{}", answer_comments(&program, facts)?);
    }

    Ok(())
}
