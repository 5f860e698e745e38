//! # sitedb command line
//!
//! Local tooling around the engine.
//!
//! ## Usage
//!
//! ```bash
//! # Two-site walkthrough on the centralized communicator
//! cargo run --bin sitedb -- demo
//!
//! # Evaluate an XML query against CSV tables
//! cargo run --bin sitedb -- eval --table A=data/a.csv --query query.xml
//!
//! # Render an XML query as a Graphviz graph
//! cargo run --bin sitedb -- graphviz --query query.xml | dot -Tpng > query.png
//! ```

use std::path::{Path, PathBuf};

use anyhow::{bail, Context};
use clap::{Parser, Subcommand, ValueEnum};
use tracing::warn;

use sitedb::condition::Condition;
use sitedb::distributed::{CentralizedCommunicator, QueryPlan, QueryProcessor};
use sitedb::logging::init_tracing;
use sitedb::protocol::{xml, WireTable};
use sitedb::storage::{load_table, parse_table};
use sitedb::value::{Attribute, Schema, Value};
use sitedb::{graphviz, Config, Engine, Relation, VariableTable};

#[derive(Parser)]
#[clap(name = "sitedb", version, about = "Distributed relational-algebra engine")]
struct Arguments {
    /// Configuration file; defaults to sitedb.toml and sitedb.local.toml.
    #[clap(short, long, global = true)]
    config: Option<PathBuf>,

    #[clap(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the built-in two-site example.
    Demo,
    /// Evaluate an XML query against tables loaded from CSV.
    Eval {
        /// Table to host, as NAME=PATH. May be repeated.
        #[clap(short, long = "table", value_parser = parse_table_arg)]
        tables: Vec<(String, PathBuf)>,
        /// XML query file.
        #[clap(short, long)]
        query: PathBuf,
        #[clap(short, long, value_enum, default_value_t = OutputFormat::Table)]
        format: OutputFormat,
    },
    /// Print the Graphviz form of an XML query.
    Graphviz {
        #[clap(short, long)]
        query: PathBuf,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum OutputFormat {
    Table,
    Xml,
    Json,
}

fn parse_table_arg(arg: &str) -> Result<(String, PathBuf), String> {
    match arg.split_once('=') {
        Some((name, path)) if !name.is_empty() && !path.is_empty() => Ok((name.to_owned(), PathBuf::from(path))),
        _ => Err(format!("expected NAME=PATH, got '{arg}'")),
    }
}

fn main() -> anyhow::Result<()> {
    let args = Arguments::parse();
    let config = Config::resolve(args.config.as_deref())?;
    init_tracing(&config.logging);

    match args.command {
        Command::Demo => demo(&config),
        Command::Eval { tables, query, format } => eval(&config, tables, &query, format),
        Command::Graphviz { query } => {
            let text = std::fs::read_to_string(&query).with_context(|| format!("reading {}", query.display()))?;
            print!("{}", graphviz::to_dot(&xml::parse(&text)?));
            Ok(())
        }
    }
}

fn eval(config: &Config, tables: Vec<(String, PathBuf)>, query: &Path, format: OutputFormat) -> anyhow::Result<()> {
    let mut engine = Engine::new(config.engine.site.clone());
    for (name, path) in config.engine.tables.iter().map(|(n, p)| (n.clone(), p.clone())).chain(tables) {
        let table = load_table(&name, &path).with_context(|| format!("loading table {name}"))?;
        engine.put_relation(name, table);
    }

    let text = std::fs::read_to_string(query).with_context(|| format!("reading {}", query.display()))?;
    let result = engine.evaluate_xml(&text)?;
    match format {
        OutputFormat::Table => print!("{result}"),
        OutputFormat::Xml => print!("{}", xml::to_xml_string(&result.into())),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&WireTable::from(&result))?),
    }
    Ok(())
}

const DEMO_ROWS: &str = "a,b,c\n0,0,0\n1,3,4\n0,1,1\n0,2,3\n1,2,3";

/// Local algebra first, then one plan split over two sites: Site 1 ships
/// its copy of `A` to Site 2, which unions it with its own `B`.
fn demo(config: &Config) -> anyhow::Result<()> {
    let a = parse_table("A", DEMO_ROWS)?;
    let b = parse_table("B", DEMO_ROWS)?;

    let selection = Relation::selection(
        Condition::or(vec![
            Condition::equals(Attribute::parse("A.a"), Value::from("0")),
            Condition::equals(Attribute::parse("A.c"), Value::from("4")),
        ]),
        a.clone(),
    );
    let projection = Relation::projection(Schema::parse("A.a"), selection);
    let query = Relation::product(vec![
        Relation::renaming([(Attribute::parse("A.a"), Attribute::parse("A.z"))], projection.clone()),
        b.clone().into(),
    ]);
    println!("{query}");
    println!("{}", xml::to_xml_string(&projection));
    println!("{}", graphviz::to_dot(&query));

    let mut site_1 = Engine::new("Site 1");
    site_1.put_relation("A", a);
    let mut site_2 = Engine::new("Site 2");
    site_2.put_relation("B", b);

    let communicator = CentralizedCommunicator::from_config(config);
    communicator.add_site(site_1);
    communicator.add_site(site_2);

    let mut plan = QueryPlan::new();
    plan.add("Site 1", VariableTable::wrapping("alpha", "Site 2", VariableTable::new("A")).into());
    plan.add(
        "Site 2",
        Relation::union(vec![
            VariableTable::at("alpha", "Site 1").into(),
            VariableTable::at("B", "Site 2").into(),
        ]),
    );

    let mut processor = communicator.query_processor(plan);
    processor.run()?;
    match processor.result() {
        Some(result) => print!("{result}"),
        None => bail!("plan produced no result"),
    }
    if let Some(outcome) = processor.outcome() {
        println!("settled after {} rounds", outcome.rounds());
    } else {
        warn!("no outcome recorded");
    }
    Ok(())
}
