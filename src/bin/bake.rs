//! bake, the BakeORM command line
//!
//! Runs table-level CRUD and finders from the command line.
//!
//! # Usage
//!
//! ```bash
//! # Show the SQL a statement would produce
//! bake sql update --table users --field name=Ann --field id=7
//!
//! # Read rows
//! bake --database-url sqlite://app.db find --table users 7
//!
//! # Paged LIKE search
//! bake search --table users --where name=ann --page 2 --per-page 20
//! ```

use std::path::PathBuf;

use anyhow::{Context, bail};
use bakeorm::prelude::*;
use clap::{Args, Parser, Subcommand, ValueEnum};
use colored::*;
use serde_json::Value;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "bake")]
#[command(version)]
#[command(about = "BakeORM command line", long_about = None)]
#[command(after_help = "EXAMPLES:
    bake sql select --table users --where role=admin --limit 10
    bake find --table users 42
    bake create --table users --field name=Ann --field role=admin
    bake raw 'SELECT COUNT(*) AS n FROM users WHERE role = :role' --bind role=admin")]
struct Cli {
    /// Database connection URL (overrides the config file)
    #[arg(long, env = "BAKE_DATABASE_URL", global = true)]
    database_url: Option<String>,

    /// Config file path
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "table", global = true)]
    format: OutputFormat,

    /// Reproduce legacy unconditional UPDATE and bulk DELETE statements
    #[arg(long, global = true)]
    legacy: bool,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, ValueEnum)]
enum OutputFormat {
    Table,
    Json,
}

#[derive(Clone, Copy, ValueEnum)]
enum DialectArg {
    Mysql,
    Sqlite,
    Postgres,
}

impl From<DialectArg> for Dialect {
    fn from(arg: DialectArg) -> Self {
        match arg {
            DialectArg::Mysql => Dialect::MySql,
            DialectArg::Sqlite => Dialect::Sqlite,
            DialectArg::Postgres => Dialect::Postgres,
        }
    }
}

#[derive(Args)]
struct TableArgs {
    /// Table name
    #[arg(short, long)]
    table: String,

    /// Primary key column
    #[arg(long, default_value = "id")]
    pk: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the SQL for a statement without connecting
    Sql {
        /// Statement kind: insert, select, search, update or delete
        kind: String,

        #[command(flatten)]
        target: TableArgs,

        /// Payload column, as name=value
        #[arg(long = "field", value_parser = parse_pair)]
        fields: Vec<(String, Value)>,

        /// Condition, as name=value
        #[arg(long = "where", value_parser = parse_pair)]
        conditions: Vec<(String, Value)>,

        /// Columns to select
        #[arg(long, value_delimiter = ',')]
        select: Vec<String>,

        #[arg(long)]
        order_by: Option<String>,

        #[arg(long)]
        limit: Option<i64>,

        #[arg(long)]
        offset: Option<i64>,

        #[arg(long, value_enum, default_value = "mysql")]
        dialect: DialectArg,
    },
    /// List every row of a table
    All {
        #[command(flatten)]
        target: TableArgs,
    },
    /// Fetch one row by primary key
    Find {
        #[command(flatten)]
        target: TableArgs,

        id: i64,
    },
    /// LIKE search, optionally paged
    Search {
        #[command(flatten)]
        target: TableArgs,

        #[arg(long = "where", value_parser = parse_pair)]
        conditions: Vec<(String, Value)>,

        #[arg(long, value_delimiter = ',')]
        select: Vec<String>,

        #[arg(long, requires = "per_page")]
        page: Option<u32>,

        #[arg(long, requires = "page")]
        per_page: Option<u32>,
    },
    /// Insert one row
    Create {
        #[command(flatten)]
        target: TableArgs,

        #[arg(long = "field", value_parser = parse_pair, required = true)]
        fields: Vec<(String, Value)>,
    },
    /// Update one row by primary key
    Update {
        #[command(flatten)]
        target: TableArgs,

        id: i64,

        #[arg(long = "field", value_parser = parse_pair, required = true)]
        fields: Vec<(String, Value)>,
    },
    /// Delete one row by primary key
    Delete {
        #[command(flatten)]
        target: TableArgs,

        id: i64,

        /// Extra condition the row must also match
        #[arg(long = "where", value_parser = parse_pair)]
        conditions: Vec<(String, Value)>,
    },
    /// Run caller-written SQL with :name parameters
    Raw {
        sql: String,

        /// Table the statement belongs to
        #[arg(short, long, default_value = "raw")]
        table: String,

        #[arg(long = "bind", value_parser = parse_pair)]
        binds: Vec<(String, Value)>,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if let Err(e) = run(cli).await {
        eprintln!("{} {:#}", "Error:".red().bold(), e);
        std::process::exit(1);
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "bakeorm=debug" } else { "bakeorm=warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let Cli {
        database_url,
        config,
        format,
        legacy,
        verbose,
        command,
    } = cli;

    let command = match command {
        Commands::Sql {
            kind,
            target,
            fields,
            conditions,
            select,
            order_by,
            limit,
            offset,
            dialect,
        } => {
            let compat = if legacy { Compat::Legacy } else { Compat::Strict };
            // A search is a select matched with LIKE.
            let search = kind.trim().eq_ignore_ascii_case("search");
            let kind = if search { "select" } else { kind.as_str() };
            let mut args = QueryArgs::from_type(target.table, kind)?
                .selectors(select)
                .conditions(conditions.into_iter().collect())
                .fields(fields.into_iter().collect())
                .primary_key(target.pk);
            if let Some(order) = order_by {
                args = args.order_by(order);
            }
            if let Some(n) = limit {
                args = args.limit(n);
            }
            if let Some(n) = offset {
                args = args.offset(n);
            }
            return print_sql(args, search, dialect.into(), compat);
        }
        other => other,
    };

    let mut settings = BakeConfig::load(config.as_deref()).context("loading configuration")?;
    settings.apply_overrides(database_url);
    if legacy {
        settings.orm.legacy_compat = true;
    }
    if verbose {
        println!("{} {}", "Driver:".dimmed(), settings.database.driver.cyan());
    }

    execute(command, &settings, &format).await
}

async fn execute(command: Commands, settings: &BakeConfig, format: &OutputFormat) -> anyhow::Result<()> {
    match command {
        Commands::Sql { .. } => bail!("sql runs without a connection"),
        Commands::All { target } => {
            let mut repo = repository(settings, &target)?;
            let rows = repo.find_all().await?;
            print_rows(&rows, format);
        }
        Commands::Find { target, id } => {
            let mut repo = repository(settings, &target)?;
            let rows: Vec<ResultRow> = repo.find(id).await?.into_iter().collect();
            print_rows(&rows, format);
        }
        Commands::Search {
            target,
            conditions,
            select,
            page,
            per_page,
        } => {
            let mut repo = repository(settings, &target)?;
            let conditions: Fields = conditions.into_iter().collect();
            let rows = match page.zip(per_page) {
                Some((page, per_page)) => {
                    repo.find_by_search_and_paging(&select, &conditions, Paging::new(page, per_page))
                        .await?
                }
                None => {
                    repo.find_by_search(&select, &conditions, &ReadOptions::default())
                        .await?
                }
            };
            print_rows(&rows, format);
        }
        Commands::Create { target, fields } => {
            let mut repo = repository(settings, &target)?;
            let fields: Fields = fields.into_iter().collect();
            let em = repo.entity_manager();
            let created = em.crud_mut().create(&fields).await?;
            let id = em.crud().last_id();
            report(created, &format!("created {} #{}", target.table, id));
        }
        Commands::Update { target, id, fields } => {
            let mut repo = repository(settings, &target)?;
            let fields: Fields = fields.into_iter().collect();
            let updated = repo.find_by_id_and_update(&fields, id).await?;
            report(updated, &format!("updated {} #{}", target.table, id));
        }
        Commands::Delete {
            target,
            id,
            conditions,
        } => {
            let mut repo = repository(settings, &target)?;
            let conditions: Fields = conditions.into_iter().collect();
            let deleted = repo.find_by_id_and_delete(&conditions, id).await?;
            report(deleted, &format!("deleted {} #{}", target.table, id));
        }
        Commands::Raw { sql, table, binds } => {
            let mut em = BakeManager::new(settings.clone(), table, "id").init()?;
            let binds: Fields = binds.into_iter().collect();
            let rows = em.crud_mut().raw_query(&sql, &binds).await?;
            print_rows(&rows, format);
        }
    }

    Ok(())
}

fn repository(settings: &BakeConfig, target: &TableArgs) -> anyhow::Result<DataRepository> {
    let repo = BakeManager::new(settings.clone(), target.table.as_str(), target.pk.as_str())
        .repository()
        .with_context(|| format!("setting up table '{}'", target.table))?;
    Ok(repo)
}

fn print_sql(args: QueryArgs, search: bool, dialect: Dialect, compat: Compat) -> anyhow::Result<()> {
    let Some(kind) = args.kind else {
        bail!("statement kind is required");
    };
    let mut bindings = args.fields.clone();
    bindings.extend(args.conditions.clone());
    bindings.extend(
        ReadOptions {
            order_by: None,
            limit: args.limit,
            offset: args.offset,
        }
        .paging_params(),
    );

    let mut qb = QueryBuilder::new().with_dialect(dialect).with_compat(compat);
    qb.build_query(args);
    let sql = match kind {
        QueryKind::Insert => qb.insert_query()?,
        QueryKind::Select if search => qb.search_query()?,
        QueryKind::Select => qb.select_query()?,
        QueryKind::Update => qb.update_query()?,
        QueryKind::Delete => qb.delete_query()?,
        QueryKind::Raw => qb.raw_query()?,
    };

    if sql.is_empty() {
        println!("{}", "(no statement: payload is empty or does not fit the kind)".yellow());
    } else {
        println!("{}", "Generated SQL:".green().bold());
        println!("{}", sql.white());

        if !bindings.is_empty() {
            println!();
            println!("{}", "Bindings:".cyan());
            for (name, value) in &bindings {
                println!("  :{} = {}", name, cell(value).yellow());
            }
        }
    }
    Ok(())
}

fn report(ok: bool, what: &str) {
    if ok {
        println!("{} {}", "✓".green(), what);
    } else {
        println!("{} {}", "✗".yellow(), "no row changed".dimmed());
    }
}

/// Parse `name=value`; integers, booleans and `null` keep their type.
fn parse_pair(input: &str) -> Result<(String, Value), String> {
    let (name, raw) = input
        .split_once('=')
        .ok_or_else(|| format!("expected name=value, got '{}'", input))?;
    let value = if let Ok(n) = raw.parse::<i64>() {
        Value::from(n)
    } else if raw == "true" || raw == "false" {
        Value::Bool(raw == "true")
    } else if raw == "null" {
        Value::Null
    } else {
        Value::String(raw.to_string())
    };
    Ok((name.to_string(), value))
}

fn print_rows(rows: &[ResultRow], format: &OutputFormat) {
    if rows.is_empty() {
        println!("{}", "(no results)".dimmed());
        return;
    }

    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(rows).unwrap_or_default());
        }
        OutputFormat::Table => {
            let mut lines = render_table(rows).into_iter();
            if let Some(header) = lines.next() {
                println!("{}", header.white().bold());
            }
            if let Some(rule) = lines.next() {
                println!("{}", rule.dimmed());
            }
            for line in lines {
                println!("{}", line);
            }
            println!();
            println!("{} row(s)", rows.len().to_string().cyan());
        }
    }
}

/// Header, rule and one line per row. Columns follow the first row and are
/// padded to their widest cell.
fn render_table(rows: &[ResultRow]) -> Vec<String> {
    let Some(first) = rows.first() else {
        return Vec::new();
    };
    let columns: Vec<&str> = first.keys().map(String::as_str).collect();
    let grid: Vec<Vec<String>> = rows
        .iter()
        .map(|row| {
            columns
                .iter()
                .map(|c| row.get(*c).map(cell).unwrap_or_default())
                .collect()
        })
        .collect();

    let widths: Vec<usize> = columns
        .iter()
        .enumerate()
        .map(|(i, name)| {
            grid.iter()
                .map(|cells| cells[i].chars().count())
                .fold(name.chars().count(), usize::max)
        })
        .collect();

    let line = |cells: Vec<&str>| -> String {
        let padded: Vec<String> = cells
            .iter()
            .zip(&widths)
            .map(|(text, width)| format!("{:width$}", text, width = *width))
            .collect();
        padded.join(" | ").trim_end().to_string()
    };

    let mut lines = Vec::with_capacity(rows.len() + 2);
    lines.push(line(columns.clone()));
    let rule: Vec<String> = widths.iter().map(|w| "-".repeat(*w)).collect();
    lines.push(rule.join("-+-"));
    for cells in &grid {
        lines.push(line(cells.iter().map(String::as_str).collect()));
    }
    lines
}

/// Display text of one value; SQL NULL for null.
fn cell(value: &Value) -> String {
    match value {
        Value::Null => "NULL".to_string(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_pair_types() {
        assert_eq!(parse_pair("id=7").unwrap(), ("id".to_string(), Value::from(7)));
        assert_eq!(parse_pair("on=true").unwrap().1, Value::Bool(true));
        assert_eq!(parse_pair("x=null").unwrap().1, Value::Null);
        assert_eq!(parse_pair("q=a=b").unwrap().1, Value::from("a=b"));
        assert!(parse_pair("noequals").is_err());
    }

    #[test]
    fn test_render_table_pads_columns() {
        let rows: Vec<ResultRow> = serde_json::from_value(serde_json::json!([
            {"id": 1, "name": "alice", "admin": true},
            {"id": 12, "name": null, "admin": false},
        ]))
        .unwrap();
        assert_eq!(
            render_table(&rows),
            vec![
                "id | name  | admin",
                "---+-------+------",
                "1  | alice | true",
                "12 | NULL  | false",
            ]
        );
        assert!(render_table(&[]).is_empty());
    }

    #[test]
    fn test_cli_parses() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }
}
