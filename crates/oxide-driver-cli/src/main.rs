//! oxide-driver CLI
//!
//! Splits SQL scripts into statements and renders SQL from JSON requests,
//! without connecting to a database.

mod error;
mod request;
mod split;

use std::fs::File;
use std::io::{self, BufWriter, Read, Write};
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use oxide_driver::{dialect_for, Dialect, Grammar, SplitPolicy};
use tracing::{debug, info, Level};
use tracing_subscriber::FmtSubscriber;

use crate::request::RenderFile;
use crate::split::{split_reader, to_script, CHUNK_SIZE};

/// Multi-dialect SQL script splitter and statement renderer.
#[derive(Parser)]
#[command(name = "oxide-driver")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// SQL dialect (mysql, mariadb, pgsql, sqlite, mssql, generic).
    #[arg(short, long, env = "OXIDE_DIALECT", default_value = "mysql")]
    dialect: String,

    /// Enable verbose output.
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Split a script into statements.
    Split {
        /// Script file, `-` for standard input.
        #[arg(default_value = "-")]
        input: PathBuf,

        /// Print one JSON object per statement.
        #[arg(long)]
        json: bool,

        /// Stop after this many statements.
        #[arg(short, long)]
        limit: Option<usize>,
    },

    /// Render SQL from a JSON request file.
    Render {
        /// Request file, `-` for standard input.
        #[arg(default_value = "-")]
        request: PathBuf,
    },
}

fn open_input(path: &Path) -> io::Result<Box<dyn Read>> {
    if path == Path::new("-") {
        Ok(Box::new(io::stdin()))
    } else {
        Ok(Box::new(File::open(path)?))
    }
}

fn run_split<W: Write>(
    dialect: &dyn Dialect,
    input: &Path,
    json: bool,
    limit: Option<usize>,
    out: &mut W,
) -> error::Result<usize> {
    let mut policy = SplitPolicy::new();
    if let Some(limit) = limit {
        policy = policy.limit(limit);
    }
    let reader = open_input(input)?;
    split_reader(dialect, reader, policy, CHUNK_SIZE, |statement| {
        debug!(number = statement.number, sql = %statement.sql, "Split statement");
        if json {
            serde_json::to_writer(&mut *out, statement)?;
            writeln!(out)?;
        } else {
            out.write_all(to_script(statement).as_bytes())?;
        }
        Ok(())
    })
}

fn run_render<W: Write>(
    dialect: Box<dyn Dialect>,
    request: &Path,
    out: &mut W,
) -> error::Result<usize> {
    let mut json = String::new();
    open_input(request)?.read_to_string(&mut json)?;
    let file = RenderFile::from_json(&json)?;
    let grammar = Grammar::from_boxed(dialect).with_session(file.session);
    for request in &file.requests {
        debug!(kind = request.kind(), "Rendering request");
        let sql = request.render(&grammar)?;
        writeln!(out, "{sql};")?;
    }
    Ok(file.requests.len())
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup logging
    let log_level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_writer(io::stderr)
        .with_target(false)
        .without_time()
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let dialect = dialect_for(&cli.dialect)?;
    let stdout = io::stdout();
    let mut out = BufWriter::new(stdout.lock());

    match cli.command {
        Commands::Split { input, json, limit } => {
            let count = run_split(dialect.as_ref(), &input, json, limit, &mut out)?;
            out.flush()?;
            info!("{count} statement(s) in {}", input.display());
        }

        Commands::Render { request } => {
            let count = run_render(dialect, &request, &mut out)?;
            out.flush()?;
            info!("Rendered {count} statement(s)");
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use oxide_driver::dialect::{MySqlDialect, PostgresDialect};
    use oxide_driver::Statement;
    use tempfile::NamedTempFile;

    fn temp_file(contents: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file.flush().unwrap();
        file
    }

    #[test]
    fn test_cli_parses_split() {
        let cli =
            Cli::try_parse_from(["oxide-driver", "-d", "pgsql", "split", "dump.sql", "--json"])
                .unwrap();
        assert_eq!(cli.dialect, "pgsql");
        match cli.command {
            Commands::Split { input, json, limit } => {
                assert_eq!(input, PathBuf::from("dump.sql"));
                assert!(json);
                assert_eq!(limit, None);
            }
            Commands::Render { .. } => panic!("expected split"),
        }
    }

    #[test]
    fn test_split_file_as_script() {
        let file = temp_file("DELIMITER //\nCREATE TRIGGER t BEFORE INSERT ON x FOR EACH ROW BEGIN SET NEW.a = 1; END//\nDELIMITER ;\nSELECT 1;\n");
        let mut out = Vec::new();
        let count = run_split(&MySqlDialect::new(), file.path(), false, None, &mut out).unwrap();
        assert_eq!(count, 2);
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "DELIMITER //\nCREATE TRIGGER t BEFORE INSERT ON x FOR EACH ROW BEGIN SET NEW.a = 1; END//\nDELIMITER ;\nSELECT 1;\n"
        );
    }

    #[test]
    fn test_split_file_as_json_lines() {
        let file = temp_file("SELECT $$a;b$$;\nSELECT 2");
        let mut out = Vec::new();
        let count = run_split(&PostgresDialect::new(), file.path(), true, None, &mut out).unwrap();
        assert_eq!(count, 2);
        let text = String::from_utf8(out).unwrap();
        let statements: Vec<Statement> = text
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect();
        assert_eq!(statements[0].sql, "SELECT $$a;b$$");
        assert_eq!(statements[1].sql, "\nSELECT 2");
        assert_eq!(statements[1].number, 2);
    }

    #[test]
    fn test_split_missing_file() {
        let mut out = Vec::new();
        let err = run_split(
            &MySqlDialect::new(),
            Path::new("/nonexistent/dump.sql"),
            false,
            None,
            &mut out,
        )
        .unwrap_err();
        assert!(matches!(err, error::CliError::Io(_)));
    }

    #[test]
    fn test_render_file() {
        let file = temp_file(
            r#"{
                "session": { "database": "shop" },
                "requests": [
                    { "kind": "insert", "table": "t" },
                    { "kind": "delete", "table": "t", "filter": "`id` = 1", "limit_one": true }
                ]
            }"#,
        );
        let mut out = Vec::new();
        let count = run_render(Box::new(MySqlDialect::new()), file.path(), &mut out).unwrap();
        assert_eq!(count, 2);
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "INSERT INTO `t` () VALUES ();\nDELETE FROM `t` WHERE `id` = 1 LIMIT 1;\n"
        );
    }
}
