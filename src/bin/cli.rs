//! ClutchDB - Interactive console

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;
use tracing_subscriber::EnvFilter;

use clutchdb::sql::determine_statement;
use clutchdb::{EngineConfig, QueryDispatcher, QueryResult};

const PROMPT: &str = "clutchdb> ";

/// Command line options
#[derive(Debug, Default)]
struct Options {
    data_dir: Option<PathBuf>,
    config: Option<PathBuf>,
}

impl Options {
    fn parse(mut args: impl Iterator<Item = String>) -> Result<Self> {
        let mut options = Options::default();
        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--data-dir" => {
                    let value = args.next().context("--data-dir needs a path")?;
                    options.data_dir = Some(PathBuf::from(value));
                }
                "--config" => {
                    let value = args.next().context("--config needs a path")?;
                    options.config = Some(PathBuf::from(value));
                }
                other => bail!("unknown argument '{}'", other),
            }
        }
        Ok(options)
    }

    fn engine_config(&self) -> Result<EngineConfig> {
        let mut config = match &self.config {
            Some(path) => EngineConfig::load(path)
                .with_context(|| format!("failed to load config {}", path.display()))?,
            None => EngineConfig::default(),
        };
        if let Some(data_dir) = &self.data_dir {
            config = config.data_dir(data_dir);
        }
        Ok(config)
    }
}

/// Format query results as a table
fn format_results(result: &QueryResult) -> String {
    let mut widths: Vec<usize> = result.columns.iter().map(|c| c.len()).collect();
    for row in &result.rows {
        for (width, value) in widths.iter_mut().zip(row) {
            *width = (*width).max(value.len());
        }
    }

    let separator: String = widths
        .iter()
        .map(|w| "-".repeat(*w + 2))
        .collect::<Vec<_>>()
        .join("+");
    let separator = format!("+{}+\n", separator);

    let mut output = separator.clone();
    let header: String = result
        .columns
        .iter()
        .zip(&widths)
        .map(|(c, w)| format!(" {:^width$} ", c, width = *w))
        .collect::<Vec<_>>()
        .join("|");
    output.push_str(&format!("|{}|\n", header));
    output.push_str(&separator);

    for row in &result.rows {
        let line: String = row
            .iter()
            .zip(&widths)
            .map(|(v, w)| format!(" {:<width$} ", v, width = *w))
            .collect::<Vec<_>>()
            .join("|");
        output.push_str(&format!("|{}|\n", line));
    }
    if !result.rows.is_empty() {
        output.push_str(&separator);
    }

    output.push_str(&format!("{} row(s) returned\n", result.rows.len()));
    output
}

/// `EXIT` in any letter case ends the session
fn is_exit(line: &str) -> bool {
    line.eq_ignore_ascii_case("EXIT")
}

/// Parse, echo and execute one line
async fn run_line(db: &QueryDispatcher, line: &str) {
    let statement = match determine_statement(line) {
        Ok(statement) => statement,
        Err(e) => {
            eprintln!("{}", e);
            return;
        }
    };

    println!(
        "This is a(n) {} query: {}",
        statement.kind_name(),
        statement.source_text()
    );

    match db.execute_statement_when_free(&statement).await {
        Ok(result) => {
            if !result.columns.is_empty() {
                print!("{}", format_results(&result));
            } else if let Some(message) = result.message {
                println!("{}", message);
            }
        }
        Err(e) => eprintln!("{}", e),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("clutchdb=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let options = Options::parse(std::env::args().skip(1))?;
    let config = options.engine_config()?;
    let db = QueryDispatcher::open(config.clone())
        .with_context(|| format!("failed to open {}", config.data_dir.display()))?;

    let mut editor = DefaultEditor::new().context("failed to initialize line editor")?;
    println!("ClutchDB console. Type EXIT to quit.");

    loop {
        match editor.readline(PROMPT) {
            Ok(line) => {
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }
                if is_exit(line) {
                    break;
                }
                let _ = editor.add_history_entry(line);
                run_line(&db, line).await;
            }
            Err(ReadlineError::Interrupted) => println!("^C"),
            Err(ReadlineError::Eof) => break,
            Err(e) => return Err(e).context("failed to read input"),
        }
    }

    println!("Bye");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> impl Iterator<Item = String> {
        list.iter()
            .map(|s| s.to_string())
            .collect::<Vec<_>>()
            .into_iter()
    }

    #[test]
    fn test_parse_options() {
        let options = Options::parse(args(&["--data-dir", "/tmp/x"])).unwrap();
        assert_eq!(options.data_dir, Some(PathBuf::from("/tmp/x")));
        assert!(options.config.is_none());

        assert!(Options::parse(args(&["--data-dir"])).is_err());
        assert!(Options::parse(args(&["--verbose"])).is_err());
    }

    #[test]
    fn test_exit_ignores_case() {
        assert!(is_exit("EXIT"));
        assert!(is_exit("exit"));
        assert!(is_exit("Exit"));
        assert!(!is_exit("EXIT;"));
        assert!(!is_exit("SELECT a FROM exit"));
    }

    #[test]
    fn test_format_results() {
        let result = QueryResult::with_rows(
            vec!["id".to_string(), "name".to_string()],
            vec![vec!["1".to_string(), "Ann".to_string()]],
        );
        let text = format_results(&result);
        assert!(text.contains("| 1  | Ann  |"));
        assert!(text.ends_with("1 row(s) returned\n"));
    }
}
