use clap::{Parser, Subcommand};
use stock::normalize_symbol;

/// One line typed at the prompt.
#[derive(Debug, Parser)]
#[command(multicall = true)]
struct Line {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Clone, PartialEq, Eq, Subcommand)]
pub enum Command {
    /// Fetch quotes and track the symbols (e.g. `add TSLA,MSFT`)
    Add {
        #[arg(required = true, num_args = 1..)]
        symbols: Vec<String>,
    },
    /// Show or hide a field as a table column
    Toggle { field: String },
    /// List the fields offered as columns
    Fields,
    /// Print the quote table
    Table,
    /// Write the table to StockData.xlsx
    Export,
    /// Leave the program
    #[command(alias = "exit")]
    Quit,
}

/// Parse a prompt line. Blank lines are `Ok(None)`.
///
/// `help` and malformed input come back as a clap error whose `Display` is
/// the text to show.
pub fn parse(line: &str) -> Result<Option<Command>, clap::Error> {
    let words: Vec<&str> = line.split_whitespace().collect();
    if words.is_empty() {
        return Ok(None);
    }

    Line::try_parse_from(words).map(|line| Some(line.command))
}

/// Split `add` arguments on commas and whitespace into normalized symbols.
pub fn split_symbols(args: &[String]) -> Vec<String> {
    args.iter()
        .flat_map(|arg| arg.split(','))
        .map(normalize_symbol)
        .filter(|s| !s.is_empty())
        .collect()
}
