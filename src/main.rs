use clap::{Parser as ClapParser, Subcommand};
use seltra::cli::{self, ApplyOptions, CliError, SelectOptions};
use std::fs;
use std::io::{self, Read};

#[derive(ClapParser)]
#[command(name = "seltra")]
#[command(about = "seltra - a declarative JSON-to-JSON template engine")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Apply a template to JSON data
    Apply {
        /// Path to the template JSON file
        template: String,

        /// Path to the data JSON file (reads from stdin if not provided)
        #[arg(short, long)]
        data: Option<String>,

        /// Pretty-print the output
        #[arg(short, long)]
        pretty: bool,

        /// Re-apply the template until the output stops changing
        #[arg(long)]
        fixpoint: bool,
    },

    /// Find matching entries in a JSON tree
    Select {
        /// Path to the JSON file (reads from stdin if not provided)
        input: Option<String>,

        /// Regex the entry key must match
        #[arg(short, long)]
        key: Option<String>,

        /// Regex the entry value must match
        #[arg(short, long)]
        value: Option<String>,

        /// Pretty-print the report
        #[arg(short, long)]
        pretty: bool,
    },
}

fn main() {
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Apply {
            template,
            data,
            pretty,
            fixpoint,
        } => run_apply(template, data, pretty, fixpoint),
        Commands::Select {
            input,
            key,
            value,
            pretty,
        } => run_select(input, key, value, pretty),
    };

    if let Err(e) = result {
        eprintln!("{}", e);
        std::process::exit(1);
    }
}

fn run_apply(
    template: String,
    data: Option<String>,
    pretty: bool,
    fixpoint: bool,
) -> Result<(), CliError> {
    let template = fs::read_to_string(template)?;
    let data = match data {
        Some(path) => Some(fs::read_to_string(path)?),
        None => read_stdin()?,
    };

    let options = ApplyOptions {
        template,
        data,
        pretty,
        fixpoint,
    };
    println!("{}", cli::execute_apply(&options)?);
    Ok(())
}

fn run_select(
    input: Option<String>,
    key: Option<String>,
    value: Option<String>,
    pretty: bool,
) -> Result<(), CliError> {
    let input = match input {
        Some(path) => fs::read_to_string(path)?,
        None => read_stdin()?.ok_or(CliError::NoInput)?,
    };

    let options = SelectOptions {
        input,
        key_pattern: key,
        value_pattern: value,
    };
    let report = cli::execute_select(&options)?;
    let json = if pretty {
        serde_json::to_string_pretty(&report)
    } else {
        serde_json::to_string(&report)
    }
    .map_err(CliError::Json)?;
    println!("{}", json);
    Ok(())
}

fn read_stdin() -> Result<Option<String>, CliError> {
    if atty::is(atty::Stream::Stdin) {
        return Ok(None);
    }
    let mut buffer = String::new();
    io::stdin()
        .read_to_string(&mut buffer)
        .map_err(CliError::Io)?;
    Ok(Some(buffer))
}
