use std::io::{self, BufRead, Write};
use std::process::ExitCode;
use std::time::Duration;

use clap::{Args, Parser, Subcommand};
use miette::IntoDiagnostic;
use tracing_subscriber::EnvFilter;

use source_selector::app::Session;
use source_selector::catalog::{CatalogClient, CatalogHttpClient, filter_resources};
use source_selector::config::{ConfigLoader, ResolvedConfig};
use source_selector::domain::Provider;
use source_selector::error::SelectorError;
use source_selector::output::{CatalogListing, JsonOutput, LogSink};

#[derive(Parser)]
#[command(name = "source-selector")]
#[command(about = "Choose retrieval providers and knowledge-store resources")]
#[command(version, author)]
struct Cli {
    #[arg(long, global = true)]
    config: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    #[command(about = "List known providers")]
    Providers,
    #[command(about = "Fetch the knowledge-store resource catalog once")]
    Catalog(CatalogArgs),
    #[command(about = "Apply toggles to a session and print the resulting selection")]
    Select(SelectArgs),
    #[command(about = "Read toggle commands from stdin, one per line")]
    Shell,
}

#[derive(Args)]
struct CatalogArgs {
    #[arg(long)]
    query: Option<String>,
}

#[derive(Args)]
struct SelectArgs {
    #[arg(long = "enable", value_enum)]
    providers: Vec<Provider>,

    #[arg(long = "resource")]
    resources: Vec<String>,

    #[arg(long, default_value_t = 10)]
    wait_secs: u64,
}

fn main() -> ExitCode {
    if let Err(report) = run() {
        eprintln!("{report:?}");
        if let Some(err) = report.downcast_ref::<SelectorError>() {
            return ExitCode::from(map_exit_code(err));
        }
        return ExitCode::from(1);
    }
    ExitCode::SUCCESS
}

fn map_exit_code(error: &SelectorError) -> u8 {
    match error {
        SelectorError::InvalidProvider(_)
        | SelectorError::ConfigRead(_)
        | SelectorError::ConfigParse(_)
        | SelectorError::UnsupportedSchema(_) => 2,
        err if err.is_fetch_failure() => 3,
        _ => 1,
    }
}

fn run() -> miette::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = ConfigLoader::resolve(cli.config.as_deref())?;

    match cli.command {
        Commands::Providers => JsonOutput::print_providers().into_diagnostic(),
        Commands::Catalog(args) => run_catalog(args, &config),
        Commands::Select(args) => run_select(args, &config),
        Commands::Shell => run_shell(&config),
    }
}

fn http_client(config: &ResolvedConfig) -> Result<CatalogHttpClient, SelectorError> {
    CatalogHttpClient::new(&config.endpoint, config.timeout)
}

fn run_catalog(args: CatalogArgs, config: &ResolvedConfig) -> miette::Result<()> {
    let client = http_client(config)?;
    let resources = client.list_resources(args.query.as_deref())?;
    // Older backends ignore the query parameter.
    let resources = filter_resources(&resources, args.query.as_deref());
    JsonOutput::print_catalog(&CatalogListing {
        endpoint: &config.endpoint,
        query: args.query.as_deref(),
        resources: &resources,
    })
    .into_diagnostic()
}

fn run_select(args: SelectArgs, config: &ResolvedConfig) -> miette::Result<()> {
    let mut session = Session::from_config(http_client(config)?, config);
    session.subscribe(Box::new(LogSink));

    for provider in args.providers {
        session.toggle_provider(provider);
    }
    for uri in &args.resources {
        session.toggle_resource(uri);
    }

    if !session.settle(Duration::from_secs(args.wait_secs)) {
        tracing::warn!(wait_secs = args.wait_secs, "catalog still loading");
    }
    JsonOutput::print_snapshot(&session.snapshot()).into_diagnostic()
}

#[derive(Debug, PartialEq, Eq)]
enum ShellCommand {
    Provider(Provider),
    Resource(String),
    Poll,
    Wait(u64),
    Show,
    Quit,
}

fn parse_shell_command(input: &str) -> miette::Result<Option<ShellCommand>> {
    let parts = input.split_whitespace().collect::<Vec<_>>();
    let Some((command, rest)) = parts.split_first() else {
        return Ok(None);
    };
    let command = match *command {
        "provider" | "p" => {
            let name = rest
                .first()
                .ok_or_else(|| miette::Report::msg("provider requires a name"))?;
            ShellCommand::Provider(name.parse()?)
        }
        "resource" | "r" => {
            let uri = rest
                .first()
                .ok_or_else(|| miette::Report::msg("resource requires a uri"))?;
            ShellCommand::Resource(uri.to_string())
        }
        "poll" => ShellCommand::Poll,
        "wait" => {
            let secs = rest
                .first()
                .map(|value| value.parse::<u64>())
                .transpose()
                .into_diagnostic()?
                .unwrap_or(10);
            ShellCommand::Wait(secs)
        }
        "show" => ShellCommand::Show,
        "quit" | "exit" => ShellCommand::Quit,
        _ => return Err(miette::Report::msg(format!("unknown command: {command}"))),
    };
    Ok(Some(command))
}

fn run_shell(config: &ResolvedConfig) -> miette::Result<()> {
    let mut session = Session::from_config(http_client(config)?, config);
    session.subscribe(Box::new(LogSink));

    let stdin = io::stdin();
    let mut stdout = io::stdout();
    loop {
        write!(stdout, "> ").into_diagnostic()?;
        stdout.flush().into_diagnostic()?;

        let mut line = String::new();
        if stdin.lock().read_line(&mut line).into_diagnostic()? == 0 {
            break;
        }
        // Apply whatever finished while the user was typing.
        session.poll();

        let command = match parse_shell_command(&line) {
            Ok(Some(command)) => command,
            Ok(None) => continue,
            Err(report) => {
                eprintln!("{report}");
                continue;
            }
        };
        match command {
            ShellCommand::Provider(provider) => {
                session.toggle_provider(provider);
            }
            ShellCommand::Resource(uri) => {
                session.toggle_resource(&uri);
            }
            ShellCommand::Poll => {
                session.poll();
            }
            ShellCommand::Wait(secs) => {
                session.settle(Duration::from_secs(secs));
            }
            ShellCommand::Show => {
                JsonOutput::print_snapshot(&session.snapshot()).into_diagnostic()?;
            }
            ShellCommand::Quit => break,
        }
    }
    JsonOutput::print_snapshot(&session.snapshot()).into_diagnostic()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_shell_commands() {
        assert_eq!(
            parse_shell_command("provider mongodb").unwrap(),
            Some(ShellCommand::Provider(Provider::Mongodb))
        );
        assert_eq!(
            parse_shell_command("r mongodb://deep_flow/papers").unwrap(),
            Some(ShellCommand::Resource("mongodb://deep_flow/papers".to_string()))
        );
        assert_eq!(parse_shell_command("wait").unwrap(), Some(ShellCommand::Wait(10)));
        assert_eq!(parse_shell_command("   ").unwrap(), None);
        assert!(parse_shell_command("provider milvus").is_err());
        assert!(parse_shell_command("dance").is_err());
    }

    #[test]
    fn fetch_failures_exit_with_three() {
        assert_eq!(map_exit_code(&SelectorError::CatalogHttp("x".into())), 3);
        assert_eq!(map_exit_code(&SelectorError::InvalidProvider("x".into())), 2);
    }
}
