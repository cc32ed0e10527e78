use chrono::{DateTime, Utc};
use clap::Parser;
use colored::*;
use jsonfile_proxy::commands::{self, CmdMessage, CmdResult, FileFormat, MessageLevel, StatusReport};
use jsonfile_proxy::error::{ProxyError, Result};
use jsonfile_proxy::{JsonFileProxy, ProxyConfig};
use tracing_subscriber::EnvFilter;

mod args;
use args::{Cli, Commands, TargetArgs};

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    if let Err(e) = run(cli) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn init_logging(verbose: bool) {
    let default_filter = if verbose { "debug" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(verbose)
        .with_writer(std::io::stderr)
        .init();
}

fn run(cli: Cli) -> Result<()> {
    let result = match cli.command {
        Commands::Status { target } => commands::status::run(&open(&target)?)?,
        Commands::Show { target } => commands::show::run(&open(&target)?)?,
        Commands::Encrypt { target } => {
            let keyed = open_keyed(&target)?;
            commands::convert::run(&keyed, &keyed)?
        }
        Commands::Decrypt { target } => {
            let keyed = open_keyed(&target)?;
            let plain = JsonFileProxy::new(keyed.target().full_path())?;
            commands::convert::run(&keyed, &plain)?
        }
        Commands::Unlock { target } => commands::unlock::run(&open(&target)?)?,
    };

    print_result(&result)
}

fn load_config(args: &TargetArgs) -> Result<ProxyConfig> {
    let mut config = match (&args.config, &args.path) {
        (Some(file), path) => {
            let mut config = ProxyConfig::load(file)?;
            if let Some(path) = path {
                config.directory = path.clone();
            }
            config
        }
        (None, Some(path)) => ProxyConfig::from(path),
        (None, None) => {
            return Err(ProxyError::Configuration(
                "No database configuration detected.".to_string(),
            ))
        }
    };

    if let Some(key) = &args.key {
        config.encryption_key = Some(key.clone());
    }
    Ok(config)
}

fn open(args: &TargetArgs) -> Result<JsonFileProxy> {
    JsonFileProxy::new(load_config(args)?)
}

fn open_keyed(args: &TargetArgs) -> Result<JsonFileProxy> {
    let proxy = open(args)?;
    if !proxy.is_encrypted() {
        return Err(ProxyError::Configuration(
            "An encryption key is required (use --key or encryptionKey in --config)".to_string(),
        ));
    }
    Ok(proxy)
}

fn print_result(result: &CmdResult) -> Result<()> {
    if let Some(status) = &result.status {
        print_status(status);
    }
    if let Some(envelope) = &result.envelope {
        println!("{}", serde_json::to_string_pretty(&envelope.data)?);
    }
    print_messages(&result.messages);
    Ok(())
}

fn print_status(status: &StatusReport) {
    println!("{:>9} {}", "file:".dimmed(), status.path.display());

    let format = match status.format {
        FileFormat::Missing => status.format.to_string().yellow(),
        FileFormat::Encrypted => status.format.to_string().cyan(),
        _ => status.format.to_string().normal(),
    };
    println!("{:>9} {}", "format:".dimmed(), format);

    if status.format != FileFormat::Missing {
        println!("{:>9} {} bytes", "size:".dimmed(), status.size);
    }
    if let Some(modified) = status.modified {
        println!("{:>9} {}", "modified:".dimmed(), ago(modified));
    }

    match &status.lock_owner {
        Some(owner) => {
            let since = status
                .locked_since
                .map(|t| format!(" since {}", ago(t)))
                .unwrap_or_default();
            println!(
                "{:>9} {}{}",
                "lock:".dimmed(),
                format!("held by process {}", owner).red(),
                since
            );
        }
        None => println!("{:>9} {}", "lock:".dimmed(), "unlocked".green()),
    }
}

fn ago(timestamp: DateTime<Utc>) -> String {
    let elapsed = (Utc::now() - timestamp).to_std().unwrap_or_default();
    timeago::Formatter::new().convert(elapsed)
}

fn print_messages(messages: &[CmdMessage]) {
    for msg in messages {
        match msg.level {
            MessageLevel::Info => println!("{}", msg.content),
            MessageLevel::Success => println!("{}", msg.content.green()),
            MessageLevel::Warning => println!("{}", msg.content.yellow()),
        }
    }
}
