//! KLF-200 bridge CLI.

use std::time::SystemTime;

use clap::Parser;
use colored::Colorize;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::signal;
use tokio::sync::broadcast;

use klf200_bridge::cli::*;
use klf200_bridge::config::{init_logging, Config};
use klf200_bridge::datagram::Datagram;
use klf200_bridge::error::{Error, Result};
use klf200_bridge::gateway::{GatewayEvent, VeluxGateway};
use klf200_bridge::position::{raw_to_percent, PercentRange};
use klf200_bridge::protocol::decode_frame;
use klf200_bridge::telegram::{Parameter, Telegram};
use klf200_bridge::VERSION;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Load config if specified
    let mut config = if let Some(ref path) = cli.config {
        Config::load(path)?
    } else if Config::default_path().exists() {
        Config::load(Config::default_path())?
    } else {
        Config::default()
    };

    // Command line wins over the configuration file
    if let Some(ref level) = cli.log_level {
        config.logging.level.clone_from(level);
    }
    if let Some(format) = cli.log_format {
        config.logging.format = format.as_str().into();
    }
    if cli.no_color {
        config.logging.color = false;
        colored::control::set_override(false);
    }
    init_logging(&config.logging)?;

    match cli.command {
        Commands::Run(args) => run_bridge(args, config).await,
        Commands::Parse(args) => run_parse(&args),
        Commands::Frame(args) => run_frame(&args),
        Commands::Config(args) => run_config(&args),
        Commands::Completions(args) => run_completions(&args),
    }
}

/// Bridge telegrams between stdin/stdout and the gateway
async fn run_bridge(args: RunArgs, mut config: Config) -> Result<()> {
    if let Some(host) = args.host {
        config.gateway.host = host;
    }
    if let Some(password) = args.password {
        config.gateway.password = password;
    }
    if let Some(certificate) = args.certificate {
        config.gateway.certificate = Some(certificate);
        config.gateway.issuer = None;
    }
    if let Some(issuer) = args.issuer {
        config.gateway.issuer = Some(issuer);
        config.gateway.certificate = None;
    }
    config.validate()?;

    println!(
        "{} klf200-bridge {} → {}:{}",
        "●".green(),
        VERSION,
        config.gateway.host.cyan(),
        config.gateway.port
    );
    println!(
        "  Type telegrams, or {} {} {} {} {}. Press Ctrl+C to stop.",
        ":state".cyan(),
        ":ping".cyan(),
        ":clock".cyan(),
        ":reconnect".cyan(),
        ":reboot".cyan()
    );

    let gateway = VeluxGateway::start(&config)?;
    let mut events = gateway.subscribe();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        tokio::select! {
            _ = signal::ctrl_c() => {
                println!();
                println!("{} Shutting down...", "→".cyan());
                break;
            }

            event = events.recv() => match event {
                Ok(event) => print_event(&event, args.heartbeats),
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    println!("{} {} events dropped", "!".yellow(), n);
                }
                Err(broadcast::error::RecvError::Closed) => break,
            },

            line = lines.next_line() => match line? {
                Some(line) => handle_line(&gateway, line.trim()),
                None => break,
            },
        }
    }

    gateway.shutdown().await;
    Ok(())
}

/// Execute one line of host input
fn handle_line(gateway: &VeluxGateway, line: &str) {
    let result = match line {
        "" => Ok(()),
        ":state" => gateway.request_state(),
        ":ping" => gateway.keep_alive(),
        ":clock" => gateway.set_clock(SystemTime::now()),
        ":reconnect" => {
            gateway.reconnect();
            Ok(())
        }
        ":reboot" => {
            gateway.request_reboot();
            Ok(())
        }
        telegram => {
            gateway.send_text(telegram);
            Ok(())
        }
    };

    if let Err(e) = result {
        print_event(&GatewayEvent::Error(e.to_event_text()), false);
    }
}

fn print_event(event: &GatewayEvent, heartbeats: bool) {
    match event {
        GatewayEvent::Heartbeat if heartbeats => println!("{}", "♥".magenta()),
        GatewayEvent::Heartbeat => {}
        GatewayEvent::Response(telegram) => println!("{} {}", "←".green(), telegram),
        GatewayEvent::Info(text) => println!("{} {}", "i".cyan(), text),
        GatewayEvent::Error(text) => println!("{} {}", "✗".red(), text.red()),
        GatewayEvent::State(state) => println!("{} {}", "●".yellow(), state.to_string().bold()),
    }
}

/// Parse a telegram and show its fields
fn run_parse(args: &ParseArgs) -> Result<()> {
    let telegram: Telegram = args.telegram.parse()?;

    println!("{}", "Telegram:".bright_white().bold());
    println!("  Text:       {}", telegram.to_string().cyan());
    println!("  Mode:       {}", display_or_none(telegram.mode));
    println!("  Scope:      {}", display_or_none(telegram.scope));
    println!("  Identifier: {}", telegram.identifier);
    println!("  Name:       {}", telegram.name);
    println!("  Action:     {}", telegram.action);

    if telegram.parameters().next().is_some() {
        println!("  Parameters:");
    }
    let range = args.percent.map(PercentRange::from);
    for (key, value) in telegram.parameters() {
        match (range, position_percent(key, value, range)) {
            (Some(_), Some(percent)) => println!("    {key} = {value} ({percent}%)"),
            _ => println!("    {key} = {value}"),
        }
    }

    Ok(())
}

fn display_or_none<T: ToString>(value: Option<T>) -> String {
    value.map_or_else(|| "none".dimmed().to_string(), |v| v.to_string())
}

fn position_percent(key: Parameter, value: &str, range: Option<PercentRange>) -> Option<u8> {
    let range = range?;
    match key {
        Parameter::Current(_) | Parameter::Target(_) | Parameter::Min(_) | Parameter::Max(_) => {
            raw_to_percent(value.trim().parse().ok()?, range)
        }
        _ => None,
    }
}

/// Decode a SLIP frame given as hex
fn run_frame(args: &FrameArgs) -> Result<()> {
    let text: String = args.hex.concat().split_whitespace().collect();
    let bytes = hex::decode(&text)
        .map_err(|e| Error::Other(anyhow::anyhow!("invalid hex input: {e}")))?;

    let datagram = decode_frame(&bytes)?;
    print_datagram(&datagram);
    Ok(())
}

fn print_datagram(datagram: &Datagram) {
    let command = datagram.command();
    let payload = datagram.payload().as_bytes();

    println!("{}", "Datagram:".bright_white().bold());
    println!("  Command: {} (0x{:04X})", command.to_string().cyan(), command as u16);
    println!("  Payload: {} bytes", payload.len());
    for (i, chunk) in payload.chunks(16).enumerate() {
        println!("    {:04X}  {}", i * 16, hex::encode(chunk));
    }

    let telegram = datagram.to_telegram(&|_, _| String::new());
    if let Some(Ok(telegram)) = telegram {
        println!("  Telegram: {}", telegram.to_string().green());
    }
}

/// Generate shell completions
fn run_completions(args: &CompletionsArgs) -> Result<()> {
    use clap::CommandFactory;
    use clap_complete::generate;

    let mut cmd = Cli::command();
    let name = cmd.get_name().to_string();

    let shell = match args.shell {
        Shell::Bash => clap_complete::Shell::Bash,
        Shell::Zsh => clap_complete::Shell::Zsh,
        Shell::Fish => clap_complete::Shell::Fish,
        Shell::PowerShell => clap_complete::Shell::PowerShell,
    };

    generate(shell, &mut cmd, name, &mut std::io::stdout());

    Ok(())
}

/// Show example configuration
fn run_config(args: &ConfigArgs) -> Result<()> {
    let output = toml::to_string_pretty(&Config::example())
        .map_err(|e| Error::Config(format!("Failed to serialize config: {e}")))?;

    if let Some(ref path) = args.output {
        std::fs::write(path, &output)?;
        println!(
            "{} Configuration written to {}",
            "✓".green(),
            path.display()
        );
    } else {
        println!("{output}");
    }

    Ok(())
}
