//! Command-line interface for the KLF-200 bridge.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

use crate::position::PercentRange;

/// KLF-200 bridge - telegram gateway for Velux window and shutter systems
#[derive(Parser, Debug)]
#[command(
    name = "klf200-bridge",
    author,
    version,
    about = "Bridge between URI-style telegrams and the Velux KLF-200 gateway",
    long_about = r#"
klf200-bridge connects to a Velux KLF-200 gateway over TLS, reads its
system table (nodes, groups, scenes) and translates between host telegrams
and the gateway's binary protocol:

  request://node/Kitchen?target=25600     move a window to 50%
  request://scene/Morning#start           run a scene
  info://node                             list known nodes

QUICK START:
  klf200-bridge config --output klf200-bridge.toml
  klf200-bridge --config klf200-bridge.toml run
"#
)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Configuration file path
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, global = true)]
    pub log_level: Option<String>,

    /// Log format
    #[arg(long, global = true)]
    pub log_format: Option<LogFormat>,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Connect to the gateway and bridge telegrams between stdin and stdout
    Run(RunArgs),

    /// Parse a telegram and show its fields
    Parse(ParseArgs),

    /// Decode a SLIP frame given as hex
    Frame(FrameArgs),

    /// Show example configuration
    Config(ConfigArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

/// Run command arguments
#[derive(Args, Debug)]
pub struct RunArgs {
    /// Gateway host (overrides the configuration)
    #[arg(long, env = "KLF200_HOST")]
    pub host: Option<String>,

    /// Gateway password (overrides the configuration)
    #[arg(long, env = "KLF200_PASSWORD", hide_env_values = true)]
    pub password: Option<String>,

    /// Pinned certificate file, PEM or DER (overrides the configuration)
    #[arg(long, conflicts_with = "issuer")]
    pub certificate: Option<PathBuf>,

    /// Pinned issuer, e.g. "CN=KLF200, O=VELUX A/S, C=DK"
    #[arg(long)]
    pub issuer: Option<String>,

    /// Also print heartbeats
    #[arg(long)]
    pub heartbeats: bool,
}

/// Parse command arguments
#[derive(Args, Debug)]
pub struct ParseArgs {
    /// Telegram text, e.g. "request://node:3?target=25600" or "request://node:3#max"
    pub telegram: String,

    /// Show position parameters as percentages
    #[arg(long, value_enum)]
    pub percent: Option<Range>,
}

/// Frame command arguments
#[derive(Args, Debug)]
pub struct FrameArgs {
    /// Frame bytes as hex, including the SLIP END markers; whitespace is ignored
    #[arg(required = true, num_args = 1..)]
    pub hex: Vec<String>,
}

/// Config command arguments
#[derive(Args, Debug)]
pub struct ConfigArgs {
    /// Write configuration to file instead of stdout
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

/// Completions command arguments
#[derive(Args, Debug)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    #[arg(value_enum)]
    pub shell: Shell,
}

/// Log format
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    Text,
    Json,
}

impl LogFormat {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Json => "json",
        }
    }
}

/// Percentage direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Range {
    /// 0% is fully open
    Ascending,
    /// 0% is fully closed
    Descending,
}

impl From<Range> for PercentRange {
    fn from(range: Range) -> Self {
        match range {
            Range::Ascending => Self::Ascending,
            Range::Descending => Self::Descending,
        }
    }
}

/// Shell for completions
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Shell {
    Bash,
    Zsh,
    Fish,
    PowerShell,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_run_overrides() {
        let cli = Cli::parse_from([
            "klf200-bridge",
            "--log-level",
            "debug",
            "run",
            "--host",
            "10.0.0.5",
            "--issuer",
            "CN=KLF200",
        ]);
        assert_eq!(cli.log_level.as_deref(), Some("debug"));
        match cli.command {
            Commands::Run(args) => {
                assert_eq!(args.host.as_deref(), Some("10.0.0.5"));
                assert_eq!(args.issuer.as_deref(), Some("CN=KLF200"));
                assert!(!args.heartbeats);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn test_frame_accepts_split_hex() {
        let cli = Cli::parse_from(["klf200-bridge", "frame", "C0 00 03", "00 0C 0F C0"]);
        match cli.command {
            Commands::Frame(args) => assert_eq!(args.hex.len(), 2),
            other => panic!("unexpected command {other:?}"),
        }
    }
}
