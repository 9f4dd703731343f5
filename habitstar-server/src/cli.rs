use clap::{Parser, Subcommand};

const HELP_EPILOG: &str = r#"Server options can also be provided via environment variables:
  CONFIG_PATH (default: ./config.yaml)
  DB_PATH     (default: data/app.db)
  PORT        (default: 5151 or config.listen_port)
  RUST_LOG    (default: info)
"#;

#[derive(Debug, Parser)]
#[command(
    name = "habitstar-server",
    version,
    about = "HabitStar family habit tracker server",
    long_about = None,
    after_long_help = HELP_EPILOG,
)]
pub struct Cli {
    /// Optional subcommand. Without one, runs the server.
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Apply pending database migrations and exit
    Migrate,
    /// Load and validate the config file, then exit
    CheckConfig,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_subcommands() {
        let cli = Cli::try_parse_from(["habitstar-server"]).unwrap();
        assert!(cli.command.is_none());
        let cli = Cli::try_parse_from(["habitstar-server", "migrate"]).unwrap();
        assert!(matches!(cli.command, Some(Command::Migrate)));
        let cli = Cli::try_parse_from(["habitstar-server", "check-config"]).unwrap();
        assert!(matches!(cli.command, Some(Command::CheckConfig)));
        assert!(Cli::try_parse_from(["habitstar-server", "install"]).is_err());
    }
}
