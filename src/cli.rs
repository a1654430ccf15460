use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "domsnap")]
#[command(
    version,
    about = "DOM Snapshot - Capture a rendered document subtree as a self-contained SVG",
    long_about = "DOM Snapshot (domsnap)\n\nModes:\n- capture: clone a node of a recorded page snapshot with its computed styles, inline fonts and images, and print the result as an SVG data URI.\n\nUse --help on any subcommand for details."
)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    #[arg(long, global = true, help = "Enable verbose (debug) logging on stderr")]
    pub verbose: bool,

    #[arg(
        long,
        global = true,
        value_name = "PATH",
        help = "Optional config file (TOML) to set defaults for timeouts/groups; CLI flags override config"
    )]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Capture a node of a page snapshot as an SVG data URI
    Capture {
        #[arg(long, value_name = "PATH", help = "Page snapshot (JSON) to capture from")]
        snapshot: PathBuf,

        #[arg(
            long,
            help = "CSS selector of the node to capture (document element if omitted)"
        )]
        selector: Option<String>,

        #[arg(long, help = "Background color painted behind the captured node")]
        bgcolor: Option<String>,

        #[arg(long, help = "Modifier group to use for this capture")]
        group: Option<String>,

        #[arg(
            long,
            help = "Drop hidden/non-visual elements and replace iframes with placeholders"
        )]
        clean: bool,

        #[arg(
            long,
            value_name = "SECS",
            help = "Timeout (seconds) for each resource fetch"
        )]
        fetch_timeout: Option<u64>,

        #[arg(long, value_enum, default_value = "json", help = "Output format")]
        format: OutputFormat,

        #[arg(long, short, help = "Output file path (stdout if omitted)")]
        output: Option<PathBuf>,
    },
}

#[derive(Clone, Copy, ValueEnum, Default)]
pub enum OutputFormat {
    #[default]
    Json,
    Pretty,
}

pub fn parse() -> Cli {
    Cli::parse()
}

#[cfg(test)]
mod tests {
    use super::{Cli, Commands, OutputFormat};
    use clap::Parser;

    #[test]
    fn capture_command_uses_defaults() {
        let cli = Cli::parse_from(["domsnap", "capture", "--snapshot", "page.json"]);

        assert!(!cli.verbose);
        assert!(cli.config.is_none());

        match cli.command {
            Commands::Capture {
                snapshot,
                selector,
                bgcolor,
                group,
                clean,
                fetch_timeout,
                format,
                output,
            } => {
                assert_eq!(snapshot, std::path::PathBuf::from("page.json"));
                assert!(selector.is_none());
                assert!(bgcolor.is_none());
                assert!(group.is_none());
                assert!(!clean);
                assert!(fetch_timeout.is_none());
                assert!(matches!(format, OutputFormat::Json));
                assert!(output.is_none());
            }
        }
    }

    #[test]
    fn capture_command_respects_overrides() {
        let cli = Cli::parse_from([
            "domsnap",
            "--verbose",
            "capture",
            "--snapshot",
            "page.json",
            "--selector",
            "#app",
            "--bgcolor",
            "white",
            "--group",
            "print",
            "--clean",
            "--fetch-timeout",
            "5",
            "--format",
            "pretty",
            "--output",
            "out.json",
            "--config",
            "domsnap.toml",
        ]);

        assert!(cli.verbose);
        assert_eq!(
            cli.config.as_deref(),
            Some(std::path::Path::new("domsnap.toml"))
        );
        match cli.command {
            Commands::Capture {
                selector,
                bgcolor,
                group,
                clean,
                fetch_timeout,
                format,
                output,
                ..
            } => {
                assert_eq!(selector.as_deref(), Some("#app"));
                assert_eq!(bgcolor.as_deref(), Some("white"));
                assert_eq!(group.as_deref(), Some("print"));
                assert!(clean);
                assert_eq!(fetch_timeout, Some(5));
                assert!(matches!(format, OutputFormat::Pretty));
                assert_eq!(output.as_deref(), Some(std::path::Path::new("out.json")));
            }
        }
    }

    #[test]
    fn capture_requires_snapshot() {
        assert!(Cli::try_parse_from(["domsnap", "capture"]).is_err());
    }
}
