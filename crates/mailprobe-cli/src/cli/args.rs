use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

#[derive(Parser)]
#[command(
    name = "mailprobe",
    version,
    about = "Verification harness for the candidate email API: local service, scripted probes, route diagnostics"
)]
pub struct Cli {
    /// Emit logs as JSON lines on stderr
    #[arg(long, global = true, env = "MAILPROBE_LOG_JSON")]
    pub log_json: bool,

    #[command(subcommand)]
    pub cmd: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Start the verification service with the local mailer
    Serve(ServeArgs),
    /// Run a probe scenario against a local or deployed service
    Run(RunArgs),
    /// Print every route the service exposes
    Routes(RoutesArgs),
    /// Check base URL + path construction against literal fixtures
    UrlCheck,
}

impl Command {
    /// `serve` narrates startup and requests; the one-shot commands stay quiet.
    pub fn default_log_level(&self) -> &'static str {
        match self {
            Command::Serve(_) => "info",
            _ => "warn",
        }
    }
}

#[derive(Args, Debug)]
pub struct ServeArgs {
    /// Port to listen on (0 picks a free port)
    #[arg(long, env = "MAILPROBE_PORT", default_value_t = 5000)]
    pub port: u16,

    /// Origin allowed to make credentialed cross-origin requests (repeatable)
    #[arg(
        long = "allowed-origin",
        env = "MAILPROBE_ALLOWED_ORIGINS",
        value_delimiter = ',',
        default_value = "http://localhost:3000"
    )]
    pub allowed_origins: Vec<String>,

    #[command(flatten)]
    pub mount: MountArgs,

    /// Candidate IDs the local mailer accepts; empty accepts everyone
    #[arg(long = "known-candidate", value_delimiter = ',')]
    pub known_candidates: Vec<String>,

    /// Recipient used when a request has no recruiterEmail
    #[arg(
        long,
        env = "MAILPROBE_DEFAULT_RECIPIENT",
        default_value = "recruiter@localhost"
    )]
    pub default_recipient: String,
}

#[derive(Args, Debug)]
pub struct RunArgs {
    /// Service base URL; one trailing slash is ignored
    #[arg(long, env = "MAILPROBE_BASE_URL", default_value = "http://localhost:5000")]
    pub base_url: String,

    /// YAML scenario file (default: built-in email smoke scenario)
    #[arg(long)]
    pub scenario: Option<PathBuf>,

    #[command(flatten)]
    pub mount: MountArgs,

    /// Per-probe timeout ceiling in seconds
    #[arg(long, env = "MAILPROBE_PROBE_TIMEOUT", default_value_t = 10)]
    pub timeout_secs: u64,

    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,

    /// Exit non-zero when any probe fails
    #[arg(long)]
    pub strict: bool,
}

#[derive(Args, Debug)]
pub struct RoutesArgs {
    #[command(flatten)]
    pub mount: MountArgs,
}

#[derive(Args, Debug)]
pub struct MountArgs {
    /// Path prefix the email routes are mounted under
    #[arg(long, env = "MAILPROBE_MOUNT_PREFIX", default_value = "/api/email")]
    pub mount_prefix: String,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum OutputFormat {
    Text,
    Json,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_run_defaults() {
        let cli = Cli::try_parse_from(["mailprobe", "run"]).unwrap();
        let Command::Run(args) = cli.cmd else {
            panic!("expected run");
        };
        assert_eq!(args.base_url, "http://localhost:5000");
        assert_eq!(args.mount.mount_prefix, "/api/email");
        assert_eq!(args.timeout_secs, 10);
        assert_eq!(args.format, OutputFormat::Text);
        assert!(!args.strict);
    }

    #[test]
    fn test_serve_accepts_comma_separated_origins() {
        let cli = Cli::try_parse_from([
            "mailprobe",
            "serve",
            "--port",
            "0",
            "--allowed-origin",
            "http://localhost:3000,https://app.example.com",
        ])
        .unwrap();
        let Command::Serve(args) = cli.cmd else {
            panic!("expected serve");
        };
        assert_eq!(args.port, 0);
        assert_eq!(
            args.allowed_origins,
            vec!["http://localhost:3000", "https://app.example.com"]
        );
    }
}
