use clap::{Args as ClapArgs, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use crate::gdocs::ThemeKind;

pub mod auth;
pub mod render;
pub mod run;

pub use auth::handle_auth_command;
pub use render::handle_render_command;
pub use run::handle_run_command;

#[derive(Parser, Debug)]
#[command(name = "gijiroku")]
#[command(about = "Publish Zoom meeting transcripts as Google Docs minutes", long_about = None)]
pub struct Cli {
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Config file to use instead of the default location
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<CliCommand>,
}

#[derive(Subcommand, Debug)]
pub enum CliCommand {
    /// Process recent recordings (default)
    Run,
    /// Preview a caption file offline without calling any API
    Render(RenderCliArgs),
    /// Obtain a Google refresh token through the browser consent flow
    Auth,
    /// Print version information
    Version,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum RenderFormat {
    /// Markdown minutes
    Markdown,
    /// `speaker: text` lines
    Plain,
    /// Google Docs batchUpdate requests as JSON
    Requests,
}

#[derive(ClapArgs, Debug)]
pub struct RenderCliArgs {
    /// WebVTT caption file
    pub file: PathBuf,
    #[arg(short, long, value_enum, default_value = "markdown")]
    pub format: RenderFormat,
    /// Meeting topic shown in the header
    #[arg(long)]
    pub topic: Option<String>,
    /// Meeting date shown in the header (e.g. "2026-02-15 10:00")
    #[arg(long)]
    pub date: Option<String>,
    #[arg(long)]
    pub recording_url: Option<String>,
    /// Styling used for `--format requests`
    #[arg(long, value_enum, default_value = "rich")]
    pub theme: ThemeKind,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_subcommand_means_run() {
        let cli = Cli::try_parse_from(["gijiroku", "--verbose"]).unwrap();
        assert!(cli.verbose);
        assert!(cli.command.is_none());
    }

    #[test]
    fn test_render_args() {
        let cli = Cli::try_parse_from([
            "gijiroku",
            "render",
            "meeting.vtt",
            "--format",
            "requests",
            "--theme",
            "plain",
            "--topic",
            "定例",
            "--config",
            "/tmp/gijiroku.toml",
        ])
        .unwrap();

        assert_eq!(cli.config, Some(PathBuf::from("/tmp/gijiroku.toml")));
        match cli.command {
            Some(CliCommand::Render(args)) => {
                assert_eq!(args.file, PathBuf::from("meeting.vtt"));
                assert_eq!(args.format, RenderFormat::Requests);
                assert_eq!(args.theme, ThemeKind::Plain);
                assert_eq!(args.topic.as_deref(), Some("定例"));
                assert!(args.date.is_none());
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }
}
