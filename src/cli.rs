use clap::Parser;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "subdl")]
#[command(version)]
#[command(about = "Download Indonesian subtitles from SubSource, named for player auto-detection")]
pub struct Cli {
    /// Video file or directory to process; prompts for a path when omitted
    pub path: Option<PathBuf>,

    /// Subtitle language code
    #[arg(long, default_value = "id")]
    pub lang: String,

    /// Auto-pick the first-ranked title and subtitle, no prompts
    #[arg(long)]
    pub non_interactive: bool,

    /// Overwrite existing subtitles without asking
    #[arg(long)]
    pub force: bool,

    /// Go through every step except downloading and writing
    #[arg(long)]
    pub dry_run: bool,

    /// Show truncated raw API responses for debugging
    #[arg(long)]
    pub verbose: bool,
}
