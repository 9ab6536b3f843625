mod cli;
mod config;
mod domain;
mod infra;
mod media;
mod workflows;

use anyhow::{bail, Result};
use clap::Parser;
use regex::Regex;
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;
use std::path::PathBuf;

use cli::Cli;
use infra::catalog::CatalogClient;
use workflows::downloader::{Downloader, Options};
use workflows::select::{FirstRanked, InteractiveSelector, Selector};

fn main() {
    let cli = Cli::parse();

    let level = if cli.verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    if let Err(e) = run(cli) {
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    let input_path = match &cli.path {
        Some(path) => path.clone(),
        None => prompt_for_path()?,
    };

    if !input_path.exists() {
        eprintln!("Path not found: {}", input_path.display());
        std::process::exit(2);
    }

    let api_key = config::resolve_api_key()?;

    let videos = media::scan::discover(&input_path)?;
    println!("Found {} video file(s).", videos.len());
    if videos.is_empty() {
        domain::models::RunSummary::default().print();
        return Ok(());
    }
    if cli.dry_run {
        println!("Dry run: no files will be modified.");
    }

    let mut catalog = CatalogClient::new(api_key)?;
    let mut selector: Box<dyn Selector> = if cli.non_interactive {
        Box::new(FirstRanked)
    } else {
        Box::new(InteractiveSelector::new()?)
    };
    let options = Options {
        language: cli.lang.clone(),
        force: cli.force,
        dry_run: cli.dry_run,
    };

    let mut downloader = Downloader::new(&mut catalog, selector.as_mut(), options);
    let (summary, fatal) = downloader.run(&videos);

    summary.print();

    if let Some(e) = fatal {
        bail!(e);
    }
    Ok(())
}

fn prompt_for_path() -> Result<PathBuf> {
    println!();
    println!("subdl - SubSource subtitle downloader");
    println!("Drag & drop a video file or folder here, then press Enter:");
    println!();

    let mut editor = DefaultEditor::new()?;
    let raw = match editor.readline("> ") {
        Ok(raw) => raw,
        // Aborting the prompt is not an error: nothing was attempted.
        Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => {
            println!("Cancelled.");
            std::process::exit(0);
        }
        Err(e) => return Err(e.into()),
    };
    let cleaned = clean_dragged_path(&raw);
    if cleaned.is_empty() {
        eprintln!("No path given.");
        std::process::exit(2);
    }
    Ok(PathBuf::from(cleaned))
}

/// Undo what terminals do to dragged-in paths: surrounding quotes (Linux),
/// backslash escapes for spaces and brackets (macOS), and a leading `~`.
fn clean_dragged_path(raw: &str) -> String {
    let mut cleaned = raw.trim().to_string();

    if (cleaned.starts_with('"') && cleaned.ends_with('"') && cleaned.len() >= 2)
        || (cleaned.starts_with('\'') && cleaned.ends_with('\'') && cleaned.len() >= 2)
    {
        cleaned = cleaned[1..cleaned.len() - 1].to_string();
    }

    cleaned = Regex::new(r"\\(.)")
        .unwrap()
        .replace_all(&cleaned, "$1")
        .into_owned();

    if let Some(rest) = cleaned.strip_prefix("~/") {
        if let Ok(home) = std::env::var("HOME") {
            cleaned = format!("{home}/{rest}");
        }
    }

    cleaned.trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dragged_paths_lose_quotes_and_escapes() {
        assert_eq!(
            clean_dragged_path("\"/media/My Movies/file.mkv\""),
            "/media/My Movies/file.mkv"
        );
        assert_eq!(
            clean_dragged_path(r"/media/My\ Movies\ \(2024\)/file.mkv"),
            "/media/My Movies (2024)/file.mkv"
        );
        assert_eq!(
            clean_dragged_path("'/media/plain.mkv'"),
            "/media/plain.mkv"
        );
        assert_eq!(clean_dragged_path("  /media/plain.mkv \n"), "/media/plain.mkv");
    }

    #[test]
    fn blank_prompt_input_cleans_to_empty() {
        // Feeds the exit-2 branch in prompt_for_path.
        assert_eq!(clean_dragged_path(""), "");
        assert_eq!(clean_dragged_path("   \n"), "");
        assert_eq!(clean_dragged_path("\"\""), "");
    }

    #[test]
    fn tilde_expands_against_home() {
        std::env::set_var("HOME", "/home/tester");
        assert_eq!(
            clean_dragged_path("~/videos/file.mkv"),
            "/home/tester/videos/file.mkv"
        );
    }
}
