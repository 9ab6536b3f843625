use crate::domain::models::{RunOutcome, RunSummary, VideoFile};
use crate::infra::catalog::{Catalog, CatalogError};
use crate::media::archive;
use crate::workflows::filter;
use crate::workflows::output;
use crate::workflows::select::{Choice, Selector};

// The API can return hundreds of entries; prompts stay readable.
const MAX_TITLE_CHOICES: usize = 10;
const MAX_SUBTITLE_CHOICES: usize = 20;

#[derive(Debug, Clone)]
pub struct Options {
    pub language: String,
    pub force: bool,
    pub dry_run: bool,
}

/// Sequences the per-file pipeline: overwrite check, search, title choice,
/// subtitle listing and filtering, subtitle choice, download, atomic write.
/// Exactly one outcome is recorded per file no matter which stage stops it.
pub struct Downloader<'a> {
    catalog: &'a mut dyn Catalog,
    selector: &'a mut dyn Selector,
    options: Options,
}

/// Convert a catalog error into a per-file outcome, letting only fatal
/// (auth) errors propagate and abort the run.
fn scoped<T>(result: Result<T, CatalogError>) -> Result<Result<T, RunOutcome>, CatalogError> {
    match result {
        Ok(value) => Ok(Ok(value)),
        Err(e) if e.is_fatal() => Err(e),
        Err(e) => Ok(Err(RunOutcome::Failed(e.to_string()))),
    }
}

impl<'a> Downloader<'a> {
    pub fn new(
        catalog: &'a mut dyn Catalog,
        selector: &'a mut dyn Selector,
        options: Options,
    ) -> Self {
        Self {
            catalog,
            selector,
            options,
        }
    }

    /// Process every file strictly in scan order. Returns the summary and,
    /// when the run was aborted by an auth failure, the fatal error.
    pub fn run(&mut self, videos: &[VideoFile]) -> (RunSummary, Option<CatalogError>) {
        let mut summary = RunSummary::default();
        let total = videos.len();

        for (index, video) in videos.iter().enumerate() {
            println!();
            println!("[{}/{}] {}", index + 1, total, video.file_name());

            match self.process(video) {
                Ok(outcome) => {
                    match &outcome {
                        RunOutcome::Success(path) => println!("Saved: {}", path.display()),
                        RunOutcome::Skipped(reason) => println!("Skipped: {reason}"),
                        RunOutcome::Failed(reason) => eprintln!("Failed: {reason}"),
                    }
                    summary.record(video.file_name(), outcome);
                }
                Err(fatal) => return (summary, Some(fatal)),
            }
        }

        (summary, None)
    }

    fn process(&mut self, video: &VideoFile) -> Result<RunOutcome, CatalogError> {
        let target = video.target_srt();

        // Overwrite policy is settled before any network traffic. In
        // dry-run the prompt still appears; only later steps become no-ops.
        if target.exists() && !self.options.force {
            let replace = match self.selector.confirm_overwrite(&target) {
                Ok(replace) => replace,
                Err(e) => return Ok(RunOutcome::Failed(e.to_string())),
            };
            if !replace {
                return Ok(RunOutcome::Skipped("existing subtitle kept".to_string()));
            }
        }

        let query = &video.query;
        match query.year {
            Some(year) => println!("Searching \"{}\" ({year})...", query.title),
            None => println!("Searching \"{}\"...", query.title),
        }

        let titles = match scoped(self.catalog.search(&query.title, query.year))? {
            Ok(titles) => titles,
            Err(outcome) => return Ok(outcome),
        };
        if titles.is_empty() {
            return Ok(RunOutcome::Failed(format!(
                "no results for \"{}\"",
                query.title
            )));
        }

        let shown = &titles[..titles.len().min(MAX_TITLE_CHOICES)];
        let items: Vec<String> = shown
            .iter()
            .enumerate()
            .map(|(i, t)| t.describe(i))
            .collect();
        let heading = format!("Search results for \"{}\":", query.title);
        let title = match self.selector.choose(&heading, &items) {
            Ok(Choice::Index(i)) => &shown[i],
            Ok(Choice::Skip) => {
                return Ok(RunOutcome::Skipped("title selection skipped".to_string()))
            }
            Err(e) => return Ok(RunOutcome::Failed(e.to_string())),
        };
        println!("Selected title: {}", title.title);

        let api_language = filter::api_language(&self.options.language);
        let subtitles = match scoped(self.catalog.list_subtitles(title.id, &api_language))? {
            Ok(subtitles) => subtitles,
            Err(outcome) => return Ok(outcome),
        };

        let eligible = filter::eligible(subtitles, &self.options.language);
        if eligible.is_empty() {
            return Ok(RunOutcome::Failed(format!(
                "no {} subtitle in SRT format",
                self.options.language
            )));
        }

        let shown = &eligible[..eligible.len().min(MAX_SUBTITLE_CHOICES)];
        let items: Vec<String> = shown
            .iter()
            .enumerate()
            .map(|(i, s)| s.describe(i))
            .collect();
        let heading = format!("Available subtitles ({} total):", eligible.len());
        let subtitle = match self.selector.choose(&heading, &items) {
            Ok(Choice::Index(i)) => &shown[i],
            Ok(Choice::Skip) => {
                return Ok(RunOutcome::Skipped(
                    "subtitle selection skipped".to_string(),
                ))
            }
            Err(e) => return Ok(RunOutcome::Failed(e.to_string())),
        };

        if self.options.dry_run {
            println!(
                "[dry-run] would download subtitle #{} to {}",
                subtitle.id,
                target.display()
            );
            return Ok(RunOutcome::Success(target));
        }

        println!("Downloading subtitle #{}...", subtitle.id);
        let raw = match scoped(self.catalog.download(subtitle.id))? {
            Ok(raw) => raw,
            Err(outcome) => return Ok(outcome),
        };
        if raw.is_empty() {
            return Ok(RunOutcome::Failed("download returned no data".to_string()));
        }

        let data = if archive::is_zip(&raw) {
            match archive::extract_best_srt(&raw, &video.stem()) {
                Ok(Some(data)) => data,
                Ok(None) => {
                    return Ok(RunOutcome::Failed(
                        "downloaded archive holds no .srt file".to_string(),
                    ))
                }
                Err(e) => return Ok(RunOutcome::Failed(format!("{e:#}"))),
            }
        } else {
            raw
        };

        match output::write_atomic(&target, &data) {
            Ok(()) => Ok(RunOutcome::Success(target)),
            Err(e) => Ok(RunOutcome::Failed(format!("{e:#}"))),
        }
    }
}
