use std::path::Path;

use anyhow::Result;
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;

/// What the operator (or the auto-pick policy) decided for one candidate
/// list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Choice {
    Index(usize),
    Skip,
}

/// One decision seam for both prompting modes, so the pipeline never
/// branches on an interactivity flag. Candidate ordering is the API's own
/// and is never re-sorted; "first" always means the API's first.
pub trait Selector {
    fn choose(&mut self, heading: &str, items: &[String]) -> Result<Choice>;

    /// Asked when the destination `.srt` already exists and --force was
    /// not given. `false` skips the file before any network call.
    fn confirm_overwrite(&mut self, target: &Path) -> Result<bool>;
}

pub struct InteractiveSelector {
    editor: DefaultEditor,
}

impl InteractiveSelector {
    pub fn new() -> Result<Self> {
        Ok(Self {
            editor: DefaultEditor::new()?,
        })
    }
}

impl Selector for InteractiveSelector {
    fn choose(&mut self, heading: &str, items: &[String]) -> Result<Choice> {
        println!("{heading}");
        for item in items {
            println!("  {item}");
        }
        println!();

        let prompt = format!("Pick [1-{}] (default 1, 's' to skip): ", items.len());
        // Invalid input re-prompts indefinitely; only 's', Ctrl-C or EOF
        // give up on the file.
        loop {
            let line = match self.editor.readline(&prompt) {
                Ok(line) => line,
                Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => {
                    return Ok(Choice::Skip)
                }
                Err(e) => return Err(e.into()),
            };
            let line = line.trim();

            if line.is_empty() {
                return Ok(Choice::Index(0));
            }
            if line.eq_ignore_ascii_case("s") || line.eq_ignore_ascii_case("skip") {
                return Ok(Choice::Skip);
            }
            match line.parse::<usize>() {
                Ok(n) if (1..=items.len()).contains(&n) => return Ok(Choice::Index(n - 1)),
                Ok(_) => println!("Out of range, enter 1-{}.", items.len()),
                Err(_) => println!("Enter a number 1-{}, or 's' to skip.", items.len()),
            }
        }
    }

    fn confirm_overwrite(&mut self, target: &Path) -> Result<bool> {
        let name = target
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        loop {
            let line = match self.editor.readline(&format!(
                "Subtitle '{name}' already exists. Replace? (y/n): "
            )) {
                Ok(line) => line,
                Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => return Ok(false),
                Err(e) => return Err(e.into()),
            };
            let line = line.trim().to_lowercase();
            match line.as_str() {
                "y" | "yes" => return Ok(true),
                "n" | "no" | "" => return Ok(false),
                _ => println!("Please enter 'y' or 'n'."),
            }
        }
    }
}

/// Non-interactive policy: always the API's first-ranked candidate, and
/// never overwrite an existing subtitle (that needs --force).
pub struct FirstRanked;

impl Selector for FirstRanked {
    fn choose(&mut self, _heading: &str, _items: &[String]) -> Result<Choice> {
        Ok(Choice::Index(0))
    }

    fn confirm_overwrite(&mut self, _target: &Path) -> Result<bool> {
        Ok(false)
    }
}
