use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Result;

use crate::domain::models::VideoFile;
use crate::media::title;

pub const VIDEO_EXTENSIONS: &[&str] = &["mkv", "mp4", "avi", "mov", "m4v"];

fn is_video(path: &Path) -> bool {
    path.extension()
        .and_then(|s| s.to_str())
        .map(|ext| {
            let ext = ext.to_lowercase();
            VIDEO_EXTENSIONS.contains(&ext.as_str())
        })
        .unwrap_or(false)
}

/// Discover video files under `path`. A matching single file is yielded
/// alone; a directory is walked recursively. A non-existent path or a path
/// with no matching files yields an empty list, which is not an error.
pub fn discover(path: &Path) -> Result<Vec<VideoFile>> {
    let mut files = Vec::new();

    if path.is_file() {
        if is_video(path) {
            files.push(path.to_path_buf());
        } else {
            println!(
                "'{}' is not a supported video file (supported: {}).",
                path.display(),
                VIDEO_EXTENSIONS.join(", ")
            );
        }
    } else if path.is_dir() {
        collect_videos(path, &mut files)?;
    }

    // Symlinks can surface the same physical file under several paths;
    // keep one entry per canonical path so it gets exactly one outcome.
    let mut seen = HashSet::new();
    files.retain(|p| match fs::canonicalize(p) {
        Ok(canonical) => seen.insert(canonical),
        Err(_) => true,
    });

    // Stable, case-insensitive path order so repeated runs process files
    // in the same sequence.
    files.sort_by_key(|p| p.to_string_lossy().to_lowercase());

    Ok(files
        .into_iter()
        .map(|path| {
            let query = title::parse(&path);
            VideoFile { path, query }
        })
        .collect())
}

fn collect_videos(dir: &Path, out: &mut Vec<PathBuf>) -> Result<()> {
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_file() {
            if is_video(&path) {
                out.push(path);
            }
        } else if path.is_dir() {
            collect_videos(&path, out)?;
        }
    }
    Ok(())
}
