use std::io::{Cursor, Read};
use std::path::Path;

use anyhow::{Context, Result};
use zip::ZipArchive;

const ZIP_MAGIC: &[u8] = b"PK\x03\x04";

/// The download endpoint serves either raw SRT bytes or a ZIP archive.
pub fn is_zip(data: &[u8]) -> bool {
    data.starts_with(ZIP_MAGIC)
}

/// Pull the best `.srt` member out of a downloaded archive: a single
/// member wins outright, otherwise the one whose name is most similar to
/// the video stem. Returns `None` when the archive holds no SRT at all.
pub fn extract_best_srt(data: &[u8], video_stem: &str) -> Result<Option<Vec<u8>>> {
    let mut archive =
        ZipArchive::new(Cursor::new(data)).context("downloaded archive is not a valid ZIP")?;

    let mut srt_names: Vec<String> = archive
        .file_names()
        .filter(|name| {
            name.to_lowercase().ends_with(".srt") && !name.starts_with("__MACOSX")
        })
        .map(String::from)
        .collect();

    let chosen = match srt_names.len() {
        0 => return Ok(None),
        1 => srt_names.pop().unwrap(),
        _ => {
            let stem = video_stem.to_lowercase();
            srt_names
                .into_iter()
                .max_by(|a, b| {
                    let sa = similarity(&stem, &member_stem(a));
                    let sb = similarity(&stem, &member_stem(b));
                    sa.partial_cmp(&sb).unwrap_or(std::cmp::Ordering::Equal)
                })
                .unwrap()
        }
    };

    let mut member = archive
        .by_name(&chosen)
        .context("ZIP member disappeared between listing and read")?;
    let mut contents = Vec::with_capacity(member.size() as usize);
    member.read_to_end(&mut contents)?;
    Ok(Some(contents))
}

fn member_stem(name: &str) -> String {
    Path::new(name)
        .file_stem()
        .map(|s| s.to_string_lossy().to_lowercase())
        .unwrap_or_default()
}

/// Sorensen-Dice coefficient over character bigrams, in [0, 1].
fn similarity(a: &str, b: &str) -> f64 {
    let bigrams = |s: &str| -> Vec<(char, char)> {
        let chars: Vec<char> = s.chars().collect();
        chars.windows(2).map(|w| (w[0], w[1])).collect()
    };

    let mut left = bigrams(a);
    let right = bigrams(b);
    if left.is_empty() && right.is_empty() {
        return 1.0;
    }
    if left.is_empty() || right.is_empty() {
        return 0.0;
    }

    let total = left.len() + right.len();
    let mut shared = 0usize;
    for pair in &right {
        if let Some(pos) = left.iter().position(|p| p == pair) {
            left.swap_remove(pos);
            shared += 1;
        }
    }
    (2 * shared) as f64 / total as f64
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use zip::write::SimpleFileOptions;

    fn build_zip(members: &[(&str, &[u8])]) -> Vec<u8> {
        let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
        for (name, data) in members {
            writer
                .start_file(*name, SimpleFileOptions::default())
                .unwrap();
            writer.write_all(data).unwrap();
        }
        writer.finish().unwrap().into_inner()
    }

    #[test]
    fn detects_zip_by_magic_bytes() {
        assert!(is_zip(b"PK\x03\x04rest"));
        assert!(!is_zip(b"1\n00:00:01,000 --> 00:00:02,000\nHi\n"));
        assert!(!is_zip(b""));
    }

    #[test]
    fn single_srt_member_is_extracted() {
        let zip = build_zip(&[("anything.srt", b"subtitle body")]);
        let out = extract_best_srt(&zip, "Movie.2020").unwrap();
        assert_eq!(out.unwrap(), b"subtitle body");
    }

    #[test]
    fn most_similar_member_wins() {
        let zip = build_zip(&[
            ("Movie.2020.1080p.WEB.srt", b"close match"),
            ("totally-unrelated-name.srt", b"far match"),
            ("readme.txt", b"not a subtitle"),
        ]);
        let out = extract_best_srt(&zip, "Movie.2020.1080p.BluRay").unwrap();
        assert_eq!(out.unwrap(), b"close match");
    }

    #[test]
    fn archive_without_srt_yields_none() {
        let zip = build_zip(&[("readme.txt", b"hello")]);
        assert!(extract_best_srt(&zip, "Movie").unwrap().is_none());
    }

    #[test]
    fn macosx_entries_are_ignored() {
        let zip = build_zip(&[
            ("__MACOSX/._junk.srt", b"resource fork"),
            ("real.srt", b"the actual one"),
        ]);
        let out = extract_best_srt(&zip, "real").unwrap();
        assert_eq!(out.unwrap(), b"the actual one");
    }

    #[test]
    fn corrupt_archive_is_an_error() {
        assert!(extract_best_srt(b"PK\x03\x04but-truncated", "x").is_err());
    }

    #[test]
    fn similarity_orders_obvious_cases() {
        assert!(similarity("inception.2010", "inception.2010.web") > similarity("inception.2010", "zzz"));
        assert_eq!(similarity("abc", "abc"), 1.0);
    }
}
