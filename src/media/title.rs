use std::path::Path;

use regex::Regex;

use crate::domain::models::SearchQuery;

/// Release noise stripped from filenames before searching. Matched as
/// whole words, case-insensitive.
const STRIP_TAGS: &[&str] = &[
    "1080p", "720p", "2160p", "4K", "480p", //
    "WEB-DL", "WEBRip", "BluRay", "Blu-Ray", "HDTV", //
    "x264", "x265", "HEVC", "AVC", "H264", "H265", //
    "AAC", "DTS", "AC3", "DD5.1", "FLAC", "MP3", //
    "HDR", "HDR10", "SDR", "REMUX", //
    "EXTENDED", "UNRATED", "REMASTERED", "PROPER", "REPACK", //
    "NF", "AMZN", "HULU", "DSNP", "ATVP", "MAX",
];

/// Derive a search query from a video filename. Best-effort and total: a
/// stem that strips down to nothing searches with the untouched stem.
pub fn parse(path: &Path) -> SearchQuery {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();

    // Episode tag (S01E02 or 1x02) is detected before any cleanup and
    // re-appended to the query afterwards.
    let episode_tag = find_episode_tag(&stem);

    let year_re = Regex::new(r"\b((?:19|20)\d{2})\b").unwrap();
    let year: Option<u16> = year_re
        .captures(&stem)
        .and_then(|c| c.get(1))
        .and_then(|m| m.as_str().parse().ok());

    let mut cleaned = remove_bracketed(&stem, year);

    for tag in STRIP_TAGS {
        cleaned = strip_word(&cleaned, tag);
    }

    if let Some(tag) = &episode_tag {
        cleaned = strip_word(&cleaned, tag);
    }

    if let Some(year) = year {
        cleaned = Regex::new(&format!(r"\b{year}\b"))
            .unwrap()
            .replace_all(&cleaned, "")
            .into_owned();
    }

    cleaned = Regex::new(r"[._\-]+")
        .unwrap()
        .replace_all(&cleaned, " ")
        .into_owned();
    cleaned = Regex::new(r"[(){}\[\]]")
        .unwrap()
        .replace_all(&cleaned, "")
        .into_owned();
    cleaned = Regex::new(r"\s+")
        .unwrap()
        .replace_all(&cleaned, " ")
        .trim()
        .to_string();

    let title = if cleaned.is_empty() {
        stem
    } else {
        match &episode_tag {
            Some(tag) => format!("{cleaned} {tag}"),
            None => cleaned,
        }
    };

    SearchQuery { title, year }
}

fn find_episode_tag(stem: &str) -> Option<String> {
    let sxxexx = Regex::new(r"(?i)\b(s\d{1,2}e\d{1,2})\b").unwrap();
    if let Some(caps) = sxxexx.captures(stem) {
        return Some(caps[1].to_string());
    }
    let nxnn = Regex::new(r"(?i)\b(\d{1,2}x\d{2,3})\b").unwrap();
    nxnn.captures(stem).map(|caps| caps[1].to_string())
}

/// Drop `[...]` and `(...)` groups, keeping a group only when it carries
/// the detected year (so "(2010)" survives to the year-removal step).
fn remove_bracketed(text: &str, year: Option<u16>) -> String {
    let year_str = year.map(|y| y.to_string());

    let square = Regex::new(r"\[[^\]]*\]").unwrap();
    let text = square.replace_all(text, |caps: &regex::Captures| {
        match &year_str {
            Some(y) if caps[0].contains(y.as_str()) => caps[0].to_string(),
            _ => String::new(),
        }
    });

    let round = Regex::new(r"\(([^)]*)\)").unwrap();
    round
        .replace_all(&text, |caps: &regex::Captures| match &year_str {
            Some(y) if caps[1].trim() == y.as_str() => caps[0].to_string(),
            _ => String::new(),
        })
        .into_owned()
}

/// Remove whole-word occurrences of `word`, where word edges are anything
/// non-alphanumeric. The regex crate has no lookbehind, so the boundary
/// characters are captured and put back.
fn strip_word(text: &str, word: &str) -> String {
    let pattern = format!(
        r"(?i)(^|[^0-9A-Za-z]){}($|[^0-9A-Za-z])",
        regex::escape(word)
    );
    Regex::new(&pattern)
        .unwrap()
        .replace_all(text, "${1}${2}")
        .into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn parse_name(name: &str) -> SearchQuery {
        parse(&PathBuf::from(name))
    }

    #[test]
    fn strips_release_noise_and_finds_the_year() {
        let q = parse_name("Inception.2010.1080p.BluRay.x264.mkv");
        assert_eq!(q.title, "Inception");
        assert_eq!(q.year, Some(2010));
    }

    #[test]
    fn keeps_multi_word_titles() {
        let q = parse_name("The.Grand.Budapest.Hotel.2014.720p.WEB-DL.AAC.mp4");
        assert_eq!(q.title, "The Grand Budapest Hotel");
        assert_eq!(q.year, Some(2014));
    }

    #[test]
    fn drops_release_group_brackets_but_keeps_year_parens() {
        let q = parse_name("Parasite (2019) [YTS.MX] x265.mkv");
        assert_eq!(q.title, "Parasite");
        assert_eq!(q.year, Some(2019));
    }

    #[test]
    fn series_episode_tag_is_appended_to_the_query() {
        let q = parse_name("Severance.S02E03.2160p.ATVP.WEB-DL.HEVC.mkv");
        assert_eq!(q.title, "Severance S02E03");
        assert_eq!(q.year, None);

        let q = parse_name("The.Office.3x12.HDTV.avi");
        assert_eq!(q.title, "The Office 3x12");

        let q = parse_name("The.Office.3X12.HDTV.avi");
        assert_eq!(q.title, "The Office 3X12");
    }

    #[test]
    fn no_year_means_no_year_filter() {
        let q = parse_name("Memento.REMASTERED.BluRay.mkv");
        assert_eq!(q.title, "Memento");
        assert_eq!(q.year, None);
    }

    #[test]
    fn all_noise_falls_back_to_the_untouched_stem() {
        let q = parse_name("1080p.x264.mkv");
        assert_eq!(q.title, "1080p.x264");
        assert_eq!(q.year, None);
    }

    #[test]
    fn tag_stripping_is_whole_word_only() {
        // "Maximum" must not lose its "MAX" prefix to the network tag.
        let q = parse_name("Maximum.Risk.1996.HDTV.mkv");
        assert_eq!(q.title, "Maximum Risk");
        assert_eq!(q.year, Some(1996));
    }
}
