use crate::domain::models::SubtitleCandidate;

/// Known spellings per language code. The catalog labels languages
/// inconsistently, so matching is substring-based in both directions and
/// case-insensitive. Codes outside this table pass through to the API and
/// are matched against the raw code.
const LANGUAGE_ALIASES: &[(&str, &[&str])] = &[
    (
        "id",
        &["indonesian", "indonesia", "id", "bahasa indonesia", "ind"],
    ),
    ("en", &["english", "en", "eng"]),
];

/// Subtitle formats the player cannot use here.
const EXCLUDED_FORMATS: &[&str] = &["ass", "ssa", "vtt", "sub", "idx"];

fn aliases_for(code: &str) -> Option<&'static [&'static str]> {
    let code = code.to_lowercase();
    LANGUAGE_ALIASES
        .iter()
        .find(|(known, aliases)| *known == code || aliases.contains(&code.as_str()))
        .map(|(_, aliases)| *aliases)
}

/// The language parameter sent to the list-subtitles endpoint: the
/// canonical catalog name when the code is known, the code itself when
/// not (no local validation beyond the alias table).
pub fn api_language(code: &str) -> String {
    match aliases_for(code) {
        Some(aliases) => aliases[0].to_string(),
        None => code.to_string(),
    }
}

pub fn language_matches(requested: &str, listed: &str) -> bool {
    let listed = listed.trim().to_lowercase();
    if listed.is_empty() {
        return false;
    }
    match aliases_for(requested) {
        Some(aliases) => aliases
            .iter()
            .any(|alias| listed.contains(alias) || alias.contains(listed.as_str())),
        None => {
            let requested = requested.trim().to_lowercase();
            listed.contains(requested.as_str()) || requested.contains(listed.as_str())
        }
    }
}

/// SRT check mirroring the catalog's loose metadata: any format-ish field
/// naming an excluded format rejects, any naming srt accepts, and with no
/// format signal at all the entry counts as SRT (the catalog default).
pub fn is_srt(sub: &SubtitleCandidate) -> bool {
    let fields = [&sub.format, &sub.extension, &sub.kind, &sub.file_type];
    for field in fields.into_iter().flatten() {
        let value = field.trim().to_lowercase();
        if EXCLUDED_FORMATS.contains(&value.as_str()) {
            return false;
        }
        if value.contains("srt") {
            return true;
        }
    }

    for entry in sub.release_info.entries() {
        let entry = entry.to_lowercase();
        if EXCLUDED_FORMATS.iter().any(|fmt| entry.contains(fmt)) {
            return false;
        }
    }

    true
}

/// Narrow a title's subtitle list to entries usable for the requested
/// language. Preserves the API's ordering.
pub fn eligible(subs: Vec<SubtitleCandidate>, requested: &str) -> Vec<SubtitleCandidate> {
    subs.into_iter()
        .filter(|sub| language_matches(requested, &sub.language) && is_srt(sub))
        .collect()
}
