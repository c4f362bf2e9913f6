use std::{collections::HashSet, sync::LazyLock};

use regex::Regex;

use super::{slug::slugify, structs::ChannelRecord};

pub const DEFAULT_GROUP: &str = "General";
pub const UNKNOWN_CHANNEL_NAME: &str = "Unknown Channel";
pub const DEFAULT_STRIP_PREFIXES: &[&str] = &["BR|"];
pub const DEFAULT_URL_SCHEMES: &[&str] = &["http://", "https://", "rtmp://", "rtsp://"];

const GROUP_DIRECTIVE: &str = "#EXTGRP:";
const ENTRY_INFO: &str = "#EXTINF";

static TVG_NAME_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"tvg-name="([^"]*)""#).unwrap());
static TVG_LOGO_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"tvg-logo="([^"]*)""#).unwrap());
static GROUP_TITLE_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"group-title="([^"]*)""#).unwrap());

/// Tunables for [`parse_with`]
#[derive(Debug, Clone)]
pub struct ParseOptions {
    /// Group for entries with neither `group-title` nor a preceding `#EXTGRP`
    pub default_group: String,
    /// Name given to entries whose name could not be resolved
    pub unknown_name: String,
    /// Tags removed from the start of a resolved name, e.g. `BR|`
    pub strip_prefixes: Vec<String>,
    /// Prefixes that mark a line as a stream URL
    pub url_schemes: Vec<String>,
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self {
            default_group: DEFAULT_GROUP.to_string(),
            unknown_name: UNKNOWN_CHANNEL_NAME.to_string(),
            strip_prefixes: DEFAULT_STRIP_PREFIXES.iter().map(ToString::to_string).collect(),
            url_schemes: DEFAULT_URL_SCHEMES.iter().map(ToString::to_string).collect(),
        }
    }
}

/// Parses playlist text with [`ParseOptions::default`]
#[must_use]
pub fn parse(text: &str) -> Vec<ChannelRecord> {
    parse_with(text, &ParseOptions::default())
}

/// Parses playlist text into channel records, in playlist order
///
/// Never fails: lines that don't fit the playlist grammar are skipped, entries
/// without a stream URL are abandoned, and only the first record per id is kept.
#[must_use]
pub fn parse_with(text: &str, options: &ParseOptions) -> Vec<ChannelRecord> {
    let scan = text
        .lines()
        .fold(ScanState::new(options), |state, line| {
            state.step(line.trim(), options)
        });

    dedupe(scan.emitted)
}

enum Line<'a> {
    GroupDirective(&'a str),
    EntryInfo,
    StreamUrl,
    Other,
}

fn classify<'a>(line: &'a str, options: &ParseOptions) -> Line<'a> {
    if let Some(label) = line.strip_prefix(GROUP_DIRECTIVE) {
        Line::GroupDirective(label.trim())
    } else if line.starts_with(ENTRY_INFO) {
        Line::EntryInfo
    } else if options
        .url_schemes
        .iter()
        .any(|scheme| line.starts_with(scheme.as_str()))
    {
        Line::StreamUrl
    } else {
        Line::Other
    }
}

/// An `#EXTINF` entry still waiting for its URL line
struct PendingEntry {
    id: String,
    name: String,
    logo_url: String,
    group: String,
}

impl PendingEntry {
    fn from_entry_info(line: &str, pending_group: &str, options: &ParseOptions) -> Self {
        let name = resolve_name(line, options).unwrap_or_else(|| options.unknown_name.clone());
        let logo_url = attribute(&TVG_LOGO_REGEX, line).unwrap_or_default();
        let group = attribute(&GROUP_TITLE_REGEX, line)
            .filter(|g| !g.is_empty())
            .unwrap_or(pending_group);

        Self {
            id: slugify(&name),
            name,
            logo_url: logo_url.to_string(),
            group: group.to_string(),
        }
    }

    fn complete(self, stream_url: &str) -> ChannelRecord {
        ChannelRecord {
            id: self.id,
            name: self.name,
            logo_url: self.logo_url,
            group: self.group,
            stream_url: stream_url.to_string(),
        }
    }
}

struct ScanState {
    pending_group: String,
    pending_entry: Option<PendingEntry>,
    emitted: Vec<ChannelRecord>,
}

impl ScanState {
    fn new(options: &ParseOptions) -> Self {
        Self {
            pending_group: options.default_group.clone(),
            pending_entry: None,
            emitted: Vec::new(),
        }
    }

    fn step(mut self, line: &str, options: &ParseOptions) -> Self {
        match classify(line, options) {
            Line::GroupDirective(label) if label.is_empty() => {
                self.pending_group.clone_from(&options.default_group);
            }
            Line::GroupDirective(label) => label.clone_into(&mut self.pending_group),
            Line::EntryInfo => {
                self.pending_entry = Some(PendingEntry::from_entry_info(
                    line,
                    &self.pending_group,
                    options,
                ));
            }
            Line::StreamUrl => {
                if let Some(entry) = self.pending_entry.take() {
                    self.emitted.push(entry.complete(line));
                }
            }
            Line::Other => {}
        }
        self
    }
}

fn attribute<'a>(regex: &Regex, line: &'a str) -> Option<&'a str> {
    regex
        .captures(line)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().trim())
}

/// The free-text label after the last comma that is not inside a quoted value
///
/// Lines with unbalanced quotes fall back to the last comma of the line.
fn trailing_label(line: &str) -> Option<&str> {
    let mut in_quotes = false;
    let mut last_comma = None;
    for (idx, ch) in line.char_indices() {
        match ch {
            '"' => in_quotes = !in_quotes,
            ',' if !in_quotes => last_comma = Some(idx),
            _ => {}
        }
    }
    if in_quotes {
        last_comma = line.rfind(',');
    }
    last_comma.map(|idx| line[idx + 1..].trim())
}

fn resolve_name(line: &str, options: &ParseOptions) -> Option<String> {
    let raw = attribute(&TVG_NAME_REGEX, line)
        .filter(|n| !n.is_empty())
        .or_else(|| trailing_label(line).filter(|l| !l.is_empty()))?;

    let stripped = options
        .strip_prefixes
        .iter()
        .find_map(|prefix| raw.strip_prefix(prefix.as_str()))
        .unwrap_or(raw)
        .trim();

    (!stripped.is_empty()).then(|| stripped.to_string())
}

fn dedupe(records: Vec<ChannelRecord>) -> Vec<ChannelRecord> {
    let mut seen = HashSet::new();
    records
        .into_iter()
        .filter(|r| !r.name.is_empty() && !r.stream_url.is_empty())
        .filter(|r| seen.insert(r.id.clone()))
        .collect()
}
