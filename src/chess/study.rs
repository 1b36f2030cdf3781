use regex::Regex;

use super::config::ImportConfig;
use super::error::{ImportError, Result, StudyUrlKind};

/// Separator between games in a Lichess study export.
pub const STUDY_SEPARATOR: &str = "\n\n\n[";

/// Appended to a study or chapter URL to get its PGN export with the original
/// (source) annotations.
pub const EXPORT_SUFFIX: &str = ".pgn?source=true";

const STUDY_ID: &str = "[A-Za-z0-9]{8}";

/// Splits a Lichess study export into single-game PGN texts, in order.
///
/// Each fragment after the first gets its leading `[` back; fragments are
/// trimmed and empty ones dropped.
pub fn split_study_dump(text: &str) -> Vec<String> {
    text.split(STUDY_SEPARATOR)
        .enumerate()
        .filter_map(|(i, fragment)| {
            let fragment = fragment.trim();
            if fragment.is_empty() {
                None
            } else if i == 0 {
                Some(fragment.to_string())
            } else {
                Some(format!("[{fragment}"))
            }
        })
        .collect()
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum SplitState {
    Headers,
    Movetext { blank_seen: bool },
}

/// Splits a PGN dump from an arbitrary producer into single-game texts.
///
/// A game starts at a line beginning with `[` that follows at least one blank
/// line after some movetext, so any number of blank lines may separate games.
pub fn split_games(text: &str) -> Vec<String> {
    let mut games = Vec::new();
    let mut state = SplitState::Headers;
    let mut game_start = 0;
    let mut offset = 0;

    for line in text.split_inclusive('\n') {
        let line_start = offset;
        offset += line.len();

        if line.trim().is_empty() {
            if let SplitState::Movetext { .. } = state {
                state = SplitState::Movetext { blank_seen: true };
            }
            continue;
        }

        let starts_tag = line.starts_with('[');
        state = match state {
            SplitState::Movetext { blank_seen: true } if starts_tag => {
                push_trimmed(&mut games, &text[game_start..line_start]);
                game_start = line_start;
                SplitState::Headers
            }
            SplitState::Headers if starts_tag => SplitState::Headers,
            _ => SplitState::Movetext { blank_seen: false },
        };
    }

    push_trimmed(&mut games, &text[game_start..]);
    games
}

fn push_trimmed(games: &mut Vec<String>, fragment: &str) {
    let fragment = fragment.trim();
    if !fragment.is_empty() {
        games.push(fragment.to_string());
    }
}

/// Where study exports come from.
pub trait PgnSource {
    /// Returns the PGN export of an already validated study or chapter URL.
    fn fetch_pgn(&self, url: &str) -> Result<String>;
}

/// Fetches exports over HTTP with a single blocking GET.
pub struct HttpPgnSource {
    client: reqwest::blocking::Client,
}

impl HttpPgnSource {
    pub fn new(config: &ImportConfig) -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .user_agent(config.user_agent.as_str())
            .build()
            .map_err(|e| ImportError::Internal(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { client })
    }
}

fn check_export_status(url: &str, status: u16) -> Result<()> {
    if status == 200 {
        Ok(())
    } else {
        Err(ImportError::StudyUnavailable {
            url: url.to_string(),
            status,
        })
    }
}

impl PgnSource for HttpPgnSource {
    fn fetch_pgn(&self, url: &str) -> Result<String> {
        let export_url = format!("{url}{EXPORT_SUFFIX}");
        let response = self
            .client
            .get(&export_url)
            .send()
            .map_err(|source| ImportError::Network {
                url: export_url.clone(),
                source,
            })?;

        check_export_status(url, response.status().as_u16())?;

        response.text().map_err(|source| ImportError::Network {
            url: export_url,
            source,
        })
    }
}

#[derive(Debug, Clone)]
struct StudyUrlPatterns {
    chapter: Regex,
    study: Regex,
}

impl StudyUrlPatterns {
    fn for_host(host: &str) -> Result<Self> {
        let host = regex::escape(host);
        let compile = |pattern: String| {
            Regex::new(&pattern)
                .map_err(|e| ImportError::Internal(format!("invalid study url pattern: {e}")))
        };

        Ok(Self {
            chapter: compile(format!("^{host}/study/{STUDY_ID}/{STUDY_ID}$"))?,
            study: compile(format!("^{host}/study/{STUDY_ID}$"))?,
        })
    }

    fn check(&self, url: &str, expected: StudyUrlKind) -> Result<()> {
        let pattern = match expected {
            StudyUrlKind::Chapter => &self.chapter,
            StudyUrlKind::Study => &self.study,
        };

        if pattern.is_match(url) {
            Ok(())
        } else {
            Err(ImportError::InvalidStudyUrl {
                url: url.to_string(),
                expected,
            })
        }
    }
}

/// Validates study URLs and pulls their PGN through a [`PgnSource`].
pub struct StudyFetcher<S = HttpPgnSource> {
    source: S,
    patterns: StudyUrlPatterns,
}

impl StudyFetcher<HttpPgnSource> {
    pub fn from_config(config: &ImportConfig) -> Result<Self> {
        Self::new(HttpPgnSource::new(config)?, config)
    }
}

impl<S: PgnSource> StudyFetcher<S> {
    pub fn new(source: S, config: &ImportConfig) -> Result<Self> {
        Ok(Self {
            source,
            patterns: StudyUrlPatterns::for_host(&config.study_host)?,
        })
    }

    /// Fetches one chapter (`<host>/study/<id>/<id>`) as a single PGN text.
    pub fn fetch_chapter(&self, url: &str) -> Result<String> {
        self.patterns.check(url, StudyUrlKind::Chapter)?;
        self.source.fetch_pgn(url)
    }

    /// Fetches a whole study (`<host>/study/<id>`) and splits it into games.
    pub fn fetch_study(&self, url: &str) -> Result<Vec<String>> {
        self.patterns.check(url, StudyUrlKind::Study)?;

        let dump = self.source.fetch_pgn(url)?;
        tracing::debug!("PGN data before splitting: {dump}");
        Ok(split_study_dump(&dump))
    }
}
