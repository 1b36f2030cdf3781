use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::error::{ImportError, Result};
use super::game::{Game, User, build_game};
use super::log;
use super::study::{PgnSource, StudyFetcher};

/// Where the PGN of an import request comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ImportType {
    LichessChapter,
    LichessStudy,
    Manual,
}

impl ImportType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::LichessChapter => "lichessChapter",
            Self::LichessStudy => "lichessStudy",
            Self::Manual => "manual",
        }
    }
}

impl fmt::Display for ImportType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ImportType {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim() {
            "lichessChapter" => Ok(Self::LichessChapter),
            "lichessStudy" => Ok(Self::LichessStudy),
            "manual" => Ok(Self::Manual),
            other => Err(format!(
                "Invalid import type '{other}'. Supported values: lichessChapter, lichessStudy, manual"
            )),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportRequest {
    #[serde(rename = "type")]
    pub import_type: ImportType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pgn_text: Option<String>,
}

impl ImportRequest {
    fn url(&self) -> Result<&str> {
        self.url
            .as_deref()
            .map(str::trim)
            .filter(|url| !url.is_empty())
            .ok_or_else(|| ImportError::MissingUrl {
                import_type: self.import_type.to_string(),
            })
    }

    fn pgn_text(&self) -> Result<&str> {
        self.pgn_text
            .as_deref()
            .filter(|text| !text.trim().is_empty())
            .ok_or(ImportError::MissingPgnText)
    }
}

/// Resolves `request` to PGN texts and builds a game from each, in order.
///
/// Any game that fails to build fails the whole request.
pub fn import_games<S: PgnSource>(
    user: &User,
    request: &ImportRequest,
    fetcher: &StudyFetcher<S>,
) -> Result<Vec<Game>> {
    let pgns = match request.import_type {
        ImportType::LichessChapter => vec![fetcher.fetch_chapter(request.url()?)?],
        ImportType::LichessStudy => fetcher.fetch_study(request.url()?)?,
        ImportType::Manual => vec![request.pgn_text()?.to_string()],
    };

    let games = pgns
        .iter()
        .map(|pgn| build_game(user, pgn))
        .collect::<Result<Vec<_>>>()?;

    log::debug(format!(
        "Imported {} game(s) via {} for {}",
        games.len(),
        request.import_type,
        user.username
    ));
    Ok(games)
}
