use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::error::{ImportError, Result};
use super::headers::{HeaderBlock, HeaderMap, scan_header_block};
use super::log;
use super::plies::count_plies;

pub const WHITE_TAG: &str = "White";
pub const BLACK_TAG: &str = "Black";
pub const DATE_TAG: &str = "Date";
pub const PLY_COUNT_TAG: &str = "PlyCount";

/// `featuredAt` value of games that were never featured.
pub const NOT_FEATURED: &str = "NOT_FEATURED";

static DATE_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[0-9]{4}\.[0-9]{2}\.[0-9]{2}$").expect("valid date pattern"));

/// Owner of an import, as supplied by the user directory.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub username: String,
    pub display_name: String,
    pub dojo_cohort: String,
    pub previous_cohort: String,
}

/// Canonical record handed to the game store on creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Game {
    pub cohort: String,
    /// `<Date>_<uuid>`, so ids sort by game date.
    pub id: String,
    pub white: String,
    pub black: String,
    pub date: String,
    pub owner: String,
    pub owner_display_name: String,
    pub owner_previous_cohort: String,
    pub headers: HeaderMap,
    pub is_featured: bool,
    pub featured_at: String,
    pub pgn: String,
}

/// Fields of an existing game that a re-upload of its PGN replaces. Unset
/// fields are left untouched by the store.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GameUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub white: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub black: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub headers: Option<HeaderMap>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pgn: Option<String>,
}

fn required_tag<'a>(headers: &'a HeaderMap, tag: &'static str) -> Result<&'a str> {
    headers
        .get(tag)
        .ok_or(ImportError::MissingRequiredTag { tag })
}

fn check_date(date: &str) -> Result<()> {
    if DATE_PATTERN.is_match(date) {
        Ok(())
    } else {
        Err(ImportError::InvalidDateFormat {
            value: date.to_string(),
        })
    }
}

/// Game id: the date first, so ids order by date, then a fresh v4 UUID.
pub fn game_id(date: &str) -> String {
    format!("{date}_{}", Uuid::new_v4())
}

/// Adds a computed `PlyCount` header when the game does not have one.
///
/// Returns the (possibly rewritten) text and header map. A movetext that
/// cannot be counted is logged and the input is returned unchanged; a header
/// block without a blank line after it is an error.
fn with_ply_count(block: HeaderBlock, pgn_text: &str) -> Result<(HeaderMap, String)> {
    if block.headers.contains_key(PLY_COUNT_TAG) {
        return Ok((block.headers, pgn_text.to_string()));
    }

    let plies = match count_plies(pgn_text) {
        Ok(plies) => plies.to_string(),
        Err(e) => {
            log::warn(format!("Failed to add PlyCount header: {e}"));
            return Ok((block.headers, pgn_text.to_string()));
        }
    };

    let pgn = block.append_header_line(pgn_text, PLY_COUNT_TAG, &plies)?;
    let mut headers = block.headers;
    headers.insert(PLY_COUNT_TAG, plies);
    Ok((headers, pgn))
}

/// Builds the record for a newly imported game owned by `user`.
pub fn build_game(user: &User, pgn_text: &str) -> Result<Game> {
    let block = scan_header_block(pgn_text)?;

    let white = required_tag(&block.headers, WHITE_TAG)?.to_lowercase();
    let black = required_tag(&block.headers, BLACK_TAG)?.to_lowercase();
    let date = required_tag(&block.headers, DATE_TAG)?.to_string();
    check_date(&date)?;

    let (headers, pgn) = with_ply_count(block, pgn_text)?;
    let id = game_id(&date);
    log::debug(format!("Built game {id} for owner {}", user.username));

    Ok(Game {
        cohort: user.dojo_cohort.clone(),
        id,
        white,
        black,
        date,
        owner: user.username.clone(),
        owner_display_name: user.display_name.clone(),
        owner_previous_cohort: user.previous_cohort.clone(),
        headers,
        is_featured: false,
        featured_at: NOT_FEATURED.to_string(),
        pgn,
    })
}

/// Builds the update for an existing game from its re-uploaded PGN.
///
/// The date is not part of an update, so only `White` and `Black` are
/// required and names are kept as written.
pub fn build_game_update(pgn_text: &str) -> Result<GameUpdate> {
    let block = scan_header_block(pgn_text)?;

    let white = required_tag(&block.headers, WHITE_TAG)?.to_string();
    let black = required_tag(&block.headers, BLACK_TAG)?.to_string();

    let (headers, pgn) = with_ply_count(block, pgn_text)?;

    Ok(GameUpdate {
        white: Some(white),
        black: Some(black),
        headers: Some(headers),
        pgn: Some(pgn),
    })
}
