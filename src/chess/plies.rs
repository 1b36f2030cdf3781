use std::borrow::Cow;
use std::io;
use std::sync::LazyLock;

use pgn_reader::Reader;
use regex::Regex;
use shakmaty::san::SanPlus;
use smallvec::SmallVec;

use super::error::PgnParseError;
use super::visitor::MainlineCounter;

static MOVE_NUMBER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[0-9]+(\.*)(.*)$").expect("valid move number pattern"));

const EXCERPT_LEN: usize = 24;

/// Byte offsets of the open `(`, innermost last.
type VariationStack = SmallVec<[usize; 8]>;

/// Mainline moves found by the tokenizer, and where the mainline ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Mainline {
    half_moves: u32,
    end: usize,
}

fn is_result(token: &str) -> bool {
    matches!(token, "1-0" | "0-1" | "1/2-1/2" | "*")
}

fn is_annotation(token: &str) -> bool {
    !token.is_empty() && token.chars().all(|c| c == '!' || c == '?')
}

fn is_nag(token: &str) -> bool {
    token
        .strip_prefix('$')
        .is_some_and(|n| !n.is_empty() && n.bytes().all(|b| b.is_ascii_digit()))
}

fn excerpt(s: &str) -> String {
    s.chars().take(EXCERPT_LEN).collect()
}

/// `0-0` / `0-0-0` spelled with zeros, as pasted games often are.
fn normalize_castling(san: &str) -> Cow<'_, str> {
    if san.starts_with("0-0") {
        Cow::Owned(san.replace('0', "O"))
    } else {
        Cow::Borrowed(san)
    }
}

fn check_san(token: &str) -> Result<(), PgnParseError> {
    let san = normalize_castling(token.trim_end_matches(['!', '?']));
    if san.parse::<SanPlus>().is_err() {
        return Err(PgnParseError::UnexpectedToken {
            token: token.to_string(),
        });
    }
    Ok(())
}

/// Returns whether `token` carries a move.
fn check_token(token: &str) -> Result<bool, PgnParseError> {
    if is_annotation(token) || is_nag(token) || is_result(token) {
        return Ok(false);
    }

    if let Some(caps) = MOVE_NUMBER.captures(token) {
        let dots = caps.get(1).map_or("", |m| m.as_str());
        let rest = caps.get(2).map_or("", |m| m.as_str());
        if rest.is_empty() {
            return Ok(false);
        }
        // `1.e4` / `3...Nf6`; without dots the token is not a move number.
        if !dots.is_empty() {
            return check_san(rest).map(|()| true);
        }
    }

    check_san(token).map(|()| true)
}

/// Skips the tag-pair lines (and blank lines) at the top of a game.
fn movetext_of(pgn: &str) -> &str {
    let mut offset = 0;
    for line in pgn.split_inclusive('\n') {
        let trimmed = line.trim();
        if !trimmed.is_empty() && !trimmed.starts_with('[') {
            break;
        }
        offset += line.len();
    }
    &pgn[offset..]
}

fn line_end(text: &str, from: usize) -> usize {
    text[from..].find('\n').map_or(text.len(), |n| from + n)
}

/// Tokenizes `movetext`: comments and variations must balance and every move
/// token must be SAN. Moves outside variations are counted. Stops after the
/// mainline result.
fn scan_movetext(movetext: &str) -> Result<Mainline, PgnParseError> {
    let mut open = VariationStack::new();
    let mut half_moves = 0;
    let mut i = 0;

    while let Some(c) = movetext[i..].chars().next() {
        match c {
            '{' => {
                let close = movetext[i..].find('}').ok_or_else(|| {
                    PgnParseError::UnterminatedComment {
                        fragment: excerpt(&movetext[i..]),
                    }
                })?;
                i += close + 1;
            }
            ';' => i = line_end(movetext, i),
            '%' if i == 0 || movetext.as_bytes()[i - 1] == b'\n' => i = line_end(movetext, i),
            '(' => {
                open.push(i);
                i += 1;
            }
            ')' => {
                open.pop().ok_or(PgnParseError::UnmatchedVariationEnd)?;
                i += 1;
            }
            '}' => {
                return Err(PgnParseError::UnexpectedToken {
                    token: "}".to_string(),
                });
            }
            c if c.is_whitespace() => i += c.len_utf8(),
            _ => {
                let end = movetext[i..]
                    .find(|c: char| c.is_whitespace() || "{}();".contains(c))
                    .map_or(movetext.len(), |n| i + n);
                let token = &movetext[i..end];

                if open.is_empty() && is_result(token) {
                    return Ok(Mainline { half_moves, end });
                }
                if check_token(token)? && open.is_empty() {
                    half_moves += 1;
                }
                i = end;
            }
        }
    }

    if let Some(&outermost) = open.first() {
        return Err(PgnParseError::UnclosedVariation {
            open: open.len(),
            fragment: excerpt(&movetext[outermost..]),
        });
    }
    Ok(Mainline {
        half_moves,
        end: movetext.len(),
    })
}

/// Movetext with blank lines dropped; pgn-reader ends a game at a blank line.
fn without_blank_lines(movetext: &str) -> String {
    movetext
        .split_inclusive('\n')
        .filter(|line| !line.trim().is_empty())
        .collect()
}

/// Number of SAN moves on the mainline of a single game.
///
/// The tokenizer count is confirmed by replaying the same mainline through
/// pgn-reader.
pub fn count_half_moves(pgn: &str) -> Result<u32, PgnParseError> {
    let movetext = movetext_of(pgn);
    let mainline = scan_movetext(movetext)?;

    let replay = without_blank_lines(&movetext[..mainline.end]);
    let mut reader = Reader::new(io::Cursor::new(replay.as_bytes()));
    let counted = reader
        .read_game(&mut MainlineCounter)?
        .ok_or(PgnParseError::NoGame)?;

    if counted != mainline.half_moves {
        return Err(PgnParseError::MainlineMismatch {
            tokens: mainline.half_moves,
            reader: counted,
        });
    }
    Ok(counted)
}

/// Value recorded in the `PlyCount` header: the number of nodes on the
/// mainline of the game tree, starting position included.
///
/// `1. e4 e5 2. Nf3 *` therefore counts 4, consistent with the counts already
/// stored for previously imported games.
pub fn count_plies(pgn: &str) -> Result<u32, PgnParseError> {
    count_half_moves(pgn).map(|half_moves| half_moves + 1)
}
