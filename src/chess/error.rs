use std::fmt;
use std::io;

use thiserror::Error;

pub type Result<T, E = ImportError> = std::result::Result<T, E>;

/// Which side of the boundary a failure belongs to.
///
/// Web handlers map `ClientInput` to a 4xx response and `TransientServer` to a
/// 5xx response; nothing in this crate knows about transport.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ErrorKind {
    ClientInput,
    TransientServer,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ClientInput => f.write_str("client input error"),
            Self::TransientServer => f.write_str("transient server error"),
        }
    }
}

/// Shape a study URL is expected to have.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum StudyUrlKind {
    Chapter,
    Study,
}

impl fmt::Display for StudyUrlKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Chapter => f.write_str("chapter"),
            Self::Study => f.write_str("study"),
        }
    }
}

#[derive(Debug, Error)]
pub enum ImportError {
    #[error("Invalid request: url `{url}` does not match the Lichess {expected} format")]
    InvalidStudyUrl { url: String, expected: StudyUrlKind },

    #[error(
        "Invalid request: lichess returned status `{status}` for `{url}`. The study must be unlisted or public."
    )]
    StudyUnavailable { url: String, status: u16 },

    #[error("Invalid request: PGN header `{line}` has wrong format")]
    MalformedHeader { line: String },

    #[error("Invalid request: PGN missing `{tag}` tag")]
    MissingRequiredTag { tag: &'static str },

    #[error("Invalid request: PGN `Date` tag `{value}` must be in YYYY.MM.DD format")]
    InvalidDateFormat { value: String },

    #[error("Invalid request: PGN headers are not followed by a blank line (after `{last_header}`)")]
    MalformedPgn { last_header: String },

    #[error("Invalid request: import type `{import_type}` requires a url")]
    MissingUrl { import_type: String },

    #[error("Invalid request: no PGN text supplied")]
    MissingPgnText,

    #[error("Invalid compression value '{value}'. Supported values: plain, zstd")]
    InvalidCompression { value: String },

    #[error("Temporary server error: failed to fetch `{url}`: {source}")]
    Network {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("Temporary server error: {context}: {source}")]
    Io {
        context: String,
        #[source]
        source: io::Error,
    },

    #[error("Temporary server error: {0}")]
    Internal(String),
}

impl ImportError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidStudyUrl { .. }
            | Self::StudyUnavailable { .. }
            | Self::MalformedHeader { .. }
            | Self::MissingRequiredTag { .. }
            | Self::InvalidDateFormat { .. }
            | Self::MalformedPgn { .. }
            | Self::MissingUrl { .. }
            | Self::MissingPgnText
            | Self::InvalidCompression { .. } => ErrorKind::ClientInput,
            Self::Network { .. } | Self::Io { .. } | Self::Internal(_) => {
                ErrorKind::TransientServer
            }
        }
    }

    pub fn is_client_error(&self) -> bool {
        self.kind() == ErrorKind::ClientInput
    }

    pub(crate) fn io(context: impl Into<String>, source: io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }
}

/// Movetext that could not be tokenized into a move sequence.
///
/// Never propagated out of the game builder: ply counting is best effort.
#[derive(Debug, Error)]
pub enum PgnParseError {
    #[error("unexpected token `{token}` in movetext")]
    UnexpectedToken { token: String },

    #[error("unterminated comment starting with `{fragment}`")]
    UnterminatedComment { fragment: String },

    #[error("unmatched `)` in movetext")]
    UnmatchedVariationEnd,

    #[error("{open} variation(s) left open, starting at `{fragment}`")]
    UnclosedVariation { open: usize, fragment: String },

    #[error("mainline has {tokens} move(s) but pgn-reader read {reader}")]
    MainlineMismatch { tokens: u32, reader: u32 },

    #[error("no game found in PGN text")]
    NoGame,

    #[error("failed to read movetext: {0}")]
    Read(#[from] io::Error),
}
