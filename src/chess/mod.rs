pub mod config;
pub mod error;
pub mod game;
pub mod headers;
pub mod import;
pub mod log;
pub mod plies;
pub mod reader;
pub mod study;
mod visitor;

pub use config::{ConfigError, ImportConfig};
pub use error::{ErrorKind, ImportError, PgnParseError, Result, StudyUrlKind};
pub use game::{Game, GameUpdate, User, build_game, build_game_update};
pub use headers::{HeaderBlock, HeaderMap, scan_header_block, scan_headers};
pub use import::{ImportRequest, ImportType, import_games};
pub use plies::{count_half_moves, count_plies};
pub use study::{HttpPgnSource, PgnSource, StudyFetcher, split_games, split_study_dump};
