//! PGN ingestion: tag scanning, ply counting, study splitting and game record
//! assembly for the game store.

pub mod chess;

pub use chess::{
    ErrorKind, Game, GameUpdate, HeaderMap, ImportConfig, ImportError, ImportRequest, ImportType,
    PgnParseError, PgnSource, Result, StudyFetcher, User, build_game, build_game_update,
    count_plies, import_games, scan_headers, split_study_dump,
};
