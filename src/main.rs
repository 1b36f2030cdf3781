use std::io::{self, BufWriter, Read, Write};
use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use clap::{Args, Parser, Subcommand};
use serde::Serialize;

use pgn_import::chess::{
    ImportConfig, ImportRequest, ImportType, StudyFetcher, User, build_game, build_game_update,
    config::{DEFAULT_STUDY_HOST, STUDY_HOST_ENV, USER_AGENT_ENV},
    import_games, log,
    reader::{CompressionMode, expand_paths, read_pgn_files},
    split_games,
};

/// Turns PGN text into game records, one JSON document per line on stdout
#[derive(Parser)]
#[command(version)]
struct Cli {
    /// Host study URLs must belong to
    #[arg(long, env = STUDY_HOST_ENV, default_value = DEFAULT_STUDY_HOST)]
    study_host: String,

    /// User-Agent sent when fetching studies
    #[arg(long, env = USER_AGENT_ENV)]
    user_agent: Option<String>,

    /// Emit updates (white, black, headers, pgn) instead of new game records
    #[arg(long, global = true)]
    update: bool,

    #[command(flatten)]
    owner: OwnerArgs,

    #[command(subcommand)]
    command: Command,
}

#[derive(Args)]
struct OwnerArgs {
    #[arg(long, env = "PGN_IMPORT_USERNAME", default_value = "")]
    username: String,

    #[arg(long, env = "PGN_IMPORT_DISPLAY_NAME", default_value = "")]
    display_name: String,

    #[arg(long, env = "PGN_IMPORT_COHORT", default_value = "")]
    cohort: String,

    #[arg(long, env = "PGN_IMPORT_PREVIOUS_COHORT", default_value = "")]
    previous_cohort: String,
}

impl From<OwnerArgs> for User {
    fn from(args: OwnerArgs) -> Self {
        Self {
            username: args.username,
            display_name: args.display_name,
            dojo_cohort: args.cohort,
            previous_cohort: args.previous_cohort,
        }
    }
}

#[derive(Subcommand)]
enum Command {
    /// Import one chapter: <host>/study/<studyId>/<chapterId>
    Chapter { url: String },
    /// Import every chapter of a study: <host>/study/<studyId>
    Study { url: String },
    /// Import local PGN files (glob patterns and .zst files accepted)
    File {
        pattern: String,
        /// plain or zstd; detected from the extension when omitted
        #[arg(long)]
        compression: Option<String>,
    },
    /// Import a single game read from stdin
    Text,
}

fn read_stdin() -> Result<String> {
    let mut text = String::new();
    io::stdin()
        .read_to_string(&mut text)
        .context("Failed to read PGN from stdin")?;
    Ok(text)
}

fn write_json_line<T: Serialize>(out: &mut impl Write, value: &T) -> Result<()> {
    serde_json::to_writer(&mut *out, value).context("Failed to serialize record")?;
    writeln!(out)?;
    Ok(())
}

fn write_record(out: &mut impl Write, owner: &User, pgn: &str, update: bool) -> Result<()> {
    if update {
        write_json_line(out, &build_game_update(pgn)?)
    } else {
        write_json_line(out, &build_game(owner, pgn)?)
    }
}

/// Local dumps may mix good and bad games (and, with a glob, unreadable
/// files); those are logged and skipped.
fn import_files(
    out: &mut impl Write,
    owner: &User,
    pattern: &str,
    compression: Option<&str>,
    update: bool,
) -> Result<()> {
    let compression = compression.map(CompressionMode::parse).transpose()?;
    let paths: Vec<PathBuf> = expand_paths(pattern)?;

    let mut skipped = 0usize;
    for (path, text) in read_pgn_files(&paths, compression)? {
        for (index, pgn) in split_games(&text).iter().enumerate() {
            if let Err(e) = write_record(out, owner, pgn, update) {
                skipped += 1;
                log::warn(format!(
                    "Skipping game: file='{}'; game_index={}; error={e:#}",
                    path.display(),
                    index + 1
                ));
            }
        }
    }

    if skipped > 0 {
        log::warn(format!("{skipped} game(s) skipped"));
    }
    Ok(())
}

fn import_config(cli: &Cli) -> Result<ImportConfig> {
    let defaults = ImportConfig::default();
    let config = ImportConfig::new(
        &cli.study_host,
        cli.user_agent.as_deref().unwrap_or(&defaults.user_agent),
    )?;
    Ok(config)
}

fn main() -> Result<()> {
    log::init();

    let cli = Cli::parse();
    let config = import_config(&cli)?;
    let owner = User::from(cli.owner);

    let stdout = io::stdout();
    let mut out = BufWriter::new(stdout.lock());

    if let Command::File {
        pattern,
        compression,
    } = &cli.command
    {
        import_files(&mut out, &owner, pattern, compression.as_deref(), cli.update)?;
        out.flush()?;
        return Ok(());
    }

    let fetcher = StudyFetcher::from_config(&config)?;

    if cli.update {
        let texts = match &cli.command {
            Command::Chapter { url } => vec![fetcher.fetch_chapter(url)?],
            Command::Study { url } => fetcher.fetch_study(url)?,
            Command::Text => vec![read_stdin()?],
            Command::File { .. } => bail!("file imports are handled above"),
        };
        for pgn in &texts {
            write_json_line(&mut out, &build_game_update(pgn)?)?;
        }
    } else {
        let request = match &cli.command {
            Command::Chapter { url } => ImportRequest {
                import_type: ImportType::LichessChapter,
                url: Some(url.clone()),
                pgn_text: None,
            },
            Command::Study { url } => ImportRequest {
                import_type: ImportType::LichessStudy,
                url: Some(url.clone()),
                pgn_text: None,
            },
            Command::Text => ImportRequest {
                import_type: ImportType::Manual,
                url: None,
                pgn_text: Some(read_stdin()?),
            },
            Command::File { .. } => bail!("file imports are handled above"),
        };
        for game in import_games(&owner, &request, &fetcher)? {
            write_json_line(&mut out, &game)?;
        }
    }

    out.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_study_host_defaults_to_config_default() {
        let cli = Cli::try_parse_from(["pgn-import", "--user-agent", "tests", "text"]).unwrap();
        let config = import_config(&cli).unwrap();

        if std::env::var_os(STUDY_HOST_ENV).is_none() {
            assert_eq!(config.study_host, DEFAULT_STUDY_HOST);
        }
        assert_eq!(config.user_agent, "tests");
    }

    #[test]
    fn test_study_host_flag_is_normalized_and_validated() {
        let cli = Cli::try_parse_from([
            "pgn-import",
            "--study-host",
            "http://localhost:8080/",
            "study",
            "http://localhost:8080/study/Ab3dEf7h",
        ])
        .unwrap();
        assert_eq!(import_config(&cli).unwrap().study_host, "http://localhost:8080");

        let cli = Cli::try_parse_from(["pgn-import", "--study-host", "localhost", "text"]).unwrap();
        assert!(import_config(&cli).is_err());
    }

    #[test]
    fn test_update_flag_is_global() {
        let cli = Cli::try_parse_from(["pgn-import", "file", "games/*.pgn", "--update"]).unwrap();
        assert!(cli.update);
        assert!(matches!(cli.command, Command::File { ref pattern, .. } if pattern == "games/*.pgn"));
    }
}
