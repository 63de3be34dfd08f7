//! reviewtty: post-game review from the terminal.
//!
//! Analyzes a recorded game on Stockfish, stores the review as JSON under the
//! data directory, prints annotated move lists, and drills puzzles built from
//! the player's mistakes. See [`config`] for the environment tunables.

mod config;
mod render;

use std::io::Write as _;

use anyhow::Context;
use chess::{PieceColor, START_FEN};
use clap::{Parser, Subcommand, ValueEnum};
use engine::{EngineConfig, EnginePool, EngineSettings, StockfishLauncher};
use review::{
    analyze_game, puzzles_from_review, AnalysisProgress, AnalyzeOptions, FirstPlies, GameRecord,
    GameReview, JsonReviewStore, MoveVerdict, PuzzleSession, PuzzleState, ReviewRepository,
};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "reviewtty", about = "Engine-backed chess game review")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Analyze a game and store its review.
    Analyze {
        /// Played moves in UCI notation, e.g. `e2e4 e7e5 g1f3`.
        #[arg(required = true)]
        moves: Vec<String>,
        /// Position the game started from.
        #[arg(long, default_value = START_FEN)]
        start_fen: String,
        /// Review id; generated when omitted.
        #[arg(long)]
        id: Option<String>,
        /// Side you played.
        #[arg(long, value_enum, default_value_t = Side::White)]
        color: Side,
        /// Treat this many opening plies as book moves.
        #[arg(long, default_value_t = 0)]
        book_plies: usize,
        #[command(flatten)]
        search: SearchArgs,
        /// Do not tag engine-matching sacrifices as brilliant.
        #[arg(long)]
        no_brilliant: bool,
    },
    /// Print a stored review.
    Show {
        id: String,
        /// Print the raw JSON document instead.
        #[arg(long)]
        json: bool,
    },
    /// List the puzzles a stored review yields.
    Puzzles {
        id: String,
        /// Whose mistakes to drill; defaults to the reviewed player.
        #[arg(long, value_enum)]
        color: Option<Side>,
    },
    /// Evaluate a single position.
    Eval {
        fen: String,
        #[command(flatten)]
        search: SearchArgs,
    },
    /// Solve the puzzles of a stored review interactively.
    Drill {
        id: String,
        #[arg(long, value_enum)]
        color: Option<Side>,
        /// 1-based puzzle to start from.
        #[arg(long, default_value_t = 1)]
        from: usize,
    },
}

#[derive(clap::Args)]
struct SearchArgs {
    /// Search to a fixed depth.
    #[arg(long, conflicts_with = "movetime")]
    depth: Option<u32>,
    /// Search each position for this many milliseconds.
    #[arg(long)]
    movetime: Option<u64>,
}

impl SearchArgs {
    /// Explicit flags win; otherwise `prefer_depth` picks the configured
    /// depth over the configured move time.
    fn engine_config(&self, prefer_depth: bool) -> EngineConfig {
        let base = EngineConfig::default();
        match (self.depth, self.movetime) {
            (Some(depth), _) => base.with_depth(depth),
            (None, Some(ms)) => base.with_move_time(ms),
            (None, None) if prefer_depth => base.with_depth(config::get_analysis_depth()),
            (None, None) => base.with_move_time(config::get_move_time_ms()),
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum Side {
    White,
    Black,
}

impl From<Side> for PieceColor {
    fn from(side: Side) -> Self {
        match side {
            Side::White => PieceColor::White,
            Side::Black => PieceColor::Black,
        }
    }
}

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error("no review {game_id:?} stored for user {user:?}")]
    ReviewNotFound { user: String, game_id: String },
    #[error("review {game_id:?} has no puzzles for {color}")]
    NoPuzzles { game_id: String, color: &'static str },
    #[error("puzzle #{number} does not exist ({available} available)")]
    PuzzleOutOfRange { number: usize, available: usize },
}

type Pool = EnginePool<StockfishLauncher>;

fn engine_pool() -> Pool {
    let launcher = match config::get_stockfish_path() {
        Some(path) => StockfishLauncher::with_path(path),
        None => StockfishLauncher::new(),
    };
    let settings = EngineSettings {
        timeout_grace: config::get_timeout_grace(),
        ..Default::default()
    };
    EnginePool::new(launcher, settings)
}

/// Install the subscriber. With `REVIEWTTY_LOG_DIR` set, logs go to a daily
/// rolling file and the returned guard must live until exit.
fn init_tracing() -> anyhow::Result<Option<tracing_appender::non_blocking::WorkerGuard>> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    match config::get_log_dir() {
        Some(log_dir) => {
            std::fs::create_dir_all(&log_dir)
                .with_context(|| format!("creating log directory {}", log_dir.display()))?;
            let file_appender = tracing_appender::rolling::daily(log_dir, "reviewtty");
            let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
            tracing_subscriber::registry()
                .with(
                    fmt::layer()
                        .with_writer(non_blocking)
                        .with_ansi(false)
                        .with_target(true)
                        .with_line_number(true),
                )
                .with(filter)
                .init();
            Ok(Some(guard))
        }
        None => {
            tracing_subscriber::registry()
                .with(fmt::layer().with_writer(std::io::stderr))
                .with(filter)
                .init();
            Ok(None)
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let _guard = init_tracing()?;

    let store = JsonReviewStore::new(config::get_data_dir());
    let user = config::get_user();
    tracing::debug!(user = %user, dir = %store.dir().display(), "Using review store");

    match cli.command {
        Commands::Analyze {
            moves,
            start_fen,
            id,
            color,
            book_plies,
            search,
            no_brilliant,
        } => {
            let game = match id {
                Some(id) => GameRecord::new(id, start_fen, moves),
                None => GameRecord::with_generated_id(start_fen, moves),
            };
            let options = AnalyzeOptions {
                config: search.engine_config(true),
                player_color: color.into(),
                detect_brilliant: !no_brilliant,
            };
            let review = run_analysis(&game, &options, &FirstPlies(book_plies)).await?;
            store
                .save_review(&user, &review)
                .await
                .context("saving review")?;
            print!("{}", render::format_review(&review));
            println!("Saved review {}", review.id);
        }
        Commands::Show { id, json } => {
            let review = load(&store, &user, &id).await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&review)?);
            } else {
                print!("{}", render::format_review(&review));
            }
        }
        Commands::Puzzles { id, color } => {
            let review = load(&store, &user, &id).await?;
            let puzzles = puzzles_for(&review, color)?;
            for (i, puzzle) in puzzles.iter().enumerate() {
                println!("{}", render::format_puzzle(i + 1, puzzle));
            }
        }
        Commands::Eval { fen, search } => {
            evaluate(&fen, &search.engine_config(false)).await?;
        }
        Commands::Drill { id, color, from } => {
            let review = load(&store, &user, &id).await?;
            let puzzles = puzzles_for(&review, color)?;
            if from == 0 || from > puzzles.len() {
                return Err(CliError::PuzzleOutOfRange {
                    number: from,
                    available: puzzles.len(),
                }
                .into());
            }
            drill(puzzles, from - 1).await?;
        }
    }

    Ok(())
}

async fn load(store: &JsonReviewStore, user: &str, game_id: &str) -> anyhow::Result<GameReview> {
    store
        .load_review(user, game_id)
        .await
        .with_context(|| format!("loading review {}", game_id))?
        .ok_or_else(|| {
            CliError::ReviewNotFound {
                user: user.to_string(),
                game_id: game_id.to_string(),
            }
            .into()
        })
}

fn puzzles_for(review: &GameReview, color: Option<Side>) -> anyhow::Result<Vec<PuzzleSession>> {
    let color = color.map_or(review.player_color, PieceColor::from);
    let puzzles = puzzles_from_review(review, color);
    if puzzles.is_empty() {
        return Err(CliError::NoPuzzles {
            game_id: review.id.clone(),
            color: color.as_str(),
        }
        .into());
    }
    Ok(puzzles)
}

async fn run_analysis(
    game: &GameRecord,
    options: &AnalyzeOptions,
    book: &FirstPlies,
) -> anyhow::Result<GameReview> {
    let pool = engine_pool();
    let owner = format!("analyze-{}", game.id);
    let engine = pool
        .acquire(&owner, &options.config)
        .await
        .context("starting Stockfish")?;

    let (tx, mut rx) = mpsc::channel::<AnalysisProgress>(16);
    let reporter = tokio::spawn(async move {
        while let Some(progress) = rx.recv().await {
            eprint!("\rAnalyzing position {}/{}", progress.evaluated, progress.total);
            let _ = std::io::stderr().flush();
        }
        eprintln!();
    });

    let result = analyze_game(&engine, game, options, book, Some(&tx)).await;
    drop(tx);
    let _ = reporter.await;
    pool.release(&owner).await;

    result.context("analyzing game")
}

async fn evaluate(fen: &str, engine_config: &EngineConfig) -> anyhow::Result<()> {
    let pool = engine_pool();
    let engine = pool
        .acquire("eval", engine_config)
        .await
        .context("starting Stockfish")?;
    let result = engine.analyze(fen, engine_config).await;
    pool.release("eval").await;

    let result = result.context("evaluating position")?;
    let best = chess::rules::san_for(fen, &result.best_move_uci)
        .unwrap_or_else(|_| result.best_move_uci.clone());
    println!("Best move: {} ({})", best, result.best_move_uci);
    println!("Evaluation: {}", render::format_eval(result.eval_cp));
    if let Some(depth) = result.depth {
        println!("Depth: {}", depth);
    }
    if !result.principal_variation.is_empty() {
        println!("Line: {}", result.principal_variation.join(" "));
    }
    if result.timed_out {
        println!("(search timed out; best move so far)");
    }
    Ok(())
}

async fn drill(puzzles: Vec<PuzzleSession>, start: usize) -> anyhow::Result<()> {
    let total = puzzles.len();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut clean = 0;

    println!("Enter moves in UCI notation. Commands: hint, reveal, skip, quit.");
    for (i, mut puzzle) in puzzles.into_iter().enumerate().skip(start) {
        println!("\n{}", render::format_puzzle(i + 1, &puzzle));

        while puzzle.state() != PuzzleState::Completed {
            print!("> ");
            std::io::stdout().flush()?;
            let Some(line) = lines.next_line().await? else {
                return Ok(());
            };

            match line.trim() {
                "" => {}
                "quit" | "q" => return Ok(()),
                "skip" => break,
                "hint" => {
                    puzzle.toggle_hint();
                    match puzzle.hint() {
                        Some(square) => println!("Move the piece on {}", square),
                        None => println!("Hint hidden"),
                    }
                }
                "reveal" => {
                    if let Some(uci) = puzzle.expected_move() {
                        println!("Solution: {}", uci);
                    }
                }
                uci => match puzzle.submit_move(uci) {
                    Ok(MoveVerdict::Correct) => {
                        println!("Correct");
                        if puzzle.state() == PuzzleState::OpponentReplying {
                            let reply = puzzle.expected_move().map(str::to_string);
                            puzzle.settle().await;
                            if let Some(reply) = reply {
                                println!("Opponent plays {}", reply);
                            }
                        }
                    }
                    Ok(MoveVerdict::Wrong) => {
                        println!("Not the move, try again");
                        puzzle.settle().await;
                    }
                    Err(e) => println!("{}", e),
                },
            }
        }

        if puzzle.is_clean_solve() {
            clean += 1;
            println!("Solved cleanly");
        } else if puzzle.state() == PuzzleState::Completed {
            println!("Solved after {} wrong attempt(s)", puzzle.wrong_attempts());
        }
    }

    println!("\n{}/{} solved without a mistake", clean, total - start);
    Ok(())
}
