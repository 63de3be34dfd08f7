use chess::{is_valid_uci, AnalysisScore};

use super::UciError;
use crate::GoParams;

/// Incoming message from UCI engine
#[derive(Debug, Clone, PartialEq)]
pub enum UciMessage {
    Id { name: String, value: String },
    UciOk,
    ReadyOk,
    /// `mv` is `None` for `bestmove (none)`, sent when the side to move has no moves.
    BestMove {
        mv: Option<String>,
        ponder: Option<String>,
    },
    Info(EngineInfo),
}

/// Engine analysis information from one `info` line
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EngineInfo {
    pub depth: Option<u32>,
    pub seldepth: Option<u32>,
    pub time_ms: Option<u64>,
    pub nodes: Option<u64>,
    /// Relative to the side to move.
    pub score: Option<AnalysisScore>,
    pub pv: Vec<String>, // Principal variation
    pub multipv: Option<u32>,
    pub currmove: Option<String>,
    pub hashfull: Option<u16>,
    pub nps: Option<u64>,
}

/// Outgoing command to a UCI engine
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UciCommand {
    Uci,
    IsReady,
    SetOption { name: String, value: String },
    Position { fen: String },
    Go(GoParams),
    Stop,
    Quit,
}

impl UciCommand {
    /// The command as a protocol line, without the trailing newline.
    pub fn to_line(&self) -> String {
        match self {
            Self::Uci => "uci".to_string(),
            Self::IsReady => "isready".to_string(),
            Self::SetOption { name, value } => format!("setoption name {} value {}", name, value),
            Self::Position { fen } => format!("position fen {}", fen),
            Self::Go(params) => {
                let mut go_cmd = "go".to_string();
                if let Some(movetime) = params.movetime {
                    go_cmd.push_str(&format!(" movetime {}", movetime));
                } else if let Some(depth) = params.depth {
                    go_cmd.push_str(&format!(" depth {}", depth));
                } else if params.infinite {
                    go_cmd.push_str(" infinite");
                } else {
                    go_cmd.push_str(" movetime 1000"); // Default 1 second
                }
                go_cmd
            }
            Self::Stop => "stop".to_string(),
            Self::Quit => "quit".to_string(),
        }
    }
}

/// Parse a UCI message line
pub fn parse_uci_message(line: &str) -> Result<UciMessage, UciError> {
    let tokens: Vec<&str> = line.split_whitespace().collect();

    match tokens.first() {
        Some(&"uciok") => Ok(UciMessage::UciOk),
        Some(&"readyok") => Ok(UciMessage::ReadyOk),

        Some(&"id") => {
            if tokens.len() < 3 {
                return Err(UciError::MalformedMessage(line.to_string()));
            }
            let name = tokens[1].to_string();
            let value = tokens[2..].join(" ");
            Ok(UciMessage::Id { name, value })
        }

        Some(&"bestmove") => {
            let Some(&best) = tokens.get(1) else {
                return Err(UciError::MalformedMessage(line.to_string()));
            };
            let mv = match best {
                "(none)" | "0000" => None,
                _ => Some(parse_move_token(best)?),
            };
            let ponder = match (tokens.get(2), tokens.get(3)) {
                (Some(&"ponder"), Some(p)) => parse_move_token(p).ok(),
                _ => None,
            };
            Ok(UciMessage::BestMove { mv, ponder })
        }

        Some(&"info") => Ok(UciMessage::Info(parse_info_line(&tokens[1..]))),

        _ => Err(UciError::UnknownMessage(line.to_string())),
    }
}

/// Parse an "info" line from the engine
fn parse_info_line(tokens: &[&str]) -> EngineInfo {
    let mut info = EngineInfo::default();
    let mut i = 0;

    while i < tokens.len() {
        match tokens[i] {
            "depth" => {
                i += 1;
                info.depth = tokens.get(i).and_then(|s| s.parse().ok());
            }
            "seldepth" => {
                i += 1;
                info.seldepth = tokens.get(i).and_then(|s| s.parse().ok());
            }
            "time" => {
                i += 1;
                info.time_ms = tokens.get(i).and_then(|s| s.parse().ok());
            }
            "nodes" => {
                i += 1;
                info.nodes = tokens.get(i).and_then(|s| s.parse().ok());
            }
            "nps" => {
                i += 1;
                info.nps = tokens.get(i).and_then(|s| s.parse().ok());
            }
            "score" => {
                i += 1;
                if let Some(&score_type) = tokens.get(i) {
                    i += 1;
                    if let Some(value_str) = tokens.get(i) {
                        info.score = match score_type {
                            "cp" => value_str.parse().ok().map(AnalysisScore::Centipawns),
                            "mate" => value_str.parse().ok().map(AnalysisScore::Mate),
                            _ => None,
                        };
                    }
                }
            }
            "pv" => {
                // Collect all moves until next keyword
                i += 1;
                while i < tokens.len() && !is_keyword(tokens[i]) {
                    if is_valid_uci(tokens[i]) {
                        info.pv.push(tokens[i].to_string());
                    }
                    i += 1;
                }
                continue; // Don't increment i again
            }
            "multipv" => {
                i += 1;
                info.multipv = tokens.get(i).and_then(|s| s.parse().ok());
            }
            "currmove" => {
                i += 1;
                info.currmove = tokens
                    .get(i)
                    .filter(|s| is_valid_uci(s))
                    .map(|s| s.to_string());
            }
            "hashfull" => {
                i += 1;
                info.hashfull = tokens.get(i).and_then(|s| s.parse().ok());
            }
            // Free text runs to the end of the line.
            "string" => break,
            _ => {
                // Unknown keyword (lowerbound, tbhits, ...), skip
            }
        }
        i += 1;
    }

    info
}

fn is_keyword(token: &str) -> bool {
    matches!(
        token,
        "depth"
            | "seldepth"
            | "time"
            | "nodes"
            | "score"
            | "pv"
            | "multipv"
            | "currmove"
            | "currmovenumber"
            | "hashfull"
            | "nps"
            | "tbhits"
            | "cpuload"
            | "string"
    )
}

fn parse_move_token(token: &str) -> Result<String, UciError> {
    if is_valid_uci(token) {
        Ok(token.to_string())
    } else {
        Err(UciError::InvalidMove(token.to_string()))
    }
}
