use std::collections::VecDeque;

use parlor::logging;
use parlor::prelude::*;
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Game types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
enum Cell {
    #[serde(rename = ".")]
    Empty,
    X,
    O,
}

type Board = [[Cell; 3]; 3];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Move {
    pub row: usize,
    pub col: usize,
}

/// `start` body: who plays which mark.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct Seats {
    x: PlayerIdentity,
    o: PlayerIdentity,
}

/// `state` body. `turn` is `None` once the game is over.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct Snapshot {
    board: Board,
    turn: Option<Cell>,
}

/// `end` body. No winner means a draw.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct Outcome {
    winner: Option<PlayerIdentity>,
    reason: String,
}

/// `reject` body.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct Rejection {
    reason: String,
}

// ---------------------------------------------------------------------------
// Game logic
// ---------------------------------------------------------------------------

struct Game {
    board: Board,
    seats: [PlayerIdentity; 2],
    turn: usize, // index into seats: 0 = X, 1 = O
    outcome: Option<Outcome>,
}

impl Game {
    fn new(x: PlayerIdentity, o: PlayerIdentity) -> Self {
        Self {
            board: [[Cell::Empty; 3]; 3],
            seats: [x, o],
            turn: 0,
            outcome: None,
        }
    }

    fn mark(&self) -> Cell {
        if self.turn == 0 { Cell::X } else { Cell::O }
    }

    fn validate(&self, sender: &PlayerIdentity, mv: &Move) -> Result<(), String> {
        if self.outcome.is_some() {
            return Err("game is over".into());
        }
        if &self.seats[self.turn] != sender {
            return Err("not your turn".into());
        }
        if mv.row >= 3 || mv.col >= 3 {
            return Err("row and col must be 0-2".into());
        }
        if self.board[mv.row][mv.col] != Cell::Empty {
            return Err("cell is occupied".into());
        }
        Ok(())
    }

    /// Places the current mark. Call [`validate`](Self::validate) first.
    fn apply(&mut self, mv: Move) {
        let mark = self.mark();
        self.board[mv.row][mv.col] = mark;

        if check_winner(&self.board, mark) {
            self.outcome = Some(Outcome {
                winner: Some(self.seats[self.turn].clone()),
                reason: format!("{mark:?} wins"),
            });
        } else if board_full(&self.board) {
            self.outcome = Some(Outcome {
                winner: None,
                reason: "draw".into(),
            });
        } else {
            self.turn = 1 - self.turn;
        }
    }

    fn snapshot(&self) -> Snapshot {
        Snapshot {
            board: self.board,
            turn: self.outcome.is_none().then(|| self.mark()),
        }
    }
}

fn check_winner(b: &Board, m: Cell) -> bool {
    (0..3).any(|i| (0..3).all(|j| b[i][j] == m))           // rows
    || (0..3).any(|j| (0..3).all(|i| b[i][j] == m))        // cols
    || (0..3).all(|i| b[i][i] == m)                         // diagonal
    || (0..3).all(|i| b[i][2 - i] == m)                     // anti-diagonal
}

fn board_full(b: &Board) -> bool {
    b.iter().all(|row| row.iter().all(|c| *c != Cell::Empty))
}

fn render(b: &Board) -> String {
    b.iter()
        .map(|row| {
            row.iter()
                .map(|c| match c {
                    Cell::Empty => ".",
                    Cell::X => "X",
                    Cell::O => "O",
                })
                .collect::<Vec<_>>()
                .join(" | ")
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Wraps `body` in a `{ type, payload }` envelope.
fn envelope<T: Serialize>(kind: &str, body: &T) -> Option<Payload> {
    match Envelope::with_body(kind, body).and_then(|env| env.to_payload()) {
        Ok(payload) => Some(payload),
        Err(e) => {
            tracing::error!(kind, error = %e, "failed to encode envelope");
            None
        }
    }
}

// ---------------------------------------------------------------------------
// Host: the referee
// ---------------------------------------------------------------------------

type Players = ConnectionRegistry<MemoryConnection>;
type Link = HostLink<MemoryConnection>;

/// Seats the first two players, then enforces the rules.
#[derive(Default)]
struct Referee {
    waiting: Option<PlayerIdentity>,
    game: Option<Game>,
}

impl Referee {
    fn reject(players: &Players, to: &PlayerIdentity, reason: impl Into<String>) {
        let reason = reason.into();
        tracing::info!(player = %to, %reason, "action rejected");
        if let Some(payload) = envelope(Envelope::REJECT, &Rejection { reason }) {
            players.send(to.as_str(), payload);
        }
    }

    fn broadcast<T: Serialize>(players: &Players, kind: &str, body: &T) {
        if let Some(payload) = envelope(kind, body) {
            players.broadcast(&payload);
        }
    }
}

impl SessionHooks<Players> for Referee {
    fn on_open(&mut self, players: &mut Players, peer: Peer<'_>) {
        let Some(id) = peer.identity() else { return };

        if let Some(game) = &self.game {
            if game.seats.contains(id) {
                // Back from a reconnect: catch up.
                if let Some(payload) = envelope(Envelope::STATE, &game.snapshot()) {
                    players.send(id.as_str(), payload);
                }
            } else {
                Self::reject(players, id, "room is full");
                players.close(id.as_str());
            }
            return;
        }

        match self.waiting.take() {
            Some(first) if &first != id => {
                let game = Game::new(first, id.clone());
                tracing::info!(x = %game.seats[0], o = %game.seats[1], "game starting");
                let seats = Seats {
                    x: game.seats[0].clone(),
                    o: game.seats[1].clone(),
                };
                Self::broadcast(players, Envelope::START, &seats);
                Self::broadcast(players, Envelope::STATE, &game.snapshot());
                self.game = Some(game);
            }
            _ => self.waiting = Some(id.clone()),
        }
    }

    fn on_data(&mut self, players: &mut Players, peer: Peer<'_>, data: Payload) {
        let Some(id) = peer.identity() else { return };

        let env = match Envelope::from_payload(&data) {
            Ok(env) if env.is(Envelope::ACTION) => env,
            _ => return Self::reject(players, id, "expected an action"),
        };
        let mv: Move = match env.decode_payload() {
            Ok(mv) => mv,
            Err(e) => return Self::reject(players, id, e.to_string()),
        };
        let Some(game) = self.game.as_mut() else {
            return Self::reject(players, id, "game hasn't started");
        };
        if let Err(reason) = game.validate(id, &mv) {
            return Self::reject(players, id, reason);
        }

        game.apply(mv);
        Self::broadcast(players, Envelope::STATE, &game.snapshot());
        if let Some(outcome) = &game.outcome {
            tracing::info!(reason = %outcome.reason, "game over");
            Self::broadcast(players, Envelope::END, outcome);
        }
    }

    fn on_close(&mut self, _players: &mut Players, peer: Peer<'_>) {
        if self.waiting.as_ref() == peer.identity() {
            self.waiting = None;
        }
        tracing::info!(%peer, "player left");
    }
}

// ---------------------------------------------------------------------------
// Player: a scripted bot
// ---------------------------------------------------------------------------

/// Plays its scripted moves in order, one per turn.
struct Bot {
    me: PlayerIdentity,
    moves: VecDeque<Move>,
    mark: Option<Cell>,
    outcome: Option<Outcome>,
    rejections: Vec<String>,
}

impl Bot {
    fn new(me: PlayerIdentity, moves: &[(usize, usize)]) -> Self {
        Self {
            me,
            moves: moves.iter().map(|&(row, col)| Move { row, col }).collect(),
            mark: None,
            outcome: None,
            rejections: Vec::new(),
        }
    }

    fn play(&mut self, host: &mut Link) {
        let Some(mv) = self.moves.pop_front() else {
            tracing::warn!(me = %self.me, "out of moves");
            return;
        };
        if let Some(payload) = envelope(Envelope::ACTION, &mv) {
            host.send(payload);
        }
    }
}

impl SessionHooks<Link> for Bot {
    fn on_data(&mut self, host: &mut Link, _peer: Peer<'_>, data: Payload) {
        let Ok(env) = Envelope::from_payload(&data) else { return };
        match env.kind.as_str() {
            Envelope::START => {
                if let Ok(seats) = env.decode_payload::<Seats>() {
                    self.mark = Some(if seats.x == self.me { Cell::X } else { Cell::O });
                }
            }
            Envelope::STATE => {
                if let Ok(snap) = env.decode_payload::<Snapshot>() {
                    if snap.turn.is_some() && snap.turn == self.mark {
                        self.play(host);
                    }
                }
            }
            Envelope::END => self.outcome = env.decode_payload().ok(),
            Envelope::REJECT => {
                if let Ok(r) = env.decode_payload::<Rejection>() {
                    self.rejections.push(r.reason);
                }
            }
            other => tracing::debug!(kind = other, "ignoring message"),
        }
    }
}

// ---------------------------------------------------------------------------
// Bootstrap
// ---------------------------------------------------------------------------

type RefereeHost = HostSession<MemoryClient, Referee>;
type BotPlayer = PlayerSession<MemoryClient, Bot>;

fn join(
    network: &MemoryNetwork,
    host: &RefereeHost,
    moves: &[(usize, usize)],
) -> Result<BotPlayer, ParlorError> {
    let me = PlayerIdentity::generate();
    let bot = PlayerSessionBuilder::new(host.room_code().clone())
        .identity(me.clone())
        .build(network, Bot::new(me, moves))?;
    Ok(bot)
}

/// Polls every session until nothing is left to do.
fn settle(host: &mut RefereeHost, bots: &mut [&mut BotPlayer]) {
    while host.poll() + bots.iter_mut().map(|b| b.poll()).sum::<usize>() > 0 {}
}

fn main() -> Result<(), ParlorError> {
    logging::init("info");

    let network = MemoryNetwork::new();
    let mut host = HostSessionBuilder::new().build(&network, Referee::default())?;
    println!("room code: {}", host.room_code());

    //  X | X | X
    //  O | O | .
    //  . | . | .
    let mut x = join(&network, &host, &[(0, 0), (0, 1), (0, 2)])?;
    let mut o = join(&network, &host, &[(1, 0), (1, 1)])?;
    settle(&mut host, &mut [&mut x, &mut o]);

    if let Some(game) = &host.hooks().game {
        println!("{}", render(&game.board));
    }
    match &x.hooks().outcome {
        Some(outcome) => println!("{}", outcome.reason),
        None => println!("no result"),
    }
    Ok(())
}
