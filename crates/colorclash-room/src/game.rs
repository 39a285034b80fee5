//! The game room state machine.
//!
//! [`GameRoom`] is plain synchronous state. Every operation validates
//! first and mutates second, so a rejected command leaves the room exactly
//! as it was. Successful operations return the events to fan out as
//! `(Recipient, ServerEvent)` pairs; the room actor resolves recipients
//! against its connections.
//!
//! ```text
//! Waiting ──all ready──→ Playing ──expiry / both out──→ RoundEnded
//!                          │  ▲                            │
//!                          │  └───────all re-ready─────────┤
//!                          │                               │
//!                          └──forfeit──→ GameEnded ←──3 wins┘
//! ```

use std::collections::VecDeque;
use std::time::{SystemTime, UNIX_EPOCH};

use colorclash_protocol::{
    BoardView, Card, GameState, LogEntry, Outcome, PerTeam, PlayerId,
    PlayerView, Position, Recipient, RoomId, RoomSnapshot, RoomSummary,
    ServerEvent, Team,
};
use colorclash_timer::{RoundTimer, TimerEvent, TimerState};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::board::faces_adjacent;
use crate::config::MAX_SEATS;
use crate::{Board, CardFactory, RoomConfig, RoomError, compute_scores};

/// Events produced by one operation, in emission order.
pub type Outbound = Vec<(Recipient, ServerEvent)>;

/// Milliseconds since the Unix epoch.
pub(crate) fn unix_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or_default()
}

/// A seated player. The player's current card is their team's hand card
/// on the board.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Player {
    pub id: PlayerId,
    pub username: String,
    pub team: Team,
    pub is_ready: bool,
}

impl Player {
    fn view(&self) -> PlayerView {
        PlayerView {
            id: self.id,
            username: self.username.clone(),
            team: self.team,
            is_ready: self.is_ready,
        }
    }
}

/// One room: players, board, counters, and the round timer.
#[derive(Debug, Serialize)]
pub struct GameRoom {
    id: RoomId,
    name: String,
    state: GameState,
    /// Seated players in join order.
    players: Vec<Player>,
    board: Board,
    rounds_won: PerTeam<u32>,
    total_points: PerTeam<u32>,
    current_points: PerTeam<u32>,
    team_out: PerTeam<bool>,
    current_round: u32,
    /// Newest first, at most `config.log_capacity` entries.
    logs: VecDeque<LogEntry>,
    created_at: u64,
    #[serde(skip)]
    config: RoomConfig,
    #[serde(skip)]
    cards: CardFactory,
    #[serde(skip)]
    timer: RoundTimer,
}

impl GameRoom {
    /// Creates an empty room in `Waiting` with a freshly dealt board.
    ///
    /// A missing or blank `name` becomes `"Game <id>"`. `max_players` is
    /// capped at [`MAX_SEATS`].
    pub fn new(id: RoomId, name: Option<String>, mut config: RoomConfig) -> Self {
        if config.max_players > MAX_SEATS {
            warn!(
                room_id = %id,
                requested = config.max_players,
                "max_players capped at one seat per team"
            );
            config.max_players = MAX_SEATS;
        }
        let name = name
            .map(|n| n.trim().to_owned())
            .filter(|n| !n.is_empty())
            .unwrap_or_else(|| format!("Game {}", id.0));
        let mut cards = config
            .seed
            .map(CardFactory::seeded)
            .unwrap_or_default();
        let board = Board::new(&mut cards, config.shared_slots);
        let timer = RoundTimer::new(config.timer.clone());

        Self {
            id,
            name,
            state: GameState::Waiting,
            players: Vec::with_capacity(config.max_players),
            board,
            rounds_won: PerTeam::default(),
            total_points: PerTeam::default(),
            current_points: PerTeam::default(),
            team_out: PerTeam::default(),
            current_round: 0,
            logs: VecDeque::with_capacity(config.log_capacity),
            created_at: unix_millis(),
            config,
            cards,
            timer,
        }
    }

    // -----------------------------------------------------------------------
    // Accessors
    // -----------------------------------------------------------------------

    pub fn id(&self) -> RoomId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn state(&self) -> GameState {
        self.state
    }

    pub fn board(&self) -> &Board {
        &self.board
    }

    pub fn players(&self) -> &[Player] {
        &self.players
    }

    pub fn player_count(&self) -> usize {
        self.players.len()
    }

    pub fn is_empty(&self) -> bool {
        self.players.is_empty()
    }

    pub fn player_ids(&self) -> impl Iterator<Item = PlayerId> + '_ {
        self.players.iter().map(|p| p.id)
    }

    pub fn team_of(&self, player: PlayerId) -> Option<Team> {
        self.player(player).map(|p| p.team)
    }

    /// The player's current card (their team's hand card).
    pub fn current_card(&self, player: PlayerId) -> Option<Card> {
        self.team_of(player).map(|team| self.board.player_card(team))
    }

    pub fn rounds_won(&self) -> PerTeam<u32> {
        self.rounds_won
    }

    pub fn total_points(&self) -> PerTeam<u32> {
        self.total_points
    }

    pub fn current_points(&self) -> PerTeam<u32> {
        self.current_points
    }

    pub fn team_out(&self) -> PerTeam<bool> {
        self.team_out
    }

    pub fn current_round(&self) -> u32 {
        self.current_round
    }

    pub fn logs(&self) -> Vec<LogEntry> {
        self.logs.iter().cloned().collect()
    }

    pub fn timer_state(&self) -> TimerState {
        self.timer.state()
    }

    /// Seconds left in the current round, or 0 outside a round.
    pub fn time_left(&self) -> u32 {
        if self.timer.is_running() {
            self.timer.remaining()
        } else {
            0
        }
    }

    pub fn roster(&self) -> Vec<PlayerView> {
        self.players.iter().map(Player::view).collect()
    }

    /// Full state as a member of `team` may see it.
    pub fn snapshot_for(&self, team: Option<Team>) -> RoomSnapshot {
        RoomSnapshot {
            id: self.id,
            name: self.name.clone(),
            state: self.state,
            players: self.roster(),
            board: self.board.view(team),
            rounds_won: self.rounds_won,
            total_points: self.total_points,
            current_points: self.current_points,
            team_out: self.team_out,
            current_round: self.current_round,
            time_left: self.time_left(),
            logs: self.logs(),
        }
    }

    pub fn summary(&self) -> RoomSummary {
        RoomSummary {
            id: self.id,
            name: self.name.clone(),
            player_count: self.players.len(),
            max_players: self.config.max_players,
            state: self.state,
            scores: self.current_points,
            rounds_won: self.rounds_won,
            created_at: self.created_at,
        }
    }

    // -----------------------------------------------------------------------
    // Membership
    // -----------------------------------------------------------------------

    /// Seats the room's creator. Same rules as [`join`](Self::join), but
    /// the creator gets `room-created` instead of `joined`.
    pub fn host(
        &mut self,
        player: PlayerId,
        username: &str,
    ) -> Result<Outbound, RoomError> {
        let team = self.seat(player, username)?;
        let creator = self.players.last().map(|p| p.username.clone());
        if let Some(creator) = creator {
            self.log(format!("Game created by {creator}"));
        }
        info!(room_id = %self.id, player_id = %player, %team, "room hosted");
        Ok(vec![(
            Recipient::Player(player),
            ServerEvent::RoomCreated {
                state: self.snapshot_for(Some(team)),
            },
        )])
    }

    /// Seats a player on the smaller team and deals them a fresh card.
    ///
    /// Checks, in order: blank username, already seated, room full, state.
    pub fn join(
        &mut self,
        player: PlayerId,
        username: &str,
    ) -> Result<Outbound, RoomError> {
        let team = self.seat(player, username)?;
        info!(
            room_id = %self.id,
            player_id = %player,
            %team,
            players = self.players.len(),
            "player joined"
        );
        Ok(vec![
            (
                Recipient::Player(player),
                ServerEvent::Joined {
                    state: self.snapshot_for(Some(team)),
                    your_team: team,
                    your_card: self.board.player_card(team),
                },
            ),
            (
                Recipient::AllExcept(player),
                ServerEvent::PlayerJoined {
                    roster: self.roster(),
                },
            ),
        ])
    }

    fn seat(
        &mut self,
        player: PlayerId,
        username: &str,
    ) -> Result<Team, RoomError> {
        let username = username.trim();
        if username.is_empty() {
            return Err(RoomError::UsernameRequired);
        }
        if self.player(player).is_some() {
            return Err(RoomError::AlreadyInRoom(player, self.id));
        }
        if self.players.len() >= self.config.max_players {
            return Err(RoomError::RoomFull(self.id));
        }
        if !self.state.is_joinable() {
            return Err(RoomError::WrongState {
                action: "join",
                state: self.state,
            });
        }

        let sizes = self.team_sizes();
        let team = if sizes.yellow <= sizes.pink {
            Team::Yellow
        } else {
            Team::Pink
        };
        let card = self.cards.deal(team);
        self.board.replace_player_card(team, card);
        self.players.push(Player {
            id: player,
            username: username.to_owned(),
            team,
            is_ready: false,
        });
        self.log(format!("{username} joined the game on {team} team"));
        Ok(team)
    }

    /// Removes a player.
    ///
    /// Mid-round, if the player's team is left empty while someone is
    /// still seated, the remaining team wins by forfeit: `game-ended`
    /// (forfeited) goes out before `player-left`.
    ///
    /// Between rounds there is no forfeit: a player left alone in a
    /// `RoundEnded` room stays seated in a room that can neither restart
    /// nor take new players, and must disconnect to play again. A
    /// disconnect is final, so that room is never refilled.
    pub fn leave(&mut self, player: PlayerId) -> Result<Outbound, RoomError> {
        let index = self
            .players
            .iter()
            .position(|p| p.id == player)
            .ok_or(RoomError::NotInRoom(player))?;
        let gone = self.players.remove(index);
        self.log(format!("{} left the game", gone.username));
        info!(
            room_id = %self.id,
            player_id = %player,
            team = %gone.team,
            players = self.players.len(),
            "player left"
        );

        let mut events = Outbound::new();
        if self.state == GameState::Playing {
            if self.players.is_empty() {
                self.stop_timer();
            } else if self.team_sizes()[gone.team] == 0 {
                self.forfeit(gone.team, &mut events);
            }
        }
        events.push((
            Recipient::All,
            ServerEvent::PlayerLeft {
                roster: self.roster(),
            },
        ));
        if !self.players.is_empty() {
            self.try_start(&mut events);
        }
        Ok(events)
    }

    fn forfeit(&mut self, deserter: Team, events: &mut Outbound) {
        let winner = deserter.opponent();
        self.stop_timer();
        self.rounds_won[winner] =
            self.rounds_won[winner].max(self.config.rounds_to_win);
        self.state = GameState::GameEnded;
        self.log(format!("{winner} team wins by forfeit"));
        info!(room_id = %self.id, %winner, "game forfeited");
        events.push((
            Recipient::All,
            ServerEvent::GameEnded {
                rounds_won: self.rounds_won,
                total_points: self.total_points,
                outcome: Outcome::Winner(winner),
                forfeited: true,
            },
        ));
    }

    // -----------------------------------------------------------------------
    // Readiness and round flow
    // -----------------------------------------------------------------------

    /// Sets a player's ready flag and starts the next round if everyone
    /// is ready. Allowed while waiting and between rounds.
    pub fn set_ready(
        &mut self,
        player: PlayerId,
        ready: bool,
    ) -> Result<Outbound, RoomError> {
        let index = self.index_of(player)?;
        if !matches!(self.state, GameState::Waiting | GameState::RoundEnded) {
            return Err(RoomError::WrongState {
                action: "change readiness",
                state: self.state,
            });
        }

        if self.players[index].is_ready != ready {
            self.players[index].is_ready = ready;
            let username = &self.players[index].username;
            let message = if ready {
                format!("{username} is ready")
            } else {
                format!("{username} is not ready")
            };
            self.log(message);
        }

        let mut events = vec![(
            Recipient::All,
            ServerEvent::ReadyChanged {
                roster: self.roster(),
                all_ready: self.all_ready(),
            },
        )];
        self.try_start(&mut events);
        Ok(events)
    }

    /// Re-readies a player after a round ended.
    pub fn advance_round(
        &mut self,
        player: PlayerId,
    ) -> Result<Outbound, RoomError> {
        self.index_of(player)?;
        if self.state != GameState::RoundEnded {
            return Err(RoomError::WrongState {
                action: "advance the round",
                state: self.state,
            });
        }
        self.set_ready(player, true)
    }

    fn all_ready(&self) -> bool {
        !self.players.is_empty() && self.players.iter().all(|p| p.is_ready)
    }

    fn try_start(&mut self, events: &mut Outbound) {
        let enough = self.players.len() >= self.config.min_players;
        match self.state {
            GameState::Waiting => {
                let sizes = self.team_sizes();
                let balanced = sizes.yellow.abs_diff(sizes.pink) <= 1;
                if enough && balanced && self.all_ready() {
                    self.start_round(false, events);
                }
            }
            GameState::RoundEnded => {
                if enough && self.all_ready() {
                    self.start_round(true, events);
                }
            }
            GameState::Playing | GameState::GameEnded => {}
        }
    }

    fn start_round(&mut self, fresh_board: bool, events: &mut Outbound) {
        if fresh_board {
            self.board = Board::new(&mut self.cards, self.config.shared_slots);
        }
        self.team_out = PerTeam::default();
        self.current_points = PerTeam::default();
        self.current_round += 1;
        for player in &mut self.players {
            player.is_ready = false;
        }

        self.stop_timer();
        self.timer = RoundTimer::new(self.config.timer.clone());
        let secs = self.config.round_secs.max(1);
        if let Err(error) = self.timer.start(secs) {
            warn!(room_id = %self.id, %error, "round timer failed to start");
        }

        self.state = GameState::Playing;
        let round = self.current_round;
        self.log(format!("Round {round} started"));
        info!(room_id = %self.id, round, secs, "round started");

        for team in Team::ALL {
            events.push((
                Recipient::Team(team),
                ServerEvent::RoundStarted {
                    board: self.board.view(Some(team)),
                    time_left: secs,
                    round,
                },
            ));
        }
    }

    /// Reacts to the round timer. Ticks become `tick` events; expiry ends
    /// the round.
    pub fn on_timer(&mut self, event: TimerEvent) -> Outbound {
        if self.state != GameState::Playing {
            warn!(room_id = %self.id, ?event, state = %self.state, "stale timer event");
            return Outbound::new();
        }
        match event {
            TimerEvent::Tick { remaining } => vec![(
                Recipient::All,
                ServerEvent::Tick {
                    time_left: remaining,
                },
            )],
            TimerEvent::Expired => {
                let mut events = Outbound::new();
                self.end_round(&mut events);
                events
            }
        }
    }

    /// Waits for the next broadcast-worthy timer event. Pends forever
    /// between rounds.
    pub async fn wait_for_timer(&mut self) -> TimerEvent {
        self.timer.wait_for_tick().await
    }

    fn end_round(&mut self, events: &mut Outbound) {
        self.stop_timer();
        let scores = compute_scores(&self.board);
        self.current_points = scores;

        let outcome = match scores.yellow.cmp(&scores.pink) {
            std::cmp::Ordering::Greater => Outcome::Winner(Team::Yellow),
            std::cmp::Ordering::Less => Outcome::Winner(Team::Pink),
            std::cmp::Ordering::Equal => Outcome::Tie,
        };
        if let Some(winner) = outcome.winner() {
            self.rounds_won[winner] += 1;
        }
        for team in Team::ALL {
            self.total_points[team] += scores[team];
        }
        self.team_out = PerTeam::default();
        for player in &mut self.players {
            player.is_ready = false;
        }
        self.state = GameState::RoundEnded;

        let round = self.current_round;
        match outcome {
            Outcome::Winner(team) => self.log(format!(
                "Round {round} won by {team} ({} to {})",
                scores[team],
                scores[team.opponent()]
            )),
            Outcome::Tie => self.log(format!(
                "Round {round} tied at {}",
                scores.yellow
            )),
        }
        info!(
            room_id = %self.id,
            round,
            yellow = scores.yellow,
            pink = scores.pink,
            ?outcome,
            "round ended"
        );
        events.push((
            Recipient::All,
            ServerEvent::RoundEnded {
                scores,
                rounds_won: self.rounds_won,
                total_points: self.total_points,
                outcome,
            },
        ));

        let threshold = self.config.rounds_to_win;
        if self.rounds_won.iter().any(|(_, won)| *won >= threshold) {
            self.end_game(events);
        }
    }

    fn end_game(&mut self, events: &mut Outbound) {
        let outcome = self.game_outcome();
        self.state = GameState::GameEnded;
        match outcome {
            Outcome::Winner(team) => self.log(format!("{team} team wins the game")),
            Outcome::Tie => self.log("The game is a tie".to_owned()),
        }
        info!(room_id = %self.id, ?outcome, "game ended");
        events.push((
            Recipient::All,
            ServerEvent::GameEnded {
                rounds_won: self.rounds_won,
                total_points: self.total_points,
                outcome,
                forfeited: false,
            },
        ));
    }

    /// More rounds won wins; equal rounds fall back to total points.
    fn game_outcome(&self) -> Outcome {
        let (won, total) = (self.rounds_won, self.total_points);
        match won.yellow.cmp(&won.pink).then(total.yellow.cmp(&total.pink)) {
            std::cmp::Ordering::Greater => Outcome::Winner(Team::Yellow),
            std::cmp::Ordering::Less => Outcome::Winner(Team::Pink),
            std::cmp::Ordering::Equal => Outcome::Tie,
        }
    }

    // -----------------------------------------------------------------------
    // In-round actions
    // -----------------------------------------------------------------------

    /// Plays the player's card onto a shared slot of either row.
    ///
    /// The slot gets a card with the player's face and team but the
    /// captured card's value, so points change hands without vanishing.
    /// Hand cards and discard piles never take plays.
    pub fn play_card(
        &mut self,
        player: PlayerId,
        position: Position,
    ) -> Result<Outbound, RoomError> {
        let team = self.playing_team(player, "play a card")?;
        let Position::SharedSlot(target_team, target_slot) = position else {
            return Err(RoomError::NotPlayable(position));
        };
        let target = *self.board.card_at(position).ok_or(
            RoomError::SlotOutOfRange {
                index: target_slot,
                slots: self.board.slots(),
            },
        )?;
        let card = self.board.player_card(team);
        if !faces_adjacent(card.number, target.number) {
            return Err(RoomError::IllegalPlay {
                card: card.number,
                target: target.number,
            });
        }

        let placed = Card::new(card.number, target.value, team);
        self.board.replace_shared(target_team, target_slot, placed);
        let fresh = self.cards.deal(team);
        self.board.replace_player_card(team, fresh);
        self.current_points = compute_scores(&self.board);

        let username = self.username(player);
        self.log(format!(
            "{username} played {} on {} at {position}",
            card.number, target.number
        ));
        debug!(room_id = %self.id, player_id = %player, %position, "card played");

        Ok(self.board_events(|board, logs, scores| ServerEvent::CardPlayed {
            board,
            logs,
            scores,
        }))
    }

    /// Moves the player's card to their team's discard pile and deals a
    /// replacement.
    pub fn discard_card(
        &mut self,
        player: PlayerId,
    ) -> Result<Outbound, RoomError> {
        let team = self.playing_team(player, "discard")?;
        let fresh = self.cards.deal(team);
        let discarded = self.board.discard(team, fresh);
        self.current_points = compute_scores(&self.board);

        let username = self.username(player);
        self.log(format!(
            "{username} discarded {} to {}",
            discarded.number,
            Position::DiscardPile(team)
        ));
        debug!(room_id = %self.id, player_id = %player, "card discarded");

        Ok(self.board_events(|board, logs, scores| {
            ServerEvent::CardDiscarded {
                board,
                logs,
                scores,
            }
        }))
    }

    /// Marks the player's team out for the rest of the round. Calling it
    /// again is a no-op. When both teams are out the round ends.
    pub fn call_team_out(
        &mut self,
        player: PlayerId,
    ) -> Result<Outbound, RoomError> {
        let index = self.index_of(player)?;
        if self.state != GameState::Playing {
            return Err(RoomError::WrongState {
                action: "call out",
                state: self.state,
            });
        }
        let team = self.players[index].team;
        if self.team_out[team] {
            return Ok(Outbound::new());
        }

        self.team_out[team] = true;
        let username = self.players[index].username.clone();
        self.log(format!("{team} team called out (by {username})"));
        debug!(room_id = %self.id, player_id = %player, %team, "team out");

        let mut events = vec![(
            Recipient::All,
            ServerEvent::TeamOutChanged {
                flags: self.team_out,
            },
        )];
        if self.team_out.iter().all(|(_, out)| *out) {
            self.end_round(&mut events);
        }
        Ok(events)
    }

    /// Stops the timer. Called when the room is torn down.
    pub fn shutdown(&mut self) {
        self.stop_timer();
    }

    // -----------------------------------------------------------------------
    // Helpers
    // -----------------------------------------------------------------------

    fn player(&self, player: PlayerId) -> Option<&Player> {
        self.players.iter().find(|p| p.id == player)
    }

    fn index_of(&self, player: PlayerId) -> Result<usize, RoomError> {
        self.players
            .iter()
            .position(|p| p.id == player)
            .ok_or(RoomError::NotInRoom(player))
    }

    fn username(&self, player: PlayerId) -> String {
        self.player(player)
            .map(|p| p.username.clone())
            .unwrap_or_default()
    }

    /// The player's team, if they may act in the current round.
    fn playing_team(
        &self,
        player: PlayerId,
        action: &'static str,
    ) -> Result<Team, RoomError> {
        let index = self.index_of(player)?;
        if self.state != GameState::Playing {
            return Err(RoomError::WrongState {
                action,
                state: self.state,
            });
        }
        let team = self.players[index].team;
        if self.team_out[team] {
            return Err(RoomError::TeamOut(team));
        }
        Ok(team)
    }

    fn team_sizes(&self) -> PerTeam<usize> {
        let mut sizes = PerTeam::splat(0);
        for player in &self.players {
            sizes[player.team] += 1;
        }
        sizes
    }

    fn stop_timer(&mut self) {
        if self.timer.is_running() {
            // Only fails when the timer isn't running.
            let _ = self.timer.cancel();
        }
    }

    /// One board event per team, each carrying that team's view.
    fn board_events(
        &self,
        make: impl Fn(BoardView, Vec<LogEntry>, PerTeam<u32>) -> ServerEvent,
    ) -> Outbound {
        Team::ALL
            .into_iter()
            .map(|team| {
                let event = make(
                    self.board.view(Some(team)),
                    self.logs(),
                    self.current_points,
                );
                (Recipient::Team(team), event)
            })
            .collect()
    }

    fn log(&mut self, message: String) {
        self.logs.push_front(LogEntry {
            at: unix_millis(),
            message,
        });
        self.logs.truncate(self.config.log_capacity);
    }

    #[cfg(test)]
    pub(crate) fn board_mut(&mut self) -> &mut Board {
        &mut self.board
    }

    /// Runs the timer to zero without waiting.
    #[cfg(test)]
    pub(crate) fn expire_timer(&mut self) -> Outbound {
        let mut events = Outbound::new();
        while let Some(event) = self.timer_step() {
            events.extend(self.on_timer(event));
        }
        events
    }

    #[cfg(test)]
    fn timer_step(&mut self) -> Option<TimerEvent> {
        while self.timer.is_running() {
            if let Some(event) = self.timer.advance() {
                return Some(event);
            }
        }
        None
    }
}
