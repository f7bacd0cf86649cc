use std::time::{SystemTime, UNIX_EPOCH};

use crate::constants::{
    required_score, tier_config, ARENA_HEIGHT, ARENA_WIDTH, MAX_LEVEL, PLAYER_HEIGHT,
    PLAYER_MAX_HEALTH, PLAYER_MOVE_STEP, PLAYER_START_X, PLAYER_START_Y, PLAYER_WIDTH,
    SHOT_HEIGHT, SHOT_WIDTH, TICK_RATE,
};
use crate::content::ContentStore;
use crate::rng::Rng;
use crate::types::{
    EnemyView, GameOutcome, GameSummary, MoveCommand, PayloadKind, PlayerView, Rect, RuntimeEvent,
    SessionInit, SessionStats, ShotView, Snapshot, TierKind, TimelineEvent,
};

mod emission;
mod movement;
mod roster;

#[derive(Clone, Debug)]
struct PlayerInternal {
    x: i32,
    y: i32,
    health: i32,
    score: i32,
    avatar: String,
}

impl PlayerInternal {
    fn rect(&self) -> Rect {
        Rect {
            x: self.x,
            y: self.y,
            width: PLAYER_WIDTH,
            height: PLAYER_HEIGHT,
        }
    }

    fn view(&self) -> PlayerView {
        PlayerView {
            x: self.x,
            y: self.y,
            health: self.health,
            score: self.score,
            avatar: self.avatar.clone(),
        }
    }
}

#[derive(Clone, Debug)]
struct EnemyInternal {
    id: String,
    tier: TierKind,
    x: i32,
    y: i32,
    moving_right: bool,
    tracking: bool,
    last_decision_at_ms: u64,
    /// Next emission deadline on the session clock; `None` once the
    /// enemy is deactivated.
    next_shot_at_ms: Option<u64>,
    avatar: String,
}

impl EnemyInternal {
    fn view(&self) -> EnemyView {
        EnemyView {
            id: self.id.clone(),
            tier: self.tier,
            x: self.x,
            y: self.y,
            moving_right: self.moving_right,
            tracking: self.tracking,
            avatar: self.avatar.clone(),
        }
    }
}

#[derive(Clone, Debug)]
struct ShotInternal {
    id: String,
    kind: PayloadKind,
    x: i32,
    y: i32,
    speed: i32,
    text: String,
    /// Reward/damage copied from the firing tier at creation, so the
    /// shot stays resolvable after a level transition clears the
    /// roster it came from.
    reward: i32,
    damage: i32,
    fired_by: String,
}

impl ShotInternal {
    fn rect(&self) -> Rect {
        Rect {
            x: self.x,
            y: self.y,
            width: SHOT_WIDTH,
            height: SHOT_HEIGHT,
        }
    }

    fn view(&self) -> ShotView {
        ShotView {
            id: self.id.clone(),
            kind: self.kind,
            x: self.x,
            y: self.y,
            speed: self.speed,
            text: self.text.clone(),
        }
    }
}

#[derive(Clone, Debug)]
pub struct GameOptions {
    pub arena_width: i32,
    pub arena_height: i32,
    /// Visual handle the renderer uses for the player; the engine
    /// never looks inside it.
    pub player_avatar: String,
}

impl Default for GameOptions {
    fn default() -> Self {
        Self {
            arena_width: ARENA_WIDTH,
            arena_height: ARENA_HEIGHT,
            player_avatar: "player-1".to_string(),
        }
    }
}

/// The whole session lives in one engine value stepped at a fixed
/// cadence. Emission deadlines are part of engine state and are
/// evaluated inside `step`, so timer fires and tick phases serialize
/// on one logical scheduler and the shared shot collection only ever
/// has a single writer.
#[derive(Clone, Debug)]
pub struct GameEngine {
    pub started_at_ms: u64,

    player_name: String,
    seed: u32,
    rng: Rng,
    content: ContentStore,
    arena_width: i32,
    arena_height: i32,

    player: PlayerInternal,
    enemies: Vec<EnemyInternal>,
    shots: Vec<ShotInternal>,

    level: u32,
    required_score: i32,
    game_over: bool,
    outcome: Option<GameOutcome>,
    info_text: String,
    question_text: String,

    events: Vec<RuntimeEvent>,
    timeline: Vec<TimelineEvent>,
    stats: SessionStats,

    elapsed_ms: u64,
    tick_counter: u64,
    next_id_counter: u64,
}

impl GameEngine {
    pub fn new(player_name: String, content: ContentStore, seed: u32, options: GameOptions) -> Self {
        let mut engine = Self {
            started_at_ms: now_ms(),
            player_name,
            seed,
            rng: Rng::new(seed),
            content,
            arena_width: options.arena_width,
            arena_height: options.arena_height,
            player: PlayerInternal {
                x: PLAYER_START_X.min(options.arena_width - PLAYER_WIDTH),
                y: PLAYER_START_Y,
                health: PLAYER_MAX_HEALTH,
                score: 0,
                avatar: options.player_avatar,
            },
            enemies: Vec::new(),
            shots: Vec::new(),
            level: 1,
            required_score: required_score(1),
            game_over: false,
            outcome: None,
            info_text: String::new(),
            question_text: String::new(),
            events: Vec::new(),
            timeline: vec![TimelineEvent {
                at_ms: 0,
                label: "Game started".to_string(),
            }],
            stats: SessionStats::default(),
            elapsed_ms: 0,
            tick_counter: 0,
            next_id_counter: 1,
        };
        let spawn_at = engine.started_at_ms;
        engine.spawn_level_roster(spawn_at);
        engine
    }

    pub fn is_ended(&self) -> bool {
        self.game_over
    }

    pub fn outcome(&self) -> Option<GameOutcome> {
        self.outcome
    }

    pub fn get_session_init(&self) -> SessionInit {
        SessionInit {
            player_name: self.player_name.clone(),
            seed: self.seed,
            tick_rate: TICK_RATE,
            arena_width: self.arena_width,
            arena_height: self.arena_height,
        }
    }

    /// Applies a discrete move command between ticks. Movement is
    /// horizontal only and saturates at the arena edges.
    pub fn apply_input(&mut self, command: MoveCommand) {
        if self.game_over {
            return;
        }
        match command {
            MoveCommand::Left => {
                self.player.x = (self.player.x - PLAYER_MOVE_STEP).max(0);
            }
            MoveCommand::Right => {
                self.player.x =
                    (self.player.x + PLAYER_MOVE_STEP).min(self.arena_width - PLAYER_WIDTH);
            }
        }
    }

    /// One fixed tick. Phase order is load-bearing: shots advance
    /// before collision resolution so the rect tested is the rect the
    /// renderer will draw, and progression runs strictly after
    /// collisions. Emission deadlines are processed last so a shot
    /// spawned this tick first moves on the next one.
    pub fn step(&mut self, dt_ms: u64) {
        if self.game_over {
            return;
        }
        self.tick_counter += 1;
        self.elapsed_ms = self.elapsed_ms.saturating_add(dt_ms);
        let now_ms = self.started_at_ms.saturating_add(self.elapsed_ms);

        self.advance_shots();
        self.move_enemies(now_ms);
        self.resolve_collisions();
        self.evaluate_progression(now_ms);
        self.process_emission(now_ms);
    }

    pub fn build_snapshot(&mut self, include_events: bool) -> Snapshot {
        let snapshot = Snapshot {
            tick: self.tick_counter,
            now_ms: self.started_at_ms + self.elapsed_ms,
            level: self.level,
            required_score: self.required_score,
            player: self.player.view(),
            enemies: self.enemies.iter().map(EnemyInternal::view).collect(),
            shots: self.shots.iter().map(ShotInternal::view).collect(),
            info_text: self.info_text.clone(),
            question_text: self.question_text.clone(),
            game_over: self.game_over,
            outcome: self.outcome,
            events: if include_events {
                self.events.clone()
            } else {
                Vec::new()
            },
        };
        if include_events {
            self.events.clear();
        }
        snapshot
    }

    pub fn build_summary(&self) -> GameSummary {
        GameSummary {
            outcome: self.outcome.unwrap_or(GameOutcome::Lost),
            score: self.player.score,
            level_reached: self.level,
            duration_ms: self.elapsed_ms,
            stats: self.stats,
            timeline: self.timeline.clone(),
        }
    }

    fn advance_shots(&mut self) {
        for shot in &mut self.shots {
            shot.y += shot.speed;
        }
    }

    /// Walks the shot collection once; a consumed shot is removed in
    /// place and the same index is re-tested, so the shot that slid
    /// into its slot is neither skipped nor double-counted.
    fn resolve_collisions(&mut self) {
        let player_rect = self.player.rect();
        let mut idx = 0;
        while idx < self.shots.len() {
            if !self.shots[idx].rect().intersects(&player_rect) {
                idx += 1;
                continue;
            }
            let shot = self.shots.remove(idx);
            match shot.kind {
                PayloadKind::Info => {
                    self.player.score += shot.reward;
                    self.info_text = shot.text;
                    self.question_text.clear();
                    self.stats.infos_collected += 1;
                    self.events.push(RuntimeEvent::InfoCollected {
                        reward: shot.reward,
                        score: self.player.score,
                    });
                }
                PayloadKind::Question => {
                    self.player.health -= shot.damage;
                    self.question_text = shot.text;
                    self.info_text.clear();
                    self.stats.questions_hit += 1;
                    self.events.push(RuntimeEvent::QuestionHit {
                        damage: shot.damage,
                        health: self.player.health,
                    });
                }
            }
        }
    }

    /// Level/score/game-over state machine, evaluated once per tick
    /// strictly after collision resolution. Terminal states stay
    /// terminal; the score check outranks the health check within a
    /// tick.
    fn evaluate_progression(&mut self, now_ms: u64) {
        if self.game_over {
            return;
        }
        if self.player.score >= self.required_score {
            if self.level < MAX_LEVEL {
                self.advance_level(now_ms);
            } else {
                self.end_game(GameOutcome::Won);
            }
        } else if self.player.health <= 0 {
            self.end_game(GameOutcome::Lost);
        }
    }

    fn advance_level(&mut self, now_ms: u64) {
        self.stop_all_emission();
        self.shots.clear();
        self.level += 1;
        self.required_score = required_score(self.level);
        self.spawn_level_roster(now_ms);
        self.events.push(RuntimeEvent::LevelAdvanced { level: self.level });
        self.timeline.push(TimelineEvent {
            at_ms: self.elapsed_ms,
            label: format!("Reached level {}", self.level),
        });
    }

    fn end_game(&mut self, outcome: GameOutcome) {
        self.stop_all_emission();
        self.game_over = true;
        self.outcome = Some(outcome);
        self.events.push(RuntimeEvent::GameEnded { outcome });
        self.timeline.push(TimelineEvent {
            at_ms: self.elapsed_ms,
            label: match outcome {
                GameOutcome::Won => "Victory".to_string(),
                GameOutcome::Lost => "Defeat".to_string(),
            },
        });
    }

    fn make_id(&mut self, prefix: &str) -> String {
        let id = format!("{}_{}", prefix, self.next_id_counter);
        self.next_id_counter = self.next_id_counter.saturating_add(1);
        id
    }
}

fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}
