use serde::Serialize;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TierKind {
    SectionLeader,
    TeachingAssistant,
    Professor,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PayloadKind {
    Info,
    Question,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MoveCommand {
    Left,
    Right,
}

impl MoveCommand {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "left" => Some(Self::Left),
            "right" => Some(Self::Right),
            _ => None,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum GameOutcome {
    Won,
    Lost,
}

/// Axis-aligned bounding box in pixel units.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl Rect {
    pub fn intersects(&self, other: &Rect) -> bool {
        self.x < other.x + other.width
            && other.x < self.x + self.width
            && self.y < other.y + other.height
            && other.y < self.y + self.height
    }
}

#[derive(Clone, Debug, Serialize)]
pub struct SessionInit {
    #[serde(rename = "playerName")]
    pub player_name: String,
    pub seed: u32,
    #[serde(rename = "tickRate")]
    pub tick_rate: u32,
    #[serde(rename = "arenaWidth")]
    pub arena_width: i32,
    #[serde(rename = "arenaHeight")]
    pub arena_height: i32,
}

#[derive(Clone, Debug, Serialize)]
pub struct PlayerView {
    pub x: i32,
    pub y: i32,
    pub health: i32,
    pub score: i32,
    /// Opaque visual handle, supplied by the session configuration.
    pub avatar: String,
}

#[derive(Clone, Debug, Serialize)]
pub struct EnemyView {
    pub id: String,
    pub tier: TierKind,
    pub x: i32,
    pub y: i32,
    #[serde(rename = "movingRight")]
    pub moving_right: bool,
    pub tracking: bool,
    /// Opaque visual handle; the renderer maps it to an image, the
    /// core never inspects it.
    pub avatar: String,
}

#[derive(Clone, Debug, Serialize)]
pub struct ShotView {
    pub id: String,
    pub kind: PayloadKind,
    pub x: i32,
    pub y: i32,
    pub speed: i32,
    pub text: String,
}

#[derive(Clone, Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RuntimeEvent {
    ShotFired {
        #[serde(rename = "enemyId")]
        enemy_id: String,
        kind: PayloadKind,
    },
    InfoCollected {
        reward: i32,
        score: i32,
    },
    QuestionHit {
        damage: i32,
        health: i32,
    },
    LevelAdvanced {
        level: u32,
    },
    GameEnded {
        outcome: GameOutcome,
    },
}

#[derive(Clone, Debug, Serialize)]
pub struct TimelineEvent {
    #[serde(rename = "atMs")]
    pub at_ms: u64,
    pub label: String,
}

#[derive(Clone, Debug, Serialize)]
pub struct Snapshot {
    pub tick: u64,
    #[serde(rename = "nowMs")]
    pub now_ms: u64,
    pub level: u32,
    #[serde(rename = "requiredScore")]
    pub required_score: i32,
    pub player: PlayerView,
    pub enemies: Vec<EnemyView>,
    pub shots: Vec<ShotView>,
    /// Texts shown by the external renderer's info/question lines.
    #[serde(rename = "infoText")]
    pub info_text: String,
    #[serde(rename = "questionText")]
    pub question_text: String,
    #[serde(rename = "gameOver")]
    pub game_over: bool,
    pub outcome: Option<GameOutcome>,
    pub events: Vec<RuntimeEvent>,
}

#[derive(Clone, Copy, Debug, Default, Serialize)]
pub struct SessionStats {
    #[serde(rename = "infosCollected")]
    pub infos_collected: i32,
    #[serde(rename = "questionsHit")]
    pub questions_hit: i32,
    #[serde(rename = "shotsFired")]
    pub shots_fired: i32,
}

#[derive(Clone, Debug, Serialize)]
pub struct GameSummary {
    pub outcome: GameOutcome,
    pub score: i32,
    #[serde(rename = "levelReached")]
    pub level_reached: u32,
    #[serde(rename = "durationMs")]
    pub duration_ms: u64,
    pub stats: SessionStats,
    pub timeline: Vec<TimelineEvent>,
}
