use crate::types::TierKind;

pub const TICK_RATE: u32 = 50;
pub const TICK_MS: u64 = 1000 / TICK_RATE as u64;

pub const ARENA_WIDTH: i32 = 1180;
pub const ARENA_HEIGHT: i32 = 760;

pub const PLAYER_WIDTH: i32 = 40;
pub const PLAYER_HEIGHT: i32 = 54;
pub const PLAYER_START_X: i32 = 500;
pub const PLAYER_START_Y: i32 = 640;
pub const PLAYER_MOVE_STEP: i32 = 15;
pub const PLAYER_MAX_HEALTH: i32 = 100;

pub const ENEMY_WIDTH: i32 = 55;
pub const ENEMY_HEIGHT: i32 = 70;
pub const ENEMY_ROW_Y: i32 = 60;
pub const ROSTER_START_X: i32 = 100;

pub const SHOT_WIDTH: i32 = 30;
pub const SHOT_HEIGHT: i32 = 30;

/// Period after which a tracking-capable enemy re-rolls whether it
/// chases the player. The roll is sticky between re-evaluations.
pub const DECISION_INTERVAL_MS: u64 = 1_000;

/// Emission delay window, re-rolled after every firing.
pub const SHOT_DELAY_MIN_MS: u64 = 2_000;
pub const SHOT_DELAY_MAX_MS: u64 = 4_000;

pub const MAX_LEVEL: u32 = 3;

/// Per-tier behavior table. Every tier-dependent constant lives here;
/// nothing in the engine branches on tier outside a table lookup.
#[derive(Clone, Copy, Debug)]
pub struct TierConfig {
    pub speed: i32,
    pub info_reward: i32,
    pub question_damage: i32,
    /// Probability that a firing produces an Info shot (else Question).
    pub info_chance: f32,
    /// Probability of entering chase mode at each decision point.
    /// 0.0 means the tier only ever bounces.
    pub track_chance: f32,
    /// Content difficulty requested for this tier's payload text.
    pub difficulty: u8,
    pub id_prefix: &'static str,
}

const SECTION_LEADER: TierConfig = TierConfig {
    speed: 3,
    info_reward: 10,
    question_damage: 5,
    info_chance: 0.7,
    track_chance: 0.0,
    difficulty: 1,
    id_prefix: "sl",
};

const TEACHING_ASSISTANT: TierConfig = TierConfig {
    speed: 5,
    info_reward: 20,
    question_damage: 10,
    info_chance: 0.5,
    track_chance: 0.4,
    difficulty: 2,
    id_prefix: "ta",
};

const PROFESSOR: TierConfig = TierConfig {
    speed: 7,
    info_reward: 30,
    question_damage: 20,
    info_chance: 0.3,
    track_chance: 0.6,
    difficulty: 3,
    id_prefix: "prof",
};

pub fn tier_config(tier: TierKind) -> &'static TierConfig {
    match tier {
        TierKind::SectionLeader => &SECTION_LEADER,
        TierKind::TeachingAssistant => &TEACHING_ASSISTANT,
        TierKind::Professor => &PROFESSOR,
    }
}

pub fn required_score(level: u32) -> i32 {
    match level {
        1 => 50,
        2 => 150,
        _ => 300,
    }
}

/// Roster composition per level. Each group places its members from
/// `ROSTER_START_X` with the level's spacing, indexed within the group.
pub fn level_roster(level: u32) -> &'static [(TierKind, usize)] {
    match level {
        1 => &[(TierKind::SectionLeader, 4)],
        2 => &[(TierKind::SectionLeader, 4), (TierKind::TeachingAssistant, 2)],
        _ => &[(TierKind::TeachingAssistant, 3), (TierKind::Professor, 2)],
    }
}

pub fn level_spacing(level: u32) -> i32 {
    match level {
        1 => 300,
        2 => 200,
        _ => 250,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tier_table_matches_tier_ladder() {
        let sl = tier_config(TierKind::SectionLeader);
        let ta = tier_config(TierKind::TeachingAssistant);
        let prof = tier_config(TierKind::Professor);

        assert_eq!((sl.speed, ta.speed, prof.speed), (3, 5, 7));
        assert_eq!((sl.info_reward, ta.info_reward, prof.info_reward), (10, 20, 30));
        assert_eq!(
            (sl.question_damage, ta.question_damage, prof.question_damage),
            (5, 10, 20)
        );
        assert_eq!((sl.difficulty, ta.difficulty, prof.difficulty), (1, 2, 3));
        assert!(sl.info_chance > ta.info_chance && ta.info_chance > prof.info_chance);
    }

    #[test]
    fn thresholds_rise_per_level() {
        assert_eq!(required_score(1), 50);
        assert_eq!(required_score(2), 150);
        assert_eq!(required_score(3), 300);
        assert_eq!(required_score(9), 300);
    }

    #[test]
    fn rosters_grow_in_difficulty_not_only_size() {
        let level1: usize = level_roster(1).iter().map(|(_, count)| count).sum();
        let level3 = level_roster(3);
        assert_eq!(level1, 4);
        assert!(level3.iter().any(|(tier, _)| *tier == TierKind::Professor));
        assert!(!level_roster(1)
            .iter()
            .any(|(tier, _)| *tier == TierKind::Professor));
    }
}
