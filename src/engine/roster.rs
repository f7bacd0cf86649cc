use super::*;
use crate::constants::{
    level_roster, level_spacing, ENEMY_ROW_Y, ENEMY_WIDTH, ROSTER_START_X, SHOT_DELAY_MAX_MS,
    SHOT_DELAY_MIN_MS,
};

impl GameEngine {
    /// Builds the enemy roster for the current level. Each tier group
    /// is laid out from `ROSTER_START_X` with the level's spacing,
    /// indexed within its own group. Callers disarm the outgoing
    /// roster before this runs, so no deadline from a previous level
    /// survives into the new one.
    pub(super) fn spawn_level_roster(&mut self, now_ms: u64) {
        self.enemies.clear();
        let spacing = level_spacing(self.level);
        for (tier, count) in level_roster(self.level) {
            for slot in 0..*count {
                let x = ROSTER_START_X + slot as i32 * spacing;
                self.spawn_enemy(*tier, x, now_ms);
            }
        }
    }

    fn spawn_enemy(&mut self, tier: TierKind, x: i32, now_ms: u64) {
        let cfg = tier_config(tier);
        let id = self.make_id(cfg.id_prefix);
        // Opaque handle into the renderer's per-tier avatar pool.
        let avatar = format!("{}-{}", cfg.id_prefix, self.rng.pick_index(3) + 1);
        let moving_right = self.rng.bool(0.5);
        let delay = self.rng.delay_ms(SHOT_DELAY_MIN_MS, SHOT_DELAY_MAX_MS);
        let max_x = self.arena_width - ENEMY_WIDTH;
        self.enemies.push(EnemyInternal {
            id,
            tier,
            x: x.clamp(0, max_x),
            y: ENEMY_ROW_Y,
            moving_right,
            tracking: false,
            last_decision_at_ms: now_ms,
            next_shot_at_ms: Some(now_ms + delay),
            avatar,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::GameOptions;

    fn make_engine(seed: u32) -> GameEngine {
        GameEngine::new(
            "tester".to_string(),
            ContentStore::sample(),
            seed,
            GameOptions::default(),
        )
    }

    fn tier_counts(engine: &GameEngine) -> (usize, usize, usize) {
        let count = |tier: TierKind| {
            engine
                .enemies
                .iter()
                .filter(|enemy| enemy.tier == tier)
                .count()
        };
        (
            count(TierKind::SectionLeader),
            count(TierKind::TeachingAssistant),
            count(TierKind::Professor),
        )
    }

    #[test]
    fn level_one_roster_is_four_section_leaders() {
        let engine = make_engine(10);
        assert_eq!(tier_counts(&engine), (4, 0, 0));
        let positions: Vec<i32> = engine.enemies.iter().map(|enemy| enemy.x).collect();
        assert_eq!(positions, vec![100, 400, 700, 1000]);
        assert!(engine.enemies.iter().all(|enemy| enemy.y == ENEMY_ROW_Y));
    }

    #[test]
    fn level_two_roster_adds_teaching_assistants() {
        let mut engine = make_engine(11);
        engine.level = 2;
        let now = engine.started_at_ms;
        engine.spawn_level_roster(now);
        assert_eq!(tier_counts(&engine), (4, 2, 0));

        let ta_positions: Vec<i32> = engine
            .enemies
            .iter()
            .filter(|enemy| enemy.tier == TierKind::TeachingAssistant)
            .map(|enemy| enemy.x)
            .collect();
        assert_eq!(ta_positions, vec![100, 300]);
    }

    #[test]
    fn level_three_roster_brings_the_professors() {
        let mut engine = make_engine(12);
        engine.level = 3;
        let now = engine.started_at_ms;
        engine.spawn_level_roster(now);
        assert_eq!(tier_counts(&engine), (0, 3, 2));
    }

    #[test]
    fn spawned_enemies_are_armed_and_not_yet_tracking() {
        let engine = make_engine(13);
        let now = engine.started_at_ms;
        for enemy in &engine.enemies {
            let deadline = enemy.next_shot_at_ms.expect("armed at spawn");
            assert!(deadline >= now + SHOT_DELAY_MIN_MS);
            assert!(deadline < now + SHOT_DELAY_MAX_MS);
            assert!(!enemy.tracking);
            assert_eq!(enemy.last_decision_at_ms, now);
        }
    }

    #[test]
    fn enemy_ids_and_avatars_carry_the_tier_prefix() {
        let mut engine = make_engine(14);
        engine.level = 3;
        let now = engine.started_at_ms;
        engine.spawn_level_roster(now);
        for enemy in &engine.enemies {
            let prefix = tier_config(enemy.tier).id_prefix;
            assert!(enemy.id.starts_with(prefix));
            assert!(enemy.avatar.starts_with(prefix));
        }
    }

    #[test]
    fn spawn_clamps_to_a_narrow_arena() {
        let engine = GameEngine::new(
            "tester".to_string(),
            ContentStore::sample(),
            15,
            GameOptions {
                arena_width: 400,
                ..GameOptions::default()
            },
        );
        let max_x = 400 - ENEMY_WIDTH;
        assert!(engine.enemies.iter().all(|enemy| enemy.x <= max_x));
    }
}
