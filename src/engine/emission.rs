use super::*;
use crate::constants::{SHOT_DELAY_MAX_MS, SHOT_DELAY_MIN_MS};

impl GameEngine {
    /// Evaluates every armed emission deadline against the session
    /// clock. Runs as the last phase of `step`, so a shot spawned here
    /// is first advanced on the following tick, the way independently
    /// scheduled timers interleave with a tick loop. After each firing
    /// the delay is re-rolled, never fixed-period.
    pub(super) fn process_emission(&mut self, now_ms: u64) {
        if self.game_over {
            return;
        }
        for idx in 0..self.enemies.len() {
            let Some(deadline) = self.enemies[idx].next_shot_at_ms else {
                continue;
            };
            if now_ms < deadline {
                continue;
            }
            if let Some(shot) = self.fire_shot(idx) {
                self.events.push(RuntimeEvent::ShotFired {
                    enemy_id: shot.fired_by.clone(),
                    kind: shot.kind,
                });
                self.stats.shots_fired += 1;
                self.shots.push(shot);
            }
            let delay = self.rng.delay_ms(SHOT_DELAY_MIN_MS, SHOT_DELAY_MAX_MS);
            self.enemies[idx].next_shot_at_ms = Some(now_ms + delay);
        }
    }

    /// Per-tier shot policy: one uniform draw decides the payload
    /// kind, the content store supplies the text. An exhausted pool
    /// produces no shot for this firing; the deadline still re-arms.
    fn fire_shot(&mut self, idx: usize) -> Option<ShotInternal> {
        let (tier, x, y, enemy_id) = {
            let enemy = &self.enemies[idx];
            (enemy.tier, enemy.x, enemy.y, enemy.id.clone())
        };
        let cfg = tier_config(tier);
        let kind = if self.rng.next_f32() < cfg.info_chance {
            PayloadKind::Info
        } else {
            PayloadKind::Question
        };
        let text = self.content.pick(kind, cfg.difficulty, &mut self.rng)?;
        let id = self.make_id("shot");
        Some(ShotInternal {
            id,
            kind,
            x,
            y,
            speed: cfg.speed,
            text,
            reward: cfg.info_reward,
            damage: cfg.question_damage,
            fired_by: enemy_id,
        })
    }

    /// Disarms one enemy's emission deadline. The disarm is
    /// synchronous: once this returns, no further firing can be
    /// attributed to the enemy. Disarming twice, or an unknown id, is
    /// a no-op.
    pub fn deactivate_enemy(&mut self, enemy_id: &str) {
        if let Some(enemy) = self.enemies.iter_mut().find(|enemy| enemy.id == enemy_id) {
            enemy.next_shot_at_ms = None;
        }
    }

    pub(super) fn stop_all_emission(&mut self) {
        for enemy in &mut self.enemies {
            enemy.next_shot_at_ms = None;
        }
    }
}
