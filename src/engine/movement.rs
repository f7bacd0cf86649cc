use super::*;
use crate::constants::{DECISION_INTERVAL_MS, ENEMY_WIDTH};

impl GameEngine {
    pub(super) fn move_enemies(&mut self, now_ms: u64) {
        for idx in 0..self.enemies.len() {
            let track_chance = tier_config(self.enemies[idx].tier).track_chance;
            if track_chance > 0.0 {
                self.tracking_move(idx, track_chance, now_ms);
            } else {
                self.bounce_move(idx);
            }
        }
    }

    /// Deterministic pacing: one `speed` step in the current
    /// direction, saturating clamp at either arena edge, direction
    /// flip exactly at the clamp.
    fn bounce_move(&mut self, idx: usize) {
        let speed = tier_config(self.enemies[idx].tier).speed;
        let max_x = self.arena_width - ENEMY_WIDTH;
        let enemy = &mut self.enemies[idx];
        if enemy.moving_right {
            enemy.x += speed;
            if enemy.x >= max_x {
                enemy.x = max_x;
                enemy.moving_right = false;
            }
        } else {
            enemy.x -= speed;
            if enemy.x <= 0 {
                enemy.x = 0;
                enemy.moving_right = true;
            }
        }
    }

    /// Sticky time-gated chase. The tracking flag is re-rolled only
    /// once the decision interval has elapsed on the session clock and
    /// holds between re-rolls. While tracking, the enemy steps toward
    /// the player's x by sign comparison (no move when aligned);
    /// otherwise it falls back to the bounce policy.
    fn tracking_move(&mut self, idx: usize, track_chance: f32, now_ms: u64) {
        let elapsed = now_ms.saturating_sub(self.enemies[idx].last_decision_at_ms);
        if elapsed > DECISION_INTERVAL_MS {
            let tracking = self.rng.bool(track_chance);
            let enemy = &mut self.enemies[idx];
            enemy.tracking = tracking;
            enemy.last_decision_at_ms = now_ms;
        }

        if !self.enemies[idx].tracking {
            self.bounce_move(idx);
            return;
        }

        let speed = tier_config(self.enemies[idx].tier).speed;
        let max_x = self.arena_width - ENEMY_WIDTH;
        let player_x = self.player.x;
        let enemy = &mut self.enemies[idx];
        if player_x > enemy.x {
            enemy.x = (enemy.x + speed).min(max_x);
        } else if player_x < enemy.x {
            enemy.x = (enemy.x - speed).max(0);
        }
    }
}
