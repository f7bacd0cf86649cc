use std::cmp::Ordering;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

use crate::types::{GameOutcome, GameSummary};

/// Session sink. The engine emits a `GameSummary` on game end and the
/// binaries hand it to this store; the simulation core itself never
/// writes storage.
#[derive(Clone, Debug, Serialize, Deserialize)]
struct StoredPlayerEntry {
    name: String,
    sessions: u64,
    wins: u64,
    #[serde(rename = "bestScore", alias = "best_score")]
    best_score: i32,
    #[serde(rename = "totalScore", alias = "total_score")]
    total_score: f64,
    #[serde(rename = "bestLevel", alias = "best_level")]
    best_level: u32,
    #[serde(rename = "updatedAtMs", alias = "updated_at_ms")]
    updated_at_ms: u64,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
struct ScoreStoreFile {
    version: u8,
    players: HashMap<String, StoredPlayerEntry>,
}

#[derive(Clone, Debug, Deserialize)]
struct ScoreStoreFileRaw {
    version: u8,
    players: HashMap<String, serde_json::Value>,
}

#[derive(Clone, Debug, Serialize)]
pub struct ScoreboardEntry {
    pub name: String,
    pub sessions: u64,
    pub wins: u64,
    #[serde(rename = "winRate")]
    pub win_rate: f64,
    #[serde(rename = "avgScore")]
    pub avg_score: f64,
    #[serde(rename = "bestScore")]
    pub best_score: i32,
    #[serde(rename = "bestLevel")]
    pub best_level: u32,
    #[serde(rename = "updatedAtMs")]
    pub updated_at_ms: u64,
}

#[derive(Clone, Debug, Serialize)]
pub struct ScoreboardResponse {
    #[serde(rename = "generatedAt")]
    pub generated_at_iso: String,
    pub entries: Vec<ScoreboardEntry>,
}

pub struct ScoreStore {
    file_path: PathBuf,
    players: HashMap<String, StoredPlayerEntry>,
}

impl ScoreStore {
    pub fn new(file_path: PathBuf) -> Self {
        let players = load_players(&file_path);
        Self { file_path, players }
    }

    pub fn record_session(&mut self, player_name: &str, summary: &GameSummary) {
        let key = player_key(player_name);
        if key.is_empty() {
            return;
        }
        let won = summary.outcome == GameOutcome::Won;
        let now_ms = now_ms();

        let current = self.players.entry(key).or_insert_with(|| StoredPlayerEntry {
            name: player_name.trim().to_string(),
            sessions: 0,
            wins: 0,
            best_score: 0,
            total_score: 0.0,
            best_level: 1,
            updated_at_ms: now_ms,
        });

        current.name = player_name.trim().to_string();
        current.sessions += 1;
        if won {
            current.wins += 1;
        }
        current.total_score += summary.score as f64;
        current.best_score = current.best_score.max(summary.score);
        current.best_level = current.best_level.max(summary.level_reached);
        current.updated_at_ms = now_ms;

        self.save();
    }

    pub fn build_response(&self, requested_limit: Option<usize>) -> ScoreboardResponse {
        ScoreboardResponse {
            generated_at_iso: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
            entries: self.get_top(requested_limit),
        }
    }

    fn get_top(&self, requested_limit: Option<usize>) -> Vec<ScoreboardEntry> {
        let normalized_limit = requested_limit.unwrap_or(10).clamp(1, 100);
        let mut entries: Vec<ScoreboardEntry> = self
            .players
            .values()
            .map(|entry| {
                let sessions = entry.sessions.max(1) as f64;
                ScoreboardEntry {
                    name: entry.name.clone(),
                    sessions: entry.sessions,
                    wins: entry.wins.min(entry.sessions),
                    win_rate: entry.wins as f64 / sessions,
                    avg_score: entry.total_score / sessions,
                    best_score: entry.best_score,
                    best_level: entry.best_level,
                    updated_at_ms: entry.updated_at_ms,
                }
            })
            .collect();

        entries.sort_by(|a, b| {
            b.best_score
                .cmp(&a.best_score)
                .then_with(|| cmp_desc_f64(a.win_rate, b.win_rate))
                .then_with(|| a.name.to_lowercase().cmp(&b.name.to_lowercase()))
        });
        entries.truncate(normalized_limit);
        entries
    }

    fn save(&self) {
        if let Some(parent) = self.file_path.parent() {
            if let Err(error) = fs::create_dir_all(parent) {
                eprintln!(
                    "[score-store] failed to create parent dir {}: {error}",
                    parent.display()
                );
                return;
            }
        }

        let payload = ScoreStoreFile {
            version: 1,
            players: self.players.clone(),
        };
        match serde_json::to_string_pretty(&payload) {
            Ok(text) => {
                if let Err(error) = fs::write(&self.file_path, text) {
                    eprintln!(
                        "[score-store] failed to write {}: {error}",
                        self.file_path.display()
                    );
                }
            }
            Err(error) => {
                eprintln!(
                    "[score-store] failed to serialize payload for {}: {error}",
                    self.file_path.display()
                );
            }
        }
    }
}

fn cmp_desc_f64(a: f64, b: f64) -> Ordering {
    b.partial_cmp(&a).unwrap_or(Ordering::Equal)
}

fn load_players(path: &Path) -> HashMap<String, StoredPlayerEntry> {
    let text = match fs::read_to_string(path) {
        Ok(value) => value,
        Err(error) => {
            if error.kind() != std::io::ErrorKind::NotFound {
                eprintln!("[score-store] failed to read {}: {error}", path.display());
            }
            return HashMap::new();
        }
    };
    let parsed: ScoreStoreFileRaw = match serde_json::from_str::<ScoreStoreFileRaw>(&text) {
        Ok(value) if value.version == 1 => value,
        Ok(value) => {
            eprintln!(
                "[score-store] unsupported version {} at {}",
                value.version,
                path.display()
            );
            return HashMap::new();
        }
        Err(error) => {
            eprintln!("[score-store] failed to parse {}: {error}", path.display());
            return HashMap::new();
        }
    };

    let mut sanitized = HashMap::<String, StoredPlayerEntry>::new();
    for (player_key_raw, raw_value) in parsed.players {
        let value: StoredPlayerEntry = match serde_json::from_value(raw_value) {
            Ok(entry) => entry,
            Err(error) => {
                eprintln!(
                    "[score-store] failed to parse player entry '{}' in {}: {error}",
                    player_key_raw,
                    path.display()
                );
                continue;
            }
        };
        let Some(normalized) = sanitize_stored_entry(value) else {
            continue;
        };
        let key = player_key(&normalized.name);
        if key.is_empty() {
            continue;
        }

        match sanitized.get_mut(&key) {
            Some(current) => {
                current.name = normalized.name;
                current.sessions += normalized.sessions;
                current.wins += normalized.wins.min(normalized.sessions);
                current.total_score += normalized.total_score;
                current.best_score = current.best_score.max(normalized.best_score);
                current.best_level = current.best_level.max(normalized.best_level);
                current.updated_at_ms = current.updated_at_ms.max(normalized.updated_at_ms);
            }
            None => {
                sanitized.insert(key, normalized);
            }
        }
    }

    sanitized
}

fn sanitize_stored_entry(value: StoredPlayerEntry) -> Option<StoredPlayerEntry> {
    let normalized_name = value.name.trim().to_string();
    if normalized_name.is_empty() {
        return None;
    }
    if !value.total_score.is_finite() || value.total_score < 0.0 {
        return None;
    }
    let normalized_sessions = value.sessions;
    let normalized_wins = value.wins.min(normalized_sessions);
    Some(StoredPlayerEntry {
        name: normalized_name,
        sessions: normalized_sessions,
        wins: normalized_wins,
        best_score: value.best_score.max(0),
        total_score: value.total_score,
        best_level: value.best_level.clamp(1, 3),
        updated_at_ms: value.updated_at_ms,
    })
}

fn player_key(name: &str) -> String {
    name.trim().to_lowercase()
}

fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{SessionStats, TimelineEvent};

    fn make_summary(outcome: GameOutcome, score: i32, level_reached: u32) -> GameSummary {
        GameSummary {
            outcome,
            score,
            level_reached,
            duration_ms: 90_000,
            stats: SessionStats {
                infos_collected: score / 10,
                questions_hit: 2,
                shots_fired: 40,
            },
            timeline: vec![TimelineEvent {
                at_ms: 0,
                label: "Game started".to_string(),
            }],
        }
    }

    fn temp_file(name: &str) -> PathBuf {
        let unique = format!(
            "{}-{}-{}",
            name,
            std::process::id(),
            now_ms().saturating_add(rand::random::<u32>() as u64)
        );
        std::env::temp_dir().join(unique).join("scores.json")
    }

    #[test]
    fn record_session_aggregates_per_player() {
        let path = temp_file("score-store-record");
        let mut store = ScoreStore::new(path.clone());
        store.record_session("Alice", &make_summary(GameOutcome::Won, 320, 3));
        store.record_session("Alice", &make_summary(GameOutcome::Lost, 80, 2));
        store.record_session("Bob", &make_summary(GameOutcome::Lost, 40, 1));

        let response = store.build_response(Some(10));
        assert_eq!(response.entries.len(), 2);
        let alice = response
            .entries
            .iter()
            .find(|entry| entry.name == "Alice")
            .expect("alice exists");
        assert_eq!(alice.sessions, 2);
        assert_eq!(alice.wins, 1);
        assert_eq!(alice.best_score, 320);
        assert_eq!(alice.best_level, 3);
        assert!((alice.avg_score - 200.0).abs() < f64::EPSILON);

        let _ = fs::remove_file(path);
    }

    #[test]
    fn scoreboard_orders_by_best_score_then_name() {
        let path = temp_file("score-store-order");
        let mut store = ScoreStore::new(path.clone());
        store.record_session("zoe", &make_summary(GameOutcome::Lost, 120, 2));
        store.record_session("amy", &make_summary(GameOutcome::Lost, 120, 2));
        store.record_session("kim", &make_summary(GameOutcome::Won, 300, 3));

        let names: Vec<String> = store
            .build_response(Some(10))
            .entries
            .into_iter()
            .map(|entry| entry.name)
            .collect();
        assert_eq!(names, vec!["kim", "amy", "zoe"]);

        let _ = fs::remove_file(path);
    }

    #[test]
    fn load_merges_case_insensitive_names() {
        let path = temp_file("score-store-load");
        let parent = path.parent().expect("parent exists").to_path_buf();
        fs::create_dir_all(&parent).expect("create dir");
        let raw = r#"{
  "version": 1,
  "players": {
    "ALICE": {
      "name": "Alice",
      "sessions": 2,
      "wins": 1,
      "bestScore": 120,
      "totalScore": 160.0,
      "bestLevel": 2,
      "updatedAtMs": 10
    },
    "alice_legacy": {
      "name": " alice ",
      "sessions": 1,
      "wins": 1,
      "bestScore": 310,
      "totalScore": 310.0,
      "bestLevel": 3,
      "updatedAtMs": 20
    }
  }
}"#;
        fs::write(&path, raw).expect("write file");

        let store = ScoreStore::new(path.clone());
        let response = store.build_response(Some(10));
        assert_eq!(response.entries.len(), 1);
        let entry = response.entries.first().expect("entry exists");
        assert_eq!(entry.name.to_lowercase(), "alice");
        assert_eq!(entry.sessions, 3);
        assert_eq!(entry.wins, 2);
        assert_eq!(entry.best_score, 310);

        let _ = fs::remove_file(&path);
        let _ = fs::remove_dir_all(&parent);
    }

    #[test]
    fn load_keeps_valid_entries_when_invalid_entries_exist() {
        let path = temp_file("score-store-partial-load");
        let parent = path.parent().expect("parent exists").to_path_buf();
        fs::create_dir_all(&parent).expect("create dir");
        let raw = r#"{
  "version": 1,
  "players": {
    "valid": {
      "name": "Alice",
      "sessions": 2,
      "wins": 1,
      "bestScore": 120,
      "totalScore": 160.0,
      "bestLevel": 2,
      "updatedAtMs": 10
    },
    "invalid": {
      "name": "Broken",
      "sessions": -1
    }
  }
}"#;
        fs::write(&path, raw).expect("write file");

        let store = ScoreStore::new(path.clone());
        let response = store.build_response(Some(10));
        assert_eq!(response.entries.len(), 1);
        assert_eq!(response.entries[0].name, "Alice");

        let _ = fs::remove_file(&path);
        let _ = fs::remove_dir_all(&parent);
    }

    #[test]
    fn blank_player_names_are_not_recorded() {
        let path = temp_file("score-store-blank");
        let mut store = ScoreStore::new(path.clone());
        store.record_session("   ", &make_summary(GameOutcome::Won, 300, 3));
        assert!(store.build_response(Some(10)).entries.is_empty());

        let _ = fs::remove_file(path);
    }

    #[test]
    fn build_response_limits_range() {
        let path = temp_file("score-store-limit");
        let mut store = ScoreStore::new(path.clone());
        for idx in 0..3 {
            store.record_session(
                &format!("P{}", idx + 1),
                &make_summary(GameOutcome::Lost, (idx + 1) * 10, 1),
            );
        }

        assert_eq!(store.build_response(Some(1)).entries.len(), 1);
        assert_eq!(store.build_response(Some(0)).entries.len(), 1);
        assert_eq!(store.build_response(Some(999)).entries.len(), 3);
        assert_eq!(store.build_response(None).entries.len(), 3);

        let _ = fs::remove_file(path);
    }
}
