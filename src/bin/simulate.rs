use clap::Parser;
use quizfall::constants::{
    MAX_LEVEL, PLAYER_HEIGHT, PLAYER_MAX_HEALTH, PLAYER_WIDTH, SHOT_WIDTH, TICK_MS,
};
use quizfall::content::ContentStore;
use quizfall::engine::{GameEngine, GameOptions};
use quizfall::types::{GameOutcome, MoveCommand, PayloadKind, RuntimeEvent, Snapshot};
use serde::Serialize;
use serde_json::{json, Value};
use std::collections::{BTreeMap, HashSet};
use std::io;
use std::path::Path;
use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};

#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Cli {
    #[arg(long)]
    single: bool,
    #[arg(long)]
    pilot: Option<String>,
    #[arg(long)]
    minutes: Option<i32>,
    #[arg(long)]
    seed: Option<u64>,
    #[arg(long)]
    run_id: Option<String>,
    #[arg(long)]
    summary_out: Option<PathBuf>,
}

/// Scripted stand-ins for the human player, driving the engine purely
/// through its public input surface.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
enum PilotKind {
    /// Chases info shots, sidesteps question shots. Expected to climb.
    Collector,
    /// Only ever dodges; never scores on purpose.
    Dodger,
    /// Never moves. Worst-case baseline.
    Idle,
}

impl PilotKind {
    fn parse(value: &str) -> Option<Self> {
        match value {
            "collector" => Some(Self::Collector),
            "dodger" => Some(Self::Dodger),
            "idle" => Some(Self::Idle),
            _ => None,
        }
    }

    fn key(self) -> &'static str {
        match self {
            Self::Collector => "collector",
            Self::Dodger => "dodger",
            Self::Idle => "idle",
        }
    }
}

#[derive(Clone, Debug, Serialize)]
struct Scenario {
    name: String,
    pilot: PilotKind,
    minutes: i32,
    seed: u32,
}

#[derive(Clone, Debug, Serialize)]
struct ScenarioResultLine {
    scenario: String,
    seed: u32,
    pilot: PilotKind,
    minutes: i32,
    ended: bool,
    outcome: Option<GameOutcome>,
    #[serde(rename = "finalScore")]
    final_score: i32,
    #[serde(rename = "finalHealth")]
    final_health: i32,
    #[serde(rename = "levelReached")]
    level_reached: u32,
    #[serde(rename = "durationMs")]
    duration_ms: u64,
    #[serde(rename = "shotsFired")]
    shots_fired: i32,
    #[serde(rename = "infosCollected")]
    infos_collected: i32,
    #[serde(rename = "questionsHit")]
    questions_hit: i32,
    #[serde(rename = "activeShots")]
    active_shots: usize,
    anomalies: Vec<String>,
}

#[derive(Clone, Debug, Serialize)]
struct AnomalyRecord {
    tick: u64,
    message: String,
}

#[derive(Clone, Debug, Serialize)]
struct ScenarioRunResult {
    #[serde(flatten)]
    result: ScenarioResultLine,
    #[serde(rename = "anomalyRecords")]
    anomaly_records: Vec<AnomalyRecord>,
    finished_tick: u64,
}

#[derive(Clone, Debug, Serialize)]
struct RunSummary {
    #[serde(rename = "runId")]
    run_id: String,
    #[serde(rename = "startedAtMs")]
    started_at_ms: u64,
    #[serde(rename = "finishedAtMs")]
    finished_at_ms: u64,
    #[serde(rename = "scenarioCount")]
    scenario_count: usize,
    #[serde(rename = "anomalyCount")]
    anomaly_count: usize,
    #[serde(rename = "averageDurationMs")]
    average_duration_ms: u64,
    #[serde(rename = "outcomeCounts")]
    outcome_counts: BTreeMap<String, usize>,
    scenarios: Vec<ScenarioResultLine>,
}

#[derive(Clone, Debug, Serialize)]
struct StructuredLogLine {
    #[serde(rename = "timestampMs")]
    timestamp_ms: u64,
    level: String,
    event: String,
    #[serde(rename = "runId")]
    run_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    scenario: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    seed: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tick: Option<u64>,
    details: Value,
}

fn main() {
    let cli = Cli::parse();
    let scenarios = resolve_scenarios(&cli);
    let run_started_at_ms = now_ms();
    let seed_hint = scenarios.first().map(|scenario| scenario.seed).unwrap_or(0);
    let run_id = cli
        .run_id
        .clone()
        .unwrap_or_else(|| default_run_id(seed_hint, run_started_at_ms));
    let mut has_anomaly = false;
    let mut scenario_results = Vec::new();
    let mut outcome_counts: BTreeMap<String, usize> = BTreeMap::new();
    let mut total_duration_ms = 0u64;
    let mut total_anomalies = 0usize;

    for scenario in scenarios {
        emit_log(
            "info",
            "scenario_started",
            &run_id,
            Some(&scenario.name),
            Some(scenario.seed),
            None,
            json!({
                "pilot": scenario.pilot,
                "minutes": scenario.minutes,
            }),
        );
        let scenario_run = run_scenario(&scenario);

        for anomaly in &scenario_run.anomaly_records {
            emit_log(
                "warn",
                "anomaly_detected",
                &run_id,
                Some(&scenario.name),
                Some(scenario.seed),
                Some(anomaly.tick),
                json!({
                    "message": anomaly.message,
                }),
            );
        }

        if !scenario_run.result.anomalies.is_empty() {
            has_anomaly = true;
        }
        total_anomalies += scenario_run.anomaly_records.len();
        total_duration_ms += scenario_run.result.duration_ms;
        *outcome_counts
            .entry(outcome_key(scenario_run.result.outcome))
            .or_insert(0) += 1;

        emit_log(
            "info",
            "scenario_finished",
            &run_id,
            Some(&scenario.name),
            Some(scenario.seed),
            Some(scenario_run.finished_tick),
            json!({
                "outcome": scenario_run.result.outcome,
                "durationMs": scenario_run.result.duration_ms,
                "finalScore": scenario_run.result.final_score,
                "anomalyCount": scenario_run.anomaly_records.len(),
            }),
        );

        println!(
            "{}",
            serde_json::to_string(&scenario_run.result).expect("scenario result should serialize")
        );
        scenario_results.push(scenario_run.result);
    }

    let run_finished_at_ms = now_ms();
    let summary = build_run_summary(
        run_id.clone(),
        run_started_at_ms,
        run_finished_at_ms,
        scenario_results,
        outcome_counts,
        total_anomalies,
        total_duration_ms,
    );

    let mut summary_out_written: Option<String> = None;
    if let Some(path) = cli.summary_out.as_ref() {
        if let Err(error) = write_summary(path, &summary) {
            emit_log(
                "error",
                "summary_write_failed",
                &run_id,
                None,
                None,
                None,
                json!({
                    "path": path.to_string_lossy(),
                    "error": error.to_string(),
                }),
            );
            std::process::exit(2);
        }
        summary_out_written = Some(path.to_string_lossy().to_string());
    }

    emit_log(
        "info",
        "run_finished",
        &run_id,
        None,
        None,
        None,
        json!({
            "scenarioCount": summary.scenario_count,
            "anomalyCount": summary.anomaly_count,
            "averageDurationMs": summary.average_duration_ms,
            "outcomeCounts": summary.outcome_counts,
            "summaryOut": summary_out_written,
        }),
    );

    if has_anomaly {
        std::process::exit(1);
    }
}

fn run_scenario(scenario: &Scenario) -> ScenarioRunResult {
    let mut engine = GameEngine::new(
        format!("pilot-{}", scenario.pilot.key()),
        ContentStore::sample(),
        scenario.seed,
        GameOptions::default(),
    );

    let time_limit_ms = (scenario.minutes as u64) * 60_000;
    let mut anomalies = Vec::new();
    let mut anomaly_records = Vec::new();
    let mut anomaly_seen = HashSet::new();
    let mut prev_score = 0;
    let mut prev_health = PLAYER_MAX_HEALTH;
    let mut game_ended_events = 0usize;
    let mut elapsed_ms = 0u64;
    let mut last_tick = 0u64;
    let mut active_shots = 0usize;
    let mut tick_safety = 0usize;

    while !engine.is_ended() && elapsed_ms < time_limit_ms {
        if let Some(command) = pilot_command(scenario.pilot, &engine.build_snapshot(false)) {
            engine.apply_input(command);
        }
        engine.step(TICK_MS);
        elapsed_ms += TICK_MS;

        let snapshot = engine.build_snapshot(true);
        last_tick = snapshot.tick;
        active_shots = snapshot.shots.len();
        for message in collect_snapshot_anomalies(&snapshot, prev_score, prev_health) {
            push_anomaly(
                &mut anomalies,
                &mut anomaly_records,
                &mut anomaly_seen,
                snapshot.tick,
                message,
            );
        }
        prev_score = snapshot.player.score;
        prev_health = snapshot.player.health;
        game_ended_events += snapshot
            .events
            .iter()
            .filter(|event| matches!(event, RuntimeEvent::GameEnded { .. }))
            .count();

        tick_safety += 1;
        if tick_safety > 50 * 60 * 15 {
            push_anomaly(
                &mut anomalies,
                &mut anomaly_records,
                &mut anomaly_seen,
                snapshot.tick,
                "tick safety limit exceeded".to_string(),
            );
            break;
        }
    }

    if game_ended_events > 1 {
        push_anomaly(
            &mut anomalies,
            &mut anomaly_records,
            &mut anomaly_seen,
            last_tick,
            format!("game ended {game_ended_events} times"),
        );
    }

    // Terminal stability probe: a finished session must not drift
    // under further stepping.
    if engine.is_ended() {
        let before = engine.build_snapshot(false);
        for _ in 0..5 {
            engine.step(TICK_MS);
        }
        let after = engine.build_snapshot(false);
        if before.player.score != after.player.score
            || before.player.health != after.player.health
            || before.level != after.level
            || before.outcome != after.outcome
        {
            push_anomaly(
                &mut anomalies,
                &mut anomaly_records,
                &mut anomaly_seen,
                last_tick,
                "terminal state drifted after game over".to_string(),
            );
        }
    }

    let summary = engine.build_summary();
    let final_snapshot = engine.build_snapshot(false);

    ScenarioRunResult {
        result: ScenarioResultLine {
            scenario: scenario.name.clone(),
            seed: scenario.seed,
            pilot: scenario.pilot,
            minutes: scenario.minutes,
            ended: engine.is_ended(),
            outcome: engine.outcome(),
            final_score: final_snapshot.player.score,
            final_health: final_snapshot.player.health,
            level_reached: final_snapshot.level,
            duration_ms: summary.duration_ms,
            shots_fired: summary.stats.shots_fired,
            infos_collected: summary.stats.infos_collected,
            questions_hit: summary.stats.questions_hit,
            active_shots,
            anomalies,
        },
        anomaly_records,
        finished_tick: last_tick,
    }
}

fn collect_snapshot_anomalies(snapshot: &Snapshot, prev_score: i32, prev_health: i32) -> Vec<String> {
    let mut anomalies = Vec::new();
    if snapshot.player.score < prev_score {
        anomalies.push(format!(
            "score decreased: {} -> {}",
            prev_score, snapshot.player.score
        ));
    }
    if snapshot.player.health > prev_health {
        anomalies.push(format!(
            "health increased: {} -> {}",
            prev_health, snapshot.player.health
        ));
    }
    if snapshot.level < 1 || snapshot.level > MAX_LEVEL {
        anomalies.push(format!("level out of range: {}", snapshot.level));
    }
    if snapshot.game_over && snapshot.outcome.is_none() {
        anomalies.push("game over without outcome".to_string());
    }
    for shot in &snapshot.shots {
        if shot.speed <= 0 {
            anomalies.push(format!("shot with non-positive speed: {}", shot.id));
        }
    }
    anomalies
}

/// One command per tick, derived from the renderer-facing snapshot
/// alone, so the pilot exercises exactly the surface a human player
/// would see.
fn pilot_command(pilot: PilotKind, snapshot: &Snapshot) -> Option<MoveCommand> {
    let player = &snapshot.player;
    let player_center = player.x + PLAYER_WIDTH / 2;
    match pilot {
        PilotKind::Idle => None,
        PilotKind::Dodger => nearest_threat_dx(snapshot, player_center)
            .map(|dx| if dx >= 0 { MoveCommand::Left } else { MoveCommand::Right }),
        PilotKind::Collector => {
            if let Some(dx) = nearest_threat_dx(snapshot, player_center) {
                return Some(if dx >= 0 {
                    MoveCommand::Left
                } else {
                    MoveCommand::Right
                });
            }
            let target = snapshot
                .shots
                .iter()
                .filter(|shot| shot.kind == PayloadKind::Info && shot.y <= player.y)
                .min_by_key(|shot| (shot.x + SHOT_WIDTH / 2 - player_center).abs())?;
            let dx = target.x + SHOT_WIDTH / 2 - player_center;
            if dx > PLAYER_WIDTH / 4 {
                Some(MoveCommand::Right)
            } else if dx < -(PLAYER_WIDTH / 4) {
                Some(MoveCommand::Left)
            } else {
                None
            }
        }
    }
}

/// Horizontal offset of the closest question shot about to cross the
/// player's row, if any is near enough to matter.
fn nearest_threat_dx(snapshot: &Snapshot, player_center: i32) -> Option<i32> {
    let player = &snapshot.player;
    snapshot
        .shots
        .iter()
        .filter(|shot| shot.kind == PayloadKind::Question)
        .filter(|shot| shot.y + 160 >= player.y && shot.y < player.y + PLAYER_HEIGHT)
        .map(|shot| shot.x + SHOT_WIDTH / 2 - player_center)
        .filter(|dx| dx.abs() < 90)
        .min_by_key(|dx| dx.abs())
}

fn resolve_scenarios(cli: &Cli) -> Vec<Scenario> {
    let seed = normalize_seed(cli.seed.unwrap_or_else(|| {
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis() as u64
    }));
    let pilot = cli
        .pilot
        .as_deref()
        .and_then(PilotKind::parse)
        .unwrap_or(PilotKind::Collector);

    if cli.single || cli.pilot.is_some() || cli.minutes.is_some() {
        return vec![Scenario {
            name: format!("custom-{}", pilot.key()),
            pilot,
            minutes: clamp_i32(cli.minutes.unwrap_or(3), 1, 10),
            seed,
        }];
    }

    vec![
        Scenario {
            name: "collector-check".to_string(),
            pilot: PilotKind::Collector,
            minutes: 3,
            seed,
        },
        Scenario {
            name: "dodger-check".to_string(),
            pilot: PilotKind::Dodger,
            minutes: 2,
            seed: normalize_seed(seed as u64 + 1),
        },
    ]
}

fn clamp_i32(value: i32, min: i32, max: i32) -> i32 {
    value.clamp(min, max)
}

fn normalize_seed(seed: u64) -> u32 {
    seed as u32
}

fn push_anomaly(
    anomalies: &mut Vec<String>,
    anomaly_records: &mut Vec<AnomalyRecord>,
    anomaly_seen: &mut HashSet<String>,
    tick: u64,
    message: String,
) {
    anomaly_records.push(AnomalyRecord {
        tick,
        message: message.clone(),
    });
    if anomaly_seen.insert(message.clone()) {
        anomalies.push(message);
    }
}

fn default_run_id(seed: u32, timestamp_ms: u64) -> String {
    format!("sim-{seed}-{timestamp_ms}")
}

fn build_run_summary(
    run_id: String,
    started_at_ms: u64,
    finished_at_ms: u64,
    scenarios: Vec<ScenarioResultLine>,
    outcome_counts: BTreeMap<String, usize>,
    anomaly_count: usize,
    total_duration_ms: u64,
) -> RunSummary {
    let scenario_count = scenarios.len();
    let average_duration_ms = if scenario_count == 0 {
        0
    } else {
        total_duration_ms / scenario_count as u64
    };
    RunSummary {
        run_id,
        started_at_ms,
        finished_at_ms,
        scenario_count,
        anomaly_count,
        average_duration_ms,
        outcome_counts,
        scenarios,
    }
}

fn emit_log(
    level: &str,
    event: &str,
    run_id: &str,
    scenario: Option<&str>,
    seed: Option<u32>,
    tick: Option<u64>,
    details: Value,
) {
    let log_line = StructuredLogLine {
        timestamp_ms: now_ms(),
        level: level.to_string(),
        event: event.to_string(),
        run_id: run_id.to_string(),
        scenario: scenario.map(|value| value.to_string()),
        seed,
        tick,
        details,
    };
    eprintln!(
        "{}",
        serde_json::to_string(&log_line).expect("structured log should serialize")
    );
}

fn outcome_key(outcome: Option<GameOutcome>) -> String {
    match outcome {
        Some(GameOutcome::Won) => "won",
        Some(GameOutcome::Lost) => "lost",
        None => "unfinished",
    }
    .to_string()
}

fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

fn write_summary(path: &Path, summary: &RunSummary) -> io::Result<()> {
    let summary_text = serde_json::to_string_pretty(summary).expect("run summary should serialize");
    std::fs::write(path, summary_text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use quizfall::types::{PlayerView, ShotView};
    use std::time::{SystemTime, UNIX_EPOCH};

    fn make_scenario_result(outcome: Option<GameOutcome>, duration_ms: u64) -> ScenarioResultLine {
        ScenarioResultLine {
            scenario: "test".to_string(),
            seed: 42,
            pilot: PilotKind::Collector,
            minutes: 3,
            ended: outcome.is_some(),
            outcome,
            final_score: 120,
            final_health: 60,
            level_reached: 2,
            duration_ms,
            shots_fired: 30,
            infos_collected: 10,
            questions_hit: 4,
            active_shots: 6,
            anomalies: Vec::new(),
        }
    }

    fn make_snapshot(player_x: i32, shots: Vec<ShotView>) -> Snapshot {
        Snapshot {
            tick: 1,
            now_ms: 0,
            level: 1,
            required_score: 50,
            player: PlayerView {
                x: player_x,
                y: 640,
                health: PLAYER_MAX_HEALTH,
                score: 0,
                avatar: "player-1".to_string(),
            },
            enemies: Vec::new(),
            shots,
            info_text: String::new(),
            question_text: String::new(),
            game_over: false,
            outcome: None,
            events: Vec::new(),
        }
    }

    fn make_shot(kind: PayloadKind, x: i32, y: i32) -> ShotView {
        ShotView {
            id: "shot_1".to_string(),
            kind,
            x,
            y,
            speed: 3,
            text: "payload".to_string(),
        }
    }

    #[test]
    fn default_run_id_contains_seed_and_timestamp() {
        assert_eq!(default_run_id(42, 123456789), "sim-42-123456789");
    }

    #[test]
    fn build_run_summary_calculates_average_duration() {
        let summary = build_run_summary(
            "sim-42-1".to_string(),
            1,
            2,
            vec![
                make_scenario_result(Some(GameOutcome::Won), 60_000),
                make_scenario_result(Some(GameOutcome::Lost), 90_000),
            ],
            BTreeMap::from([("won".to_string(), 1usize), ("lost".to_string(), 1usize)]),
            1,
            150_000,
        );
        assert_eq!(summary.average_duration_ms, 75_000);
        assert_eq!(summary.scenario_count, 2);
    }

    #[test]
    fn push_anomaly_keeps_records_and_deduplicates_summary_messages() {
        let mut anomalies = Vec::new();
        let mut records = Vec::new();
        let mut seen = HashSet::new();
        push_anomaly(
            &mut anomalies,
            &mut records,
            &mut seen,
            10,
            "same anomaly".to_string(),
        );
        push_anomaly(
            &mut anomalies,
            &mut records,
            &mut seen,
            11,
            "same anomaly".to_string(),
        );

        assert_eq!(anomalies.len(), 1);
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].tick, 10);
        assert_eq!(records[1].tick, 11);
    }

    #[test]
    fn write_summary_returns_error_when_parent_does_not_exist() {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis();
        let target = std::env::temp_dir()
            .join(format!("quizfall-missing-{now}"))
            .join("summary.json");
        let summary = build_run_summary(
            "sim-1-1".to_string(),
            1,
            2,
            vec![make_scenario_result(Some(GameOutcome::Lost), 60_000)],
            BTreeMap::from([("lost".to_string(), 1usize)]),
            0,
            60_000,
        );
        let result = write_summary(&target, &summary);
        assert!(result.is_err());
    }

    #[test]
    fn collector_moves_toward_an_info_shot() {
        let snapshot = make_snapshot(500, vec![make_shot(PayloadKind::Info, 700, 300)]);
        assert_eq!(
            pilot_command(PilotKind::Collector, &snapshot),
            Some(MoveCommand::Right)
        );

        let snapshot = make_snapshot(500, vec![make_shot(PayloadKind::Info, 300, 300)]);
        assert_eq!(
            pilot_command(PilotKind::Collector, &snapshot),
            Some(MoveCommand::Left)
        );
    }

    #[test]
    fn collector_prioritizes_dodging_an_imminent_question() {
        let shots = vec![
            make_shot(PayloadKind::Info, 700, 300),
            make_shot(PayloadKind::Question, 505, 560),
        ];
        let snapshot = make_snapshot(500, shots);
        assert_eq!(
            pilot_command(PilotKind::Collector, &snapshot),
            Some(MoveCommand::Left)
        );
    }

    #[test]
    fn dodger_ignores_info_and_idle_never_moves() {
        let snapshot = make_snapshot(500, vec![make_shot(PayloadKind::Info, 700, 300)]);
        assert_eq!(pilot_command(PilotKind::Dodger, &snapshot), None);
        let snapshot = make_snapshot(500, vec![make_shot(PayloadKind::Question, 505, 560)]);
        assert_eq!(pilot_command(PilotKind::Idle, &snapshot), None);
    }

    #[test]
    fn distant_questions_are_not_threats() {
        // Far above the player's row.
        let snapshot = make_snapshot(500, vec![make_shot(PayloadKind::Question, 505, 100)]);
        assert_eq!(pilot_command(PilotKind::Dodger, &snapshot), None);
        // On the row but far off to the side.
        let snapshot = make_snapshot(500, vec![make_shot(PayloadKind::Question, 900, 560)]);
        assert_eq!(pilot_command(PilotKind::Dodger, &snapshot), None);
    }

    #[test]
    fn snapshot_anomaly_checks_flag_regressions() {
        let mut snapshot = make_snapshot(500, Vec::new());
        assert!(collect_snapshot_anomalies(&snapshot, 0, PLAYER_MAX_HEALTH).is_empty());

        snapshot.player.score = 10;
        let messages = collect_snapshot_anomalies(&snapshot, 20, 90);
        assert!(messages.iter().any(|m| m.contains("score decreased")));
        assert!(messages.iter().any(|m| m.contains("health increased")));

        let mut over = make_snapshot(500, Vec::new());
        over.game_over = true;
        assert!(collect_snapshot_anomalies(&over, 0, PLAYER_MAX_HEALTH)
            .iter()
            .any(|m| m.contains("without outcome")));
    }

    #[test]
    fn outcome_key_covers_all_cases() {
        assert_eq!(outcome_key(Some(GameOutcome::Won)), "won");
        assert_eq!(outcome_key(Some(GameOutcome::Lost)), "lost");
        assert_eq!(outcome_key(None), "unfinished");
    }
}
