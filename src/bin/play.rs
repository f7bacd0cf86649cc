use std::path::PathBuf;
use std::time::Duration;

use quizfall::constants::TICK_MS;
use quizfall::content::ContentStore;
use quizfall::engine::{GameEngine, GameOptions};
use quizfall::score_store::ScoreStore;
use quizfall::types::MoveCommand;
use serde_json::json;
use tokio::io::AsyncBufReadExt;

/// Real-time session driver. A fixed-interval tick and a stdin reader
/// interleave on one current-thread scheduler, so engine mutation is
/// always serialized: move commands land between ticks, never during
/// one. Each tick the fresh snapshot goes to stdout as one JSON line
/// for an external renderer; stderr carries operational notes.
#[tokio::main(flavor = "current_thread")]
async fn main() {
    let player_name = std::env::var("QUIZFALL_PLAYER").unwrap_or_else(|_| "player".to_string());
    let seed = std::env::var("QUIZFALL_SEED")
        .ok()
        .and_then(|value| value.parse::<u32>().ok())
        .unwrap_or_else(rand::random::<u32>);
    let scores_path = std::env::var("QUIZFALL_SCORES_PATH")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from(".data/scores.json"));

    let content = resolve_content();
    let mut store = ScoreStore::new(scores_path);
    let mut options = GameOptions::default();
    if let Ok(avatar) = std::env::var("QUIZFALL_AVATAR") {
        options.player_avatar = avatar;
    }
    let mut engine = GameEngine::new(player_name.clone(), content, seed, options);

    println!(
        "{}",
        json!({
            "type": "init",
            "init": engine.get_session_init(),
        })
    );

    let stdin = tokio::io::BufReader::new(tokio::io::stdin());
    let mut input_lines = stdin.lines();
    let mut input_open = true;
    let mut aborted = false;
    let mut interval = tokio::time::interval(Duration::from_millis(TICK_MS));

    loop {
        tokio::select! {
            _ = interval.tick() => {
                engine.step(TICK_MS);
                let snapshot = engine.build_snapshot(true);
                println!(
                    "{}",
                    json!({
                        "type": "state",
                        "snapshot": snapshot,
                    })
                );
                if engine.is_ended() {
                    break;
                }
            }
            line = input_lines.next_line(), if input_open => {
                match line {
                    Ok(Some(text)) => {
                        let text = text.trim();
                        if text == "quit" {
                            aborted = true;
                            break;
                        }
                        match MoveCommand::parse(text) {
                            Some(command) => engine.apply_input(command),
                            None if text.is_empty() => {}
                            None => eprintln!("[play] ignoring unknown command: {text}"),
                        }
                    }
                    // stdin closed; keep the session ticking.
                    Ok(None) | Err(_) => input_open = false,
                }
            }
        }
    }

    if aborted {
        println!("{}", json!({ "type": "aborted" }));
        return;
    }

    let summary = engine.build_summary();
    store.record_session(&player_name, &summary);
    println!(
        "{}",
        json!({
            "type": "game_over",
            "summary": summary,
        })
    );
    println!(
        "{}",
        json!({
            "type": "scoreboard",
            "scoreboard": store.build_response(None),
        })
    );
}

/// Content banks come from `[Level N]`-format text files when both
/// paths are configured; otherwise the built-in sample banks keep the
/// session playable.
fn resolve_content() -> ContentStore {
    let info_path = std::env::var("QUIZFALL_INFO_FILE").map(PathBuf::from);
    let question_path = std::env::var("QUIZFALL_QUESTION_FILE").map(PathBuf::from);
    match (info_path, question_path) {
        (Ok(info), Ok(questions)) => match ContentStore::load(&info, &questions) {
            Ok(store) => store,
            Err(error) => {
                eprintln!("[play] failed to load content banks: {error}; using samples");
                ContentStore::sample()
            }
        },
        _ => ContentStore::sample(),
    }
}
