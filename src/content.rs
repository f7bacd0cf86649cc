use std::fs;
use std::io;
use std::path::Path;

use crate::rng::Rng;
use crate::types::PayloadKind;

/// Difficulty-keyed pools of payload text. Shots carry either an info
/// line (rewarding) or a question line (damaging); both come from
/// preloaded pools picked uniformly at random. An empty pool is a
/// recoverable condition: `pick` returns `None` and the caller skips
/// that firing.
#[derive(Clone, Debug, Default)]
pub struct ContentStore {
    infos: [Vec<String>; 3],
    questions: [Vec<String>; 3],
}

impl ContentStore {
    /// Loads both banks from text files in the `[Level N] text` line
    /// format. Lines without a recognized level prefix are ignored.
    pub fn load(info_path: &Path, question_path: &Path) -> io::Result<Self> {
        let infos = parse_pools(&fs::read_to_string(info_path)?);
        let questions = parse_pools(&fs::read_to_string(question_path)?);
        Ok(Self { infos, questions })
    }

    pub fn from_texts(info_text: &str, question_text: &str) -> Self {
        Self {
            infos: parse_pools(info_text),
            questions: parse_pools(question_text),
        }
    }

    /// Small built-in banks so sessions can run without data files.
    pub fn sample() -> Self {
        Self::from_texts(
            "[Level 1] A stack frame holds a function's locals.\n\
             [Level 1] Big-O describes growth, not absolute speed.\n\
             [Level 1] A byte is eight bits.\n\
             [Level 2] Quicksort is O(n log n) on average.\n\
             [Level 2] A mutex serializes access to shared state.\n\
             [Level 2] TCP retransmits lost segments.\n\
             [Level 3] Amdahl's law caps parallel speedup.\n\
             [Level 3] B-trees keep disk seeks logarithmic.\n",
            "[Level 1] What does CPU stand for?\n\
             [Level 1] Name one base-2 digit.\n\
             [Level 1] What symbol ends a C statement?\n\
             [Level 2] State the average complexity of hash lookup.\n\
             [Level 2] What does a semaphore count?\n\
             [Level 2] Which layer does IP belong to?\n\
             [Level 3] Derive the master theorem's second case.\n\
             [Level 3] Prove the halting problem is undecidable.\n",
        )
    }

    /// Uniform pick from the pool for `(kind, difficulty)`. Difficulty
    /// is 1-based; unknown difficulties and empty pools yield `None`.
    pub fn pick(&self, kind: PayloadKind, difficulty: u8, rng: &mut Rng) -> Option<String> {
        let pool = self.pool(kind, difficulty)?;
        if pool.is_empty() {
            return None;
        }
        Some(pool[rng.pick_index(pool.len())].clone())
    }

    pub fn pool_len(&self, kind: PayloadKind, difficulty: u8) -> usize {
        self.pool(kind, difficulty).map_or(0, Vec::len)
    }

    fn pool(&self, kind: PayloadKind, difficulty: u8) -> Option<&Vec<String>> {
        let banks = match kind {
            PayloadKind::Info => &self.infos,
            PayloadKind::Question => &self.questions,
        };
        banks.get(difficulty.checked_sub(1)? as usize)
    }
}

fn parse_pools(text: &str) -> [Vec<String>; 3] {
    let mut pools: [Vec<String>; 3] = Default::default();
    for line in text.lines() {
        let Some((level, rest)) = parse_level_prefix(line) else {
            continue;
        };
        let entry = rest.trim();
        if entry.is_empty() {
            continue;
        }
        pools[level - 1].push(entry.to_string());
    }
    pools
}

fn parse_level_prefix(line: &str) -> Option<(usize, &str)> {
    for (level, prefix) in [(1, "[Level 1]"), (2, "[Level 2]"), (3, "[Level 3]")] {
        if let Some(rest) = line.strip_prefix(prefix) {
            return Some((level, rest));
        }
    }
    None
}
