use serde::{Deserialize, Serialize};
use std::cmp::Reverse;

pub const MAX_ENTRIES: usize = 5;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreEntry {
    pub name: String,
    pub score: i64,
}

impl ScoreEntry {
    pub fn new(name: impl Into<String>, score: i64) -> Self {
        Self {
            name: name.into(),
            score,
        }
    }
}

// Top-five rule: below capacity the entry always goes in. At capacity the
// scan replaces the first entry, in stored order, whose score is strictly
// lower than the new one. Not the lowest entry; on a sorted list that
// means the best beatable score gets bumped. Afterwards the list is
// sorted descending, stable, so equal scores keep their relative order.
pub fn record_entry(list: &mut Vec<ScoreEntry>, entry: ScoreEntry) -> bool {
    if list.len() < MAX_ENTRIES {
        list.push(entry);
    } else {
        let Some(slot) = list.iter().position(|e| e.score < entry.score) else {
            return false;
        };
        list[slot] = entry;
    }
    list.sort_by_key(|e| Reverse(e.score));
    true
}
