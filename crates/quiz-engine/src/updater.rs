//! Weight and recency adjustment applied after every answer.
//!
//! A correct answer shrinks the weight by a quarter (never below
//! [`MIN_WEIGHT`]); an incorrect answer doubles it (never above [`MAX_WEIGHT`]).
//! Either way the recency factor drops back to 1.

use crate::models::{QuestionStat, MAX_WEIGHT, MIN_WEIGHT};

/// Weight after answering a question that currently has `weight`.
pub fn next_weight(weight: u32, correct: bool) -> u32 {
    if correct {
        (weight.saturating_mul(3) / 4).max(MIN_WEIGHT)
    } else {
        weight.saturating_mul(2).min(MAX_WEIGHT)
    }
}

/// Stat after an answer. Counters are left to the caller.
pub fn apply(stat: &QuestionStat, correct: bool) -> QuestionStat {
    let mut next = *stat;
    next.reweight(next_weight(stat.weight(), correct));
    next
}
