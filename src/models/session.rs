use std::collections::BTreeSet;

use tokio::{task::AbortHandle, time::Instant};

use crate::models::{
    chat::{ChatId, UserId},
    quiz::QuizQuestion,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoundWinner {
    pub user_id: UserId,
    pub display_name: String,
}

/// Live state of the quiz running in one chat room. Never persisted.
#[derive(Debug)]
pub struct QuizSessionState {
    pub session_id: u64,
    pub rounds_requested: u32,
    /// 1-indexed number of the round in flight once a round was issued.
    pub rounds_completed: u32,
    pub category_filter: Option<String>,
    pub current_answer: String,
    pub current_category: String,
    /// True only while the current question may still be answered.
    pub accepting: bool,
    pub revealed_positions: BTreeSet<usize>,
    pub last_hint_at: Instant,
    pub round_winners: Vec<RoundWinner>,
    /// Identifies the round in flight. Timer events carrying another value are stale.
    pub generation: u64,
    pub timers: Vec<AbortHandle>,
}

impl QuizSessionState {
    pub fn new(session_id: u64, rounds_requested: u32, category_filter: Option<String>) -> Self {
        Self {
            session_id,
            rounds_requested,
            rounds_completed: 0,
            category_filter,
            current_answer: String::new(),
            current_category: String::new(),
            accepting: false,
            revealed_positions: BTreeSet::new(),
            last_hint_at: Instant::now(),
            round_winners: Vec::new(),
            generation: 0,
            timers: Vec::new(),
        }
    }

    pub fn begin_round(
        &mut self,
        question: &QuizQuestion,
        generation: u64,
        timers: Vec<AbortHandle>,
        now: Instant,
    ) {
        self.cancel_timers();
        self.current_answer = question.answer.clone();
        self.current_category = question.category.clone();
        self.revealed_positions.clear();
        self.last_hint_at = now;
        self.generation = generation;
        self.timers = timers;
        self.accepting = true;
    }

    /// Closes the round for further answers. Returns false if it was already closed.
    pub fn close_round(&mut self) -> bool {
        if !self.accepting {
            return false;
        }

        self.accepting = false;
        self.cancel_timers();
        self.revealed_positions.clear();
        self.last_hint_at = Instant::now();
        true
    }

    pub fn is_final_round(&self) -> bool {
        self.rounds_completed >= self.rounds_requested
    }

    pub fn cancel_timers(&mut self) {
        for timer in self.timers.drain(..) {
            timer.abort();
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerKind {
    Hint,
    RoundTimeout,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimerEvent {
    pub chat_id: ChatId,
    pub generation: u64,
    pub kind: TimerKind,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Standing {
    pub user_id: UserId,
    pub display_name: String,
    pub wins: u32,
}
