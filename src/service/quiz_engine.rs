use std::{
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
    time::Duration,
};

use futures::future::join_all;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use tokio::{
    sync::mpsc::{self, UnboundedReceiver, UnboundedSender},
    task::AbortHandle,
    time::Instant,
};
use tracing::{debug, error, info, warn};

use crate::{
    config::app_config::QuizConfig,
    models::{
        chat::{ChatId, InboundMessage, SendOptions},
        error::QuizError,
        quiz::QuizQuestion,
        session::{QuizSessionState, RoundWinner, Standing, TimerEvent, TimerKind},
    },
    service::{
        gateway::MessagingGateway,
        hint,
        repository::{QuizRepository, RepositoryError},
        score_book::ScoreBook,
        session_store::SessionStore,
    },
};

// Shared by session ids and round generations so no two ever collide.
static NEXT_ID: AtomicU64 = AtomicU64::new(1);

fn next_id() -> u64 {
    NEXT_ID.fetch_add(1, Ordering::Relaxed)
}

/// Runs the quiz sessions of every chat room.
///
/// Cloning is cheap; clones share the same sessions. Timers never touch a
/// session directly: they post a [`TimerEvent`] tagged with the round's
/// generation, and events for rounds that are no longer in flight are dropped.
#[derive(Clone)]
pub struct QuizEngine {
    sessions: Arc<SessionStore>,
    repo: Arc<dyn QuizRepository>,
    score_book: Arc<ScoreBook>,
    gateway: Arc<dyn MessagingGateway>,
    config: Arc<QuizConfig>,
    timer_tx: UnboundedSender<TimerEvent>,
}

impl QuizEngine {
    /// Must be called from within a tokio runtime.
    pub fn new(
        repo: Arc<dyn QuizRepository>,
        gateway: Arc<dyn MessagingGateway>,
        config: QuizConfig,
    ) -> Self {
        let (timer_tx, timer_rx) = mpsc::unbounded_channel();
        let engine = Self {
            sessions: Arc::new(SessionStore::new()),
            score_book: Arc::new(ScoreBook::new(repo.clone())),
            repo,
            gateway,
            config: Arc::new(config),
            timer_tx,
        };

        engine.spawn_timer_consumer(timer_rx);
        engine
    }

    pub fn sessions(&self) -> &SessionStore {
        &self.sessions
    }

    pub fn score_book(&self) -> &ScoreBook {
        &self.score_book
    }

    pub fn repository(&self) -> &Arc<dyn QuizRepository> {
        &self.repo
    }

    fn spawn_timer_consumer(&self, mut timer_rx: UnboundedReceiver<TimerEvent>) {
        let engine = self.clone();

        tokio::spawn(async move {
            while let Some(event) = timer_rx.recv().await {
                let engine = engine.clone();
                tokio::spawn(async move {
                    engine.on_timer(event).await;
                });
            }
        });
    }

    async fn on_timer(&self, event: TimerEvent) {
        let result = match event.kind {
            TimerKind::Hint => self.on_hint_timer(event.chat_id, event.generation).await,
            TimerKind::RoundTimeout => {
                self.on_round_timeout(event.chat_id, event.generation).await
            }
        };

        if let Err(e) = result {
            warn!("Timer {:?} in chat {} failed: {}", event.kind, event.chat_id, e);
            self.notify_error(event.chat_id, &e).await;
        }
    }

    fn arm_timer(
        &self,
        chat_id: ChatId,
        generation: u64,
        kind: TimerKind,
        delay: Duration,
    ) -> AbortHandle {
        let timer_tx = self.timer_tx.clone();

        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let event = TimerEvent {
                chat_id,
                generation,
                kind,
            };
            if timer_tx.send(event).is_err() {
                debug!("Timer queue closed, dropping {:?}", kind);
            }
        })
        .abort_handle()
    }

    async fn send(&self, chat_id: ChatId, text: &str, options: SendOptions) {
        if let Err(e) = self.gateway.send(chat_id, text, options).await {
            error!("Failed to send message to chat {}: {}", chat_id, e);
        }
    }

    pub async fn notify_error(&self, chat_id: ChatId, error: &QuizError) {
        self.send(chat_id, &error.chat_message(), SendOptions::default()).await;
    }

    pub async fn start(
        &self,
        chat_id: ChatId,
        rounds: u32,
        category: Option<String>,
    ) -> Result<(), QuizError> {
        if rounds == 0 {
            return Err(QuizError::InvalidCommand(
                "문제 수는 1 이상이어야 해요.".into(),
            ));
        }

        let session_id = next_id();
        let state = QuizSessionState::new(session_id, rounds, category.clone());
        if !self.sessions.insert_if_absent(chat_id, state) {
            return Err(QuizError::AlreadyInProgress);
        }

        info!(
            "Quiz started in chat {}: {} rounds, category {:?}",
            chat_id, rounds, category
        );
        self.issue_round(chat_id, session_id).await
    }

    async fn pick_question(
        &self,
        category: Option<&str>,
    ) -> Result<Option<QuizQuestion>, RepositoryError> {
        let count = self.repo.count_matching(category).await?;
        if count <= 0 {
            return Ok(None);
        }

        // Uniform only as long as the bank does not change between both queries
        let offset = ChaCha8Rng::from_os_rng().random_range(0..count);
        self.repo.find_one_at_offset(category, offset).await
    }

    async fn issue_round(&self, chat_id: ChatId, session_id: u64) -> Result<(), QuizError> {
        let Some((round, total, category)) = self
            .sessions
            .update(chat_id, |state| {
                (state.session_id == session_id).then(|| {
                    state.rounds_completed += 1;
                    state.accepting = false;
                    (
                        state.rounds_completed,
                        state.rounds_requested,
                        state.category_filter.clone(),
                    )
                })
            })
            .flatten()
        else {
            debug!("Session in chat {} ended before round was issued", chat_id);
            return Ok(());
        };

        let question = match self.pick_question(category.as_deref()).await {
            Ok(Some(question)) => question,
            Ok(None) => return self.fail_round(chat_id, session_id, QuizError::EmptyQuestionBank),
            Err(e) => return self.fail_round(chat_id, session_id, e.into()),
        };

        let generation = next_id();
        let mut timers = vec![
            self.arm_timer(chat_id, generation, TimerKind::Hint, self.config.hint_delay()),
            self.arm_timer(
                chat_id,
                generation,
                TimerKind::RoundTimeout,
                self.config.round_timeout(),
            ),
        ];

        let armed = self
            .sessions
            .update(chat_id, |state| {
                (state.session_id == session_id).then(|| {
                    let timers = std::mem::take(&mut timers);
                    state.begin_round(&question, generation, timers, Instant::now())
                })
            })
            .flatten();

        if armed.is_none() {
            debug!("Session in chat {} ended while issuing round", chat_id);
            timers.iter().for_each(AbortHandle::abort);
            return Ok(());
        }

        debug!("Chat {} round {}/{}: generation {}", chat_id, round, total, generation);
        let text = format!(
            "[{}/{}] {} 문제: {}",
            round,
            total,
            question.category,
            hint::chosung(&question.answer)
        );
        self.send(chat_id, &text, SendOptions::default()).await;

        Ok(())
    }

    /// Aborts the session after its next question could not be picked. A
    /// session stopped in the meantime stays silent.
    fn fail_round(
        &self,
        chat_id: ChatId,
        session_id: u64,
        error: QuizError,
    ) -> Result<(), QuizError> {
        let Some(mut state) = self.sessions.remove_session(chat_id, session_id) else {
            debug!("Session in chat {} ended before its round failed: {}", chat_id, error);
            return Ok(());
        };

        state.cancel_timers();
        info!("Quiz aborted in chat {}", chat_id);
        Err(error)
    }

    fn advance_hint(&self, state: &mut QuizSessionState, now: Instant) -> String {
        let hint = hint::reveal(
            &state.current_answer,
            &state.revealed_positions,
            self.config.hint_reveal_count,
        );
        state.revealed_positions = hint.revealed;
        state.last_hint_at = now;
        hint.text
    }

    pub async fn request_hint(&self, chat_id: ChatId) -> Result<(), QuizError> {
        let now = Instant::now();
        let cooldown = self.config.hint_cooldown();

        let hint = self
            .sessions
            .update(chat_id, |state| {
                if !state.accepting {
                    return Err(QuizError::NotRunning);
                }

                let elapsed = now.duration_since(state.last_hint_at);
                if elapsed < cooldown {
                    return Err(QuizError::TooEarly(cooldown - elapsed));
                }

                Ok(self.advance_hint(state, now))
            })
            .ok_or(QuizError::NotRunning)??;

        self.send(chat_id, &format!("힌트: {}", hint), SendOptions::default()).await;
        Ok(())
    }

    /// Supplements manual hints; stays quiet if one was given within the cooldown.
    pub async fn on_hint_timer(&self, chat_id: ChatId, generation: u64) -> Result<(), QuizError> {
        let now = Instant::now();
        let cooldown = self.config.hint_cooldown();

        let hint = self
            .sessions
            .update(chat_id, |state| {
                if state.generation != generation || !state.accepting {
                    return None;
                }
                if now.duration_since(state.last_hint_at) < cooldown {
                    return None;
                }

                Some(self.advance_hint(state, now))
            })
            .flatten();

        match hint {
            Some(hint) => {
                self.send(chat_id, &format!("힌트: {}", hint), SendOptions::default()).await
            }
            None => debug!("Dropping hint timer for chat {}", chat_id),
        }

        Ok(())
    }

    pub async fn on_round_timeout(
        &self,
        chat_id: ChatId,
        generation: u64,
    ) -> Result<(), QuizError> {
        let resolved = self
            .sessions
            .update(chat_id, |state| {
                if state.generation != generation || !state.close_round() {
                    return None;
                }
                Some((state.session_id, state.current_answer.clone()))
            })
            .flatten();

        let Some((session_id, answer)) = resolved else {
            debug!("Dropping stale round timeout for chat {}", chat_id);
            return Ok(());
        };

        let text = format!("시간 초과! 정답은 \"{}\"였어요.", answer);
        self.send(chat_id, &text, SendOptions::default()).await;

        self.finish_round(chat_id, session_id).await
    }

    /// Checks a chat message against the room's open question. Returns true
    /// if the message won the round.
    pub async fn on_message(&self, message: &InboundMessage) -> Result<bool, QuizError> {
        // Claim the round before any await so later answers see it closed
        let claimed = self
            .sessions
            .update(message.chat_id, |state| {
                if !state.accepting || state.current_answer != message.text {
                    return None;
                }

                state.close_round();
                state.round_winners.push(RoundWinner {
                    user_id: message.user_id,
                    display_name: message.display_name.clone(),
                });
                Some((state.session_id, state.current_category.clone()))
            })
            .flatten();

        let Some((session_id, category)) = claimed else {
            return Ok(false);
        };

        info!(
            "User {} answered correctly in chat {}",
            message.user_id, message.chat_id
        );

        if let Err(e) = self
            .score_book
            .record_win(
                message.user_id,
                message.chat_id,
                &message.display_name,
                &category,
            )
            .await
        {
            // The round stays claimed; only the point is lost
            self.notify_error(message.chat_id, &QuizError::Repository(e)).await;
        }

        let text = format!("{}님 정답! \"{}\"", message.display_name, message.text);
        self.send(message.chat_id, &text, SendOptions::reply_to(message.message_id)).await;

        self.finish_round(message.chat_id, session_id).await?;
        Ok(true)
    }

    async fn finish_round(&self, chat_id: ChatId, session_id: u64) -> Result<(), QuizError> {
        let is_final = self
            .sessions
            .get(chat_id, |state| {
                (state.session_id == session_id).then(|| state.is_final_round())
            })
            .flatten();

        match is_final {
            Some(true) => self.complete(chat_id, session_id).await,
            Some(false) => self.issue_round(chat_id, session_id).await,
            None => Ok(()),
        }
    }

    async fn complete(&self, chat_id: ChatId, session_id: u64) -> Result<(), QuizError> {
        let Some(mut state) = self.sessions.remove_session(chat_id, session_id) else {
            return Ok(());
        };
        state.cancel_timers();
        info!("Quiz completed in chat {}", chat_id);

        let standings = tally_winners(&state.round_winners);
        if standings.is_empty() {
            let text = "퀴즈 끝! 이번에는 맞힌 사람이 없어요.";
            self.send(chat_id, text, SendOptions::default()).await;
            return Ok(());
        }

        let totals = join_all(
            standings
                .iter()
                .map(|standing| self.score_book.total_for(standing.user_id, chat_id)),
        )
        .await;

        let mut lines = vec![String::from("퀴즈 끝! 최종 순위")];
        for (rank, (standing, total)) in standings.iter().zip(totals).enumerate() {
            let total = total.unwrap_or_else(|e| {
                warn!("Failed to load total of user {}: {}", standing.user_id, e);
                0
            });
            lines.push(format!(
                "{}. [{}] {} - {}문제",
                rank + 1,
                ScoreBook::title(total),
                standing.display_name,
                standing.wins
            ));
        }

        self.send(chat_id, &lines.join("\n"), SendOptions::default()).await;
        Ok(())
    }

    pub async fn stop(&self, chat_id: ChatId) -> Result<(), QuizError> {
        let Some(mut state) = self.sessions.remove(chat_id) else {
            return Err(QuizError::NotRunning);
        };
        state.cancel_timers();
        info!("Quiz stopped in chat {}", chat_id);

        let text = if state.accepting {
            format!("퀴즈를 중지했어요. 정답은 \"{}\"였어요.", state.current_answer)
        } else {
            String::from("퀴즈를 중지했어요.")
        };
        self.send(chat_id, &text, SendOptions::default()).await;

        Ok(())
    }
}

/// Round wins per player, most wins first. Players with equal wins keep the
/// order of their first win.
pub fn tally_winners(winners: &[RoundWinner]) -> Vec<Standing> {
    let mut standings: Vec<Standing> = Vec::new();

    for winner in winners {
        match standings.iter_mut().find(|s| s.user_id == winner.user_id) {
            Some(standing) => {
                standing.wins += 1;
                standing.display_name = winner.display_name.clone();
            }
            None => standings.push(Standing {
                user_id: winner.user_id,
                display_name: winner.display_name.clone(),
                wins: 1,
            }),
        }
    }

    standings.sort_by(|a, b| b.wins.cmp(&a.wins));
    standings
}
