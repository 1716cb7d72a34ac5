use std::sync::Arc;

use tracing::{debug, info};

use crate::{
    config::app_config::CommandTokens,
    models::{
        chat::{InboundMessage, SendOptions},
        command::Command,
        error::QuizError,
        quiz::QuizQuestion,
    },
    service::{gateway::MessagingGateway, quiz_engine::QuizEngine, score_book::ScoreBook},
};

static CREATED_MSG: &str = "알겠어요!";
static DELETED_MSG: &str = "잊었어요.";

/// The single inbound handler: every message of every room passes through
/// here, commands are executed and anything else is offered to the room's
/// quiz as an answer.
#[derive(Clone)]
pub struct QuizRouter {
    engine: QuizEngine,
    gateway: Arc<dyn MessagingGateway>,
    tokens: Arc<CommandTokens>,
}

impl QuizRouter {
    pub fn new(
        engine: QuizEngine,
        gateway: Arc<dyn MessagingGateway>,
        tokens: CommandTokens,
    ) -> Self {
        Self {
            engine,
            gateway,
            tokens: Arc::new(tokens),
        }
    }

    pub fn engine(&self) -> &QuizEngine {
        &self.engine
    }

    pub async fn handle(&self, message: InboundMessage) {
        let outcome = match Command::parse(&message.text, &self.tokens) {
            Some(Ok(command)) => {
                debug!("Chat {} command: {:?}", message.chat_id, command);
                self.execute(&message, command).await
            }
            Some(Err(e)) => Err(e),
            None => self.engine.on_message(&message).await.map(|_| ()),
        };

        if let Err(e) = outcome {
            self.engine.notify_error(message.chat_id, &e).await;
        }
    }

    async fn execute(&self, message: &InboundMessage, command: Command) -> Result<(), QuizError> {
        let chat_id = message.chat_id;

        match command {
            Command::Start(request) => {
                self.engine
                    .start(chat_id, request.rounds, request.category)
                    .await
            }
            Command::Hint => self.engine.request_hint(chat_id).await,
            Command::Stop => self.engine.stop(chat_id).await,
            Command::Ranking => self.send_ranking(message).await,
            Command::Score => self.send_score(message).await,
            Command::AddQuestion(question) => self.add_question(message, question).await,
            Command::RemoveQuestion(question) => self.remove_question(message, question).await,
        }
    }

    async fn reply(&self, message: &InboundMessage, text: &str) -> Result<(), QuizError> {
        self.gateway
            .send(message.chat_id, text, SendOptions::reply_to(message.message_id))
            .await?;
        Ok(())
    }

    async fn send_ranking(&self, message: &InboundMessage) -> Result<(), QuizError> {
        let ranking = self
            .engine
            .score_book()
            .ranking_for_room(message.chat_id)
            .await?;

        if ranking.is_empty() {
            return Err(QuizError::NotFound(format!(
                "ranking of chat {}",
                message.chat_id
            )));
        }

        let mut lines = vec![String::from("랭킹")];
        for (rank, (name, total)) in ranking.iter().enumerate() {
            lines.push(format!(
                "{}. [{}] {} - {}점",
                rank + 1,
                ScoreBook::title(*total),
                name,
                total
            ));
        }

        self.gateway
            .send(message.chat_id, &lines.join("\n"), SendOptions::default())
            .await?;
        Ok(())
    }

    async fn send_score(&self, message: &InboundMessage) -> Result<(), QuizError> {
        let record = self
            .engine
            .score_book()
            .player_score(message.user_id, message.chat_id)
            .await?;
        let total = ScoreBook::total_score(&record);

        let mut lines = vec![format!(
            "[{}] {}님 {}점",
            ScoreBook::title(total),
            record.display_name,
            total
        )];
        lines.extend(
            record
                .scores
                .iter()
                .map(|(category, points)| format!("{}: {}점", category, points)),
        );

        self.reply(message, &lines.join("\n")).await
    }

    async fn add_question(
        &self,
        message: &InboundMessage,
        question: QuizQuestion,
    ) -> Result<(), QuizError> {
        if !self.engine.repository().create_question(&question).await? {
            return Err(QuizError::AlreadyExists);
        }

        info!("Question added to category {}", question.category);
        self.reply(message, CREATED_MSG).await
    }

    async fn remove_question(
        &self,
        message: &InboundMessage,
        question: QuizQuestion,
    ) -> Result<(), QuizError> {
        if !self.engine.repository().delete_question(&question).await? {
            return Err(QuizError::NotFound(format!(
                "question in category {}",
                question.category
            )));
        }

        info!("Question removed from category {}", question.category);
        self.reply(message, DELETED_MSG).await
    }
}
