use std::sync::Arc;

use sqlx::{Pool, Postgres};

use crate::{
    config::app_config::{AppConfig, CommandTokens, QuizConfig},
    service::{
        gateway::MessagingGateway,
        quiz_engine::QuizEngine,
        repository::{PgQuizRepository, QuizRepository},
        router::QuizRouter,
    },
};

#[derive(Clone)]
pub struct AppState {
    router: QuizRouter,
    webhook_secret: String,
}

impl AppState {
    pub fn new(
        repo: Arc<dyn QuizRepository>,
        gateway: Arc<dyn MessagingGateway>,
        quiz_config: QuizConfig,
        tokens: CommandTokens,
        webhook_secret: impl Into<String>,
    ) -> Arc<Self> {
        let engine = QuizEngine::new(repo, gateway.clone(), quiz_config);
        let router = QuizRouter::new(engine, gateway, tokens);

        Arc::new(Self {
            router,
            webhook_secret: webhook_secret.into(),
        })
    }

    pub fn from_pool(
        pool: Pool<Postgres>,
        gateway: Arc<dyn MessagingGateway>,
        config: &AppConfig,
    ) -> Arc<Self> {
        let repo = Arc::new(PgQuizRepository::new(pool));

        Self::new(
            repo,
            gateway,
            config.quiz.clone(),
            config.commands.clone(),
            config.telegram.webhook_secret.clone(),
        )
    }

    pub fn get_router(&self) -> &QuizRouter {
        &self.router
    }

    pub fn get_engine(&self) -> &QuizEngine {
        self.router.engine()
    }

    pub fn get_webhook_secret(&self) -> &str {
        &self.webhook_secret
    }
}
