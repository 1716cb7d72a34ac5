use validator::Validate;

use crate::{
    config::app_config::CommandTokens,
    models::{
        error::QuizError,
        quiz::{MAX_ROUNDS, QuizQuestion, StartQuizRequest},
    },
};

static CATEGORY_MARKER: char = '@';

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Start(StartQuizRequest),
    Hint,
    Stop,
    Ranking,
    Score,
    AddQuestion(QuizQuestion),
    RemoveQuestion(QuizQuestion),
}

impl Command {
    /// Returns `None` when the text is not one of the quiz commands, so the
    /// caller can treat it as an answer attempt.
    pub fn parse(text: &str, tokens: &CommandTokens) -> Option<Result<Command, QuizError>> {
        let mut parts = text.split_whitespace();
        let head = parts.next()?;
        // Group chats address commands as "/cmd@botname"
        let head = head.split_once(CATEGORY_MARKER).map_or(head, |(cmd, _)| cmd);
        let args: Vec<&str> = parts.collect();

        let command = if head == tokens.start {
            parse_start(&args, tokens)
        } else if head == tokens.hint {
            Ok(Command::Hint)
        } else if head == tokens.stop {
            Ok(Command::Stop)
        } else if head == tokens.ranking {
            Ok(Command::Ranking)
        } else if head == tokens.score {
            Ok(Command::Score)
        } else if head == tokens.add_question {
            parse_question(&args, &tokens.add_question).map(Command::AddQuestion)
        } else if head == tokens.remove_question {
            parse_question(&args, &tokens.remove_question).map(Command::RemoveQuestion)
        } else {
            return None;
        };

        Some(command)
    }
}

fn strip_marker(arg: &str) -> &str {
    arg.strip_prefix(CATEGORY_MARKER).unwrap_or(arg)
}

fn parse_start(args: &[&str], tokens: &CommandTokens) -> Result<Command, QuizError> {
    let usage = || {
        QuizError::InvalidCommand(format!(
            "사용법: {} <문제 수(1~{})> [@카테고리]",
            tokens.start, MAX_ROUNDS
        ))
    };

    let rounds = args
        .first()
        .and_then(|arg| arg.parse::<u32>().ok())
        .ok_or_else(usage)?;

    let category = args[1..]
        .iter()
        .map(|arg| strip_marker(arg))
        .collect::<Vec<&str>>()
        .join(" ");
    let category = (!category.is_empty()).then_some(category);

    let request = StartQuizRequest { rounds, category };
    request.validate().map_err(|_| usage())?;

    Ok(Command::Start(request))
}

/// `<answer words...> @<category>`. Without a marker the last word is the category.
fn parse_question(args: &[&str], token: &str) -> Result<QuizQuestion, QuizError> {
    let usage = || QuizError::InvalidCommand(format!("사용법: {} <정답> @<카테고리>", token));

    if args.len() < 2 {
        return Err(usage());
    }

    let split = args
        .iter()
        .rposition(|arg| arg.starts_with(CATEGORY_MARKER))
        .unwrap_or(args.len() - 1);

    let answer = args[..split].join(" ");
    let category = args[split..]
        .iter()
        .map(|arg| strip_marker(arg))
        .collect::<Vec<&str>>()
        .join(" ");

    let question = QuizQuestion::new(answer, category);
    question.validate().map_err(|_| usage())?;

    Ok(question)
}
