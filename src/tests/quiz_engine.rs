use std::time::Duration;

use crate::{
    models::{
        error::QuizError,
        quiz::QuizQuestion,
        session::{RoundWinner, Standing},
    },
    service::{quiz_engine::tally_winners, repository::QuizRepository},
    tests::fakes::{CHAT, MemoryRepository, RecordingGateway, engine, message, router},
};

#[tokio::test]
async fn start_issues_first_round_with_chosung_hint() {
    let repo = MemoryRepository::with_questions(&[("사과", "과일")]);
    let gateway = RecordingGateway::new();
    let engine = engine(&repo, &gateway);

    engine.start(CHAT, 3, None).await.unwrap();

    assert_eq!(gateway.texts(), vec!["[1/3] 과일 문제: ㅅㄱ"]);
    let (round, accepting) = engine
        .sessions()
        .get(CHAT, |s| (s.rounds_completed, s.accepting))
        .unwrap();
    assert_eq!(round, 1);
    assert!(accepting);
}

#[tokio::test]
async fn second_start_is_rejected_and_keeps_session() {
    let repo = MemoryRepository::with_questions(&[("사과", "과일")]);
    let gateway = RecordingGateway::new();
    let engine = engine(&repo, &gateway);

    engine.start(CHAT, 3, None).await.unwrap();
    let result = engine.start(CHAT, 5, Some("과일".into())).await;

    assert!(matches!(result, Err(QuizError::AlreadyInProgress)));
    let (round, requested) = engine
        .sessions()
        .get(CHAT, |s| (s.rounds_completed, s.rounds_requested))
        .unwrap();
    assert_eq!(round, 1);
    assert_eq!(requested, 3);
}

#[tokio::test]
async fn sessions_are_isolated_per_room() {
    let repo = MemoryRepository::with_questions(&[("사과", "과일")]);
    let gateway = RecordingGateway::new();
    let engine = engine(&repo, &gateway);

    engine.start(CHAT, 1, None).await.unwrap();
    engine.start(CHAT + 1, 1, None).await.unwrap();
    engine.stop(CHAT + 1).await.unwrap();

    assert!(engine.sessions().contains(CHAT));
    assert!(!engine.sessions().contains(CHAT + 1));
}

#[tokio::test]
async fn empty_category_aborts_and_clears_session() {
    let repo = MemoryRepository::with_questions(&[("사과", "과일")]);
    let gateway = RecordingGateway::new();
    let router = router(&repo, &gateway);

    router.handle(message(1, 10, "철수", "/퀴즈 3 @영화")).await;

    assert!(router.engine().sessions().is_empty());
    assert_eq!(gateway.last().unwrap(), QuizError::EmptyQuestionBank.chat_message());
}

#[tokio::test]
async fn wrong_answer_is_ignored() {
    let repo = MemoryRepository::with_questions(&[("사과", "과일")]);
    let gateway = RecordingGateway::new();
    let engine = engine(&repo, &gateway);

    engine.start(CHAT, 1, None).await.unwrap();

    assert!(!engine.on_message(&message(2, 10, "철수", "수박")).await.unwrap());
    // Exact match only
    assert!(!engine.on_message(&message(3, 10, "철수", "사과 ")).await.unwrap());
    assert!(engine.sessions().get(CHAT, |s| s.accepting).unwrap());
    assert_eq!(repo.upserts(), 0);
}

#[tokio::test]
async fn concurrent_correct_answers_score_once() {
    let repo = MemoryRepository::with_questions(&[("사과", "과일")]);
    let gateway = RecordingGateway::new();
    let engine = engine(&repo, &gateway);

    engine.start(CHAT, 1, None).await.unwrap();

    let first = message(2, 10, "철수", "사과");
    let second = message(3, 20, "영희", "사과");
    let (a, b) = tokio::join!(engine.on_message(&first), engine.on_message(&second));

    assert!(a.unwrap());
    assert!(!b.unwrap());
    assert_eq!(repo.upserts(), 1);
    assert_eq!(repo.player(10, CHAT).unwrap().scores.get("과일"), 1);
    assert!(repo.player(20, CHAT).is_none());
}

#[tokio::test]
async fn answer_is_acknowledged_as_reply() {
    let repo = MemoryRepository::with_questions(&[("사과", "과일")]);
    let gateway = RecordingGateway::new();
    let engine = engine(&repo, &gateway);

    engine.start(CHAT, 2, None).await.unwrap();
    engine.on_message(&message(77, 10, "철수", "사과")).await.unwrap();

    let ack = gateway
        .sent()
        .into_iter()
        .find(|m| m.text.contains("정답!"))
        .unwrap();
    assert_eq!(ack.options.reply_to, Some(77));
}

#[tokio::test]
async fn full_session_scores_and_ranks_single_winner() {
    let repo = MemoryRepository::with_questions(&[("사과", "과일")]);
    let gateway = RecordingGateway::new();
    let engine = engine(&repo, &gateway);

    engine.start(CHAT, 2, None).await.unwrap();
    assert!(engine.on_message(&message(2, 10, "철수", "사과")).await.unwrap());
    assert_eq!(engine.sessions().get(CHAT, |s| s.rounds_completed), Some(2));
    assert!(engine.on_message(&message(3, 10, "철수", "사과")).await.unwrap());

    let record = repo.player(10, CHAT).unwrap();
    assert_eq!(record.scores.get("과일"), 2);
    assert!(engine.sessions().is_empty());

    let summary = gateway.last().unwrap();
    assert!(summary.starts_with("퀴즈 끝!"));
    assert!(summary.contains("1. [뉴비] 철수 - 2문제"));
}

#[tokio::test]
async fn summary_orders_by_round_wins() {
    let repo = MemoryRepository::with_questions(&[("사과", "과일")]);
    let gateway = RecordingGateway::new();
    let engine = engine(&repo, &gateway);

    engine.start(CHAT, 3, None).await.unwrap();
    engine.on_message(&message(2, 10, "철수", "사과")).await.unwrap();
    engine.on_message(&message(3, 20, "영희", "사과")).await.unwrap();
    engine.on_message(&message(4, 20, "영희", "사과")).await.unwrap();

    let summary = gateway.last().unwrap();
    assert_eq!(summary, "퀴즈 끝! 최종 순위\n1. [뉴비] 영희 - 2문제\n2. [뉴비] 철수 - 1문제");
}

#[tokio::test]
async fn failed_score_write_keeps_round_closed() {
    let repo = MemoryRepository::with_questions(&[("사과", "과일")]);
    let gateway = RecordingGateway::new();
    let engine = engine(&repo, &gateway);

    engine.start(CHAT, 2, None).await.unwrap();
    repo.fail_writes(true);

    assert!(engine.on_message(&message(2, 10, "철수", "사과")).await.unwrap());
    assert!(gateway.texts().contains(&"어라..?".to_string()));
    // The session moved on to the next round regardless
    assert_eq!(engine.sessions().get(CHAT, |s| s.rounds_completed), Some(2));
}

#[tokio::test]
async fn stop_removes_session_and_reveals_answer() {
    let repo = MemoryRepository::with_questions(&[("사과", "과일")]);
    let gateway = RecordingGateway::new();
    let engine = engine(&repo, &gateway);

    engine.start(CHAT, 2, None).await.unwrap();
    engine.stop(CHAT).await.unwrap();

    assert!(engine.sessions().is_empty());
    assert_eq!(gateway.last().unwrap(), "퀴즈를 중지했어요. 정답은 \"사과\"였어요.");
    assert!(matches!(engine.stop(CHAT).await, Err(QuizError::NotRunning)));
    assert!(!engine.on_message(&message(2, 10, "철수", "사과")).await.unwrap());
}

#[tokio::test]
async fn stale_round_timeout_does_nothing() {
    let repo = MemoryRepository::with_questions(&[("사과", "과일")]);
    let gateway = RecordingGateway::new();
    let engine = engine(&repo, &gateway);

    engine.start(CHAT, 2, None).await.unwrap();
    let stale = engine.sessions().get(CHAT, |s| s.generation).unwrap();
    engine.on_message(&message(2, 10, "철수", "사과")).await.unwrap();

    let sent = gateway.count();
    let writes = repo.upserts();
    engine.on_round_timeout(CHAT, stale).await.unwrap();
    engine.on_hint_timer(CHAT, stale).await.unwrap();

    assert_eq!(gateway.count(), sent);
    assert_eq!(repo.upserts(), writes);
    assert_eq!(engine.sessions().get(CHAT, |s| s.rounds_completed), Some(2));
}

#[tokio::test]
async fn timeout_after_stop_does_nothing() {
    let repo = MemoryRepository::with_questions(&[("사과", "과일")]);
    let gateway = RecordingGateway::new();
    let engine = engine(&repo, &gateway);

    engine.start(CHAT, 2, None).await.unwrap();
    let generation = engine.sessions().get(CHAT, |s| s.generation).unwrap();
    engine.stop(CHAT).await.unwrap();

    let sent = gateway.count();
    engine.on_round_timeout(CHAT, generation).await.unwrap();
    assert_eq!(gateway.count(), sent);
}

#[tokio::test]
async fn bank_emptied_between_rounds_ends_session() {
    let repo = MemoryRepository::with_questions(&[("사과", "과일")]);
    let gateway = RecordingGateway::new();
    let router = router(&repo, &gateway);

    router.handle(message(1, 10, "철수", "/퀴즈 2")).await;
    let removed = repo
        .delete_question(&QuizQuestion::new("사과", "과일"))
        .await
        .unwrap();
    assert!(removed);

    router.handle(message(2, 10, "철수", "사과")).await;

    let texts = gateway.texts();
    assert!(texts.contains(&"철수님 정답! \"사과\"".to_string()));
    assert_eq!(texts.last().unwrap(), "낼 문제가 없어서 퀴즈를 끝낼게요.");
    assert!(router.engine().sessions().is_empty());
    assert_eq!(repo.player(10, CHAT).unwrap().scores.get("과일"), 1);
}

#[tokio::test]
async fn stop_while_picking_question_stays_silent() {
    let repo = MemoryRepository::with_questions(&[]);
    let gateway = RecordingGateway::new();
    let engine = engine(&repo, &gateway);

    // The question lookup suspends, so the stop lands in between
    let (started, stopped) = tokio::join!(engine.start(CHAT, 2, None), engine.stop(CHAT));

    assert!(started.is_ok());
    assert!(stopped.is_ok());
    assert_eq!(gateway.texts(), vec!["퀴즈를 중지했어요."]);
    assert!(engine.sessions().is_empty());
}

#[tokio::test]
async fn stop_while_failing_lookup_stays_silent() {
    let repo = MemoryRepository::with_questions(&[("사과", "과일")]);
    repo.fail_reads(true);
    let gateway = RecordingGateway::new();
    let engine = engine(&repo, &gateway);

    let (started, stopped) = tokio::join!(engine.start(CHAT, 2, None), engine.stop(CHAT));

    assert!(started.is_ok());
    assert!(stopped.is_ok());
    assert_eq!(gateway.count(), 1);
}

#[tokio::test]
async fn failing_lookup_on_start_aborts() {
    let repo = MemoryRepository::with_questions(&[("사과", "과일")]);
    repo.fail_reads(true);
    let gateway = RecordingGateway::new();
    let engine = engine(&repo, &gateway);

    let result = engine.start(CHAT, 2, None).await;

    assert!(matches!(result, Err(QuizError::Repository(_))));
    assert!(engine.sessions().is_empty());
}

#[tokio::test(start_paused = true)]
async fn failing_lookup_after_timeout_is_reported_and_aborts() {
    let repo = MemoryRepository::with_questions(&[("사과", "과일")]);
    let gateway = RecordingGateway::new();
    let engine = engine(&repo, &gateway);

    engine.start(CHAT, 2, None).await.unwrap();
    repo.fail_reads(true);
    tokio::time::sleep(Duration::from_secs(181)).await;

    let texts = gateway.texts();
    assert!(texts.contains(&"시간 초과! 정답은 \"사과\"였어요.".to_string()));
    assert_eq!(texts.last().unwrap(), "어라..?");
    assert!(engine.sessions().is_empty());

    // The timer task survived the failure and the room can play again
    repo.fail_reads(false);
    engine.start(CHAT, 1, None).await.unwrap();
    assert_eq!(gateway.last().unwrap(), "[1/1] 과일 문제: ㅅㄱ");

    tokio::time::sleep(Duration::from_secs(181)).await;
    assert_eq!(gateway.last().unwrap(), "퀴즈 끝! 이번에는 맞힌 사람이 없어요.");
}

#[tokio::test(start_paused = true)]
async fn hint_timer_reveals_one_letter() {
    let repo = MemoryRepository::with_questions(&[("사과나무", "식물")]);
    let gateway = RecordingGateway::new();
    let engine = engine(&repo, &gateway);

    engine.start(CHAT, 1, None).await.unwrap();
    tokio::time::sleep(Duration::from_secs(61)).await;

    let texts = gateway.texts();
    assert_eq!(texts.len(), 2);
    assert!(texts[1].starts_with("힌트: "));
    assert_eq!(engine.sessions().get(CHAT, |s| s.revealed_positions.len()), Some(1));
}

#[tokio::test(start_paused = true)]
async fn manual_hint_respects_cooldown() {
    let repo = MemoryRepository::with_questions(&[("사과나무", "식물")]);
    let gateway = RecordingGateway::new();
    let engine = engine(&repo, &gateway);

    engine.start(CHAT, 1, None).await.unwrap();

    let early = engine.request_hint(CHAT).await;
    assert!(matches!(early, Err(QuizError::TooEarly(d)) if d <= Duration::from_secs(30)));

    tokio::time::sleep(Duration::from_secs(31)).await;
    engine.request_hint(CHAT).await.unwrap();
    assert_eq!(engine.sessions().get(CHAT, |s| s.revealed_positions.len()), Some(1));

    assert!(matches!(
        engine.request_hint(CHAT).await,
        Err(QuizError::TooEarly(_))
    ));
}

#[tokio::test(start_paused = true)]
async fn hint_timer_skips_when_manual_hint_was_recent() {
    let repo = MemoryRepository::with_questions(&[("사과나무", "식물")]);
    let gateway = RecordingGateway::new();
    let engine = engine(&repo, &gateway);

    engine.start(CHAT, 1, None).await.unwrap();
    tokio::time::sleep(Duration::from_secs(45)).await;
    engine.request_hint(CHAT).await.unwrap();

    // Timer fires at 60s, 15s after the manual hint
    tokio::time::sleep(Duration::from_secs(20)).await;

    assert_eq!(gateway.count(), 2);
    assert_eq!(engine.sessions().get(CHAT, |s| s.revealed_positions.len()), Some(1));
}

#[tokio::test(start_paused = true)]
async fn round_timeout_announces_answer_and_moves_on() {
    let repo = MemoryRepository::with_questions(&[("사과", "과일")]);
    let gateway = RecordingGateway::new();
    let engine = engine(&repo, &gateway);

    engine.start(CHAT, 2, None).await.unwrap();
    tokio::time::sleep(Duration::from_secs(181)).await;

    let texts = gateway.texts();
    assert!(texts.contains(&"시간 초과! 정답은 \"사과\"였어요.".to_string()));
    assert_eq!(texts.last().unwrap(), "[2/2] 과일 문제: ㅅㄱ");
    let (round, winners) = engine
        .sessions()
        .get(CHAT, |s| (s.rounds_completed, s.round_winners.len()))
        .unwrap();
    assert_eq!(round, 2);
    assert_eq!(winners, 0);
    assert_eq!(repo.upserts(), 0);
}

#[tokio::test(start_paused = true)]
async fn session_without_winners_ends_after_timeouts() {
    let repo = MemoryRepository::with_questions(&[("사과", "과일")]);
    let gateway = RecordingGateway::new();
    let engine = engine(&repo, &gateway);

    engine.start(CHAT, 1, None).await.unwrap();
    tokio::time::sleep(Duration::from_secs(181)).await;

    assert!(engine.sessions().is_empty());
    assert_eq!(gateway.last().unwrap(), "퀴즈 끝! 이번에는 맞힌 사람이 없어요.");
}

#[tokio::test(start_paused = true)]
async fn answered_round_cancels_its_timeout() {
    let repo = MemoryRepository::with_questions(&[("사과", "과일")]);
    let gateway = RecordingGateway::new();
    let engine = engine(&repo, &gateway);

    engine.start(CHAT, 1, None).await.unwrap();
    engine.on_message(&message(2, 10, "철수", "사과")).await.unwrap();
    let sent = gateway.count();

    tokio::time::sleep(Duration::from_secs(200)).await;
    assert_eq!(gateway.count(), sent);
}

#[test]
fn tally_groups_wins_by_user() {
    let winner = |user_id, name: &str| RoundWinner {
        user_id,
        display_name: name.to_string(),
    };
    let winners = vec![
        winner(1, "철수"),
        winner(2, "영희"),
        winner(2, "영희"),
        winner(3, "민수"),
        winner(1, "철수"),
    ];

    let standings = tally_winners(&winners);
    let summary: Vec<(i64, u32)> = standings.iter().map(|s| (s.user_id, s.wins)).collect();

    assert_eq!(summary, vec![(1, 2), (2, 2), (3, 1)]);
    assert_eq!(
        standings[2],
        Standing {
            user_id: 3,
            display_name: "민수".into(),
            wins: 1
        }
    );
}
