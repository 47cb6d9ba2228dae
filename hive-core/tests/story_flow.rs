//! End-to-end story scenarios over a scripted narrator and moderator.

use hive_core::testing::{
    assert_last_turn, assert_no_errors, assert_roles, assert_strictly_ordered, TestHarness,
};
use hive_core::{Action, NoticeLevel, Role, StoryStore, SubmitOutcome, TurnState};

#[tokio::test]
async fn test_empty_store_is_seeded_once() {
    let harness = TestHarness::new();

    let update = harness.refresh().await;
    assert_no_errors(&update);
    assert_roles(&update.turns, &[Role::Assistant]);
    assert_eq!(update.turns[0].content, harness.session.narrator().persona().seed);
    assert_eq!(update.state(), TurnState::WaitingForUser);

    // A second refresh sees the seed and does nothing.
    let update = harness.refresh().await;
    assert_eq!(update.turns.len(), 1);
    assert_eq!(harness.narrator.calls(), 0);
}

#[tokio::test]
async fn test_player_turn_gets_a_narrator_reply() {
    let harness = TestHarness::new();
    harness.refresh().await;
    harness
        .expect_verdict("PASS")
        .expect_reply("The snail accepts the noodles with trembling antennae.");

    let update = harness
        .session
        .handle(Action::Submit("hello".to_string()))
        .await;

    assert_no_errors(&update);
    assert_eq!(update.outcome, Some(SubmitOutcome::Accepted));
    assert_roles(&update.turns, &[Role::Assistant, Role::User, Role::Assistant]);
    assert_last_turn(
        &update.turns,
        Role::Assistant,
        "The snail accepts the noodles with trembling antennae.",
    );
    assert_strictly_ordered(&update.turns);

    // The narrator saw exactly the seed and the player's turn.
    let prompts = harness.narrator.prompts();
    assert_eq!(prompts.len(), 1);
    let seed = &update.turns[0].content;
    assert!(prompts[0].contains(&format!("assistant: {seed}\nuser: hello")));
}

#[tokio::test]
async fn test_blocked_submission_leaves_store_untouched() {
    let harness = TestHarness::new();
    harness.refresh().await;
    harness.expect_verdict("BLOCK");

    let update = harness.submit("something nasty").await;

    assert_eq!(
        update.outcome,
        Some(SubmitOutcome::Blocked {
            draft: "something nasty".to_string()
        })
    );
    assert_eq!(update.notices.len(), 1);
    assert_eq!(update.notices[0].level, NoticeLevel::Warning);
    assert_roles(&update.turns, &[Role::Assistant]);
    assert_eq!(harness.turns().await.len(), 1);
    assert_eq!(harness.narrator.calls(), 0);
}

#[tokio::test]
async fn test_moderation_outage_fails_open() {
    let harness = TestHarness::new();
    harness.refresh().await;
    harness
        .expect_moderator_failure("quota exceeded")
        .expect_reply("The snail shrugs.");

    let update = harness.submit("hello").await;

    assert_eq!(update.outcome, Some(SubmitOutcome::Accepted));
    assert_roles(&update.turns, &[Role::Assistant, Role::User, Role::Assistant]);
}

#[tokio::test]
async fn test_provider_refusal_blocks_submission() {
    let harness = TestHarness::new();
    harness.refresh().await;
    harness.expect_moderator_refusal("SAFETY");

    let update = harness.submit("something the provider refuses").await;

    assert_eq!(
        update.outcome,
        Some(SubmitOutcome::Blocked {
            draft: "something the provider refuses".to_string()
        })
    );
    assert_eq!(harness.turns().await.len(), 1);
    assert_eq!(harness.narrator.calls(), 0);
}

#[tokio::test]
async fn test_narrator_outage_keeps_player_turn() {
    let harness = TestHarness::new();
    harness.refresh().await;
    harness
        .expect_verdict("PASS")
        .expect_narrator_failure("503 Service Unavailable");

    let update = harness.submit("hello").await;

    assert!(update.has_errors());
    assert_eq!(update.outcome, Some(SubmitOutcome::Accepted));
    assert_last_turn(&update.turns, Role::User, "hello");
    assert_eq!(update.state(), TurnState::WaitingForAi);

    // A later refresh retries the narration.
    harness.expect_reply("Back online, still hungry.");
    let update = harness.refresh().await;
    assert_no_errors(&update);
    assert_last_turn(&update.turns, Role::Assistant, "Back online, still hungry.");
}

#[tokio::test]
async fn test_blank_narrator_reply_appends_nothing() {
    let harness = TestHarness::new();
    harness.refresh().await;
    harness.expect_verdict("PASS").expect_reply("   ");

    let update = harness.submit("hello").await;

    assert!(update.has_errors());
    assert_last_turn(&update.turns, Role::User, "hello");
}

#[tokio::test]
async fn test_racing_empty_reads_at_most_double_seed() {
    let harness = TestHarness::new();
    // Both passes of two refreshes see an empty log.
    harness.store.report_empty_for(5);

    let first = harness.refresh().await;
    let second = harness.refresh().await;
    assert_no_errors(&first);
    assert_no_errors(&second);

    let turns = harness.turns().await;
    assert!(!turns.is_empty() && turns.len() <= 2);
    assert!(turns.iter().all(|t| t.is_assistant()));
}

#[tokio::test]
async fn test_store_outage_is_reported_not_raised() {
    let harness = TestHarness::new();
    harness.store.fail_loads(true);
    harness.store.fail_appends(true);

    let update = harness.session.handle(Action::Refresh).await;
    assert!(update.turns.is_empty());
    assert!(!update.notices.is_empty());

    harness.expect_verdict("PASS");
    let update = harness.submit("hello").await;
    assert_eq!(
        update.outcome,
        Some(SubmitOutcome::Unsaved {
            draft: "hello".to_string()
        })
    );
}

#[tokio::test]
async fn test_trailing_assistant_turns_wait_for_player() {
    let harness = TestHarness::new();
    harness.store.inner().append(Role::Assistant, "one").await.unwrap();
    harness.store.inner().append(Role::Assistant, "two").await.unwrap();

    let update = harness.refresh().await;
    assert_eq!(update.state(), TurnState::WaitingForUser);
    assert_eq!(update.turns.len(), 2);
    assert_eq!(harness.narrator.calls(), 0);
}
