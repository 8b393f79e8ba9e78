//! Shared fixtures for mqe-server integration tests

#![allow(dead_code)]

use chrono::{Days, NaiveDate};
use mqe_common::events::EventBus;
use mqe_server::models::{
    ContributionEntry, EmotionalEntry, NewMeeting, PhasePayload, TaskEvaluationEntry, TaskPlan,
    UnderstandingContribution,
};
use mqe_server::{MeetingEngine, SessionContext};
use tempfile::TempDir;
use uuid::Uuid;

/// Engine over a fresh on-disk database; keep `_dir` alive for the test
pub struct TestEnv {
    pub engine: MeetingEngine,
    pub event_bus: EventBus,
    pub _dir: TempDir,
}

pub async fn test_env() -> TestEnv {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let pool = mqe_common::db::init_database(&dir.path().join("mqe.db"))
        .await
        .expect("Failed to initialize database");
    let event_bus = EventBus::new(100);
    TestEnv {
        engine: MeetingEngine::new(pool, event_bus.clone()),
        event_bus,
        _dir: dir,
    }
}

pub async fn user(engine: &MeetingEngine, name: &str) -> SessionContext {
    let user = engine.create_user(name).await.expect("user creation");
    SessionContext::new(user.id)
}

/// Creator plus two participants: returns (meeting_id, creator, p2, p3)
pub async fn three_person_meeting(
    engine: &MeetingEngine,
) -> (Uuid, SessionContext, SessionContext, SessionContext) {
    let creator = user(engine, "creator").await;
    let p2 = user(engine, "p2").await;
    let p3 = user(engine, "p3").await;
    let detail = engine
        .create_meeting(
            &creator,
            NewMeeting {
                title: "Sprint retro".to_string(),
                question: "How did the sprint go?".to_string(),
                participant_ids: vec![p2.user_id, p3.user_id],
            },
        )
        .await
        .expect("meeting creation");
    (detail.meeting.id, creator, p2, p3)
}

pub fn emotional(entries: &[(Uuid, f64)]) -> PhasePayload {
    PhasePayload::EmotionalEvaluation(
        entries
            .iter()
            .map(|(id, scale)| EmotionalEntry {
                target_participant_id: *id,
                emotional_scale: *scale,
                is_toxic: false,
            })
            .collect(),
    )
}

pub fn understanding(score: f64, split: &[(Uuid, f64)]) -> PhasePayload {
    PhasePayload::UnderstandingContribution(UnderstandingContribution {
        understanding_score: score,
        contributions: split
            .iter()
            .map(|(id, pct)| ContributionEntry {
                participant_id: *id,
                contribution_percentage: *pct,
            })
            .collect(),
    })
}

pub fn next_week() -> NaiveDate {
    mqe_common::time::today() + Days::new(7)
}

pub fn plan(description: &str, expected: f64) -> PhasePayload {
    PhasePayload::TaskPlanning(TaskPlan {
        task_description: description.to_string(),
        common_question: String::new(),
        deadline: next_week(),
        expected_contribution_percentage: expected,
        emotional_scale: 70.0,
    })
}

pub fn evaluation(entries: &[(Uuid, f64)]) -> PhasePayload {
    PhasePayload::TaskEvaluation(
        entries
            .iter()
            .map(|(id, score)| TaskEvaluationEntry {
                task_author_id: *id,
                importance_score: *score,
            })
            .collect(),
    )
}

/// Advance `steps` times as `creator`
pub async fn advance(engine: &MeetingEngine, creator: &SessionContext, meeting_id: Uuid, steps: usize) {
    for _ in 0..steps {
        engine
            .advance_phase(creator, meeting_id)
            .await
            .expect("advance as creator");
    }
}
