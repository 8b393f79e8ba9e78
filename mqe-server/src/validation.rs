//! Validation Engine
//!
//! Pure structural checks on a submission payload. Nothing here touches
//! storage: the caller snapshots the roster (and, for task evaluation, the
//! tasks the submitter may see) and validates before any write.

use std::collections::{BTreeSet, HashSet};

use chrono::NaiveDate;
use uuid::Uuid;

use crate::error::ValidationError;
use crate::models::{
    EmotionalEntry, PhasePayload, Task, TaskEvaluationEntry, TaskPlan, UnderstandingContribution,
};

/// Contribution percentages must sum to 100 within this tolerance
pub const CONTRIBUTION_SUM_TOLERANCE: f64 = 0.1;

const PERCENT_RANGE: (f64, f64) = (0.0, 100.0);
const EMOTIONAL_RANGE: (f64, f64) = (-100.0, 100.0);

/// Meeting state a submission is validated against
#[derive(Debug, Clone)]
pub struct RosterSnapshot {
    /// Roster order, submitter included
    pub participant_ids: Vec<Uuid>,
    /// Authors of the tasks the submitter may evaluate
    pub evaluable_task_authors: BTreeSet<Uuid>,
}

impl RosterSnapshot {
    /// Snapshot for `viewer_id`, applying the task visibility rule
    pub fn new(participant_ids: Vec<Uuid>, creator_id: Uuid, viewer_id: Uuid, tasks: &[Task]) -> Self {
        let evaluable_task_authors = tasks
            .iter()
            .filter(|task| task.is_evaluable_by(viewer_id, creator_id))
            .map(|task| task.author_id)
            .collect();

        Self {
            participant_ids,
            evaluable_task_authors,
        }
    }

    fn contains(&self, user_id: Uuid) -> bool {
        self.participant_ids.contains(&user_id)
    }

    /// Everyone except `submitter`, in roster order
    fn peers_of(&self, submitter: Uuid) -> impl Iterator<Item = Uuid> + '_ {
        self.participant_ids
            .iter()
            .copied()
            .filter(move |id| *id != submitter)
    }
}

/// Validate `payload` as submitted by `submitter` on `today`
pub fn validate(
    payload: &PhasePayload,
    submitter: Uuid,
    roster: &RosterSnapshot,
    today: NaiveDate,
) -> Result<(), ValidationError> {
    match payload {
        PhasePayload::EmotionalEvaluation(entries) => {
            validate_emotional(entries, submitter, roster)
        }
        PhasePayload::UnderstandingContribution(data) => {
            validate_understanding(data, submitter, roster)
        }
        PhasePayload::TaskPlanning(plan) => validate_task_plan(plan, today),
        PhasePayload::TaskEvaluation(entries) => {
            validate_task_evaluation(entries, submitter, roster)
        }
    }
}

fn check_range(field: &'static str, value: f64, (min, max): (f64, f64)) -> Result<(), ValidationError> {
    if (min..=max).contains(&value) {
        Ok(())
    } else {
        Err(ValidationError::ScoreOutOfRange {
            field,
            value,
            min,
            max,
        })
    }
}

/// Self, unknown and duplicate checks shared by the per-peer phases
fn check_peer(
    target: Uuid,
    submitter: Uuid,
    roster: &RosterSnapshot,
    seen: &mut HashSet<Uuid>,
) -> Result<(), ValidationError> {
    if target == submitter {
        return Err(ValidationError::SelfEvaluationNotAllowed);
    }
    if !roster.contains(target) {
        return Err(ValidationError::UnknownParticipant(target));
    }
    if !seen.insert(target) {
        return Err(ValidationError::DuplicateParticipant(target));
    }
    Ok(())
}

fn validate_emotional(
    entries: &[EmotionalEntry],
    submitter: Uuid,
    roster: &RosterSnapshot,
) -> Result<(), ValidationError> {
    let mut seen = HashSet::new();
    for entry in entries {
        check_range("emotional_scale", entry.emotional_scale, EMOTIONAL_RANGE)?;
        check_peer(entry.target_participant_id, submitter, roster, &mut seen)?;
    }

    let missing: Vec<Uuid> = roster
        .peers_of(submitter)
        .filter(|id| !seen.contains(id))
        .collect();
    if !missing.is_empty() {
        return Err(ValidationError::IncompleteEvaluationSet { missing });
    }
    Ok(())
}

fn validate_understanding(
    data: &UnderstandingContribution,
    submitter: Uuid,
    roster: &RosterSnapshot,
) -> Result<(), ValidationError> {
    check_range("understanding_score", data.understanding_score, PERCENT_RANGE)?;

    let mut seen = HashSet::new();
    for entry in &data.contributions {
        check_range(
            "contribution_percentage",
            entry.contribution_percentage,
            PERCENT_RANGE,
        )?;
        check_peer(entry.participant_id, submitter, roster, &mut seen)?;
    }

    let missing: Vec<Uuid> = roster
        .peers_of(submitter)
        .filter(|id| !seen.contains(id))
        .collect();
    if !missing.is_empty() {
        return Err(ValidationError::IncompleteContributionSet(format!(
            "no contribution listed for {} participant(s): {:?}",
            missing.len(),
            missing
        )));
    }

    // Solo meeting: nobody to attribute contributions to
    if seen.is_empty() {
        return Ok(());
    }

    let sum: f64 = data
        .contributions
        .iter()
        .map(|entry| entry.contribution_percentage)
        .sum();
    if (sum - 100.0).abs() >= CONTRIBUTION_SUM_TOLERANCE {
        return Err(ValidationError::IncompleteContributionSet(format!(
            "contributions sum to {}, expected 100",
            sum
        )));
    }
    Ok(())
}

/// Shared by task planning and author edits
pub fn validate_description(description: &str) -> Result<(), ValidationError> {
    if description.trim().is_empty() {
        return Err(ValidationError::MissingField("task_description"));
    }
    Ok(())
}

/// Deadlines may be today or later
pub fn validate_deadline(deadline: NaiveDate, today: NaiveDate) -> Result<(), ValidationError> {
    if deadline < today {
        return Err(ValidationError::InvalidDeadline { deadline, today });
    }
    Ok(())
}

fn validate_task_plan(plan: &TaskPlan, today: NaiveDate) -> Result<(), ValidationError> {
    validate_description(&plan.task_description)?;
    validate_deadline(plan.deadline, today)?;
    check_range(
        "expected_contribution_percentage",
        plan.expected_contribution_percentage,
        PERCENT_RANGE,
    )?;
    check_range("emotional_scale", plan.emotional_scale, PERCENT_RANGE)?;
    Ok(())
}

fn validate_task_evaluation(
    entries: &[TaskEvaluationEntry],
    submitter: Uuid,
    roster: &RosterSnapshot,
) -> Result<(), ValidationError> {
    let mut seen = HashSet::new();
    for entry in entries {
        if entry.task_author_id == submitter {
            return Err(ValidationError::SelfEvaluationNotAllowed);
        }
        check_range("importance_score", entry.importance_score, PERCENT_RANGE)?;
        if !roster.evaluable_task_authors.contains(&entry.task_author_id) {
            return Err(ValidationError::TaskNotEvaluable(entry.task_author_id));
        }
        if !seen.insert(entry.task_author_id) {
            return Err(ValidationError::DuplicateParticipant(entry.task_author_id));
        }
    }

    let missing: Vec<Uuid> = roster
        .evaluable_task_authors
        .iter()
        .copied()
        .filter(|id| !seen.contains(id))
        .collect();
    if !missing.is_empty() {
        return Err(ValidationError::IncompleteEvaluationSet { missing });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ContributionEntry;
    use chrono::Utc;

    struct Fixture {
        a: Uuid,
        b: Uuid,
        c: Uuid,
        roster: RosterSnapshot,
        today: NaiveDate,
    }

    fn fixture() -> Fixture {
        let (a, b, c) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());
        Fixture {
            a,
            b,
            c,
            roster: RosterSnapshot {
                participant_ids: vec![a, b, c],
                evaluable_task_authors: [b, c].into_iter().collect(),
            },
            today: NaiveDate::from_ymd_opt(2026, 10, 17).unwrap(),
        }
    }

    fn understanding(score: f64, split: &[(Uuid, f64)]) -> PhasePayload {
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

    fn emotional(entries: &[(Uuid, f64)]) -> PhasePayload {
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

    fn plan(description: &str, deadline: NaiveDate) -> PhasePayload {
        PhasePayload::TaskPlanning(TaskPlan {
            task_description: description.to_string(),
            common_question: String::new(),
            deadline,
            expected_contribution_percentage: 40.0,
            emotional_scale: 60.0,
        })
    }

    fn evaluation(entries: &[(Uuid, f64)]) -> PhasePayload {
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

    #[test]
    fn test_contributions_summing_to_100_accepted() {
        let f = fixture();
        let payload = understanding(70.0, &[(f.b, 40.0), (f.c, 60.0)]);
        assert_eq!(validate(&payload, f.a, &f.roster, f.today), Ok(()));
    }

    #[test]
    fn test_contribution_sum_tolerance() {
        let f = fixture();
        let close = understanding(70.0, &[(f.b, 33.33), (f.c, 66.7)]);
        assert_eq!(validate(&close, f.a, &f.roster, f.today), Ok(()));

        let off = understanding(70.0, &[(f.b, 40.0), (f.c, 55.0)]);
        assert!(matches!(
            validate(&off, f.a, &f.roster, f.today),
            Err(ValidationError::IncompleteContributionSet(_))
        ));

        let over = understanding(70.0, &[(f.b, 40.0), (f.c, 60.25)]);
        assert!(validate(&over, f.a, &f.roster, f.today).is_err());
    }

    #[test]
    fn test_contribution_omitting_peer_rejected() {
        let f = fixture();
        let payload = understanding(70.0, &[(f.b, 100.0)]);
        assert!(matches!(
            validate(&payload, f.a, &f.roster, f.today),
            Err(ValidationError::IncompleteContributionSet(_))
        ));
    }

    #[test]
    fn test_contribution_duplicates_and_self() {
        let f = fixture();
        let dup = understanding(70.0, &[(f.b, 50.0), (f.b, 50.0)]);
        assert_eq!(
            validate(&dup, f.a, &f.roster, f.today),
            Err(ValidationError::DuplicateParticipant(f.b))
        );

        let own = understanding(70.0, &[(f.a, 50.0), (f.b, 25.0), (f.c, 25.0)]);
        assert_eq!(
            validate(&own, f.a, &f.roster, f.today),
            Err(ValidationError::SelfEvaluationNotAllowed)
        );

        let stranger = Uuid::new_v4();
        let unknown = understanding(70.0, &[(stranger, 50.0), (f.b, 25.0), (f.c, 25.0)]);
        assert_eq!(
            validate(&unknown, f.a, &f.roster, f.today),
            Err(ValidationError::UnknownParticipant(stranger))
        );
    }

    #[test]
    fn test_understanding_score_range() {
        let f = fixture();
        let payload = understanding(101.0, &[(f.b, 50.0), (f.c, 50.0)]);
        assert!(matches!(
            validate(&payload, f.a, &f.roster, f.today),
            Err(ValidationError::ScoreOutOfRange { field: "understanding_score", .. })
        ));
    }

    #[test]
    fn test_solo_meeting_accepts_empty_contributions() {
        let solo = Uuid::new_v4();
        let roster = RosterSnapshot {
            participant_ids: vec![solo],
            evaluable_task_authors: BTreeSet::new(),
        };
        let payload = understanding(90.0, &[]);
        assert_eq!(validate(&payload, solo, &roster, Utc::now().date_naive()), Ok(()));
    }

    #[test]
    fn test_emotional_requires_every_peer() {
        let f = fixture();
        assert_eq!(
            validate(&emotional(&[(f.b, 10.0), (f.c, -80.0)]), f.a, &f.roster, f.today),
            Ok(())
        );

        assert_eq!(
            validate(&emotional(&[(f.b, 10.0)]), f.a, &f.roster, f.today),
            Err(ValidationError::IncompleteEvaluationSet { missing: vec![f.c] })
        );
    }

    #[test]
    fn test_emotional_scale_bounds() {
        let f = fixture();
        assert_eq!(
            validate(&emotional(&[(f.b, -100.0), (f.c, 100.0)]), f.a, &f.roster, f.today),
            Ok(())
        );
        assert!(matches!(
            validate(&emotional(&[(f.b, -100.5), (f.c, 0.0)]), f.a, &f.roster, f.today),
            Err(ValidationError::ScoreOutOfRange { field: "emotional_scale", .. })
        ));
    }

    #[test]
    fn test_emotional_self_entry_rejected() {
        let f = fixture();
        assert_eq!(
            validate(&emotional(&[(f.a, 0.0), (f.b, 0.0), (f.c, 0.0)]), f.a, &f.roster, f.today),
            Err(ValidationError::SelfEvaluationNotAllowed)
        );
    }

    #[test]
    fn test_task_plan_deadline() {
        let f = fixture();
        assert_eq!(validate(&plan("Ship it", f.today), f.a, &f.roster, f.today), Ok(()));

        let yesterday = f.today.pred_opt().unwrap();
        assert!(matches!(
            validate(&plan("Ship it", yesterday), f.a, &f.roster, f.today),
            Err(ValidationError::InvalidDeadline { .. })
        ));
    }

    #[test]
    fn test_task_plan_blank_description() {
        let f = fixture();
        assert_eq!(
            validate(&plan("   ", f.today), f.a, &f.roster, f.today),
            Err(ValidationError::MissingField("task_description"))
        );
    }

    #[test]
    fn test_task_plan_percentages() {
        let f = fixture();
        let payload = PhasePayload::TaskPlanning(TaskPlan {
            task_description: "Ship it".to_string(),
            common_question: String::new(),
            deadline: f.today,
            expected_contribution_percentage: 120.0,
            emotional_scale: 50.0,
        });
        assert!(matches!(
            validate(&payload, f.a, &f.roster, f.today),
            Err(ValidationError::ScoreOutOfRange {
                field: "expected_contribution_percentage",
                ..
            })
        ));
    }

    #[test]
    fn test_task_evaluation_rejects_own_task() {
        let f = fixture();
        let payload = evaluation(&[(f.a, 50.0), (f.b, 50.0), (f.c, 50.0)]);
        assert_eq!(
            validate(&payload, f.a, &f.roster, f.today),
            Err(ValidationError::SelfEvaluationNotAllowed)
        );
    }

    #[test]
    fn test_task_evaluation_coverage() {
        let f = fixture();
        assert_eq!(
            validate(&evaluation(&[(f.b, 80.0), (f.c, 20.0)]), f.a, &f.roster, f.today),
            Ok(())
        );
        assert_eq!(
            validate(&evaluation(&[(f.b, 80.0)]), f.a, &f.roster, f.today),
            Err(ValidationError::IncompleteEvaluationSet { missing: vec![f.c] })
        );
        assert_eq!(
            validate(&evaluation(&[(f.b, 80.0), (f.b, 70.0)]), f.a, &f.roster, f.today),
            Err(ValidationError::DuplicateParticipant(f.b))
        );
    }

    #[test]
    fn test_task_evaluation_hidden_task() {
        let f = fixture();
        let roster = RosterSnapshot {
            participant_ids: f.roster.participant_ids.clone(),
            evaluable_task_authors: [f.b].into_iter().collect(),
        };
        assert_eq!(
            validate(&evaluation(&[(f.b, 80.0), (f.c, 20.0)]), f.a, &roster, f.today),
            Err(ValidationError::TaskNotEvaluable(f.c))
        );
    }

    #[test]
    fn test_task_evaluation_score_range() {
        let f = fixture();
        assert!(matches!(
            validate(&evaluation(&[(f.b, -1.0), (f.c, 20.0)]), f.a, &f.roster, f.today),
            Err(ValidationError::ScoreOutOfRange { field: "importance_score", .. })
        ));
    }

    #[test]
    fn test_snapshot_applies_visibility_rule() {
        let creator = Uuid::new_v4();
        let author = Uuid::new_v4();
        let viewer = Uuid::new_v4();
        let task = Task {
            id: Uuid::new_v4(),
            meeting_id: Uuid::new_v4(),
            author_id: author,
            description: "Refactor".to_string(),
            common_question: String::new(),
            deadline: NaiveDate::from_ymd_opt(2030, 1, 1).unwrap(),
            expected_contribution: 10.0,
            approved: false,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        let ids = vec![creator, author, viewer];

        let for_viewer = RosterSnapshot::new(ids.clone(), creator, viewer, std::slice::from_ref(&task));
        assert!(for_viewer.evaluable_task_authors.is_empty());

        let for_creator = RosterSnapshot::new(ids, creator, creator, std::slice::from_ref(&task));
        assert!(for_creator.evaluable_task_authors.contains(&author));
    }
}
