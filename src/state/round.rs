use crate::dao::models::QuestionEntity;

/// High-level phases of the single global round.
///
/// The authoritative state lives in the question rows themselves; the phase is
/// recomputed from the most recent row every time it is read, which makes the
/// machine resilient to process restarts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoundPhase {
    /// No question has ever been created, or none survived a restart.
    Idle,
    /// One question is open and accepting submissions.
    Active,
    /// The latest question was claimed by a winner and no successor exists yet.
    Closed,
}

impl RoundPhase {
    /// Compute the phase from the most recently created question row.
    pub fn from_latest(latest: Option<&QuestionEntity>) -> Self {
        match latest {
            None => RoundPhase::Idle,
            Some(question) if question.is_active => RoundPhase::Active,
            Some(_) => RoundPhase::Closed,
        }
    }

    /// Whether the round is due for immediate regeneration. A closed question
    /// with no successor means the original regeneration timer was lost.
    pub fn needs_regeneration(self) -> bool {
        matches!(self, RoundPhase::Closed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn question(active: bool, winner: bool) -> QuestionEntity {
        let mut entity = QuestionEntity::open("5 + 3".into(), 8);
        entity.is_active = active;
        entity.winner_id = winner.then(Uuid::new_v4);
        entity
    }

    #[test]
    fn no_question_is_idle() {
        assert_eq!(RoundPhase::from_latest(None), RoundPhase::Idle);
        assert!(!RoundPhase::Idle.needs_regeneration());
    }

    #[test]
    fn open_question_is_active() {
        let q = question(true, false);
        assert_eq!(RoundPhase::from_latest(Some(&q)), RoundPhase::Active);
        assert!(!RoundPhase::Active.needs_regeneration());
    }

    #[test]
    fn claimed_question_without_successor_is_closed() {
        let q = question(false, true);
        assert_eq!(RoundPhase::from_latest(Some(&q)), RoundPhase::Closed);
        assert!(RoundPhase::Closed.needs_regeneration());
    }
}
