use crate::core::quota::QuotaKind;
use crate::error::{ActedReason, DiscoveryError};
use crate::models::{Swipe, SwipeAction};
use serde::{Deserialize, Serialize};

/// Requested swipe action
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SwipeIntent {
    Like,
    SuperLike,
    Pass,
}

impl SwipeIntent {
    pub fn is_like(&self) -> bool {
        matches!(self, SwipeIntent::Like | SwipeIntent::SuperLike)
    }
}

/// What the ledger has to do for one swipe request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// First action on the pair
    Insert { action: SwipeAction, super_like: bool },
    /// A pass revoked by a later like
    PassToLike { super_like: bool },
    /// Regular like upgraded to a superlike
    UpgradeToSuper,
    /// Same state already recorded
    NoOp,
}

impl Transition {
    /// Quota unit this transition consumes, if any
    pub fn quota_cost(&self) -> Option<QuotaKind> {
        match self {
            Transition::Insert { action: SwipeAction::Like, super_like: false }
            | Transition::PassToLike { super_like: false } => Some(QuotaKind::Likes),
            Transition::Insert { action: SwipeAction::Like, super_like: true }
            | Transition::PassToLike { super_like: true }
            | Transition::UpgradeToSuper => Some(QuotaKind::SuperLikes),
            Transition::Insert { action: SwipeAction::Pass, .. } | Transition::NoOp => None,
        }
    }

    /// True when the pair ends up liked by this transition for the first time
    pub fn creates_like(&self) -> bool {
        matches!(
            self,
            Transition::Insert { action: SwipeAction::Like, .. } | Transition::PassToLike { .. }
        )
    }

    pub fn writes(&self) -> bool {
        !matches!(self, Transition::NoOp)
    }

    /// Row as it looks after the transition, `None` for a no-op
    pub fn apply(
        &self,
        existing: Option<&Swipe>,
        actor_id: &str,
        target_id: &str,
        score: Option<f64>,
        now: chrono::DateTime<chrono::Utc>,
    ) -> Option<Swipe> {
        let base = || Swipe {
            actor_id: actor_id.to_string(),
            target_id: target_id.to_string(),
            action: SwipeAction::Like,
            is_super_like: false,
            timestamp: now,
            score,
        };

        match *self {
            Transition::Insert { action, super_like } => Some(Swipe {
                action,
                is_super_like: super_like,
                ..base()
            }),
            Transition::PassToLike { super_like } => Some(Swipe {
                is_super_like: super_like,
                score: score.or_else(|| existing.and_then(|s| s.score)),
                ..base()
            }),
            Transition::UpgradeToSuper => existing.map(|s| Swipe {
                is_super_like: true,
                timestamp: now,
                score: score.or(s.score),
                ..s.clone()
            }),
            Transition::NoOp => None,
        }
    }
}

/// Transition table for one ordered (actor → target) pair
///
/// | existing      | like          | superlike      | pass          |
/// |---------------|---------------|----------------|---------------|
/// | none          | insert like   | insert super   | insert pass   |
/// | passed        | pass → like   | pass → super   | no-op         |
/// | liked         | no-op         | upgrade        | rejected      |
/// | liked (super) | no-op         | no-op          | rejected      |
pub fn plan_transition(
    existing: Option<&Swipe>,
    intent: SwipeIntent,
) -> Result<Transition, DiscoveryError> {
    let Some(swipe) = existing else {
        return Ok(match intent {
            SwipeIntent::Like => Transition::Insert { action: SwipeAction::Like, super_like: false },
            SwipeIntent::SuperLike => Transition::Insert { action: SwipeAction::Like, super_like: true },
            SwipeIntent::Pass => Transition::Insert { action: SwipeAction::Pass, super_like: false },
        });
    };

    match (swipe.action, swipe.is_super_like, intent) {
        (SwipeAction::Pass, _, SwipeIntent::Like) => Ok(Transition::PassToLike { super_like: false }),
        (SwipeAction::Pass, _, SwipeIntent::SuperLike) => Ok(Transition::PassToLike { super_like: true }),
        (SwipeAction::Pass, _, SwipeIntent::Pass) => Ok(Transition::NoOp),
        (SwipeAction::Like, _, SwipeIntent::Pass) => {
            Err(DiscoveryError::AlreadyActed(ActedReason::PassAfterLike))
        }
        (SwipeAction::Like, false, SwipeIntent::SuperLike) => Ok(Transition::UpgradeToSuper),
        (SwipeAction::Like, _, SwipeIntent::Like) | (SwipeAction::Like, true, SwipeIntent::SuperLike) => {
            Ok(Transition::NoOp)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn swipe(action: SwipeAction, super_like: bool) -> Swipe {
        Swipe {
            actor_id: "a".to_string(),
            target_id: "b".to_string(),
            action,
            is_super_like: super_like,
            timestamp: Utc::now(),
            score: Some(71.5),
        }
    }

    #[test]
    fn test_first_actions_insert() {
        assert_eq!(
            plan_transition(None, SwipeIntent::Like).unwrap(),
            Transition::Insert { action: SwipeAction::Like, super_like: false }
        );
        assert_eq!(
            plan_transition(None, SwipeIntent::SuperLike).unwrap(),
            Transition::Insert { action: SwipeAction::Like, super_like: true }
        );
        assert_eq!(
            plan_transition(None, SwipeIntent::Pass).unwrap(),
            Transition::Insert { action: SwipeAction::Pass, super_like: false }
        );
    }

    #[test]
    fn test_pass_can_be_revoked_by_like() {
        let passed = swipe(SwipeAction::Pass, false);
        let t = plan_transition(Some(&passed), SwipeIntent::Like).unwrap();
        assert_eq!(t, Transition::PassToLike { super_like: false });
        assert!(t.creates_like());
        assert_eq!(t.quota_cost(), Some(QuotaKind::Likes));
        assert_eq!(plan_transition(Some(&passed), SwipeIntent::Pass).unwrap(), Transition::NoOp);
    }

    #[test]
    fn test_pass_after_like_rejected() {
        for super_like in [false, true] {
            let liked = swipe(SwipeAction::Like, super_like);
            let err = plan_transition(Some(&liked), SwipeIntent::Pass).unwrap_err();
            assert!(matches!(err, DiscoveryError::AlreadyActed(ActedReason::PassAfterLike)));
        }
    }

    #[test]
    fn test_repeated_like_is_noop() {
        let liked = swipe(SwipeAction::Like, false);
        let t = plan_transition(Some(&liked), SwipeIntent::Like).unwrap();
        assert_eq!(t, Transition::NoOp);
        assert_eq!(t.quota_cost(), None);
        assert!(!t.writes());
    }

    #[test]
    fn test_superlike_upgrade_and_repeat() {
        let liked = swipe(SwipeAction::Like, false);
        let t = plan_transition(Some(&liked), SwipeIntent::SuperLike).unwrap();
        assert_eq!(t, Transition::UpgradeToSuper);
        assert_eq!(t.quota_cost(), Some(QuotaKind::SuperLikes));
        assert!(!t.creates_like());

        let super_liked = swipe(SwipeAction::Like, true);
        assert_eq!(plan_transition(Some(&super_liked), SwipeIntent::SuperLike).unwrap(), Transition::NoOp);
        assert_eq!(plan_transition(Some(&super_liked), SwipeIntent::Like).unwrap(), Transition::NoOp);
    }

    #[test]
    fn test_apply_keeps_key_and_prior_score() {
        let now = Utc::now();
        let liked = swipe(SwipeAction::Like, false);
        let upgraded = Transition::UpgradeToSuper
            .apply(Some(&liked), "a", "b", None, now)
            .unwrap();
        assert!(upgraded.is_super_like);
        assert_eq!(upgraded.action, SwipeAction::Like);
        assert_eq!(upgraded.score, Some(71.5));

        let passed = swipe(SwipeAction::Pass, false);
        let revoked = Transition::PassToLike { super_like: false }
            .apply(Some(&passed), "a", "b", Some(80.0), now)
            .unwrap();
        assert_eq!(revoked.action, SwipeAction::Like);
        assert_eq!(revoked.score, Some(80.0));

        assert!(Transition::NoOp.apply(Some(&liked), "a", "b", None, now).is_none());
    }
}
