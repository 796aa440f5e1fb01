use std::collections::BTreeMap;

use crate::remote::GatewayError;

/// What `pull` did with one remote post.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PullOutcome {
    /// Not present locally; stored as synced.
    Inserted,
    /// Local copy had no pending edits and was replaced by the remote one.
    Updated,
    /// Local copy already matched the remote revision.
    Unchanged,
    /// Local copy has pending edits and was kept.
    KeptLocal,
    Failed(GatewayError),
}

/// Per-post results of a pull, keyed by filename.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PullReport {
    pub outcomes: BTreeMap<String, PullOutcome>,
    /// Previously synced drafts that no longer exist remotely. They are left
    /// untouched.
    pub missing_remotely: Vec<String>,
}

impl PullReport {
    pub fn failures(&self) -> impl Iterator<Item = (&String, &GatewayError)> {
        self.outcomes.iter().filter_map(|(name, outcome)| match outcome {
            PullOutcome::Failed(e) => Some((name, e)),
            _ => None,
        })
    }

    pub fn count(&self, wanted: &PullOutcome) -> usize {
        self.outcomes.values().filter(|o| *o == wanted).count()
    }

    pub fn is_success(&self) -> bool {
        self.failures().next().is_none()
    }
}

/// What `push` did with one unsynced draft.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PushOutcome {
    Pushed { revision_token: String },
    Failed(GatewayError),
}

/// Per-post results of a push, keyed by filename.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PushReport {
    pub outcomes: BTreeMap<String, PushOutcome>,
}

impl PushReport {
    pub fn pushed(&self) -> impl Iterator<Item = (&String, &str)> {
        self.outcomes.iter().filter_map(|(name, outcome)| match outcome {
            PushOutcome::Pushed { revision_token } => Some((name, revision_token.as_str())),
            PushOutcome::Failed(_) => None,
        })
    }

    pub fn failures(&self) -> impl Iterator<Item = (&String, &GatewayError)> {
        self.outcomes.iter().filter_map(|(name, outcome)| match outcome {
            PushOutcome::Failed(e) => Some((name, e)),
            PushOutcome::Pushed { .. } => None,
        })
    }

    pub fn is_success(&self) -> bool {
        self.failures().next().is_none()
    }
}

/// How a draft was deleted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteOutcome {
    /// Deleted from the repository, then locally.
    Remote,
    /// Never synced; only the local draft was removed.
    LocalOnly,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_push_report_partitions() {
        let mut report = PushReport::default();
        report.outcomes.insert(
            "a.md".to_string(),
            PushOutcome::Pushed {
                revision_token: "t1".to_string(),
            },
        );
        report.outcomes.insert(
            "b.md".to_string(),
            PushOutcome::Failed(GatewayError::Conflict("stale".to_string())),
        );

        let pushed: Vec<_> = report.pushed().collect();
        assert_eq!(pushed, [(&"a.md".to_string(), "t1")]);
        assert_eq!(report.failures().count(), 1);
        assert!(!report.is_success());
    }

    #[test]
    fn test_pull_report_counts() {
        let mut report = PullReport::default();
        report
            .outcomes
            .insert("a.md".to_string(), PullOutcome::Inserted);
        report
            .outcomes
            .insert("b.md".to_string(), PullOutcome::Inserted);
        report
            .outcomes
            .insert("c.md".to_string(), PullOutcome::KeptLocal);

        assert_eq!(report.count(&PullOutcome::Inserted), 2);
        assert_eq!(report.count(&PullOutcome::Updated), 0);
        assert!(report.is_success());
    }
}
