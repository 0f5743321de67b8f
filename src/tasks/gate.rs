//! Completion gate over a task's direct dependencies.

use super::model::TaskStatus;

/// True iff every direct dependency has reached `completed`.
///
/// A task with no dependencies is always completable. Only the one-hop
/// edge set is inspected: a dependency counts as satisfied based on its
/// own `status` field, regardless of whether *its* dependencies are
/// satisfied. Cycles in the edge graph are therefore harmless here —
/// no edge is ever followed past the first hop.
///
/// Recomputed on every call; nothing is cached.
pub fn deps_satisfied<'a, I>(dependency_statuses: I) -> bool
where
    I: IntoIterator<Item = &'a str>,
{
    dependency_statuses
        .into_iter()
        .all(|status| status == TaskStatus::Completed.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_dependencies_is_satisfied() {
        assert!(deps_satisfied(Vec::<&str>::new()));
    }

    #[test]
    fn all_completed_is_satisfied() {
        assert!(deps_satisfied(["completed", "completed"]));
    }

    #[test]
    fn any_incomplete_blocks() {
        assert!(!deps_satisfied(["completed", "pending"]));
        assert!(!deps_satisfied(["in_progress"]));
        assert!(!deps_satisfied(["cancelled"]));
    }

    #[test]
    fn cancelled_does_not_count_as_completed() {
        // A cancelled dependency still blocks — only `completed` satisfies.
        assert!(!deps_satisfied(["cancelled", "completed"]));
    }
}
