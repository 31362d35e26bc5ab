// Arbitration policy contract. Rules share no state with each other, only
// this (priority, applicability, decision) shape.

use std::fmt;
use std::sync::Arc;

use crate::context::ArbitrationContext;
use crate::types::*;

/// A single arbitration policy.
///
/// Rules are evaluated highest priority first. A rule that has no opinion
/// returns [`Verdict::Skip`] and the next one decides.
pub trait Rule: Send + Sync + fmt::Debug {
    /// Name shown in logs and snapshots.
    fn name(&self) -> &str;

    /// Higher is evaluated first.
    fn priority(&self) -> i32;

    /// Whether the rule takes part in the current decision at all.
    /// `event` is the most recent raw pointer event, if any.
    fn is_applicable(&self, _event: Option<&PointerEvent>, _ctx: &ArbitrationContext) -> bool {
        true
    }

    /// `pointer` is `None` when checking whether a control may activate.
    fn evaluate(
        &self,
        pointer: Option<PointerId>,
        channel: Channel,
        ctx: &ArbitrationContext,
    ) -> Verdict;
}

/// Handle under which rules are registered. Removal matches on handle identity.
pub type SharedRule = Arc<dyn Rule>;

/// Wrap a rule for registration.
pub fn shared<R: Rule + 'static>(rule: R) -> SharedRule {
    Arc::new(rule)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug)]
    struct DenyEverything;

    impl Rule for DenyEverything {
        fn name(&self) -> &str {
            "DenyEverything"
        }

        fn priority(&self) -> i32 {
            1
        }

        fn evaluate(&self, _: Option<PointerId>, _: Channel, _: &ArbitrationContext) -> Verdict {
            Verdict::Deny
        }
    }

    #[test]
    fn rules_are_applicable_by_default() {
        let rule = shared(DenyEverything);
        let ctx = ArbitrationContext::new();
        assert!(rule.is_applicable(None, &ctx));
        assert_eq!(rule.evaluate(None, Channel::Unknown, &ctx), Verdict::Deny);
    }

    #[test]
    fn shared_handles_have_identity() {
        let a = shared(DenyEverything);
        let b = shared(DenyEverything);
        assert!(Arc::ptr_eq(&a, &a.clone()));
        assert!(!Arc::ptr_eq(&a, &b));
    }
}
