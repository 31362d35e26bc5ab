// Rule engine: the pointer -> channel ownership table and the rule chain
// that decides claims and control activation.

use std::cmp::Reverse;
use std::collections::HashMap;
use std::sync::Arc;

use crate::context::ArbitrationContext;
use crate::rule::{Rule, SharedRule};
use crate::rules::default_rules;
use crate::types::*;

/// Decides who may own which touch pointer.
///
/// The rule list is kept in descending priority order, re-sorted lazily
/// after registrations. The sort is stable, so ties keep registration order.
#[derive(Debug)]
pub struct RuleEngine {
    owners: HashMap<PointerId, Channel>,
    rules: Vec<SharedRule>,
    needs_sort: bool,
}

impl RuleEngine {
    /// Engine with the default rule set.
    pub fn new(overlap_threshold: f32) -> Self {
        let mut engine = Self::empty();
        for rule in default_rules(overlap_threshold) {
            engine.add_rule(rule);
        }
        engine
    }

    /// Engine with no rules; every unowned claim is allowed.
    pub fn empty() -> Self {
        RuleEngine {
            owners: HashMap::new(),
            rules: Vec::new(),
            needs_sort: false,
        }
    }

    /// Whether `channel` may take or keep `pointer`.
    ///
    /// An owned pointer is kept by its owner and never handed to a channel of
    /// equal or lower priority. Higher-priority channels still go through the
    /// rule chain.
    pub fn can_claim(
        &mut self,
        pointer: PointerId,
        channel: Channel,
        ctx: &ArbitrationContext,
    ) -> bool {
        if let Some(&owner) = self.owners.get(&pointer) {
            if owner == channel {
                return true;
            }
            if channel.priority() <= owner.priority() {
                return false;
            }
        }

        self.run_chain(Some(pointer), channel, ctx)
    }

    /// Record `channel` as owner of `pointer`. Callers check `can_claim` first.
    pub fn grant(&mut self, pointer: PointerId, channel: Channel) {
        if let Some(previous) = self.owners.insert(pointer, channel) {
            if previous != channel {
                log::debug!(
                    "touch {} ownership changed: {} -> {}",
                    pointer,
                    previous,
                    channel
                );
            }
        }
    }

    /// Drop ownership of `pointer`. Unowned pointers are left alone.
    pub fn release(&mut self, pointer: PointerId) -> Option<Channel> {
        self.owners.remove(&pointer)
    }

    /// Whether the control would be allowed to turn on right now.
    ///
    /// Runs the chain as a joystick with no pointer attached. `ctx` should
    /// already carry `control_id` as its active control.
    pub fn can_activate_control(&mut self, control_id: &str, ctx: &ArbitrationContext) -> bool {
        let allowed = self.run_chain(None, Channel::VirtualJoystick, ctx);
        log::trace!("control {:?} activation check: {}", control_id, allowed);
        allowed
    }

    /// First non-skip verdict wins. All skips means allow.
    fn run_chain(
        &mut self,
        pointer: Option<PointerId>,
        channel: Channel,
        ctx: &ArbitrationContext,
    ) -> bool {
        self.sort_rules_if_needed();

        let event = ctx.last_event();
        for rule in &self.rules {
            if !rule.is_applicable(event, ctx) {
                continue;
            }
            match rule.evaluate(pointer, channel, ctx) {
                Verdict::Allow => return true,
                Verdict::Deny => {
                    log::trace!("{} denied by {}", channel, rule.name());
                    return false;
                }
                Verdict::Skip => {}
            }
        }

        true
    }

    /// `None` is ignored.
    pub fn add_rule(&mut self, rule: impl Into<Option<SharedRule>>) {
        if let Some(rule) = rule.into() {
            log::trace!("rule added: {} ({})", rule.name(), rule.priority());
            self.rules.push(rule);
            self.needs_sort = true;
        }
    }

    /// Remove the rule registered under this handle. Returns whether it was found.
    pub fn remove_rule(&mut self, rule: &SharedRule) -> bool {
        let before = self.rules.len();
        self.rules.retain(|r| !Arc::ptr_eq(r, rule));
        let removed = self.rules.len() != before;
        if removed {
            log::trace!("rule removed: {}", rule.name());
        }
        removed
    }

    /// Removes the default rules too.
    pub fn clear_rules(&mut self) {
        self.rules.clear();
        self.needs_sort = false;
    }

    /// Clears ownership. Registered rules stay.
    pub fn reset(&mut self) {
        self.owners.clear();
    }

    /// Rules in evaluation order.
    pub fn rules(&mut self) -> &[SharedRule] {
        self.sort_rules_if_needed();
        &self.rules
    }

    /// Rule names in evaluation order, without touching the pending sort.
    pub fn rule_names(&self) -> Vec<String> {
        let mut rules: Vec<&SharedRule> = self.rules.iter().collect();
        if self.needs_sort {
            rules.sort_by_key(|r| Reverse(r.priority()));
        }
        rules.iter().map(|r| r.name().to_string()).collect()
    }

    pub fn owner_of(&self, pointer: PointerId) -> Option<Channel> {
        self.owners.get(&pointer).copied()
    }

    pub fn occupied_count(&self) -> usize {
        self.owners.len()
    }

    /// Ownership table sorted by pointer id.
    pub fn owners(&self) -> Vec<OwnerEntry> {
        let mut entries: Vec<OwnerEntry> = self
            .owners
            .iter()
            .map(|(&pointer, &channel)| OwnerEntry { pointer, channel })
            .collect();
        entries.sort_by_key(|e| e.pointer);
        entries
    }

    // Optimization only: evaluation order is the same if this ran every time.
    fn sort_rules_if_needed(&mut self) {
        if self.needs_sort {
            self.rules.sort_by_key(|r| Reverse(r.priority()));
            self.needs_sort = false;
        }
    }
}

impl Default for RuleEngine {
    fn default() -> Self {
        Self::new(crate::rules::DEFAULT_OVERLAP_THRESHOLD)
    }
}
