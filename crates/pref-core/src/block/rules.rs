//! Header substitution rules edited as a list

use std::cell::{Cell, RefCell};
use std::collections::{HashMap, HashSet};
use std::rc::Rc;

use serde::{Deserialize, Serialize};

use super::{BlockCore, BlockState, SettingsBlock};
use crate::control::{Control, ControlKind, ControlSpec, Surface};
use crate::key::TypedKey;
use crate::overlay::OverlayStore;
use crate::status::{Status, StatusListener};
use crate::{Error, Result};

/// Replace header `from` with header `to`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubstitutionRule {
    pub from: String,
    pub to: String,
}

impl SubstitutionRule {
    pub fn new(from: impl Into<String>, to: impl Into<String>) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
        }
    }
}

/// Edits a list of substitution rules stored as JSON in one string key.
///
/// Unlike field blocks, edits stay in a working list and reach the overlay
/// only in [`perform_ok`](SettingsBlock::perform_ok). An untouched list is
/// never written back, so a value changed underneath the page survives.
pub struct SubstitutionRulesBlock {
    core: BlockCore,
    overlay: OverlayStore,
    key: TypedKey,
    rules: RefCell<Vec<SubstitutionRule>>,
    dirty: Cell<bool>,
    control: RefCell<Option<Rc<dyn Control>>>,
}

impl SubstitutionRulesBlock {
    pub fn new(name: impl Into<String>, overlay: &OverlayStore, key: TypedKey) -> Self {
        overlay.add_keys([key.clone()]);
        Self {
            core: BlockCore::new(name),
            overlay: overlay.clone(),
            key,
            rules: RefCell::new(Vec::new()),
            dirty: Cell::new(false),
            control: RefCell::new(None),
        }
    }

    /// Working copy of the rules.
    pub fn rules(&self) -> Vec<SubstitutionRule> {
        self.rules.borrow().clone()
    }

    /// Append a rule. Returns `false` when the block is disabled.
    pub fn add_rule(&self, rule: SubstitutionRule) -> bool {
        self.edit(|rules| {
            rules.push(rule);
            true
        })
    }

    /// Replace the rule at `index`; `false` if disabled or out of range.
    pub fn replace_rule(&self, index: usize, rule: SubstitutionRule) -> bool {
        self.edit(|rules| match rules.get_mut(index) {
            Some(slot) => {
                *slot = rule;
                true
            }
            None => false,
        })
    }

    /// Remove the rule at `index`; `false` if disabled or out of range.
    pub fn remove_rule(&self, index: usize) -> bool {
        self.edit(|rules| {
            if index < rules.len() {
                rules.remove(index);
                true
            } else {
                false
            }
        })
    }

    /// Recompute and publish the status of the working list.
    pub fn validate_settings(&self) -> Status {
        let status = check_rules(&self.rules.borrow());
        self.core.publish(status.clone());
        status
    }

    fn edit(&self, apply: impl FnOnce(&mut Vec<SubstitutionRule>) -> bool) -> bool {
        if !self.core.is_enabled() {
            tracing::debug!(block = %self.core.name(), "Ignoring edit on disabled block");
            return false;
        }
        let changed = apply(&mut self.rules.borrow_mut());
        if changed {
            self.dirty.set(true);
            self.core.mark_editing();
            self.show();
            self.validate_settings();
        }
        changed
    }

    /// Reload the working list from the overlay.
    fn reload(&self) {
        let stored = self.overlay.get_string(&self.key);
        let rules = if stored.trim().is_empty() {
            Vec::new()
        } else {
            serde_json::from_str(&stored).unwrap_or_else(|err| {
                tracing::debug!(key = %self.key, error = %err, "Unparsable substitution rules");
                Vec::new()
            })
        };
        self.rules.replace(rules);
        self.dirty.set(false);
        self.show();
        self.validate_settings();
    }

    fn show(&self) {
        if let Some(control) = self.control.borrow().as_ref() {
            let lines: Vec<String> = self
                .rules
                .borrow()
                .iter()
                .map(|rule| format!("{} -> {}", rule.from, rule.to))
                .collect();
            control.set_value(&lines.join("\n"));
        }
    }
}

fn check_rules(rules: &[SubstitutionRule]) -> Status {
    let mut seen = HashSet::new();
    for (index, rule) in rules.iter().enumerate() {
        if rule.from.trim().is_empty() || rule.to.trim().is_empty() {
            return Status::error(format!(
                "Substitution rule {} has an empty header name",
                index + 1
            ));
        }
        if rule.from == rule.to {
            return Status::error(format!("Header '{}' is substituted by itself", rule.from));
        }
        if !seen.insert(rule.from.as_str()) {
            return Status::error(format!(
                "Header '{}' has more than one substitution rule",
                rule.from
            ));
        }
    }

    let next: HashMap<&str, &str> = rules
        .iter()
        .map(|rule| (rule.from.as_str(), rule.to.as_str()))
        .collect();
    for rule in rules {
        let mut visited = HashSet::from([rule.from.as_str()]);
        let mut current = rule.to.as_str();
        while let Some(&target) = next.get(current) {
            if !visited.insert(current) {
                break;
            }
            if target == rule.from {
                return Status::warning(format!(
                    "Substitution rules form a cycle through '{}'",
                    rule.from
                ));
            }
            current = target;
        }
    }
    Status::ok()
}

impl SettingsBlock for SubstitutionRulesBlock {
    fn name(&self) -> &str {
        self.core.name()
    }

    fn owned_keys(&self) -> Vec<TypedKey> {
        vec![self.key.clone()]
    }

    fn connect(&self, listener: StatusListener) {
        self.core.connect(listener);
    }

    fn create_contents(&self, surface: &mut dyn Surface) {
        self.core.bind();
        let control = surface.add_control(&ControlSpec {
            id: self.key.to_string(),
            label: self.core.name().to_string(),
            kind: ControlKind::List,
        });
        control.set_enabled(self.core.is_enabled());
        self.control.replace(Some(control));
        self.reload();
    }

    fn status(&self) -> Status {
        self.core.status()
    }

    fn state(&self) -> BlockState {
        self.core.state()
    }

    fn set_enabled(&self, enabled: bool) {
        self.core.set_enabled(enabled);
        if let Some(control) = self.control.borrow().as_ref() {
            control.set_enabled(enabled);
        }
    }

    fn perform_ok(&self) -> Result<()> {
        if !self.dirty.get() {
            self.reload();
            self.core.set_state(BlockState::Committed);
            return Ok(());
        }
        let status = self.validate_settings();
        if status.is_error() {
            return Err(Error::BlockRejected {
                block: self.core.name().to_string(),
                reason: status.message().to_string(),
            });
        }
        let text = serde_json::to_string(&*self.rules.borrow())?;
        if text != self.overlay.get_string(&self.key) {
            self.overlay.set_value(&self.key, text);
        }
        self.dirty.set(false);
        self.core.set_state(BlockState::Committed);
        Ok(())
    }

    fn perform_defaults(&self) {
        self.overlay.set_to_default(&self.key);
        self.reload();
    }

    fn perform_cancel(&self) {
        self.reload();
        self.core.set_state(BlockState::Discarded);
    }

    fn refresh(&self) {
        self.reload();
    }

    fn dispose(&self) -> Result<()> {
        if self.core.begin_dispose() {
            self.control.replace(None);
        }
        Ok(())
    }
}
