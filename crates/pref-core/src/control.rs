//! Control binding abstraction
//!
//! Blocks never see concrete widgets. A [`Surface`] creates one [`Control`]
//! per bound setting; the block reads the overlay into the control and
//! registers a change handler that writes back. Change handlers fire on
//! committed edits only: a checkbox toggle, a combo selection, or a text or
//! number field losing focus / receiving Enter. Keystrokes do not commit.
//!
//! [`HeadlessSurface`] and [`HeadlessControl`] are the in-memory
//! implementation used by the CLI and by tests.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

/// Handler invoked with the control's new text after a committed edit.
pub type ChangeHandler = Rc<dyn Fn(&str)>;

/// What kind of control a setting needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ControlKind {
    Checkbox,
    Combo { choices: Vec<String> },
    Number { min: i32, max: i32 },
    Text,
    /// Read-only multi-line listing; edited through its block's operations.
    List,
}

/// Request to create a control.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControlSpec {
    pub id: String,
    pub label: String,
    pub kind: ControlKind,
}

/// A widget reduced to value, enablement and change notification.
pub trait Control {
    fn value(&self) -> String;

    /// Programmatic update. Never fires change handlers.
    fn set_value(&self, value: &str);

    fn is_enabled(&self) -> bool;

    fn set_enabled(&self, enabled: bool);

    fn on_change(&self, handler: ChangeHandler);
}

/// Factory for a block's controls, with optional grouping (tabs, sections).
pub trait Surface {
    fn begin_group(&mut self, label: &str);

    fn end_group(&mut self);

    fn add_control(&mut self, spec: &ControlSpec) -> Rc<dyn Control>;
}

/// In-memory control.
pub struct HeadlessControl {
    spec: ControlSpec,
    value: RefCell<String>,
    enabled: Cell<bool>,
    handlers: RefCell<Vec<ChangeHandler>>,
}

impl HeadlessControl {
    pub fn new(spec: ControlSpec) -> Self {
        Self {
            spec,
            value: RefCell::new(String::new()),
            enabled: Cell::new(true),
            handlers: RefCell::new(Vec::new()),
        }
    }

    pub fn spec(&self) -> &ControlSpec {
        &self.spec
    }

    /// Simulate a committed user edit. Returns `false` and changes nothing
    /// when the control is disabled.
    pub fn commit(&self, text: &str) -> bool {
        if !self.enabled.get() {
            tracing::debug!(control = %self.spec.id, "Ignoring input on disabled control");
            return false;
        }
        self.value.replace(text.to_string());
        let handlers: Vec<ChangeHandler> = self.handlers.borrow().iter().cloned().collect();
        for handler in handlers {
            handler(text);
        }
        true
    }
}

impl Control for HeadlessControl {
    fn value(&self) -> String {
        self.value.borrow().clone()
    }

    fn set_value(&self, value: &str) {
        self.value.replace(value.to_string());
    }

    fn is_enabled(&self) -> bool {
        self.enabled.get()
    }

    fn set_enabled(&self, enabled: bool) {
        self.enabled.set(enabled);
    }

    fn on_change(&self, handler: ChangeHandler) {
        self.handlers.borrow_mut().push(handler);
    }
}

/// In-memory surface recording every control it creates.
#[derive(Default)]
pub struct HeadlessSurface {
    groups: Vec<String>,
    controls: Vec<(String, Rc<HeadlessControl>)>,
}

impl HeadlessSurface {
    pub fn new() -> Self {
        Self::default()
    }

    /// Find a control by id, or by the part of the id after `store:`.
    pub fn control(&self, id: &str) -> Option<Rc<HeadlessControl>> {
        self.controls
            .iter()
            .map(|(_, control)| control)
            .find(|control| {
                let full = control.spec.id.as_str();
                full == id || full.split_once(':').is_some_and(|(_, name)| name == id)
            })
            .cloned()
    }

    /// Controls with the group path they were created under (`"A/B"`).
    pub fn controls(&self) -> impl Iterator<Item = (&str, &Rc<HeadlessControl>)> {
        self.controls
            .iter()
            .map(|(group, control)| (group.as_str(), control))
    }

    pub fn len(&self) -> usize {
        self.controls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.controls.is_empty()
    }
}

impl Surface for HeadlessSurface {
    fn begin_group(&mut self, label: &str) {
        self.groups.push(label.to_string());
    }

    fn end_group(&mut self) {
        self.groups.pop();
    }

    fn add_control(&mut self, spec: &ControlSpec) -> Rc<dyn Control> {
        let control = Rc::new(HeadlessControl::new(spec.clone()));
        self.controls
            .push((self.groups.join("/"), Rc::clone(&control)));
        control
    }
}
