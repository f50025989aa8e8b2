//! Key-bound options block

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::{Rc, Weak};

use super::{BlockCore, BlockState, SettingsBlock};
use crate::control::{Control, ControlKind, ControlSpec, Surface};
use crate::key::{TypedKey, parse_bool, parse_int};
use crate::overlay::{ListenerId, OverlayStore, PropertyChange};
use crate::status::{Status, StatusListener, most_severe};
use crate::{Error, Result};

/// Cross-key rule evaluated against the overlay after every edit.
pub type Validator = Rc<dyn Fn(&OverlayStore) -> Status>;

/// Releases a resource allocated outside the control tree.
pub type DisposeHook = Box<dyn FnOnce() -> std::result::Result<(), String>>;

/// How a field edits its key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldKind {
    /// Boolean key.
    Checkbox,
    /// String key restricted to `values`.
    Combo { values: Vec<String> },
    /// Integer key within `min..=max`.
    Number { min: i32, max: i32 },
    /// Free string key.
    Text { required: bool },
}

#[derive(Debug, Clone)]
struct Field {
    key: TypedKey,
    label: String,
    kind: FieldKind,
}

impl Field {
    fn control_spec(&self) -> ControlSpec {
        let kind = match &self.kind {
            FieldKind::Checkbox => ControlKind::Checkbox,
            FieldKind::Combo { values } => ControlKind::Combo {
                choices: values.clone(),
            },
            FieldKind::Number { min, max } => ControlKind::Number {
                min: *min,
                max: *max,
            },
            FieldKind::Text { .. } => ControlKind::Text,
        };
        ControlSpec {
            id: self.key.to_string(),
            label: self.label.clone(),
            kind,
        }
    }

    /// Check committed control text; `Ok` holds the text to stage.
    fn check(&self, text: &str) -> std::result::Result<String, Status> {
        match &self.kind {
            FieldKind::Checkbox => parse_bool(text)
                .map(|b| b.to_string())
                .ok_or_else(|| Status::error(format!("Invalid value for '{}'", self.label))),
            FieldKind::Combo { values } => {
                if values.iter().any(|v| v == text) {
                    Ok(text.to_string())
                } else {
                    Err(Status::error(format!(
                        "'{}' is not a valid choice for '{}'",
                        text, self.label
                    )))
                }
            }
            FieldKind::Number { min, max } => match parse_int(text) {
                Some(n) if (*min..=*max).contains(&n) => Ok(n.to_string()),
                _ => Err(Status::error(format!(
                    "Invalid value for '{}': enter a number between {} and {}",
                    self.label, min, max
                ))),
            },
            FieldKind::Text { required } => {
                if *required && text.trim().is_empty() {
                    Err(Status::error(format!("'{}' must not be empty", self.label)))
                } else {
                    Ok(text.to_string())
                }
            }
        }
    }

    /// Overlay value rendered for the control.
    fn display(&self, overlay: &OverlayStore) -> String {
        match self.kind {
            FieldKind::Checkbox => overlay.get_boolean(&self.key).to_string(),
            FieldKind::Number { .. } => overlay.get_int(&self.key).to_string(),
            FieldKind::Combo { .. } | FieldKind::Text { .. } => overlay.get_string(&self.key),
        }
    }
}

#[derive(Debug, Clone)]
struct Dependency {
    master: TypedKey,
    slaves: Vec<TypedKey>,
}

/// Builder for [`OptionsBlock`].
pub struct OptionsBlockBuilder {
    name: String,
    overlay: OverlayStore,
    fields: Vec<Field>,
    validators: Vec<Validator>,
    dependencies: Vec<Dependency>,
    dispose_hooks: Vec<DisposeHook>,
}

impl OptionsBlockBuilder {
    fn field(mut self, key: TypedKey, label: impl Into<String>, kind: FieldKind) -> Self {
        self.fields.push(Field {
            key,
            label: label.into(),
            kind,
        });
        self
    }

    pub fn checkbox(self, key: TypedKey, label: impl Into<String>) -> Self {
        self.field(key, label, FieldKind::Checkbox)
    }

    pub fn combo<S: Into<String>>(
        self,
        key: TypedKey,
        label: impl Into<String>,
        values: impl IntoIterator<Item = S>,
    ) -> Self {
        let values = values.into_iter().map(Into::into).collect();
        self.field(key, label, FieldKind::Combo { values })
    }

    pub fn number(self, key: TypedKey, label: impl Into<String>, min: i32, max: i32) -> Self {
        self.field(key, label, FieldKind::Number { min, max })
    }

    pub fn text(self, key: TypedKey, label: impl Into<String>) -> Self {
        self.field(key, label, FieldKind::Text { required: false })
    }

    pub fn required_text(self, key: TypedKey, label: impl Into<String>) -> Self {
        self.field(key, label, FieldKind::Text { required: true })
    }

    /// Add a cross-key validation rule.
    pub fn validator(mut self, validator: impl Fn(&OverlayStore) -> Status + 'static) -> Self {
        self.validators.push(Rc::new(validator));
        self
    }

    /// Enable `slaves` only while the boolean `master` is true.
    pub fn dependency(mut self, master: TypedKey, slaves: impl IntoIterator<Item = TypedKey>) -> Self {
        self.dependencies.push(Dependency {
            master,
            slaves: slaves.into_iter().collect(),
        });
        self
    }

    /// Run `hook` once when the block is disposed.
    pub fn on_dispose(
        mut self,
        hook: impl FnOnce() -> std::result::Result<(), String> + 'static,
    ) -> Self {
        self.dispose_hooks.push(Box::new(hook));
        self
    }

    /// Build the block and declare its keys to the overlay.
    pub fn build(self) -> OptionsBlock {
        self.overlay
            .add_keys(self.fields.iter().map(|field| field.key.clone()));
        OptionsBlock {
            inner: Rc::new(Inner {
                core: BlockCore::new(self.name),
                overlay: self.overlay,
                fields: self.fields,
                validators: self.validators,
                dependencies: self.dependencies,
                dispose_hooks: RefCell::new(self.dispose_hooks),
                controls: RefCell::new(Vec::new()),
                field_errors: RefCell::new(HashMap::new()),
                listener: Cell::new(None),
            }),
        }
    }
}

/// A block of checkbox, combo, number and text fields, each bound to one
/// overlay key.
///
/// Invalid input (out-of-range number, unknown combo value, empty required
/// text) never reaches the overlay; it is reported as an error status until
/// corrected or the block is refreshed.
#[derive(Clone)]
pub struct OptionsBlock {
    inner: Rc<Inner>,
}

struct Inner {
    core: BlockCore,
    overlay: OverlayStore,
    fields: Vec<Field>,
    validators: Vec<Validator>,
    dependencies: Vec<Dependency>,
    dispose_hooks: RefCell<Vec<DisposeHook>>,
    controls: RefCell<Vec<Rc<dyn Control>>>,
    field_errors: RefCell<HashMap<TypedKey, Status>>,
    listener: Cell<Option<ListenerId>>,
}

impl OptionsBlock {
    pub fn builder(name: impl Into<String>, overlay: &OverlayStore) -> OptionsBlockBuilder {
        OptionsBlockBuilder {
            name: name.into(),
            overlay: overlay.clone(),
            fields: Vec::new(),
            validators: Vec::new(),
            dependencies: Vec::new(),
            dispose_hooks: Vec::new(),
        }
    }

    /// Recompute and publish the block status.
    ///
    /// The result depends on the whole overlay, not only on `changed`.
    pub fn validate_settings(&self, changed: Option<&PropertyChange>) -> Status {
        self.inner.validate_settings(changed)
    }
}

impl Inner {
    fn owns(&self, key: &TypedKey) -> bool {
        self.fields.iter().any(|field| &field.key == key)
    }

    /// Masters may live in another block.
    fn is_master(&self, key: &TypedKey) -> bool {
        self.dependencies.iter().any(|dep| &dep.master == key)
    }

    fn validate_settings(&self, changed: Option<&PropertyChange>) -> Status {
        if let Some(change) = changed {
            tracing::debug!(
                block = %self.core.name(),
                key = %change.key,
                old = %change.old_value,
                new = %change.new_value,
                "Validating settings"
            );
        }
        self.update_enablement();

        let mut statuses: Vec<Status> = self
            .fields
            .iter()
            .filter_map(|field| self.field_errors.borrow().get(&field.key).cloned())
            .collect();
        statuses.extend(self.validators.iter().map(|validator| validator(&self.overlay)));

        let status = most_severe(&statuses);
        self.core.publish(status.clone());
        status
    }

    fn update_enablement(&self) {
        let controls = self.controls.borrow();
        for (field, control) in self.fields.iter().zip(controls.iter()) {
            let masters_on = self
                .dependencies
                .iter()
                .filter(|dep| dep.slaves.contains(&field.key))
                .all(|dep| self.overlay.get_boolean(&dep.master));
            control.set_enabled(self.core.is_enabled() && masters_on);
        }
    }

    fn refresh_controls(&self) {
        let controls = self.controls.borrow();
        for (field, control) in self.fields.iter().zip(controls.iter()) {
            control.set_value(&field.display(&self.overlay));
        }
    }

    /// A committed control edit for field `index`.
    fn control_changed(&self, index: usize, text: &str) {
        if !self.core.is_enabled() {
            return;
        }
        let field = &self.fields[index];
        self.core.mark_editing();

        match field.check(text) {
            Ok(value) => {
                self.field_errors.borrow_mut().remove(&field.key);
                self.overlay.set_value(&field.key, value);
                if !self.overlay.is_started() {
                    self.validate_settings(None);
                }
            }
            Err(status) => {
                self.field_errors
                    .borrow_mut()
                    .insert(field.key.clone(), status);
                self.validate_settings(None);
            }
        }
    }

    /// Overlay change from any source: keep the control in sync, revalidate.
    fn overlay_changed(&self, change: &PropertyChange) {
        let Some(index) = self.fields.iter().position(|field| field.key == change.key) else {
            return;
        };
        if let Some(control) = self.controls.borrow().get(index) {
            let shown = self.fields[index].display(&self.overlay);
            if control.value() != shown {
                control.set_value(&shown);
            }
        }
        self.field_errors.borrow_mut().remove(&change.key);
        self.validate_settings(Some(change));
    }
}

impl SettingsBlock for OptionsBlock {
    fn name(&self) -> &str {
        self.inner.core.name()
    }

    fn owned_keys(&self) -> Vec<TypedKey> {
        self.inner
            .fields
            .iter()
            .map(|field| field.key.clone())
            .collect()
    }

    fn connect(&self, listener: StatusListener) {
        self.inner.core.connect(listener);
    }

    fn create_contents(&self, surface: &mut dyn Surface) {
        self.inner.core.bind();

        for (index, field) in self.inner.fields.iter().enumerate() {
            let control = surface.add_control(&field.control_spec());
            let weak: Weak<Inner> = Rc::downgrade(&self.inner);
            control.on_change(Rc::new(move |text: &str| {
                if let Some(inner) = weak.upgrade() {
                    inner.control_changed(index, text);
                }
            }));
            self.inner.controls.borrow_mut().push(control);
        }

        let weak: Weak<Inner> = Rc::downgrade(&self.inner);
        let id = self.inner.overlay.add_property_change_listener(move |change| {
            if let Some(inner) = weak.upgrade() {
                if inner.owns(&change.key) {
                    inner.overlay_changed(change);
                } else if inner.is_master(&change.key) {
                    inner.validate_settings(Some(change));
                }
            }
        });
        self.inner.listener.set(Some(id));

        self.inner.refresh_controls();
        self.inner.validate_settings(None);
    }

    fn status(&self) -> Status {
        self.inner.core.status()
    }

    fn state(&self) -> BlockState {
        self.inner.core.state()
    }

    fn set_enabled(&self, enabled: bool) {
        self.inner.core.set_enabled(enabled);
        self.inner.update_enablement();
    }

    fn perform_ok(&self) -> Result<()> {
        self.inner.core.set_state(BlockState::Committed);
        Ok(())
    }

    fn perform_defaults(&self) {
        for field in &self.inner.fields {
            if !self.inner.overlay.is_default(&field.key) {
                self.inner.overlay.set_to_default(&field.key);
            }
        }
        self.refresh();
    }

    fn perform_cancel(&self) {
        self.inner.core.set_state(BlockState::Discarded);
    }

    fn refresh(&self) {
        self.inner.field_errors.borrow_mut().clear();
        self.inner.refresh_controls();
        self.inner.validate_settings(None);
    }

    fn dispose(&self) -> Result<()> {
        if !self.inner.core.begin_dispose() {
            return Ok(());
        }
        if let Some(id) = self.inner.listener.take() {
            self.inner.overlay.remove_property_change_listener(id);
        }

        let hooks = self.inner.dispose_hooks.take();
        let mut failure = None;
        for hook in hooks {
            if let Err(message) = hook() {
                tracing::warn!(block = %self.name(), %message, "Dispose hook failed");
                failure.get_or_insert(message);
            }
        }
        match failure {
            Some(message) => Err(Error::Dispose {
                block: self.name().to_string(),
                message,
            }),
            None => Ok(()),
        }
    }
}
