//! Editing session over one aggregate document.
//!
//! ```text
//! Loading ──load ok──▶ Ready { dirty: false } ◀──save ok──┐
//!    │                    │ edit                         │
//!    │                    ▼                              │
//!    │                 Ready { dirty: true } ──save──────┘
//!    │                    (validation / transport failure: stays dirty)
//!    └──load failed──▶ LoadFailed ──retry──▶ Loading
//! ```
//!
//! A reload from `Ready` keeps the current workspace until the gateway
//! answers, and is refused while there are unsaved changes.

use log::{info, warn};

use crate::config::FieldCatalog;
use crate::document::{ConditionFormData, EditMode, EditingSession, IdGenerator, SpecificCondition, SqlReport};
use crate::error::{EditError, LoadError, SaveError, TransportError, TreeError};
use crate::gateway::PersistenceGateway;
use crate::tree::TreeOp;
use crate::validation::validate_document;

/// A loaded document: the working copy, the last saved baseline, and at
/// most one open specific-condition editor.
#[derive(Debug)]
pub struct Workspace {
    working: ConditionFormData,
    baseline: ConditionFormData,
    dirty: bool,
    editor: Option<EditingSession>,
    ids: IdGenerator,
}

impl Workspace {
    fn new(document: ConditionFormData) -> Self {
        Self {
            ids: IdGenerator::seeded_from(&document),
            working: document.clone(),
            baseline: document,
            dirty: false,
            editor: None,
        }
    }

    pub fn document(&self) -> &ConditionFormData {
        &self.working
    }

    /// The copy last loaded from or accepted by the gateway
    pub fn baseline(&self) -> &ConditionFormData {
        &self.baseline
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Dirty, or an editor is open that could still be committed
    pub fn has_unsaved_changes(&self) -> bool {
        self.dirty || self.editor.as_ref().is_some_and(|editor| editor.mode == EditMode::Edit)
    }

    pub fn set_general_name(&mut self, name: impl Into<String>) {
        self.working.general_name = name.into();
        self.dirty = true;
    }

    /// Applies an editor operation to the general condition.
    /// On error the general condition is left as it was.
    pub fn apply_general(&mut self, op: &TreeOp) -> Result<(), TreeError> {
        self.working.general_condition = op.apply(&self.working.general_condition)?;
        self.dirty = true;
        Ok(())
    }

    /// Adds an empty specific condition and opens it for editing
    pub fn add_specific(&mut self) -> Result<usize, EditError> {
        if self.editor.is_some() {
            return Err(EditError::AlreadyOpen);
        }
        let index = self.working.add_specific(&mut self.ids);
        self.dirty = true;
        self.editor = Some(EditingSession::open(&self.working, index, EditMode::Edit)?);
        Ok(index)
    }

    /// Removes a specific condition, closing its editor if it was open.
    /// Callers confirm with the user first.
    pub fn remove_specific(&mut self, index: usize) -> Result<SpecificCondition, EditError> {
        let removed = self
            .working
            .remove_specific(index)
            .ok_or(EditError::NoSuchCondition(index))?;
        if self.editor.as_ref().is_some_and(|editor| editor.id == removed.id) {
            self.editor = None;
        } else if let Some(editor) = self.editor.as_mut().filter(|editor| editor.index > index) {
            editor.index -= 1;
        }
        self.dirty = true;
        Ok(removed)
    }

    pub fn open_editor(&mut self, index: usize, mode: EditMode) -> Result<&mut EditingSession, EditError> {
        if self.editor.is_some() {
            return Err(EditError::AlreadyOpen);
        }
        Ok(self.editor.insert(EditingSession::open(&self.working, index, mode)?))
    }

    pub fn editor(&self) -> Option<&EditingSession> {
        self.editor.as_ref()
    }

    pub fn editor_mut(&mut self) -> Result<&mut EditingSession, EditError> {
        self.editor.as_mut().ok_or(EditError::NotOpen)
    }

    /// Writes the open editor back into the working copy and closes it.
    /// On failure the editor stays open.
    pub fn commit_editor(&mut self) -> Result<(), EditError> {
        let editor = self.editor.as_ref().ok_or(EditError::NotOpen)?;
        editor.commit(&mut self.working)?;
        self.editor = None;
        self.dirty = true;
        Ok(())
    }

    /// Closes the open editor without applying it
    pub fn close_editor(&mut self) -> Option<EditingSession> {
        self.editor.take()
    }

    /// Drops all unsaved edits
    pub fn revert(&mut self) {
        self.working = self.baseline.clone();
        self.editor = None;
        self.dirty = false;
    }

    pub fn sql_report(&self, catalog: &FieldCatalog) -> SqlReport {
        self.working.sql_report(catalog)
    }

    fn accept_saved(&mut self, canonical: ConditionFormData) {
        self.working = canonical.clone();
        self.baseline = canonical;
        self.dirty = false;
    }
}

#[derive(Debug)]
pub enum SessionState {
    Loading,
    Ready(Workspace),
    LoadFailed(TransportError),
}

/// One user's editing session against a persistence gateway.
///
/// Saves are serialized by `&mut self`; the core adds no locking of its own.
pub struct Session<G> {
    gateway: G,
    state: SessionState,
}

impl<G: PersistenceGateway> Session<G> {
    /// Creates the session and performs the initial load
    pub async fn start(gateway: G) -> Self {
        let mut session = Self {
            gateway,
            state: SessionState::Loading,
        };
        // The outcome is recorded in the state
        let _ = session.load().await;
        session
    }

    /// Loads (or reloads) the document. This is the retry path out of
    /// `LoadFailed`.
    ///
    /// From `Ready` the workspace is only replaced once the gateway answers;
    /// a failed reload leaves it as it was. Unsaved changes are never
    /// dropped here: save or [`Workspace::revert`] first.
    pub async fn load(&mut self) -> Result<(), LoadError> {
        match &self.state {
            SessionState::Ready(workspace) if workspace.has_unsaved_changes() => {
                warn!("reload refused: unsaved changes");
                return Err(LoadError::UnsavedChanges);
            }
            SessionState::Ready(_) => {}
            _ => self.state = SessionState::Loading,
        }

        match self.gateway.load().await {
            Ok(document) => {
                info!("session ready");
                self.state = SessionState::Ready(Workspace::new(document));
                Ok(())
            }
            Err(e) => {
                if matches!(self.state, SessionState::Ready(_)) {
                    warn!("reload failed, keeping current workspace: {}", e);
                } else {
                    warn!("load failed: {}", e);
                    self.state = SessionState::LoadFailed(e.clone());
                }
                Err(e.into())
            }
        }
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn gateway(&self) -> &G {
        &self.gateway
    }

    pub fn workspace(&self) -> Option<&Workspace> {
        match &self.state {
            SessionState::Ready(workspace) => Some(workspace),
            _ => None,
        }
    }

    pub fn workspace_mut(&mut self) -> Option<&mut Workspace> {
        match &mut self.state {
            SessionState::Ready(workspace) => Some(workspace),
            _ => None,
        }
    }

    /// Validates the whole working copy and, if it passes, overwrites the
    /// stored document with it. All or nothing: any failure leaves the
    /// working copy and its dirty flag untouched.
    pub async fn save(&mut self) -> Result<(), SaveError> {
        let SessionState::Ready(workspace) = &mut self.state else {
            return Err(SaveError::NotReady);
        };

        let snapshot = workspace.working.clone();
        if let Err(errors) = validate_document(&snapshot) {
            warn!("save blocked: {}", errors);
            return Err(errors.into());
        }

        match self.gateway.save(&snapshot).await {
            Ok(canonical) => {
                workspace.accept_saved(canonical);
                Ok(())
            }
            Err(e) => {
                warn!("save failed, keeping unsaved edits: {}", e);
                Err(e.into())
            }
        }
    }
}
