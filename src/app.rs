use forumtree::api::{ForumFields, GroupFields, NodeFields};
use forumtree::sync::{Request, Response, SyncCoordinator, Ticket};
use forumtree::tree::{Node, NodeKey, NodeKind};
use forumtree::util::sanitize_title;
use std::borrow::Cow;
use tokio::task::JoinHandle;
use tokio::time::Instant;

// ============================================================================
// Dialog State
// ============================================================================

/// What the open text dialog will do on submit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DialogPurpose {
    NewGroup { parent: NodeKey },
    NewForum { parent: NodeKey },
    Rename { key: NodeKey },
}

impl DialogPurpose {
    pub fn title(&self) -> &'static str {
        match self {
            DialogPurpose::NewGroup { .. } => " New Group ",
            DialogPurpose::NewForum { .. } => " New Forum ",
            DialogPurpose::Rename { .. } => " Rename ",
        }
    }
}

/// Single-line title dialog.
///
/// Stays open while its request is in flight and after a failure, so the
/// typed text is never lost.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dialog {
    pub purpose: DialogPurpose,
    pub input: String,
    /// Error from the last submit attempt.
    pub error: Option<String>,
    /// Ticket of the submitted request, while it is in flight.
    pub pending: Option<Ticket>,
}

impl Dialog {
    fn new(purpose: DialogPurpose, input: String) -> Self {
        Self {
            purpose,
            input,
            error: None,
            pending: None,
        }
    }
}

/// Events from background tasks
pub enum AppEvent {
    /// A server request finished; the response still has to be applied.
    SyncFinished { ticket: Ticket, response: Response },
    /// A background task panicked.
    TaskPanicked {
        task: &'static str,
        ticket: Ticket,
        error: String,
    },
}

// ============================================================================
// Application State
// ============================================================================

pub struct App {
    pub sync: SyncCoordinator,
    /// Highlighted row, by identity so it survives re-sorting and reloads.
    pub selected: Option<NodeKey>,
    pub dialog: Option<Dialog>,
    pub status_message: Option<(Cow<'static, str>, Instant)>,
    pub needs_redraw: bool,
    /// Task running the pending request, if any.
    pub request_handle: Option<JoinHandle<()>>,
}

impl App {
    pub fn new(sync: SyncCoordinator) -> Self {
        Self {
            sync,
            selected: None,
            dialog: None,
            status_message: None,
            needs_redraw: true,
            request_handle: None,
        }
    }

    // ------------------------------------------------------------------------
    // Selection
    // ------------------------------------------------------------------------

    /// Keys of the visible rows, top to bottom.
    pub fn visible_keys(&self) -> Vec<NodeKey> {
        self.sync.display_rows().iter().map(|row| row.key).collect()
    }

    /// Row index of the selection (0 when nothing is selected).
    pub fn selected_index(&self) -> usize {
        self.selected
            .and_then(|key| self.visible_keys().iter().position(|k| *k == key))
            .unwrap_or(0)
    }

    /// Make sure the selection points at a visible row.
    ///
    /// A hidden or removed node hands the selection to its nearest visible
    /// ancestor, falling back to the first row.
    pub fn clamp_selection(&mut self) {
        let keys = self.visible_keys();
        let Some(mut key) = self.selected else {
            self.selected = keys.first().copied();
            return;
        };
        loop {
            if keys.contains(&key) {
                self.selected = Some(key);
                return;
            }
            match self
                .sync
                .tree()
                .and_then(|tree| tree.get(key))
                .and_then(|entry| entry.parent())
            {
                Some(parent) => key = parent,
                None => {
                    self.selected = keys.first().copied();
                    return;
                }
            }
        }
    }

    pub fn nav_up(&mut self) {
        let keys = self.visible_keys();
        let idx = self.selected_index().saturating_sub(1);
        if let Some(key) = keys.get(idx) {
            self.selected = Some(*key);
        }
    }

    pub fn nav_down(&mut self) {
        let keys = self.visible_keys();
        let idx = (self.selected_index() + 1).min(keys.len().saturating_sub(1));
        if let Some(key) = keys.get(idx) {
            self.selected = Some(*key);
        }
    }

    pub fn toggle_selected(&mut self) {
        if let Some(key) = self.selected {
            self.sync.toggle_expanded(key);
        }
    }

    pub fn expand_all(&mut self) {
        self.sync.expand_all();
        self.clamp_selection();
    }

    /// Group that new nodes go into: the selected group, or the group
    /// holding the selected forum.
    pub fn target_group(&self) -> Option<NodeKey> {
        let key = self.selected?;
        match key.kind() {
            NodeKind::Group => Some(key),
            NodeKind::Forum => self.sync.tree()?.get(key)?.parent(),
        }
    }

    // ------------------------------------------------------------------------
    // Dialogs
    // ------------------------------------------------------------------------

    pub fn open_create_dialog(&mut self, kind: NodeKind) {
        let Some(parent) = self.target_group() else {
            self.set_status("Select a group first");
            return;
        };
        let purpose = match kind {
            NodeKind::Group => DialogPurpose::NewGroup { parent },
            NodeKind::Forum => DialogPurpose::NewForum { parent },
        };
        self.dialog = Some(Dialog::new(purpose, String::new()));
    }

    pub fn open_rename_dialog(&mut self) {
        let Some(key) = self.selected else {
            self.set_status("Nothing selected");
            return;
        };
        let Some(node) = self.sync.tree().and_then(|tree| tree.node(key)) else {
            self.set_status("Nothing selected");
            return;
        };
        let input = node.title().to_string();
        self.dialog = Some(Dialog::new(DialogPurpose::Rename { key }, input));
    }

    /// Turn the open dialog into a server request.
    ///
    /// A rename resends the node's other attributes unchanged.
    pub fn dialog_request(&self) -> Result<Request, String> {
        let dialog = self.dialog.as_ref().ok_or("No dialog open")?;
        let title = sanitize_title(&dialog.input).ok_or("Title cannot be empty")?;

        match dialog.purpose {
            DialogPurpose::NewGroup { parent } => Ok(Request::Create {
                parent,
                fields: NodeFields::Group(GroupFields::titled(title)),
            }),
            DialogPurpose::NewForum { parent } => Ok(Request::Create {
                parent,
                fields: NodeFields::Forum(ForumFields::titled(title)),
            }),
            DialogPurpose::Rename { key } => {
                let node = self
                    .sync
                    .tree()
                    .and_then(|tree| tree.node(key))
                    .ok_or_else(|| format!("{} no longer exists", key))?;
                Ok(Request::Update {
                    key,
                    fields: rename_fields(node, title),
                })
            }
        }
    }

    // ------------------------------------------------------------------------
    // Status Bar
    // ------------------------------------------------------------------------

    /// Set status message (will auto-expire after 3 seconds)
    pub fn set_status(&mut self, msg: impl Into<Cow<'static, str>>) {
        self.status_message = Some((msg.into(), Instant::now()));
    }

    /// Clear status message if expired (older than 3 seconds)
    /// Returns true if a message was actually cleared
    pub fn clear_expired_status(&mut self) -> bool {
        if let Some((_, time)) = &self.status_message {
            if time.elapsed().as_secs() >= 3 {
                self.status_message = None;
                return true;
            }
        }
        false
    }
}

fn rename_fields(node: &Node, title: String) -> NodeFields {
    match node {
        Node::Group(group) => NodeFields::Group(GroupFields {
            title,
            icon: group.icon.clone(),
            description: group.description.clone(),
        }),
        Node::Forum(forum) => NodeFields::Forum(ForumFields {
            title,
            description: forum.description.clone(),
        }),
    }
}

impl Drop for App {
    fn drop(&mut self) {
        if let Some(handle) = self.request_handle.take() {
            handle.abort();
            tracing::debug!("Aborted request task on App drop");
        }
    }
}

// ============================================================================
// Test Support
// ============================================================================
