use std::sync::Arc;

use thiserror::Error;
use tokio::sync::watch;

use crate::api::{ApiError, ForumSource, GroupPayload, NodeFields};
use crate::tree::{
    self, project, DisplayRow, ExpansionState, Node, NodeKey, NodeKind, NodePatch, TreeChange,
    TreeError, TreeHandle, MAX_TREE_DEPTH,
};

// ============================================================================
// Status
// ============================================================================

/// Lifecycle of the tree owned by a [`SyncCoordinator`].
///
/// `Idle -> Loading -> {Ready, Failed}`, and `Ready -> Mutating -> Ready`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Phase {
    #[default]
    Idle,
    Loading,
    Ready,
    Mutating,
    /// The last load failed; the message is user-presentable.
    Failed(String),
}

impl Phase {
    /// A request is in flight.
    pub fn is_busy(&self) -> bool {
        matches!(self, Phase::Loading | Phase::Mutating)
    }

    pub fn label(&self) -> &'static str {
        match self {
            Phase::Idle => "idle",
            Phase::Loading => "loading",
            Phase::Ready => "ready",
            Phase::Mutating => "saving",
            Phase::Failed(_) => "failed",
        }
    }
}

/// Snapshot published to subscribers after every transition.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncStatus {
    pub phase: Phase,
    /// Error of the most recent failed operation, cleared by the next success.
    pub last_error: Option<String>,
    /// Bumped whenever the tree is replaced or changed.
    pub revision: u64,
}

// ============================================================================
// Errors
// ============================================================================

#[derive(Debug, Error)]
pub enum SyncError {
    #[error(transparent)]
    Api(#[from] ApiError),
    #[error(transparent)]
    Tree(#[from] TreeError),
    #[error("The hierarchy has not been loaded")]
    NotReady,
    #[error("Another request is still in progress")]
    Busy,
    /// The result belongs to a request that was abandoned or superseded.
    #[error("Discarded result of a superseded request")]
    Stale,
}

// ============================================================================
// Requests
// ============================================================================

/// Identifies one in-flight request.
///
/// `epoch` changes with every full load, so a mutation ticket issued against
/// an older tree can never match again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Ticket {
    epoch: u64,
    seq: u64,
}

/// A server round-trip the coordinator knows how to fold into the tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Request {
    LoadRoot,
    /// Create a group or forum (per `fields`) under the group `parent`.
    Create { parent: NodeKey, fields: NodeFields },
    Update { key: NodeKey, fields: NodeFields },
}

/// Raw outcome of a [`Request`], not yet applied.
#[derive(Debug)]
pub enum Response {
    Loaded(Result<GroupPayload, ApiError>),
    Created {
        parent: NodeKey,
        result: Result<Node, ApiError>,
    },
    Updated {
        key: NodeKey,
        result: Result<NodePatch, ApiError>,
    },
}

impl Request {
    /// Run the request against `source`. Never touches a tree.
    pub async fn execute(self, source: &dyn ForumSource) -> Response {
        match self {
            Request::LoadRoot => Response::Loaded(source.fetch_root_hierarchy().await),
            Request::Create {
                parent,
                fields: NodeFields::Group(fields),
            } => Response::Created {
                parent,
                result: source
                    .create_group(parent.id(), &fields)
                    .await
                    .map(|payload| Node::from(&payload)),
            },
            Request::Create {
                parent,
                fields: NodeFields::Forum(fields),
            } => Response::Created {
                parent,
                result: source
                    .create_forum(parent.id(), &fields)
                    .await
                    .map(|payload| Node::from(&payload)),
            },
            Request::Update {
                key,
                fields: NodeFields::Group(fields),
            } => Response::Updated {
                key,
                result: source
                    .update_group(key.id(), &fields)
                    .await
                    .map(NodePatch::Group),
            },
            Request::Update {
                key,
                fields: NodeFields::Forum(fields),
            } => Response::Updated {
                key,
                result: source
                    .update_forum(key.id(), &fields)
                    .await
                    .map(NodePatch::Forum),
            },
        }
    }

    fn describe(&self) -> String {
        match self {
            Request::LoadRoot => "load".to_string(),
            Request::Create { parent, fields } => format!("create under {}: {}", parent, fields.title()),
            Request::Update { key, fields } => format!("update {}: {}", key, fields.title()),
        }
    }
}

/// What a successfully applied [`Response`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncOutcome {
    Loaded { nodes: usize },
    Created(NodeKey),
    Updated(NodeKey),
}

// ============================================================================
// Coordinator
// ============================================================================

/// Single owner of a hierarchy tree and its expansion state.
///
/// Operations come in two halves: [`begin`](Self::begin) validates and hands
/// out a [`Ticket`], [`finish`](Self::finish) applies the [`Response`]. The
/// terminal UI runs the request in between on a background task; the async
/// helpers ([`load_root`](Self::load_root) and friends) chain all three
/// inline. At most one request is pending. A new load supersedes a pending
/// request, whose late result is then rejected as [`SyncError::Stale`].
pub struct SyncCoordinator {
    source: Arc<dyn ForumSource>,
    tree: Option<TreeHandle>,
    expansion: ExpansionState,
    initial_depth: usize,
    epoch: u64,
    next_seq: u64,
    pending: Option<Ticket>,
    /// Phase to go back to if the pending request is abandoned.
    resume_phase: Phase,
    status: watch::Sender<SyncStatus>,
}

impl SyncCoordinator {
    /// The first tree to load shows `initial_depth` levels below the root;
    /// 0 leaves even the root collapsed.
    pub fn new(source: Arc<dyn ForumSource>, initial_depth: usize) -> Self {
        let (status, _) = watch::channel(SyncStatus::default());
        Self {
            source,
            tree: None,
            expansion: ExpansionState::new(),
            initial_depth,
            epoch: 0,
            next_seq: 0,
            pending: None,
            resume_phase: Phase::Idle,
            status,
        }
    }

    pub fn source(&self) -> Arc<dyn ForumSource> {
        Arc::clone(&self.source)
    }

    pub fn tree(&self) -> Option<&TreeHandle> {
        self.tree.as_ref()
    }

    pub fn expansion(&self) -> &ExpansionState {
        &self.expansion
    }

    pub fn status(&self) -> SyncStatus {
        self.status.borrow().clone()
    }

    pub fn phase(&self) -> Phase {
        self.status.borrow().phase.clone()
    }

    /// Receive every status change from now on.
    pub fn subscribe(&self) -> watch::Receiver<SyncStatus> {
        self.status.subscribe()
    }

    /// Visible rows, root first. Empty until a load succeeds and after a
    /// failed one.
    pub fn display_rows(&self) -> Vec<DisplayRow<'_>> {
        match &self.tree {
            Some(tree) => project(tree, &self.expansion).collect(),
            None => Vec::new(),
        }
    }

    /// Flip a node open or closed. Returns true if it is now expanded;
    /// unknown keys are ignored.
    pub fn toggle_expanded(&mut self, key: NodeKey) -> bool {
        match &self.tree {
            Some(tree) if tree.contains(key) => self.expansion.toggle(key),
            _ => false,
        }
    }

    /// Expand every group in the tree.
    pub fn expand_all(&mut self) {
        if let Some(tree) = &self.tree {
            self.expansion.expand_from_root(tree, MAX_TREE_DEPTH);
        }
    }

    // ------------------------------------------------------------------------
    // Async helpers
    // ------------------------------------------------------------------------

    /// Fetch the whole hierarchy and replace the tree with it.
    pub async fn load_root(&mut self) -> Result<SyncOutcome, SyncError> {
        self.run(Request::LoadRoot).await
    }

    /// Create a group or forum under `parent` and insert the server's copy.
    pub async fn create_under(
        &mut self,
        parent: NodeKey,
        fields: NodeFields,
    ) -> Result<SyncOutcome, SyncError> {
        self.run(Request::Create { parent, fields }).await
    }

    /// Send new attributes for `key` and merge the server's answer.
    pub async fn update_existing(
        &mut self,
        key: NodeKey,
        fields: NodeFields,
    ) -> Result<SyncOutcome, SyncError> {
        self.run(Request::Update { key, fields }).await
    }

    async fn run(&mut self, request: Request) -> Result<SyncOutcome, SyncError> {
        let ticket = self.begin(&request)?;
        let source = self.source();
        let response = request.execute(&*source).await;
        self.finish(ticket, response)
    }

    // ------------------------------------------------------------------------
    // Two-phase API
    // ------------------------------------------------------------------------

    /// Validate `request` against the current state and mark it in flight.
    ///
    /// # Errors
    ///
    /// - [`SyncError::NotReady`] for a mutation before any tree is loaded
    /// - [`SyncError::Busy`] for a mutation while another request is pending
    /// - [`SyncError::Tree`] with [`TreeError::Invariant`] when the request can
    ///   never succeed locally (creating under a forum, kind mismatch)
    pub fn begin(&mut self, request: &Request) -> Result<Ticket, SyncError> {
        match request {
            Request::LoadRoot => {
                if let Some(superseded) = self.pending.take() {
                    tracing::debug!(?superseded, "Load supersedes pending request");
                }
                self.epoch += 1;
                let ticket = self.issue();
                tracing::info!(epoch = self.epoch, "Loading hierarchy");
                self.publish(|status| status.phase = Phase::Loading);
                Ok(ticket)
            }
            Request::Create { parent, .. } => {
                self.check_can_mutate()?;
                if parent.kind() != NodeKind::Group {
                    return Err(TreeError::Invariant(format!(
                        "{} is a forum and cannot hold children",
                        parent
                    ))
                    .into());
                }
                Ok(self.start_mutation(request))
            }
            Request::Update { key, fields } => {
                self.check_can_mutate()?;
                let fields_kind = match fields {
                    NodeFields::Group(_) => NodeKind::Group,
                    NodeFields::Forum(_) => NodeKind::Forum,
                };
                if fields_kind != key.kind() {
                    return Err(TreeError::Invariant(format!(
                        "cannot update {} with {} fields",
                        key, fields_kind
                    ))
                    .into());
                }
                Ok(self.start_mutation(request))
            }
        }
    }

    /// Apply the result of the request `ticket` was issued for.
    ///
    /// A failed load discards the tree and enters [`Phase::Failed`]. A failed
    /// mutation leaves the tree exactly as it was and returns to
    /// [`Phase::Ready`] with `last_error` set.
    ///
    /// # Errors
    ///
    /// [`SyncError::Stale`] if the ticket is no longer the pending one; the
    /// response is dropped and nothing changes. Otherwise the API or tree
    /// error that made the operation fail.
    pub fn finish(&mut self, ticket: Ticket, response: Response) -> Result<SyncOutcome, SyncError> {
        if self.pending != Some(ticket) {
            tracing::debug!(
                ?ticket,
                pending = ?self.pending,
                "Discarding stale response"
            );
            return Err(SyncError::Stale);
        }
        self.pending = None;

        match response {
            Response::Loaded(Ok(payload)) => self.finish_load(&payload),
            Response::Loaded(Err(e)) => {
                self.fail_load(e.to_string());
                Err(e.into())
            }
            Response::Created { parent, result } => {
                let result = result.map_err(SyncError::from).and_then(|node| {
                    self.apply_change(TreeChange::Insert { parent, node })
                        .map(SyncOutcome::Created)
                });
                self.finish_mutation(result)
            }
            Response::Updated { key, result } => {
                let result = result.map_err(SyncError::from).and_then(|patch| {
                    self.apply_change(TreeChange::Update { key, patch })
                        .map(SyncOutcome::Updated)
                });
                self.finish_mutation(result)
            }
        }
    }

    /// Give up on a pending request, e.g. because its task died.
    ///
    /// A late [`finish`](Self::finish) with the same ticket is then rejected
    /// as stale.
    pub fn abandon(&mut self, ticket: Ticket) {
        if self.pending != Some(ticket) {
            return;
        }
        self.pending = None;
        let phase = self.resume_phase.clone();
        tracing::warn!(?ticket, phase = phase.label(), "Abandoned pending request");
        self.publish(|status| status.phase = phase);
    }

    // ------------------------------------------------------------------------
    // Internals
    // ------------------------------------------------------------------------

    fn issue(&mut self) -> Ticket {
        // A load superseding a mutation resumes where the mutation started
        let current = self.phase();
        if !current.is_busy() {
            self.resume_phase = current;
        }
        self.next_seq += 1;
        let ticket = Ticket {
            epoch: self.epoch,
            seq: self.next_seq,
        };
        self.pending = Some(ticket);
        ticket
    }

    fn check_can_mutate(&self) -> Result<(), SyncError> {
        if self.pending.is_some() {
            return Err(SyncError::Busy);
        }
        if self.tree.is_none() {
            return Err(SyncError::NotReady);
        }
        Ok(())
    }

    fn start_mutation(&mut self, request: &Request) -> Ticket {
        let ticket = self.issue();
        tracing::info!(request = %request.describe(), "Sending change to server");
        self.publish(|status| status.phase = Phase::Mutating);
        ticket
    }

    fn finish_load(&mut self, payload: &GroupPayload) -> Result<SyncOutcome, SyncError> {
        let tree = match tree::build(payload) {
            Ok(tree) => tree,
            Err(e) => {
                self.fail_load(e.to_string());
                return Err(e.into());
            }
        };

        if self.tree.is_some() {
            self.expansion.prune(&tree);
        } else if let Some(max_depth) = self.initial_depth.checked_sub(1) {
            // Showing N levels below the root means expanding the N levels above them
            self.expansion.expand_from_root(&tree, max_depth);
        }
        let nodes = tree.len();
        self.tree = Some(tree);

        tracing::info!(nodes, "Hierarchy loaded");
        self.publish(|status| {
            status.phase = Phase::Ready;
            status.last_error = None;
            status.revision += 1;
        });
        Ok(SyncOutcome::Loaded { nodes })
    }

    fn fail_load(&mut self, message: String) {
        tracing::error!(error = %message, "Hierarchy load failed");
        let discarded = self.tree.take().is_some();
        self.expansion = ExpansionState::new();
        self.publish(|status| {
            status.phase = Phase::Failed(message.clone());
            status.last_error = Some(message);
            if discarded {
                status.revision += 1;
            }
        });
    }

    fn apply_change(&mut self, change: TreeChange) -> Result<NodeKey, SyncError> {
        let tree = self.tree.as_mut().ok_or(SyncError::NotReady)?;
        Ok(tree.apply(change, &mut self.expansion)?)
    }

    fn finish_mutation(
        &mut self,
        result: Result<SyncOutcome, SyncError>,
    ) -> Result<SyncOutcome, SyncError> {
        match &result {
            Ok(outcome) => {
                tracing::info!(?outcome, "Change applied");
                self.publish(|status| {
                    status.phase = Phase::Ready;
                    status.last_error = None;
                    status.revision += 1;
                });
            }
            Err(e) => {
                tracing::warn!(error = %e, "Change failed, tree left untouched");
                let message = e.to_string();
                self.publish(|status| {
                    status.phase = Phase::Ready;
                    status.last_error = Some(message);
                });
            }
        }
        result
    }

    fn publish(&self, update: impl FnOnce(&mut SyncStatus)) {
        self.status.send_modify(update);
    }
}
