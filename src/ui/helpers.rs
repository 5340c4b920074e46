//! Helper functions for UI operations.
//!
//! Starting server requests on background tasks, and turning task panics
//! into events instead of silent task death.

use crate::app::{App, AppEvent};
use forumtree::api::ForumSource;
use forumtree::sync::{Request, SyncError, Ticket};
use futures::FutureExt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tokio::sync::mpsc;

/// Wraps a future to catch panics and convert them to errors.
///
/// # Returns
///
/// - `Ok(result)` if the future completes normally
/// - `Err(panic_message)` if the future panics
pub(super) async fn catch_task_panic<F, T>(future: F) -> Result<T, String>
where
    F: std::future::Future<Output = T>,
{
    AssertUnwindSafe(future)
        .catch_unwind()
        .await
        .map_err(|panic| {
            if let Some(s) = panic.downcast_ref::<&'static str>() {
                s.to_string()
            } else if let Some(s) = panic.downcast_ref::<String>() {
                s.clone()
            } else {
                format!("Unknown panic: {:?}", (*panic).type_id())
            }
        })
}

/// Validate `request` with the coordinator and run it on a background task.
///
/// Any previous request task is aborted first: once a new ticket is issued,
/// its result could only ever be stale.
pub(super) fn start_request(
    app: &mut App,
    request: Request,
    event_tx: &mpsc::Sender<AppEvent>,
) -> Result<Ticket, SyncError> {
    let ticket = app.sync.begin(&request)?;

    if let Some(handle) = app.request_handle.take() {
        handle.abort();
        tracing::debug!("Aborted previous request task");
    }
    app.request_handle = Some(spawn_request(
        app.sync.source(),
        ticket,
        request,
        event_tx.clone(),
    ));
    Ok(ticket)
}

/// Start a full reload. A dialog waiting on a superseded request gets its
/// input back with an error.
pub(super) fn start_load(app: &mut App, event_tx: &mpsc::Sender<AppEvent>) {
    match start_request(app, Request::LoadRoot, event_tx) {
        Ok(_) => {
            if let Some(dialog) = app.dialog.as_mut().filter(|d| d.pending.is_some()) {
                dialog.pending = None;
                dialog.error = Some("Cancelled by reload".to_string());
            }
        }
        Err(e) => app.set_status(format!("Error: {}", e)),
    }
}

/// Run `request` against `source` and report back on `tx`.
///
/// The task never touches the tree; the event loop applies the response.
fn spawn_request(
    source: Arc<dyn ForumSource>,
    ticket: Ticket,
    request: Request,
    tx: mpsc::Sender<AppEvent>,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let tx_panic = tx.clone();
        match catch_task_panic(request.execute(&*source)).await {
            Ok(response) => {
                if let Err(e) = tx.send(AppEvent::SyncFinished { ticket, response }).await {
                    tracing::warn!(error = %e, event = "SyncFinished", "Channel send failed (receiver dropped)");
                }
            }
            Err(panic_msg) => {
                tracing::error!(task = "sync_request", error = %panic_msg, "Background task panicked");
                let _ = tx_panic
                    .send(AppEvent::TaskPanicked {
                        task: "sync_request",
                        ticket,
                        error: panic_msg,
                    })
                    .await;
            }
        }
    })
}
