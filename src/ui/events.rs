//! Application event handling.
//!
//! Applies the results of background server requests to the coordinator and
//! reflects the outcome in the dialog, the selection, or the status bar.

use crate::app::{App, AppEvent};
use forumtree::sync::{Phase, SyncError, SyncOutcome, Ticket};

/// Handle application events from background tasks.
pub(super) fn handle_app_event(app: &mut App, event: AppEvent) {
    match event {
        AppEvent::SyncFinished { ticket, response } => {
            let result = app.sync.finish(ticket, response);
            handle_sync_result(app, ticket, result);
        }
        AppEvent::TaskPanicked {
            task,
            ticket,
            error,
        } => {
            tracing::error!(task, error = %error, "Background task panicked");
            app.sync.abandon(ticket);
            let message = format!("Internal error in {} task", task);
            match app.dialog.as_mut().filter(|d| d.pending == Some(ticket)) {
                Some(dialog) => {
                    dialog.pending = None;
                    dialog.error = Some(message);
                }
                None => app.set_status(message),
            }
            app.clamp_selection();
        }
    }
}

fn handle_sync_result(app: &mut App, ticket: Ticket, result: Result<SyncOutcome, SyncError>) {
    if let Err(SyncError::Stale) = result {
        tracing::debug!(?ticket, "Ignoring result of superseded request");
        return;
    }

    let from_dialog = app
        .dialog
        .as_ref()
        .is_some_and(|d| d.pending == Some(ticket));

    match result {
        Ok(SyncOutcome::Loaded { nodes }) => {
            app.clamp_selection();
            app.set_status(format!("Loaded {} groups and forums", nodes));
        }
        Ok(SyncOutcome::Created(key) | SyncOutcome::Updated(key)) => {
            if from_dialog {
                app.dialog = None;
            }
            app.selected = Some(key);
            app.clamp_selection();
            let title = app
                .sync
                .tree()
                .and_then(|tree| tree.node(key))
                .map(|node| node.title().to_string())
                .unwrap_or_default();
            tracing::info!(%key, title = %title, "Saved node");
            app.set_status(format!("Saved \"{}\"", title));
        }
        Err(e) => {
            if from_dialog {
                if let Some(dialog) = app.dialog.as_mut() {
                    dialog.pending = None;
                    dialog.error = Some(e.to_string());
                }
            } else if matches!(app.sync.phase(), Phase::Failed(_)) {
                app.clamp_selection();
                app.set_status(format!("Load failed: {} (press r to retry)", e));
            } else {
                app.set_status(format!("Error: {}", e));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::testing::loaded_app;
    use crate::app::DialogPurpose;
    use crate::ui::helpers::start_load;
    use forumtree::sync::Request;
    use forumtree::tree::{NodeKey, NodeKind};
    use std::sync::atomic::Ordering;
    use tokio::sync::mpsc;

    /// Submit the open dialog the way the input handler does, then run the
    /// request inline and deliver its event.
    async fn submit_dialog(app: &mut App) {
        let request = app.dialog_request().unwrap();
        let ticket = app.sync.begin(&request).unwrap();
        app.dialog.as_mut().unwrap().pending = Some(ticket);
        let response = request.execute(&*app.sync.source()).await;
        handle_app_event(app, AppEvent::SyncFinished { ticket, response });
    }

    #[tokio::test]
    async fn test_successful_create_closes_dialog_and_selects() {
        let (mut app, _) = loaded_app().await;
        app.open_create_dialog(NodeKind::Forum);
        app.dialog.as_mut().unwrap().input = "Announcements".to_string();

        submit_dialog(&mut app).await;

        assert!(app.dialog.is_none());
        assert_eq!(app.selected, Some(NodeKey::forum(100)));
        assert_eq!(app.selected_index(), 2);
    }

    #[tokio::test]
    async fn test_failed_create_keeps_typed_input() {
        let (mut app, source) = loaded_app().await;
        app.open_create_dialog(NodeKind::Group);
        app.dialog.as_mut().unwrap().input = "Games".to_string();
        source.fail.store(true, Ordering::SeqCst);

        submit_dialog(&mut app).await;

        let dialog = app.dialog.as_ref().unwrap();
        assert_eq!(dialog.input, "Games");
        assert_eq!(dialog.purpose, DialogPurpose::NewGroup { parent: NodeKey::group(1) });
        assert!(dialog.pending.is_none());
        assert!(dialog.error.as_deref().unwrap().contains("500"));
    }

    #[tokio::test]
    async fn test_failed_reload_offers_retry() {
        let (mut app, source) = loaded_app().await;
        source.fail.store(true, Ordering::SeqCst);

        let ticket = app.sync.begin(&Request::LoadRoot).unwrap();
        let response = Request::LoadRoot.execute(&*app.sync.source()).await;
        handle_app_event(&mut app, AppEvent::SyncFinished { ticket, response });

        assert!(app.selected.is_none());
        let (message, _) = app.status_message.as_ref().unwrap();
        assert!(message.contains("press r to retry"));
    }

    #[tokio::test]
    async fn test_stale_result_ignored() {
        let (mut app, _) = loaded_app().await;
        let (tx, _rx) = mpsc::channel(4);
        app.open_rename_dialog();
        app.dialog.as_mut().unwrap().input = "Root".to_string();

        let request = app.dialog_request().unwrap();
        let ticket = app.sync.begin(&request).unwrap();
        app.dialog.as_mut().unwrap().pending = Some(ticket);
        let response = request.execute(&*app.sync.source()).await;

        start_load(&mut app, &tx);
        assert_eq!(
            app.dialog.as_ref().unwrap().error.as_deref(),
            Some("Cancelled by reload")
        );

        handle_app_event(&mut app, AppEvent::SyncFinished { ticket, response });
        assert_eq!(
            app.sync.tree().unwrap().node(NodeKey::group(1)).unwrap().title(),
            "R"
        );
        assert!(app.dialog.is_some());
    }

    #[tokio::test]
    async fn test_panicked_task_releases_dialog() {
        let (mut app, _) = loaded_app().await;
        app.open_create_dialog(NodeKind::Forum);
        app.dialog.as_mut().unwrap().input = "Chess".to_string();
        let request = app.dialog_request().unwrap();
        let ticket = app.sync.begin(&request).unwrap();
        app.dialog.as_mut().unwrap().pending = Some(ticket);

        handle_app_event(
            &mut app,
            AppEvent::TaskPanicked {
                task: "sync_request",
                ticket,
                error: "boom".to_string(),
            },
        );

        assert_eq!(app.sync.phase(), Phase::Ready);
        let dialog = app.dialog.as_ref().unwrap();
        assert!(dialog.pending.is_none());
        assert_eq!(dialog.input, "Chess");
    }
}
