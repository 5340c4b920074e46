//! End-to-end tests for building, projecting and mutating the hierarchy.
//!
//! The sync tests run the coordinator against the real REST client and a
//! wiremock server, so they cover the JSON contract as well as the tree.

use forumtree::api::{
    ForumFields, ForumPayload, ForumStats, GroupFields, GroupPayload, HttpForumClient, NodeFields,
};
use forumtree::sync::{Phase, SyncCoordinator, SyncError};
use forumtree::tree::{
    build, project, ExpansionState, ForumNode, Node, NodeKey, TreeChange, TreeError,
};
use pretty_assertions::assert_eq;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn forum(id: i64, title: &str) -> ForumPayload {
    ForumPayload {
        id,
        title: title.to_string(),
        description: None,
        group_id: None,
        stat: ForumStats::default(),
    }
}

/// R { Sports { Football }, Welcome }
fn scenario() -> GroupPayload {
    GroupPayload {
        id: 1,
        title: "R".to_string(),
        icon: None,
        description: None,
        parent_id: None,
        forums: vec![forum(11, "Welcome")],
        sub_groups: vec![GroupPayload {
            id: 2,
            title: "Sports".to_string(),
            icon: None,
            description: None,
            parent_id: Some(1),
            forums: vec![forum(10, "Football")],
            sub_groups: vec![],
        }],
    }
}

fn scenario_json() -> serde_json::Value {
    json!({
        "id": 1,
        "title": "R",
        "forums": [{ "id": 11, "title": "Welcome", "groupId": 1,
                     "stat": { "topicCount": 4, "commentCount": 9 } }],
        "subGroups": [{
            "id": 2,
            "title": "Sports",
            "parentId": 1,
            "icon": { "name": "ball", "color": "#00ff00" },
            "forums": [{ "id": 10, "title": "Football", "groupId": 2 }],
            "subGroups": []
        }]
    })
}

fn child_titles(tree: &forumtree::tree::TreeHandle, key: NodeKey) -> Vec<String> {
    tree.get(key)
        .unwrap()
        .children()
        .iter()
        .map(|k| tree.node(*k).unwrap().title().to_string())
        .collect()
}

async fn coordinator_for(server: &MockServer) -> SyncCoordinator {
    let client = HttpForumClient::new(
        reqwest::Client::new(),
        &server.uri(),
        None,
        Duration::from_secs(5),
    )
    .unwrap();
    SyncCoordinator::new(Arc::new(client), 1)
}

// ============================================================================
// Tree Scenarios
// ============================================================================

#[test]
fn test_scenario_sibling_order_after_build_and_insert() {
    let mut tree = build(&scenario()).unwrap();
    assert_eq!(child_titles(&tree, NodeKey::group(1)), vec!["Sports", "Welcome"]);

    let mut expansion = ExpansionState::new();
    tree.apply(
        TreeChange::Insert {
            parent: NodeKey::group(1),
            node: Node::Forum(ForumNode {
                id: 12,
                title: "Announcements".to_string(),
                description: None,
                stats: ForumStats::default(),
            }),
        },
        &mut expansion,
    )
    .unwrap();

    assert_eq!(
        child_titles(&tree, NodeKey::group(1)),
        vec!["Sports", "Announcements", "Welcome"]
    );

    // The parent was expanded by the insert, so the new row is visible once
    let rows: Vec<_> = project(&tree, &expansion)
        .filter(|row| row.key == NodeKey::forum(12))
        .collect();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].depth, 1);
}

#[test]
fn test_remove_root_fails_and_leaves_tree() {
    let mut tree = build(&scenario()).unwrap();
    let before = tree.clone();

    let err = tree.remove_node(NodeKey::group(1)).unwrap_err();
    assert!(matches!(err, TreeError::Invariant(_)));
    assert_eq!(tree, before);
}

// ============================================================================
// Sync Scenarios
// ============================================================================

#[tokio::test]
async fn test_load_over_http_and_project() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/forum-groups/root"))
        .respond_with(ResponseTemplate::new(200).set_body_json(scenario_json()))
        .mount(&server)
        .await;

    let mut sync = coordinator_for(&server).await;
    sync.load_root().await.unwrap();

    let lines: Vec<_> = sync
        .display_rows()
        .iter()
        .map(|row| row.to_plain_line())
        .collect();
    assert_eq!(lines, vec!["v R", "  > Sports", "    Welcome [4 topics]"]);
}

#[tokio::test]
async fn test_transport_error_fails_without_integrity_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/forum-groups/root"))
        .respond_with(ResponseTemplate::new(502))
        .mount(&server)
        .await;

    let mut sync = coordinator_for(&server).await;
    let err = sync.load_root().await.unwrap_err();

    assert!(matches!(err, SyncError::Api(_)));
    assert!(matches!(sync.phase(), Phase::Failed(_)));
    assert!(sync.display_rows().is_empty());
}

#[tokio::test]
async fn test_create_under_vanished_parent_is_not_found() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/forum-groups/root"))
        .respond_with(ResponseTemplate::new(200).set_body_json(scenario_json()))
        .mount(&server)
        .await;
    // The server still knows group 77 even though this client never saw it
    Mock::given(method("POST"))
        .and(path("/forum-groups/77/groups"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "id": 300, "title": "Chess", "parentId": 77
        })))
        .mount(&server)
        .await;

    let mut sync = coordinator_for(&server).await;
    sync.load_root().await.unwrap();
    let before = sync.tree().cloned();

    let err = sync
        .create_under(NodeKey::group(77), NodeFields::Group(GroupFields::titled("Chess")))
        .await
        .unwrap_err();

    assert!(matches!(err, SyncError::Tree(TreeError::NotFound(_))));
    assert_eq!(sync.tree().cloned(), before);
    assert_eq!(sync.phase(), Phase::Ready);
}

#[tokio::test]
async fn test_create_forum_round_trip() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/forum-groups/root"))
        .respond_with(ResponseTemplate::new(200).set_body_json(scenario_json()))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/forum-groups/1/forums"))
        .and(body_partial_json(json!({ "title": "Announcements" })))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "id": 12, "title": "Announcements", "groupId": 1
        })))
        .expect(1)
        .mount(&server)
        .await;

    let mut sync = coordinator_for(&server).await;
    sync.load_root().await.unwrap();
    sync.create_under(
        NodeKey::group(1),
        NodeFields::Forum(ForumFields::titled("Announcements")),
    )
    .await
    .unwrap();

    assert_eq!(
        child_titles(sync.tree().unwrap(), NodeKey::group(1)),
        vec!["Sports", "Announcements", "Welcome"]
    );
}

#[tokio::test]
async fn test_update_distinguishes_null_from_absent() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/forum-groups/root"))
        .respond_with(ResponseTemplate::new(200).set_body_json(scenario_json()))
        .mount(&server)
        .await;
    // icon explicitly cleared, description absent (left alone)
    Mock::given(method("PUT"))
        .and(path("/forum-groups/2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": 2, "title": "Games", "icon": null
        })))
        .mount(&server)
        .await;

    let mut sync = coordinator_for(&server).await;
    sync.load_root().await.unwrap();
    sync.update_existing(NodeKey::group(2), NodeFields::Group(GroupFields::titled("Games")))
        .await
        .unwrap();

    let tree = sync.tree().unwrap();
    let Some(Node::Group(group)) = tree.node(NodeKey::group(2)) else {
        panic!("group 2 missing");
    };
    assert_eq!(group.title, "Games");
    assert_eq!(group.icon, None);
    assert_eq!(tree.get(NodeKey::group(2)).unwrap().parent(), Some(NodeKey::group(1)));
    assert_eq!(tree.get(NodeKey::group(2)).unwrap().children(), &[NodeKey::forum(10)]);
}

#[tokio::test]
async fn test_failed_update_keeps_tree() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/forum-groups/root"))
        .respond_with(ResponseTemplate::new(200).set_body_json(scenario_json()))
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .and(path("/forums/10"))
        .respond_with(ResponseTemplate::new(409))
        .mount(&server)
        .await;

    let mut sync = coordinator_for(&server).await;
    sync.load_root().await.unwrap();
    let before = sync.tree().cloned();

    let err = sync
        .update_existing(NodeKey::forum(10), NodeFields::Forum(ForumFields::titled("Soccer")))
        .await
        .unwrap_err();

    assert!(err.to_string().contains("409"));
    assert_eq!(sync.tree().cloned(), before);
    assert!(sync.status().last_error.is_some());
}
