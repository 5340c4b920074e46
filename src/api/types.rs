use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

// ============================================================================
// Shared Attributes
// ============================================================================

/// Icon shown next to a forum group: a symbolic name plus a display color.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Icon {
    pub name: String,
    pub color: String,
}

/// Activity counters the server keeps per forum.
///
/// Carried opaquely by the tree; only the renderer looks inside.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ForumStats {
    pub topic_count: u64,
    pub comment_count: u64,
    pub last_activity: Option<DateTime<Utc>>,
}

// ============================================================================
// Hierarchy Payloads
// ============================================================================

/// A forum group as delivered by the server, with its full subtree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupPayload {
    pub id: i64,
    pub title: String,
    #[serde(default)]
    pub icon: Option<Icon>,
    #[serde(default)]
    pub description: Option<String>,
    /// Id of the enclosing group, when the server states it.
    #[serde(default)]
    pub parent_id: Option<i64>,
    #[serde(default)]
    pub forums: Vec<ForumPayload>,
    #[serde(default)]
    pub sub_groups: Vec<GroupPayload>,
}

/// A forum (leaf item) as delivered by the server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ForumPayload {
    pub id: i64,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    /// Id of the enclosing group, when the server states it.
    #[serde(default)]
    pub group_id: Option<i64>,
    #[serde(default)]
    pub stat: ForumStats,
}

impl GroupPayload {
    /// Total number of groups and forums in this payload, including itself.
    pub fn entity_count(&self) -> usize {
        1 + self.forums.len()
            + self
                .sub_groups
                .iter()
                .map(GroupPayload::entity_count)
                .sum::<usize>()
    }
}

// ============================================================================
// Request Bodies
// ============================================================================

/// Editable attributes of a forum group, sent on create and update.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupFields {
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub icon: Option<Icon>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Editable attributes of a forum, sent on create and update.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ForumFields {
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl GroupFields {
    pub fn titled(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            icon: None,
            description: None,
        }
    }
}

impl ForumFields {
    pub fn titled(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            description: None,
        }
    }
}

/// Fields for a create or update request, tagged with the node kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeFields {
    Group(GroupFields),
    Forum(ForumFields),
}

impl NodeFields {
    pub fn title(&self) -> &str {
        match self {
            NodeFields::Group(fields) => &fields.title,
            NodeFields::Forum(fields) => &fields.title,
        }
    }
}

// ============================================================================
// Update Responses
// ============================================================================

/// Three-state field in an update response.
///
/// A field missing from the JSON object leaves the client copy alone, an
/// explicit `null` clears it, and a value replaces it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum FieldPatch<T> {
    #[default]
    Unchanged,
    Clear,
    Set(T),
}

impl<T> FieldPatch<T> {
    /// Merge this patch into an optional attribute.
    pub fn apply_to(self, slot: &mut Option<T>) {
        match self {
            FieldPatch::Unchanged => {}
            FieldPatch::Clear => *slot = None,
            FieldPatch::Set(value) => *slot = Some(value),
        }
    }
}

// Only reached when the key is present (absent keys use `#[serde(default)]`),
// so `None` here always means an explicit null.
impl<'de, T: Deserialize<'de>> Deserialize<'de> for FieldPatch<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Ok(match Option::<T>::deserialize(deserializer)? {
            Some(value) => FieldPatch::Set(value),
            None => FieldPatch::Clear,
        })
    }
}

/// Server response to a group update.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupPatch {
    #[serde(default)]
    pub id: Option<i64>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub icon: FieldPatch<Icon>,
    #[serde(default)]
    pub description: FieldPatch<String>,
}

/// Server response to a forum update.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ForumPatch {
    #[serde(default)]
    pub id: Option<i64>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: FieldPatch<String>,
    #[serde(default)]
    pub stat: Option<ForumStats>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_hierarchy_payload_decodes_camel_case() {
        let json = r##"{
            "id": 1,
            "title": "Root",
            "subGroups": [
                {"id": 2, "title": "Sports", "parentId": 1, "icon": {"name": "ball", "color": "#0a0"},
                 "forums": [{"id": 7, "title": "Football", "groupId": 2,
                             "stat": {"topicCount": 3, "commentCount": 12}}]}
            ],
            "forums": [{"id": 8, "title": "Welcome"}]
        }"##;

        let payload: GroupPayload = serde_json::from_str(json).unwrap();
        assert_eq!(payload.entity_count(), 4);
        assert_eq!(payload.sub_groups[0].parent_id, Some(1));
        assert_eq!(
            payload.sub_groups[0].icon,
            Some(Icon {
                name: "ball".to_string(),
                color: "#0a0".to_string()
            })
        );
        assert_eq!(payload.sub_groups[0].forums[0].stat.comment_count, 12);
        assert_eq!(payload.forums[0].stat, ForumStats::default());
    }

    #[test]
    fn test_group_patch_distinguishes_null_from_absent() {
        let patch: GroupPatch =
            serde_json::from_str(r#"{"title": "Renamed", "icon": null}"#).unwrap();
        assert_eq!(patch.title.as_deref(), Some("Renamed"));
        assert_eq!(patch.icon, FieldPatch::Clear);
        assert_eq!(patch.description, FieldPatch::Unchanged);
    }

    #[test]
    fn test_field_patch_apply() {
        let mut slot = Some("old".to_string());
        FieldPatch::Unchanged.apply_to(&mut slot);
        assert_eq!(slot.as_deref(), Some("old"));

        FieldPatch::Set("new".to_string()).apply_to(&mut slot);
        assert_eq!(slot.as_deref(), Some("new"));

        FieldPatch::Clear.apply_to(&mut slot);
        assert_eq!(slot, None);
    }

    #[test]
    fn test_fields_skip_empty_optionals() {
        let body = serde_json::to_string(&GroupFields::titled("News")).unwrap();
        assert_eq!(body, r#"{"title":"News"}"#);

        let body = serde_json::to_string(&ForumFields {
            title: "Rust".to_string(),
            description: Some("All things Rust".to_string()),
        })
        .unwrap();
        assert_eq!(body, r#"{"title":"Rust","description":"All things Rust"}"#);
    }
}
