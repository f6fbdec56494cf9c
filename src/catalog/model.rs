use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

pub const RESOURCES_TABLE: &str = "resources";
pub const TEACHING_TABLE: &str = "teaching_resources";

/// How a catalog entry is opened
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceType {
    /// In-app routed view
    React,
    /// Externally hosted static document
    Html,
}

impl fmt::Display for ResourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResourceType::React => write!(f, "react"),
            ResourceType::Html => write!(f, "html"),
        }
    }
}

/// One row of the `resources` table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Resource {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub grade: String,
    /// Cover image URL
    #[serde(default)]
    pub image_url: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub file_path: Option<String>,
    #[serde(default)]
    pub route_path: Option<String>,
    pub resource_type: ResourceType,
    #[serde(default)]
    pub created_at: DateTime<Utc>,
}

impl Resource {
    /// Has somewhere to go when opened
    pub fn is_launchable(&self) -> bool {
        self.route_path.as_deref().is_some_and(|p| !p.is_empty())
            || self.file_path.as_deref().is_some_and(|p| !p.is_empty())
    }

    /// In-app link that opens this entry
    pub fn launch_target(&self) -> String {
        match self.resource_type {
            ResourceType::Html => {
                let file_path = self.file_path.as_deref().unwrap_or_default();
                let document_url = if file_path.starts_with("http") {
                    file_path.to_string()
                } else {
                    format!("/ai-apps/{file_path}")
                };
                let query: String = url::form_urlencoded::Serializer::new(String::new())
                    .append_pair("url", &document_url)
                    .append_pair("title", &self.title)
                    .finish();
                format!("/view?{query}")
            }
            ResourceType::React => self
                .route_path
                .clone()
                .filter(|p| !p.is_empty())
                .unwrap_or_else(|| "#".to_string()),
        }
    }
}

/// Insert payload for `resources`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewResource {
    pub title: String,
    pub category: String,
    pub grade: String,
    pub image_url: String,
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub route_path: Option<String>,
    pub resource_type: ResourceType,
}

/// Partial update for `resources`; unset fields are left alone
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResourcePatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub grade: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
}

impl ResourcePatch {
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.description.is_none()
            && self.category.is_none()
            && self.grade.is_none()
            && self.image_url.is_none()
    }
}

/// Named bucket grouping teaching documents
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Zone {
    Standard,
    Textbook,
    Plan,
    Courseware,
}

impl Zone {
    pub const ALL: [Zone; 4] = [Zone::Standard, Zone::Textbook, Zone::Plan, Zone::Courseware];

    pub fn id(&self) -> &'static str {
        match self {
            Zone::Standard => "standard",
            Zone::Textbook => "textbook",
            Zone::Plan => "plan",
            Zone::Courseware => "courseware",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Zone::Standard => "课标",
            Zone::Textbook => "课本",
            Zone::Plan => "教案",
            Zone::Courseware => "课件",
        }
    }

    /// Accepts either the id or the display label
    pub fn parse(value: &str) -> Option<Zone> {
        let value = value.trim();
        Zone::ALL
            .into_iter()
            .find(|zone| zone.id().eq_ignore_ascii_case(value) || zone.label() == value)
    }
}

impl fmt::Display for Zone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// One row of the `teaching_resources` table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TeachingResource {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub zone: Zone,
    pub file_url: String,
    /// File extension without the dot, e.g. `pdf`
    #[serde(default)]
    pub file_type: String,
    #[serde(default)]
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewTeachingResource {
    pub title: String,
    pub description: String,
    pub zone: Zone,
    pub file_url: String,
    pub file_type: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TeachingPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub zone: Option<Zone>,
}

impl TeachingPatch {
    pub fn is_empty(&self) -> bool {
        self.title.is_none() && self.description.is_none() && self.zone.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_resource() -> Resource {
        serde_json::from_str(
            r#"{
                "id": "42",
                "title": "分数墙",
                "category": "数与代数",
                "grade": "三年级",
                "image_url": "https://demo.supabase.co/storage/v1/object/public/ai-apps/images/a.webp",
                "description": "认识分数",
                "file_path": "apps/fraction.html",
                "route_path": null,
                "resource_type": "html",
                "created_at": "2024-09-01T08:00:00+00:00"
            }"#,
        )
        .unwrap()
    }

    #[test]
    fn test_deserialize_row() {
        let resource = sample_resource();
        assert_eq!(resource.resource_type, ResourceType::Html);
        assert_eq!(resource.grade, "三年级");
        assert!(resource.is_launchable());
    }

    #[test]
    fn test_html_launch_target_encodes_parameters() {
        let resource = sample_resource();
        let target = resource.launch_target();
        assert!(target.starts_with("/view?url=%2Fai-apps%2Fapps%2Ffraction.html&title="));
        assert!(target.contains("%E5%88%86%E6%95%B0%E5%A2%99"));
    }

    #[test]
    fn test_html_launch_target_keeps_absolute_url() {
        let mut resource = sample_resource();
        resource.file_path = Some("https://cdn.example.com/x.html".to_string());
        assert!(
            resource
                .launch_target()
                .starts_with("/view?url=https%3A%2F%2Fcdn.example.com%2Fx.html")
        );
    }

    #[test]
    fn test_react_launch_target() {
        let mut resource = sample_resource();
        resource.resource_type = ResourceType::React;
        resource.route_path = Some("/tools/timer".to_string());
        assert_eq!(resource.launch_target(), "/tools/timer");

        resource.route_path = None;
        assert_eq!(resource.launch_target(), "#");
    }

    #[test]
    fn test_zone_parse_and_serde() {
        assert_eq!(Zone::parse("plan"), Some(Zone::Plan));
        assert_eq!(Zone::parse("课件"), Some(Zone::Courseware));
        assert_eq!(Zone::parse("unknown"), None);
        assert_eq!(serde_json::to_string(&Zone::Textbook).unwrap(), "\"textbook\"");
    }

    #[test]
    fn test_patch_skips_unset_fields() {
        let patch = ResourcePatch {
            title: Some("新标题".to_string()),
            ..Default::default()
        };
        assert_eq!(
            serde_json::to_value(&patch).unwrap(),
            serde_json::json!({ "title": "新标题" })
        );
        assert!(!patch.is_empty());
        assert!(ResourcePatch::default().is_empty());
    }
}
