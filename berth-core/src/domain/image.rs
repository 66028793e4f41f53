//! Image domain types

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Entry of `GET /images/json`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "PascalCase")]
pub struct ImageSummary {
    pub id: String,
    pub parent_id: String,
    pub repo_tags: Option<Vec<String>>,
    pub repo_digests: Option<Vec<String>>,
    /// Seconds since the epoch
    pub created: i64,
    pub size: i64,
    pub virtual_size: i64,
    pub shared_size: i64,
    pub labels: Option<HashMap<String, String>>,
    pub containers: i64,
}

impl ImageSummary {
    pub fn created_at(&self) -> Option<DateTime<Utc>> {
        super::timestamp(self.created)
    }

    /// Repository tags, `<none>:<none>` entries excluded
    pub fn tags(&self) -> impl Iterator<Item = &str> {
        self.repo_tags
            .iter()
            .flatten()
            .map(String::as_str)
            .filter(|tag| *tag != "<none>:<none>")
    }

    /// Image ID without the digest algorithm, shortened to 12 characters
    pub fn short_id(&self) -> &str {
        let id = self.id.strip_prefix("sha256:").unwrap_or(&self.id);
        id.get(..12).unwrap_or(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::from_reply;
    use serde_json::json;

    #[test]
    fn test_parse_image_list() {
        let images: Vec<ImageSummary> = from_reply(json!([{
            "Id": "sha256:e216a057b1cb1efc11f8a268f37ef62083e70b1b38323ba252e25ac88904a7e8",
            "ParentId": "",
            "RepoTags": ["nginx:latest", "<none>:<none>"],
            "RepoDigests": null,
            "Created": 1584482468,
            "Size": 126791386,
            "SharedSize": -1,
            "VirtualSize": 126791386,
            "Labels": null,
            "Containers": 2
        }]))
        .unwrap();

        let image = &images[0];
        assert_eq!(image.short_id(), "e216a057b1cb");
        assert_eq!(image.tags().collect::<Vec<_>>(), vec!["nginx:latest"]);
        assert_eq!(image.shared_size, -1);
        assert!(image.repo_digests.is_none());
        assert_eq!(image.containers, 2);
        assert_eq!(image.created_at().unwrap().timestamp(), 1584482468);
    }

    #[test]
    fn test_short_id_of_short_value() {
        let image = ImageSummary {
            id: "abc".to_string(),
            ..ImageSummary::default()
        };
        assert_eq!(image.short_id(), "abc");
        assert_eq!(image.tags().count(), 0);
    }
}
