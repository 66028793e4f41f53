//! Container domain types

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Entry of `GET /containers/json`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "PascalCase")]
pub struct ContainerSummary {
    pub id: String,
    pub names: Vec<String>,
    pub image: String,
    #[serde(rename = "ImageID")]
    pub image_id: String,
    pub command: String,
    /// Seconds since the epoch
    pub created: i64,
    pub state: String,
    pub status: String,
    pub labels: Option<HashMap<String, String>>,
    /// Only reported when sizes were requested
    pub size_rw: Option<i64>,
    pub size_root_fs: Option<i64>,
}

impl ContainerSummary {
    pub fn created_at(&self) -> Option<DateTime<Utc>> {
        super::timestamp(self.created)
    }

    /// First name without the leading slash
    pub fn name(&self) -> Option<&str> {
        self.names
            .first()
            .map(|name| name.strip_prefix('/').unwrap_or(name))
    }

    pub fn short_id(&self) -> &str {
        self.id.get(..12).unwrap_or(&self.id)
    }

    pub fn is_running(&self) -> bool {
        self.state == "running"
    }
}
