//! Version domain types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Reply of `GET /version`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "PascalCase")]
pub struct Version {
    pub version: String,
    pub api_version: String,
    #[serde(rename = "MinAPIVersion")]
    pub min_api_version: String,
    pub git_commit: String,
    pub go_version: String,
    pub os: String,
    pub arch: String,
    pub kernel_version: String,
    pub build_time: String,
    pub platform: Platform,
    pub components: Vec<Component>,
}

impl Version {
    pub fn build_time(&self) -> Option<DateTime<Utc>> {
        parse_build_time(&self.build_time)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "PascalCase")]
pub struct Platform {
    pub name: String,
}

/// A component of the engine, e.g. `Engine`, `containerd` or `runc`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "PascalCase")]
pub struct Component {
    pub name: String,
    pub version: String,
    pub details: ComponentDetails,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "PascalCase")]
pub struct ComponentDetails {
    pub api_version: String,
    #[serde(rename = "MinAPIVersion")]
    pub min_api_version: String,
    pub arch: String,
    pub build_time: String,
    pub experimental: bool,
    pub git_commit: String,
    pub go_version: String,
    pub kernel_version: String,
    pub os: String,
}

impl ComponentDetails {
    pub fn build_time(&self) -> Option<DateTime<Utc>> {
        parse_build_time(&self.build_time)
    }
}

fn parse_build_time(value: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .ok()
        .map(|time| time.with_timezone(&Utc))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::from_reply;
    use serde_json::json;

    #[test]
    fn test_parse_version() {
        let version: Version = from_reply(json!({
            "Platform": {"Name": "Docker Engine - Community"},
            "Components": [{
                "Name": "Engine",
                "Version": "19.03.8",
                "Details": {
                    "ApiVersion": "1.40",
                    "MinAPIVersion": "1.12",
                    "Experimental": false,
                    "BuildTime": "2020-03-11T01:24:30.000000000+00:00"
                }
            }],
            "Version": "19.03.8",
            "ApiVersion": "1.40",
            "MinAPIVersion": "1.12",
            "Os": "linux",
            "Arch": "amd64",
            "BuildTime": "2020-03-11T01:24:30.000000000+00:00"
        }))
        .unwrap();

        assert_eq!(version.version, "19.03.8");
        assert_eq!(version.min_api_version, "1.12");
        assert_eq!(version.platform.name, "Docker Engine - Community");
        assert_eq!(version.components.len(), 1);
        assert_eq!(version.components[0].details.api_version, "1.40");
        assert!(version.build_time().is_some());
        assert!(version.components[0].details.build_time().is_some());
        assert!(version.kernel_version.is_empty());
    }

    #[test]
    fn test_invalid_build_time() {
        let version = Version {
            build_time: "yesterday".to_string(),
            ..Version::default()
        };
        assert!(version.build_time().is_none());
    }
}
