use serde::Deserialize;
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Project {
    pub name: String,
    pub display_name: String,
    #[serde(default)]
    pub category_id: Option<i64>,
}

impl Project {
    pub fn new(name: &str, display_name: &str, category_id: Option<i64>) -> Self {
        Self {
            name: name.to_owned(),
            display_name: display_name.to_owned(),
            category_id,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectCategory {
    pub id: i64,
    pub name: String,
}

impl ProjectCategory {
    pub fn new(id: i64, name: &str) -> Self {
        Self {
            id,
            name: name.to_owned(),
        }
    }
}

/// Answer of a version lookup.
///
/// Older servers return only the concrete version, newer ones return
/// `[version, latest]`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum VersionLookup {
    Single(String),
    Pair(String, String),
}

impl VersionLookup {
    pub fn version(&self) -> &str {
        match self {
            Self::Single(version) | Self::Pair(version, _) => version,
        }
    }

    pub fn latest(&self) -> Option<&str> {
        match self {
            Self::Single(_) => None,
            Self::Pair(_, latest) => Some(latest),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::Project;
    use super::VersionLookup;

    #[test]
    fn version_lookup_accepts_both_shapes() {
        let single: VersionLookup = match serde_json::from_str(r#""1.2.0""#) {
            Ok(value) => value,
            Err(error) => panic!("{error}"),
        };
        assert_eq!(single.version(), "1.2.0");
        assert_eq!(single.latest(), None);

        let pair: VersionLookup = match serde_json::from_str(r#"["1.0.0", "2.0.0"]"#) {
            Ok(value) => value,
            Err(error) => panic!("{error}"),
        };
        assert_eq!(pair.version(), "1.0.0");
        assert_eq!(pair.latest(), Some("2.0.0"));
    }

    #[test]
    fn projects_without_category_decode() {
        let projects: Vec<Project> = match serde_json::from_str(
            r#"[{"name":"p","display_name":"P","category_id":null},{"name":"q","display_name":"Q"}]"#,
        ) {
            Ok(value) => value,
            Err(error) => panic!("{error}"),
        };
        assert!(projects.iter().all(|project| project.category_id.is_none()));
    }
}
