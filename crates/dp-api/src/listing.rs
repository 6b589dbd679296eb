//! Presentation helpers over API listings.

use crate::models::Project;
use crate::models::ProjectCategory;
use dp_core::LATEST_ALIAS;

pub const MISC_CATEGORY: &str = "Misc";
pub const MORE_VERSIONS: &str = "more";
pub const ALL_VERSIONS: &str = "all";
pub const DEFAULT_RECENT_VERSIONS: usize = 5;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectGroup {
    pub category: String,
    pub projects: Vec<Project>,
}

/// Groups projects in category order, then uncategorised ones under `Misc`.
/// Empty groups are omitted; projects pointing at unknown categories are
/// dropped.
pub fn group_projects_by_categories(
    projects: &[Project],
    categories: &[ProjectCategory],
) -> Vec<ProjectGroup> {
    let keyed = categories
        .iter()
        .map(|category| (Some(category.id), category.name.as_str()))
        .chain(std::iter::once((None, MISC_CATEGORY)));

    keyed
        .filter_map(|(id, name)| {
            let members: Vec<Project> = projects
                .iter()
                .filter(|project| project.category_id == id)
                .cloned()
                .collect();
            (!members.is_empty()).then(|| ProjectGroup {
                category: name.to_owned(),
                projects: members,
            })
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionGroup {
    /// `None` for versions without a numeric leading component.
    pub major: Option<u64>,
    pub versions: Vec<String>,
}

impl VersionGroup {
    pub fn label(&self) -> String {
        match self.major {
            Some(major) => format!("{major}.x"),
            None => "other".to_owned(),
        }
    }
}

/// Groups versions by leading numeric component, highest major first.
/// Versions keep their input order inside a group.
pub fn group_versions_by_major(versions: &[String]) -> Vec<VersionGroup> {
    let mut groups: Vec<VersionGroup> = Vec::new();
    for version in versions {
        let major = version
            .trim_start_matches(['v', 'V'])
            .split('.')
            .next()
            .and_then(|part| part.parse::<u64>().ok());
        match groups.iter_mut().find(|group| group.major == major) {
            Some(group) => group.versions.push(version.clone()),
            None => groups.push(VersionGroup {
                major,
                versions: vec![version.clone()],
            }),
        }
    }

    groups.sort_by(|left, right| match (left.major, right.major) {
        (Some(left), Some(right)) => right.cmp(&left),
        (Some(_), None) => std::cmp::Ordering::Less,
        (None, Some(_)) => std::cmp::Ordering::Greater,
        (None, None) => std::cmp::Ordering::Equal,
    });
    groups
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DropdownEntry {
    pub value: String,
    pub label: String,
}

impl DropdownEntry {
    fn new(value: &str, label: &str) -> Self {
        Self {
            value: value.to_owned(),
            label: label.to_owned(),
        }
    }
}

/// `latest`, the `recent` newest versions (the API lists oldest first), then
/// `...more`.
pub fn version_dropdown_entries(versions: &[String], recent: usize) -> Vec<DropdownEntry> {
    let mut entries = vec![DropdownEntry::new(LATEST_ALIAS, LATEST_ALIAS)];
    entries.extend(
        versions
            .iter()
            .rev()
            .take(recent)
            .map(|version| DropdownEntry::new(version, version)),
    );
    entries.push(DropdownEntry::new(MORE_VERSIONS, "...more"));
    entries
}

/// Dropdown selection for the routed version; empty when it is unknown.
pub fn selected_dropdown_value(route_version: &str, versions: &[String]) -> String {
    if route_version == LATEST_ALIAS || versions.iter().any(|version| version == route_version) {
        route_version.to_owned()
    } else {
        String::new()
    }
}

/// Values that leave the documentation view for the versions overview.
pub fn is_overview_value(value: &str) -> bool {
    value == MORE_VERSIONS || value == ALL_VERSIONS
}

#[cfg(test)]
mod tests {
    use super::group_projects_by_categories;
    use super::group_versions_by_major;
    use super::selected_dropdown_value;
    use super::version_dropdown_entries;
    use crate::models::Project;
    use crate::models::ProjectCategory;

    fn versions(raw: &[&str]) -> Vec<String> {
        raw.iter().map(|version| (*version).to_owned()).collect()
    }

    #[test]
    fn groups_projects_in_category_order_with_misc_last() {
        let projects = vec![
            Project::new("a", "A", Some(2)),
            Project::new("b", "B", None),
            Project::new("c", "C", Some(1)),
            Project::new("d", "D", Some(2)),
        ];
        let categories = vec![
            ProjectCategory::new(1, "Tools"),
            ProjectCategory::new(2, "Libraries"),
            ProjectCategory::new(3, "Empty"),
        ];

        let groups = group_projects_by_categories(&projects, &categories);
        let names: Vec<&str> = groups.iter().map(|group| group.category.as_str()).collect();
        assert_eq!(names, vec!["Tools", "Libraries", "Misc"]);
        assert_eq!(groups[1].projects.len(), 2);
    }

    #[test]
    fn groups_versions_by_major_descending() {
        let groups = group_versions_by_major(&versions(&["1.0.0", "1.1.0", "2.0.0", "nightly", "10.0"]));
        let labels: Vec<String> = groups.iter().map(|group| group.label()).collect();
        assert_eq!(labels, vec!["10.x", "2.x", "1.x", "other"]);
        assert_eq!(groups[2].versions, versions(&["1.0.0", "1.1.0"]));
    }

    #[test]
    fn dropdown_lists_latest_recent_and_more() {
        let all = versions(&["1.0", "1.1", "1.2", "2.0", "2.1", "2.2", "3.0"]);
        let values: Vec<String> = version_dropdown_entries(&all, 5)
            .into_iter()
            .map(|entry| entry.value)
            .collect();
        assert_eq!(
            values,
            versions(&["latest", "3.0", "2.2", "2.1", "2.0", "1.2", "more"])
        );
    }

    #[test]
    fn dropdown_selection_is_empty_for_unknown_versions() {
        let all = versions(&["1.0", "2.0"]);
        assert_eq!(selected_dropdown_value("latest", &all), "latest");
        assert_eq!(selected_dropdown_value("1.0", &all), "1.0");
        assert_eq!(selected_dropdown_value("9.9", &all), "");
    }
}
