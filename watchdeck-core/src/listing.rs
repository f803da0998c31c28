//! Structured, presentation-free description of a project.
//!
//! Each group is driven by a static `(label, accessor)` table so adding a
//! field to [`Project`] means adding one row here; renderers only walk the
//! resulting [`ProjectListing`].

use std::fmt;

use serde::Serialize;

use crate::types::{Project, ProjectName};

/// Section headings in display order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Group {
    Identity,
    Pipeline,
    Watcher,
    Scripts,
    Streams,
}

impl Group {
    pub fn label(self) -> &'static str {
        match self {
            Group::Identity => "Identity",
            Group::Pipeline => "Pipeline",
            Group::Watcher => "Watcher",
            Group::Scripts => "Scripts",
            Group::Streams => "Streams",
        }
    }
}

/// A displayable field value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum FieldValue {
    Text(String),
    Flag(bool),
    List(Vec<String>),
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Text(s) => f.write_str(s),
            FieldValue::Flag(b) => write!(f, "{b}"),
            FieldValue::List(items) => write!(f, "[{}]", items.join(", ")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Field {
    pub label: &'static str,
    pub value: FieldValue,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldGroup {
    pub group: Group,
    pub fields: Vec<Field>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProjectListing {
    pub name: ProjectName,
    pub groups: Vec<FieldGroup>,
}

type Accessor = fn(&Project) -> Option<FieldValue>;

const IDENTITY_FIELDS: &[(&str, Accessor)] = &[
    ("Name", |p: &Project| Some(FieldValue::Text(p.name.0.clone()))),
    ("Base Path", |p: &Project| {
        Some(FieldValue::Text(p.path.display().to_string()))
    }),
];

const PIPELINE_FIELDS: &[(&str, Accessor)] = &[
    ("Fmt", |p: &Project| Some(FieldValue::Flag(p.fmt))),
    ("Generate", |p: &Project| Some(FieldValue::Flag(p.generate))),
    ("Test", |p: &Project| Some(FieldValue::Flag(p.test))),
    ("Install", |p: &Project| Some(FieldValue::Flag(p.bin))),
    ("Build", |p: &Project| Some(FieldValue::Flag(p.build))),
    ("Run", |p: &Project| Some(FieldValue::Flag(p.run))),
    ("Params", |p: &Project| non_empty(p.params.iter())),
];

const WATCHER_FIELDS: &[(&str, Accessor)] = &[
    ("Preview", |p: &Project| Some(FieldValue::Flag(p.watcher.preview))),
    ("Extensions", |p: &Project| non_empty(p.watcher.exts.iter())),
    ("Paths", |p: &Project| non_empty(p.watcher.paths.iter())),
    ("Ignored paths", |p: &Project| non_empty(p.watcher.ignore.iter())),
];

const STREAM_FIELDS: &[(&str, Accessor)] = &[
    ("Cli Out", |p: &Project| Some(FieldValue::Flag(p.streams.cli_out))),
    ("File Out", |p: &Project| Some(FieldValue::Flag(p.streams.file_out))),
    ("File Log", |p: &Project| Some(FieldValue::Flag(p.streams.file_log))),
    ("File Err", |p: &Project| Some(FieldValue::Flag(p.streams.file_err))),
];

fn non_empty<'a>(items: impl Iterator<Item = &'a String>) -> Option<FieldValue> {
    let items: Vec<String> = items.cloned().collect();
    (!items.is_empty()).then_some(FieldValue::List(items))
}

fn collect(project: &Project, table: &[(&'static str, Accessor)]) -> Vec<Field> {
    table
        .iter()
        .filter_map(|(label, accessor)| {
            accessor(project).map(|value| Field {
                label: *label,
                value,
            })
        })
        .collect()
}

/// Scripts are variable-length, so they are flattened rather than tabled.
/// Scripts with an empty command are omitted.
fn script_fields(project: &Project) -> Vec<Field> {
    let mut fields = Vec::new();
    for script in project.watcher.scripts.iter().filter(|s| !s.command.is_empty()) {
        fields.push(Field {
            label: "Command",
            value: FieldValue::Text(script.command.clone()),
        });
        if let Some(path) = &script.path {
            fields.push(Field {
                label: "Path",
                value: FieldValue::Text(path.display().to_string()),
            });
        }
        if let Some(hook) = script.hook {
            fields.push(Field {
                label: "Type",
                value: FieldValue::Text(hook.to_string()),
            });
        }
    }
    fields
}

/// Describe one project. The scripts group is left out when it would be empty.
pub fn describe(project: &Project) -> ProjectListing {
    let mut groups = vec![
        FieldGroup {
            group: Group::Identity,
            fields: collect(project, IDENTITY_FIELDS),
        },
        FieldGroup {
            group: Group::Pipeline,
            fields: collect(project, PIPELINE_FIELDS),
        },
        FieldGroup {
            group: Group::Watcher,
            fields: collect(project, WATCHER_FIELDS),
        },
    ];

    let scripts = script_fields(project);
    if !scripts.is_empty() {
        groups.push(FieldGroup {
            group: Group::Scripts,
            fields: scripts,
        });
    }

    groups.push(FieldGroup {
        group: Group::Streams,
        fields: collect(project, STREAM_FIELDS),
    });

    ProjectListing {
        name: project.name.clone(),
        groups,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Command, HookPoint};

    fn labels(listing: &ProjectListing, group: Group) -> Vec<&'static str> {
        listing
            .groups
            .iter()
            .find(|g| g.group == group)
            .map(|g| g.fields.iter().map(|f| f.label).collect())
            .unwrap_or_default()
    }

    #[test]
    fn groups_follow_display_order() {
        let mut project = Project::new("api", "/svc/api");
        project.watcher.scripts.push(Command {
            command: "make".into(),
            path: None,
            hook: Some(HookPoint::Before),
        });
        let listing = describe(&project);
        let order: Vec<Group> = listing.groups.iter().map(|g| g.group).collect();
        assert_eq!(
            order,
            [Group::Identity, Group::Pipeline, Group::Watcher, Group::Scripts, Group::Streams]
        );
    }

    #[test]
    fn empty_params_and_scripts_are_omitted() {
        let listing = describe(&Project::new("api", "/svc/api"));
        assert!(!labels(&listing, Group::Pipeline).contains(&"Params"));
        assert!(listing.groups.iter().all(|g| g.group != Group::Scripts));
    }

    #[test]
    fn pipeline_flags_are_reported() {
        let mut project = Project::new("api", "/svc/api");
        project.params = vec!["--port".into(), "8080".into()];
        let listing = describe(&project);
        assert_eq!(
            labels(&listing, Group::Pipeline),
            ["Fmt", "Generate", "Test", "Install", "Build", "Run", "Params"]
        );
        let params = &listing.groups[1].fields[6].value;
        assert_eq!(params.to_string(), "[--port, 8080]");
    }

    #[test]
    fn script_without_command_is_skipped() {
        let mut project = Project::new("api", "/svc/api");
        project.watcher.scripts.push(Command {
            command: String::new(),
            path: Some("tools".into()),
            hook: Some(HookPoint::After),
        });
        project.watcher.scripts.push(Command {
            command: "npm run build".into(),
            path: Some("web".into()),
            hook: None,
        });
        let listing = describe(&project);
        assert_eq!(labels(&listing, Group::Scripts), ["Command", "Path"]);
    }
}
