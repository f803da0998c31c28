//! Registry mutation rules: uniqueness, clean, remove, default population.

use std::path::{Path, PathBuf};

use rstest::rstest;
use watchdeck_core::{AddRequest, Project, Registry, RegistryError};

fn names(registry: &Registry) -> Vec<String> {
    registry.iter().map(|p| p.name.0.clone()).collect()
}

fn registry_of(entries: &[(&str, &str)]) -> Registry {
    Registry::from_projects(
        entries
            .iter()
            .map(|(name, path)| Project::new(*name, *path))
            .collect(),
    )
}

fn assert_unique(registry: &Registry) {
    let mut seen = std::collections::HashSet::new();
    for project in registry {
        assert!(seen.insert(project.name.clone()), "duplicate name {}", project.name);
    }
}

// ---------------------------------------------------------------------------
// 1. Uniqueness under Add
// ---------------------------------------------------------------------------

#[rstest]
#[case(&["a", "b", "c"], 3)]
#[case(&["a", "a", "a"], 1)]
#[case(&["a", "b", "a", "c", "b"], 3)]
#[case(&["api", "API", "Api"], 3)]
fn every_prefix_of_adds_stays_unique(#[case] sequence: &[&str], #[case] expected_len: usize) {
    let mut registry = Registry::new();
    for (i, name) in sequence.iter().enumerate() {
        let before = registry.clone();
        let result = registry.add(Project::new(*name, format!("/p/{i}")));
        match result {
            Ok(_) => assert_eq!(registry.len(), before.len() + 1),
            Err(RegistryError::DuplicateProject { .. }) => assert_eq!(registry, before),
            Err(other) => panic!("unexpected error: {other}"),
        }
        assert_unique(&registry);
    }
    assert_eq!(registry.len(), expected_len);
}

#[test]
fn duplicate_add_keeps_original_path() {
    let mut registry = Registry::new();
    registry.add(Project::new("api", "/svc/api")).expect("first");
    let err = registry.add(Project::new("api", "/svc/api2")).unwrap_err();
    assert!(err.to_string().contains("already exists"), "got: {err}");
    assert_eq!(registry.len(), 1);
    assert_eq!(registry.get("api").expect("api").path, PathBuf::from("/svc/api"));
}

// ---------------------------------------------------------------------------
// 2. Clean
// ---------------------------------------------------------------------------

#[test]
fn clean_example_keeps_later_duplicate() {
    let mut registry = registry_of(&[("A", "/first"), ("B", "/b"), ("A", "/second")]);
    registry.clean();
    assert_eq!(names(&registry), ["B", "A"]);
    assert_eq!(registry.get("A").expect("A").path, PathBuf::from("/second"));
}

#[rstest]
#[case(&[("a", "/1"), ("a", "/2"), ("a", "/3")], &["a"])]
#[case(&[("a", "/1"), ("b", "/2"), ("b", "/3"), ("a", "/4")], &["b", "a"])]
#[case(&[("x", "/1"), ("y", "/2")], &["x", "y"])]
#[case(&[], &[])]
fn clean_is_idempotent(#[case] entries: &[(&str, &str)], #[case] expected: &[&str]) {
    let mut once = registry_of(entries);
    once.clean();
    let mut twice = once.clone();
    assert_eq!(twice.clean(), 0);
    assert_eq!(once, twice);
    assert_eq!(names(&once), expected);
    assert_unique(&once);
}

#[test]
fn clean_survivor_is_last_inserted() {
    let mut registry = registry_of(&[("a", "/1"), ("a", "/2"), ("b", "/b"), ("a", "/3")]);
    registry.clean();
    assert_eq!(registry.get("a").expect("a").path, PathBuf::from("/3"));
}

// ---------------------------------------------------------------------------
// 3. Remove
// ---------------------------------------------------------------------------

#[test]
fn remove_existing_shrinks_by_one() {
    let mut registry = registry_of(&[("a", "/a"), ("b", "/b")]);
    registry.remove("a").expect("remove");
    assert_eq!(registry.len(), 1);
    assert!(registry.get("a").is_none());
}

#[test]
fn remove_unknown_leaves_registry_unchanged() {
    let mut registry = registry_of(&[("a", "/a")]);
    let before = registry.clone();
    let err = registry.remove("b").unwrap_err();
    assert!(matches!(err, RegistryError::ProjectNotFound { .. }));
    assert!(err.to_string().contains("'b'"));
    assert_eq!(registry, before);
}

// ---------------------------------------------------------------------------
// 4. Check / list
// ---------------------------------------------------------------------------

#[test]
fn empty_registry_error_mentions_add() {
    let mut registry = Registry::new();
    let err = registry.list().unwrap_err();
    assert!(matches!(err, RegistryError::EmptyRegistry));
    assert!(err.to_string().contains("watchdeck add"));
}

#[test]
fn list_order_follows_registry_order() {
    let mut registry = registry_of(&[("z", "/z"), ("a", "/a"), ("m", "/m")]);
    let listing = registry.list().expect("list");
    let listed: Vec<&str> = listing.iter().map(|l| l.name.as_str()).collect();
    assert_eq!(listed, ["z", "a", "m"]);
}

// ---------------------------------------------------------------------------
// 5. Default population
// ---------------------------------------------------------------------------

#[test]
fn add_with_no_flags_populates_defaults() {
    let project = AddRequest {
        path: PathBuf::from("/svc/api"),
        ..AddRequest::default()
    }
    .into_project(Path::new("/"))
    .expect("project");

    assert!(project.bin && project.run && project.fmt);
    assert!(!project.generate && !project.test && !project.build);
    assert_eq!(project.watcher.paths.iter().collect::<Vec<_>>(), ["/"]);
    assert_eq!(project.watcher.ignore.iter().collect::<Vec<_>>(), ["vendor"]);
    assert_eq!(project.watcher.exts.iter().collect::<Vec<_>>(), [".go"]);
    assert!(project.watcher.scripts.is_empty());
    assert!(project.streams.cli_out);
}

#[test]
fn add_request_flags_are_carried_over() {
    let project = AddRequest {
        name: Some("worker".into()),
        path: PathBuf::from("./cmd/worker"),
        fmt: false,
        test: true,
        bin: false,
        preview: true,
        params: vec!["-v".into()],
        ..AddRequest::default()
    }
    .into_project(Path::new("/repo"))
    .expect("project");

    assert_eq!(project.path, PathBuf::from("/repo/cmd/worker"));
    assert!(!project.fmt && project.test && !project.bin && project.run);
    assert!(project.watcher.preview);
    assert_eq!(project.params, ["-v"]);
}
