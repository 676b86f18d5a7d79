use crate::{CallerContext, ConfinedFsError, ConfinedPath, ConfinementRoot};
use std::collections::{BTreeSet, HashSet};

fn sandbox_root() -> (tempfile::TempDir, ConfinementRoot, CallerContext) {
    let td = tempfile::tempdir().unwrap();
    let root = ConfinementRoot::try_new(td.path()).unwrap();
    let ctx = CallerContext::sandboxed(td.path()).unwrap();
    (td, root, ctx)
}

#[test]
fn equality_is_canonical() {
    let (_td, root, ctx) = sandbox_root();
    let direct = root.admit("docs/a.txt", &ctx).unwrap();
    let roundabout = root.admit("docs/./x/../a.txt", &ctx).unwrap();
    assert_eq!(direct, roundabout);

    let mut hashed: HashSet<ConfinedPath> = HashSet::new();
    hashed.insert(direct.clone());
    assert!(hashed.contains(&roundabout));

    let ordered: BTreeSet<ConfinedPath> = [roundabout, direct].into_iter().collect();
    assert_eq!(ordered.len(), 1);
}

#[test]
fn join_readmits_against_the_same_root() {
    let (_td, root, ctx) = sandbox_root();
    let docs = root.admit("docs", &ctx).unwrap();

    let inside = docs.join("notes/today.txt").unwrap();
    assert!(inside.starts_with(&docs));

    let err = docs.join("../../escape.txt").unwrap_err();
    assert!(matches!(err, ConfinedFsError::PathEscapesRoot { .. }));
}

#[test]
fn parent_stops_at_the_root() {
    let (_td, root, ctx) = sandbox_root();
    let file = root.admit("a/b.txt", &ctx).unwrap();

    let parent = file.parent().unwrap().unwrap();
    assert_eq!(parent.file_name().unwrap(), "a");

    let top = root.admit("", &ctx).unwrap();
    let err = top.parent().unwrap_err();
    assert!(matches!(err, ConfinedFsError::PathEscapesRoot { .. }));
    assert!(top.parent_exists());
}

#[test]
fn create_parent_dir_all_builds_missing_levels() {
    let (td, root, ctx) = sandbox_root();
    let file = root.admit("x/y/z.txt", &ctx).unwrap();
    assert!(!file.parent_exists());

    file.create_parent_dir_all().unwrap();
    assert!(td.path().join("x/y").is_dir());
    assert!(file.parent_exists());

    // At the root there is nothing to create.
    root.admit("", &ctx)
        .unwrap()
        .create_parent_dir_all()
        .unwrap();
}

#[test]
fn display_and_unconfine_expose_the_canonical_path() {
    let (td, root, ctx) = sandbox_root();
    let file = root.admit("report.txt", &ctx).unwrap();
    let canonical_root = std::fs::canonicalize(td.path()).unwrap();

    assert_eq!(
        file.confinedpath_display().to_string(),
        canonical_root.join("report.txt").display().to_string()
    );
    assert_eq!(file.root(), &root);
    assert_eq!(file.unconfine(), canonical_root.join("report.txt"));
}
