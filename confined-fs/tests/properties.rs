use confined_fs::{
    CallerContext, ConfinedFsError, ConfinedPath, ConfinementRoot, EntryRemover, ErrorKind,
    FsRemover, RecursiveDeleter, Sandbox, SandboxConfig,
};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

struct Host {
    _dir: tempfile::TempDir,
    base: PathBuf,
    sandbox: Sandbox,
    ctx: CallerContext,
}

/// Lay out a base directory the way a host would: scripts next to their data.
fn setup_host() -> Host {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let base = dir.path().join("base");
    fs::create_dir_all(base.join("scripts")).unwrap();
    fs::create_dir_all(base.join("src_dir/nested/deeper")).unwrap();
    fs::write(base.join("src_dir/readme.txt"), "top level").unwrap();
    fs::write(base.join("src_dir/nested/data.bin"), [0u8, 1, 2, 255]).unwrap();
    fs::write(base.join("src_dir/nested/deeper/leaf.txt"), "leaf").unwrap();
    fs::write(dir.path().join("outside.txt"), "do not touch").unwrap();

    let config = SandboxConfig::new(base.clone());
    let sandbox = Sandbox::from_config(&config).expect("Failed to build sandbox");
    let ctx = CallerContext::from_script_file(base.join("scripts/main.script"), Default::default())
        .expect("Failed to anchor caller");
    let base = fs::canonicalize(&base).unwrap();
    Host {
        _dir: dir,
        base,
        sandbox,
        ctx,
    }
}

fn snapshot(dir: &Path) -> Vec<(PathBuf, Option<Vec<u8>>)> {
    let mut out = Vec::new();
    let mut stack = vec![dir.to_path_buf()];
    while let Some(current) = stack.pop() {
        for entry in fs::read_dir(&current).unwrap() {
            let path = entry.unwrap().path();
            let rel = path.strip_prefix(dir).unwrap().to_path_buf();
            if path.is_dir() {
                out.push((rel, None));
                stack.push(path);
            } else {
                out.push((rel, Some(fs::read(&path).unwrap())));
            }
        }
    }
    out.sort();
    out
}

#[test]
fn test_copy_creates_missing_target_tree() {
    let host = setup_host();
    host.sandbox
        .copy(&host.ctx, "../src_dir", "../dst_dir", false, true)
        .unwrap();

    assert_eq!(
        snapshot(&host.base.join("src_dir")),
        snapshot(&host.base.join("dst_dir"))
    );
}

#[test]
fn test_outside_paths_are_refused_without_mutation() {
    let host = setup_host();
    let outside = host.base.parent().unwrap().join("outside.txt");
    let ctx = &host.ctx;
    let sb = &host.sandbox;

    for attempt in [
        sb.write(ctx, &outside, "x", Some("overwrite")),
        sb.write_binary(ctx, &outside, b"x", true),
        sb.write_gzip_binary(ctx, &outside, b"x", true),
        sb.delete(ctx, &outside, true),
        sb.copy(ctx, "../src_dir/readme.txt", &outside, true, true),
        sb.create_file(ctx, "../../new.txt", true),
        sb.create_directory(ctx, "../../new_dir", true),
    ] {
        let err = attempt.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Security, "{err}");
    }

    assert_eq!(fs::read_to_string(&outside).unwrap(), "do not touch");
    assert!(!host.base.parent().unwrap().join("new.txt").exists());
    assert!(!host.base.parent().unwrap().join("new_dir").exists());
}

#[test]
fn test_self_copy_fails_and_keeps_bytes() {
    let host = setup_host();
    let before = fs::read(host.base.join("src_dir/nested/data.bin")).unwrap();
    let err = host
        .sandbox
        .copy(
            &host.ctx,
            "../src_dir/nested/data.bin",
            "../src_dir/nested/../nested/data.bin",
            true,
            false,
        )
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Io);
    assert_eq!(
        fs::read(host.base.join("src_dir/nested/data.bin")).unwrap(),
        before
    );
}

#[test]
fn test_create_then_delete_directory_round_trips() {
    let host = setup_host();
    host.sandbox
        .create_directory(&host.ctx, "d", false)
        .unwrap();
    assert!(host.sandbox.is_directory(&host.ctx, "d").unwrap());
    host.sandbox.delete(&host.ctx, "d", false).unwrap();
    assert!(!host.sandbox.file_exists(&host.ctx, "d").unwrap());
}

#[test]
fn test_merge_keeps_existing_files() {
    let host = setup_host();
    fs::create_dir_all(host.base.join("B")).unwrap();
    fs::write(host.base.join("B/x"), "original x").unwrap();
    fs::create_dir_all(host.base.join("A")).unwrap();
    fs::write(host.base.join("A/y"), "y").unwrap();

    host.sandbox
        .copy(&host.ctx, "../A", "../B", true, false)
        .unwrap();

    assert_eq!(
        fs::read_to_string(host.base.join("B/x")).unwrap(),
        "original x"
    );
    assert_eq!(fs::read_to_string(host.base.join("B/y")).unwrap(), "y");
}

#[test]
fn test_second_exclusive_write_keeps_first_content() {
    let host = setup_host();
    host.sandbox
        .write(&host.ctx, "note.txt", "first", None)
        .unwrap();
    let err = host
        .sandbox
        .write(&host.ctx, "note.txt", "second", None)
        .unwrap_err();
    assert!(matches!(err, ConfinedFsError::AlreadyExists { .. }));
    assert_eq!(
        fs::read_to_string(host.base.join("scripts/note.txt")).unwrap(),
        "first"
    );
}

#[test]
fn test_append_concatenates() {
    let host = setup_host();
    host.sandbox
        .write(&host.ctx, "log.txt", "foo", Some("APPEND"))
        .unwrap();
    host.sandbox
        .write(&host.ctx, "log.txt", "bar", Some("append"))
        .unwrap();
    assert_eq!(
        fs::read_to_string(host.base.join("scripts/log.txt")).unwrap(),
        "foobar"
    );
}

struct RefuseNamed(&'static str);

impl EntryRemover for RefuseNamed {
    fn remove_file(&self, path: &ConfinedPath) -> io::Result<()> {
        if path.file_name() == Some(std::ffi::OsStr::new(self.0)) {
            return Err(io::Error::new(io::ErrorKind::PermissionDenied, "simulated"));
        }
        FsRemover.remove_file(path)
    }

    fn remove_dir(&self, path: &ConfinedPath) -> io::Result<()> {
        FsRemover.remove_dir(path)
    }
}

#[test]
fn test_delete_continues_past_a_failing_child() {
    let host = setup_host();
    let dir = host.base.join("victims");
    fs::create_dir_all(&dir).unwrap();
    for name in ["a", "b", "c"] {
        fs::write(dir.join(name), name).unwrap();
    }

    let root = host.sandbox.root();
    let target = root.admit("../victims", &host.ctx).unwrap();
    let err = RecursiveDeleter::with_remover(RefuseNamed("b"))
        .delete(&target, true)
        .unwrap_err();

    assert!(matches!(err, ConfinedFsError::DeleteIncomplete { .. }));
    assert!(!dir.join("a").exists());
    assert!(dir.join("b").exists());
    assert!(!dir.join("c").exists());
}

#[test]
fn test_root_is_usable_directly() {
    let host = setup_host();
    let root = ConfinementRoot::try_new(&host.base).unwrap();
    assert_eq!(&root, host.sandbox.root());
    assert!(root.contains(&host.base.join("src_dir")));
}
