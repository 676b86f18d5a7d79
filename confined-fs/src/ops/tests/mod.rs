mod writer;

use crate::{CallerContext, ConfinementRoot};

pub(super) struct Fixture {
    pub dir: tempfile::TempDir,
    pub root: ConfinementRoot,
    pub ctx: CallerContext,
}

impl Fixture {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let root = ConfinementRoot::try_new(dir.path()).unwrap();
        let ctx = CallerContext::sandboxed(dir.path()).unwrap();
        Self { dir, root, ctx }
    }

    pub fn admit(&self, path: &str) -> crate::ConfinedPath {
        self.root.admit(path, &self.ctx).unwrap()
    }

    pub fn file(&self, path: &str, content: &str) {
        let full = self.dir.path().join(path);
        std::fs::create_dir_all(full.parent().unwrap()).unwrap();
        std::fs::write(full, content).unwrap();
    }

    pub fn read(&self, path: &str) -> String {
        std::fs::read_to_string(self.dir.path().join(path)).unwrap()
    }

    pub fn exists(&self, path: &str) -> bool {
        self.dir.path().join(path).symlink_metadata().is_ok()
    }
}
