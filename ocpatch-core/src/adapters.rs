//! Default port implementations.

use crate::ports::TemplateStore;
use anyhow::Context;
use camino::{Utf8Path, Utf8PathBuf};
use fs_err as fs;
use std::cell::RefCell;
use std::collections::BTreeMap;
use tracing::debug;

/// Filesystem-backed store.
///
/// Writes go to a sibling temp file that is then renamed over the target,
/// so a failed write never leaves a half-written config behind.
#[derive(Debug, Clone, Default)]
pub struct FsTemplateStore;

impl TemplateStore for FsTemplateStore {
    fn read_template(&self, path: &Utf8Path) -> anyhow::Result<String> {
        fs::read_to_string(path).with_context(|| format!("read {}", path))
    }

    fn exists(&self, path: &Utf8Path) -> bool {
        path.is_file()
    }

    fn write_file(&self, path: &Utf8Path, contents: &[u8]) -> anyhow::Result<()> {
        if let Some(parent) = path.parent()
            && !parent.as_str().is_empty()
        {
            fs::create_dir_all(parent)
                .with_context(|| format!("create parent dir for {}", path))?;
        }

        let tmp = Utf8PathBuf::from(format!("{path}.ocpatch.tmp"));
        fs::write(&tmp, contents).with_context(|| format!("write {}", tmp))?;
        if let Err(err) = fs::rename(&tmp, path) {
            let _ = fs::remove_file(&tmp);
            return Err(err).with_context(|| format!("replace {}", path));
        }
        debug!(path = path.as_str(), bytes = contents.len(), "wrote file");
        Ok(())
    }
}

/// In-memory store for embedding and testing.
#[derive(Debug, Clone, Default)]
pub struct InMemoryTemplateStore {
    files: RefCell<BTreeMap<Utf8PathBuf, Vec<u8>>>,
}

impl InMemoryTemplateStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_file(self, path: impl Into<Utf8PathBuf>, contents: impl Into<Vec<u8>>) -> Self {
        self.files.borrow_mut().insert(path.into(), contents.into());
        self
    }

    /// Current contents of `path` as text, if present and valid UTF-8.
    pub fn get(&self, path: &Utf8Path) -> Option<String> {
        self.files
            .borrow()
            .get(path)
            .and_then(|bytes| String::from_utf8(bytes.clone()).ok())
    }

    pub fn paths(&self) -> Vec<Utf8PathBuf> {
        self.files.borrow().keys().cloned().collect()
    }
}

impl TemplateStore for InMemoryTemplateStore {
    fn read_template(&self, path: &Utf8Path) -> anyhow::Result<String> {
        let files = self.files.borrow();
        let bytes = files
            .get(path)
            .with_context(|| format!("read {}: no such file", path))?;
        String::from_utf8(bytes.clone()).with_context(|| format!("{} is not valid UTF-8", path))
    }

    fn exists(&self, path: &Utf8Path) -> bool {
        self.files.borrow().contains_key(path)
    }

    fn write_file(&self, path: &Utf8Path, contents: &[u8]) -> anyhow::Result<()> {
        self.files
            .borrow_mut()
            .insert(path.to_path_buf(), contents.to_vec());
        Ok(())
    }
}
