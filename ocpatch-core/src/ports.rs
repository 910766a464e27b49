//! Port traits abstracting file access away from the pipeline.

use camino::Utf8Path;

/// Where templates are read from and patched configs are written to.
pub trait TemplateStore {
    fn read_template(&self, path: &Utf8Path) -> anyhow::Result<String>;
    fn exists(&self, path: &Utf8Path) -> bool;
    fn write_file(&self, path: &Utf8Path, contents: &[u8]) -> anyhow::Result<()>;
}
