//! Archive entry types produced by tarball extraction.

/// Extensions whose contents are kept as raw bytes
pub const BINARY_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "gif", "bmp", "webp", "svg", "ico"];

/// Kind of an extracted entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    File,
    Directory,
}

/// Entry contents; text entries were decoded as UTF-8
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileContent {
    Text(String),
    Binary(Vec<u8>),
}

impl FileContent {
    pub fn as_bytes(&self) -> &[u8] {
        match self {
            FileContent::Text(text) => text.as_bytes(),
            FileContent::Binary(bytes) => bytes,
        }
    }

    pub fn len(&self) -> usize {
        self.as_bytes().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// One entry of an extracted package archive, relative to the package root
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveEntry {
    pub path: String,
    pub content: FileContent,
    pub kind: EntryKind,
}

impl ArchiveEntry {
    pub fn is_binary(&self) -> bool {
        matches!(self.content, FileContent::Binary(_))
    }

    pub fn is_file(&self) -> bool {
        self.kind == EntryKind::File
    }
}

/// Whether a file at `path` should be kept as raw bytes (case-insensitive
/// suffix match on [`BINARY_EXTENSIONS`])
pub fn is_binary_path(path: &str) -> bool {
    let lower = path.to_ascii_lowercase();
    BINARY_EXTENSIONS.iter().any(|ext| {
        lower
            .strip_suffix(ext)
            .map_or(false, |stem| stem.ends_with('.'))
    })
}
