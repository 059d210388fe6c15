//! Names and identifiers used on disk

use std::fmt;
use std::path::Path;

pub const PROPERTIES_FILE: &str = "properties.yaml";
pub const SCRIPT_FILE: &str = "code.lua";
pub const SOURCE_PROPERTY: &str = "Source";
pub const SCRIPT_CLASSES: [&str; 3] = ["Script", "LocalScript", "ModuleScript"];

const SUFFIX_LEN: usize = 8;

pub fn is_script_class(class_name: &str) -> bool {
    SCRIPT_CLASSES.contains(&class_name)
}

/// The two files inside a projected folder that sync back into the document
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
    Properties,
    Script,
}

impl FileKind {
    /// Classify a path by its basename. Anything else is not ours.
    pub fn from_path(path: &Path) -> Option<FileKind> {
        match path.file_name()?.to_str()? {
            PROPERTIES_FILE => Some(FileKind::Properties),
            SCRIPT_FILE => Some(FileKind::Script),
            _ => None,
        }
    }

    pub fn file_name(self) -> &'static str {
        match self {
            FileKind::Properties => PROPERTIES_FILE,
            FileKind::Script => SCRIPT_FILE,
        }
    }
}

/// Make a node name usable as a single path segment
pub fn sanitize_name(name: &str) -> String {
    let sanitized: String = name
        .chars()
        .map(|c| match c {
            '<' | '>' | ':' | '"' | '/' | '\\' | '|' | '?' | '*' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect();

    if sanitized.is_empty() {
        "_".to_string()
    } else {
        sanitized
    }
}

/// Directory name of a projected node: `<name>.<className>.<suffix>`
///
/// The suffix only keeps sibling directories apart. Resolution back to a node
/// uses the name and class alone.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FolderId {
    pub name: String,
    pub class_name: String,
    pub suffix: String,
}

impl FolderId {
    /// Fresh identifier with a random suffix
    pub fn generate(name: &str, class_name: &str) -> Self {
        let mut suffix = uuid::Uuid::new_v4().simple().to_string();
        suffix.truncate(SUFFIX_LEN);

        Self {
            name: sanitize_name(name),
            class_name: class_name.to_string(),
            suffix,
        }
    }

    /// Split a directory name from the right, so names containing dots survive
    pub fn parse(segment: &str) -> Option<Self> {
        let mut parts = segment.rsplitn(3, '.');
        let suffix = parts.next()?;
        let class_name = parts.next()?;
        let name = parts.next()?;

        if name.is_empty() || class_name.is_empty() || suffix.is_empty() {
            return None;
        }

        Some(Self {
            name: name.to_string(),
            class_name: class_name.to_string(),
            suffix: suffix.to_string(),
        })
    }

    /// Identifier of the folder that owns `file`
    pub fn of_file(file: &Path) -> Option<Self> {
        let folder = file.parent()?.file_name()?.to_str()?;
        Self::parse(folder)
    }

    /// Identifier named by the last segment of a folder path
    pub fn of_folder(folder: &Path) -> Option<Self> {
        Self::parse(folder.file_name()?.to_str()?)
    }

    /// Whether a node with this name and class projects to this identifier
    pub fn matches(&self, name: &str, class_name: &str) -> bool {
        self.class_name == class_name && self.name == sanitize_name(name)
    }
}

impl fmt::Display for FolderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.name, self.class_name, self.suffix)
    }
}
