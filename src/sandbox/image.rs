//! File trees mounted into sandbox containers

use super::{SandboxError, SandboxResult};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// Directory contents keyed by entry name
pub type FileTree = BTreeMap<String, FileNode>;

/// A file or a nested directory.
///
/// Serializes as `{"file": {"contents": "..."}}` or `{"directory": {...}}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileNode {
    File { contents: String },
    Directory(FileTree),
}

impl FileNode {
    pub fn file(contents: impl Into<String>) -> Self {
        FileNode::File { contents: contents.into() }
    }
}

const GREETING_SCRIPT: &str = "#!/bin/sh\necho \"Hello from the WebOS sandbox!\"\n";

/// Minimal image mounted before the shell starts: a greeting script and a
/// manifest describing it.
pub fn default_image() -> FileTree {
    let manifest = serde_json::json!({
        "name": "webos-sandbox",
        "version": "1.0.0",
        "scripts": {
            "start": "sh hello.sh"
        }
    });

    let mut tree = FileTree::new();
    tree.insert("hello.sh".to_string(), FileNode::file(GREETING_SCRIPT));
    tree.insert(
        "manifest.json".to_string(),
        FileNode::file(serde_json::to_string_pretty(&manifest).unwrap_or_default()),
    );
    tree
}

/// Reject names that would escape the directory they are written into
pub(crate) fn validate_name(name: &str) -> SandboxResult<()> {
    if name.is_empty() || name == "." || name == ".." || name.contains('/') || name.contains('\\') {
        return Err(SandboxError::Mount(format!("invalid entry name {:?}", name)));
    }
    Ok(())
}

/// Check every entry name in `tree`, recursively
pub(crate) fn validate_tree(tree: &FileTree) -> SandboxResult<()> {
    for (name, node) in tree {
        validate_name(name)?;
        if let FileNode::Directory(children) = node {
            validate_tree(children)?;
        }
    }
    Ok(())
}

/// Materialize `tree` under `root`, creating directories as needed
pub(crate) fn write_tree(root: &Path, tree: &FileTree) -> SandboxResult<()> {
    validate_tree(tree)?;
    write_validated(root, tree)
}

fn write_validated(root: &Path, tree: &FileTree) -> SandboxResult<()> {
    std::fs::create_dir_all(root)?;
    for (name, node) in tree {
        let path = root.join(name);
        match node {
            FileNode::File { contents } => std::fs::write(&path, contents)?,
            FileNode::Directory(children) => write_validated(&path, children)?,
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_image_has_script_and_manifest() {
        let image = default_image();
        assert!(matches!(image.get("hello.sh"), Some(FileNode::File { contents }) if contents.contains("echo")));
        let Some(FileNode::File { contents }) = image.get("manifest.json") else {
            panic!("manifest missing");
        };
        let manifest: serde_json::Value = serde_json::from_str(contents).unwrap();
        assert_eq!(manifest["scripts"]["start"], "sh hello.sh");
    }

    #[test]
    fn test_tree_json_shape() {
        let json = r#"{
            "index.js": { "file": { "contents": "console.log(1)" } },
            "src": { "directory": { "main.sh": { "file": { "contents": "echo" } } } }
        }"#;
        let tree: FileTree = serde_json::from_str(json).unwrap();
        assert_eq!(tree["index.js"], FileNode::file("console.log(1)"));
        let FileNode::Directory(src) = &tree["src"] else {
            panic!("expected directory");
        };
        assert_eq!(src["main.sh"], FileNode::file("echo"));
    }

    #[test]
    fn test_write_tree() {
        let dir = tempfile::tempdir().unwrap();
        let mut nested = FileTree::new();
        nested.insert("inner.txt".to_string(), FileNode::file("inner"));
        let mut tree = default_image();
        tree.insert("nested".to_string(), FileNode::Directory(nested));

        write_tree(dir.path(), &tree).unwrap();

        let script = std::fs::read_to_string(dir.path().join("hello.sh")).unwrap();
        assert_eq!(script, GREETING_SCRIPT);
        let inner = std::fs::read_to_string(dir.path().join("nested/inner.txt")).unwrap();
        assert_eq!(inner, "inner");
    }

    #[test]
    fn test_rejects_escaping_names() {
        let dir = tempfile::tempdir().unwrap();
        for bad in ["", "..", "a/b", "."] {
            let mut tree = FileTree::new();
            tree.insert(bad.to_string(), FileNode::file("x"));
            let err = write_tree(dir.path(), &tree).unwrap_err();
            assert!(matches!(err, SandboxError::Mount(_)), "{bad:?} accepted");
        }
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }
}
