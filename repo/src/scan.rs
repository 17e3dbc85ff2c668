use serde::Deserialize;
use serde::Serialize;
use std::path::Path;
use walkdir::WalkDir;

/// Directories skipped by [`scan`] and [`tree`], ported from
/// `repo_manager.py::scan_repo_for_tasks`'s hidden/vendor directory
/// skip-list.
const SKIPPED_DIRS: &[&str] = &["node_modules", "__pycache__", "build", "dist", "target", ".git"];

const SCANNED_EXTENSIONS: &[&str] =
    &["py", "js", "ts", "tsx", "jsx", "java", "cpp", "c", "h", "hpp", "rs", "go", "md"];

const TASK_KEYWORDS: &[&str] = &["todo", "fixme", "hack", "bug"];

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanTask {
    pub file: String,
    pub line: u64,
    pub content: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanIssue {
    pub description: String,
    pub suggested_task: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScanResult {
    pub tasks: Vec<ScanTask>,
    pub issues: Vec<ScanIssue>,
}

fn should_skip_dir(name: &str) -> bool {
    name.starts_with('.') || SKIPPED_DIRS.contains(&name)
}

/// Read-only walk of `root`, collecting TODO/FIXME/HACK/BUG comments plus a
/// couple of heuristic project-health issues. Ports
/// `repo_manager.py::scan_repo_for_tasks`.
pub fn scan(root: &Path) -> std::io::Result<ScanResult> {
    let mut result = ScanResult::default();

    let walker = WalkDir::new(root).into_iter().filter_entry(|entry| {
        if entry.file_type().is_dir() {
            let name = entry.file_name().to_string_lossy();
            entry.depth() == 0 || !should_skip_dir(&name)
        } else {
            true
        }
    });

    let mut has_source_files = false;
    let mut has_requirements = false;
    let mut has_readme = false;

    for entry in walker.filter_map(std::result::Result::ok) {
        if !entry.file_type().is_file() {
            continue;
        }

        let path = entry.path();
        let file_name = entry.file_name().to_string_lossy().to_string();

        if file_name.eq_ignore_ascii_case("requirements.txt")
            || file_name.eq_ignore_ascii_case("cargo.toml")
            || file_name.eq_ignore_ascii_case("package.json")
        {
            has_requirements = true;
        }
        if file_name.to_lowercase().starts_with("readme") {
            has_readme = true;
        }

        let Some(extension) = path.extension().and_then(|ext| ext.to_str()) else {
            continue;
        };
        if !SCANNED_EXTENSIONS.contains(&extension) {
            continue;
        }
        has_source_files = true;

        let Ok(contents) = std::fs::read_to_string(path) else {
            continue;
        };
        let relative = path.strip_prefix(root).unwrap_or(path).to_string_lossy().to_string();

        for (line_no, line) in contents.lines().enumerate() {
            let lowered = line.to_lowercase();
            if TASK_KEYWORDS.iter().any(|keyword| lowered.contains(keyword)) {
                result.tasks.push(ScanTask {
                    file: relative.clone(),
                    line: (line_no + 1) as u64,
                    content: line.trim().to_string(),
                });
            }
        }
    }

    if has_source_files && !has_requirements {
        result.issues.push(ScanIssue {
            description: "project has source files but no dependency manifest".into(),
            suggested_task: "add a dependency manifest describing the project's requirements"
                .into(),
        });
    }
    if !has_readme {
        result.issues.push(ScanIssue {
            description: "project is missing a README".into(),
            suggested_task: "create a README.md describing the project".into(),
        });
    }

    Ok(result)
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum FileNode {
    File { name: String, size: u64 },
    Directory { name: String, children: Vec<FileNode> },
}

/// Nested directory listing used by the dashboard, ports
/// `repo_manager.py::get_repo_file_structure`.
pub fn tree(root: &Path, max_depth: usize) -> std::io::Result<Vec<FileNode>> {
    build_tree(root, 0, max_depth)
}

fn build_tree(dir: &Path, depth: usize, max_depth: usize) -> std::io::Result<Vec<FileNode>> {
    if depth >= max_depth {
        return Ok(Vec::new());
    }

    let mut entries: Vec<_> = std::fs::read_dir(dir)?.filter_map(std::result::Result::ok).collect();
    entries.sort_by_key(|entry| entry.file_name());

    let mut nodes = Vec::new();
    for entry in entries {
        let name = entry.file_name().to_string_lossy().to_string();
        if name.starts_with('.') {
            continue;
        }

        let metadata = entry.metadata()?;
        if metadata.is_dir() {
            if should_skip_dir(&name) {
                continue;
            }
            let children = build_tree(&entry.path(), depth + 1, max_depth)?;
            nodes.push(FileNode::Directory { name, children });
        } else {
            nodes.push(FileNode::File {
                name,
                size: metadata.len(),
            });
        }
    }

    Ok(nodes)
}
