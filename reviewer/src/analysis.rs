use regex::Regex;
use serde::Serialize;
use std::collections::HashSet;
use std::sync::OnceLock;

/// A completed task is only reviewed this closely when the generated file
/// looks like Python, matching `tireless_reviewer.py`'s own `.endswith('.py')`
/// gate: the heuristics below (docstrings, `except:`, `print(`) are Python
/// idioms and would misfire on other languages.
fn is_python(filename: &str) -> bool {
    filename.ends_with(".py")
}

const LARGE_FILE_LINE_THRESHOLD: usize = 100;

const MAJOR_TASK_KEYWORDS: &[&str] = &[
    "major",
    "large",
    "significant",
    "important",
    "critical",
    "epic",
    "feature",
    "refactor",
    "migration",
    "upgrade",
    "redesign",
];

pub fn is_major_task(description: &str) -> bool {
    let lowered = description.to_lowercase();
    MAJOR_TASK_KEYWORDS
        .iter()
        .any(|keyword| lowered.contains(keyword))
}

/// Findings from a primary-cadence review, spec.md §4.7.
#[derive(Debug, Default, Serialize)]
pub struct ReviewFindings {
    pub syntax_issues: Vec<String>,
    pub logic_errors: Vec<String>,
    pub integration_problems: Vec<String>,
    pub consistency_issues: Vec<String>,
    pub improvement_suggestions: Vec<String>,
}

impl ReviewFindings {
    pub fn total(&self) -> usize {
        self.syntax_issues.len()
            + self.logic_errors.len()
            + self.integration_problems.len()
            + self.consistency_issues.len()
            + self.improvement_suggestions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.total() == 0
    }
}

/// Findings from a deep-cadence review, spec.md §4.7.
#[derive(Debug, Default, Serialize)]
pub struct DeepFindings {
    pub performance: Vec<String>,
    pub security: Vec<String>,
    pub documentation: Vec<String>,
    pub maintainability: Vec<String>,
}

impl DeepFindings {
    pub fn total(&self) -> usize {
        self.performance.len()
            + self.security.len()
            + self.documentation.len()
            + self.maintainability.len()
    }

    pub fn is_empty(&self) -> bool {
        self.total() == 0
    }
}

/// Ports `_check_ast_issues`: bare except clauses, `print(` calls that
/// should be logging, and underscore-prefixed names that look unused.
/// A line-based scan rather than `ast.walk` since the core has no Python
/// parser available; adequate for catching the same obvious patterns.
pub fn syntax_issues(filename: &str, content: &str) -> Vec<String> {
    if !is_python(filename) {
        return Vec::new();
    }
    let mut issues = Vec::new();
    for line in content.lines() {
        let trimmed = line.trim();
        if trimmed == "except:" {
            issues.push(format!(
                "Bare except clause found in {filename} - should catch specific exceptions"
            ));
        }
        if trimmed.starts_with("print(") {
            issues.push(format!(
                "Print statement found in {filename} - consider using logging"
            ));
        }
    }
    if let Some(name) = unused_prefixed_assignment_regex().captures(content) {
        if let Some(ident) = name.get(1) {
            issues.push(format!(
                "Potentially unused variable '{}' in {filename}",
                ident.as_str()
            ));
        }
    }
    issues
}

/// Ports `_check_integration_issues`: import statements referring to a
/// module the task did not itself generate are flagged as possibly
/// missing, since the core cannot execute `__import__` to probe the
/// Python environment the way the original did.
pub fn integration_issues(filename: &str, content: &str, local_modules: &HashSet<String>) -> Vec<String> {
    if !is_python(filename) {
        return Vec::new();
    }
    let mut issues = Vec::new();
    for capture in import_regex().captures_iter(content) {
        let module = capture[1].to_string();
        if !local_modules.contains(&module) && !is_stdlib_module(&module) {
            issues.push(format!("Possibly missing dependency '{module}' in {filename}"));
        }
    }
    issues
}

/// Ports `_analyze_code_quality`: file size, missing docstrings, missing
/// type hints.
pub fn improvement_suggestions(filename: &str, content: &str) -> Vec<String> {
    if !is_python(filename) {
        return Vec::new();
    }
    let mut suggestions = Vec::new();
    let non_empty_lines = content.lines().filter(|line| !line.trim().is_empty()).count();
    if non_empty_lines > LARGE_FILE_LINE_THRESHOLD {
        suggestions.push(format!(
            "Large file {filename} ({non_empty_lines} lines) - consider splitting"
        ));
    }
    if content.contains("def ") && !content.contains("\"\"\"") && !content.contains("'''") {
        suggestions.push(format!("Missing docstrings in {filename}"));
    }
    if content.contains("def ") && !content.contains("->") {
        suggestions.push(format!("Consider adding type hints to {filename}"));
    }
    suggestions
}

/// Ports `_check_codebase_consistency`'s filename convention check.
pub fn consistency_issues(filename: &str) -> Vec<String> {
    if !is_python(filename) {
        return Vec::new();
    }
    let base = filename.rsplit('/').next().unwrap_or(filename);
    if !snake_case_regex().is_match(base) {
        return vec![format!(
            "File name '{base}' doesn't follow snake_case convention"
        )];
    }
    Vec::new()
}

/// Ports `_analyze_performance`.
pub fn performance_issues(filename: &str, content: &str) -> Vec<String> {
    if !is_python(filename) {
        return Vec::new();
    }
    let mut issues = Vec::new();
    if range_len_regex().is_match(content) {
        issues.push(format!(
            "Inefficient iteration pattern in {filename} - consider enumerate()"
        ));
    }
    if content.contains("+=") && content.contains("str") {
        issues.push(format!(
            "String concatenation in loop in {filename} - consider join()"
        ));
    }
    issues
}

/// Ports `_analyze_security`.
pub fn security_issues(filename: &str, content: &str) -> Vec<String> {
    if !is_python(filename) {
        return Vec::new();
    }
    let mut issues = Vec::new();
    if content.contains("eval(") {
        issues.push(format!("Dangerous eval() usage in {filename}"));
    }
    if content.contains("exec(") {
        issues.push(format!("Dangerous exec() usage in {filename}"));
    }
    if shell_true_regex().is_match(content) {
        issues.push(format!("Shell injection risk in {filename}"));
    }
    issues
}

/// Ports `_check_documentation_consistency`.
pub fn documentation_issues(filename: &str, content: &str) -> Vec<String> {
    if !is_python(filename) {
        return Vec::new();
    }
    let functions = function_def_regex().find_iter(content).count();
    let documented = documented_function_regex().find_iter(content).count();
    if functions > documented {
        let undocumented = functions - documented;
        vec![format!("{undocumented} undocumented functions in {filename}")]
    } else {
        Vec::new()
    }
}

/// Ports `_analyze_maintainability`.
pub fn maintainability_issues(filename: &str, content: &str) -> Vec<String> {
    if !is_python(filename) {
        return Vec::new();
    }
    let mut issues = Vec::new();
    if ip_address_regex().is_match(content) {
        issues.push(format!("Hard-coded IP address in {filename}"));
    }
    let todo_count = todo_regex().find_iter(content).count();
    if todo_count > 0 {
        issues.push(format!("{todo_count} TODO/FIXME comments in {filename}"));
    }
    issues
}

fn is_stdlib_module(name: &str) -> bool {
    const KNOWN: &[&str] = &[
        "os", "sys", "re", "json", "asyncio", "typing", "pathlib", "datetime", "time", "math",
        "collections", "itertools", "functools", "logging", "subprocess", "sqlite3", "tempfile",
        "ast", "io", "abc", "dataclasses", "enum", "random", "string",
    ];
    KNOWN.contains(&name)
}

macro_rules! cached_regex {
    ($name:ident, $pattern:expr) => {
        fn $name() -> &'static Regex {
            static CELL: OnceLock<Regex> = OnceLock::new();
            #[allow(clippy::unwrap_used)]
            CELL.get_or_init(|| Regex::new($pattern).unwrap())
        }
    };
}

cached_regex!(unused_prefixed_assignment_regex, r"(?m)^\s*(_[A-Za-z_][A-Za-z0-9_]*)\s*=");
cached_regex!(import_regex, r"(?m)^(?:import|from)\s+(\w+)");
cached_regex!(snake_case_regex, r"^[a-z_][a-z0-9_]*\.py$");
cached_regex!(range_len_regex, r"for.*in.*range\(len\(");
cached_regex!(shell_true_regex, r"subprocess\.(call|run|Popen).*shell=True");
cached_regex!(function_def_regex, r"def\s+\w+\s*\([^)]*\):");
cached_regex!(documented_function_regex, r#"def\s+\w+\s*\([^)]*\):\s*"""#);
cached_regex!(ip_address_regex, r"\b\d{1,3}\.\d{1,3}\.\d{1,3}\.\d{1,3}\b");
cached_regex!(todo_regex, r"(?i)#.*TODO|#.*FIXME");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_major_task_keywords_case_insensitively() {
        assert!(is_major_task("Refactor the billing module"));
        assert!(!is_major_task("fix a typo"));
    }

    #[test]
    fn flags_bare_except_and_print_in_python() {
        let issues = syntax_issues("app.py", "try:\n    pass\nexcept:\n    print('oops')\n");
        assert!(issues.iter().any(|issue| issue.contains("Bare except")));
        assert!(issues.iter().any(|issue| issue.contains("Print statement")));
    }

    #[test]
    fn skips_non_python_files() {
        assert!(syntax_issues("main.rs", "except:\nprint(").is_empty());
    }

    #[test]
    fn flags_large_files_missing_docs_and_type_hints() {
        let body: String = std::iter::repeat("x = 1\n").take(101).collect();
        let content = format!("def f():\n{body}");
        let suggestions = improvement_suggestions("big.py", &content);
        assert!(suggestions.iter().any(|s| s.contains("consider splitting")));
        assert!(suggestions.iter().any(|s| s.contains("Missing docstrings")));
        assert!(suggestions.iter().any(|s| s.contains("type hints")));
    }

    #[test]
    fn flags_non_snake_case_filenames() {
        let issues = consistency_issues("CamelCase.py");
        assert_eq!(issues.len(), 1);
    }

    #[test]
    fn flags_eval_and_shell_true() {
        let content = "eval(x)\nsubprocess.run(cmd, shell=True)\n";
        let issues = security_issues("danger.py", content);
        assert!(issues.iter().any(|i| i.contains("eval()")));
        assert!(issues.iter().any(|i| i.contains("Shell injection")));
    }

    #[test]
    fn counts_todo_comments() {
        let content = "# TODO: fix this\n# FIXME: also this\n";
        let issues = maintainability_issues("old.py", content);
        assert!(issues.iter().any(|i| i.contains("2 TODO")));
    }
}
