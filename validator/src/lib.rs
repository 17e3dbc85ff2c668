mod error;
mod extract;
mod syntax;
mod test_run;

pub use error::Result;
pub use error::ValidatorError;
pub use extract::extract_code_blocks;
pub use syntax::check_syntax;
pub use syntax::SyntaxCheckResult;
pub use test_run::run_tests;
pub use test_run::TestRunConfig;
pub use test_run::TestRunResult;

use indexmap::IndexMap;

/// Full generate-validate report for one piece of generated text: extracted
/// files, their syntax verdicts, and (if every file passed syntax) the test
/// run outcome.
#[derive(Debug, Clone)]
pub struct ValidationReport {
    pub files: IndexMap<String, String>,
    pub syntax: IndexMap<String, SyntaxCheckResult>,
    pub tests: Option<TestRunResult>,
}

impl ValidationReport {
    pub fn passed(&self) -> bool {
        let syntax_ok = self.syntax.values().all(|result| result.valid);
        let tests_ok = match &self.tests {
            Some(result) => result.ok,
            None => true,
        };
        !self.files.is_empty() && syntax_ok && tests_ok
    }
}

/// Runs the full generate-validate pipeline: extract code blocks, check
/// their syntax, and, only if every block is syntactically valid, run the
/// configured test command against them. Skipping the test run on a syntax
/// failure mirrors the original's short-circuit: there is no point
/// executing tests against code that will not even parse.
pub async fn validate(generated_text: &str, config: &TestRunConfig) -> Result<ValidationReport> {
    let files = extract_code_blocks(generated_text);
    if files.is_empty() {
        return Err(ValidatorError::NoCodeBlocks);
    }

    let syntax = check_syntax(&files);
    let tests = if syntax.values().all(|result| result.valid) {
        Some(run_tests(&files, config).await?)
    } else {
        None
    };

    Ok(ValidationReport {
        files,
        syntax,
        tests,
    })
}
