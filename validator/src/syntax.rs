use indexmap::IndexMap;

/// Outcome of a single file's fast structural check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyntaxCheckResult {
    pub valid: bool,
    pub error: Option<String>,
}

/// Fast, language-agnostic "does this parse" proxy for
/// `test_runner.py::validate_python_syntax`'s `compile(..., 'exec')` oracle.
/// The core cannot invoke a real compiler for a language it doesn't know in
/// advance, so this checks that brackets/parens/braces and quotes balance,
/// which catches the large majority of truncated or malformed generations.
pub fn check_syntax(files: &IndexMap<String, String>) -> IndexMap<String, SyntaxCheckResult> {
    files
        .iter()
        .map(|(name, source)| (name.clone(), check_one(source)))
        .collect()
}

fn check_one(source: &str) -> SyntaxCheckResult {
    let mut stack = Vec::new();
    let mut in_string: Option<char> = None;
    let mut escaped = false;

    for ch in source.chars() {
        if let Some(quote) = in_string {
            if escaped {
                escaped = false;
            } else if ch == '\\' {
                escaped = true;
            } else if ch == quote {
                in_string = None;
            }
            continue;
        }

        match ch {
            '"' | '\'' => in_string = Some(ch),
            '(' | '[' | '{' => stack.push(ch),
            ')' => {
                if stack.pop() != Some('(') {
                    return mismatch(ch);
                }
            }
            ']' => {
                if stack.pop() != Some('[') {
                    return mismatch(ch);
                }
            }
            '}' => {
                if stack.pop() != Some('{') {
                    return mismatch(ch);
                }
            }
            _ => {}
        }
    }

    if in_string.is_some() {
        return SyntaxCheckResult {
            valid: false,
            error: Some("unterminated string literal".to_string()),
        };
    }
    if let Some(unclosed) = stack.last() {
        return SyntaxCheckResult {
            valid: false,
            error: Some(format!("unclosed delimiter '{unclosed}'")),
        };
    }

    SyntaxCheckResult {
        valid: true,
        error: None,
    }
}

fn mismatch(ch: char) -> SyntaxCheckResult {
    SyntaxCheckResult {
        valid: false,
        error: Some(format!("unexpected closing delimiter '{ch}'")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn balanced_source_is_valid() {
        let result = check_one("fn main() { let v = vec![1, 2, \"a)b\"]; }");
        assert!(result.valid);
    }

    #[test]
    fn unclosed_brace_is_invalid() {
        let result = check_one("fn main() {");
        assert!(!result.valid);
    }

    #[test]
    fn unterminated_string_is_invalid() {
        let result = check_one("let s = \"unterminated");
        assert!(!result.valid);
    }

    #[test]
    fn mismatched_delimiter_is_invalid() {
        let result = check_one("fn main( ]");
        assert!(!result.valid);
    }
}
