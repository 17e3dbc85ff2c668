use indexmap::IndexMap;

/// Ordered `filename -> source` extraction from a generation backend's raw
/// output. Ports `test_runner.py::extract_code_blocks` line-for-line:
/// `# File:`/`# filename:` markers start a new file, fenced ```lang blocks
/// toggle collection, a lone ``` toggles the default-language block, and
/// repeated markers for the same filename concatenate.
pub fn extract_code_blocks(generated_text: &str) -> IndexMap<String, String> {
    let mut blocks: IndexMap<String, Vec<String>> = IndexMap::new();
    let mut current_file: Option<String> = None;
    let mut current_code: Vec<String> = Vec::new();
    let mut in_code_block = false;

    let flush = |blocks: &mut IndexMap<String, Vec<String>>,
                 file: &Option<String>,
                 code: &mut Vec<String>| {
        if let Some(name) = file {
            if !code.is_empty() {
                blocks
                    .entry(name.clone())
                    .or_default()
                    .extend(code.drain(..));
                return;
            }
        }
        code.clear();
    };

    for line in generated_text.lines() {
        if line.contains("# File:") || line.contains("# filename:") {
            flush(&mut blocks, &current_file, &mut current_code);
            current_file = line.rsplit(':').next().map(|name| name.trim().to_string());
            continue;
        }

        let trimmed = line.trim();
        if trimmed.starts_with("```") {
            if trimmed == "```" {
                in_code_block = !in_code_block;
            } else {
                in_code_block = true;
            }
            continue;
        }

        if in_code_block || (current_file.is_some() && !line.starts_with('#')) {
            current_code.push(line.to_string());
        }
    }
    flush(&mut blocks, &current_file, &mut current_code);

    let mut result: IndexMap<String, String> = blocks
        .into_iter()
        .map(|(name, lines)| (name, lines.join("\n")))
        .collect();

    if result.is_empty() && !generated_text.trim().is_empty() {
        let clean_code = strip_markdown_fences(generated_text);
        let filename = format!("main.{}", guess_extension(generated_text));
        result.insert(filename, clean_code.trim().to_string());
    }

    result
}

/// Detects a fenced code block's language tag (e.g. ```rust) and maps it to
/// a source file extension, generalizing the original's hardcoded
/// `main.py` fallback to any language the adapter might emit.
fn guess_extension(text: &str) -> &'static str {
    for line in text.lines() {
        let trimmed = line.trim();
        if let Some(tag) = trimmed.strip_prefix("```") {
            let tag = tag.trim().to_lowercase();
            let extension = match tag.as_str() {
                "python" | "py" => "py",
                "rust" | "rs" => "rs",
                "javascript" | "js" => "js",
                "typescript" | "ts" => "ts",
                "go" | "golang" => "go",
                "java" => "java",
                "c++" | "cpp" | "cxx" => "cpp",
                "c" => "c",
                "ruby" | "rb" => "rb",
                "bash" | "sh" | "shell" => "sh",
                _ => continue,
            };
            return extension;
        }
    }
    "txt"
}

fn strip_markdown_fences(text: &str) -> String {
    if !text.contains("```") {
        return text.to_string();
    }
    let parts: Vec<&str> = text.split("```").collect();
    let mut code_parts = Vec::new();
    for (index, part) in parts.iter().enumerate() {
        if index % 2 == 1 {
            let mut lines = part.lines();
            let first = lines.next().unwrap_or("");
            let rest: Vec<&str> = if first.trim().chars().all(|c| c.is_alphanumeric()) && !first.trim().is_empty()
            {
                lines.collect()
            } else {
                std::iter::once(first).chain(lines).collect()
            };
            code_parts.push(rest.join("\n"));
        }
    }
    code_parts.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_explicit_file_markers() {
        let text = "# File: lib.rs\nfn add(a: i32, b: i32) -> i32 { a + b }\n";
        let blocks = extract_code_blocks(text);
        assert_eq!(blocks.len(), 1);
        assert!(blocks["lib.rs"].contains("fn add"));
    }

    #[test]
    fn concatenates_repeated_markers_for_the_same_file() {
        let text = "# File: lib.rs\nfn a() {}\n# File: lib.rs\nfn b() {}\n";
        let blocks = extract_code_blocks(text);
        assert_eq!(blocks.len(), 1);
        assert!(blocks["lib.rs"].contains("fn a()"));
        assert!(blocks["lib.rs"].contains("fn b()"));
    }

    #[test]
    fn falls_back_to_a_single_default_file_with_guessed_extension() {
        let text = "Here you go:\n```rust\nfn main() {}\n```\n";
        let blocks = extract_code_blocks(text);
        assert_eq!(blocks.len(), 1);
        assert!(blocks.contains_key("main.rs"));
        assert!(blocks["main.rs"].contains("fn main"));
    }

    #[test]
    fn never_panics_on_arbitrary_text() {
        for text in ["", "```", "random\ntext\nwith no markers", "# File:\n"] {
            let _ = extract_code_blocks(text);
        }
    }

    #[test]
    fn is_idempotent_when_fed_its_own_concatenated_output() {
        let text = "# File: a.py\nprint('hi')\n";
        let first = extract_code_blocks(text);
        let rebuilt: String = first
            .iter()
            .map(|(name, code)| format!("# File: {name}\n{code}\n"))
            .collect();
        let second = extract_code_blocks(&rebuilt);
        assert_eq!(first, second);
    }
}
