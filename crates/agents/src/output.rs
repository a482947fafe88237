//! Helpers for digging structured content out of free-form model output.

/// Extract the first balanced JSON object from a string that may contain
/// surrounding prose.
pub fn extract_json_object(s: &str) -> Option<&str> {
    let start = s.find('{')?;
    let mut depth = 0;
    let mut end = start;

    for (i, c) in s[start..].char_indices() {
        match c {
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    end = start + i + 1;
                    break;
                }
            }
            _ => {}
        }
    }

    if depth == 0 && end > start {
        Some(&s[start..end])
    } else {
        None
    }
}

/// The answer a derivation asserts.
///
/// Prefers an explicit `Final answer:`/`Answer:` line (last occurrence
/// wins), then the last line containing `=`, then the last non-empty line.
pub fn extract_final_answer(text: &str) -> Option<String> {
    let lines: Vec<&str> = text.lines().map(str::trim).filter(|l| !l.is_empty()).collect();
    if lines.is_empty() {
        return None;
    }

    for line in lines.iter().rev() {
        let lower = line.to_lowercase();
        for marker in ["final answer", "answer"] {
            if lower.starts_with(marker) {
                if let Some(colon) = line.find(':') {
                    let answer = line[colon + 1..].trim();
                    if !answer.is_empty() {
                        return Some(trim_answer(answer));
                    }
                }
            }
        }
    }

    if let Some(line) = lines.iter().rev().find(|l| l.contains('=')) {
        return Some(trim_answer(line));
    }

    lines.last().map(|l| trim_answer(l))
}

fn trim_answer(answer: &str) -> String {
    answer
        .trim()
        .trim_end_matches('.')
        .trim_matches(|c| c == '*' || c == '`')
        .trim()
        .to_string()
}

/// Parse a numbered walkthrough (`1. …`, `2) …`, `Step 3: …`) into step
/// texts, in order. Unnumbered lines continue the previous step.
pub fn parse_numbered_steps(text: &str) -> Vec<String> {
    let mut steps: Vec<String> = Vec::new();

    for raw_line in text.lines() {
        let line = raw_line.trim();
        if line.is_empty() {
            continue;
        }

        if let Some(content) = strip_step_prefix(line) {
            steps.push(content.to_string());
        } else if let Some(last) = steps.last_mut() {
            last.push(' ');
            last.push_str(line);
        }
    }

    steps
}

/// Strip a leading `N.`, `N)`, `N:`, or `Step N[.:)]` marker.
fn strip_step_prefix(line: &str) -> Option<&str> {
    let lower = line.to_lowercase();
    let after_word = if lower.starts_with("step") {
        line[4..].trim_start()
    } else {
        line
    };

    let digits = after_word.chars().take_while(|c| c.is_ascii_digit()).count();
    if digits == 0 {
        return None;
    }

    let rest = &after_word[digits..];
    let rest = rest.strip_prefix(['.', ')', ':'])?;
    let content = rest.trim_start();
    (!content.is_empty()).then_some(content)
}
