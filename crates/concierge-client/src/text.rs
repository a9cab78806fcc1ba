/// Greedy word wrap. Width is measured in chars. Words longer than
/// `width` are broken across lines on char boundaries.
pub fn wrap_text(text: &str, width: usize) -> String {
    wrap_lines(text, width, "").join("\n")
}

/// Splits after at most `count` chars, always on a char boundary.
fn split_at_char(text: &str, count: usize) -> (&str, &str) {
    match text.char_indices().nth(count) {
        Some((index, _)) => text.split_at(index),
        None => (text, ""),
    }
}

/// Wraps into lines, prefixing continuation lines with `indent` and
/// breaking words that exceed the width outright.
pub(crate) fn wrap_lines(text: &str, width: usize, indent: &str) -> Vec<String> {
    let mut lines: Vec<String> = Vec::new();
    let mut current = String::new();
    let mut current_width = 0usize;
    for word in text.split_whitespace() {
        let word_width = word.chars().count();
        if current_width > 0 && current_width + 1 + word_width > width {
            lines.push(current);
            current = String::new();
            current_width = 0;
        }
        if current_width == 0 {
            let mut remainder = word;
            loop {
                let prefix = if lines.is_empty() { "" } else { indent };
                let prefix_width = prefix.chars().count();
                let budget = width.saturating_sub(prefix_width).max(1);
                let (head, tail) = split_at_char(remainder, budget);
                if tail.is_empty() {
                    current = format!("{prefix}{head}");
                    current_width = prefix_width + head.chars().count();
                    break;
                }
                lines.push(format!("{prefix}{head}"));
                remainder = tail;
            }
        } else {
            current.push(' ');
            current.push_str(word);
            current_width += 1 + word_width;
        }
    }
    if !current.is_empty() {
        lines.push(current);
    }
    lines
}
