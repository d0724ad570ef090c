//! Greedy word wrap over the static metric tables.

use crate::layout::font_metrics::FontMetricTable;

/// Wraps `text` into lines no wider than `max_width_em`.
///
/// Explicit newlines start a new line; a blank input line is kept as an empty
/// line so paragraph spacing survives. A single word wider than the line is
/// placed on its own line rather than split.
pub fn wrap_text(text: &str, metrics: &FontMetricTable, max_width_em: f32) -> Vec<String> {
    let mut lines = Vec::new();

    for paragraph in text.lines() {
        let words: Vec<&str> = paragraph.split_whitespace().collect();
        if words.is_empty() {
            lines.push(String::new());
            continue;
        }

        let mut current = String::new();
        let mut current_width = 0.0_f32;

        for word in words {
            let word_w = metrics.measure_str(word);

            if current.is_empty() {
                current.push_str(word);
                current_width = word_w;
            } else if current_width + metrics.space_width + word_w > max_width_em {
                lines.push(std::mem::take(&mut current));
                current.push_str(word);
                current_width = word_w;
            } else {
                current.push(' ');
                current.push_str(word);
                current_width += metrics.space_width + word_w;
            }
        }
        lines.push(current);
    }

    // Trailing blank lines add nothing but vertical space.
    while lines.last().is_some_and(|l| l.is_empty()) {
        lines.pop();
    }
    lines
}
