//! Cleanup of raw engine output.

const MAX_LINE_CHARS: usize = 40;
const MIN_NUMERIC_LINE: usize = 4;

/// Drops blank lines and short purely-numeric lines (counters, prices) and
/// truncates runaway lines.
pub fn tidy(raw: &str) -> String {
    raw.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .filter(|line| {
            let digits_only = line.chars().all(|c| c.is_ascii_digit());
            !(digits_only && line.chars().count() < MIN_NUMERIC_LINE)
        })
        .map(|line| line.chars().take(MAX_LINE_CHARS).collect::<String>())
        .collect::<Vec<_>>()
        .join("\n")
}

/// Letters, digits and ideographs; punctuation and whitespace don't count.
pub fn meaningful_chars(text: &str) -> usize {
    text.chars().filter(|c| c.is_alphanumeric()).count()
}
