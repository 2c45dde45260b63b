//! Display-sized snippet windowing

use regex::Regex;

use crate::types::ScoredPoint;

/// Bounds passage text to a `[min, max]` character window
///
/// Texts within the window pass through verbatim. Longer texts keep whole
/// leading sentences while they fit; boundaries are taken from the source
/// text, never fabricated. When even that leaves the snippet under `min`
/// (a single overlong sentence), the text is hard-truncated at `max`.
pub struct SnippetWindow {
    min: usize,
    max: usize,
    sentence_end: Regex,
}

impl SnippetWindow {
    pub fn new(min: usize, max: usize) -> Self {
        Self {
            min,
            max,
            sentence_end: Regex::new(r"[.!?]+\s+").expect("valid sentence pattern"),
        }
    }

    /// Window a single passage
    pub fn window(&self, text: &str) -> String {
        if text.chars().count() <= self.max {
            return text.to_string();
        }

        // Longest prefix of whole sentences that fits the window
        let mut end_byte = 0usize;
        for boundary in self.sentence_end.find_iter(text) {
            let prefix_chars = text[..boundary.end()].chars().count();
            if prefix_chars > self.max {
                break;
            }
            end_byte = boundary.end();
        }

        let snippet = text[..end_byte].trim();
        if snippet.chars().count() >= self.min {
            return snippet.to_string();
        }

        let hard_cut: String = text.chars().take(self.max).collect();
        hard_cut.trim().to_string()
    }

    /// Window every candidate's passage text in place
    pub fn window_candidates(&self, mut candidates: Vec<ScoredPoint>) -> Vec<ScoredPoint> {
        for candidate in &mut candidates {
            candidate.payload.text = self.window(&candidate.payload.text);
        }
        candidates
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_text_passes_verbatim() {
        let window = SnippetWindow::new(10, 50);
        assert_eq!(window.window("A short note."), "A short note.");
    }

    #[test]
    fn long_text_keeps_whole_sentences() {
        let window = SnippetWindow::new(10, 40);
        let text = "First sentence here. Second one too. A third sentence that pushes past the limit.";
        let snippet = window.window(text);
        assert_eq!(snippet, "First sentence here. Second one too.");
        assert!(text.starts_with(&snippet));
    }

    #[test]
    fn never_exceeds_max() {
        let window = SnippetWindow::new(10, 40);
        let text = "Words. ".repeat(30);
        assert!(window.window(&text).chars().count() <= 40);
    }

    #[test]
    fn single_overlong_sentence_hard_truncates() {
        let window = SnippetWindow::new(10, 30);
        let text = "x".repeat(100);
        let snippet = window.window(&text);
        assert_eq!(snippet.chars().count(), 30);
        assert!(text.starts_with(&snippet));
    }

    #[test]
    fn no_fabricated_boundaries() {
        let window = SnippetWindow::new(5, 25);
        let text = "One short. Then a sentence that is definitely too long to fit.";
        let snippet = window.window(&text);
        // Whatever survived must be a prefix of the source
        assert!(text.starts_with(&snippet));
    }
}
