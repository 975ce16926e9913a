//! Human-readable reveal sheet.

use serde::Serialize;

use super::legend::Legend;

/// Default reveal sheet heading.
pub const REVEAL_TITLE: &str = "CIPHER REVEAL";

/// Answer sheet in plain text and Markdown.
///
/// Never exposed while the cipher window is open.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RevealSheet {
    /// Plain text sheet
    pub text: String,
    /// Markdown sheet
    pub markdown: String,
}

/// Inputs to a reveal sheet.
#[derive(Debug, Clone, Copy)]
pub struct RevealInput<'a> {
    /// Heading
    pub title: &'a str,
    /// Cycle the puzzle belongs to, when known
    pub cycle_id: Option<u64>,
    /// Rendered grid
    pub grid: &'a str,
    /// Normalised phrase
    pub normalized: &'a str,
    /// Canonical answer
    pub answer: &'a str,
    /// Legend used for encoding
    pub legend: &'a Legend,
}

impl RevealSheet {
    /// Renders both forms of the sheet.
    #[must_use]
    pub fn build(input: &RevealInput<'_>) -> Self {
        let cycle = input.cycle_id.map(|id| id.to_string()).unwrap_or_default();
        let legend = input.legend.lines().collect::<Vec<_>>().join("\n");
        let seed = input.legend.seed();

        let text = [
            input.title.to_owned(),
            format!("Cycle: {cycle}"),
            format!("Seed: {seed}"),
            String::new(),
            "CIPHER GRID:".to_owned(),
            input.grid.to_owned(),
            String::new(),
            "PHRASE (NO PUNCT):".to_owned(),
            input.normalized.to_owned(),
            String::new(),
            "NORMALIZED ANSWER (A–Z0–9):".to_owned(),
            input.answer.to_owned(),
            String::new(),
            "LEGEND:".to_owned(),
            legend.clone(),
        ]
        .join("\n");

        let fence = "```";
        let markdown = [
            format!("# {}", input.title),
            String::new(),
            format!("**Cycle:** {cycle}"),
            format!("**Seed:** `{seed}`"),
            String::new(),
            "## Cipher Grid".to_owned(),
            fence.to_owned(),
            input.grid.to_owned(),
            fence.to_owned(),
            String::new(),
            "## Phrase (no punctuation)".to_owned(),
            fence.to_owned(),
            input.normalized.to_owned(),
            fence.to_owned(),
            String::new(),
            "## Normalized Answer (A–Z0–9)".to_owned(),
            format!("`{}`", input.answer),
            String::new(),
            "## Legend".to_owned(),
            fence.to_owned(),
            legend,
            fence.to_owned(),
        ]
        .join("\n");

        Self { text, markdown }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sheet(cycle_id: Option<u64>) -> RevealSheet {
        let legend = Legend::build("cycle:7").unwrap();
        RevealSheet::build(&RevealInput {
            title: REVEAL_TITLE,
            cycle_id,
            grid: "⊘ ◓ ■",
            normalized: "HELLO WORLD",
            answer: "HELLOWORLD",
            legend: &legend,
        })
    }

    #[test]
    fn test_text_sheet_layout() {
        let sheet = sheet(Some(7));
        let lines: Vec<&str> = sheet.text.lines().collect();
        assert_eq!(lines[0], "CIPHER REVEAL");
        assert_eq!(lines[1], "Cycle: 7");
        assert_eq!(lines[2], "Seed: cycle:7");
        assert_eq!(lines[4], "CIPHER GRID:");
        assert_eq!(lines[11], "HELLOWORLD");
        assert_eq!(lines[13], "LEGEND:");
        assert_eq!(lines[14], "A → ○");
        assert_eq!(lines.len(), 14 + 36);
    }

    #[test]
    fn test_missing_cycle_renders_empty() {
        let sheet = sheet(None);
        assert!(sheet.text.contains("\nCycle: \n"));
        assert!(sheet.markdown.contains("**Cycle:** \n"));
    }

    #[test]
    fn test_markdown_sheet_sections() {
        let md = sheet(Some(3)).markdown;
        assert!(md.starts_with("# CIPHER REVEAL\n"));
        assert!(md.contains("**Seed:** `cycle:7`"));
        assert!(md.contains("## Cipher Grid\n```\n⊘ ◓ ■\n```"));
        assert!(md.contains("`HELLOWORLD`"));
        assert!(md.ends_with("9 → ▼\n```"));
    }
}
