use super::types::AgentRole;

/// Observer for the human-readable narration of a run.
///
/// Lines are role-tagged so the same stream can be printed or replayed as
/// context for an external agent runtime.
pub trait Transcript {
    /// Called for every narrated line
    fn on_line(&mut self, role: AgentRole, line: &str);

    /// Called for section banners (unit headers, changeovers, completion)
    fn on_banner(&mut self, text: &str);
}

/// Prints the narration to stdout
#[derive(Debug, Default)]
pub struct StdoutTranscript;

impl Transcript for StdoutTranscript {
    fn on_line(&mut self, role: AgentRole, line: &str) {
        println!("[{}] {}", role, line);
    }

    fn on_banner(&mut self, text: &str) {
        let rule = "━".repeat(60);
        println!("\n{}\n{}\n{}\n", rule, text, rule);
    }
}

/// One recorded transcript entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TranscriptEntry {
    Line { role: AgentRole, text: String },
    Banner(String),
}

/// Keeps every entry in memory
#[derive(Debug, Default, Clone)]
pub struct RecordingTranscript {
    entries: Vec<TranscriptEntry>,
}

impl RecordingTranscript {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> &[TranscriptEntry] {
        &self.entries
    }

    /// Lines spoken by one role, in order
    pub fn lines_for(&self, role: AgentRole) -> Vec<&str> {
        self.entries
            .iter()
            .filter_map(|entry| match entry {
                TranscriptEntry::Line { role: r, text } if *r == role => Some(text.as_str()),
                _ => None,
            })
            .collect()
    }

    pub fn banners(&self) -> Vec<&str> {
        self.entries
            .iter()
            .filter_map(|entry| match entry {
                TranscriptEntry::Banner(text) => Some(text.as_str()),
                _ => None,
            })
            .collect()
    }

    /// Index of the first entry whose text contains `needle`
    pub fn position_of(&self, needle: &str) -> Option<usize> {
        self.entries.iter().position(|entry| match entry {
            TranscriptEntry::Line { text, .. } | TranscriptEntry::Banner(text) => {
                text.contains(needle)
            }
        })
    }

    /// Render the transcript the way [`StdoutTranscript`] prints it
    pub fn render(&self) -> String {
        let mut out = String::new();
        for entry in &self.entries {
            match entry {
                TranscriptEntry::Line { role, text } => {
                    out.push_str(&format!("[{}] {}\n", role, text));
                }
                TranscriptEntry::Banner(text) => {
                    out.push_str(&format!("== {} ==\n", text));
                }
            }
        }
        out
    }
}

impl Transcript for RecordingTranscript {
    fn on_line(&mut self, role: AgentRole, line: &str) {
        self.entries.push(TranscriptEntry::Line {
            role,
            text: line.to_string(),
        });
    }

    fn on_banner(&mut self, text: &str) {
        self.entries.push(TranscriptEntry::Banner(text.to_string()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recording_filters_by_role() {
        let mut transcript = RecordingTranscript::new();
        transcript.on_line(AgentRole::Planning, "Starting Widget-A production (3 units)");
        transcript.on_banner("PRODUCT: Widget-A (Unit 1/5)");
        transcript.on_line(AgentRole::Quality, "PASS");

        assert_eq!(transcript.entries().len(), 3);
        assert_eq!(transcript.lines_for(AgentRole::Quality), vec!["PASS"]);
        assert_eq!(transcript.banners(), vec!["PRODUCT: Widget-A (Unit 1/5)"]);
        assert_eq!(transcript.position_of("Unit 1/5"), Some(1));
        assert!(transcript.render().contains("[Planning Agent] Starting Widget-A"));
    }
}
