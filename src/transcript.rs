#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum EntryKind {
    Input,
    Output,
}

#[derive(Debug, Clone, Eq, PartialEq)]
pub struct TranscriptEntry {
    pub kind: EntryKind,
    pub content: String,
}

impl TranscriptEntry {
    pub fn input(content: impl Into<String>) -> Self {
        Self {
            kind: EntryKind::Input,
            content: content.into(),
        }
    }

    pub fn output(content: impl Into<String>) -> Self {
        Self {
            kind: EntryKind::Output,
            content: content.into(),
        }
    }
}

/// Append-only log of what the terminal has shown, in display order.
///
/// Every mutation bumps `revision`, which the renderer watches to snap the view
/// back to the newest entry.
#[derive(Debug, Clone, Default)]
pub struct Transcript {
    entries: Vec<TranscriptEntry>,
    revision: u64,
}

impl Transcript {
    pub fn append(&mut self, entry: TranscriptEntry) {
        self.entries.push(entry);
        self.revision = self.revision.wrapping_add(1);
    }

    pub fn reset(&mut self) {
        self.entries.clear();
        self.revision = self.revision.wrapping_add(1);
    }

    pub fn entries(&self) -> &[TranscriptEntry] {
        &self.entries
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }
}
