//! Text + selection model of the page body being edited.
//!
//! Offsets are UTF-8 byte offsets into `text`; the browser reports textarea
//! selections in UTF-16 code units, see [`utf16_to_byte`].

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Selection {
    pub start: usize,
    pub end: usize,
}

impl Selection {
    pub fn new(start: usize, end: usize) -> Self {
        if start <= end {
            Self { start, end }
        } else {
            Self {
                start: end,
                end: start,
            }
        }
    }

    pub fn cursor(pos: usize) -> Self {
        Self {
            start: pos,
            end: pos,
        }
    }

    /// Clamps into `text` and snaps both ends back onto char boundaries.
    pub fn clamp_to(self, text: &str) -> Self {
        Self::new(
            floor_char_boundary(text, self.start),
            floor_char_boundary(text, self.end),
        )
    }
}

/// The body under edit plus where the caret is.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct BodyBuffer {
    pub text: String,
    /// `None` until the textarea has reported a caret.
    pub selection: Option<Selection>,
}

impl BodyBuffer {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            selection: None,
        }
    }

    /// Stores a caret reported by the browser; stale offsets are clamped.
    pub fn set_selection(&mut self, selection: Selection) {
        self.selection = Some(selection.clamp_to(&self.text));
    }

    /// Replaces the selection with `snippet`, or appends it on its own line
    /// when no caret is known. Returns the caret, which ends after the
    /// snippet.
    pub fn insert_snippet(&mut self, snippet: &str) -> Selection {
        let (range, insert) = match self.selection {
            Some(selection) => (selection, snippet.to_string()),
            None => {
                let end = self.text.len();
                let glue = if self.text.is_empty() || self.text.ends_with('\n') {
                    ""
                } else {
                    "\n"
                };
                (Selection::cursor(end), format!("{glue}{snippet}"))
            }
        };

        self.text.replace_range(range.start..range.end, &insert);
        let caret = Selection::cursor(range.start + insert.len());
        self.selection = Some(caret);
        tracing::trace!(at = range.start, len = insert.len(), "snippet inserted");
        caret
    }
}

fn floor_char_boundary(text: &str, pos: usize) -> usize {
    let mut pos = pos.min(text.len());
    while !text.is_char_boundary(pos) {
        pos -= 1;
    }
    pos
}

/// Converts a UTF-16 offset (as reported by `selectionStart`) to a byte
/// offset into `text`.
pub fn utf16_to_byte(text: &str, utf16_offset: usize) -> usize {
    let mut units = 0usize;
    for (byte_idx, ch) in text.char_indices() {
        if units >= utf16_offset {
            return byte_idx;
        }
        units += ch.len_utf16();
    }
    text.len()
}

pub fn byte_to_utf16(text: &str, byte_offset: usize) -> usize {
    let end = floor_char_boundary(text, byte_offset);
    text[..end].encode_utf16().count()
}
