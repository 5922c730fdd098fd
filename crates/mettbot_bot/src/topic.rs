//! Word-level topic diffs.
//!
//! Differences are computed as tagged spans and only turned into chat
//! formatting at render time.

/// One run of words in a diff.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DiffSpan {
    /// Present in both versions
    Unchanged(String),
    /// Only in the new version
    Inserted(String),
    /// Only in the old version
    Deleted(String),
}

impl DiffSpan {
    fn same_tag(&self, other: &Self) -> bool {
        std::mem::discriminant(self) == std::mem::discriminant(other)
    }

    fn text_mut(&mut self) -> &mut String {
        match self {
            Self::Unchanged(text) | Self::Inserted(text) | Self::Deleted(text) => text,
        }
    }
}

// Bold red underline for deletions, bold green for insertions, grey afterwards.
const DELETED_START: &str = "\x035\x1F\x02";
const INSERTED_START: &str = "\x033\x02";
const SPAN_END: &str = "\x0F\x0315";

fn push_word(spans: &mut Vec<DiffSpan>, span: DiffSpan) {
    if let Some(last) = spans.last_mut() {
        if last.same_tag(&span) {
            let mut span = span;
            let text = last.text_mut();
            text.push(' ');
            text.push_str(span.text_mut());
            return;
        }
    }
    spans.push(span);
}

/// Diffs two texts word by word using a longest common subsequence.
///
/// # Examples
///
/// ```
/// use mettbot_bot::{DiffSpan, diff_words};
///
/// assert_eq!(
///     diff_words("mett is good", "mett is great"),
///     vec![
///         DiffSpan::Unchanged("mett is".to_string()),
///         DiffSpan::Deleted("good".to_string()),
///         DiffSpan::Inserted("great".to_string()),
///     ]
/// );
/// ```
pub fn diff_words(old: &str, new: &str) -> Vec<DiffSpan> {
    let a: Vec<&str> = old.split_whitespace().collect();
    let b: Vec<&str> = new.split_whitespace().collect();

    // lcs[i][j]: common subsequence length of a[i..] and b[j..]
    let mut lcs = vec![vec![0usize; b.len() + 1]; a.len() + 1];
    for i in (0..a.len()).rev() {
        for j in (0..b.len()).rev() {
            lcs[i][j] = if a[i] == b[j] {
                lcs[i + 1][j + 1] + 1
            } else {
                lcs[i + 1][j].max(lcs[i][j + 1])
            };
        }
    }

    let mut spans = Vec::new();
    let (mut i, mut j) = (0, 0);
    while i < a.len() && j < b.len() {
        if a[i] == b[j] {
            push_word(&mut spans, DiffSpan::Unchanged(a[i].to_string()));
            i += 1;
            j += 1;
        } else if lcs[i + 1][j] >= lcs[i][j + 1] {
            push_word(&mut spans, DiffSpan::Deleted(a[i].to_string()));
            i += 1;
        } else {
            push_word(&mut spans, DiffSpan::Inserted(b[j].to_string()));
            j += 1;
        }
    }
    for word in &a[i..] {
        push_word(&mut spans, DiffSpan::Deleted(word.to_string()));
    }
    for word in &b[j..] {
        push_word(&mut spans, DiffSpan::Inserted(word.to_string()));
    }
    spans
}

/// Renders spans with IRC colour codes.
pub fn render_irc(spans: &[DiffSpan]) -> String {
    spans
        .iter()
        .map(|span| match span {
            DiffSpan::Unchanged(text) => text.clone(),
            DiffSpan::Inserted(text) => format!("{}{}{}", INSERTED_START, text, SPAN_END),
            DiffSpan::Deleted(text) => format!("{}{}{}", DELETED_START, text, SPAN_END),
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Whether a diff contains any change.
pub fn has_changes(spans: &[DiffSpan]) -> bool {
    spans
        .iter()
        .any(|span| !matches!(span, DiffSpan::Unchanged(_)))
}
