/// Byte offset → line number conversion.
///
/// `mago_span` positions only carry byte offsets, while every reflection
/// getter reports 1-based line numbers.  The index stores the offset of
/// each line start once per parse and answers lookups with a binary search.
pub(crate) struct LineIndex {
    line_starts: Vec<u32>,
}

impl LineIndex {
    pub(crate) fn new(content: &str) -> Self {
        let mut line_starts = Vec::with_capacity(content.len() / 32 + 1);
        line_starts.push(0);
        line_starts.extend(memchr::memchr_iter(b'\n', content.as_bytes()).map(|i| i as u32 + 1));
        Self { line_starts }
    }

    /// 1-based line containing `offset`.
    pub(crate) fn line_of(&self, offset: u32) -> u32 {
        self.line_starts.partition_point(|&start| start <= offset) as u32
    }

    /// Number of lines in the source (a trailing newline does not open a
    /// new line).
    pub(crate) fn line_count(&self, content: &str) -> u32 {
        let count = self.line_starts.len() as u32;
        if content.ends_with('\n') { count - 1 } else { count }
    }
}
