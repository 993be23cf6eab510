//! Indented text output shared by the backends.

pub(crate) struct CodeWriter {
    output: String,
    indent: usize,
    unit: &'static str,
}

impl CodeWriter {
    pub(crate) fn new(unit: &'static str) -> Self {
        Self {
            output: String::new(),
            indent: 0,
            unit,
        }
    }

    fn push_indent(&mut self) {
        for _ in 0..self.indent {
            self.output.push_str(self.unit);
        }
    }

    /// Writes one indented line. Empty text writes a bare newline.
    pub(crate) fn line(&mut self, text: impl AsRef<str>) {
        let text = text.as_ref();
        if !text.is_empty() {
            self.push_indent();
            self.output.push_str(text);
        }
        self.output.push('\n');
    }

    /// Writes a blank line unless the output is empty or already ends in one.
    pub(crate) fn blank(&mut self) {
        if !self.output.is_empty() && !self.output.ends_with("\n\n") {
            self.output.push('\n');
        }
    }

    /// Appends pre-rendered text verbatim.
    pub(crate) fn raw(&mut self, text: &str) {
        self.output.push_str(text);
    }

    pub(crate) fn indent(&mut self) {
        self.indent += 1;
    }

    pub(crate) fn dedent(&mut self) {
        self.indent = self.indent.saturating_sub(1);
    }

    /// Writes `open`, the indented body, then `close`.
    pub(crate) fn block(&mut self, open: impl AsRef<str>, close: &str, body: impl FnOnce(&mut Self)) {
        self.line(open);
        self.indent();
        body(self);
        self.dedent();
        self.line(close);
    }

    /// Writes each line of `text` as a comment with the given prefix.
    pub(crate) fn doc(&mut self, prefix: &str, text: &str) {
        for line in text.lines() {
            if line.trim().is_empty() {
                self.line(prefix.trim_end());
            } else {
                self.line(format!("{prefix}{line}"));
            }
        }
    }

    pub(crate) fn finish(self) -> String {
        self.output
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_block_indents_body() {
        let mut writer = CodeWriter::new("    ");
        writer.block("pub struct A {", "}", |w| {
            w.line("pub a: i32,");
            w.line("");
        });
        writer.blank();
        writer.blank();
        writer.doc("/// ", "first\n\nsecond");
        assert_eq!(
            writer.finish(),
            "pub struct A {\n    pub a: i32,\n\n}\n\n/// first\n///\n/// second\n"
        );
    }
}
