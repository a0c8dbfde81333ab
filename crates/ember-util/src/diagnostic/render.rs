//! Diagnostic rendering.
//!
//! Formats a [`Diagnostic`] for terminal output:
//!
//! ```text
//! Error at '=': Invalid assignment target.
//!   At file main.em, line 3, column 6
//! a + b = c;
//!       ^ HERE
//! ```
//!
//! The source line is printed with tabs expanded to four spaces so the
//! caret column lines up with the lexer's width-4 tab accounting.

use super::Diagnostic;

/// Tab stop width used when expanding source lines for display. Must
/// match the lexer's column accounting.
const TAB_WIDTH: usize = 4;

impl Diagnostic {
    /// Render this diagnostic against the source it was reported for.
    ///
    /// # Arguments
    ///
    /// * `file` - Display name of the source ("main.em", "<repl>", ...)
    /// * `source` - The full source text the diagnostic refers to
    pub fn render(&self, file: &str, source: &str) -> String {
        let mut out = format!("{}{}: {}\n", self.level, self.context, self.message);
        out.push_str(&format!(
            "  At file {}, line {}, column {}\n",
            file, self.span.line, self.span.column
        ));

        if let Some(line) = source.lines().nth(self.span.line.saturating_sub(1) as usize) {
            let expanded = line.replace('\t', &" ".repeat(TAB_WIDTH));
            out.push_str(&expanded);
            out.push('\n');
            for _ in 0..self.span.column {
                out.push(' ');
            }
            out.push_str("^ HERE");
        }

        out
    }
}
