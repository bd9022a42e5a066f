//! Indentation-tracking writer for the generated Go source.
//!
//! Indent guards share the level through `Rc<Cell<usize>>`, so a guard can be
//! held while the writer is borrowed mutably.
//!
//! ```
//! use goclientgen::code_writer::CodeWriter;
//!
//! let mut out = String::new();
//! let mut w = CodeWriter::with_tabs(&mut out);
//! w.block("func f()", |w| w.writeln("return")).unwrap();
//! assert_eq!(out, "func f() {\n\treturn\n}\n");
//! ```

use std::cell::Cell;
use std::fmt;
use std::rc::Rc;

pub struct CodeWriter<W> {
    writer: W,
    indent_level: Rc<Cell<usize>>,
    indent_string: String,
    at_line_start: bool,
}

impl<W: fmt::Write> CodeWriter<W> {
    pub fn new(writer: W, indent_string: String) -> Self {
        Self {
            writer,
            indent_level: Rc::new(Cell::new(0)),
            indent_string,
            at_line_start: true,
        }
    }

    /// Go style: one tab per level.
    pub fn with_tabs(writer: W) -> Self {
        Self::new(writer, "\t".to_string())
    }

    /// Write text without a newline, indenting first at the start of a line.
    pub fn write(&mut self, text: &str) -> fmt::Result {
        if text.is_empty() {
            return Ok(());
        }
        if self.at_line_start {
            for _ in 0..self.indent_level.get() {
                self.writer.write_str(&self.indent_string)?;
            }
            self.at_line_start = false;
        }
        self.writer.write_str(text)
    }

    pub fn writeln(&mut self, text: &str) -> fmt::Result {
        self.write(text)?;
        self.blank_line()
    }

    pub fn blank_line(&mut self) -> fmt::Result {
        self.writer.write_char('\n')?;
        self.at_line_start = true;
        Ok(())
    }

    /// Indentation grows by one level while the guard is alive.
    pub fn indent(&mut self) -> IndentGuard {
        self.indent_level.set(self.indent_level.get() + 1);
        IndentGuard {
            indent_level: Rc::clone(&self.indent_level),
        }
    }

    /// Comment text that already carries its `//` or `/* */` markers, one
    /// output line per input line.
    pub fn raw_comment(&mut self, text: &str) -> fmt::Result {
        for line in text.lines() {
            self.writeln(line.trim_end())?;
        }
        Ok(())
    }

    /// `header {`, the indented body, then `}`.
    pub fn block<F>(&mut self, header: &str, body: F) -> fmt::Result
    where
        F: FnOnce(&mut Self) -> fmt::Result,
    {
        self.writeln(&format!("{header} {{"))?;
        {
            let _indent = self.indent();
            body(self)?;
        }
        self.writeln("}")
    }

    /// Like [`block`](Self::block) with parentheses, as Go's grouped
    /// declarations use.
    pub fn paren_block<F>(&mut self, header: &str, body: F) -> fmt::Result
    where
        F: FnOnce(&mut Self) -> fmt::Result,
    {
        self.writeln(&format!("{header} ("))?;
        {
            let _indent = self.indent();
            body(self)?;
        }
        self.writeln(")")
    }

    #[doc(hidden)]
    pub fn writeln_fmt(&mut self, args: fmt::Arguments<'_>) -> fmt::Result {
        self.writeln(&args.to_string())
    }
}

pub struct IndentGuard {
    indent_level: Rc<Cell<usize>>,
}

impl Drop for IndentGuard {
    fn drop(&mut self) {
        let current = self.indent_level.get();
        self.indent_level.set(current.saturating_sub(1));
    }
}

/// `writeln!` for a [`CodeWriter`].
#[macro_export]
macro_rules! cw_writeln {
    ($writer:expr, $($arg:tt)*) => {
        $writer.writeln_fmt(format_args!($($arg)*))
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nested_blocks_indent_with_tabs() {
        let mut out = String::new();
        let mut w = CodeWriter::with_tabs(&mut out);
        w.block("func (c *C) M() error", |w| {
            w.writeln("var r int")?;
            w.block("if r == 0", |w| w.writeln("return nil"))?;
            w.writeln("return nil")
        })
        .unwrap();
        assert_eq!(
            out,
            "func (c *C) M() error {\n\tvar r int\n\tif r == 0 {\n\t\treturn nil\n\t}\n\treturn nil\n}\n"
        );
    }

    #[test]
    fn guard_restores_level() {
        let mut out = String::new();
        let mut w = CodeWriter::new(&mut out, "  ".to_string());
        {
            let _g = w.indent();
            w.writeln("in").unwrap();
        }
        w.writeln("out").unwrap();
        assert_eq!(out, "  in\nout\n");
    }

    #[test]
    fn blank_lines_carry_no_indent() {
        let mut out = String::new();
        let mut w = CodeWriter::with_tabs(&mut out);
        let _g = w.indent();
        w.writeln("a").unwrap();
        w.blank_line().unwrap();
        w.writeln("").unwrap();
        w.writeln("b").unwrap();
        assert_eq!(out, "\ta\n\n\n\tb\n");
    }

    #[test]
    fn raw_comments_and_paren_blocks() {
        let mut out = String::new();
        let mut w = CodeWriter::with_tabs(&mut out);
        w.raw_comment("// Get fetches.\n// Second line.  ").unwrap();
        w.paren_block("import", |w| {
            cw_writeln!(w, "{:?}", "context")?;
            cw_writeln!(w, "{} {:?}", "ctx2", "example.com/ctx")
        })
        .unwrap();
        assert_eq!(
            out,
            "// Get fetches.\n// Second line.\nimport (\n\t\"context\"\n\tctx2 \"example.com/ctx\"\n)\n"
        );
    }
}
