//! Renders the client file.

use std::fmt;

use crate::code_writer::CodeWriter;
use crate::cw_writeln;
use crate::generate::ClientMethod;
use crate::qualifier::Import;

pub const HEADER: &str = "// Code generated by goclientgen. DO NOT EDIT.";

/// Everything the generated file is made of. Type strings are already
/// qualified.
#[derive(Debug, Clone)]
pub struct ClientFile<'a> {
    pub package: &'a str,
    pub imports: &'a [Import],
    pub client_type: &'a str,
    /// Alias of the transport package, which declares `Client`.
    pub transport: &'a str,
    /// Alias of the package declaring `Context`.
    pub context: &'a str,
    pub methods: &'a [ClientMethod],
}

pub fn render(file: &ClientFile<'_>) -> Result<String, fmt::Error> {
    let mut out = String::new();
    let mut w = CodeWriter::with_tabs(&mut out);

    w.writeln(HEADER)?;
    w.blank_line()?;
    cw_writeln!(w, "package {}", file.package)?;
    w.blank_line()?;

    if !file.imports.is_empty() {
        w.paren_block("import", |w| {
            for import in file.imports {
                match &import.alias {
                    Some(alias) => cw_writeln!(w, "{alias} {:?}", import.path)?,
                    None => cw_writeln!(w, "{:?}", import.path)?,
                }
            }
            Ok(())
        })?;
        w.blank_line()?;
    }

    w.block(&format!("type {} struct", file.client_type), |w| {
        cw_writeln!(w, "Client {}.Client", file.transport)
    })?;

    for m in file.methods {
        w.blank_line()?;
        write_method(&mut w, file, m)?;
    }
    Ok(out)
}

fn write_method<W: fmt::Write>(
    w: &mut CodeWriter<W>,
    file: &ClientFile<'_>,
    m: &ClientMethod,
) -> fmt::Result {
    if let Some(doc) = &m.doc {
        w.raw_comment(doc)?;
    }
    let head = format!(
        "func (c *{}) {}(ctx {}.Context, p *{})",
        file.client_type, m.name, file.context, m.request
    );
    match &m.response {
        Some(resp) => w.block(&format!("{head} ({resp}, error)"), |w| {
            cw_writeln!(w, "var r {resp}")?;
            w.writeln("err := c.Client.Call(ctx, p, &r)")?;
            w.writeln("return r, err")
        }),
        None => w.block(&format!("{head} error"), |w| {
            w.writeln("return c.Client.Call(ctx, p, nil)")
        }),
    }
}
