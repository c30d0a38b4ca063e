//! `steplog render`: sanitize raw log lines read from stdin.

use color_eyre::eyre::Context;
use color_eyre::Result;
use sl_core::render::sanitize_line;
use sl_core::render::SanitizedLine;
use std::io::BufRead;
use std::io::Write;

pub fn format_line(line: &SanitizedLine, html: bool) -> String {
    if html {
        line.to_html()
    } else {
        line.plain_text()
    }
}

pub fn run(html: bool) -> Result<()> {
    let stdin = std::io::stdin();
    let stdout = std::io::stdout();
    let mut out = stdout.lock();

    for line in stdin.lock().lines() {
        let line = line.wrap_err("Failed to read stdin")?;
        writeln!(out, "{}", format_line(&sanitize_line(&line), html))?;
    }

    out.flush()?;
    Ok(())
}
