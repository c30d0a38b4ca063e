//! Conversion of raw terminal output into safe, styled markup.
//!
//! Raw log lines come straight from a build container and may contain ANSI
//! escape sequences, stray control characters, or text that looks like
//! markup. A [`SanitizedLine`] can only hold styled text spans: there is no
//! way to represent any other tag, so nothing in the input can smuggle one
//! through. Rendering to HTML escapes every text character and emits nothing
//! but `<span style="...">` wrappers.

use ansi_to_tui::IntoText;
use ratatui::style::Color;
use ratatui::style::Modifier;
use ratatui::style::Style;
use ratatui::text::Line;
use ratatui::text::Span;
use ratatui::text::Text;
use std::borrow::Cow;

/// A log line reduced to styled text spans, terminator stripped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SanitizedLine {
    text: Text<'static>,
}

/// Sanitize one raw log line.
///
/// A single trailing `\n` or `\r\n` is removed. SGR escapes become span
/// styles; every other escape or control character is dropped. Input the
/// ANSI parser rejects degrades to its plain text.
pub fn sanitize_line(raw: &str) -> SanitizedLine {
    let cleaned = strip_charset_designations(strip_terminator(raw));
    let trimmed: &str = &cleaned;

    let parsed = match trimmed.into_text() {
        Ok(text) => text,
        Err(err) => {
            tracing::debug!(error = %err, "ANSI parse failed, rendering line as plain text");
            Text::raw(strip_escape_sequences(trimmed))
        }
    };

    let mut lines: Vec<Line<'static>> = parsed
        .lines
        .into_iter()
        .map(|line| {
            let line_style = line.style;
            let spans = line
                .spans
                .into_iter()
                .map(|span| Span::styled(strip_controls(&span.content), line_style.patch(span.style)))
                .filter(|span| !span.content.is_empty())
                .collect::<Vec<_>>();
            Line::from(spans)
        })
        .collect();

    if lines.is_empty() {
        lines.push(Line::default());
    }

    SanitizedLine {
        text: Text::from(lines),
    }
}

impl SanitizedLine {
    /// Styled lines, ready for a ratatui widget.
    ///
    /// Usually one line; more when the raw line had embedded newlines.
    pub fn lines(&self) -> &[Line<'static>] {
        &self.text.lines
    }

    pub fn into_lines(self) -> Vec<Line<'static>> {
        self.text.lines
    }

    /// Text content without any styling.
    pub fn plain_text(&self) -> String {
        self.text
            .lines
            .iter()
            .map(|line| {
                line.spans
                    .iter()
                    .map(|span| span.content.as_ref())
                    .collect::<String>()
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    pub fn is_empty(&self) -> bool {
        self.text
            .lines
            .iter()
            .all(|line| line.spans.iter().all(|span| span.content.is_empty()))
    }

    /// HTML fragment using only `span` elements with a `style` attribute.
    pub fn to_html(&self) -> String {
        let mut out = String::new();
        for (index, line) in self.text.lines.iter().enumerate() {
            if index > 0 {
                out.push('\n');
            }
            for span in &line.spans {
                let css = span_css(span.style);
                if css.is_empty() {
                    out.push_str(&escape_html(&span.content));
                } else {
                    out.push_str("<span style=\"");
                    out.push_str(&css);
                    out.push_str("\">");
                    out.push_str(&escape_html(&span.content));
                    out.push_str("</span>");
                }
            }
        }
        out
    }
}

impl From<SanitizedLine> for Text<'static> {
    fn from(line: SanitizedLine) -> Self {
        line.text
    }
}

fn strip_terminator(raw: &str) -> &str {
    match raw.strip_suffix('\n') {
        Some(rest) => rest.strip_suffix('\r').unwrap_or(rest),
        None => raw,
    }
}

/// Drops control characters the terminal would have interpreted.
fn strip_controls(content: &str) -> String {
    content
        .chars()
        .filter(|c| *c == '\t' || !c.is_control())
        .collect()
}

/// Fallback used when the ANSI parser gives up: removes CSI and OSC
/// sequences and lone escapes, keeping the visible text.
/// Drops `ESC (`, `ESC )`, `ESC *` and `ESC +` charset designations with
/// their designator byte; `tput sgr0` emits `ESC ( B`.
fn strip_charset_designations(input: &str) -> Cow<'_, str> {
    if !input.contains('\u{1b}') {
        return Cow::Borrowed(input);
    }

    let mut out = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();
    while let Some(c) = chars.next() {
        if c == '\u{1b}' && matches!(chars.peek(), Some('(' | ')' | '*' | '+')) {
            chars.next();
            chars.next();
            continue;
        }
        out.push(c);
    }
    Cow::Owned(out)
}

fn strip_escape_sequences(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(c) = chars.next() {
        if c != '\u{1b}' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('[') => {
                // CSI: parameters and intermediates up to a final byte in @..~
                for next in chars.by_ref() {
                    if ('@'..='~').contains(&next) {
                        break;
                    }
                }
            }
            Some(']') => {
                // OSC: terminated by BEL or ST (ESC \)
                while let Some(next) = chars.next() {
                    if next == '\u{7}' {
                        break;
                    }
                    if next == '\u{1b}' && chars.peek() == Some(&'\\') {
                        chars.next();
                        break;
                    }
                }
            }
            Some('(' | ')' | '*' | '+') => {
                chars.next();
            }
            _ => {}
        }
    }

    out
}

fn escape_html(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for ch in value.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(ch),
        }
    }
    out
}

fn span_css(style: Style) -> String {
    let modifiers = style.add_modifier;
    let (mut fg, mut bg) = (style.fg, style.bg);
    if modifiers.contains(Modifier::REVERSED) {
        std::mem::swap(&mut fg, &mut bg);
    }

    let mut decls: Vec<String> = Vec::new();
    if let Some(color) = fg.and_then(css_color) {
        decls.push(format!("color:{color}"));
    }
    if let Some(color) = bg.and_then(css_color) {
        decls.push(format!("background-color:{color}"));
    }
    if modifiers.contains(Modifier::BOLD) {
        decls.push("font-weight:bold".to_string());
    }
    if modifiers.contains(Modifier::DIM) {
        decls.push("opacity:0.5".to_string());
    }
    if modifiers.contains(Modifier::ITALIC) {
        decls.push("font-style:italic".to_string());
    }
    match (
        modifiers.contains(Modifier::UNDERLINED),
        modifiers.contains(Modifier::CROSSED_OUT),
    ) {
        (true, true) => decls.push("text-decoration:underline line-through".to_string()),
        (true, false) => decls.push("text-decoration:underline".to_string()),
        (false, true) => decls.push("text-decoration:line-through".to_string()),
        (false, false) => {}
    }
    if modifiers.contains(Modifier::HIDDEN) {
        decls.push("visibility:hidden".to_string());
    }

    decls.join(";")
}

/// Standard and bright palette, the same values xterm-style HTML renderers use.
const PALETTE: [(u8, u8, u8); 16] = [
    (0, 0, 0),
    (187, 0, 0),
    (0, 187, 0),
    (187, 187, 0),
    (0, 0, 187),
    (187, 0, 187),
    (0, 187, 187),
    (255, 255, 255),
    (85, 85, 85),
    (255, 85, 85),
    (0, 255, 0),
    (255, 255, 85),
    (85, 85, 255),
    (255, 85, 255),
    (85, 255, 255),
    (255, 255, 255),
];

fn css_color(color: Color) -> Option<String> {
    let (r, g, b) = match color {
        Color::Reset => return None,
        Color::Black => PALETTE[0],
        Color::Red => PALETTE[1],
        Color::Green => PALETTE[2],
        Color::Yellow => PALETTE[3],
        Color::Blue => PALETTE[4],
        Color::Magenta => PALETTE[5],
        Color::Cyan => PALETTE[6],
        Color::Gray => PALETTE[7],
        Color::DarkGray => PALETTE[8],
        Color::LightRed => PALETTE[9],
        Color::LightGreen => PALETTE[10],
        Color::LightYellow => PALETTE[11],
        Color::LightBlue => PALETTE[12],
        Color::LightMagenta => PALETTE[13],
        Color::LightCyan => PALETTE[14],
        Color::White => PALETTE[15],
        Color::Rgb(r, g, b) => (r, g, b),
        Color::Indexed(index) => indexed_rgb(index),
    };
    Some(format!("rgb({r}, {g}, {b})"))
}

fn indexed_rgb(index: u8) -> (u8, u8, u8) {
    match index {
        0..=15 => PALETTE[index as usize],
        16..=231 => {
            let cube = index - 16;
            let level = |l: u8| if l == 0 { 0 } else { 55 + 40 * l };
            (level(cube / 36), level((cube / 6) % 6), level(cube % 6))
        }
        _ => {
            let gray = 8 + 10 * (index - 232);
            (gray, gray, gray)
        }
    }
}
