// Editing scripts for the command-line driver.
// One command per line; blank lines and lines starting with '#' are skipped.

use std::io::{self, Write};
use std::str::FromStr;

use thiserror::Error;
use tracing::{debug, info};

use crate::richtext::editor::{MediaLoad, RichTextEditor};
use crate::richtext::mutation::{Alignment, EditError};
use crate::richtext::surface::MemorySurface;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("line {line}: {message}")]
pub struct ScriptError {
    pub line: usize,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScriptCommand {
    Select(usize, usize),
    Caret(usize),
    Bold,
    Italic,
    Underline,
    Strike,
    Heading(u8),
    Paragraph,
    Size(u32),
    Bigger,
    Smaller,
    Color(String),
    List { ordered: bool },
    Align(Alignment),
    Link(String),
    Image(String),
    Undo,
    Redo,
    Locate,
    Highlight,
    Release,
}

impl FromStr for ScriptCommand {
    type Err = String;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let mut words = line.split_whitespace();
        let name = words.next().ok_or("empty command")?;
        let rest: Vec<&str> = words.collect();

        let command = match (name, rest.as_slice()) {
            ("select", [a, b]) => ScriptCommand::Select(number(a)?, number(b)?),
            ("caret", [a]) => ScriptCommand::Caret(number(a)?),
            ("bold", []) => ScriptCommand::Bold,
            ("italic", []) => ScriptCommand::Italic,
            ("underline", []) => ScriptCommand::Underline,
            ("strike", []) => ScriptCommand::Strike,
            ("heading", [level]) => match number::<usize>(level)? {
                level @ 1..=6 => ScriptCommand::Heading(level as u8),
                other => return Err(format!("heading level {} out of range", other)),
            },
            ("paragraph", []) => ScriptCommand::Paragraph,
            ("size", [px]) => ScriptCommand::Size(number(px)?),
            ("bigger", []) => ScriptCommand::Bigger,
            ("smaller", []) => ScriptCommand::Smaller,
            ("color", [color]) => ScriptCommand::Color(color.to_string()),
            ("list", ["ordered"]) => ScriptCommand::List { ordered: true },
            ("list", ["bullet"]) => ScriptCommand::List { ordered: false },
            ("align", [alignment]) => ScriptCommand::Align(alignment.parse()?),
            ("link", [href]) => ScriptCommand::Link(href.to_string()),
            ("image", [src]) => ScriptCommand::Image(src.to_string()),
            ("undo", []) => ScriptCommand::Undo,
            ("redo", []) => ScriptCommand::Redo,
            ("locate", []) => ScriptCommand::Locate,
            ("highlight", []) => ScriptCommand::Highlight,
            ("release", []) => ScriptCommand::Release,
            _ => return Err(format!("unknown command '{}'", line.trim())),
        };
        Ok(command)
    }
}

fn number<T: FromStr>(word: &str) -> Result<T, String> {
    word.parse()
        .map_err(|_| format!("expected a number, got '{}'", word))
}

/// Parse a whole script, reporting the first bad line
pub fn parse_script(source: &str) -> Result<Vec<(usize, ScriptCommand)>, ScriptError> {
    source
        .lines()
        .enumerate()
        .filter(|(_, line)| {
            let line = line.trim();
            !line.is_empty() && !line.starts_with('#')
        })
        .map(|(index, line)| {
            line.parse()
                .map(|command| (index + 1, command))
                .map_err(|message| ScriptError {
                    line: index + 1,
                    message,
                })
        })
        .collect()
}

/// Run parsed commands against an editor. Edits that fail are reported to
/// `out` and the script carries on; edits with nothing selected are skipped
/// quietly.
pub fn run_script<W: Write>(
    editor: &mut RichTextEditor<MemorySurface>,
    commands: &[(usize, ScriptCommand)],
    out: &mut W,
) -> io::Result<()> {
    for (line, command) in commands {
        debug!(line, ?command, "running");
        let result = match command {
            ScriptCommand::Select(anchor, focus) => {
                select(editor, *anchor, *focus, out, *line)?;
                Ok(())
            }
            ScriptCommand::Caret(at) => {
                select(editor, *at, *at, out, *line)?;
                Ok(())
            }
            ScriptCommand::Bold => editor.bold().map(|_| ()),
            ScriptCommand::Italic => editor.italic().map(|_| ()),
            ScriptCommand::Underline => editor.underline().map(|_| ()),
            ScriptCommand::Strike => editor.strikethrough().map(|_| ()),
            ScriptCommand::Heading(level) => editor.heading(*level).map(|_| ()),
            ScriptCommand::Paragraph => editor.paragraph().map(|_| ()),
            ScriptCommand::Size(px) => editor.set_font_size(*px).map(|_| ()),
            ScriptCommand::Bigger => editor.increase_font_size().map(|_| ()),
            ScriptCommand::Smaller => editor.decrease_font_size().map(|_| ()),
            ScriptCommand::Color(color) => editor.color(color).map(|_| ()),
            ScriptCommand::List { ordered } => editor.list(*ordered).map(|_| ()),
            ScriptCommand::Align(alignment) => editor.align(*alignment).map(|_| ()),
            ScriptCommand::Link(href) => editor.insert_link(href).map(|_| ()),
            ScriptCommand::Image(src) => editor
                .begin_media_insert(src)
                .and_then(|ticket| editor.resolve_media(ticket, MediaLoad::Loaded))
                .map(|_| ()),
            ScriptCommand::Undo => editor.undo().map(|_| ()),
            ScriptCommand::Redo => editor.redo().map(|_| ()),
            ScriptCommand::Locate => {
                match editor.caret_anchor() {
                    Some(point) => writeln!(out, "caret: {} {}", point.x, point.y)?,
                    None => writeln!(out, "caret: none")?,
                }
                Ok(())
            }
            ScriptCommand::Highlight => {
                if editor.popup_opened().is_none() {
                    writeln!(out, "line {}: nothing to highlight", line)?;
                }
                Ok(())
            }
            ScriptCommand::Release => {
                if !editor.popup_closed() {
                    writeln!(out, "line {}: selection not restored", line)?;
                }
                Ok(())
            }
        };

        match result {
            Ok(()) => {}
            Err(EditError::NoSelection) => info!(line, "nothing selected, skipped"),
            Err(err) => writeln!(out, "line {}: {}", line, err)?,
        }
    }
    Ok(())
}

fn select<W: Write>(
    editor: &mut RichTextEditor<MemorySurface>,
    anchor: usize,
    focus: usize,
    out: &mut W,
    line: usize,
) -> io::Result<()> {
    if editor.surface_mut().select_chars(anchor, focus).is_none() {
        writeln!(out, "line {}: offset out of range", line)?;
        return Ok(());
    }
    editor.selection_changed();
    Ok(())
}
