/// Line-ending style detected from existing file bytes, preserved across an
/// edit so a CRLF-authored file does not silently turn into LF (or vice
/// versa) just because the applier joined lines internally with `\n`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineEnding {
    Lf,
    CrLf,
}

impl LineEnding {
    pub fn detect(text: &str) -> Self {
        if text.contains("\r\n") {
            LineEnding::CrLf
        } else {
            LineEnding::Lf
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            LineEnding::Lf => "\n",
            LineEnding::CrLf => "\r\n",
        }
    }
}

/// Split `text` into lines the way LSP ranges index them: a line never
/// includes its terminator, and a file with `n` separators has `n + 1`
/// entries (a trailing empty entry if the file ends with a separator).
pub fn split_lines(text: &str) -> Vec<&str> {
    let mut lines: Vec<&str> = text.split('\n').collect();
    for line in &mut lines {
        if let Some(stripped) = line.strip_suffix('\r') {
            *line = stripped;
        }
    }
    lines
}

pub fn join_lines(lines: &[String], ending: LineEnding) -> String {
    lines.join(ending.as_str())
}
