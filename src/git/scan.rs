//! Line scanning over git's text output.
//!
//! Both the credential-helper protocol and config listings are
//! newline-delimited `key<sep>value` text. Everything that reads them goes
//! through [`LineScanner`] so the two paths split and trim lines the same way.

/// Iterator over the lines of a buffer with `\r` stripped.
#[derive(Debug, Clone)]
pub struct LineScanner<'a> {
    rest: Option<&'a str>,
}

impl<'a> LineScanner<'a> {
    pub fn new(text: &'a str) -> Self {
        Self {
            rest: if text.is_empty() { None } else { Some(text) },
        }
    }

    /// Value of the first line starting with `prefix`, without the prefix.
    ///
    /// Only newline-terminated lines carry a value: an unterminated final
    /// line is incomplete output. Returns `None` when no terminated line
    /// starts with `prefix`.
    pub fn value_of(self, prefix: &str) -> Option<&'a str> {
        let mut text = self.rest?;
        while let Some(idx) = text.find('\n') {
            if let Some(value) = text[..idx].strip_prefix(prefix) {
                return Some(value.trim_end_matches('\r'));
            }
            text = &text[idx + 1..];
        }
        None
    }

    /// Lines split once at `separator`, trimmed. Lines without it are skipped.
    pub fn key_values(self, separator: char) -> impl Iterator<Item = (&'a str, &'a str)> {
        self.filter_map(move |line| {
            line.split_once(separator)
                .map(|(key, value)| (key.trim(), value.trim()))
        })
    }
}

impl<'a> Iterator for LineScanner<'a> {
    type Item = &'a str;

    fn next(&mut self) -> Option<&'a str> {
        let text = self.rest?;
        let (line, rest) = match text.find('\n') {
            Some(idx) => (&text[..idx], &text[idx + 1..]),
            None => (text, ""),
        };
        self.rest = if rest.is_empty() { None } else { Some(rest) };
        Some(line.trim_end_matches('\r'))
    }
}
