/// Locates the end of the first JSON value in a growing buffer without parsing it.
///
/// Only nesting and string/escape state are tracked; syntax is validated later by
/// `serde_json`. Scanning is incremental: bytes already inspected are not revisited
/// when the buffer grows. The buffer must start at the value's first byte (leading
/// whitespace already removed) and must not be shifted between calls until
/// [`ValueScanner::reset`].
#[derive(Debug, Default)]
pub(crate) struct ValueScanner {
    pos: usize,
    mode: Option<Mode>,
    depth: usize,
    in_string: bool,
    escaped: bool,
}

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
enum Mode {
    /// Object or array: ends at the matching close bracket.
    Container,
    /// Top-level string: ends at the closing quote.
    String,
    /// Anything else (numbers, literals, garbage): ends at whitespace or where the
    /// next object, array, or string begins.
    Bare,
}

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub(crate) enum Scan {
    /// The value occupies `buf[..end]`.
    Complete { end: usize },
    Incomplete,
}

impl ValueScanner {
    pub(crate) fn reset(&mut self) {
        *self = Self::default();
    }

    pub(crate) fn is_idle(&self) -> bool {
        self.mode.is_none()
    }

    pub(crate) fn scan(&mut self, buf: &[u8]) -> Scan {
        while self.pos < buf.len() {
            let byte = buf[self.pos];
            self.pos += 1;

            let Some(mode) = self.mode else {
                self.mode = Some(match byte {
                    b'{' | b'[' => {
                        self.depth = 1;
                        Mode::Container
                    }
                    b'"' => {
                        self.in_string = true;
                        Mode::String
                    }
                    b'\n' => return Scan::Complete { end: self.pos - 1 },
                    _ => Mode::Bare,
                });
                continue;
            };

            match mode {
                Mode::Bare => {
                    if byte.is_ascii_whitespace() || matches!(byte, b'{' | b'[' | b'"') {
                        return Scan::Complete { end: self.pos - 1 };
                    }
                }
                Mode::String | Mode::Container => {
                    if self.in_string {
                        if self.escaped {
                            self.escaped = false;
                        } else if byte == b'\\' {
                            self.escaped = true;
                        } else if byte == b'"' {
                            self.in_string = false;
                            if mode == Mode::String {
                                return Scan::Complete { end: self.pos };
                            }
                        }
                        continue;
                    }
                    match byte {
                        b'"' => self.in_string = true,
                        b'{' | b'[' => self.depth += 1,
                        b'}' | b']' => {
                            self.depth -= 1;
                            if self.depth == 0 {
                                return Scan::Complete { end: self.pos };
                            }
                        }
                        _ => {}
                    }
                }
            }
        }
        Scan::Incomplete
    }

    /// Resolves a pending value at end of input. Only bare tokens can be terminated by
    /// EOF; an open container or string is a truncated record.
    pub(crate) fn finish(&self, buf: &[u8]) -> Option<usize> {
        match self.mode {
            Some(Mode::Bare) => Some(buf.len()),
            _ => None,
        }
    }
}
