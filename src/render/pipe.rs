use crate::expr::value::display;
use serde_json::Value;
use std::fmt::{Arguments, Result, Write};

/// Wraps some underlying buffer by providing methods that write to it
/// in different formats.
pub struct Pipe<'buffer> {
    buffer: &'buffer mut (dyn Write + 'buffer),
}

impl<'buffer> Pipe<'buffer> {
    /// Create a new Pipe that writes to the given buffer.
    pub fn new(buffer: &'buffer mut String) -> Self {
        Self { buffer }
    }

    /// Write the given Value to the Pipe buffer in display form,
    /// HTML escaped.
    pub fn write_value(&mut self, value: &Value) -> Result {
        self.write_escaped(&display(value))
    }

    /// Write the given Value to the Pipe buffer in display form,
    /// without escaping.
    pub fn write_value_raw(&mut self, value: &Value) -> Result {
        self.write_str(&display(value))
    }

    /// Write the text to the buffer, escaping the characters HTML
    /// gives meaning to.
    pub fn write_escaped(&mut self, text: &str) -> Result {
        for char in text.chars() {
            match char {
                '&' => self.buffer.write_str("&amp;")?,
                '<' => self.buffer.write_str("&lt;")?,
                '>' => self.buffer.write_str("&gt;")?,
                '"' => self.buffer.write_str("&quot;")?,
                '\'' => self.buffer.write_str("&#x27;")?,
                _ => self.buffer.write_char(char)?,
            }
        }

        Ok(())
    }
}

impl Write for Pipe<'_> {
    #[inline]
    fn write_str(&mut self, s: &str) -> Result {
        Write::write_str(self.buffer, s)
    }

    #[inline]
    fn write_char(&mut self, c: char) -> Result {
        Write::write_char(self.buffer, c)
    }

    #[inline]
    fn write_fmt(&mut self, args: Arguments<'_>) -> Result {
        Write::write_fmt(self.buffer, args)
    }
}

#[cfg(test)]
mod tests {
    use super::Pipe;
    use serde_json::json;

    #[test]
    fn test_escaping() {
        let mut buffer = String::new();
        let mut pipe = Pipe::new(&mut buffer);
        pipe.write_value(&json!("<b>\"a\" & 'b'</b>")).unwrap();

        assert_eq!(buffer, "&lt;b&gt;&quot;a&quot; &amp; &#x27;b&#x27;&lt;/b&gt;");
    }

    #[test]
    fn test_raw_and_null() {
        let mut buffer = String::new();
        let mut pipe = Pipe::new(&mut buffer);
        pipe.write_value_raw(&json!("<b>")).unwrap();
        pipe.write_value(&json!(null)).unwrap();

        assert_eq!(buffer, "<b>");
    }
}
