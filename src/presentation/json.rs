//! JSON text formatting for presentations.
//!
//! Single-line output with `", "` between entries and `": "` after keys.
//! Non-ASCII characters are written as `\uXXXX` escapes.

use std::io;

use serde::Serialize;
use serde_json::ser::{Formatter, Serializer};

struct InlineFormatter;

impl Formatter for InlineFormatter {
    fn begin_array_value<W: ?Sized + io::Write>(&mut self, writer: &mut W, first: bool) -> io::Result<()> {
        if first {
            Ok(())
        } else {
            writer.write_all(b", ")
        }
    }

    fn begin_object_key<W: ?Sized + io::Write>(&mut self, writer: &mut W, first: bool) -> io::Result<()> {
        if first {
            Ok(())
        } else {
            writer.write_all(b", ")
        }
    }

    fn begin_object_value<W: ?Sized + io::Write>(&mut self, writer: &mut W) -> io::Result<()> {
        writer.write_all(b": ")
    }

    fn write_string_fragment<W: ?Sized + io::Write>(&mut self, writer: &mut W, fragment: &str) -> io::Result<()> {
        if fragment.is_ascii() {
            return writer.write_all(fragment.as_bytes());
        }
        let mut units = [0u16; 2];
        for c in fragment.chars() {
            if c.is_ascii() {
                writer.write_all(&[c as u8])?;
            } else {
                // Astral characters become a surrogate pair.
                for unit in c.encode_utf16(&mut units) {
                    write!(writer, "\\u{unit:04x}")?;
                }
            }
        }
        Ok(())
    }
}

/// Serialize `value` as single-line JSON with spaced separators.
pub fn to_display_string<T: Serialize + ?Sized>(value: &T) -> String {
    let mut buf = Vec::new();
    let mut serializer = Serializer::with_formatter(&mut buf, InlineFormatter);
    if value.serialize(&mut serializer).is_err() {
        return "{}".to_string();
    }
    String::from_utf8(buf).unwrap_or_else(|_| "{}".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn nested_values_use_spaced_separators() {
        let value = json!({"ids": ["A", "B"], "limits": {"max": 3}});
        assert_eq!(
            to_display_string(&value),
            r#"{"ids": ["A", "B"], "limits": {"max": 3}}"#
        );
    }

    #[test]
    fn non_ascii_is_escaped() {
        let value = json!({"location": "São Paulo", "tag": "🏠"});
        assert_eq!(
            to_display_string(&value),
            r#"{"location": "S\u00e3o Paulo", "tag": "\ud83c\udfe0"}"#
        );
    }

    #[test]
    fn empty_object_stays_compact() {
        assert_eq!(to_display_string(&json!({})), "{}");
    }
}
