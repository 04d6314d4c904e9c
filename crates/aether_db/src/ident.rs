use crate::error::{RelationalError, Result};

/// Validate and backtick-quote a MySQL-family identifier (spec §4.2.1,
/// §8 property 5): reject empty names and names containing a NUL byte,
/// then double any embedded backtick and wrap the whole thing.
pub fn quote_identifier(name: &str) -> Result<String> {
    if name.is_empty() {
        return Err(RelationalError::Validation(
            "identifier must not be empty".into(),
        ));
    }
    if name.contains('\0') {
        return Err(RelationalError::Validation(format!(
            "identifier contains a NUL byte: {name:?}"
        )));
    }
    Ok(format!("`{}`", name.replace('`', "``")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quotes_plain_identifier() {
        assert_eq!(quote_identifier("users").unwrap(), "`users`");
    }

    #[test]
    fn doubles_embedded_backtick() {
        assert_eq!(quote_identifier("weird`table").unwrap(), "`weird``table`");
    }

    #[test]
    fn round_trips_through_a_simple_tokenizer() {
        // Property 5 (spec §8): the emitted identifier should not let a
        // naive tokenizer split on the embedded backtick.
        let quoted = quote_identifier("a`b`c").unwrap();
        let mut depth = 0usize;
        let mut segments = 0usize;
        let mut chars = quoted.chars().peekable();
        chars.next(); // opening backtick
        while let Some(ch) = chars.next() {
            if ch == '`' {
                if matches!(chars.peek(), Some('`')) {
                    chars.next();
                    continue;
                }
                depth += 1;
            } else if depth == 0 {
                segments += 1;
            }
        }
        assert_eq!(depth, 1, "exactly one unescaped closing backtick");
        assert_eq!(segments, 0, "nothing falls outside the quoted identifier");
    }

    #[test]
    fn rejects_empty() {
        assert!(quote_identifier("").is_err());
    }

    #[test]
    fn rejects_nul_byte() {
        assert!(quote_identifier("a\0b").is_err());
    }
}
