//! Command template placeholder substitution (spec.md §6's grammar:
//! `{` identifier `}` with identifiers restricted to `aid`, `aid_length`,
//! `lifecycle`, `counter`, `spi`, `tar`).

use std::collections::BTreeMap;

use crate::error::{Error, Result};

/// A rendered-in hex value for one placeholder identifier.
pub type Values<'a> = BTreeMap<&'a str, String>;

/// Substitute every `{identifier}` occurrence in `template` with the hex
/// string `values` supplies, then decode the result as hex bytes.
///
/// An identifier with no entry in `values` — whether because it is
/// misspelled or because the caller omitted a placeholder the template
/// requires — is reported as [`Error::UnknownPlaceholder`] rather than
/// silently left in place.
pub fn render(template: &str, values: &Values<'_>) -> Result<Vec<u8>> {
    let mut rendered = String::with_capacity(template.len());
    let mut rest = template;

    loop {
        match rest.find('{') {
            Some(start) => {
                rendered.push_str(&rest[..start]);
                let after_brace = &rest[start + 1..];
                let end = after_brace
                    .find('}')
                    .ok_or(Error::UnterminatedPlaceholder)?;
                let identifier = &after_brace[..end];
                let value = values
                    .get(identifier)
                    .ok_or_else(|| Error::UnknownPlaceholder(identifier.to_string()))?;
                rendered.push_str(value);
                rest = &after_brace[end + 1..];
            }
            None => {
                rendered.push_str(rest);
                break;
            }
        }
    }

    hex::decode(rendered.trim()).map_err(Error::from)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn substitutes_known_placeholders() {
        let mut values = Values::new();
        values.insert("lifecycle", "87".to_string());
        values.insert("aid_length", "08".to_string());
        values.insert("aid", "A000000001510000".to_string());

        let rendered = render("80F040{lifecycle}{aid_length}{aid}", &values).unwrap();
        assert_eq!(rendered, hex::decode("80F0408708A000000001510000").unwrap());
    }

    #[test]
    fn unknown_placeholder_is_an_error() {
        let values = Values::new();
        let err = render("80F040{bogus}", &values).unwrap_err();
        assert!(matches!(err, Error::UnknownPlaceholder(name) if name == "bogus"));
    }

    #[test]
    fn missing_required_placeholder_is_an_error() {
        let mut values = Values::new();
        values.insert("lifecycle", "87".to_string());
        // aid_length and aid intentionally omitted.
        let err = render("80F040{lifecycle}{aid_length}{aid}", &values).unwrap_err();
        assert!(matches!(err, Error::UnknownPlaceholder(_)));
    }

    #[test]
    fn unterminated_placeholder_is_an_error() {
        let values = Values::new();
        let err = render("80F040{lifecycle", &values).unwrap_err();
        assert!(matches!(err, Error::UnterminatedPlaceholder));
    }

    #[test]
    fn template_with_no_placeholders_passes_through() {
        let values = Values::new();
        let rendered = render("00A4040000", &values).unwrap();
        assert_eq!(rendered, hex::decode("00A4040000").unwrap());
    }
}
