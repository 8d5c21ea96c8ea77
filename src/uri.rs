//! URI values read from payloads.
//!
//! ATOM payloads carry URIs in attributes (`href`, `xml:base`, `src`) and in
//! element text (`icon`, `logo`). They are either absolute or relative; relative
//! ones only become usable once resolved against an enclosing `xml:base` or the
//! document base URI.

use url::Url;

use crate::error::{Error, Result};

/// Placeholder base used to check the syntax of relative references.
const SYNTAX_CHECK_BASE: &str = "http://relative.invalid/";

/// A syntactically valid URI reference as found in a payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UriRef {
    Absolute(Url),
    Relative(String),
}

impl UriRef {
    /// Parse a URI reference, rejecting syntactically invalid values.
    ///
    /// Relative references are validated against a placeholder base so that an
    /// invalid value fails the same way whether or not a base is in scope.
    pub fn parse(value: &str) -> Result<UriRef> {
        match Url::parse(value) {
            Ok(url) => Ok(UriRef::Absolute(url)),
            Err(url::ParseError::RelativeUrlWithoutBase) => {
                let placeholder = Url::parse(SYNTAX_CHECK_BASE).map_err(|e| invalid(value, e))?;
                placeholder.join(value).map_err(|e| invalid(value, e))?;
                Ok(UriRef::Relative(value.to_string()))
            }
            Err(e) => Err(invalid(value, e)),
        }
    }

    pub fn is_absolute(&self) -> bool {
        matches!(self, UriRef::Absolute(_))
    }

    /// Make this reference absolute against `base`.
    ///
    /// Fails with [`Error::RelativeUriWithoutBase`] when the reference is
    /// relative and no base is available.
    pub fn resolve(self, base: Option<&Url>) -> Result<Url> {
        match self {
            UriRef::Absolute(url) => Ok(url),
            UriRef::Relative(relative) => match base {
                Some(base) => base.join(&relative).map_err(|e| invalid(&relative, e)),
                None => Err(Error::RelativeUriWithoutBase(relative)),
            },
        }
    }
}

/// Parse `value` and resolve it against the first available base.
pub fn resolve_uri(value: &str, base: Option<&Url>) -> Result<Url> {
    UriRef::parse(value)?.resolve(base)
}

fn invalid(value: &str, err: url::ParseError) -> Error {
    Error::InvalidUri {
        uri: value.to_string(),
        reason: err.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_absolute() {
        let uri = UriRef::parse("http://odata.org/service/").unwrap();
        assert!(uri.is_absolute());
    }

    #[test]
    fn test_parse_relative() {
        assert_eq!(
            UriRef::parse("Products(1)").unwrap(),
            UriRef::Relative("Products(1)".to_string())
        );
        assert_eq!(UriRef::parse("").unwrap(), UriRef::Relative(String::new()));
    }

    #[test]
    fn test_parse_invalid_absolute() {
        let err = UriRef::parse("http://[invalid").unwrap_err();
        assert!(matches!(err, Error::InvalidUri { ref uri, .. } if uri == "http://[invalid"));
    }

    #[test]
    fn test_resolve_relative_against_base() {
        let base = Url::parse("http://odata.org/service/").unwrap();
        let url = resolve_uri("Products(1)", Some(&base)).unwrap();
        assert_eq!(url.as_str(), "http://odata.org/service/Products(1)");
    }

    #[test]
    fn test_resolve_parent_segment() {
        let base = Url::parse("http://odata.org/a/b/").unwrap();
        let url = resolve_uri("../c", Some(&base)).unwrap();
        assert_eq!(url.as_str(), "http://odata.org/a/c");
    }

    #[test]
    fn test_resolve_relative_without_base() {
        let err = resolve_uri("Products(1)", None).unwrap_err();
        assert!(matches!(err, Error::RelativeUriWithoutBase(ref s) if s == "Products(1)"));
    }

    #[test]
    fn test_absolute_ignores_base() {
        let base = Url::parse("http://odata.org/service/").unwrap();
        let url = resolve_uri("http://other.org/x", Some(&base)).unwrap();
        assert_eq!(url.as_str(), "http://other.org/x");
    }
}
