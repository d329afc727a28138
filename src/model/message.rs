//! In-memory message representation with ordered, repeatable headers.

/// An ordered multimap of message headers.
///
/// Header names are matched case-insensitively but stored with their original
/// casing. A name may repeat (multiple `Received:` lines); repetition and
/// order are preserved, which is why this is a `Vec` and not a map.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HeaderMap {
    entries: Vec<(String, String)>,
}

impl HeaderMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a header, keeping insertion order.
    pub fn push(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.entries.push((name.into(), value.into()));
    }

    /// First value for `name` (case-insensitive), if any.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// All values for `name` (case-insensitive), in order.
    pub fn get_all<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a str> {
        self.entries
            .iter()
            .filter(move |(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Iterate over all `(name, value)` pairs in order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Message payload.
///
/// Multipart payloads are kept verbatim: the fixer must never reshape the
/// part structure, so the raw text between the header block and EOF is copied
/// through untouched. Sub-parts are materialized on demand by
/// [`crate::parser::eml::walk_text_parts`].
#[derive(Debug, Clone, PartialEq)]
pub enum Body {
    /// Single-part payload, still in its transfer encoding.
    Single(String),
    /// Multipart payload (everything after the header block), verbatim.
    Multipart {
        /// Boundary token from the Content-Type header.
        boundary: String,
        /// Raw payload text, untouched.
        raw: String,
    },
}

impl Body {
    /// The raw payload text, regardless of structure.
    pub fn raw(&self) -> &str {
        match self {
            Body::Single(s) => s,
            Body::Multipart { raw, .. } => raw,
        }
    }
}

/// A single email message: ordered headers plus a payload.
#[derive(Debug, Clone, PartialEq)]
pub struct Message {
    pub headers: HeaderMap,
    pub body: Body,
}

impl Message {
    /// Serialize back to RFC 2822 text: headers in order, blank line, payload.
    ///
    /// Header values containing embedded newlines (pre-folded values such as
    /// the synthetic Received chain) are written as-is.
    pub fn to_text(&self) -> String {
        let mut out = String::with_capacity(self.body.raw().len() + 512);
        for (name, value) in self.headers.iter() {
            out.push_str(name);
            out.push_str(": ");
            out.push_str(value);
            out.push('\n');
        }
        out.push('\n');
        out.push_str(self.body.raw());
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_map_case_insensitive() {
        let mut headers = HeaderMap::new();
        headers.push("Subject", "Hello");
        assert_eq!(headers.get("subject"), Some("Hello"));
        assert_eq!(headers.get("SUBJECT"), Some("Hello"));
        assert_eq!(headers.get("From"), None);
    }

    #[test]
    fn test_header_map_preserves_repetition_and_order() {
        let mut headers = HeaderMap::new();
        headers.push("Received", "hop one");
        headers.push("Subject", "Hi");
        headers.push("Received", "hop two");

        let received: Vec<&str> = headers.get_all("received").collect();
        assert_eq!(received, vec!["hop one", "hop two"]);
        assert_eq!(headers.get("received"), Some("hop one"));
        assert_eq!(headers.len(), 3);
    }

    #[test]
    fn test_to_text_round_shape() {
        let mut headers = HeaderMap::new();
        headers.push("From", "a@b.com");
        headers.push("Subject", "Test");
        let msg = Message {
            headers,
            body: Body::Single("Body line\n".to_string()),
        };
        assert_eq!(msg.to_text(), "From: a@b.com\nSubject: Test\n\nBody line\n");
    }
}
