//! Request headers.
//!
//! Routing never looks at headers. The connection driver reads
//! `Content-Length` to spot bodies cut short by the single read, and
//! `User-Agent` for its debug log.

/// Header fields in arrival order. Name lookup ignores ASCII case.
///
/// # Examples
///
/// ```
/// use audio_bridge::http::Headers;
///
/// let mut headers = Headers::new();
/// headers.insert("Content-Length", "17");
///
/// assert_eq!(headers.get("content-length"), Some("17"));
/// assert_eq!(headers.content_length(), Some(17));
/// ```
#[derive(Debug, Clone, Default)]
pub struct Headers {
    fields: Vec<(String, String)>,
}

impl Headers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copies fields out of an `httparse` parse. Values are trimmed; a field
    /// whose value is not UTF-8 is left out.
    pub fn from_parsed(raw: &[httparse::Header<'_>]) -> Self {
        let fields = raw
            .iter()
            .filter_map(|field| {
                let value = std::str::from_utf8(field.value).ok()?.trim();
                Some((field.name.to_owned(), value.to_owned()))
            })
            .collect();
        Self { fields }
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.fields.push((name.into(), value.into()));
    }

    /// Value of the first field called `name`.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find_map(|(field, value)| field.eq_ignore_ascii_case(name).then_some(value.as_str()))
    }

    /// The declared body length. `None` when absent or not a number.
    pub fn content_length(&self) -> Option<usize> {
        self.get("content-length")?.parse().ok()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}
