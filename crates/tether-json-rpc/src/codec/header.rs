use super::{CONTENT_LENGTH, CONTENT_TYPE, ContentEncoding};
use crate::error::ReadError;

/// Parsed header block of one frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageHeaders {
    pub content_length: usize,
    /// The raw `charset=` value, if a `Content-Type` header named one
    pub charset: Option<String>,
    /// Every header line in arrival order, including the two above
    pub fields: Vec<(String, String)>,
}

impl MessageHeaders {
    /// Parse a header block without its terminating blank line.
    pub fn parse(block: &[u8]) -> Result<Self, ReadError> {
        let text = std::str::from_utf8(block)
            .map_err(|_| ReadError::InvalidHeader("header block is not valid text".to_string()))?;

        let mut content_length = None;
        let mut charset = None;
        let mut fields = Vec::new();

        for line in text.split("\r\n") {
            if line.is_empty() {
                continue;
            }
            let (name, value) = line.split_once(':').ok_or_else(|| {
                ReadError::InvalidHeader(format!(
                    "message header must separate key and value using ':' ({})",
                    line
                ))
            })?;
            let name = name.trim();
            let value = value.trim();

            if name.eq_ignore_ascii_case(CONTENT_LENGTH) {
                let length = value.parse::<usize>().map_err(|_| {
                    ReadError::InvalidHeader(format!(
                        "Content-Length value must be a number: {}",
                        value
                    ))
                })?;
                content_length = Some(length);
            } else if name.eq_ignore_ascii_case(CONTENT_TYPE) {
                charset = value.split(';').skip(1).find_map(|param| {
                    let (key, val) = param.split_once('=')?;
                    key.trim()
                        .eq_ignore_ascii_case("charset")
                        .then(|| val.trim().to_string())
                });
            }

            fields.push((name.to_string(), value.to_string()));
        }

        Ok(Self {
            content_length: content_length.ok_or(ReadError::MissingContentLength)?,
            charset,
            fields,
        })
    }

    /// The body encoding this frame declares. No charset means UTF-8.
    pub fn encoding(&self) -> Result<ContentEncoding, ReadError> {
        match &self.charset {
            None => Ok(ContentEncoding::Utf8),
            Some(charset) => ContentEncoding::from_charset(charset)
                .ok_or_else(|| ReadError::UnsupportedEncoding(charset.clone())),
        }
    }

    /// Look up a header value by case-insensitive name.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }
}
