//! Request body and query binding.
//!
//! JSON and XML go through `serde`. Multipart bodies are read into a
//! [`MultipartForm`]. Form and query data bind through [`FromForm`],
//! an explicit field-by-field mapping over [`FormValues`]:
//!
//! ```rust
//! use sol::binding::{BindError, FormValues, FromForm};
//!
//! struct Search {
//!     q: String,
//!     page: u32,
//!     exact: Option<bool>,
//! }
//!
//! impl FromForm for Search {
//!     fn from_form(form: &FormValues) -> Result<Self, BindError> {
//!         Ok(Search {
//!             q: form.required("q")?,
//!             page: form.optional("page")?.unwrap_or(1),
//!             exact: form.optional("exact")?,
//!         })
//!     }
//! }
//!
//! let form = FormValues::parse(b"q=rust+lang&exact=true");
//! let search = Search::from_form(&form).unwrap();
//! assert_eq!(search.q, "rust lang");
//! assert_eq!(search.page, 1);
//! assert_eq!(search.exact, Some(true));
//! ```

use std::fmt;
use std::io;
use std::str::FromStr;

use bytes::Bytes;
use futures::executor::block_on;
use http::header::CONTENT_TYPE;
use multer::{Constraints, Multipart, SizeLimit};
use serde::de::DeserializeOwned;

use crate::dispatcher::Context;

const FORM_URLENCODED: &str = "application/x-www-form-urlencoded";
const JSON: &str = "application/json";
const XML: &str = "application/xml";
const TEXT_XML: &str = "text/xml";
const MULTIPART: &str = "multipart/form-data";

/// Upper bound on a multipart body (32 MiB).
pub const MAX_MULTIPART_BYTES: u64 = 32 << 20;

/// Why a request could not be bound.
#[derive(Debug)]
pub enum BindError {
    /// The `Content-Type` header does not match the binder
    UnsupportedContentType {
        expected: &'static str,
        found: String,
    },
    /// The body is empty
    EmptyBody,
    /// The JSON body did not deserialize into the target type
    Json(serde_json::Error),
    /// The XML body did not deserialize into the target type
    Xml(quick_xml::DeError),
    /// The multipart body is malformed or too large
    Multipart(multer::Error),
    /// A required form field is absent
    MissingField(String),
    /// A form field is present but does not parse
    InvalidField {
        field: String,
        value: String,
        reason: String,
    },
}

impl fmt::Display for BindError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BindError::UnsupportedContentType { expected, found } => write!(
                f,
                "content type must be {expected}, got '{found}'"
            ),
            BindError::EmptyBody => f.write_str("empty request body"),
            BindError::Json(err) => write!(f, "json decode error: {err}"),
            BindError::Xml(err) => write!(f, "xml decode error: {err}"),
            BindError::Multipart(err) => write!(f, "multipart error: {err}"),
            BindError::MissingField(field) => write!(f, "missing field '{field}'"),
            BindError::InvalidField {
                field,
                value,
                reason,
            } => write!(f, "bind {field}={value}: {reason}"),
        }
    }
}

impl std::error::Error for BindError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            BindError::Json(err) => Some(err),
            BindError::Xml(err) => Some(err),
            BindError::Multipart(err) => Some(err),
            _ => None,
        }
    }
}

fn content_type(c: &Context) -> &str {
    c.header(CONTENT_TYPE.as_str()).unwrap_or_default()
}

fn content_type_is(c: &Context, expected: &str) -> bool {
    content_type(c).to_ascii_lowercase().contains(expected)
}

/// Deserialize a JSON body.
///
/// # Errors
///
/// Fails unless the request is `application/json` with a non-empty body that
/// decodes into `T`.
pub fn bind_json<T: DeserializeOwned>(c: &Context) -> Result<T, BindError> {
    if !content_type_is(c, JSON) {
        return Err(BindError::UnsupportedContentType {
            expected: JSON,
            found: content_type(c).to_string(),
        });
    }
    if c.body().is_empty() {
        return Err(BindError::EmptyBody);
    }
    serde_json::from_slice(c.body()).map_err(BindError::Json)
}

/// Deserialize an XML body.
///
/// Either `application/xml` or `text/xml` is accepted.
///
/// # Errors
///
/// Fails on any other content type, an empty body, or a document that does
/// not decode into `T`.
pub fn bind_xml<T: DeserializeOwned>(c: &Context) -> Result<T, BindError> {
    if !content_type_is(c, XML) && !content_type_is(c, TEXT_XML) {
        return Err(BindError::UnsupportedContentType {
            expected: XML,
            found: content_type(c).to_string(),
        });
    }
    if c.body().is_empty() {
        return Err(BindError::EmptyBody);
    }
    let text = String::from_utf8_lossy(c.body());
    quick_xml::de::from_str(&text).map_err(BindError::Xml)
}

/// Bind a `multipart/form-data` body followed by the query string.
///
/// Text parts land in [`MultipartForm::values`] ahead of the query pairs, in
/// the same order [`bind_form`] uses. Parts with a filename are kept as
/// [`FilePart`]s.
///
/// # Errors
///
/// Fails when the content type is not multipart or lacks a boundary, when
/// the body is empty, malformed or over [`MAX_MULTIPART_BYTES`], or when the
/// target rejects the values.
pub fn bind_multipart<T: FromMultipart>(c: &Context) -> Result<T, BindError> {
    let boundary = if content_type_is(c, MULTIPART) {
        multer::parse_boundary(content_type(c)).map_err(BindError::Multipart)?
    } else {
        return Err(BindError::UnsupportedContentType {
            expected: MULTIPART,
            found: content_type(c).to_string(),
        });
    };
    if c.body().is_empty() {
        return Err(BindError::EmptyBody);
    }
    let mut form = read_multipart(c.body(), boundary)?;
    if let Some(query) = c.request().uri().query() {
        form.values
            .values
            .extend(FormValues::parse(query.as_bytes()).values);
    }
    T::from_multipart(&form)
}

// The body is already buffered, so the stream yields one chunk and the
// executor never parks.
fn read_multipart(body: &[u8], boundary: String) -> Result<MultipartForm, BindError> {
    let chunk = Bytes::copy_from_slice(body);
    let stream = futures::stream::once(async move { Ok::<Bytes, io::Error>(chunk) });
    let constraints =
        Constraints::new().size_limit(SizeLimit::new().whole_stream(MAX_MULTIPART_BYTES));
    let mut multipart = Multipart::with_constraints(stream, boundary, constraints);

    block_on(async move {
        let mut form = MultipartForm::default();
        while let Some(field) = multipart
            .next_field()
            .await
            .map_err(BindError::Multipart)?
        {
            let Some(name) = field.name().map(str::to_string) else {
                continue;
            };
            let file_name = field.file_name().map(str::to_string);
            let content_type = field.content_type().map(ToString::to_string);
            let data = field.bytes().await.map_err(BindError::Multipart)?;
            match file_name {
                Some(file_name) => form.files.push(FilePart {
                    field: name,
                    file_name,
                    content_type,
                    data,
                }),
                None => form
                    .values
                    .values
                    .push((name, String::from_utf8_lossy(&data).into_owned())),
            }
        }
        Ok::<_, BindError>(form)
    })
}

/// Bind the query string.
///
/// # Errors
///
/// Propagates the target's [`FromForm`] error.
pub fn bind_query<T: FromForm>(c: &Context) -> Result<T, BindError> {
    let form = c
        .request()
        .uri()
        .query()
        .map(|q| FormValues::parse(q.as_bytes()))
        .unwrap_or_default();
    T::from_form(&form)
}

/// Bind a URL-encoded body followed by the query string.
///
/// Body values come first, so when a key appears in both the body wins. A
/// body with any other content type is ignored and only the query is bound.
///
/// # Errors
///
/// Propagates the target's [`FromForm`] error.
pub fn bind_form<T: FromForm>(c: &Context) -> Result<T, BindError> {
    let mut form = if content_type_is(c, FORM_URLENCODED) {
        FormValues::parse(c.body())
    } else {
        FormValues::default()
    };
    if let Some(query) = c.request().uri().query() {
        form.values
            .extend(FormValues::parse(query.as_bytes()).values);
    }
    T::from_form(&form)
}

/// Decoded `application/x-www-form-urlencoded` pairs, in input order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormValues {
    values: Vec<(String, String)>,
}

impl FormValues {
    #[must_use]
    pub fn parse(input: &[u8]) -> Self {
        Self {
            values: url::form_urlencoded::parse(input).into_owned().collect(),
        }
    }

    /// First value for `name`.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.values
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    /// Every value for `name`, in order.
    pub fn get_all<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.values
            .iter()
            .filter(move |(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    /// Parse the first value for `name`.
    ///
    /// # Errors
    ///
    /// [`BindError::MissingField`] when absent, [`BindError::InvalidField`]
    /// when it does not parse.
    pub fn required<T>(&self, name: &str) -> Result<T, BindError>
    where
        T: FromStr,
        T::Err: fmt::Display,
    {
        self.optional(name)?
            .ok_or_else(|| BindError::MissingField(name.to_string()))
    }

    /// Parse the first value for `name` if present.
    ///
    /// # Errors
    ///
    /// [`BindError::InvalidField`] when the value does not parse.
    pub fn optional<T>(&self, name: &str) -> Result<Option<T>, BindError>
    where
        T: FromStr,
        T::Err: fmt::Display,
    {
        self.get(name)
            .map(|raw| {
                raw.parse().map_err(|e: T::Err| BindError::InvalidField {
                    field: name.to_string(),
                    value: raw.to_string(),
                    reason: e.to_string(),
                })
            })
            .transpose()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Types built from form or query values.
pub trait FromForm: Sized {
    /// # Errors
    ///
    /// Returns a [`BindError`] for missing or malformed fields.
    fn from_form(form: &FormValues) -> Result<Self, BindError>;
}

impl FromForm for FormValues {
    fn from_form(form: &FormValues) -> Result<Self, BindError> {
        Ok(form.clone())
    }
}

/// An uploaded file from a multipart body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilePart {
    /// Form field name
    pub field: String,
    /// Client-supplied filename
    pub file_name: String,
    pub content_type: Option<String>,
    pub data: Bytes,
}

/// A decoded multipart body: text fields plus file parts.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MultipartForm {
    values: FormValues,
    files: Vec<FilePart>,
}

impl MultipartForm {
    /// Text fields, followed by any query pairs.
    #[must_use]
    pub fn values(&self) -> &FormValues {
        &self.values
    }

    /// First file uploaded under `field`.
    #[must_use]
    pub fn file(&self, field: &str) -> Option<&FilePart> {
        self.files.iter().find(|f| f.field == field)
    }

    /// Every file uploaded under `field`, in order.
    pub fn files<'a>(&'a self, field: &'a str) -> impl Iterator<Item = &'a FilePart> + 'a {
        self.files.iter().filter(move |f| f.field == field)
    }
}

/// Types built from a multipart body.
pub trait FromMultipart: Sized {
    /// # Errors
    ///
    /// Returns a [`BindError`] for missing or malformed fields.
    fn from_multipart(form: &MultipartForm) -> Result<Self, BindError>;
}

impl FromMultipart for MultipartForm {
    fn from_multipart(form: &MultipartForm) -> Result<Self, BindError> {
        Ok(form.clone())
    }
}
