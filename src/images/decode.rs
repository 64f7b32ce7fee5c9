use base64::Engine as _;
use bytes::Bytes;

use crate::error::ValidationKind;

/// A recipe image decoded from its inline `data:` URI form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedImage {
    pub body: Bytes,
    pub content_type: String,
}

/// Decodes `data:image/<type>;base64,<payload>`.
///
/// An absent or blank value is a missing image; anything present that does
/// not parse is a bad encoding.
pub fn decode_data_uri(raw: Option<&str>) -> Result<DecodedImage, ValidationKind> {
    let raw = raw.map(str::trim).unwrap_or_default();
    if raw.is_empty() {
        return Err(ValidationKind::MissingImage);
    }

    let (header, payload) = raw
        .split_once(";base64,")
        .ok_or(ValidationKind::BadImageEncoding)?;
    let content_type = header
        .strip_prefix("data:")
        .filter(|ct| ct.starts_with("image/") && ct.len() > "image/".len())
        .ok_or(ValidationKind::BadImageEncoding)?;

    let body = base64::engine::general_purpose::STANDARD
        .decode(payload.trim())
        .map_err(|_| ValidationKind::BadImageEncoding)?;
    if body.is_empty() {
        return Err(ValidationKind::BadImageEncoding);
    }

    Ok(DecodedImage {
        body: Bytes::from(body),
        content_type: content_type.to_ascii_lowercase(),
    })
}
