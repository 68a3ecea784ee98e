/// Parser for inline ICY metadata blocks (`StreamTitle='...';StreamUrl='...';`)
use crate::metadata::MetadataError;

const STREAM_TITLE_TAG: &str = "StreamTitle='";

/// Extract the stream title from an ICY metadata block
///
/// The title is the text between `StreamTitle='` and the next `;`, without
/// the closing quote.
///
/// * `Ok(None)` if the block has no `StreamTitle` or the title is empty.
/// * `Err(UnterminatedIcyTag)` if `StreamTitle='` is present but no `;` follows.
pub fn parse_stream_title(text: &str) -> Result<Option<String>, MetadataError> {
    let Some(tag_start) = text.find(STREAM_TITLE_TAG) else {
        return Ok(None);
    };

    let value_start = tag_start + STREAM_TITLE_TAG.len();
    let rest = &text[value_start..];
    let end = rest.find(';').ok_or(MetadataError::UnterminatedIcyTag)?;

    let raw = &rest[..end];
    let title = raw.strip_suffix('\'').unwrap_or(raw);
    if title.is_empty() {
        return Ok(None);
    }
    Ok(Some(title.to_string()))
}
