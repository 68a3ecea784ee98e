/// Narrow DIDL-Lite codec for the single-item metadata blobs exchanged with
/// DLNA control points
///
/// This is not a general XML parser. The supported tags are listed in
/// [`DIDL_FIELDS`]; each one is located by literal search for `<tag ...>` and
/// `</tag>`. Unknown tags are dropped, absent or empty tags yield `None`.
use crate::data::Metadata;
use crate::helpers::markup::{escape_xml_text, unescape_xml};
use crate::helpers::time_format::{format_hms, parse_hms};
use log::debug;

/// UPnP class sent for every track
pub const MUSIC_TRACK_CLASS: &str = "object.item.audioItem.musicTrack";

const DIDL_START: &str = concat!(
    r#"<DIDL-Lite xmlns:dc="http://purl.org/dc/elements/1.1/""#,
    r#" xmlns:upnp="urn:schemas-upnp-org:metadata-1-0/upnp/""#,
    r#" xmlns="urn:schemas-upnp-org:metadata-1-0/DIDL-Lite/""#,
    r#" xmlns:dlna="urn:schemas-dlna-org:metadata-1-0/">"#,
);
const DIDL_END: &str = "</item></DIDL-Lite>";
const DEFAULT_ITEM_ID: &str = "1";

/// One supported tag: where its value comes from when encoding and where it
/// goes when decoding
pub struct DidlField {
    pub tag: &'static str,
    /// `None` means the tag is not written
    pub get: fn(&Metadata) -> Option<String>,
    pub set: fn(&mut Metadata, &str),
}

/// Supported tags, in output order
pub const DIDL_FIELDS: &[DidlField] = &[
    DidlField { tag: "dc:title", get: get_title, set: set_title },
    DidlField { tag: "upnp:album", get: get_album, set: set_album },
    DidlField { tag: "upnp:artist", get: get_artist, set: set_artist },
    // Many control points only send the creator; it fills in a missing artist
    DidlField { tag: "dc:creator", get: get_nothing, set: set_creator },
    DidlField { tag: "upnp:albumArtURI", get: get_art_url, set: set_art_url },
    DidlField { tag: "res", get: get_stream_url, set: set_stream_url },
    DidlField { tag: "upnp:duration", get: get_duration, set: set_duration },
    DidlField { tag: "upnp:class", get: get_class, set: set_class },
];

fn get_title(m: &Metadata) -> Option<String> {
    m.title.clone()
}

fn set_title(m: &mut Metadata, v: &str) {
    m.title = Some(v.to_string());
}

fn get_album(m: &Metadata) -> Option<String> {
    m.album.clone()
}

fn set_album(m: &mut Metadata, v: &str) {
    m.album = Some(v.to_string());
}

fn get_artist(m: &Metadata) -> Option<String> {
    m.artist.clone()
}

fn set_artist(m: &mut Metadata, v: &str) {
    m.artist = Some(v.to_string());
}

fn get_nothing(_m: &Metadata) -> Option<String> {
    None
}

fn set_creator(m: &mut Metadata, v: &str) {
    if m.artist.is_none() {
        m.artist = Some(v.to_string());
    }
}

fn get_art_url(m: &Metadata) -> Option<String> {
    m.art_url.clone()
}

fn set_art_url(m: &mut Metadata, v: &str) {
    m.art_url = Some(v.to_string());
}

fn get_stream_url(m: &Metadata) -> Option<String> {
    m.stream_url.clone()
}

fn set_stream_url(m: &mut Metadata, v: &str) {
    m.stream_url = Some(v.to_string());
}

fn get_duration(m: &Metadata) -> Option<String> {
    Some(format_hms(m.duration))
}

fn set_duration(m: &mut Metadata, v: &str) {
    match parse_hms(v) {
        Some(secs) => m.duration = secs,
        None => debug!("Ignoring unparsable upnp:duration '{}'", v),
    }
}

fn get_class(m: &Metadata) -> Option<String> {
    Some(m.upnp_class.clone().unwrap_or_else(|| MUSIC_TRACK_CLASS.to_string()))
}

fn set_class(m: &mut Metadata, v: &str) {
    m.upnp_class = Some(v.to_string());
}

/// An element found in the document: raw attribute text and raw content
struct Element<'a> {
    attributes: &'a str,
    content: &'a str,
}

/// Locate the first `<tag ...>content</tag>` (or `<tag .../>`) in `xml`
fn find_element<'a>(xml: &'a str, tag: &str) -> Option<Element<'a>> {
    let open = format!("<{}", tag);
    let close = format!("</{}>", tag);

    let mut search_from = 0;
    while let Some(found) = xml[search_from..].find(&open) {
        let name_end = search_from + found + open.len();
        let rest = &xml[name_end..];
        // `<res` must not match `<resource`
        match rest.chars().next() {
            Some('>') | Some('/') => {}
            Some(c) if c.is_whitespace() => {}
            _ => {
                search_from = name_end;
                continue;
            }
        }

        let tag_end = rest.find('>')?;
        let head = &rest[..tag_end];
        if let Some(attributes) = head.strip_suffix('/') {
            return Some(Element { attributes: attributes.trim(), content: "" });
        }

        let body = &rest[tag_end + 1..];
        let content_end = body.find(&close)?;
        return Some(Element {
            attributes: head.trim(),
            content: &body[..content_end],
        });
    }
    None
}

/// Value of `name="..."` in an element's attribute text
fn attribute<'a>(attributes: &'a str, name: &str) -> Option<&'a str> {
    let mut rest = attributes;
    while let Some(pos) = rest.find(name) {
        let before_ok = pos == 0 || rest[..pos].ends_with(char::is_whitespace);
        let after = rest[pos + name.len()..].trim_start();
        if before_ok {
            if let Some(value) = after.strip_prefix('=') {
                let value = value.trim_start();
                let quote = value.chars().next()?;
                if quote == '"' || quote == '\'' {
                    let inner = &value[1..];
                    let end = inner.find(quote)?;
                    return Some(&inner[..end]);
                }
            }
        }
        rest = &rest[pos + name.len()..];
    }
    None
}

/// Mime type from a `protocolInfo` value (`http-get:*:audio/mpeg:*`)
fn mime_from_protocol_info(protocol_info: &str) -> Option<String> {
    protocol_info
        .split(':')
        .nth(2)
        .filter(|mime| !mime.is_empty() && *mime != "*")
        .map(str::to_string)
}

/// Decode a DIDL-Lite blob into a fresh metadata record
pub fn decode(xml: &str) -> Metadata {
    let mut metadata = Metadata::default();

    for field in DIDL_FIELDS {
        match find_element(xml, field.tag) {
            Some(element) if !element.content.trim().is_empty() => {
                let value = unescape_xml(element.content.trim());
                debug!("{} = {}", field.tag, value);
                (field.set)(&mut metadata, &value);
            }
            _ => debug!("{} is empty or missing", field.tag),
        }
    }

    if let Some(item) = find_element(xml, "item") {
        metadata.item_id = attribute(item.attributes, "id").map(unescape_xml);
    }

    if let Some(res) = find_element(xml, "res") {
        if let Some(protocol_info) = attribute(res.attributes, "protocolInfo") {
            metadata.mime_type = mime_from_protocol_info(protocol_info);
        }
        if metadata.duration == 0 {
            if let Some(secs) = attribute(res.attributes, "duration").and_then(parse_hms) {
                metadata.duration = secs;
            }
        }
    }

    metadata
}

/// Encode a metadata record as a single-item DIDL-Lite blob
pub fn encode(metadata: &Metadata) -> String {
    let mut xml = String::with_capacity(512);
    xml.push_str(DIDL_START);
    xml.push_str(&format!(
        r#"<item id="{}" parentID="0" restricted="1">"#,
        escape_xml_text(metadata.item_id.as_deref().unwrap_or(DEFAULT_ITEM_ID)).replace('"', "&quot;")
    ));

    for field in DIDL_FIELDS {
        let Some(value) = (field.get)(metadata) else {
            continue;
        };
        if field.tag == "res" {
            if let Some(mime) = &metadata.mime_type {
                xml.push_str(&format!(
                    r#"<res protocolInfo="http-get:*:{}:*">{}</res>"#,
                    escape_xml_text(mime),
                    escape_xml_text(&value)
                ));
                continue;
            }
        }
        xml.push_str(&format!("<{tag}>{}</{tag}>", escape_xml_text(&value), tag = field.tag));
    }

    xml.push_str(DIDL_END);
    xml
}
