use crate::stream::StreamError;
use std::io::{BufRead, ErrorKind, Read};
use log::{debug, trace};

/// Longest header or boundary line accepted
const MAX_LINE_LEN: u64 = 1024;

/// Largest part body accepted
pub const MAX_PART_SIZE: usize = 4 * 1024 * 1024;

/// One body part of a `multipart/x-mixed-replace` response
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Part {
    pub content_type: Option<String>,
    pub data: Vec<u8>,
}

/// Why the connection has to be re-established
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconnectReason {
    MissingContentLength,
    ZeroContentLength,
    EndOfStream,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MultipartItem {
    Part(Part),
    Reconnect(ReconnectReason),
    /// Closing `--boundary--` delimiter
    End,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ParseState {
    Boundary,
    Headers,
    Body(usize),
}

/// Pull parser for multipart bodies
///
/// Works line by line over a buffered reader: wait for a boundary line, read
/// the part headers up to the empty line, then read exactly `Content-Length`
/// bytes of body.
pub struct MultipartReader<R> {
    reader: R,
    /// Boundary without the leading `--`; `None` accepts any `--` line
    boundary: Option<String>,
    state: ParseState,
    content_type: Option<String>,
    content_length: Option<usize>,
}

impl<R: BufRead> MultipartReader<R> {
    pub fn new(reader: R, boundary: Option<String>) -> Self {
        Self {
            reader,
            boundary,
            state: ParseState::Boundary,
            content_type: None,
            content_length: None,
        }
    }

    /// Read until the next complete part, or until the stream can no longer
    /// be used
    pub fn next_part(&mut self) -> Result<MultipartItem, StreamError> {
        loop {
            match self.state {
                ParseState::Boundary => {
                    let Some(line) = self.read_line()? else {
                        return Ok(MultipartItem::Reconnect(ReconnectReason::EndOfStream));
                    };
                    if line.is_empty() {
                        continue;
                    }
                    match self.match_boundary(&line) {
                        Some(true) => {
                            trace!("Boundary found");
                            self.content_type = None;
                            self.content_length = None;
                            self.state = ParseState::Headers;
                        }
                        Some(false) => {
                            debug!("Closing boundary received");
                            return Ok(MultipartItem::End);
                        }
                        None => trace!("Skipping line outside of a part: {}", line),
                    }
                }
                ParseState::Headers => {
                    let Some(line) = self.read_line()? else {
                        self.state = ParseState::Boundary;
                        return Ok(MultipartItem::Reconnect(ReconnectReason::EndOfStream));
                    };
                    if !line.is_empty() {
                        self.header(&line)?;
                        continue;
                    }
                    match self.content_length {
                        None => {
                            self.state = ParseState::Boundary;
                            return Ok(MultipartItem::Reconnect(ReconnectReason::MissingContentLength));
                        }
                        Some(0) => {
                            self.state = ParseState::Boundary;
                            return Ok(MultipartItem::Reconnect(ReconnectReason::ZeroContentLength));
                        }
                        Some(length) => self.state = ParseState::Body(length),
                    }
                }
                ParseState::Body(length) => {
                    self.state = ParseState::Boundary;
                    let mut data = vec![0u8; length];
                    match self.reader.read_exact(&mut data) {
                        Ok(()) => {}
                        Err(e) if e.kind() == ErrorKind::UnexpectedEof => {
                            return Ok(MultipartItem::Reconnect(ReconnectReason::EndOfStream));
                        }
                        Err(e) => return Err(StreamError::Io(e)),
                    }
                    return Ok(MultipartItem::Part(Part {
                        content_type: self.content_type.take(),
                        data,
                    }));
                }
            }
        }
    }

    /// `Some(true)` for a part delimiter, `Some(false)` for the closing
    /// delimiter, `None` for anything else
    fn match_boundary(&self, line: &str) -> Option<bool> {
        let marker = line.strip_prefix("--")?;
        match &self.boundary {
            Some(boundary) if marker == boundary => Some(true),
            Some(boundary) => (marker.strip_suffix("--") == Some(boundary.as_str())).then_some(false),
            None => Some(true),
        }
    }

    fn header(&mut self, line: &str) -> Result<(), StreamError> {
        let Some((name, value)) = line.split_once(':') else {
            trace!("Ignoring malformed part header: {}", line);
            return Ok(());
        };
        let value = value.trim();
        if name.trim().eq_ignore_ascii_case("content-length") {
            let length: usize = value
                .parse()
                .map_err(|_| StreamError::Protocol(format!("invalid Content-Length '{}'", value)))?;
            if length > MAX_PART_SIZE {
                return Err(StreamError::Protocol(format!("part of {} bytes exceeds limit", length)));
            }
            self.content_length = Some(length);
        } else if name.trim().eq_ignore_ascii_case("content-type") {
            self.content_type = Some(value.to_string());
        }
        Ok(())
    }

    /// Next line without its line terminator, `None` at end of stream
    fn read_line(&mut self) -> Result<Option<String>, StreamError> {
        let mut buf = Vec::new();
        let read = (&mut self.reader).take(MAX_LINE_LEN).read_until(b'\n', &mut buf)?;
        if read == 0 {
            return Ok(None);
        }
        if buf.last() != Some(&b'\n') && read as u64 == MAX_LINE_LEN {
            return Err(StreamError::Protocol("header line too long".to_string()));
        }
        let line = String::from_utf8_lossy(&buf);
        Ok(Some(line.trim_end_matches(&['\r', '\n'][..]).to_string()))
    }
}

/// Boundary parameter of a `Content-Type` header, without leading dashes
pub fn boundary_from_content_type(content_type: &str) -> Option<String> {
    content_type.split(';').skip(1).find_map(|param| {
        let (name, value) = param.split_once('=')?;
        if !name.trim().eq_ignore_ascii_case("boundary") {
            return None;
        }
        let value = value.trim().trim_matches('"');
        let value = value.trim_start_matches("--");
        (!value.is_empty()).then(|| value.to_string())
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn part(boundary: &str, data: &[u8]) -> Vec<u8> {
        let mut out = format!(
            "--{}\r\nContent-Type: image/jpeg\r\nContent-Length: {}\r\n\r\n",
            boundary,
            data.len()
        )
        .into_bytes();
        out.extend_from_slice(data);
        out.extend_from_slice(b"\r\n");
        out
    }

    fn reader(bytes: Vec<u8>, boundary: Option<&str>) -> MultipartReader<Cursor<Vec<u8>>> {
        MultipartReader::new(Cursor::new(bytes), boundary.map(str::to_string))
    }

    #[test]
    fn test_boundary_from_content_type() {
        assert_eq!(
            boundary_from_content_type("multipart/x-mixed-replace;boundary=123456789000000000000987654321"),
            Some("123456789000000000000987654321".to_string())
        );
        assert_eq!(
            boundary_from_content_type("multipart/x-mixed-replace; Boundary=\"--frame\""),
            Some("frame".to_string())
        );
        assert_eq!(boundary_from_content_type("image/jpeg"), None);
    }

    #[test]
    fn test_parts_in_sequence() {
        let mut bytes = part("frame", b"first");
        bytes.extend(part("frame", b"second\r\nwith newline"));
        let mut parser = reader(bytes, Some("frame"));

        match parser.next_part().unwrap() {
            MultipartItem::Part(p) => {
                assert_eq!(p.data, b"first");
                assert_eq!(p.content_type.as_deref(), Some("image/jpeg"));
            }
            other => panic!("unexpected {:?}", other),
        }
        match parser.next_part().unwrap() {
            MultipartItem::Part(p) => assert_eq!(p.data, b"second\r\nwith newline"),
            other => panic!("unexpected {:?}", other),
        }
        assert_eq!(
            parser.next_part().unwrap(),
            MultipartItem::Reconnect(ReconnectReason::EndOfStream)
        );
    }

    #[test]
    fn test_any_dash_line_without_known_boundary() {
        let mut parser = reader(part("whatever", b"abc"), None);
        assert!(matches!(parser.next_part().unwrap(), MultipartItem::Part(_)));
    }

    #[test]
    fn test_foreign_boundary_is_skipped() {
        let mut bytes = part("other", b"skip");
        bytes.extend(part("frame", b"keep"));
        let mut parser = reader(bytes, Some("frame"));
        match parser.next_part().unwrap() {
            MultipartItem::Part(p) => assert_eq!(p.data, b"keep"),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_closing_boundary() {
        let mut bytes = part("frame", b"x");
        bytes.extend_from_slice(b"--frame--\r\n");
        let mut parser = reader(bytes, Some("frame"));
        assert!(matches!(parser.next_part().unwrap(), MultipartItem::Part(_)));
        assert_eq!(parser.next_part().unwrap(), MultipartItem::End);
    }

    #[test]
    fn test_missing_or_zero_length_requests_reconnect() {
        let mut parser = reader(b"--frame\r\nContent-Type: image/jpeg\r\n\r\n".to_vec(), Some("frame"));
        assert_eq!(
            parser.next_part().unwrap(),
            MultipartItem::Reconnect(ReconnectReason::MissingContentLength)
        );

        let mut parser = reader(b"--frame\r\nContent-Length: 0\r\n\r\n".to_vec(), Some("frame"));
        assert_eq!(
            parser.next_part().unwrap(),
            MultipartItem::Reconnect(ReconnectReason::ZeroContentLength)
        );
    }

    #[test]
    fn test_truncated_body_requests_reconnect() {
        let mut parser = reader(b"--frame\r\nContent-Length: 100\r\n\r\nshort".to_vec(), Some("frame"));
        assert_eq!(
            parser.next_part().unwrap(),
            MultipartItem::Reconnect(ReconnectReason::EndOfStream)
        );
    }

    #[test]
    fn test_invalid_length_is_protocol_error() {
        let mut parser = reader(b"--frame\r\nContent-Length: lots\r\n\r\n".to_vec(), Some("frame"));
        assert!(matches!(parser.next_part(), Err(StreamError::Protocol(_))));
    }
}
