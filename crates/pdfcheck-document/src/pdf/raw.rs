// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Raw object scanning — find `N G obj` bodies in PDF bytes without trusting
// the cross-reference table.
//
// Used for image recovery when parsing fails, and to rebuild the
// cross-reference table of a file that lost its trailer.

use std::collections::BTreeMap;
use std::ops::Range;

use tracing::debug;

/// One indirect object found in the raw bytes.
pub(crate) struct RawObject {
    pub number: u32,
    pub generation: u16,
    /// Offset of the object header (`N G obj`).
    pub offset: usize,
    /// Dictionary / body text (everything before `stream`, or before `endobj`).
    pub dict: Range<usize>,
    /// Stream payload, when the object is a stream.
    pub stream: Option<Range<usize>>,
}

/// Parsed `N G` prefix of an object header or reference.
struct Header {
    number: u32,
    generation: u16,
    start: usize,
}

/// Collect every complete indirect object in file order.
pub(crate) fn scan_objects(data: &[u8]) -> Vec<RawObject> {
    let mut objects = Vec::new();
    let mut cursor = 0usize;
    // Once no `endobj` follows some offset, none follows any later one.
    let mut endobj_exhausted = false;

    while let Some((header, body_start)) = next_object(data, cursor) {
        let endobj_kw = if endobj_exhausted {
            None
        } else {
            find(data, b"endobj", body_start)
        };
        endobj_exhausted = endobj_kw.is_none();

        // `stream` can only open this object's payload if it precedes the
        // object's `endobj`.
        let body_end = endobj_kw.unwrap_or(data.len());
        let stream_kw = find(&data[..body_end], b"stream", body_start);

        match (stream_kw, endobj_kw) {
            (Some(stream_at), _) => {
                let data_start = skip_eol(data, stream_at + b"stream".len());
                let Some(end_at) = find(data, b"endstream", data_start) else {
                    debug!(number = header.number, "unterminated stream, stopping scan");
                    break;
                };
                let payload_end = data_start + trim_eol(&data[data_start..end_at]).len();
                objects.push(RawObject {
                    number: header.number,
                    generation: header.generation,
                    offset: header.start,
                    dict: body_start..stream_at,
                    stream: Some(data_start..payload_end),
                });
                cursor = end_at + b"endstream".len();
            }
            (None, Some(end_at)) => {
                objects.push(RawObject {
                    number: header.number,
                    generation: header.generation,
                    offset: header.start,
                    dict: body_start..end_at,
                    stream: None,
                });
                cursor = end_at + b"endobj".len();
            }
            (None, None) => break,
        }
    }

    objects
}

/// Append a fresh cross-reference table and trailer built from the objects
/// found in `data`.
///
/// Later definitions of an object number win, as with incremental updates.
/// `None` when no catalog object can be found.
pub(crate) fn rebuild_xref(data: &[u8]) -> Option<Vec<u8>> {
    let mut table: BTreeMap<u32, (u16, usize)> = BTreeMap::new();
    let mut root = None;
    for obj in scan_objects(data) {
        table.insert(obj.number, (obj.generation, obj.offset));
        let is_catalog =
            obj.stream.is_none() && has_name_pair(&data[obj.dict.clone()], b"Type", b"Catalog");
        if is_catalog {
            root = Some((obj.number, obj.generation));
        }
    }
    let (root_number, root_generation) = root?;
    let size = table.keys().next_back()? + 1;

    let mut out = Vec::with_capacity(data.len() + 20 * size as usize + 128);
    out.extend_from_slice(data);
    out.push(b'\n');
    let xref_offset = out.len();

    out.extend_from_slice(format!("xref\n0 {size}\n").as_bytes());
    for number in 0..size {
        let entry = match table.get(&number) {
            Some((generation, offset)) => format!("{offset:010} {generation:05} n\r\n"),
            None => "0000000000 65535 f\r\n".to_string(),
        };
        out.extend_from_slice(entry.as_bytes());
    }
    out.extend_from_slice(
        format!(
            "trailer\n<< /Size {size} /Root {root_number} {root_generation} R >>\n\
             startxref\n{xref_offset}\n%%EOF\n"
        )
        .as_bytes(),
    );

    debug!(objects = table.len(), size, "cross-reference table rebuilt");
    Some(out)
}

/// Object numbers of every `N G R` reference in `text`, in order.
pub(crate) fn references(text: &[u8]) -> Vec<u32> {
    let mut refs = Vec::new();
    for (at, byte) in text.iter().enumerate() {
        if *byte != b'R' || text.get(at + 1).is_some_and(|b| b.is_ascii_alphanumeric()) {
            continue;
        }
        if let Some(header) = header_before(text, at) {
            refs.push(header.number);
        }
    }
    refs
}

/// Find the next `N G obj` header at or after `from`.
///
/// Returns the header and the offset just past `obj`.
fn next_object(data: &[u8], from: usize) -> Option<(Header, usize)> {
    let mut search = from;
    while let Some(at) = find(data, b"obj", search) {
        search = at + 3;
        if let Some(header) = header_before(data, at) {
            let after = data.get(at + 3).copied();
            // `obj` must end the token (rules out `objstm`-like names).
            if after.is_none_or(|b| !b.is_ascii_alphanumeric()) {
                return Some((header, at + 3));
            }
        }
    }
    None
}

/// Parse `<number> <generation> ` backwards from the keyword (`obj` or `R`)
/// starting at `at`.
fn header_before(data: &[u8], at: usize) -> Option<Header> {
    let mut i = at;
    let ws_end = i;
    while i > 0 && data[i - 1].is_ascii_whitespace() {
        i -= 1;
    }
    if i == ws_end {
        return None;
    }
    let gen_end = i;
    while i > 0 && data[i - 1].is_ascii_digit() {
        i -= 1;
    }
    if i == gen_end {
        return None;
    }
    let gen_start = i;
    while i > 0 && data[i - 1].is_ascii_whitespace() {
        i -= 1;
    }
    if i == gen_start {
        return None;
    }
    let num_end = i;
    while i > 0 && data[i - 1].is_ascii_digit() {
        i -= 1;
    }
    if i == num_end || (i > 0 && data[i - 1].is_ascii_alphanumeric()) {
        return None;
    }
    Some(Header {
        number: std::str::from_utf8(&data[i..num_end]).ok()?.parse().ok()?,
        generation: std::str::from_utf8(&data[gen_start..gen_end]).ok()?.parse().ok()?,
        start: i,
    })
}

/// Whether `/key /value` (any whitespace between) appears in `dict`, with
/// `value` ending at a delimiter so `/Page` does not match `/Pages`.
pub(crate) fn has_name_pair(dict: &[u8], key: &[u8], value: &[u8]) -> bool {
    let mut search = 0;
    while let Some(at) = find_name(dict, key, search) {
        let mut i = at + 1 + key.len();
        while i < dict.len() && dict[i].is_ascii_whitespace() {
            i += 1;
        }
        if dict.get(i) == Some(&b'/') && name_at(dict, i, value) {
            return true;
        }
        search = at + 1;
    }
    false
}

pub(crate) fn has_name(dict: &[u8], name: &[u8]) -> bool {
    find_name(dict, name, 0).is_some()
}

/// Offset of the `/` introducing the complete name `name`, at or after `from`.
fn find_name(dict: &[u8], name: &[u8], from: usize) -> Option<usize> {
    let mut search = from;
    while let Some(at) = find(dict, b"/", search) {
        if name_at(dict, at, name) {
            return Some(at);
        }
        search = at + 1;
    }
    None
}

fn name_at(dict: &[u8], slash: usize, name: &[u8]) -> bool {
    let start = slash + 1;
    let end = start + name.len();
    dict.get(start..end) == Some(name)
        && dict
            .get(end)
            .is_none_or(|b| !(b.is_ascii_alphanumeric() || *b == b'_' || *b == b'-'))
}

fn skip_eol(data: &[u8], mut at: usize) -> usize {
    if data.get(at) == Some(&b'\r') {
        at += 1;
    }
    if data.get(at) == Some(&b'\n') {
        at += 1;
    }
    at
}

fn trim_eol(mut data: &[u8]) -> &[u8] {
    if data.last() == Some(&b'\n') {
        data = &data[..data.len() - 1];
    }
    if data.last() == Some(&b'\r') {
        data = &data[..data.len() - 1];
    }
    data
}

fn find(haystack: &[u8], needle: &[u8], from: usize) -> Option<usize> {
    if from >= haystack.len() {
        return None;
    }
    haystack[from..]
        .windows(needle.len())
        .position(|window| window == needle)
        .map(|pos| pos + from)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures;

    #[test]
    fn header_before_parses_object_headers() {
        let data = b"\n12 3 obj";
        let header = header_before(data, 6).unwrap();
        assert_eq!((header.number, header.generation, header.start), (12, 3, 1));
        assert!(header_before(b"endobj", 3).is_none());
        assert!(header_before(b"x12 0 obj", 6).is_none());
    }

    #[test]
    fn page_name_does_not_match_pages() {
        assert!(has_name_pair(b"<< /Type /Page /Parent 2 0 R >>", b"Type", b"Page"));
        assert!(has_name_pair(b"<</Type/Page>>", b"Type", b"Page"));
        assert!(!has_name_pair(b"<< /Type /Pages >>", b"Type", b"Page"));
    }

    #[test]
    fn references_are_listed_in_order() {
        assert_eq!(
            references(b"<< /XObject << /Im1 7 0 R /Im2 12 0 R >> /Parent 3 0 R >>"),
            vec![7, 12, 3]
        );
        assert!(references(b"<< /Rotate 90 /Name /R >>").is_empty());
    }

    #[test]
    fn scan_finds_streams_and_plain_objects() {
        let data = b"%PDF-1.4\n1 0 obj\n<< /Type /Catalog >>\nendobj\n\
                     2 0 obj\n<< /Length 3 >>\nstream\nabc\nendstream\nendobj\n\
                     3 0 obj\n42\nendobj\n";
        let objects = scan_objects(data);
        let numbers: Vec<u32> = objects.iter().map(|obj| obj.number).collect();
        assert_eq!(numbers, vec![1, 2, 3]);
        assert!(objects[0].stream.is_none());
        assert_eq!(&data[objects[1].stream.clone().unwrap()], b"abc");
        assert_eq!(&data[objects[2].offset..objects[2].offset + 7], b"3 0 obj");
    }

    #[test]
    fn stream_keyword_after_endobj_belongs_to_the_next_object() {
        let data = b"1 0 obj\n<< /A 1 >>\nendobj\n2 0 obj\n<< >>\nstream\nxy\nendstream\nendobj\n";
        let objects = scan_objects(data);
        assert_eq!(objects.len(), 2);
        assert!(objects[0].stream.is_none());
        assert!(objects[1].stream.is_some());
    }

    #[test]
    fn rebuilt_xref_makes_a_trailerless_file_parseable() {
        let bytes = fixtures::text_pdf(&["sin trailer"]);
        let cut = bytes
            .windows(9)
            .rposition(|window| window == b"startxref")
            .unwrap();
        let trailerless = &bytes[..cut];
        assert!(lopdf::Document::load_mem(trailerless).is_err());

        let rebuilt = rebuild_xref(trailerless).unwrap();
        let doc = lopdf::Document::load_mem(&rebuilt).unwrap();
        assert_eq!(doc.get_pages().len(), 1);
        assert!(doc.extract_text(&[1]).unwrap().contains("sin trailer"));
    }

    #[test]
    fn rebuild_needs_a_catalog() {
        assert!(rebuild_xref(b"%PDF-1.4\n1 0 obj\n42\nendobj\n").is_none());
    }
}
