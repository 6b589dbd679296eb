//! Tolerant byte-level HTML tokenizer.

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Token {
    Start {
        name: String,
        attrs: Vec<(String, String)>,
        self_closing: bool,
    },
    End {
        name: String,
    },
    Text(String),
    Comment(String),
}

pub(crate) fn tokenize(source: &str) -> Vec<Token> {
    let mut out = Vec::new();
    let bytes = source.as_bytes();
    let mut idx = 0_usize;

    while idx < bytes.len() {
        if starts_with(bytes, idx, b"<!--") {
            let (comment, next) = read_comment(bytes, idx);
            out.push(Token::Comment(comment));
            idx = next;
            continue;
        }

        if bytes[idx] == b'<' {
            if starts_with(bytes, idx, b"</") {
                if let Some((token, next)) = parse_end_tag(bytes, idx) {
                    out.push(token);
                    idx = next;
                    continue;
                }
            } else if starts_with(bytes, idx, b"<!") || starts_with(bytes, idx, b"<?") {
                idx = skip_to_gt(bytes, idx.saturating_add(2));
                continue;
            } else if let Some((token, next)) = parse_start_tag(bytes, idx) {
                let raw_text_tag = match &token {
                    Token::Start {
                        name, self_closing, ..
                    } if !*self_closing && is_raw_text_tag(name) => Some(name.clone()),
                    _ => None,
                };

                out.push(token);
                idx = next;

                if let Some(tag_name) = raw_text_tag {
                    let (raw_text, closing_end) = read_raw_text(bytes, idx, &tag_name);
                    if !raw_text.is_empty() {
                        out.push(Token::Text(raw_text));
                    }
                    out.push(Token::End { name: tag_name });
                    idx = closing_end.unwrap_or(bytes.len());
                }
                continue;
            }
        }

        let (text, next) = read_text(bytes, idx);
        if !text.is_empty() {
            out.push(Token::Text(decode_entities(&text)));
        }
        idx = next;
    }

    out
}

pub(crate) fn is_raw_text_tag(tag: &str) -> bool {
    matches!(tag, "script" | "style" | "title" | "textarea")
}

pub(crate) fn is_void(tag: &str) -> bool {
    matches!(
        tag,
        "area"
            | "base"
            | "br"
            | "col"
            | "embed"
            | "hr"
            | "img"
            | "input"
            | "link"
            | "meta"
            | "param"
            | "source"
            | "track"
            | "wbr"
    )
}

fn read_comment(bytes: &[u8], start: usize) -> (String, usize) {
    let body_start = start.saturating_add(4);
    match find_subslice(bytes, body_start, b"-->") {
        Some(end) => (
            String::from_utf8_lossy(&bytes[body_start..end]).into_owned(),
            end.saturating_add(3),
        ),
        None => (
            String::from_utf8_lossy(bytes.get(body_start..).unwrap_or_default()).into_owned(),
            bytes.len(),
        ),
    }
}

fn read_text(bytes: &[u8], start: usize) -> (String, usize) {
    // A lone '<' that did not open a tag is text.
    let mut idx = start.saturating_add(1);
    while idx < bytes.len() && bytes[idx] != b'<' {
        idx = idx.saturating_add(1);
    }
    let end = idx.min(bytes.len());
    (String::from_utf8_lossy(&bytes[start..end]).into_owned(), end)
}

fn read_raw_text(bytes: &[u8], start: usize, tag_name: &str) -> (String, Option<usize>) {
    let tag_bytes = tag_name.as_bytes();
    let mut idx = start;

    while idx < bytes.len() {
        if bytes[idx] == b'<'
            && bytes.get(idx.saturating_add(1)).copied() == Some(b'/')
            && starts_with_ignore_ascii_case(bytes, idx.saturating_add(2), tag_bytes)
        {
            let mut close = idx.saturating_add(2).saturating_add(tag_bytes.len());
            while close < bytes.len() && bytes[close].is_ascii_whitespace() {
                close = close.saturating_add(1);
            }
            if bytes.get(close).copied() == Some(b'>') {
                let raw = String::from_utf8_lossy(&bytes[start..idx]).into_owned();
                let text = if tag_name == "title" || tag_name == "textarea" {
                    decode_entities(&raw)
                } else {
                    raw
                };
                return (text, Some(close.saturating_add(1)));
            }
        }
        idx = idx.saturating_add(1);
    }

    (
        String::from_utf8_lossy(bytes.get(start..).unwrap_or_default()).into_owned(),
        None,
    )
}

fn parse_end_tag(bytes: &[u8], start: usize) -> Option<(Token, usize)> {
    let mut idx = skip_spaces(bytes, start.saturating_add(2));
    let begin = idx;
    while idx < bytes.len() && is_name_char(bytes[idx]) {
        idx = idx.saturating_add(1);
    }
    if idx == begin {
        return None;
    }

    let name = String::from_utf8_lossy(&bytes[begin..idx]).to_ascii_lowercase();
    while idx < bytes.len() && bytes[idx] != b'>' {
        idx = idx.saturating_add(1);
    }
    if idx >= bytes.len() {
        return None;
    }

    Some((Token::End { name }, idx.saturating_add(1)))
}

fn parse_start_tag(bytes: &[u8], start: usize) -> Option<(Token, usize)> {
    let mut idx = start.saturating_add(1);
    let begin = idx;
    while idx < bytes.len() && is_name_char(bytes[idx]) {
        idx = idx.saturating_add(1);
    }
    if idx == begin {
        return None;
    }

    let name = String::from_utf8_lossy(&bytes[begin..idx]).to_ascii_lowercase();
    let mut attrs: Vec<(String, String)> = Vec::new();
    let mut self_closing = false;

    loop {
        idx = skip_spaces(bytes, idx);
        let byte = *bytes.get(idx)?;

        if byte == b'>' {
            idx = idx.saturating_add(1);
            break;
        }

        if byte == b'/' {
            self_closing = true;
            idx = idx.saturating_add(1);
            continue;
        }

        let attr_start = idx;
        while idx < bytes.len() && is_attr_name_char(bytes[idx]) {
            idx = idx.saturating_add(1);
        }
        if idx == attr_start {
            idx = skip_to_gt(bytes, idx);
            break;
        }

        let attr_name = String::from_utf8_lossy(&bytes[attr_start..idx]).to_ascii_lowercase();
        idx = skip_spaces(bytes, idx);

        let mut value = String::new();
        if bytes.get(idx).copied() == Some(b'=') {
            idx = skip_spaces(bytes, idx.saturating_add(1));
            match bytes.get(idx).copied() {
                Some(quote @ (b'"' | b'\'')) => {
                    idx = idx.saturating_add(1);
                    let value_start = idx;
                    while idx < bytes.len() && bytes[idx] != quote {
                        idx = idx.saturating_add(1);
                    }
                    value = String::from_utf8_lossy(&bytes[value_start..idx.min(bytes.len())])
                        .into_owned();
                    if idx < bytes.len() {
                        idx = idx.saturating_add(1);
                    }
                }
                _ => {
                    let value_start = idx;
                    while idx < bytes.len()
                        && !bytes[idx].is_ascii_whitespace()
                        && bytes[idx] != b'>'
                    {
                        idx = idx.saturating_add(1);
                    }
                    value = String::from_utf8_lossy(&bytes[value_start..idx]).into_owned();
                }
            }
        }

        // First occurrence wins for duplicated attributes.
        if !attrs.iter().any(|(existing, _)| *existing == attr_name) {
            attrs.push((attr_name, decode_entities(&value)));
        }
    }

    Some((
        Token::Start {
            name,
            attrs,
            self_closing,
        },
        idx,
    ))
}

pub(crate) fn decode_entities(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut cursor = 0_usize;

    while let Some(rel_amp) = input[cursor..].find('&') {
        let amp = cursor.saturating_add(rel_amp);
        out.push_str(&input[cursor..amp]);

        let rest = &input[amp.saturating_add(1)..];
        let decoded = rest.find(';').filter(|semi| *semi <= 10).and_then(|semi| {
            decode_entity(&rest[..semi]).map(|text| (text, semi))
        });

        match decoded {
            Some((text, semi)) => {
                out.push_str(&text);
                cursor = amp.saturating_add(semi).saturating_add(2);
            }
            None => {
                out.push('&');
                cursor = amp.saturating_add(1);
            }
        }
    }

    out.push_str(&input[cursor..]);
    out
}

fn decode_entity(entity: &str) -> Option<String> {
    match entity {
        "nbsp" => Some("\u{a0}".to_owned()),
        "amp" => Some("&".to_owned()),
        "lt" => Some("<".to_owned()),
        "gt" => Some(">".to_owned()),
        "quot" => Some("\"".to_owned()),
        "apos" => Some("'".to_owned()),
        "copy" => Some("\u{a9}".to_owned()),
        "ndash" => Some("\u{2013}".to_owned()),
        "hellip" => Some("\u{2026}".to_owned()),
        _ => {
            let value = if let Some(hex) = entity
                .strip_prefix("#x")
                .or_else(|| entity.strip_prefix("#X"))
            {
                u32::from_str_radix(hex, 16).ok()?
            } else {
                entity.strip_prefix('#')?.parse::<u32>().ok()?
            };
            char::from_u32(value).map(|ch| ch.to_string())
        }
    }
}

fn skip_to_gt(bytes: &[u8], mut idx: usize) -> usize {
    while idx < bytes.len() {
        if bytes[idx] == b'>' {
            return idx.saturating_add(1);
        }
        idx = idx.saturating_add(1);
    }
    bytes.len()
}

fn skip_spaces(bytes: &[u8], mut idx: usize) -> usize {
    while idx < bytes.len() && bytes[idx].is_ascii_whitespace() {
        idx = idx.saturating_add(1);
    }
    idx
}

fn is_name_char(byte: u8) -> bool {
    byte.is_ascii_alphanumeric() || matches!(byte, b'-' | b'_' | b':')
}

fn is_attr_name_char(byte: u8) -> bool {
    !byte.is_ascii_whitespace() && !matches!(byte, b'>' | b'/' | b'=' | b'"' | b'\'')
}

fn starts_with(bytes: &[u8], idx: usize, pattern: &[u8]) -> bool {
    let end = idx.saturating_add(pattern.len());
    end <= bytes.len() && bytes[idx..end] == *pattern
}

fn starts_with_ignore_ascii_case(bytes: &[u8], idx: usize, pattern: &[u8]) -> bool {
    let end = idx.saturating_add(pattern.len());
    end <= bytes.len()
        && bytes[idx..end]
            .iter()
            .zip(pattern.iter())
            .all(|(left, right)| left.eq_ignore_ascii_case(right))
}

fn find_subslice(bytes: &[u8], from: usize, needle: &[u8]) -> Option<usize> {
    if from >= bytes.len() {
        return None;
    }
    bytes[from..]
        .windows(needle.len())
        .position(|window| window == needle)
        .map(|offset| from.saturating_add(offset))
}
