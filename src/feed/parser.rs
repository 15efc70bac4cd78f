use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use thiserror::Error;

/// Errors that can occur while reading the newest item out of a feed.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum FeedParseError {
    /// Document is not well-formed XML.
    #[error("XML parse error: {0}")]
    Xml(String),

    /// No `<channel>` directly under the document root.
    #[error("Feed has no <channel> element")]
    MissingChannel,

    /// `<channel>` exists but holds no `<item>`.
    #[error("Feed channel has no <item> element")]
    MissingItem,
}

/// Raw fields of the first `<item>` in a feed's channel.
///
/// Values are trimmed; elements that are absent or contain only whitespace
/// are `None`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawItem {
    pub guid: Option<String>,
    pub pub_date: Option<String>,
    pub enclosure_url: Option<String>,
}

/// Elements of the first item whose text we collect.
#[derive(Clone, Copy, PartialEq, Eq)]
enum Field {
    Guid,
    PubDate,
}

/// Extracts the first `channel/item` from an RSS 2.0 document.
///
/// The whole document is still read to the end so malformed trailing
/// content, including a second root element, is an error. Only the first
/// item is captured; later items are never materialised. Within that item
/// the first `guid` and `pubDate` win.
///
/// SEC-002: quick-xml (0.37) does not expand `<!ENTITY>` declarations, so
/// hostile feeds cannot trigger external entity resolution here.
pub fn parse_first_item(bytes: &[u8]) -> Result<RawItem, FeedParseError> {
    let mut reader = Reader::from_reader(bytes);
    reader.config_mut().trim_text(true);

    let mut buf = Vec::new();
    // Element names from the root down to the current element
    let mut stack: Vec<Vec<u8>> = Vec::new();
    let mut seen_channel = false;
    let mut item: Option<RawItem> = None;
    // True while we are inside the first item
    let mut capturing = false;
    let mut field: Option<Field> = None;
    let mut text = String::new();
    let mut root_closed = false;

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(_) | Event::Empty(_)) if root_closed => {
                return Err(FeedParseError::Xml(
                    "content after root element".to_string(),
                ));
            }
            Ok(Event::Start(e)) => {
                let name = e.name().as_ref().to_vec();
                match (stack.len(), name.as_slice()) {
                    (1, b"channel") => seen_channel = true,
                    (2, b"item") if item.is_none() && stack[1] == b"channel" => {
                        item = Some(RawItem::default());
                        capturing = true;
                    }
                    (3, b"guid") if capturing => field = Some(Field::Guid),
                    (3, b"pubDate") if capturing => field = Some(Field::PubDate),
                    (3, b"enclosure") if capturing => {
                        record_enclosure(&e, &reader, item.as_mut())?;
                    }
                    _ => {}
                }
                stack.push(name);
            }
            Ok(Event::Empty(e)) => {
                root_closed = stack.is_empty();
                match (stack.len(), e.name().as_ref()) {
                    (1, b"channel") => seen_channel = true,
                    (2, b"item") if item.is_none() && stack[1] == b"channel" => {
                        item = Some(RawItem::default());
                    }
                    (3, b"enclosure") if capturing => {
                        record_enclosure(&e, &reader, item.as_mut())?;
                    }
                    _ => {}
                }
            }
            Ok(Event::Text(e)) if field.is_some() => {
                let value = e.unescape().map_err(|e| FeedParseError::Xml(e.to_string()))?;
                text.push_str(&value);
            }
            Ok(Event::CData(e)) if field.is_some() => {
                text.push_str(&String::from_utf8_lossy(&e.into_inner()));
            }
            Ok(Event::End(_)) => {
                stack.pop();
                match stack.len() {
                    3 if capturing => {
                        if let (Some(f), Some(it)) = (field.take(), item.as_mut()) {
                            let value = non_empty(std::mem::take(&mut text));
                            match f {
                                // First occurrence wins
                                Field::Guid if it.guid.is_none() => it.guid = value,
                                Field::PubDate if it.pub_date.is_none() => it.pub_date = value,
                                _ => {}
                            }
                        }
                        text.clear();
                    }
                    2 if capturing => capturing = false,
                    0 => root_closed = true,
                    _ => {}
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(FeedParseError::Xml(e.to_string())),
            _ => {}
        }
        buf.clear();
    }

    if !stack.is_empty() {
        let open = String::from_utf8_lossy(stack.last().map(Vec::as_slice).unwrap_or_default())
            .into_owned();
        return Err(FeedParseError::Xml(format!(
            "unexpected end of document inside <{}>",
            open
        )));
    }

    if !seen_channel {
        return Err(FeedParseError::MissingChannel);
    }
    item.ok_or(FeedParseError::MissingItem)
}

fn record_enclosure(
    e: &BytesStart<'_>,
    reader: &Reader<&[u8]>,
    item: Option<&mut RawItem>,
) -> Result<(), FeedParseError> {
    let Some(item) = item else {
        return Ok(());
    };
    // First enclosure wins, as with the item itself
    if item.enclosure_url.is_some() {
        return Ok(());
    }

    for attr_result in e.attributes() {
        let attr = match attr_result {
            Ok(attr) => attr,
            Err(e) => {
                tracing::warn!(error = %e, "Skipping malformed enclosure attribute");
                continue;
            }
        };
        if attr.key.as_ref() == b"url" {
            let value = attr
                .decode_and_unescape_value(reader.decoder())
                .map_err(|e| FeedParseError::Xml(e.to_string()))?;
            item.enclosure_url = non_empty(value.into_owned());
        }
    }
    Ok(())
}

fn non_empty(value: String) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}
