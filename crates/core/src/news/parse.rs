//! RSS 2.0 / RSS 1.0 / Atom parsing into [`NewsItem`]s.

use crate::domain::news::{NewsItem, PLACEHOLDER_IMAGE};
use chrono::DateTime;
use quick_xml::escape::{resolve_html5_entity, unescape_with};
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

#[derive(Debug, Clone, PartialEq)]
pub struct ParsedFeed {
    pub title: Option<String>,
    pub items: Vec<NewsItem>,
}

#[derive(Debug, Default)]
struct RawItem {
    title: String,
    description: String,
    link: Option<String>,
    published: Option<String>,
    media_content: Option<String>,
    media_thumbnail: Option<String>,
    enclosure: Option<String>,
}

/// Parse one feed document.
///
/// `fallback_source` labels items when the feed has no title; undated items are
/// stamped with `fetched_at_millis`. At most `max_items` items are returned.
pub fn parse_feed(
    xml: &str,
    fallback_source: &str,
    fetched_at_millis: i64,
    max_items: usize,
) -> anyhow::Result<ParsedFeed> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut saw_root = false;
    let mut feed_title: Option<String> = None;
    let mut raw_items: Vec<RawItem> = Vec::new();
    let mut current: Option<RawItem> = None;
    // Element currently collecting text, and whether it belongs to an item.
    let mut text_target: Option<Vec<u8>> = None;
    let mut text_buf = String::new();
    let mut depth_in_item = 0usize;

    loop {
        match reader.read_event()? {
            Event::Start(e) => {
                let name = e.name().as_ref().to_vec();
                if !saw_root {
                    anyhow::ensure!(
                        matches!(name.as_slice(), b"rss" | b"feed" | b"rdf:RDF" | b"RDF"),
                        "unrecognized feed root <{}>",
                        String::from_utf8_lossy(&name)
                    );
                    saw_root = true;
                    continue;
                }

                if is_item(&name) && current.is_none() {
                    current = Some(RawItem::default());
                    depth_in_item = 0;
                    continue;
                }

                if let Some(item) = current.as_mut() {
                    depth_in_item += 1;
                    apply_attributes(item, &e)?;
                    if depth_in_item == 1 && collects_text(&name) {
                        text_target = Some(name);
                        text_buf.clear();
                    }
                } else if name.as_slice() == b"title" && feed_title.is_none() {
                    text_target = Some(name);
                    text_buf.clear();
                }
            }
            Event::Empty(e) => {
                if let Some(item) = current.as_mut() {
                    apply_attributes(item, &e)?;
                }
            }
            Event::Text(t) => {
                if text_target.is_some() {
                    let text = t
                        .unescape()
                        .map(|c| c.into_owned())
                        .unwrap_or_else(|_| String::from_utf8_lossy(&t).into_owned());
                    text_buf.push_str(&text);
                }
            }
            Event::CData(c) => {
                if text_target.is_some() {
                    text_buf.push_str(&String::from_utf8_lossy(&c));
                }
            }
            Event::End(e) => {
                let name = e.name().as_ref().to_vec();

                if is_item(&name) && depth_in_item == 0 {
                    if let Some(item) = current.take() {
                        raw_items.push(item);
                        if raw_items.len() >= max_items {
                            break;
                        }
                    }
                    continue;
                }

                if text_target.as_deref() == Some(name.as_slice()) {
                    let text = std::mem::take(&mut text_buf);
                    match current.as_mut() {
                        Some(item) => assign_text(item, &name, text),
                        None => feed_title = Some(clean_text(&text)).filter(|t| !t.is_empty()),
                    }
                    text_target = None;
                }

                if current.is_some() {
                    depth_in_item = depth_in_item.saturating_sub(1);
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    anyhow::ensure!(saw_root, "document has no feed root element");

    let source = feed_title
        .clone()
        .unwrap_or_else(|| fallback_source.to_string());
    raw_items.truncate(max_items);
    let items = raw_items
        .into_iter()
        .filter_map(|raw| finish_item(raw, &source, fetched_at_millis))
        .collect();

    Ok(ParsedFeed {
        title: feed_title,
        items,
    })
}

fn is_item(name: &[u8]) -> bool {
    matches!(name, b"item" | b"entry")
}

fn collects_text(name: &[u8]) -> bool {
    matches!(
        name,
        b"title"
            | b"description"
            | b"summary"
            | b"content"
            | b"content:encoded"
            | b"link"
            | b"guid"
            | b"pubDate"
            | b"published"
            | b"updated"
            | b"dc:date"
    )
}

fn assign_text(item: &mut RawItem, name: &[u8], text: String) {
    match name {
        b"title" => item.title = text,
        b"description" | b"summary" => item.description = text,
        // Only used when no summary/description exists.
        b"content" | b"content:encoded" => {
            if item.description.trim().is_empty() {
                item.description = text;
            }
        }
        b"link" => {
            if item.link.is_none() && !text.trim().is_empty() {
                item.link = Some(text.trim().to_string());
            }
        }
        b"guid" => {
            let t = text.trim();
            if item.link.is_none() && t.starts_with("http") {
                item.link = Some(t.to_string());
            }
        }
        b"pubDate" | b"published" | b"dc:date" => item.published = Some(text),
        b"updated" => {
            if item.published.is_none() {
                item.published = Some(text);
            }
        }
        _ => {}
    }
}

fn apply_attributes(item: &mut RawItem, e: &BytesStart<'_>) -> anyhow::Result<()> {
    let name = e.name();
    let name = name.as_ref();
    match name {
        b"media:content" | b"media:thumbnail" | b"enclosure" | b"link" => {}
        _ => return Ok(()),
    }

    let mut url = None;
    let mut href = None;
    let mut rel = None;
    let mut kind = None;
    for attr in e.attributes() {
        let attr = attr?;
        let value = attr.unescape_value()?.into_owned();
        match attr.key.as_ref() {
            b"url" => url = Some(value),
            b"href" => href = Some(value),
            b"rel" => rel = Some(value),
            b"type" | b"medium" => kind = Some(value),
            _ => {}
        }
    }

    match name {
        b"media:content" => {
            let is_image = kind.as_deref().map_or(true, |k| k.starts_with("image"));
            if is_image && item.media_content.is_none() {
                item.media_content = url;
            }
        }
        b"media:thumbnail" => {
            if item.media_thumbnail.is_none() {
                item.media_thumbnail = url;
            }
        }
        b"enclosure" => {
            if item.enclosure.is_none() {
                item.enclosure = url;
            }
        }
        // Atom links carry the target in `href`.
        b"link" => match rel.as_deref() {
            None | Some("alternate") => {
                if item.link.is_none() {
                    item.link = href;
                }
            }
            Some("enclosure") => {
                if item.enclosure.is_none() {
                    item.enclosure = href;
                }
            }
            _ => {}
        },
        _ => {}
    }
    Ok(())
}

fn finish_item(raw: RawItem, source: &str, fetched_at_millis: i64) -> Option<NewsItem> {
    let link = raw.link.filter(|l| !l.is_empty())?;
    let title = clean_text(&raw.title);
    if title.is_empty() {
        return None;
    }

    let published_at_millis = raw
        .published
        .as_deref()
        .and_then(parse_date)
        .unwrap_or(fetched_at_millis);

    let image = raw
        .media_content
        .or(raw.media_thumbnail)
        .or(raw.enclosure)
        .filter(|u| !u.trim().is_empty())
        .unwrap_or_else(|| PLACEHOLDER_IMAGE.to_string());

    Some(NewsItem {
        source: source.to_string(),
        title,
        description: clean_text(&html_to_text(&raw.description)),
        domain: domain_of(&link),
        link,
        published_at_millis,
        image,
    })
}

pub fn parse_date(raw: &str) -> Option<i64> {
    let raw = raw.trim();
    DateTime::parse_from_rfc2822(raw)
        .or_else(|_| DateTime::parse_from_rfc3339(raw))
        .ok()
        .map(|dt| dt.timestamp_millis())
}

pub fn domain_of(link: &str) -> String {
    url::Url::parse(link)
        .ok()
        .and_then(|u| u.host_str().map(|h| h.trim_start_matches("www.").to_string()))
        .unwrap_or_default()
}

/// Plain text of an HTML fragment: tags dropped, entities decoded.
///
/// A `<` that does not open a tag (`P/E < 12`) is kept as text.
fn html_to_text(html: &str) -> String {
    let mut stripped = String::with_capacity(html.len());
    let mut chars = html.chars().peekable();
    while let Some(c) = chars.next() {
        let opens_tag = c == '<'
            && chars
                .peek()
                .is_some_and(|n| n.is_ascii_alphabetic() || matches!(n, '/' | '!' | '?'));
        if !opens_tag {
            stripped.push(c);
            continue;
        }
        for inner in chars.by_ref() {
            if inner == '>' {
                break;
            }
        }
        stripped.push(' ');
    }

    // Unknown entities fail the whole decode; keep the raw text then.
    match unescape_with(&stripped, resolve_html5_entity) {
        Ok(text) => text.into_owned(),
        Err(_) => stripped,
    }
}

fn clean_text(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}
