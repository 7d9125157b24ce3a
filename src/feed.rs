//! Feed document rendering.
//!
//! [`FeedSerializer`] is the seam between the window builder and the output
//! syntax. [`RssSerializer`] writes RSS 2.0 with `quick-xml`, which escapes
//! every text node and attribute value.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;

use crate::window::FeedItem;

/// Channel-level metadata.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelMeta {
    pub title: String,
    pub link: String,
    pub description: String,
    /// Public URL of the document itself (`atom:link rel="self"`).
    pub self_link: Option<String>,
    pub last_build: DateTime<Utc>,
}

pub trait FeedSerializer: Send + Sync {
    fn serialize(&self, channel: &ChannelMeta, items: &[FeedItem]) -> Result<String>;
    /// Content type of the produced document (diagnostics only).
    fn content_type(&self) -> &'static str;
}

/// RFC 822 date in the `GMT` spelling feed readers expect.
pub fn rfc822(dt: &DateTime<Utc>) -> String {
    dt.format("%a, %d %b %Y %H:%M:%S GMT").to_string()
}

#[derive(Debug, Clone, Copy, Default)]
pub struct RssSerializer;

const ATOM_NS: &str = "http://www.w3.org/2005/Atom";

impl RssSerializer {
    fn text_element(w: &mut Writer<Vec<u8>>, name: &str, text: &str) -> Result<()> {
        w.write_event(Event::Start(BytesStart::new(name)))?;
        w.write_event(Event::Text(BytesText::new(text)))?;
        w.write_event(Event::End(BytesEnd::new(name)))?;
        Ok(())
    }

    fn write_item(w: &mut Writer<Vec<u8>>, item: &FeedItem) -> Result<()> {
        w.write_event(Event::Start(BytesStart::new("item")))?;
        Self::text_element(w, "title", &item.title)?;
        Self::text_element(w, "link", &item.link)?;
        Self::text_element(w, "description", &item.description)?;

        let mut enclosure = BytesStart::new("enclosure");
        enclosure.push_attribute(("url", item.media_url.as_str()));
        enclosure.push_attribute(("length", "0"));
        enclosure.push_attribute(("type", "image/gif"));
        w.write_event(Event::Empty(enclosure))?;

        let mut guid = BytesStart::new("guid");
        guid.push_attribute(("isPermaLink", "false"));
        w.write_event(Event::Start(guid))?;
        w.write_event(Event::Text(BytesText::new(&item.id)))?;
        w.write_event(Event::End(BytesEnd::new("guid")))?;

        Self::text_element(w, "pubDate", &rfc822(&item.published_at))?;
        w.write_event(Event::End(BytesEnd::new("item")))?;
        Ok(())
    }
}

impl FeedSerializer for RssSerializer {
    fn serialize(&self, channel: &ChannelMeta, items: &[FeedItem]) -> Result<String> {
        let mut w = Writer::new_with_indent(Vec::new(), b' ', 2);

        w.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))
            .context("writing xml declaration")?;

        let mut rss = BytesStart::new("rss");
        rss.push_attribute(("version", "2.0"));
        rss.push_attribute(("xmlns:atom", ATOM_NS));
        w.write_event(Event::Start(rss))?;
        w.write_event(Event::Start(BytesStart::new("channel")))?;

        Self::text_element(&mut w, "title", &channel.title)?;
        Self::text_element(&mut w, "link", &channel.link)?;
        Self::text_element(&mut w, "description", &channel.description)?;
        Self::text_element(&mut w, "lastBuildDate", &rfc822(&channel.last_build))?;
        if let Some(self_link) = &channel.self_link {
            let mut atom = BytesStart::new("atom:link");
            atom.push_attribute(("href", self_link.as_str()));
            atom.push_attribute(("rel", "self"));
            atom.push_attribute(("type", "application/rss+xml"));
            w.write_event(Event::Empty(atom))?;
        }

        for item in items {
            Self::write_item(&mut w, item)
                .with_context(|| format!("writing feed item {}", item.id))?;
        }

        w.write_event(Event::End(BytesEnd::new("channel")))?;
        w.write_event(Event::End(BytesEnd::new("rss")))?;

        let mut out = String::from_utf8(w.into_inner()).context("feed is not utf-8")?;
        out.push('\n');
        Ok(out)
    }

    fn content_type(&self) -> &'static str {
        "application/rss+xml"
    }
}
