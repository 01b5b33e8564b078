//! Feed documents and media content generators

/// One `<item>` / `<entry>` of a generated feed
#[derive(Clone, Debug)]
pub struct FeedItem {
    /// Entry title
    pub title: String,
    /// RFC 2822 publish date
    pub pub_date: String,
    /// Enclosure URL
    pub url: String,
    /// Enclosure type
    pub mime_type: String,
    /// Declared enclosure length
    pub length: u64,
}

impl FeedItem {
    /// A video item
    pub fn video(title: &str, pub_date: &str, url: &str, length: u64) -> Self {
        Self {
            title: title.to_string(),
            pub_date: pub_date.to_string(),
            url: url.to_string(),
            mime_type: "video/mp4".to_string(),
            length,
        }
    }
}

/// Publish dates of the three-episode fixture, Berlin summer time
pub const OCT_26: &str = "Tue, 26 Oct 2010 11:53:49 +0200";
/// Second episode
pub const OCT_27: &str = "Wed, 27 Oct 2010 11:53:49 +0200";
/// Third episode
pub const OCT_28: &str = "Thu, 28 Oct 2010 11:53:49 +0200";

fn escape(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

/// Render an RSS 2.0 document
pub fn rss_feed(items: &[FeedItem]) -> String {
    let body: String = items
        .iter()
        .map(|item| {
            format!(
                r#"
    <item>
      <title>{title}</title>
      <description>Episode {title}</description>
      <pubDate>{date}</pubDate>
      <enclosure url="{url}" type="{mime}" length="{length}"/>
    </item>"#,
                title = escape(&item.title),
                date = item.pub_date,
                url = escape(&item.url),
                mime = item.mime_type,
                length = item.length,
            )
        })
        .collect();

    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<rss version="2.0">
  <channel>
    <title>Extra 3</title>
    <link>http://media.example/</link>
    <description>Test vodcast</description>{body}
  </channel>
</rss>"#
    )
}

/// Render an Atom document with the same items
///
/// Dates are converted to RFC 3339 as Atom requires.
pub fn atom_feed(items: &[FeedItem]) -> String {
    let body: String = items
        .iter()
        .enumerate()
        .map(|(index, item)| {
            let date = chrono::DateTime::parse_from_rfc2822(&item.pub_date)
                .map(|dt| dt.to_rfc3339())
                .unwrap_or_default();
            format!(
                r#"
  <entry>
    <title>{title}</title>
    <id>urn:vodcast:{index}</id>
    <updated>{date}</updated>
    <summary>Episode {title}</summary>
    <link rel="enclosure" type="{mime}" length="{length}" href="{url}"/>
  </entry>"#,
                title = escape(&item.title),
                url = escape(&item.url),
                mime = item.mime_type,
                length = item.length,
            )
        })
        .collect();

    format!(
        r#"<?xml version="1.0" encoding="utf-8"?>
<feed xmlns="http://www.w3.org/2005/Atom">
  <title>Extra 3</title>
  <id>urn:vodcast:feed</id>
  <updated>2010-10-28T11:53:49+02:00</updated>{body}
</feed>"#
    )
}

/// Deterministic pseudo media content
pub fn media_bytes(len: usize, seed: u8) -> Vec<u8> {
    (0..len)
        .map(|i| ((i as u64 * 31 + u64::from(seed)) % 251) as u8)
        .collect()
}
