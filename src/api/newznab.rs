//! Newznab wire format: capability document, RSS result feeds and release naming

use crate::config::Quality;
use crate::metadata::ALBUM_PERMALINK_BASE;
use crate::types::Album;
use crate::utils::release_year;
use rss::extension::{Extension, ExtensionMap};
use rss::{Category, Channel, Enclosure, Guid, Item};
use std::collections::BTreeMap;

/// Namespace of the `newznab:` attribute elements
pub const NEWZNAB_NS: &str = "http://www.newznab.com/DTD/2010/feeds/attributes/";

/// Content type of the fake NZB download
pub const NZB_CONTENT_TYPE: &str = "application/x-nzb";

/// Total reported with the blank-query placeholder item
pub const PLACEHOLDER_TOTAL: usize = 1234;

/// Static capability document
pub const CAPS_XML: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<caps>
    <server version="1.0" title="tidlarr"/>
    <limits max="5000" default="5000"/>
    <registration available="no" open="no"/>
    <searching>
        <search available="yes" supportedParams="q"/>
        <tv-search available="no" supportedParams=""/>
        <movie-search available="no" supportedParams=""/>
        <audio-search available="no" supportedParams=""/>
        <music-search available="yes" supportedParams="q,artist,album"/>
    </searching>
    <categories>
        <category id="3000" name="Audio">
            <subcat id="3010" name="Audio/MP3"/>
            <subcat id="3020" name="Audio/Video"/>
            <subcat id="3030" name="Audio/Audiobook"/>
            <subcat id="3040" name="Audio/Lossless"/>
            <subcat id="3050" name="Audio/Podcast"/>
        </category>
    </categories>
</caps>
"#;

/// Error document in the Newznab error format
pub fn error_xml(code: u16, description: &str) -> String {
    format!(
        "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<error code=\"{}\" description=\"{}\"/>",
        code, description
    )
}

/// Release name advertised for an album
///
/// # Examples
///
/// ```
/// # use tidlarr::api::newznab::release_name;
/// # use tidlarr::config::Quality;
/// # use tidlarr::types::Album;
/// let album = Album {
///     artist: "Bob Smith".into(),
///     title: "Groovy Tunes".into(),
///     edition: String::new(),
///     release_date: "2011-05-01".into(),
///     publisher: String::new(),
///     id: "42".into(),
///     track_count: 10,
///     channels: 2,
///     sample_rate_khz: 44,
///     bit_depth: 16,
///     duration_secs: 2400,
///     size_bytes: 0,
/// };
/// assert_eq!(
///     release_name(&album, Quality::High, "TIDLARR"),
///     "Bob Smith-Groovy Tunes-WEB-320-AAC-2011-TIDLARR"
/// );
/// assert_eq!(
///     release_name(&album, Quality::Lossless, "TIDLARR"),
///     "Bob Smith-Groovy Tunes-16BIT-44-KHZ-WEB-FLAC-2011-TIDLARR"
/// );
/// ```
pub fn release_name(album: &Album, quality: Quality, suffix: &str) -> String {
    let year = release_year(&album.release_date);
    if quality.is_lossless() {
        format!(
            "{}-{}-{}BIT-{}-KHZ-WEB-FLAC-{}-{}",
            album.artist, album.title, album.bit_depth, album.sample_rate_khz, year, suffix
        )
    } else {
        format!(
            "{}-{}-WEB-320-AAC-{}-{}",
            album.artist, album.title, year, suffix
        )
    }
}

/// RFC 2822 date for a `YYYY-MM-DD` release date, the Unix epoch when unparsable
pub fn pub_date(release_date: &str) -> String {
    let date = chrono::NaiveDate::parse_from_str(release_date, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc())
        .unwrap_or_default();
    date.format("%a, %d %b %Y %H:%M:%S %z").to_string()
}

/// Category id and display name for the configured quality
pub fn quality_category(quality: Quality) -> (&'static str, &'static str) {
    if quality.is_lossless() {
        ("3040", "Audio > Lossless")
    } else {
        ("3010", "Audio > MP3")
    }
}

/// Everything besides the album that shapes a result item
#[derive(Clone, Debug)]
pub struct FeedContext<'a> {
    /// Configured quality
    pub quality: Quality,
    /// Release group suffix
    pub release_suffix: &'a str,
    /// Externally reachable base URL, relative links when `None`
    pub public_url: Option<&'a str>,
    /// Key embedded in enclosure links
    pub api_key: &'a str,
}

impl FeedContext<'_> {
    /// Link that serves the fake NZB for an album
    pub fn enclosure_url(&self, release: &str, album: &Album) -> String {
        format!(
            "{}/indexer?t=fakenzb&name={}&tidalid={}&numtracks={}&apikey={}",
            self.public_url.unwrap_or_default(),
            urlencoding::encode(release),
            urlencoding::encode(&album.id),
            album.track_count,
            urlencoding::encode(self.api_key),
        )
    }
}

fn newznab_attrs(pairs: &[(&str, String)]) -> ExtensionMap {
    let attrs: Vec<Extension> = pairs
        .iter()
        .map(|(name, value)| {
            let mut ext = Extension::default();
            ext.set_name("newznab:attr");
            ext.attrs = BTreeMap::from([
                ("name".to_string(), name.to_string()),
                ("value".to_string(), value.clone()),
            ]);
            ext
        })
        .collect();

    let mut elements = BTreeMap::new();
    elements.insert("attr".to_string(), attrs);
    let mut map = ExtensionMap::new();
    map.insert("newznab".to_string(), elements);
    map
}

fn category(name: &str) -> Category {
    let mut category = Category::default();
    category.set_name(name);
    category
}

/// One result item for an album
pub fn album_item(album: &Album, ctx: &FeedContext<'_>) -> Item {
    let release = release_name(album, ctx.quality, ctx.release_suffix);
    let (subcat, category_name) = quality_category(ctx.quality);
    let link = format!("{}{}", ALBUM_PERMALINK_BASE, album.id);

    let mut guid = Guid::default();
    guid.set_value(format!("http://www.tidal.com/album?id={}", album.id));
    guid.set_permalink(true);

    let mut enclosure = Enclosure::default();
    enclosure.set_url(ctx.enclosure_url(&release, album));
    enclosure.set_length(album.size_bytes.to_string());
    enclosure.set_mime_type(NZB_CONTENT_TYPE);

    let mut item = Item::default();
    item.set_title(release);
    item.set_guid(guid);
    item.set_comments(format!("{}#comments", link));
    item.set_link(link);
    item.set_pub_date(pub_date(&album.release_date));
    item.set_categories(vec![category(category_name)]);
    item.set_description(format!("{} {}", album.artist, album.title));
    item.set_enclosure(enclosure);
    item.set_extensions(newznab_attrs(&[
        ("category", "3000".to_string()),
        ("category", subcat.to_string()),
        ("size", album.size_bytes.to_string()),
        ("artist", album.artist.clone()),
        ("album", album.title.clone()),
        ("publisher", album.publisher.clone()),
        ("year", release_year(&album.release_date).to_string()),
        ("tracks", album.track_count.to_string()),
    ]));
    item
}

/// Result feed: `items` is the requested page, `total` the unsliced result count
pub fn search_feed(items: Vec<Item>, offset: usize, total: usize) -> Channel {
    let mut response = Extension::default();
    response.set_name("newznab:response");
    response.attrs = BTreeMap::from([
        ("offset".to_string(), offset.to_string()),
        ("total".to_string(), total.to_string()),
    ]);

    let mut elements = BTreeMap::new();
    elements.insert("response".to_string(), vec![response]);
    let mut extensions = ExtensionMap::new();
    extensions.insert("newznab".to_string(), elements);

    let mut channel = Channel::default();
    channel.set_title("tidlarr");
    channel.set_link("http://www.tidal.com/");
    channel.set_description("tidlarr API results");
    channel.set_namespaces(BTreeMap::from([(
        "newznab".to_string(),
        NEWZNAB_NS.to_string(),
    )]));
    channel.set_extensions(extensions);
    channel.set_items(items);
    channel
}

/// The fixed sample item returned for a blank query
///
/// Indexer managers send an empty query when an indexer is added and expect at
/// least one well-formed result.
pub fn placeholder_feed() -> Channel {
    let mut guid = Guid::default();
    guid.set_value("http://servername.com/rss/viewnzb/e9c515e02346086e3a477a5436d7bc8c");
    guid.set_permalink(true);

    let nzb_url =
        "http://servername.com/rss/nzb/e9c515e02346086e3a477a5436d7bc8c&i=1&r=18cf9f0a736041465e3bd521d00a90b9";

    let mut enclosure = Enclosure::default();
    enclosure.set_url(nzb_url);
    enclosure.set_length("154653309");
    enclosure.set_mime_type(NZB_CONTENT_TYPE);

    let mut item = Item::default();
    item.set_title("A.Public.Domain.Album.Name".to_string());
    item.set_guid(guid);
    item.set_link(nzb_url.to_string());
    item.set_comments(
        "http://servername.com/rss/viewnzb/e9c515e02346086e3a477a5436d7bc8c#comments".to_string(),
    );
    item.set_pub_date("Sun, 06 Jun 2010 17:29:23 +0100".to_string());
    item.set_categories(vec![category("Music > MP3")]);
    item.set_description("Some music".to_string());
    item.set_enclosure(enclosure);
    item.set_extensions(newznab_attrs(&[
        ("category", "3000".to_string()),
        ("category", "3010".to_string()),
        ("size", "144967295".to_string()),
        ("artist", "Bob Smith".to_string()),
        ("album", "Groovy Tunes".to_string()),
        ("publisher", "Epic Music".to_string()),
        ("year", "2011".to_string()),
        ("tracks", "track one|track two|track three".to_string()),
        (
            "coverurl",
            "http://servername.com/covers/music/12345.jpg".to_string(),
        ),
        ("review", "This album is great".to_string()),
    ]));

    search_feed(vec![item], 0, PLACEHOLDER_TOTAL)
}
