//! Synthetic NZB documents
//!
//! The indexer hands out a one-file NZB that carries nothing but the catalog album id and
//! its track count. The download client reads those two values back when the NZB is
//! uploaded. Both values go into `<head><meta>` entries and, for clients that rewrite the
//! head, into two leading comments (`<!-- <id> -->`, `<!-- <tracks> -->`).

/// Values recovered from an uploaded NZB
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NzbDescriptor {
    /// Catalog album id
    pub id: String,
    /// Declared track count, when present and numeric
    pub tracks: Option<u32>,
}

/// Meta type carrying the catalog album id
pub const META_ID: &str = "tidalid";
/// Meta type carrying the track count
pub const META_TRACKS: &str = "numtracks";
/// Usenet group named in the single file entry
pub const NZB_GROUP: &str = "tidlarr";

/// Keep only ASCII alphanumerics so nothing can break out of the markup
pub fn alphanumeric(value: &str) -> String {
    value.chars().filter(|c| c.is_ascii_alphanumeric()).collect()
}

/// Render the fake NZB for an album
///
/// # Examples
///
/// ```
/// use tidlarr::api::nzb::{parse_fake_nzb, render_fake_nzb};
///
/// let nzb = render_fake_nzb("42", "10");
/// let descriptor = parse_fake_nzb(&nzb).unwrap();
/// assert_eq!(descriptor.id, "42");
/// assert_eq!(descriptor.tracks, Some(10));
/// ```
pub fn render_fake_nzb(id: &str, tracks: &str) -> String {
    let id = alphanumeric(id);
    let tracks = alphanumeric(tracks);

    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<!DOCTYPE nzb PUBLIC "-//newzBin//DTD NZB 1.1//EN" "http://www.newzbin.com/DTD/nzb/nzb-1.1.dtd">
<!-- {id} -->
<!-- {tracks} -->
<nzb xmlns="http://www.newzbin.com/DTD/2003/nzb">
  <head>
    <meta type="{META_ID}">{id}</meta>
    <meta type="{META_TRACKS}">{tracks}</meta>
  </head>
  <file poster="{NZB_GROUP}@localhost" date="0" subject="{id} [1/1]">
    <groups>
      <group>{NZB_GROUP}</group>
    </groups>
    <segments>
      <segment bytes="1" number="1">{id}@{NZB_GROUP}.invalid</segment>
    </segments>
  </file>
</nzb>"#
    )
}

/// Recover the album id and track count from an uploaded NZB
///
/// Reads the `<head><meta>` entries first and falls back to the leading comments.
/// Returns `None` when no id can be found.
pub fn parse_fake_nzb(content: &str) -> Option<NzbDescriptor> {
    let (meta_id, meta_tracks) = match nntp_rs::parse_nzb(content) {
        Ok(nzb) => (
            nzb.meta.get(META_ID).map(|s| alphanumeric(s)),
            nzb.meta.get(META_TRACKS).map(|s| alphanumeric(s)),
        ),
        Err(e) => {
            tracing::debug!(error = %e, "NZB did not parse, reading comments only");
            (None, None)
        }
    };

    let mut comments = leading_comments(content).into_iter();
    let comment_id = comments.next();
    let comment_tracks = comments.next();

    let id = meta_id
        .filter(|id| !id.is_empty())
        .or(comment_id)
        .filter(|id| !id.is_empty())?;
    let tracks = meta_tracks
        .filter(|t| !t.is_empty())
        .or(comment_tracks)
        .and_then(|t| t.parse().ok());

    Some(NzbDescriptor { id, tracks })
}

/// Alphanumeric bodies of the comments that precede the `<nzb>` element
fn leading_comments(content: &str) -> Vec<String> {
    let prologue = content.split("<nzb").next().unwrap_or_default();

    let mut comments = Vec::new();
    let mut rest = prologue;
    while let Some(start) = rest.find("<!--") {
        let after = &rest[start + 4..];
        let Some(end) = after.find("-->") else {
            break;
        };
        comments.push(alphanumeric(&after[..end]));
        rest = &after[end + 3..];
    }
    comments
}
