use std::borrow::Cow;

use tracing::{debug, error};
use url::Url;

use crate::server::{
    error::{AppResult, Error},
    utils::url_utils::{ProxyReference, UrlResolver},
};

pub const PLAYLIST_MAGIC: &str = "#EXTM3U";

/// a single playlist line and what the rewriter has to do with it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaylistLine<'a> {
    /// empty or whitespace only
    Blank(&'a str),
    /// a tag or comment with nothing to rewrite
    Comment(&'a str),
    /// a tag carrying a quoted `URI="..."` attribute (EXT-X-KEY, EXT-X-MAP, EXT-X-MEDIA, ...),
    /// `uri_start` is the byte offset of the value inside `raw`
    DirectiveWithUri {
        raw: &'a str,
        uri: &'a str,
        uri_start: usize,
    },
    /// a segment or variant playlist reference
    MediaReference(&'a str),
}

impl<'a> PlaylistLine<'a> {
    pub fn classify(raw: &'a str) -> Self {
        let trimmed = raw.trim();

        if trimmed.is_empty() {
            return Self::Blank(raw);
        }

        if trimmed.starts_with('#') {
            return match Self::find_uri_attribute(raw) {
                Some((uri_start, uri_end)) => Self::DirectiveWithUri {
                    raw,
                    uri: &raw[uri_start..uri_end],
                    uri_start,
                },
                None => Self::Comment(raw),
            };
        }

        Self::MediaReference(raw)
    }

    /// byte range of the value of the first `URI="..."` attribute. the attribute name has to
    /// start right after the tag colon or an attribute comma, so `FOO-URI="x"` doesn't count
    fn find_uri_attribute(raw: &str) -> Option<(usize, usize)> {
        const ATTRIBUTE: &str = "URI=\"";

        raw.match_indices(ATTRIBUTE).find_map(|(idx, _)| {
            let preceding = raw[..idx].chars().next_back()?;
            if preceding != ':' && preceding != ',' && !preceding.is_whitespace() {
                return None;
            }

            let start = idx + ATTRIBUTE.len();
            let end = start + raw[start..].find('"')?;

            (end > start).then_some((start, end))
        })
    }

    pub fn rewrite(&self, video_id: &str, base: &Url) -> AppResult<Cow<'a, str>> {
        match *self {
            Self::Blank(raw) | Self::Comment(raw) => Ok(Cow::Borrowed(raw)),
            Self::DirectiveWithUri { raw, uri, uri_start } => {
                let proxied = Self::proxy_path(uri, video_id, base)?;
                let uri_end = uri_start + uri.len();

                Ok(Cow::Owned(format!(
                    "{}{}{}",
                    &raw[..uri_start],
                    proxied,
                    &raw[uri_end..]
                )))
            }
            Self::MediaReference(raw) => Ok(Cow::Owned(Self::proxy_path(raw, video_id, base)?)),
        }
    }

    fn proxy_path(reference: &str, video_id: &str, base: &Url) -> AppResult<String> {
        let absolute = UrlResolver::resolve_reference(base, reference).map_err(|e| {
            error!("Failed to resolve: {} - {}", reference, e);
            Error::MalformedPlaylist(format!("unresolvable reference {}", reference))
        })?;

        Ok(ProxyReference::new(video_id, absolute).to_path())
    }
}

/// rewrites playlists so every url in them points back at the relay
pub struct PlaylistRewriter;

impl PlaylistRewriter {
    /// true when the text opens with the `#EXTM3U` header, a leading byte order mark or blank
    /// space is tolerated
    pub fn is_playlist_text(text: &str) -> bool {
        text.trim_start_matches('\u{feff}')
            .trim_start()
            .starts_with(PLAYLIST_MAGIC)
    }

    /// line count, line order and line endings (`\n` or `\r\n`) of the input are kept exactly,
    /// tags have to stay directly above the uri they describe
    pub fn rewrite(text: &str, video_id: &str, base: &Url) -> AppResult<String> {
        let mut output = String::with_capacity(text.len() * 2);
        let mut rewritten = 0usize;

        for (idx, line) in text.split('\n').enumerate() {
            if idx > 0 {
                output.push('\n');
            }

            let (content, line_end) = match line.strip_suffix('\r') {
                Some(content) => (content, "\r"),
                None => (line, ""),
            };

            let classified = PlaylistLine::classify(content);
            if matches!(
                classified,
                PlaylistLine::DirectiveWithUri { .. } | PlaylistLine::MediaReference(_)
            ) {
                rewritten += 1;
            }

            output.push_str(&classified.rewrite(video_id, base)?);
            output.push_str(line_end);
        }

        debug!(
            "rewrote {} references for video {} against {}",
            rewritten, video_id, base
        );

        Ok(output)
    }
}
