use std::fmt;
use std::str::FromStr;
use threadsense_core::ParseError;
use url::Url;

/// Number of `/`-delimited segments in `/r/<community>/comments/<id>/<slug>/`.
pub const PERMALINK_SEGMENTS: usize = 7;

/// A thread reference parsed from a listing's inbound URL.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Permalink {
    pub id: String,
    pub community: String,
    pub slug: String,
}

impl Permalink {
    /// Parses a permalink path, or an absolute URL whose path is a permalink.
    /// Query strings and fragments are ignored, and so is the host of an
    /// absolute URL; use [`Permalink::parse_on_site`] to check it.
    pub fn parse(raw: &str) -> Result<Self, ParseError> {
        let path = if is_absolute(raw) {
            Url::parse(raw)
                .map(|url| url.path().to_string())
                .map_err(|_| ParseError::InvalidPermalink {
                    url: raw.to_string(),
                    segments: 0,
                })?
        } else {
            raw.split(['?', '#']).next().unwrap_or_default().to_string()
        };

        let segments: Vec<&str> = path.split('/').collect();
        if segments.len() != PERMALINK_SEGMENTS {
            return Err(ParseError::InvalidPermalink {
                url: raw.to_string(),
                segments: segments.len(),
            });
        }
        if segments[1] != "r" || segments[3] != "comments" {
            return Err(ParseError::UnexpectedShape {
                url: raw.to_string(),
            });
        }
        if segments[2].is_empty() {
            return Err(ParseError::EmptySegment {
                url: raw.to_string(),
                segment: "community".to_string(),
            });
        }
        if segments[4].is_empty() {
            return Err(ParseError::EmptySegment {
                url: raw.to_string(),
                segment: "id".to_string(),
            });
        }

        Ok(Self {
            id: segments[4].to_string(),
            community: segments[2].to_string(),
            slug: segments[5].to_string(),
        })
    }

    /// Like [`Permalink::parse`], but an absolute URL must point at the
    /// host of `base_url` or one of its subdomains (`old.reddit.com` for
    /// `https://www.reddit.com`). Relative paths are always on site.
    pub fn parse_on_site(raw: &str, base_url: &str) -> Result<Self, ParseError> {
        if is_absolute(raw) {
            let host = Url::parse(raw)
                .ok()
                .and_then(|url| url.host_str().map(str::to_ascii_lowercase))
                .unwrap_or_default();
            let site = Url::parse(base_url)
                .ok()
                .and_then(|url| url.host_str().map(str::to_ascii_lowercase))
                .unwrap_or_default();
            let site = site.strip_prefix("www.").unwrap_or(&site);

            let on_site = !site.is_empty()
                && (host == site || host.ends_with(&format!(".{site}")));
            if !on_site {
                return Err(ParseError::ForeignHost {
                    url: raw.to_string(),
                    host,
                });
            }
        }
        Self::parse(raw)
    }

    /// The `t3_` fullname the listing endpoint expects as its `after` cursor.
    pub fn fullname(&self) -> String {
        format!("t3_{}", self.id)
    }

    pub fn thread_json_url(&self, base_url: &str) -> String {
        format!(
            "{}/r/{}/comments/{}.json",
            base_url.trim_end_matches('/'),
            self.community,
            self.id
        )
    }
}

fn is_absolute(raw: &str) -> bool {
    raw.starts_with("http://") || raw.starts_with("https://")
}

impl FromStr for Permalink {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for Permalink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "/r/{}/comments/{}/{}/", self.community, self.id, self.slug)
    }
}
