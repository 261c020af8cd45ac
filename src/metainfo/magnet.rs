use super::error::MetainfoError;
use super::info_hash::InfoHash;
use base32::Alphabet;
use percent_encoding::{percent_decode_str, utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};

/// Bytes left unescaped in magnet parameters: ASCII alphanumerics plus the
/// marks a browser's `encodeURIComponent` keeps.
const URI_COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

/// A v1 magnet link: info hash, optional display name, tracker hints.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MagnetLink {
    pub info_hash: InfoHash,
    pub display_name: Option<String>,
    pub trackers: Vec<String>,
}

impl MagnetLink {
    pub fn new(info_hash: InfoHash) -> Self {
        Self {
            info_hash,
            display_name: None,
            trackers: Vec::new(),
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.display_name = Some(name.into());
        self
    }

    pub fn with_trackers<I, S>(mut self, trackers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.trackers.extend(trackers.into_iter().map(Into::into));
        self
    }

    /// Parses `magnet:?xt=urn:btih:<hash>&dn=<name>&tr=<url>...`.
    ///
    /// The hash may be 40 hex or 32 base32 characters. Unknown parameters
    /// are ignored; the first `xt` and `dn` win.
    pub fn parse(uri: &str) -> Result<Self, MetainfoError> {
        let query = uri
            .strip_prefix("magnet:?")
            .ok_or_else(|| MetainfoError::InvalidMagnetLink("missing magnet:? prefix".into()))?;

        let mut info_hash = None;
        let mut display_name = None;
        let mut trackers = Vec::new();

        for (key, value) in query.split('&').filter_map(|p| p.split_once('=')) {
            match key {
                "xt" if info_hash.is_none() => info_hash = Some(parse_exact_topic(value)?),
                "dn" if display_name.is_none() => display_name = Some(decode_component(value)),
                "tr" => trackers.push(decode_component(value)),
                _ => {}
            }
        }

        let info_hash = info_hash
            .ok_or_else(|| MetainfoError::InvalidMagnetLink("missing xt parameter".into()))?;

        Ok(Self {
            info_hash,
            display_name,
            trackers,
        })
    }

    /// Renders the link; the hash is lowercase hex and every parameter value
    /// is percent-encoded.
    pub fn to_uri(&self) -> String {
        let mut uri = format!("magnet:?xt=urn:btih:{}", self.info_hash.to_hex());

        if let Some(ref name) = self.display_name {
            uri.push_str("&dn=");
            uri.extend(utf8_percent_encode(name, URI_COMPONENT));
        }

        for tracker in &self.trackers {
            uri.push_str("&tr=");
            uri.extend(utf8_percent_encode(tracker, URI_COMPONENT));
        }

        uri
    }
}

impl std::fmt::Display for MagnetLink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_uri())
    }
}

impl std::str::FromStr for MagnetLink {
    type Err = MetainfoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

fn parse_exact_topic(xt: &str) -> Result<InfoHash, MetainfoError> {
    let hash = xt
        .strip_prefix("urn:btih:")
        .ok_or_else(|| MetainfoError::InvalidMagnetLink(format!("unsupported xt: {xt}")))?;

    match hash.len() {
        40 => InfoHash::from_hex(hash),
        32 => {
            let raw = base32::decode(
                Alphabet::Rfc4648 { padding: false },
                &hash.to_ascii_uppercase(),
            )
            .ok_or_else(|| MetainfoError::InvalidMagnetLink("invalid base32 info hash".into()))?;
            InfoHash::from_bytes(&raw)
        }
        n => Err(MetainfoError::InvalidMagnetLink(format!(
            "info hash must be 40 hex or 32 base32 characters, got {n}"
        ))),
    }
}

fn decode_component(value: &str) -> String {
    let value = value.replace('+', " ");
    percent_decode_str(&value).decode_utf8_lossy().into_owned()
}
