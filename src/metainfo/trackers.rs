use crate::bencode::Value;

/// Ordered tracker announce URLs.
///
/// Order is significant: the first entry becomes `announce`. Duplicates are
/// kept as given.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TrackerList(Vec<String>);

impl TrackerList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Splits free-form input on newlines and commas, trimming each entry and
    /// dropping the empty ones.
    ///
    /// ```
    /// use bdesk::metainfo::TrackerList;
    ///
    /// let list = TrackerList::parse("udp://a:1337/announce,\n  http://b/announce ,,");
    /// assert_eq!(list.as_slice(), ["udp://a:1337/announce", "http://b/announce"]);
    /// ```
    pub fn parse(input: &str) -> Self {
        Self(
            input
                .split(['\n', ','])
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(String::from)
                .collect(),
        )
    }

    pub fn push(&mut self, url: impl Into<String>) {
        self.0.push(url.into());
    }

    pub fn primary(&self) -> Option<&str> {
        self.0.first().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    pub fn as_slice(&self) -> &[String] {
        &self.0
    }

    /// `announce` value, present whenever there is at least one tracker.
    pub(crate) fn announce(&self) -> Option<Value> {
        self.primary().map(Value::string)
    }

    /// `announce-list` value: one single-URL tier per tracker, only when
    /// there are two or more.
    pub(crate) fn announce_list(&self) -> Option<Value> {
        if self.0.len() < 2 {
            return None;
        }
        Some(Value::List(
            self.iter()
                .map(|url| Value::List(vec![Value::string(url)]))
                .collect(),
        ))
    }
}

impl<S: Into<String>> FromIterator<S> for TrackerList {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self(iter.into_iter().map(Into::into).collect())
    }
}

impl From<Vec<String>> for TrackerList {
    fn from(urls: Vec<String>) -> Self {
        Self(urls)
    }
}

impl<'a> IntoIterator for &'a TrackerList {
    type Item = &'a String;
    type IntoIter = std::slice::Iter<'a, String>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}
