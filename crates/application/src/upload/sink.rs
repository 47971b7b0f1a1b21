//! Destination for permanent URLs.

/// A list that uploaded URLs can be written into.
///
/// Callers adapt whatever collection backs their form to this trait.
pub trait UrlSink {
    /// Adds a URL at the end.
    fn append(&mut self, url: String);

    /// Removes every URL.
    fn clear(&mut self);
}

impl UrlSink for Vec<String> {
    fn append(&mut self, url: String) {
        self.push(url);
    }

    fn clear(&mut self) {
        Vec::clear(self);
    }
}

impl UrlSink for Option<String> {
    /// Keeps the first URL only.
    fn append(&mut self, url: String) {
        if self.is_none() {
            *self = Some(url);
        }
    }

    fn clear(&mut self) {
        *self = None;
    }
}
