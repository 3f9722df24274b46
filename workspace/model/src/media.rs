//! URL resolution for stored media, implemented by the file storage backends.

/// Resolves storage names to URLs a client can fetch.
pub trait MediaUrls {
    /// Base URL all media is served from, e.g. `/media/`.
    fn base_url(&self) -> &str;

    /// URL of the stored file `name`.
    fn url(&self, name: &str) -> String {
        join_media_url(self.base_url(), name)
    }
}

/// Joins a media base URL and a relative name with exactly one `/`.
pub fn join_media_url(base: &str, name: &str) -> String {
    let name = name.trim_start_matches('/');
    if base.is_empty() || base.ends_with('/') {
        format!("{}{}", base, name)
    } else {
        format!("{}/{}", base, name)
    }
}
