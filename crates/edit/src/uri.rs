use std::path::{Path, PathBuf};

use url::Url;

use crate::error::{Error, Result};

/// Convert a filesystem path to a `file://` URI. Never dereferences
/// symlinks — the URI names exactly the path given, link or not.
pub fn path_to_uri(path: &Path) -> Result<Url> {
    Url::from_file_path(path).map_err(|()| Error::UnsupportedUri {
        uri: path.display().to_string(),
    })
}

/// Convert a `file://` URI back to a filesystem path.
pub fn uri_to_path(uri: &Url) -> Result<PathBuf> {
    if uri.scheme() != "file" {
        return Err(Error::UnsupportedUri {
            uri: uri.to_string(),
        });
    }
    uri.to_file_path().map_err(|()| Error::UnsupportedUri {
        uri: uri.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_an_absolute_path() {
        let path = PathBuf::from("/tmp/some dir/a.rs");
        let uri = path_to_uri(&path).unwrap();
        assert_eq!(uri.scheme(), "file");
        let back = uri_to_path(&uri).unwrap();
        assert_eq!(back, path);
    }

    #[test]
    fn rejects_non_file_schemes() {
        let uri = Url::parse("https://example.com/a.rs").unwrap();
        assert!(uri_to_path(&uri).is_err());
    }
}
