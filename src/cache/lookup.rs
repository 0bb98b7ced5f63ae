//! Three-way cache lookup result.

use crate::cache::CacheError;

/// Outcome of a cache read.
///
/// Callers pick how to treat `TransportError`; on request paths it is
/// handled like `Miss`, but it stays visible to tests and logs.
#[derive(Debug)]
pub enum CacheLookup<T> {
    Hit(T),
    Miss,
    TransportError(CacheError),
}

impl<T> CacheLookup<T> {
    pub fn is_hit(&self) -> bool {
        matches!(self, CacheLookup::Hit(_))
    }

    pub fn is_miss(&self) -> bool {
        matches!(self, CacheLookup::Miss)
    }

    pub fn is_transport_error(&self) -> bool {
        matches!(self, CacheLookup::TransportError(_))
    }

    /// The cached value, treating a transport error as a miss.
    pub fn hit(self) -> Option<T> {
        match self {
            CacheLookup::Hit(value) => Some(value),
            CacheLookup::Miss | CacheLookup::TransportError(_) => None,
        }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> CacheLookup<U> {
        match self {
            CacheLookup::Hit(value) => CacheLookup::Hit(f(value)),
            CacheLookup::Miss => CacheLookup::Miss,
            CacheLookup::TransportError(e) => CacheLookup::TransportError(e),
        }
    }
}

impl<T> From<Result<Option<T>, CacheError>> for CacheLookup<T> {
    fn from(result: Result<Option<T>, CacheError>) -> Self {
        match result {
            Ok(Some(value)) => CacheLookup::Hit(value),
            Ok(None) => CacheLookup::Miss,
            Err(e) => CacheLookup::TransportError(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_result() {
        assert!(CacheLookup::from(Ok(Some(1))).is_hit());
        assert!(CacheLookup::<i32>::from(Ok(None)).is_miss());
        assert!(CacheLookup::<i32>::from(Err(CacheError::NotInitialized)).is_transport_error());
    }

    #[test]
    fn test_transport_error_reads_as_miss() {
        let lookup: CacheLookup<i32> =
            CacheLookup::TransportError(CacheError::Connection("refused".into()));
        assert_eq!(lookup.hit(), None);
        assert_eq!(CacheLookup::Hit(3).map(|v| v * 2).hit(), Some(6));
    }
}
