//! Cache key trait and implementations

use std::fmt::Display;

/// Types that can extract a raw string key
///
/// The raw key is what a namespacing wrapper prefixes before handing the
/// key to a string-keyed tier. An empty raw key is rejected at that point.
pub trait CacheKey: Send + Sync {
    /// Generate the raw key string
    fn cache_key(&self) -> String;
}

impl CacheKey for String {
    fn cache_key(&self) -> String {
        self.clone()
    }
}

impl CacheKey for str {
    fn cache_key(&self) -> String {
        self.to_string()
    }
}

impl<T: CacheKey + ?Sized> CacheKey for &T {
    fn cache_key(&self) -> String {
        (**self).cache_key()
    }
}

macro_rules! display_keys {
    ($($ty:ty),*) => {
        $(
            impl CacheKey for $ty {
                fn cache_key(&self) -> String {
                    self.to_string()
                }
            }
        )*
    };
}

display_keys!(u8, u16, u32, u64, u128, usize, i8, i16, i32, i64, i128, isize, char);

/// Tuples of printable parts join them with `:`
macro_rules! tuple_keys {
    ($(($($part:ident $idx:tt),+)),+ $(,)?) => {
        $(
            impl<$($part: Display + Send + Sync),+> CacheKey for ($($part,)+) {
                fn cache_key(&self) -> String {
                    [$(self.$idx.to_string()),+].join(":")
                }
            }
        )+
    };
}

tuple_keys!((A 0), (A 0, B 1), (A 0, B 1, C 2), (A 0, B 1, C 2, D 3));

/// Composite key builder for keys assembled at runtime
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CompositeKey {
    parts: Vec<String>,
    separator: String,
}

impl CompositeKey {
    /// Create an empty key joined with `:`
    pub fn new() -> Self {
        Self {
            parts: Vec::new(),
            separator: ":".to_string(),
        }
    }

    /// Join parts with `separator` instead of `:`
    pub fn with_separator(mut self, separator: impl Into<String>) -> Self {
        self.separator = separator.into();
        self
    }

    /// Add a part to the key
    pub fn part(mut self, part: impl Display) -> Self {
        self.parts.push(part.to_string());
        self
    }

    /// Add multiple parts
    pub fn parts<I, S>(mut self, parts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Display,
    {
        self.parts.extend(parts.into_iter().map(|p| p.to_string()));
        self
    }

    /// Whether no part was added
    pub fn is_empty(&self) -> bool {
        self.parts.is_empty()
    }
}

impl Default for CompositeKey {
    fn default() -> Self {
        Self::new()
    }
}

impl CacheKey for CompositeKey {
    fn cache_key(&self) -> String {
        self.parts.join(&self.separator)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_string_key() {
        let key = "my_key".to_string();
        assert_eq!(key.cache_key(), "my_key");
        assert_eq!((&key).cache_key(), "my_key");
    }

    #[test]
    fn test_str_key() {
        let key = "my_key";
        assert_eq!(key.cache_key(), "my_key");
    }

    #[test]
    fn test_integer_key() {
        assert_eq!(42u64.cache_key(), "42");
        assert_eq!((-7i32).cache_key(), "-7");
    }

    #[test]
    fn test_tuple_key_2() {
        let key = ("user", 123);
        assert_eq!(key.cache_key(), "user:123");
    }

    #[test]
    fn test_tuple_key_3() {
        let key = ("org", 1, "user");
        assert_eq!(key.cache_key(), "org:1:user");
    }

    #[test]
    fn test_composite_key() {
        let key = CompositeKey::new().part("user").part(123);
        assert_eq!(key.cache_key(), "user:123");
    }

    #[test]
    fn test_composite_key_separator() {
        let key = CompositeKey::new()
            .with_separator("/")
            .parts(["session", "abc123"]);

        assert_eq!(key.cache_key(), "session/abc123");
    }

    #[test]
    fn test_empty_composite_key() {
        let key = CompositeKey::new();
        assert!(key.is_empty());
        assert_eq!(key.cache_key(), "");
    }
}
