use std::fmt;

/// HTTP request methods
///
/// Tokens are case-insensitive on the way in and canonical (uppercase) on
/// the way out. Anything outside the standard set is kept as an
/// [`Method::Extension`] so it can still be registered and compared; its
/// [`ExtensionMethod`] token can only be built through [`Method::parse`],
/// which keeps it uppercase.
///
/// # Examples
///
/// ```
/// use jsweb_router::Method;
///
/// assert_eq!(Method::from("get"), Method::Get);
/// assert_eq!(Method::from("PURGE").as_str(), "PURGE");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Method {
    Get,
    Head,
    Post,
    Put,
    Patch,
    Delete,
    Options,
    Extension(ExtensionMethod),
}

/// Uppercase token of a non-standard method such as `PURGE`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ExtensionMethod(String);

impl ExtensionMethod {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Method {
    /// Parse a method token
    pub fn parse(token: &str) -> Self {
        match token.trim().to_ascii_uppercase().as_str() {
            "GET" => Method::Get,
            "HEAD" => Method::Head,
            "POST" => Method::Post,
            "PUT" => Method::Put,
            "PATCH" => Method::Patch,
            "DELETE" => Method::Delete,
            "OPTIONS" => Method::Options,
            other => Method::Extension(ExtensionMethod(other.to_string())),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Method::Get => "GET",
            Method::Head => "HEAD",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Patch => "PATCH",
            Method::Delete => "DELETE",
            Method::Options => "OPTIONS",
            Method::Extension(token) => token.as_str(),
        }
    }

    /// Check if method matches a raw token
    pub fn matches(&self, token: &str) -> bool {
        self.as_str().eq_ignore_ascii_case(token.trim())
    }
}

impl From<&str> for Method {
    fn from(token: &str) -> Self {
        Method::parse(token)
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Merge `extra` into `into`, keeping first-seen order and dropping repeats
pub(crate) fn merge_methods(into: &mut Vec<Method>, extra: &[Method]) {
    for method in extra {
        if !into.contains(method) {
            into.push(method.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_method_parsing() {
        assert_eq!(Method::parse("GET"), Method::Get);
        assert_eq!(Method::parse("post"), Method::Post);
        assert_eq!(Method::parse(" Delete "), Method::Delete);
        assert_eq!(Method::parse("purge"), Method::parse("PURGE"));
        assert_eq!(Method::parse("purge").as_str(), "PURGE");
    }

    #[test]
    fn test_extension_token_is_uppercase() {
        match Method::from("Purge") {
            Method::Extension(token) => assert_eq!(token.as_str(), "PURGE"),
            other => panic!("expected an extension method, got {:?}", other),
        }
        assert_ne!(Method::parse("purge"), Method::parse("link"));
    }

    #[test]
    fn test_method_matching() {
        assert!(Method::Get.matches("get"));
        assert!(!Method::Get.matches("POST"));
        assert!(Method::parse("purge").matches("PURGE"));
    }

    #[test]
    fn test_merge_methods_keeps_order() {
        let mut methods = vec![Method::Get];
        merge_methods(&mut methods, &[Method::Post, Method::Get, Method::Put]);
        assert_eq!(methods, vec![Method::Get, Method::Post, Method::Put]);
    }
}
