//! Which methods of the server make up the client's API.

use crate::methodset::Selection;

/// Shuts the server down; never forwarded to a remote peer.
pub const CLOSE_METHOD: &str = "Close";

/// Go's export rule: the name starts with an upper-case letter.
pub fn is_exported(name: &str) -> bool {
    name.chars().next().is_some_and(char::is_uppercase)
}

pub fn is_api_method(name: &str) -> bool {
    is_exported(name) && name != CLOSE_METHOD
}

/// Keeps the API methods of a method set, in their original order.
pub fn api_methods(methods: Vec<Selection>) -> Vec<Selection> {
    methods
        .into_iter()
        .filter(|m| is_api_method(&m.name))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exported_names() {
        assert!(is_exported("Get"));
        assert!(is_exported("Ünicode"));
        assert!(!is_exported("get"));
        assert!(!is_exported("_Get"));
        assert!(!is_exported(""));
    }

    #[test]
    fn close_is_not_api() {
        assert!(is_api_method("Closer"));
        assert!(is_api_method("CloseAll"));
        assert!(!is_api_method("Close"));
        assert!(!is_api_method("close"));
        assert!(!is_api_method("internal"));
    }
}
