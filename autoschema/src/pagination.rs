//! Cursor-based pagination
//!
//! Implements the Relay Connection window over an offset-addressed result
//! set. Cursors are opaque base64 strings of `arrayconnection:<offset>`,
//! the same format graphql-relay clients already expect.

use base64::{Engine as _, engine::general_purpose::STANDARD as BASE64};

use crate::error::{Error, Result};

const CURSOR_PREFIX: &str = "arrayconnection:";

/// Information about pagination in a connection
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PageInfo {
    /// When paginating forwards, are there more items?
    pub has_next_page: bool,
    /// When paginating backwards, are there more items?
    pub has_previous_page: bool,
    /// Cursor of the first item in this page
    pub start_cursor: Option<String>,
    /// Cursor of the last item in this page
    pub end_cursor: Option<String>,
}

/// Relay connection arguments as received from a query
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConnectionArgs {
    pub first: Option<i64>,
    pub last: Option<i64>,
    pub before: Option<String>,
    pub after: Option<String>,
}

/// The slice of the result set a connection resolves to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Window {
    pub offset: i64,
    pub limit: i64,
    pub has_previous_page: bool,
    pub has_next_page: bool,
}

/// Encode an offset as a cursor string
pub fn encode_cursor(offset: i64) -> String {
    BASE64.encode(format!("{}{}", CURSOR_PREFIX, offset))
}

/// Decode a cursor string to an offset
pub fn decode_cursor(cursor: &str) -> Result<i64> {
    let invalid = || Error::InvalidCursor(cursor.to_string());

    let decoded = BASE64.decode(cursor).map_err(|_| invalid())?;
    let s = String::from_utf8(decoded).map_err(|_| invalid())?;

    s.strip_prefix(CURSOR_PREFIX)
        .and_then(|offset| offset.parse().ok())
        .ok_or_else(invalid)
}

fn non_negative(name: &str, value: Option<i64>) -> Result<Option<i64>> {
    match value {
        Some(v) if v < 0 => Err(Error::InvalidArgument(format!(
            "Argument '{}' must be a non-negative integer.",
            name
        ))),
        other => Ok(other),
    }
}

impl ConnectionArgs {
    /// Compute the window for a result set of `total` items.
    ///
    /// Unreadable cursors fall back to the edge of the result set, as
    /// graphql-relay does. With `max_page_size`, an unbounded request is
    /// treated as `first: max_page_size` and larger pages are capped.
    pub fn window(&self, total: i64, max_page_size: Option<i64>) -> Result<Window> {
        let mut first = non_negative("first", self.first)?;
        let mut last = non_negative("last", self.last)?;

        if let Some(max) = max_page_size {
            if first.is_none() && last.is_none() {
                first = Some(max);
            }
            first = first.map(|f| f.min(max));
            last = last.map(|l| l.min(max));
        }

        let before = self
            .before
            .as_deref()
            .and_then(|c| decode_cursor(c).ok())
            .map(|o| o.clamp(0, total));
        let after = self
            .after
            .as_deref()
            .and_then(|c| decode_cursor(c).ok())
            .map(|o| o.clamp(-1, total));

        let mut start = after.map(|a| a + 1).unwrap_or(0);
        let mut end = before.unwrap_or(total).min(total);

        if let Some(first) = first {
            end = end.min(start.saturating_add(first));
        }
        if let Some(last) = last {
            start = start.max(end.saturating_sub(last));
        }

        let lower_bound = after.map(|a| a + 1).unwrap_or(0);
        let upper_bound = before.unwrap_or(total);

        Ok(Window {
            offset: start,
            limit: (end - start).max(0),
            has_previous_page: last.is_some() && start > lower_bound,
            has_next_page: first.is_some() && end < upper_bound,
        })
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    fn args(first: Option<i64>, last: Option<i64>) -> ConnectionArgs {
        ConnectionArgs {
            first,
            last,
            ..Default::default()
        }
    }

    #[test]
    fn test_cursor_roundtrip() {
        for offset in [0, 1, 100, 999999] {
            let cursor = encode_cursor(offset);
            assert_eq!(decode_cursor(&cursor).unwrap(), offset);
        }
        assert_eq!(encode_cursor(0), "YXJyYXljb25uZWN0aW9uOjA=");
    }

    #[test]
    fn test_invalid_cursor() {
        assert_matches!(decode_cursor("not base64!"), Err(Error::InvalidCursor(_)));
        let wrong_prefix = BASE64.encode("cursor:1");
        assert_matches!(decode_cursor(&wrong_prefix), Err(Error::InvalidCursor(_)));
    }

    #[test]
    fn test_window_default_uses_max_page_size() {
        let window = ConnectionArgs::default().window(250, Some(100)).unwrap();
        assert_eq!(window.offset, 0);
        assert_eq!(window.limit, 100);
        assert!(window.has_next_page);
        assert!(!window.has_previous_page);
    }

    #[test]
    fn test_window_without_limit_returns_everything() {
        let window = ConnectionArgs::default().window(250, None).unwrap();
        assert_eq!(window.limit, 250);
        assert!(!window.has_next_page);
    }

    #[test]
    fn test_window_first_after() {
        let args = ConnectionArgs {
            first: Some(2),
            after: Some(encode_cursor(1)),
            ..Default::default()
        };
        let window = args.window(5, None).unwrap();
        assert_eq!(window.offset, 2);
        assert_eq!(window.limit, 2);
        assert!(window.has_next_page);
        // Only `last` reports previous pages
        assert!(!window.has_previous_page);
    }

    #[test]
    fn test_window_last_before() {
        let args = ConnectionArgs {
            last: Some(2),
            before: Some(encode_cursor(4)),
            ..Default::default()
        };
        let window = args.window(5, None).unwrap();
        assert_eq!(window.offset, 2);
        assert_eq!(window.limit, 2);
        assert!(window.has_previous_page);
        assert!(!window.has_next_page);
    }

    #[test]
    fn test_window_last_only() {
        let window = args(None, Some(3)).window(10, None).unwrap();
        assert_eq!(window.offset, 7);
        assert_eq!(window.limit, 3);
    }

    #[test]
    fn test_window_caps_first() {
        let window = args(Some(1000), None).window(500, Some(100)).unwrap();
        assert_eq!(window.limit, 100);
    }

    #[test]
    fn test_window_past_the_end_is_empty() {
        let args = ConnectionArgs {
            first: Some(5),
            after: Some(encode_cursor(9)),
            ..Default::default()
        };
        let window = args.window(10, None).unwrap();
        assert_eq!(window.limit, 0);
        assert!(!window.has_next_page);
    }

    #[test]
    fn test_negative_first_is_rejected() {
        assert_matches!(
            args(Some(-1), None).window(10, None),
            Err(Error::InvalidArgument(_))
        );
    }

    #[test]
    fn test_window_huge_first_and_last() {
        let after_first = ConnectionArgs {
            first: Some(i64::MAX),
            after: Some(encode_cursor(0)),
            ..Default::default()
        };
        let window = after_first.window(5, None).unwrap();
        assert_eq!(window.offset, 1);
        assert_eq!(window.limit, 4);
        assert!(!window.has_next_page);

        let window = args(None, Some(i64::MAX)).window(5, None).unwrap();
        assert_eq!(window.offset, 0);
        assert_eq!(window.limit, 5);
        assert!(!window.has_previous_page);
    }
}
