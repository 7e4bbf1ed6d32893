//! Response header and body helpers.

use http::HeaderValue;

pub(super) fn extract_github_message(body: &str) -> Option<String> {
    let Ok(value) = serde_json::from_str::<serde_json::Value>(body) else {
        return None;
    };
    value
        .get("message")
        .and_then(serde_json::Value::as_str)
        .map(ToOwned::to_owned)
}

/// Reports whether a `Link` header advertises a `rel="next"` page.
pub(super) fn has_next_link(header_value: Option<&HeaderValue>) -> bool {
    header_value
        .and_then(|raw| raw.to_str().ok())
        .is_some_and(|links| {
            links.split(',').any(|link| {
                link.split(';')
                    .skip(1)
                    .any(|param| matches!(param.trim(), "rel=\"next\"" | "rel=next"))
            })
        })
}

#[cfg(test)]
mod tests {
    use http::HeaderValue;
    use rstest::rstest;

    use super::{extract_github_message, has_next_link};

    #[rstest]
    #[case::next_and_last(
        "<https://api.github.com/x?page=2>; rel=\"next\", <https://api.github.com/x?page=5>; rel=\"last\"",
        true
    )]
    #[case::last_only("<https://api.github.com/x?page=1>; rel=\"prev\"", false)]
    #[case::unquoted("<https://api.github.com/x?page=2>; rel=next", true)]
    fn detects_next_relation(#[case] header: &'static str, #[case] expected: bool) {
        assert_eq!(
            has_next_link(Some(&HeaderValue::from_static(header))),
            expected
        );
    }

    #[test]
    fn missing_link_header_means_last_page() {
        assert!(!has_next_link(None));
    }

    #[rstest]
    #[case::json_message("{\"message\":\"Not Found\"}", Some("Not Found"))]
    #[case::plain_text("upstream exploded", None)]
    fn extracts_message_from_error_body(#[case] body: &str, #[case] expected: Option<&str>) {
        assert_eq!(extract_github_message(body).as_deref(), expected);
    }
}
