//! Search-page parsing for collection membership enumeration.

use serde_json::Value;

/// Rows requested per search page.
pub const SEARCH_PAGE_SIZE: u64 = 500;

/// One collection member as reported by the search endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemberDoc {
    pub pid: String,
    pub title: String,
}

/// Parse one search response page into member docs plus the reported total
/// match count. Docs without a pid are dropped.
pub fn parse_search_page(body: &Value) -> (Vec<MemberDoc>, u64) {
    let response = body.get("response");
    let num_found = response
        .and_then(|r| r.get("numFound"))
        .and_then(Value::as_u64)
        .unwrap_or(0);

    let docs = response
        .and_then(|r| r.get("docs"))
        .and_then(Value::as_array)
        .map(|docs| {
            docs.iter()
                .filter_map(|doc| {
                    let pid = doc.get("pid").and_then(Value::as_str)?;
                    Some(MemberDoc {
                        pid: pid.to_string(),
                        title: doc
                            .get("primary_title")
                            .and_then(Value::as_str)
                            .unwrap_or_default()
                            .to_string(),
                    })
                })
                .collect()
        })
        .unwrap_or_default();

    (docs, num_found)
}

/// Query string filtering search results to one collection's members.
pub fn membership_filter(collection_pid: &str) -> String {
    format!("rel_is_member_of_collection_ssim:\"{collection_pid}\"")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_docs_in_server_order() {
        let body = json!({
            "response": {
                "numFound": 3,
                "docs": [
                    { "pid": "bdr:1", "primary_title": "One" },
                    { "pid": "bdr:2", "primary_title": "Two" },
                    { "pid": "bdr:3" }
                ]
            }
        });
        let (docs, num_found) = parse_search_page(&body);
        assert_eq!(num_found, 3);
        assert_eq!(
            docs,
            vec![
                MemberDoc { pid: "bdr:1".into(), title: "One".into() },
                MemberDoc { pid: "bdr:2".into(), title: "Two".into() },
                MemberDoc { pid: "bdr:3".into(), title: String::new() },
            ]
        );
    }

    #[test]
    fn drops_docs_without_pid() {
        let body = json!({
            "response": {
                "numFound": 2,
                "docs": [{ "primary_title": "orphan" }, { "pid": "bdr:2" }]
            }
        });
        let (docs, _) = parse_search_page(&body);
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].pid, "bdr:2");
    }

    #[test]
    fn empty_response_yields_empty_page() {
        let (docs, num_found) = parse_search_page(&json!({}));
        assert!(docs.is_empty());
        assert_eq!(num_found, 0);
    }

    #[test]
    fn membership_filter_quotes_pid() {
        assert_eq!(
            membership_filter("bdr:c9fzffs9"),
            "rel_is_member_of_collection_ssim:\"bdr:c9fzffs9\""
        );
    }
}
