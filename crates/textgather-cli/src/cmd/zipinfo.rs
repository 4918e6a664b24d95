//! Zip-info subcommand - summarize zip file lists for an item and children
//!
//! One-shot report over the item API: the item's `zip_filelist_ssim`, each
//! hasPart child's list, and per-extension counts, printed as pretty JSON
//! on stdout.

use std::collections::BTreeMap;

use anyhow::{Context, Result};
use clap::Args;
use serde::Serialize;
use serde_json::Value;

use textgather_core::{ApiClient, HttpConfig};
use textgather_repo::RepoConfig;

#[derive(Args, Debug)]
pub struct ZipInfoArgs {
    /// Item pid (e.g. bdr:833705)
    #[arg(long)]
    pub item_pid: String,
}

#[derive(Debug, Serialize)]
struct ZipReport {
    #[serde(rename = "_meta_")]
    meta: Meta,
    item_info: ItemInfo,
}

#[derive(Debug, Serialize)]
struct Meta {
    timestamp: String,
    full_item_api_url: String,
    item_pid: String,
}

#[derive(Debug, Serialize)]
struct ItemInfo {
    pid: String,
    primary_title: String,
    item_zip_info: Vec<String>,
    item_zip_filetype_summary: BTreeMap<String, u64>,
    has_parts_zip_info: Vec<ChildZipInfo>,
    overall_zip_filetype_summary: BTreeMap<String, u64>,
}

#[derive(Debug, Serialize)]
struct ChildZipInfo {
    child_pid: String,
    primary_title: String,
    child_zip_info: Vec<String>,
    child_zip_filetype_summary: BTreeMap<String, u64>,
}

/// Lowercase extension after the last dot of the filename, or "noext".
fn ext_from_path(path: &str) -> String {
    let name = path.rsplit('/').next().unwrap_or("");
    match name.rsplit_once('.') {
        Some((_, ext)) => ext.to_lowercase(),
        None => "noext".to_string(),
    }
}

fn summarize(paths: &[String]) -> BTreeMap<String, u64> {
    let mut counts = BTreeMap::new();
    for path in paths {
        *counts.entry(ext_from_path(path)).or_insert(0) += 1;
    }
    counts
}

fn zip_filelist(doc: &Value) -> Vec<String> {
    doc.get("zip_filelist_ssim")
        .and_then(Value::as_array)
        .map(|a| {
            a.iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

/// Child pids from top-level `hasPart` or `relations.hasPart`.
fn child_refs(doc: &Value) -> Vec<String> {
    let has_part = doc
        .get("hasPart")
        .or_else(|| doc.get("relations").and_then(|r| r.get("hasPart")));
    has_part
        .and_then(Value::as_array)
        .map(|entries| {
            entries
                .iter()
                .filter_map(|entry| entry.get("pid").and_then(Value::as_str))
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect()
        })
        .unwrap_or_default()
}

fn title_of(doc: &Value) -> String {
    doc.get("primary_title")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}

/// Assemble the report; children are fetched through the closure so tests
/// run against fixture documents.
fn build_report(
    item: &Value,
    config: &RepoConfig,
    mut fetch_child: impl FnMut(&str) -> Result<Value>,
) -> Result<ZipReport> {
    let pid = item
        .get("pid")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();
    let item_zip_info = zip_filelist(item);

    let mut has_parts_zip_info = Vec::new();
    for child_pid in child_refs(item) {
        let child = fetch_child(&child_pid)?;
        let child_zip_info = zip_filelist(&child);
        // children without zip data stay out of the report
        if child_zip_info.is_empty() {
            continue;
        }
        has_parts_zip_info.push(ChildZipInfo {
            child_pid,
            primary_title: title_of(&child),
            child_zip_filetype_summary: summarize(&child_zip_info),
            child_zip_info,
        });
    }

    let item_zip_filetype_summary = summarize(&item_zip_info);
    let mut overall_zip_filetype_summary = item_zip_filetype_summary.clone();
    for child in &has_parts_zip_info {
        for (ext, count) in &child.child_zip_filetype_summary {
            *overall_zip_filetype_summary.entry(ext.clone()).or_insert(0) += count;
        }
    }

    Ok(ZipReport {
        meta: Meta {
            timestamp: chrono::Local::now()
                .to_rfc3339_opts(chrono::SecondsFormat::Micros, false),
            full_item_api_url: config.item_url(&pid),
            item_pid: pid.clone(),
        },
        item_info: ItemInfo {
            pid,
            primary_title: title_of(item),
            item_zip_info,
            item_zip_filetype_summary,
            has_parts_zip_info,
            overall_zip_filetype_summary,
        },
    })
}

pub fn run(args: ZipInfoArgs, http: &HttpConfig, config: &RepoConfig) -> Result<()> {
    let client = ApiClient::new(http.clone())?;
    let item_pid = args.item_pid.trim();

    let fetch = |pid: &str| -> Result<Value> {
        let url = config.item_url(pid);
        let body = client
            .get_with_retries(&url)
            .with_context(|| format!("cannot fetch item {pid}"))?;
        serde_json::from_str(&body).with_context(|| format!("invalid item JSON from {url}"))
    };

    let item = fetch(item_pid)?;
    let report = build_report(&item, config, fetch)?;
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn ext_lowercased_or_noext() {
        assert_eq!(ext_from_path("dir/Report.PDF"), "pdf");
        assert_eq!(ext_from_path("archive/.DS_Store"), "ds_store");
        assert_eq!(ext_from_path("README"), "noext");
        assert_eq!(ext_from_path("a/b/notes.txt"), "txt");
    }

    #[test]
    fn summarize_counts_by_extension() {
        let paths = vec![
            "a/x.csv".to_string(),
            "a/y.csv".to_string(),
            "b/z.PDF".to_string(),
            "README".to_string(),
        ];
        let summary = summarize(&paths);
        assert_eq!(summary["csv"], 2);
        assert_eq!(summary["pdf"], 1);
        assert_eq!(summary["noext"], 1);
    }

    #[test]
    fn child_refs_from_both_shapes() {
        let top = json!({ "hasPart": [{ "pid": "bdr:c1" }, { "pid": "bdr:c2" }] });
        assert_eq!(child_refs(&top), vec!["bdr:c1", "bdr:c2"]);

        let nested = json!({ "relations": { "hasPart": [{ "pid": "bdr:c3" }] } });
        assert_eq!(child_refs(&nested), vec!["bdr:c3"]);

        assert!(child_refs(&json!({})).is_empty());
    }

    #[test]
    fn report_rolls_up_children() {
        let config = RepoConfig::new("https://example.org");
        let item = json!({
            "pid": "bdr:1",
            "primary_title": "Dataset",
            "zip_filelist_ssim": ["data/readme.md", "data/catalog.pdf"],
            "relations": { "hasPart": [{ "pid": "bdr:c1" }, { "pid": "bdr:c2" }] }
        });
        let report = build_report(&item, &config, |pid| {
            Ok(match pid {
                "bdr:c1" => json!({
                    "pid": "bdr:c1",
                    "primary_title": "Code",
                    "zip_filelist_ssim": ["code/a.py", "code/b.py"]
                }),
                // child without zip data
                _ => json!({ "pid": pid, "primary_title": "Empty" }),
            })
        })
        .unwrap();

        assert_eq!(report.meta.item_pid, "bdr:1");
        assert_eq!(
            report.meta.full_item_api_url,
            "https://example.org/api/items/bdr:1/"
        );
        let info = &report.item_info;
        assert_eq!(info.item_zip_filetype_summary["md"], 1);
        assert_eq!(info.item_zip_filetype_summary["pdf"], 1);
        assert_eq!(info.has_parts_zip_info.len(), 1);
        assert_eq!(info.has_parts_zip_info[0].child_pid, "bdr:c1");
        assert_eq!(info.has_parts_zip_info[0].child_zip_filetype_summary["py"], 2);
        assert_eq!(info.overall_zip_filetype_summary["py"], 2);
        assert_eq!(info.overall_zip_filetype_summary["md"], 1);
    }

    #[test]
    fn meta_key_serializes_with_underscores() {
        let config = RepoConfig::new("https://example.org");
        let report =
            build_report(&json!({ "pid": "bdr:1" }), &config, |_| Ok(json!({}))).unwrap();
        let json = serde_json::to_string(&report).unwrap();
        assert!(json.contains("\"_meta_\""));
        assert!(json.contains("\"item_info\""));
    }
}
