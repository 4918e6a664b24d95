//! Audit subcommand - find collections containing extracted-text items
//!
//! Walks the search API for items whose zip file list carries the
//! extracted-text asset, resolves each hit's collection membership (from
//! the search doc, or through its parent item when the doc lacks it), and
//! counts hits per collection. The scan checkpoints to `<output>.checkpoint`
//! after every page so a failed run resumes where it stopped.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Args;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use textgather_core::{ApiClient, HttpConfig};
use textgather_repo::RepoConfig;

#[derive(Args, Debug)]
pub struct AuditArgs {
    /// Path to write the JSON list of collections
    #[arg(short, long)]
    pub output: PathBuf,

    /// Rows per search page
    #[arg(long, default_value_t = 500)]
    pub rows: u64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct CollectionInfo {
    count: u64,
    title: Option<String>,
}

/// Scan state persisted alongside the output list.
#[derive(Debug, Default, Serialize, Deserialize)]
struct AuditState {
    next_start: u64,
    num_found: Option<u64>,
    collections: BTreeMap<String, CollectionInfo>,
    parent_collection_cache: HashMap<String, Vec<String>>,
    seen_item_pids: HashSet<String>,
}

#[derive(Debug, Serialize)]
struct AuditEntry {
    collection_pid: String,
    primary_title: String,
    full_collection_api_url: String,
    full_collection_studio_url: String,
    count_of_extracted_text_files_in_collection: u64,
}

fn checkpoint_path(output: &Path) -> PathBuf {
    let mut name = output
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    name.push_str(".checkpoint");
    output.with_file_name(name)
}

fn write_atomic(path: &Path, contents: &str) -> Result<()> {
    let tmp = path.with_extension("tmp");
    std::fs::write(&tmp, contents)
        .with_context(|| format!("failed to write {}", tmp.display()))?;
    std::fs::rename(&tmp, path)
        .with_context(|| format!("failed to replace {}", path.display()))?;
    Ok(())
}

impl AuditState {
    fn load(output: &Path) -> Result<Self> {
        let path = checkpoint_path(output);
        if !path.exists() {
            return Ok(Self::default());
        }
        let json = std::fs::read_to_string(&path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        serde_json::from_str(&json)
            .with_context(|| format!("failed to parse {}", path.display()))
    }

    /// Persist the checkpoint, then the user-facing list (both atomically)
    /// so partial results are inspectable at any time.
    fn save(&self, output: &Path, config: &RepoConfig) -> Result<()> {
        let json = serde_json::to_string_pretty(self).context("failed to serialize checkpoint")?;
        write_atomic(&checkpoint_path(output), &json)?;

        let entries: Vec<AuditEntry> = self
            .collections
            .iter()
            .map(|(pid, info)| AuditEntry {
                collection_pid: pid.clone(),
                primary_title: info.title.clone().unwrap_or_default(),
                full_collection_api_url: config.collection_url(pid),
                full_collection_studio_url: config.studio_collection_url(pid),
                count_of_extracted_text_files_in_collection: info.count,
            })
            .collect();
        let json = serde_json::to_string_pretty(&entries).context("failed to serialize list")?;
        write_atomic(output, &json)
    }
}

/// Collection pids directly on a search doc.
fn doc_collection_pids(doc: &Value) -> Vec<String> {
    string_list(doc.get("rel_is_member_of_collection_ssim"))
}

/// Parent item pids on a search doc (child objects carry these instead of
/// collection membership).
fn doc_parent_pids(doc: &Value) -> Vec<String> {
    string_list(doc.get("rel_is_part_of_ssim"))
}

fn string_list(value: Option<&Value>) -> Vec<String> {
    value
        .and_then(Value::as_array)
        .map(|a| {
            a.iter()
                .filter_map(Value::as_str)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

/// Collection pids from an item document's membership relation.
fn member_collection_pids(doc: &Value) -> Vec<String> {
    doc.get("relations")
        .and_then(|r| r.get("isMemberOfCollection"))
        .and_then(Value::as_array)
        .map(|entries| {
            entries
                .iter()
                .filter_map(|entry| {
                    entry
                        .get("pid")
                        .or_else(|| entry.get("id"))
                        .and_then(Value::as_str)
                })
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect()
        })
        .unwrap_or_default()
}

fn parent_collections(
    client: &ApiClient,
    config: &RepoConfig,
    parent_pid: &str,
    cache: &mut HashMap<String, Vec<String>>,
) -> Result<Vec<String>> {
    if let Some(pids) = cache.get(parent_pid) {
        return Ok(pids.clone());
    }
    let pids = match client.get_with_retries(&config.item_url(parent_pid)) {
        Ok(body) => {
            let doc: Value = serde_json::from_str(&body)
                .with_context(|| format!("invalid item JSON for {parent_pid}"))?;
            member_collection_pids(&doc)
        }
        Err(e) if e.is_forbidden() => Vec::new(),
        Err(e) => return Err(e.into()),
    };
    cache.insert(parent_pid.to_string(), pids.clone());
    Ok(pids)
}

/// Collection title via the collection API; any failure leaves it blank.
fn fetch_collection_title(client: &ApiClient, config: &RepoConfig, pid: &str) -> String {
    match client.get_with_retries(&config.collection_url(pid)) {
        Ok(body) => serde_json::from_str::<Value>(&body)
            .ok()
            .and_then(|doc| {
                doc.get("name")
                    .or_else(|| doc.get("primary_title"))
                    .and_then(Value::as_str)
                    .map(|s| s.trim().to_string())
            })
            .unwrap_or_default(),
        Err(e) => {
            log::debug!("no title for collection {pid}: {e}");
            String::new()
        }
    }
}

fn fetch_page(
    client: &ApiClient,
    config: &RepoConfig,
    start: u64,
    rows: u64,
) -> Result<(Vec<Value>, u64)> {
    let url = config.search_url();
    let rows_s = rows.to_string();
    let start_s = start.to_string();
    let query: [(&str, &str); 4] = [
        ("q", "zip_filelist_ssim:\"EXTRACTED_TEXT\""),
        ("rows", &rows_s),
        ("start", &start_s),
        ("fl", "pid,rel_is_member_of_collection_ssim,rel_is_part_of_ssim"),
    ];
    let body = client.get_with_query_with_retries(&url, &query)?;
    let page: Value =
        serde_json::from_str(&body).with_context(|| format!("invalid search JSON from {url}"))?;

    let response = page.get("response");
    let num_found = response
        .and_then(|r| r.get("numFound"))
        .and_then(Value::as_u64)
        .unwrap_or(0);
    let docs = response
        .and_then(|r| r.get("docs"))
        .and_then(Value::as_array)
        .cloned()
        .unwrap_or_default();
    Ok((docs, num_found))
}

pub fn run(args: AuditArgs, http: &HttpConfig, config: &RepoConfig) -> Result<()> {
    let client = ApiClient::new(http.clone())?;
    if let Some(parent) = args.output.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("cannot create {}", parent.display()))?;
        }
    }

    let mut state = AuditState::load(&args.output)?;
    if state.next_start > 0 {
        log::info!("Resuming audit at offset {}", state.next_start);
    }

    loop {
        if let Some(total) = state.num_found {
            if state.next_start >= total {
                break;
            }
        }
        let (docs, num_found) = fetch_page(&client, config, state.next_start, args.rows)?;
        state.num_found = Some(num_found);
        if docs.is_empty() {
            break;
        }

        for doc in &docs {
            let pid = doc.get("pid").and_then(Value::as_str).unwrap_or("").trim();
            if pid.is_empty() || state.seen_item_pids.contains(pid) {
                continue;
            }

            let mut coll_pids = doc_collection_pids(doc);
            if coll_pids.is_empty() {
                for parent_pid in doc_parent_pids(doc) {
                    coll_pids.extend(parent_collections(
                        &client,
                        config,
                        &parent_pid,
                        &mut state.parent_collection_cache,
                    )?);
                }
            }
            let mut seen = HashSet::new();
            coll_pids.retain(|p| seen.insert(p.clone()));

            for coll_pid in &coll_pids {
                state.collections.entry(coll_pid.clone()).or_default().count += 1;
            }
            for coll_pid in &coll_pids {
                let needs_title = state
                    .collections
                    .get(coll_pid)
                    .is_none_or(|info| info.title.is_none());
                if needs_title {
                    let title = fetch_collection_title(&client, config, coll_pid);
                    if let Some(info) = state.collections.get_mut(coll_pid) {
                        info.title = Some(title);
                    }
                }
            }
            state.seen_item_pids.insert(pid.to_string());
        }

        state.next_start += docs.len() as u64;
        state.save(&args.output, config)?;
        log::info!(
            "Processed {}/{} items, {} collections so far",
            state.next_start,
            state.num_found.unwrap_or(0),
            state.collections.len()
        );
    }

    state.save(&args.output, config)?;
    log::info!(
        "Audit complete: {} collections -> {}",
        state.collections.len(),
        args.output.display()
    );
    Ok(())
}
