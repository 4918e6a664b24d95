//! Repository API surface: endpoint configuration, metadata parsing,
//! collection search, and the live HTTP implementation.
//!
//! Parsing (text-location resolution, child enumeration, title composition)
//! is kept as pure functions over the metadata JSON so it unit-tests against
//! fixture documents without any I/O.

pub mod collection;
pub mod config;
pub mod live;
pub mod resolve;
pub mod search;

pub use collection::collection_title;
pub use config::RepoConfig;
pub use live::{HttpRepository, RepoError, Repository};
pub use resolve::{TextLocation, extract_child_pids, primary_title, resolve_text_location, studio_url};
pub use search::{MemberDoc, SEARCH_PAGE_SIZE, parse_search_page};
