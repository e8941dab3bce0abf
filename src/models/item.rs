// src/models/item.rs

//! Feed item data structures.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Identifier of a feed item. Monotonically increasing in posting order.
pub type ItemId = i64;

/// Image extensions the classifier can decode.
const IMAGE_EXTENSIONS: &[&str] = &[".jpg", ".jpeg", ".png"];

/// Content-type filter bitset understood by the feed API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContentFlags(pub u32);

impl ContentFlags {
    pub const SFW: Self = Self(1);
    pub const NSFW: Self = Self(2);
    pub const NSFL: Self = Self(4);
    pub const NSFP: Self = Self(8);

    /// Combine two flag sets.
    pub const fn union(self, other: Self) -> Self {
        Self(self.0 | other.0)
    }

    /// Check whether every bit of `other` is set.
    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    pub const fn bits(self) -> u32 {
        self.0
    }
}

impl Default for ContentFlags {
    fn default() -> Self {
        Self::SFW
    }
}

/// A single post in the feed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
    /// Unique item id
    pub id: ItemId,

    /// Image path relative to the image host (e.g. `2024/01/01/abc.jpg`)
    pub image: String,

    /// Posting time
    #[serde(rename = "created", with = "chrono::serde::ts_seconds")]
    pub created_at: DateTime<Utc>,

    /// Content flags of this item
    #[serde(default)]
    pub flags: ContentFlags,
}

impl Item {
    /// Whether the item points to a still image the classifier can handle.
    pub fn is_image(&self) -> bool {
        let lower = self.image.to_lowercase();
        IMAGE_EXTENSIONS.iter().any(|ext| lower.ends_with(ext))
    }

    /// Whether the item was posted more than `max_age` before `now`.
    pub fn is_older_than(&self, max_age: Duration, now: DateTime<Utc>) -> bool {
        now.signed_duration_since(self.created_at) > max_age
    }
}

/// One page of items returned by the feed API, newest first.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ItemPage {
    /// No older items exist beyond this page
    #[serde(rename = "atEnd", default)]
    pub at_end: bool,

    /// No newer items exist before this page
    #[serde(rename = "atStart", default)]
    pub at_start: bool,

    #[serde(default)]
    pub items: Vec<Item>,
}

impl ItemPage {
    /// Smallest id on the page, used as the next `older` cursor.
    pub fn oldest_id(&self) -> Option<ItemId> {
        self.items.iter().map(|item| item.id).min()
    }
}

/// Query for one page of the feed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ItemsRequest {
    pub flags: ContentFlags,
    pub older: Option<ItemId>,
}

impl ItemsRequest {
    /// Request the newest page for the given flags.
    pub fn new(flags: ContentFlags) -> Self {
        Self { flags, older: None }
    }

    /// Request items strictly older than `id`.
    pub fn older_than(self, id: ItemId) -> Self {
        Self {
            older: Some(id),
            ..self
        }
    }

    /// Query-string pairs for the items endpoint.
    pub fn query_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = vec![("flags", self.flags.bits().to_string())];
        if let Some(older) = self.older {
            pairs.push(("older", older.to_string()));
        }
        pairs
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn item(id: ItemId, image: &str) -> Item {
        Item {
            id,
            image: image.to_string(),
            created_at: Utc.timestamp_opt(1_700_000_000, 0).unwrap(),
            flags: ContentFlags::SFW,
        }
    }

    #[test]
    fn test_is_image() {
        assert!(item(1, "2024/01/01/a.jpg").is_image());
        assert!(item(1, "2024/01/01/a.JPEG").is_image());
        assert!(item(1, "2024/01/01/a.png").is_image());
        assert!(!item(1, "2024/01/01/a.mp4").is_image());
        assert!(!item(1, "2024/01/01/a.gif").is_image());
    }

    #[test]
    fn test_is_older_than() {
        let item = item(1, "a.jpg");
        let now = item.created_at + Duration::minutes(90);
        assert!(item.is_older_than(Duration::hours(1), now));
        assert!(!item.is_older_than(Duration::hours(2), now));
    }

    #[test]
    fn test_page_deserialize() {
        let json = r#"{
            "atEnd": false,
            "atStart": true,
            "items": [
                {"id": 42, "image": "2024/01/01/abc.jpg", "created": 1700000000, "flags": 1, "up": 10},
                {"id": 41, "image": "2024/01/01/def.png", "created": 1699999990, "flags": 2}
            ]
        }"#;
        let page: ItemPage = serde_json::from_str(json).unwrap();
        assert!(page.at_start);
        assert!(!page.at_end);
        assert_eq!(page.items.len(), 2);
        assert_eq!(page.items[1].flags, ContentFlags::NSFW);
        assert_eq!(page.oldest_id(), Some(41));
    }

    #[test]
    fn test_request_query_pairs() {
        let request = ItemsRequest::new(ContentFlags::SFW.union(ContentFlags::NSFP)).older_than(100);
        assert_eq!(
            request.query_pairs(),
            vec![("flags", "9".to_string()), ("older", "100".to_string())]
        );
    }
}
