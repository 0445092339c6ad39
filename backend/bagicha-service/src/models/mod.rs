pub mod location;
pub mod message;
pub mod notification;
pub mod post;
pub mod user;

pub use location::{GeoPoint, Location, LocationInput};
pub use message::{ConversationSummary, Message, MessageView, NewMessage};
pub use notification::{Notification, NotificationDraft, NotificationType, NotificationView};
pub use post::{PlantAnalysis, PostRow, PostType, PostView, WeatherSnapshot};
pub use user::{PublicUser, UserRow, UserSummary};

use serde::{Deserialize, Serialize};

/// `page`/`limit` query parameters.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct PageQuery {
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

impl PageQuery {
    /// Clamp to `page >= 1` and `1 <= limit <= max_limit`.
    pub fn resolve(&self, default_limit: i64, max_limit: i64) -> (i64, i64) {
        let page = self.page.filter(|p| *p >= 1).unwrap_or(1);
        let limit = self
            .limit
            .filter(|l| *l >= 1)
            .unwrap_or(default_limit)
            .min(max_limit);
        (page, limit)
    }
}

pub fn offset(page: i64, limit: i64) -> i64 {
    (page - 1).saturating_mul(limit)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub total: i64,
    pub page: i64,
    pub limit: i64,
    pub total_pages: i64,
    pub has_more: bool,
}

impl Pagination {
    pub fn new(total: i64, page: i64, limit: i64, returned: usize) -> Self {
        let total_pages = if limit > 0 { (total + limit - 1) / limit } else { 0 };
        Self {
            total,
            page,
            limit,
            total_pages,
            has_more: offset(page, limit) + (returned as i64) < total,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_query_clamps() {
        let q = PageQuery {
            page: Some(0),
            limit: Some(500),
        };
        assert_eq!(q.resolve(20, 100), (1, 100));
        assert_eq!(PageQuery::default().resolve(20, 100), (1, 20));
    }

    #[test]
    fn test_pagination_has_more() {
        let p = Pagination::new(45, 2, 20, 20);
        assert_eq!(p.total_pages, 3);
        assert!(p.has_more);

        let p = Pagination::new(45, 3, 20, 5);
        assert!(!p.has_more);

        let p = Pagination::new(0, 1, 20, 0);
        assert_eq!(p.total_pages, 0);
        assert!(!p.has_more);
    }
}
