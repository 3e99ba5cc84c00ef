/// API route handlers
///
/// Each submodule covers one resource group. Handlers follow the same
/// shape: derive the policy actor from the authenticated account, run the
/// coarse authorization gate, fetch whatever entity state the object-level
/// checks need, validate, persist, and record the action.
use serde::Deserialize;

pub mod accounts;
pub mod activity;
pub mod auth;
pub mod branches;
pub mod health;
pub mod plans;
pub mod tasks;

/// Deserializes a field so a present-but-null value becomes `Some(None)`
///
/// Plain `Option` cannot tell an absent field from an explicit null; the
/// double `Option` keeps that distinction, which update payloads need both
/// to support clearing nullable fields and to detect which fields a
/// payload actually touches.
pub(crate) fn deserialize_explicit_null<'de, D, T>(
    deserializer: D,
) -> Result<Option<Option<T>>, D::Error>
where
    D: serde::Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(Some(Option::<T>::deserialize(deserializer)?))
}

/// Default page size for list endpoints
const DEFAULT_PAGE_SIZE: i64 = 20;

/// Maximum page size a client may request
const MAX_PAGE_SIZE: i64 = 100;

/// Common pagination query parameters
///
/// Pagination applies after scope filtering; it can narrow a listing but
/// never widen it.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Pagination {
    /// 1-based page number
    pub page: Option<i64>,

    /// Items per page (capped at 100)
    pub page_size: Option<i64>,
}

impl Pagination {
    /// Effective page size: default 20, clamped to 1..=100
    pub fn limit(&self) -> i64 {
        self.page_size
            .unwrap_or(DEFAULT_PAGE_SIZE)
            .clamp(1, MAX_PAGE_SIZE)
    }

    /// Row offset for the effective page
    pub fn offset(&self) -> i64 {
        let page = self.page.unwrap_or(1).max(1);
        (page - 1) * self.limit()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pagination_defaults() {
        let p = Pagination::default();
        assert_eq!(p.limit(), 20);
        assert_eq!(p.offset(), 0);
    }

    #[test]
    fn test_pagination_caps_page_size() {
        let p = Pagination {
            page: Some(3),
            page_size: Some(500),
        };
        assert_eq!(p.limit(), 100);
        assert_eq!(p.offset(), 200);
    }

    #[test]
    fn test_pagination_rejects_nonpositive_values() {
        let p = Pagination {
            page: Some(0),
            page_size: Some(-5),
        };
        assert_eq!(p.limit(), 1);
        assert_eq!(p.offset(), 0);
    }
}
