//! Partial-update request bodies
//!
//! PUT bodies only carry the fields a client wants to change. For nullable
//! columns an explicit `null` clears the value while an absent key keeps it,
//! so those fields deserialize into `Option<Option<T>>`.

use serde::{Deserialize, Deserializer};

use wishcore::storage::groups::GroupUpdate;
use wishcore::storage::users::UserUpdate;
use wishcore::storage::wishes::{WishStatus, WishUpdate};

/// `Some(None)` for an explicit `null`, `Some(Some(v))` for a value
///
/// Use together with `#[serde(default)]` so that a missing key stays `None`.
fn nullable<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

#[derive(Debug, Default, Deserialize)]
pub struct UserPatch {
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default, deserialize_with = "nullable")]
    pub last_name: Option<Option<String>>,
    #[serde(default, deserialize_with = "nullable")]
    pub avatar_url: Option<Option<String>>,
    #[serde(default, deserialize_with = "nullable")]
    pub birthday: Option<Option<String>>,
    #[serde(default)]
    pub language_code: Option<String>,
}

impl From<UserPatch> for UserUpdate {
    fn from(patch: UserPatch) -> Self {
        UserUpdate {
            first_name: patch.first_name,
            last_name: patch.last_name,
            avatar_url: patch.avatar_url,
            birthday: patch.birthday,
            language_code: patch.language_code,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct WishPatch {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default, deserialize_with = "nullable")]
    pub description: Option<Option<String>>,
    #[serde(default, deserialize_with = "nullable")]
    pub image_url: Option<Option<String>>,
    #[serde(default, deserialize_with = "nullable")]
    pub link: Option<Option<String>>,
    #[serde(default, deserialize_with = "nullable")]
    pub price: Option<Option<f64>>,
    #[serde(default)]
    pub currency: Option<String>,
    #[serde(default)]
    pub priority: Option<i64>,
    #[serde(default, deserialize_with = "nullable")]
    pub category_id: Option<Option<i64>>,
    #[serde(default)]
    pub status: Option<WishStatus>,
    #[serde(default)]
    pub is_public: Option<bool>,
    #[serde(default, deserialize_with = "nullable")]
    pub notes: Option<Option<String>>,
    #[serde(default)]
    pub order_index: Option<i64>,
}

impl From<WishPatch> for WishUpdate {
    fn from(patch: WishPatch) -> Self {
        WishUpdate {
            title: patch.title,
            description: patch.description,
            image_url: patch.image_url,
            link: patch.link,
            price: patch.price,
            currency: patch.currency,
            priority: patch.priority,
            category_id: patch.category_id,
            status: patch.status,
            is_public: patch.is_public,
            notes: patch.notes,
            order_index: patch.order_index,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct GroupPatch {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "nullable")]
    pub description: Option<Option<String>>,
    #[serde(default, deserialize_with = "nullable")]
    pub avatar_url: Option<Option<String>>,
}

impl From<GroupPatch> for GroupUpdate {
    fn from(patch: GroupPatch) -> Self {
        GroupUpdate {
            name: patch.name,
            description: patch.description,
            avatar_url: patch.avatar_url,
        }
    }
}
