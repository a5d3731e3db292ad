//! Persistence gateway.
//!
//! Every entity goes through [`CateringStore`]. `open_store` picks the
//! implementation once at startup: SQLite when a database path is configured,
//! otherwise the in-memory store. Both keep menus as header rows plus ordered
//! item links and rebuild them with [`assemble_menus`].

pub mod mem_store;

use std::{collections::HashMap, path::Path, sync::Arc};

use async_trait::async_trait;
use chrono::NaiveDate;

use crate::data_types::{
    MealAttendance, MealType, Menu, MenuItem, Notification, Rating, Request, RequestStatus, User,
    WasteConfig, WasteLog,
};
use crate::db_operations::SqliteStore;
use crate::errors::Result;

pub use mem_store::MemStore;

pub type SharedStore = Arc<dyn CateringStore>;

#[async_trait]
pub trait CateringStore: Send + Sync {
    /// Identifiers are matched case-insensitively.
    async fn profile(&self, user_id: &str) -> Result<Option<User>>;
    /// All profiles ordered by name.
    async fn profiles(&self) -> Result<Vec<User>>;
    /// Fails with `AlreadyExists` if the identifier is taken.
    async fn insert_profile(&self, user: &User, password_hash: &str) -> Result<()>;
    /// Fails with `NotFound` if the identifier is unknown.
    async fn update_profile(&self, user: &User) -> Result<()>;
    /// Inserts the profile and its welcome notification in one write.
    async fn provision_profile(
        &self,
        user: &User,
        password_hash: &str,
        welcome: &Notification,
    ) -> Result<()>;
    async fn password_hash(&self, user_id: &str) -> Result<Option<String>>;
    /// Stores the new hash and sets `password_changed` in one write.
    async fn set_password(&self, user_id: &str, hash: &str) -> Result<()>;

    async fn create_session(&self, user_id: &str) -> Result<String>;
    async fn session_user(&self, token: &str) -> Result<Option<String>>;
    async fn delete_session(&self, token: &str) -> Result<()>;

    /// All menus ordered by date, then meal type.
    async fn menus(&self) -> Result<Vec<Menu>>;
    /// Replaces the menu header and its item links; items are upserted by id.
    async fn upsert_menu(&self, menu: &Menu) -> Result<()>;
    /// `upsert_menu` plus the announcements, all or nothing.
    async fn publish_menu(&self, menu: &Menu, announcements: &[Notification]) -> Result<()>;

    async fn insert_rating(&self, rating: &Rating) -> Result<()>;
    async fn ratings_for_user(&self, user_id: &str) -> Result<Vec<Rating>>;

    /// Liked item ids, sorted.
    async fn liked_items(&self, user_id: &str) -> Result<Vec<String>>;
    /// Flips the like and returns whether the item is now liked.
    async fn toggle_like(&self, user_id: &str, item_id: &str) -> Result<bool>;

    /// Newest first.
    async fn requests(&self) -> Result<Vec<Request>>;
    async fn requests_for_user(&self, user_id: &str) -> Result<Vec<Request>>;
    async fn request(&self, request_id: &str) -> Result<Option<Request>>;
    async fn insert_request(&self, request: &Request) -> Result<()>;
    /// Compare-and-set on the status. Returns false if the request was not in
    /// `from`; `notice` is stored only together with a successful transition.
    async fn transition_request(
        &self,
        request_id: &str,
        from: RequestStatus,
        to: RequestStatus,
        notice: &Notification,
    ) -> Result<bool>;

    async fn attendance(&self) -> Result<Vec<MealAttendance>>;
    async fn attendance_for_user(&self, user_id: &str) -> Result<Vec<MealAttendance>>;
    async fn attendance_record(&self, menu_id: &str, user_id: &str)
        -> Result<Option<MealAttendance>>;
    /// Last write wins on (menu_id, user_id).
    async fn upsert_attendance(&self, record: &MealAttendance) -> Result<()>;
    async fn remove_attendance(&self, menu_id: &str, user_id: &str) -> Result<()>;

    /// Newest first.
    async fn notifications_for_user(&self, user_id: &str) -> Result<Vec<Notification>>;
    async fn insert_notification(&self, notification: &Notification) -> Result<()>;
    /// Fails with `NotFound` unless the notification belongs to `user_id`.
    async fn mark_notification_read(&self, user_id: &str, notification_id: &str) -> Result<()>;
    async fn clear_notifications(&self, user_id: &str) -> Result<()>;

    async fn waste_config(&self) -> Result<Option<WasteConfig>>;
    async fn put_waste_config(&self, config: &WasteConfig) -> Result<()>;
    /// Newest date first.
    async fn waste_logs(&self) -> Result<Vec<WasteLog>>;
    /// Inserts the log and the logger's notice in one write.
    async fn insert_waste_log(&self, log: &WasteLog, notice: &Notification) -> Result<()>;
}

pub fn open_store(db_path: Option<&Path>) -> Result<SharedStore> {
    match db_path {
        Some(path) => {
            log::info!("Using database {}", path.display());
            Ok(Arc::new(SqliteStore::open(path)?))
        }
        None => {
            log::warn!("No database configured, data lives in memory for this run only");
            Ok(Arc::new(MemStore::default()))
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct MenuHeader {
    pub menu_id: String,
    pub date: NaiveDate,
    pub meal_type: MealType,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct MenuLink {
    pub menu_id: String,
    pub item_id: String,
    pub is_alternative: bool,
    pub sort_order: u32,
}

pub(crate) fn menu_links(menu: &Menu) -> Vec<MenuLink> {
    let served = menu.items.iter().map(|item| (item, false));
    let alternatives = menu.alternatives.iter().map(|item| (item, true));

    served
        .chain(alternatives)
        .enumerate()
        .map(|(idx, (item, is_alternative))| MenuLink {
            menu_id: menu.menu_id.clone(),
            item_id: item.item_id.clone(),
            is_alternative,
            sort_order: idx as u32,
        })
        .collect()
}

/// Rebuilds menus from headers and links. Links to unknown items are dropped.
pub(crate) fn assemble_menus(
    headers: Vec<MenuHeader>,
    links: &[MenuLink],
    items: &HashMap<String, MenuItem>,
) -> Vec<Menu> {
    let mut by_menu: HashMap<&str, Vec<&MenuLink>> = HashMap::new();
    for link in links {
        by_menu.entry(link.menu_id.as_str()).or_default().push(link);
    }

    let mut menus: Vec<Menu> = headers
        .into_iter()
        .map(|header| {
            let mut own_links = by_menu.remove(header.menu_id.as_str()).unwrap_or_default();
            own_links.sort_by_key(|link| link.sort_order);

            let pick = |alternative: bool| -> Vec<MenuItem> {
                own_links
                    .iter()
                    .filter(|link| link.is_alternative == alternative)
                    .filter_map(|link| {
                        let found = items.get(&link.item_id).cloned();
                        if found.is_none() {
                            log::debug!(
                                "Menu {} links missing item {}",
                                link.menu_id,
                                link.item_id
                            );
                        }
                        found
                    })
                    .collect()
            };

            Menu {
                items: pick(false),
                alternatives: pick(true),
                menu_id: header.menu_id,
                date: header.date,
                meal_type: header.meal_type,
            }
        })
        .collect();

    menus.sort_by_key(|menu| (menu.date, menu.meal_type));
    menus
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dietary::tests::{item, menu};

    #[test]
    fn links_keep_order_and_mark_alternatives() {
        let mut lunch = menu("m2", vec![item("i3", "Stew", true, false), item("i4", "Rice", false, false)]);
        lunch.alternatives = vec![item("alt1", "Pan Fried Fish", false, false)];

        let links = menu_links(&lunch);
        let order: Vec<_> = links.iter().map(|l| (l.item_id.as_str(), l.is_alternative, l.sort_order)).collect();
        assert_eq!(order, vec![("i3", false, 0), ("i4", false, 1), ("alt1", true, 2)]);
    }

    #[test]
    fn missing_items_are_omitted() {
        let lunch = menu("m2", vec![item("i3", "Stew", true, false), item("i4", "Rice", false, false)]);
        let links = menu_links(&lunch);
        let items = HashMap::from([("i4".to_string(), lunch.items[1].clone())]);
        let headers = vec![MenuHeader {
            menu_id: "m2".into(),
            date: lunch.date,
            meal_type: lunch.meal_type,
        }];

        let menus = assemble_menus(headers, &links, &items);
        assert_eq!(menus.len(), 1);
        assert_eq!(menus[0].items.len(), 1);
        assert_eq!(menus[0].items[0].item_id, "i4");
        assert!(menus[0].alternatives.is_empty());
    }

    #[test]
    fn same_day_menus_follow_meal_order() {
        let mut dinner = menu("m3", vec![]);
        dinner.meal_type = MealType::Dinner;
        let mut breakfast = menu("m1", vec![]);
        breakfast.meal_type = MealType::Breakfast;
        let mut yesterday = menu("m0", vec![]);
        yesterday.meal_type = MealType::Dinner;
        yesterday.date = yesterday.date.pred_opt().unwrap();

        let headers = [&dinner, &breakfast, &yesterday]
            .into_iter()
            .map(|m| MenuHeader {
                menu_id: m.menu_id.clone(),
                date: m.date,
                meal_type: m.meal_type,
            })
            .collect();
        let menus = assemble_menus(headers, &[], &HashMap::new());
        let ids: Vec<_> = menus.iter().map(|m| m.menu_id.as_str()).collect();
        assert_eq!(ids, vec!["m0", "m1", "m3"]);
    }
}
