use std::{
    collections::{BTreeMap, BTreeSet, HashMap},
    sync::{RwLock, RwLockReadGuard, RwLockWriteGuard},
};

use async_trait::async_trait;
use uuid::Uuid;

use super::{assemble_menus, menu_links, CateringStore, MenuHeader, MenuLink};
use crate::data_types::{
    MealAttendance, Menu, MenuItem, Notification, Rating, Request, RequestStatus, User,
    WasteConfig, WasteLog,
};
use crate::errors::{CrewMealError, Result};

/// Same tables as the SQLite schema, held in process memory.
#[derive(Default)]
struct Tables {
    // keyed by lowercase user_id
    profiles: BTreeMap<String, User>,
    credentials: HashMap<String, String>,
    sessions: HashMap<String, String>,
    menu_headers: Vec<MenuHeader>,
    menu_items: HashMap<String, MenuItem>,
    menu_links: Vec<MenuLink>,
    ratings: Vec<Rating>,
    // (lowercase user_id, item_id)
    likes: BTreeSet<(String, String)>,
    requests: Vec<Request>,
    attendance: BTreeMap<(String, String), MealAttendance>,
    notifications: Vec<Notification>,
    waste_config: Option<WasteConfig>,
    waste_logs: Vec<WasteLog>,
}

#[derive(Default)]
pub struct MemStore {
    tables: RwLock<Tables>,
}

impl MemStore {
    fn read(&self) -> RwLockReadGuard<'_, Tables> {
        // a panic while holding the lock leaves plain data behind, still usable
        self.tables.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, Tables> {
        self.tables.write().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Tables {
    fn insert_profile(&mut self, user: &User, password_hash: &str) -> Result<()> {
        let k = key(&user.user_id);
        if self.profiles.contains_key(&k) {
            return Err(CrewMealError::AlreadyExists(user.user_id.clone()));
        }
        self.profiles.insert(k.clone(), user.clone());
        self.credentials.insert(k, password_hash.to_string());
        Ok(())
    }

    fn upsert_menu(&mut self, menu: &Menu) {
        let header = MenuHeader {
            menu_id: menu.menu_id.clone(),
            date: menu.date,
            meal_type: menu.meal_type,
        };
        match self
            .menu_headers
            .iter()
            .position(|h| h.menu_id == menu.menu_id)
        {
            Some(idx) => self.menu_headers[idx] = header,
            None => self.menu_headers.push(header),
        }

        for item in menu.items.iter().chain(menu.alternatives.iter()) {
            self.menu_items.insert(item.item_id.clone(), item.clone());
        }

        self.menu_links.retain(|link| link.menu_id != menu.menu_id);
        self.menu_links.extend(menu_links(menu));
    }
}

fn key(user_id: &str) -> String {
    user_id.to_lowercase()
}

#[async_trait]
impl CateringStore for MemStore {
    async fn profile(&self, user_id: &str) -> Result<Option<User>> {
        Ok(self.read().profiles.get(&key(user_id)).cloned())
    }

    async fn profiles(&self) -> Result<Vec<User>> {
        let mut users: Vec<User> = self.read().profiles.values().cloned().collect();
        users.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(users)
    }

    async fn insert_profile(&self, user: &User, password_hash: &str) -> Result<()> {
        self.write().insert_profile(user, password_hash)
    }

    async fn provision_profile(
        &self,
        user: &User,
        password_hash: &str,
        welcome: &Notification,
    ) -> Result<()> {
        let mut tables = self.write();
        tables.insert_profile(user, password_hash)?;
        tables.notifications.push(welcome.clone());
        Ok(())
    }

    async fn update_profile(&self, user: &User) -> Result<()> {
        let mut tables = self.write();
        match tables.profiles.get_mut(&key(&user.user_id)) {
            Some(existing) => {
                *existing = user.clone();
                Ok(())
            }
            None => Err(CrewMealError::NotFound),
        }
    }

    async fn password_hash(&self, user_id: &str) -> Result<Option<String>> {
        Ok(self.read().credentials.get(&key(user_id)).cloned())
    }

    async fn set_password(&self, user_id: &str, hash: &str) -> Result<()> {
        let mut tables = self.write();
        let k = key(user_id);
        match tables.profiles.get_mut(&k) {
            Some(user) => user.password_changed = true,
            None => return Err(CrewMealError::NotFound),
        }
        tables.credentials.insert(k, hash.to_string());
        Ok(())
    }

    async fn create_session(&self, user_id: &str) -> Result<String> {
        let token = Uuid::new_v4().to_string();
        self.write()
            .sessions
            .insert(token.clone(), user_id.to_string());
        Ok(token)
    }

    async fn session_user(&self, token: &str) -> Result<Option<String>> {
        Ok(self.read().sessions.get(token).cloned())
    }

    async fn delete_session(&self, token: &str) -> Result<()> {
        self.write().sessions.remove(token);
        Ok(())
    }

    async fn menus(&self) -> Result<Vec<Menu>> {
        let tables = self.read();
        Ok(assemble_menus(
            tables.menu_headers.clone(),
            &tables.menu_links,
            &tables.menu_items,
        ))
    }

    async fn upsert_menu(&self, menu: &Menu) -> Result<()> {
        self.write().upsert_menu(menu);
        Ok(())
    }

    async fn publish_menu(&self, menu: &Menu, announcements: &[Notification]) -> Result<()> {
        let mut tables = self.write();
        tables.upsert_menu(menu);
        tables.notifications.extend_from_slice(announcements);
        Ok(())
    }

    async fn insert_rating(&self, rating: &Rating) -> Result<()> {
        self.write().ratings.push(rating.clone());
        Ok(())
    }

    async fn ratings_for_user(&self, user_id: &str) -> Result<Vec<Rating>> {
        let mut ratings: Vec<Rating> = self
            .read()
            .ratings
            .iter()
            .filter(|r| r.user_id == user_id)
            .cloned()
            .collect();
        ratings.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(ratings)
    }

    async fn liked_items(&self, user_id: &str) -> Result<Vec<String>> {
        let k = key(user_id);
        Ok(self
            .read()
            .likes
            .iter()
            .filter(|(owner, _)| *owner == k)
            .map(|(_, item_id)| item_id.clone())
            .collect())
    }

    async fn toggle_like(&self, user_id: &str, item_id: &str) -> Result<bool> {
        let mut tables = self.write();
        let like = (key(user_id), item_id.to_string());
        if tables.likes.remove(&like) {
            Ok(false)
        } else {
            tables.likes.insert(like);
            Ok(true)
        }
    }

    async fn requests(&self) -> Result<Vec<Request>> {
        let mut requests = self.read().requests.clone();
        requests.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        Ok(requests)
    }

    async fn requests_for_user(&self, user_id: &str) -> Result<Vec<Request>> {
        Ok(self
            .requests()
            .await?
            .into_iter()
            .filter(|r| r.user_id == user_id)
            .collect())
    }

    async fn request(&self, request_id: &str) -> Result<Option<Request>> {
        Ok(self
            .read()
            .requests
            .iter()
            .find(|r| r.request_id == request_id)
            .cloned())
    }

    async fn insert_request(&self, request: &Request) -> Result<()> {
        self.write().requests.push(request.clone());
        Ok(())
    }

    async fn transition_request(
        &self,
        request_id: &str,
        from: RequestStatus,
        to: RequestStatus,
        notice: &Notification,
    ) -> Result<bool> {
        let mut tables = self.write();
        match tables
            .requests
            .iter_mut()
            .find(|r| r.request_id == request_id && r.status == from)
        {
            Some(request) => request.status = to,
            None => return Ok(false),
        }
        tables.notifications.push(notice.clone());
        Ok(true)
    }

    async fn attendance(&self) -> Result<Vec<MealAttendance>> {
        let mut records: Vec<MealAttendance> = self.read().attendance.values().cloned().collect();
        records.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        Ok(records)
    }

    async fn attendance_for_user(&self, user_id: &str) -> Result<Vec<MealAttendance>> {
        Ok(self
            .read()
            .attendance
            .values()
            .filter(|a| a.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn attendance_record(
        &self,
        menu_id: &str,
        user_id: &str,
    ) -> Result<Option<MealAttendance>> {
        Ok(self
            .read()
            .attendance
            .get(&(menu_id.to_string(), user_id.to_string()))
            .cloned())
    }

    async fn upsert_attendance(&self, record: &MealAttendance) -> Result<()> {
        self.write().attendance.insert(
            (record.menu_id.clone(), record.user_id.clone()),
            record.clone(),
        );
        Ok(())
    }

    async fn remove_attendance(&self, menu_id: &str, user_id: &str) -> Result<()> {
        self.write()
            .attendance
            .remove(&(menu_id.to_string(), user_id.to_string()));
        Ok(())
    }

    async fn notifications_for_user(&self, user_id: &str) -> Result<Vec<Notification>> {
        let mut notifications: Vec<Notification> = self
            .read()
            .notifications
            .iter()
            .filter(|n| n.user_id == user_id)
            .cloned()
            .collect();
        notifications.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        Ok(notifications)
    }

    async fn insert_notification(&self, notification: &Notification) -> Result<()> {
        self.write().notifications.push(notification.clone());
        Ok(())
    }

    async fn mark_notification_read(&self, user_id: &str, notification_id: &str) -> Result<()> {
        match self
            .write()
            .notifications
            .iter_mut()
            .find(|n| n.id == notification_id && n.user_id == user_id)
        {
            Some(n) => {
                n.read = true;
                Ok(())
            }
            None => Err(CrewMealError::NotFound),
        }
    }

    async fn clear_notifications(&self, user_id: &str) -> Result<()> {
        self.write().notifications.retain(|n| n.user_id != user_id);
        Ok(())
    }

    async fn waste_config(&self) -> Result<Option<WasteConfig>> {
        Ok(self.read().waste_config)
    }

    async fn put_waste_config(&self, config: &WasteConfig) -> Result<()> {
        self.write().waste_config = Some(*config);
        Ok(())
    }

    async fn waste_logs(&self) -> Result<Vec<WasteLog>> {
        let mut logs = self.read().waste_logs.clone();
        logs.sort_by(|a, b| b.date.cmp(&a.date));
        Ok(logs)
    }

    async fn insert_waste_log(&self, log: &WasteLog, notice: &Notification) -> Result<()> {
        let mut tables = self.write();
        tables.waste_logs.push(log.clone());
        tables.notifications.push(notice.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data_types::{MealStatus, NotificationType, RequestType};
    use chrono::Utc;

    #[tokio::test]
    async fn identifiers_match_case_insensitively() {
        let store = MemStore::default();
        let user = User::new_crew("A12345678", "Ahmed Hassan", "AB");
        store.insert_profile(&user, "hash").await.unwrap();

        assert_eq!(store.profile("a12345678").await.unwrap(), Some(user.clone()));
        assert!(matches!(
            store.insert_profile(&user, "hash").await,
            Err(CrewMealError::AlreadyExists(_))
        ));
    }

    #[tokio::test]
    async fn attendance_upsert_overwrites_same_key() {
        let store = MemStore::default();
        let mut record = MealAttendance {
            menu_id: "m1".into(),
            user_id: "u1".into(),
            status: MealStatus::LatePlate,
            timestamp: Utc::now(),
        };
        store.upsert_attendance(&record).await.unwrap();
        record.status = MealStatus::Served;
        store.upsert_attendance(&record).await.unwrap();

        let all = store.attendance().await.unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].status, MealStatus::Served);

        store.remove_attendance("m1", "u1").await.unwrap();
        assert!(store.attendance_record("m1", "u1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn transition_only_from_expected_status() {
        let store = MemStore::default();
        let request = Request {
            request_id: "req_1".into(),
            user_id: "u1".into(),
            menu_id: "m2".into(),
            kind: RequestType::Substitution,
            status: RequestStatus::Pending,
            detail: "swap".into(),
            timestamp: Utc::now(),
        };
        store.insert_request(&request).await.unwrap();
        let notice = Notification::new("u1", "Request Update", "done", NotificationType::Success);

        assert!(store
            .transition_request("req_1", RequestStatus::Pending, RequestStatus::Approved, &notice)
            .await
            .unwrap());
        assert!(!store
            .transition_request("req_1", RequestStatus::Pending, RequestStatus::Denied, &notice)
            .await
            .unwrap());
        assert_eq!(
            store.request("req_1").await.unwrap().unwrap().status,
            RequestStatus::Approved
        );
        assert_eq!(store.notifications_for_user("u1").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn duplicate_provision_leaves_no_welcome() {
        let store = MemStore::default();
        let user = User::new_crew("A12345678", "Ahmed Hassan", "AB");
        let welcome = Notification::new(&user.user_id, "Welcome Aboard", "hi", NotificationType::Info);
        store.provision_profile(&user, "hash", &welcome).await.unwrap();

        let again = Notification::new(&user.user_id, "Welcome Aboard", "hi", NotificationType::Info);
        assert!(matches!(
            store.provision_profile(&user, "hash", &again).await,
            Err(CrewMealError::AlreadyExists(_))
        ));
        assert_eq!(store.notifications_for_user("A12345678").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn likes_toggle_per_user() {
        let store = MemStore::default();
        assert!(store.toggle_like("A12345678", "i4").await.unwrap());
        assert!(store.toggle_like("a12345678", "i1").await.unwrap());
        assert_eq!(store.liked_items("A12345678").await.unwrap(), vec!["i1", "i4"]);
        assert!(store.liked_items("P1234567").await.unwrap().is_empty());

        assert!(!store.toggle_like("A12345678", "i4").await.unwrap());
        assert_eq!(store.liked_items("A12345678").await.unwrap(), vec!["i1"]);
    }
}
