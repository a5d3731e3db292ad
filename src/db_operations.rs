use std::{
    collections::HashMap,
    path::Path,
    sync::{Mutex, MutexGuard},
};

use async_trait::async_trait;
use chrono::Utc;
use rusqlite::{
    params,
    types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, Type, ValueRef},
    Connection, ErrorCode, OptionalExtension, Row, Transaction,
};
use uuid::Uuid;

use crate::{
    constants::WASTE_CONFIG_ID,
    data_backend::{assemble_menus, menu_links, CateringStore, MenuHeader, MenuLink},
    data_types::{
        Category, MealAttendance, MealStatus, MealType, Menu, MenuItem, Mood, Notification,
        NotificationType, Rating, Request, RequestStatus, RequestType, Role, User, WasteConfig,
        WasteLog,
    },
    errors::{CrewMealError, Result},
};

// enums are stored as their lowercase wire names
macro_rules! text_column {
    ($($ty:ty),* $(,)?) => {
        $(
            impl ToSql for $ty {
                fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
                    Ok(self.as_str().into())
                }
            }

            impl FromSql for $ty {
                fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
                    let raw = value.as_str()?;
                    <$ty>::parse(raw).ok_or_else(|| {
                        FromSqlError::Other(
                            format!("unexpected {} '{}'", stringify!($ty), raw).into(),
                        )
                    })
                }
            }
        )*
    };
}

text_column!(
    Role,
    MealType,
    Category,
    Mood,
    RequestType,
    RequestStatus,
    MealStatus,
    NotificationType,
);

const SCHEMA: [&str; 12] = [
    "create table if not exists profiles (
        user_id text not null primary key collate nocase,
        name text not null,
        rank text not null,
        role text not null,
        onboarding_completed integer not null default 0,
        password_changed integer not null default 0,
        dietary_profile text not null,
        password_hash text not null,
        created_at text not null
    )",
    "create table if not exists sessions (
        token text not null primary key,
        user_id text not null collate nocase,
        created_at text not null,
        foreign key (user_id) references profiles(user_id)
    )",
    "create table if not exists menus (
        menu_id text not null primary key,
        date text not null,
        meal_type text not null
    )",
    "create table if not exists menu_items (
        item_id text not null primary key,
        name text not null,
        category text not null,
        estimated_calories integer not null,
        dietary_flags text not null,
        image_url text
    )",
    "create table if not exists menu_menu_items (
        menu_id text not null,
        item_id text not null,
        is_alternative integer not null,
        sort_order integer not null,
        foreign key (menu_id) references menus(menu_id)
    )",
    "create table if not exists ratings (
        rating_id text not null primary key,
        user_id text not null,
        item_id text not null,
        menu_id text not null,
        stars integer not null,
        emoji text not null,
        comment text not null,
        created_at text not null
    )",
    "create table if not exists liked_items (
        user_id text not null collate nocase,
        item_id text not null,
        created_at text not null,
        primary key (user_id, item_id)
    )",
    "create table if not exists requests (
        request_id text not null primary key,
        user_id text not null,
        menu_id text not null,
        type text not null,
        status text not null,
        detail text not null,
        created_at text not null
    )",
    "create table if not exists meal_attendance (
        menu_id text not null,
        user_id text not null,
        status text not null,
        created_at text not null,
        primary key (menu_id, user_id)
    )",
    "create table if not exists notifications (
        id text not null primary key,
        user_id text not null,
        title text not null,
        message text not null,
        type text not null,
        read integer not null default 0,
        created_at text not null
    )",
    "create table if not exists waste_config (
        id text not null primary key,
        container_volume_m3 real not null,
        container_weight_kg real not null,
        updated_at text not null
    )",
    "create table if not exists waste_logs (
        log_id text not null primary key,
        date text not null,
        container_count integer not null,
        total_weight_kg real not null,
        total_volume_m3 real not null,
        logged_by text not null,
        created_at text not null
    )",
];

pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    pub fn open(path: impl AsRef<Path>) -> Result<SqliteStore> {
        SqliteStore::init(Connection::open(path)?)
    }

    pub fn open_in_memory() -> Result<SqliteStore> {
        SqliteStore::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<SqliteStore> {
        check_or_create_db_tables(&conn)?;
        Ok(SqliteStore {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

pub fn check_or_create_db_tables(conn: &Connection) -> rusqlite::Result<()> {
    for table in SCHEMA {
        conn.prepare(table)?.execute([])?;
    }
    Ok(())
}

fn json_column<T: serde::de::DeserializeOwned>(row: &Row, idx: usize) -> rusqlite::Result<T> {
    let raw: String = row.get(idx)?;
    serde_json::from_str(&raw)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

const PROFILE_COLUMNS: &str =
    "user_id, name, rank, role, onboarding_completed, password_changed, dietary_profile";

fn profile_from_row(row: &Row) -> rusqlite::Result<User> {
    Ok(User {
        user_id: row.get(0)?,
        name: row.get(1)?,
        rank: row.get(2)?,
        role: row.get(3)?,
        onboarding_completed: row.get(4)?,
        password_changed: row.get(5)?,
        dietary_profile: json_column(row, 6)?,
    })
}

const REQUEST_COLUMNS: &str = "request_id, user_id, menu_id, type, status, detail, created_at";

fn request_from_row(row: &Row) -> rusqlite::Result<Request> {
    Ok(Request {
        request_id: row.get(0)?,
        user_id: row.get(1)?,
        menu_id: row.get(2)?,
        kind: row.get(3)?,
        status: row.get(4)?,
        detail: row.get(5)?,
        timestamp: row.get(6)?,
    })
}

fn attendance_from_row(row: &Row) -> rusqlite::Result<MealAttendance> {
    Ok(MealAttendance {
        menu_id: row.get(0)?,
        user_id: row.get(1)?,
        status: row.get(2)?,
        timestamp: row.get(3)?,
    })
}

fn notification_from_row(row: &Row) -> rusqlite::Result<Notification> {
    Ok(Notification {
        id: row.get(0)?,
        user_id: row.get(1)?,
        title: row.get(2)?,
        message: row.get(3)?,
        kind: row.get(4)?,
        read: row.get(5)?,
        timestamp: row.get(6)?,
    })
}

fn insert_profile_row(conn: &Connection, user: &User, password_hash: &str) -> Result<()> {
    let inserted = conn
        .prepare_cached(
            "INSERT INTO profiles (user_id, name, rank, role, onboarding_completed,
                password_changed, dietary_profile, password_hash, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
        )?
        .execute(params![
            user.user_id,
            user.name,
            user.rank,
            user.role,
            user.onboarding_completed,
            user.password_changed,
            serde_json::to_string(&user.dietary_profile)?,
            password_hash,
            Utc::now(),
        ]);

    match inserted {
        Ok(_) => Ok(()),
        Err(rusqlite::Error::SqliteFailure(e, _)) if e.code == ErrorCode::ConstraintViolation => {
            Err(CrewMealError::AlreadyExists(user.user_id.clone()))
        }
        Err(e) => Err(e.into()),
    }
}

fn insert_notification_row(conn: &Connection, notification: &Notification) -> Result<()> {
    conn.prepare_cached(
        "INSERT INTO notifications (id, user_id, title, message, type, read, created_at)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
    )?
    .execute(params![
        notification.id,
        notification.user_id,
        notification.title,
        notification.message,
        notification.kind,
        notification.read,
        notification.timestamp,
    ])?;
    Ok(())
}

fn write_menu(tx: &Transaction, menu: &Menu) -> Result<()> {
    tx.prepare_cached(
        "INSERT INTO menus (menu_id, date, meal_type) VALUES (?1, ?2, ?3)
        ON CONFLICT(menu_id) DO UPDATE SET date = excluded.date, meal_type = excluded.meal_type",
    )?
    .execute(params![menu.menu_id, menu.date, menu.meal_type])?;

    let mut item_stmt = tx.prepare_cached(
        "REPLACE INTO menu_items
            (item_id, name, category, estimated_calories, dietary_flags, image_url)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
    )?;
    for item in menu.items.iter().chain(menu.alternatives.iter()) {
        item_stmt.execute(params![
            item.item_id,
            item.name,
            item.category,
            item.estimated_calories,
            serde_json::to_string(&item.dietary_flags)?,
            item.image_url,
        ])?;
    }

    tx.prepare_cached("DELETE FROM menu_menu_items WHERE menu_id = ?1")?
        .execute(params![menu.menu_id])?;

    let mut link_stmt = tx.prepare_cached(
        "INSERT INTO menu_menu_items (menu_id, item_id, is_alternative, sort_order)
        VALUES (?1, ?2, ?3, ?4)",
    )?;
    for link in menu_links(menu) {
        link_stmt.execute(params![
            link.menu_id,
            link.item_id,
            link.is_alternative,
            link.sort_order
        ])?;
    }
    Ok(())
}

#[async_trait]
impl CateringStore for SqliteStore {
    async fn profile(&self, user_id: &str) -> Result<Option<User>> {
        let conn = self.conn();
        let mut stmt = conn.prepare_cached(&format!(
            "SELECT {PROFILE_COLUMNS} FROM profiles WHERE user_id = ?1"
        ))?;
        Ok(stmt
            .query_row(params![user_id.trim()], profile_from_row)
            .optional()?)
    }

    async fn profiles(&self) -> Result<Vec<User>> {
        let conn = self.conn();
        let mut stmt = conn.prepare_cached(&format!(
            "SELECT {PROFILE_COLUMNS} FROM profiles ORDER BY name"
        ))?;
        let users = stmt
            .query_map([], profile_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(users)
    }

    async fn insert_profile(&self, user: &User, password_hash: &str) -> Result<()> {
        insert_profile_row(&self.conn(), user, password_hash)
    }

    async fn provision_profile(
        &self,
        user: &User,
        password_hash: &str,
        welcome: &Notification,
    ) -> Result<()> {
        let mut conn = self.conn();
        let tx = conn.transaction()?;
        insert_profile_row(&tx, user, password_hash)?;
        insert_notification_row(&tx, welcome)?;
        tx.commit()?;
        Ok(())
    }

    async fn update_profile(&self, user: &User) -> Result<()> {
        let conn = self.conn();
        let mut stmt = conn.prepare_cached(
            "UPDATE profiles
                SET name = ?2, rank = ?3, role = ?4, onboarding_completed = ?5,
                    password_changed = ?6, dietary_profile = ?7
                WHERE user_id = ?1",
        )?;

        let changed = stmt.execute(params![
            user.user_id,
            user.name,
            user.rank,
            user.role,
            user.onboarding_completed,
            user.password_changed,
            serde_json::to_string(&user.dietary_profile)?,
        ])?;

        if changed == 0 {
            return Err(CrewMealError::NotFound);
        }
        Ok(())
    }

    async fn password_hash(&self, user_id: &str) -> Result<Option<String>> {
        let conn = self.conn();
        let mut stmt =
            conn.prepare_cached("SELECT password_hash FROM profiles WHERE user_id = ?1")?;
        Ok(stmt
            .query_row(params![user_id.trim()], |row| row.get(0))
            .optional()?)
    }

    async fn set_password(&self, user_id: &str, hash: &str) -> Result<()> {
        let conn = self.conn();
        let changed = conn
            .prepare_cached(
                "UPDATE profiles SET password_hash = ?2, password_changed = 1 WHERE user_id = ?1",
            )?
            .execute(params![user_id, hash])?;

        if changed == 0 {
            return Err(CrewMealError::NotFound);
        }
        Ok(())
    }

    async fn create_session(&self, user_id: &str) -> Result<String> {
        let token = Uuid::new_v4().to_string();
        self.conn()
            .prepare_cached("INSERT INTO sessions (token, user_id, created_at) VALUES (?1, ?2, ?3)")?
            .execute(params![token, user_id, Utc::now()])?;
        Ok(token)
    }

    async fn session_user(&self, token: &str) -> Result<Option<String>> {
        let conn = self.conn();
        let mut stmt = conn.prepare_cached("SELECT user_id FROM sessions WHERE token = ?1")?;
        Ok(stmt.query_row(params![token], |row| row.get(0)).optional()?)
    }

    async fn delete_session(&self, token: &str) -> Result<()> {
        self.conn()
            .prepare_cached("DELETE FROM sessions WHERE token = ?1")?
            .execute(params![token])?;
        Ok(())
    }

    async fn menus(&self) -> Result<Vec<Menu>> {
        let conn = self.conn();

        let headers = conn
            .prepare_cached("SELECT menu_id, date, meal_type FROM menus ORDER BY date, rowid")?
            .query_map([], |row| {
                Ok(MenuHeader {
                    menu_id: row.get(0)?,
                    date: row.get(1)?,
                    meal_type: row.get(2)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        let links = conn
            .prepare_cached(
                "SELECT menu_id, item_id, is_alternative, sort_order FROM menu_menu_items",
            )?
            .query_map([], |row| {
                Ok(MenuLink {
                    menu_id: row.get(0)?,
                    item_id: row.get(1)?,
                    is_alternative: row.get(2)?,
                    sort_order: row.get(3)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        let items = conn
            .prepare_cached(
                "SELECT item_id, name, category, estimated_calories, dietary_flags, image_url
                FROM menu_items",
            )?
            .query_map([], |row| {
                Ok(MenuItem {
                    item_id: row.get(0)?,
                    name: row.get(1)?,
                    category: row.get(2)?,
                    estimated_calories: row.get(3)?,
                    dietary_flags: json_column(row, 4)?,
                    image_url: row.get(5)?,
                })
            })?
            .map(|item| item.map(|item| (item.item_id.clone(), item)))
            .collect::<rusqlite::Result<HashMap<_, _>>>()?;

        Ok(assemble_menus(headers, &links, &items))
    }

    async fn upsert_menu(&self, menu: &Menu) -> Result<()> {
        let mut conn = self.conn();
        let tx = conn.transaction()?;
        write_menu(&tx, menu)?;
        tx.commit()?;
        Ok(())
    }

    async fn publish_menu(&self, menu: &Menu, announcements: &[Notification]) -> Result<()> {
        let mut conn = self.conn();
        let tx = conn.transaction()?;
        write_menu(&tx, menu)?;
        for notification in announcements {
            insert_notification_row(&tx, notification)?;
        }
        tx.commit()?;
        Ok(())
    }

    async fn insert_rating(&self, rating: &Rating) -> Result<()> {
        self.conn()
            .prepare_cached(
                "INSERT INTO ratings
                    (rating_id, user_id, item_id, menu_id, stars, emoji, comment, created_at)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            )?
            .execute(params![
                rating.rating_id,
                rating.user_id,
                rating.item_id,
                rating.menu_id,
                rating.stars,
                rating.emoji,
                rating.comment,
                rating.created_at,
            ])?;
        Ok(())
    }

    async fn ratings_for_user(&self, user_id: &str) -> Result<Vec<Rating>> {
        let conn = self.conn();
        let mut stmt = conn.prepare_cached(
            "SELECT rating_id, user_id, item_id, menu_id, stars, emoji, comment, created_at
            FROM ratings WHERE user_id = ?1 ORDER BY created_at DESC",
        )?;
        let ratings = stmt
            .query_map(params![user_id], |row| {
                Ok(Rating {
                    rating_id: row.get(0)?,
                    user_id: row.get(1)?,
                    item_id: row.get(2)?,
                    menu_id: row.get(3)?,
                    stars: row.get(4)?,
                    emoji: row.get(5)?,
                    comment: row.get(6)?,
                    created_at: row.get(7)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(ratings)
    }

    async fn liked_items(&self, user_id: &str) -> Result<Vec<String>> {
        let conn = self.conn();
        let mut stmt = conn
            .prepare_cached("SELECT item_id FROM liked_items WHERE user_id = ?1 ORDER BY item_id")?;
        let items = stmt
            .query_map(params![user_id], |row| row.get(0))?
            .collect::<rusqlite::Result<Vec<String>>>()?;
        Ok(items)
    }

    async fn toggle_like(&self, user_id: &str, item_id: &str) -> Result<bool> {
        let mut conn = self.conn();
        let tx = conn.transaction()?;
        let removed = tx
            .prepare_cached("DELETE FROM liked_items WHERE user_id = ?1 AND item_id = ?2")?
            .execute(params![user_id, item_id])?;
        if removed == 0 {
            tx.prepare_cached(
                "INSERT INTO liked_items (user_id, item_id, created_at) VALUES (?1, ?2, ?3)",
            )?
            .execute(params![user_id, item_id, Utc::now()])?;
        }
        tx.commit()?;
        Ok(removed == 0)
    }

    async fn requests(&self) -> Result<Vec<Request>> {
        let conn = self.conn();
        let mut stmt = conn.prepare_cached(&format!(
            "SELECT {REQUEST_COLUMNS} FROM requests ORDER BY created_at DESC"
        ))?;
        let requests = stmt
            .query_map([], request_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(requests)
    }

    async fn requests_for_user(&self, user_id: &str) -> Result<Vec<Request>> {
        let conn = self.conn();
        let mut stmt = conn.prepare_cached(&format!(
            "SELECT {REQUEST_COLUMNS} FROM requests WHERE user_id = ?1 ORDER BY created_at DESC"
        ))?;
        let requests = stmt
            .query_map(params![user_id], request_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(requests)
    }

    async fn request(&self, request_id: &str) -> Result<Option<Request>> {
        let conn = self.conn();
        let mut stmt = conn.prepare_cached(&format!(
            "SELECT {REQUEST_COLUMNS} FROM requests WHERE request_id = ?1"
        ))?;
        Ok(stmt
            .query_row(params![request_id], request_from_row)
            .optional()?)
    }

    async fn insert_request(&self, request: &Request) -> Result<()> {
        self.conn()
            .prepare_cached(&format!(
                "INSERT INTO requests ({REQUEST_COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)"
            ))?
            .execute(params![
                request.request_id,
                request.user_id,
                request.menu_id,
                request.kind,
                request.status,
                request.detail,
                request.timestamp,
            ])?;
        Ok(())
    }

    async fn transition_request(
        &self,
        request_id: &str,
        from: RequestStatus,
        to: RequestStatus,
        notice: &Notification,
    ) -> Result<bool> {
        let mut conn = self.conn();
        let tx = conn.transaction()?;
        let changed = tx
            .prepare_cached(
                "UPDATE requests SET status = ?3 WHERE request_id = ?1 AND status = ?2",
            )?
            .execute(params![request_id, from, to])?;
        if changed != 1 {
            return Ok(false);
        }
        insert_notification_row(&tx, notice)?;
        tx.commit()?;
        Ok(true)
    }

    async fn attendance(&self) -> Result<Vec<MealAttendance>> {
        let conn = self.conn();
        let mut stmt = conn.prepare_cached(
            "SELECT menu_id, user_id, status, created_at FROM meal_attendance
            ORDER BY created_at DESC",
        )?;
        let records = stmt
            .query_map([], attendance_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(records)
    }

    async fn attendance_for_user(&self, user_id: &str) -> Result<Vec<MealAttendance>> {
        let conn = self.conn();
        let mut stmt = conn.prepare_cached(
            "SELECT menu_id, user_id, status, created_at FROM meal_attendance WHERE user_id = ?1",
        )?;
        let records = stmt
            .query_map(params![user_id], attendance_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(records)
    }

    async fn attendance_record(
        &self,
        menu_id: &str,
        user_id: &str,
    ) -> Result<Option<MealAttendance>> {
        let conn = self.conn();
        let mut stmt = conn.prepare_cached(
            "SELECT menu_id, user_id, status, created_at FROM meal_attendance
            WHERE menu_id = ?1 AND user_id = ?2",
        )?;
        Ok(stmt
            .query_row(params![menu_id, user_id], attendance_from_row)
            .optional()?)
    }

    async fn upsert_attendance(&self, record: &MealAttendance) -> Result<()> {
        self.conn()
            .prepare_cached(
                "INSERT INTO meal_attendance (menu_id, user_id, status, created_at)
                VALUES (?1, ?2, ?3, ?4)
                ON CONFLICT(menu_id, user_id)
                DO UPDATE SET status = excluded.status, created_at = excluded.created_at",
            )?
            .execute(params![
                record.menu_id,
                record.user_id,
                record.status,
                record.timestamp
            ])?;
        Ok(())
    }

    async fn remove_attendance(&self, menu_id: &str, user_id: &str) -> Result<()> {
        self.conn()
            .prepare_cached("DELETE FROM meal_attendance WHERE menu_id = ?1 AND user_id = ?2")?
            .execute(params![menu_id, user_id])?;
        Ok(())
    }

    async fn notifications_for_user(&self, user_id: &str) -> Result<Vec<Notification>> {
        let conn = self.conn();
        let mut stmt = conn.prepare_cached(
            "SELECT id, user_id, title, message, type, read, created_at FROM notifications
            WHERE user_id = ?1 ORDER BY created_at DESC",
        )?;
        let notifications = stmt
            .query_map(params![user_id], notification_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(notifications)
    }

    async fn insert_notification(&self, notification: &Notification) -> Result<()> {
        insert_notification_row(&self.conn(), notification)
    }

    async fn mark_notification_read(&self, user_id: &str, notification_id: &str) -> Result<()> {
        let changed = self
            .conn()
            .prepare_cached("UPDATE notifications SET read = 1 WHERE id = ?1 AND user_id = ?2")?
            .execute(params![notification_id, user_id])?;

        if changed == 0 {
            return Err(CrewMealError::NotFound);
        }
        Ok(())
    }

    async fn clear_notifications(&self, user_id: &str) -> Result<()> {
        self.conn()
            .prepare_cached("DELETE FROM notifications WHERE user_id = ?1")?
            .execute(params![user_id])?;
        Ok(())
    }

    async fn waste_config(&self) -> Result<Option<WasteConfig>> {
        let conn = self.conn();
        let mut stmt = conn.prepare_cached(
            "SELECT container_volume_m3, container_weight_kg FROM waste_config WHERE id = ?1",
        )?;
        Ok(stmt
            .query_row(params![WASTE_CONFIG_ID], |row| {
                Ok(WasteConfig {
                    container_volume_m3: row.get(0)?,
                    container_weight_kg: row.get(1)?,
                })
            })
            .optional()?)
    }

    async fn put_waste_config(&self, config: &WasteConfig) -> Result<()> {
        self.conn()
            .prepare_cached(
                "INSERT INTO waste_config (id, container_volume_m3, container_weight_kg, updated_at)
                VALUES (?1, ?2, ?3, ?4)
                ON CONFLICT(id) DO UPDATE SET
                    container_volume_m3 = excluded.container_volume_m3,
                    container_weight_kg = excluded.container_weight_kg,
                    updated_at = excluded.updated_at",
            )?
            .execute(params![
                WASTE_CONFIG_ID,
                config.container_volume_m3,
                config.container_weight_kg,
                Utc::now(),
            ])?;
        Ok(())
    }

    async fn waste_logs(&self) -> Result<Vec<WasteLog>> {
        let conn = self.conn();
        let mut stmt = conn.prepare_cached(
            "SELECT log_id, date, container_count, total_weight_kg, total_volume_m3, logged_by
            FROM waste_logs ORDER BY date DESC",
        )?;
        let logs = stmt
            .query_map([], |row| {
                Ok(WasteLog {
                    log_id: row.get(0)?,
                    date: row.get(1)?,
                    container_count: row.get(2)?,
                    total_weight_kg: row.get(3)?,
                    total_volume_m3: row.get(4)?,
                    logged_by: row.get(5)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(logs)
    }

    async fn insert_waste_log(&self, log: &WasteLog, notice: &Notification) -> Result<()> {
        let mut conn = self.conn();
        let tx = conn.transaction()?;
        tx.prepare_cached(
            "INSERT INTO waste_logs (log_id, date, container_count, total_weight_kg,
                total_volume_m3, logged_by, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        )?
        .execute(params![
            log.log_id,
            log.date,
            log.container_count,
            log.total_weight_kg,
            log.total_volume_m3,
            log.logged_by,
            Utc::now(),
        ])?;
        insert_notification_row(&tx, notice)?;
        tx.commit()?;
        Ok(())
    }
}
