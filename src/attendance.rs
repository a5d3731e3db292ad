//! Per-(menu, user) meal status.
//!
//! `Standard` is the rest state and is never stored. Any transition that lands
//! on it removes the record instead.

use chrono::Utc;

use crate::{
    data_backend::CateringStore,
    data_types::{Capability, MealAttendance, MealStatus, MenuItem, Role, User},
    dietary::galley_conflicts,
    errors::{CrewMealError, Result},
    shared_main::App,
};

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum AttendanceAction {
    ToggleLatePlate,
    ToggleSkip,
    MarkServed,
}

impl MealStatus {
    pub fn next(self, action: AttendanceAction) -> MealStatus {
        match (action, self) {
            (AttendanceAction::ToggleLatePlate, MealStatus::LatePlate) => MealStatus::Standard,
            (AttendanceAction::ToggleLatePlate, _) => MealStatus::LatePlate,
            (AttendanceAction::ToggleSkip, MealStatus::Skipped) => MealStatus::Standard,
            (AttendanceAction::ToggleSkip, _) => MealStatus::Skipped,
            (AttendanceAction::MarkServed, _) => MealStatus::Served,
        }
    }
}

/// Reads the current status, applies `action` and writes the result.
pub async fn apply_action(
    store: &dyn CateringStore,
    menu_id: &str,
    user_id: &str,
    action: AttendanceAction,
) -> Result<MealStatus> {
    let current = store
        .attendance_record(menu_id, user_id)
        .await?
        .map(|record| record.status)
        .unwrap_or_default();
    let next = current.next(action);

    if next == MealStatus::Standard {
        store.remove_attendance(menu_id, user_id).await?;
    } else {
        store
            .upsert_attendance(&MealAttendance {
                menu_id: menu_id.to_string(),
                user_id: user_id.to_string(),
                status: next,
                timestamp: Utc::now(),
            })
            .await?;
    }

    log::debug!("{user_id} on {menu_id}: {:?} -> {:?}", current, next);
    Ok(next)
}

async fn ensure_menu(store: &dyn CateringStore, menu_id: &str) -> Result<()> {
    if store.menus().await?.iter().any(|menu| menu.menu_id == menu_id) {
        Ok(())
    } else {
        Err(CrewMealError::UnknownMenu(menu_id.to_string()))
    }
}

pub async fn toggle_late_plate(app: &App, menu_id: &str) -> Result<MealStatus> {
    let user = app.active_user()?;
    ensure_menu(app.store.as_ref(), menu_id).await?;
    apply_action(
        app.store.as_ref(),
        menu_id,
        &user.user_id,
        AttendanceAction::ToggleLatePlate,
    )
    .await
}

pub async fn toggle_skip(app: &App, menu_id: &str) -> Result<MealStatus> {
    let user = app.active_user()?;
    ensure_menu(app.store.as_ref(), menu_id).await?;
    apply_action(
        app.store.as_ref(),
        menu_id,
        &user.user_id,
        AttendanceAction::ToggleSkip,
    )
    .await
}

/// Galley marks a crew member's plate as served.
pub async fn mark_served(app: &App, menu_id: &str, user_id: &str) -> Result<MealStatus> {
    app.require(Capability::ServeMeals)?;
    ensure_menu(app.store.as_ref(), menu_id).await?;
    let crew_member = app
        .store
        .profile(user_id)
        .await?
        .ok_or(CrewMealError::NotFound)?;
    if !eats_in_mess(&crew_member) {
        return Err(CrewMealError::NotADiner(crew_member.user_id));
    }

    apply_action(
        app.store.as_ref(),
        menu_id,
        &crew_member.user_id,
        AttendanceAction::MarkServed,
    )
    .await
}

/// Own status for a menu.
pub async fn my_status(app: &App, menu_id: &str) -> Result<MealStatus> {
    let user = app.active_user()?;
    Ok(app
        .store
        .attendance_record(menu_id, &user.user_id)
        .await?
        .map(|record| record.status)
        .unwrap_or_default())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Headcount {
    pub total: usize,
    pub served: usize,
    pub late_plates: usize,
    pub pending: usize,
}

fn eats_in_mess(user: &User) -> bool {
    matches!(user.role, Role::Crew | Role::Admin)
}

pub fn meal_headcount(menu_id: &str, crew: &[User], attendance: &[MealAttendance]) -> Headcount {
    let for_menu = attendance.iter().filter(|a| a.menu_id == menu_id);
    let served = for_menu
        .clone()
        .filter(|a| a.status == MealStatus::Served)
        .count();
    let late_plates = for_menu
        .filter(|a| a.status == MealStatus::LatePlate)
        .count();
    let total = crew.iter().filter(|user| eats_in_mess(user)).count();

    Headcount {
        total,
        served,
        late_plates,
        pending: total.saturating_sub(served),
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ServiceEntry {
    pub user: User,
    pub status: MealStatus,
    pub conflicts: Vec<MenuItem>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ServiceList {
    pub headcount: Headcount,
    pub entries: Vec<ServiceEntry>,
}

/// Galley view of one menu: headcount plus every diner's status and conflicts.
pub async fn service_list(app: &App, menu_id: &str) -> Result<ServiceList> {
    app.require(Capability::ServeMeals)?;

    let menus = app.store.menus().await?;
    let menu = menus
        .iter()
        .find(|menu| menu.menu_id == menu_id)
        .ok_or_else(|| CrewMealError::UnknownMenu(menu_id.to_string()))?;
    let crew = app.store.profiles().await?;
    let attendance = app.store.attendance().await?;

    let entries = crew
        .iter()
        .filter(|user| eats_in_mess(user))
        .map(|user| ServiceEntry {
            status: attendance
                .iter()
                .find(|a| a.menu_id == menu_id && a.user_id.eq_ignore_ascii_case(&user.user_id))
                .map(|a| a.status)
                .unwrap_or_default(),
            conflicts: galley_conflicts(user, menu).into_iter().cloned().collect(),
            user: user.clone(),
        })
        .collect();

    Ok(ServiceList {
        headcount: meal_headcount(menu_id, &crew, &attendance),
        entries,
    })
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::constants::role_account_id;
    use crate::data_backend::MemStore;
    use crate::dietary::tests::{item, menu};
    use crate::shared_main::tests::{activate, app_with};

    fn onboarded(id: &str, role: Role) -> User {
        let mut user = User::new_crew(id, id, "AB");
        user.role = role;
        user.onboarding_completed = true;
        user.password_changed = true;
        user
    }

    async fn seeded() -> (Arc<MemStore>, User) {
        let store = Arc::new(MemStore::default());
        store
            .upsert_menu(&menu("m2", vec![item("i4", "Steamed Rice", false, false)]))
            .await
            .unwrap();
        let crew = onboarded("A12345678", Role::Crew);
        store.insert_profile(&crew, "hash").await.unwrap();
        (store, crew)
    }

    #[test]
    fn transitions() {
        use AttendanceAction::*;

        assert_eq!(MealStatus::Standard.next(ToggleLatePlate), MealStatus::LatePlate);
        assert_eq!(MealStatus::LatePlate.next(ToggleLatePlate), MealStatus::Standard);
        assert_eq!(MealStatus::Skipped.next(ToggleLatePlate), MealStatus::LatePlate);
        assert_eq!(MealStatus::LatePlate.next(ToggleSkip), MealStatus::Skipped);
        assert_eq!(MealStatus::Served.next(MarkServed), MealStatus::Served);
        assert_eq!(MealStatus::Skipped.next(MarkServed), MealStatus::Served);
    }

    #[tokio::test]
    async fn late_plate_twice_leaves_no_record() {
        let (store, crew) = seeded().await;
        let mut app = app_with(store.clone());
        activate(&mut app, crew.clone());

        assert_eq!(toggle_late_plate(&app, "m2").await.unwrap(), MealStatus::LatePlate);
        assert_eq!(store.attendance().await.unwrap().len(), 1);

        assert_eq!(toggle_late_plate(&app, "m2").await.unwrap(), MealStatus::Standard);
        assert!(store.attendance().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn skip_and_late_plate_never_coexist() {
        let (store, crew) = seeded().await;
        let mut app = app_with(store.clone());
        activate(&mut app, crew.clone());

        toggle_late_plate(&app, "m2").await.unwrap();
        assert_eq!(toggle_skip(&app, "m2").await.unwrap(), MealStatus::Skipped);
        let records = store.attendance_for_user(&crew.user_id).await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].status, MealStatus::Skipped);

        assert_eq!(toggle_late_plate(&app, "m2").await.unwrap(), MealStatus::LatePlate);
        let records = store.attendance_for_user(&crew.user_id).await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].status, MealStatus::LatePlate);
    }

    #[tokio::test]
    async fn only_galley_marks_served() {
        let (store, crew) = seeded().await;
        let mut app = app_with(store.clone());

        activate(&mut app, crew.clone());
        assert!(matches!(
            mark_served(&app, "m2", &crew.user_id).await,
            Err(CrewMealError::Forbidden { .. })
        ));

        let galley_id = role_account_id(Role::Galley).unwrap();
        activate(&mut app, onboarded(galley_id, Role::Galley));
        assert_eq!(
            mark_served(&app, "m2", &crew.user_id).await.unwrap(),
            MealStatus::Served
        );
        assert_eq!(
            mark_served(&app, "m2", &crew.user_id).await.unwrap(),
            MealStatus::Served
        );
        assert!(matches!(
            mark_served(&app, "m9", &crew.user_id).await,
            Err(CrewMealError::UnknownMenu(_))
        ));
    }

    #[tokio::test]
    async fn galley_and_officers_are_not_served() {
        let (store, _) = seeded().await;
        let officer = onboarded("u_officer", Role::Officer);
        store.insert_profile(&officer, "hash").await.unwrap();
        let mut app = app_with(store.clone());
        activate(&mut app, onboarded("u_galley", Role::Galley));

        assert!(matches!(
            mark_served(&app, "m2", "u_officer").await,
            Err(CrewMealError::NotADiner(_))
        ));
        assert!(store.attendance().await.unwrap().is_empty());
        assert!(matches!(
            mark_served(&app, "m2", "nobody").await,
            Err(CrewMealError::NotFound)
        ));
    }

    #[tokio::test]
    async fn my_status_follows_toggles_and_service() {
        let (store, crew) = seeded().await;
        let mut app = app_with(store.clone());
        activate(&mut app, crew.clone());
        assert_eq!(my_status(&app, "m2").await.unwrap(), MealStatus::Standard);

        toggle_skip(&app, "m2").await.unwrap();
        assert_eq!(my_status(&app, "m2").await.unwrap(), MealStatus::Skipped);

        activate(&mut app, onboarded("u_galley", Role::Galley));
        mark_served(&app, "m2", &crew.user_id).await.unwrap();
        activate(&mut app, crew);
        assert_eq!(my_status(&app, "m2").await.unwrap(), MealStatus::Served);
    }

    #[test]
    fn headcount_counts_crew_and_admin_only() {
        let crew = vec![
            onboarded("c1", Role::Crew),
            onboarded("c2", Role::Crew),
            onboarded("c3", Role::Admin),
            onboarded("g1", Role::Galley),
            onboarded("o1", Role::Officer),
        ];
        let record = |user: &str, menu: &str, status| MealAttendance {
            menu_id: menu.into(),
            user_id: user.into(),
            status,
            timestamp: Utc::now(),
        };
        let attendance = vec![
            record("c1", "m2", MealStatus::Served),
            record("c2", "m2", MealStatus::LatePlate),
            record("c3", "m1", MealStatus::Served),
        ];

        assert_eq!(
            meal_headcount("m2", &crew, &attendance),
            Headcount {
                total: 3,
                served: 1,
                late_plates: 1,
                pending: 2,
            }
        );
    }

    #[tokio::test]
    async fn service_list_shows_allergy_conflicts() {
        let (store, mut crew) = seeded().await;
        crew.dietary_profile.food_allergies = vec!["rice".into()];
        store.update_profile(&crew).await.unwrap();

        let mut app = app_with(store);
        activate(&mut app, onboarded("u_galley", Role::Galley));

        let list = service_list(&app, "m2").await.unwrap();
        assert_eq!(list.headcount.total, 1);
        assert_eq!(list.entries[0].status, MealStatus::Standard);
        assert_eq!(list.entries[0].conflicts[0].item_id, "i4");
    }
}
