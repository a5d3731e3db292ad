use chrono::{Local, NaiveDate, Utc};
use uuid::Uuid;

use crate::{
    data_types::{
        Capability, MealType, Menu, MenuItem, Mood, Notification, NotificationType, Rating,
        Role,
    },
    errors::{CrewMealError, Result, ValidationError},
    extraction::ExtractedMenu,
    shared_main::App,
};

/// Builds a menu from an extraction result, with generated ids.
pub fn menu_from_extraction(extracted: ExtractedMenu, date: NaiveDate) -> Menu {
    let stamp = Utc::now().timestamp_millis();

    Menu {
        menu_id: format!("m_{stamp}"),
        date,
        meal_type: extracted.meal_type.unwrap_or(MealType::Lunch),
        items: extracted
            .items
            .into_iter()
            .enumerate()
            .map(|(idx, item)| MenuItem {
                item_id: format!("gen_{stamp}_{idx}"),
                name: item.name,
                category: item.category,
                estimated_calories: item.estimated_calories,
                dietary_flags: item.dietary_flags,
                image_url: None,
            })
            .collect(),
        alternatives: Vec::new(),
    }
}

/// Stores a menu and tells every crew member about it.
pub async fn publish_menu(app: &mut App, menu: Menu) -> Result<Menu> {
    let officer = app.require(Capability::ImportMenus)?.user_id.clone();

    let message = format!(
        "The {} menu for {} has been updated. Check it out!",
        menu.meal_type, menu.date
    );
    let announcements: Vec<Notification> = app
        .store
        .profiles()
        .await?
        .into_iter()
        .filter(|user| user.role == Role::Crew)
        .map(|user| {
            Notification::new(
                user.user_id,
                "New Menu Added",
                message.as_str(),
                NotificationType::Success,
            )
        })
        .collect();
    app.store.publish_menu(&menu, &announcements).await?;

    log::info!(
        "{} published {} {} ({} items, {} kcal)",
        officer,
        menu.date,
        menu.meal_type,
        menu.items.len(),
        menu.total_calories()
    );
    app.refresh_alert().await?;
    Ok(menu)
}

pub async fn import_menu(
    app: &mut App,
    extracted: ExtractedMenu,
    date: Option<NaiveDate>,
) -> Result<Menu> {
    app.require(Capability::ImportMenus)?;
    let date = date.unwrap_or_else(|| Local::now().date_naive());
    publish_menu(app, menu_from_extraction(extracted, date)).await
}

/// Extracts a menu from a photo and publishes it.
pub async fn import_menu_image(
    app: &mut App,
    image: &[u8],
    date: Option<NaiveDate>,
) -> Result<Menu> {
    app.require(Capability::ImportMenus)?;
    let extracted = app
        .extractor
        .analyze_menu(image)
        .await
        .ok_or(CrewMealError::ExtractionFailed)?;
    import_menu(app, extracted, date).await
}

pub async fn all_menus(app: &App) -> Result<Vec<Menu>> {
    app.active_user()?;
    app.store.menus().await
}

/// Menus served on `date`, breakfast first.
pub async fn menus_for_date(app: &App, date: NaiveDate) -> Result<Vec<Menu>> {
    let mut menus: Vec<Menu> = all_menus(app)
        .await?
        .into_iter()
        .filter(|menu| menu.date == date)
        .collect();
    menus.sort_by_key(|menu| menu.meal_type);
    Ok(menus)
}

pub async fn submit_rating(
    app: &App,
    menu_id: &str,
    item_id: &str,
    stars: u8,
    emoji: Mood,
    comment: &str,
) -> Result<Rating> {
    let user = app.active_user()?;
    if !(1..=5).contains(&stars) {
        return Err(ValidationError::StarsOutOfRange(stars).into());
    }

    let menus = app.store.menus().await?;
    let menu = menus
        .iter()
        .find(|menu| menu.menu_id == menu_id)
        .ok_or_else(|| CrewMealError::UnknownMenu(menu_id.to_string()))?;
    if !menu
        .items
        .iter()
        .chain(menu.alternatives.iter())
        .any(|item| item.item_id == item_id)
    {
        return Err(CrewMealError::UnknownItem(item_id.to_string()));
    }

    let rating = Rating {
        rating_id: Uuid::new_v4().to_string(),
        user_id: user.user_id.clone(),
        item_id: item_id.to_string(),
        menu_id: menu_id.to_string(),
        stars,
        emoji,
        comment: comment.trim().to_string(),
        created_at: Utc::now(),
    };
    app.store.insert_rating(&rating).await?;

    log::debug!("{} rated {} with {} stars", user.user_id, item_id, stars);
    Ok(rating)
}

pub async fn my_ratings(app: &App) -> Result<Vec<Rating>> {
    let user = app.active_user()?;
    app.store.ratings_for_user(&user.user_id).await
}

/// Likes or unlikes a dish. Returns whether it is liked afterwards.
pub async fn toggle_like(app: &App, item_id: &str) -> Result<bool> {
    let user = app.active_user()?;
    let on_a_menu = app.store.menus().await?.iter().any(|menu| {
        menu.items
            .iter()
            .chain(menu.alternatives.iter())
            .any(|item| item.item_id == item_id)
    });
    if !on_a_menu {
        return Err(CrewMealError::UnknownItem(item_id.to_string()));
    }

    let liked = app.store.toggle_like(&user.user_id, item_id).await?;
    log::debug!(
        "{} {} {}",
        user.user_id,
        if liked { "liked" } else { "unliked" },
        item_id
    );
    Ok(liked)
}

pub async fn liked_items(app: &App) -> Result<Vec<String>> {
    let user = app.active_user()?;
    app.store.liked_items(&user.user_id).await
}

pub async fn notifications(app: &App) -> Result<Vec<Notification>> {
    let user = app.signed_in_user()?;
    app.store.notifications_for_user(&user.user_id).await
}

/// Only the owner's notifications can be marked; anything else is `NotFound`.
pub async fn mark_notification_read(app: &App, notification_id: &str) -> Result<()> {
    let user = app.signed_in_user()?;
    app.store
        .mark_notification_read(&user.user_id, notification_id)
        .await
}

pub async fn clear_notifications(app: &App) -> Result<()> {
    let user = app.signed_in_user()?;
    app.store.clear_notifications(&user.user_id).await
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::data_backend::{CateringStore, MemStore};
    use crate::data_types::{Category, DietaryFlags, Religion, User};
    use crate::dietary::tests::{item, menu};
    use crate::extraction::ExtractedItem;
    use crate::shared_main::tests::{activate, app_with};

    fn staff(id: &str, role: Role) -> User {
        let mut user = User::new_crew(id, id, "Staff");
        user.role = role;
        user.onboarding_completed = true;
        user.password_changed = true;
        user
    }

    fn extracted() -> ExtractedMenu {
        ExtractedMenu {
            meal_type: Some(MealType::Dinner),
            items: vec![
                ExtractedItem {
                    name: "Pork Sinigang".into(),
                    category: Category::Main,
                    estimated_calories: 650,
                    dietary_flags: DietaryFlags {
                        contains_pork: true,
                        ..Default::default()
                    },
                },
                ExtractedItem {
                    name: "Garlic Rice".into(),
                    category: Category::Side,
                    estimated_calories: 420,
                    dietary_flags: DietaryFlags::default(),
                },
            ],
        }
    }

    #[test]
    fn extracted_items_get_generated_ids() {
        let date = NaiveDate::from_ymd_opt(2026, 10, 17).unwrap();
        let menu = menu_from_extraction(extracted(), date);
        assert!(menu.menu_id.starts_with("m_"));
        assert!(menu.items[0].item_id.starts_with("gen_"));
        assert!(menu.items[1].item_id.ends_with("_1"));
        assert_eq!(menu.total_calories(), 1070);
        assert!(menu.is_high_calorie());

        let no_type = ExtractedMenu {
            meal_type: None,
            items: vec![],
        };
        assert_eq!(menu_from_extraction(no_type, date).meal_type, MealType::Lunch);
    }

    #[tokio::test]
    async fn import_notifies_crew_and_raises_alert() {
        let store = Arc::new(MemStore::default());
        let mut crew = staff("A12345678", Role::Crew);
        crew.dietary_profile.set_religion(Religion::Muslim);
        store.insert_profile(&crew, "hash").await.unwrap();
        store
            .insert_profile(&staff("u_galley", Role::Galley), "hash")
            .await
            .unwrap();

        let mut app = app_with(store.clone());
        activate(&mut app, staff("u_officer", Role::Officer));
        let date = NaiveDate::from_ymd_opt(2026, 10, 17).unwrap();
        let menu = import_menu(&mut app, extracted(), Some(date)).await.unwrap();

        let notes = store.notifications_for_user("A12345678").await.unwrap();
        assert_eq!(notes.len(), 1);
        assert_eq!(notes[0].title, "New Menu Added");
        assert_eq!(
            notes[0].message,
            "The Dinner menu for 2026-10-17 has been updated. Check it out!"
        );
        assert!(store
            .notifications_for_user("u_galley")
            .await
            .unwrap()
            .is_empty());

        activate(&mut app, crew);
        app.refresh_alert().await.unwrap();
        assert_eq!(app.alert().unwrap().menu.menu_id, menu.menu_id);
    }

    #[tokio::test]
    async fn galley_cannot_import_menus() {
        let mut app = app_with(Arc::new(MemStore::default()));
        activate(&mut app, staff("u_galley", Role::Galley));
        assert!(matches!(
            import_menu(&mut app, extracted(), None).await,
            Err(CrewMealError::Forbidden { .. })
        ));
    }

    #[tokio::test]
    async fn menus_for_date_in_meal_order() {
        let store = Arc::new(MemStore::default());
        let mut dinner = menu("m3", vec![item("i6", "Grilled Beef Steak", false, true)]);
        dinner.meal_type = MealType::Dinner;
        let mut breakfast = menu("m1", vec![item("i1", "Scrambled Eggs (2)", false, false)]);
        breakfast.meal_type = MealType::Breakfast;
        let mut tomorrow = menu("m_future_1", vec![]);
        tomorrow.date = tomorrow.date.succ_opt().unwrap();
        for m in [&dinner, &breakfast, &tomorrow] {
            store.upsert_menu(m).await.unwrap();
        }

        let mut app = app_with(store);
        activate(&mut app, staff("A12345678", Role::Crew));
        let today = menus_for_date(&app, breakfast.date).await.unwrap();
        let ids: Vec<_> = today.iter().map(|m| m.menu_id.as_str()).collect();
        assert_eq!(ids, vec!["m1", "m3"]);
    }

    #[tokio::test]
    async fn ratings_are_validated() {
        let store = Arc::new(MemStore::default());
        store
            .upsert_menu(&menu("m2", vec![item("i4", "Steamed Rice", false, false)]))
            .await
            .unwrap();
        let mut app = app_with(store);
        activate(&mut app, staff("A12345678", Role::Crew));

        assert!(matches!(
            submit_rating(&app, "m2", "i4", 6, Mood::Delicious, "").await,
            Err(CrewMealError::Validation(ValidationError::StarsOutOfRange(6)))
        ));
        assert!(matches!(
            submit_rating(&app, "m2", "i9", 4, Mood::Average, "").await,
            Err(CrewMealError::UnknownItem(_))
        ));

        submit_rating(&app, "m2", "i4", 5, Mood::Delicious, " Fluffy ")
            .await
            .unwrap();
        let mine = my_ratings(&app).await.unwrap();
        assert_eq!(mine.len(), 1);
        assert_eq!(mine[0].comment, "Fluffy");
    }

    #[tokio::test]
    async fn liking_twice_returns_to_not_liked() {
        let store = Arc::new(MemStore::default());
        let mut lunch = menu("m2", vec![item("i4", "Steamed Rice", false, false)]);
        lunch.alternatives = vec![item("alt1", "Pan Fried Fish", false, false)];
        store.upsert_menu(&lunch).await.unwrap();
        let mut app = app_with(store);
        activate(&mut app, staff("A12345678", Role::Crew));

        assert!(toggle_like(&app, "alt1").await.unwrap());
        assert_eq!(liked_items(&app).await.unwrap(), vec!["alt1"]);
        assert!(!toggle_like(&app, "alt1").await.unwrap());
        assert!(liked_items(&app).await.unwrap().is_empty());

        assert!(matches!(
            toggle_like(&app, "i9").await,
            Err(CrewMealError::UnknownItem(_))
        ));
    }

    #[tokio::test]
    async fn cannot_mark_someone_elses_notification() {
        let store = Arc::new(MemStore::default());
        let theirs = Notification::new(
            "A12345678",
            "Request Update",
            "Your absence request has been approved.",
            NotificationType::Success,
        );
        store.insert_notification(&theirs).await.unwrap();

        let mut app = app_with(store.clone());
        activate(&mut app, staff("P1234567", Role::Crew));
        assert!(matches!(
            mark_notification_read(&app, &theirs.id).await,
            Err(CrewMealError::NotFound)
        ));
        assert!(!store.notifications_for_user("A12345678").await.unwrap()[0].read);
    }

    #[tokio::test]
    async fn notifications_read_and_clear() {
        let store = Arc::new(MemStore::default());
        let crew = staff("A12345678", Role::Crew);
        let note = Notification::new(&crew.user_id, "Hi", "There", NotificationType::Info);
        store.insert_notification(&note).await.unwrap();

        let mut app = app_with(store);
        activate(&mut app, crew);
        mark_notification_read(&app, &note.id).await.unwrap();
        assert!(notifications(&app).await.unwrap()[0].read);

        clear_notifications(&app).await.unwrap();
        assert!(notifications(&app).await.unwrap().is_empty());
    }
}
