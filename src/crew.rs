use std::collections::HashSet;

use rand::Rng;

use crate::{
    auth::{hash_password, normalize_identifier},
    constants::{DEFAULT_CREW_PASSWORD, DEFAULT_ROLE_PASSWORD, ROLE_ACCOUNTS},
    data_backend::CateringStore,
    data_types::{Capability, DietaryProfile, Notification, NotificationType, User},
    errors::{CrewMealError, Result},
    extraction::ExtractedRoster,
    shared_main::App,
};

async fn provision(store: &dyn CateringStore, user: &User, password: &str) -> Result<()> {
    let welcome = Notification::new(
        &user.user_id,
        "Welcome Aboard",
        "Don't forget to complete your dietary profile.",
        NotificationType::Info,
    );
    store
        .provision_profile(user, &hash_password(password)?, &welcome)
        .await
}

/// Adds a crew member with the default password.
pub async fn provision_user(app: &App, user_id: &str, name: &str, rank: &str) -> Result<User> {
    let admin = app.require(Capability::ManageCrew)?;
    let user = User::new_crew(normalize_identifier(user_id)?, name.trim(), rank.trim());

    provision(app.store.as_ref(), &user, DEFAULT_CREW_PASSWORD).await?;
    log::info!("{} provisioned {} ({})", admin.user_id, user.user_id, user.name);
    Ok(user)
}

/// Creates the role accounts and the waste standard if they are missing.
pub async fn seed_defaults(store: &dyn CateringStore) -> Result<usize> {
    let mut created = 0;

    for (role, user_id, name, rank) in ROLE_ACCOUNTS {
        if store.profile(user_id).await?.is_some() {
            continue;
        }
        let mut user = User::new_crew(user_id, name, rank);
        user.role = role;
        user.onboarding_completed = true;
        user.password_changed = true;
        store
            .insert_profile(&user, &hash_password(DEFAULT_ROLE_PASSWORD)?)
            .await?;
        log::info!("Seeded {} account {}", role, user_id);
        created += 1;
    }

    if store.waste_config().await?.is_none() {
        store.put_waste_config(&Default::default()).await?;
        log::info!("Seeded default waste standard");
    }
    Ok(created)
}

fn generated_id() -> String {
    format!("U{}", rand::thread_rng().gen_range(100000..1000000))
}

/// Provisions every roster entry whose identifier is not taken yet.
pub async fn import_roster(app: &App, roster: ExtractedRoster) -> Result<Vec<User>> {
    let admin = app.require(Capability::ManageCrew)?;

    let mut seen: HashSet<String> = app
        .store
        .profiles()
        .await?
        .into_iter()
        .map(|user| user.user_id.to_lowercase())
        .collect();

    let mut imported = Vec::new();
    for entry in roster.crew_members {
        let listed = match entry.crew_id.as_deref().map(normalize_identifier) {
            Some(Ok(id)) => Some(id),
            Some(Err(e)) => {
                log::warn!("Roster entry '{}' has an unusable id: {}", entry.name, e);
                None
            }
            None => None,
        };
        let user_id = match listed {
            Some(id) => {
                if !seen.insert(id.to_lowercase()) {
                    log::debug!("Skipping {} ({}), already on board", entry.name, id);
                    continue;
                }
                id
            }
            None => loop {
                let id = generated_id();
                if seen.insert(id.to_lowercase()) {
                    break id;
                }
            },
        };

        let user = User::new_crew(user_id, entry.name.trim(), entry.rank.trim());
        provision(app.store.as_ref(), &user, DEFAULT_CREW_PASSWORD).await?;
        imported.push(user);
    }

    app.store
        .insert_notification(&Notification::new(
            &admin.user_id,
            "Crew List Updated",
            format!(
                "Imported {} crew members from the roster document.",
                imported.len()
            ),
            NotificationType::Success,
        ))
        .await?;

    log::info!("{} imported {} crew members", admin.user_id, imported.len());
    Ok(imported)
}

/// Extracts a roster from a document image and imports it.
pub async fn import_roster_image(app: &App, image: &[u8]) -> Result<Vec<User>> {
    app.require(Capability::ManageCrew)?;
    let roster = app
        .extractor
        .analyze_roster(image)
        .await
        .ok_or(CrewMealError::ExtractionFailed)?;
    import_roster(app, roster).await
}

/// Edits the signed-in user's own name, rank and dietary profile.
pub async fn update_profile(
    app: &mut App,
    name: Option<&str>,
    rank: Option<&str>,
    dietary_profile: Option<DietaryProfile>,
) -> Result<User> {
    let mut user = app.active_user()?.clone();
    if let Some(name) = name {
        user.name = name.trim().to_string();
    }
    if let Some(rank) = rank {
        user.rank = rank.trim().to_string();
    }
    if let Some(profile) = dietary_profile {
        user.dietary_profile = profile.normalized();
    }

    app.store.update_profile(&user).await?;
    app.replace_user(user.clone());
    app.refresh_alert().await?;
    Ok(user)
}

pub async fn list_crew(app: &App) -> Result<Vec<User>> {
    app.active_user()?;
    app.store.profiles().await
}
