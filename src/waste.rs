//! Food waste accounting.
//!
//! Logs freeze weight and volume from the container standard in force when they
//! are written. Changing the standard later never touches existing logs.

use std::collections::BTreeMap;

use chrono::{Datelike, Local, NaiveDate};
use uuid::Uuid;

use crate::{
    data_types::{Capability, MonthlyWaste, Notification, NotificationType, WasteConfig, WasteLog},
    errors::{Result, ValidationError},
    shared_main::App,
};

impl WasteLog {
    /// `None` for a zero count.
    pub fn compute(
        container_count: u32,
        logged_by: &str,
        config: &WasteConfig,
        date: NaiveDate,
    ) -> Option<WasteLog> {
        if container_count == 0 {
            return None;
        }

        let count = f64::from(container_count);
        Some(WasteLog {
            log_id: Uuid::new_v4().to_string(),
            date,
            container_count,
            total_weight_kg: count * config.container_weight_kg,
            total_volume_m3: count * config.container_volume_m3,
            logged_by: logged_by.to_string(),
        })
    }
}

impl WasteConfig {
    pub fn validate(&self) -> std::result::Result<(), ValidationError> {
        let valid = |v: f64| v.is_finite() && v > 0.0;
        if valid(self.container_volume_m3) && valid(self.container_weight_kg) {
            Ok(())
        } else {
            Err(ValidationError::InvalidWasteConfig)
        }
    }
}

fn month_label(year: i32, month: u32) -> String {
    NaiveDate::from_ymd_opt(year, month, 1)
        .map(|d| d.format("%B %Y").to_string())
        .unwrap_or_else(|| format!("{month:02}/{year}"))
}

/// Groups logs by calendar month of their date, oldest month first.
pub fn aggregate_by_month(logs: &[WasteLog]) -> Vec<MonthlyWaste> {
    let mut buckets: BTreeMap<(i32, u32), MonthlyWaste> = BTreeMap::new();

    for log in logs {
        let (year, month) = (log.date.year(), log.date.month());
        let bucket = buckets.entry((year, month)).or_insert_with(|| MonthlyWaste {
            year,
            month,
            label: month_label(year, month),
            container_count: 0,
            total_weight_kg: 0.0,
            total_volume_m3: 0.0,
        });
        bucket.container_count += u64::from(log.container_count);
        bucket.total_weight_kg += log.total_weight_kg;
        bucket.total_volume_m3 += log.total_volume_m3;
    }

    buckets.into_values().collect()
}

pub fn total_weight_kg(logs: &[WasteLog]) -> f64 {
    logs.iter().map(|log| log.total_weight_kg).sum()
}

/// Stored standard, or the built-in default when none was saved yet.
pub async fn current_config(app: &App) -> Result<WasteConfig> {
    Ok(app.store.waste_config().await?.unwrap_or_default())
}

pub async fn log_waste(app: &App, container_count: u32, date: Option<NaiveDate>) -> Result<WasteLog> {
    let galley = app.require(Capability::LogWaste)?;
    let config = current_config(app).await?;
    let date = date.unwrap_or_else(|| Local::now().date_naive());

    let log = WasteLog::compute(container_count, &galley.user_id, &config, date)
        .ok_or(ValidationError::ZeroWasteCount)?;
    let notice = Notification::new(
        &galley.user_id,
        "Waste Logged",
        format!("{container_count} containers recorded."),
        NotificationType::Success,
    );
    app.store.insert_waste_log(&log, &notice).await?;

    log::info!(
        "{} logged {} containers ({:.1} kg, {:.2} m³)",
        galley.user_id,
        container_count,
        log.total_weight_kg,
        log.total_volume_m3
    );
    Ok(log)
}

pub async fn update_waste_config(app: &App, config: WasteConfig) -> Result<WasteConfig> {
    let officer = app.require(Capability::ConfigureWaste)?;
    config.validate()?;
    app.store.put_waste_config(&config).await?;

    log::info!(
        "{} set container standard to {} m³ / {} kg",
        officer.user_id,
        config.container_volume_m3,
        config.container_weight_kg
    );
    Ok(config)
}

pub async fn waste_logs(app: &App) -> Result<Vec<WasteLog>> {
    app.active_user()?;
    app.store.waste_logs().await
}

#[derive(Debug, Clone, PartialEq)]
pub struct WasteReport {
    pub months: Vec<MonthlyWaste>,
    pub total_weight_kg: f64,
}

impl WasteReport {
    pub fn is_empty(&self) -> bool {
        self.months.is_empty()
    }
}

/// Monthly totals, oldest month first, plus the overall weight.
pub async fn monthly_report(app: &App) -> Result<WasteReport> {
    let logs = waste_logs(app).await?;
    Ok(WasteReport {
        months: aggregate_by_month(&logs),
        total_weight_kg: total_weight_kg(&logs),
    })
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::data_backend::{CateringStore, MemStore};
    use crate::data_types::{Role, User};
    use crate::errors::CrewMealError;
    use crate::shared_main::tests::{activate, app_with};

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn staff(id: &str, role: Role) -> User {
        let mut user = User::new_crew(id, id, "Staff");
        user.role = role;
        user.onboarding_completed = true;
        user.password_changed = true;
        user
    }

    #[test]
    fn five_containers_at_default_standard() {
        let config = WasteConfig {
            container_volume_m3: 0.05,
            container_weight_kg: 25.0,
        };
        let log = WasteLog::compute(5, "u_galley", &config, day(2026, 10, 17)).unwrap();
        assert_eq!(log.total_weight_kg, 125.0);
        assert!((log.total_volume_m3 - 0.25).abs() < 1e-9);

        assert!(WasteLog::compute(0, "u_galley", &config, day(2026, 10, 17)).is_none());
    }

    #[test]
    fn same_month_merges_other_months_do_not() {
        let config = WasteConfig::default();
        let logs: Vec<WasteLog> = [
            (2, day(2026, 10, 3)),
            (3, day(2026, 10, 28)),
            (1, day(2026, 9, 30)),
            (4, day(2025, 10, 15)),
        ]
        .into_iter()
        .filter_map(|(count, date)| WasteLog::compute(count, "u_galley", &config, date))
        .collect();

        let months = aggregate_by_month(&logs);
        let summary: Vec<_> = months
            .iter()
            .map(|m| (m.label.as_str(), m.container_count))
            .collect();
        assert_eq!(
            summary,
            vec![
                ("October 2025", 4),
                ("September 2026", 1),
                ("October 2026", 5),
            ]
        );
        assert_eq!(months[2].total_weight_kg, 125.0);
        assert_eq!(total_weight_kg(&logs), 250.0);
    }

    #[test]
    fn config_must_be_positive() {
        let bad = WasteConfig {
            container_volume_m3: 0.0,
            container_weight_kg: 25.0,
        };
        assert_eq!(bad.validate(), Err(ValidationError::InvalidWasteConfig));
        let nan = WasteConfig {
            container_volume_m3: 0.05,
            container_weight_kg: f64::NAN,
        };
        assert!(nan.validate().is_err());
        assert!(WasteConfig::default().validate().is_ok());
    }

    #[tokio::test]
    async fn zero_count_writes_nothing() {
        let store = Arc::new(MemStore::default());
        let mut app = app_with(store.clone());
        activate(&mut app, staff("u_galley", Role::Galley));

        assert!(matches!(
            log_waste(&app, 0, None).await,
            Err(CrewMealError::Validation(ValidationError::ZeroWasteCount))
        ));
        assert!(store.waste_logs().await.unwrap().is_empty());
        assert!(store
            .notifications_for_user("u_galley")
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn logs_keep_the_standard_they_were_written_with() {
        let store = Arc::new(MemStore::default());
        let mut app = app_with(store.clone());

        activate(&mut app, staff("u_galley", Role::Galley));
        let first = log_waste(&app, 2, Some(day(2026, 10, 1))).await.unwrap();
        assert_eq!(first.total_weight_kg, 50.0);
        // galley may log but not reconfigure
        assert!(matches!(
            update_waste_config(&app, WasteConfig::default()).await,
            Err(CrewMealError::Forbidden { .. })
        ));

        activate(&mut app, staff("u_officer", Role::Officer));
        update_waste_config(
            &app,
            WasteConfig {
                container_volume_m3: 0.1,
                container_weight_kg: 40.0,
            },
        )
        .await
        .unwrap();

        activate(&mut app, staff("u_galley", Role::Galley));
        let second = log_waste(&app, 2, Some(day(2026, 10, 2))).await.unwrap();
        assert_eq!(second.total_weight_kg, 80.0);

        let logs = store.waste_logs().await.unwrap();
        assert_eq!(total_weight_kg(&logs), 130.0);

        let notifications = store.notifications_for_user("u_galley").await.unwrap();
        assert_eq!(notifications.len(), 2);
        assert_eq!(notifications[0].message, "2 containers recorded.");
    }

    #[tokio::test]
    async fn report_groups_by_month() {
        let store = Arc::new(MemStore::default());
        let mut app = app_with(store);
        activate(&mut app, staff("u_galley", Role::Galley));
        assert!(monthly_report(&app).await.unwrap().is_empty());

        log_waste(&app, 2, Some(day(2026, 9, 29))).await.unwrap();
        log_waste(&app, 1, Some(day(2026, 10, 1))).await.unwrap();
        log_waste(&app, 3, Some(day(2026, 10, 16))).await.unwrap();

        // any active user may read the report
        activate(&mut app, staff("A12345678", Role::Crew));
        let report = monthly_report(&app).await.unwrap();
        let months: Vec<_> = report
            .months
            .iter()
            .map(|m| (m.label.as_str(), m.container_count, m.total_weight_kg))
            .collect();
        assert_eq!(
            months,
            vec![("September 2026", 2, 50.0), ("October 2026", 4, 100.0)]
        );
        assert_eq!(report.total_weight_kg, 150.0);
    }
}
