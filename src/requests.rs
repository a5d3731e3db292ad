use chrono::Utc;
use uuid::Uuid;

use crate::{
    data_types::{
        Capability, Notification, NotificationType, Request, RequestStatus, RequestType,
    },
    errors::{CrewMealError, Result},
    shared_main::App,
};

pub fn substitution_detail(original: &str, alternative: &str) -> String {
    format!("Dietary Conflict: Swap {original} for {alternative}")
}

/// Files a pending request for the signed-in user.
pub async fn create_request(
    app: &App,
    menu_id: &str,
    kind: RequestType,
    detail: &str,
) -> Result<Request> {
    let user = app.active_user()?;
    if !app
        .store
        .menus()
        .await?
        .iter()
        .any(|menu| menu.menu_id == menu_id)
    {
        return Err(CrewMealError::UnknownMenu(menu_id.to_string()));
    }

    let request = Request {
        request_id: format!("req_{}", Uuid::new_v4().simple()),
        user_id: user.user_id.clone(),
        menu_id: menu_id.to_string(),
        kind,
        status: RequestStatus::Pending,
        detail: detail.to_string(),
        timestamp: Utc::now(),
    };
    app.store.insert_request(&request).await?;

    log::info!(
        "{} filed {} request {} for {}",
        request.user_id,
        kind.as_str(),
        request.request_id,
        menu_id
    );
    Ok(request)
}

/// Requests a swap for the item flagged by the current dietary alert and
/// dismisses the alert once the request is stored.
pub async fn request_substitution(
    app: &mut App,
    original: &str,
    alternative: &str,
) -> Result<Request> {
    let menu_id = match app.alert() {
        Some(alert) => alert.menu.menu_id.clone(),
        None => return Err(CrewMealError::InvalidState),
    };

    let request = create_request(
        app,
        &menu_id,
        RequestType::Substitution,
        &substitution_detail(original, alternative),
    )
    .await?;

    app.dismiss_alert();
    Ok(request)
}

/// Moves a pending request to `decision` and notifies the requester in the
/// same write.
///
/// Fails with `RequestAlreadyResolved` if the request has left `Pending`, in
/// which case nothing is written.
pub async fn resolve_request(
    app: &App,
    request_id: &str,
    decision: RequestStatus,
) -> Result<Request> {
    let galley = app.require(Capability::ResolveRequests)?;
    if decision == RequestStatus::Pending {
        return Err(CrewMealError::InvalidState);
    }

    let mut request = app
        .store
        .request(request_id)
        .await?
        .ok_or_else(|| CrewMealError::UnknownRequest(request_id.to_string()))?;

    let kind = match decision {
        RequestStatus::Approved => NotificationType::Success,
        _ => NotificationType::Alert,
    };
    let notice = Notification::new(
        &request.user_id,
        "Request Update",
        format!(
            "Your {} request has been {}.",
            request.kind.as_str(),
            decision
        ),
        kind,
    );

    let transitioned = app
        .store
        .transition_request(request_id, RequestStatus::Pending, decision, &notice)
        .await?;
    if !transitioned {
        // re-read so the error names the status that won
        let current = app
            .store
            .request(request_id)
            .await?
            .map(|r| r.status)
            .unwrap_or(request.status);
        return Err(CrewMealError::RequestAlreadyResolved(
            request_id.to_string(),
            current,
        ));
    }
    request.status = decision;

    log::info!("{} {} request {}", galley.user_id, decision, request_id);
    Ok(request)
}

pub async fn pending_requests(app: &App) -> Result<Vec<Request>> {
    app.require(Capability::ResolveRequests)?;
    Ok(app
        .store
        .requests()
        .await?
        .into_iter()
        .filter(|r| r.status == RequestStatus::Pending)
        .collect())
}

pub async fn my_requests(app: &App) -> Result<Vec<Request>> {
    let user = app.active_user()?;
    app.store.requests_for_user(&user.user_id).await
}
