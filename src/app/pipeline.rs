//! Shared "log in, then fetch" workflow used by every portal-facing command.
//!
//! login -> service access -> grades | plan
//!
//! Each call opens its own session; nothing is cached between runs.

use std::time::Duration;

use crate::config::Config;
use crate::domain::{Credentials, RetrievalResult};
use crate::error::{AppError, PortalError};
use crate::portal::endpoints::{DEFAULT_SERVICE_URL, IDP_LOGIN_URL};
use crate::portal::{HttpSession, Transport, access_service, authenticate};
use crate::retrieve::plan::{DEFAULT_MAX_RETRIES, DEFAULT_WAIT};
use crate::retrieve::{DEFAULT_PROJECT_TYPE, get_grades, get_plan};

pub const DEFAULT_PLAN_ID: &str = "4068";

/// Everything a portal run needs, resolved from the config once.
#[derive(Debug, Clone)]
pub struct PortalSettings {
    pub credentials: Credentials,
    pub service_url: String,
    pub bypass_proxy: bool,
    pub project_type: String,
    pub plan_id: String,
    pub max_retries: u32,
    pub wait: Duration,
}

impl PortalSettings {
    pub fn from_config(config: &Config) -> Result<Self, AppError> {
        let service_url = config
            .get_opt_str("neu_login.service_url")
            .or_else(|| config.get_opt_str("service_data.JiaoWuURL"))
            .unwrap_or_else(|| DEFAULT_SERVICE_URL.to_string());

        let max_retries = config
            .get_opt_u64("plan.max_retries")
            .map(|n| u32::try_from(n).unwrap_or(u32::MAX))
            .unwrap_or(DEFAULT_MAX_RETRIES);
        let wait = config
            .get_opt_u64("plan.wait_seconds")
            .map(Duration::from_secs)
            .unwrap_or(DEFAULT_WAIT);

        Ok(Self {
            credentials: config.credentials()?,
            service_url,
            bypass_proxy: config.get_bool("neu_login.bypass_proxy", false),
            project_type: config.get_str("neu_login.project_type", DEFAULT_PROJECT_TYPE),
            plan_id: config.get_str("service_data.plan_id", DEFAULT_PLAN_ID),
            max_retries,
            wait,
        })
    }
}

/// Authenticate `session` and open the academic system on it.
///
/// A non-2xx landing page is logged but not fatal; the retrievers report the
/// real problem if the session turns out to be unusable.
pub fn sign_in(session: &impl Transport, settings: &PortalSettings) -> Result<(), PortalError> {
    let auth = authenticate(session, IDP_LOGIN_URL, &settings.credentials)?;
    tracing::debug!(cookies = auth.cookies.len(), "identity provider session established");

    let access = access_service(session, IDP_LOGIN_URL, &settings.service_url)?;
    if access.is_success() {
        tracing::info!(url = %access.final_url, "service access granted");
    } else {
        tracing::warn!(status = access.status, url = %access.final_url, "service access returned non-success status");
    }
    Ok(())
}

/// Fresh, signed-in HTTP session.
pub fn open_session(settings: &PortalSettings) -> Result<HttpSession, PortalError> {
    let session = HttpSession::create(settings.bypass_proxy)?;
    sign_in(&session, settings)?;
    Ok(session)
}

pub fn fetch_grades(settings: &PortalSettings) -> Result<RetrievalResult, PortalError> {
    let session = open_session(settings)?;
    get_grades(&session, &settings.project_type)
}

pub fn fetch_plan(settings: &PortalSettings) -> Result<RetrievalResult, PortalError> {
    let session = open_session(settings)?;
    get_plan(&session, &settings.plan_id, settings.max_retries, settings.wait)
}
