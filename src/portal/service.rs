//! Exchange the SSO session for access to a target application.

use crate::error::PortalError;
use crate::portal::session::{Redirects, Transport};

/// Where the CAS redirect chain ended up.
#[derive(Debug, Clone, PartialEq)]
pub struct ServiceAccess {
    pub status: u16,
    pub final_url: String,
    pub body: String,
}

impl ServiceAccess {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// GET `{idp_login_url}?service={service_url}` following redirects.
///
/// The authenticated cookies let the provider issue a ticket and bounce straight
/// through to the service. The result is returned as-is; callers decide whether
/// the status and final URL look right.
pub fn access_service(
    session: &impl Transport,
    idp_login_url: &str,
    service_url: &str,
) -> Result<ServiceAccess, PortalError> {
    let url = format!("{idp_login_url}?service={service_url}");
    let resp = session.get(&url, Redirects::Follow)?;
    Ok(ServiceAccess {
        status: resp.status,
        final_url: resp.url,
        body: resp.body,
    })
}
