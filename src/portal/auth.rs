//! SSO login handshake.
//!
//! `FetchingForm -> SubmittingCredentials -> {Success | InvalidCredentials | Backend}`
//!
//! 1. GET the login page and scrape `form#loginForm` for the one-shot `lt` and
//!    `execution` tokens and the form action.
//! 2. POST the credential payload to the action without following redirects.
//! 3. Classify: a `302` to the portal/identity provider or carrying `ticket=`
//!    is a success; the login page rendered again is a credential rejection;
//!    anything else is a backend fault.

use scraper::Html;

use crate::domain::Credentials;
use crate::error::PortalError;
use crate::extract::html::{page_title, selector};
use crate::portal::endpoints::{AUTHENTICATED_REDIRECT_HOSTS, LOGIN_PAGE_TITLE};
use crate::portal::session::{PageResponse, Redirects, Transport};

/// One-shot tokens scraped from the login page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoginForm {
    pub lt: String,
    pub action: String,
    pub execution: String,
}

/// How the identity provider acknowledged the login.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthGrant {
    /// Redirected to the personal portal or back to the provider; the session
    /// cookies carry the authentication.
    Portal { location: String },
    /// Redirected with a service ticket.
    Ticket(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthSuccess {
    pub grant: AuthGrant,
    /// Cookies held for the identity provider after login.
    pub cookies: Vec<(String, String)>,
}

/// Run the login handshake on `session`.
pub fn authenticate(
    session: &impl Transport,
    login_url: &str,
    credentials: &Credentials,
) -> Result<AuthSuccess, PortalError> {
    let page = session.get(login_url, Redirects::Follow)?;
    let form = parse_login_form(&page.body)?;
    tracing::debug!(action = %form.action, "login form tokens acquired");

    let target = resolve_action(login_url, &form.action)?;
    let payload = login_payload(credentials, &form);
    let resp = session.post_form(&target, &payload, &[], Redirects::Manual)?;

    let grant = classify_login_response(&resp)?;
    match &grant {
        AuthGrant::Portal { location } => tracing::info!(%location, "authenticated"),
        AuthGrant::Ticket(_) => tracing::info!("authenticated with service ticket"),
    }

    Ok(AuthSuccess {
        grant,
        cookies: session.cookies_for(login_url),
    })
}

/// Extract the login tokens from the identity provider's page.
pub fn parse_login_form(html: &str) -> Result<LoginForm, PortalError> {
    let doc = Html::parse_document(html);
    let form_sel = selector("form#loginForm").map_err(PortalError::backend)?;
    let lt_sel = selector("input#lt").map_err(PortalError::backend)?;
    let exec_sel = selector(r#"input[name="execution"]"#).map_err(PortalError::backend)?;

    let missing = |what: &str| PortalError::backend_with_page(format!("login page has no {what}"), html);

    let form = doc.select(&form_sel).next().ok_or_else(|| missing("login form"))?;
    let action = form.value().attr("action").ok_or_else(|| missing("form action"))?;
    let lt = form
        .select(&lt_sel)
        .next()
        .and_then(|el| el.value().attr("value"))
        .ok_or_else(|| missing("lt token"))?;
    let execution = form
        .select(&exec_sel)
        .next()
        .and_then(|el| el.value().attr("value"))
        .ok_or_else(|| missing("execution token"))?;

    Ok(LoginForm {
        lt: lt.to_string(),
        action: action.to_string(),
        execution: execution.to_string(),
    })
}

/// Credential payload in the shape the provider expects.
///
/// `rsa` is a plain concatenation, not a digest; `ul`/`pl` are character counts.
pub fn login_payload(credentials: &Credentials, form: &LoginForm) -> Vec<(&'static str, String)> {
    let Credentials { username, password } = credentials;
    vec![
        ("rsa", format!("{username}{password}{}", form.lt)),
        ("ul", username.chars().count().to_string()),
        ("pl", password.chars().count().to_string()),
        ("lt", form.lt.clone()),
        ("execution", form.execution.clone()),
        ("_eventId", "submit".to_string()),
    ]
}

/// Classify the response to the credential POST.
pub fn classify_login_response(resp: &PageResponse) -> Result<AuthGrant, PortalError> {
    if resp.status == 302 {
        let location = resp.location.as_deref().unwrap_or_default();
        if let Some(ticket) = extract_ticket(location) {
            return Ok(AuthGrant::Ticket(ticket));
        }
        if is_authenticated_redirect(location) {
            return Ok(AuthGrant::Portal {
                location: location.to_string(),
            });
        }
        tracing::warn!(%location, "login redirected somewhere unexpected");
    }

    let doc = Html::parse_document(&resp.body);
    if page_title(&doc).as_deref() == Some(LOGIN_PAGE_TITLE) {
        return Err(PortalError::InvalidCredentials);
    }

    Err(PortalError::backend_with_page(
        format!("unexpected login response (status {})", resp.status),
        resp.body.clone(),
    ))
}

/// Whether `location` points at one of the portal hosts reached after a
/// successful login. Only the URL's host is compared.
fn is_authenticated_redirect(location: &str) -> bool {
    reqwest::Url::parse(location)
        .ok()
        .and_then(|url| url.host_str().map(str::to_ascii_lowercase))
        .is_some_and(|host| AUTHENTICATED_REDIRECT_HOSTS.contains(&host.as_str()))
}

/// The value between `ticket=` and the next `&` (or end of string).
pub fn extract_ticket(location: &str) -> Option<String> {
    let (_, rest) = location.split_once("ticket=")?;
    let ticket = rest.split('&').next().unwrap_or_default();
    Some(ticket.to_string())
}

fn resolve_action(login_url: &str, action: &str) -> Result<String, PortalError> {
    let base = reqwest::Url::parse(login_url)
        .map_err(|e| PortalError::backend(format!("invalid login URL '{login_url}': {e}")))?;
    base.join(action)
        .map(String::from)
        .map_err(|e| PortalError::backend(format!("invalid form action '{action}': {e}")))
}
