//! Curriculum plan retrieval.
//!
//! The plan page is rendered server-side in stages; a response can arrive
//! before the course table exists. Only that condition (table or marker table
//! not found) is retried, a bounded number of times with a blocking sleep in
//! between. Everything else fails immediately.

use std::time::Duration;

use crate::domain::RetrievalResult;
use crate::error::PortalError;
use crate::extract::{ExtractError, PLAN_TABLE, extract};
use crate::portal::endpoints::{EAMS_ORIGIN, PLAN_REFERER, PLAN_VIEW_URL};
use crate::portal::session::{Redirects, Transport};

pub const DEFAULT_MAX_RETRIES: u32 = 8;
pub const DEFAULT_WAIT: Duration = Duration::from_secs(3);

/// Fetch the plan `plan_id`, making at most `max_retries` attempts (at least one).
pub fn get_plan(
    session: &impl Transport,
    plan_id: &str,
    max_retries: u32,
    wait: Duration,
) -> Result<RetrievalResult, PortalError> {
    get_plan_with_sleep(session, plan_id, max_retries, wait, std::thread::sleep)
}

fn get_plan_with_sleep(
    session: &impl Transport,
    plan_id: &str,
    max_retries: u32,
    wait: Duration,
    mut sleep: impl FnMut(Duration),
) -> Result<RetrievalResult, PortalError> {
    let attempts = max_retries.max(1);
    let form = [("planId", plan_id.to_string())];
    let headers = [
        ("Origin", EAMS_ORIGIN),
        ("Referer", PLAN_REFERER),
        ("Cache-Control", "max-age=0"),
        ("Upgrade-Insecure-Requests", "1"),
    ];

    let mut last: Option<ExtractError> = None;
    for attempt in 1..=attempts {
        if attempt > 1 {
            sleep(wait);
        }
        tracing::info!(attempt, attempts, plan_id, "requesting plan page");

        let resp = session.post_form(PLAN_VIEW_URL, &form, &headers, Redirects::Follow)?;
        if !resp.is_ok() {
            return Err(PortalError::backend_with_page(
                format!("plan request failed with status {}", resp.status),
                resp.body,
            ));
        }

        match extract(&resp.body, &PLAN_TABLE) {
            Ok(result) => {
                tracing::info!(courses = result.count, attempt, "plan retrieved");
                return Ok(result);
            }
            Err(e) if e.is_not_found() => {
                tracing::warn!(attempt, attempts, reason = %e, wait_secs = wait.as_secs_f64(), "plan table not rendered yet");
                last = Some(e);
            }
            Err(e) => {
                return Err(PortalError::backend_with_page(format!("plan page: {e}"), resp.body));
            }
        }
    }

    let reason = last.map(|e| e.to_string()).unwrap_or_default();
    Err(PortalError::backend(format!(
        "exhausted retries after {attempts} attempts ({reason})"
    )))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::portal::testing::{ScriptedTransport, page};

    fn rendered() -> String {
        let cells: String = (0..12).map(|i| format!("<td>{i}</td>")).collect();
        format!(
            r#"<table class="planTable"><thead><tr><th>学时种类</th></tr></thead>
               <tbody><tr>{cells}</tr></tbody></table>"#
        )
    }

    const NOT_YET: &str = "<html><body>loading</body></html>";
    const NO_MARKER: &str = r#"<table class="planTable"><tbody><tr><td>其他</td></tr></tbody></table>"#;

    fn run(responses: Vec<&str>, max: u32) -> (Result<RetrievalResult, PortalError>, usize, usize) {
        let transport = ScriptedTransport::new(responses.into_iter().map(|b| Ok(page(200, b))).collect());
        let mut sleeps = 0usize;
        let result = get_plan_with_sleep(&transport, "4068", max, Duration::from_secs(3), |_| sleeps += 1);
        (result, transport.calls().len(), sleeps)
    }

    #[test]
    fn succeeds_after_fewer_than_max_not_found_failures() {
        let ok = rendered();
        let (result, calls, sleeps) = run(vec![NOT_YET, NO_MARKER, ok.as_str()], 3);
        let r = result.unwrap();
        assert_eq!(r.count, 1);
        assert_eq!(calls, 3);
        assert_eq!(sleeps, 2);
    }

    #[test]
    fn max_not_found_failures_is_backend_fault() {
        let ok = rendered();
        let (result, calls, _) = run(vec![NOT_YET, NOT_YET, NOT_YET, ok.as_str()], 3);
        match result {
            Err(PortalError::Backend { message, .. }) => assert!(message.contains("exhausted retries")),
            other => panic!("unexpected {other:?}"),
        }
        assert_eq!(calls, 3);
    }

    #[test]
    fn malformed_table_is_not_retried() {
        let malformed = r#"<table class="planTable"><caption>学时种类</caption></table>"#;
        let (result, calls, sleeps) = run(vec![malformed, rendered().as_str()], 5);
        assert!(matches!(result, Err(PortalError::Backend { .. })));
        assert_eq!(calls, 1);
        assert_eq!(sleeps, 0);
    }

    #[test]
    fn http_error_is_not_retried() {
        let transport = ScriptedTransport::new(vec![Ok(page(502, "bad gateway")), Ok(page(200, &rendered()))]);
        let result = get_plan_with_sleep(&transport, "4068", 5, Duration::ZERO, |_| {});
        assert!(matches!(result, Err(PortalError::Backend { .. })));
        assert_eq!(transport.calls().len(), 1);
    }

    #[test]
    fn zero_retries_still_makes_one_attempt() {
        let ok = rendered();
        let (result, calls, _) = run(vec![ok.as_str()], 0);
        assert!(result.is_ok());
        assert_eq!(calls, 1);
    }

    #[test]
    fn posts_plan_id_form_field() {
        let transport = ScriptedTransport::new(vec![Ok(page(200, &rendered()))]);
        get_plan_with_sleep(&transport, "4068", 1, Duration::ZERO, |_| {}).unwrap();
        let calls = transport.calls();
        assert_eq!(calls[0].url, PLAN_VIEW_URL);
        assert_eq!(calls[0].form, vec![("planId".to_string(), "4068".to_string())]);
    }
}
