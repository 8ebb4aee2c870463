//! Grade history retrieval.

use crate::domain::RetrievalResult;
use crate::error::PortalError;
use crate::extract::{GRADE_TABLE, extract};
use crate::portal::endpoints::{EAMS_ORIGIN, GRADE_HISTORY_URL, GRADE_REFERER};
use crate::portal::session::{Redirects, Transport};

/// Default `projectType` (major, as opposed to minor/second degree).
pub const DEFAULT_PROJECT_TYPE: &str = "MAJOR";

/// Fetch and parse the full grade history.
pub fn get_grades(session: &impl Transport, project_type: &str) -> Result<RetrievalResult, PortalError> {
    let url = format!("{GRADE_HISTORY_URL}?projectType={project_type}");
    let headers = [
        ("Accept", "*/*"),
        ("X-Requested-With", "XMLHttpRequest"),
        ("Origin", EAMS_ORIGIN),
        ("Referer", GRADE_REFERER),
    ];

    let resp = session.post_form(&url, &[], &headers, Redirects::Follow)?;
    if !resp.is_ok() {
        return Err(PortalError::backend_with_page(
            format!("grade request failed with status {}", resp.status),
            resp.body,
        ));
    }

    match extract(&resp.body, &GRADE_TABLE) {
        Ok(result) => {
            tracing::info!(courses = result.count, "grades retrieved");
            Ok(result)
        }
        Err(e) => Err(PortalError::backend_with_page(format!("grade page: {e}"), resp.body)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::portal::testing::{ScriptedTransport, page};

    const PAGE: &str = r#"<table class="gridtable">
        <thead><tr><th>课程名称</th><th>学分</th><th>绩点</th></tr></thead>
        <tbody><tr><td>线性代数</td><td>3</td><td>4.0</td></tr></tbody>
    </table>"#;

    #[test]
    fn posts_with_project_type_and_parses_table() {
        let transport = ScriptedTransport::new(vec![Ok(page(200, PAGE))]);
        let r = get_grades(&transport, DEFAULT_PROJECT_TYPE).unwrap();
        assert_eq!(r.count, 1);
        assert_eq!(r.courses[0].number("绩点"), Some(4.0));

        let calls = transport.calls();
        assert_eq!(calls[0].method, "POST");
        assert!(calls[0].url.ends_with("historyCourseGrade.action?projectType=MAJOR"));
        assert!(calls[0].headers.iter().any(|(k, v)| k == "Origin" && v == EAMS_ORIGIN));
    }

    #[test]
    fn missing_table_is_backend_fault_without_retry() {
        let transport = ScriptedTransport::new(vec![Ok(page(200, "<html>session expired</html>"))]);
        let err = get_grades(&transport, DEFAULT_PROJECT_TYPE).unwrap_err();
        match err {
            PortalError::Backend { message, .. } => assert!(message.contains("table not found")),
            other => panic!("unexpected {other:?}"),
        }
        assert_eq!(transport.calls().len(), 1);
    }

    #[test]
    fn non_200_is_backend_fault() {
        let transport = ScriptedTransport::new(vec![Ok(page(500, "oops"))]);
        assert!(matches!(
            get_grades(&transport, DEFAULT_PROJECT_TYPE),
            Err(PortalError::Backend { .. })
        ));
    }
}
