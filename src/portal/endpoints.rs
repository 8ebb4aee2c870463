//! Fixed portal endpoints and page markers.

/// Identity provider login page; also the CAS `?service=` entry point.
pub const IDP_LOGIN_URL: &str = "https://pass.neu.edu.cn/tpass/login";

/// Hosts whose redirect after login means the SSO cookie is established.
pub const AUTHENTICATED_REDIRECT_HOSTS: [&str; 2] = ["personal.neu.edu.cn", "pass.neu.edu.cn"];

/// `<title>` of the identity provider's login page. Seeing it again after a
/// credential POST means the credentials were rejected.
pub const LOGIN_PAGE_TITLE: &str = "智慧东大--统一身份认证";

/// Origin of the academic administration system.
pub const EAMS_ORIGIN: &str = "http://219.216.96.4";

/// Grade history, POSTed with a `projectType` query parameter.
pub const GRADE_HISTORY_URL: &str =
    "http://219.216.96.4/eams/teach/grade/course/person!historyCourseGrade.action";
pub const GRADE_REFERER: &str =
    "http://219.216.96.4/eams/teach/grade/course/person!search.action?semesterId=111&projectType=";

/// Curriculum plan view, POSTed with a `planId` form field.
pub const PLAN_VIEW_URL: &str = "http://219.216.96.4/eams/studentMajorPlan!view.action";
pub const PLAN_REFERER: &str = "http://219.216.96.4/eams/studentMajorPlan!search.action";

/// Default CAS service for the academic system.
pub const DEFAULT_SERVICE_URL: &str = "http://219.216.96.4/eams/homeExt.action";
