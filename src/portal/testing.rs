//! Scripted [`Transport`] for unit tests.

use std::cell::RefCell;
use std::collections::VecDeque;

use crate::error::PortalError;
use crate::portal::session::{PageResponse, Redirects, Transport};

#[derive(Debug, Clone, PartialEq)]
pub struct Call {
    pub method: &'static str,
    pub url: String,
    pub form: Vec<(String, String)>,
    pub headers: Vec<(String, String)>,
    pub redirects: Redirects,
}

/// Replays canned responses in order and records every request.
pub struct ScriptedTransport {
    responses: RefCell<VecDeque<Result<PageResponse, PortalError>>>,
    calls: RefCell<Vec<Call>>,
}

impl ScriptedTransport {
    pub fn new(responses: Vec<Result<PageResponse, PortalError>>) -> Self {
        Self {
            responses: RefCell::new(responses.into()),
            calls: RefCell::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.borrow().clone()
    }

    fn next(&self, call: Call) -> Result<PageResponse, PortalError> {
        self.calls.borrow_mut().push(call);
        self.responses
            .borrow_mut()
            .pop_front()
            .unwrap_or_else(|| Err(PortalError::backend("script exhausted")))
    }
}

impl Transport for ScriptedTransport {
    fn get(&self, url: &str, redirects: Redirects) -> Result<PageResponse, PortalError> {
        self.next(Call {
            method: "GET",
            url: url.to_string(),
            form: Vec::new(),
            headers: Vec::new(),
            redirects,
        })
    }

    fn post_form(
        &self,
        url: &str,
        form: &[(&str, String)],
        headers: &[(&str, &str)],
        redirects: Redirects,
    ) -> Result<PageResponse, PortalError> {
        self.next(Call {
            method: "POST",
            url: url.to_string(),
            form: form.iter().map(|(k, v)| (k.to_string(), v.clone())).collect(),
            headers: headers.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect(),
            redirects,
        })
    }

    fn cookies_for(&self, _url: &str) -> Vec<(String, String)> {
        vec![("CASTGC".to_string(), "TGT-test".to_string())]
    }
}

pub fn page(status: u16, body: &str) -> PageResponse {
    PageResponse {
        status,
        url: "http://test.local/".to_string(),
        location: None,
        body: body.to_string(),
    }
}

pub fn redirect(location: &str) -> PageResponse {
    PageResponse {
        status: 302,
        url: "https://pass.neu.edu.cn/tpass/login".to_string(),
        location: Some(location.to_string()),
        body: String::new(),
    }
}
