//! Page visit input.

use crate::error::{Error, Result};
use crate::{MAX_PAGE_LEN, MAX_USER_AGENT_LEN, MAX_VISITOR_IP_LEN};

/// A page visit to be appended to the visit log.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NewPageVisit {
    /// Visited page path.
    pub page: String,
    /// Visitor network address, if known.
    pub visitor_ip: Option<String>,
    /// Visitor user agent, if sent.
    pub user_agent: Option<String>,
}

impl NewPageVisit {
    /// Create a visit for `page` with no visitor details.
    pub fn new(page: impl Into<String>) -> Self {
        Self {
            page: page.into(),
            visitor_ip: None,
            user_agent: None,
        }
    }

    pub fn with_visitor_ip(mut self, ip: impl Into<String>) -> Self {
        self.visitor_ip = Some(ip.into());
        self
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = Some(user_agent.into());
        self
    }

    /// Check the visit against the visit-log column limits.
    pub fn validate(&self) -> Result<()> {
        if self.page.is_empty() {
            return Err(Error::InvalidVisit("page cannot be empty".to_string()));
        }
        check_len("page", &self.page, MAX_PAGE_LEN)?;
        if let Some(ip) = &self.visitor_ip {
            check_len("visitor_ip", ip, MAX_VISITOR_IP_LEN)?;
        }
        if let Some(user_agent) = &self.user_agent {
            check_len("user_agent", user_agent, MAX_USER_AGENT_LEN)?;
        }
        Ok(())
    }
}

fn check_len(field: &str, value: &str, max: usize) -> Result<()> {
    let len = value.chars().count();
    if len > max {
        return Err(Error::InvalidVisit(format!(
            "{field} is {len} characters, maximum is {max}"
        )));
    }
    Ok(())
}
