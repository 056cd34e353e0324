//! Recording link for host testing.
//!
//! Captures every outbound request instead of sending it, and can be
//! switched into a failing mode to exercise link-error handling.

use super::link::ParamLink;
use crate::error::LinkError;
use crate::parameters::{ComponentId, ParamRef, ParamValue};

/// An outbound request captured by [`MockLink`]
#[derive(Debug, Clone, PartialEq)]
pub enum LinkRequest {
    List {
        component: ComponentId,
    },
    Read {
        component: ComponentId,
        target: ParamRef,
    },
    Write {
        component: ComponentId,
        name: String,
        value: ParamValue,
    },
    Commit,
}

/// Recording [`ParamLink`]
#[derive(Debug, Default)]
pub struct MockLink {
    sent: Vec<LinkRequest>,
    failing: bool,
}

impl MockLink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every following request fail with [`LinkError::NotConnected`]
    ///
    /// Failed requests are still recorded.
    pub fn set_failing(&mut self, failing: bool) {
        self.failing = failing;
    }

    /// Requests captured so far
    pub fn sent(&self) -> &[LinkRequest] {
        &self.sent
    }

    /// Take and clear the captured requests
    pub fn take_sent(&mut self) -> Vec<LinkRequest> {
        std::mem::take(&mut self.sent)
    }

    /// Captured read requests, in order
    pub fn reads(&self) -> Vec<(ComponentId, ParamRef)> {
        self.sent
            .iter()
            .filter_map(|r| match r {
                LinkRequest::Read { component, target } => Some((*component, target.clone())),
                _ => None,
            })
            .collect()
    }

    /// Captured writes, in order
    pub fn writes(&self) -> Vec<(ComponentId, String, ParamValue)> {
        self.sent
            .iter()
            .filter_map(|r| match r {
                LinkRequest::Write {
                    component,
                    name,
                    value,
                } => Some((*component, name.clone(), *value)),
                _ => None,
            })
            .collect()
    }

    fn record(&mut self, request: LinkRequest) -> Result<(), LinkError> {
        self.sent.push(request);
        if self.failing {
            Err(LinkError::NotConnected)
        } else {
            Ok(())
        }
    }
}

impl ParamLink for MockLink {
    fn request_parameter_list(&mut self, component: ComponentId) -> Result<(), LinkError> {
        self.record(LinkRequest::List { component })
    }

    fn request_parameter(
        &mut self,
        component: ComponentId,
        target: &ParamRef,
    ) -> Result<(), LinkError> {
        self.record(LinkRequest::Read {
            component,
            target: target.clone(),
        })
    }

    fn write_parameter(
        &mut self,
        component: ComponentId,
        name: &str,
        value: &ParamValue,
    ) -> Result<(), LinkError> {
        self.record(LinkRequest::Write {
            component,
            name: name.to_string(),
            value: *value,
        })
    }

    fn commit_persistent_storage(&mut self) -> Result<(), LinkError> {
        self.record(LinkRequest::Commit)
    }
}
