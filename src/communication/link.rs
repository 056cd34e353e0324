//! Link seam between the sync protocol and a transport.
//!
//! Outbound requests go through [`ParamLink`], a synchronous
//! fire-and-forget interface: a request that is handed over may still be
//! lost, and the retransmission guard covers that. Inbound values arrive
//! through [`ParamValueSource`].

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::error::LinkError;
use crate::parameters::{ComponentId, ParamRef, ParamValue};

/// Outbound half of a parameter link
pub trait ParamLink {
    /// Ask a component for its whole parameter table
    fn request_parameter_list(&mut self, component: ComponentId) -> Result<(), LinkError>;

    /// Ask a component for one parameter
    fn request_parameter(
        &mut self,
        component: ComponentId,
        target: &ParamRef,
    ) -> Result<(), LinkError>;

    /// Write a parameter value
    fn write_parameter(
        &mut self,
        component: ComponentId,
        name: &str,
        value: &ParamValue,
    ) -> Result<(), LinkError>;

    /// Ask the vehicle to copy its live parameters to persistent storage
    fn commit_persistent_storage(&mut self) -> Result<(), LinkError>;
}

impl<L: ParamLink + ?Sized> ParamLink for Box<L> {
    fn request_parameter_list(&mut self, component: ComponentId) -> Result<(), LinkError> {
        (**self).request_parameter_list(component)
    }

    fn request_parameter(
        &mut self,
        component: ComponentId,
        target: &ParamRef,
    ) -> Result<(), LinkError> {
        (**self).request_parameter(component, target)
    }

    fn write_parameter(
        &mut self,
        component: ComponentId,
        name: &str,
        value: &ParamValue,
    ) -> Result<(), LinkError> {
        (**self).write_parameter(component, name, value)
    }

    fn commit_persistent_storage(&mut self) -> Result<(), LinkError> {
        (**self).commit_persistent_storage()
    }
}

/// A parameter value reported by the vehicle (PARAM_VALUE)
#[derive(Debug, Clone, PartialEq)]
pub struct IncomingParamValue {
    /// Sending system id
    pub uas: u8,
    /// Sending component id
    pub component: ComponentId,
    /// Size of the component's parameter table
    pub total_count: u16,
    /// Position of this parameter in the table
    pub index: u16,
    pub name: String,
    pub value: ParamValue,
}

/// Inbound half of a parameter link
#[async_trait]
pub trait ParamValueSource: Send {
    /// Wait for the next parameter value
    ///
    /// Returns [`LinkError::Closed`] once no more values can arrive.
    async fn next_param_value(&mut self) -> Result<IncomingParamValue, LinkError>;
}

/// [`ParamValueSource`] fed through a tokio channel
///
/// Lets values come from any producer: a second transport, a replay file
/// or a test.
#[derive(Debug)]
pub struct ChannelParamSource {
    receiver: mpsc::Receiver<IncomingParamValue>,
}

impl ChannelParamSource {
    /// Create a source and the sender that feeds it
    pub fn new(capacity: usize) -> (mpsc::Sender<IncomingParamValue>, Self) {
        let (sender, receiver) = mpsc::channel(capacity.max(1));
        (sender, Self { receiver })
    }
}

#[async_trait]
impl ParamValueSource for ChannelParamSource {
    async fn next_param_value(&mut self) -> Result<IncomingParamValue, LinkError> {
        self.receiver.recv().await.ok_or(LinkError::Closed)
    }
}
