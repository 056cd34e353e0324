//! Parameter data model
//!
//! The data model is the authoritative store of what the ground station
//! believes is onboard and of what the operator changed locally. The sync
//! protocol never owns values: it asks the model what to send and tells it
//! what came back.

use std::collections::BTreeMap;

use super::{ComponentId, ParamValue};

/// Authoritative parameter value store
pub trait ParameterDataModel {
    /// Components with at least one known parameter
    fn components(&self) -> Vec<ComponentId>;

    /// Table index of a parameter, if it has been received before
    fn index_of(&self, component: ComponentId, name: &str) -> Option<u16>;

    /// Locally changed values not yet confirmed onboard, ordered by component then name
    fn pending_changes(&self) -> Vec<(ComponentId, String, ParamValue)>;

    /// Record a value the operator wants written
    fn record_pending(&mut self, component: ComponentId, name: &str, value: ParamValue);

    /// Store a value reported by the vehicle
    fn confirm_value(&mut self, component: ComponentId, index: u16, name: &str, value: ParamValue);
}

/// Last value reported by the vehicle
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OnboardParam {
    /// Table index assigned by the vehicle
    pub index: u16,
    /// Reported value
    pub value: ParamValue,
}

/// In-memory data model
///
/// A pending change is dropped once the vehicle reports the same value.
#[derive(Debug, Default)]
pub struct InMemoryDataModel {
    onboard: BTreeMap<ComponentId, BTreeMap<String, OnboardParam>>,
    pending: BTreeMap<ComponentId, BTreeMap<String, ParamValue>>,
}

impl InMemoryDataModel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the onboard value of a parameter
    pub fn get(&self, component: ComponentId, name: &str) -> Option<&OnboardParam> {
        self.onboard.get(&component)?.get(name)
    }

    /// Get parameter by table index
    pub fn get_by_index(&self, component: ComponentId, index: u16) -> Option<(&str, &OnboardParam)> {
        self.onboard
            .get(&component)?
            .iter()
            .find(|(_, p)| p.index == index)
            .map(|(name, p)| (name.as_str(), p))
    }

    /// Locally changed value awaiting confirmation
    pub fn pending(&self, component: ComponentId, name: &str) -> Option<ParamValue> {
        self.pending.get(&component)?.get(name).copied()
    }

    /// Number of onboard parameters known for a component
    pub fn count(&self, component: ComponentId) -> usize {
        self.onboard.get(&component).map_or(0, BTreeMap::len)
    }

    /// Onboard parameters of a component, ordered by table index
    pub fn params(&self, component: ComponentId) -> Vec<(&str, &OnboardParam)> {
        let mut params: Vec<_> = self
            .onboard
            .get(&component)
            .into_iter()
            .flat_map(|params| params.iter().map(|(name, p)| (name.as_str(), p)))
            .collect();
        params.sort_by_key(|(_, p)| p.index);
        params
    }

    /// Number of locally changed values across all components
    pub fn pending_count(&self) -> usize {
        self.pending.values().map(BTreeMap::len).sum()
    }
}

impl ParameterDataModel for InMemoryDataModel {
    fn components(&self) -> Vec<ComponentId> {
        self.onboard.keys().copied().collect()
    }

    fn index_of(&self, component: ComponentId, name: &str) -> Option<u16> {
        self.get(component, name).map(|p| p.index)
    }

    fn pending_changes(&self) -> Vec<(ComponentId, String, ParamValue)> {
        self.pending
            .iter()
            .flat_map(|(&component, params)| {
                params
                    .iter()
                    .map(move |(name, &value)| (component, name.clone(), value))
            })
            .collect()
    }

    fn record_pending(&mut self, component: ComponentId, name: &str, value: ParamValue) {
        self.pending
            .entry(component)
            .or_default()
            .insert(name.to_string(), value);
    }

    fn confirm_value(&mut self, component: ComponentId, index: u16, name: &str, value: ParamValue) {
        self.onboard
            .entry(component)
            .or_default()
            .insert(name.to_string(), OnboardParam { index, value });

        if let Some(params) = self.pending.get_mut(&component) {
            if params.get(name) == Some(&value) {
                params.remove(name);
            }
            if params.is_empty() {
                self.pending.remove(&component);
            }
        }
    }
}
