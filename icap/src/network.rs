//! Network resolution

use std::collections::HashMap;

use crate::backend::NetworkRef;
use crate::errors::DomainError;

/// Look up `requested` among the networks the cluster knows about.
///
/// Callers must resolve the network before taking any irreversible action.
pub fn resolve_network(
    cluster_networks: &HashMap<String, NetworkRef>,
    requested: &str,
) -> Result<NetworkRef, DomainError> {
    cluster_networks
        .get(requested)
        .cloned()
        .ok_or_else(|| DomainError::InvalidNetwork(requested.to_string()))
}
