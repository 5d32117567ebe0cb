use std::time::Duration;

use serde::{Deserialize, Serialize};
use uniquote_common::{
    models::{
        network::{ContractOverrides, NetworkDetails},
        ProtocolVersion,
    },
    QuoterError,
};

/// Longest supported chain of intermediaries. Batches grow quadratically with the number of base
/// tokens above one hop.
pub const MAX_SUPPORTED_HOPS: usize = 2;

/// Tunables of a quoting engine.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct QuoterSettings {
    /// Protocol versions routes are enumerated and quoted for.
    pub protocol_versions: Vec<ProtocolVersion>,
    /// Only quote the direct pair.
    pub disable_multihop: bool,
    /// Maximum number of intermediary tokens in a route.
    pub max_hops: usize,
    /// How long an emitted watcher quote stays valid. Once lapsed, the next block emits even if
    /// nothing moved.
    pub quote_ttl: Duration,
    /// Relative price move below which the watcher considers a quote unchanged. Zero emits on any
    /// difference.
    pub price_tolerance: f64,
    pub contract_overrides: ContractOverrides,
    /// Replaces the built-in chain registry, for chains that are not supported out of the box.
    pub custom_network: Option<NetworkDetails>,
}

impl Default for QuoterSettings {
    fn default() -> Self {
        Self {
            protocol_versions: ProtocolVersion::ALL.to_vec(),
            disable_multihop: false,
            max_hops: 1,
            quote_ttl: Duration::from_secs(20 * 60),
            price_tolerance: 0.0,
            contract_overrides: ContractOverrides::default(),
            custom_network: None,
        }
    }
}

impl QuoterSettings {
    pub fn protocol_versions(mut self, versions: &[ProtocolVersion]) -> Self {
        self.protocol_versions = versions.to_vec();
        self
    }

    pub fn disable_multihop(mut self, disable_multihop: bool) -> Self {
        self.disable_multihop = disable_multihop;
        self
    }

    pub fn max_hops(mut self, max_hops: usize) -> Self {
        self.max_hops = max_hops;
        self
    }

    pub fn quote_ttl(mut self, quote_ttl: Duration) -> Self {
        self.quote_ttl = quote_ttl;
        self
    }

    pub fn price_tolerance(mut self, price_tolerance: f64) -> Self {
        self.price_tolerance = price_tolerance;
        self
    }

    pub fn contract_overrides(mut self, overrides: ContractOverrides) -> Self {
        self.contract_overrides = overrides;
        self
    }

    pub fn custom_network(mut self, network: NetworkDetails) -> Self {
        self.custom_network = Some(network);
        self
    }

    /// Enabled versions, deduplicated, v2 first.
    pub fn enabled_versions(&self) -> Vec<ProtocolVersion> {
        let mut versions = self.protocol_versions.clone();
        versions.sort();
        versions.dedup();
        versions
    }

    pub fn validate(&self) -> Result<(), QuoterError> {
        if self.protocol_versions.is_empty() {
            return Err(QuoterError::ConfigurationError(
                "At least one protocol version must be enabled".to_string(),
            ));
        }
        if self.max_hops > MAX_SUPPORTED_HOPS {
            return Err(QuoterError::ConfigurationError(format!(
                "max_hops must be at most {MAX_SUPPORTED_HOPS}, got {}",
                self.max_hops
            )));
        }
        if !self.price_tolerance.is_finite() || self.price_tolerance < 0.0 {
            return Err(QuoterError::ConfigurationError(format!(
                "price_tolerance must be a non-negative number, got {}",
                self.price_tolerance
            )));
        }
        Ok(())
    }
}
