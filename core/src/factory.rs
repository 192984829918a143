//! Deployment Factory
//!
//! Resolves stream manager deployments from a factory contract that maps
//! deployer accounts to their manager instances.

use std::sync::Arc;

use serde_json::json;

use crate::address::Address;
use crate::error::StreamError;
use crate::manager::StreamManager;
use crate::provider::{decode, Call, Provider};

/// A handle to a stream manager factory contract.
#[derive(Clone)]
pub struct StreamFactory {
    address: Address,
    provider: Arc<dyn Provider>,
}

impl StreamFactory {
    /// Bind to a deployed factory through a provider.
    #[must_use]
    pub fn new(address: Address, provider: Arc<dyn Provider>) -> Self {
        Self { address, provider }
    }

    /// The factory's contract address.
    #[must_use]
    pub fn address(&self) -> Address {
        self.address
    }

    /// The stream manager deployed by `deployer`.
    ///
    /// The factory returns the zero address for unknown deployers; that is
    /// surfaced as [`StreamError::ManagerDoesNotExist`].
    pub async fn get_deployment(&self, deployer: Address) -> Result<StreamManager, StreamError> {
        let value = self
            .provider
            .read(Call::new(
                self.address,
                "deployments",
                vec![json!(deployer.to_string())],
            ))
            .await?;
        let manager = decode::address(&value, "deployments")?;

        if manager.is_zero() {
            return Err(StreamError::ManagerDoesNotExist { deployer });
        }

        Ok(StreamManager::new(manager, Arc::clone(&self.provider)))
    }
}

impl std::fmt::Debug for StreamFactory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StreamFactory")
            .field("address", &self.address)
            .field("provider", &self.provider.name())
            .finish()
    }
}
