//! Shared mock-world setup for scenario tests.

#![allow(dead_code)]

use std::time::Duration;

use flowpay_core::{Address, MockChain, StreamManager, TxContext, ValidatorBehavior};

/// Minimum stream life used across scenarios.
pub const MIN_STREAM_LIFE: Duration = Duration::from_secs(3600);

/// A deployed mock world: one accepted token, one manager, one payer.
pub struct World {
    pub chain: MockChain,
    pub manager: StreamManager,
    pub token: Address,
    pub payer: Address,
    pub controller: Address,
}

impl World {
    /// Deploy with the given validator set.
    pub fn with_validators(behaviors: &[ValidatorBehavior]) -> Self {
        let chain = MockChain::new();
        let controller = Address::from_low_u64(0xc0ff);
        let payer = Address::from_low_u64(0xaaaa);
        let token = chain.deploy_token(6);
        let validators: Vec<Address> = behaviors
            .iter()
            .map(|behavior| chain.deploy_validator(*behavior))
            .collect();
        let manager_address =
            chain.deploy_manager(controller, MIN_STREAM_LIFE, &[token], &validators);
        let manager = StreamManager::new(manager_address, chain.provider());

        Self {
            chain,
            manager,
            token,
            payer,
            controller,
        }
    }

    /// Deploy with one validator that prices deposits to last one hour.
    pub fn hourly() -> Self {
        Self::with_validators(&[ValidatorBehavior::FundingPeriod(3600)])
    }

    /// Mint and approve spending for the payer.
    pub fn fund_payer(&self, amount: u128) {
        self.chain.mint(self.token, self.payer, amount);
        self.chain
            .approve(self.token, self.payer, self.manager.address(), u128::MAX);
    }

    /// Transaction context for the payer.
    pub fn payer_ctx(&self) -> TxContext {
        TxContext::from_sender(self.payer)
    }

    /// Transaction context for the manager's controller.
    pub fn controller_ctx(&self) -> TxContext {
        TxContext::from_sender(self.controller)
    }
}
