use anchor_lang::prelude::*;

#[event]
pub struct GatekeeperInitialized {
    pub gatekeeper: Pubkey,
    pub authority: Pubkey,
    pub timestamp: i64,
}

#[event]
pub struct CodeHashBanned {
    pub gatekeeper: Pubkey,
    pub code_hash: [u8; 32],
    pub banned_by: Pubkey,
    pub timestamp: i64,
}

#[event]
pub struct CodeHashUnbanned {
    pub gatekeeper: Pubkey,
    pub code_hash: [u8; 32],
    pub unbanned_by: Pubkey,
    pub timestamp: i64,
}

#[event]
pub struct ContractDeployed {
    pub gatekeeper: Pubkey,
    pub deployer: Pubkey,
    pub deployment: Pubkey,
    pub code_hash: [u8; 32],
    pub timestamp: i64,
}

#[event]
pub struct DeploymentsPaused {
    pub gatekeeper: Pubkey,
    pub paused_by: Pubkey,
    pub timestamp: i64,
}

#[event]
pub struct DeploymentsUnpaused {
    pub gatekeeper: Pubkey,
    pub unpaused_by: Pubkey,
    pub timestamp: i64,
}
