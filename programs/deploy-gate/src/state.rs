use anchor_lang::prelude::*;
use anchor_lang::solana_program::keccak;

use crate::constants::NULL_CODE_HASH;
use crate::errors::DeployGateError;

/// Installation switch. Transitions are administrator-driven and unconditional.
#[derive(AnchorSerialize, AnchorDeserialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum PauseState {
    #[default]
    Active,
    Paused,
}

#[account]
pub struct Gatekeeper {
    pub authority: Pubkey,
    pub state: PauseState,
    pub deployments: u64,
    pub bump: u8,
}

impl Gatekeeper {
    pub const INIT_SPACE: usize = 32 + 1 + 8 + 1;

    pub fn require_authority(&self, caller: &Pubkey) -> Result<()> {
        require_keys_eq!(*caller, self.authority, DeployGateError::Unauthorized);
        Ok(())
    }

    pub fn is_paused(&self) -> bool {
        self.state == PauseState::Paused
    }

    pub fn pause(&mut self) {
        self.state = PauseState::Paused;
    }

    pub fn unpause(&mut self) {
        self.state = PauseState::Active;
    }

    /// Runs the install preconditions and returns the code hash.
    ///
    /// The pause switch is checked before the blob is hashed. `is_banned` is
    /// only consulted once the hash is known.
    pub fn screen_install<F>(&self, code: &[u8], is_banned: F) -> Result<[u8; 32]>
    where
        F: FnOnce(&[u8; 32]) -> Result<bool>,
    {
        require!(!self.is_paused(), DeployGateError::DeploymentsPaused);
        require!(!code.is_empty(), DeployGateError::EmptyCode);

        let hash = code_hash(code);
        require!(!is_banned(&hash)?, DeployGateError::CodeHashBanned);
        Ok(hash)
    }

    pub fn record_deployment(&mut self) -> Result<u64> {
        let index = self.deployments;
        self.deployments = index.checked_add(1).ok_or(DeployGateError::Overflow)?;
        Ok(index)
    }
}

pub fn code_hash(code: &[u8]) -> [u8; 32] {
    keccak::hash(code).to_bytes()
}

/// Seeds: [b"banned", gatekeeper.key().as_ref(), code_hash.as_ref()]
#[account]
pub struct BannedCodeHash {
    pub gatekeeper: Pubkey,
    pub code_hash: [u8; 32],
    pub is_banned: bool,
    pub bump: u8,
}

impl BannedCodeHash {
    pub const INIT_SPACE: usize = 32 + 32 + 1 + 1;

    pub fn is_banned(&self) -> bool {
        self.is_banned
    }

    pub fn ban(&mut self, gatekeeper: Pubkey, code_hash: [u8; 32], bump: u8) -> Result<()> {
        require!(
            code_hash != NULL_CODE_HASH,
            DeployGateError::InvalidCodeHash
        );
        require!(!self.is_banned, DeployGateError::AlreadyBanned);

        self.gatekeeper = gatekeeper;
        self.code_hash = code_hash;
        self.is_banned = true;
        self.bump = bump;
        Ok(())
    }

    pub fn unban(&mut self) -> Result<()> {
        require!(self.is_banned, DeployGateError::NotBanned);
        self.is_banned = false;
        Ok(())
    }
}

/// Installed code blob. The account address is the deployment handle.
#[account]
pub struct DeployedCode {
    pub gatekeeper: Pubkey,
    pub deployer: Pubkey,
    pub code_hash: [u8; 32],
    pub index: u64,
    pub code: Vec<u8>,
}

impl DeployedCode {
    pub fn space(code_len: usize) -> usize {
        8 + 32 + 32 + 32 + 8 + 4 + code_len
    }
}
