use anchor_lang::prelude::*;

#[error_code]
pub enum DeployGateError {
    #[msg("Caller is not the gatekeeper administrator")]
    Unauthorized,

    #[msg("Cannot ban the empty code hash")]
    InvalidCodeHash,

    #[msg("Code hash already banned")]
    AlreadyBanned,

    #[msg("Code hash not banned")]
    NotBanned,

    #[msg("Deployments are paused")]
    DeploymentsPaused,

    #[msg("Empty code")]
    EmptyCode,

    #[msg("Code hash is banned")]
    CodeHashBanned,

    #[msg("Installation failed")]
    InstallationFailed,

    #[msg("Ban record does not match the code hash")]
    InvalidBanRecord,

    #[msg("Deployment account does not match the next deployment address")]
    InvalidDeploymentAccount,

    #[msg("Arithmetic overflow")]
    Overflow,
}
