pub const GATEKEEPER_SEED: &[u8] = b"gatekeeper";
pub const BANNED_SEED: &[u8] = b"banned";
pub const DEPLOYMENT_SEED: &[u8] = b"deployment";

/// Reserved hash value; never a valid ban target.
pub const NULL_CODE_HASH: [u8; 32] = [0u8; 32];
