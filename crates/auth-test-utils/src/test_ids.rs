//! Fixed test IDs for deterministic tests

// User IDs
pub const TEST_USER_ALICE: &str = "user-alice";
pub const TEST_USER_BOB: &str = "user-bob";
pub const TEST_USER_CHARLIE: &str = "user-charlie";

/// Scenario user from the issue/rotate/replay walkthrough.
pub const TEST_USER_U1: &str = "u1";

/// A well-formed refresh secret that was never issued (base64 of 32 bytes).
pub const TEST_UNISSUED_REFRESH_SECRET: &str = "AAECAwQFBgcICQoLDA0ODxAREhMUFRYXGBkaGxwdHh8=";

/// bcrypt cost used by tests (the minimum the service accepts).
pub const TEST_BCRYPT_COST: u32 = 10;
