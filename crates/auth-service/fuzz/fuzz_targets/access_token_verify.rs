#![no_main]

use auth_service::config::SigningKeyMaterial;
use auth_service::crypto::{ExpiryPolicy, Signer};
use common::secret::SecretBox;
use libfuzzer_sys::fuzz_target;
use std::sync::OnceLock;

fn signer() -> Option<&'static Signer> {
    static SIGNER: OnceLock<Option<Signer>> = OnceLock::new();
    SIGNER
        .get_or_init(|| {
            let key = SigningKeyMaterial::Hmac(SecretBox::new(Box::new(vec![7u8; 32])));
            Signer::new(&key, 900).ok()
        })
        .as_ref()
}

fuzz_target!(|data: &[u8]| {
    let Some(signer) = signer() else {
        return;
    };

    if let Ok(token) = std::str::from_utf8(data) {
        // Arbitrary input must be rejected without panicking, under either policy.
        let _ = signer.verify(token, ExpiryPolicy::Enforce);
        let _ = signer.verify(token, ExpiryPolicy::Ignore);

        let _ = common::jwt::check_shape(token);
        let _ = common::jwt::peek_algorithm(token);
    }
});
