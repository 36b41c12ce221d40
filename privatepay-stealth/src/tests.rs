//! Pinned vectors and end-to-end flows.

use privatepay_core::constants::DOMAIN_EPHEMERAL_SEED;
use privatepay_core::types::{EthAddress, PaymentAnnouncement};
use privatepay_crypto::derive::address_from_secret_key;
use privatepay_crypto::keys::keypair_from_seed;

use crate::engine::StealthAddressEngine;
use crate::wallet::PrivatePayWallet;

const SEED: &[u8] = b"privatepay test seed";
const EPHEMERAL_SEED: &[u8] = b"privatepay ephemeral seed";

const SPEND_PK: &str = "0x03eb278231229af3b4b17d19bc0407d9a448a6d1df8c280df67103cc7dbeca135e";
const VIEW_PK: &str = "0x022d757e819b2878c3ff7c155806695bce9981ab398650bbcab83623c7fa98e71d";
const EPHEMERAL_PK: &str = "0x03572237fa6cb3028ac0d3a84025586b90dad6aff065687cb107cb03cc8e293aef";

#[test]
fn test_seeded_keys_are_pinned() {
    let keys = StealthAddressEngine::default()
        .generate_meta_address_from_seed(SEED)
        .unwrap();
    assert_eq!(keys.spend.public.to_hex(), SPEND_PK);
    assert_eq!(keys.viewing.public.to_hex(), VIEW_PK);

    let ephemeral = keypair_from_seed(DOMAIN_EPHEMERAL_SEED, EPHEMERAL_SEED).unwrap();
    assert_eq!(ephemeral.public.to_hex(), EPHEMERAL_PK);
}

#[test]
fn test_pinned_stealth_address() {
    let engine = StealthAddressEngine::default();
    let keys = engine.generate_meta_address_from_seed(SEED).unwrap();
    let ephemeral = keypair_from_seed(DOMAIN_EPHEMERAL_SEED, EPHEMERAL_SEED).unwrap();

    let cases = [
        (
            0u32,
            230u8,
            "0x902Cdc23A4CF74E571fa577B10d7CCC0376EB268",
            "0x03af6f20c6ea35bfb7f3135f50bcd0685398f05b4ff3306e4af5beeca9cdddf057",
            "0x736908cc6252c0f96547e6b7d2273135aeaa90a935e9ebf82a6cb0ba50aa9072",
        ),
        (
            7,
            212,
            "0x12e1B824D3581Db621527945b8F57af9167930D5",
            "0x024e8aed4f18fae28b2eb6498632282c6c6a20fc92b5a6cb6726fb073dfd6d0ba5",
            "0x2027ceac00bcff0a9e287bcd00be3388d30914c8f6c340037c3596d10765827f",
        ),
    ];

    for (k, hint, address, stealth_pk, stealth_sk) in cases {
        let d = engine
            .generate_stealth_address_with_ephemeral(
                keys.spend.public.as_bytes(),
                keys.viewing.public.as_bytes(),
                k,
                &ephemeral.secret,
            )
            .unwrap();

        assert_eq!(d.view_hint, hint, "view hint for k={}", k);
        assert_eq!(d.stealth_address.to_string(), address);
        assert_eq!(d.stealth_public_key.to_hex(), stealth_pk);
        assert_eq!(d.ephemeral_public_key.to_hex(), EPHEMERAL_PK);

        let recovered = engine
            .recover_stealth_private_key(
                &keys.spend.secret,
                &keys.viewing.secret,
                d.ephemeral_public_key.as_bytes(),
                k,
            )
            .unwrap();
        assert_eq!(recovered.to_hex(), stealth_sk);
        assert_eq!(address_from_secret_key(&recovered).unwrap().to_string(), address);
    }
}

#[test]
fn test_full_payment_cycle_with_pinned_wallet() {
    let wallet = PrivatePayWallet::from_seed(SEED).unwrap();
    let ephemeral = keypair_from_seed(DOMAIN_EPHEMERAL_SEED, EPHEMERAL_SEED).unwrap();

    let announcement = PaymentAnnouncement::builder()
        .recipient(EthAddress::from_array([0x10; 20]))
        .ephemeral_pub_key(ephemeral.public.as_bytes().to_vec())
        .stealth_address(
            EthAddress::from_hex("0x902Cdc23A4CF74E571fa577B10d7CCC0376EB268").unwrap(),
        )
        .view_hint(230)
        .k(0)
        .amount(5 * 10u128.pow(17))
        .build()
        .unwrap();

    let found = wallet.try_discover(&announcement).unwrap().unwrap();
    assert_eq!(found.amount(), 5 * 10u128.pow(17));
    assert_eq!(
        found.private_key.to_hex(),
        "0x736908cc6252c0f96547e6b7d2273135aeaa90a935e9ebf82a6cb0ba50aa9072"
    );
}
