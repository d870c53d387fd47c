mod common;

#[cfg(test)]
mod signing_tests {
    use std::sync::Arc;

    use cosmos_sdk_proto::cosmos::authz::v1beta1::{GenericAuthorization, Grant, MsgGrant};
    use cosmos_sdk_proto::cosmos::tx::signing::v1beta1::SignMode as ProtoSignMode;
    use cosmos_sdk_proto::cosmos::tx::v1beta1::mode_info::Sum;
    use cosmos_sdk_proto::cosmos::tx::v1beta1::{AuthInfo, TxBody};
    use cosmos_sdk_proto::Any;
    use prost::Message as ProstMessage;

    use keepkey_cosmos::registry::type_urls;
    use keepkey_cosmos::{
        Account, AminoTable, Coin, CosmosError, Fee, Message, MessageRegistry, NetworkProfile,
        SignMode, SignState, SigningOrchestrator,
    };

    use crate::common::{self, FakeDevice, DIRECT_SIGNATURE, LEGACY_SIGNATURE};

    fn orchestrator(profile: NetworkProfile, device: Arc<FakeDevice>) -> SigningOrchestrator {
        orchestrator_with_registry(profile, MessageRegistry::with_defaults(), device)
    }

    fn orchestrator_with_registry(
        profile: NetworkProfile,
        registry: MessageRegistry,
        device: Arc<FakeDevice>,
    ) -> SigningOrchestrator {
        let table = Arc::new(AminoTable::with_defaults(Arc::new(registry)));
        SigningOrchestrator::new(Arc::new(profile), table, device)
            .expect("Failed to build orchestrator")
    }

    fn account(address: &str) -> Account {
        Account {
            address: address.to_string(),
            account_number: 42,
            sequence: 7,
            pub_key: None,
        }
    }

    fn fee() -> Fee {
        Fee::new(vec![Coin::new("uatom", 5_000u64)], 200_000)
    }

    fn grant(granter: &str, grantee: &str) -> Message {
        let authorization = GenericAuthorization {
            msg: type_urls::MSG_SEND.to_string(),
        };
        Message::from_proto(
            type_urls::MSG_GRANT,
            &MsgGrant {
                granter: granter.to_string(),
                grantee: grantee.to_string(),
                grant: Some(Grant {
                    authorization: Some(Any {
                        type_url: type_urls::GENERIC_AUTHORIZATION.to_string(),
                        value: authorization.encode_to_vec(),
                    }),
                    expiration: None,
                }),
            },
        )
    }

    fn single_mode(auth_info: &AuthInfo) -> i32 {
        let mode_info = auth_info.signer_infos[0]
            .mode_info
            .clone()
            .expect("Failed to read mode info");
        match mode_info.sum {
            Some(Sum::Single(single)) => single.mode,
            other => panic!("Expected single signer mode, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_legacy_sign_uses_memo_returned_by_device() {
        common::init();
        let from = common::address(1);
        let to = common::address(2);
        let mut device = FakeDevice::new(true, true, &from);
        device.amended_memo = Some("edited on device".to_string());
        let device = Arc::new(device);
        let orchestrator = orchestrator(common::profile(), device.clone());

        let msgs = vec![common::send_msg(&from, &to, "1000")];
        let outcome = orchestrator
            .sign(&account(&from), &msgs, &fee(), "original memo")
            .await
            .expect("Failed to sign");

        assert_eq!(outcome.mode, SignMode::LegacyAminoJson);
        assert!(outcome.legacy_fallback_reason.is_none());
        assert_eq!(device.legacy_calls(), 1);
        assert_eq!(device.canonical_calls(), 0);
        assert_eq!(outcome.tx.signatures, vec![LEGACY_SIGNATURE.to_vec()]);

        // The device saw the original memo and the account numbers as strings
        let doc = device
            .last_legacy_doc
            .lock()
            .unwrap()
            .clone()
            .expect("Device never received a sign doc");
        assert_eq!(doc.memo, "original memo");
        assert_eq!(doc.chain_id, "cosmoshub-4");
        assert_eq!(doc.account_number, "42");
        assert_eq!(doc.sequence, "7");
        assert_eq!(doc.msgs[0]["type"], "cosmos-sdk/MsgSend");

        // The body is rebuilt with the memo the device signed
        let body = TxBody::decode(outcome.tx.body_bytes.as_slice()).expect("Failed to decode body");
        assert_eq!(body.memo, "edited on device");
        assert_eq!(body.messages.len(), 1);
        assert_eq!(body.messages[0].type_url, type_urls::MSG_SEND);

        let auth_info =
            AuthInfo::decode(outcome.tx.auth_info_bytes.as_slice()).expect("Failed to decode auth info");
        assert_eq!(single_mode(&auth_info), ProtoSignMode::LegacyAminoJson as i32);
        assert_eq!(auth_info.signer_infos[0].sequence, 7);

        assert_eq!(
            outcome.transitions,
            vec![
                SignState::Unsigned,
                SignState::LegacyAttempted,
                SignState::ModeSelected(SignMode::LegacyAminoJson),
                SignState::Signed(SignMode::LegacyAminoJson),
            ]
        );
    }

    #[tokio::test]
    async fn test_authz_without_amino_support_signs_direct_once() {
        common::init();
        let granter = common::address(1);
        let grantee = common::address(3);
        let device = Arc::new(FakeDevice::new(true, true, &granter));
        let profile = NetworkProfile {
            authz_amino_support: false,
            ..common::profile()
        };
        let orchestrator = orchestrator(profile, device.clone());

        let outcome = orchestrator
            .sign(&account(&granter), &[grant(&granter, &grantee)], &fee(), "")
            .await
            .expect("Failed to sign");

        assert_eq!(outcome.mode, SignMode::Direct);
        assert_eq!(device.legacy_calls(), 0);
        assert_eq!(device.canonical_calls(), 1);
        let reason = outcome
            .legacy_fallback_reason
            .expect("Fallback reason should be reported");
        assert!(reason.contains("authz"));
        assert_eq!(outcome.tx.signatures, vec![DIRECT_SIGNATURE.to_vec()]);

        let doc = device
            .last_direct_doc
            .lock()
            .unwrap()
            .clone()
            .expect("Device never received a sign doc");
        assert_eq!(doc.chain_id, "cosmoshub-4");
        assert_eq!(doc.account_number, 42);
        assert_eq!(doc.body_bytes, outcome.tx.body_bytes);

        let auth_info =
            AuthInfo::decode(outcome.tx.auth_info_bytes.as_slice()).expect("Failed to decode auth info");
        assert_eq!(single_mode(&auth_info), ProtoSignMode::Direct as i32);

        assert_eq!(
            outcome.transitions,
            vec![
                SignState::Unsigned,
                SignState::LegacyAttempted,
                SignState::ModeSelected(SignMode::Direct),
                SignState::Signed(SignMode::Direct),
            ]
        );
    }

    #[tokio::test]
    async fn test_legacy_only_device_cannot_sign_unconvertible_message() {
        common::init();
        let granter = common::address(1);
        let device = Arc::new(FakeDevice::new(true, false, &granter));
        let profile = NetworkProfile {
            authz_amino_support: false,
            ..common::profile()
        };
        let orchestrator = orchestrator(profile, device.clone());

        let result = orchestrator
            .sign(&account(&granter), &[grant(&granter, &common::address(3))], &fee(), "")
            .await;

        assert!(matches!(result, Err(CosmosError::NoSupportedSignMode)));
        assert_eq!(device.legacy_calls(), 0);
        assert_eq!(device.canonical_calls(), 0);
    }

    #[tokio::test]
    async fn test_opaque_message_falls_back_to_direct() {
        common::init();
        let from = common::address(1);
        let device = Arc::new(FakeDevice::new(true, true, &from));
        let mut registry = MessageRegistry::with_defaults();
        registry.register_opaque("/osmosis.gamm.v1beta1.MsgSwapExactAmountIn");
        let orchestrator = orchestrator_with_registry(common::profile(), registry, device.clone());

        let msgs = vec![Message::new(
            "/osmosis.gamm.v1beta1.MsgSwapExactAmountIn",
            vec![0x0a, 0x03, 0x61, 0x62, 0x63],
        )];
        let outcome = orchestrator
            .sign(&account(&from), &msgs, &fee(), "")
            .await
            .expect("Failed to sign");

        assert_eq!(outcome.mode, SignMode::Direct);
        assert!(outcome.legacy_fallback_reason.is_some());
        assert_eq!(device.canonical_calls(), 1);

        // Opaque payloads reach the body byte for byte
        let body = TxBody::decode(outcome.tx.body_bytes.as_slice()).expect("Failed to decode body");
        assert_eq!(body.messages[0].value, vec![0x0a, 0x03, 0x61, 0x62, 0x63]);
    }

    #[tokio::test]
    async fn test_unknown_type_fails_before_device_is_asked() {
        common::init();
        let from = common::address(1);
        let device = Arc::new(FakeDevice::new(true, true, &from));
        let orchestrator = orchestrator(common::profile(), device.clone());

        let msgs = vec![Message::new("/unknown.v1.MsgThing", vec![1, 2, 3])];
        let result = orchestrator.sign(&account(&from), &msgs, &fee(), "").await;

        assert!(matches!(result, Err(CosmosError::UnknownType(_))));
        assert_eq!(device.legacy_calls(), 0);
        assert_eq!(device.canonical_calls(), 0);
    }

    #[tokio::test]
    async fn test_zero_gas_fee_uses_default_limit() {
        common::init();
        let from = common::address(1);
        let device = Arc::new(FakeDevice::new(false, true, &from));
        let orchestrator = orchestrator(common::profile(), device);

        let zero_gas = Fee {
            amount: vec![Coin::new("uatom", 0u64)],
            gas_limit: 0,
        };
        let outcome = orchestrator
            .sign(&account(&from), &[common::send_msg(&from, &common::address(2), "1")], &zero_gas, "")
            .await
            .expect("Failed to sign");

        let auth_info =
            AuthInfo::decode(outcome.tx.auth_info_bytes.as_slice()).expect("Failed to decode auth info");
        let fee = auth_info.fee.expect("Auth info should carry a fee");
        assert_eq!(fee.gas_limit, keepkey_cosmos::fee::DEFAULT_GAS_LIMIT);
    }

    #[tokio::test]
    async fn test_simulate_envelope() {
        common::init();
        let from = common::address(1);
        let device = Arc::new(FakeDevice::new(true, true, &from));
        let orchestrator = orchestrator(common::profile(), device.clone());

        let tx = orchestrator
            .simulate(
                &account(&from),
                &[common::send_msg(&from, &common::address(2), "1")],
                &fee(),
                "memo",
            )
            .await
            .expect("Failed to build simulation tx");

        // Nothing is signed, but the signer's public key is still looked up
        assert_eq!(tx.signatures, vec![Vec::<u8>::new()]);
        assert_eq!(device.legacy_calls(), 0);
        assert_eq!(device.canonical_calls(), 0);

        let auth_info = AuthInfo::decode(tx.auth_info_bytes.as_slice()).expect("Failed to decode auth info");
        assert_eq!(single_mode(&auth_info), ProtoSignMode::Unspecified as i32);
        assert_eq!(auth_info.signer_infos[0].sequence, 7);
        let public_key = auth_info.signer_infos[0]
            .public_key
            .clone()
            .expect("Signer info should carry a public key");
        assert_eq!(public_key.type_url, "/cosmos.crypto.secp256k1.PubKey");
    }
}
