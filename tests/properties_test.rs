//! Property tests for fingerprinting, Merkle proofs and SCT binding

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use proptest::prelude::*;

use ct_service::certificate::{fingerprint, CertificateDescriptor, CertificateInput, Fingerprint};
use ct_service::merkle::{verify_inclusion, MerkleHash, MerkleLog};
use ct_service::sct::{LogId, LogKey, Sct, SctIssuer, SctVerifier, SCT_VERSION_V1};

fn arb_der() -> impl Strategy<Value = Vec<u8>> {
    prop::collection::vec(any::<u8>(), 1..256)
}

fn arb_log(max: usize) -> impl Strategy<Value = Vec<Vec<u8>>> {
    prop::collection::vec(prop::collection::vec(any::<u8>(), 0..16), 1..max)
}

fn build(leaves: &[Vec<u8>]) -> MerkleLog {
    MerkleLog::from_fingerprints(
        leaves
            .iter()
            .map(|l| Fingerprint::of_der(l))
            .collect::<Vec<_>>()
            .iter(),
    )
}

fn pem_of(der: &[u8]) -> String {
    format!(
        "-----BEGIN CERTIFICATE-----\n{}\n-----END CERTIFICATE-----\n",
        STANDARD.encode(der)
    )
}

fn flip(hash: &MerkleHash, byte: usize, mask: u8) -> MerkleHash {
    let mut bytes = *hash.as_bytes();
    bytes[byte % bytes.len()] ^= mask;
    MerkleHash::from_bytes(bytes)
}

proptest! {
    #[test]
    fn fingerprint_agrees_across_forms(der in arb_der()) {
        let expected = Fingerprint::of_der(&der);
        let b64 = STANDARD.encode(&der);

        let forms = vec![
            CertificateInput::from_der(der.clone()),
            CertificateInput::Encoded(b64.clone()),
            CertificateInput::Encoded(pem_of(&der)),
            CertificateInput::Descriptor(CertificateDescriptor {
                der: Some(b64.clone()),
                ..Default::default()
            }),
            CertificateInput::Descriptor(CertificateDescriptor {
                pem: Some(pem_of(&der)),
                ..Default::default()
            }),
            CertificateInput::Descriptor(CertificateDescriptor {
                chain: vec![b64.clone(), STANDARD.encode(b"issuer")],
                ..Default::default()
            }),
        ];
        for form in &forms {
            prop_assert_eq!(fingerprint(form).unwrap(), expected.clone());
            prop_assert_eq!(fingerprint(form).unwrap(), fingerprint(form).unwrap());
        }
    }

    #[test]
    fn every_proof_verifies_at_every_size(leaves in arb_log(40)) {
        let log = build(&leaves);
        for size in 1..=log.size() {
            let root = log.root_at(size).unwrap();
            for index in 0..size {
                let proof = log.prove_inclusion_at(index, size).unwrap();
                prop_assert!(verify_inclusion(&proof, &root));
            }
        }
    }

    #[test]
    fn single_byte_mutation_rejected(
        leaves in arb_log(40),
        pick in any::<prop::sample::Index>(),
        target in any::<prop::sample::Index>(),
        byte in 0usize..32,
        mask in 1u8..=255,
    ) {
        let log = build(&leaves);
        let index = pick.index(leaves.len()) as u64;
        let root = log.root().unwrap();
        let proof = log.prove_inclusion(index).unwrap();

        // Slot 0 is the leaf hash, the rest are siblings
        let slot = target.index(proof.siblings.len() + 1);
        let mut mutated = proof.clone();
        if slot == 0 {
            mutated.leaf_hash = flip(&mutated.leaf_hash, byte, mask);
        } else {
            let step = &mut mutated.siblings[slot - 1];
            step.hash = flip(&step.hash, byte, mask);
        }
        prop_assert!(!verify_inclusion(&mutated, &root));
    }

    #[test]
    fn truncated_or_padded_proof_rejected(leaves in arb_log(40), pick in any::<prop::sample::Index>()) {
        let log = build(&leaves);
        let index = pick.index(leaves.len()) as u64;
        let root = log.root().unwrap();
        let proof = log.prove_inclusion(index).unwrap();

        if !proof.siblings.is_empty() {
            let mut truncated = proof.clone();
            truncated.siblings.pop();
            prop_assert!(!verify_inclusion(&truncated, &root));
        }
        let mut padded = proof.clone();
        padded.siblings.push(proof.siblings.first().cloned().unwrap_or(ct_service::merkle::ProofStep {
            hash: root,
            side: ct_service::merkle::Side::Right,
        }));
        prop_assert!(!verify_inclusion(&padded, &root));
    }

    #[test]
    fn append_grows_by_one_and_moves_root(leaves in arb_log(60)) {
        let mut log = MerkleLog::new();
        let mut previous = None;
        for (i, leaf) in leaves.iter().enumerate() {
            let (index, root) = log.append(&Fingerprint::of_der(leaf));
            prop_assert_eq!(index, i as u64);
            prop_assert_eq!(log.size(), i as u64 + 1);
            prop_assert_eq!(log.root(), Some(root));
            if let Some(prev) = previous {
                prop_assert_ne!(prev, root);
            }
            previous = Some(root);
        }
    }

    #[test]
    fn root_is_pure_function_of_leaves(leaves in arb_log(40)) {
        let incremental = {
            let mut log = MerkleLog::new();
            for leaf in &leaves {
                log.append(&Fingerprint::of_der(leaf));
            }
            log.root()
        };
        prop_assert_eq!(incremental, build(&leaves).root());
    }

    #[test]
    fn forged_sct_rejected(
        domain in "[a-z]{1,12}\\.example",
        der in arb_der(),
        timestamp in any::<u64>(),
        tag in prop::array::uniform32(any::<u8>()),
        forger_key in prop::array::uniform32(any::<u8>()),
    ) {
        let secret = [0x5au8; 32];
        prop_assume!(forger_key != secret);

        let verifier = SctVerifier::new(LogKey::from_bytes(secret), "property-log");
        let log_id = LogId::from_name("property-log");
        let fp = Fingerprint::of_der(&der);

        // Arbitrary tag bytes
        let guessed = Sct {
            version: SCT_VERSION_V1,
            log_id,
            timestamp,
            signature: hex::encode(tag),
        };
        prop_assert!(!verifier.verify(&guessed, &domain, &fp, &log_id));

        // Correct construction under the wrong key
        let forger = SctIssuer::new(LogKey::from_bytes(forger_key), "property-log");
        let forged = forger.issue(&domain, &fp).unwrap();
        prop_assert!(!verifier.verify(&forged, &domain, &fp, &log_id));
    }
}
