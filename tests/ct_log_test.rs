//! CT log end-to-end scenarios
//!
//! Append, verify, historical proofs, root tampering and concurrent access,
//! exercised through the public store and verification service.

mod common;

use common::{test_cert, test_fingerprint, test_service, test_store};
use ct_service::merkle::{verify_inclusion, MerkleHash};
use ct_service::verification::{MitmStatus, Verdict, VerificationRequest};

#[tokio::test]
async fn test_append_then_verify_is_valid() -> Result<(), Box<dyn std::error::Error>> {
    let service = test_service();
    let entry = service.store().append("a.example", &test_cert("a")).await?;
    assert_eq!(entry.fingerprint, test_fingerprint("a"));

    let request = VerificationRequest::new("a.example").with_fingerprint(entry.fingerprint.to_hex());
    let report = service.verify(&request).await;

    assert_eq!(report.verdict, Verdict::Valid);
    assert!(report.proof_valid);
    assert!(report.sct_valid);
    assert_eq!(report.domain, "a.example");
    assert_eq!(report.issued_at, Some(entry.issued_at));
    assert_eq!(report.root, service.store().snapshot().await.root);
    assert_eq!(report.mitm_status, MitmStatus::Safe);
    Ok(())
}

#[tokio::test]
async fn test_unknown_fingerprint_is_not_found() -> Result<(), Box<dyn std::error::Error>> {
    let service = test_service();
    service.store().append("a.example", &test_cert("a")).await?;

    let request = VerificationRequest::new("a.example").with_fingerprint("deadbeef".repeat(8));
    let report = service.verify(&request).await;

    assert_eq!(report.verdict, Verdict::NotFound);
    assert!(!report.proof_valid);
    assert!(report.issued_at.is_none());
    assert!(report.failure.is_none());
    Ok(())
}

#[tokio::test]
async fn test_fingerprint_from_other_domain_is_not_found() -> Result<(), Box<dyn std::error::Error>> {
    let service = test_service();
    service.store().append("a.example", &test_cert("a")).await?;

    let request = VerificationRequest::new("b.example").with_certificate(test_cert("a"));
    assert_eq!(service.verify(&request).await.verdict, Verdict::NotFound);
    Ok(())
}

#[tokio::test]
async fn test_historical_proofs_survive_later_appends() -> Result<(), Box<dyn std::error::Error>> {
    let store = test_store();
    let domains = ["a.example", "b.example", "c.example"];

    let mut captured = Vec::new();
    for i in 0..5 {
        let entry = store
            .append(domains[i % 3], &test_cert(&format!("cert-{}", i)))
            .await?;
        let snapshot = store.snapshot().await;
        let proof = store.prove_inclusion(entry.index).await?;
        let root = snapshot.root.ok_or("empty root after append")?;
        assert!(verify_inclusion(&proof, &root));
        captured.push((entry.index, snapshot.size, root, proof));
    }

    store.append("a.example", &test_cert("late-1")).await?;
    store.append("d.example", &test_cert("late-2")).await?;

    let view = store.view().await;
    for (index, size, root, proof) in &captured {
        // Proof issued back then still verifies against its own root
        assert!(verify_inclusion(proof, root));
        // And the log can reproduce both from its current state
        assert_eq!(view.root_at(*size)?, *root);
        let regenerated = view.prove_inclusion_at(*index, *size)?;
        assert_eq!(&regenerated, proof);
    }
    assert_eq!(view.snapshot().size, 7);
    Ok(())
}

#[tokio::test]
async fn test_wrong_root_invalidates_proof() -> Result<(), Box<dyn std::error::Error>> {
    let service = test_service();
    let entry = service.store().append("a.example", &test_cert("a")).await?;
    service.store().append("b.example", &test_cert("b")).await?;

    let proof = service.store().prove_inclusion(entry.index).await?;
    let root = service.store().snapshot().await.root.ok_or("empty root")?;
    assert!(verify_inclusion(&proof, &root));

    let mut bytes = *root.as_bytes();
    bytes[0] ^= 0x80;
    let tampered = MerkleHash::from_bytes(bytes);
    assert!(!verify_inclusion(&proof, &tampered));

    let request = VerificationRequest::new("a.example").with_certificate(test_cert("a"));
    let report = service.verify_against_root(&request, tampered, proof.tree_size).await;
    assert_eq!(report.verdict, Verdict::Tampered);
    assert!(!report.proof_valid);
    assert_eq!(report.mitm_status, MitmStatus::Danger);
    Ok(())
}

#[tokio::test]
async fn test_earlier_published_root_verifies_after_appends() -> Result<(), Box<dyn std::error::Error>> {
    let service = test_service();
    service.store().append("a.example", &test_cert("a")).await?;
    let published = service.store().snapshot().await;
    let published_root = published.root.ok_or("empty root")?;
    service.store().append("b.example", &test_cert("b")).await?;

    let request = VerificationRequest::new("a.example").with_certificate(test_cert("a"));
    let report = service
        .verify_against_root(&request, published_root, published.size)
        .await;
    assert_eq!(report.verdict, Verdict::Valid, "{}", report.message);
    assert!(report.proof_valid);
    assert_eq!(report.tree_size, published.size);
    assert_eq!(report.root, Some(published_root));

    // The log kept growing, but a forged root at the published size is still caught
    let mut bytes = *published_root.as_bytes();
    bytes[31] ^= 0x01;
    let forged = MerkleHash::from_bytes(bytes);
    let report = service.verify_against_root(&request, forged, published.size).await;
    assert_eq!(report.verdict, Verdict::Tampered);
    Ok(())
}

#[tokio::test]
async fn test_same_certificate_on_two_domains() -> Result<(), Box<dyn std::error::Error>> {
    let service = test_service();
    let first = service.store().append("a.example", &test_cert("shared")).await?;
    let second = service.store().append("b.example", &test_cert("shared")).await?;
    assert_eq!(first.fingerprint, second.fingerprint);

    for (domain, index) in [("a.example", 0), ("b.example", 1)] {
        let report = service
            .verify(&VerificationRequest::new(domain).with_certificate(test_cert("shared")))
            .await;
        assert_eq!(report.verdict, Verdict::Valid);
        assert_eq!(report.leaf_index, Some(index));
    }
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_verifies_see_consistent_snapshots() -> Result<(), Box<dyn std::error::Error>>
{
    let service = test_service();
    for i in 0..4 {
        service
            .store()
            .append("seed.example", &test_cert(&format!("seed-{}", i)))
            .await?;
    }

    let writer = {
        let store = service.store().clone();
        tokio::spawn(async move {
            for i in 0..40 {
                store
                    .append("busy.example", &test_cert(&format!("busy-{}", i)))
                    .await
                    .map(|_| ())?;
                tokio::task::yield_now().await;
            }
            Ok::<(), ct_service::CtError>(())
        })
    };

    let mut readers = Vec::new();
    for i in 0..32 {
        let service = service.clone();
        readers.push(tokio::spawn(async move {
            let request = VerificationRequest::new("seed.example")
                .with_certificate(test_cert(&format!("seed-{}", i % 4)));
            service.verify(&request).await
        }));
    }

    let mut reports = Vec::new();
    for reader in readers {
        reports.push(reader.await?);
    }
    writer.await??;

    let view = service.store().view().await;
    for report in &reports {
        assert_eq!(report.verdict, Verdict::Valid, "{}", report.message);
        assert!(report.tree_size >= 4 && report.tree_size <= 44);

        // The reported root is exactly the root the log had at the reported size
        let root = report.root.ok_or("missing root")?;
        assert_eq!(view.root_at(report.tree_size)?, root);

        let proof = report.proof.as_ref().ok_or("missing proof")?;
        assert_eq!(proof.tree_size, report.tree_size);
        assert!(verify_inclusion(proof, &root));
    }
    drop(view);

    let snapshot = service.store().check_integrity().await?;
    assert_eq!(snapshot.size, 44);
    Ok(())
}

#[tokio::test]
async fn test_reset_clears_everything() -> Result<(), Box<dyn std::error::Error>> {
    let service = test_service();
    service.store().append("a.example", &test_cert("a")).await?;
    service.store().reset().await;

    let report = service
        .verify(&VerificationRequest::new("a.example").with_certificate(test_cert("a")))
        .await;
    assert_eq!(report.verdict, Verdict::NotFound);
    assert_eq!(report.tree_size, 0);
    assert_eq!(report.root, None);
    Ok(())
}
