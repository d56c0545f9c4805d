//! End-to-end node tests: consensus commit, round abandonment, and the
//! cross-cluster attestation path, all driven through the public node
//! surface with synthetic time.

use lattice_attestor::sign_attestation;
use lattice_crypto::{derive_address, keypair_from_seed};
use lattice_instructions::{Instruction, InstructionKind};
use lattice_ledger::{AccountSnapshot, ClusterSnapshot};
use lattice_messages::{
    AttestationMessage, MessageHeader, MessageKind,
};
use lattice_network::encode_frame;
use lattice_node::config::{ClusterConfig, DelegateEntry, GenesisAccount, TrustedPeerEntry};
use lattice_node::{LatticeNode, NodeConfig};
use lattice_types::{
    ClusterId, InstructionStatus, KeyPair, ProtocolParams, Timestamp,
};

const IDENTITY_SEED: [u8; 32] = [1; 32];
const SENDER_SEED: [u8; 32] = [10; 32];
const RECIPIENT_SEED: [u8; 32] = [11; 32];

fn identity_keys() -> KeyPair {
    keypair_from_seed(&IDENTITY_SEED)
}

fn sender_keys() -> KeyPair {
    keypair_from_seed(&SENDER_SEED)
}

fn cluster_config(name: &str, trusted_peers: Vec<TrustedPeerEntry>) -> ClusterConfig {
    ClusterConfig {
        cluster_id: name.to_string(),
        member: true,
        params: ProtocolParams::default(),
        delegates: vec![DelegateEntry {
            public_key: hex::encode(identity_keys().public.as_bytes()),
            stake: 100,
        }],
        trusted_peers,
        genesis_accounts: vec![GenesisAccount {
            public_key: hex::encode(sender_keys().public.as_bytes()),
            balance: 10_000,
        }],
    }
}

fn node_config(clusters: Vec<ClusterConfig>) -> NodeConfig {
    NodeConfig {
        node_seed: hex::encode(IDENTITY_SEED),
        data_dir: "./lattice_test_data".into(),
        port: 0,
        max_peers: 8,
        bootstrap_peers: vec![],
        enable_rpc: false,
        rpc_port: 0,
        log_level: "warn".into(),
        log_format: "human".into(),
        tick_interval_ms: 100,
        clusters,
    }
}

fn transfer(nonce: u64, amount: u128) -> Instruction {
    let sender = sender_keys();
    Instruction::new_signed(
        InstructionKind::transfer(),
        derive_address(&sender.public),
        derive_address(&keypair_from_seed(&RECIPIENT_SEED).public),
        amount,
        Vec::new(),
        nonce,
        &sender,
    )
}

#[test]
fn local_transfer_commits_through_consensus() {
    let node = LatticeNode::build(node_config(vec![cluster_config("pay", vec![])])).unwrap();
    let cluster = ClusterId::new("pay");

    let instruction = transfer(1, 1_000);
    let id = instruction.id;
    let receipt = node.submit_instruction(&cluster, instruction).unwrap();
    assert_eq!(receipt.id, id);
    assert_eq!(receipt.fee, 2); // 25 bps of 1000
    assert_eq!(
        node.status_of(&cluster, &id).unwrap(),
        Some(InstructionStatus::Validated)
    );

    // Tick 1: our turn, single delegate — propose and self-vote.
    node.tick_cluster(&cluster, Timestamp::new(100));
    // Tick 2: 100 of 100 stake voted, quorum met — finalize and commit.
    node.tick_cluster(&cluster, Timestamp::new(101));

    assert_eq!(
        node.status_of(&cluster, &id).unwrap(),
        Some(InstructionStatus::Committed)
    );
    let sender = node
        .account_of(&cluster, &derive_address(&sender_keys().public))
        .unwrap()
        .unwrap();
    assert_eq!(sender.balance, 10_000 - 1_000 - 2);
    assert_eq!(sender.nonce, 1);
    let recipient = node
        .account_of(
            &cluster,
            &derive_address(&keypair_from_seed(&RECIPIENT_SEED).public),
        )
        .unwrap()
        .unwrap();
    assert_eq!(recipient.balance, 1_000);
    assert_eq!(node.metrics.blocks_finalized.get(), 1);
    assert_eq!(node.metrics.instructions_committed.get(), 1);
}

#[test]
fn duplicate_submission_is_rejected_after_commit() {
    let node = LatticeNode::build(node_config(vec![cluster_config("pay", vec![])])).unwrap();
    let cluster = ClusterId::new("pay");

    let instruction = transfer(1, 1_000);
    node.submit_instruction(&cluster, instruction.clone()).unwrap();
    node.tick_cluster(&cluster, Timestamp::new(100));
    node.tick_cluster(&cluster, Timestamp::new(101));

    // Identical content: identical id — replay.
    let err = node
        .submit_instruction(&cluster, instruction)
        .unwrap_err();
    assert!(err.to_string().contains("already committed"));
}

#[test]
fn round_without_quorum_is_abandoned() {
    let mut config = cluster_config("pay", vec![]);
    // A second, heavier delegate that never votes: our 30 of 100 cannot
    // reach the 67 quorum alone.
    config.delegates = vec![
        DelegateEntry {
            public_key: hex::encode(identity_keys().public.as_bytes()),
            stake: 30,
        },
        DelegateEntry {
            public_key: hex::encode(keypair_from_seed(&[2; 32]).public.as_bytes()),
            stake: 70,
        },
    ];
    let node = LatticeNode::build(node_config(vec![config])).unwrap();
    let cluster = ClusterId::new("pay");

    let instruction = transfer(1, 1_000);
    let id = instruction.id;
    node.submit_instruction(&cluster, instruction).unwrap();

    node.tick_cluster(&cluster, Timestamp::new(100)); // proposes, votes 30
    node.tick_cluster(&cluster, Timestamp::new(103)); // deadline not reached
    assert_eq!(node.metrics.rounds_abandoned.get(), 0);

    node.tick_cluster(&cluster, Timestamp::new(106)); // 6s > 5s deadline
    assert_eq!(node.metrics.rounds_abandoned.get(), 1);
    assert_eq!(node.metrics.blocks_finalized.get(), 0);
    // The instruction returned to the pool; it is not committed.
    assert_eq!(
        node.status_of(&cluster, &id).unwrap(),
        Some(InstructionStatus::Validated)
    );
}

// ── Cross-cluster ──────────────────────────────────────────────────────

struct PeerFixture {
    name: &'static str,
    keys: KeyPair,
    weight: u128,
}

fn audit_peers() -> Vec<PeerFixture> {
    // The spec's worked example: trusted peers weighted 40/30/30.
    vec![
        PeerFixture {
            name: "audit-a",
            keys: keypair_from_seed(&[51; 32]),
            weight: 40,
        },
        PeerFixture {
            name: "audit-b",
            keys: keypair_from_seed(&[52; 32]),
            weight: 30,
        },
        PeerFixture {
            name: "audit-c",
            keys: keypair_from_seed(&[53; 32]),
            weight: 30,
        },
    ]
}

fn cross_cluster_node() -> std::sync::Arc<LatticeNode> {
    let peers = audit_peers()
        .into_iter()
        .map(|p| TrustedPeerEntry {
            cluster_id: p.name.to_string(),
            public_key: hex::encode(p.keys.public.as_bytes()),
            weight: p.weight,
        })
        .collect();
    LatticeNode::build(node_config(vec![
        cluster_config("finance", peers),
        cluster_config("chat", vec![]),
    ]))
    .unwrap()
}

#[test]
fn node_can_attest_as_trusted_peer_of_another_cluster() {
    // "chat" is registered as a trusted peer of "finance" under this
    // node's own identity key, so the node can attest on chat's behalf.
    let mut peers: Vec<TrustedPeerEntry> = audit_peers()
        .into_iter()
        .map(|p| TrustedPeerEntry {
            cluster_id: p.name.to_string(),
            public_key: hex::encode(p.keys.public.as_bytes()),
            weight: p.weight,
        })
        .collect();
    peers[0] = TrustedPeerEntry {
        cluster_id: "chat".to_string(),
        public_key: hex::encode(identity_keys().public.as_bytes()),
        weight: 40,
    };
    let node = LatticeNode::build(node_config(vec![
        cluster_config("finance", peers),
        cluster_config("chat", vec![]),
    ]))
    .unwrap();

    let finance = ClusterId::new("finance");
    let chat = ClusterId::new("chat");
    let instruction = transfer(1, 500);
    let id = instruction.id;
    node.open_outbound(&finance, chat.clone(), instruction.clone(), Timestamp::new(100))
        .unwrap();
    assert_eq!(
        node.outbound_status_of(&finance, &id).unwrap(),
        Some(lattice_types::AttestationStatus::Collecting)
    );

    let snapshot = genesis_snapshot();
    let message = node
        .attest_foreign(
            &chat,
            &finance,
            &chat,
            &instruction,
            &snapshot,
            Timestamp::new(101),
        )
        .unwrap();
    let frame = encode_frame(&lattice_messages::GossipMessage::Attestation(message)).unwrap();
    node.handle_frame(&frame, Timestamp::new(101)).unwrap();

    // 40 of 100 so far; one audit peer pushes it over the 67 threshold.
    node.handle_frame(
        &attestation_frame(&audit_peers()[1], &instruction, &snapshot, 102),
        Timestamp::new(102),
    )
    .unwrap();
    assert_eq!(
        node.outbound_status_of(&finance, &id).unwrap(),
        Some(lattice_types::AttestationStatus::Finalized)
    );
    assert_eq!(
        node.status_of(&chat, &id).unwrap(),
        Some(InstructionStatus::Committed)
    );
}

/// The genesis state peers validate against — equivalent to the finance
/// cluster's height-0 snapshot (hash ignores creation time).
fn genesis_snapshot() -> ClusterSnapshot {
    let sender = sender_keys();
    ClusterSnapshot::create(
        ClusterId::new("finance"),
        0,
        vec![AccountSnapshot {
            address: derive_address(&sender.public),
            public_key: sender.public,
            balance: 10_000,
            nonce: 0,
        }],
    )
}

fn attestation_frame(
    peer: &PeerFixture,
    instruction: &Instruction,
    snapshot: &ClusterSnapshot,
    now: u64,
) -> Vec<u8> {
    let origin = ClusterId::new("finance");
    let dest = ClusterId::new("chat");
    let (digest, signature) =
        sign_attestation(&origin, &dest, instruction, snapshot, &peer.keys).unwrap();
    encode_frame(&lattice_messages::GossipMessage::Attestation(
        AttestationMessage {
            header: MessageHeader::new(
                MessageKind::Attestation,
                origin,
                snapshot.height,
                Timestamp::new(now),
            ),
            dest_cluster: dest,
            instruction_id: instruction.id,
            snapshot_height: snapshot.height,
            peer_cluster: ClusterId::new(peer.name),
            payload_digest: digest,
            signature,
        },
    ))
    .unwrap()
}

#[test]
fn attested_instruction_reaches_destination_pipeline() {
    let node = cross_cluster_node();
    let finance = ClusterId::new("finance");
    let chat = ClusterId::new("chat");
    let peers = audit_peers();

    let instruction = transfer(1, 500);
    let id = instruction.id;
    let snapshot_height = node
        .open_outbound(&finance, chat.clone(), instruction.clone(), Timestamp::new(100))
        .unwrap();
    assert_eq!(snapshot_height, 0);

    let snapshot = genesis_snapshot();

    // First peer: 40 of 100 — below the 67% threshold.
    node.handle_frame(
        &attestation_frame(&peers[0], &instruction, &snapshot, 101),
        Timestamp::new(101),
    )
    .unwrap();
    assert_eq!(node.status_of(&chat, &id).unwrap(), None);

    // Second peer: 70 of 100 — threshold crossed, instruction committed
    // on the destination cluster without local DPoS voting.
    node.handle_frame(
        &attestation_frame(&peers[1], &instruction, &snapshot, 102),
        Timestamp::new(102),
    )
    .unwrap();

    assert_eq!(
        node.status_of(&chat, &id).unwrap(),
        Some(InstructionStatus::Committed)
    );
    let recipient = node
        .account_of(
            &chat,
            &derive_address(&keypair_from_seed(&RECIPIENT_SEED).public),
        )
        .unwrap()
        .unwrap();
    assert_eq!(recipient.balance, 500);
    assert_eq!(node.metrics.attestations_finalized.get(), 1);

    // Redelivered attestation after finalization is harmless.
    node.handle_frame(
        &attestation_frame(&peers[2], &instruction, &snapshot, 103),
        Timestamp::new(103),
    )
    .unwrap();
    assert_eq!(node.metrics.attestations_finalized.get(), 1);
}

#[test]
fn attestation_round_below_threshold_expires() {
    let node = cross_cluster_node();
    let finance = ClusterId::new("finance");
    let chat = ClusterId::new("chat");
    let peers = audit_peers();

    let instruction = transfer(1, 500);
    let id = instruction.id;
    node.open_outbound(&finance, chat.clone(), instruction.clone(), Timestamp::new(100))
        .unwrap();

    // Only 40 of the required 67 weight arrives.
    let snapshot = genesis_snapshot();
    node.handle_frame(
        &attestation_frame(&peers[0], &instruction, &snapshot, 101),
        Timestamp::new(101),
    )
    .unwrap();

    // The 60-second window elapses; the sweep expires the round and the
    // originator sees the failure through the status surface.
    node.tick_cluster(&finance, Timestamp::new(161));
    assert_eq!(node.metrics.attestations_expired.get(), 1);
    assert_eq!(
        node.status_of(&finance, &id).unwrap(),
        Some(InstructionStatus::Rejected)
    );
    // The instruction never reached the destination pipeline.
    assert_eq!(node.status_of(&chat, &id).unwrap(), None);
}

#[test]
fn withdrawn_outbound_message_stops_collecting() {
    let node = cross_cluster_node();
    let finance = ClusterId::new("finance");
    let chat = ClusterId::new("chat");

    let instruction = transfer(1, 500);
    let id = instruction.id;
    node.open_outbound(&finance, chat, instruction.clone(), Timestamp::new(100))
        .unwrap();
    node.withdraw_outbound(&finance, &id).unwrap();

    // An attestation for a withdrawn round is dropped silently.
    let snapshot = genesis_snapshot();
    node.handle_frame(
        &attestation_frame(&audit_peers()[0], &instruction, &snapshot, 101),
        Timestamp::new(101),
    )
    .unwrap();
    assert_eq!(node.metrics.attestations_finalized.get(), 0);
}
