//! The lattice node — wires cluster runtimes to the network and RPC.
//!
//! Each cluster runtime is an independent state machine behind its own
//! lock; the node's tasks (ticker per cluster, inbound processor, accept
//! loop, outbound router) drive them without any lock ever spanning two
//! clusters. Locks are held only for synchronous sections, never across
//! an await.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;

use lattice_attestor::{AttestationAggregator, TrustedPeer, TrustedPeerSet};
use lattice_consensus::{ConsensusEngine, Delegate, DelegateSet};
use lattice_crypto::derive_address;
use lattice_instructions::Instruction;
use lattice_ledger::Ledger;
use lattice_messages::{GossipMessage, PeerAddress};
use lattice_network::{
    decode_frame, spawn_connection, Broadcaster, ConnectionRegistry, MessageDedup, PeerManager,
    Relay, RelayDecision,
};
use lattice_pipeline::{
    InstructionPipeline, PercentageFee, RegistryBuilder, TransferHandler,
};
use lattice_rpc::{AccountView, NodeHandle, RpcServer, SubmitReceipt};
use lattice_store::{AccountRecord, MemoryStore};
use lattice_types::{
    AccountAddress, ClusterId, InstructionId, InstructionStatus, Timestamp,
};

use crate::cluster::ClusterRuntime;
use crate::config::{parse_public_key, ClusterConfig, NodeConfig};
use crate::governance::{GovernanceAction, GovernanceQueue};
use crate::identity::NodeIdentity;
use crate::metrics::NodeMetrics;
use crate::shutdown::ShutdownController;
use crate::NodeError;

/// Capacity of the shared inbound and outbound frame channels.
const FRAME_CHANNEL_CAPACITY: usize = 4_096;

/// A running lattice node.
pub struct LatticeNode {
    config: NodeConfig,
    identity: Arc<NodeIdentity>,
    clusters: HashMap<ClusterId, Arc<Mutex<ClusterRuntime>>>,
    governance: Arc<Mutex<GovernanceQueue>>,
    peer_manager: Arc<Mutex<PeerManager>>,
    relay: Arc<Mutex<Relay>>,
    broadcaster: Broadcaster,
    /// Taken once by the outbound router task.
    outbound_rx: Mutex<Option<mpsc::Receiver<(String, Vec<u8>)>>>,
    pub metrics: Arc<NodeMetrics>,
    pub shutdown: Arc<ShutdownController>,
}

impl LatticeNode {
    /// Construct a node and all its cluster runtimes from configuration.
    pub fn build(config: NodeConfig) -> Result<Arc<Self>, NodeError> {
        let seed = config.seed()?;
        let memberships = config
            .clusters
            .iter()
            .filter(|c| c.member)
            .map(|c| ClusterId::new(c.cluster_id.clone()))
            .collect();
        let identity = Arc::new(NodeIdentity::from_seed(&seed, memberships));
        let metrics = Arc::new(NodeMetrics::new());

        let mut clusters = HashMap::new();
        for cluster_config in &config.clusters {
            let runtime = build_runtime(cluster_config, identity.clone(), metrics.clone())?;
            clusters.insert(
                runtime.cluster_id().clone(),
                Arc::new(Mutex::new(runtime)),
            );
        }

        let mut peer_manager = PeerManager::new(config.max_peers);
        for entry in &config.bootstrap_peers {
            if let Some(address) = parse_peer_address(entry) {
                peer_manager.add_peer(address);
            } else {
                tracing::warn!(peer = %entry, "ignoring malformed bootstrap peer");
            }
        }

        let relay = Relay::new(
            identity.memberships().clone(),
            MessageDedup::default(),
        );

        let (outbound_tx, outbound_rx) = mpsc::channel(FRAME_CHANNEL_CAPACITY);

        tracing::info!(
            node = %identity.node_id(),
            clusters = clusters.len(),
            "node built"
        );
        Ok(Arc::new(Self {
            config,
            identity,
            clusters,
            governance: Arc::new(Mutex::new(GovernanceQueue::new())),
            peer_manager: Arc::new(Mutex::new(peer_manager)),
            relay: Arc::new(Mutex::new(relay)),
            broadcaster: Broadcaster::new(outbound_tx),
            outbound_rx: Mutex::new(Some(outbound_rx)),
            metrics,
            shutdown: Arc::new(ShutdownController::new()),
        }))
    }

    pub fn identity(&self) -> &NodeIdentity {
        &self.identity
    }

    fn runtime(&self, cluster: &ClusterId) -> Result<&Arc<Mutex<ClusterRuntime>>, NodeError> {
        self.clusters
            .get(cluster)
            .ok_or_else(|| NodeError::UnknownCluster(cluster.clone()))
    }

    fn lock_runtime<'a>(
        runtime: &'a Arc<Mutex<ClusterRuntime>>,
    ) -> std::sync::MutexGuard<'a, ClusterRuntime> {
        runtime.lock().unwrap_or_else(|e| e.into_inner())
    }

    // ── Submission interface ────────────────────────────────────────────

    pub fn submit_instruction(
        &self,
        cluster: &ClusterId,
        instruction: Instruction,
    ) -> Result<SubmitReceipt, NodeError> {
        let runtime = self.runtime(cluster)?;
        Self::lock_runtime(runtime).submit_local(instruction)
    }

    pub fn withdraw_instruction(
        &self,
        cluster: &ClusterId,
        id: &InstructionId,
    ) -> Result<(), NodeError> {
        let runtime = self.runtime(cluster)?;
        Self::lock_runtime(runtime).withdraw_local(id)
    }

    pub fn status_of(
        &self,
        cluster: &ClusterId,
        id: &InstructionId,
    ) -> Result<Option<InstructionStatus>, NodeError> {
        let runtime = self.runtime(cluster)?;
        Ok(Self::lock_runtime(runtime).status(id))
    }

    pub fn account_of(
        &self,
        cluster: &ClusterId,
        address: &AccountAddress,
    ) -> Result<Option<AccountView>, NodeError> {
        let runtime = self.runtime(cluster)?;
        Ok(Self::lock_runtime(runtime).account(address))
    }

    /// Queue a governance mutation; it applies at the cluster's next
    /// between-rounds boundary.
    pub fn submit_governance(&self, action: GovernanceAction) {
        self.governance
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(action);
    }

    /// Start a cross-cluster relay for an instruction out of `origin`.
    pub fn open_outbound(
        &self,
        origin: &ClusterId,
        dest: ClusterId,
        instruction: Instruction,
        now: Timestamp,
    ) -> Result<u64, NodeError> {
        let runtime = self.runtime(origin)?;
        Self::lock_runtime(runtime).open_outbound(dest, instruction, now)
    }

    /// Withdraw a pending cross-cluster message before threshold.
    pub fn withdraw_outbound(
        &self,
        origin: &ClusterId,
        id: &InstructionId,
    ) -> Result<(), NodeError> {
        let runtime = self.runtime(origin)?;
        Self::lock_runtime(runtime).withdraw_outbound(id)
    }

    /// Attestation state of an outbound message on its origin cluster.
    pub fn outbound_status_of(
        &self,
        origin: &ClusterId,
        id: &InstructionId,
    ) -> Result<Option<lattice_types::AttestationStatus>, NodeError> {
        let runtime = self.runtime(origin)?;
        Ok(Self::lock_runtime(runtime).outbound_status(id))
    }

    /// Act as a trusted peer: re-validate a foreign cluster's outbound
    /// instruction against its snapshot and sign an attestation on behalf
    /// of `peer_cluster` (one of this node's clusters).
    pub fn attest_foreign(
        &self,
        peer_cluster: &ClusterId,
        origin: &ClusterId,
        dest: &ClusterId,
        instruction: &Instruction,
        snapshot: &lattice_ledger::ClusterSnapshot,
        now: Timestamp,
    ) -> Result<lattice_messages::AttestationMessage, NodeError> {
        let runtime = self.runtime(peer_cluster)?;
        Self::lock_runtime(runtime).attest_foreign(origin, dest, instruction, snapshot, now)
    }

    // ── Gossip handling ─────────────────────────────────────────────────

    /// Process one inbound frame: dedup, deliver to the owning cluster if
    /// we are a member, and re-flood either way.
    pub fn handle_frame(&self, frame: &[u8], now: Timestamp) -> Result<(), NodeError> {
        let message = decode_frame(frame)?;
        let decision = self
            .relay
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .decide(frame, &message);

        match decision {
            RelayDecision::Duplicate => {}
            RelayDecision::ForwardOnly => {
                self.flood_raw(frame);
            }
            RelayDecision::DeliverAndForward => {
                let outbox = self.deliver(message, now);
                self.flood_raw(frame);
                self.broadcast_messages(outbox);
            }
        }
        Ok(())
    }

    /// Dispatch a deliverable message to its cluster runtime. Protocol
    /// rejections (stale proposals, unknown delegates) are logged, not
    /// propagated — gossip is at-least-once and out-of-order by design.
    fn deliver(&self, message: GossipMessage, now: Timestamp) -> Vec<GossipMessage> {
        match message {
            GossipMessage::BlockProposal(m) => {
                let cluster = m.header.cluster_id.clone();
                match self.runtime(&cluster) {
                    Ok(runtime) => Self::lock_runtime(runtime)
                        .handle_proposal(m.block, m.instructions, now)
                        .unwrap_or_else(|e| {
                            tracing::debug!(%cluster, %e, "proposal not installed");
                            Vec::new()
                        }),
                    Err(_) => Vec::new(),
                }
            }
            GossipMessage::Vote(m) => {
                let cluster = m.header.cluster_id.clone();
                if let Ok(runtime) = self.runtime(&cluster) {
                    if let Err(e) = Self::lock_runtime(runtime)
                        .handle_vote(m.voter, m.block_hash, m.signature, now)
                    {
                        tracing::debug!(%cluster, %e, "vote dropped");
                    }
                }
                Vec::new()
            }
            GossipMessage::Attestation(m) => {
                self.deliver_attestation(&m, now);
                Vec::new()
            }
            GossipMessage::Keepalive(m) => {
                let mut peer_manager =
                    self.peer_manager.lock().unwrap_or_else(|e| e.into_inner());
                for address in m.peers {
                    peer_manager.add_peer(address);
                }
                Vec::new()
            }
            GossipMessage::SnapshotAnnouncement(m) => {
                tracing::debug!(
                    cluster = %m.header.cluster_id,
                    height = m.header.height,
                    "snapshot announced"
                );
                Vec::new()
            }
        }
    }

    /// Route an attestation into the origin cluster's aggregator; when it
    /// crosses the threshold, hand the instruction to the destination
    /// cluster's pipeline (if this node serves it).
    fn deliver_attestation(&self, message: &lattice_messages::AttestationMessage, now: Timestamp) {
        let origin = message.header.cluster_id.clone();
        let finalized = match self.runtime(&origin) {
            Ok(runtime) => match Self::lock_runtime(runtime).handle_attestation(message, now) {
                Ok(finalized) => finalized,
                Err(e) => {
                    tracing::debug!(%origin, %e, "attestation dropped");
                    return;
                }
            },
            Err(_) => return,
        };

        if let Some(finalized) = finalized {
            let dest = finalized.message.dest_cluster.clone();
            if let Ok(dest_runtime) = self.runtime(&dest) {
                match Self::lock_runtime(dest_runtime)
                    .execute_external(&finalized.instruction, now)
                {
                    Ok(_) => tracing::info!(
                        %origin,
                        %dest,
                        instruction = %finalized.instruction.id,
                        "cross-cluster instruction committed"
                    ),
                    Err(e) => tracing::warn!(
                        %origin,
                        %dest,
                        instruction = %finalized.instruction.id,
                        %e,
                        "attested instruction rejected by destination pipeline"
                    ),
                }
            }
        }
    }

    /// Drive one cluster one step and flood whatever it produced.
    pub fn tick_cluster(&self, cluster: &ClusterId, now: Timestamp) {
        let outbox = match self.runtime(cluster) {
            Ok(runtime) => {
                let mut governance =
                    self.governance.lock().unwrap_or_else(|e| e.into_inner());
                Self::lock_runtime(runtime).tick(now, &mut governance)
            }
            Err(_) => return,
        };
        self.broadcast_messages(outbox);

        let pending: usize = self
            .clusters
            .values()
            .map(|r| Self::lock_runtime(r).pending_len())
            .sum();
        self.metrics.pending_instructions.set(pending as i64);
    }

    fn broadcast_messages(&self, messages: Vec<GossipMessage>) {
        for message in messages {
            let frame = self
                .relay
                .lock()
                .unwrap_or_else(|e| e.into_inner())
                .note_outbound(&message);
            match frame {
                Ok(frame) => self.flood_raw(&frame),
                Err(e) => tracing::error!(%e, "failed to encode outbound message"),
            }
        }
    }

    fn flood_raw(&self, frame: &[u8]) {
        let peers = self
            .peer_manager
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .peers();
        let result = self.broadcaster.broadcast_to_all(frame, &peers);
        if result.failed > 0 {
            tracing::debug!(failed = result.failed, "some outbound queues were full");
        }
    }

    // ── Run loop ────────────────────────────────────────────────────────

    /// Run until shutdown: accept loop, bootstrap dialer, outbound
    /// router, inbound processor, one ticker per cluster, and the RPC
    /// server.
    pub async fn run(self: Arc<Self>) -> Result<(), NodeError> {
        let listener = TcpListener::bind(("0.0.0.0", self.config.port))
            .await
            .map_err(|e| NodeError::Config(format!("bind p2p port {}: {e}", self.config.port)))?;
        tracing::info!(port = self.config.port, "P2P listener up");

        let (inbound_tx, inbound_rx) = mpsc::channel(FRAME_CHANNEL_CAPACITY);
        let registry = Arc::new(Mutex::new(ConnectionRegistry::new()));

        self.spawn_accept_loop(listener, inbound_tx.clone(), registry.clone());
        self.spawn_bootstrap_dialer(inbound_tx, registry.clone());
        self.spawn_outbound_router(registry);
        self.spawn_inbound_processor(inbound_rx);
        for cluster_id in self.clusters.keys().cloned() {
            self.spawn_cluster_driver(cluster_id);
        }

        if self.config.enable_rpc {
            let handle: Arc<dyn NodeHandle> = self.clone();
            let server = RpcServer::new(self.config.rpc_port, handle);
            let shutdown = self.shutdown.subscribe();
            tokio::spawn(async move {
                if let Err(e) = server.serve(shutdown).await {
                    tracing::error!(%e, "RPC server exited");
                }
            });
        }

        self.shutdown.wait_for_signal().await;
        Ok(())
    }

    fn spawn_accept_loop(
        self: &Arc<Self>,
        listener: TcpListener,
        inbound_tx: mpsc::Sender<(String, Vec<u8>)>,
        registry: Arc<Mutex<ConnectionRegistry>>,
    ) {
        let node = self.clone();
        let mut shutdown = self.shutdown.subscribe();
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = shutdown.recv() => break,
                    accepted = listener.accept() => {
                        let Ok((stream, addr)) = accepted else { continue };
                        let peer_id = addr.to_string();
                        let sender = spawn_connection(stream, peer_id.clone(), inbound_tx.clone());
                        registry.lock().unwrap_or_else(|e| e.into_inner()).register(peer_id.clone(), sender);
                        let mut peer_manager = node.peer_manager.lock().unwrap_or_else(|e| e.into_inner());
                        let address = PeerAddress { ip: addr.ip().to_string(), port: addr.port() };
                        peer_manager.add_peer(address.clone());
                        peer_manager.mark_connected(&address, Timestamp::now().as_secs());
                        node.metrics.peer_count.set(peer_manager.connected_count() as i64);
                    }
                }
            }
        });
    }

    fn spawn_bootstrap_dialer(
        self: &Arc<Self>,
        inbound_tx: mpsc::Sender<(String, Vec<u8>)>,
        registry: Arc<Mutex<ConnectionRegistry>>,
    ) {
        let node = self.clone();
        let mut shutdown = self.shutdown.subscribe();
        tokio::spawn(async move {
            let mut interval =
                tokio::time::interval(std::time::Duration::from_secs(5));
            loop {
                tokio::select! {
                    _ = shutdown.recv() => break,
                    _ = interval.tick() => {}
                }
                let now_secs = Timestamp::now().as_secs();
                let due = node
                    .peer_manager
                    .lock()
                    .unwrap_or_else(|e| e.into_inner())
                    .due_for_retry(now_secs);
                for address in due {
                    let peer_id = format!("{}:{}", address.ip, address.port);
                    match TcpStream::connect(&peer_id).await {
                        Ok(stream) => {
                            let sender =
                                spawn_connection(stream, peer_id.clone(), inbound_tx.clone());
                            registry
                                .lock()
                                .unwrap_or_else(|e| e.into_inner())
                                .register(peer_id, sender);
                            let mut peer_manager =
                                node.peer_manager.lock().unwrap_or_else(|e| e.into_inner());
                            peer_manager.mark_connected(&address, now_secs);
                            node.metrics
                                .peer_count
                                .set(peer_manager.connected_count() as i64);
                        }
                        Err(e) => {
                            tracing::debug!(peer = %peer_id, %e, "dial failed");
                            node.peer_manager
                                .lock()
                                .unwrap_or_else(|e| e.into_inner())
                                .mark_disconnected(&address, now_secs);
                        }
                    }
                }
            }
        });
    }

    fn spawn_outbound_router(self: &Arc<Self>, registry: Arc<Mutex<ConnectionRegistry>>) {
        let mut outbound_rx = self
            .outbound_rx
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .take()
            .expect("run() is called once");
        let mut shutdown = self.shutdown.subscribe();
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = shutdown.recv() => break,
                    item = outbound_rx.recv() => {
                        let Some((peer_id, frame)) = item else { break };
                        let sender = registry
                            .lock()
                            .unwrap_or_else(|e| e.into_inner())
                            .sender_for(&peer_id)
                            .cloned();
                        if let Some(sender) = sender {
                            let _ = sender.try_send(frame);
                        }
                    }
                }
            }
        });
    }

    fn spawn_inbound_processor(
        self: &Arc<Self>,
        mut inbound_rx: mpsc::Receiver<(String, Vec<u8>)>,
    ) {
        let node = self.clone();
        let mut shutdown = self.shutdown.subscribe();
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = shutdown.recv() => break,
                    item = inbound_rx.recv() => {
                        let Some((peer_id, frame)) = item else { break };
                        if let Err(e) = node.handle_frame(&frame, Timestamp::now()) {
                            tracing::debug!(peer = %peer_id, %e, "bad frame");
                        }
                    }
                }
            }
        });
    }

    fn spawn_cluster_driver(self: &Arc<Self>, cluster_id: ClusterId) {
        let node = self.clone();
        let mut shutdown = self.shutdown.subscribe();
        let period = std::time::Duration::from_millis(self.config.tick_interval_ms);
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            loop {
                tokio::select! {
                    _ = shutdown.recv() => break,
                    _ = interval.tick() => {
                        node.tick_cluster(&cluster_id, Timestamp::now());
                    }
                }
            }
        });
    }
}

impl NodeHandle for LatticeNode {
    fn submit(
        &self,
        cluster: &ClusterId,
        instruction: Instruction,
    ) -> Result<SubmitReceipt, String> {
        self.submit_instruction(cluster, instruction)
            .map_err(|e| e.to_string())
    }

    fn instruction_status(
        &self,
        cluster: &ClusterId,
        id: &InstructionId,
    ) -> Option<InstructionStatus> {
        self.status_of(cluster, id).ok().flatten()
    }

    fn account(&self, cluster: &ClusterId, address: &AccountAddress) -> Option<AccountView> {
        self.account_of(cluster, address).ok().flatten()
    }
}

// ── Construction helpers ────────────────────────────────────────────────

fn build_runtime(
    config: &ClusterConfig,
    identity: Arc<NodeIdentity>,
    metrics: Arc<NodeMetrics>,
) -> Result<ClusterRuntime, NodeError> {
    let cluster_id = ClusterId::new(config.cluster_id.clone());

    let ledger = Ledger::new(cluster_id.clone(), Arc::new(MemoryStore::new()));
    for account in &config.genesis_accounts {
        let public_key = parse_public_key(&account.public_key)?;
        ledger.seed_account(&AccountRecord::new(
            derive_address(&public_key),
            public_key,
            account.balance,
        ))?;
    }
    // Genesis snapshot so outbound attestation has a reference state
    // before the first block finalizes.
    ledger.take_snapshot(0)?;

    let registry = RegistryBuilder::new()
        .register(
            Arc::new(TransferHandler),
            Arc::new(PercentageFee::new(config.params.transfer_fee_bps)),
        )
        .build();
    let pipeline = InstructionPipeline::new(ledger, registry);

    let delegates = config
        .delegates
        .iter()
        .map(|entry| {
            parse_public_key(&entry.public_key).map(|key| Delegate::new(key, entry.stake))
        })
        .collect::<Result<Vec<_>, _>>()?;
    let engine = ConsensusEngine::new(
        cluster_id.clone(),
        DelegateSet::new(delegates),
        config.params.clone(),
    );

    let trusted_peers = config
        .trusted_peers
        .iter()
        .map(|entry| {
            parse_public_key(&entry.public_key).map(|key| {
                TrustedPeer::new(ClusterId::new(entry.cluster_id.clone()), key, entry.weight)
            })
        })
        .collect::<Result<Vec<_>, _>>()?;
    let attestor = AttestationAggregator::new(
        cluster_id.clone(),
        TrustedPeerSet::new(trusted_peers),
        config.params.clone(),
    );

    Ok(ClusterRuntime::new(
        cluster_id,
        engine,
        pipeline,
        attestor,
        identity,
        config.params.clone(),
        config.member,
        metrics,
    ))
}

fn parse_peer_address(entry: &str) -> Option<PeerAddress> {
    let (ip, port) = entry.rsplit_once(':')?;
    Some(PeerAddress {
        ip: ip.to_string(),
        port: port.parse().ok()?,
    })
}
