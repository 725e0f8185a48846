//! Order lifecycle engine.
//!
//! The only entry point that mutates desk state. Every operation is one
//! short transaction:
//!
//! ```text
//!   owner lock ──► table mutex ──► validate ──► checkpoint ──► mutate
//!                                                                 │
//!                         ack ◄── snapshot written ◄──────────────┘
//!                                        │ write failed
//!                                        ▼
//!                             restore checkpoint, Persistence error
//! ```
//!
//! Lock order is fixed: the per-owner lock is always taken before the table
//! mutex, and never the other way around. Read-only queries take the table
//! mutex alone.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::Mutex;

use orderdesk_store::{DeskState, PersistenceGateway, Snapshot, SnapshotSink};
use orderdesk_types::{
    AdminClaim, DeskConfig, DeskError, DeskStats, ErrorClass, Order, OrderStatus, PendingInput,
    ProductCode, ProofRef, Result, UserId,
};

use crate::input_board::InputBoard;
use crate::locks::OwnerLocks;
use crate::outcome::{BanOutcome, Cancellation, Fulfillment, OperatorPrompt};
use crate::sanitize::sanitize_code;

/// Serialized, durable order workflow for one desk.
#[derive(Debug)]
pub struct LifecycleEngine {
    config: DeskConfig,
    owner_locks: OwnerLocks,
    state: Mutex<DeskState>,
    inputs: InputBoard,
    gateway: Arc<PersistenceGateway>,
}

impl LifecycleEngine {
    /// Engine with empty tables. Nothing is read from `sink`; the first
    /// mutation overwrites whatever it holds.
    ///
    /// # Errors
    /// `Configuration` if `config` does not validate.
    pub fn new(config: DeskConfig, sink: impl SnapshotSink + 'static) -> Result<Self> {
        config.validate()?;
        Ok(Self::with_state(config, DeskState::new(), PersistenceGateway::new(sink)))
    }

    /// Engine resumed from the snapshot held by `sink`, or empty if the sink
    /// has never been written.
    ///
    /// # Errors
    /// - `Configuration` if `config` does not validate
    /// - `Persistence` / `CorruptSnapshot` if the stored snapshot cannot be used
    pub fn open(config: DeskConfig, sink: impl SnapshotSink + 'static) -> Result<Self> {
        config.validate()?;
        let gateway = PersistenceGateway::new(sink);
        let state = gateway.load()?.unwrap_or_default();
        tracing::info!(
            sink = %gateway.describe(),
            orders = state.orders.len(),
            banned = state.bans.len(),
            operators = config.operators.len(),
            "Lifecycle engine ready"
        );
        Ok(Self::with_state(config, state, gateway))
    }

    fn with_state(config: DeskConfig, state: DeskState, gateway: PersistenceGateway) -> Self {
        Self {
            config,
            owner_locks: OwnerLocks::new(),
            state: Mutex::new(state),
            inputs: InputBoard::new(),
            gateway: Arc::new(gateway),
        }
    }

    #[must_use]
    pub fn config(&self) -> &DeskConfig {
        &self.config
    }

    // -----------------------------------------------------------------------
    // Buyer operations
    // -----------------------------------------------------------------------

    /// Start (or resume) a buyer session.
    ///
    /// A finished order left over from a previous session is purged so the
    /// buyer starts clean. A live order is returned so the conversation can
    /// pick up where it stopped.
    pub async fn begin_session(&self, owner: UserId) -> Result<Option<Order>> {
        let _guard = self.owner_locks.acquire(owner).await;
        let mut state = self.state.lock().await;
        let result = self.begin_session_locked(&mut state, owner).await;
        traced("begin_session", owner, result)
    }

    async fn begin_session_locked(&self, state: &mut DeskState, owner: UserId) -> Result<Option<Order>> {
        if state.bans.is_banned(owner) {
            return Err(DeskError::Banned(owner));
        }
        match state.orders.get(owner).map(|o| o.status) {
            Some(status) if status.is_terminal() => {
                self.apply(state, |s| {
                    s.orders.purge_terminal(owner);
                    Ok(())
                })
                .await?;
                tracing::info!(owner = %owner, %status, "Finished order purged at session start");
                Ok(None)
            }
            Some(_) => Ok(state.orders.get(owner).cloned()),
            None => Ok(None),
        }
    }

    /// Whether `owner` may start a new order right now.
    ///
    /// Reports `OrderActive` for any live order, including a `NEW` one, so
    /// the caller can offer cancellation first.
    pub async fn can_create_order(&self, owner: UserId) -> Result<()> {
        let state = self.state.lock().await;
        if state.bans.is_banned(owner) {
            return Err(DeskError::Banned(owner));
        }
        match state.orders.get(owner) {
            Some(order) if order.status.is_live() => Err(DeskError::OrderActive {
                owner,
                status: order.status,
            }),
            _ => Ok(()),
        }
    }

    /// Create an order for `product_code`, or re-select the product of a
    /// `NEW` order.
    pub async fn create_or_get_order(
        &self,
        owner: UserId,
        display_name: &str,
        product_code: &str,
    ) -> Result<Order> {
        let _guard = self.owner_locks.acquire(owner).await;
        let mut state = self.state.lock().await;
        let result = self.create_locked(&mut state, owner, display_name, product_code).await;
        traced("create_or_get_order", owner, result)
    }

    async fn create_locked(
        &self,
        state: &mut DeskState,
        owner: UserId,
        display_name: &str,
        product_code: &str,
    ) -> Result<Order> {
        if state.bans.is_banned(owner) {
            return Err(DeskError::Banned(owner));
        }
        let product = self
            .config
            .products
            .get(&ProductCode::new(product_code))
            .cloned()
            .ok_or_else(|| DeskError::UnknownProduct(product_code.to_string()))?;
        let now = Utc::now();

        match state.orders.get(owner) {
            Some(existing) if existing.status == OrderStatus::New => {
                let mut order = existing.clone();
                order.amount = product.price;
                order.product = product;
                order.updated_at = now;
                self.apply(state, |s| s.orders.replace(owner, order.clone()).map(drop)).await?;
                tracing::info!(
                    owner = %owner,
                    product = %order.product.code,
                    amount = %order.amount,
                    "Product re-selected"
                );
                return Ok(order);
            }
            Some(existing) if existing.status.is_live() => {
                return Err(DeskError::OrderActive {
                    owner,
                    status: existing.status,
                });
            }
            _ => {}
        }

        let order = Order::new(owner, display_name, product, now);
        self.apply(state, |s| {
            s.orders.purge_terminal(owner);
            s.orders.insert(order.clone())
        })
        .await?;
        tracing::info!(
            owner = %owner,
            product = %order.product.code,
            amount = %order.amount,
            status = %order.status,
            "Order created"
        );
        Ok(order)
    }

    /// Fix the payment network: `NEW → AWAITING_PAYMENT`.
    pub async fn choose_network(&self, owner: UserId, network: &str) -> Result<Order> {
        let _guard = self.owner_locks.acquire(owner).await;
        let mut state = self.state.lock().await;
        let result = self.choose_network_locked(&mut state, owner, network).await;
        traced("choose_network", owner, result)
    }

    async fn choose_network_locked(&self, state: &mut DeskState, owner: UserId, network: &str) -> Result<Order> {
        let current = order_of(state, owner)?;
        if current.status != OrderStatus::New {
            return Err(DeskError::WrongState {
                event: "choose a network for",
                actual: current.status,
            });
        }
        let network = self
            .config
            .accepted_network(network)
            .ok_or_else(|| DeskError::UnknownNetwork(network.to_string()))?;

        let now = Utc::now();
        let mut order = current.clone();
        order.network = Some(network);
        order.amount = order.product.price;
        order.status = OrderStatus::AwaitingPayment;
        order.payment_requested_at = Some(now);
        order.updated_at = now;
        self.apply(state, |s| s.orders.replace(owner, order.clone()).map(drop)).await?;
        tracing::info!(owner = %owner, order = %order.description(), status = %order.status, "Payment requested");
        Ok(order)
    }

    /// Open the proof upload window for an `AWAITING_PAYMENT` order.
    ///
    /// Calling again restarts the window from `now`.
    pub async fn request_proof_upload(&self, owner: UserId, now: DateTime<Utc>) -> Result<Order> {
        let _guard = self.owner_locks.acquire(owner).await;
        let state = self.state.lock().await;
        let result = order_of(&state, owner).and_then(|order| {
            if order.status != OrderStatus::AwaitingPayment {
                return Err(DeskError::WrongState {
                    event: "request a proof for",
                    actual: order.status,
                });
            }
            self.inputs.set(owner, PendingInput::PaymentProof { requested_at: now });
            tracing::debug!(owner = %owner, requested_at = %now, "Proof upload requested");
            Ok(order.clone())
        });
        traced("request_proof_upload", owner, result)
    }

    /// Record the payment proof: `AWAITING_PAYMENT → UNDER_REVIEW`.
    ///
    /// The proof is write-once. The window is measured from the upload
    /// request, or from when payment was requested if the buyer never asked
    /// to upload.
    pub async fn submit_proof(&self, owner: UserId, proof: ProofRef, now: DateTime<Utc>) -> Result<Order> {
        let _guard = self.owner_locks.acquire(owner).await;
        let mut state = self.state.lock().await;
        let result = self.submit_proof_locked(&mut state, owner, proof, now).await;
        traced("submit_proof", owner, result)
    }

    async fn submit_proof_locked(
        &self,
        state: &mut DeskState,
        owner: UserId,
        proof: ProofRef,
        now: DateTime<Utc>,
    ) -> Result<Order> {
        let current = order_of(state, owner)?;
        if current.has_proof() {
            return Err(DeskError::AlreadySubmitted(owner));
        }
        if current.status != OrderStatus::AwaitingPayment {
            return Err(DeskError::WrongState {
                event: "submit a proof for",
                actual: current.status,
            });
        }
        if !proof.is_valid() {
            return Err(DeskError::InvalidProof);
        }

        let opened_at = match self.inputs.get(owner) {
            Some(PendingInput::PaymentProof { requested_at }) => requested_at,
            _ => current.payment_requested_at.unwrap_or(current.updated_at),
        };
        let elapsed = now - opened_at;
        if elapsed > self.config.proof_window() {
            self.inputs.clear_proof_request(owner);
            tracing::warn!(
                owner = %owner,
                elapsed_secs = elapsed.num_seconds(),
                window_secs = self.config.proof_window_secs,
                "Proof arrived after the window closed"
            );
            return Err(DeskError::Expired {
                elapsed_secs: elapsed.num_seconds(),
                window_secs: self.config.proof_window_secs,
            });
        }

        let mut order = current.clone();
        order.proof_ref = Some(proof);
        order.status = OrderStatus::UnderReview;
        order.updated_at = now;
        self.apply(state, |s| s.orders.replace(owner, order.clone()).map(drop)).await?;
        self.inputs.clear_proof_request(owner);
        tracing::info!(owner = %owner, order = %order.description(), status = %order.status, "Proof received");
        Ok(order)
    }

    /// Cancel a live order. The order is purged and any claim on it dropped.
    pub async fn cancel(&self, owner: UserId) -> Result<Cancellation> {
        let _guard = self.owner_locks.acquire(owner).await;
        let mut state = self.state.lock().await;
        let result = self.cancel_locked(&mut state, owner).await;
        traced("cancel", owner, result)
    }

    async fn cancel_locked(&self, state: &mut DeskState, owner: UserId) -> Result<Cancellation> {
        let cancellation = self.apply(state, |s| cancel_in(s, owner)).await?;
        self.inputs.clear_proof_request(owner);
        tracing::info!(
            owner = %owner,
            released = ?cancellation.released_operators,
            "Order cancelled"
        );
        Ok(cancellation)
    }

    // -----------------------------------------------------------------------
    // Operator operations
    // -----------------------------------------------------------------------

    /// Claim an `UNDER_REVIEW` order. Status check and claim happen in one
    /// critical section, so of two racing operators exactly one wins.
    pub async fn accept_for_review(&self, operator: UserId, owner: UserId) -> Result<AdminClaim> {
        let _guard = self.owner_locks.acquire(owner).await;
        let mut state = self.state.lock().await;
        let result = self.accept_locked(&mut state, operator, owner);
        traced("accept_for_review", operator, result)
    }

    fn accept_locked(&self, state: &mut DeskState, operator: UserId, owner: UserId) -> Result<AdminClaim> {
        self.require_operator(operator)?;
        let status = order_of(state, owner)?.status;
        if status != OrderStatus::UnderReview {
            return Err(DeskError::WrongState {
                event: "accept",
                actual: status,
            });
        }
        let claim = state.claims.claim(operator, owner)?;
        tracing::info!(operator = %operator, owner = %owner, "Order claimed for review");
        Ok(claim)
    }

    /// Reject an `UNDER_REVIEW` order. Allowed for the claim holder, or for
    /// any operator while the order is unclaimed.
    pub async fn reject(&self, operator: UserId, owner: UserId) -> Result<Order> {
        let _guard = self.owner_locks.acquire(owner).await;
        let mut state = self.state.lock().await;
        let result = self.reject_locked(&mut state, operator, owner).await;
        traced("reject", operator, result)
    }

    async fn reject_locked(&self, state: &mut DeskState, operator: UserId, owner: UserId) -> Result<Order> {
        self.require_operator(operator)?;
        let current = order_of(state, owner)?;
        if current.status != OrderStatus::UnderReview {
            return Err(DeskError::WrongState {
                event: "reject",
                actual: current.status,
            });
        }
        if let Some(holder) = state.claims.holder_of(owner) {
            if holder != operator {
                return Err(DeskError::AlreadyClaimed { owner, holder });
            }
        }

        let mut order = current.clone();
        order.status = OrderStatus::Rejected;
        order.updated_at = Utc::now();
        self.apply(state, |s| {
            s.orders.replace(owner, order.clone())?;
            s.claims.release_owner(owner);
            Ok(())
        })
        .await?;
        tracing::info!(operator = %operator, owner = %owner, status = %order.status, "Order rejected");
        Ok(order)
    }

    /// Complete the order the operator holds a claim on and hand back the
    /// sanitized code for delivery.
    ///
    /// A code that is too short keeps the claim so the operator can retry.
    /// If the claimed order vanished or left review, the claim is dropped.
    pub async fn deliver_code(&self, operator: UserId, raw_code: &str) -> Result<Fulfillment> {
        let claimed = self.state.lock().await.claims.owner_for(operator);
        let Some(owner) = claimed else {
            return traced("deliver_code", operator, Err(DeskError::NoClaim(operator)));
        };

        let _guard = self.owner_locks.acquire(owner).await;
        let mut state = self.state.lock().await;
        let result = self.deliver_locked(&mut state, operator, owner, raw_code).await;
        traced("deliver_code", operator, result)
    }

    async fn deliver_locked(
        &self,
        state: &mut DeskState,
        operator: UserId,
        owner: UserId,
        raw_code: &str,
    ) -> Result<Fulfillment> {
        // The claim may have been released while the owner lock was awaited.
        if state.claims.owner_for(operator) != Some(owner) {
            return Err(DeskError::NoClaim(operator));
        }

        let code = sanitize_code(raw_code);
        let len = code.chars().count();
        if len < self.config.min_code_len {
            return Err(DeskError::CodeTooShort {
                len,
                min: self.config.min_code_len,
            });
        }

        match state.orders.get(owner).map(|o| o.status) {
            None => {
                state.claims.release(operator);
                return Err(DeskError::NoOrder(owner));
            }
            Some(status) if status != OrderStatus::UnderReview => {
                state.claims.release(operator);
                return Err(DeskError::WrongState {
                    event: "complete",
                    actual: status,
                });
            }
            Some(_) => {}
        }

        let mut order = order_of(state, owner)?.clone();
        order.status = OrderStatus::Completed;
        order.updated_at = Utc::now();
        self.apply(state, |s| {
            s.orders.replace(owner, order.clone())?;
            s.claims.release(operator);
            Ok(())
        })
        .await?;
        tracing::info!(
            operator = %operator,
            owner = %owner,
            order = %order.description(),
            status = %order.status,
            "Order completed"
        );
        Ok(Fulfillment { order, code })
    }

    /// Ban `user` and force-cancel their live order, if any.
    pub async fn ban(&self, user: UserId) -> Result<BanOutcome> {
        let _guard = self.owner_locks.acquire(user).await;
        let mut state = self.state.lock().await;
        let result = self.ban_locked(&mut state, user).await;
        traced("ban", user, result)
    }

    async fn ban_locked(&self, state: &mut DeskState, user: UserId) -> Result<BanOutcome> {
        if self.config.is_operator(user) {
            return Err(DeskError::OperatorProtected(user));
        }
        if state.bans.is_banned(user) {
            return Err(DeskError::AlreadyBanned(user));
        }
        let has_live_order = state.orders.get(user).is_some_and(|o| o.status.is_live());

        let cancelled = self.apply(state, |s| {
            s.bans.ban(user);
            if has_live_order {
                cancel_in(s, user).map(Some)
            } else {
                Ok(None)
            }
        })
        .await?;
        self.inputs.clear(user);
        tracing::info!(
            user = %user,
            cancelled = cancelled.is_some(),
            "User banned"
        );
        Ok(BanOutcome { user, cancelled })
    }

    pub async fn unban(&self, user: UserId) -> Result<()> {
        let _guard = self.owner_locks.acquire(user).await;
        let mut state = self.state.lock().await;
        let result = if state.bans.is_banned(user) {
            self.apply(&mut state, |s| {
                s.bans.unban(user);
                Ok(())
            })
            .await
        } else {
            Err(DeskError::NotBanned(user))
        };
        if result.is_ok() {
            tracing::info!(user = %user, "User unbanned");
        }
        traced("unban", user, result)
    }

    // -----------------------------------------------------------------------
    // Input board
    // -----------------------------------------------------------------------

    /// Expect the operator's next text to be a ban or unban target.
    pub fn await_operator_input(&self, operator: UserId, prompt: OperatorPrompt) -> Result<()> {
        self.require_operator(operator)?;
        self.inputs.set(operator, prompt.into());
        tracing::debug!(operator = %operator, ?prompt, "Awaiting operator input");
        Ok(())
    }

    /// How the user's next free-form message should be interpreted.
    ///
    /// An explicit prompt wins; otherwise an operator holding a claim is
    /// expected to send the fulfillment code.
    pub async fn pending_input(&self, user: UserId) -> Option<PendingInput> {
        if let Some(input) = self.inputs.get(user) {
            return Some(input);
        }
        let state = self.state.lock().await;
        state
            .claims
            .owner_for(user)
            .map(|owner| PendingInput::FulfillmentCode { owner })
    }

    pub fn clear_input(&self, user: UserId) -> Option<PendingInput> {
        self.inputs.clear(user)
    }

    // -----------------------------------------------------------------------
    // Queries
    // -----------------------------------------------------------------------

    pub async fn order(&self, owner: UserId) -> Option<Order> {
        self.state.lock().await.orders.get(owner).cloned()
    }

    pub async fn is_banned(&self, user: UserId) -> bool {
        self.state.lock().await.bans.is_banned(user)
    }

    pub async fn list_banned(&self) -> Vec<UserId> {
        self.state.lock().await.bans.list()
    }

    /// `UNDER_REVIEW` orders, oldest first.
    pub async fn list_pending(&self, limit: usize) -> Vec<Order> {
        self.state.lock().await.orders.pending(limit)
    }

    /// Live orders older than the configured TTL, oldest first.
    pub async fn list_stale(&self, now: DateTime<Utc>) -> Vec<Order> {
        let ttl = self.config.order_ttl();
        let state = self.state.lock().await;
        let mut stale: Vec<Order> = state
            .orders
            .iter()
            .filter(|o| o.status.is_live() && o.is_stale(now, ttl))
            .cloned()
            .collect();
        stale.sort_by_key(|o| (o.created_at, o.owner));
        stale
    }

    pub async fn claims(&self) -> Vec<AdminClaim> {
        self.state.lock().await.claims.claims()
    }

    pub async fn stats(&self) -> DeskStats {
        self.state.lock().await.stats()
    }

    // -----------------------------------------------------------------------
    // Snapshot / restore
    // -----------------------------------------------------------------------

    /// Encoded snapshot of the durable tables.
    pub async fn snapshot(&self) -> Result<Vec<u8>> {
        let state = self.state.lock().await;
        state.to_snapshot(Utc::now()).encode()
    }

    /// Replace all state with `blob` and write it through.
    ///
    /// On any failure the tables are left empty and the error is returned.
    /// Claims and pending inputs are always discarded.
    pub async fn restore(&self, blob: &[u8]) -> Result<()> {
        let mut state = self.state.lock().await;
        self.inputs.clear_all();
        let result = match Snapshot::decode(blob).and_then(DeskState::from_snapshot) {
            Ok(restored) => {
                *state = restored;
                self.persist(&state).await
            }
            Err(e) => Err(e),
        };
        match &result {
            Ok(()) => tracing::info!(
                orders = state.orders.len(),
                banned = state.bans.len(),
                "State restored from snapshot"
            ),
            Err(e) => {
                *state = DeskState::new();
                tracing::error!(error = %e, "Restore failed, tables cleared");
            }
        }
        result
    }

    // -----------------------------------------------------------------------
    // Internals
    // -----------------------------------------------------------------------

    /// Run `mutate` against `state` and write the result through.
    ///
    /// If `mutate` fails or the snapshot write fails, `state` is put back
    /// exactly as it was.
    async fn apply<T>(
        &self,
        state: &mut DeskState,
        mutate: impl FnOnce(&mut DeskState) -> Result<T>,
    ) -> Result<T> {
        let checkpoint = state.clone();
        let value = match mutate(state) {
            Ok(value) => value,
            Err(e) => {
                *state = checkpoint;
                return Err(e);
            }
        };
        if let Err(e) = self.persist(state).await {
            *state = checkpoint;
            tracing::warn!(error = %e, "Mutation rolled back");
            return Err(e);
        }
        Ok(value)
    }

    /// Write `state` through on the blocking pool. The table mutex stays held
    /// by the caller, so nothing observes the new state before it is durable.
    async fn persist(&self, state: &DeskState) -> Result<()> {
        let blob = self.gateway.encode(state, Utc::now())?;
        let gateway = Arc::clone(&self.gateway);
        tokio::task::spawn_blocking(move || gateway.write(&blob))
            .await
            .map_err(|e| DeskError::Internal(format!("snapshot writer stopped: {e}")))?
    }

    fn require_operator(&self, user: UserId) -> Result<()> {
        if self.config.is_operator(user) {
            Ok(())
        } else {
            Err(DeskError::NotOperator(user))
        }
    }
}

fn order_of(state: &DeskState, owner: UserId) -> Result<&Order> {
    state.orders.get(owner).ok_or(DeskError::NoOrder(owner))
}

fn cancel_in(state: &mut DeskState, owner: UserId) -> Result<Cancellation> {
    let order = state.orders.cancel(owner)?;
    let released_operators = state
        .claims
        .release_owner(owner)
        .map(|claim| claim.operator)
        .into_iter()
        .collect();
    Ok(Cancellation {
        order,
        released_operators,
    })
}

fn traced<T>(op: &'static str, user: UserId, result: Result<T>) -> Result<T> {
    if let Err(e) = &result {
        match e.class() {
            ErrorClass::Persistence | ErrorClass::Internal => {
                tracing::error!(op, user = %user, error = %e, "Operation failed");
            }
            _ => tracing::debug!(op, user = %user, error = %e, "Operation rejected"),
        }
    }
    result
}
