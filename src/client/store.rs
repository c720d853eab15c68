//! In-memory cart state for one storefront session.
//!
//! The store caches the last cart the server confirmed and routes every
//! change through the [`CartGateway`]. While a change is in flight the
//! displayed cart is a provisional copy; once the server answers, the
//! confirmed cart is replaced wholesale, or the previous one is restored if
//! the change failed.

use std::sync::{
    Arc,
    atomic::{AtomicU64, Ordering},
};

use tokio::{
    runtime::Handle,
    sync::{Mutex, MutexGuard, watch},
    task::JoinHandle,
};

use crate::{
    client::{
        error::CartError,
        executor::RequestExecutor,
        gateway::{CartGateway, CartIntent},
        session::{Session, SessionState},
    },
    models::{Cart, ProductId},
    pricing::{PricingPolicy, PricingSummary, summarize},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CartPhase {
    #[default]
    Unloaded,
    Loading,
    Ready,
    /// A change is in flight; the displayed cart is provisional.
    Mutating,
}

/// What to do with a change requested while another one is in flight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MutationMode {
    /// Wait for the earlier changes, in the order they were requested.
    #[default]
    Queue,
    /// Fail immediately with [`CartError::Busy`].
    Reject,
}

/// Read-only view of the store handed to subscribers.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CartView {
    pub phase: CartPhase,
    /// The cart to display: provisional while mutating, confirmed otherwise.
    pub cart: Option<Cart>,
    /// The last cart the server confirmed.
    pub confirmed: Option<Cart>,
    /// Set after a failed change until the next successful round-trip.
    pub stale: bool,
    pub last_error: Option<CartError>,
}

impl CartView {
    pub fn item_count(&self) -> i64 {
        self.cart.as_ref().map_or(0, Cart::item_count)
    }

    pub fn line_count(&self) -> usize {
        self.cart.as_ref().map_or(0, Cart::line_count)
    }

    /// Totals of the confirmed cart; provisional quantities are never priced.
    pub fn pricing(&self, policy: &PricingPolicy) -> Option<PricingSummary> {
        self.confirmed.as_ref().map(|cart| summarize(cart, policy))
    }

    fn ready(cart: Cart) -> Self {
        Self {
            phase: CartPhase::Ready,
            cart: Some(cart.clone()),
            confirmed: Some(cart),
            stale: false,
            last_error: None,
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct StoreOptions {
    pub mode: MutationMode,
}

/// Owns the cart snapshot of one signed-in session.
///
/// Build one per session, call [`CartStore::init`] once signed in and
/// [`CartStore::teardown`] on sign-out. Share it behind an `Arc` when
/// several UI tasks issue changes.
///
/// Created inside a Tokio runtime, the store follows the [`Session`] on its
/// own: signing out or switching identity clears the view that
/// [`CartStore::subscribe`] receivers see without any further call.
#[derive(Debug)]
pub struct CartStore<E> {
    gateway: CartGateway<E>,
    session: Session,
    options: StoreOptions,
    shared: Arc<Shared>,
    mutations: Mutex<()>,
    follower: Option<JoinHandle<()>>,
}

#[derive(Debug)]
struct Shared {
    view: watch::Sender<CartView>,
    // session generation the cached cart belongs to, 0 when none
    owner: AtomicU64,
    // bumped on every reset so late responses can be discarded
    epoch: AtomicU64,
}

impl Shared {
    fn follow(&self, identity: Option<u64>) {
        let owner = self.owner.load(Ordering::SeqCst);
        if owner != 0 && identity != Some(owner) {
            self.reset("session changed");
        }
    }

    fn reset(&self, reason: &str) {
        self.epoch.fetch_add(1, Ordering::SeqCst);
        let had_cart = self.owner.swap(0, Ordering::SeqCst) != 0;
        self.view.send_replace(CartView::default());
        if had_cart {
            tracing::info!(reason, "cart cleared");
        }
    }
}

async fn follow_session(shared: Arc<Shared>, mut session: watch::Receiver<SessionState>) {
    while session.changed().await.is_ok() {
        let identity = session.borrow_and_update().identity();
        shared.follow(identity);
    }
}

impl<E> Drop for CartStore<E> {
    fn drop(&mut self) {
        if let Some(follower) = self.follower.take() {
            follower.abort();
        }
    }
}

impl<E: RequestExecutor> CartStore<E> {
    pub fn new(gateway: CartGateway<E>, session: Session, options: StoreOptions) -> Self {
        let (view, _) = watch::channel(CartView::default());
        let shared = Arc::new(Shared {
            view,
            owner: AtomicU64::new(0),
            epoch: AtomicU64::new(0),
        });
        let follower = match Handle::try_current() {
            Ok(runtime) => Some(runtime.spawn(follow_session(Arc::clone(&shared), session.subscribe()))),
            Err(_) => {
                tracing::warn!("no tokio runtime, sign-out is only noticed on the next store access");
                None
            }
        };
        Self {
            gateway,
            session,
            options,
            shared,
            mutations: Mutex::new(()),
            follower,
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<CartView> {
        self.shared.view.subscribe()
    }

    pub fn snapshot(&self) -> CartView {
        self.check_identity();
        self.shared.view.borrow().clone()
    }

    pub fn phase(&self) -> CartPhase {
        self.snapshot().phase
    }

    pub fn cart(&self) -> Option<Cart> {
        self.snapshot().cart
    }

    pub fn item_count(&self) -> i64 {
        self.snapshot().item_count()
    }

    pub fn line_count(&self) -> usize {
        self.snapshot().line_count()
    }

    pub fn pricing(&self, policy: &PricingPolicy) -> Option<PricingSummary> {
        self.snapshot().pricing(policy)
    }

    /// Loads the cart for the session that just signed in.
    pub async fn init(&self) -> Result<Cart, CartError> {
        tracing::debug!("cart session starting");
        self.refresh().await
    }

    /// Re-fetches the cart from the server, replacing the cached one.
    pub async fn refresh(&self) -> Result<Cart, CartError> {
        let _turn = self.turn().await?;
        let (epoch, identity) = self.begin()?;

        self.shared.view.send_modify(|view| {
            view.phase = CartPhase::Loading;
            view.last_error = None;
        });

        let result = self.gateway.fetch_own_cart().await;
        if !self.still_current(epoch, identity) {
            return Err(CartError::Unauthenticated);
        }

        match result {
            Ok(cart) => {
                self.commit(identity, cart.clone())?;
                tracing::debug!(lines = cart.line_count(), "cart loaded");
                Ok(cart)
            }
            Err(err) => Err(self.fail(err)),
        }
    }

    /// Drops the cached cart. Responses still in flight are discarded.
    pub fn teardown(&self) {
        self.shared.reset("teardown");
    }

    pub async fn add_one(&self, product_id: ProductId) -> Result<Cart, CartError> {
        self.mutate(CartIntent::AddOne(product_id)).await
    }

    pub async fn remove_one(&self, product_id: ProductId) -> Result<Cart, CartError> {
        self.mutate(CartIntent::RemoveOne(product_id)).await
    }

    pub async fn clear_item(&self, product_id: ProductId) -> Result<Cart, CartError> {
        self.mutate(CartIntent::ClearItem(product_id)).await
    }

    pub async fn set_quantity(&self, product_id: ProductId, quantity: i32) -> Result<Cart, CartError> {
        self.mutate(CartIntent::SetQuantity(product_id, quantity)).await
    }

    // Invalid input is only reported to the caller; the view is left alone.
    async fn mutate(&self, intent: CartIntent) -> Result<Cart, CartError> {
        intent.validate()?;

        let _turn = self.turn().await?;
        let (epoch, identity) = self.begin()?;

        let previous = self.shared.view.borrow().confirmed.clone();
        self.shared.view.send_modify(|view| {
            view.phase = CartPhase::Mutating;
            view.cart = previous.as_ref().map(|cart| intent.provisional(cart));
            view.last_error = None;
        });
        tracing::debug!(product_id = intent.product_id(), ?intent, "cart change started");

        let result = self.gateway.submit(intent).await;
        if !self.still_current(epoch, identity) {
            tracing::debug!(?intent, "session changed mid-flight, discarding response");
            return Err(CartError::Unauthenticated);
        }

        match result {
            Ok(cart) => {
                self.commit(identity, cart.clone())?;
                tracing::debug!(?intent, items = cart.item_count(), "cart change confirmed");
                Ok(cart)
            }
            Err(err) => {
                tracing::warn!(product_id = intent.product_id(), ?intent, error = %err, "cart change failed");
                Err(self.fail(err))
            }
        }
    }

    async fn turn(&self) -> Result<MutexGuard<'_, ()>, CartError> {
        match self.options.mode {
            MutationMode::Queue => Ok(self.mutations.lock().await),
            MutationMode::Reject => self.mutations.try_lock().map_err(|_| CartError::Busy),
        }
    }

    // Checks the session before a round-trip and returns what the response must still match.
    fn begin(&self) -> Result<(u64, u64), CartError> {
        self.check_identity();
        match self.session.identity() {
            Some(identity) => Ok((self.shared.epoch.load(Ordering::SeqCst), identity)),
            None => {
                self.shared.reset("not signed in");
                self.shared
                    .view
                    .send_modify(|view| view.last_error = Some(CartError::Unauthenticated));
                Err(CartError::Unauthenticated)
            }
        }
    }

    fn still_current(&self, epoch: u64, identity: u64) -> bool {
        if self.shared.epoch.load(Ordering::SeqCst) != epoch {
            return false;
        }
        if self.session.identity() != Some(identity) {
            self.shared.reset("session changed");
            return false;
        }
        true
    }

    // A sign-out racing the publish is caught either here or by the follower,
    // which sees `owner` already set.
    fn commit(&self, identity: u64, cart: Cart) -> Result<(), CartError> {
        if self.session.identity() != Some(identity) {
            self.shared.reset("session changed");
            return Err(CartError::Unauthenticated);
        }
        self.shared.owner.store(identity, Ordering::SeqCst);
        self.shared.view.send_replace(CartView::ready(cart));
        if self.session.identity() != Some(identity) {
            self.shared.reset("session changed");
            return Err(CartError::Unauthenticated);
        }
        Ok(())
    }

    // Restores the last confirmed cart; an authorization loss clears it instead.
    fn fail(&self, err: CartError) -> CartError {
        if err == CartError::Unauthenticated {
            self.shared.reset("credential rejected");
        } else {
            self.shared.view.send_modify(|view| {
                view.phase = if view.confirmed.is_some() {
                    CartPhase::Ready
                } else {
                    CartPhase::Unloaded
                };
                view.cart = view.confirmed.clone();
                view.stale = true;
            });
        }
        self.shared
            .view
            .send_modify(|view| view.last_error = Some(err.clone()));
        err
    }

    fn check_identity(&self) {
        self.shared.follow(self.session.identity());
    }
}

#[cfg(test)]
mod tests {
    use std::{collections::VecDeque, sync::Arc, time::Duration};

    use async_trait::async_trait;
    use reqwest::Method;
    use serde_json::{Value, json};
    use testresult::TestResult;
    use tokio::sync::{Notify, oneshot};
    use uuid::Uuid;

    use super::*;
    use crate::{
        client::{error::NetworkErrorKind, executor::MockRequestExecutor},
        models::{Book, CartLine},
    };

    const PRICE: i64 = 1_250;

    fn book(id: ProductId) -> Book {
        Book {
            id,
            title: format!("Book {id}"),
            price: PRICE,
            stock: 50,
            active: true,
        }
    }

    fn cart_with(lines: &[(ProductId, i32)]) -> Cart {
        let mut cart = Cart::empty(Uuid::nil());
        for (index, (id, quantity)) in lines.iter().enumerate() {
            cart.upsert_line(CartLine::new(index as i64 + 1, &book(*id), *quantity));
        }
        cart
    }

    fn envelope(cart: &Cart) -> Value {
        json!({ "message": "OK", "data": cart, "meta": null })
    }

    fn signed_in() -> Session {
        let session = Session::new();
        session.sign_in("token");
        session
    }

    fn store<E: RequestExecutor>(executor: E, session: Session) -> CartStore<E> {
        CartStore::new(
            CartGateway::new(executor, Duration::ZERO),
            session,
            StoreOptions::default(),
        )
    }

    type Reply = (Option<oneshot::Receiver<()>>, Result<Value, CartError>);

    /// Replies with scripted results; gated replies wait until released.
    #[derive(Default)]
    struct GatedExecutor {
        replies: std::sync::Mutex<VecDeque<Reply>>,
        requests: std::sync::Mutex<Vec<(Method, String)>>,
        started: Notify,
    }

    impl GatedExecutor {
        fn ready(&self, reply: Result<Value, CartError>) {
            self.enqueue((None, reply));
        }

        fn gated(&self, reply: Result<Value, CartError>) -> oneshot::Sender<()> {
            let (release, gate) = oneshot::channel();
            self.enqueue((Some(gate), reply));
            release
        }

        fn requests(&self) -> Vec<(Method, String)> {
            self.requests
                .lock()
                .map(|requests| requests.clone())
                .unwrap_or_default()
        }

        fn enqueue(&self, reply: Reply) {
            if let Ok(mut replies) = self.replies.lock() {
                replies.push_back(reply);
            }
        }
    }

    #[async_trait]
    impl RequestExecutor for Arc<GatedExecutor> {
        async fn execute(
            &self,
            method: Method,
            path: &str,
            _body: Option<Value>,
        ) -> Result<Value, CartError> {
            if let Ok(mut requests) = self.requests.lock() {
                requests.push((method, path.to_string()));
            }
            let next = self.replies.lock().ok().and_then(|mut replies| replies.pop_front());
            let Some((gate, reply)) = next else {
                return Err(CartError::UnexpectedResponse("no scripted reply".to_string()));
            };
            if let Some(gate) = gate {
                self.started.notify_one();
                let _ = gate.await;
            }
            reply
        }
    }

    #[tokio::test]
    async fn test_init_loads_the_server_cart() -> TestResult {
        let cart = cart_with(&[(42, 2), (7, 1)]);
        let reply = envelope(&cart);

        let mut executor = MockRequestExecutor::new();
        executor
            .expect_execute()
            .once()
            .return_once(move |_, _, _| Ok(reply));

        let store = store(executor, signed_in());
        assert_eq!(store.phase(), CartPhase::Unloaded);

        store.init().await?;

        assert_eq!(store.phase(), CartPhase::Ready);
        assert_eq!(store.cart(), Some(cart));
        assert_eq!(store.item_count(), 3);
        assert_eq!(store.line_count(), 2);

        Ok(())
    }

    #[tokio::test]
    async fn test_mutation_replaces_the_snapshot_with_the_server_cart() -> TestResult {
        let mut executor = MockRequestExecutor::new();
        let initial = envelope(&cart_with(&[(42, 1)]));
        // server also knows about a line added from another device
        let confirmed = cart_with(&[(42, 2), (9, 1)]);
        let reply = envelope(&confirmed);
        executor
            .expect_execute()
            .once()
            .withf(|method, _, _| *method == Method::GET)
            .return_once(move |_, _, _| Ok(initial));
        executor
            .expect_execute()
            .once()
            .withf(|method, _, _| *method == Method::POST)
            .return_once(move |_, _, _| Ok(reply));

        let store = store(executor, signed_in());
        store.init().await?;
        store.add_one(42).await?;

        let view = store.snapshot();
        assert_eq!(view.confirmed, Some(confirmed.clone()));
        assert_eq!(view.cart, Some(confirmed));
        assert!(!view.stale);

        Ok(())
    }

    #[tokio::test]
    async fn test_network_failure_restores_the_previous_snapshot() -> TestResult {
        let gated = Arc::new(GatedExecutor::default());
        let before = cart_with(&[(42, 1)]);

        gated.ready(Ok(envelope(&before)));
        let failure = CartError::Network {
            kind: NetworkErrorKind::Timeout,
            message: "timed out".to_string(),
        };
        let release = gated.gated(Err(failure.clone()));

        let store = Arc::new(store(Arc::clone(&gated), signed_in()));
        store.init().await?;

        let worker = {
            let store = Arc::clone(&store);
            tokio::spawn(async move { store.add_one(42).await })
        };
        gated.started.notified().await;

        // optimistic view while the request is outstanding
        let pending = store.snapshot();
        assert_eq!(pending.phase, CartPhase::Mutating);
        assert_eq!(pending.cart.as_ref().map(|cart| cart.quantity_of(42)), Some(2));
        assert_eq!(pending.confirmed, Some(before.clone()));

        let _ = release.send(());
        assert_eq!(worker.await?, Err(failure.clone()));

        let view = store.snapshot();
        assert_eq!(view.phase, CartPhase::Ready);
        assert_eq!(view.cart, Some(before.clone()));
        assert_eq!(view.confirmed, Some(before));
        assert!(view.stale);
        assert_eq!(view.last_error, Some(failure));

        Ok(())
    }

    #[tokio::test]
    async fn test_product_unavailable_is_reverted_and_surfaced() -> TestResult {
        let before = cart_with(&[(42, 1)]);
        let reply = envelope(&before);

        let mut executor = MockRequestExecutor::new();
        executor
            .expect_execute()
            .once()
            .return_once(move |_, _, _| Ok(reply));
        executor
            .expect_execute()
            .once()
            .returning(|_, _, _| Err(CartError::ProductUnavailable("out of stock".to_string())));

        let store = store(executor, signed_in());
        store.init().await?;

        let err = store.add_one(42).await;
        assert!(matches!(err, Err(CartError::ProductUnavailable(_))));
        assert_eq!(store.cart(), Some(before));
        assert!(store.snapshot().stale);

        Ok(())
    }

    #[tokio::test]
    async fn test_mutators_are_refused_without_a_session() {
        let mut executor = MockRequestExecutor::new();
        executor.expect_execute().never();

        let store = store(executor, Session::new());
        assert_eq!(store.add_one(42).await, Err(CartError::Unauthenticated));
        assert_eq!(store.init().await, Err(CartError::Unauthenticated));

        let view = store.snapshot();
        assert_eq!(view.phase, CartPhase::Unloaded);
        assert_eq!(view.last_error, Some(CartError::Unauthenticated));
    }

    #[tokio::test]
    async fn test_negative_quantity_is_rejected_locally() -> TestResult {
        let reply = envelope(&cart_with(&[(42, 3)]));
        let mut executor = MockRequestExecutor::new();
        executor
            .expect_execute()
            .once()
            .return_once(move |_, _, _| Ok(reply));

        let store = store(executor, signed_in());
        store.init().await?;

        assert!(matches!(
            store.set_quantity(42, -2).await,
            Err(CartError::InvalidQuantity(_))
        ));
        assert_eq!(store.phase(), CartPhase::Ready);
        assert_eq!(store.item_count(), 3);

        Ok(())
    }

    #[tokio::test]
    async fn test_sign_out_while_ready_clears_the_snapshot() -> TestResult {
        let reply = envelope(&cart_with(&[(42, 2)]));
        let mut executor = MockRequestExecutor::new();
        executor
            .expect_execute()
            .once()
            .return_once(move |_, _, _| Ok(reply));

        let session = signed_in();
        let store = store(executor, session.clone());
        store.init().await?;
        let mut updates = store.subscribe();
        assert_eq!(store.phase(), CartPhase::Ready);

        session.sign_out();

        let view = store.snapshot();
        assert_eq!(view.phase, CartPhase::Unloaded);
        assert_eq!(view.cart, None);
        assert_eq!(view.confirmed, None);
        assert_eq!(store.item_count(), 0);
        assert!(updates.has_changed()?);
        assert_eq!(updates.borrow_and_update().phase, CartPhase::Unloaded);

        Ok(())
    }

    #[tokio::test]
    async fn test_subscribers_see_sign_out_without_touching_the_store() -> TestResult {
        let reply = envelope(&cart_with(&[(42, 2)]));
        let mut executor = MockRequestExecutor::new();
        executor
            .expect_execute()
            .once()
            .return_once(move |_, _, _| Ok(reply));

        let session = signed_in();
        let store = store(executor, session.clone());
        store.init().await?;

        let mut updates = store.subscribe();
        assert!(updates.borrow_and_update().cart.is_some());

        session.sign_out();
        tokio::time::timeout(Duration::from_secs(1), updates.changed()).await??;

        let view = updates.borrow_and_update().clone();
        assert_eq!(view.phase, CartPhase::Unloaded);
        assert_eq!(view.cart, None);
        assert_eq!(view.confirmed, None);

        Ok(())
    }

    #[tokio::test]
    async fn test_new_identity_never_sees_the_previous_cart() -> TestResult {
        let reply = envelope(&cart_with(&[(42, 2)]));
        let mut executor = MockRequestExecutor::new();
        executor
            .expect_execute()
            .once()
            .return_once(move |_, _, _| Ok(reply));

        let session = signed_in();
        let store = store(executor, session.clone());
        store.init().await?;

        session.sign_in("someone-else");

        assert_eq!(store.cart(), None);
        assert_eq!(store.phase(), CartPhase::Unloaded);

        Ok(())
    }

    #[tokio::test]
    async fn test_response_arriving_after_sign_out_is_discarded() -> TestResult {
        let gated = Arc::new(GatedExecutor::default());
        gated.ready(Ok(envelope(&cart_with(&[(42, 1)]))));
        let release = gated.gated(Ok(envelope(&cart_with(&[(42, 2)]))));

        let session = signed_in();
        let store = Arc::new(store(Arc::clone(&gated), session.clone()));
        store.init().await?;

        let worker = {
            let store = Arc::clone(&store);
            tokio::spawn(async move { store.add_one(42).await })
        };
        gated.started.notified().await;

        session.sign_out();
        let _ = release.send(());

        assert_eq!(worker.await?, Err(CartError::Unauthenticated));
        assert_eq!(store.cart(), None);
        assert_eq!(store.phase(), CartPhase::Unloaded);

        Ok(())
    }

    #[tokio::test]
    async fn test_server_rejecting_the_credential_unloads_the_store() -> TestResult {
        let reply = envelope(&cart_with(&[(42, 1)]));
        let mut executor = MockRequestExecutor::new();
        executor
            .expect_execute()
            .once()
            .return_once(move |_, _, _| Ok(reply));
        executor
            .expect_execute()
            .once()
            .returning(|_, _, _| Err(CartError::Unauthenticated));

        let store = store(executor, signed_in());
        store.init().await?;

        assert_eq!(store.remove_one(42).await, Err(CartError::Unauthenticated));
        assert_eq!(store.phase(), CartPhase::Unloaded);
        assert_eq!(store.cart(), None);

        Ok(())
    }

    #[tokio::test]
    async fn test_queued_changes_reach_the_server_in_call_order() -> TestResult {
        let gated = Arc::new(GatedExecutor::default());
        gated.ready(Ok(envelope(&cart_with(&[(42, 5)]))));
        let release = gated.gated(Ok(envelope(&cart_with(&[]))));
        gated.ready(Ok(envelope(&cart_with(&[(42, 1)]))));
        gated.ready(Ok(envelope(&cart_with(&[(42, 2)]))));

        let store = Arc::new(store(Arc::clone(&gated), signed_in()));
        store.init().await?;

        let first = {
            let store = Arc::clone(&store);
            tokio::spawn(async move { store.clear_item(42).await })
        };
        gated.started.notified().await;

        let set = {
            let store = Arc::clone(&store);
            tokio::spawn(async move { store.set_quantity(42, 1).await })
        };
        tokio::task::yield_now().await;
        let add = {
            let store = Arc::clone(&store);
            tokio::spawn(async move { store.add_one(42).await })
        };
        tokio::task::yield_now().await;

        let _ = release.send(());
        first.await??;
        set.await??;
        let cart = add.await??;

        let paths: Vec<_> = gated
            .requests()
            .into_iter()
            .map(|(method, path)| format!("{method} {path}"))
            .collect();
        assert_eq!(
            paths,
            [
                "GET /api/carts/me",
                "POST /api/carts/me/clear-item",
                "PUT /api/carts/me/quantity",
                "POST /api/carts/me/add-one",
            ]
        );
        assert_eq!(cart.quantity_of(42), 2);
        assert_eq!(store.cart().map(|cart| cart.quantity_of(42)), Some(2));

        Ok(())
    }

    #[tokio::test]
    async fn test_invalid_quantity_leaves_the_view_untouched() -> TestResult {
        let gated = Arc::new(GatedExecutor::default());
        gated.ready(Ok(envelope(&cart_with(&[(42, 1)]))));
        let release = gated.gated(Ok(envelope(&cart_with(&[(42, 2)]))));

        let store = Arc::new(store(Arc::clone(&gated), signed_in()));
        store.init().await?;

        let worker = {
            let store = Arc::clone(&store);
            tokio::spawn(async move { store.add_one(42).await })
        };
        gated.started.notified().await;

        let mut updates = store.subscribe();
        assert!(matches!(
            store.set_quantity(42, -1).await,
            Err(CartError::InvalidQuantity(_))
        ));
        assert!(!updates.has_changed()?);
        assert_eq!(updates.borrow_and_update().last_error, None);

        let _ = release.send(());
        worker.await??;

        let view = store.snapshot();
        assert_eq!(view.phase, CartPhase::Ready);
        assert_eq!(view.last_error, None);
        assert_eq!(view.item_count(), 2);

        Ok(())
    }

    #[tokio::test]
    async fn test_reject_mode_reports_busy() -> TestResult {
        let gated = Arc::new(GatedExecutor::default());
        let release = gated.gated(Ok(envelope(&cart_with(&[(42, 1)]))));

        let store = Arc::new(CartStore::new(
            CartGateway::new(Arc::clone(&gated), Duration::ZERO),
            signed_in(),
            StoreOptions {
                mode: MutationMode::Reject,
            },
        ));

        let worker = {
            let store = Arc::clone(&store);
            tokio::spawn(async move { store.add_one(42).await })
        };
        gated.started.notified().await;

        assert_eq!(store.add_one(42).await, Err(CartError::Busy));

        let _ = release.send(());
        assert!(worker.await?.is_ok());

        Ok(())
    }

    #[tokio::test]
    async fn test_teardown_discards_the_cart() -> TestResult {
        let reply = envelope(&cart_with(&[(42, 1)]));
        let mut executor = MockRequestExecutor::new();
        executor
            .expect_execute()
            .once()
            .return_once(move |_, _, _| Ok(reply));

        let store = store(executor, signed_in());
        store.init().await?;
        store.teardown();

        assert_eq!(store.snapshot(), CartView::default());
        assert_eq!(store.pricing(&PricingPolicy::default()), None);

        Ok(())
    }

    #[tokio::test]
    async fn test_pricing_follows_the_confirmed_cart() -> TestResult {
        // 2 x 12.50 = 25.00
        let reply = envelope(&cart_with(&[(42, 2)]));
        let mut executor = MockRequestExecutor::new();
        executor
            .expect_execute()
            .once()
            .return_once(move |_, _, _| Ok(reply));

        let store = store(executor, signed_in());
        store.init().await?;

        let summary = store.pricing(&PricingPolicy::default());
        assert_eq!(
            summary,
            Some(PricingSummary {
                subtotal: 2_500,
                discount_amount: 250,
                shipping_fee: 0,
                grand_total: 2_250,
            })
        );

        Ok(())
    }
}
