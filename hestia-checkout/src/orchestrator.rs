use crate::allocation::RoomPick;
use crate::backend::{
    BookingBackend, BookingCreated, BookingLine, CreateBookingRequest, CreateMultiBookingRequest,
    DeadlineStatus, GatewayOrder, GatewayRedirect, LoyaltyAward,
};
use crate::draft::BookingDraft;
use crate::loyalty::LoyaltyTrigger;
use crate::models::{PaymentSession, StayError, StayRequest};
use chrono::{Duration as ChronoDuration, Utc};
use hestia_core::booking::{BookingRecord, BookingStatus};
use hestia_core::payment::{GatewayProvider, PaymentMethod, PaymentStatus, TransferInstructions};
use hestia_core::{BackendError, BackendResult};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio::time::{interval, sleep, Duration};
use tracing::{error, info};
use uuid::Uuid;

/// Checkout lifecycle. Paid, Canceled and Expired are terminal; the two
/// awaiting states and the gateway redirect are where orchestration hands
/// control elsewhere (the property desk, the guest's bank, the gateway).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckoutState {
    Draft,
    Submitting,
    AwaitingBankTransfer,
    AwaitingFrontDesk,
    RedirectingToGateway { pay_url: String },
    Paid,
    Canceled,
    Expired,
}

impl CheckoutState {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            CheckoutState::Paid | CheckoutState::Canceled | CheckoutState::Expired
        )
    }
}

/// Notifications for UI subscribers.
#[derive(Debug, Clone)]
pub enum CheckoutEvent {
    StateChanged(CheckoutState),
    BookingCreated {
        booking_id: Uuid,
    },
    DeadlineExpired {
        booking_id: Uuid,
    },
    PollFailed {
        message: String,
    },
    LoyaltyAwarded {
        points_earned: i64,
        total_points: i64,
    },
    LoyaltySkipped,
}

#[derive(Debug, thiserror::Error)]
pub enum CheckoutError {
    #[error("No stay dates selected")]
    MissingStay,
    #[error(transparent)]
    InvalidStay(#[from] StayError),
    #[error("No rooms selected")]
    EmptySelection,
    #[error("Selected rooms sleep {capacity} guests but {required} must be covered")]
    InsufficientCapacity { capacity: i32, required: i32 },
    #[error("No payment method selected")]
    NoPaymentMethod,
    #[error("Guest contact details are required for multi-room bookings")]
    MissingCustomer,
    #[error("No payment session is active")]
    NoActiveSession,
    #[error("Invalid state transition from {from} to {to}")]
    InvalidTransition { from: String, to: String },
    #[error("Booking submission failed: {0}")]
    SubmissionFailed(String),
    #[error(transparent)]
    Backend(#[from] BackendError),
}

/// Deadline-poll cadence. Coarse on purpose: ticks are independent and need
/// no overlap control.
#[derive(Debug, Clone)]
pub struct CheckoutRules {
    pub poll_initial_delay: Duration,
    pub poll_interval: Duration,
}

impl Default for CheckoutRules {
    fn default() -> Self {
        Self {
            poll_initial_delay: Duration::from_secs(5),
            poll_interval: Duration::from_secs(30),
        }
    }
}

struct CheckoutInner {
    state: CheckoutState,
    session: Option<PaymentSession>,
}

/// Drives a booking from form submission to a terminal payment state,
/// branching per payment method.
///
/// Business rule: cash bookings settle at the front desk, so their payment
/// session stays Pending until the property confirms. The single-room and
/// multi-room paths follow the same rule.
pub struct CheckoutOrchestrator {
    backend: Arc<dyn BookingBackend>,
    rules: CheckoutRules,
    inner: Arc<Mutex<CheckoutInner>>,
    events: broadcast::Sender<CheckoutEvent>,
    poll_task: Mutex<Option<JoinHandle<()>>>,
}

impl CheckoutOrchestrator {
    pub fn new(backend: Arc<dyn BookingBackend>, rules: CheckoutRules) -> Self {
        let (events, _) = broadcast::channel(64);
        Self {
            backend,
            rules,
            inner: Arc::new(Mutex::new(CheckoutInner {
                state: CheckoutState::Draft,
                session: None,
            })),
            events,
            poll_task: Mutex::new(None),
        }
    }

    pub fn state(&self) -> CheckoutState {
        self.lock_inner().state.clone()
    }

    pub fn session(&self) -> Option<PaymentSession> {
        self.lock_inner().session.clone()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<CheckoutEvent> {
        self.events.subscribe()
    }

    /// Submit the draft. Validation and the capacity check run locally and
    /// reject before any network call; a failed backend call returns the
    /// machine to Draft so the guest can retry.
    pub async fn submit(
        &self,
        draft: &BookingDraft,
        picks: &[RoomPick],
        total_minor: i64,
    ) -> Result<CheckoutState, CheckoutError> {
        {
            let guard = self.lock_inner();
            if guard.state != CheckoutState::Draft {
                return Err(CheckoutError::InvalidTransition {
                    from: format!("{:?}", guard.state),
                    to: "SUBMITTING".to_string(),
                });
            }
        }

        let stay = draft.stay.as_ref().ok_or(CheckoutError::MissingStay)?;
        stay.validate()?;
        if picks.is_empty() {
            return Err(CheckoutError::EmptySelection);
        }

        let required = stay.occupants();
        let capacity: i32 = picks.iter().map(RoomPick::covered_capacity).sum();
        if capacity < required {
            return Err(CheckoutError::InsufficientCapacity { capacity, required });
        }

        let method = draft.payment_method.ok_or(CheckoutError::NoPaymentMethod)?;
        let multi_room = picks.len() > 1;
        if multi_room && draft.customer.is_none() {
            return Err(CheckoutError::MissingCustomer);
        }

        self.set_state(CheckoutState::Submitting);

        let created = match self.create(draft, stay, picks, method, total_minor).await {
            Ok(created) => created,
            Err(err) => {
                error!("Booking submission failed: {}", err);
                self.set_state(CheckoutState::Draft);
                return Err(CheckoutError::SubmissionFailed(err.to_string()));
            }
        };

        let booking_id = created.booking.id;
        {
            let mut guard = self.lock_inner();
            guard.session = Some(PaymentSession {
                booking_id,
                status: PaymentStatus::Pending,
                instructions: created.instructions.clone(),
                deadline: created.payment_deadline,
            });
        }
        let _ = self.events.send(CheckoutEvent::BookingCreated { booking_id });
        info!("Booking {} created, paying via {:?}", booking_id, method);

        match method {
            PaymentMethod::Cash => {
                self.set_state(CheckoutState::AwaitingFrontDesk);
            }
            PaymentMethod::BankTransfer => {
                self.set_state(CheckoutState::AwaitingBankTransfer);
                self.start_deadline_poll(booking_id);
            }
            PaymentMethod::MobileWallet => {
                self.redirect_to_gateway(GatewayProvider::Wallet, booking_id, total_minor)
                    .await?;
            }
            PaymentMethod::CardGateway => {
                self.redirect_to_gateway(GatewayProvider::Card, booking_id, total_minor)
                    .await?;
            }
        }

        Ok(self.state())
    }

    /// Manual payment confirmation for a running bank transfer.
    pub async fn simulate_payment(&self) -> Result<(), CheckoutError> {
        let booking_id = {
            let guard = self.lock_inner();
            if guard.state != CheckoutState::AwaitingBankTransfer {
                return Err(CheckoutError::InvalidTransition {
                    from: format!("{:?}", guard.state),
                    to: "PAID".to_string(),
                });
            }
            guard
                .session
                .as_ref()
                .map(|session| session.booking_id)
                .ok_or(CheckoutError::NoActiveSession)?
        };

        let record = self.backend.confirm_payment(booking_id).await?;
        if record.payment_status == PaymentStatus::Paid && transition_paid(&self.inner, &self.events)
        {
            self.stop_polling();
            info!("Booking {} paid", booking_id);
            award_points(&self.backend, &self.events, booking_id).await;
        }
        Ok(())
    }

    /// Tear the poll timer down, e.g. when the booking screen unmounts.
    pub fn teardown(&self) {
        self.stop_polling();
    }

    async fn create(
        &self,
        draft: &BookingDraft,
        stay: &StayRequest,
        picks: &[RoomPick],
        method: PaymentMethod,
        total_minor: i64,
    ) -> BackendResult<BookingCreated> {
        if let [only] = picks {
            let req = CreateBookingRequest {
                room_id: only.room.id,
                units: only.units,
                checkin: stay.checkin,
                checkout: stay.checkout,
                adults: stay.adults,
                children: stay.children.clone(),
                payment_method: method,
                total_minor,
            };
            self.backend.create_booking(&req).await
        } else {
            let customer = draft
                .customer
                .clone()
                .ok_or_else(|| BackendError::Rejected("customer details missing".to_string()))?;
            let req = CreateMultiBookingRequest {
                rooms: picks
                    .iter()
                    .map(|pick| BookingLine {
                        room_id: pick.room.id,
                        units: pick.units,
                    })
                    .collect(),
                checkin: stay.checkin,
                checkout: stay.checkout,
                adults: stay.adults,
                children: stay.children.clone(),
                payment_method: method,
                total_minor,
                customer,
            };
            self.backend.create_multi_booking(&req).await
        }
    }

    async fn redirect_to_gateway(
        &self,
        provider: GatewayProvider,
        booking_id: Uuid,
        amount_minor: i64,
    ) -> Result<(), CheckoutError> {
        let order = GatewayOrder {
            booking_id,
            order_ref: format!("HSTA-{}", booking_id.simple()),
            amount_minor,
        };
        match self.backend.create_gateway_redirect(provider, &order).await {
            Ok(redirect) => {
                info!("Redirecting booking {} to {}", booking_id, provider.slug());
                self.set_state(CheckoutState::RedirectingToGateway {
                    pay_url: redirect.pay_url,
                });
                Ok(())
            }
            Err(err) => {
                error!("Gateway redirect failed for booking {}: {}", booking_id, err);
                self.set_state(CheckoutState::Draft);
                Err(CheckoutError::SubmissionFailed(err.to_string()))
            }
        }
    }

    fn start_deadline_poll(&self, booking_id: Uuid) {
        let backend = Arc::clone(&self.backend);
        let inner = Arc::clone(&self.inner);
        let events = self.events.clone();
        let rules = self.rules.clone();
        let handle = tokio::spawn(async move {
            run_deadline_poll(backend, inner, events, rules, booking_id).await;
        });

        let mut slot = self.poll_task.lock().expect("poll task lock poisoned");
        if let Some(old) = slot.replace(handle) {
            old.abort();
        }
    }

    fn stop_polling(&self) {
        let mut slot = self.poll_task.lock().expect("poll task lock poisoned");
        if let Some(handle) = slot.take() {
            handle.abort();
        }
    }

    fn set_state(&self, next: CheckoutState) {
        {
            let mut guard = self.lock_inner();
            if guard.state == next {
                return;
            }
            guard.state = next.clone();
        }
        let _ = self.events.send(CheckoutEvent::StateChanged(next));
    }

    fn lock_inner(&self) -> MutexGuard<'_, CheckoutInner> {
        self.inner.lock().expect("checkout state lock poisoned")
    }
}

impl Drop for CheckoutOrchestrator {
    fn drop(&mut self) {
        self.stop_polling();
    }
}

/// AwaitingBankTransfer → Paid, exactly once. Returns false when the
/// machine already left that state.
fn transition_paid(
    inner: &Mutex<CheckoutInner>,
    events: &broadcast::Sender<CheckoutEvent>,
) -> bool {
    {
        let mut guard = inner.lock().expect("checkout state lock poisoned");
        if guard.state != CheckoutState::AwaitingBankTransfer {
            return false;
        }
        guard.state = CheckoutState::Paid;
        if let Some(session) = guard.session.as_mut() {
            session.status = PaymentStatus::Paid;
        }
    }
    let _ = events.send(CheckoutEvent::StateChanged(CheckoutState::Paid));
    true
}

/// AwaitingBankTransfer → Canceled, exactly once, when the backend reports
/// the booking canceled out from under the guest.
fn transition_canceled(
    inner: &Mutex<CheckoutInner>,
    events: &broadcast::Sender<CheckoutEvent>,
) -> bool {
    {
        let mut guard = inner.lock().expect("checkout state lock poisoned");
        if guard.state != CheckoutState::AwaitingBankTransfer {
            return false;
        }
        guard.state = CheckoutState::Canceled;
        if let Some(session) = guard.session.as_mut() {
            session.status = PaymentStatus::Canceled;
        }
    }
    let _ = events.send(CheckoutEvent::StateChanged(CheckoutState::Canceled));
    true
}

/// AwaitingBankTransfer → Expired, exactly once. Repeated ticks after
/// expiry must not re-fire the cancellation side effects.
fn transition_expired(
    inner: &Mutex<CheckoutInner>,
    events: &broadcast::Sender<CheckoutEvent>,
    booking_id: Uuid,
) -> bool {
    {
        let mut guard = inner.lock().expect("checkout state lock poisoned");
        if guard.state != CheckoutState::AwaitingBankTransfer {
            return false;
        }
        guard.state = CheckoutState::Expired;
        if let Some(session) = guard.session.as_mut() {
            session.status = PaymentStatus::Expired;
        }
    }
    let _ = events.send(CheckoutEvent::DeadlineExpired { booking_id });
    let _ = events.send(CheckoutEvent::StateChanged(CheckoutState::Expired));
    true
}

async fn award_points(
    backend: &Arc<dyn BookingBackend>,
    events: &broadcast::Sender<CheckoutEvent>,
    booking_id: Uuid,
) {
    let trigger = LoyaltyTrigger::new(Arc::clone(backend));
    match trigger.on_booking_settled(booking_id).await {
        Some(transaction) => {
            let _ = events.send(CheckoutEvent::LoyaltyAwarded {
                points_earned: transaction.points_earned,
                total_points: transaction.total_points,
            });
        }
        None => {
            let _ = events.send(CheckoutEvent::LoyaltySkipped);
        }
    }
}

/// The deadline loop: short initial delay, then a fixed coarse interval.
/// Any poll failure stops the loop; the guest re-checks manually rather
/// than the engine retrying forever.
async fn run_deadline_poll(
    backend: Arc<dyn BookingBackend>,
    inner: Arc<Mutex<CheckoutInner>>,
    events: broadcast::Sender<CheckoutEvent>,
    rules: CheckoutRules,
    booking_id: Uuid,
) {
    sleep(rules.poll_initial_delay).await;
    let mut ticker = interval(rules.poll_interval);

    loop {
        ticker.tick().await;

        {
            let guard = inner.lock().expect("checkout state lock poisoned");
            if guard.state != CheckoutState::AwaitingBankTransfer {
                break;
            }
        }

        match backend.booking_by_id(booking_id).await {
            Ok(record) if record.payment_status == PaymentStatus::Paid => {
                if transition_paid(&inner, &events) {
                    info!("Booking {} observed paid by poll", booking_id);
                    award_points(&backend, &events, booking_id).await;
                }
                break;
            }
            Ok(record) if record.payment_status == PaymentStatus::Canceled => {
                if transition_canceled(&inner, &events) {
                    info!("Booking {} observed canceled by poll", booking_id);
                }
                break;
            }
            Ok(_) => {}
            Err(err) => {
                error!("Payment status poll failed for booking {}: {}", booking_id, err);
                let _ = events.send(CheckoutEvent::PollFailed {
                    message: err.to_string(),
                });
                break;
            }
        }

        match backend.payment_deadline(booking_id).await {
            Ok(status) if status.expired => {
                if transition_expired(&inner, &events, booking_id) {
                    info!("Payment deadline elapsed for booking {}", booking_id);
                }
                break;
            }
            Ok(_) => {}
            Err(err) => {
                error!("Deadline poll failed for booking {}: {}", booking_id, err);
                let _ = events.send(CheckoutEvent::PollFailed {
                    message: err.to_string(),
                });
                break;
            }
        }
    }
}

/// In-memory backend for tests and local development.
#[derive(Default)]
pub struct MockBookingBackend {
    state: Mutex<MockState>,
}

#[derive(Default)]
struct MockState {
    bookings: HashMap<Uuid, BookingRecord>,
    fail_create: bool,
    fail_status_poll: bool,
    fail_deadline_poll: bool,
    fail_loyalty: bool,
    expire_after_deadline_checks: Option<u32>,
    deadline_checks: u32,
    create_calls: u32,
    loyalty_calls: u32,
    total_points: i64,
}

impl MockBookingBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_fail_create(&self, fail: bool) {
        self.lock().fail_create = fail;
    }

    pub fn set_fail_status_poll(&self, fail: bool) {
        self.lock().fail_status_poll = fail;
    }

    pub fn set_fail_deadline_poll(&self, fail: bool) {
        self.lock().fail_deadline_poll = fail;
    }

    pub fn set_fail_loyalty(&self, fail: bool) {
        self.lock().fail_loyalty = fail;
    }

    /// Report the deadline as expired from the nth deadline check on.
    pub fn expire_after_deadline_checks(&self, checks: u32) {
        self.lock().expire_after_deadline_checks = Some(checks);
    }

    /// Payment arriving on the backend side, to be observed by polling.
    pub fn settle_payment(&self, booking_id: Uuid) {
        if let Some(record) = self.lock().bookings.get_mut(&booking_id) {
            record.payment_status = PaymentStatus::Paid;
            record.updated_at = Utc::now();
        }
    }

    /// Backend-side cancellation, to be observed by polling.
    pub fn cancel_booking(&self, booking_id: Uuid) {
        if let Some(record) = self.lock().bookings.get_mut(&booking_id) {
            record.status = BookingStatus::Cancelled;
            record.payment_status = PaymentStatus::Canceled;
            record.updated_at = Utc::now();
        }
    }

    pub fn create_calls(&self) -> u32 {
        self.lock().create_calls
    }

    pub fn deadline_checks(&self) -> u32 {
        self.lock().deadline_checks
    }

    pub fn loyalty_calls(&self) -> u32 {
        self.lock().loyalty_calls
    }

    fn lock(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().expect("mock backend lock poisoned")
    }

    fn accept(&self, payment_method: PaymentMethod) -> BackendResult<BookingCreated> {
        let mut state = self.lock();
        state.create_calls += 1;
        if state.fail_create {
            return Err(BackendError::Transport("connection refused".to_string()));
        }

        let record = BookingRecord {
            id: Uuid::new_v4(),
            status: BookingStatus::Confirmed,
            payment_status: PaymentStatus::Pending,
            updated_at: Utc::now(),
        };
        state.bookings.insert(record.id, record.clone());

        let bank_transfer = payment_method == PaymentMethod::BankTransfer;
        Ok(BookingCreated {
            booking: record,
            instructions: bank_transfer.then(|| TransferInstructions {
                bank_name: "First Harbour Bank".to_string(),
                account_name: "Hestia Stays Ltd".to_string(),
                account_number: "0011223344".to_string(),
                transfer_note: "booking reference in the note".to_string(),
            }),
            payment_deadline: bank_transfer.then(|| Utc::now() + ChronoDuration::minutes(15)),
        })
    }
}

#[async_trait::async_trait]
impl BookingBackend for MockBookingBackend {
    async fn create_booking(&self, req: &CreateBookingRequest) -> BackendResult<BookingCreated> {
        self.accept(req.payment_method)
    }

    async fn create_multi_booking(
        &self,
        req: &CreateMultiBookingRequest,
    ) -> BackendResult<BookingCreated> {
        self.accept(req.payment_method)
    }

    async fn booking_by_id(&self, booking_id: Uuid) -> BackendResult<BookingRecord> {
        let state = self.lock();
        if state.fail_status_poll {
            return Err(BackendError::Transport("connection reset".to_string()));
        }
        state
            .bookings
            .get(&booking_id)
            .cloned()
            .ok_or_else(|| BackendError::NotFound(booking_id.to_string()))
    }

    async fn confirm_payment(&self, booking_id: Uuid) -> BackendResult<BookingRecord> {
        let mut state = self.lock();
        let record = state
            .bookings
            .get_mut(&booking_id)
            .ok_or_else(|| BackendError::NotFound(booking_id.to_string()))?;
        record.payment_status = PaymentStatus::Paid;
        record.updated_at = Utc::now();
        Ok(record.clone())
    }

    async fn payment_deadline(&self, booking_id: Uuid) -> BackendResult<DeadlineStatus> {
        let mut state = self.lock();
        if state.fail_deadline_poll {
            return Err(BackendError::Transport("connection reset".to_string()));
        }
        if !state.bookings.contains_key(&booking_id) {
            return Err(BackendError::NotFound(booking_id.to_string()));
        }
        state.deadline_checks += 1;
        let expired = state
            .expire_after_deadline_checks
            .map(|checks| state.deadline_checks >= checks)
            .unwrap_or(false);
        Ok(DeadlineStatus {
            time_remaining_secs: if expired { 0 } else { 600 },
            expired,
        })
    }

    async fn create_gateway_redirect(
        &self,
        provider: GatewayProvider,
        order: &GatewayOrder,
    ) -> BackendResult<GatewayRedirect> {
        Ok(GatewayRedirect {
            pay_url: format!(
                "https://pay.example.test/{}/{}",
                provider.slug(),
                order.order_ref
            ),
        })
    }

    async fn loyalty_checkout(&self, booking_id: Uuid) -> BackendResult<LoyaltyAward> {
        let mut state = self.lock();
        if state.fail_loyalty {
            return Err(BackendError::Rejected("points already awarded".to_string()));
        }
        if !state.bookings.contains_key(&booking_id) {
            return Err(BackendError::NotFound(booking_id.to_string()));
        }
        state.loyalty_calls += 1;
        state.total_points += 50;
        Ok(LoyaltyAward {
            points_earned: 50,
            total_points: state.total_points,
        })
    }
}
