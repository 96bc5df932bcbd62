//! High-level endnode interface
//!
//! This module provides [`Endnode`], the runtime an application drives from its main
//! loop. It owns the MAC engine, the outbound queue, the job registry and the session,
//! and forwards outcomes to an [`Application`] implementation. The application reaches
//! back into the runtime through the [`Control`] handle it receives in every callback.

mod dispatch;

/// Standby readiness
pub mod standby;

use crate::{
    codec::Codec,
    config::{device::Identity, EndnodeConfig, Session, SessionKeys, DEFAULT_QUEUE_CAPACITY},
    duty,
    hooks::{AlreadyRegistered, Mailbox, Registration, MAILBOX},
    jobs::{Job, JobRegistry},
    mac::MacEngine,
    message::OutboundMessage,
    policy::{Phase, RetryClass, RetryTracker, Verdict},
    queue::OutboundQueue,
    time_sync::TimeSync,
    TimeMs,
};
use crate::{debug, warn};

use self::standby::Readiness;

/// Endnode error type
#[derive(Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum EndnodeError<E> {
    /// MAC engine error
    Engine(E),
    /// Another endnode owns the callback mailbox
    AlreadyRegistered,
    /// Operation requires [`Endnode::begin`] first
    NotStarted,
}

impl<E> From<AlreadyRegistered> for EndnodeError<E> {
    fn from(_: AlreadyRegistered) -> Self {
        EndnodeError::AlreadyRegistered
    }
}

/// Runtime operations available to application callbacks
pub trait Control<C: Codec> {
    /// Encode `payload` and queue it, returns `false` if it was not queued
    fn send(&mut self, payload: &C::Uplink, ack_requested: bool) -> bool;

    /// Arm application job `id` to fire in `delay_ms`
    fn schedule(&mut self, id: u8, delay_ms: u32) -> bool;

    /// Disarm application job `id`
    fn cancel(&mut self, id: u8);

    /// Whether a session is established
    fn is_joined(&self) -> bool;

    /// Keys of the current session
    fn session_keys(&self) -> Option<SessionKeys>;

    /// Number of queued messages
    fn pending_count(&self) -> usize;

    /// Whether at least one message waits to be sent
    fn has_message_to_send(&self) -> bool {
        self.pending_count() > 0
    }

    /// Local clock
    fn now_ms(&self) -> TimeMs;

    /// Network time, once synchronised
    fn network_time_ms(&self) -> Option<u64>;

    /// Enable or disable the engine's link check mode
    fn set_link_check(&mut self, enabled: bool);
}

/// Application logic plugged into the runtime
///
/// Every method has a default doing nothing, override the ones needed.
pub trait Application<C: Codec> {
    /// Session established (`true`) or lost (`false`)
    fn on_joined(&mut self, _joined: bool, _ctl: &mut dyn Control<C>) {}

    /// Decoded application downlink
    fn on_downlink(&mut self, _payload: C::Downlink, _ctl: &mut dyn Control<C>) {}

    /// Outcome of a transmission attempt
    ///
    /// `payload` is `None` when the queued bytes no longer decode.
    fn on_transmission_outcome(
        &mut self,
        _payload: Option<&C::Uplink>,
        _ack_requested: bool,
        _verdict: Verdict,
        _ctl: &mut dyn Control<C>,
    ) {
    }

    /// Retry class of an uplink payload, `default` uses the configured retry bound
    fn retry_class(&self, _payload: Option<&C::Uplink>, default: RetryClass) -> RetryClass {
        default
    }

    /// Application job fired
    fn on_job(&mut self, _id: u8, _ctl: &mut dyn Control<C>) {}

    /// Peripheral interrupt posted through [`crate::hooks::on_interrupt`]
    fn on_interrupt(&mut self, _source: u8, _ctl: &mut dyn Control<C>) {}

    /// Clock synchronised with the network
    fn on_time_synced(&mut self, _network_time_ms: u64, _ctl: &mut dyn Control<C>) {}
}

impl<C: Codec> Application<C> for () {}

/// Runtime state, everything but the application
pub struct Runtime<M: MacEngine, C: Codec, const N: usize> {
    engine: M,
    codec: C,
    config: EndnodeConfig,
    queue: OutboundQueue<N>,
    jobs: JobRegistry,
    session: Session,
    retries: RetryTracker,
    /// Set between a frame handed to the engine and its completion event
    in_flight: Option<Phase>,
    time_sync: TimeSync,
    identity: Option<Identity>,
    registration: Registration,
}

impl<M: MacEngine, C: Codec, const N: usize> Runtime<M, C, N> {
    fn arm(&mut self, job: Job, delay_ms: u32) -> bool {
        let now = self.engine.now_ms();
        match self.jobs.arm(job, delay_ms, now) {
            Ok(_) => {
                self.engine.schedule_callback(job, delay_ms);
                true
            }
            Err(_) => {
                warn!("no job slot left for {:?}", job);
                false
            }
        }
    }

    fn disarm(&mut self, job: Job) {
        if self.jobs.disarm(job) {
            self.engine.cancel_callback(job);
        }
    }

    fn enqueue(&mut self, message: OutboundMessage) -> bool {
        let len = message.message.len();
        let queued = self.queue.enqueue(message);
        if queued {
            debug!("queued {} bytes, {} pending", len, self.queue.len());
        }
        queued
    }

    /// Forget the session and anything tied to it, queued messages stay
    fn drop_session(&mut self) {
        self.session.clear();
        self.disarm(Job::Send);
        self.in_flight = None;
        self.queue.abort_dispatch();
        self.time_sync.cancel_request();
    }

    fn start_join(&mut self) -> Result<(), EndnodeError<M::Error>> {
        let identity = self.identity.as_ref().ok_or(EndnodeError::NotStarted)?;
        self.engine
            .start_join(identity)
            .map_err(EndnodeError::Engine)
    }

    fn is_radio_busy(&self) -> bool {
        self.in_flight.is_some() || self.engine.radio_status().is_busy()
    }

    /// Joined and nothing in progress
    fn can_send(&self) -> bool {
        self.session.is_joined() && !self.is_radio_busy()
    }

    fn readiness(&self) -> Readiness {
        Readiness {
            joined: self.session.is_joined(),
            outstanding_jobs: self.jobs.outstanding(),
            queue_empty: self.queue.is_empty(),
            radio_idle: !self.is_radio_busy(),
            signals_pending: !self.registration.mailbox().is_empty(),
        }
    }

    fn default_retry_class(&self) -> RetryClass {
        RetryClass::new(0, self.config.max_retries)
    }
}

impl<M: MacEngine, C: Codec, const N: usize> Control<C> for Runtime<M, C, N> {
    fn send(&mut self, payload: &C::Uplink, ack_requested: bool) -> bool {
        match self.codec.encode(payload) {
            Ok(message) => self.enqueue(OutboundMessage::new(message, ack_requested)),
            Err(err) => {
                warn!("payload not encoded: {:?}", err);
                false
            }
        }
    }

    fn schedule(&mut self, id: u8, delay_ms: u32) -> bool {
        self.arm(Job::App(id), delay_ms)
    }

    fn cancel(&mut self, id: u8) {
        self.disarm(Job::App(id));
    }

    fn is_joined(&self) -> bool {
        self.session.is_joined()
    }

    fn session_keys(&self) -> Option<SessionKeys> {
        self.session.keys().copied()
    }

    fn pending_count(&self) -> usize {
        self.queue.len()
    }

    fn now_ms(&self) -> TimeMs {
        self.engine.now_ms()
    }

    fn network_time_ms(&self) -> Option<u64> {
        self.time_sync.network_time_ms(self.engine.now_ms())
    }

    fn set_link_check(&mut self, enabled: bool) {
        self.engine.set_link_check(enabled);
    }
}

/// LoRaWAN endnode
///
/// `N` is the capacity of the outbound queue. Only one endnode can be alive per
/// mailbox; [`Endnode::new`] uses the process-wide one the hooks post to.
pub struct Endnode<M: MacEngine, C: Codec, A: Application<C>, const N: usize> {
    runtime: Runtime<M, C, N>,
    app: A,
}

/// Endnode with the default queue capacity
pub type DefaultEndnode<M, C, A> = Endnode<M, C, A, DEFAULT_QUEUE_CAPACITY>;

impl<M: MacEngine, C: Codec, A: Application<C>, const N: usize> Endnode<M, C, A, N> {
    /// Create an endnode bound to the process-wide mailbox
    pub fn new(
        engine: M,
        codec: C,
        app: A,
        config: EndnodeConfig,
    ) -> Result<Self, EndnodeError<M::Error>> {
        Self::with_mailbox(engine, codec, app, config, &MAILBOX)
    }

    /// Create an endnode bound to `mailbox`
    pub fn with_mailbox(
        engine: M,
        codec: C,
        app: A,
        config: EndnodeConfig,
        mailbox: &'static Mailbox,
    ) -> Result<Self, EndnodeError<M::Error>> {
        let registration = mailbox.claim()?;
        Ok(Self {
            runtime: Runtime {
                engine,
                codec,
                queue: OutboundQueue::new(config.overflow),
                jobs: JobRegistry::new(),
                session: Session::new(),
                retries: RetryTracker::new(),
                in_flight: None,
                time_sync: TimeSync::new(config.time_sync),
                identity: None,
                registration,
                config,
            },
            app,
        })
    }

    /// Initialize the radio, apply the link settings and start joining
    pub fn begin(
        &mut self,
        pins: &M::PinMap,
        identity: Identity,
    ) -> Result<(), EndnodeError<M::Error>> {
        let rt = &mut self.runtime;
        rt.engine.init_radio(pins).map_err(EndnodeError::Engine)?;
        rt.engine.reset();
        rt.engine.apply_link_settings(&rt.config.link);
        rt.identity = Some(identity);
        rt.start_join()
    }

    /// Restart the join procedure, dropping the current session
    ///
    /// A frame in flight is forgotten and stays queued, its late completion is ignored.
    pub fn rejoin(&mut self) -> Result<(), EndnodeError<M::Error>> {
        self.runtime.drop_session();
        self.runtime.start_join()
    }

    /// One iteration of the control loop, must be called on every loop pass
    ///
    /// Runs the engine, dispatches the signals posted meanwhile and arms the send job
    /// when a message waits and the radio is free.
    pub fn run_loop_once(&mut self) {
        self.runtime.engine.run_once();

        let mailbox = self.runtime.registration.mailbox();
        // signals posted while dispatching wait for the next pass
        for _ in 0..mailbox.len() {
            match mailbox.take() {
                Some(signal) => self.dispatch(signal),
                None => break,
            }
        }
        self.recover_lost_completion();

        self.schedule_send();
    }

    fn schedule_send(&mut self) {
        let rt = &mut self.runtime;
        if rt.jobs.is_armed(Job::Send) || rt.queue.is_empty() || !rt.can_send() {
            return;
        }
        let delay_ms = duty::wait_time_ms(&rt.engine);
        if rt.arm(Job::Send, delay_ms) {
            debug!("send job armed, duty cycle wait {} ms", delay_ms);
        }
    }

    /// Encode `payload` and queue it for transmission
    ///
    /// Returns `false` if encoding failed or the queue rejected the message.
    pub fn send(&mut self, payload: &C::Uplink, ack_requested: bool) -> bool {
        self.runtime.send(payload, ack_requested)
    }

    /// Queue an already encoded message
    pub fn send_message(&mut self, message: OutboundMessage) -> bool {
        self.runtime.enqueue(message)
    }

    /// Arm application job `id`
    pub fn schedule(&mut self, id: u8, delay_ms: u32) -> bool {
        self.runtime.schedule(id, delay_ms)
    }

    /// Disarm application job `id`
    pub fn cancel(&mut self, id: u8) {
        self.runtime.cancel(id);
    }

    /// Whether the device may enter standby now
    pub fn is_ready_for_standby(&self) -> bool {
        self.runtime.readiness().is_ready()
    }

    /// Detailed standby readiness
    pub fn readiness(&self) -> Readiness {
        self.runtime.readiness()
    }

    /// Whether a session is established
    pub fn is_joined(&self) -> bool {
        self.runtime.session.is_joined()
    }

    /// Session state
    pub fn session(&self) -> &Session {
        &self.runtime.session
    }

    /// Keys of the current session
    pub fn session_keys(&self) -> Option<SessionKeys> {
        self.runtime.session_keys()
    }

    /// Whether a message waits to be sent
    pub fn has_message_to_send(&self) -> bool {
        self.runtime.queue.has_pending()
    }

    /// Number of queued messages
    pub fn pending_count(&self) -> usize {
        self.runtime.queue.len()
    }

    /// Whether a transmission or a join is in progress
    pub fn is_radio_busy(&self) -> bool {
        self.runtime.is_radio_busy()
    }

    /// Whether the engine holds data waiting for transmission
    pub fn is_tx_data_pending(&self) -> bool {
        self.runtime.engine.radio_status().tx_data_pending
    }

    /// Network time, once synchronised
    pub fn network_time_ms(&self) -> Option<u64> {
        self.runtime.network_time_ms()
    }

    /// Outbound queue
    pub fn queue(&self) -> &OutboundQueue<N> {
        &self.runtime.queue
    }

    /// Job registry
    pub fn jobs(&self) -> &JobRegistry {
        &self.runtime.jobs
    }

    /// Retry counters
    pub fn retries(&self) -> &RetryTracker {
        &self.runtime.retries
    }

    /// Owned mailbox
    pub fn mailbox(&self) -> &'static Mailbox {
        self.runtime.registration.mailbox()
    }

    /// Configuration
    pub fn config(&self) -> &EndnodeConfig {
        &self.runtime.config
    }

    /// MAC engine
    pub fn engine(&self) -> &M {
        &self.runtime.engine
    }

    /// Mutable MAC engine
    pub fn engine_mut(&mut self) -> &mut M {
        &mut self.runtime.engine
    }

    /// Application
    pub fn app(&self) -> &A {
        &self.app
    }

    /// Mutable application
    pub fn app_mut(&mut self) -> &mut A {
        &mut self.app
    }
}
