//! Signal dispatch
//!
//! Everything the engine reports reaches the runtime here, one signal at a time, from
//! [`Endnode::run_loop_once`]. Application callbacks run from this module only.

use super::{Application, Endnode};
use crate::{
    codec::Codec,
    hooks::Signal,
    jobs::Job,
    mac::{FrameKind, MacCommands, MacEngine, MacEvent, TxError, TxRxFlags},
    message::{InboundMessage, OutboundMessage},
    policy::Phase,
    time_sync::NetworkTimeAnswer,
};
use crate::{debug, info, warn};

impl<M: MacEngine, C: Codec, A: Application<C>, const N: usize> Endnode<M, C, A, N> {
    pub(super) fn dispatch(&mut self, signal: Signal) {
        match signal {
            Signal::Event(event) => self.on_event(event),
            Signal::Job(job) => self.on_job(job),
            Signal::NetworkTime(answer) => self.on_network_time(answer),
            Signal::Interrupt(source) => self.app.on_interrupt(source, &mut self.runtime),
        }
    }

    fn on_event(&mut self, event: MacEvent) {
        match event {
            MacEvent::Joined => self.on_joined(),
            MacEvent::TxComplete => {
                self.complete_transmission();
                self.deliver_downlink();
            }
            MacEvent::RxComplete => self.deliver_downlink(),
            event if event.is_join_loss() => self.on_join_lost(event),
            MacEvent::Joining => info!("joining"),
            MacEvent::TxStart => debug!("transmission started"),
            MacEvent::LinkAlive => info!("link alive"),
            other => debug!("unhandled event {:?}", other),
        }
    }

    fn on_joined(&mut self) {
        let rt = &mut self.runtime;
        let keys = match rt.engine.session_keys() {
            Some(keys) => keys,
            None => {
                warn!("joined without session keys");
                Default::default()
            }
        };
        info!("joined, dev addr {:x}", keys.dev_addr);
        rt.session.establish(keys);
        // engines turn link check back on after a join
        if let Some(enabled) = rt.config.link.link_check_enabled {
            rt.engine.set_link_check(enabled);
        }
        self.app.on_joined(true, &mut self.runtime);
    }

    fn on_join_lost(&mut self, event: MacEvent) {
        let rt = &mut self.runtime;
        warn!("join lost: {:?}", event);
        rt.drop_session();

        if let Err(err) = rt.start_join() {
            warn!("rejoin not started: {:?}", err);
        }
        self.app.on_joined(false, &mut self.runtime);
    }

    fn on_job(&mut self, job: Job) {
        if !self.runtime.jobs.fire(job) {
            debug!("stale callback for {:?}", job);
            return;
        }
        match job {
            Job::Send => self.send_next(),
            Job::App(id) => self.app.on_job(id, &mut self.runtime),
        }
    }

    /// Hand the back message of the queue to the engine
    fn send_next(&mut self) {
        let rt = &mut self.runtime;
        if !rt.can_send() {
            debug!("radio busy, send deferred");
            return;
        }
        let Some(message) = rt.queue.begin_dispatch() else {
            return;
        };

        let now = rt.engine.now_ms();
        if rt.time_sync.is_due(now) && !rt.time_sync.is_request_pending() {
            rt.engine.request_network_time();
            rt.time_sync.mark_requested(now);
        }

        let port = rt.config.port;
        match rt
            .engine
            .send_frame(port, message.as_bytes(), message.ack_requested)
        {
            Ok(()) => {
                info!(
                    "sending {} bytes on port {}, ack {}",
                    message.message.len(),
                    port,
                    message.ack_requested
                );
                rt.in_flight = Some(Phase::after_send(message.ack_requested));
            }
            Err(nb::Error::WouldBlock) => {
                debug!("engine busy, send deferred");
                rt.queue.abort_dispatch();
            }
            Err(nb::Error::Other(err)) => {
                warn!("send rejected: {:?}", err);
                let phase = Phase::after_send(message.ack_requested);
                self.conclude(message, phase, TxRxFlags::empty(), Some(err));
            }
        }
    }

    fn complete_transmission(&mut self) {
        let rt = &mut self.runtime;
        let Some(phase) = rt.in_flight.take() else {
            debug!("transmission complete without dispatch");
            return;
        };
        let flags = rt.engine.tx_flags();
        match rt.queue.peek_next_to_send() {
            Some(message) => self.conclude(message, phase, flags, None),
            None => rt.queue.abort_dispatch(),
        }
    }

    /// Conclude a transmission whose completion event never arrived
    ///
    /// Called after the mailbox has been drained. With no event left to dispatch and the
    /// engine idle, a frame still marked in flight can only have lost its completion.
    pub(super) fn recover_lost_completion(&mut self) {
        let rt = &self.runtime;
        if rt.in_flight.is_none() || rt.registration.mailbox().has_events() {
            return;
        }
        let status = rt.engine.radio_status();
        if status.txrx_pending || status.tx_data_pending {
            return;
        }
        warn!("completion event lost, concluding from engine flags");
        self.on_event(MacEvent::TxComplete);
    }

    /// Apply the completion policy to the message just sent
    fn conclude(
        &mut self,
        message: OutboundMessage,
        phase: Phase,
        flags: TxRxFlags,
        error: Option<TxError>,
    ) {
        let rt = &mut self.runtime;
        rt.time_sync.uplink_completed();
        let payload = rt.codec.decode_uplink(&message.message).ok();
        let class = self
            .app
            .retry_class(payload.as_ref(), rt.default_retry_class());

        // a rejected frame never reached the network, it is retried like a missing ack
        let must_confirm = phase == Phase::AwaitingAckOutcome || error.is_some();
        let acked = error.is_none() && flags.ack();
        let verdict = rt.retries.evaluate(must_confirm, acked, class);

        if verdict.pops() {
            rt.queue.pop_sent();
        } else {
            rt.queue.retain_for_retry(flags, error);
        }
        info!(
            "transmission done: {:?}, flags {:x}, {} pending",
            verdict,
            flags.bits(),
            rt.queue.len()
        );

        self.app.on_transmission_outcome(
            payload.as_ref(),
            message.ack_requested,
            verdict,
            &mut self.runtime,
        );
    }

    /// Forward the last received frame to the application, unless it is MAC traffic
    fn deliver_downlink(&mut self) {
        let rt = &mut self.runtime;
        let inbound = match rt.engine.downlink().map(|frame| frame.classify()) {
            None | Some(FrameKind::Empty) => None,
            Some(FrameKind::MacCommands(bytes)) => {
                for command in MacCommands::new(bytes) {
                    match command {
                        Ok((cid, _)) => debug!("MAC command {:?}", cid),
                        Err(cid) => debug!("unknown MAC command {:x}", cid),
                    }
                }
                None
            }
            Some(FrameKind::Application { port, payload }) => {
                match InboundMessage::new(port, payload) {
                    Ok(message) => Some(message),
                    Err(_) => {
                        warn!("downlink of {} bytes dropped", payload.len());
                        None
                    }
                }
            }
            Some(FrameKind::Unexpected(mtype)) => {
                warn!("{:?} frame is not a downlink, dropped", mtype);
                None
            }
            Some(FrameKind::Malformed) => {
                warn!("malformed downlink dropped");
                None
            }
        };
        let Some(inbound) = inbound else {
            return;
        };

        debug!(
            "downlink of {} bytes on port {}",
            inbound.message.len(),
            inbound.port
        );
        match rt.codec.decode_downlink(&inbound) {
            Ok(payload) => self.app.on_downlink(payload, &mut self.runtime),
            Err(err) => warn!("downlink not decoded: {:?}", err),
        }
    }

    fn on_network_time(&mut self, answer: Option<NetworkTimeAnswer>) {
        let rt = &mut self.runtime;
        let now = rt.engine.now_ms();
        match rt.time_sync.complete(answer, now) {
            Some(network_ms) => {
                info!("network time {} ms", network_ms);
                self.app.on_time_synced(network_ms, &mut self.runtime);
            }
            None => warn!("network time request failed"),
        }
    }
}
