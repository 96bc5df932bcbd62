use heapless::{String, Vec};
use lorawan_endnode::{
    codec::{Codec, CodecError, PostcardCodec, RawCodec, TextCodec},
    config::{EndnodeConfig, OverflowPolicy, Session, TimeSyncConfig},
    duty,
    hooks::{Mailbox, Signal, MAILBOX_CAPACITY},
    jobs::{Armed, Job, JobRegistry, MAX_JOBS},
    mac::{
        tx_result_from_code, CommandIdentifier, FCtrl, FrameKind, MType, MacCommands, MacEvent,
        RadioStatus, RxFrame, TxError, TxRxFlags,
    },
    message::{InboundMessage, Message, OutboundMessage, MAX_MESSAGE_LEN},
    policy::{Phase, RetryClass, RetryTracker, Verdict},
    queue::OutboundQueue,
    time_sync::{NetworkTimeAnswer, TimeSync},
};
use serde::{Deserialize, Serialize};

use mock::test_keys;

fn outbound(data: &[u8]) -> OutboundMessage {
    OutboundMessage::new(Message::from_slice(data).unwrap(), false)
}

fn contents<const N: usize>(queue: &OutboundQueue<N>) -> std::vec::Vec<std::vec::Vec<u8>> {
    queue
        .snapshot()
        .iter()
        .map(|m| m.as_bytes().to_vec())
        .collect()
}

#[test]
fn test_config_defaults() {
    let config = EndnodeConfig::default();

    assert_eq!(config.overflow, OverflowPolicy::KeepRecent);
    assert_eq!(config.max_retries, 1);
    assert_eq!(config.port, 1);
    assert_eq!(config.time_sync, Some(TimeSyncConfig::default()));
    assert!(config.link.adr_enabled);
    assert_eq!(config.link.clock_error_percent, 10);
}

#[test]
fn test_session_state() {
    let mut session = Session::new();
    assert!(!session.is_joined());
    assert!(session.keys().is_none());

    session.establish(test_keys());
    assert!(session.is_joined());
    assert_eq!(session.keys(), Some(&test_keys()));

    session.clear();
    assert!(!session.is_joined());
    assert!(session.keys().is_none());
}

#[test]
fn test_message_capacity() {
    assert!(Message::from_slice(&[0; MAX_MESSAGE_LEN]).is_ok());
    assert!(Message::from_slice(&[0; MAX_MESSAGE_LEN + 1]).is_err());
    assert!(InboundMessage::new(2, &[0; MAX_MESSAGE_LEN + 1]).is_err());
}

#[test]
fn test_queue_fifo() {
    let queue: OutboundQueue<4> = OutboundQueue::new(OverflowPolicy::KeepRecent);
    assert!(queue.is_empty());

    queue.enqueue(outbound(b"A"));
    queue.enqueue(outbound(b"B"));

    assert_eq!(queue.len(), 2);
    assert_eq!(queue.peek_next_to_send().unwrap().as_bytes(), b"A");
    assert_eq!(queue.pop_sent().unwrap().as_bytes(), b"A");
    assert_eq!(queue.pop_sent().unwrap().as_bytes(), b"B");
    assert!(queue.pop_sent().is_none());
}

#[test]
fn test_queue_overflow_policies() {
    let recent: OutboundQueue<2> = OutboundQueue::new(OverflowPolicy::KeepRecent);
    let old: OutboundQueue<2> = OutboundQueue::new(OverflowPolicy::KeepOld);
    for data in [b"A", b"B", b"C"] {
        recent.enqueue(outbound(data));
        old.enqueue(outbound(data));
    }

    assert_eq!(contents(&recent), vec![b"B".to_vec(), b"C".to_vec()]);
    assert_eq!(contents(&old), vec![b"A".to_vec(), b"B".to_vec()]);
}

#[test]
fn test_queue_keeps_message_in_flight() {
    let queue: OutboundQueue<2> = OutboundQueue::new(OverflowPolicy::KeepRecent);
    queue.enqueue(outbound(b"A"));
    queue.enqueue(outbound(b"B"));
    assert_eq!(queue.begin_dispatch().unwrap().as_bytes(), b"A");

    assert!(queue.enqueue(outbound(b"C")));
    assert_eq!(contents(&queue), vec![b"A".to_vec(), b"C".to_vec()]);
    assert_eq!(queue.pop_sent().unwrap().as_bytes(), b"A");
}

#[test]
fn test_queue_single_slot_in_flight() {
    let queue: OutboundQueue<1> = OutboundQueue::new(OverflowPolicy::KeepRecent);
    queue.enqueue(outbound(b"A"));
    queue.begin_dispatch();

    assert!(!queue.enqueue(outbound(b"B")));
    assert_eq!(contents(&queue), vec![b"A".to_vec()]);

    queue.abort_dispatch();
    assert!(queue.enqueue(outbound(b"B")));
    assert_eq!(contents(&queue), vec![b"B".to_vec()]);
}

#[test]
fn test_queue_retain_for_retry() {
    let queue: OutboundQueue<2> = OutboundQueue::new(OverflowPolicy::KeepOld);
    queue.enqueue(outbound(b"A"));
    queue.begin_dispatch();
    assert!(queue.is_dispatching());

    queue.retain_for_retry(
        TxRxFlags::from_bits(TxRxFlags::NACK),
        Some(TxError::NotFeasible),
    );

    assert!(!queue.is_dispatching());
    let message = queue.peek_next_to_send().unwrap();
    assert!(message.last_flags.nack());
    assert_eq!(message.transport_error, Some(TxError::NotFeasible));

    queue.clear();
    assert!(!queue.has_pending());
}

#[test]
fn test_job_registry() {
    let mut jobs = JobRegistry::new();

    assert_eq!(jobs.arm(Job::Send, 100, 1_000), Ok(Armed::Fresh));
    assert_eq!(jobs.arm(Job::Send, 300, 1_050), Ok(Armed::Rescheduled));
    assert_eq!(jobs.outstanding(), 1);
    assert_eq!(jobs.get(Job::Send).unwrap().due_at_ms(), 1_350);

    jobs.arm(Job::App(1), 10, 0).unwrap();
    assert_eq!(jobs.pending().count(), 2);

    assert!(jobs.fire(Job::Send));
    assert!(!jobs.fire(Job::Send));
    assert!(jobs.disarm(Job::App(1)));
    assert!(!jobs.disarm(Job::App(1)));
    assert_eq!(jobs.outstanding(), 0);
}

#[test]
fn test_job_registry_full() {
    let mut jobs = JobRegistry::new();
    for id in 0..MAX_JOBS as u8 {
        jobs.arm(Job::App(id), 0, 0).unwrap();
    }

    assert!(jobs.arm(Job::Send, 0, 0).is_err());
    assert_eq!(jobs.arm(Job::App(0), 5, 0), Ok(Armed::Rescheduled));
}

#[test]
fn test_duty_wait_time() {
    assert_eq!(duty::wait_time(1_000, 0), 0);
    assert_eq!(duty::wait_time(1_000, 1_000), 0);
    assert_eq!(duty::wait_time(1_000, 4_500), 3_500);
    assert_eq!(duty::wait_time(0, u64::MAX), u32::MAX);
}

#[test]
fn test_policy_unconfirmed() {
    let mut tracker = RetryTracker::new();
    let class = RetryClass::new(0, 1);

    assert_eq!(tracker.evaluate(false, false, class), Verdict::Satisfied);
    assert_eq!(tracker.retries(0), 0);
}

#[test]
fn test_policy_retries() {
    let mut tracker = RetryTracker::new();
    let alarm = RetryClass::new(1, 2);
    let heartbeat = RetryClass::new(2, 0);

    assert_eq!(tracker.evaluate(true, false, alarm), Verdict::RetryPending);
    assert_eq!(tracker.evaluate(true, false, heartbeat), Verdict::Abandoned);
    assert_eq!(tracker.evaluate(true, false, alarm), Verdict::RetryPending);
    assert_eq!(tracker.retries(1), 2);
    assert_eq!(tracker.evaluate(true, false, alarm), Verdict::Abandoned);
    assert_eq!(tracker.retries(1), 0);

    assert_eq!(tracker.evaluate(true, false, alarm), Verdict::RetryPending);
    assert_eq!(tracker.evaluate(true, true, alarm), Verdict::Satisfied);
    assert_eq!(tracker.retries(1), 0);
}

#[test]
fn test_verdict_and_phase() {
    assert!(Verdict::Satisfied.pops());
    assert!(Verdict::Abandoned.pops());
    assert!(!Verdict::RetryPending.pops());
    assert_eq!(Phase::after_send(true), Phase::AwaitingAckOutcome);
    assert_eq!(Phase::after_send(false), Phase::Sent);
}

#[test]
fn test_engine_codes() {
    assert_eq!(tx_result_from_code(0), Ok(()));
    assert_eq!(tx_result_from_code(-1), Err(nb::Error::WouldBlock));
    assert_eq!(
        tx_result_from_code(-2),
        Err(nb::Error::Other(TxError::TooLarge))
    );
    assert_eq!(
        tx_result_from_code(-3),
        Err(nb::Error::Other(TxError::NotFeasible))
    );
    assert_eq!(
        tx_result_from_code(-7),
        Err(nb::Error::Other(TxError::Failed))
    );

    assert_eq!(MacEvent::from_code(6), MacEvent::Joined);
    assert_eq!(MacEvent::from_code(10), MacEvent::TxComplete);
    assert_eq!(MacEvent::from_code(99), MacEvent::Other(99));
    assert!(MacEvent::from_code(8).is_join_loss());
    assert!(MacEvent::from_code(14).is_join_loss());
    assert!(!MacEvent::from_code(15).is_join_loss());
}

#[test]
fn test_radio_status_from_opmode() {
    assert!(!RadioStatus::from_opmode(0).is_busy());

    let status = RadioStatus::from_opmode(0x0800 | 0x0008);
    assert!(status.txrx_pending);
    assert!(status.tx_data_pending);
    assert!(!status.joining);
    assert!(status.is_busy());

    assert!(RadioStatus::from_opmode(0x0004).joining);
    assert!(RadioStatus::from_opmode(0x0010).is_busy());
}

#[test]
fn test_frame_header() {
    let fctrl = FCtrl::from_byte(0xA3);
    assert!(fctrl.adr);
    assert!(!fctrl.adr_ack_req);
    assert!(fctrl.ack);
    assert_eq!(fctrl.f_opts_len, 3);

    assert_eq!(MType::from_mhdr(0x60), MType::UnconfirmedDataDown);
    assert_eq!(MType::from_mhdr(0xA0), MType::ConfirmedDataDown);
    assert!(MType::from_mhdr(0xA0).is_data_down());
    assert!(!MType::from_mhdr(0x80).is_data_down());
}

#[test]
fn test_frame_classification() {
    let header = [0x60, 0x34, 0x12, 0x01, 0x26, 0x00, 0x01, 0x00];

    let mut app = header.to_vec();
    app.extend_from_slice(&[0x0A, 1, 2, 3]);
    assert_eq!(
        RxFrame::new(&app, 9, 3).classify(),
        FrameKind::Application {
            port: 10,
            payload: &[1, 2, 3]
        }
    );

    let mut port0 = header.to_vec();
    port0.extend_from_slice(&[0x00, 0x06]);
    assert_eq!(
        RxFrame::new(&port0, 9, 1).classify(),
        FrameKind::MacCommands(&[0x06])
    );

    let mut fopts = header.to_vec();
    fopts[5] = 0x01;
    fopts.push(0x06);
    assert_eq!(
        RxFrame::new(&fopts, 9, 0).classify(),
        FrameKind::MacCommands(&[0x06])
    );

    assert_eq!(RxFrame::new(&header, 8, 0).classify(), FrameKind::Empty);
    assert_eq!(RxFrame::new(&header, 9, 4).classify(), FrameKind::Malformed);
    assert_eq!(RxFrame::new(&[0x60], 1, 0).classify(), FrameKind::Malformed);
    assert_eq!(RxFrame::new(&[], 0, 0).classify(), FrameKind::Malformed);
}

#[test]
fn test_frame_classification_rejects_non_downlinks() {
    let mut uplink = vec![0x40, 0x34, 0x12, 0x01, 0x26, 0x00, 0x01, 0x00, 0x0A, 1, 2];
    assert_eq!(
        RxFrame::new(&uplink, 9, 2).classify(),
        FrameKind::Unexpected(MType::UnconfirmedDataUp)
    );

    uplink[0] = 0x20;
    assert_eq!(
        RxFrame::new(&uplink, 9, 2).classify(),
        FrameKind::Unexpected(MType::JoinAccept)
    );

    uplink[0] = 0xA0;
    assert_eq!(
        RxFrame::new(&uplink, 9, 2).classify(),
        FrameKind::Application {
            port: 10,
            payload: &[1, 2]
        }
    );
}

#[test]
fn test_mac_commands_iterator() {
    let bytes = [0x02, 0x14, 0x01, 0x06, 0x04, 0x03];
    let mut commands = MacCommands::new(&bytes);

    assert_eq!(
        commands.next(),
        Some(Ok((CommandIdentifier::LinkCheckAns, &[0x14, 0x01][..])))
    );
    assert_eq!(
        commands.next(),
        Some(Ok((CommandIdentifier::DevStatusReq, &[][..])))
    );
    assert_eq!(
        commands.next(),
        Some(Ok((CommandIdentifier::DutyCycleReq, &[0x03][..])))
    );
    assert_eq!(commands.next(), None);

    let mut unknown = MacCommands::new(&[0x7F, 0x02, 0x00, 0x00]);
    assert_eq!(unknown.next(), Some(Err(0x7F)));
    assert_eq!(unknown.next(), None);

    // truncated LinkADRReq
    assert_eq!(MacCommands::new(&[0x03, 0x00]).next(), None);
}

#[test]
fn test_raw_codec() {
    let codec = RawCodec;
    let payload: Vec<u8, MAX_MESSAGE_LEN> = Vec::from_slice(&[1, 2, 3]).unwrap();

    let message = codec.encode(&payload).unwrap();
    assert_eq!(message.as_bytes(), &[1, 2, 3]);
    assert_eq!(codec.decode_uplink(&message).unwrap(), payload);

    let inbound = InboundMessage::new(5, &[9, 8]).unwrap();
    assert_eq!(codec.decode_downlink(&inbound).unwrap().as_slice(), &[9, 8]);
}

#[test]
fn test_text_codec() {
    let text: String<MAX_MESSAGE_LEN> = String::from("temp=21");

    let plain = TextCodec::new().encode(&text).unwrap();
    assert_eq!(plain.as_bytes(), b"temp=21");

    let codec = TextCodec::nul_terminated();
    let message = codec.encode(&text).unwrap();
    assert_eq!(message.as_bytes(), b"temp=21\0");
    assert_eq!(codec.decode_uplink(&message).unwrap(), text);

    let inbound = InboundMessage::new(1, &[0xFF, 0xFE]).unwrap();
    assert_eq!(
        codec.decode_downlink(&inbound),
        Err(CodecError::Malformed)
    );

    let mut full: String<MAX_MESSAGE_LEN> = String::new();
    for _ in 0..MAX_MESSAGE_LEN {
        full.push('x').unwrap();
    }
    assert_eq!(codec.encode(&full), Err(CodecError::TooLong));
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
enum Report {
    Heartbeat,
    Reading { temperature: i16, humidity: u8 },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct Command {
    interval_s: u32,
}

#[test]
fn test_postcard_codec() {
    let codec: PostcardCodec<Report, Command> = PostcardCodec::new();
    let reading = Report::Reading {
        temperature: -40,
        humidity: 55,
    };

    let message = codec.encode(&reading).unwrap();
    assert!(message.len() < 8);
    assert_eq!(codec.decode_uplink(&message).unwrap(), reading);

    let mut buf = [0u8; 16];
    let command = postcard::to_slice(&Command { interval_s: 600 }, &mut buf).unwrap();
    let inbound = InboundMessage::new(2, command).unwrap();
    assert_eq!(
        codec.decode_downlink(&inbound).unwrap(),
        Command { interval_s: 600 }
    );

    let garbage = Message::from_slice(&[0xFF]).unwrap();
    assert_eq!(codec.decode_uplink(&garbage), Err(CodecError::Malformed));
}

#[test]
fn test_time_sync() {
    let mut sync = TimeSync::new(Some(TimeSyncConfig { interval_ms: 10_000 }));
    assert!(sync.is_due(0));
    assert_eq!(sync.network_time_ms(0), None);

    sync.mark_requested(1_000);
    assert!(sync.is_request_pending());
    assert_eq!(
        sync.complete(Some(NetworkTimeAnswer { epoch_ms: 500_000 }), 1_300),
        Some(500_300)
    );
    assert!(!sync.is_request_pending());
    assert!(!sync.is_due(5_000));
    assert_eq!(sync.network_time_ms(2_300), Some(501_300));

    assert!(sync.is_due(11_300));
    sync.mark_requested(11_300);
    assert_eq!(sync.complete(None, 11_500), None);
    assert!(sync.is_due(11_500));
    // previous anchor still used
    assert_eq!(sync.network_time_ms(11_300), Some(510_300));
}

#[test]
fn test_time_sync_unanswered_request_asks_again() {
    let mut sync = TimeSync::new(Some(TimeSyncConfig::default()));
    sync.mark_requested(1_000);
    assert!(sync.is_request_pending());

    // carrying uplink done, no answer
    sync.uplink_completed();
    assert!(!sync.is_request_pending());
    assert!(sync.is_due(2_000));

    sync.mark_requested(5_000);
    sync.uplink_completed();
    // late answer corrected against the latest request
    assert_eq!(
        sync.complete(Some(NetworkTimeAnswer { epoch_ms: 100_000 }), 5_200),
        Some(100_200)
    );
    assert!(!sync.is_due(6_000));
}

#[test]
fn test_time_sync_disabled() {
    let sync = TimeSync::new(None);
    assert!(!sync.is_enabled());
    assert!(!sync.is_due(0));
}

#[test]
fn test_mailbox_requires_claim() {
    let mailbox: &'static Mailbox = Box::leak(Box::new(Mailbox::new()));
    assert!(!mailbox.post(Signal::Interrupt(1)));

    let registration = mailbox.claim().unwrap();
    assert!(mailbox.claim().is_err());
    assert!(mailbox.post(Signal::Interrupt(1)));
    assert!(mailbox.post(Signal::Job(Job::Send)));
    assert_eq!(registration.mailbox().len(), 2);

    drop(registration);
    assert!(!mailbox.is_claimed());
    assert!(mailbox.is_empty());
}

#[test]
fn test_mailbox_coalesces_interrupts_and_jobs() {
    let mailbox: &'static Mailbox = Box::leak(Box::new(Mailbox::new()));
    let _registration = mailbox.claim().unwrap();

    for _ in 0..10 {
        assert!(mailbox.post(Signal::Interrupt(200)));
        assert!(mailbox.post(Signal::Interrupt(3)));
        assert!(mailbox.post(Signal::Job(Job::App(1))));
    }
    assert!(mailbox.post(Signal::Event(MacEvent::TxComplete)));
    assert_eq!(mailbox.len(), 4);

    // engine events first, then jobs, then interrupts by source
    assert_eq!(mailbox.take(), Some(Signal::Event(MacEvent::TxComplete)));
    assert_eq!(mailbox.take(), Some(Signal::Job(Job::App(1))));
    assert_eq!(mailbox.take(), Some(Signal::Interrupt(3)));
    assert_eq!(mailbox.take(), Some(Signal::Interrupt(200)));
    assert_eq!(mailbox.take(), None);
    assert_eq!(mailbox.dropped(), 0);
}

#[test]
fn test_mailbox_full_of_events_keeps_completions() {
    let mailbox: &'static Mailbox = Box::leak(Box::new(Mailbox::new()));
    let _registration = mailbox.claim().unwrap();

    for _ in 0..MAILBOX_CAPACITY {
        assert!(mailbox.post(Signal::Event(MacEvent::TxStart)));
    }
    // an informational event makes room
    assert!(mailbox.post(Signal::Event(MacEvent::TxComplete)));
    assert!(mailbox.has_events());
    assert_eq!(mailbox.len(), MAILBOX_CAPACITY);

    let mut last = None;
    while let Some(signal) = mailbox.take() {
        last = Some(signal);
    }
    assert_eq!(last, Some(Signal::Event(MacEvent::TxComplete)));

    for _ in 0..MAILBOX_CAPACITY {
        assert!(mailbox.post(Signal::Event(MacEvent::Joined)));
    }
    assert!(!mailbox.post(Signal::Event(MacEvent::TxComplete)));
    assert_eq!(mailbox.dropped(), 1);

    // latest time answer wins
    assert!(mailbox.post(Signal::NetworkTime(None)));
    assert!(mailbox.post(Signal::NetworkTime(Some(NetworkTimeAnswer { epoch_ms: 5 }))));
    assert_eq!(mailbox.len(), MAILBOX_CAPACITY + 1);
}
