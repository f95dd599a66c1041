//! Scripted demo scenarios driving the core through the simulated platform.
//!
//! Each scenario feeds frames the way a transport would, interleaved with
//! `process_cycle` calls and real waits for the simulated flash latency,
//! then checks the supervisor landed where the protocol says it must.

use std::thread::sleep;
use std::time::{Duration, Instant};

use emberboot_core::{State, Supervisor};
use emberboot_wire::ImageDigest;

use crate::error::SimError;
use crate::platform::SimPlatform;

fn start_frame(total_size: u32, crc: u16) -> Vec<u8> {
    let mut frame = vec![0x00, 0x01];
    frame.extend_from_slice(&total_size.to_be_bytes());
    frame.extend_from_slice(&crc.to_be_bytes());
    frame
}

fn data_frame(seq: u8, payload: &[u8]) -> Vec<u8> {
    let mut frame = vec![seq, 0x02];
    frame.extend_from_slice(payload);
    frame
}

/// Cycle until the supervisor reaches `target` or the deadline passes.
fn drive_until(
    sup: &mut Supervisor<SimPlatform>,
    target: State,
    deadline: Duration,
) -> bool {
    let started = Instant::now();
    while started.elapsed() < deadline {
        sup.process_cycle();
        if sup.state() == target {
            return true;
        }
        sleep(Duration::from_millis(10));
    }
    false
}

/// PING and GET_STATUS round-trips in idle.
pub fn basic_commands(sup: &mut Supervisor<SimPlatform>) -> Result<(), SimError> {
    tracing::info!("--- scenario: basic commands ---");

    sup.receive_packet(&[0x00, 0x05]);
    sup.receive_packet(&[0x01, 0x06]);
    sup.process_cycle();

    if sup.state() != State::Idle {
        return Err(SimError::Scenario("diagnostics must not leave idle"));
    }
    if sup.platform().acks_sent() < 2 {
        return Err(SimError::Scenario("diagnostics were not acknowledged"));
    }
    Ok(())
}

/// A full 512-byte transfer: session start, sequenced data, verification,
/// launch, and the image landing intact in flash.
pub fn complete_transfer(
    sup: &mut Supervisor<SimPlatform>,
    write_latency_us: u64,
) -> Result<(), SimError> {
    tracing::info!("--- scenario: complete transfer ---");

    let image: Vec<u8> = (0u32..512).map(|i| (i * 13 % 256) as u8).collect();
    let expected_crc = ImageDigest::checksum(&image);

    sup.receive_packet(&start_frame(512, expected_crc));
    sup.process_cycle();
    if sup.state() != State::DfuActive {
        return Err(SimError::Scenario("session start was not accepted"));
    }

    for (i, chunk) in image.chunks(128).enumerate() {
        sup.receive_packet(&data_frame(i as u8 + 1, chunk));
        sup.process_cycle();
        // Let the simulated write finish before the next payload.
        sleep(Duration::from_micros(write_latency_us + 1_000));
        sup.process_cycle();
    }
    if sup.session().bytes_received != 512 {
        return Err(SimError::Scenario("not every payload was accepted"));
    }

    sup.receive_packet(&[0x0F, 0x03]);
    sup.process_cycle();
    if sup.state() != State::DfuVerify {
        return Err(SimError::Scenario("end of session did not enter verification"));
    }

    if !drive_until(sup, State::Idle, Duration::from_secs(2)) {
        return Err(SimError::Scenario("launch did not settle back to idle"));
    }
    let report = sup.status();
    if !report.last_validation.is_some_and(|v| v.valid) {
        return Err(SimError::Scenario("image verification failed"));
    }
    if sup.platform().image_slice(512) != image.as_slice() {
        return Err(SimError::Scenario("flash contents do not match the image"));
    }

    sup.log_stats();
    Ok(())
}

/// Emergency reset during a transfer: quarantine, rejected traffic,
/// healing, and the sticky bootloader latch.
pub fn emergency_recovery(
    sup: &mut Supervisor<SimPlatform>,
    recovery_heal_ms: u64,
) -> Result<(), SimError> {
    tracing::info!("--- scenario: emergency recovery ---");

    sup.receive_packet(&start_frame(256, 0x1234));
    sup.process_cycle();

    sup.receive_packet(&[0x99, 0x08]);
    sup.process_cycle();
    if sup.state() != State::EmergencyRecovery {
        return Err(SimError::Scenario("emergency reset did not quarantine"));
    }

    // Normal traffic is refused, diagnostics still answer.
    let nacks_before = sup.platform().nacks_sent();
    sup.receive_packet(&start_frame(256, 0x1234));
    sup.receive_packet(&[0x02, 0x05]);
    sup.process_cycle();
    if sup.platform().nacks_sent() != nacks_before + 1 {
        return Err(SimError::Scenario("quarantine did not refuse normal traffic"));
    }

    let heal_wait = Duration::from_millis(recovery_heal_ms + 2_000);
    if !drive_until(sup, State::Idle, heal_wait) {
        return Err(SimError::Scenario("quarantine did not heal to idle"));
    }
    if !sup.force_bootloader_mode() {
        return Err(SimError::Scenario("bootloader latch did not survive healing"));
    }

    sup.log_stats();
    Ok(())
}

/// Data packets interleaved with diagnostics while flash writes complete
/// in the background.
pub fn interleaved_traffic(
    sup: &mut Supervisor<SimPlatform>,
    write_latency_us: u64,
) -> Result<(), SimError> {
    tracing::info!("--- scenario: interleaved traffic ---");

    let image: Vec<u8> = (0u32..800).map(|i| (i * 7 % 256) as u8).collect();
    let expected_crc = ImageDigest::checksum(&image);

    sup.receive_packet(&start_frame(800, expected_crc));
    sup.process_cycle();

    for (i, chunk) in image.chunks(100).enumerate() {
        let seq = i as u8 + 1;
        sup.receive_packet(&data_frame(seq, chunk));
        if seq % 3 == 0 {
            sup.receive_packet(&[0x80 + seq, 0x05]);
        }
        sup.process_cycle();
        sleep(Duration::from_micros(write_latency_us + 1_000));
        sup.process_cycle();
    }
    if sup.session().bytes_received != 800 {
        return Err(SimError::Scenario("interleaved transfer lost payload bytes"));
    }

    sup.receive_packet(&[0x09, 0x03]);
    sup.process_cycle();
    if !drive_until(sup, State::Idle, Duration::from_secs(2)) {
        return Err(SimError::Scenario("interleaved transfer did not settle"));
    }

    sup.log_stats();
    Ok(())
}
