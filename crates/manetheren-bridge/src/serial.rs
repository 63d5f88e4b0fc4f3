use std::io::Read;
use std::sync::Arc;

use manetheren_frame::FrameReader;
use tracing::{debug, error, warn};

use crate::dispatch::MessageHandler;
use crate::error::Result;
use crate::pool::WorkerPool;

/// Read frames off the link until a fatal error, handing each to `pool`.
///
/// Frames are read strictly in arrival order; their handling runs
/// concurrently. Scan errors and unknown type bytes are logged and skipped.
pub fn run_serial_reader<R: Read>(
    reader: &mut FrameReader<R>,
    pool: &WorkerPool,
    handler: Arc<dyn MessageHandler>,
) -> Result<()> {
    loop {
        let frame = match reader.read_frame() {
            Ok(frame) => frame,
            Err(err) if !err.is_fatal() => {
                warn!(error = %err, "skipping unreadable serial input");
                continue;
            }
            Err(err) => {
                error!(error = %err, "serial link failed");
                return Err(err.into());
            }
        };

        debug!(message_type = %frame.message_type, size = frame.payload.len(), "serial frame");
        let handler = Arc::clone(&handler);
        pool.submit(move || {
            if let Err(err) =
                handler.handle_serial_message(frame.message_type, frame.payload.as_ref())
            {
                error!(message_type = %frame.message_type, error = %err, "serial message not handled");
            }
        })?;
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;
    use std::sync::Mutex;
    use std::time::Duration;

    use bytes::BytesMut;
    use crossbeam::channel::{unbounded, Receiver, Sender};
    use manetheren_frame::{encode_frame, FrameError, MessageType};

    use super::*;
    use crate::dispatch::Route;
    use crate::error::BridgeError;

    /// Reports each handled message; blocks on `gate` for the listed wire types.
    struct Recorder {
        seen: Sender<(u8, Vec<u8>)>,
        slow: Vec<u8>,
        gate: Mutex<Receiver<()>>,
    }

    impl MessageHandler for Recorder {
        fn handle_serial_message(&self, message_type: MessageType, payload: &[u8]) -> Result<Route> {
            if self.slow.contains(&message_type.to_wire()) {
                let gate = self.gate.lock().expect("gate lock");
                let _ = gate.recv_timeout(Duration::from_secs(5));
            }
            self.seen
                .send((message_type.to_wire(), payload.to_vec()))
                .expect("test receiver alive");
            Ok(Route::Published {
                service: message_type.service(),
                delivered: true,
            })
        }

        fn handle_tcp_message(&self, message_type: MessageType, _payload: &[u8]) -> Result<Route> {
            Ok(Route::Forwarded { message_type })
        }
    }

    fn recorder(slow: &[u8]) -> (Arc<Recorder>, Receiver<(u8, Vec<u8>)>, Sender<()>) {
        let (seen_tx, seen_rx) = unbounded();
        let (gate_tx, gate_rx) = unbounded();
        let handler = Arc::new(Recorder {
            seen: seen_tx,
            slow: slow.to_vec(),
            gate: Mutex::new(gate_rx),
        });
        (handler, seen_rx, gate_tx)
    }

    fn wire(frames: &[(u8, &str)]) -> Vec<u8> {
        let mut buf = BytesMut::new();
        for (value, payload) in frames {
            let message_type = MessageType::from_wire(*value).expect("valid type");
            encode_frame(message_type, payload.as_bytes(), &mut buf).expect("encode");
        }
        buf.to_vec()
    }

    #[test]
    fn handles_every_frame_then_reports_closed_link() {
        let (handler, seen, _gate) = recorder(&[]);
        let pool = WorkerPool::new("serial-test", 2, 8).expect("pool should start");
        let mut reader = FrameReader::new(Cursor::new(wire(&[
            (0, "sunny"),
            (3, "12:30"),
            (5, "[]"),
        ])));

        let err = run_serial_reader(&mut reader, &pool, handler).unwrap_err();
        assert!(matches!(err, BridgeError::Frame(FrameError::ConnectionClosed)));
        drop(pool);

        let mut handled: Vec<_> = seen.try_iter().collect();
        handled.sort();
        assert_eq!(
            handled,
            vec![
                (0, b"sunny".to_vec()),
                (3, b"12:30".to_vec()),
                (5, b"[]".to_vec())
            ]
        );
    }

    #[test]
    fn slow_message_does_not_hold_up_later_frames() {
        let (handler, seen, gate) = recorder(&[8]);
        let pool = WorkerPool::new("serial-test", 2, 8).expect("pool should start");
        let mut reader = FrameReader::new(Cursor::new(wire(&[(8, ""), (2, "quote")])));

        let _ = run_serial_reader(&mut reader, &pool, handler);

        // The quote is handled while the weather request is still parked.
        let first = seen
            .recv_timeout(Duration::from_secs(5))
            .expect("second frame handled");
        assert_eq!(first, (2, b"quote".to_vec()));

        gate.send(()).expect("slow handler waiting");
        let second = seen
            .recv_timeout(Duration::from_secs(5))
            .expect("first frame handled");
        assert_eq!(second.0, 8);
    }

    #[test]
    fn unknown_type_is_skipped() {
        let (handler, seen, _gate) = recorder(&[]);
        let pool = WorkerPool::new("serial-test", 1, 8).expect("pool should start");

        let mut bytes = b"\x00\xFA\x00\x00\x00\x02\x10xx".to_vec();
        bytes.extend(wire(&[(1, "rain")]));
        let mut reader = FrameReader::new(Cursor::new(bytes));

        let _ = run_serial_reader(&mut reader, &pool, handler);
        drop(pool);

        let handled: Vec<_> = seen.try_iter().collect();
        assert_eq!(handled, vec![(1, b"rain".to_vec())]);
    }
}
