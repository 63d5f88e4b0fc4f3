use std::net::SocketAddr;
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use manetheren_frame::{FrameReader, SharedFrameWriter};
use manetheren_transport::SerialLink;
use tracing::info;

use crate::config::BridgeConfig;
use crate::dispatch::{Backend, Dispatcher, MessageHandler, Publisher};
use crate::error::{BridgeError, Result};
use crate::listener::RequestListener;
use crate::pool::WorkerPool;
use crate::serial::run_serial_reader;

/// A running bridge: the serial reader loop and the request listener loop.
#[derive(Debug)]
pub struct Bridge {
    serial: JoinHandle<Result<()>>,
    listener: JoinHandle<Result<()>>,
    request_addr: SocketAddr,
    device: String,
}

impl Bridge {
    /// Open the link, bind the request listener and start both loops.
    ///
    /// Fails without starting anything if the device cannot be opened or the
    /// request address cannot be bound.
    pub fn start<B, P>(config: &BridgeConfig, backend: B, publisher: P) -> Result<Self>
    where
        B: Backend + 'static,
        P: Publisher + 'static,
    {
        let link = SerialLink::open(&config.serial_device, config.baud_rate)?;
        let device = link.device().to_string();
        let (read_half, write_half) = link.split()?;

        let sink = SharedFrameWriter::new(write_half);
        let handler: Arc<dyn MessageHandler> =
            Arc::new(Dispatcher::new(backend, publisher, sink));

        let listener = RequestListener::bind(config.request_addr)?;
        let request_addr = listener.local_addr();

        let dispatch_pool = WorkerPool::new(
            "dispatch",
            config.dispatch_workers,
            config.dispatch_queue_depth,
        )?;

        let serial_handler = Arc::clone(&handler);
        let serial = thread::Builder::new()
            .name("serial-reader".to_string())
            .spawn(move || {
                let mut reader = FrameReader::new(read_half);
                let outcome = run_serial_reader(&mut reader, &dispatch_pool, serial_handler);
                // In-flight handlers may sit in a backend call; don't wait for them.
                dispatch_pool.detach();
                outcome
            })?;

        let listener = thread::Builder::new()
            .name("tcp-listener".to_string())
            .spawn(move || listener.serve(handler))?;

        info!(%device, %request_addr, "bridge running");
        Ok(Self {
            serial,
            listener,
            request_addr,
            device,
        })
    }

    /// Address the request listener is bound to.
    pub fn request_addr(&self) -> SocketAddr {
        self.request_addr
    }

    pub fn device(&self) -> &str {
        &self.device
    }

    /// Block until the serial loop ends and return its outcome.
    ///
    /// The serial loop only ends on a fatal link error. Neither the listener
    /// thread nor handlers still in flight are joined; they run until the
    /// process exits.
    pub fn wait(self) -> Result<()> {
        let outcome = self
            .serial
            .join()
            .map_err(|_| BridgeError::ThreadPanicked("serial-reader"))?;
        if self.listener.is_finished() {
            self.listener
                .join()
                .map_err(|_| BridgeError::ThreadPanicked("tcp-listener"))??;
        }
        outcome
    }
}

#[cfg(test)]
mod tests {
    use std::io::{Read, Write};
    use std::net::{TcpListener, TcpStream};
    use std::time::{Duration, Instant};

    use bytes::BytesMut;
    use crossbeam::channel::{unbounded, Receiver, Sender};
    use manetheren_frame::{
        decode_frame, encode_frame, FrameError, MessageType, ServiceKind, MAX_PAYLOAD,
    };

    use super::*;
    use crate::dispatch::{BackendResponse, RequestContext};

    struct FixedBackend(&'static str);

    impl Backend for FixedBackend {
        fn fetch(&self, request: &RequestContext) -> Result<BackendResponse> {
            Ok(BackendResponse::from_body(format!(
                "{}:{}",
                self.0,
                request.service()
            )))
        }
    }

    /// Signals `started`, then parks until `release` fires or is dropped.
    struct StalledBackend {
        started: Sender<()>,
        release: Receiver<()>,
    }

    impl Backend for StalledBackend {
        fn fetch(&self, _request: &RequestContext) -> Result<BackendResponse> {
            let _ = self.started.send(());
            let _ = self.release.recv_timeout(Duration::from_secs(30));
            Ok(BackendResponse::Empty)
        }
    }

    struct ChannelPublisher(Sender<(ServiceKind, Vec<u8>)>);

    impl Publisher for ChannelPublisher {
        fn publish(&self, service: ServiceKind, message: &[u8]) -> Result<()> {
            let _ = self.0.send((service, message.to_vec()));
            Ok(())
        }
    }

    fn frame_bytes(message_type: MessageType, payload: &[u8]) -> Vec<u8> {
        let mut buf = BytesMut::new();
        encode_frame(message_type, payload, &mut buf).expect("encode");
        buf.to_vec()
    }

    /// Read from the fake peer until one whole frame arrives.
    fn read_one_frame(peer: &mut TcpStream) -> manetheren_frame::Frame {
        let mut wire = BytesMut::new();
        let mut chunk = [0u8; 256];
        loop {
            if let Some(frame) = decode_frame(&mut wire, MAX_PAYLOAD).expect("decode") {
                return frame;
            }
            let n = peer.read(&mut chunk).expect("read from bridge");
            assert_ne!(n, 0, "bridge closed the link");
            wire.extend_from_slice(&chunk[..n]);
        }
    }

    fn test_config(device: String) -> BridgeConfig {
        BridgeConfig {
            serial_device: device,
            request_addr: "127.0.0.1:0".parse().expect("valid addr"),
            dispatch_workers: 2,
            ..BridgeConfig::default()
        }
    }

    #[test]
    fn bridges_link_and_local_requests() {
        let remote = TcpListener::bind("127.0.0.1:0").expect("bind fake peer");
        let device = format!("tcp://{}", remote.local_addr().expect("local addr"));
        let (published_tx, published_rx) = unbounded();

        let bridge = Bridge::start(
            &test_config(device.clone()),
            FixedBackend("content"),
            ChannelPublisher(published_tx),
        )
        .expect("bridge should start");
        assert_eq!(bridge.device(), device);
        let (mut peer, _) = remote.accept().expect("bridge connects to peer");
        peer.set_read_timeout(Some(Duration::from_secs(5)))
            .expect("set timeout");

        // Peer asks for the time; the bridge answers with serve:time.
        peer.write_all(&frame_bytes(MessageType::Request(ServiceKind::Time), b""))
            .expect("write request");
        let reply = read_one_frame(&mut peer);
        assert_eq!(reply.message_type, MessageType::Serve(ServiceKind::Time));
        assert_eq!(reply.payload.as_ref(), b"content:time");

        // Peer serves weather; it lands on the publisher.
        peer.write_all(&frame_bytes(MessageType::Serve(ServiceKind::Weather), b"{}"))
            .expect("write serve");
        let published = published_rx
            .recv_timeout(Duration::from_secs(5))
            .expect("publish");
        assert_eq!(published, (ServiceKind::Weather, b"{}".to_vec()));

        // A local request is forwarded to the peer unchanged.
        let forwarded = frame_bytes(MessageType::Request(ServiceKind::Config), b"screen");
        let mut client = TcpStream::connect(bridge.request_addr()).expect("connect listener");
        client.write_all(&forwarded).expect("write local request");
        drop(client);
        let frame = read_one_frame(&mut peer);
        assert_eq!(frame.message_type, MessageType::Request(ServiceKind::Config));
        assert_eq!(frame.payload.as_ref(), b"screen");

        // A local serve type forces a push of fresh content.
        let mut client = TcpStream::connect(bridge.request_addr()).expect("connect listener");
        client
            .write_all(&frame_bytes(MessageType::Serve(ServiceKind::Quote), b""))
            .expect("write local serve");
        drop(client);
        let frame = read_one_frame(&mut peer);
        assert_eq!(frame.message_type, MessageType::Serve(ServiceKind::Quote));
        assert_eq!(frame.payload.as_ref(), b"content:quote");

        // Closing the link ends the bridge with a fatal error.
        drop(peer);
        let err = bridge.wait().unwrap_err();
        assert!(matches!(err, BridgeError::Frame(FrameError::ConnectionClosed)));
    }

    #[test]
    fn missing_device_fails_to_start() {
        let (tx, _rx) = unbounded();
        let err = Bridge::start(
            &test_config("/dev/manetheren-missing".to_string()),
            FixedBackend("x"),
            ChannelPublisher(tx),
        )
        .unwrap_err();
        assert!(matches!(err, BridgeError::Transport(_)));
    }

    #[test]
    fn busy_request_port_fails_to_start() {
        let remote = TcpListener::bind("127.0.0.1:0").expect("bind fake peer");
        let taken = TcpListener::bind("127.0.0.1:0").expect("bind blocker");
        let mut config = test_config(format!(
            "tcp://{}",
            remote.local_addr().expect("local addr")
        ));
        config.request_addr = taken.local_addr().expect("local addr");
        let (tx, _rx) = unbounded();

        let err = Bridge::start(&config, FixedBackend("x"), ChannelPublisher(tx)).unwrap_err();
        assert!(matches!(err, BridgeError::Transport(_)));
    }

    #[test]
    fn link_failure_is_reported_while_backend_call_is_stuck() {
        let remote = TcpListener::bind("127.0.0.1:0").expect("bind fake peer");
        let device = format!("tcp://{}", remote.local_addr().expect("local addr"));
        let (started_tx, started_rx) = unbounded();
        let (release_tx, release_rx) = unbounded();
        let (tx, _rx) = unbounded();

        let bridge = Bridge::start(
            &test_config(device),
            StalledBackend {
                started: started_tx,
                release: release_rx,
            },
            ChannelPublisher(tx),
        )
        .expect("bridge should start");
        let (mut peer, _) = remote.accept().expect("bridge connects to peer");

        peer.write_all(&frame_bytes(MessageType::Request(ServiceKind::Time), b""))
            .expect("write request");
        started_rx
            .recv_timeout(Duration::from_secs(5))
            .expect("backend call in flight");

        let begin = Instant::now();
        drop(peer);
        let err = bridge.wait().unwrap_err();
        assert!(matches!(err, BridgeError::Frame(FrameError::ConnectionClosed)));
        assert!(begin.elapsed() < Duration::from_secs(5));
        drop(release_tx);
    }
}
