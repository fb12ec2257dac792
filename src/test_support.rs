//! Fakes shared by the unit tests: an in-memory stream, a scripted link and a
//! loopback gateway daemon.

use std::collections::VecDeque;
use std::io::{self, Cursor, Read, Write};
use std::net::TcpListener;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crate::gateway::link::{MESSAGE_LEN, TransactionResult};
use crate::gateway::{GatewayError, Link};
use crate::proto::{Command, ForwardFrame, Response};

/* ---------- in-memory stream ---------- */

pub struct MockStream {
    replies: Cursor<Vec<u8>>,
    written: Vec<u8>,
}

impl MockStream {
    pub fn with_replies(replies: &[[u8; 4]]) -> Self {
        Self::with_bytes(&replies.concat())
    }

    pub fn with_bytes(bytes: &[u8]) -> Self {
        Self {
            replies: Cursor::new(bytes.to_vec()),
            written: Vec::new(),
        }
    }

    pub fn written(&self) -> &[u8] {
        &self.written
    }

    /// Written bytes split into 4-byte request messages.
    pub fn messages(&self) -> Vec<[u8; 4]> {
        self.written
            .chunks(MESSAGE_LEN)
            .map(|c| [c[0], c[1], c[2], c[3]])
            .collect()
    }

    pub fn unread(&self) -> usize {
        self.replies.get_ref().len() - self.replies.position() as usize
    }
}

impl Read for MockStream {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.replies.read(buf)
    }
}

impl Write for MockStream {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.written.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/* ---------- scripted link ---------- */

type Reply = Result<TransactionResult, GatewayError>;

/// Answers each command from a closure and records what was sent.
pub struct ScriptedLink {
    answer: Box<dyn FnMut(&Command) -> Reply + Send>,
    pub sent: Vec<String>,
    pub frames: Vec<ForwardFrame>,
}

impl ScriptedLink {
    pub fn new(answer: impl FnMut(&Command) -> Reply + Send + 'static) -> Self {
        Self {
            answer: Box::new(answer),
            sent: Vec::new(),
            frames: Vec::new(),
        }
    }

    /// Replies in order from a fixed list; fails once the list runs out.
    pub fn queue(replies: impl IntoIterator<Item = TransactionResult>) -> Self {
        let mut replies: VecDeque<_> = replies.into_iter().collect();
        Self::new(move |_| {
            replies.pop_front().ok_or_else(|| {
                GatewayError::Io(io::Error::new(io::ErrorKind::UnexpectedEof, "script exhausted"))
            })
        })
    }
}

impl Link for ScriptedLink {
    fn transact(&mut self, command: &Command) -> Result<Option<Response>, GatewayError> {
        self.sent.push(command.to_string());
        self.frames.push(command.frame());
        let result = (self.answer)(command)?;
        Ok(command.decode(result.backward_frame()))
    }
}

/* ---------- loopback daemon ---------- */

#[derive(Debug, Default)]
pub struct DaemonLog {
    pub connections: usize,
    pub requests: Vec<[u8; 4]>,
}

pub struct FakeDaemon {
    port: u16,
    stop: Arc<AtomicBool>,
    handle: JoinHandle<DaemonLog>,
}

impl FakeDaemon {
    /// Serves 4-byte replies until each client hangs up.
    pub fn spawn(reply: impl Fn([u8; 4]) -> [u8; 4] + Send + 'static) -> Self {
        Self::start(move |req| (reply(req).to_vec(), false))
    }

    /// Writes whatever `reply` returns, then drops the connection.
    pub fn spawn_raw(reply: impl Fn([u8; 4]) -> Vec<u8> + Send + 'static) -> Self {
        Self::start(move |req| (reply(req), true))
    }

    fn start(reply: impl Fn([u8; 4]) -> (Vec<u8>, bool) + Send + 'static) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        listener.set_nonblocking(true).unwrap();
        let stop = Arc::new(AtomicBool::new(false));
        let stop_flag = stop.clone();

        let handle = thread::spawn(move || {
            let mut log = DaemonLog::default();
            while !stop_flag.load(Ordering::Relaxed) {
                let mut stream = match listener.accept() {
                    Ok((s, _)) => s,
                    Err(e) if e.kind() == io::ErrorKind::WouldBlock => {
                        thread::sleep(Duration::from_millis(2));
                        continue;
                    }
                    Err(e) => panic!("accept: {e}"),
                };
                stream.set_nonblocking(false).unwrap();
                log.connections += 1;
                let mut req = [0u8; 4];
                while stream.read_exact(&mut req).is_ok() {
                    log.requests.push(req);
                    let (bytes, hang_up) = reply(req);
                    if stream.write_all(&bytes).is_err() || hang_up {
                        break;
                    }
                }
            }
            log
        });

        Self { port, stop, handle }
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    /// Stops accepting and returns what was seen. Clients must be finished.
    pub fn finish(self) -> DaemonLog {
        self.stop.store(true, Ordering::Relaxed);
        self.handle.join().unwrap()
    }
}
