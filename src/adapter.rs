//! Background-thread command reader, mirroring the single-session
//! listener pattern: a dedicated thread blocks on the transport and
//! forwards decoded command lines to the caller over a channel, exposed
//! as an [`Iterator`].

use std::io;
use std::io::BufRead;
use std::sync::mpsc;
use std::thread;

use crate::codec::read_command_line;

pub struct Adapter {
    receiver: mpsc::Receiver<io::Result<Option<String>>>,
}

impl Adapter {
    /// Start an adapter reading command lines from `input` on a
    /// dedicated thread.
    pub fn new<R>(input: R) -> Self
    where
        R: BufRead + Send + 'static,
    {
        let (sender, receiver) = mpsc::channel();
        thread::spawn(move || {
            let listener = Listener::new(sender, input);
            listener.start();
        });
        Adapter { receiver }
    }

    /// Start an adapter in single session mode: read command lines from
    /// stdin. This means you should not have printed anything to stdout
    /// before you call this function.
    pub fn single_session_mode() -> Self {
        Self::new(io::BufReader::new(io::stdin()))
    }
}

impl Iterator for Adapter {
    type Item = io::Result<Option<String>>;

    fn next(&mut self) -> Option<Self::Item> {
        self.receiver.recv().ok()
    }
}

struct Listener<R: BufRead> {
    input: R,
    sender: mpsc::Sender<io::Result<Option<String>>>,
}

impl<R: BufRead> Listener<R> {
    fn new(sender: mpsc::Sender<io::Result<Option<String>>>, input: R) -> Listener<R> {
        Listener { input, sender }
    }

    fn start(mut self) {
        loop {
            let line = read_command_line(&mut self.input, None);
            let stop = matches!(line, Ok(None) | Err(_));
            if self.sender.send(line).is_err() || stop {
                return;
            }
        }
    }
}
