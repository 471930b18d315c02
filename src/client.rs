//! Async client handle and session runtime.
//!
//! [`Client::spawn`] starts the session task and hands back a cheap
//! cloneable handle plus the event stream. The task owns the [`Session`]
//! core and serializes everything onto one context: inbound frames, user
//! commands (delivered over the request channel), the flood-protection tick
//! and reconnect scheduling all interleave in a single `select` loop, so no
//! state is shared across tasks.

use tokio::sync::{mpsc, oneshot};
use tokio::time::{interval, sleep, Duration, Interval};
use tracing::debug;

use crate::commands::Request;
use crate::config::Config;
use crate::error::{ClientError, Result};
use crate::events::{Event, WaitFilter};
use crate::sendq::{SendMode, SendQueue};
use crate::session::Session;
use crate::state::WhoisInfo;
use crate::transport::Transport;

/// Handle to a running session.
///
/// Methods that have a protocol completion (`connect`, `join`, `whois`, ...)
/// resolve when the matching event arrives; fire-and-forget operations
/// return as soon as the command is handed to the session task.
#[derive(Clone)]
pub struct Client {
    tx: mpsc::UnboundedSender<Request>,
}

impl Client {
    /// Spawn the session task.
    ///
    /// With `auto_connect` set (the default) the task dials immediately;
    /// otherwise it waits for [`Client::connect`].
    pub fn spawn(config: Config) -> (Self, mpsc::UnboundedReceiver<Event>) {
        let (session, events) = Session::new(config);
        let (tx, rx) = mpsc::unbounded_channel();
        tokio::spawn(run_session(session, rx));
        (Self { tx }, events)
    }

    /// Connect (or reconnect) and resolve once registration completes.
    pub async fn connect(&self) -> Result<()> {
        let (tx, rx) = oneshot::channel();
        self.tx.send(Request::Connect { notify: Some(tx) })?;
        rx.await?;
        Ok(())
    }

    /// Send QUIT, close the connection, and resolve once it is down.
    pub async fn disconnect(&self, message: Option<&str>) -> Result<()> {
        let (tx, rx) = oneshot::channel();
        self.tx.send(Request::Disconnect {
            message: message.map(str::to_string),
            notify: Some(tx),
        })?;
        rx.await?;
        Ok(())
    }

    /// Join a channel (`"#chan"` or `"#chan key"`); resolves when the join
    /// is confirmed.
    pub async fn join(&self, channel: &str) -> Result<()> {
        let (tx, rx) = oneshot::channel();
        self.tx.send(Request::Join {
            channel: channel.to_string(),
            notify: Some(tx),
        })?;
        rx.await?;
        Ok(())
    }

    /// Part a channel; resolves when the part is confirmed.
    pub async fn part(&self, channel: &str, message: Option<&str>) -> Result<()> {
        let (tx, rx) = oneshot::channel();
        self.tx.send(Request::Part {
            channel: channel.to_string(),
            message: message.map(str::to_string),
            notify: Some(tx),
        })?;
        rx.await?;
        Ok(())
    }

    /// WHOIS a nick and return the accumulated reply.
    pub async fn whois(&self, nick: &str) -> Result<WhoisInfo> {
        let (tx, rx) = oneshot::channel();
        self.tx.send(Request::Whois {
            nick: nick.to_string(),
            notify: Some(tx),
        })?;
        match rx.await? {
            Event::Whois { info } => Ok(info),
            _ => Err(ClientError::ReplyDropped),
        }
    }

    /// Send a PRIVMSG (split into protocol-legal parts).
    pub fn say(&self, target: &str, text: &str) -> Result<()> {
        Ok(self.tx.send(Request::Say {
            target: target.to_string(),
            text: text.to_string(),
        })?)
    }

    /// Send a NOTICE (split into protocol-legal parts).
    pub fn notice(&self, target: &str, text: &str) -> Result<()> {
        Ok(self.tx.send(Request::Notice {
            target: target.to_string(),
            text: text.to_string(),
        })?)
    }

    /// Send a CTCP ACTION.
    pub fn action(&self, target: &str, text: &str) -> Result<()> {
        Ok(self.tx.send(Request::Action {
            target: target.to_string(),
            text: text.to_string(),
        })?)
    }

    /// Send a CTCP payload; `kind` of `privmsg` sends a query, anything
    /// else a notice.
    pub fn ctcp(&self, to: &str, kind: &str, text: &str) -> Result<()> {
        Ok(self.tx.send(Request::Ctcp {
            to: to.to_string(),
            kind: kind.to_string(),
            text: text.to_string(),
        })?)
    }

    /// Send LIST with pass-through arguments.
    pub fn list(&self, args: &[&str]) -> Result<()> {
        Ok(self.tx.send(Request::List {
            args: args.iter().map(|s| s.to_string()).collect(),
        })?)
    }

    /// Send WHO with an optional format (see the session docs for format
    /// validation).
    pub fn who(&self, target: &str, format: Option<&str>) -> Result<()> {
        Ok(self.tx.send(Request::Who {
            target: target.to_string(),
            format: format.map(str::to_string),
        })?)
    }

    /// Batch-apply a membership mode change (e.g. `"+o"`) to several nicks.
    pub fn set_chan_mode(&self, channel: &str, mode_change: &str, nicks: &[&str]) -> Result<()> {
        Ok(self.tx.send(Request::SetChanMode {
            channel: channel.to_string(),
            mode_change: mode_change.to_string(),
            nicks: nicks.iter().map(|s| s.to_string()).collect(),
        })?)
    }

    /// Send an arbitrary command.
    pub fn raw(&self, command: &str, args: &[&str]) -> Result<()> {
        Ok(self.tx.send(Request::Raw {
            command: command.to_string(),
            args: args.iter().map(|s| s.to_string()).collect(),
        })?)
    }
}

enum ConnOutcome {
    /// The connection dropped without us asking.
    Closed,
    /// The user requested the close.
    RequestedClose,
    /// Every client handle is gone.
    ClientGone,
    /// Event dispatch failed on a live session.
    Fatal,
}

async fn run_session(mut session: Session, mut rx: mpsc::UnboundedReceiver<Request>) {
    if !session.config().auto_connect && wait_for_connect(&mut session, &mut rx).await.is_none() {
        return;
    }

    let mut attempt: u32 = 0;
    loop {
        let outcome = match Transport::connect(session.config()).await {
            Ok(transport) => {
                session.start();
                let outcome = run_connection(&mut session, &mut rx, transport).await;
                if matches!(outcome, ConnOutcome::Closed)
                    && !session.state().host_mask.is_empty()
                {
                    // This connection registered successfully; the retry
                    // chain starts over.
                    attempt = 0;
                }
                outcome
            }
            Err(e) => {
                let _ = session.emit(Event::NetError {
                    error: e.to_string(),
                });
                ConnOutcome::Closed
            }
        };

        match outcome {
            ConnOutcome::ClientGone | ConnOutcome::Fatal => return,
            ConnOutcome::RequestedClose => {
                let _ = session.emit(Event::Disconnected { requested: true });
                attempt = 0;
                if wait_for_connect(&mut session, &mut rx).await.is_none() {
                    return;
                }
            }
            ConnOutcome::Closed => {
                let _ = session.emit(Event::Disconnected { requested: false });
                let exhausted = session
                    .config()
                    .retry_count
                    .is_some_and(|max| attempt >= max);
                if exhausted {
                    let retry_count = session.config().retry_count.unwrap_or_default();
                    let _ = session.emit(Event::Abort { retry_count });
                    attempt = 0;
                    if wait_for_connect(&mut session, &mut rx).await.is_none() {
                        return;
                    }
                } else {
                    attempt += 1;
                    match reconnect_pause(&mut session, &mut rx).await {
                        Pause::Proceed => {}
                        Pause::Cancelled => {
                            let _ = session.emit(Event::Disconnected { requested: true });
                            attempt = 0;
                            if wait_for_connect(&mut session, &mut rx).await.is_none() {
                                return;
                            }
                        }
                        Pause::Gone => return,
                    }
                }
            }
        }
    }
}

async fn run_connection(
    session: &mut Session,
    rx: &mut mpsc::UnboundedReceiver<Request>,
    mut transport: Transport,
) -> ConnOutcome {
    let mode = if session.config().flood_protection {
        SendMode::Paced(Duration::from_millis(session.config().flood_protection_delay))
    } else {
        SendMode::Immediate
    };
    let mut sendq = SendQueue::new(mode);
    // The first interval tick completes immediately, releasing one queued
    // frame on activation.
    let mut tick = match mode {
        SendMode::Paced(delay) => Some(interval(delay)),
        SendMode::Immediate => None,
    };

    enum Turn {
        Inbound(Result<Option<String>>),
        Submitted(Option<Request>),
        Tick,
    }

    loop {
        if let Err(e) = flush_outbound(session, &mut sendq, &mut transport).await {
            let _ = session.emit(Event::NetError {
                error: e.to_string(),
            });
            return ConnOutcome::Closed;
        }

        let turn = tokio::select! {
            line = transport.read_line() => Turn::Inbound(line),
            request = rx.recv() => Turn::Submitted(request),
            _ = pop_tick(&mut tick) => Turn::Tick,
        };

        match turn {
            Turn::Inbound(Ok(Some(line))) => {
                if session.feed_line(&line).is_err() {
                    return ConnOutcome::Fatal;
                }
            }
            Turn::Inbound(Ok(None)) => {
                return if session.requested_disconnect() {
                    ConnOutcome::RequestedClose
                } else {
                    ConnOutcome::Closed
                };
            }
            Turn::Inbound(Err(e)) => {
                let _ = session.emit(Event::NetError {
                    error: e.to_string(),
                });
                return ConnOutcome::Closed;
            }
            Turn::Submitted(None) => {
                session.quit(None);
                let _ = flush_outbound(session, &mut sendq, &mut transport).await;
                return ConnOutcome::ClientGone;
            }
            Turn::Submitted(Some(Request::Connect { notify })) => {
                if let Some(tx) = notify {
                    if session.state().host_mask.is_empty() {
                        session.events.add_waiter(WaitFilter::Registered, tx);
                    } else {
                        // Already registered on this connection.
                        let _ = tx.send(Event::Registered {
                            nick: session.state().own_nick.clone(),
                        });
                    }
                }
            }
            Turn::Submitted(Some(Request::Disconnect { message, notify })) => {
                if let Some(tx) = notify {
                    session.events.add_waiter(WaitFilter::Disconnected, tx);
                }
                sendq.clear();
                session.quit(message.as_deref());
                let _ = flush_outbound(session, &mut sendq, &mut transport).await;
                return ConnOutcome::RequestedClose;
            }
            Turn::Submitted(Some(request)) => {
                if session.execute(request).is_err() {
                    return ConnOutcome::Fatal;
                }
            }
            Turn::Tick => {
                if !session.requested_disconnect() {
                    if let Some(line) = sendq.pop() {
                        if let Err(e) = transport.write_line(line).await {
                            let _ = session.emit(Event::NetError {
                                error: e.to_string(),
                            });
                            return ConnOutcome::Closed;
                        }
                    }
                }
            }
        }
    }
}

/// Move session output into the send queue, writing whatever is due now.
/// After a requested disconnect only bypass lines (the QUIT) go out.
async fn flush_outbound(
    session: &mut Session,
    sendq: &mut SendQueue,
    transport: &mut Transport,
) -> Result<()> {
    for out in session.take_outbound() {
        if session.requested_disconnect() && !out.bypass {
            continue;
        }
        if out.bypass {
            transport.write_line(out.line).await?;
        } else if let Some(line) = sendq.push(out.line) {
            transport.write_line(line).await?;
        }
    }
    Ok(())
}

async fn pop_tick(tick: &mut Option<Interval>) {
    match tick {
        Some(tick) => {
            tick.tick().await;
        }
        None => std::future::pending::<()>().await,
    }
}

/// Park until the next connect request.
///
/// Returns `None` when every client handle is gone.
async fn wait_for_connect(
    session: &mut Session,
    rx: &mut mpsc::UnboundedReceiver<Request>,
) -> Option<()> {
    loop {
        match rx.recv().await? {
            Request::Connect { notify } => {
                if let Some(tx) = notify {
                    session.events.add_waiter(WaitFilter::Registered, tx);
                }
                return Some(());
            }
            Request::Disconnect { notify, .. } => {
                if let Some(tx) = notify {
                    let _ = tx.send(Event::Disconnected { requested: true });
                }
            }
            request => {
                debug!(?request, "dropping command while disconnected");
            }
        }
    }
}

enum Pause {
    Proceed,
    Cancelled,
    Gone,
}

/// Sleep out the reconnect delay, staying responsive to disconnect (which
/// cancels the retry) and connect (which skips the rest of the delay).
async fn reconnect_pause(
    session: &mut Session,
    rx: &mut mpsc::UnboundedReceiver<Request>,
) -> Pause {
    let delay = sleep(Duration::from_millis(session.config().retry_delay));
    tokio::pin!(delay);
    loop {
        tokio::select! {
            _ = &mut delay => return Pause::Proceed,
            request = rx.recv() => match request {
                None => return Pause::Gone,
                Some(Request::Connect { notify }) => {
                    if let Some(tx) = notify {
                        session.events.add_waiter(WaitFilter::Registered, tx);
                    }
                    return Pause::Proceed;
                }
                Some(Request::Disconnect { notify, .. }) => {
                    if let Some(tx) = notify {
                        let _ = tx.send(Event::Disconnected { requested: true });
                    }
                    return Pause::Cancelled;
                }
                Some(request) => {
                    debug!(?request, "dropping command while reconnecting");
                }
            },
        }
    }
}
