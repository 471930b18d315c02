//! Inbound frame dispatch.
//!
//! One method per protocol concern, all running on the session context.
//! Handlers mutate [`SessionState`], emit events and queue protocol
//! responses (PONG, CAP negotiation, SASL exchange, nick-in-use mitigation,
//! auto-rejoin, the post-join MODE/WHO sync).
//!
//! [`SessionState`]: crate::state::SessionState

use std::collections::VecDeque;
use std::time::Instant;

use tracing::{debug, warn};

use crate::casemap::irc_lower;
use crate::codes::CommandKind;
use crate::ctcp;
use crate::error::Result;
use crate::events::Event;
use crate::frame::Frame;
use crate::isupport;
use crate::sasl;
use crate::session::Session;
use crate::state::{who_fields, ChannelListItem, UserEntry, WhoRecord, DEFAULT_WHO_FORMAT};

impl Session {
    pub(crate) fn handle_frame(&mut self, frame: &Frame) -> Result<()> {
        match frame.command.as_str() {
            "rpl_welcome" => self.on_welcome(frame),
            "rpl_myinfo" => {
                self.state.supported.user_modes = frame.arg(3).to_string();
                Ok(())
            }
            "rpl_isupport" => {
                for token in &frame.args {
                    isupport::absorb_token(&mut self.state, token);
                }
                Ok(())
            }
            "err_nicknameinuse" => self.on_nick_in_use(),
            "PING" => {
                let payload = frame.arg(0).to_string();
                self.send("PONG", &[payload.as_str()]);
                self.emit(Event::Ping { server: payload })
            }
            "PONG" => self.emit(Event::Pong {
                server: frame.arg(0).to_string(),
            }),
            "PRIVMSG" => self.on_privmsg(frame),
            "NOTICE" => self.on_notice(frame),
            "MODE" => self.on_mode(frame),
            "NICK" => self.on_nick(frame),
            "rpl_motdstart" => {
                self.state.motd_buffer = format!("{}\n", frame.arg(1));
                Ok(())
            }
            "rpl_motd" => {
                self.state.motd_buffer.push_str(frame.arg(1));
                self.state.motd_buffer.push('\n');
                Ok(())
            }
            "rpl_endofmotd" | "err_nomotd" => self.on_motd_end(frame),
            "rpl_topic" => {
                let topic = frame.arg(2).to_string();
                if let Some(chan) = self.state.chan_data(frame.arg(1), false) {
                    chan.topic = Some(topic);
                }
                Ok(())
            }
            "rpl_topicwhotime" => {
                let channel = frame.arg(1).to_string();
                let set_by = frame.arg(2).to_string();
                let mut topic = None;
                if let Some(chan) = self.state.chan_data(&channel, false) {
                    chan.topic_by = Some(set_by.clone());
                    topic = chan.topic.clone();
                }
                self.emit(Event::Topic {
                    channel,
                    topic,
                    set_by: Some(set_by),
                })
            }
            "TOPIC" => self.on_topic_change(frame),
            "rpl_channelmodeis" => {
                let mode = frame.arg(2).to_string();
                if let Some(chan) = self.state.chan_data(frame.arg(1), false) {
                    chan.mode = mode;
                }
                Ok(())
            }
            "rpl_creationtime" => {
                let created = frame.arg(2).to_string();
                if let Some(chan) = self.state.chan_data(frame.arg(1), false) {
                    chan.created = Some(created);
                }
                Ok(())
            }
            "JOIN" => self.on_join(frame),
            "PART" => self.on_part(frame),
            "KICK" => self.on_kick(frame),
            "KILL" => self.on_kill(frame),
            "QUIT" => self.on_quit(frame),
            "INVITE" => self.emit(Event::Invite {
                channel: frame.arg(1).to_string(),
                from: frame.nick.clone(),
            }),
            "CAP" => self.on_cap(frame),
            "AUTHENTICATE" => self.on_authenticate(frame),
            "rpl_loggedin" => {
                debug!("account login: {}", frame.trailing());
                Ok(())
            }
            "rpl_saslsuccess" => {
                self.emit(Event::SaslAuthenticated)?;
                self.finish_negotiation()
            }
            "err_nicklocked" | "err_saslfail" | "err_sasltoolong" | "err_saslaborted"
            | "err_saslalready" => {
                self.emit(Event::SaslFailed)?;
                self.finish_negotiation()
            }
            "ACCOUNT" => self.on_account(frame),
            "rpl_whoisuser" => {
                let (user, host, realname) = (
                    frame.arg(2).to_string(),
                    frame.arg(3).to_string(),
                    frame.arg(5).to_string(),
                );
                self.state.add_whois_field(
                    frame.arg(1),
                    |w| {
                        w.user = Some(user);
                        w.host = Some(host);
                        w.realname = Some(realname);
                    },
                    false,
                );
                Ok(())
            }
            "rpl_whoisserver" => {
                let (server, serverinfo) =
                    (frame.arg(2).to_string(), frame.arg(3).to_string());
                self.state.add_whois_field(
                    frame.arg(1),
                    |w| {
                        w.server = Some(server);
                        w.serverinfo = Some(serverinfo);
                    },
                    false,
                );
                Ok(())
            }
            "rpl_whoisoperator" => {
                let operator = frame.arg(2).to_string();
                self.state
                    .add_whois_field(frame.arg(1), |w| w.operator = Some(operator), false);
                Ok(())
            }
            "rpl_whoisidle" => {
                let idle = frame.arg(2).to_string();
                self.state
                    .add_whois_field(frame.arg(1), |w| w.idle = Some(idle), false);
                Ok(())
            }
            "rpl_whoischannels" => {
                let channels: Vec<String> = frame
                    .arg(2)
                    .split_whitespace()
                    .map(str::to_string)
                    .collect();
                self.state
                    .add_whois_field(frame.arg(1), |w| w.channels = channels, false);
                Ok(())
            }
            "rpl_whoisaccount" => {
                let (account, accountinfo) =
                    (frame.arg(2).to_string(), frame.arg(3).to_string());
                self.state.add_whois_field(
                    frame.arg(1),
                    |w| {
                        w.account = Some(account);
                        w.accountinfo = Some(accountinfo);
                    },
                    false,
                );
                Ok(())
            }
            // 301 also arrives outside WHOIS (e.g. when messaging an away
            // user); only record it into an accumulator that already exists.
            "rpl_away" => {
                let away = frame.arg(2).to_string();
                self.state
                    .add_whois_field(frame.arg(1), |w| w.away = Some(away), true);
                Ok(())
            }
            "rpl_endofwhois" => {
                let info = self.state.take_whois(frame.arg(1));
                self.emit(Event::Whois { info })
            }
            "rpl_whoreply" | "rpl_whospcrpl" => {
                if !frame.args.is_empty() {
                    self.state.who.data.push(frame.args[1..].to_vec());
                }
                Ok(())
            }
            "rpl_endofwho" => self.on_endofwho(frame),
            "rpl_liststart" => {
                self.state.channel_list.clear();
                self.emit(Event::ChannelListStart)
            }
            "rpl_list" => {
                let item = ChannelListItem {
                    name: frame.arg(1).to_string(),
                    users: frame.arg(2).to_string(),
                    topic: frame.arg(3).to_string(),
                };
                self.state.channel_list.push(item.clone());
                self.emit(Event::ChannelListItem { item })
            }
            "rpl_listend" => self.emit(Event::ChannelList {
                items: self.state.channel_list.clone(),
            }),
            "err_umodeunknownflag" => {
                warn!("user mode not recognized by server");
                Ok(())
            }
            "err_erroneusnickname" => self.emit(Event::ErrorReply {
                frame: frame.clone(),
            }),
            _ => {
                if frame.kind == CommandKind::Error {
                    if self.config.show_errors {
                        warn!(command = %frame.command, args = ?frame.args, "server error reply");
                    }
                    self.emit(Event::ErrorReply {
                        frame: frame.clone(),
                    })
                } else {
                    debug!(command = %frame.command, "unhandled frame");
                    Ok(())
                }
            }
        }
    }

    fn on_welcome(&mut self, frame: &Frame) -> Result<()> {
        let nick = frame.arg(0).to_string();
        self.state.own_nick = nick.clone();
        if let Some(mask) = frame.arg(1).split_whitespace().last() {
            self.state.host_mask = mask.to_string();
        }
        self.state.update_max_line_length();
        self.emit(Event::Registered { nick })
    }

    fn on_nick_in_use(&mut self) -> Result<()> {
        self.nick_mod += 1;
        let next = format!("{}{}", self.config.nick, self.nick_mod);
        self.send("NICK", &[next.as_str()]);
        Ok(())
    }

    fn on_privmsg(&mut self, frame: &Frame) -> Result<()> {
        let from = frame.nick.clone();
        let target = frame.arg(0).to_string();
        let text = frame.arg(1).to_string();
        if ctcp::is_ctcp(&text) {
            return self.on_ctcp(from, target, &text, false);
        }
        let to_self = self.state.is_self(&target);
        self.emit(Event::Message {
            from,
            target,
            text,
            to_self,
        })
    }

    fn on_notice(&mut self, frame: &Frame) -> Result<()> {
        let from = frame.nick.clone();
        let target = frame.arg(0).to_string();
        let text = frame.arg(1).to_string();
        if ctcp::is_ctcp(&text) {
            return self.on_ctcp(from, target, &text, true);
        }
        self.emit(Event::Notice { from, target, text })
    }

    fn on_ctcp(
        &mut self,
        from: Option<String>,
        target: String,
        text: &str,
        notice: bool,
    ) -> Result<()> {
        let Some(payload) = ctcp::decode(text) else {
            return Ok(());
        };
        if !notice && payload.kind == "ACTION" {
            return self.emit(Event::Action {
                from,
                target,
                text: payload.body,
            });
        }
        self.emit(Event::Ctcp {
            from,
            target,
            kind: payload.kind,
            text: payload.body,
            notice,
        })
    }

    fn on_mode(&mut self, frame: &Frame) -> Result<()> {
        let target = frame.arg(0).to_string();
        if !self.is_channel(&target) {
            debug!(%target, "ignoring non-channel MODE");
            return Ok(());
        }
        let key = irc_lower(&target);
        if !self.state.chans.contains_key(&key) {
            debug!(%target, "MODE for unknown channel");
            return Ok(());
        }

        let mode_str = frame.arg(1).to_string();
        let mut mode_args: VecDeque<String> = frame.args.iter().skip(2).cloned().collect();
        let by = frame.nick.clone();
        let mut set = true;

        for mode in mode_str.chars() {
            match mode {
                '+' => set = true,
                '-' => set = false,
                mode if self.state.prefix_for_mode.contains_key(&mode) => {
                    let Some(nick) = mode_args.pop_front() else {
                        continue;
                    };
                    if let Some(user) = self
                        .state
                        .chans
                        .get_mut(&key)
                        .and_then(|c| c.users.get_mut(&nick))
                    {
                        if set {
                            user.modes.insert(mode);
                        } else {
                            user.modes.remove(&mode);
                        }
                    }
                    let self_target = self.state.is_self(&nick);
                    self.emit(Event::Mode {
                        channel: target.clone(),
                        by: by.clone(),
                        set,
                        mode,
                        arg: Some(nick),
                        self_target,
                    })?;
                }
                mode => {
                    let arg = if "bkl".contains(mode) {
                        mode_args.pop_front()
                    } else {
                        None
                    };
                    if let Some(chan) = self.state.chans.get_mut(&key) {
                        if set {
                            if !chan.mode.contains(mode) {
                                chan.mode.push(mode);
                            }
                        } else {
                            chan.mode.retain(|m| m != mode);
                        }
                    }
                    self.emit(Event::Mode {
                        channel: target.clone(),
                        by: by.clone(),
                        set,
                        mode,
                        arg,
                        self_target: false,
                    })?;
                }
            }
        }
        Ok(())
    }

    fn on_nick(&mut self, frame: &Frame) -> Result<()> {
        let Some(old) = frame.nick.clone() else {
            return Ok(());
        };
        let new = frame.arg(0).to_string();
        if self.state.is_self(&old) {
            self.state.own_nick = new.clone();
            self.state.update_max_line_length();
            self.emit(Event::SelfNick {
                old: old.clone(),
                new: new.clone(),
            })?;
        }
        let channels = self.state.rename_nick(&old, &new);
        self.emit(Event::Nick { old, new, channels })
    }

    fn on_motd_end(&mut self, frame: &Frame) -> Result<()> {
        self.state.motd_buffer.push_str(frame.arg(1));
        self.state.motd_buffer.push('\n');
        self.emit(Event::Motd {
            motd: self.state.motd_buffer.clone(),
        })?;
        for channel in self.config.channels.clone() {
            let parts: Vec<&str> = channel.split(' ').filter(|p| !p.is_empty()).collect();
            if !parts.is_empty() {
                self.send("JOIN", &parts);
            }
        }
        Ok(())
    }

    fn on_topic_change(&mut self, frame: &Frame) -> Result<()> {
        let channel = frame.arg(0).to_string();
        let topic = frame.arg(1).to_string();
        let set_by = frame.nick.clone();
        if let Some(chan) = self.state.chan_data(&channel, false) {
            chan.topic = Some(topic.clone());
            chan.topic_by = set_by.clone();
        }
        self.emit(Event::Topic {
            channel,
            topic: Some(topic),
            set_by,
        })
    }

    fn on_join(&mut self, frame: &Frame) -> Result<()> {
        let channel = frame.arg(0).to_string();
        let Some(nick) = frame.nick.clone() else {
            return Ok(());
        };
        let is_self = self.state.is_self(&nick);

        if is_self {
            self.state.chan_data(&channel, true);
            let listed = self.config.channels.iter().any(|spec| {
                crate::casemap::irc_eq(
                    spec.split(' ').next().unwrap_or(spec),
                    &channel,
                )
            });
            if !listed {
                self.config.channels.push(channel.clone());
            }
            self.state
                .sync_chans
                .insert(irc_lower(&channel), Instant::now());
            self.send("MODE", &[channel.as_str()]);
            let format = if self.state.supported.whox {
                self.send("WHO", &[channel.as_str(), "%cuhnfa"]);
                "%cuhnfa"
            } else {
                self.send("WHO", &[channel.as_str()]);
                DEFAULT_WHO_FORMAT
            };
            self.state.who.queue.push_back(format.to_string());
        }

        if !is_self {
            // Our own membership view is filled in by the WHO sync.
            let (account, is_registered) = if self.state.capabilities.contains("extended-join") {
                match frame.arg(1) {
                    "" | "*" => (None, false),
                    acct => (Some(acct.to_string()), true),
                }
            } else {
                (None, false)
            };
            if let Some(chan) = self.state.chan_data(&channel, false) {
                chan.users.insert(
                    nick.clone(),
                    UserEntry {
                        username: frame.user.clone(),
                        host: frame.host.clone(),
                        account,
                        is_registered,
                        ..UserEntry::default()
                    },
                );
            }
        }

        if is_self {
            self.emit(Event::SelfJoin {
                channel: channel.clone(),
            })?;
        }
        self.emit(Event::Join { channel, nick })
    }

    fn on_part(&mut self, frame: &Frame) -> Result<()> {
        let channel = frame.arg(0).to_string();
        let Some(nick) = frame.nick.clone() else {
            return Ok(());
        };
        let reason = frame.args.get(1).cloned();
        self.emit(Event::Part {
            channel: channel.clone(),
            nick: nick.clone(),
            reason,
        })?;
        if self.state.is_self(&nick) {
            self.state.remove_chan(&channel);
            self.emit(Event::SelfPart { channel })?;
        } else if let Some(chan) = self.state.chan_data(&channel, false) {
            chan.users.remove(&nick);
        }
        Ok(())
    }

    fn on_kick(&mut self, frame: &Frame) -> Result<()> {
        let channel = frame.arg(0).to_string();
        let victim = frame.arg(1).to_string();
        let reason = frame.args.get(2).cloned();
        let by = frame.nick.clone();

        self.emit(Event::Kick {
            channel: channel.clone(),
            nick: victim.clone(),
            by: by.clone(),
            reason: reason.clone(),
        })?;

        if self.state.is_self(&victim) {
            self.state.remove_chan(&channel);
            self.emit(Event::SelfKick {
                channel: channel.clone(),
                by,
                reason,
            })?;
        } else if let Some(chan) = self.state.chan_data(&channel, false) {
            chan.users.remove(&victim);
        }

        if self.config.auto_rejoin {
            self.send("JOIN", &[channel.as_str()]);
        }
        Ok(())
    }

    fn on_kill(&mut self, frame: &Frame) -> Result<()> {
        let nick = frame.arg(0).to_string();
        let reason = frame.args.get(1).cloned();
        let channels = self.state.nick_in_channels(&nick, true);
        self.emit(Event::Kill {
            nick,
            reason,
            channels,
        })
    }

    fn on_quit(&mut self, frame: &Frame) -> Result<()> {
        let Some(nick) = frame.nick.clone() else {
            return Ok(());
        };
        if self.state.is_self(&nick) {
            return Ok(());
        }
        let reason = frame.args.first().cloned();
        // A host-change cycle is not a real departure; membership stays.
        let host_change = reason.as_deref() == Some("Changing host");
        let channels = self.state.nick_in_channels(&nick, !host_change);
        self.emit(Event::Quit {
            nick,
            reason,
            channels,
            removed: !host_change,
        })
    }

    fn on_cap(&mut self, frame: &Frame) -> Result<()> {
        match frame.arg(1).to_ascii_uppercase().as_str() {
            "LS" => {
                let more_coming = frame.arg(2) == "*";
                let caps_str = if more_coming {
                    frame.arg(3).to_string()
                } else {
                    frame.arg(2).to_string()
                };
                let Some(advertised) = self.cap.absorb_ls(more_coming, &caps_str) else {
                    return Ok(());
                };
                let names: Vec<String> = advertised.iter().map(|(n, _)| n.clone()).collect();
                for (name, value) in advertised {
                    self.state.supported.capabilities.insert(name, value);
                }
                self.emit(Event::CapLs { caps: names })?;

                let wanted = self.config.capabilities.clone();
                let supported = &self.state.supported.capabilities;
                let request =
                    self.cap
                        .compute_request(&wanted, self.config.sasl, |c| {
                            supported.contains_key(c)
                        });
                if request.is_empty() {
                    self.finish_negotiation()
                } else {
                    let joined = request.join(" ");
                    self.send("CAP", &["REQ", joined.as_str()]);
                    Ok(())
                }
            }
            "ACK" => {
                let caps = frame.arg(2).to_string();
                for cap in caps.split_whitespace() {
                    let name = cap.trim_start_matches(['-', '~', '=']);
                    if self.cap.pending().iter().any(|p| p == name) {
                        self.state.capabilities.insert(name.to_string());
                    }
                }
                if self.cap.ack(&caps) {
                    if self.state.capabilities.contains("sasl") {
                        self.send("AUTHENTICATE", &["PLAIN"]);
                        Ok(())
                    } else {
                        self.finish_negotiation()
                    }
                } else {
                    Ok(())
                }
            }
            "NAK" => {
                if self.cap.nak(frame.arg(2)) {
                    self.finish_negotiation()
                } else {
                    Ok(())
                }
            }
            _ => Ok(()),
        }
    }

    fn on_authenticate(&mut self, frame: &Frame) -> Result<()> {
        if frame.arg(0) != "+" {
            return Ok(());
        }
        let user = self.config.user_name.clone();
        let password = self.config.password.clone().unwrap_or_default();
        let payload = sasl::encode_plain(&user, &password);
        for chunk in sasl::chunk_payload(&payload) {
            self.send("AUTHENTICATE", &[chunk.as_str()]);
        }
        Ok(())
    }

    fn on_account(&mut self, frame: &Frame) -> Result<()> {
        let Some(nick) = frame.nick.clone() else {
            return Ok(());
        };
        let account = frame.arg(0).to_string();
        for chan in self.state.chans.values_mut() {
            if let Some(user) = chan.users.get_mut(&nick) {
                if account == "*" {
                    user.account = None;
                    user.is_registered = false;
                } else {
                    user.account = Some(account.clone());
                    user.is_registered = true;
                }
            }
        }
        Ok(())
    }

    fn on_endofwho(&mut self, frame: &Frame) -> Result<()> {
        let target = frame.arg(1).to_string();
        let rows = std::mem::take(&mut self.state.who.data);

        let Some(format) = self.state.who.queue.pop_front() else {
            debug!(%target, "WHO completion without a queued format");
            return self.emit(Event::Who {
                target,
                records: Vec::new(),
            });
        };

        let fields = who_fields(&format);
        let mut records: Vec<WhoRecord> = Vec::with_capacity(rows.len());
        for mut row in rows {
            // Without WHOX the classic reply folds hop count and realname
            // into one trailing argument; split them back apart.
            if !self.state.supported.whox && row.len() >= 7 {
                let combined = row.remove(6);
                let (hops, realname) = match combined.split_once(' ') {
                    Some((h, r)) => (h.to_string(), r.to_string()),
                    None => (combined, String::new()),
                };
                row.insert(6, hops);
                row.insert(7, realname);
            }
            if row.len() != fields.len() {
                debug!(%target, %format, "WHO row width does not match requested fields");
                records.clear();
                break;
            }
            records.push(
                fields
                    .iter()
                    .zip(row)
                    .map(|(field, value)| (field.to_string(), value))
                    .collect(),
            );
        }

        if self.state.chans.contains_key(&irc_lower(&target)) {
            self.state.apply_who_records(&target, &records);
        }
        self.emit(Event::Who {
            target: target.clone(),
            records,
        })?;
        if let Some(started) = self.state.sync_chans.remove(&irc_lower(&target)) {
            self.emit(Event::JoinSync {
                channel: target,
                elapsed_ms: started.elapsed().as_millis(),
            })?;
        }
        Ok(())
    }
}
