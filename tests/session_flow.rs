//! End-to-end protocol scenarios against the sans-IO session core.
//!
//! Each test plays server lines into a [`Session`] and checks the resulting
//! state, emitted events and queued responses, without any sockets.

use slirc_client::{Config, Event, Session};
use tokio::sync::mpsc::UnboundedReceiver;

fn session() -> (Session, UnboundedReceiver<Event>) {
    session_with(|_| {})
}

fn session_with(configure: impl FnOnce(&mut Config)) -> (Session, UnboundedReceiver<Event>) {
    let mut config = Config::new("irc.example.net", "nick");
    configure(&mut config);
    Session::new(config)
}

fn feed(session: &mut Session, lines: &[&str]) {
    for line in lines {
        session.feed_line(line).expect("event receiver alive");
    }
}

fn sent(session: &mut Session) -> Vec<String> {
    session
        .take_outbound()
        .into_iter()
        .map(|out| out.line)
        .collect()
}

fn drain(rx: &mut UnboundedReceiver<Event>) -> Vec<Event> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        if !matches!(event, Event::Raw(_)) {
            events.push(event);
        }
    }
    events
}

#[test]
fn welcome_sets_identity_and_line_budget() {
    let (mut session, mut rx) = session();
    feed(
        &mut session,
        &[":srv 001 nick :Welcome to IRC nick!u@h.example"],
    );

    assert_eq!(session.state().own_nick, "nick");
    assert_eq!(session.state().host_mask, "nick!u@h.example");
    assert_eq!(
        session.state().max_line_length,
        497 - "nick".len() - "nick!u@h.example".len()
    );
    assert!(drain(&mut rx)
        .iter()
        .any(|e| matches!(e, Event::Registered { nick } if nick == "nick")));
}

#[test]
fn isupport_absorbs_features() {
    let (mut session, _rx) = session();
    feed(
        &mut session,
        &[":srv 005 nick NICKLEN=16 CHANTYPES=# PREFIX=(ov)@+ :are supported by this server"],
    );

    let state = session.state();
    assert_eq!(state.supported.nick_length, 16);
    assert_eq!(state.supported.channel.types, "#");
    assert_eq!(state.mode_for_prefix[&'@'], 'o');
    assert_eq!(state.mode_for_prefix[&'+'], 'v');
    assert_eq!(state.prefix_for_mode[&'o'], '@');
    assert_eq!(state.prefix_for_mode[&'v'], '+');
}

#[test]
fn self_join_starts_channel_sync() {
    let (mut session, mut rx) = session();
    feed(&mut session, &[":srv 001 nick :Welcome nick!u@h"]);
    let _ = sent(&mut session);

    feed(&mut session, &[":nick!u@h JOIN #x"]);

    let chan = &session.state().chans["#x"];
    assert!(chan.users.is_empty());
    assert_eq!(sent(&mut session), vec!["MODE #x", "WHO #x"]);
    let events = drain(&mut rx);
    assert!(events
        .iter()
        .any(|e| matches!(e, Event::SelfJoin { channel } if channel == "#x")));
    assert!(events
        .iter()
        .any(|e| matches!(e, Event::Join { channel, nick } if channel == "#x" && nick == "nick")));
}

#[test]
fn self_join_uses_whox_when_supported() {
    let (mut session, _rx) = session();
    feed(
        &mut session,
        &[":srv 001 nick :Welcome nick!u@h", ":srv 005 nick WHOX :are supported"],
    );
    let _ = sent(&mut session);

    feed(&mut session, &[":nick!u@h JOIN #x"]);
    assert_eq!(sent(&mut session), vec!["MODE #x", "WHO #x %cuhnfa"]);
}

#[test]
fn who_reply_without_whox_populates_channel() {
    let (mut session, mut rx) = session();
    feed(
        &mut session,
        &[
            ":srv 001 self :Welcome self!u@h",
            ":srv 005 self PREFIX=(ov)@+ :are supported",
            ":self!u@h JOIN #x",
            ":srv 352 self #x u h s nick H@ :0 Real Name",
            ":srv 315 self #x :End of WHO list",
        ],
    );

    let chan = &session.state().chans["#x"];
    let user = &chan.users["nick"];
    assert_eq!(user.username.as_deref(), Some("u"));
    assert_eq!(user.host.as_deref(), Some("h"));
    assert!(!user.away);
    assert!(user.modes.contains(&'o'));

    let events = drain(&mut rx);
    let who = events
        .iter()
        .find_map(|e| match e {
            Event::Who { target, records } if target == "#x" => Some(records),
            _ => None,
        })
        .expect("who event");
    assert_eq!(who.len(), 1);
    assert_eq!(who[0]["nick"], "nick");
    assert_eq!(who[0]["hops"], "0");
    assert_eq!(who[0]["realname"], "Real Name");
    assert!(events
        .iter()
        .any(|e| matches!(e, Event::JoinSync { channel, .. } if channel == "#x")));
}

#[test]
fn who_completion_without_queue_yields_empty() {
    let (mut session, mut rx) = session();
    feed(
        &mut session,
        &[
            ":srv 352 nick #x u h s other H :0 real",
            ":srv 315 nick #x :End of WHO list",
        ],
    );
    let events = drain(&mut rx);
    assert!(events
        .iter()
        .any(|e| matches!(e, Event::Who { records, .. } if records.is_empty())));
}

#[test]
fn ping_gets_pong() {
    let (mut session, mut rx) = session();
    feed(&mut session, &["PING :abc"]);
    assert_eq!(sent(&mut session), vec!["PONG :abc"]);
    assert!(drain(&mut rx)
        .iter()
        .any(|e| matches!(e, Event::Ping { server } if server == "abc")));
}

#[test]
fn nick_rename_rekeys_all_channels() {
    let (mut session, mut rx) = session();
    feed(
        &mut session,
        &[
            ":srv 001 me :Welcome me!u@h",
            ":me!u@h JOIN #a",
            ":me!u@h JOIN #b",
            ":old!u@h JOIN #a",
            ":old!u@h JOIN #b",
        ],
    );
    drain(&mut rx);

    feed(&mut session, &[":old!u@h NICK :new"]);

    let events = drain(&mut rx);
    let nick_event = events
        .iter()
        .find_map(|e| match e {
            Event::Nick { old, new, channels } => Some((old, new, channels)),
            _ => None,
        })
        .expect("nick event");
    assert_eq!(nick_event.0, "old");
    assert_eq!(nick_event.1, "new");
    assert_eq!(nick_event.2, &["#a", "#b"]);

    for key in ["#a", "#b"] {
        let chan = &session.state().chans[key];
        assert!(chan.users.contains_key("new"));
        assert!(!chan.users.contains_key("old"));
    }
}

#[test]
fn own_nick_change_updates_line_budget() {
    let (mut session, mut rx) = session();
    feed(&mut session, &[":srv 001 me :Welcome me!u@h.example"]);
    let before = session.state().max_line_length;

    feed(&mut session, &[":me!u@h NICK :metoo"]);
    assert_eq!(session.state().own_nick, "metoo");
    assert_eq!(session.state().max_line_length, before - 3);
    assert!(drain(&mut rx)
        .iter()
        .any(|e| matches!(e, Event::SelfNick { new, .. } if new == "metoo")));
}

#[test]
fn mode_merge_on_user() {
    let (mut session, mut rx) = session();
    feed(
        &mut session,
        &[
            ":srv 001 me :Welcome me!u@h",
            ":srv 005 me PREFIX=(ov)@+ :are supported",
            ":me!u@h JOIN #c",
            ":alice!a@h JOIN #c",
            ":op!o@h MODE #c +o-o+v alice alice alice",
        ],
    );

    let alice = &session.state().chans["#c"].users["alice"];
    assert!(!alice.modes.contains(&'o'));
    assert!(alice.modes.contains(&'v'));

    let mode_events: Vec<_> = drain(&mut rx)
        .into_iter()
        .filter(|e| matches!(e, Event::Mode { .. }))
        .collect();
    assert_eq!(mode_events.len(), 3);
}

#[test]
fn channel_mode_with_argument() {
    let (mut session, mut rx) = session();
    feed(
        &mut session,
        &[
            ":srv 001 me :Welcome me!u@h",
            ":me!u@h JOIN #c",
            ":op!o@h MODE #c +k sekrit",
        ],
    );
    assert!(session.state().chans["#c"].mode.contains('k'));
    assert!(drain(&mut rx).iter().any(|e| matches!(
        e,
        Event::Mode { mode: 'k', set: true, arg: Some(arg), .. } if arg == "sekrit"
    )));

    feed(&mut session, &[":op!o@h MODE #c -k sekrit"]);
    assert!(!session.state().chans["#c"].mode.contains('k'));
}

#[test]
fn quit_changing_host_keeps_membership() {
    let (mut session, mut rx) = session();
    feed(
        &mut session,
        &[
            ":srv 001 me :Welcome me!u@h",
            ":me!u@h JOIN #a",
            ":bob!b@h JOIN #a",
        ],
    );
    drain(&mut rx);

    feed(&mut session, &[":bob!b@h QUIT :Changing host"]);
    assert!(session.state().chans["#a"].users.contains_key("bob"));
    let events = drain(&mut rx);
    assert!(events.iter().any(|e| matches!(
        e,
        Event::Quit { nick, removed: false, channels, .. } if nick == "bob" && channels == &["#a"]
    )));

    feed(&mut session, &[":bob!b@h QUIT :Leaving"]);
    assert!(!session.state().chans["#a"].users.contains_key("bob"));
    assert!(drain(&mut rx)
        .iter()
        .any(|e| matches!(e, Event::Quit { removed: true, .. })));
}

#[test]
fn kill_removes_from_all_channels() {
    let (mut session, mut rx) = session();
    feed(
        &mut session,
        &[
            ":srv 001 me :Welcome me!u@h",
            ":me!u@h JOIN #a",
            ":me!u@h JOIN #b",
            ":bob!b@h JOIN #a",
            ":bob!b@h JOIN #b",
        ],
    );
    drain(&mut rx);

    feed(&mut session, &["KILL bob :spam"]);
    assert!(!session.state().chans["#a"].users.contains_key("bob"));
    assert!(!session.state().chans["#b"].users.contains_key("bob"));
    assert!(drain(&mut rx).iter().any(|e| matches!(
        e,
        Event::Kill { nick, channels, .. } if nick == "bob" && channels == &["#a", "#b"]
    )));
}

#[test]
fn nick_in_use_escalates_suffix() {
    let (mut session, _rx) = session();
    session.start();
    let _ = sent(&mut session);

    feed(&mut session, &[":srv 433 * nick :Nickname is already in use"]);
    assert_eq!(sent(&mut session), vec!["NICK nick1"]);
    feed(&mut session, &[":srv 433 * nick1 :Nickname is already in use"]);
    assert_eq!(sent(&mut session), vec!["NICK nick2"]);
    feed(&mut session, &[":srv 433 * nick2 :Nickname is already in use"]);
    assert_eq!(sent(&mut session), vec!["NICK nick3"]);
}

#[test]
fn cap_sasl_flow() {
    let (mut session, mut rx) = session_with(|config| {
        config.capabilities = vec!["multi-prefix".to_string()];
        config.sasl = true;
        config.user_name = "u".to_string();
        config.password = Some("p".to_string());
    });
    session.start();
    let startup = sent(&mut session);
    assert!(startup.contains(&"CAP LS 302".to_string()));
    assert!(!startup.iter().any(|l| l.starts_with("PASS")));

    feed(&mut session, &[":srv CAP * LS :sasl multi-prefix"]);
    assert_eq!(sent(&mut session), vec!["CAP REQ :multi-prefix sasl"]);

    feed(&mut session, &[":srv CAP * ACK :multi-prefix sasl"]);
    assert_eq!(sent(&mut session), vec!["AUTHENTICATE PLAIN"]);
    assert!(session.state().capabilities.contains("multi-prefix"));
    assert!(session.state().capabilities.contains("sasl"));

    feed(&mut session, &["AUTHENTICATE +"]);
    assert_eq!(sent(&mut session), vec!["AUTHENTICATE dQB1AHA="]);

    feed(&mut session, &[":srv 903 nick :SASL authentication successful"]);
    assert_eq!(sent(&mut session), vec!["CAP END"]);

    let events = drain(&mut rx);
    let mut saw_sasl = false;
    let mut saw_cap_end = false;
    let mut saw_connected = false;
    for event in &events {
        match event {
            Event::SaslAuthenticated => saw_sasl = true,
            Event::CapEnd => {
                assert!(saw_sasl);
                saw_cap_end = true;
            }
            Event::Connected => {
                assert!(saw_cap_end);
                saw_connected = true;
            }
            _ => {}
        }
    }
    assert!(saw_connected);
}

#[test]
fn cap_nak_ends_negotiation() {
    let (mut session, mut rx) = session_with(|config| {
        config.capabilities = vec!["batch".to_string()];
    });
    session.start();
    let _ = sent(&mut session);

    feed(&mut session, &[":srv CAP * LS :batch"]);
    assert_eq!(sent(&mut session), vec!["CAP REQ :batch"]);
    feed(&mut session, &[":srv CAP * NAK :batch"]);
    assert_eq!(sent(&mut session), vec!["CAP END"]);
    assert!(drain(&mut rx).iter().any(|e| matches!(e, Event::CapEnd)));
}

#[test]
fn cap_multiline_ls_buffers() {
    let (mut session, _rx) = session_with(|config| {
        config.capabilities = vec!["away-notify".to_string()];
    });
    session.start();
    let _ = sent(&mut session);

    feed(&mut session, &[":srv CAP * LS * :sasl batch"]);
    assert!(sent(&mut session).is_empty());
    feed(&mut session, &[":srv CAP * LS :away-notify"]);
    assert_eq!(sent(&mut session), vec!["CAP REQ :away-notify"]);
}

#[test]
fn motd_accumulates_and_triggers_autojoin() {
    let (mut session, mut rx) = session_with(|config| {
        config.channels = vec!["#alpha".to_string(), "#beta key".to_string()];
    });
    feed(
        &mut session,
        &[
            ":srv 375 nick :- srv Message of the day -",
            ":srv 372 nick :- hello",
            ":srv 376 nick :End of /MOTD command.",
        ],
    );

    let motd = drain(&mut rx)
        .into_iter()
        .find_map(|e| match e {
            Event::Motd { motd } => Some(motd),
            _ => None,
        })
        .expect("motd event");
    assert_eq!(
        motd,
        "- srv Message of the day -\n- hello\nEnd of /MOTD command.\n"
    );
    assert_eq!(sent(&mut session), vec!["JOIN #alpha", "JOIN #beta key"]);
}

#[test]
fn privmsg_routes_to_message_and_pm() {
    let (mut session, mut rx) = session();
    feed(
        &mut session,
        &[
            ":srv 001 me :Welcome me!u@h",
            ":alice!a@h PRIVMSG #chan :hello all",
            ":alice!a@h PRIVMSG ME :psst",
        ],
    );
    let events = drain(&mut rx);
    assert!(events.iter().any(|e| matches!(
        e,
        Event::Message { target, to_self: false, .. } if target == "#chan"
    )));
    // Target comparison is IRC-case-insensitive.
    assert!(events.iter().any(|e| matches!(
        e,
        Event::Message { text, to_self: true, .. } if text == "psst"
    )));
}

#[test]
fn ctcp_action_and_version() {
    let (mut session, mut rx) = session();
    feed(
        &mut session,
        &[
            ":alice!a@h PRIVMSG #chan :\u{1}ACTION waves\u{1}",
            ":alice!a@h PRIVMSG me :\u{1}VERSION\u{1}",
            ":alice!a@h NOTICE me :\u{1}VERSION reply 1.0\u{1}",
        ],
    );
    let events = drain(&mut rx);
    assert!(events
        .iter()
        .any(|e| matches!(e, Event::Action { text, .. } if text == "waves")));
    assert!(events.iter().any(|e| matches!(
        e,
        Event::Ctcp { kind, notice: false, .. } if kind == "VERSION"
    )));
    assert!(events.iter().any(|e| matches!(
        e,
        Event::Ctcp { kind, notice: true, text, .. } if kind == "VERSION" && text == "reply 1.0"
    )));
}

#[test]
fn whois_accumulates_until_end() {
    let (mut session, mut rx) = session();
    feed(
        &mut session,
        &[
            ":srv 311 me alice au ahost * :Alice A",
            ":srv 312 me alice srv.example :Example server",
            ":srv 319 me alice :#a @#b",
            ":srv 301 me alice :gone fishing",
            ":srv 318 me alice :End of /WHOIS list",
        ],
    );

    let info = drain(&mut rx)
        .into_iter()
        .find_map(|e| match e {
            Event::Whois { info } => Some(info),
            _ => None,
        })
        .expect("whois event");
    assert_eq!(info.nick, "alice");
    assert_eq!(info.user.as_deref(), Some("au"));
    assert_eq!(info.host.as_deref(), Some("ahost"));
    assert_eq!(info.realname.as_deref(), Some("Alice A"));
    assert_eq!(info.server.as_deref(), Some("srv.example"));
    assert_eq!(info.channels, vec!["#a", "@#b"]);
    assert_eq!(info.away.as_deref(), Some("gone fishing"));
    assert!(session.state().whois_data.is_empty());
}

#[test]
fn away_without_whois_is_ignored() {
    let (mut session, _rx) = session();
    feed(&mut session, &[":srv 301 me alice :gone"]);
    assert!(session.state().whois_data.is_empty());
}

#[test]
fn list_collects_items() {
    let (mut session, mut rx) = session();
    feed(
        &mut session,
        &[
            ":srv 321 me Channel :Users Name",
            ":srv 322 me #one 3 :first",
            ":srv 322 me #two 7 :second",
            ":srv 323 me :End of /LIST",
        ],
    );
    let events = drain(&mut rx);
    assert!(events.iter().any(|e| matches!(e, Event::ChannelListStart)));
    let items = events
        .iter()
        .find_map(|e| match e {
            Event::ChannelList { items } => Some(items),
            _ => None,
        })
        .expect("list event");
    assert_eq!(items.len(), 2);
    assert_eq!(items[0].name, "#one");
    assert_eq!(items[1].topic, "second");
}

#[test]
fn kick_self_drops_channel_and_can_rejoin() {
    let (mut session, mut rx) = session_with(|config| {
        config.auto_rejoin = true;
    });
    feed(
        &mut session,
        &[":srv 001 me :Welcome me!u@h", ":me!u@h JOIN #c"],
    );
    let _ = sent(&mut session);
    drain(&mut rx);

    feed(&mut session, &[":op!o@h KICK #c me :begone"]);
    assert!(!session.state().chans.contains_key("#c"));
    assert_eq!(sent(&mut session), vec!["JOIN #c"]);
    let events = drain(&mut rx);
    assert!(events
        .iter()
        .any(|e| matches!(e, Event::SelfKick { channel, .. } if channel == "#c")));
}

#[test]
fn topic_learned_from_numeric_and_change() {
    let (mut session, mut rx) = session();
    feed(
        &mut session,
        &[
            ":srv 001 me :Welcome me!u@h",
            ":me!u@h JOIN #c",
            ":srv 332 me #c :old topic",
            ":srv 333 me #c alice!a@h :1700000000",
            ":bob!b@h TOPIC #c :new topic",
        ],
    );
    let chan = &session.state().chans["#c"];
    assert_eq!(chan.topic.as_deref(), Some("new topic"));
    assert_eq!(chan.topic_by.as_deref(), Some("bob"));
    let topics: Vec<_> = drain(&mut rx)
        .into_iter()
        .filter(|e| matches!(e, Event::Topic { .. }))
        .collect();
    assert_eq!(topics.len(), 2);
}

#[test]
fn account_updates_membership() {
    let (mut session, _rx) = session();
    feed(
        &mut session,
        &[
            ":srv 001 me :Welcome me!u@h",
            ":me!u@h JOIN #c",
            ":alice!a@h JOIN #c",
            ":alice!a@h ACCOUNT alice_acct",
        ],
    );
    let alice = &session.state().chans["#c"].users["alice"];
    assert_eq!(alice.account.as_deref(), Some("alice_acct"));
    assert!(alice.is_registered);

    feed(&mut session, &[":alice!a@h ACCOUNT *"]);
    let alice = &session.state().chans["#c"].users["alice"];
    assert!(alice.account.is_none());
    assert!(!alice.is_registered);
}

#[test]
fn extended_join_carries_account() {
    let (mut session, _rx) = session_with(|config| {
        config.capabilities = vec!["extended-join".to_string()];
    });
    session.start();
    let _ = sent(&mut session);
    feed(
        &mut session,
        &[
            ":srv CAP * LS :extended-join",
            ":srv CAP * ACK :extended-join",
            ":srv 001 me :Welcome me!u@h",
            ":me!u@h JOIN #c",
            ":alice!a@h JOIN #c acct :Alice",
            ":bob!b@h JOIN #c * :Bob",
        ],
    );
    let chan = &session.state().chans["#c"];
    assert_eq!(chan.users["alice"].account.as_deref(), Some("acct"));
    assert!(chan.users["alice"].is_registered);
    assert!(chan.users["bob"].account.is_none());
}

#[test]
fn error_reply_surfaces_as_event() {
    let (mut session, mut rx) = session();
    feed(&mut session, &[":srv 404 me #c :Cannot send to channel"]);
    assert!(drain(&mut rx).iter().any(|e| matches!(
        e,
        Event::ErrorReply { frame } if frame.command == "err_cannotsendtochan"
    )));
}

#[test]
fn say_splits_and_echoes() {
    let (mut session, mut rx) = session();
    // Keep the budget tiny to force splitting.
    let welcome = format!(":srv 001 me :Welcome me!{}@h", "u".repeat(472));
    feed(&mut session, &[welcome.as_str()]);
    assert_eq!(session.state().max_line_length, 18);

    session.say("#c", "hello world of irc again").unwrap();
    let lines = sent(&mut session);
    assert_eq!(
        lines,
        vec!["PRIVMSG #c :hello world of", "PRIVMSG #c :irc again"]
    );
    let echoes: Vec<_> = drain(&mut rx)
        .into_iter()
        .filter(|e| matches!(e, Event::SelfMessage { .. }))
        .collect();
    assert_eq!(echoes.len(), 2);
}

#[test]
fn who_format_validation() {
    let (mut session, _rx) = session();
    // Without WHOX a %-format is dropped.
    session.who_query("#c", Some("%na"));
    assert_eq!(sent(&mut session), vec!["WHO #c"]);

    feed(&mut session, &[":srv 005 me WHOX :are supported"]);
    // With WHOX the format is filtered and canonically ordered.
    session.who_query("#c", Some("%ran"));
    assert_eq!(sent(&mut session), vec!["WHO #c %nar"]);

    session.who_query("*", Some("o"));
    assert_eq!(sent(&mut session), vec!["WHO * o"]);
}

#[test]
fn set_chan_mode_batches_by_limit() {
    let (mut session, _rx) = session();
    feed(
        &mut session,
        &[
            ":srv 001 me :Welcome me!u@h",
            ":srv 005 me PREFIX=(ov)@+ MODES=2 :are supported",
            ":me!u@h JOIN #c",
        ],
    );
    let _ = sent(&mut session);
    feed(
        &mut session,
        &[
            ":srv 352 me #c u h s me H@ :0 r",
            ":srv 352 me #c u h s a H :0 r",
            ":srv 352 me #c u h s b H :0 r",
            ":srv 352 me #c u h s c H+ :0 r",
            ":srv 315 me #c :End",
        ],
    );
    let _ = sent(&mut session);

    let nicks = vec!["a".to_string(), "b".to_string(), "c".to_string()];
    session.set_chan_mode("#c", "+v", &nicks);
    // "c" already has +v, so only a and b are affected; MODES=2 fits both.
    assert_eq!(sent(&mut session), vec!["MODE #c +vv a b"]);

    session.set_chan_mode("#c", "-o", &["a".to_string(), "b".to_string()]);
    // Neither holds op; nothing to send.
    assert!(sent(&mut session).is_empty());
}

#[test]
fn set_chan_mode_requires_op() {
    let (mut session, _rx) = session();
    feed(
        &mut session,
        &[
            ":srv 001 me :Welcome me!u@h",
            ":srv 005 me PREFIX=(ov)@+ :are supported",
            ":me!u@h JOIN #c",
            ":srv 352 me #c u h s me H :0 r",
            ":srv 352 me #c u h s a H :0 r",
            ":srv 315 me #c :End",
        ],
    );
    let _ = sent(&mut session);

    session.set_chan_mode("#c", "+o", &["a".to_string()]);
    assert!(sent(&mut session).is_empty());
}

#[test]
fn part_removes_channel_from_autojoin_list() {
    let (mut session, _rx) = session_with(|config| {
        config.channels = vec!["#keep".to_string(), "#gone key".to_string()];
    });
    session.part_channel("#gone", Some("bye"));
    assert_eq!(session.config().channels, vec!["#keep"]);
    assert_eq!(sent(&mut session), vec!["PART #gone bye"]);
}

#[test]
fn quit_uses_bypass_and_suppresses_writes() {
    let (mut session, _rx) = session();
    session.quit(Some("goodbye"));
    assert!(session.requested_disconnect());
    let out = session.take_outbound();
    assert_eq!(out.len(), 1);
    assert!(out[0].bypass);
    assert_eq!(out[0].line, "QUIT goodbye");
}
