//! ISUPPORT (005) absorption.
//!
//! Each 005 argument is a `TOKEN` or `TOKEN=VALUE` advertising a server
//! feature. Recognized tokens update the session's [`Supported`] set (and,
//! for `PREFIX`, the membership-mode maps); unknown tokens are ignored.
//!
//! [`Supported`]: crate::state::Supported

use crate::state::SessionState;

/// Absorb one 005 token into session state.
pub fn absorb_token(state: &mut SessionState, token: &str) {
    let (key, value) = match token.split_once('=') {
        Some((k, v)) => (k, v),
        None => (token, ""),
    };

    match key {
        "CHANLIMIT" => {
            for (prefixes, limit) in pairs(value) {
                let Ok(limit) = limit.parse() else {
                    continue;
                };
                for prefix in prefixes.chars() {
                    state.supported.channel.limit.insert(prefix, limit);
                }
            }
        }
        "IDCHAN" => {
            for (prefixes, id_len) in pairs(value) {
                for prefix in prefixes.chars() {
                    state
                        .supported
                        .channel
                        .id_length
                        .insert(prefix, id_len.to_string());
                }
            }
        }
        "MAXLIST" => {
            for (modes, limit) in pairs(value) {
                let Ok(limit) = limit.parse() else {
                    continue;
                };
                for mode in modes.chars() {
                    state.supported.max_list.insert(mode, limit);
                }
            }
        }
        "TARGMAX" => {
            for (command, limit) in pairs(value) {
                let limit = limit.parse().unwrap_or(0);
                state.supported.max_targets.insert(command.to_string(), limit);
            }
        }
        "CHANMODES" => {
            let mut groups = value.splitn(4, ',');
            let modes = &mut state.supported.channel.modes;
            for target in [&mut modes.a, &mut modes.b, &mut modes.c, &mut modes.d] {
                if let Some(group) = groups.next() {
                    target.push_str(group);
                }
            }
        }
        "CHANTYPES" => {
            state.supported.channel.types = value.to_string();
        }
        "CHANNELLEN" => {
            if let Ok(len) = value.parse() {
                state.supported.channel.length = len;
            }
        }
        "NICKLEN" => {
            if let Ok(len) = value.parse() {
                state.supported.nick_length = len;
            }
        }
        "TOPICLEN" => {
            if let Ok(len) = value.parse() {
                state.supported.topic_length = len;
            }
        }
        "MODES" => {
            if let Ok(max) = value.parse() {
                state.supported.max_modes = max;
            }
        }
        "KICKLEN" => {
            state.supported.kick_length = value.to_string();
        }
        "PREFIX" => {
            if let Some((modes, prefixes)) = parse_prefix(value) {
                for (mode, prefix) in modes.chars().zip(prefixes.chars()) {
                    state.mode_for_prefix.insert(prefix, mode);
                    state.prefix_for_mode.insert(mode, prefix);
                    state.supported.channel.modes.b.push(mode);
                }
            }
        }
        "WHOX" => {
            state.supported.whox = true;
        }
        _ => {}
    }
}

/// Split a `a:1,bc:2` value into (`a`, `1`), (`bc`, `2`) pairs; a pair
/// without a colon gets an empty numeric part.
fn pairs(value: &str) -> impl Iterator<Item = (&str, &str)> {
    value.split(',').filter(|part| !part.is_empty()).map(|part| {
        part.split_once(':').unwrap_or((part, ""))
    })
}

/// Parse `(modes)prefixes`.
fn parse_prefix(value: &str) -> Option<(&str, &str)> {
    let inner = value.strip_prefix('(')?;
    let (modes, prefixes) = inner.split_once(')')?;
    if modes.is_empty() || prefixes.is_empty() {
        return None;
    }
    Some((modes, prefixes))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fresh() -> SessionState {
        SessionState::new("me", "&#")
    }

    #[test]
    fn test_prefix_builds_both_maps() {
        let mut state = fresh();
        absorb_token(&mut state, "PREFIX=(ov)@+");
        assert_eq!(state.mode_for_prefix[&'@'], 'o');
        assert_eq!(state.mode_for_prefix[&'+'], 'v');
        assert_eq!(state.prefix_for_mode[&'o'], '@');
        assert_eq!(state.prefix_for_mode[&'v'], '+');
        assert_eq!(state.supported.channel.modes.b, "ov");
    }

    #[test]
    fn test_chanmodes_appends_groups() {
        let mut state = fresh();
        absorb_token(&mut state, "CHANMODES=b,k,l,imnpst");
        let modes = &state.supported.channel.modes;
        assert_eq!(modes.a, "b");
        assert_eq!(modes.b, "k");
        assert_eq!(modes.c, "l");
        assert_eq!(modes.d, "imnpst");
    }

    #[test]
    fn test_numeric_tokens() {
        let mut state = fresh();
        absorb_token(&mut state, "NICKLEN=16");
        absorb_token(&mut state, "TOPICLEN=390");
        absorb_token(&mut state, "CHANNELLEN=50");
        absorb_token(&mut state, "MODES=6");
        assert_eq!(state.supported.nick_length, 16);
        assert_eq!(state.supported.topic_length, 390);
        assert_eq!(state.supported.channel.length, 50);
        assert_eq!(state.supported.max_modes, 6);
    }

    #[test]
    fn test_chantypes_replaces() {
        let mut state = fresh();
        absorb_token(&mut state, "CHANTYPES=#");
        assert_eq!(state.supported.channel.types, "#");
    }

    #[test]
    fn test_targmax_missing_limit_is_zero() {
        let mut state = fresh();
        absorb_token(&mut state, "TARGMAX=PRIVMSG:3,JOIN:");
        assert_eq!(state.supported.max_targets["PRIVMSG"], 3);
        assert_eq!(state.supported.max_targets["JOIN"], 0);
    }

    #[test]
    fn test_missing_limit_skipped_outside_targmax() {
        let mut state = fresh();
        absorb_token(&mut state, "CHANLIMIT=#:,&:25");
        absorb_token(&mut state, "MAXLIST=b:,e:30");
        assert!(!state.supported.channel.limit.contains_key(&'#'));
        assert_eq!(state.supported.channel.limit[&'&'], 25);
        assert!(!state.supported.max_list.contains_key(&'b'));
        assert_eq!(state.supported.max_list[&'e'], 30);
    }

    #[test]
    fn test_chanlimit_and_maxlist() {
        let mut state = fresh();
        absorb_token(&mut state, "CHANLIMIT=#&:25");
        absorb_token(&mut state, "MAXLIST=bq:60,e:30");
        assert_eq!(state.supported.channel.limit[&'#'], 25);
        assert_eq!(state.supported.channel.limit[&'&'], 25);
        assert_eq!(state.supported.max_list[&'b'], 60);
        assert_eq!(state.supported.max_list[&'q'], 60);
        assert_eq!(state.supported.max_list[&'e'], 30);
    }

    #[test]
    fn test_kicklen_kept_raw_and_whox_flag() {
        let mut state = fresh();
        absorb_token(&mut state, "KICKLEN=255");
        absorb_token(&mut state, "WHOX");
        assert_eq!(state.supported.kick_length, "255");
        assert!(state.supported.whox);
    }

    #[test]
    fn test_unknown_token_ignored() {
        let mut state = fresh();
        let before = state.supported.clone();
        absorb_token(&mut state, "SAFELIST");
        absorb_token(&mut state, "ELIST=CTU");
        assert_eq!(state.supported, before);
    }
}
