// channel_cmds.rs - channel commands
//
// minimal-irc-server - minimal IRC server
// Copyright (C) 2025  Leon Zipp
//
// This library is free software; you can redistribute it and/or
// modify it under the terms of the GNU Lesser General Public
// License as published by the Free Software Foundation; either
// version 2.1 of the License, or (at your option) any later version.
//
// This library is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the GNU
// Lesser General Public License for more details.
//
// You should have received a copy of the GNU Lesser General Public
// License along with this library; if not, write to the Free Software
// Foundation, Inc., 51 Franklin Street, Fifth Floor, Boston, MA  02110-1301  USA

use super::*;
use std::error::Error;
use std::ops::DerefMut;

impl super::MainState {
    pub(super) async fn process_join<'a>(
        &self,
        conn_state: &mut ConnState,
        channels: Vec<&'a str>,
        keys_opt: Option<Vec<&'a str>>,
    ) -> Result<(), Box<dyn Error>> {
        let conn_id = conn_state.conn_id.unwrap();
        let mut statem = self.state.write().await;
        let state = statem.deref_mut();

        for (i, chname_str) in channels.iter().enumerate() {
            // an empty key token counts as no key at all
            let key = keys_opt
                .as_ref()
                .and_then(|keys| keys.get(i).copied())
                .filter(|k| !k.is_empty());
            let client = conn_state.user_state.client_name();

            if validate_channel(chname_str).is_err() {
                self.feed_msg(
                    &mut conn_state.stream,
                    ErrBadChanMask476 {
                        client,
                        channel: chname_str,
                    },
                )
                .await?;
                continue;
            }

            let joined = if let Some(channel) = state.channels.get_mut(*chname_str) {
                if channel
                    .client_limit
                    .map_or(false, |limit| channel.members.len() >= limit)
                {
                    self.feed_msg(
                        &mut conn_state.stream,
                        ErrChannelIsFull471 {
                            client,
                            channel: chname_str,
                        },
                    )
                    .await?;
                    false
                } else if channel.invite_only && !channel.invited.contains(&conn_id) {
                    self.feed_msg(
                        &mut conn_state.stream,
                        ErrInviteOnlyChan473 {
                            client,
                            channel: chname_str,
                        },
                    )
                    .await?;
                    false
                } else if channel.key.is_some() && channel.key.as_deref() != key {
                    self.feed_msg(
                        &mut conn_state.stream,
                        ErrBadChannelKey475 {
                            client,
                            channel: chname_str,
                        },
                    )
                    .await?;
                    false
                } else if channel.is_member(conn_id) {
                    self.feed_msg(
                        &mut conn_state.stream,
                        ErrUserOnChannel443 {
                            client,
                            nick: conn_state.user_state.nick.as_deref().unwrap_or(client),
                            channel: chname_str,
                        },
                    )
                    .await?;
                    false
                } else {
                    channel.add_member(conn_id);
                    true
                }
            } else {
                // new channel, a key supplied at creation becomes the channel key
                state.channels.insert(
                    chname_str.to_string(),
                    Channel::new_on_client_join(conn_id, key.map(|k| k.to_string())),
                );
                true
            };

            if joined {
                if let Some(joining) = state.clients.get_mut(conn_id) {
                    joining.channels.insert(chname_str.to_string());
                }
                let join_msg = format!("JOIN {}", chname_str);
                let channel = state.channels.get(*chname_str).unwrap();
                for &member in &channel.members {
                    if member != conn_id {
                        if let Some(target) = state.clients.get(member) {
                            target
                                .send_msg_display(&conn_state.user_state.source, join_msg.as_str());
                        }
                    }
                }
                self.feed_msg_source(
                    &mut conn_state.stream,
                    &conn_state.user_state.source,
                    join_msg.as_str(),
                )
                .await?;
                if let Some(ref topic) = channel.topic {
                    self.feed_msg(
                        &mut conn_state.stream,
                        RplTopic332 {
                            client,
                            channel: chname_str,
                            topic: &topic.topic,
                        },
                    )
                    .await?;
                    self.feed_msg(
                        &mut conn_state.stream,
                        RplTopicWhoTime333 {
                            client,
                            channel: chname_str,
                            nick: &topic.nick,
                            setat: topic.set_time,
                        },
                    )
                    .await?;
                } else {
                    self.feed_msg(
                        &mut conn_state.stream,
                        RplNoTopic331 {
                            client,
                            channel: chname_str,
                        },
                    )
                    .await?;
                }
                info!(
                    "User {} joined channel {}",
                    conn_state.user_state.source, chname_str
                );
            }
        }
        Ok(())
    }

    pub(super) async fn process_topic<'a>(
        &self,
        conn_state: &mut ConnState,
        channel: &'a str,
        topic_opt: Option<&'a str>,
    ) -> Result<(), Box<dyn Error>> {
        let conn_id = conn_state.conn_id.unwrap();
        let client = conn_state.user_state.client_name();

        if let Some(topic) = topic_opt {
            let mut statem = self.state.write().await;
            let state = statem.deref_mut();

            let do_change_topic = if let Some(chanobj) = state.channels.get(channel) {
                if chanobj.is_member(conn_id) {
                    if !chanobj.protected_topic || chanobj.is_operator(conn_id) {
                        true
                    } else {
                        self.feed_msg(
                            &mut conn_state.stream,
                            ErrChanOpPrivsNeeded482 { client, channel },
                        )
                        .await?;
                        false
                    }
                } else {
                    self.feed_msg(&mut conn_state.stream, ErrNotOnChannel442 { client, channel })
                        .await?;
                    false
                }
            } else {
                self.feed_msg(
                    &mut conn_state.stream,
                    ErrNoSuchChannel403 { client, channel },
                )
                .await?;
                false
            };

            if do_change_topic {
                let nick = conn_state.user_state.nick.clone().unwrap_or_default();
                let cleaned = sanitize_topic(topic);
                {
                    let chanobj = state.channels.get_mut(channel).unwrap();
                    if cleaned.is_empty() {
                        chanobj.topic = None;
                    } else {
                        chanobj.topic = Some(ChannelTopic::new_with_nick(cleaned.clone(), nick));
                    }
                }
                let topic_msg = format!("TOPIC {} :{}", channel, cleaned);
                let chanobj = state.channels.get(channel).unwrap();
                for &member in &chanobj.members {
                    if member != conn_id {
                        if let Some(target) = state.clients.get(member) {
                            target.send_msg_display(
                                &conn_state.user_state.source,
                                topic_msg.as_str(),
                            );
                        }
                    }
                }
                self.feed_msg_source(
                    &mut conn_state.stream,
                    &conn_state.user_state.source,
                    topic_msg.as_str(),
                )
                .await?;
            }
        } else {
            // read
            let state = self.state.read().await;
            if let Some(chanobj) = state.channels.get(channel) {
                if chanobj.is_member(conn_id) {
                    if let Some(ref topic) = chanobj.topic {
                        self.feed_msg(
                            &mut conn_state.stream,
                            RplTopic332 {
                                client,
                                channel,
                                topic: &topic.topic,
                            },
                        )
                        .await?;
                        self.feed_msg(
                            &mut conn_state.stream,
                            RplTopicWhoTime333 {
                                client,
                                channel,
                                nick: &topic.nick,
                                setat: topic.set_time,
                            },
                        )
                        .await?;
                    } else {
                        self.feed_msg(&mut conn_state.stream, RplNoTopic331 { client, channel })
                            .await?;
                    }
                } else {
                    self.feed_msg(&mut conn_state.stream, ErrNotOnChannel442 { client, channel })
                        .await?;
                }
            } else {
                self.feed_msg(
                    &mut conn_state.stream,
                    ErrNoSuchChannel403 { client, channel },
                )
                .await?;
            }
        }
        Ok(())
    }

    pub(super) async fn process_invite<'a>(
        &self,
        conn_state: &mut ConnState,
        nickname: &'a str,
        channel: &'a str,
    ) -> Result<(), Box<dyn Error>> {
        let conn_id = conn_state.conn_id.unwrap();
        let mut statem = self.state.write().await;
        let state = statem.deref_mut();
        let client = conn_state.user_state.client_name();

        let do_invite = if let Some(chanobj) = state.channels.get(channel) {
            // only operators may invite, which implies membership
            if !chanobj.is_operator(conn_id) {
                self.feed_msg(
                    &mut conn_state.stream,
                    ErrChanOpPrivsNeeded482 { client, channel },
                )
                .await?;
                false
            } else {
                true
            }
        } else {
            self.feed_msg(
                &mut conn_state.stream,
                ErrNoSuchChannel403 { client, channel },
            )
            .await?;
            false
        };

        if do_invite {
            if let Some(invited_id) = state.clients.find_by_nick(nickname) {
                if state
                    .channels
                    .get(channel)
                    .map_or(false, |c| c.is_member(invited_id))
                {
                    self.feed_msg(
                        &mut conn_state.stream,
                        ErrUserOnChannel443 {
                            client,
                            nick: nickname,
                            channel,
                        },
                    )
                    .await?;
                } else {
                    state.channels.get_mut(channel).unwrap().add_invite(invited_id);
                    self.feed_msg(
                        &mut conn_state.stream,
                        RplInviting341 {
                            client,
                            nick: nickname,
                            channel,
                        },
                    )
                    .await?;
                    if let Some(target) = state.clients.get(invited_id) {
                        target.send_msg_display(
                            &conn_state.user_state.source,
                            format!("INVITE {} :{}", nickname, channel),
                        );
                    }
                    info!(
                        "User {} invited {} to {}",
                        conn_state.user_state.source, nickname, channel
                    );
                }
            } else {
                self.feed_msg(
                    &mut conn_state.stream,
                    ErrNoSuchNick401 {
                        client,
                        nick: nickname,
                    },
                )
                .await?;
            }
        }
        Ok(())
    }

    pub(super) async fn process_kick<'a>(
        &self,
        conn_state: &mut ConnState,
        channel: &'a str,
        user: &'a str,
        comment: Option<&'a str>,
    ) -> Result<(), Box<dyn Error>> {
        let conn_id = conn_state.conn_id.unwrap();
        let mut statem = self.state.write().await;
        let state = statem.deref_mut();
        let client = conn_state.user_state.client_name();

        if let Some(chanobj) = state.channels.get(channel) {
            // operator status implies membership
            if !chanobj.is_operator(conn_id) {
                self.feed_msg(
                    &mut conn_state.stream,
                    ErrChanOpPrivsNeeded482 { client, channel },
                )
                .await?;
            } else if let Some(kicked_id) = state
                .clients
                .find_by_nick(user)
                .filter(|id| chanobj.is_member(*id))
            {
                let kick_msg = format!("KICK {} {} :{}", channel, user, comment.unwrap_or("Kicked"));
                for &member in &chanobj.members {
                    if member != conn_id {
                        if let Some(target) = state.clients.get(member) {
                            target
                                .send_msg_display(&conn_state.user_state.source, kick_msg.as_str());
                        }
                    }
                }
                self.feed_msg_source(
                    &mut conn_state.stream,
                    &conn_state.user_state.source,
                    kick_msg.as_str(),
                )
                .await?;
                state.remove_client_from_channel(channel, kicked_id);
                info!(
                    "User {} kicked {} from {}",
                    conn_state.user_state.source, user, channel
                );
            } else {
                self.feed_msg(
                    &mut conn_state.stream,
                    ErrUserNotInChannel441 {
                        client,
                        nick: user,
                        channel,
                    },
                )
                .await?;
            }
        } else {
            self.feed_msg(
                &mut conn_state.stream,
                ErrNoSuchChannel403 { client, channel },
            )
            .await?;
        }
        Ok(())
    }

    pub(super) async fn process_mode<'a>(
        &self,
        conn_state: &mut ConnState,
        channel: &'a str,
        modestring: &'a str,
        arg: Option<&'a str>,
    ) -> Result<(), Box<dyn Error>> {
        let conn_id = conn_state.conn_id.unwrap();
        let mut statem = self.state.write().await;
        let state = statem.deref_mut();
        let client = conn_state.user_state.client_name();

        if state.channels.get(channel).is_none() {
            self.feed_msg(
                &mut conn_state.stream,
                ErrNoSuchChannel403 { client, channel },
            )
            .await?;
            return Ok(());
        }
        if !state.channels.get(channel).unwrap().is_operator(conn_id) {
            self.feed_msg(
                &mut conn_state.stream,
                ErrChanOpPrivsNeeded482 { client, channel },
            )
            .await?;
            return Ok(());
        }

        let plus = modestring.starts_with('+');
        let modechar = modestring.as_bytes()[1] as char;
        let mut mode_arg = None;
        match modechar {
            'i' => {
                state.channels.get_mut(channel).unwrap().invite_only = plus;
            }
            't' => {
                state.channels.get_mut(channel).unwrap().protected_topic = plus;
            }
            'k' => {
                if plus {
                    if let Some(key) = arg {
                        state.channels.get_mut(channel).unwrap().key = Some(key.to_string());
                        mode_arg = Some(key.to_string());
                    } else {
                        self.feed_msg(
                            &mut conn_state.stream,
                            ErrNeedMoreParams461 {
                                client,
                                command: "MODE",
                            },
                        )
                        .await?;
                        return Ok(());
                    }
                } else {
                    state.channels.get_mut(channel).unwrap().key = None;
                }
            }
            'l' => {
                if plus {
                    if let Some(limit) = arg.and_then(|a| a.parse::<usize>().ok()) {
                        state.channels.get_mut(channel).unwrap().client_limit = Some(limit);
                        mode_arg = Some(limit.to_string());
                    } else {
                        self.feed_msg(
                            &mut conn_state.stream,
                            ErrNeedMoreParams461 {
                                client,
                                command: "MODE",
                            },
                        )
                        .await?;
                        return Ok(());
                    }
                } else {
                    state.channels.get_mut(channel).unwrap().client_limit = None;
                }
            }
            'o' => {
                let nick = if let Some(nick) = arg {
                    nick
                } else {
                    self.feed_msg(
                        &mut conn_state.stream,
                        ErrNeedMoreParams461 {
                            client,
                            command: "MODE",
                        },
                    )
                    .await?;
                    return Ok(());
                };
                if let Some(target_id) = state.clients.find_by_nick(nick) {
                    let chanobj = state.channels.get_mut(channel).unwrap();
                    if !chanobj.is_member(target_id) {
                        self.feed_msg(
                            &mut conn_state.stream,
                            ErrUserNotInChannel441 {
                                client,
                                nick,
                                channel,
                            },
                        )
                        .await?;
                        return Ok(());
                    }
                    if plus {
                        chanobj.add_operator(target_id);
                    } else {
                        chanobj.remove_operator(target_id);
                    }
                    mode_arg = Some(nick.to_string());
                } else {
                    self.feed_msg(&mut conn_state.stream, ErrNoSuchNick401 { client, nick })
                        .await?;
                    return Ok(());
                }
            }
            c => {
                self.feed_msg(
                    &mut conn_state.stream,
                    ErrUnknownMode472 {
                        client,
                        modechar: c,
                        channel,
                    },
                )
                .await?;
                return Ok(());
            }
        }

        // mode changes are announced with the plain nick as prefix
        let nick = conn_state.user_state.nick.clone().unwrap_or_default();
        let mode_msg = if let Some(ref a) = mode_arg {
            format!("MODE {} {} {}", channel, modestring, a)
        } else {
            format!("MODE {} {}", channel, modestring)
        };
        let chanobj = state.channels.get(channel).unwrap();
        for &member in &chanobj.members {
            if member != conn_id {
                if let Some(target) = state.clients.get(member) {
                    target.send_msg_display(&nick, mode_msg.as_str());
                }
            }
        }
        self.feed_msg_source(&mut conn_state.stream, &nick, mode_msg.as_str())
            .await?;
        info!("Mode {} set on {} by {}", modestring, channel, nick);
        Ok(())
    }
}
