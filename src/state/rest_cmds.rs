// rest_cmds.rs - messaging and ping commands
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

impl super::MainState {
    pub(super) async fn process_privmsg<'a>(
        &self,
        conn_state: &mut ConnState,
        target: &'a str,
        text: String,
    ) -> Result<(), Box<dyn Error>> {
        let conn_id = conn_state.conn_id.unwrap();
        let state = self.state.read().await;
        let client = conn_state.user_state.client_name();

        // a bare word is tried as a channel name first
        let chan_name = if target.starts_with('#') || target.starts_with('&') {
            Some(target.to_string())
        } else {
            let prefixed = format!("#{}", target);
            if state.channels.contains_key(&prefixed) {
                Some(prefixed)
            } else {
                None
            }
        };

        if let Some(chan_name) = chan_name {
            if let Some(chanobj) = state.channels.get(&chan_name) {
                if chanobj.is_member(conn_id) {
                    let msg_str = format!("PRIVMSG {} :{}", chan_name, text);
                    for &member in &chanobj.members {
                        if member != conn_id {
                            if let Some(member_client) = state.clients.get(member) {
                                member_client.send_msg_display(
                                    &conn_state.user_state.source,
                                    msg_str.as_str(),
                                );
                            }
                        }
                    }
                } else {
                    self.feed_msg(
                        &mut conn_state.stream,
                        ErrNotOnChannel442 {
                            client,
                            channel: chan_name.as_str(),
                        },
                    )
                    .await?;
                }
            } else {
                self.feed_msg(
                    &mut conn_state.stream,
                    ErrNoSuchChannel403 {
                        client,
                        channel: target,
                    },
                )
                .await?;
            }
        } else if let Some(target_id) = state.clients.find_by_nick(target) {
            if let Some(target_client) = state.clients.get(target_id) {
                target_client.send_msg_display(
                    &conn_state.user_state.source,
                    format!("PRIVMSG {} :{}", target, text),
                );
            }
        } else {
            self.feed_msg(
                &mut conn_state.stream,
                ErrNoSuchNick401 {
                    client,
                    nick: target,
                },
            )
            .await?;
        }
        Ok(())
    }

    pub(super) async fn process_ping<'a>(
        &self,
        conn_state: &mut ConnState,
        token: Option<&'a str>,
    ) -> Result<(), Box<dyn Error>> {
        if let Some(token) = token {
            self.feed_msg(&mut conn_state.stream, format!("PONG {}", token))
                .await?;
        } else {
            let client = conn_state.user_state.client_name();
            self.feed_msg(&mut conn_state.stream, ErrNoOrigin409 { client })
                .await?;
        }
        Ok(())
    }
}
