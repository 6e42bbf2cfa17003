// conn_cmds.rs - connection commands
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
    pub(super) async fn process_pass<'a>(
        &self,
        conn_state: &mut ConnState,
        password: &'a str,
    ) -> Result<(), Box<dyn Error>> {
        if password == self.config.password {
            conn_state.user_state.authenticated = true;
        } else {
            info!(
                "Authentication failed for {}",
                conn_state.user_state.source
            );
            let client = conn_state.user_state.client_name();
            self.feed_msg(&mut conn_state.stream, ErrPasswdMismatch464 { client })
                .await?;
            // wrong password closes the connection
            conn_state.quit = true;
        }
        Ok(())
    }

    pub(super) async fn process_nick<'a>(
        &self,
        conn_state: &mut ConnState,
        nick: &'a str,
    ) -> Result<(), Box<dyn Error>> {
        let conn_id = conn_state.conn_id.unwrap();
        {
            let mut statem = self.state.write().await;
            let state = statem.deref_mut();
            // the client's own current nick counts as taken too
            if state.clients.contains_nick(nick) {
                let client = conn_state.user_state.client_name();
                self.feed_msg(&mut conn_state.stream, ErrNicknameInUse433 { client, nick })
                    .await?;
            } else {
                let old_source = conn_state.user_state.source.clone();
                conn_state.user_state.set_nick(nick.to_string());
                if let Some(client) = state.clients.get_mut(conn_id) {
                    client.update_user_state(&conn_state.user_state);
                }
                // announced to shared channels only, the sender gets no echo
                if conn_state.user_state.registered {
                    for member in state.shared_channel_members(conn_id) {
                        if let Some(target) = state.clients.get(member) {
                            target.send_msg_display(&old_source, format!("NICK :{}", nick));
                        }
                    }
                }
            }
        }
        if !conn_state.user_state.registered {
            self.try_complete_registration(conn_state).await?;
        }
        Ok(())
    }

    pub(super) async fn process_user<'a>(
        &self,
        conn_state: &mut ConnState,
        username: &'a str,
        _: &'a str,
        _: &'a str,
        realname: &'a str,
    ) -> Result<(), Box<dyn Error>> {
        conn_state.user_state.set_name(username.to_string());
        conn_state.user_state.realname = Some(realname.to_string());
        {
            let conn_id = conn_state.conn_id.unwrap();
            let mut state = self.state.write().await;
            if let Some(client) = state.clients.get_mut(conn_id) {
                client.update_user_state(&conn_state.user_state);
            }
        }
        if !conn_state.user_state.registered {
            self.try_complete_registration(conn_state).await?;
        }
        Ok(())
    }

    // registration completes once the client is authenticated and both
    // nick and username are known.
    async fn try_complete_registration(
        &self,
        conn_state: &mut ConnState,
    ) -> Result<(), Box<dyn Error>> {
        if conn_state.user_state.authenticated
            && conn_state.user_state.nick.is_some()
            && conn_state.user_state.name.is_some()
        {
            conn_state.user_state.registered = true;
            info!("User {} registered", conn_state.user_state.source);
            let client = conn_state.user_state.client_name();
            self.feed_msg(&mut conn_state.stream, RplWelcome001 { client })
                .await?;
        }
        Ok(())
    }

    pub(super) async fn process_quit<'a>(
        &self,
        conn_state: &mut ConnState,
        reason: Option<&'a str>,
    ) -> Result<(), Box<dyn Error>> {
        let reason = reason.unwrap_or("Client Quit");
        let source = conn_state.user_state.source.clone();
        {
            let conn_id = conn_state.conn_id.unwrap();
            let mut statem = self.state.write().await;
            let state = statem.deref_mut();
            for member in state.shared_channel_members(conn_id) {
                if let Some(target) = state.clients.get(member) {
                    target.send_msg_display(&source, format!("QUIT :{}", reason));
                }
            }
        }
        info!("User {} quit", source);
        conn_state.quit = true;
        self.feed_msg(&mut conn_state.stream, "ERROR :Closing connection")
            .await?;
        Ok(())
    }
}
