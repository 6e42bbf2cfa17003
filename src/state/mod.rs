// mod.rs - main state
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

use std::error::Error;
use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use chrono::prelude::*;
use futures::SinkExt;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{broadcast, RwLock};
use tokio::task::JoinHandle;
use tokio_stream::StreamExt;
use tokio_util::codec::{Framed, LinesCodecError};
use tracing::*;

use crate::command::*;
use crate::config::*;
use crate::reply::*;
use crate::utils::*;

mod structs;
use structs::*;

pub(crate) struct MainState {
    config: MainConfig,
    conns_count: Arc<AtomicUsize>,
    state: RwLock<VolatileState>,
    // notifies the accept loop and all connection tasks about shutdown.
    shutdown_sender: broadcast::Sender<()>,
    created: String,
}

impl MainState {
    pub(crate) fn new_from_config(config: MainConfig) -> MainState {
        let (shutdown_sender, _) = broadcast::channel(1);
        MainState {
            config,
            conns_count: Arc::new(AtomicUsize::new(0)),
            state: RwLock::new(VolatileState::new()),
            shutdown_sender,
            created: Local::now().to_rfc2822(),
        }
    }

    pub(crate) fn shutdown(&self) {
        let _ = self.shutdown_sender.send(());
    }

    // register new connection and add its client to the registry.
    pub(crate) async fn register_conn_state(
        &self,
        ip_addr: IpAddr,
        stream: Framed<TcpStream, IrcLinesCodec>,
    ) -> Option<ConnState> {
        if let Some(max_conns) = self.config.max_connections {
            if self.conns_count.fetch_add(1, Ordering::SeqCst) >= max_conns {
                self.conns_count.fetch_sub(1, Ordering::SeqCst);
                error!("Too many connections for {}", ip_addr);
                return None;
            }
        } else {
            self.conns_count.fetch_add(1, Ordering::SeqCst);
        }
        let mut conn_state = ConnState::new(
            ip_addr,
            stream,
            self.shutdown_sender.subscribe(),
            self.conns_count.clone(),
        );
        let sender = conn_state.sender.take().unwrap();
        let conn_id = {
            let mut state = self.state.write().await;
            state
                .clients
                .insert(Client::new(&conn_state.user_state, sender))
        };
        conn_state.conn_id = Some(conn_id);
        info!("Client {} connected from {}", conn_id, ip_addr);
        Some(conn_state)
    }

    // remove client from the registry and from its channels. no messages are
    // sent here, QUIT broadcasting happens before the connection winds down.
    pub(crate) async fn remove_conn(&self, conn_state: &ConnState) {
        if let Some(conn_id) = conn_state.conn_id {
            let mut state = self.state.write().await;
            state.remove_client(conn_id);
            info!("Client {} removed", conn_id);
        }
    }

    pub(crate) async fn process(&self, conn_state: &mut ConnState) -> Result<(), String> {
        // use conversion error to string to avoid problems with thread safety
        let res = self
            .process_internal(conn_state)
            .await
            .map_err(|e| e.to_string());
        // the codec encodes any AsRef<str>, flush needs a concrete item type
        SinkExt::<String>::flush(&mut conn_state.stream)
            .await
            .map_err(|e| e.to_string())?;
        res
    }

    async fn process_internal(&self, conn_state: &mut ConnState) -> Result<(), Box<dyn Error>> {
        tokio::select! {
            Some(msg) = conn_state.receiver.recv() => {
                conn_state.stream.feed(msg).await?;
                Ok(())
            },
            Ok(()) = conn_state.shutdown_receiver.recv() => {
                self.feed_msg(&mut conn_state.stream,
                        "ERROR :Server is shutting down").await?;
                conn_state.quit = true;
                Ok(())
            }
            msg_str_res = conn_state.stream.next() => {

                let msg = match msg_str_res {
                    Some(Ok(ref msg_str)) => {
                        match Message::from_shared_str(msg_str) {
                            Ok(msg) => msg,
                            Err(e) => {
                                match e {
                                    // empty lines are skipped without a reply
                                    MessageError::Empty => {
                                        return Ok(())
                                    }
                                    MessageError::NoCommand => {
                                        self.feed_msg(&mut conn_state.stream,
                                            "ERROR :No command supplied").await?;
                                        return Err(Box::new(e));
                                    }
                                }
                            }
                        }
                    }
                    Some(Err(LinesCodecError::MaxLineLengthExceeded)) => {
                        let client = conn_state.user_state.client_name();
                        self.feed_msg(&mut conn_state.stream,
                                    ErrInputTooLong417{ client }).await?;
                        return Ok(())
                    },
                    Some(Err(e)) => {
                        conn_state.quit = true;
                        return Err(Box::new(e));
                    }
                    // end of stream - abrupt disconnection
                    None => {
                        conn_state.quit = true;
                        return Ok(())
                    }
                };

                let cmd = match Command::from_message(&msg) {
                    Ok(cmd) => cmd,
                    Err(e) => {
                        use crate::command::CommandError::*;
                        let client = conn_state.user_state.client_name();
                        match e {
                            UnknownCommand(ref cmd_name) => {
                                self.feed_msg(&mut conn_state.stream,
                                        ErrUnknownCommand421{ client,
                                        command: cmd_name }).await?;
                            }
                            NeedMoreParams(command) => {
                                self.feed_msg(&mut conn_state.stream,
                                        ErrNeedMoreParams461{ client,
                                        command: command.name }).await?;
                            }
                            ParameterDoesntMatch(..) | WrongParameter(..) => {
                                self.feed_msg(&mut conn_state.stream,
                                        format!("ERROR :{}", e)).await?;
                            }
                        }
                        return Err(Box::new(e));
                    }
                };

                use crate::command::Command::*;
                // nothing but PASS is served before authentication
                if !conn_state.user_state.authenticated {
                    match cmd {
                        PASS{ .. } => {}
                        _ => {
                            self.feed_msg(&mut conn_state.stream, ErrNotAuthenticated464{
                                    client: conn_state.user_state.client_name() }).await?;
                            return Ok(())
                        }
                    }
                }
                // channel and messaging commands require full registration
                if !conn_state.user_state.registered {
                    match cmd {
                        JOIN{ .. } | PRIVMSG{ .. } | KICK{ .. } | INVITE{ .. }
                                | TOPIC{ .. } | MODE{ .. } => {
                            self.feed_msg(&mut conn_state.stream, ErrNotRegistered451{
                                    client: conn_state.user_state.client_name() }).await?;
                            return Ok(())
                        }
                        _ => {}
                    }
                }

                match cmd {
                    PASS{ password } =>
                        self.process_pass(conn_state, password).await,
                    NICK{ nickname } =>
                        self.process_nick(conn_state, nickname).await,
                    USER{ username, hostname, servername, realname } =>
                        self.process_user(conn_state, username, hostname,
                                servername, realname).await,
                    JOIN{ channels, keys } =>
                        self.process_join(conn_state, channels, keys).await,
                    PRIVMSG{ target, text } =>
                        self.process_privmsg(conn_state, target, text).await,
                    KICK{ channel, user, comment } =>
                        self.process_kick(conn_state, channel, user, comment).await,
                    INVITE{ nickname, channel } =>
                        self.process_invite(conn_state, nickname, channel).await,
                    TOPIC{ channel, topic } =>
                        self.process_topic(conn_state, channel, topic).await,
                    MODE{ channel, modestring, arg } =>
                        self.process_mode(conn_state, channel, modestring, arg).await,
                    PING{ token } => self.process_ping(conn_state, token).await,
                    QUIT{ reason } => self.process_quit(conn_state, reason).await,
                }
            },
        }
    }

    async fn feed_msg<T: fmt::Display>(
        &self,
        stream: &mut Framed<TcpStream, IrcLinesCodec>,
        t: T,
    ) -> Result<(), LinesCodecError> {
        stream.feed(format!(":{} {}", self.config.name, t)).await
    }

    async fn feed_msg_source<T: fmt::Display>(
        &self,
        stream: &mut Framed<TcpStream, IrcLinesCodec>,
        source: &str,
        t: T,
    ) -> Result<(), LinesCodecError> {
        stream.feed(format!(":{} {}", source, t)).await
    }
}

pub(crate) async fn user_state_process(
    main_state: Arc<MainState>,
    stream: TcpStream,
    addr: SocketAddr,
) {
    let line_stream = Framed::new(stream, IrcLinesCodec::new_with_max_length(2000));
    if let Some(mut conn_state) = main_state
        .register_conn_state(addr.ip(), line_stream)
        .await
    {
        while !conn_state.is_quit() {
            if let Err(e) = main_state.process(&mut conn_state).await {
                error!("Error for {}: {}", addr, e);
            }
        }
        main_state.remove_conn(&conn_state).await;
    }
}

pub(crate) async fn run_server(
    config: MainConfig,
) -> Result<(Arc<MainState>, JoinHandle<()>, u16), Box<dyn Error>> {
    let listener = TcpListener::bind((config.listen, config.port)).await?;
    let port = listener.local_addr()?.port();
    let main_state = Arc::new(MainState::new_from_config(config));
    info!(
        "Server listening on port {} (created {})",
        port, main_state.created
    );
    let main_state_to_return = main_state.clone();
    let handle = tokio::spawn(async move {
        let mut shutdown_receiver = main_state.shutdown_sender.subscribe();
        let mut do_quit = false;
        while !do_quit {
            tokio::select! {
                res = listener.accept() => {
                    match res {
                        Ok((stream, addr)) => {
                            tokio::spawn(user_state_process(
                                        main_state.clone(), stream, addr));
                        }
                        Err(e) => { error!("Accept connection error: {}", e); }
                    };
                }
                Ok(()) = shutdown_receiver.recv() => {
                    info!("Server shutting down");
                    do_quit = true;
                }
            };
        }
    });
    Ok((main_state_to_return, handle, port))
}


mod channel_cmds;
mod conn_cmds;
mod rest_cmds;
