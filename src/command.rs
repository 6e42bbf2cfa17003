// command.rs - commands
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

use const_table::const_table;
use std::error::Error;
use std::fmt;

use crate::utils::{validate_channel, validate_nickname};

#[derive(Clone, Copy, Debug)]
pub(crate) enum MessageError {
    Empty,
    NoCommand,
}

impl fmt::Display for MessageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MessageError::Empty => write!(f, "Message is empty"),
            MessageError::NoCommand => write!(f, "No command"),
        }
    }
}

impl Error for MessageError {}

#[derive(PartialEq, Eq, Debug)]
pub(crate) struct Message<'a> {
    pub(crate) command: &'a str,
    pub(crate) params: Vec<&'a str>,
}

impl<'a> Message<'a> {
    pub(crate) fn from_shared_str(input: &'a str) -> Result<Self, MessageError> {
        let trimmed = input.trim_start();

        if trimmed.len() != 0 {
            // split off the trailing parameter at the first ':'.
            let (rest, last_param) = if let Some((rest, lp)) = trimmed.split_once(':') {
                (rest, Some(lp))
            } else {
                (trimmed, None)
            };

            let mut rest_words = rest.split_ascii_whitespace();
            let command = if let Some(cmd) = rest_words.next() {
                cmd
            } else {
                return Err(MessageError::NoCommand);
            };

            let mut params = rest_words.collect::<Vec<_>>();
            if let Some(lp) = last_param {
                params.push(lp); // add last parameter
            }

            Ok(Message { command, params })
        } else {
            Err(MessageError::Empty)
        }
    }
}

#[const_table]
pub(crate) enum CommandId {
    CommandName { pub name: &'static str },
    PASSId = CommandName { name: "PASS" },
    NICKId = CommandName { name: "NICK" },
    USERId = CommandName { name: "USER" },
    JOINId = CommandName { name: "JOIN" },
    PRIVMSGId = CommandName { name: "PRIVMSG" },
    KICKId = CommandName { name: "KICK" },
    INVITEId = CommandName { name: "INVITE" },
    TOPICId = CommandName { name: "TOPIC" },
    MODEId = CommandName { name: "MODE" },
    PINGId = CommandName { name: "PING" },
    QUITId = CommandName { name: "QUIT" },
}

use CommandId::*;

#[derive(Clone, Debug)]
pub(crate) enum CommandError {
    UnknownCommand(String),
    NeedMoreParams(CommandId),
    ParameterDoesntMatch(CommandId, usize),
    WrongParameter(CommandId, usize),
}

use CommandError::*;

impl fmt::Display for CommandError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UnknownCommand(s) => write!(f, "Unknown command '{}'", s),
            NeedMoreParams(s) => write!(f, "Command '{}' needs more parameters", s.name),
            ParameterDoesntMatch(s, i) => {
                write!(f, "Parameter {} doesn't match for command '{}'", i, s.name)
            }
            WrongParameter(s, i) => write!(f, "Wrong parameter {} in command '{}'", i, s.name),
        }
    }
}

impl Error for CommandError {}

#[derive(PartialEq, Eq, Debug)]
pub(crate) enum Command<'a> {
    PASS {
        password: &'a str,
    },
    NICK {
        nickname: &'a str,
    },
    USER {
        username: &'a str,
        hostname: &'a str,
        servername: &'a str,
        realname: &'a str,
    },
    JOIN {
        channels: Vec<&'a str>,
        keys: Option<Vec<&'a str>>,
    },
    PRIVMSG {
        target: &'a str,
        text: String,
    },
    KICK {
        channel: &'a str,
        user: &'a str,
        comment: Option<&'a str>,
    },
    INVITE {
        nickname: &'a str,
        channel: &'a str,
    },
    TOPIC {
        channel: &'a str,
        topic: Option<&'a str>,
    },
    MODE {
        channel: &'a str,
        modestring: &'a str,
        arg: Option<&'a str>,
    },
    PING {
        token: Option<&'a str>,
    },
    QUIT {
        reason: Option<&'a str>,
    },
}

use Command::*;

impl<'a> Command<'a> {
    fn parse_from_message(message: &Message<'a>) -> Result<Self, CommandError> {
        match message.command.to_ascii_uppercase().as_str() {
            "PASS" => {
                if message.params.len() >= 1 {
                    Ok(PASS {
                        password: message.params[0],
                    })
                } else {
                    Err(NeedMoreParams(PASSId))
                }
            }
            "NICK" => {
                if message.params.len() >= 1 {
                    Ok(NICK {
                        nickname: message.params[0],
                    })
                } else {
                    Err(NeedMoreParams(NICKId))
                }
            }
            "USER" => {
                // only the username is required, the rest is defaulted
                if message.params.len() >= 1 {
                    Ok(USER {
                        username: message.params[0],
                        hostname: message.params.get(1).copied().unwrap_or("0"),
                        servername: message.params.get(2).copied().unwrap_or("*"),
                        realname: message.params.get(3).copied().unwrap_or(message.params[0]),
                    })
                } else {
                    Err(NeedMoreParams(USERId))
                }
            }
            "JOIN" => {
                if message.params.len() >= 1 {
                    let mut param_it = message.params.iter();
                    let channels = param_it.next().unwrap().split(',').collect::<Vec<_>>();
                    let keys_opt = param_it.next().map(|x| x.split(',').collect::<Vec<_>>());
                    if let Some(ref keys) = keys_opt {
                        if keys.len() > channels.len() {
                            return Err(ParameterDoesntMatch(JOINId, 1));
                        }
                    }
                    Ok(JOIN {
                        channels,
                        keys: keys_opt,
                    })
                } else {
                    Err(NeedMoreParams(JOINId))
                }
            }
            "PRIVMSG" => {
                if message.params.len() >= 2 {
                    Ok(PRIVMSG {
                        target: message.params[0],
                        text: message.params[1..].join(" "),
                    })
                } else {
                    Err(NeedMoreParams(PRIVMSGId))
                }
            }
            "KICK" => {
                if message.params.len() >= 2 {
                    let mut param_it = message.params.iter();
                    let channel = param_it.next().unwrap();
                    let user = param_it.next().unwrap();
                    let comment = param_it.next().map(|x| *x);
                    Ok(KICK {
                        channel,
                        user,
                        comment,
                    })
                } else {
                    Err(NeedMoreParams(KICKId))
                }
            }
            "INVITE" => {
                if message.params.len() >= 2 {
                    Ok(INVITE {
                        nickname: message.params[0],
                        channel: message.params[1],
                    })
                } else {
                    Err(NeedMoreParams(INVITEId))
                }
            }
            "TOPIC" => {
                if message.params.len() >= 1 {
                    let mut param_it = message.params.iter();
                    let channel = param_it.next().unwrap();
                    let topic = param_it.next().map(|x| *x);
                    Ok(TOPIC { channel, topic })
                } else {
                    Err(NeedMoreParams(TOPICId))
                }
            }
            "MODE" => {
                if message.params.len() >= 2 {
                    let mut param_it = message.params.iter();
                    let channel = param_it.next().unwrap();
                    let modestring = param_it.next().unwrap();
                    let arg = param_it.next().map(|x| *x);
                    Ok(MODE {
                        channel,
                        modestring,
                        arg,
                    })
                } else {
                    Err(NeedMoreParams(MODEId))
                }
            }
            "PING" => Ok(PING {
                token: message.params.iter().next().map(|x| *x),
            }),
            "QUIT" => Ok(QUIT {
                reason: message.params.iter().next().map(|x| *x),
            }),
            s => Err(UnknownCommand(s.to_string())),
        }
    }

    pub(crate) fn from_message(message: &Message<'a>) -> Result<Self, CommandError> {
        let cmd = Self::parse_from_message(message)?;
        cmd.validate()?;
        Ok(cmd)
    }

    fn validate(&self) -> Result<(), CommandError> {
        match self {
            NICK { nickname } => {
                validate_nickname(nickname).map_err(|_| WrongParameter(NICKId, 0))
            }
            USER { username, .. } => {
                validate_nickname(username).map_err(|_| WrongParameter(USERId, 0))
            }
            // JOIN channel names are checked per channel at dispatch, a bad
            // name there yields a numeric instead of rejecting the line.
            KICK { channel, user, .. } => {
                validate_channel(channel).map_err(|_| WrongParameter(KICKId, 0))?;
                validate_nickname(user).map_err(|_| WrongParameter(KICKId, 1))
            }
            INVITE { nickname, channel } => {
                validate_nickname(nickname).map_err(|_| WrongParameter(INVITEId, 0))?;
                validate_channel(channel).map_err(|_| WrongParameter(INVITEId, 1))
            }
            TOPIC { channel, .. } => {
                validate_channel(channel).map_err(|_| WrongParameter(TOPICId, 0))
            }
            MODE { modestring, .. } => {
                // flag letters are checked at dispatch, only shape here.
                if modestring.len() == 2
                    && (modestring.starts_with('+') || modestring.starts_with('-'))
                {
                    Ok(())
                } else {
                    Err(WrongParameter(MODEId, 1))
                }
            }
            PRIVMSG { target, .. } => {
                // bare targets are allowed, the dispatcher maps them to '#'-channels.
                validate_nickname(target)
                    .or_else(|_| validate_channel(target))
                    .map_err(|_| WrongParameter(PRIVMSGId, 0))
            }
            _ => Ok(()),
        }
    }
}
