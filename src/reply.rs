// reply.rs - replies
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

// replies

use std::fmt;

// all replies used by this IRC server.
pub(crate) enum Reply<'a> {
    RplWelcome001 {
        client: &'a str,
    },
    RplNoTopic331 {
        client: &'a str,
        channel: &'a str,
    },
    RplTopic332 {
        client: &'a str,
        channel: &'a str,
        topic: &'a str,
    },
    RplTopicWhoTime333 {
        client: &'a str,
        channel: &'a str,
        nick: &'a str,
        setat: u64,
    },
    RplInviting341 {
        client: &'a str,
        nick: &'a str,
        channel: &'a str,
    },
    ErrNoSuchNick401 {
        client: &'a str,
        nick: &'a str,
    },
    ErrNoSuchChannel403 {
        client: &'a str,
        channel: &'a str,
    },
    ErrNoOrigin409 {
        client: &'a str,
    },
    ErrInputTooLong417 {
        client: &'a str,
    },
    ErrUnknownCommand421 {
        client: &'a str,
        command: &'a str,
    },
    ErrNicknameInUse433 {
        client: &'a str,
        nick: &'a str,
    },
    ErrUserNotInChannel441 {
        client: &'a str,
        nick: &'a str,
        channel: &'a str,
    },
    ErrNotOnChannel442 {
        client: &'a str,
        channel: &'a str,
    },
    ErrUserOnChannel443 {
        client: &'a str,
        nick: &'a str,
        channel: &'a str,
    },
    ErrNotRegistered451 {
        client: &'a str,
    },
    ErrNeedMoreParams461 {
        client: &'a str,
        command: &'a str,
    },
    ErrPasswdMismatch464 {
        client: &'a str,
    },
    ErrNotAuthenticated464 {
        client: &'a str,
    },
    ErrChannelIsFull471 {
        client: &'a str,
        channel: &'a str,
    },
    ErrUnknownMode472 {
        client: &'a str,
        modechar: char,
        channel: &'a str,
    },
    ErrInviteOnlyChan473 {
        client: &'a str,
        channel: &'a str,
    },
    ErrBadChannelKey475 {
        client: &'a str,
        channel: &'a str,
    },
    ErrBadChanMask476 {
        client: &'a str,
        channel: &'a str,
    },
    ErrChanOpPrivsNeeded482 {
        client: &'a str,
        channel: &'a str,
    },
}

pub(crate) use Reply::*;

impl<'a> fmt::Display for Reply<'a> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RplWelcome001 { client } => {
                write!(f, "001 {} :Welcome to the IRC Server", client)
            }
            RplNoTopic331 { client, channel } => {
                write!(f, "331 {} {} :No topic is set", client, channel)
            }
            RplTopic332 {
                client,
                channel,
                topic,
            } => {
                write!(f, "332 {} {} :{}", client, channel, topic)
            }
            RplTopicWhoTime333 {
                client,
                channel,
                nick,
                setat,
            } => {
                write!(f, "333 {} {} {} {}", client, channel, nick, setat)
            }
            RplInviting341 {
                client,
                nick,
                channel,
            } => {
                write!(f, "341 {} {} {}", client, nick, channel)
            }
            ErrNoSuchNick401 { client, nick } => {
                write!(f, "401 {} {} :No such nick/channel", client, nick)
            }
            ErrNoSuchChannel403 { client, channel } => {
                write!(f, "403 {} {} :No such channel", client, channel)
            }
            ErrNoOrigin409 { client } => {
                write!(f, "409 {} :No origin specified", client)
            }
            ErrInputTooLong417 { client } => {
                write!(f, "417 {} :Input line was too long", client)
            }
            ErrUnknownCommand421 { client, command } => {
                write!(f, "421 {} {} :Unknown command", client, command)
            }
            ErrNicknameInUse433 { client, nick } => {
                write!(f, "433 {} {} :Nickname is already in use", client, nick)
            }
            ErrUserNotInChannel441 {
                client,
                nick,
                channel,
            } => {
                write!(
                    f,
                    "441 {} {} {} :They aren't on that channel",
                    client, nick, channel
                )
            }
            ErrNotOnChannel442 { client, channel } => {
                write!(f, "442 {} {} :You're not on that channel", client, channel)
            }
            ErrUserOnChannel443 {
                client,
                nick,
                channel,
            } => {
                write!(
                    f,
                    "443 {} {} {} :is already on channel",
                    client, nick, channel
                )
            }
            ErrNotRegistered451 { client } => {
                write!(f, "451 {} :You have not registered", client)
            }
            ErrNeedMoreParams461 { client, command } => {
                write!(f, "461 {} {} :Not enough parameters", client, command)
            }
            ErrPasswdMismatch464 { client } => {
                write!(f, "464 {} :Password incorrect", client)
            }
            ErrNotAuthenticated464 { client } => {
                write!(f, "464 {} :You're not authenticated", client)
            }
            ErrChannelIsFull471 { client, channel } => {
                write!(f, "471 {} {} :Cannot join channel (+l)", client, channel)
            }
            ErrUnknownMode472 {
                client,
                modechar,
                channel,
            } => {
                write!(
                    f,
                    "472 {} {} :is unknown mode char for {}",
                    client, modechar, channel
                )
            }
            ErrInviteOnlyChan473 { client, channel } => {
                write!(f, "473 {} {} :Cannot join channel (+i)", client, channel)
            }
            ErrBadChannelKey475 { client, channel } => {
                write!(f, "475 {} {} :Cannot join channel (+k)", client, channel)
            }
            ErrBadChanMask476 { client, channel } => {
                write!(f, "476 {} {} :Bad Channel Mask", client, channel)
            }
            ErrChanOpPrivsNeeded482 { client, channel } => {
                write!(f, "482 {} {} :You're not channel operator", client, channel)
            }
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_replies() {
        assert_eq!(
            "001 <client> :Welcome to the IRC Server",
            format!("{}", RplWelcome001 { client: "<client>" })
        );
        assert_eq!(
            "331 <client> <channel> :No topic is set",
            format!(
                "{}",
                RplNoTopic331 {
                    client: "<client>",
                    channel: "<channel>"
                }
            )
        );
        assert_eq!(
            "332 <client> <channel> :<topic>",
            format!(
                "{}",
                RplTopic332 {
                    client: "<client>",
                    channel: "<channel>",
                    topic: "<topic>"
                }
            )
        );
        assert_eq!(
            "333 <client> <channel> <nick> 1234567890",
            format!(
                "{}",
                RplTopicWhoTime333 {
                    client: "<client>",
                    channel: "<channel>",
                    nick: "<nick>",
                    setat: 1234567890
                }
            )
        );
        assert_eq!(
            "341 <client> <nick> <channel>",
            format!(
                "{}",
                RplInviting341 {
                    client: "<client>",
                    nick: "<nick>",
                    channel: "<channel>"
                }
            )
        );
        assert_eq!(
            "401 <client> <nick> :No such nick/channel",
            format!(
                "{}",
                ErrNoSuchNick401 {
                    client: "<client>",
                    nick: "<nick>"
                }
            )
        );
        assert_eq!(
            "403 <client> <channel> :No such channel",
            format!(
                "{}",
                ErrNoSuchChannel403 {
                    client: "<client>",
                    channel: "<channel>"
                }
            )
        );
        assert_eq!(
            "409 <client> :No origin specified",
            format!("{}", ErrNoOrigin409 { client: "<client>" })
        );
        assert_eq!(
            "417 <client> :Input line was too long",
            format!("{}", ErrInputTooLong417 { client: "<client>" })
        );
        assert_eq!(
            "421 <client> <command> :Unknown command",
            format!(
                "{}",
                ErrUnknownCommand421 {
                    client: "<client>",
                    command: "<command>"
                }
            )
        );
        assert_eq!(
            "433 <client> <nick> :Nickname is already in use",
            format!(
                "{}",
                ErrNicknameInUse433 {
                    client: "<client>",
                    nick: "<nick>"
                }
            )
        );
        assert_eq!(
            "441 <client> <nick> <channel> :They aren't on that channel",
            format!(
                "{}",
                ErrUserNotInChannel441 {
                    client: "<client>",
                    nick: "<nick>",
                    channel: "<channel>"
                }
            )
        );
        assert_eq!(
            "442 <client> <channel> :You're not on that channel",
            format!(
                "{}",
                ErrNotOnChannel442 {
                    client: "<client>",
                    channel: "<channel>"
                }
            )
        );
        assert_eq!(
            "443 <client> <nick> <channel> :is already on channel",
            format!(
                "{}",
                ErrUserOnChannel443 {
                    client: "<client>",
                    nick: "<nick>",
                    channel: "<channel>"
                }
            )
        );
        assert_eq!(
            "451 <client> :You have not registered",
            format!("{}", ErrNotRegistered451 { client: "<client>" })
        );
        assert_eq!(
            "461 <client> <command> :Not enough parameters",
            format!(
                "{}",
                ErrNeedMoreParams461 {
                    client: "<client>",
                    command: "<command>"
                }
            )
        );
        assert_eq!(
            "464 <client> :Password incorrect",
            format!("{}", ErrPasswdMismatch464 { client: "<client>" })
        );
        assert_eq!(
            "464 <client> :You're not authenticated",
            format!("{}", ErrNotAuthenticated464 { client: "<client>" })
        );
        assert_eq!(
            "471 <client> <channel> :Cannot join channel (+l)",
            format!(
                "{}",
                ErrChannelIsFull471 {
                    client: "<client>",
                    channel: "<channel>"
                }
            )
        );
        assert_eq!(
            "472 <client> x :is unknown mode char for <channel>",
            format!(
                "{}",
                ErrUnknownMode472 {
                    client: "<client>",
                    modechar: 'x',
                    channel: "<channel>"
                }
            )
        );
        assert_eq!(
            "473 <client> <channel> :Cannot join channel (+i)",
            format!(
                "{}",
                ErrInviteOnlyChan473 {
                    client: "<client>",
                    channel: "<channel>"
                }
            )
        );
        assert_eq!(
            "475 <client> <channel> :Cannot join channel (+k)",
            format!(
                "{}",
                ErrBadChannelKey475 {
                    client: "<client>",
                    channel: "<channel>"
                }
            )
        );
        assert_eq!(
            "476 <client> <channel> :Bad Channel Mask",
            format!(
                "{}",
                ErrBadChanMask476 {
                    client: "<client>",
                    channel: "<channel>"
                }
            )
        );
        assert_eq!(
            "482 <client> <channel> :You're not channel operator",
            format!(
                "{}",
                ErrChanOpPrivsNeeded482 {
                    client: "<client>",
                    channel: "<channel>"
                }
            )
        );
    }
}
